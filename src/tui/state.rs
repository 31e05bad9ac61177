use crate::model::{ConversationTurn, EnrichmentField, Mode};
use crate::orchestrator::{ConsoleOutput, PredictionOutcome};
use crate::view::ViewController;

/// Sample query pre-filled into the explorer editor, matching the shape of
/// the deployed dataset.
pub const SAMPLE_QUERY: &str = "\
PREFIX cs: <http://data.cyclingtour.fr/schema#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>

SELECT ?mountain ?label ?sameAs
WHERE {
  ?mountain a cs:Mountain ;
            rdfs:label ?label ;
            owl:sameAs ?sameAs .
} LIMIT 20";

/// Greeting shown at the top of the chat scrollback.
pub const GREETING: &str =
    "Hello! I can help you in two ways: Assistant answers general questions, \
     Database generates and runs queries against the knowledge graph.";

/// All mutable UI state. Owned by the UI thread only; the bridge task never
/// touches it.
pub struct UiState {
    pub views: ViewController,

    // Chat view
    pub chat_input: String,
    pub chat_turns: Vec<ConversationTurn>,
    pub chat_mode: Mode,
    pub chat_busy: bool,
    /// Lines scrolled up from the bottom of the scrollback.
    pub chat_scroll: usize,

    // Explorer view
    pub editor: String,
    /// Toggles aligned with [`EnrichmentField::ALL`].
    pub enrich_toggles: [bool; 3],
    pub console_busy: bool,
    pub console: Option<Result<ConsoleOutput, String>>,
    pub console_scroll: usize,

    // Predict view
    pub predict_input: String,
    pub predict_busy: bool,
    pub prediction: Option<Result<PredictionOutcome, String>>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            views: ViewController::default(),
            chat_input: String::new(),
            chat_turns: Vec::new(),
            chat_mode: Mode::default(),
            chat_busy: false,
            chat_scroll: 0,
            editor: SAMPLE_QUERY.to_string(),
            enrich_toggles: [true, false, false],
            console_busy: false,
            console: None,
            console_scroll: 0,
            predict_input: String::new(),
            predict_busy: false,
            prediction: None,
        }
    }
}

impl UiState {
    /// Currently selected enrichment fields, in catalog order.
    pub fn selection(&self) -> Vec<EnrichmentField> {
        EnrichmentField::ALL
            .iter()
            .zip(self.enrich_toggles)
            .filter_map(|(f, on)| on.then_some(*f))
            .collect()
    }

    pub fn toggle_field(&mut self, field: EnrichmentField) {
        let idx = EnrichmentField::ALL
            .iter()
            .position(|f| *f == field)
            .unwrap_or(0);
        self.enrich_toggles[idx] = !self.enrich_toggles[idx];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_is_image_only() {
        let state = UiState::default();
        assert_eq!(state.selection(), vec![EnrichmentField::Image]);
    }

    #[test]
    fn toggles_stay_within_the_catalog() {
        let mut state = UiState::default();
        state.toggle_field(EnrichmentField::Website);
        state.toggle_field(EnrichmentField::Image);
        assert_eq!(state.selection(), vec![EnrichmentField::Website]);
        state.toggle_field(EnrichmentField::Image);
        assert_eq!(
            state.selection(),
            vec![EnrichmentField::Image, EnrichmentField::Website]
        );
    }
}
