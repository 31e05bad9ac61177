//! Conversation lifecycle for the chat view.
//!
//! Owns the append-only turn history and the active answer mode. A submission
//! is one atomic outcome: either the full response turn lands in the history,
//! or a single failure turn does; the transient pending turn never survives
//! either path.

use crate::gateway::Backend;
use crate::model::{ConversationTurn, Mode, Role, TurnContent};
use crate::render;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Status text shown while a turn is in flight.
pub(crate) const PENDING_TEXT: &str = "Thinking...";

/// What a submission did, for presentation layers that react without
/// re-reading the whole history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input or a turn already in flight; nothing happened.
    Ignored,
    /// The response turn was appended.
    Answered,
    /// A failure turn was appended.
    Failed,
}

pub struct ConversationOrchestrator {
    backend: Arc<dyn Backend>,
    mode: Mode,
    history: Vec<ConversationTurn>,
    turn_in_flight: bool,
}

impl ConversationOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            mode: Mode::default(),
            history: Vec::new(),
            turn_in_flight: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch answer modes. Pure assignment: no network call, history kept.
    /// The input placeholder and hint follow from the new mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn turn_in_flight(&self) -> bool {
        self.turn_in_flight
    }

    /// Handle one user submission according to the active mode.
    pub async fn submit(&mut self, user_text: &str) -> SubmitOutcome {
        if user_text.is_empty() || self.turn_in_flight {
            return SubmitOutcome::Ignored;
        }

        self.history.push(ConversationTurn::user(user_text));
        self.history.push(ConversationTurn::status(PENDING_TEXT));
        self.turn_in_flight = true;
        debug!(mode = ?self.mode, "turn started");

        let result = match self.mode {
            Mode::StructuredQuery => self.run_query_turn(user_text).await,
            Mode::Assistant => self.run_assistant_turn(user_text).await,
        };

        self.remove_pending();
        self.turn_in_flight = false;

        match result {
            Ok(turn) => {
                self.history.push(turn);
                SubmitOutcome::Answered
            }
            Err(message) => {
                warn!(%message, "turn failed");
                self.history
                    .push(ConversationTurn::status(format!("Error: {message}")));
                SubmitOutcome::Failed
            }
        }
    }

    /// Translate the text to a query, run it, and compose the combined turn.
    /// Failure anywhere before the execution response leaves no partial turn.
    async fn run_query_turn(&self, text: &str) -> Result<ConversationTurn, String> {
        let translated = self.backend.translate(text).await.map_err(|e| e.to_string())?;
        let query = strip_code_fences(&extract_query(&translated)?);

        let payload = self.backend.execute(&query).await.map_err(|e| e.to_string())?;
        Ok(ConversationTurn {
            role: Role::Assistant,
            content: TurnContent::QueryOutcome {
                query,
                results: render::render(&payload),
            },
        })
    }

    async fn run_assistant_turn(&self, text: &str) -> Result<ConversationTurn, String> {
        let body = self.backend.ask(text).await.map_err(|e| e.to_string())?;
        Ok(ConversationTurn {
            role: Role::Assistant,
            content: TurnContent::Answer(extract_answer(&body)?),
        })
    }

    #[cfg(test)]
    fn force_in_flight(&mut self) {
        self.turn_in_flight = true;
    }

    fn remove_pending(&mut self) {
        if let Some(pos) = self.history.iter().rposition(|t| {
            t.role == Role::Status
                && matches!(&t.content, TurnContent::Plain(s) if s == PENDING_TEXT)
        }) {
            self.history.remove(pos);
        }
    }
}

/// Pull the query string out of a translation response: a bare string, or a
/// mapping under `query` (the deployed backend has also used `sparql_query`).
/// An `error` field aborts the turn.
pub(crate) fn extract_query(response: &Value) -> Result<String, String> {
    if let Value::String(s) = response {
        return Ok(s.clone());
    }
    if let Value::Object(map) = response {
        if let Some(err) = map.get("error") {
            return Err(flatten(err));
        }
        for key in ["query", "sparql_query"] {
            if let Some(Value::String(s)) = map.get(key) {
                return Ok(s.clone());
            }
        }
    }
    Err("text-to-query returned an unrecognized response".into())
}

fn extract_answer(response: &Value) -> Result<String, String> {
    if let Value::Object(map) = response {
        if let Some(err) = map.get("error") {
            return Err(flatten(err));
        }
        if let Some(Value::String(answer)) = map.get("answer") {
            return Ok(answer.clone());
        }
    }
    Err("assistant returned an unrecognized response".into())
}

fn flatten(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip surrounding triple-backtick fences (with an optional language tag on
/// the opening fence) and surrounding whitespace from a generated query.
pub fn strip_code_fences(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.split_once('\n') {
            Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
            _ => rest,
        };
    }
    let s = s.trim();
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, DisplayDocument};
    use crate::orchestrator::testutil::ScriptedBackend;
    use serde_json::json;

    fn orchestrator(backend: Arc<ScriptedBackend>) -> ConversationOrchestrator {
        ConversationOrchestrator::new(backend)
    }

    #[test]
    fn fence_stripping() {
        assert_eq!(strip_code_fences("```sparql\nSELECT ?x\n```"), "SELECT ?x");
        assert_eq!(strip_code_fences("```\nSELECT ?x\n```"), "SELECT ?x");
        assert_eq!(strip_code_fences("```SELECT ?x```"), "SELECT ?x");
        assert_eq!(strip_code_fences("  SELECT ?x  "), "SELECT ?x");
        assert_eq!(
            strip_code_fences("SELECT ?x WHERE { ?x a <urn:b> }"),
            "SELECT ?x WHERE { ?x a <urn:b> }"
        );
    }

    #[test]
    fn query_extraction_accepts_all_observed_shapes() {
        assert_eq!(extract_query(&json!("SELECT ?x")).unwrap(), "SELECT ?x");
        assert_eq!(
            extract_query(&json!({"query": "SELECT ?y"})).unwrap(),
            "SELECT ?y"
        );
        assert_eq!(
            extract_query(&json!({"sparql_query": "SELECT ?z"})).unwrap(),
            "SELECT ?z"
        );
        assert_eq!(
            extract_query(&json!({"error": "no key"})).unwrap_err(),
            "no key"
        );
        assert!(extract_query(&json!(17)).is_err());
    }

    #[tokio::test]
    async fn assistant_mode_makes_exactly_one_ask_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            json!({"answer": "Ride twice a week."}),
        )]));
        let mut chat = orchestrator(backend.clone());

        let outcome = chat.submit("How do I train for a hill climb?").await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(
            backend.calls(),
            vec![(
                "ask",
                json!({"question": "How do I train for a hill climb?"})
            )]
        );
        let last = chat.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(
            last.content,
            TurnContent::Answer("Ride twice a week.".into())
        );
    }

    #[tokio::test]
    async fn structured_mode_translates_then_executes() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(json!("```sparql\nSELECT ?bike\n```")),
            Ok(json!([{"bike": "https://x.org/a#Bike_1", "price": 45}])),
        ]));
        let mut chat = orchestrator(backend.clone());
        chat.set_mode(Mode::StructuredQuery);

        let outcome = chat.submit("List bikes under 50 euros").await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(backend.call_names(), vec!["translate", "execute"]);
        // The executed query is the cleaned one.
        assert_eq!(
            backend.calls()[1].1,
            json!({"query": "SELECT ?bike"})
        );

        match &chat.history().last().unwrap().content {
            TurnContent::QueryOutcome { query, results } => {
                assert_eq!(query, "SELECT ?bike");
                match results {
                    DisplayDocument::Table { columns, rows } => {
                        assert_eq!(columns, &["bike", "price"]);
                        assert_eq!(
                            rows[0][0],
                            Cell::Link {
                                url: "https://x.org/a#Bike_1".into(),
                                label: "Bike_1".into()
                            }
                        );
                    }
                    other => panic!("expected table, got {other:?}"),
                }
            }
            other => panic!("expected query outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut chat = orchestrator(backend.clone());

        assert_eq!(chat.submit("").await, SubmitOutcome::Ignored);
        assert!(backend.calls().is_empty());
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn submit_while_in_flight_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut chat = orchestrator(backend.clone());
        chat.force_in_flight();

        assert_eq!(chat.submit("hello").await, SubmitOutcome::Ignored);
        assert!(backend.calls().is_empty());
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn translation_failure_leaves_no_partial_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            json!({"error": "model unavailable"}),
        )]));
        let mut chat = orchestrator(backend.clone());
        chat.set_mode(Mode::StructuredQuery);

        let outcome = chat.submit("List bikes").await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        // No execute call after the failed translation.
        assert_eq!(backend.call_names(), vec!["translate"]);
        // History: user turn, then exactly one failure turn; pending removed.
        let history = chat.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ConversationTurn::user("List bikes"));
        assert_eq!(history[1].role, Role::Status);
        assert_eq!(
            history[1].content,
            TurnContent::Plain("Error: model unavailable".into())
        );
        assert!(!chat.turn_in_flight());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_one_status_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(
            ScriptedBackend::transport_failure("/ask"),
        )]));
        let mut chat = orchestrator(backend);

        let outcome = chat.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        let history = chat.history();
        assert_eq!(history.len(), 2);
        match &history[1].content {
            TurnContent::Plain(msg) => {
                assert!(msg.contains("/ask"), "message was {msg:?}")
            }
            other => panic!("expected plain status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execution_error_payload_renders_in_place() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(json!({"query": "SELECT ?x"})),
            Ok(json!({"error": "parse error at line 1"})),
        ]));
        let mut chat = orchestrator(backend);
        chat.set_mode(Mode::StructuredQuery);

        let outcome = chat.submit("bad question").await;

        // Execution errors are part of the rendered result, not a turn failure.
        assert_eq!(outcome, SubmitOutcome::Answered);
        match &chat.history().last().unwrap().content {
            TurnContent::QueryOutcome { results, .. } => {
                assert_eq!(
                    results,
                    &DisplayDocument::Error {
                        message: "parse error at line 1".into()
                    }
                );
            }
            other => panic!("expected query outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mode_switch_keeps_history_and_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(json!({"answer": "hi"}))]));
        let mut chat = orchestrator(backend.clone());
        chat.submit("hello").await;
        let before = chat.history().to_vec();

        chat.set_mode(Mode::StructuredQuery);

        assert_eq!(chat.mode(), Mode::StructuredQuery);
        assert_eq!(chat.history(), &before[..]);
        assert_eq!(backend.call_names(), vec!["ask"]);
    }
}
