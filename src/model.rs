use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the TourGraph backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

/// How a chat submission is answered: a prose answer from the assistant, or a
/// generated query executed against the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Assistant,
    StructuredQuery,
}

impl Mode {
    /// Input placeholder shown while this mode is active.
    pub fn placeholder(self) -> &'static str {
        match self {
            Mode::Assistant => "Ex: How do I prepare for a cycling tour?",
            Mode::StructuredQuery => "Ex: List all bikes cheaper than 50 euros",
        }
    }

    /// One-line hint shown under the input while this mode is active.
    pub fn hint(self) -> &'static str {
        match self {
            Mode::Assistant => "Mode: Human-like text answer",
            Mode::StructuredQuery => "Mode: Generate SPARQL & Data Table",
        }
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Status lines the client injects itself (pending notices, failures).
    Status,
}

/// Body of a conversation turn. The variant decides the presentation
/// treatment, so no separate "is markup" flag is carried around.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    /// Verbatim text: user input and status messages.
    Plain(String),
    /// Assistant answer, markdown source; presented through the
    /// markdown transform.
    Answer(String),
    /// Generated query followed by the rendered execution results.
    QueryOutcome {
        query: String,
        results: DisplayDocument,
    },
}

/// One unit of exchange in the chat history.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Plain(text.into()),
        }
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self {
            role: Role::Status,
            content: TurnContent::Plain(text.into()),
        }
    }
}

/// Fields the enrichment endpoint can merge into query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentField {
    Image,
    Description,
    Website,
}

impl EnrichmentField {
    /// The full catalog, in display order.
    pub const ALL: [EnrichmentField; 3] = [
        EnrichmentField::Image,
        EnrichmentField::Description,
        EnrichmentField::Website,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnrichmentField::Image => "image",
            EnrichmentField::Description => "description",
            EnrichmentField::Website => "website",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "image" => Some(EnrichmentField::Image),
            "description" => Some(EnrichmentField::Description),
            "website" => Some(EnrichmentField::Website),
            _ => None,
        }
    }
}

/// Default enrichment selection, matching the original deployment (image only).
pub fn default_enrichment() -> Vec<EnrichmentField> {
    vec![EnrichmentField::Image]
}

/// One scored entry from the recommendation endpoint, ordered by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationItem {
    pub tour_uri: String,
    #[serde(default)]
    pub label: String,
    pub score: f64,
}

impl RecommendationItem {
    /// Shortened identifier: the fragment after `#`, or the full URI when
    /// there is none.
    pub fn short_name(&self) -> &str {
        match self.tour_uri.rsplit_once('#') {
            Some((_, frag)) if !frag.is_empty() => frag,
            _ => &self.tour_uri,
        }
    }

    /// Score as a percentage with one fractional digit, e.g. "97.5%".
    pub fn score_percent(&self) -> String {
        format!("{:.1}%", self.score * 100.0)
    }
}

/// Renderer output: a presentation-neutral document the UI layers draw.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayDocument {
    /// Empty, absent, or malformed payload.
    NoResults,
    /// Payload-level error reported by the backend.
    Error { message: String },
    /// Tabular results; `columns` is the inferred header order.
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    },
}

/// Display treatment for a single table cell. Variants are listed in
/// classification priority order; see `render::classify_cell`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Null or absent value, shown as a non-interactive placeholder.
    Empty,
    /// Bounded thumbnail, lazily loaded, zoomable on hover.
    Image { url: String },
    /// External link opened in a new browsing context; the full URL doubles
    /// as the tooltip.
    Link { url: String, label: String },
    /// Text clamped to two lines with the full text as tooltip.
    LongText { text: String },
    /// Plain short text.
    Text { text: String },
}
