//! Query console: raw or enriched execution with field selection.
//!
//! Runs take `&self`, so callers may overlap them; the presentation shows
//! whichever run completed last. With out-of-order completion that can
//! briefly be a stale result — the console is user-paced, so this is
//! tolerated rather than guarded the way chat turns are.

use crate::gateway::{Backend, TransportError};
use crate::model::{DisplayDocument, EnrichmentField};
use crate::render;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one console run, ready for a presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleOutput {
    pub document: DisplayDocument,
    /// Number of rows, present only when the response was an array.
    pub row_count: Option<usize>,
}

pub struct QueryConsoleOrchestrator {
    backend: Arc<dyn Backend>,
}

impl QueryConsoleOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Execute the query, optionally through the enrichment endpoint with the
    /// selected fields.
    pub async fn run(
        &self,
        query_text: &str,
        enrich: bool,
        selection: &[EnrichmentField],
    ) -> Result<ConsoleOutput, TransportError> {
        debug!(enrich, fields = selection.len(), "console run");
        let payload = if enrich {
            self.backend.enrich(query_text, selection).await?
        } else {
            self.backend.execute(query_text).await?
        };

        let row_count = payload.as_array().map(|rows| rows.len());
        Ok(ConsoleOutput {
            document: render::render(&payload),
            row_count,
        })
    }
}
