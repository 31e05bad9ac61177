//! Flow controllers between the gateway and the presentation layers.
//!
//! Each view has one orchestrator owning its state and network lifecycle:
//! chat turns, console query runs, and recommendation requests. UI layers
//! call plain async methods and draw the returned outcomes; nothing in here
//! touches a terminal or event system.

mod chat;
mod console;
mod recommend;

pub use chat::{strip_code_fences, ConversationOrchestrator, SubmitOutcome};
pub(crate) use chat::extract_query;
#[cfg(feature = "tui")]
pub(crate) use chat::PENDING_TEXT;
pub use console::{ConsoleOutput, QueryConsoleOrchestrator};
pub use recommend::{PredictionOutcome, RecommendationOrchestrator};
