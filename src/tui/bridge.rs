//! Command/event bridge between the UI thread and the orchestrators.
//!
//! The UI thread sends [`UiCommand`]s and consumes [`UiEvent`]s; this task
//! owns the orchestrators and drives the network lifecycle. Chat and
//! prediction commands are handled in order on this task. Console runs are
//! spawned, so they may overlap and complete out of order; the UI keeps
//! whichever result arrived last.

use crate::gateway::Backend;
use crate::model::{ConversationTurn, EnrichmentField, Mode};
use crate::orchestrator::{
    ConsoleOutput, ConversationOrchestrator, PredictionOutcome, QueryConsoleOrchestrator,
    RecommendationOrchestrator,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by the UI thread.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    SetMode(Mode),
    Submit(String),
    RunQuery {
        query: String,
        enrich: bool,
        selection: Vec<EnrichmentField>,
    },
    Predict(String),
    Quit,
}

/// Events consumed by the UI thread.
#[derive(Debug, Clone)]
pub(crate) enum UiEvent {
    /// A chat turn was accepted; the UI mirrors the user and pending turns
    /// until the final history snapshot arrives.
    TurnStarted { user_text: String },
    /// Snapshot after a completed turn or a mode switch.
    ChatUpdated {
        history: Vec<ConversationTurn>,
        mode: Mode,
    },
    ConsoleFinished {
        result: Result<ConsoleOutput, String>,
    },
    PredictionFinished {
        result: Result<PredictionOutcome, String>,
    },
}

/// Process UI commands until quit or channel close.
pub(crate) async fn run_bridge(
    backend: Arc<dyn Backend>,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut chat = ConversationOrchestrator::new(backend.clone());
    let console = Arc::new(QueryConsoleOrchestrator::new(backend.clone()));
    let recommend = RecommendationOrchestrator::new(backend);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::SetMode(mode) => {
                chat.set_mode(mode);
                let _ = event_tx.send(UiEvent::ChatUpdated {
                    history: chat.history().to_vec(),
                    mode: chat.mode(),
                });
            }
            UiCommand::Submit(text) => {
                let _ = event_tx.send(UiEvent::TurnStarted {
                    user_text: text.clone(),
                });
                chat.submit(&text).await;
                let _ = event_tx.send(UiEvent::ChatUpdated {
                    history: chat.history().to_vec(),
                    mode: chat.mode(),
                });
            }
            UiCommand::RunQuery {
                query,
                enrich,
                selection,
            } => {
                let console = console.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    let result = console
                        .run(&query, enrich, &selection)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(UiEvent::ConsoleFinished { result });
                });
            }
            UiCommand::Predict(client_uri) => {
                let result = recommend
                    .predict(&client_uri)
                    .await
                    .map_err(|e| e.to_string());
                let _ = event_tx.send(UiEvent::PredictionFinished { result });
            }
            UiCommand::Quit => break,
        }
    }

    Ok(())
}
