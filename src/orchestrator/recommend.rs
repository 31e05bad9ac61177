//! Tour recommendation flow: one prediction request, one ranked outcome.

use crate::gateway::{Backend, TransportError};
use crate::model::RecommendationItem;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a prediction request, ready for presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    /// Input rejected before any network call.
    Invalid { message: String },
    /// Backend reported a payload-level failure.
    Failed { message: String },
    /// Valid response, but nothing to recommend for this client.
    NoRecommendations,
    /// Ranked list, highest score first, order as returned by the backend.
    Ranked(Vec<RecommendationItem>),
}

pub struct RecommendationOrchestrator {
    backend: Arc<dyn Backend>,
}

impl RecommendationOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Request recommendations for a client identifier.
    pub async fn predict(
        &self,
        client_identifier: &str,
    ) -> Result<PredictionOutcome, TransportError> {
        let id = client_identifier.trim();
        if id.is_empty() {
            return Ok(PredictionOutcome::Invalid {
                message: "Please enter a client URI".into(),
            });
        }

        let payload = self.backend.predict(id).await?;
        debug!("prediction response received");
        Ok(interpret(payload))
    }
}

fn interpret(payload: Value) -> PredictionOutcome {
    if let Some(err) = payload.get("error") {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return PredictionOutcome::Failed { message };
    }

    match payload {
        Value::Array(items) if items.is_empty() => PredictionOutcome::NoRecommendations,
        Value::Array(items) => {
            match serde_json::from_value::<Vec<RecommendationItem>>(Value::Array(items)) {
                Ok(ranked) => PredictionOutcome::Ranked(ranked),
                Err(e) => PredictionOutcome::Failed {
                    message: format!("unrecognized prediction response: {e}"),
                },
            }
        }
        _ => PredictionOutcome::Failed {
            message: "unrecognized prediction response".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testutil::ScriptedBackend;
    use serde_json::json;

    #[tokio::test]
    async fn empty_identifier_issues_no_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let rec = RecommendationOrchestrator::new(backend.clone());

        for input in ["", "   ", "\t\n"] {
            match rec.predict(input).await.unwrap() {
                PredictionOutcome::Invalid { message } => {
                    assert!(message.contains("client URI"))
                }
                other => panic!("expected validation failure, got {other:?}"),
            }
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn identifier_is_trimmed_before_sending() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(json!([]))]));
        let rec = RecommendationOrchestrator::new(backend.clone());

        rec.predict("  http://x#Client_1  ").await.unwrap();

        assert_eq!(backend.calls(), vec![(
            "predict",
            json!({"client_uri": "http://x#Client_1"})
        )]);
    }

    #[tokio::test]
    async fn empty_array_is_no_recommendations_not_an_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(json!([]))]));
        let rec = RecommendationOrchestrator::new(backend);

        assert_eq!(
            rec.predict("http://x#Client_1").await.unwrap(),
            PredictionOutcome::NoRecommendations
        );
    }

    #[tokio::test]
    async fn error_payload_is_a_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            json!({"error": "unknown client"}),
        )]));
        let rec = RecommendationOrchestrator::new(backend);

        assert_eq!(
            rec.predict("http://x#Client_9").await.unwrap(),
            PredictionOutcome::Failed {
                message: "unknown client".into()
            }
        );
    }

    #[tokio::test]
    async fn ranked_list_preserves_backend_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(json!([
            {"tour_uri": "http://x#Tour_A", "label": "Alps", "score": 0.97},
            {"tour_uri": "http://x#Tour_B", "label": "Brittany", "score": 0.64}
        ]))]));
        let rec = RecommendationOrchestrator::new(backend);

        match rec.predict("http://x#Client_1").await.unwrap() {
            PredictionOutcome::Ranked(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].short_name(), "Tour_A");
                assert_eq!(items[0].score_percent(), "97.0%");
                assert_eq!(items[1].label, "Brittany");
            }
            other => panic!("expected ranked list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(
            ScriptedBackend::transport_failure("/prediction"),
        )]));
        let rec = RecommendationOrchestrator::new(backend);

        assert!(rec.predict("http://x#Client_1").await.is_err());
    }
}
