//! HTTP access to the TourGraph backend.
//!
//! One configured reqwest client issuing the five POST endpoints. The gateway
//! reports transport problems only: a successfully decoded body is returned
//! verbatim, backend error payloads included, and discriminating those is the
//! caller's job.

use crate::model::{ApiConfig, EnrichmentField};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// The five backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AskAssistant,
    TextToQuery,
    ExecuteQuery,
    EnrichQuery,
    Predict,
}

impl Endpoint {
    /// Wire path under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AskAssistant => "/ask",
            Endpoint::TextToQuery => "/text-to-sparql",
            Endpoint::ExecuteQuery => "/query",
            Endpoint::EnrichQuery => "/enrich",
            Endpoint::Predict => "/prediction",
        }
    }
}

/// Network or HTTP-level failure. No usable body reached the caller; payload
/// errors inside a decoded body are not represented here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} returned HTTP {status}")]
    Status {
        path: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("could not decode {path} response: {source}")]
    Decode {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// The calls the orchestrators make, as an injectable seam so flows can be
/// exercised without a live backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Value, TransportError>;
    async fn translate(&self, text: &str) -> Result<Value, TransportError>;
    async fn execute(&self, query: &str) -> Result<Value, TransportError>;
    async fn enrich(
        &self,
        query: &str,
        fields: &[EnrichmentField],
    ) -> Result<Value, TransportError>;
    async fn predict(&self, client_uri: &str) -> Result<Value, TransportError>;
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct EnrichRequest<'a> {
    query: &'a str,
    fields: &'a [EnrichmentField],
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    client_uri: &'a str,
}

/// Production [`Backend`] over HTTP.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
}

impl Gateway {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue one request/response exchange. No retry; the only timeout is the
    /// client-level one from [`ApiConfig`].
    async fn send<P: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        payload: &P,
    ) -> Result<Value, TransportError> {
        let path = endpoint.path();
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "sending request");

        let resp = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| TransportError::Request { path, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status { path, status });
        }

        resp.json::<Value>()
            .await
            .map_err(|source| TransportError::Decode { path, source })
    }
}

#[async_trait]
impl Backend for Gateway {
    async fn ask(&self, question: &str) -> Result<Value, TransportError> {
        self.send(Endpoint::AskAssistant, &AskRequest { question })
            .await
    }

    async fn translate(&self, text: &str) -> Result<Value, TransportError> {
        self.send(Endpoint::TextToQuery, &TranslateRequest { text })
            .await
    }

    async fn execute(&self, query: &str) -> Result<Value, TransportError> {
        self.send(Endpoint::ExecuteQuery, &QueryRequest { query })
            .await
    }

    async fn enrich(
        &self,
        query: &str,
        fields: &[EnrichmentField],
    ) -> Result<Value, TransportError> {
        self.send(Endpoint::EnrichQuery, &EnrichRequest { query, fields })
            .await
    }

    async fn predict(&self, client_uri: &str) -> Result<Value, TransportError> {
        self.send(Endpoint::Predict, &PredictRequest { client_uri })
            .await
    }
}
