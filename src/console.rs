//! Console API client: parameter rules and the text-generation model catalog.
//!
//! Endpoints (relative to the console base URL):
//! - `GET /workspaces/current/model-providers/{provider}/models/parameter-rules?model={model}`
//! - `GET /workspaces/current/models/model-types/llm`
//!
//! Both respond with a `{ "data": [...] }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::registry::ModelCatalog;
use crate::rules::{RuleFetcher, parse_rules_payload};
use crate::types::{CatalogProvider, ParameterRule, RuleKey};
use crate::{MimirError, Result};

/// Default console base URL (a local self-hosted console).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/console/api";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the console API.
#[derive(Clone)]
pub struct ConsoleClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl ConsoleClient {
    /// Create a client for `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MimirError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the ordered parameter rules for `provider`/`model`.
    #[instrument(skip(self))]
    pub async fn parameter_rules(&self, provider: &str, model: &str) -> Result<Vec<ParameterRule>> {
        let url = format!(
            "{}/workspaces/current/model-providers/{provider}/models/parameter-rules",
            self.base_url
        );
        let response = self.get(&url).query(&[("model", model)]).send().await?;
        let body = Self::checked(response).await?.text().await?;
        let rules = parse_rules_payload(&body)?;
        debug!(count = rules.len(), "received parameter rules");
        Ok(rules)
    }

    /// Fetch the providers and models available for text generation.
    #[instrument(skip(self))]
    pub async fn text_generation_models(&self) -> Result<ModelCatalog> {
        let url = format!("{}/workspaces/current/models/model-types/llm", self.base_url);
        let response = self.get(&url).send().await?;
        let body = Self::checked(response).await?.text().await?;
        parse_catalog_payload(&body)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn checked(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status.as_u16() {
            401 => Err(MimirError::AuthenticationFailed),
            code => {
                let message = response.text().await.unwrap_or_default();
                Err(MimirError::Api {
                    status: code,
                    message: if message.is_empty() {
                        status.to_string()
                    } else {
                        message
                    },
                })
            }
        }
    }
}

#[async_trait]
impl RuleFetcher for ConsoleClient {
    fn name(&self) -> &str {
        "console"
    }

    async fn fetch_rules(&self, key: &RuleKey) -> Result<Vec<ParameterRule>> {
        self.parameter_rules(key.provider(), key.model()).await
    }
}

/// Parse a `{ "data": [provider, ...] }` catalog envelope.
///
/// A missing or null `data` field yields an empty catalog; any other
/// non-array `data` is rejected.
pub fn parse_catalog_payload(body: &str) -> Result<ModelCatalog> {
    let payload: Value = serde_json::from_str(body)?;
    let providers = match payload.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(data @ Value::Array(_)) => Vec::<CatalogProvider>::deserialize(data)?,
        Some(other) => {
            return Err(MimirError::InvalidPayload(format!(
                "catalog `data` must be an array, got {}",
                json_kind(other)
            )));
        }
    };
    Ok(providers.into())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ConsoleClient::new("http://localhost:5001/console/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001/console/api");
    }

    #[test]
    fn catalog_payload_parses() {
        let body = r#"{"data": [{"provider": "openai", "models": [
            {"model": "gpt-4o", "status": "active", "model_properties": {"mode": "chat"}}
        ]}]}"#;
        let catalog = parse_catalog_payload(body).unwrap();
        let (_, model) = catalog.lookup("openai", "gpt-4o");
        assert_eq!(model.unwrap().mode(), Some("chat"));
    }

    #[test]
    fn catalog_payload_without_data_is_empty() {
        assert!(parse_catalog_payload("{}").unwrap().is_empty());
        assert!(parse_catalog_payload(r#"{"data": null}"#).unwrap().is_empty());
    }

    #[test]
    fn catalog_payload_with_non_array_data_is_invalid() {
        let err = parse_catalog_payload(r#"{"data": {"provider": "openai"}}"#).unwrap_err();
        match err {
            MimirError::InvalidPayload(message) => assert!(message.contains("object")),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }
}
