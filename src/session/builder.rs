//! Builder for parameter sessions

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ModelChangeCallback, ParameterSession, ParamsCallback, SessionState};
use crate::cache::CacheConfig;
use crate::console::{ConsoleClient, DEFAULT_TIMEOUT};
use crate::coordinator::{ModelChange, ModelSelectionCoordinator};
use crate::registry::{ModelCatalog, ToneTable};
use crate::rules::{RuleFetcher, RuleStore};
use crate::types::{CompletionParams, ModelSelection};
use crate::{MimirError, Result};

/// Main entry point for creating parameter sessions.
pub struct Mimir;

impl Mimir {
    /// Create a new builder for configuring a session.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }
}

/// Builder for configuring a [`ParameterSession`].
pub struct MimirBuilder {
    fetcher: Option<Arc<dyn RuleFetcher>>,
    console_url: Option<String>,
    api_token: Option<String>,
    timeout: Duration,
    cache: CacheConfig,
    catalog: ModelCatalog,
    tones: Option<Arc<ToneTable>>,
    credential_configured: bool,
    advanced_mode: bool,
    params: CompletionParams,
    selection: Option<ModelSelection>,
    on_params_change: Option<ParamsCallback>,
    on_model_change: Option<ModelChangeCallback>,
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            console_url: None,
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
            cache: CacheConfig::default(),
            catalog: ModelCatalog::default(),
            tones: None,
            credential_configured: true,
            advanced_mode: false,
            params: CompletionParams::new(),
            selection: None,
            on_params_change: None,
            on_model_change: None,
        }
    }

    /// Use a custom rule source.
    pub fn fetcher(mut self, fetcher: Arc<dyn RuleFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Fetch rules from the console API at `base_url`.
    pub fn console(mut self, base_url: impl Into<String>) -> Self {
        self.console_url = Some(base_url.into());
        self
    }

    /// Bearer token for the console API.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Console request timeout (default: 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Provider/model catalog used for selection metadata and gates.
    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the built-in tone table.
    pub fn tones(mut self, tones: Arc<ToneTable>) -> Self {
        self.tones = Some(tones);
        self
    }

    /// Whether the provider credential is configured (default: true).
    pub fn credential_configured(mut self, configured: bool) -> Self {
        self.credential_configured = configured;
        self
    }

    /// Advanced mode keeps user-supplied `stop` sequences across
    /// reconciliation.
    pub fn advanced_mode(mut self, enabled: bool) -> Self {
        self.advanced_mode = enabled;
        self
    }

    /// Initial parameter map, e.g. restored from a saved session.
    pub fn params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    /// Initial selection. Call [`ParameterSession::refresh`] to load its rules.
    pub fn selection(mut self, provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        self.selection = Some(ModelSelection::new(provider, model_id));
        self
    }

    /// Called with the new map after every transition.
    pub fn on_params_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&CompletionParams) + Send + Sync + 'static,
    {
        self.on_params_change = Some(Arc::new(f));
        self
    }

    /// Called after every model selection.
    pub fn on_model_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&ModelChange) + Send + Sync + 'static,
    {
        self.on_model_change = Some(Arc::new(f));
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Configuration`] when neither a fetcher nor a
    /// console URL was configured, or the HTTP client cannot be built.
    pub fn build(self) -> Result<ParameterSession> {
        let fetcher: Arc<dyn RuleFetcher> = match (self.fetcher, self.console_url) {
            (Some(fetcher), _) => fetcher,
            (None, Some(url)) => {
                let mut client = ConsoleClient::with_timeout(url, self.timeout)?;
                if let Some(token) = self.api_token {
                    client = client.api_token(token);
                }
                Arc::new(client)
            }
            (None, None) => {
                return Err(MimirError::Configuration(
                    "no rule source configured; call .fetcher() or .console()".into(),
                ));
            }
        };

        let mut coordinator = ModelSelectionCoordinator::default();
        if let Some(selection) = self.selection {
            coordinator.select_model(&self.catalog, &selection.provider, &selection.model_id);
        }

        Ok(ParameterSession {
            rules: RuleStore::new(fetcher, &self.cache),
            tones: self.tones.unwrap_or_else(ToneTable::builtin),
            state: Mutex::new(SessionState {
                coordinator,
                params: self.params,
                catalog: self.catalog,
                credential_configured: self.credential_configured,
                advanced_mode: self.advanced_mode,
                reconciled: None,
            }),
            on_params_change: self.on_params_change,
            on_model_change: self.on_model_change,
        })
    }
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_rule_source_fails() {
        let err = Mimir::builder().build().err().unwrap();
        assert!(matches!(err, MimirError::Configuration(_)));
    }

    #[test]
    fn initial_selection_is_applied() {
        let session = Mimir::builder()
            .console("http://localhost:5001/console/api")
            .selection("openai", "gpt-4o")
            .build()
            .unwrap();
        assert_eq!(session.selection().model_id, "gpt-4o");
        assert!(session.params().is_empty());
    }
}
