//! Model catalog and preset tones: the read-only tables the session
//! consults.
//!
//! - [`ModelCatalog`] lists providers and their text-generation models, as
//!   reported by the console (`/workspaces/current/models/model-types/llm`).
//!   It may lag behind the selection; lookups degrade to `None`.
//! - [`preset::ToneTable`] holds the preset tones a user can apply in one go.

pub mod preset;

pub use preset::{PROVIDERS_WITH_PRESET_TONE, PresetTone, ToneTable, supports_preset_tones};

use serde::{Deserialize, Serialize};

use crate::types::{CatalogModel, CatalogProvider};

/// Providers → models table used to resolve a selection's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    providers: Vec<CatalogProvider>,
}

impl ModelCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_provider(mut self, provider: CatalogProvider) -> Self {
        self.insert(provider);
        self
    }

    /// Insert a provider, replacing any existing entry with the same name.
    pub fn insert(&mut self, provider: CatalogProvider) {
        match self
            .providers
            .iter_mut()
            .find(|p| p.provider == provider.provider)
        {
            Some(existing) => *existing = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn provider(&self, provider: &str) -> Option<&CatalogProvider> {
        self.providers.iter().find(|p| p.provider == provider)
    }

    /// Look up both the provider and the model entry.
    ///
    /// The model is only searched under the given provider; a model with the
    /// same name under another provider does not match.
    pub fn lookup(
        &self,
        provider: &str,
        model: &str,
    ) -> (Option<&CatalogProvider>, Option<&CatalogModel>) {
        let entry = self.provider(provider);
        let model = entry.and_then(|p| p.find_model(model));
        (entry, model)
    }

    pub fn providers(&self) -> &[CatalogProvider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl From<Vec<CatalogProvider>> for ModelCatalog {
    fn from(providers: Vec<CatalogProvider>) -> Self {
        let mut catalog = Self::new();
        for provider in providers {
            catalog.insert(provider);
        }
        catalog
    }
}
