//! Model selection and catalog entry types.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::LocalizedText;

/// Cache identity for a model's rule list: `(provider, model)`.
///
/// Only constructible when both parts are non-empty; an incomplete
/// selection has no key and never triggers a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    provider: String,
    model: String,
}

impl RuleKey {
    /// Build a key, or `None` if either part is empty.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Option<Self> {
        let provider = provider.into();
        let model = model.into();
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self { provider, model })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// The currently selected model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub provider: String,
    pub model_id: String,
    /// Completion mode from the catalog (e.g. `"chat"`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl ModelSelection {
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_id: model_id.into(),
            mode: None,
            features: BTreeSet::new(),
        }
    }

    /// Rule cache key, `None` while the selection is incomplete.
    pub fn key(&self) -> Option<RuleKey> {
        RuleKey::new(self.provider.as_str(), self.model_id.as_str())
    }
}

/// Availability status of a catalog model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelStatus {
    Active,
    NoConfigure,
    QuotaExceeded,
    NoPermission,
    Disabled,
    CredentialRemoved,
    #[serde(other)]
    Unknown,
}

impl ModelStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A model entry in the provider catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogModel {
    pub model: String,
    #[serde(default, skip_serializing_if = "LocalizedText::is_empty")]
    pub label: LocalizedText,
    pub status: ModelStatus,
    #[serde(default)]
    pub features: Vec<String>,
    /// Free-form properties; `mode` and `context_size` are the common ones.
    #[serde(default)]
    pub model_properties: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub deprecated: bool,
}

impl CatalogModel {
    pub fn new(model: impl Into<String>, status: ModelStatus) -> Self {
        Self {
            model: model.into(),
            label: LocalizedText::default(),
            status,
            features: Vec::new(),
            model_properties: HashMap::new(),
            deprecated: false,
        }
    }

    /// Set the completion mode property.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.model_properties
            .insert("mode".to_string(), serde_json::Value::String(mode.into()));
        self
    }

    /// Add a feature flag (e.g. `"vision"`, `"tool-call"`).
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
        self
    }

    /// The `mode` model property, if it is a string.
    pub fn mode(&self) -> Option<&str> {
        self.model_properties.get("mode").and_then(|v| v.as_str())
    }
}

/// A provider with its text-generation models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProvider {
    pub provider: String,
    #[serde(default, skip_serializing_if = "LocalizedText::is_empty")]
    pub label: LocalizedText,
    #[serde(default)]
    pub models: Vec<CatalogModel>,
}

impl CatalogProvider {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            label: LocalizedText::default(),
            models: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: CatalogModel) -> Self {
        self.models.push(model);
        self
    }

    pub fn find_model(&self, model: &str) -> Option<&CatalogModel> {
        self.models.iter().find(|m| m.model == model)
    }
}
