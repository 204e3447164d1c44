//! Model selection: the selected `(provider, model, mode, features)` tuple
//! and the gates derived from it.
//!
//! Gates are recomputed from `(catalog, selection, credential flag)` on every
//! call and never stored, so a late catalog update shows up immediately.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::registry::ModelCatalog;
use crate::types::{CatalogModel, CatalogProvider, ModelSelection, RuleKey};

/// What the host is told after a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelChange {
    pub provider: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub features: BTreeSet<String>,
}

/// Availability flags the host UI consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionGates {
    /// The selected provider or model is missing from the catalog.
    pub has_deprecated: bool,
    /// The model entry is missing or not `active`.
    pub model_disabled: bool,
    /// No credential, deprecated, or model disabled.
    pub disabled: bool,
}

impl SelectionGates {
    /// Derive the gates for `provider`/`model` against `catalog`.
    pub fn compute(
        catalog: &ModelCatalog,
        provider: &str,
        model: &str,
        credential_configured: bool,
    ) -> Self {
        let (provider_entry, model_entry) = catalog.lookup(provider, model);
        let has_deprecated = provider_entry.is_none() || model_entry.is_none();
        let model_disabled = !model_entry.is_some_and(|m| m.status.is_active());
        Self {
            has_deprecated,
            model_disabled,
            disabled: !credential_configured || has_deprecated || model_disabled,
        }
    }
}

/// Owns the current [`ModelSelection`].
#[derive(Debug, Clone, Default)]
pub struct ModelSelectionCoordinator {
    selection: ModelSelection,
}

impl ModelSelectionCoordinator {
    pub fn new(selection: ModelSelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    /// Rule key of the current selection.
    pub fn key(&self) -> Option<RuleKey> {
        self.selection.key()
    }

    /// Select `model_id` under `provider`.
    ///
    /// Mode and features come from the catalog entry; when the entry is not
    /// (yet) in the catalog they degrade to `None` and an empty set.
    pub fn select_model(
        &mut self,
        catalog: &ModelCatalog,
        provider: &str,
        model_id: &str,
    ) -> ModelChange {
        let (_, entry) = catalog.lookup(provider, model_id);
        let mode = entry.and_then(CatalogModel::mode).map(str::to_owned);
        let features: BTreeSet<String> = entry
            .map(|m| m.features.iter().cloned().collect())
            .unwrap_or_default();

        self.selection = ModelSelection {
            provider: provider.to_owned(),
            model_id: model_id.to_owned(),
            mode: mode.clone(),
            features: features.clone(),
        };

        ModelChange {
            provider: provider.to_owned(),
            model_id: model_id.to_owned(),
            mode,
            features,
        }
    }

    /// Gates for the current selection.
    pub fn gates(&self, catalog: &ModelCatalog, credential_configured: bool) -> SelectionGates {
        SelectionGates::compute(
            catalog,
            &self.selection.provider,
            &self.selection.model_id,
            credential_configured,
        )
    }

    /// Catalog entries for the current selection.
    pub fn current_entries<'a>(
        &self,
        catalog: &'a ModelCatalog,
    ) -> (Option<&'a CatalogProvider>, Option<&'a CatalogModel>) {
        catalog.lookup(&self.selection.provider, &self.selection.model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelStatus;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new().with_provider(
            CatalogProvider::new("openai")
                .with_model(
                    CatalogModel::new("gpt-4o", ModelStatus::Active)
                        .with_mode("chat")
                        .with_feature("vision")
                        .with_feature("tool-call"),
                )
                .with_model(CatalogModel::new("gpt-3.5-turbo-instruct", ModelStatus::QuotaExceeded)),
        )
    }

    #[test]
    fn select_known_model_carries_metadata() {
        let mut coordinator = ModelSelectionCoordinator::default();
        let change = coordinator.select_model(&catalog(), "openai", "gpt-4o");

        assert_eq!(change.mode.as_deref(), Some("chat"));
        assert!(change.features.contains("vision"));
        assert_eq!(coordinator.selection().features.len(), 2);
        assert_eq!(coordinator.key(), RuleKey::new("openai", "gpt-4o"));
    }

    #[test]
    fn select_unknown_model_degrades() {
        let mut coordinator = ModelSelectionCoordinator::default();
        let change = coordinator.select_model(&catalog(), "openai", "gpt-5");

        assert_eq!(change.mode, None);
        assert!(change.features.is_empty());
        assert_eq!(coordinator.selection().model_id, "gpt-5");
    }

    #[test]
    fn gates_for_active_model() {
        let gates = SelectionGates::compute(&catalog(), "openai", "gpt-4o", true);
        assert_eq!(gates, SelectionGates::default());
    }

    #[test]
    fn gates_without_credential() {
        let gates = SelectionGates::compute(&catalog(), "openai", "gpt-4o", false);
        assert!(!gates.has_deprecated);
        assert!(!gates.model_disabled);
        assert!(gates.disabled);
    }

    #[test]
    fn gates_for_inactive_model() {
        let gates = SelectionGates::compute(&catalog(), "openai", "gpt-3.5-turbo-instruct", true);
        assert!(!gates.has_deprecated);
        assert!(gates.model_disabled);
        assert!(gates.disabled);
    }

    #[test]
    fn gates_for_missing_entries() {
        let gates = SelectionGates::compute(&catalog(), "cohere", "command-r", true);
        assert!(gates.has_deprecated);
        assert!(gates.model_disabled);
        assert!(gates.disabled);
    }

    #[test]
    fn gates_follow_catalog_updates() {
        let mut coordinator = ModelSelectionCoordinator::default();
        let empty = ModelCatalog::new();
        coordinator.select_model(&empty, "openai", "gpt-4o");
        assert!(coordinator.gates(&empty, true).has_deprecated);
        assert!(!coordinator.gates(&catalog(), true).has_deprecated);
    }
}
