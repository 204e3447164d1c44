//! Parameter session: the authoritative parameter map for one model picker.
//!
//! The session wires the pieces together:
//!
//! ```text
//! select_model ──► coordinator ──► RuleStore::load(key)
//!                                        │ Settled(rules) for the current key
//!                                        ▼
//!                            reducer::initialize_from_rules ──► on_params_change
//! set_value / toggle / apply_tone ──► reducer ──────────────────► on_params_change
//! ```
//!
//! Reconciliation runs once per rule list the map has not yet been reconciled
//! against, and only while that list belongs to the current selection. The
//! session remembers the last `(key, rules)` pair it applied, so a settle that
//! lost the race against another selection is picked up on the next request
//! for that key. Stale, failed and incomplete outcomes leave the map alone.

mod builder;
mod trigger;

pub use builder::{Mimir, MimirBuilder};
pub use trigger::{TriggerProps, TriggerRenderer};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::cache::SharedRules;
use crate::coordinator::{ModelChange, ModelSelectionCoordinator, SelectionGates};
use crate::reducer::{self, Transition};
use crate::registry::{ModelCatalog, ToneTable, supports_preset_tones};
use crate::rules::{FetchTicket, RuleOutcome, RuleSnapshot, RuleStatus, RuleStore};
use crate::telemetry;
use crate::types::{
    CompletionParams, ModelSelection, ParameterName, ParameterRule, ParameterValue, RuleKey,
};

/// Host callback receiving every new parameter map.
pub type ParamsCallback = Arc<dyn Fn(&CompletionParams) + Send + Sync>;

/// Host callback receiving every model selection.
pub type ModelChangeCallback = Arc<dyn Fn(&ModelChange) + Send + Sync>;

/// Result of [`ParameterSession::select_model`] / [`ParameterSession::refresh`].
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub change: ModelChange,
    pub rules: RuleOutcome,
    reconciled: bool,
}

impl SelectionOutcome {
    /// Whether the parameter map was reconciled against new rules.
    pub fn reconciled(&self) -> bool {
        self.reconciled
    }
}

struct SessionState {
    coordinator: ModelSelectionCoordinator,
    params: CompletionParams,
    catalog: ModelCatalog,
    credential_configured: bool,
    advanced_mode: bool,
    /// Key and rule list the map was last reconciled against.
    reconciled: Option<(RuleKey, SharedRules)>,
}

/// Keeps a parameter map consistent with the selected model's rule schema.
///
/// Built with [`Mimir::builder()`]. All methods take `&self`; share it across
/// tasks behind an `Arc`.
pub struct ParameterSession {
    rules: RuleStore,
    tones: Arc<ToneTable>,
    state: Mutex<SessionState>,
    on_params_change: Option<ParamsCallback>,
    on_model_change: Option<ModelChangeCallback>,
}

impl ParameterSession {
    /// Select a model and bring the parameter map in line with its rules.
    ///
    /// Returns once this selection's rule request finished. If another
    /// selection happened meanwhile, the outcome is [`RuleOutcome::Stale`]
    /// and nothing was applied.
    pub async fn select_model(&self, provider: &str, model_id: &str) -> SelectionOutcome {
        // The ticket is issued under the session lock so the store's latest
        // request always matches the latest selection.
        let (change, ticket) = {
            let mut state = self.lock();
            let SessionState {
                coordinator,
                catalog,
                ..
            } = &mut *state;
            let change = coordinator.select_model(catalog, provider, model_id);
            (change, self.rules.begin(coordinator.key()))
        };
        info!(provider, model = model_id, mode = ?change.mode, "model selected");
        if let Some(callback) = &self.on_model_change {
            callback(&change);
        }

        let (rules, reconciled) = self.sync_rules(ticket).await;
        SelectionOutcome {
            change,
            rules,
            reconciled,
        }
    }

    /// Request the rules for the current selection again.
    ///
    /// This is the initial load for a session built with a selection, and the
    /// retry after a failed fetch.
    pub async fn refresh(&self) -> SelectionOutcome {
        let (selection, ticket) = {
            let state = self.lock();
            (
                state.coordinator.selection().clone(),
                self.rules.begin(state.coordinator.key()),
            )
        };
        let change = ModelChange {
            provider: selection.provider,
            model_id: selection.model_id,
            mode: selection.mode,
            features: selection.features,
        };
        let (rules, reconciled) = self.sync_rules(ticket).await;
        SelectionOutcome {
            change,
            rules,
            reconciled,
        }
    }

    async fn sync_rules(&self, ticket: FetchTicket) -> (RuleOutcome, bool) {
        let result = self.rules.resolve(&ticket).await;
        let outcome = self.rules.complete(ticket, result);
        let reconciled = match &outcome {
            RuleOutcome::Settled(_) | RuleOutcome::Unchanged => self.reconcile(),
            _ => false,
        };
        (outcome, reconciled)
    }

    /// Reconcile the map against the store's rule list if that list belongs
    /// to the current selection and has not been applied yet.
    fn reconcile(&self) -> bool {
        let next = {
            let mut state = self.lock();
            // Store lock nests inside the session lock, as in `select_model`.
            let snapshot = self.rules.snapshot();
            let key = match snapshot.rules_key {
                Some(key) if state.coordinator.key().as_ref() == Some(&key) => key,
                _ => {
                    debug!("selection changed before reconciliation");
                    return false;
                }
            };
            // An empty rule list keeps the session awaiting rules.
            if snapshot.rules.is_empty() {
                debug!(%key, "empty rule list, skipping reconciliation");
                return false;
            }
            let applied = state
                .reconciled
                .as_ref()
                .is_some_and(|(k, rules)| *k == key && rules[..] == snapshot.rules[..]);
            if applied {
                return false;
            }
            let passthrough = passthrough_keys(state.advanced_mode);
            let next =
                reducer::initialize_with_passthrough(&state.params, &snapshot.rules, &passthrough);
            state.params = next.clone();
            debug!(%key, count = next.len(), "parameters reconciled");
            state.reconciled = Some((key, snapshot.rules));
            next
        };
        self.emit(Transition::Initialize, &next);
        true
    }

    /// Set a parameter value.
    pub fn set_value(
        &self,
        name: impl Into<ParameterName>,
        value: ParameterValue,
    ) -> CompletionParams {
        self.transition(Transition::SetValue, |params| {
            reducer::set_value(params, name, value)
        })
    }

    /// Switch an optional parameter on (storing `assign_if_enabled`) or off.
    pub fn toggle(
        &self,
        name: impl Into<ParameterName>,
        enabled: bool,
        assign_if_enabled: ParameterValue,
    ) -> CompletionParams {
        self.transition(Transition::Toggle, |params| {
            reducer::toggle_parameter(params, name, enabled, assign_if_enabled)
        })
    }

    /// Apply a preset tone. Unknown ids change nothing and notify no one.
    pub fn apply_tone(&self, tone_id: u32) -> CompletionParams {
        match self.tones.patch(tone_id) {
            Some(patch) => self.transition(Transition::Preset, |params| {
                reducer::apply_preset(params, patch)
            }),
            None => {
                debug!(tone_id, "ignoring unknown preset tone");
                self.params()
            }
        }
    }

    /// Merge an arbitrary preset patch.
    pub fn apply_preset(&self, patch: &CompletionParams) -> CompletionParams {
        self.transition(Transition::Preset, |params| {
            reducer::apply_preset(params, patch)
        })
    }

    fn transition(
        &self,
        transition: Transition,
        f: impl FnOnce(&CompletionParams) -> CompletionParams,
    ) -> CompletionParams {
        let next = {
            let mut state = self.lock();
            let next = f(&state.params);
            state.params = next.clone();
            next
        };
        self.emit(transition, &next);
        next
    }

    fn emit(&self, transition: Transition, params: &CompletionParams) {
        metrics::counter!(telemetry::PARAM_TRANSITIONS_TOTAL,
            "transition" => transition.as_str(),
        )
        .increment(1);
        if let Some(callback) = &self.on_params_change {
            callback(params);
        }
    }

    /// Replace the whole map (e.g. a new debug session). Not reconciled and
    /// not reported to the change callback.
    pub fn replace_params(&self, params: CompletionParams) {
        self.lock().params = params;
    }

    pub fn params(&self) -> CompletionParams {
        self.lock().params.clone()
    }

    pub fn selection(&self) -> ModelSelection {
        self.lock().coordinator.selection().clone()
    }

    /// Replace the catalog; gates pick it up on the next read.
    pub fn set_catalog(&self, catalog: ModelCatalog) {
        self.lock().catalog = catalog;
    }

    pub fn set_credential_configured(&self, configured: bool) {
        self.lock().credential_configured = configured;
    }

    pub fn set_advanced_mode(&self, enabled: bool) {
        self.lock().advanced_mode = enabled;
    }

    pub fn advanced_mode(&self) -> bool {
        self.lock().advanced_mode
    }

    /// Gates for the current selection, catalog and credential flag.
    pub fn gates(&self) -> SelectionGates {
        let state = self.lock();
        state
            .coordinator
            .gates(&state.catalog, state.credential_configured)
    }

    /// Whether the tone picker applies to the selected provider.
    pub fn tones_available(&self) -> bool {
        supports_preset_tones(&self.lock().coordinator.selection().provider)
    }

    pub fn tones(&self) -> &ToneTable {
        &self.tones
    }

    pub fn rule_status(&self) -> RuleStatus {
        self.rules.status()
    }

    pub fn rule_snapshot(&self) -> RuleSnapshot {
        self.rules.snapshot()
    }

    /// The model's rules in display order.
    pub fn rules(&self) -> SharedRules {
        self.rules.rules()
    }

    /// Rules to render: the model's rules, plus the stop-sequences rule in
    /// advanced mode. Empty while there are no model rules.
    pub fn visible_rules(&self) -> Vec<ParameterRule> {
        let rules = self.rules.rules();
        if rules.is_empty() {
            return Vec::new();
        }
        let mut visible = rules.to_vec();
        if self.advanced_mode() {
            visible.push(ParameterRule::stop_sequences());
        }
        visible
    }

    /// Props for a host-supplied trigger renderer.
    pub fn trigger_props(&self, open: bool) -> TriggerProps {
        let state = self.lock();
        let selection = state.coordinator.selection();
        let (current_provider, current_model) = state.coordinator.current_entries(&state.catalog);
        let gates = state
            .coordinator
            .gates(&state.catalog, state.credential_configured);
        TriggerProps {
            open,
            disabled: gates.disabled,
            model_disabled: gates.model_disabled,
            has_deprecated: gates.has_deprecated,
            current_provider: current_provider.cloned(),
            current_model: current_model.cloned(),
            provider_name: selection.provider.clone(),
            model_id: selection.model_id.clone(),
        }
    }

    /// Hand the current trigger props to `renderer`.
    pub fn render_trigger<R: TriggerRenderer>(&self, renderer: &R, open: bool) -> R::Output {
        renderer.render(&self.trigger_props(open))
    }

    // Transitions replace fields wholesale, so a poisoned guard still holds
    // a consistent state.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn passthrough_keys(advanced_mode: bool) -> Vec<ParameterName> {
    if advanced_mode {
        vec![ParameterName::Stop]
    } else {
        Vec::new()
    }
}
