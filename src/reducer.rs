//! Pure parameter-map transitions.
//!
//! Every function takes the current map by reference and returns a new one;
//! neither the map nor the rule list is mutated in place. The session is
//! the only caller that stores results and notifies the host.

use crate::types::{CompletionParams, ParameterName, ParameterRule, ParameterValue};

/// The transitions the host is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Initialize,
    SetValue,
    Toggle,
    Preset,
}

impl Transition {
    /// Metric label for this transition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::SetValue => "set_value",
            Self::Toggle => "toggle",
            Self::Preset => "preset",
        }
    }
}

/// Reconcile `current` against a freshly settled rule list.
///
/// - Rules whose name is unset (absent or `null`) get their default, or are
///   removed when they have none.
/// - Rules already holding a value keep it.
/// - Keys not named by any rule are dropped.
///
/// Idempotent: applying it to its own output changes nothing.
pub fn initialize_from_rules(
    current: &CompletionParams,
    rules: &[ParameterRule],
) -> CompletionParams {
    initialize_with_passthrough(current, rules, &[])
}

/// [`initialize_from_rules`] with extra keys that are neither defaulted nor
/// dropped (the advanced-mode `stop` key).
pub fn initialize_with_passthrough(
    current: &CompletionParams,
    rules: &[ParameterRule],
    passthrough: &[ParameterName],
) -> CompletionParams {
    let mut next = current.clone();
    next.retain(|name, _| passthrough.contains(name) || rules.iter().any(|r| &r.name == name));

    for rule in rules {
        if passthrough.contains(&rule.name) || next.is_set(&rule.name) {
            continue;
        }
        match rule.default_value() {
            Some(default) => {
                next.insert(rule.name.clone(), default.clone());
            }
            None => {
                next.remove(&rule.name);
            }
        }
    }
    next
}

/// Set `name` to `value`; the name need not exist in the rule list.
pub fn set_value(
    current: &CompletionParams,
    name: impl Into<ParameterName>,
    value: ParameterValue,
) -> CompletionParams {
    let mut next = current.clone();
    next.insert(name, value);
    next
}

/// Switch an optional parameter on (with `assign_if_enabled`) or off.
///
/// Switching off removes the key entirely rather than storing a falsy value.
pub fn toggle_parameter(
    current: &CompletionParams,
    name: impl Into<ParameterName>,
    enabled: bool,
    assign_if_enabled: ParameterValue,
) -> CompletionParams {
    let name = name.into();
    let mut next = current.clone();
    if enabled {
        next.insert(name, assign_if_enabled);
    } else {
        next.remove(&name);
    }
    next
}

/// Right-biased shallow merge: every key in `patch` overwrites `current`.
pub fn apply_preset(current: &CompletionParams, patch: &CompletionParams) -> CompletionParams {
    let mut next = current.clone();
    for (name, value) in patch {
        next.insert(name.clone(), value.clone());
    }
    next
}
