//! Integration tests for the pure parameter-map transitions.

use serde_json::{Value, json};

use mimir::reducer::{
    apply_preset, initialize_from_rules, initialize_with_passthrough, set_value, toggle_parameter,
};
use mimir::{CompletionParams, ParameterName, ParameterRule, ParameterType};

fn params(value: Value) -> CompletionParams {
    serde_json::from_value(value).unwrap()
}

fn temperature_and_top_p() -> Vec<ParameterRule> {
    vec![
        ParameterRule::new("temperature", ParameterType::Float).with_default(0.7),
        ParameterRule::new("top_p", ParameterType::Float),
    ]
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn defaults_fill_empty_map() {
    let result = initialize_from_rules(&CompletionParams::new(), &temperature_and_top_p());
    assert_eq!(result, params(json!({"temperature": 0.7})));
    assert!(!result.contains(&ParameterName::TopP));
}

#[test]
fn user_value_survives_initialization() {
    let current = params(json!({"temperature": 0.9}));
    let result = initialize_from_rules(&current, &temperature_and_top_p());
    assert_eq!(result, current);
}

#[test]
fn orphaned_key_is_removed() {
    let current = params(json!({"temperature": 0.9, "max_tokens": 100}));
    let result = initialize_from_rules(&current, &temperature_and_top_p());
    assert_eq!(result, params(json!({"temperature": 0.9})));
}

#[test]
fn toggle_stop_on_and_off() {
    let on = toggle_parameter(&CompletionParams::new(), "stop", true, json!([]));
    assert_eq!(on, params(json!({"stop": []})));

    let off = toggle_parameter(&on, "stop", false, json!([]));
    assert!(off.is_empty());
}

#[test]
fn preset_overwrites_and_preserves() {
    let current = params(json!({"temperature": 0.9, "frequency_penalty": 0.1}));
    let patch = params(json!({"temperature": 0.2, "top_p": 0.9}));
    let result = apply_preset(&current, &patch);
    assert_eq!(
        result,
        params(json!({"temperature": 0.2, "top_p": 0.9, "frequency_penalty": 0.1}))
    );
}

// =============================================================================
// Properties
// =============================================================================

fn sample_maps() -> Vec<CompletionParams> {
    vec![
        CompletionParams::new(),
        params(json!({"temperature": 0.1})),
        params(json!({"temperature": null, "top_p": 0.5})),
        params(json!({"max_tokens": 100, "seed": 7, "stop": ["###"]})),
        params(json!({"temperature": 0, "top_p": false, "presence_penalty": ""})),
    ]
}

fn sample_rule_sets() -> Vec<Vec<ParameterRule>> {
    vec![
        Vec::new(),
        temperature_and_top_p(),
        vec![
            ParameterRule::new("max_tokens", ParameterType::Int)
                .with_default(512)
                .required(),
            ParameterRule::new("seed", ParameterType::Int).with_default(Value::Null),
            ParameterRule::new("response_format", ParameterType::String),
        ],
    ]
}

#[test]
fn initialization_is_idempotent() {
    for rules in sample_rule_sets() {
        for current in sample_maps() {
            let once = initialize_from_rules(&current, &rules);
            let twice = initialize_from_rules(&once, &rules);
            assert_eq!(once, twice, "not idempotent for {current:?}");
        }
    }
}

#[test]
fn initialized_keys_are_rule_names() {
    for rules in sample_rule_sets() {
        for current in sample_maps() {
            let result = initialize_from_rules(&current, &rules);
            for key in result.keys() {
                assert!(
                    rules.iter().any(|r| &r.name == key),
                    "{key} survived without a rule"
                );
            }
        }
    }
}

#[test]
fn toggle_round_trip_removes_key() {
    for current in sample_maps() {
        for name in ["temperature", "stop", "logit_bias"] {
            let on = toggle_parameter(&current, name, true, json!(1));
            let off = toggle_parameter(&on, name, false, json!(1));
            assert!(!off.contains(&ParameterName::from(name)));
        }
    }
}

#[test]
fn later_preset_wins() {
    let q1 = params(json!({"temperature": 0.8, "top_p": 0.9}));
    let q2 = params(json!({"temperature": 0.2, "seed": 1}));

    let result = apply_preset(&apply_preset(&CompletionParams::new(), &q1), &q2);
    assert_eq!(result.get(&ParameterName::Temperature), Some(&json!(0.2)));
    assert_eq!(result.get(&ParameterName::Seed), Some(&json!(1)));
    assert_eq!(result.get(&ParameterName::TopP), Some(&json!(0.9)));

    // Reversed order flips the shared key.
    let reversed = apply_preset(&apply_preset(&CompletionParams::new(), &q2), &q1);
    assert_eq!(reversed.get(&ParameterName::Temperature), Some(&json!(0.8)));
}

// =============================================================================
// Edge cases
// =============================================================================

#[test]
fn null_value_counts_as_absent() {
    let current = params(json!({"temperature": null, "top_p": null}));
    let result = initialize_from_rules(&current, &temperature_and_top_p());
    assert_eq!(result, params(json!({"temperature": 0.7})));
}

#[test]
fn falsy_values_are_kept() {
    let rules = vec![
        ParameterRule::new("temperature", ParameterType::Float).with_default(0.7),
        ParameterRule::new("response_format", ParameterType::String).with_default("text"),
    ];
    let current = params(json!({"temperature": 0, "response_format": ""}));
    assert_eq!(initialize_from_rules(&current, &rules), current);
}

#[test]
fn empty_rule_set_clears_everything() {
    let current = params(json!({"temperature": 0.9}));
    assert!(initialize_from_rules(&current, &[]).is_empty());
}

#[test]
fn passthrough_key_is_neither_dropped_nor_defaulted() {
    let rules = vec![
        ParameterRule::new("temperature", ParameterType::Float).with_default(0.7),
        ParameterRule::stop_sequences(),
    ];
    let passthrough = [ParameterName::Stop];

    let with_stop = params(json!({"stop": ["\n\n"]}));
    let result = initialize_with_passthrough(&with_stop, &rules[..1], &passthrough);
    assert_eq!(result, params(json!({"temperature": 0.7, "stop": ["\n\n"]})));

    // Unset passthrough keys stay unset even when a rule has a default.
    let result = initialize_with_passthrough(&CompletionParams::new(), &rules, &passthrough);
    assert_eq!(result, params(json!({"temperature": 0.7})));
}

#[test]
fn set_value_accepts_unknown_names() {
    let result = set_value(&CompletionParams::new(), "logit_bias", json!({"50256": -100}));
    assert_eq!(
        result.get(&ParameterName::Custom("logit_bias".into())),
        Some(&json!({"50256": -100}))
    );
}

#[test]
fn transitions_do_not_mutate_inputs() {
    let current = params(json!({"temperature": 0.9, "max_tokens": 10}));
    let snapshot = current.clone();
    let rules = temperature_and_top_p();

    let _ = initialize_from_rules(&current, &rules);
    let _ = set_value(&current, "temperature", json!(0.1));
    let _ = toggle_parameter(&current, "max_tokens", false, Value::Null);
    let _ = apply_preset(&current, &params(json!({"seed": 3})));

    assert_eq!(current, snapshot);
    assert_eq!(rules, temperature_and_top_p());
}
