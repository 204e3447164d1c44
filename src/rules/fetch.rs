//! Rule fetcher seam and payload parsing.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::Result;
use crate::types::{ParameterRule, RuleKey};

/// Source of a model's parameter rules.
///
/// Implemented by [`ConsoleClient`](crate::console::ConsoleClient) over HTTP;
/// tests and embedders plug in their own.
#[async_trait]
pub trait RuleFetcher: Send + Sync {
    /// Fetcher name for logging.
    fn name(&self) -> &str;

    /// Fetch the ordered rule list for `key`.
    async fn fetch_rules(&self, key: &RuleKey) -> Result<Vec<ParameterRule>>;
}

/// Parse a `{ "data": [rule, ...] }` envelope.
///
/// An empty body, a missing `data` field or a non-array `data` yield an empty
/// list. A body that is not JSON at all is an error. Individual entries that
/// do not match the rule shape are skipped with a warning so one odd rule
/// cannot hide the rest.
pub fn parse_rules_payload(body: &str) -> Result<Vec<ParameterRule>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let payload: Value = serde_json::from_str(body)?;
    let Some(entries) = payload.get("data").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let rules = entries
        .iter()
        .filter_map(|entry| match ParameterRule::deserialize(entry) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(error = %e, "skipping malformed parameter rule");
                None
            }
        })
        .collect();
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterName;

    #[test]
    fn parses_rules_in_order() {
        let body = r#"{"data": [
            {"name": "temperature", "type": "float", "default": 0.7},
            {"name": "top_p", "type": "float"},
            {"name": "max_tokens", "type": "int", "required": true}
        ]}"#;
        let rules = parse_rules_payload(body).unwrap();
        let names: Vec<_> = rules.iter().map(|r| r.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                ParameterName::Temperature,
                ParameterName::TopP,
                ParameterName::MaxTokens
            ]
        );
        assert!(rules[2].required);
    }

    #[test]
    fn missing_data_is_empty() {
        assert!(parse_rules_payload("{}").unwrap().is_empty());
        assert!(parse_rules_payload(r#"{"data": null}"#).unwrap().is_empty());
        assert!(parse_rules_payload(r#"{"data": "oops"}"#).unwrap().is_empty());
        assert!(parse_rules_payload("").unwrap().is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let body = r#"{"data": [{"type": "float"}, {"name": "seed", "type": "int"}]}"#;
        let rules = parse_rules_payload(body).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, ParameterName::Seed);
    }

    #[test]
    fn non_json_body_is_an_error() {
        assert!(parse_rules_payload("<html>502 Bad Gateway</html>").is_err());
    }
}
