//! Parameter rule types: the per-model schema of tunable generation settings.
//!
//! A model's rule list is fetched from the console API and drives both the
//! host's parameter form and the reconciliation in [`reducer`](crate::reducer).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A parameter value as stored in [`CompletionParams`](super::CompletionParams).
///
/// Values are opaque to the resolver: numbers, strings, booleans and tag
/// lists all pass through untouched.
pub type ParameterValue = serde_json::Value;

/// Parameter name with well-known variants and a `Custom` escape hatch.
///
/// Serializes as a flat string so it works as a JSON object key. Always
/// build names through [`FromStr`] / [`From<&str>`] so that `"temperature"`
/// maps to [`ParameterName::Temperature`] rather than a `Custom` twin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterName {
    Temperature,
    TopP,
    TopK,
    MaxTokens,
    FrequencyPenalty,
    PresencePenalty,
    Seed,
    Stop,
    ResponseFormat,
    /// Provider-specific parameter not in the well-known set.
    Custom(String),
}

impl ParameterName {
    /// Wire name of the parameter.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::TopK => "top_k",
            Self::MaxTokens => "max_tokens",
            Self::FrequencyPenalty => "frequency_penalty",
            Self::PresencePenalty => "presence_penalty",
            Self::Seed => "seed",
            Self::Stop => "stop",
            Self::ResponseFormat => "response_format",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for ParameterName {
    fn from(s: &str) -> Self {
        match s {
            "temperature" => Self::Temperature,
            "top_p" => Self::TopP,
            "top_k" => Self::TopK,
            "max_tokens" => Self::MaxTokens,
            "frequency_penalty" => Self::FrequencyPenalty,
            "presence_penalty" => Self::PresencePenalty,
            "seed" => Self::Seed,
            "stop" => Self::Stop,
            "response_format" => Self::ResponseFormat,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ParameterName {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&ParameterName> for ParameterName {
    fn from(name: &ParameterName) -> Self {
        name.clone()
    }
}

impl Serialize for ParameterName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParameterName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// Declared value type of a parameter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Float,
    Int,
    String,
    Boolean,
    Text,
    /// List of free-form strings (e.g. stop sequences).
    Tag,
    /// A type this crate does not know about yet.
    #[serde(other)]
    Other,
}

/// Locale → text map (`{"en_US": "...", "zh_Hans": "..."}`).
///
/// Opaque to the resolver; carried for the host's form rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Fallback locale used when the requested one is missing.
    pub const FALLBACK_LOCALE: &'static str = "en_US";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation.
    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(locale.into(), text.into());
        self
    }

    /// Text for `locale`, falling back to `en_US`.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .or_else(|| self.0.get(Self::FALLBACK_LOCALE))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Schema entry for one tunable generation setting of a model.
///
/// Only `name`, `default` and presence drive reconciliation. The numeric
/// bounds, options and localized texts are passed through for the host; no
/// value validation happens in this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRule {
    pub name: ParameterName,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub required: bool,
    /// `null` on the wire deserializes to `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParameterValue>,
    #[serde(default, skip_serializing_if = "LocalizedText::is_empty")]
    pub label: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<LocalizedText>,
    #[serde(
        default,
        rename = "tagPlaceholder",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag_placeholder: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_template: Option<String>,
}

impl ParameterRule {
    /// Create a rule with no default, not required, no metadata.
    pub fn new(name: impl Into<ParameterName>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            label: LocalizedText::default(),
            help: None,
            tag_placeholder: None,
            min: None,
            max: None,
            precision: None,
            options: Vec::new(),
            use_template: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<ParameterValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the rule as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: LocalizedText) -> Self {
        self.label = label;
        self
    }

    /// Set numeric bounds (carried for display only).
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Default value, treating an explicit JSON `null` as no default.
    pub fn default_value(&self) -> Option<&ParameterValue> {
        self.default.as_ref().filter(|v| !v.is_null())
    }

    /// The synthetic stop-sequences rule shown in advanced mode.
    ///
    /// It is not part of any model's fetched rule list; the session appends
    /// it to [`visible_rules`](crate::ParameterSession::visible_rules) and
    /// keeps `stop` out of orphan removal while advanced mode is on.
    pub fn stop_sequences() -> Self {
        let mut rule = Self::new(ParameterName::Stop, ParameterType::Tag)
            .with_default(ParameterValue::Array(Vec::new()))
            .with_label(
                LocalizedText::new()
                    .with("en_US", "Stop sequences")
                    .with("zh_Hans", "停止序列"),
            );
        rule.help = Some(
            LocalizedText::new()
                .with(
                    "en_US",
                    "Up to four sequences where the API will stop generating further tokens. \
                     The returned text will not contain the stop sequence.",
                )
                .with(
                    "zh_Hans",
                    "最多四个序列，API 将停止生成更多的 token。返回的文本将不包含停止序列。",
                ),
        );
        rule.tag_placeholder = Some(
            LocalizedText::new()
                .with("en_US", "Enter sequence and press Tab")
                .with("zh_Hans", "输入序列并按 Tab 键"),
        );
        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_known_names_parse() {
        assert_eq!(ParameterName::from("top_p"), ParameterName::TopP);
        assert_eq!(
            "logit_bias".parse::<ParameterName>().unwrap(),
            ParameterName::Custom("logit_bias".into())
        );
    }

    #[test]
    fn names_work_as_json_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(ParameterName::MaxTokens, 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"max_tokens":1}"#);
    }

    #[test]
    fn rule_deserializes_console_shape() {
        let rule: ParameterRule = serde_json::from_value(json!({
            "name": "temperature",
            "use_template": "temperature",
            "label": {"en_US": "Temperature", "zh_Hans": "温度"},
            "type": "float",
            "help": {"en_US": "Controls randomness."},
            "required": false,
            "default": 0.7,
            "min": 0.0,
            "max": 2.0,
            "precision": 2,
            "options": []
        }))
        .unwrap();

        assert_eq!(rule.name, ParameterName::Temperature);
        assert_eq!(rule.kind, ParameterType::Float);
        assert_eq!(rule.default_value(), Some(&json!(0.7)));
        assert_eq!(rule.label.get("zh_Hans"), Some("温度"));
        assert_eq!(rule.precision, Some(2));
    }

    #[test]
    fn null_default_means_no_default() {
        let rule: ParameterRule =
            serde_json::from_value(json!({"name": "seed", "type": "int", "default": null}))
                .unwrap();
        assert!(rule.default_value().is_none());
        assert!(!rule.required);
    }

    #[test]
    fn unknown_type_maps_to_other() {
        let rule: ParameterRule =
            serde_json::from_value(json!({"name": "x", "type": "vector"})).unwrap();
        assert_eq!(rule.kind, ParameterType::Other);
    }

    #[test]
    fn localized_text_falls_back_to_english() {
        let text = LocalizedText::new().with("en_US", "Stop");
        assert_eq!(text.get("ja_JP"), Some("Stop"));
        assert_eq!(LocalizedText::new().get("en_US"), None);
    }

    #[test]
    fn stop_rule_shape() {
        let rule = ParameterRule::stop_sequences();
        assert_eq!(rule.name, ParameterName::Stop);
        assert_eq!(rule.kind, ParameterType::Tag);
        assert_eq!(rule.default_value(), Some(&json!([])));
        assert!(!rule.required);
        assert!(rule.tag_placeholder.is_some());
    }
}
