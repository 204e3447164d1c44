//! Preset tones: named bundles of parameter values applied in one action.
//!
//! The built-in table is compiled in and loaded once; it is never mutated at
//! runtime. Hosts that want different tones build their own [`ToneTable`].

use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::reducer;
use crate::types::{CompletionParams, ParameterValue};

/// Providers for which the host offers the tone picker.
pub const PROVIDERS_WITH_PRESET_TONE: &[&str] = &["openai", "azure_openai"];

/// Whether the tone picker applies to `provider`.
pub fn supports_preset_tones(provider: &str) -> bool {
    PROVIDERS_WITH_PRESET_TONE.contains(&provider)
}

/// Compiled-in tones: `(id, name, config)`.
const BUILTIN_TONES: &[(u32, &str, &[(&str, f64)])] = &[
    (
        1,
        "Creative",
        &[
            ("temperature", 0.8),
            ("top_p", 0.9),
            ("presence_penalty", 0.1),
            ("frequency_penalty", 0.1),
        ],
    ),
    (
        2,
        "Balanced",
        &[
            ("temperature", 0.5),
            ("top_p", 0.85),
            ("presence_penalty", 0.2),
            ("frequency_penalty", 0.3),
        ],
    ),
    (
        3,
        "Precise",
        &[
            ("temperature", 0.2),
            ("top_p", 0.75),
            ("presence_penalty", 0.5),
            ("frequency_penalty", 0.5),
        ],
    ),
    // Custom carries no values; selecting it leaves the map as-is.
    (4, "Custom", &[]),
];

static BUILTIN: LazyLock<Arc<ToneTable>> = LazyLock::new(|| {
    let tones = BUILTIN_TONES
        .iter()
        .map(|(id, name, config)| {
            PresetTone::new(
                *id,
                *name,
                config
                    .iter()
                    .map(|(k, v)| (*k, ParameterValue::from(*v)))
                    .collect(),
            )
        })
        .collect();
    Arc::new(ToneTable::new(tones))
});

/// A single preset tone.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetTone {
    pub id: u32,
    pub name: String,
    /// Partial parameter map merged over the current one.
    pub config: CompletionParams,
}

impl PresetTone {
    pub fn new(id: u32, name: impl Into<String>, config: CompletionParams) -> Self {
        Self {
            id,
            name: name.into(),
            config,
        }
    }
}

/// Immutable lookup table of preset tones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToneTable {
    tones: Vec<PresetTone>,
}

impl ToneTable {
    /// Build a table; later entries with a duplicate id are ignored by lookups.
    pub fn new(tones: Vec<PresetTone>) -> Self {
        Self { tones }
    }

    /// Shared handle to the compiled-in table.
    pub fn builtin() -> Arc<ToneTable> {
        Arc::clone(&BUILTIN)
    }

    pub fn get(&self, id: u32) -> Option<&PresetTone> {
        self.tones.iter().find(|t| t.id == id)
    }

    /// The patch a tone contributes, `None` for unknown ids.
    pub fn patch(&self, id: u32) -> Option<&CompletionParams> {
        self.get(id).map(|t| &t.config)
    }

    /// Merge tone `id` over `current`.
    ///
    /// Unknown ids are a no-op and return `current` unchanged.
    pub fn apply(&self, id: u32, current: &CompletionParams) -> CompletionParams {
        match self.patch(id) {
            Some(patch) => reducer::apply_preset(current, patch),
            None => {
                debug!(tone_id = id, "ignoring unknown preset tone");
                current.clone()
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PresetTone> {
        self.tones.iter()
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}
