//! Trigger rendering seam.
//!
//! The session does not draw anything. Hosts supply a [`TriggerRenderer`]
//! that turns [`TriggerProps`] into whatever their UI needs (a widget, a
//! status line, a JSON blob).

use serde::Serialize;

use crate::types::{CatalogModel, CatalogProvider};

/// Everything a model-picker trigger needs to draw itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerProps {
    /// Whether the picker popup is open.
    pub open: bool,
    pub disabled: bool,
    pub model_disabled: bool,
    pub has_deprecated: bool,
    /// Catalog entry of the selected provider, if listed.
    pub current_provider: Option<CatalogProvider>,
    /// Catalog entry of the selected model, if listed.
    pub current_model: Option<CatalogModel>,
    pub provider_name: String,
    pub model_id: String,
}

impl TriggerProps {
    /// Label to show: the catalog label when there is one, else the raw id.
    pub fn display_label(&self) -> &str {
        self.current_model
            .as_ref()
            .and_then(|m| m.label.get("en_US"))
            .unwrap_or(self.model_id.as_str())
    }
}

/// Host-supplied trigger renderer.
pub trait TriggerRenderer {
    type Output;

    fn render(&self, props: &TriggerProps) -> Self::Output;
}

impl<F, T> TriggerRenderer for F
where
    F: Fn(&TriggerProps) -> T,
{
    type Output = T;

    fn render(&self, props: &TriggerProps) -> T {
        self(props)
    }
}
