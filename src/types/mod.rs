//! Public types for the Mimir API.

mod model;
mod parameter;
mod params;

pub use model::{CatalogModel, CatalogProvider, ModelSelection, ModelStatus, RuleKey};
pub use parameter::{LocalizedText, ParameterName, ParameterRule, ParameterType, ParameterValue};
pub use params::CompletionParams;
