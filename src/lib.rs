//! Mimir - model parameter configuration resolver
//!
//! This crate keeps a completion-parameter map consistent with the
//! parameter rules of whichever model is selected. Rules are fetched per
//! `(provider, model)`, cached, and applied only while they still belong to
//! the current selection; user edits, toggles and preset tones are pure
//! transitions over the map.
//!
//! # Example
//!
//! ```rust,no_run
//! use mimir::Mimir;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let session = Mimir::builder()
//!         .console("http://localhost:5001/console/api")
//!         .api_token("console-token")
//!         .on_params_change(|params| println!("{}", json!(params)))
//!         .build()?;
//!
//!     session.select_model("openai", "gpt-4o").await;
//!     session.set_value("temperature", json!(0.2));
//!     session.apply_tone(3);
//!
//!     println!("{:?}", session.params());
//!     Ok(())
//! }
//! ```

pub mod cache;
#[cfg(feature = "cli")]
pub mod config;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod reducer;
pub mod registry;
pub mod rules;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{MimirError, Result};
pub use session::{
    Mimir, MimirBuilder, ParameterSession, SelectionOutcome, TriggerProps, TriggerRenderer,
};

pub use cache::{CacheConfig, RuleCache, SharedRules};
pub use console::ConsoleClient;
pub use coordinator::{ModelChange, ModelSelectionCoordinator, SelectionGates};
pub use registry::{ModelCatalog, PresetTone, ToneTable};
pub use rules::{RuleFetcher, RuleOutcome, RuleSnapshot, RuleStatus, RuleStore};

pub use types::{
    CatalogModel, CatalogProvider, CompletionParams, LocalizedText, ModelSelection, ModelStatus,
    ParameterName, ParameterRule, ParameterType, ParameterValue, RuleKey,
};

pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, version_string};
