//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: model provider the rule fetch was issued for
//! - `status`: fetch outcome, "ok" or "error"
//! - `transition`: one of "initialize", "set_value",
//!   "toggle" or "preset"

/// Total parameter-rule fetches issued to a [`RuleFetcher`](crate::rules::RuleFetcher).
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const RULE_FETCHES_TOTAL: &str = "mimir_rule_fetches_total";

/// Rule fetch duration in seconds.
///
/// Labels: `provider`.
pub const RULE_FETCH_DURATION_SECONDS: &str = "mimir_rule_fetch_duration_seconds";

/// Rule cache hits.
pub const RULE_CACHE_HITS_TOTAL: &str = "mimir_rule_cache_hits_total";

/// Rule cache misses.
pub const RULE_CACHE_MISSES_TOTAL: &str = "mimir_rule_cache_misses_total";

/// Rule responses discarded because the selection moved on while they were
/// in flight.
///
/// Labels: `provider`.
pub const STALE_RESPONSES_TOTAL: &str = "mimir_stale_responses_total";

/// Parameter map transitions emitted to the host.
///
/// Labels: `transition`.
pub const PARAM_TRANSITIONS_TOTAL: &str = "mimir_param_transitions_total";
