//! Rule store: the rule list for the currently requested model.
//!
//! Each request bumps a generation counter. A fetch result is applied only
//! if its ticket still carries the current generation; anything older is a
//! response for a superseded selection and is dropped on arrival. That is
//! the only cancellation there is: the fetch itself runs to completion (and
//! still populates the cache under its own key).
//!
//! ```text
//! select A ──► begin(A) gen=1 ──► fetch A ....................► complete(gen=1) → Stale
//! select B ──────────► begin(B) gen=2 ──► fetch B ──► complete(gen=2) → Settled(B)
//! ```
//!
//! Fetch failures leave the previous rule list in place and flip the status
//! to [`RuleStatus::Error`]. There is no automatic retry; requesting the key
//! again retries.

mod fetch;

pub use fetch::{RuleFetcher, parse_rules_payload};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::MimirError;
use crate::cache::{CacheConfig, RuleCache, SharedRules};
use crate::telemetry;
use crate::types::RuleKey;

/// Loading state of the current rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatus {
    Loading,
    Ready,
    Error,
}

/// A rule list that settled for a specific key.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub key: RuleKey,
    pub rules: SharedRules,
}

/// What a completed request means for the current view.
#[derive(Debug, Clone)]
pub enum RuleOutcome {
    /// A new rule list is now current; reconcile against it.
    Settled(RuleSet),
    /// The current key settled to the rule list already in place.
    Unchanged,
    /// The selection has no key; the rule list is empty and nothing was fetched.
    Incomplete,
    /// The selection moved on while this request was in flight.
    Stale,
    /// The fetch failed; the previous rule list is kept.
    Failed(Arc<MimirError>),
}

/// Handle for one request; carries the generation it was issued under.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    key: Option<RuleKey>,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> Option<&RuleKey> {
        self.key.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    /// Key of the most recent request.
    pub requested: Option<RuleKey>,
    /// Key the current rule list belongs to.
    pub rules_key: Option<RuleKey>,
    /// Rules in display order.
    pub rules: SharedRules,
    pub status: RuleStatus,
    /// Error of the last failed fetch for the requested key.
    pub error: Option<Arc<MimirError>>,
}

struct StoreState {
    requested: Option<RuleKey>,
    generation: u64,
    status: RuleStatus,
    rules_key: Option<RuleKey>,
    rules: SharedRules,
    error: Option<Arc<MimirError>>,
}

/// Fetches, caches and tracks the rule list for the requested model.
pub struct RuleStore {
    fetcher: Arc<dyn RuleFetcher>,
    cache: RuleCache,
    state: Mutex<StoreState>,
}

impl RuleStore {
    pub fn new(fetcher: Arc<dyn RuleFetcher>, config: &CacheConfig) -> Self {
        Self {
            fetcher,
            cache: RuleCache::new(config),
            state: Mutex::new(StoreState {
                requested: None,
                generation: 0,
                status: RuleStatus::Ready,
                rules_key: None,
                rules: empty_rules(),
                error: None,
            }),
        }
    }

    /// Request `key`, fetch if needed, and report what changed.
    pub async fn load(&self, key: Option<RuleKey>) -> RuleOutcome {
        let ticket = self.begin(key);
        let result = self.resolve(&ticket).await;
        self.complete(ticket, result)
    }

    /// Make `key` the requested key and supersede every earlier ticket.
    ///
    /// An incomplete key (`None`) clears the rule list and is immediately
    /// ready; nothing is fetched for it.
    pub fn begin(&self, key: Option<RuleKey>) -> FetchTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.requested = key.clone();
        state.error = None;
        if key.is_some() {
            state.status = RuleStatus::Loading;
        } else {
            state.status = RuleStatus::Ready;
            state.rules_key = None;
            state.rules = empty_rules();
        }
        FetchTicket {
            key,
            generation: state.generation,
        }
    }

    /// Run the fetch for `ticket` through the cache.
    pub async fn resolve(&self, ticket: &FetchTicket) -> Result<SharedRules, Arc<MimirError>> {
        match &ticket.key {
            Some(key) => self.cache.get_or_fetch(key, self.fetcher.as_ref()).await,
            None => Ok(empty_rules()),
        }
    }

    /// Apply a fetch result if `ticket` is still current.
    pub fn complete(
        &self,
        ticket: FetchTicket,
        result: Result<SharedRules, Arc<MimirError>>,
    ) -> RuleOutcome {
        let mut state = self.lock();
        if ticket.generation != state.generation {
            let provider = ticket.key.as_ref().map(|k| k.provider().to_owned());
            debug!(
                key = ?ticket.key,
                generation = ticket.generation,
                current = state.generation,
                "discarding stale rule response"
            );
            metrics::counter!(telemetry::STALE_RESPONSES_TOTAL,
                "provider" => provider.unwrap_or_default(),
            )
            .increment(1);
            return RuleOutcome::Stale;
        }

        let Some(key) = ticket.key else {
            return RuleOutcome::Incomplete;
        };

        match result {
            Ok(rules) => {
                let changed =
                    state.rules_key.as_ref() != Some(&key) || state.rules[..] != rules[..];
                state.status = RuleStatus::Ready;
                state.rules_key = Some(key.clone());
                state.rules = Arc::clone(&rules);
                if changed {
                    debug!(%key, count = rules.len(), "parameter rules settled");
                    RuleOutcome::Settled(RuleSet { key, rules })
                } else {
                    RuleOutcome::Unchanged
                }
            }
            Err(e) => {
                warn!(%key, error = %e, "failed to fetch parameter rules");
                state.status = RuleStatus::Error;
                state.error = Some(Arc::clone(&e));
                RuleOutcome::Failed(e)
            }
        }
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        let state = self.lock();
        RuleSnapshot {
            requested: state.requested.clone(),
            rules_key: state.rules_key.clone(),
            rules: Arc::clone(&state.rules),
            status: state.status,
            error: state.error.clone(),
        }
    }

    pub fn status(&self) -> RuleStatus {
        self.lock().status
    }

    /// Current rule list in display order.
    pub fn rules(&self) -> SharedRules {
        Arc::clone(&self.lock().rules)
    }

    /// Whether `ticket` is still the latest request.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    // Transitions replace fields wholesale, so a poisoned guard still holds
    // a consistent state.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn empty_rules() -> SharedRules {
    Arc::from(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::Result;
    use crate::types::{ParameterRule, ParameterType};

    struct StaticFetcher;

    #[async_trait]
    impl RuleFetcher for StaticFetcher {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_rules(&self, key: &RuleKey) -> Result<Vec<ParameterRule>> {
            Ok(vec![ParameterRule::new(
                format!("{}_param", key.model()),
                ParameterType::Float,
            )])
        }
    }

    fn store() -> RuleStore {
        RuleStore::new(Arc::new(StaticFetcher), &CacheConfig::new())
    }

    fn key(model: &str) -> RuleKey {
        RuleKey::new("openai", model).unwrap()
    }

    fn rules(names: &[&str]) -> SharedRules {
        names
            .iter()
            .map(|n| ParameterRule::new(*n, ParameterType::Float))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn begin_marks_loading() {
        let store = store();
        let ticket = store.begin(Some(key("a")));
        assert_eq!(store.status(), RuleStatus::Loading);
        assert_eq!(ticket.generation(), 1);
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let store = store();
        let first = store.begin(Some(key("a")));
        let second = store.begin(Some(key("b")));

        assert!(matches!(
            store.complete(second, Ok(rules(&["b_param"]))),
            RuleOutcome::Settled(_)
        ));
        assert!(!store.is_current(&first));
        assert!(matches!(
            store.complete(first, Ok(rules(&["a_param"]))),
            RuleOutcome::Stale
        ));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rules_key, Some(key("b")));
        assert_eq!(snapshot.rules[0].name.as_str(), "b_param");
        assert_eq!(snapshot.status, RuleStatus::Ready);
    }

    #[test]
    fn stale_error_does_not_flip_status() {
        let store = store();
        let first = store.begin(Some(key("a")));
        let second = store.begin(Some(key("b")));
        store.complete(second, Ok(rules(&["b_param"])));

        let outcome = store.complete(first, Err(Arc::new(MimirError::Http("timeout".into()))));
        assert!(matches!(outcome, RuleOutcome::Stale));
        assert_eq!(store.status(), RuleStatus::Ready);
    }

    #[test]
    fn failure_keeps_previous_rules() {
        let store = store();
        let t = store.begin(Some(key("a")));
        store.complete(t, Ok(rules(&["a_param"])));

        let t = store.begin(Some(key("b")));
        let outcome = store.complete(t, Err(Arc::new(MimirError::AuthenticationFailed)));

        assert!(matches!(outcome, RuleOutcome::Failed(_)));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, RuleStatus::Error);
        assert_eq!(snapshot.rules_key, Some(key("a")));
        assert_eq!(snapshot.rules.len(), 1);
        assert!(snapshot.error.is_some());
    }

    #[test]
    fn incomplete_key_clears_rules() {
        let store = store();
        let t = store.begin(Some(key("a")));
        store.complete(t, Ok(rules(&["a_param"])));

        let t = store.begin(None);
        assert_eq!(store.status(), RuleStatus::Ready);
        assert!(matches!(
            store.complete(t, Ok(empty_rules())),
            RuleOutcome::Incomplete
        ));
        assert!(store.rules().is_empty());
    }

    #[test]
    fn same_rules_for_same_key_are_unchanged() {
        let store = store();
        let t = store.begin(Some(key("a")));
        store.complete(t, Ok(rules(&["a_param"])));
        let t = store.begin(Some(key("a")));
        assert!(matches!(
            store.complete(t, Ok(rules(&["a_param"]))),
            RuleOutcome::Unchanged
        ));
    }

    #[tokio::test]
    async fn load_fetches_and_settles() {
        let store = store();
        match store.load(Some(key("gpt-4o"))).await {
            RuleOutcome::Settled(set) => {
                assert_eq!(set.key, key("gpt-4o"));
                assert_eq!(set.rules[0].name.as_str(), "gpt-4o_param");
            }
            other => panic!("expected Settled, got {other:?}"),
        }
        assert!(matches!(
            store.load(Some(key("gpt-4o"))).await,
            RuleOutcome::Unchanged
        ));
    }

    #[tokio::test]
    async fn load_without_key_issues_no_fetch() {
        let store = store();
        assert!(matches!(store.load(None).await, RuleOutcome::Incomplete));
        assert_eq!(store.cache().len(), 0);
    }
}
