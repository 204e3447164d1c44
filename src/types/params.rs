//! The live parameter map for the selected model.

use std::collections::HashMap;
use std::collections::hash_map;

use serde::{Deserialize, Serialize};

use super::{ParameterName, ParameterValue};

/// Mapping from parameter name to the chosen value.
///
/// Keys are unique; iteration order is unspecified. An absent key means the
/// parameter is unset, which is distinct from a key holding a falsy value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionParams(HashMap<ParameterName, ParameterValue>);

impl CompletionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &ParameterName) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    /// Whether `name` holds a defined (non-null) value.
    pub fn is_set(&self, name: &ParameterName) -> bool {
        self.0.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn contains(&self, name: &ParameterName) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(
        &mut self,
        name: impl Into<ParameterName>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &ParameterName) -> Option<ParameterValue> {
        self.0.remove(name)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ParameterName, &ParameterValue) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, ParameterName, ParameterValue> {
        self.0.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, ParameterName, ParameterValue> {
        self.0.keys()
    }
}

impl<K: Into<ParameterName>> FromIterator<(K, ParameterValue)> for CompletionParams {
    fn from_iter<I: IntoIterator<Item = (K, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<HashMap<ParameterName, ParameterValue>> for CompletionParams {
    fn from(map: HashMap<ParameterName, ParameterValue>) -> Self {
        Self(map)
    }
}

impl IntoIterator for CompletionParams {
    type Item = (ParameterName, ParameterValue);
    type IntoIter = hash_map::IntoIter<ParameterName, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompletionParams {
    type Item = (&'a ParameterName, &'a ParameterValue);
    type IntoIter = hash_map::Iter<'a, ParameterName, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
