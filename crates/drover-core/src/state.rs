use std::collections::BTreeMap;

/// Result of a provider execution, queried by property name.
///
/// Later tasks read it through `$(Title.Property)` references, so a provider
/// only has to expose the names it documents.
pub trait StateObject: Send + Sync {
    /// Returns the value of `name`, or `None` if the state has no such property.
    fn get_property(&self, name: &str) -> Option<String>;
}

/// State backed by a fixed set of string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapState(BTreeMap<String, String>);

impl MapState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property and return the updated state.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl StateObject for MapState {
    fn get_property(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
