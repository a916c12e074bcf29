use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Environment variables shared by every service of an application.
///
/// Insertion order is kept so the persisted table stays stable between writes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVars(IndexMap<String, String>);

impl EnvVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Merge `other` into this table; keys from `other` win.
    pub fn merge(&mut self, other: EnvVars) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Variable prefix for a service: `data.db` becomes `DATA_DB`.
#[must_use]
pub fn env_prefix(service_name: &str) -> String {
    service_name.replace('.', "_").to_uppercase()
}

/// Namespace holding application-level metadata such as the env table.
#[must_use]
pub fn env_namespace(app_name: &str) -> String {
    format!("{app_name}_meta")
}
