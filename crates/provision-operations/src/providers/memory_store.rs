use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::traits::{ExternalResult, KeyValueStore};

/// Store kept entirely in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<(String, String), String>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<(String, String), String>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }
}

impl KeyValueStore for InMemoryStore {
    fn read(&self, namespace: &str, key: &str) -> ExternalResult<Option<String>> {
        Ok(self.with_entries(|entries| {
            entries
                .get(&(namespace.to_string(), key.to_string()))
                .cloned()
        }))
    }

    fn write(&self, namespace: &str, key: &str, value: &str) -> ExternalResult<()> {
        self.with_entries(|entries| {
            entries.insert((namespace.to_string(), key.to_string()), value.to_string());
        });
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> ExternalResult<()> {
        self.with_entries(|entries| {
            entries.remove(&(namespace.to_string(), key.to_string()));
        });
        Ok(())
    }

    fn keys(&self, namespace: &str) -> ExternalResult<Vec<String>> {
        Ok(self.with_entries(|entries| {
            entries
                .keys()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, key)| key.clone())
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use provision_core::{Service, ServiceState};

    use super::*;

    #[test]
    fn typed_round_trip_through_get_and_put() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        let mut service = Service::new("data.db");
        service.advance(ServiceState::Planned)?;

        store.put("shop", "data.db", &service)?;
        let loaded: Option<Service> = store.get("shop", "data.db")?;

        assert_eq!(loaded, Some(service));
        Ok(())
    }

    #[test]
    fn namespaces_are_isolated() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.write("shop", "env", "{}")?;
        store.write("shop_meta", "env", "{}")?;
        store.write("shop", "data.db", "{}")?;

        assert_eq!(store.keys("shop")?, vec!["data.db", "env"]);
        assert_eq!(store.keys("shop_meta")?, vec!["env"]);
        Ok(())
    }

    #[test]
    fn malformed_value_is_a_decode_error() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.write("shop", "data.db", "not json")?;

        let err = store
            .get::<Service>("shop", "data.db")
            .expect_err("should fail to decode");

        assert_eq!(err.to_string(), "stored value 'shop/data.db' is malformed");
        Ok(())
    }
}
