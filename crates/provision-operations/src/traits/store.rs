use serde::Serialize;
use serde::de::DeserializeOwned;

use super::ExternalResult;
use crate::Result;
use crate::error::OperationError;

/// Namespaced key-value persistence holding JSON text.
pub trait KeyValueStore: Send + Sync {
    /// Raw value stored under `namespace/key`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read(&self, namespace: &str, key: &str) -> ExternalResult<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn write(&self, namespace: &str, key: &str, value: &str) -> ExternalResult<()>;

    /// Remove `namespace/key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the value exists but cannot be removed.
    fn remove(&self, namespace: &str, key: &str) -> ExternalResult<()>;

    /// Keys in `namespace`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be listed.
    fn keys(&self, namespace: &str) -> ExternalResult<Vec<String>>;

    /// Load and decode `namespace/key`. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` if the store fails and `StoreDecode` if the stored
    /// text does not decode as `T`.
    fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        let raw = self
            .read(namespace, key)
            .map_err(|source| OperationError::StoreRead {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| OperationError::StoreDecode {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Encode and store `value` under `namespace/key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns `StoreEncode` or `StoreWrite`.
    fn put<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw =
            serde_json::to_string_pretty(value).map_err(|source| OperationError::StoreEncode {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })?;
        self.write(namespace, key, &raw)
            .map_err(|source| OperationError::StoreWrite {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// # Errors
    ///
    /// Returns `StoreWrite` if the value cannot be removed.
    fn delete(&self, namespace: &str, key: &str) -> Result<()>
    where
        Self: Sized,
    {
        self.remove(namespace, key)
            .map_err(|source| OperationError::StoreWrite {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })
    }
}
