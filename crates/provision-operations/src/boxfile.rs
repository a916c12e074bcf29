//! Reading a service's configuration out of a boxfile.
//!
//! A boxfile is a YAML document keyed by service name. The subtree under
//! `<name>.config` is what gets handed to the service's plan hook.

use serde_json::Value;

use crate::Result;
use crate::error::OperationError;

/// Parsed boxfile document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boxfile {
    document: Value,
}

impl Boxfile {
    /// Parse boxfile text. Blank text is an empty document.
    ///
    /// # Errors
    ///
    /// Returns `Boxfile` if the text is not valid YAML or has keys that are
    /// not strings.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let document = serde_yml::from_str(text).map_err(OperationError::Boxfile)?;
        Ok(Self { document })
    }

    /// The `config` node of service `name`, or an empty object if either
    /// node is missing or null.
    #[must_use]
    pub fn service_config(&self, name: &str) -> Value {
        self.document
            .get(name)
            .and_then(|node| node.get("config"))
            .filter(|config| !config.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}
