use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ExternalError;
use crate::traits::{ExternalResult, KeyValueStore};

const EXTENSION: &str = "json";

/// Key-value store keeping one JSON file per key under
/// `<root>/<namespace>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> ExternalResult<PathBuf> {
        validate_segment("namespace", namespace)?;
        Ok(self.root.join(namespace))
    }

    fn entry_path(&self, namespace: &str, key: &str) -> ExternalResult<PathBuf> {
        validate_segment("key", key)?;
        Ok(self
            .namespace_dir(namespace)?
            .join(format!("{key}.{EXTENSION}")))
    }
}

fn validate_segment(kind: &str, segment: &str) -> ExternalResult<()> {
    let reason = if segment.is_empty() {
        Some("is empty")
    } else if segment.starts_with('.') {
        Some("starts with '.'")
    } else if segment.contains(['/', '\\']) {
        Some("contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExternalError::new(format!(
            "store {kind} '{segment}' {reason}"
        ))),
        None => Ok(()),
    }
}

fn io_error(action: &str, path: &Path, source: std::io::Error) -> ExternalError {
    ExternalError::with_source(format!("failed to {action} '{}'", path.display()), source)
}

impl KeyValueStore for FileSystemStore {
    fn read(&self, namespace: &str, key: &str) -> ExternalResult<Option<String>> {
        let path = self.entry_path(namespace, key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error("read", &path, source)),
        }
    }

    fn write(&self, namespace: &str, key: &str, value: &str) -> ExternalResult<()> {
        let path = self.entry_path(namespace, key)?;
        let dir = self.namespace_dir(namespace)?;
        fs::create_dir_all(&dir).map_err(|source| io_error("create", &dir, source))?;

        let staging = dir.join(format!(".{key}.{EXTENSION}.tmp"));
        fs::write(&staging, value).map_err(|source| io_error("write", &staging, source))?;
        fs::rename(&staging, &path).map_err(|source| io_error("replace", &path, source))
    }

    fn remove(&self, namespace: &str, key: &str) -> ExternalResult<()> {
        let path = self.entry_path(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error("remove", &path, source)),
        }
    }

    fn keys(&self, namespace: &str) -> ExternalResult<Vec<String>> {
        let dir = self.namespace_dir(namespace)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error("list", &dir, source)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| io_error("list", &dir, source))?
                .path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.starts_with('.') {
                        keys.push(stem.to_string());
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
