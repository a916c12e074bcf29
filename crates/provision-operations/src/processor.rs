use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::Result;
use crate::error::OperationError;
use crate::providers::SilentProgress;
use crate::traits::ProgressSink;

/// Per-invocation control block handed to a processor.
///
/// Carries request metadata, the display nesting level, and where progress
/// goes. An empty metadata value counts as absent.
#[derive(Clone)]
pub struct ProcessControl {
    meta: IndexMap<String, String>,
    display_level: usize,
    progress: Arc<dyn ProgressSink>,
}

impl ProcessControl {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            meta: IndexMap::new(),
            display_level: 0,
            progress,
        }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self::new(Arc::new(SilentProgress))
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_meta(key, value);
        self
    }

    #[must_use]
    pub fn with_display_level(mut self, level: usize) -> Self {
        self.display_level = level;
        self
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// # Errors
    ///
    /// Returns `MissingMeta` if `key` is absent or empty.
    pub fn require_meta(&self, key: &'static str) -> Result<&str> {
        self.meta(key).ok_or(OperationError::MissingMeta(key))
    }

    pub fn meta_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn display_level(&self) -> usize {
        self.display_level
    }

    #[must_use]
    pub fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_ref()
    }

    /// Emit a line at this control's level.
    pub fn bullet(&self, message: &str) {
        self.progress.emit(self.display_level, message);
    }

    /// Emit a line one level below this control's level.
    pub fn sub_bullet(&self, message: &str) {
        self.progress.emit(self.display_level + 1, message);
    }
}

impl fmt::Debug for ProcessControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessControl")
            .field("meta", &self.meta)
            .field("display_level", &self.display_level)
            .finish_non_exhaustive()
    }
}

/// A named unit of provisioning work.
pub trait Processor: Send {
    /// Run to completion. Re-running after success is safe.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed.
    fn process(&mut self) -> Result<()>;

    /// Control block to hand to whatever runs next.
    fn results(&self) -> ProcessControl;
}

pub type ProcessorFactory =
    Box<dyn Fn(ProcessControl) -> Result<Box<dyn Processor>> + Send + Sync + 'static>;

/// Name-keyed processor factories, filled once at startup.
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: IndexMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `DuplicateProcessor` if `name` is already registered.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(ProcessControl) -> Result<Box<dyn Processor>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(OperationError::DuplicateProcessor(name));
        }
        debug!(processor = %name, "registered processor");
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Build the processor registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProcessor` for an unregistered name, or whatever the
    /// factory rejects the control block with.
    pub fn lookup(&self, name: &str, control: ProcessControl) -> Result<Box<dyn Processor>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| OperationError::UnknownProcessor {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(control)
    }

    /// Build and run `name`, returning its results.
    ///
    /// # Errors
    ///
    /// Returns lookup and processing errors.
    pub fn run(&self, name: &str, control: ProcessControl) -> Result<ProcessControl> {
        let mut processor = self.lookup(name, control)?;
        processor.process()?;
        Ok(processor.results())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
