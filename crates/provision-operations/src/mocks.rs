use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ExternalError;
use crate::providers::InMemoryStore;
use crate::traits::{
    ContainerConfig, ContainerEngine, ContainerHandle, ExternalResult, KeyValueStore,
    NetworkProvider, ProgressSink,
};

/// Ordered record of collaborator calls, shared between mocks so tests can
/// assert on the interleaving.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn record(&self, call: String) {
        self.calls.lock().expect("lock poisoned").push(call);
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().expect("lock poisoned").is_empty()
    }
}

fn fail_if(failing: &HashSet<&'static str>, operation: &'static str) -> ExternalResult<()> {
    if failing.contains(operation) {
        return Err(ExternalError::new(format!("injected {operation} failure")));
    }
    Ok(())
}

pub struct MockContainerEngine {
    log: Arc<CallLog>,
    failing: HashSet<&'static str>,
    plan_response: String,
    pull_lines: Vec<String>,
    next_id: AtomicUsize,
    exec_inputs: Mutex<Vec<String>>,
}

impl MockContainerEngine {
    #[must_use]
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            failing: HashSet::new(),
            plan_response: r#"{"users":[],"default_user":""}"#.to_string(),
            pull_lines: vec!["Pull complete".to_string()],
            next_id: AtomicUsize::new(1),
            exec_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Make `operation` (`pull_image`, `create_container`, `remove_container`
    /// or `exec`) fail after being recorded.
    #[must_use]
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    #[must_use]
    pub fn with_plan_response(mut self, response: &str) -> Self {
        self.plan_response = response.to_string();
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn exec_inputs(&self) -> Vec<String> {
        self.exec_inputs.lock().expect("lock poisoned").clone()
    }
}

impl ContainerEngine for MockContainerEngine {
    fn pull_image(&self, image: &str, progress: &mut dyn FnMut(&str)) -> ExternalResult<()> {
        self.log.record(format!("pull_image {image}"));
        fail_if(&self.failing, "pull_image")?;
        for line in &self.pull_lines {
            progress(line);
        }
        Ok(())
    }

    fn create_container(&self, config: &ContainerConfig) -> ExternalResult<ContainerHandle> {
        self.log.record(format!(
            "create_container {} {} {} {}",
            config.name, config.image, config.network, config.ip
        ));
        fail_if(&self.failing, "create_container")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ContainerHandle {
            id: format!("c{id}"),
        })
    }

    fn remove_container(&self, id: &str) -> ExternalResult<()> {
        self.log.record(format!("remove_container {id}"));
        fail_if(&self.failing, "remove_container")
    }

    fn exec(
        &self,
        id: &str,
        command: &[&str],
        stdin: &str,
        output: &mut dyn FnMut(&str),
    ) -> ExternalResult<String> {
        self.log.record(format!("exec {id} {}", command.join(" ")));
        self.exec_inputs
            .lock()
            .expect("lock poisoned")
            .push(stdin.to_string());
        fail_if(&self.failing, "exec")?;
        output("planning");
        Ok(self.plan_response.clone())
    }
}

pub struct MockNetworkProvider {
    log: Arc<CallLog>,
    failing: HashSet<&'static str>,
}

impl MockNetworkProvider {
    #[must_use]
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            failing: HashSet::new(),
        }
    }

    /// Make `operation` (`add_ip`, `remove_ip`, `add_nat` or `remove_nat`)
    /// fail after being recorded.
    #[must_use]
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }
}

impl NetworkProvider for MockNetworkProvider {
    fn add_ip(&self, ip: Ipv4Addr) -> ExternalResult<()> {
        self.log.record(format!("add_ip {ip}"));
        fail_if(&self.failing, "add_ip")
    }

    fn remove_ip(&self, ip: Ipv4Addr) -> ExternalResult<()> {
        self.log.record(format!("remove_ip {ip}"));
        fail_if(&self.failing, "remove_ip")
    }

    fn add_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()> {
        self.log.record(format!("add_nat {global} {local}"));
        fail_if(&self.failing, "add_nat")
    }

    fn remove_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()> {
        self.log.record(format!("remove_nat {global} {local}"));
        fail_if(&self.failing, "remove_nat")
    }
}

/// In-memory store that refuses writes to chosen namespaces.
#[derive(Default)]
pub struct MockStore {
    inner: InMemoryStore,
    read_only: HashSet<String>,
}

impl MockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rejecting_writes_to(mut self, namespace: &str) -> Self {
        self.read_only.insert(namespace.to_string());
        self
    }
}

impl KeyValueStore for MockStore {
    fn read(&self, namespace: &str, key: &str) -> ExternalResult<Option<String>> {
        self.inner.read(namespace, key)
    }

    fn write(&self, namespace: &str, key: &str, value: &str) -> ExternalResult<()> {
        if self.read_only.contains(namespace) {
            return Err(ExternalError::new(format!("{namespace} is read-only")));
        }
        self.inner.write(namespace, key, value)
    }

    fn remove(&self, namespace: &str, key: &str) -> ExternalResult<()> {
        self.inner.remove(namespace, key)
    }

    fn keys(&self, namespace: &str) -> ExternalResult<Vec<String>> {
        self.inner.keys(namespace)
    }
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<(usize, String)>>,
}

impl RecordingProgress {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn lines(&self) -> Vec<(usize, String)> {
        self.lines.lock().expect("lock poisoned").clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, level: usize, message: &str) {
        self.lines
            .lock()
            .expect("lock poisoned")
            .push((level, message.to_string()));
    }
}
