use std::net::Ipv4Addr;

use super::ExternalResult;

/// What to launch: a named container from an image, attached to an internal
/// network at a fixed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    pub network: String,
    pub ip: Ipv4Addr,
}

/// A container the engine created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
}

pub trait ContainerEngine: Send + Sync {
    /// Fetch `image`, reporting progress lines as they arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be pulled.
    fn pull_image(&self, image: &str, progress: &mut dyn FnMut(&str)) -> ExternalResult<()>;

    /// # Errors
    ///
    /// Returns an error if the container cannot be created or started.
    fn create_container(&self, config: &ContainerConfig) -> ExternalResult<ContainerHandle>;

    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove_container(&self, id: &str) -> ExternalResult<()>;

    /// Run `command` inside the container with `stdin` as its input and
    /// return what it wrote to stdout. Diagnostic output goes to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be run or exits unsuccessfully.
    fn exec(
        &self,
        id: &str,
        command: &[&str],
        stdin: &str,
        output: &mut dyn FnMut(&str),
    ) -> ExternalResult<String>;
}
