mod command;
mod docker;
mod file_store;
mod host_network;
mod memory_store;
mod progress;

pub use docker::DockerCli;
pub use file_store::FileSystemStore;
pub use host_network::HostNetwork;
pub use memory_store::InMemoryStore;
pub use progress::{SilentProgress, TerminalProgress};
