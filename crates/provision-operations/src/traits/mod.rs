mod container_engine;
mod network_provider;
mod progress;
mod store;

pub use container_engine::{ContainerConfig, ContainerEngine, ContainerHandle};
pub use network_provider::NetworkProvider;
pub use progress::ProgressSink;
pub use store::KeyValueStore;

/// Result of a call into a collaborator outside this process.
pub type ExternalResult<T> = std::result::Result<T, crate::ExternalError>;
