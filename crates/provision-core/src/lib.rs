pub mod error;
mod env;
pub mod types;

pub use env::{EnvVars, env_namespace, env_prefix};
pub use error::*;
pub use types::*;
