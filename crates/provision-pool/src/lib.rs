//! Exclusive IP address reservations for provisioned containers.
//!
//! Addresses come from two disjoint tiers: local addresses used inside the
//! container network, and global addresses routed from the host. Every
//! reservation is held until it is explicitly released.

mod error;
mod pool;
mod range;

pub use error::{PoolError, Result};
pub use pool::{IpPool, Tier};
pub use range::Ipv4Range;
