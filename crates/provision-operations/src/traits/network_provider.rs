use std::net::Ipv4Addr;

use super::ExternalResult;

/// Host-side networking for containers reachable on a global address.
pub trait NetworkProvider: Send + Sync {
    /// Bind `ip` to the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be added.
    fn add_ip(&self, ip: Ipv4Addr) -> ExternalResult<()>;

    /// # Errors
    ///
    /// Returns an error if the address cannot be removed.
    fn remove_ip(&self, ip: Ipv4Addr) -> ExternalResult<()>;

    /// Translate traffic for `global` to `local` and back.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation rules cannot be installed.
    fn add_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()>;

    /// # Errors
    ///
    /// Returns an error if the translation rules cannot be removed.
    fn remove_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()>;
}
