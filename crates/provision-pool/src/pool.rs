use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{PoolError, Result};
use crate::range::Ipv4Range;

/// Which of the two disjoint address pools an address comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Addresses on the internal container network.
    Local,
    /// Addresses routed from the host into a container.
    Global,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Fixed arena of address slots with an index free-list.
#[derive(Debug)]
struct Slots {
    range: Ipv4Range,
    held: Vec<bool>,
    free: Vec<usize>,
}

impl Slots {
    fn new(range: Ipv4Range) -> Self {
        let len = range.len();
        Self {
            range,
            held: vec![false; len],
            // popped from the end, so the lowest address goes out first
            free: (0..len).rev().collect(),
        }
    }

    fn take(&mut self) -> Option<Ipv4Addr> {
        let index = self.free.pop()?;
        self.held[index] = true;
        Some(self.range.nth(index))
    }

    fn give_back(&mut self, index: usize) -> bool {
        if !self.held[index] {
            return false;
        }
        self.held[index] = false;
        self.free.push(index);
        true
    }

    fn claim(&mut self, index: usize) -> bool {
        if self.held[index] {
            return false;
        }
        self.held[index] = true;
        self.free.retain(|&free| free != index);
        true
    }
}

/// Two-tier pool of exclusively held IPv4 addresses.
///
/// Each tier is guarded by its own mutex; taking a free slot and marking it
/// held happen under one lock acquisition, so concurrent callers can never be
/// handed the same address.
#[derive(Debug)]
pub struct IpPool {
    local: Mutex<Slots>,
    global: Mutex<Slots>,
}

impl IpPool {
    /// Build a pool from the local and global ranges.
    ///
    /// # Errors
    ///
    /// Returns `OverlappingRanges` if the two ranges share any address.
    pub fn new(local: Ipv4Range, global: Ipv4Range) -> Result<Self> {
        if local.overlaps(&global) {
            return Err(PoolError::OverlappingRanges {
                tier: Tier::Local,
                range: local.to_string(),
                other: Tier::Global,
            });
        }
        Ok(Self {
            local: Mutex::new(Slots::new(local)),
            global: Mutex::new(Slots::new(global)),
        })
    }

    /// Reserve a free address on the internal container network.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` when every local address is held.
    pub fn reserve_local(&self) -> Result<Ipv4Addr> {
        self.reserve(Tier::Local)
    }

    /// Reserve a free host-routable address.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` when every global address is held.
    pub fn reserve_global(&self) -> Result<Ipv4Addr> {
        self.reserve(Tier::Global)
    }

    /// Reserve a free address from `tier`.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` when every address in the tier is held.
    pub fn reserve(&self, tier: Tier) -> Result<Ipv4Addr> {
        let addr = self
            .slots(tier)
            .take()
            .ok_or(PoolError::Exhausted { tier })?;
        debug!(%addr, %tier, "reserved address");
        Ok(addr)
    }

    /// Return a reserved address to its pool.
    ///
    /// # Errors
    ///
    /// Returns `NotHeld` if the address is free already (a double release)
    /// and `UnknownAddress` if it belongs to neither pool.
    pub fn release(&self, addr: Ipv4Addr) -> Result<()> {
        let (tier, index) = self.locate(addr)?;
        if !self.slots(tier).give_back(index) {
            return Err(PoolError::NotHeld(addr));
        }
        debug!(%addr, %tier, "released address");
        Ok(())
    }

    /// Mark a specific address as held.
    ///
    /// Used at startup to carry reservations of persisted services over into
    /// a fresh pool.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyHeld` if the address is reserved and `UnknownAddress`
    /// if it belongs to neither pool.
    pub fn claim(&self, addr: Ipv4Addr) -> Result<Tier> {
        let (tier, index) = self.locate(addr)?;
        if !self.slots(tier).claim(index) {
            return Err(PoolError::AlreadyHeld(addr));
        }
        debug!(%addr, %tier, "claimed address");
        Ok(tier)
    }

    #[must_use]
    pub fn is_held(&self, addr: Ipv4Addr) -> bool {
        self.locate(addr)
            .is_ok_and(|(tier, index)| self.slots(tier).held[index])
    }

    /// Number of free addresses in `tier`.
    #[must_use]
    pub fn available(&self, tier: Tier) -> usize {
        self.slots(tier).free.len()
    }

    /// Total number of addresses in `tier`.
    #[must_use]
    pub fn capacity(&self, tier: Tier) -> usize {
        self.slots(tier).held.len()
    }

    fn locate(&self, addr: Ipv4Addr) -> Result<(Tier, usize)> {
        [Tier::Local, Tier::Global]
            .into_iter()
            .find_map(|tier| {
                self.slots(tier)
                    .range
                    .index_of(addr)
                    .map(|index| (tier, index))
            })
            .ok_or(PoolError::UnknownAddress(addr))
    }

    fn slots(&self, tier: Tier) -> MutexGuard<'_, Slots> {
        let slots = match tier {
            Tier::Local => &self.local,
            Tier::Global => &self.global,
        };
        // every mutation completes before the guard drops, so a poisoned
        // lock still guards consistent slots
        slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
