use std::net::Ipv4Addr;

use thiserror::Error;

use crate::pool::Tier;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    #[error("no free {tier} address left in the pool")]
    Exhausted { tier: Tier },

    #[error("address {0} is not currently reserved")]
    NotHeld(Ipv4Addr),

    #[error("address {0} is already reserved")]
    AlreadyHeld(Ipv4Addr),

    #[error("address {0} does not belong to any pool")]
    UnknownAddress(Ipv4Addr),

    #[error("{tier} range {range} overlaps the {other} range")]
    OverlappingRanges {
        tier: Tier,
        range: String,
        other: Tier,
    },

    #[error("invalid address range '{input}': {reason}")]
    InvalidRange { input: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, PoolError>;
