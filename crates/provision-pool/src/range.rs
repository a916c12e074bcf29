use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Largest number of addresses a single tier may hold.
const MAX_RANGE_LEN: u64 = 1 << 16;

/// Inclusive range of IPv4 addresses.
///
/// Parses from `first-last` (`192.168.0.2-192.168.0.254`), a CIDR block
/// (`10.0.0.0/24`, network and broadcast addresses excluded) or a single
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Range {
    first: u32,
    last: u32,
}

impl Ipv4Range {
    /// # Errors
    ///
    /// Returns `InvalidRange` if `last` precedes `first` or the range is too large.
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self, PoolError> {
        let range = Self {
            first: u32::from(first),
            last: u32::from(last),
        };
        range.validate(&format!("{first}-{last}"))?;
        Ok(range)
    }

    fn validate(self, input: &str) -> Result<(), PoolError> {
        if self.last < self.first {
            return Err(PoolError::InvalidRange {
                input: input.to_string(),
                reason: "last address precedes first address",
            });
        }
        if u64::from(self.last - self.first) + 1 > MAX_RANGE_LEN {
            return Err(PoolError::InvalidRange {
                input: input.to_string(),
                reason: "range holds more than 65536 addresses",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn first(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.first)
    }

    #[must_use]
    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.last)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (self.first..=self.last).contains(&u32::from(addr))
    }

    #[must_use]
    pub fn overlaps(&self, other: &Ipv4Range) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    pub(crate) fn index_of(&self, addr: Ipv4Addr) -> Option<usize> {
        self.contains(addr)
            .then(|| (u32::from(addr) - self.first) as usize)
    }

    pub(crate) fn nth(&self, index: usize) -> Ipv4Addr {
        // index < len() <= MAX_RANGE_LEN, so it fits in u32
        #[allow(clippy::cast_possible_truncation)]
        Ipv4Addr::from(self.first + index as u32)
    }

    fn parse_cidr(input: &str, addr: &str, prefix: &str) -> Result<Self, PoolError> {
        let addr = parse_addr(input, addr)?;
        let prefix: u32 = prefix.parse().map_err(|_| PoolError::InvalidRange {
            input: input.to_string(),
            reason: "prefix length is not a number",
        })?;
        if prefix > 32 {
            return Err(PoolError::InvalidRange {
                input: input.to_string(),
                reason: "prefix length exceeds 32",
            });
        }

        let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
        let network = u32::from(addr) & mask;
        let broadcast = network | !mask;

        let range = if prefix >= 31 {
            Self {
                first: network,
                last: broadcast,
            }
        } else {
            Self {
                first: network + 1,
                last: broadcast - 1,
            }
        };
        range.validate(input)?;
        Ok(range)
    }
}

fn parse_addr(input: &str, addr: &str) -> Result<Ipv4Addr, PoolError> {
    addr.trim().parse().map_err(|_| PoolError::InvalidRange {
        input: input.to_string(),
        reason: "not an IPv4 address",
    })
}

impl FromStr for Ipv4Range {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if let Some((addr, prefix)) = input.split_once('/') {
            return Self::parse_cidr(input, addr, prefix);
        }
        if let Some((first, last)) = input.split_once('-') {
            let range = Self {
                first: u32::from(parse_addr(input, first)?),
                last: u32::from(parse_addr(input, last)?),
            };
            range.validate(input)?;
            return Ok(range);
        }
        let single = u32::from(parse_addr(input, input)?);
        Ok(Self {
            first: single,
            last: single,
        })
    }
}

impl TryFrom<String> for Ipv4Range {
    type Error = PoolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Range> for String {
    fn from(range: Ipv4Range) -> Self {
        range.to_string()
    }
}

impl fmt::Display for Ipv4Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first(), self.last())
    }
}
