use provision_core::Service;
use provision_pool::{IpPool, PoolError};
use tracing::{debug, warn};

use crate::Result;
use crate::error::OperationError;
use crate::traits::KeyValueStore;

/// Mark the addresses of every persisted service of `app` as held in `pool`.
///
/// Run once at startup, before any saga, so a fresh pool never hands out an
/// address that a recorded service still uses. Addresses outside both ranges
/// (the ranges changed since the record was written) are skipped with a
/// warning. Returns the number of addresses claimed.
///
/// # Errors
///
/// Returns store errors, and `AlreadyHeld` if two records share an address.
pub fn restore_reservations<S: KeyValueStore>(
    store: &S,
    app: &str,
    pool: &IpPool,
) -> Result<usize> {
    let keys = store.keys(app).map_err(|source| OperationError::StoreRead {
        namespace: app.to_string(),
        key: "*".to_string(),
        source,
    })?;

    let mut claimed = 0;
    for key in keys {
        let Some(service) = store.get::<Service>(app, &key)? else {
            continue;
        };
        for addr in [service.internal_ip, service.external_ip].into_iter().flatten() {
            match pool.claim(addr) {
                Ok(tier) => {
                    debug!(service = %service.name, %addr, %tier, "restored reservation");
                    claimed += 1;
                }
                Err(PoolError::UnknownAddress(addr)) => {
                    warn!(service = %service.name, %addr, "recorded address is outside the pool");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use provision_pool::Tier;

    use super::*;
    use crate::providers::InMemoryStore;

    fn pool() -> IpPool {
        IpPool::new(
            "192.168.0.2-192.168.0.5".parse().expect("valid range"),
            "10.0.0.1-10.0.0.4".parse().expect("valid range"),
        )
        .expect("valid pool")
    }

    fn record(name: &str, local: [u8; 4], global: [u8; 4]) -> Service {
        let mut service = Service::new(name);
        service.internal_ip = Some(Ipv4Addr::from(local));
        service.external_ip = Some(Ipv4Addr::from(global));
        service
    }

    #[test]
    fn persisted_addresses_are_held_again() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.put("shop", "data.db", &record("data.db", [192, 168, 0, 2], [10, 0, 0, 1]))?;
        store.put("shop", "web", &record("web", [192, 168, 0, 3], [10, 0, 0, 2]))?;
        let pool = pool();

        let claimed = restore_reservations(&store, "shop", &pool)?;

        assert_eq!(claimed, 4);
        assert_eq!(pool.available(Tier::Local), 2);
        assert_eq!(pool.available(Tier::Global), 2);
        assert_ne!(pool.reserve_local()?, Ipv4Addr::new(192, 168, 0, 2));
        Ok(())
    }

    #[test]
    fn records_without_addresses_claim_nothing() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.put("shop", "data.db", &Service::new("data.db"))?;
        let pool = pool();

        assert_eq!(restore_reservations(&store, "shop", &pool)?, 0);
        assert_eq!(pool.available(Tier::Local), 4);
        Ok(())
    }

    #[test]
    fn address_outside_the_ranges_is_skipped() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.put("shop", "old", &record("old", [172, 16, 0, 9], [10, 0, 0, 1]))?;
        let pool = pool();

        assert_eq!(restore_reservations(&store, "shop", &pool)?, 1);
        assert!(pool.is_held(Ipv4Addr::new(10, 0, 0, 1)));
        Ok(())
    }

    #[test]
    fn shared_address_is_rejected() -> anyhow::Result<()> {
        let store = InMemoryStore::new();
        store.put("shop", "a", &record("a", [192, 168, 0, 2], [10, 0, 0, 1]))?;
        store.put("shop", "b", &record("b", [192, 168, 0, 2], [10, 0, 0, 2]))?;

        let err = restore_reservations(&store, "shop", &pool()).expect_err("conflict");

        assert!(matches!(
            err,
            OperationError::Pool(PoolError::AlreadyHeld(addr)) if addr == Ipv4Addr::new(192, 168, 0, 2)
        ));
        Ok(())
    }
}
