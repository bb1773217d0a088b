//! The caching resolver.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{NameLookup, Network, ResolveError};
use crate::cache::SyncLru;
use crate::config::ResolverConfig;
use crate::observability::metrics;
use crate::singleflight::Group;

/// Addresses shared between the cache and every caller.
pub type Addresses = Arc<[IpAddr]>;

#[derive(Clone)]
struct CachedAddrs {
    addrs: Addresses,
    expires_at: Instant,
}

/// Resolver that caches successful lookups and coalesces concurrent misses.
pub struct CachedResolver<L> {
    lookup: L,
    cache: SyncLru<String, CachedAddrs>,
    flights: Group<String, Addresses, ResolveError>,
    ttl: Duration,
    lookup_timeout: Duration,
}

impl<L: NameLookup> CachedResolver<L> {
    /// Build a resolver over `lookup`.
    ///
    /// # Panics
    ///
    /// Panics if `config.cache_size` is zero; validated configs never are.
    pub fn new(lookup: L, config: &ResolverConfig) -> Self {
        Self {
            lookup,
            cache: SyncLru::new(config.cache_size),
            flights: Group::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            lookup_timeout: Duration::from_secs(config.lookup_timeout_secs),
        }
    }

    /// Resolve `host` to its addresses within `network`.
    ///
    /// Dropping the returned future abandons only this caller; a lookup
    /// already running for other callers continues.
    pub async fn lookup_addresses(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Addresses, ResolveError> {
        let key = format!("{network}{host}");

        if let Some(addrs) = self.fresh(&key) {
            metrics::record_resolver_cache(true);
            return Ok(addrs);
        }
        metrics::record_resolver_cache(false);

        self.flights
            .work(key.clone(), move || async move {
                // populated by a flight that finished after our first check
                if let Some(addrs) = self.fresh(&key) {
                    return Ok(addrs);
                }

                let addrs = self.query(network, host).await;
                metrics::record_lookup(if addrs.is_ok() { "ok" } else { "error" });
                let addrs = addrs?;

                self.cache.add(
                    key,
                    CachedAddrs {
                        addrs: Arc::clone(&addrs),
                        expires_at: Instant::now() + self.ttl,
                    },
                );
                Ok(addrs)
            })
            .await
    }

    /// Number of cached entries, expired ones included until touched.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    async fn query(&self, network: Network, host: &str) -> Result<Addresses, ResolveError> {
        let lookup = self.lookup.lookup_ip(network, host);
        let ips = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(ips)) => ips,
            Ok(Err(e)) => {
                tracing::debug!(host, network = %network, error = %e, "Lookup failed");
                return Err(ResolveError::Lookup {
                    host: host.to_string(),
                    source: Arc::new(e),
                });
            }
            Err(_) => {
                tracing::debug!(host, network = %network, "Lookup timed out");
                return Err(ResolveError::Timeout {
                    host: host.to_string(),
                    timeout: self.lookup_timeout,
                });
            }
        };

        if ips.is_empty() {
            return Err(ResolveError::NoAddresses {
                host: host.to_string(),
            });
        }

        tracing::trace!(host, network = %network, count = ips.len(), "Resolved");
        Ok(ips.into())
    }

    fn fresh(&self, key: &str) -> Option<Addresses> {
        let entry = self.cache.get(key)?;
        if entry.expires_at <= Instant::now() {
            self.cache.remove(key);
            return None;
        }
        Some(entry.addrs)
    }
}
