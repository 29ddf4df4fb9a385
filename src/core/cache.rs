use crate::core::ent::*;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// unhealthy readings expire sooner so recovery shows up faster
pub const TTL_HEALTHY: Duration = Duration::from_secs(10 * 60);
pub const TTL_UNHEALTHY: Duration = Duration::from_secs(5 * 60);

/// Source of epoch milliseconds for cache bookkeeping.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

pub fn ttl_for(status: ServiceStatus) -> Duration {
    match status {
        ServiceStatus::Up => TTL_HEALTHY,
        _ => TTL_UNHEALTHY,
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: ServiceHealth,
    observed_at_millis: u64,
}

/// Last successful upstream check, shared by every request for the life of
/// the process. Entries only leave through TTL expiry.
#[derive(Debug, Default)]
pub struct HealthCache {
    entry: RwLock<Option<CacheEntry>>,
}

impl HealthCache {
    pub fn new() -> HealthCache {
        HealthCache::default()
    }

    /// Returns the cached result if it is still inside its TTL at `now_millis`.
    pub fn fresh(&self, now_millis: u64) -> Option<ServiceHealth> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        entry.as_ref().and_then(|entry| {
            let elapsed = now_millis.saturating_sub(entry.observed_at_millis);
            if u128::from(elapsed) < ttl_for(entry.data.status).as_millis() {
                Some(entry.data.clone())
            } else {
                None
            }
        })
    }

    pub fn store(&self, data: ServiceHealth, now_millis: u64) {
        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CacheEntry {
            data,
            observed_at_millis: now_millis,
        });
    }

    pub fn last_updated(&self) -> Option<u64> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        entry.as_ref().map(|entry| entry.observed_at_millis)
    }
}
