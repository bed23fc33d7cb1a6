use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::{Duration, interval};

use crate::error::StoreError;
use crate::metrics::MEMORY_RECORDS;
use crate::store::{MAX_RETENTION_MINUTES, MIN_RETENTION_MINUTES, WindowStore};
use crate::window::{Clock, EpochMinute, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    user: UserId,
    minute: EpochMinute,
}

// in-process store, both mutations run under the key's shard write lock
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    records: DashMap<WindowKey, u64>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // returns how many records were removed
    pub fn purge_before(&self, cutoff: EpochMinute) -> usize {
        let before = self.records.len();
        self.records.retain(|key, _| key.minute >= cutoff);
        let removed = before.saturating_sub(self.records.len());
        MEMORY_RECORDS.set(self.records.len() as f64);
        removed
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn conditional_increment(
        &self,
        user: &UserId,
        minute: EpochMinute,
        limit: u64,
    ) -> Result<Option<u64>, StoreError> {
        let key = WindowKey {
            user: user.clone(),
            minute,
        };

        // get_mut holds the shard write lock until `count` is dropped
        match self.records.get_mut(&key) {
            Some(mut count) if *count < limit => {
                *count += 1;
                Ok(Some(*count))
            }
            _ => Ok(None),
        }
    }

    async fn create_if_absent(
        &self,
        user: &UserId,
        minute: EpochMinute,
        initial_count: u64,
    ) -> Result<u64, StoreError> {
        let key = WindowKey {
            user: user.clone(),
            minute,
        };

        match self.records.entry(key) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(initial_count);
                MEMORY_RECORDS.inc();
                Ok(initial_count)
            }
        }
    }

    async fn get(&self, user: &UserId, minute: EpochMinute) -> Result<Option<u64>, StoreError> {
        let key = WindowKey {
            user: user.clone(),
            minute,
        };
        Ok(self.records.get(&key).map(|count| *count))
    }
}

// oldest window kept: the current one plus `retention_minutes - 1` before it.
// never fewer than MIN_RETENTION_MINUTES, so a straggler still working on the
// previous minute finds its record
pub fn retention_cutoff(current: EpochMinute, retention_minutes: u64) -> EpochMinute {
    let keep = retention_minutes.clamp(MIN_RETENTION_MINUTES, MAX_RETENTION_MINUTES);
    let keep = i64::try_from(keep).unwrap_or(i64::MAX);
    EpochMinute::new(current.value().saturating_sub(keep - 1))
}

// Retention sweep - runs every `sweep_interval`, drops windows before the cutoff
pub async fn retention_sweeper(
    store: Arc<MemoryWindowStore>,
    clock: Arc<dyn Clock>,
    retention_minutes: u64,
    sweep_interval: Duration,
) {
    let mut interval = interval(sweep_interval);

    tracing::info!(
        retention_minutes,
        interval = ?sweep_interval,
        "retention sweeper started"
    );

    loop {
        interval.tick().await;

        let cutoff = retention_cutoff(clock.current_minute(), retention_minutes);
        let removed = store.purge_before(cutoff);

        if removed > 0 {
            tracing::debug!(removed, cutoff = %cutoff, "purged expired window records");
        }
    }
}
