use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::window::{EpochMinute, UserId};

mod memory;
pub use memory::*;

mod timeout;
pub use timeout::*;

#[cfg(feature = "redis")]
mod redis_store;
#[cfg(feature = "redis")]
pub use redis_store::*;

// windows a store keeps, current one included. two is the floor: a request
// that read minute m just before the boundary must still find m's record
pub const MIN_RETENTION_MINUTES: u64 = 2;
pub const MAX_RETENTION_MINUTES: u64 = 1440;

// one record per (user, minute). the store owns atomicity, callers never
// read-modify-write a count
#[async_trait]
pub trait WindowStore: Send + Sync {
    // None when no record exists or it is already at `limit`
    async fn conditional_increment(
        &self,
        user: &UserId,
        minute: EpochMinute,
        limit: u64,
    ) -> Result<Option<u64>, StoreError>;

    // AlreadyExists if a record is there, nothing is overwritten
    async fn create_if_absent(
        &self,
        user: &UserId,
        minute: EpochMinute,
        initial_count: u64,
    ) -> Result<u64, StoreError>;

    async fn get(&self, user: &UserId, minute: EpochMinute) -> Result<Option<u64>, StoreError>;
}

#[async_trait]
impl<S: WindowStore + ?Sized> WindowStore for Arc<S> {
    async fn conditional_increment(
        &self,
        user: &UserId,
        minute: EpochMinute,
        limit: u64,
    ) -> Result<Option<u64>, StoreError> {
        (**self).conditional_increment(user, minute, limit).await
    }

    async fn create_if_absent(
        &self,
        user: &UserId,
        minute: EpochMinute,
        initial_count: u64,
    ) -> Result<u64, StoreError> {
        (**self).create_if_absent(user, minute, initial_count).await
    }

    async fn get(&self, user: &UserId, minute: EpochMinute) -> Result<Option<u64>, StoreError> {
        (**self).get(user, minute).await
    }
}
