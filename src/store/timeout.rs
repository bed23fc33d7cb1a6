use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::WindowStore;
use crate::window::{EpochMinute, UserId};

// a call that runs out of time has an unknown outcome, reported as Unavailable
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: WindowStore> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{op} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl<S: WindowStore> WindowStore for TimeoutStore<S> {
    async fn conditional_increment(
        &self,
        user: &UserId,
        minute: EpochMinute,
        limit: u64,
    ) -> Result<Option<u64>, StoreError> {
        self.bounded(
            "conditional_increment",
            self.inner.conditional_increment(user, minute, limit),
        )
        .await
    }

    async fn create_if_absent(
        &self,
        user: &UserId,
        minute: EpochMinute,
        initial_count: u64,
    ) -> Result<u64, StoreError> {
        self.bounded(
            "create_if_absent",
            self.inner.create_if_absent(user, minute, initial_count),
        )
        .await
    }

    async fn get(&self, user: &UserId, minute: EpochMinute) -> Result<Option<u64>, StoreError> {
        self.bounded("get", self.inner.get(user, minute)).await
    }
}
