use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::error::{QuotaError, StoreError};
use crate::metrics::{ALLOWED_TOTAL, DECISION_LATENCY, DENIED_TOTAL, REQUEST_TOTAL, STORE_ERRORS};
use crate::store::WindowStore;
use crate::window::{Clock, EpochMinute, UserId};

// requests per user per minute, never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(u64);

impl Limit {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Limit {
    type Error = QuotaError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(QuotaError::InvalidInput(
                "rate limit per minute must be greater than 0".to_string(),
            ));
        }
        Ok(Self(value))
    }
}

// what a request that lost the race to create the window record gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CreateConflictPolicy {
    // under-counts one admissible request per lost race when L >= 2
    Deny,
    // one more conditional increment, admits exactly min(N, L)
    #[default]
    #[value(name = "retry")]
    RetryIncrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { count: u64 },
    Denied,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Decision::Allowed { count } => Some(*count),
            Decision::Denied => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub user_id: UserId,
    // window start, YYYY-MM-DDTHH:MM utc
    pub minute: String,
    pub count: u64,
    pub limit: u64,
}

// stateless: every decision comes from the clock and the store, so any number
// of limiters can share one store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    limit: Limit,
    on_create_conflict: CreateConflictPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, clock: Arc<dyn Clock>, limit: Limit) -> Self {
        Self {
            store,
            clock,
            limit,
            on_create_conflict: CreateConflictPolicy::default(),
        }
    }

    pub fn with_create_conflict_policy(mut self, policy: CreateConflictPolicy) -> Self {
        self.on_create_conflict = policy;
        self
    }

    pub fn limit(&self) -> u64 {
        self.limit.get()
    }

    // store failures come back as StoreUnavailable, never retried here
    pub async fn try_consume(&self, user: &str) -> Result<Decision, QuotaError> {
        let user = UserId::parse(user)?;
        let minute = self.clock.current_minute();

        REQUEST_TOTAL.inc();
        let start_time = Instant::now();
        let result = self.decide(&user, minute).await;
        DECISION_LATENCY.observe(start_time.elapsed().as_secs_f64());

        match &result {
            Ok(Decision::Allowed { count }) => {
                ALLOWED_TOTAL.inc();
                tracing::debug!(user = %user, minute = %minute, count, "request allowed");
            }
            Ok(Decision::Denied) => {
                DENIED_TOTAL.inc();
                tracing::debug!(user = %user, minute = %minute, "rate limit exceeded");
            }
            Err(err) => {
                STORE_ERRORS.inc();
                tracing::warn!(user = %user, minute = %minute, error = %err, "quota check failed");
            }
        }

        Ok(result?)
    }

    async fn decide(&self, user: &UserId, minute: EpochMinute) -> Result<Decision, StoreError> {
        let limit = self.limit.get();

        if let Some(count) = self.store.conditional_increment(user, minute, limit).await? {
            return Ok(Decision::Allowed { count });
        }

        // no match: either nothing exists yet, or the window is saturated
        if let Some(existing) = self.store.get(user, minute).await? {
            if existing < limit {
                // created by a concurrent request after our increment missed it
                return self.on_lost_race(user, minute).await;
            }
            return Ok(Decision::Denied);
        }

        match self.store.create_if_absent(user, minute, 1).await {
            Ok(count) => Ok(Decision::Allowed { count }),
            Err(StoreError::AlreadyExists) => self.on_lost_race(user, minute).await,
            Err(err) => Err(err),
        }
    }

    async fn on_lost_race(
        &self,
        user: &UserId,
        minute: EpochMinute,
    ) -> Result<Decision, StoreError> {
        match self.on_create_conflict {
            CreateConflictPolicy::Deny => Ok(Decision::Denied),
            CreateConflictPolicy::RetryIncrement => {
                // the record exists now, so a miss here means saturated
                let retried = self
                    .store
                    .conditional_increment(user, minute, self.limit.get())
                    .await?;
                Ok(match retried {
                    Some(count) => Decision::Allowed { count },
                    None => Decision::Denied,
                })
            }
        }
    }

    pub async fn usage(&self, user: &str) -> Result<UsageInfo, QuotaError> {
        let user = UserId::parse(user)?;
        let minute = self.clock.current_minute();

        let count = match self.store.get(&user, minute).await {
            Ok(count) => count.unwrap_or(0),
            Err(err) => {
                STORE_ERRORS.inc();
                tracing::warn!(user = %user, minute = %minute, error = %err, "usage lookup failed");
                return Err(err.into());
            }
        };

        Ok(UsageInfo {
            user_id: user,
            minute: minute.label(),
            count,
            limit: self.limit.get(),
        })
    }
}
