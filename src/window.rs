use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::QuotaError;

pub const WINDOW_SECONDS: i64 = 60;

// caller-supplied user id, opaque but never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(Arc<str>);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, QuotaError> {
        if raw.is_empty() {
            return Err(QuotaError::InvalidInput("userId is required".to_string()));
        }
        Ok(Self(Arc::from(raw)))
    }
}

impl Deref for UserId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// minutes since the unix epoch, one fixed window each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochMinute(i64);

impl EpochMinute {
    pub fn new(minute: i64) -> Self {
        Self(minute)
    }

    pub fn from_unix_seconds(seconds: i64) -> Self {
        // floor, also for instants before the epoch
        Self(seconds.div_euclid(WINDOW_SECONDS))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub fn start_seconds(&self) -> Option<i64> {
        self.0.checked_mul(WINDOW_SECONDS)
    }

    // window start as YYYY-MM-DDTHH:MM (utc), raw minute if out of range
    pub fn label(&self) -> String {
        match self
            .start_seconds()
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        {
            Some(start) => start.format("%Y-%m-%dT%H:%M").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for EpochMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// processes sharing a store must share a synced clock, skew is not corrected
pub trait Clock: Send + Sync {
    fn now_unix_seconds(&self) -> i64;

    fn current_minute(&self) -> EpochMinute {
        EpochMinute::from_unix_seconds(self.now_unix_seconds())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

// only moves when told to, clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(seconds: i64) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(seconds)),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_seconds(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
