use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::StoreError;
use crate::store::{MIN_RETENTION_MINUTES, WindowStore};
use crate::window::{EpochMinute, UserId};

const CONDITIONAL_INCREMENT: &str = r#"
    local current = redis.call("GET", KEYS[1])
    if not current then
        return false
    end

    if tonumber(current) >= tonumber(ARGV[1]) then
        return false
    end

    return redis.call("INCR", KEYS[1])
"#;

#[derive(Clone, Debug)]
pub struct RedisWindowStoreOptions {
    // keys are <prefix>:<minute>:<user>, prefix must be non-empty without ':'
    pub prefix: String,
    // seconds a record lives after creation
    pub retention_seconds: u64,
}

// shared by every process on the same redis. the increment is a lua script,
// which redis runs atomically; creation is SET NX
#[derive(Clone)]
pub struct RedisWindowStore {
    connection_manager: ConnectionManager,
    prefix: String,
    retention_seconds: u64,
}

impl RedisWindowStore {
    pub async fn connect(url: &str, options: RedisWindowStoreOptions) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection_manager = client.get_connection_manager().await?;
        Self::new(connection_manager, options)
    }

    pub fn new(
        connection_manager: ConnectionManager,
        options: RedisWindowStoreOptions,
    ) -> Result<Self, StoreError> {
        if options.prefix.is_empty() {
            return Err(StoreError::InvalidConfig(
                "redis prefix must not be empty".to_string(),
            ));
        }
        if options.prefix.contains(':') {
            return Err(StoreError::InvalidConfig(
                "redis prefix must not contain colons".to_string(),
            ));
        }
        // ttl runs from creation, so two windows cover a straggler on the old minute
        if options.retention_seconds < MIN_RETENTION_MINUTES * 60 {
            return Err(StoreError::InvalidConfig(format!(
                "retention must be at least {} seconds",
                MIN_RETENTION_MINUTES * 60
            )));
        }

        Ok(Self {
            connection_manager,
            prefix: options.prefix,
            retention_seconds: options.retention_seconds,
        })
    }

    pub(crate) fn key(&self, user: &UserId, minute: EpochMinute) -> String {
        format!("{}:{}:{}", self.prefix, minute, &**user)
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn conditional_increment(
        &self,
        user: &UserId,
        minute: EpochMinute,
        limit: u64,
    ) -> Result<Option<u64>, StoreError> {
        let script = redis::Script::new(CONDITIONAL_INCREMENT);
        let mut connection_manager = self.connection_manager.clone();

        let count: Option<u64> = script
            .key(self.key(user, minute))
            .arg(limit)
            .invoke_async(&mut connection_manager)
            .await?;

        Ok(count)
    }

    async fn create_if_absent(
        &self,
        user: &UserId,
        minute: EpochMinute,
        initial_count: u64,
    ) -> Result<u64, StoreError> {
        let mut connection_manager = self.connection_manager.clone();

        let created: Option<String> = redis::cmd("SET")
            .arg(self.key(user, minute))
            .arg(initial_count)
            .arg("NX")
            .arg("EX")
            .arg(self.retention_seconds)
            .query_async(&mut connection_manager)
            .await?;

        match created {
            Some(_) => Ok(initial_count),
            None => Err(StoreError::AlreadyExists),
        }
    }

    async fn get(&self, user: &UserId, minute: EpochMinute) -> Result<Option<u64>, StoreError> {
        let mut connection_manager = self.connection_manager.clone();
        let count: Option<u64> = connection_manager.get(self.key(user, minute)).await?;
        Ok(count)
    }
}
