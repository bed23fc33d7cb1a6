use clap::{Parser, ValueEnum};

use crate::limiter::CreateConflictPolicy;
use crate::store::{MAX_RETENTION_MINUTES, MIN_RETENTION_MINUTES};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Redis,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "minute-quota")]
#[command(about = "Per-user fixed-window request quota service")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Max accepted requests per user per calendar minute
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 10)]
    pub rate_limit_per_minute: u64,

    // Backend holding the window records
    #[arg(long, env = "QUOTA_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    // Only used with --store redis
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/")]
    pub redis_url: String,

    #[arg(long, env = "REDIS_PREFIX", default_value = "quota")]
    pub redis_prefix: String,

    // Upper bound for a single store round-trip
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    // How many windows (current one included) the store keeps
    #[arg(
        long,
        env = "RETENTION_MINUTES",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(MIN_RETENTION_MINUTES..=MAX_RETENTION_MINUTES)
    )]
    pub retention_minutes: u64,

    #[arg(long, env = "ON_CREATE_CONFLICT", value_enum, default_value_t = CreateConflictPolicy::RetryIncrement)]
    pub on_create_conflict: CreateConflictPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["minute-quota"]).unwrap();
        assert_eq!(args.rate_limit_per_minute, 10);
        assert_eq!(args.store, StoreKind::Memory);
        assert_eq!(args.on_create_conflict, CreateConflictPolicy::RetryIncrement);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "minute-quota",
            "--rate-limit-per-minute",
            "3",
            "--store",
            "redis",
            "--on-create-conflict",
            "deny",
        ])
        .unwrap();
        assert_eq!(args.rate_limit_per_minute, 3);
        assert_eq!(args.store, StoreKind::Redis);
        assert_eq!(args.on_create_conflict, CreateConflictPolicy::Deny);
    }

    #[test]
    fn retention_outside_bounds_is_rejected() {
        for value in ["0", "1", "1441", "18446744073709551615"] {
            let result =
                Args::try_parse_from(["minute-quota", "--retention-minutes", value]);
            assert!(result.is_err(), "retention {value} should be rejected");
        }

        let args = Args::try_parse_from(["minute-quota", "--retention-minutes", "2"]).unwrap();
        assert_eq!(args.retention_minutes, 2);
    }
}
