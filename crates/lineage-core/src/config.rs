//! Config - 環境変数（.env を含む）からの設定
//!
//! | 変数 | 既定値 |
//! |------|--------|
//! | `LINEAGE_SOURCE_URL` | `https://roglo.eu/roglo_f?lang=fr;i=` |
//! | `LINEAGE_SOURCE_USER` / `LINEAGE_SOURCE_PASSWORD` | なし（認証なし） |
//! | `LINEAGE_SOURCE_TIMEOUT_SECS` | 30 |
//! | `LINEAGE_STORE_DIR` | `./data/ancestors` |
//! | `LINEAGE_WORKERS` | 4 |
//! | `LINEAGE_THROTTLE_MIN_MS` / `LINEAGE_THROTTLE_MAX_MS` | 1000 / 2500 |
//! | `LINEAGE_MAX_RECEIVES` | 5（1〜100） |
//! | `LINEAGE_RETRY_BASE_MS` | 2000 |
//! | `LINEAGE_TASK_TIMEOUT_SECS` | 60 |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::LineageError;
use crate::queue::{MAX_RECEIVES_LIMIT, RetryPolicy};

pub const DEFAULT_SOURCE_URL: &str = "https://roglo.eu/roglo_f?lang=fr;i=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub store_dir: PathBuf,
    pub workers: usize,
    pub throttle_min: Duration,
    pub throttle_max: Duration,
    pub retry: RetryPolicy,
    pub task_timeout: Duration,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, LineageError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LineageError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let source = SourceConfig {
            base_url: get("LINEAGE_SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            username: get("LINEAGE_SOURCE_USER"),
            password: get("LINEAGE_SOURCE_PASSWORD"),
            timeout_secs: parse_or(&get, "LINEAGE_SOURCE_TIMEOUT_SECS", 30)?,
        };

        let throttle_min = Duration::from_millis(parse_or(&get, "LINEAGE_THROTTLE_MIN_MS", 1000)?);
        let throttle_max = Duration::from_millis(parse_or(&get, "LINEAGE_THROTTLE_MAX_MS", 2500)?);
        if throttle_min > throttle_max {
            return Err(LineageError::Config(format!(
                "LINEAGE_THROTTLE_MIN_MS ({}) exceeds LINEAGE_THROTTLE_MAX_MS ({})",
                throttle_min.as_millis(),
                throttle_max.as_millis()
            )));
        }

        let workers: usize = parse_or(&get, "LINEAGE_WORKERS", 4)?;
        if workers == 0 {
            return Err(LineageError::Config("LINEAGE_WORKERS must be at least 1".into()));
        }

        let max_receives: u32 = parse_or(&get, "LINEAGE_MAX_RECEIVES", 5)?;
        if !(1..=MAX_RECEIVES_LIMIT).contains(&max_receives) {
            return Err(LineageError::Config(format!(
                "LINEAGE_MAX_RECEIVES must be between 1 and {MAX_RECEIVES_LIMIT}"
            )));
        }

        Ok(Self {
            source,
            store_dir: get("LINEAGE_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/ancestors")),
            workers,
            throttle_min,
            throttle_max,
            retry: RetryPolicy::new(
                Duration::from_millis(parse_or(&get, "LINEAGE_RETRY_BASE_MS", 2000)?),
                max_receives,
            ),
            task_timeout: Duration::from_secs(parse_or(&get, "LINEAGE_TASK_TIMEOUT_SECS", 60)?),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, LineageError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LineageError::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
