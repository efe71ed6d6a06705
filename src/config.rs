//! Runtime configuration resolved from command-line flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{PaymentError, Result};

pub const DEFAULT_STORE_PATH: &str = ".carepay/markers.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the portal API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Validates `base_url`: it must be an absolute http(s) URL that can carry a path.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| PaymentError::Config(format!("invalid API URL {base_url:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(PaymentError::Config(format!(
                "API URL must use http or https, got {}",
                base_url.scheme()
            )));
        }
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::Config(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        if timeout.is_zero() {
            return Err(PaymentError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self { base_url, timeout })
    }
}

/// Which marker store backs the pending-payment markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    JsonFile(PathBuf),
    /// `fallback` is the JSON file used when RocksDB support is compiled out.
    RocksDb { path: PathBuf, fallback: PathBuf },
}

impl StoreConfig {
    /// Picks RocksDB when a database path is given, the JSON file otherwise.
    pub fn select(store_path: PathBuf, db_path: Option<PathBuf>) -> Self {
        match db_path {
            Some(path) => Self::RocksDb {
                path,
                fallback: store_path,
            },
            None => Self::JsonFile(store_path),
        }
    }
}
