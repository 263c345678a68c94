//! epiphyte-storage: the key-value transport a thread is smuggled through
//!
//! Keys are lowercase hex links, values URL-safe base64 frames (see
//! [`record`]). Stores are append-only: there is no delete.

pub mod operator;
pub mod record;
pub mod shortener;

use std::future::Future;

use epiphyte_core::config::{StorageBackend, StorageConfig};
use epiphyte_core::EpiphyteResult;

pub use operator::{build_operator, OperatorStore};
pub use record::{decode_frame, encode_frame, fetch_frame, storage_key, store_frame};
pub use shortener::ShortenerStore;

/// Capability interface over an external key-value service.
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// `Ok(None)` means not found, which terminates chain traversal.
    /// Transport failures must be reported as errors, never as `None`.
    fn get(&self, key: &str) -> impl Future<Output = EpiphyteResult<Option<String>>> + Send;

    /// Store `value` under a key that must not yet exist.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = EpiphyteResult<()>> + Send;
}

/// A store selected from configuration at runtime.
pub enum Store {
    Operator(OperatorStore),
    Shortener(ShortenerStore),
}

impl Store {
    pub fn from_config(cfg: &StorageConfig) -> anyhow::Result<Self> {
        match cfg.backend {
            StorageBackend::Shortener => Ok(Self::Shortener(ShortenerStore::from_config(cfg)?)),
            StorageBackend::Fs | StorageBackend::S3 => {
                let op = build_operator(cfg)?;
                Ok(Self::Operator(OperatorStore::new(op, &cfg.prefix)))
            }
        }
    }
}

impl KvStore for Store {
    async fn get(&self, key: &str) -> EpiphyteResult<Option<String>> {
        match self {
            Self::Operator(s) => s.get(key).await,
            Self::Shortener(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> EpiphyteResult<()> {
        match self {
            Self::Operator(s) => s.set(key, value).await,
            Self::Shortener(s) => s.set(key, value).await,
        }
    }
}
