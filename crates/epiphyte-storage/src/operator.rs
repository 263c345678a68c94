//! OpenDAL-backed store (memory, fs, s3 services)

use anyhow::{Context, Result};
use epiphyte_core::config::{StorageBackend, StorageConfig};
use epiphyte_core::{EpiphyteError, EpiphyteResult};
use opendal::{ErrorKind, Operator};
use std::path::Path;
use std::time::Duration;

use crate::KvStore;

/// Records stored as objects at `{prefix}/{key}`.
#[derive(Debug, Clone)]
pub struct OperatorStore {
    op: Operator,
    prefix: String,
}

impl OperatorStore {
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{key}", self.prefix)
        }
    }
}

impl KvStore for OperatorStore {
    async fn get(&self, key: &str) -> EpiphyteResult<Option<String>> {
        match self.op.read(&self.path(key)).await {
            Ok(buf) => {
                let value = String::from_utf8(buf.to_vec()).map_err(|e| {
                    EpiphyteError::InvalidResponse(format!("record {key} is not UTF-8: {e}"))
                })?;
                Ok(Some(value).filter(|v| !v.is_empty()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_opendal_error(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> EpiphyteResult<()> {
        let path = self.path(key);
        // Not atomic: concurrent writers may both pass this check
        if self.op.exists(&path).await.map_err(map_opendal_error)? {
            return Err(EpiphyteError::AlreadyExists(key.to_string()));
        }
        self.op
            .write(&path, value.as_bytes().to_vec())
            .await
            .map(|_| ())
            .map_err(map_opendal_error)
    }
}

fn map_opendal_error(e: opendal::Error) -> EpiphyteError {
    match e.kind() {
        ErrorKind::AlreadyExists | ErrorKind::ConditionNotMatch => {
            EpiphyteError::AlreadyExists(e.to_string())
        }
        _ if e.is_temporary() => {
            let msg = e.to_string();
            if msg.to_ascii_lowercase().contains("timeout") {
                EpiphyteError::Timeout(msg)
            } else {
                EpiphyteError::Connection(msg)
            }
        }
        _ => EpiphyteError::Storage(e.to_string()),
    }
}

/// Build an OpenDAL Operator for the configured fs or s3 backend.
///
/// No retry layer: transient failures surface to the caller unchanged.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let op = match cfg.backend {
        StorageBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            let builder = opendal::services::Fs::default().root(&root);
            Operator::new(builder)
                .context("creating OpenDAL fs operator")?
                .finish()
        }
        StorageBackend::S3 => Operator::new(s3_builder(cfg)?)
            .context("creating OpenDAL S3 operator")?
            .finish(),
        StorageBackend::Shortener => {
            anyhow::bail!("the shortener backend is not served by OpenDAL")
        }
    };

    Ok(op
        .layer(opendal::layers::LoggingLayer::default())
        .layer(opendal::layers::TimeoutLayer::new().with_timeout(timeout)))
}

/// S3 builder with credentials from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
/// (or the EPIPHYTE_ prefixed variants).
///
/// If `enforce_tls` is true and the endpoint uses HTTP, this returns an error.
/// Otherwise, a warning is logged for non-HTTPS endpoints.
fn s3_builder(cfg: &StorageConfig) -> Result<opendal::services::S3> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP, credentials are transmitted unencrypted"
        );
    }

    let access_key = std::env::var("AWS_ACCESS_KEY_ID")
        .or_else(|_| std::env::var("EPIPHYTE_ACCESS_KEY_ID"))
        .context("AWS_ACCESS_KEY_ID environment variable not set")?;
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .or_else(|_| std::env::var("EPIPHYTE_SECRET_ACCESS_KEY"))
        .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;

    Ok(opendal::services::S3::default()
        .endpoint(&cfg.endpoint)
        .region(&cfg.region)
        .bucket(&cfg.bucket)
        .access_key_id(&access_key)
        .secret_access_key(&secret_key))
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> String {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            format!("{home}/{rest}")
        }
        None => s.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(prefix: &str) -> OperatorStore {
        let op = Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish();
        OperatorStore::new(op, prefix)
    }

    #[test]
    fn test_path_joins_prefix() {
        assert_eq!(memory_store("threads/").path("abc"), "threads/abc");
        assert_eq!(memory_store("").path("abc"), "abc");
    }

    #[test]
    fn test_expand_tilde() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_tilde(Path::new("~/.local/share/epiphyte")),
            "/home/tester/.local/share/epiphyte"
        );
        assert_eq!(expand_tilde(Path::new("/var/lib/x")), "/var/lib/x");
    }

    #[test]
    fn test_build_operator_fs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = StorageConfig {
            backend: StorageBackend::Fs,
            root: tmp.path().to_path_buf(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_build_operator_rejects_shortener() {
        let cfg = StorageConfig::default();
        assert!(build_operator(&cfg).is_err());
    }

    #[test]
    fn test_s3_http_enforce_tls() {
        let cfg = StorageConfig {
            backend: StorageBackend::S3,
            endpoint: "http://insecure:8333".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let result = build_operator(&cfg);
        assert!(result.is_err(), "HTTP + enforce_tls must fail");
        assert!(result.unwrap_err().to_string().contains("enforce_tls"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = memory_store("t");
        assert_eq!(store.get("deadbeef").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = memory_store("t");
        store.set("deadbeef", "YQ==").await.unwrap();
        assert_eq!(store.get("deadbeef").await.unwrap().as_deref(), Some("YQ=="));
    }

    #[tokio::test]
    async fn test_set_occupied_key_conflicts() {
        let store = memory_store("t");
        store.set("deadbeef", "first").await.unwrap();
        let result = store.set("deadbeef", "second").await;
        assert!(matches!(result, Err(EpiphyteError::AlreadyExists(_))));
        // first write wins
        assert_eq!(store.get("deadbeef").await.unwrap().as_deref(), Some("first"));
    }
}
