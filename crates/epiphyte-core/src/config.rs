use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EpiphyteError, EpiphyteResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpiphyteConfig {
    pub thread: ThreadConfig,
    pub kdf: KdfConfig,
    pub storage: StorageConfig,
}

impl EpiphyteConfig {
    /// Parse a TOML document and check the values the protocol depends on.
    pub fn from_toml(content: &str) -> EpiphyteResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| EpiphyteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EpiphyteResult<()> {
        if self.thread.fragment_size == 0 {
            return Err(EpiphyteError::Config(
                "thread.fragment_size must be greater than zero".into(),
            ));
        }
        if self.storage.timeout_secs == 0 {
            return Err(EpiphyteError::Config(
                "storage.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Genesis salt (default: "epiphyte")
    pub salt: String,
    /// Maximum plaintext bytes per chunk (default: 4096)
    pub fragment_size: usize,
}

/// Argon2id cost parameters.
///
/// These are part of the wire protocol: chains written with one set of
/// parameters cannot be read with another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / passes (default: 2)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Public link shortener over HTTP
    Shortener,
    /// Local directory (OpenDAL fs service)
    Fs,
    /// S3-compatible bucket (OpenDAL s3 service)
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend carries the records (default: shortener)
    pub backend: StorageBackend,
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Object prefix for OpenDAL backends
    pub prefix: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// Refuse plaintext HTTP S3 endpoints
    pub enforce_tls: bool,
    pub shortener: ShortenerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortenerConfig {
    /// Prefix the hex key is appended to for lookups
    pub get_url: String,
    /// Alias creation endpoint
    pub set_url: String,
    /// Redirect target; the encoded frame is appended after it
    pub target: String,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            salt: "epiphyte".into(),
            fragment_size: crate::types::DEFAULT_FRAGMENT_SIZE,
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            mem_cost_kib: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Shortener,
            timeout_secs: 10,
            prefix: "epiphyte".into(),
            root: PathBuf::from("~/.local/share/epiphyte"),
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "epiphyte".into(),
            enforce_tls: false,
            shortener: ShortenerConfig::default(),
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            get_url: "http://tinyurl.com/".into(),
            set_url: "http://tinyurl.com/create.php".into(),
            target: "http://127.0.0.1#".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[thread]
salt = "[PYTEST]"
fragment_size = 1024

[kdf]
mem_cost_kib = 65536
time_cost = 3
parallelism = 4

[storage]
backend = "s3"
timeout_secs = 30
endpoint = "https://s3.example.com:8333"
region = "us-west-2"
bucket = "threads"
enforce_tls = true

[storage.shortener]
get_url = "http://short.example/"
"#;
        let config = EpiphyteConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.thread.salt, "[PYTEST]");
        assert_eq!(config.thread.fragment_size, 1024);
        assert_eq!(config.kdf.mem_cost_kib, 65536);
        assert_eq!(config.kdf.parallelism, 4);
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.timeout_secs, 30);
        assert_eq!(config.storage.bucket, "threads");
        assert!(config.storage.enforce_tls);
        assert_eq!(config.storage.shortener.get_url, "http://short.example/");
        // untouched field keeps its default
        assert_eq!(
            config.storage.shortener.set_url,
            "http://tinyurl.com/create.php"
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config = EpiphyteConfig::from_toml("").unwrap();

        assert_eq!(config.thread.salt, "epiphyte");
        assert_eq!(config.thread.fragment_size, 4096);
        assert_eq!(config.kdf.mem_cost_kib, 19456);
        assert_eq!(config.kdf.time_cost, 2);
        assert_eq!(config.kdf.parallelism, 1);
        assert_eq!(config.storage.backend, StorageBackend::Shortener);
        assert_eq!(config.storage.timeout_secs, 10);
        assert_eq!(config.storage.shortener.target, "http://127.0.0.1#");
    }

    #[test]
    fn test_zero_fragment_size_rejected() {
        let result = EpiphyteConfig::from_toml("[thread]\nfragment_size = 0\n");
        assert!(matches!(result, Err(EpiphyteError::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = EpiphyteConfig::from_toml("[storage]\nbackend = \"ftp\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = EpiphyteConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = EpiphyteConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.thread.salt, parsed.thread.salt);
        assert_eq!(config.storage.backend, parsed.storage.backend);
        assert_eq!(config.kdf.mem_cost_kib, parsed.kdf.mem_cost_kib);
    }
}
