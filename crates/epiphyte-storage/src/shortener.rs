//! Public link-shortener backend
//!
//! Each record is an alias whose redirect target carries the value in its
//! URL fragment:
//!
//! ```text
//! GET  {get_url}{key}                          -> 301 Location: {target}{value}
//! POST {set_url}?url={target}{value}&alias={key}
//! ```

use std::time::Duration;

use epiphyte_core::config::{ShortenerConfig, StorageConfig};
use epiphyte_core::{EpiphyteError, EpiphyteResult};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::KvStore;

#[derive(Debug, Clone)]
pub struct ShortenerStore {
    client: Client,
    cfg: ShortenerConfig,
}

impl ShortenerStore {
    /// Build a store whose requests never follow redirects and give up
    /// after `timeout`.
    pub fn new(cfg: ShortenerConfig, timeout: Duration) -> EpiphyteResult<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| EpiphyteError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }

    pub fn from_config(cfg: &StorageConfig) -> EpiphyteResult<Self> {
        Self::new(
            cfg.shortener.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

impl KvStore for ShortenerStore {
    async fn get(&self, key: &str) -> EpiphyteResult<Option<String>> {
        let url = format!("{}{key}", self.cfg.get_url);
        let response = self.client.get(&url).send().await.map_err(map_http_error)?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        parse_lookup(response.status().as_u16(), location.as_deref())
    }

    async fn set(&self, key: &str, value: &str) -> EpiphyteResult<()> {
        let target = format!("{}{value}", self.cfg.target);
        let response = self
            .client
            .post(&self.cfg.set_url)
            .query(&[("url", target.as_str()), ("alias", key)])
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_http_error)?;
        parse_create(status, &body, key)
    }
}

/// Interpret a lookup: 404 is the end of the chain, a 301 carries the value
/// after the last `#` of its Location.
fn parse_lookup(status: u16, location: Option<&str>) -> EpiphyteResult<Option<String>> {
    match status {
        404 => Ok(None),
        301 => {
            let location = location.ok_or_else(|| {
                EpiphyteError::InvalidResponse("redirect without Location header".into())
            })?;
            let (_, value) = location.rsplit_once('#').ok_or_else(|| {
                EpiphyteError::InvalidResponse("Location header carries no fragment".into())
            })?;
            Ok(Some(value.to_string()).filter(|v| !v.is_empty()))
        }
        other => Err(EpiphyteError::InvalidResponse(format!(
            "unexpected lookup status {other}"
        ))),
    }
}

fn parse_create(status: u16, body: &str, key: &str) -> EpiphyteResult<()> {
    if status != 200 {
        return Err(EpiphyteError::InvalidResponse(format!(
            "unexpected create status {status}"
        )));
    }
    if body.contains("not available") {
        return Err(EpiphyteError::AlreadyExists(key.to_string()));
    }
    Ok(())
}

fn map_http_error(e: reqwest::Error) -> EpiphyteError {
    if e.is_timeout() {
        EpiphyteError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        EpiphyteError::Connection(e.to_string())
    } else {
        EpiphyteError::InvalidResponse(e.to_string())
    }
}
