//! Storage record encoding: `hex(link) -> urlsafe_base64(frame)`

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use epiphyte_core::{EpiphyteError, EpiphyteResult, Link};
use tracing::debug;

use crate::KvStore;

/// Storage key for the record a link points at.
pub fn storage_key(link: &Link) -> String {
    link.to_hex()
}

/// URL-safe base64 (padded) form of a frame.
pub fn encode_frame(frame: &[u8]) -> String {
    URL_SAFE.encode(frame)
}

pub fn decode_frame(value: &str) -> EpiphyteResult<Vec<u8>> {
    URL_SAFE
        .decode(value)
        .map_err(|e| EpiphyteError::Decode(format!("frame is not url-safe base64: {e}")))
}

/// Fetch the frame stored behind `link`, or `None` at the end of the chain.
pub async fn fetch_frame<S: KvStore>(store: &S, link: &Link) -> EpiphyteResult<Option<Vec<u8>>> {
    let key = storage_key(link);
    match store.get(&key).await? {
        Some(value) if !value.is_empty() => {
            debug!(key = %key, len = value.len(), "record found");
            decode_frame(&value).map(Some)
        }
        _ => {
            debug!(key = %key, "record not found");
            Ok(None)
        }
    }
}

pub async fn store_frame<S: KvStore>(store: &S, link: &Link, frame: &[u8]) -> EpiphyteResult<()> {
    let key = storage_key(link);
    let value = encode_frame(frame);
    store.set(&key, &value).await?;
    debug!(key = %key, len = value.len(), "record stored");
    Ok(())
}
