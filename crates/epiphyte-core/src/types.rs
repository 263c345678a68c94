use std::fmt;

use crate::error::{EpiphyteError, EpiphyteResult};

/// Length of a link in bytes (protocol v1)
pub const LINK_SIZE: usize = 20;

/// Genesis salt used when none is configured
pub const DEFAULT_SALT: &[u8] = b"epiphyte";

/// Maximum plaintext bytes carried by a single chunk
pub const DEFAULT_FRAGMENT_SIZE: usize = 4096;

/// Identifier shared by every participant of a thread.
///
/// Only hides the thread from casual observation: anyone able to guess it
/// can derive the whole chain.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ThreadId(Vec<u8>);

impl ThreadId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({self})")
    }
}

/// Domain separator for the genesis derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::new(DEFAULT_SALT)
    }
}

impl From<&str> for Salt {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Fixed-length chunk identifier: the storage key of the *next* chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link([u8; LINK_SIZE]);

impl Link {
    pub fn from_bytes(bytes: [u8; LINK_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> EpiphyteResult<Self> {
        let arr: [u8; LINK_SIZE] = bytes.try_into().map_err(|_| {
            EpiphyteError::MalformedFrame(format!(
                "link must be {LINK_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; LINK_SIZE] {
        &self.0
    }

    /// Lowercase hex form, used as the storage key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.to_hex())
    }
}

/// One unit of a thread.
///
/// `frame` is `None` only for the genesis chunk, which is never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pub link: Link,
    pub data: Vec<u8>,
    pub frame: Option<Vec<u8>>,
}

impl Chunk {
    /// The synthetic first chunk: empty data, no frame.
    pub fn genesis(link: Link) -> Self {
        Self {
            link,
            data: Vec::new(),
            frame: None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.frame.is_none()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("link", &self.link)
            .field("data_len", &self.data.len())
            .field("frame_len", &self.frame.as_ref().map(Vec::len))
            .finish()
    }
}
