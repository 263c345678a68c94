//! Fragmenter: fixed-size splitting of outbound messages
//!
//! A message of `S` bytes becomes exactly `ceil(S / max_size)` fragments;
//! an empty message becomes none.

use std::slice::Chunks;

use epiphyte_core::{EpiphyteError, EpiphyteResult, DEFAULT_FRAGMENT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragmenter {
    max_size: usize,
}

impl Fragmenter {
    pub fn new(max_size: usize) -> EpiphyteResult<Self> {
        if max_size == 0 {
            return Err(EpiphyteError::Config(
                "fragment size must be greater than zero".into(),
            ));
        }
        Ok(Self { max_size })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Split `message` into consecutive pieces of at most `max_size` bytes.
    pub fn split<'a>(&self, message: &'a [u8]) -> Chunks<'a, u8> {
        message.chunks(self.max_size)
    }

    /// Number of fragments a message of `len` bytes produces.
    pub fn count(&self, len: usize) -> usize {
        len.div_ceil(self.max_size)
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_FRAGMENT_SIZE,
        }
    }
}
