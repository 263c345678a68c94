//! Thread: the append-only chunk chain
//!
//! ```text
//! genesis ──link──▶ chunk₁ ──link──▶ chunk₂ ──link──▶ …
//!   data=""          data=m₁          data=m₂
//!
//! record for chunkₙ : key = chunkₙ₋₁.link, frame encrypted under KDF(chunkₙ₋₁.data, thread_id)
//! ```
//!
//! Every key depends on the predecessor's plaintext, so a chain can only be
//! read front to back.

use epiphyte_core::{Chunk, EpiphyteError, EpiphyteResult, Link, Salt, ThreadId};
use epiphyte_crypto::{decrypt_chunk, derive_chunk_key, derive_genesis_link, encrypt_chunk, KdfParams};

/// A chunk encrypted against the current tail but not yet part of the chain.
///
/// Persist `frame()` under `key()`, then hand it back to [`Thread::commit`].
#[derive(Debug)]
pub struct Sealed {
    key: Link,
    chunk: Chunk,
}

impl Sealed {
    /// Storage link: the link of the tail this chunk was sealed against.
    pub fn key(&self) -> &Link {
        &self.key
    }

    pub fn frame(&self) -> &[u8] {
        self.chunk.frame.as_deref().unwrap_or_default()
    }

    /// Link the sealed chunk will expose to its own successor.
    pub fn link(&self) -> &Link {
        &self.chunk.link
    }
}

pub struct Thread {
    id: ThreadId,
    params: KdfParams,
    genesis: Chunk,
    chunks: Vec<Chunk>,
}

impl Thread {
    /// Fresh chain holding only the genesis chunk.
    pub fn new(id: ThreadId, salt: &Salt, params: KdfParams) -> EpiphyteResult<Self> {
        let link = derive_genesis_link(salt, &id, &params)?;
        Ok(Self {
            id,
            params,
            genesis: Chunk::genesis(link),
            chunks: Vec::new(),
        })
    }

    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    pub fn genesis(&self) -> &Chunk {
        &self.genesis
    }

    /// Last chunk of the chain (the genesis chunk while empty).
    pub fn tail(&self) -> &Chunk {
        self.chunks.last().unwrap_or(&self.genesis)
    }

    /// Number of chunks after genesis.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks after genesis, in chain order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Plaintext of every chunk after genesis, in chain order.
    pub fn messages(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.chunks.iter().map(|c| c.data.as_slice())
    }

    /// Decrypt a frame fetched at the tail's link and append it.
    pub fn follow(&mut self, frame: Vec<u8>) -> EpiphyteResult<&Chunk> {
        let key = derive_chunk_key(&self.tail().data, &self.id, &self.params)?;
        let (link, data) = decrypt_chunk(&key, &frame)?;
        self.chunks.push(Chunk {
            link,
            data,
            frame: Some(frame),
        });
        Ok(self.tail())
    }

    /// Encrypt `data` as the successor of the current tail without
    /// appending it.
    pub fn seal(&self, data: &[u8]) -> EpiphyteResult<Sealed> {
        let tail = self.tail();
        let key = derive_chunk_key(&tail.data, &self.id, &self.params)?;
        let (link, frame) = encrypt_chunk(&key, data);
        Ok(Sealed {
            key: tail.link,
            chunk: Chunk {
                link,
                data: data.to_vec(),
                frame: Some(frame),
            },
        })
    }

    /// Append a sealed chunk. Fails if the tail moved since sealing.
    pub fn commit(&mut self, sealed: Sealed) -> EpiphyteResult<&Chunk> {
        if sealed.key != self.tail().link {
            return Err(EpiphyteError::StaleSeal);
        }
        self.chunks.push(sealed.chunk);
        Ok(self.tail())
    }

    /// Seal and immediately commit `data`.
    ///
    /// Returns the `(storage link, frame)` record the caller must persist.
    pub fn append_plaintext(&mut self, data: &[u8]) -> EpiphyteResult<(Link, Vec<u8>)> {
        let sealed = self.seal(data)?;
        let record = (*sealed.key(), sealed.frame().to_vec());
        self.commit(sealed)?;
        Ok(record)
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the id is the shared secret
        f.debug_struct("Thread")
            .field("genesis", &self.genesis.link)
            .field("len", &self.chunks.len())
            .finish()
    }
}
