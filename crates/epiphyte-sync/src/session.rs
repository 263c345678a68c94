//! Session: one thread synchronized against one store
//!
//! - `pull`: fetch at the tail's link until the store reports not-found
//! - `push`: pull, fragment, then seal → store → commit each fragment in order
//!
//! Push is not atomic. A fragment is committed to the local chain only after
//! its record is stored, so when a store call fails the local chain matches
//! the remote one: it ends at the last fragment that was stored, and the
//! next push continues from there. Nothing is rolled back remotely.
//!
//! There is no locking. Two writers sealing against the same tail target the
//! same storage key; whichever stores second gets `AlreadyExists` from a
//! set-if-absent store, or silently forks the chain on a store that
//! overwrites.

use epiphyte_core::config::EpiphyteConfig;
use epiphyte_core::{EpiphyteResult, Salt, ThreadId};
use epiphyte_crypto::KdfParams;
use epiphyte_storage::{fetch_frame, store_frame, KvStore};
use tracing::{debug, info, warn};

use crate::fragment::Fragmenter;
use crate::thread::Thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub kdf: KdfParams,
    pub fragment_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::PROTOCOL,
            fragment_size: epiphyte_core::DEFAULT_FRAGMENT_SIZE,
        }
    }
}

impl SessionOptions {
    pub fn from_config(cfg: &EpiphyteConfig) -> Self {
        Self {
            kdf: KdfParams::from(&cfg.kdf),
            fragment_size: cfg.thread.fragment_size,
        }
    }
}

/// Where the session stands relative to the remote chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Nothing fetched yet
    Genesis,
    /// Traversal started but has not reached the end of the chain
    Following,
    /// The last fetch returned not-found
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushReceipt {
    /// Chunks picked up by the resync before writing
    pub pulled: usize,
    /// Fragments stored for the message
    pub fragments: usize,
}

pub struct Session<S> {
    thread: Thread,
    store: S,
    fragmenter: Fragmenter,
    state: ChainState,
}

impl<S: KvStore> Session<S> {
    /// Build the thread without touching the store.
    pub fn new(
        thread_id: ThreadId,
        salt: &Salt,
        store: S,
        opts: SessionOptions,
    ) -> EpiphyteResult<Self> {
        let fragmenter = Fragmenter::new(opts.fragment_size)?;
        let thread = Thread::new(thread_id, salt, opts.kdf)?;
        debug!(genesis = %thread.genesis().link, "thread created");
        Ok(Self {
            thread,
            store,
            fragmenter,
            state: ChainState::Genesis,
        })
    }

    /// Build the thread and synchronize it with everything stored so far.
    pub async fn open(
        thread_id: ThreadId,
        salt: &Salt,
        store: S,
        opts: SessionOptions,
    ) -> EpiphyteResult<Self> {
        let mut session = Self::new(thread_id, salt, store, opts)?;
        session.pull().await?;
        Ok(session)
    }

    /// Follow the chain until not-found. Returns the number of new chunks.
    ///
    /// Chunks decrypted before a failing fetch stay in the thread.
    pub async fn pull(&mut self) -> EpiphyteResult<usize> {
        let mut fetched = 0;
        self.state = ChainState::Following;

        loop {
            let link = self.thread.tail().link;
            let Some(frame) = fetch_frame(&self.store, &link).await? else {
                break;
            };
            self.thread.follow(frame)?;
            fetched += 1;
            debug!(key = %link, index = self.thread.len(), "followed chunk");
        }

        self.state = ChainState::Synced;
        info!(
            genesis = %self.thread.genesis().link,
            fetched,
            total = self.thread.len(),
            "pull complete"
        );
        Ok(fetched)
    }

    /// Append `message` to the thread, split into bounded fragments.
    pub async fn push(&mut self, message: &[u8]) -> EpiphyteResult<PushReceipt> {
        let pulled = self.pull().await?;
        let fragments = self.fragmenter.count(message.len());

        for (index, piece) in self.fragmenter.split(message).enumerate() {
            let sealed = self.thread.seal(piece)?;
            if let Err(e) = store_frame(&self.store, sealed.key(), sealed.frame()).await {
                warn!(
                    genesis = %self.thread.genesis().link,
                    stored = index,
                    fragments,
                    error = %e,
                    "push interrupted, remote chain ends at the last stored fragment"
                );
                return Err(e);
            }
            self.thread.commit(sealed)?;
        }

        info!(
            genesis = %self.thread.genesis().link,
            fragments,
            total = self.thread.len(),
            "push complete"
        );
        Ok(PushReceipt { pulled, fragments })
    }

    /// Plaintext of every chunk seen so far, in chain order.
    pub fn messages(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.thread.messages()
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
