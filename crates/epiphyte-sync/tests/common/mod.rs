//! Shared fixtures: cheap KDF parameters and an instrumented in-memory store.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use epiphyte_core::{EpiphyteError, EpiphyteResult, Salt, ThreadId};
use epiphyte_crypto::KdfParams;
use epiphyte_storage::{KvStore, OperatorStore};
use epiphyte_sync::{Session, SessionOptions};
use opendal::Operator;

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        kdf: KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        },
        ..Default::default()
    }
}

/// OpenDAL memory store that counts calls and can be told to fail.
///
/// Clones share the same records and counters.
#[derive(Clone)]
pub struct TestStore {
    inner: OperatorStore,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    /// 1-based get call that fails with a connection error
    fail_get_at: Option<usize>,
    /// 1-based set call that fails with a timeout
    fail_set_at: Option<usize>,
}

impl TestStore {
    pub fn new() -> Self {
        let op = Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish();
        Self {
            inner: OperatorStore::new(op, "records"),
            gets: Arc::new(AtomicUsize::new(0)),
            sets: Arc::new(AtomicUsize::new(0)),
            fail_get_at: None,
            fail_set_at: None,
        }
    }

    /// Same records, fresh counters, with failure injection.
    pub fn failing(&self, fail_get_at: Option<usize>, fail_set_at: Option<usize>) -> Self {
        Self {
            inner: self.inner.clone(),
            gets: Arc::new(AtomicUsize::new(0)),
            sets: Arc::new(AtomicUsize::new(0)),
            fail_get_at,
            fail_set_at,
        }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl KvStore for TestStore {
    async fn get(&self, key: &str) -> EpiphyteResult<Option<String>> {
        let n = self.gets.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_get_at == Some(n) {
            return Err(EpiphyteError::Connection("injected get failure".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> EpiphyteResult<()> {
        let n = self.sets.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_set_at == Some(n) {
            return Err(EpiphyteError::Timeout("injected set failure".into()));
        }
        self.inner.set(key, value).await
    }
}

pub async fn open(thread: &str, store: &TestStore) -> Session<TestStore> {
    open_bytes(thread.as_bytes(), store).await
}

pub async fn open_bytes(thread: &[u8], store: &TestStore) -> Session<TestStore> {
    Session::open(
        ThreadId::new(thread),
        &Salt::default(),
        store.clone(),
        fast_options(),
    )
    .await
    .expect("session opens")
}

pub fn collect(session: &Session<TestStore>) -> Vec<Vec<u8>> {
    session.messages().map(<[u8]>::to_vec).collect()
}
