//! Key derivation: Argon2id over (secret, SHA-256(context))

use argon2::{Algorithm, Argon2, Params, Version};
use epiphyte_core::config::KdfConfig;
use epiphyte_core::{EpiphyteError, EpiphyteResult, Link, Salt, ThreadId, LINK_SIZE};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::{IV_SIZE, KEY_MATERIAL_SIZE, KEY_SIZE};

/// Argon2id cost parameters. Fixed per protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub mem_cost_kib: u32,
    /// Time cost / passes
    pub time_cost: u32,
    /// Parallelism
    pub parallelism: u32,
}

impl KdfParams {
    /// Protocol v1 parameters (19 MiB, 2 passes, 1 lane)
    pub const PROTOCOL: KdfParams = KdfParams {
        mem_cost_kib: 19456,
        time_cost: 2,
        parallelism: 1,
    };
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::PROTOCOL
    }
}

impl From<&KdfConfig> for KdfParams {
    fn from(cfg: &KdfConfig) -> Self {
        Self {
            mem_cost_kib: cfg.mem_cost_kib,
            time_cost: cfg.time_cost,
            parallelism: cfg.parallelism,
        }
    }
}

/// Per-chunk AES-256 key and CBC IV. Zeroized on drop.
#[derive(Clone)]
pub struct ChunkKey {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl ChunkKey {
    pub fn from_bytes(material: &[u8; KEY_MATERIAL_SIZE]) -> Self {
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        key.copy_from_slice(&material[..KEY_SIZE]);
        iv.copy_from_slice(&material[KEY_SIZE..]);
        Self { key, iv }
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }
}

impl Drop for ChunkKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkKey")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

/// Derive `length` bytes from `secret` in the domain of `context`.
///
/// Pure and deterministic. The context is hashed to form the Argon2 salt,
/// so contexts of any length (including shorter than Argon2's 8-byte
/// minimum) are accepted.
pub fn derive(
    secret: &[u8],
    context: &[u8],
    length: usize,
    params: &KdfParams,
) -> EpiphyteResult<Vec<u8>> {
    let mut out = vec![0u8; length];
    derive_into(secret, context, &mut out, params)?;
    Ok(out)
}

fn derive_into(
    secret: &[u8],
    context: &[u8],
    out: &mut [u8],
    params: &KdfParams,
) -> EpiphyteResult<()> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(out.len()),
    )
    .map_err(|e| EpiphyteError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
    let salt = Sha256::digest(context);

    argon2
        .hash_password_into(secret, &salt, out)
        .map_err(|e| EpiphyteError::Kdf(format!("Argon2id failed: {e}")))
}

/// Link of the genesis chunk: `derive(salt, thread_id, LINK_SIZE)`.
pub fn derive_genesis_link(
    salt: &Salt,
    thread: &ThreadId,
    params: &KdfParams,
) -> EpiphyteResult<Link> {
    let mut bytes = [0u8; LINK_SIZE];
    derive_into(salt.as_bytes(), thread.as_bytes(), &mut bytes, params)?;
    Ok(Link::from_bytes(bytes))
}

/// Key for the chunk following one whose plaintext is `previous`.
pub fn derive_chunk_key(
    previous: &[u8],
    thread: &ThreadId,
    params: &KdfParams,
) -> EpiphyteResult<ChunkKey> {
    let mut material = [0u8; KEY_MATERIAL_SIZE];
    derive_into(previous, thread.as_bytes(), &mut material, params)?;
    let key = ChunkKey::from_bytes(&material);
    material.zeroize();
    Ok(key)
}
