//! epiphyte-crypto: chained key derivation and per-chunk encryption
//!
//! Protocol v1 (fixed; no other combination is readable):
//!
//! ```text
//! genesis link   = Argon2id(password = salt,           salt = SHA-256(thread_id), 20 bytes)
//! key material   = Argon2id(password = prev plaintext, salt = SHA-256(thread_id), 48 bytes)
//!                = AES-256 key (32) || CBC IV (16)
//! frame          = AES-256-CBC-PKCS7(key, iv, link || plaintext)
//! ```
//!
//! Frames carry no authentication tag. Decrypting with the wrong key usually
//! fails the padding check but can yield garbage instead.

pub mod chunk;
pub mod kdf;

pub use chunk::{decrypt_chunk, encrypt_chunk, generate_link, seal_chunk};
pub use kdf::{derive, derive_chunk_key, derive_genesis_link, ChunkKey, KdfParams};

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// CBC initialization vector size in bytes
pub const IV_SIZE: usize = 16;

/// Key material derived per chunk: key followed by IV
pub const KEY_MATERIAL_SIZE: usize = KEY_SIZE + IV_SIZE;

/// AES block size; frames are always a non-zero multiple of it
pub const BLOCK_SIZE: usize = 16;
