//! Chunk codec: AES-256-CBC with PKCS#7 padding
//!
//! Frame format (binary):
//! ```text
//! AES-256-CBC(key, iv, PKCS7([20 bytes: next link][N bytes: plaintext]))
//! ```
//!
//! The link travels inside the ciphertext, so only holders of the key learn
//! where the next chunk is stored.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use epiphyte_core::{EpiphyteError, EpiphyteResult, Link, LINK_SIZE};
use rand::RngCore;
use zeroize::Zeroize;

use crate::kdf::ChunkKey;
use crate::BLOCK_SIZE;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fresh random link from the thread-local CSPRNG.
pub fn generate_link() -> Link {
    let mut bytes = [0u8; LINK_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    Link::from_bytes(bytes)
}

/// Encrypt `plaintext` behind a freshly generated link.
///
/// Returns the new link and the frame to persist.
pub fn encrypt_chunk(key: &ChunkKey, plaintext: &[u8]) -> (Link, Vec<u8>) {
    let link = generate_link();
    let frame = seal_chunk(key, &link, plaintext);
    (link, frame)
}

/// Encrypt `link || plaintext` into a frame.
pub fn seal_chunk(key: &ChunkKey, link: &Link, plaintext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LINK_SIZE + plaintext.len());
    buf.extend_from_slice(link.as_bytes());
    buf.extend_from_slice(plaintext);

    let frame = Aes256CbcEnc::new(key.key().into(), key.iv().into())
        .encrypt_padded_vec_mut::<Pkcs7>(&buf);
    buf.zeroize();
    frame
}

/// Decrypt a frame into its link and plaintext.
///
/// Errors:
/// - `MalformedFrame` if the frame is empty, not block aligned, or too
///   short to hold a link once unpadded
/// - `InvalidPadding` if the PKCS#7 padding does not validate
pub fn decrypt_chunk(key: &ChunkKey, frame: &[u8]) -> EpiphyteResult<(Link, Vec<u8>)> {
    if frame.is_empty() || frame.len() % BLOCK_SIZE != 0 {
        return Err(EpiphyteError::MalformedFrame(format!(
            "frame length {} is not a non-zero multiple of {BLOCK_SIZE}",
            frame.len()
        )));
    }

    let mut buf = Aes256CbcDec::new(key.key().into(), key.iv().into())
        .decrypt_padded_vec_mut::<Pkcs7>(frame)
        .map_err(|_| EpiphyteError::InvalidPadding)?;

    if buf.len() < LINK_SIZE {
        let len = buf.len();
        buf.zeroize();
        return Err(EpiphyteError::MalformedFrame(format!(
            "decrypted frame holds {len} bytes, shorter than a {LINK_SIZE}-byte link"
        )));
    }

    let data = buf.split_off(LINK_SIZE);
    let link = Link::from_slice(&buf)?;
    Ok((link, data))
}
