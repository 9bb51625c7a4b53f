//! Anonymous-sender sealed boxes, wire compatible with libsodium's
//! `crypto_box_seal`.
//!
//! A sealed box is the sender's ephemeral X25519 public key followed by an
//! XSalsa20-Poly1305 ciphertext. Only the holder of the recipient secret key
//! can open it, and nothing in it identifies the sender.

use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, SecretKey};
use thiserror::Error;

pub const KEY_SIZE: usize = 32;
const TAG_SIZE: usize = 16;

/// Bytes a sealed box adds on top of its plaintext.
pub const SEAL_OVERHEAD: usize = KEY_SIZE + TAG_SIZE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("sealed box of {len} bytes is shorter than the {SEAL_OVERHEAD} byte overhead")]
    TooShort { len: usize },
    #[error("sealed box failed authentication")]
    Authentication,
    #[error("failed to seal plaintext")]
    Seal,
}

pub fn open(sealed: &[u8], secret_key: &SecretKey) -> Result<Vec<u8>, SealError> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(SealError::TooShort { len: sealed.len() });
    }
    secret_key
        .unseal(sealed)
        .map_err(|_| SealError::Authentication)
}

/// Seal `plaintext` for `public_key` with a fresh ephemeral key. The device
/// only ever opens boxes; this exists for building fixtures and simulators.
pub fn seal(plaintext: &[u8], public_key: &PublicKey) -> Result<Vec<u8>, SealError> {
    public_key
        .seal(&mut OsRng, plaintext)
        .map_err(|_| SealError::Seal)
}
