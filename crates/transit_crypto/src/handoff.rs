//! Sealing and opening auth data.
//!
//! Envelope layout:
//!
//! ```text
//! version (1) | ephemeral public key (32) | nonce (12) | ciphertext || tag (16)
//! ```
//!
//! The version byte and ephemeral key are authenticated as associated data.

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PublicKey, SecretKey, KEY_SIZE};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use curve25519_dalek::montgomery::MontgomeryPoint;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const HEADER_SIZE: usize = 1 + KEY_SIZE;

/// Bytes an envelope adds on top of the plaintext.
pub const ENVELOPE_OVERHEAD: usize = HEADER_SIZE + NONCE_SIZE + TAG_SIZE;

const KDF_INFO: &[u8] = b"transit-auth-handoff-v1";

/// Encrypts `plaintext` so that only the holder of `recipient`'s secret key
/// can read it.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if `recipient` is a low-order point.
pub fn encrypt(plaintext: &[u8], recipient: &PublicKey) -> CryptoResult<Vec<u8>> {
    let ephemeral = SecretKey::generate();
    let ephemeral_public = ephemeral.public_key();

    let shared = ephemeral.diffie_hellman(recipient);
    let cipher = message_cipher(&shared, &ephemeral_public, recipient)
        .ok_or_else(|| CryptoError::encryption("recipient key is not a valid curve point"))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let mut envelope = Vec::with_capacity(ENVELOPE_OVERHEAD + plaintext.len());
    envelope.push(ENVELOPE_VERSION);
    envelope.extend_from_slice(ephemeral_public.as_bytes());

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &envelope[..HEADER_SIZE],
            },
        )
        .map_err(|_| CryptoError::encryption("encryption error"))?;

    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend(ciphertext);
    Ok(envelope)
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] if the envelope is malformed, was
/// sealed for another key, or has been tampered with.
pub fn decrypt(envelope: &[u8], secret: &SecretKey) -> CryptoResult<Vec<u8>> {
    if envelope.len() < ENVELOPE_OVERHEAD {
        return Err(CryptoError::decryption("envelope too short"));
    }
    if envelope[0] != ENVELOPE_VERSION {
        return Err(CryptoError::decryption(format!(
            "unsupported envelope version {}",
            envelope[0]
        )));
    }

    let ephemeral_public = PublicKey::from_bytes(&envelope[1..HEADER_SIZE])
        .map_err(|_| CryptoError::decryption("malformed ephemeral key"))?;
    let nonce = Nonce::from_slice(&envelope[HEADER_SIZE..HEADER_SIZE + NONCE_SIZE]);
    let ciphertext = &envelope[HEADER_SIZE + NONCE_SIZE..];

    let shared = secret.diffie_hellman(&ephemeral_public);
    let cipher = message_cipher(&shared, &ephemeral_public, &secret.public_key())
        .ok_or_else(|| CryptoError::decryption("ephemeral key is not a valid curve point"))?;

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: &envelope[..HEADER_SIZE],
            },
        )
        .map_err(|_| CryptoError::decryption("authentication failed"))
}

/// Derives the per-message AES key. Returns `None` for an all-zero shared
/// point, which only a low-order peer key can produce.
fn message_cipher(
    shared: &MontgomeryPoint,
    ephemeral_public: &PublicKey,
    recipient: &PublicKey,
) -> Option<Aes256Gcm> {
    let shared_bytes = Zeroizing::new(shared.to_bytes());
    if shared_bytes.iter().all(|&b| b == 0) {
        return None;
    }

    let mut salt = [0u8; 2 * KEY_SIZE];
    salt[..KEY_SIZE].copy_from_slice(ephemeral_public.as_bytes());
    salt[KEY_SIZE..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), &shared_bytes[..]);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(KDF_INFO, &mut key[..]).ok()?;

    Some(Aes256Gcm::new(GenericArray::from_slice(&key[..])))
}
