//! Worker key pairs.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use curve25519_dalek::montgomery::MontgomeryPoint;
use rand::RngCore;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of X25519 public and secret keys in bytes.
pub const KEY_SIZE: usize = 32;

/// An X25519 public key, safe to publish in a job record.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::invalid_key_size(bytes.len(), KEY_SIZE))?;
        Ok(Self(array))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Returns the key as an owned byte vector, the form stored in jobs.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Encodes the key as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decodes a key from standard base64.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not base64 or not 32 bytes long.
    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        Self::from_bytes(&STANDARD.decode(text)?)
    }

    pub(crate) fn point(&self) -> MontgomeryPoint {
        MontgomeryPoint(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_base64()).finish()
    }
}

/// An X25519 secret key.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Generates a new random secret key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::invalid_key_size(bytes.len(), KEY_SIZE));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives the matching public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(MontgomeryPoint::mul_base_clamped(self.bytes).to_bytes())
    }

    /// Computes the X25519 shared point with `peer`.
    pub(crate) fn diffie_hellman(&self, peer: &PublicKey) -> MontgomeryPoint {
        peer.point().mul_clamped(self.bytes)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The key pair a worker process generates once at startup.
///
/// The secret half never leaves process memory; the public half is
/// published into every job the worker claims.
#[derive(Debug, Clone)]
pub struct WorkerKeyPair {
    instance_id: Uuid,
    public: PublicKey,
    secret: SecretKey,
}

impl WorkerKeyPair {
    /// Generates a fresh key pair and a random instance id.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::generate())
    }

    /// Builds a key pair around an existing secret.
    #[must_use]
    pub fn from_secret(secret: SecretKey) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            public: secret.public_key(),
            secret,
        }
    }

    /// Returns the worker instance id.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Returns the public key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the secret key.
    #[must_use]
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pairs_differ() {
        let a = WorkerKeyPair::generate();
        let b = WorkerKeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[test]
    fn public_key_is_deterministic() {
        let secret = SecretKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
        assert_eq!(secret.public_key(), secret.public_key());
    }

    #[test]
    fn shared_secret_agrees() {
        let a = SecretKey::generate();
        let b = SecretKey::generate();
        assert_eq!(
            a.diffie_hellman(&b.public_key()),
            b.diffie_hellman(&a.public_key())
        );
    }

    #[test]
    fn key_sizes_checked() {
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKeySize { expected: 32, actual: 16 })
        ));
        assert!(SecretKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn base64_roundtrip() {
        let key = WorkerKeyPair::generate().public_key().to_owned();
        assert_eq!(PublicKey::from_base64(&key.to_base64()).unwrap(), key);
        assert!(matches!(
            PublicKey::from_base64("***"),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let pair = WorkerKeyPair::generate();
        let text = format!("{:?}", pair);
        assert!(text.contains("[REDACTED]"));
    }
}
