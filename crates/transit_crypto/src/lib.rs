//! # Transit Crypto
//!
//! Credential handoff between the client-facing tier and a worker.
//!
//! Each worker process generates one [`WorkerKeyPair`] at startup and
//! publishes its [`PublicKey`] into the job it claims. The client-facing
//! tier [`encrypt`]s the collected auth data to that key; only the worker
//! holding the matching secret can [`decrypt`] it.
//!
//! ## Security Model
//!
//! - X25519 key agreement with a fresh ephemeral key per message
//! - HKDF-SHA256 derives the message key, bound to both public keys
//! - AES-256-GCM authenticates the payload and the envelope header
//! - Secret keys are zeroized on drop and never printed
//!
//! Any decryption failure is a [`CryptoError::Decryption`]: wrong key,
//! truncated or tampered envelope. It always means a protocol or identity
//! mismatch, never a transient fault.
//!
//! ## Example
//!
//! ```rust
//! use transit_crypto::{decrypt, encrypt, WorkerKeyPair};
//!
//! let worker = WorkerKeyPair::generate();
//! let sealed = encrypt(b"access-token", worker.public_key()).unwrap();
//! let opened = decrypt(&sealed, worker.secret_key()).unwrap();
//! assert_eq!(opened, b"access-token");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handoff;
mod keys;

pub use error::{CryptoError, CryptoResult};
pub use handoff::{decrypt, encrypt, ENVELOPE_OVERHEAD, ENVELOPE_VERSION};
pub use keys::{PublicKey, SecretKey, WorkerKeyPair, KEY_SIZE};
