//! Opaque auth data.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Decrypted credential material for one service.
///
/// The core never interprets the bytes; connectors decode them. The buffer
/// is zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthData {
    bytes: Vec<u8>,
}

impl AuthData {
    /// Wraps raw credential bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the bytes as UTF-8, if they are.
    #[must_use]
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for AuthData {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for AuthData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthData([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_secret() {
        let auth = AuthData::from("refresh-token-123");
        let text = format!("{auth:?}");
        assert_eq!(text, "AuthData([REDACTED])");
        assert_eq!(auth.expose_str(), Some("refresh-token-123"));
        assert_eq!(auth.len(), 17);
    }
}
