use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Process-lifetime session id handed out in the handshake.
///
/// Only the presence of the header is checked on requests; the value is
/// never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// 16 random bytes, base64-encoded.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
