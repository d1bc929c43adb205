//! Webhook signature verification.
//!
//! The provider signs each callback by computing HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` with the shared merchant secret and sends
//! `timestamp=<ts>,signature=<hex>` in the signature header. Verification
//! recomputes the MAC over the exact bytes received on the wire — never a
//! re-serialized parse of them, since a different byte layout would break
//! the comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

/// The `(timestamp, signature)` pair carried in the signature header.
///
/// Not persisted; lives only for the duration of one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: String,
    pub signature: String,
}

impl SignatureHeader {
    /// Parse a header of the form `timestamp=<ts>,signature=<hex>`.
    ///
    /// Values are extracted positionally from the comma-separated
    /// `key=value` list: the first value is the timestamp, the second the
    /// signature. The exact key names are the provider's contract, not
    /// ours. Fails unless exactly two values are extractable.
    pub fn parse(header: &str) -> Result<Self, RelayError> {
        let values: Vec<&str> = header
            .split(',')
            .filter_map(|pair| pair.split_once('=').map(|(_, value)| value))
            .collect();

        match values.as_slice() {
            [timestamp, signature] => Ok(Self {
                timestamp: (*timestamp).to_string(),
                signature: (*signature).to_string(),
            }),
            _ => Err(RelayError::MalformedHeader),
        }
    }
}

/// Compute the hex-encoded HMAC-SHA256 signature over `"{timestamp}.{body}"`.
pub fn compute_signature(secret: &[u8], timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a parsed signature header against the raw request body.
///
/// Comparison is constant-time (`Mac::verify_slice`). A received signature
/// that is not valid hex is decoded to a zero digest so it takes the same
/// path as a plain mismatch.
pub fn verify(secret: &[u8], header: &SignatureHeader, body: &[u8]) -> Result<(), RelayError> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(header.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    let received = hex::decode(&header.signature).unwrap_or_else(|_| vec![0u8; 32]);

    mac.verify_slice(&received)
        .map_err(|_| RelayError::SignatureMismatch)
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if !s.len().is_multiple_of(2) || !s.is_ascii() {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}
