//! Constant-time comparison helpers.
//!
//! Used wherever a secret is compared against attacker-supplied input and
//! the HMAC machinery in [`signature`](crate::signature) does not already
//! cover it (e.g. bearer-token checks). Built on the `subtle` crate.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time byte comparison that does not leak input lengths or
/// content.
///
/// Both inputs are hashed to fixed-length SHA-256 digests before the
/// comparison, so timing reveals neither the content nor the length of
/// either input.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}
