use thiserror::Error;

/// Errors produced while authenticating inbound webhook notifications.
///
/// Two things the taxonomy deliberately leaves out: the "no transaction
/// update available" signal is an empty state, not a failure, and is
/// expressed as `None` from [`TransactionStore::read`](crate::store::TransactionStore::read);
/// per-subscriber delivery failures are recovered inside
/// [`BroadcastHub::publish`](crate::hub::BroadcastHub::publish) and never
/// reach a caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// The provider sent no signature header at all.
    #[error("missing signature header")]
    MissingSignature,

    /// The signature header did not yield a `(timestamp, signature)` pair.
    #[error("malformed signature header")]
    MalformedHeader,

    /// The HMAC computed over the raw body did not match the received
    /// signature.
    ///
    /// The timestamp embedded in the header is authenticated but not
    /// checked for freshness, so a captured request can be replayed.
    /// Provider tolerance windows are an external contract; enforcing one
    /// here is a hardening point, not current behavior.
    #[error("signature mismatch")]
    SignatureMismatch,
}
