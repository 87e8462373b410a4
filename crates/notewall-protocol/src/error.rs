use thiserror::Error;

/// Errors raised while setting up identity signing.
///
/// Verification failures are never reported through this type: a token that
/// does not verify simply resolves to "no session".
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no signing secret configured and insecure fallback is disabled")]
    MissingSecret,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}
