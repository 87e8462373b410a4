use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{ProtocolError, INSECURE_FALLBACK_SECRET};

type HmacSha256 = Hmac<Sha256>;

/// Where the identity signing key comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Process-wide HMAC secret. Empty counts as missing.
    pub secret: Option<String>,
    /// Fall back to [`INSECURE_FALLBACK_SECRET`] when `secret` is missing.
    /// Keeps a low-stakes deployment up at the cost of forgeable identities.
    pub allow_insecure_fallback: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: None,
            allow_insecure_fallback: true,
        }
    }
}

/// Keyed signer for visitor identity values.
///
/// Holds no mutable state; share it behind an `Arc` across request handlers.
#[derive(Clone)]
pub struct IdentitySigner {
    mac: HmacSha256,
    insecure: bool,
}

impl std::fmt::Debug for IdentitySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySigner")
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

impl IdentitySigner {
    /// Create a signer for the given secret.
    pub fn new(secret: &[u8]) -> Result<Self, ProtocolError> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ProtocolError::InvalidKey(e.to_string()))?;
        Ok(Self { mac, insecure: false })
    }

    /// Build the signer from configuration, applying the insecure fallback
    /// when allowed and logging a warning when it is taken.
    pub fn from_config(config: &SigningConfig) -> Result<Self, ProtocolError> {
        match config.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret.as_bytes()),
            None if config.allow_insecure_fallback => {
                tracing::warn!(
                    "No signing secret configured, falling back to the built-in development secret. \
                     Visitor identities can be forged until SESSION_SECRET is set."
                );
                let mut signer = Self::new(INSECURE_FALLBACK_SECRET.as_bytes())?;
                signer.insecure = true;
                Ok(signer)
            }
            None => Err(ProtocolError::MissingSecret),
        }
    }

    /// True when the signer runs on the built-in development secret.
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }

    /// Hex-encoded HMAC-SHA-256 of `value`.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check `signature` against a fresh MAC of `value`.
    /// Never fails loudly: any malformed input is simply `false`.
    pub fn verify(&self, value: &str, signature: &str) -> bool {
        let expected = self.sign(value);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
/// Length is not secret here (always 64 hex chars), so a length mismatch
/// returns early.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let signer = IdentitySigner::new(b"secret").unwrap();
        let v = "0b7e6a52-3c1d-4f6e-9a3b-2f1e0d9c8b7a";
        assert_eq!(signer.sign(v), signer.sign(v));
        assert_eq!(signer.sign(v).len(), crate::SIGNATURE_HEX_LEN);
    }

    #[test]
    fn test_sign_depends_on_key() {
        let a = IdentitySigner::new(b"secret-a").unwrap();
        let b = IdentitySigner::new(b"secret-b").unwrap();
        let v = "0b7e6a52-3c1d-4f6e-9a3b-2f1e0d9c8b7a";
        assert_ne!(a.sign(v), b.sign(v));
        assert!(!b.verify(v, &a.sign(v)));
    }

    #[test]
    fn test_known_hmac_vector() {
        // RFC 4231 test case 2
        let signer = IdentitySigner::new(b"Jefe").unwrap();
        assert_eq!(
            signer.sign("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_malformed_signatures() {
        let signer = IdentitySigner::new(b"secret").unwrap();
        let v = "0b7e6a52-3c1d-4f6e-9a3b-2f1e0d9c8b7a";
        let good = signer.sign(v);
        assert!(signer.verify(v, &good));
        assert!(!signer.verify(v, ""));
        assert!(!signer.verify(v, &good[..63]));
        assert!(!signer.verify(v, &format!("{good}0")));
        assert!(!signer.verify(v, &good.to_uppercase()));
        assert!(!signer.verify(v, "not hex at all, but still some text of some length"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_from_config_uses_secret() {
        let config = SigningConfig {
            secret: Some("configured".into()),
            allow_insecure_fallback: false,
        };
        let signer = IdentitySigner::from_config(&config).unwrap();
        assert!(!signer.is_insecure());
        let direct = IdentitySigner::new(b"configured").unwrap();
        assert_eq!(signer.sign("x"), direct.sign("x"));
    }

    #[test]
    fn test_from_config_falls_back_when_allowed() {
        let signer = IdentitySigner::from_config(&SigningConfig::default()).unwrap();
        assert!(signer.is_insecure());
        let fallback = IdentitySigner::new(INSECURE_FALLBACK_SECRET.as_bytes()).unwrap();
        assert_eq!(signer.sign("x"), fallback.sign("x"));
    }

    #[test]
    fn test_from_config_empty_secret_counts_as_missing() {
        let config = SigningConfig {
            secret: Some(String::new()),
            allow_insecure_fallback: false,
        };
        assert!(matches!(
            IdentitySigner::from_config(&config),
            Err(ProtocolError::MissingSecret)
        ));
    }
}
