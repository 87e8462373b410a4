//! Visitor sessions derived from request cookies.
//!
//! Nothing is stored server-side. Each request loads its cookies into a
//! [`CookieJar`]; the manager reads from it and, when it has to mint or
//! update something, adds cookies to the jar. The caller turns the jar's
//! delta into `Set-Cookie` headers.

use std::sync::Arc;

use cookie::{time::Duration, Cookie, CookieJar, SameSite};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::identity::{is_canonical_identity, mint_identity};
use crate::{IdentitySigner, COOKIE_MAX_AGE_SECS, NICKNAME_COOKIE, VISITOR_COOKIE, VISITOR_SIG_COOKIE};

/// Characters `encodeURIComponent` leaves alone, so browser code can read the
/// nickname cookie back with `decodeURIComponent`.
const NICKNAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Resolved visitor for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSession {
    #[serde(rename = "visitorId")]
    pub identity: String,
    pub nickname: Option<String>,
    pub is_new: bool,
}

/// Outcome of inspecting the identity cookies.
///
/// Only used internally and in tests; callers of [`SessionManager::resolve`]
/// cannot tell `NoToken` from `InvalidToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    InvalidToken,
    ValidToken(String),
}

/// Attributes applied to every cookie the manager writes.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookiePolicy {
    /// `secure` is only set for production deployments served over TLS.
    pub fn new(production: bool) -> Self {
        Self {
            secure: production,
            max_age_secs: COOKIE_MAX_AGE_SECS,
        }
    }

    fn build(&self, name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(http_only)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(self.max_age_secs))
            .path("/")
            .build()
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Owns the identity cookie lifecycle.
#[derive(Debug, Clone)]
pub struct SessionManager {
    signer: Arc<IdentitySigner>,
    policy: CookiePolicy,
}

impl SessionManager {
    pub fn new(signer: Arc<IdentitySigner>, policy: CookiePolicy) -> Self {
        Self { signer, policy }
    }

    pub fn signer(&self) -> &IdentitySigner {
        &self.signer
    }

    /// Classify the identity cookie pair carried by `jar`.
    pub fn inspect(&self, jar: &CookieJar) -> TokenState {
        let (Some(value), Some(signature)) = (
            jar.get(VISITOR_COOKIE).map(Cookie::value),
            jar.get(VISITOR_SIG_COOKIE).map(Cookie::value),
        ) else {
            return TokenState::NoToken;
        };

        if value.is_empty() || signature.is_empty() {
            return TokenState::NoToken;
        }
        if !self.signer.verify(value, signature) || !is_canonical_identity(value) {
            return TokenState::InvalidToken;
        }
        TokenState::ValidToken(value.to_string())
    }

    /// Read-only resolution: the existing session, or `None` when the
    /// identity cookies are missing, tampered with or malformed.
    pub fn resolve(&self, jar: &CookieJar) -> Option<VisitorSession> {
        match self.inspect(jar) {
            TokenState::ValidToken(identity) => Some(VisitorSession {
                identity,
                nickname: read_nickname(jar),
                is_new: false,
            }),
            TokenState::NoToken | TokenState::InvalidToken => None,
        }
    }

    /// Resolve the session, minting a new identity when there is no valid one.
    ///
    /// A new identity is written to `jar` as two http-only cookies (value and
    /// signature). With an already valid token the jar is left untouched.
    pub fn resolve_or_create(&self, jar: &mut CookieJar) -> VisitorSession {
        if let Some(existing) = self.resolve(jar) {
            return existing;
        }

        let identity = mint_identity();
        let signature = self.signer.sign(&identity);

        jar.add(self.policy.build(VISITOR_COOKIE, identity.clone(), true));
        jar.add(self.policy.build(VISITOR_SIG_COOKIE, signature, true));

        tracing::debug!("Minted new visitor identity");

        VisitorSession {
            identity,
            nickname: None,
            is_new: true,
        }
    }

    /// Remember the visitor's display name. The cookie is readable by page
    /// scripts and carries no signature; it is never used for authorization.
    pub fn set_nickname(&self, jar: &mut CookieJar, nickname: &str) {
        let encoded = utf8_percent_encode(nickname.trim(), NICKNAME_ENCODE_SET).to_string();
        jar.add(self.policy.build(NICKNAME_COOKIE, encoded, false));
    }
}

fn read_nickname(jar: &CookieJar) -> Option<String> {
    let raw = jar.get(NICKNAME_COOKIE)?.value();
    if raw.is_empty() {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        let signer = IdentitySigner::new(b"test-secret").unwrap();
        SessionManager::new(Arc::new(signer), CookiePolicy::new(true))
    }

    fn jar_with(cookies: &[(&'static str, String)]) -> CookieJar {
        let mut jar = CookieJar::new();
        for (name, value) in cookies {
            jar.add_original(Cookie::new(*name, value.clone()));
        }
        jar
    }

    #[test]
    fn test_inspect_states() {
        let m = manager();
        let id = mint_identity();
        let sig = m.signer().sign(&id);

        assert_eq!(m.inspect(&CookieJar::new()), TokenState::NoToken);
        assert_eq!(
            m.inspect(&jar_with(&[(VISITOR_COOKIE, id.clone())])),
            TokenState::NoToken
        );
        assert_eq!(
            m.inspect(&jar_with(&[(VISITOR_COOKIE, id.clone()), (VISITOR_SIG_COOKIE, "00".repeat(32))])),
            TokenState::InvalidToken
        );
        assert_eq!(
            m.inspect(&jar_with(&[(VISITOR_COOKIE, id.clone()), (VISITOR_SIG_COOKIE, sig)])),
            TokenState::ValidToken(id)
        );
    }

    #[test]
    fn test_new_identity_cookie_attributes() {
        let m = manager();
        let mut jar = CookieJar::new();
        let session = m.resolve_or_create(&mut jar);
        assert!(session.is_new);

        let value = jar.get(VISITOR_COOKIE).unwrap();
        let sig = jar.get(VISITOR_SIG_COOKIE).unwrap();
        assert_eq!(value.value(), session.identity);
        for c in [value, sig] {
            assert_eq!(c.http_only(), Some(true));
            assert_eq!(c.secure(), Some(true));
            assert_eq!(c.same_site(), Some(SameSite::Lax));
            assert_eq!(c.path(), Some("/"));
            assert_eq!(c.max_age(), Some(Duration::seconds(COOKIE_MAX_AGE_SECS)));
        }
        assert!(m.signer().verify(value.value(), sig.value()));
    }

    #[test]
    fn test_nickname_is_encoded_and_script_readable() {
        let m = manager();
        let mut jar = CookieJar::new();
        m.set_nickname(&mut jar, "  Ana & Bo ❤ ");
        let c = jar.get(NICKNAME_COOKIE).unwrap();
        assert_eq!(c.value(), "Ana%20%26%20Bo%20%E2%9D%A4");
        assert_eq!(c.http_only(), Some(false));
        assert_eq!(read_nickname(&jar).as_deref(), Some("Ana & Bo ❤"));
    }

    #[test]
    fn test_bad_nickname_reads_as_none() {
        let jar = jar_with(&[(NICKNAME_COOKIE, "%FF%FE".into())]);
        assert_eq!(read_nickname(&jar), None);
        let jar = jar_with(&[(NICKNAME_COOKIE, String::new())]);
        assert_eq!(read_nickname(&jar), None);
    }

    #[test]
    fn test_session_serializes_with_wire_names() {
        let s = VisitorSession {
            identity: "id".into(),
            nickname: None,
            is_new: true,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["visitorId"], "id");
        assert_eq!(json["isNew"], true);
        assert!(json["nickname"].is_null());
    }
}
