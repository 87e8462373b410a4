/// Cookie holding the visitor's identity value.
pub const VISITOR_COOKIE: &str = "visitor_id";

/// Cookie holding the hex HMAC of [`VISITOR_COOKIE`].
pub const VISITOR_SIG_COOKIE: &str = "visitor_id.sig";

/// Plain, script-readable cookie with the last used display name.
pub const NICKNAME_COOKIE: &str = "visitor_nickname";

pub const COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365; // 1 year

/// Development secret used when no signing secret is configured.
/// Anyone who knows it can forge visitor identities.
pub const INSECURE_FALLBACK_SECRET: &str = "valentine-wall-dev-secret-change-me";

/// Length of a hyphenated UUID string.
pub const IDENTITY_LEN: usize = 36;

/// Length of a hex-encoded SHA-256 MAC.
pub const SIGNATURE_HEX_LEN: usize = 64;
