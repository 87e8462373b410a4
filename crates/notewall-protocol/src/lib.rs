//! notewall protocol - anonymous visitor identity
//!
//! A visitor is identified by a random UUID carried in a cookie next to an
//! HMAC-SHA-256 signature of that UUID. Requests that carry a pair which does
//! not verify are treated exactly like requests that carry nothing.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod session;

pub use constants::*;
pub use crypto::{IdentitySigner, SigningConfig};
pub use error::*;
pub use identity::{is_canonical_identity, mint_identity};
pub use session::{CookiePolicy, SessionManager, TokenState, VisitorSession};
