//! Authentication for the decision API.
//!
//! Sessions are owned by an external identity provider; this module only
//! verifies the bearer token it issues and exposes the caller as an
//! [`Identity`] extractor.

mod identity;
mod service;

pub use identity::{Identity, SESSION_COOKIE};
pub use service::{AuthService, Claims};
