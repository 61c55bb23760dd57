//! Browser-less authentication against the MyAM identity provider simulator
//!
//! Drives the OIDC authorization-code login the way a browser would: one
//! cookie jar per attempt, redirects followed hop by hop, and the
//! authorization code recovered from the `code` query parameter of an
//! intercepted redirect rather than from any response body.
//!
//! Flow:
//! 1. Caller generates a PKCE pair via [`pkce::generate`]
//! 2. Caller obtains a login URL from the simulator (request-object step)
//! 3. [`Authenticator::obtain_auth_code`] walks the login page to a code
//! 4. Caller exchanges the code plus PKCE verifier for an access token

pub mod constants;
pub mod error;
pub mod pkce;
pub mod walker;

pub use error::{Error, Result};
pub use pkce::{compute_challenge, generate, generate_verifier};
pub use walker::Authenticator;
