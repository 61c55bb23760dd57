//! MyAM login-walk constants
//!
//! These values match the identity-provider simulator's fixed behavior.
//! They are not configuration: the simulator accepts exactly these markers
//! and placeholders regardless of deployment.

use std::time::Duration;

/// Request timeout for the login walk. Generous on purpose: simulator
/// environments can take minutes to respond under load.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum redirect hops followed per operation before giving up.
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Literal substring in the login response body that indicates the provider
/// is showing a step-up authentication form.
pub const STEP_UP_FORM_MARKER: &str = r#"action="/myam/oidc/stepup""#;

/// Query string sent to the step-up endpoint. The simulator accepts any
/// placeholder one-time code.
pub const STEP_UP_PLACEHOLDER_QUERY: &str = "code=1234";

/// Number of random bytes in a PKCE code verifier before encoding.
pub const VERIFIER_BYTES: usize = 32;
