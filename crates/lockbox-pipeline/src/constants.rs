//! Protocol constants shared across the pipeline
//!
//! Operation names follow the simulator's convention: the protocol client
//! lowercases them before building the request path.

use std::time::Duration;

/// Scope for the full license flow.
pub const VERIFIED_ME_SCOPE: &str = "openid lockbox_creation verified_me";
/// Scope for lockbox creation alone.
pub const LOCKBOX_CREATION_SCOPE: &str = "openid lockbox_creation";

/// ACR value requested for provisioning logins.
pub const AUTH_LEVEL_ELEVATED: &str = "https://verified.me/loa/can/auth/elevated";
/// ACR value for read-only reference-data access.
pub const AUTH_LEVEL_STANDARD: &str = "https://verified.me/loa/can/auth/standard";

/// Fixed OIDC state value used in every request object.
pub const REQUEST_STATE: &str = "state";

/// Client id whose login URLs must carry the configured locale.
pub const BASIC_CLIENT_ID: &str = "myClientIDbasic";

/// Asset type provisioned for license issuance.
pub const FOUNDATIONAL_IDENTITY_ASSET: &str = "vme://assets/foundationalIdentity";
/// Logical asset name keying the matched-assets map in issue-license calls.
pub const FOUNDATIONAL_IDENTITY_NAME: &str = "foundationalIdentityName";

pub const OP_REQUEST_OBJECT: &str = "requestobject";
pub const OP_ACCESS_TOKEN: &str = "accesstoken";
pub const OP_RECOVER_LOCKBOX: &str = "recoverLockbox";
pub const OP_CREATE_DIGITAL_ASSET: &str = "createdigitalasset";
pub const OP_RETRIEVE_LICENSE_REQUEST: &str = "retrievelicenserequest";
pub const OP_ISSUE_LICENSE: &str = "issuelicense";
pub const OP_RETRIEVE_CURRENT_TERMS: &str = "retrievecurrentterms";
pub const OP_CREATE_LOCKBOX: &str = "createlockbox";

/// Lockbox recovery: retries on HTTP 504 only.
pub const RETRY_ATTEMPTS: u32 = 3;
/// Fixed spacing between recovery retries.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(10);
/// Wait before the first recovery call; provider-side state from token
/// acquisition needs propagation time.
pub const RECOVERY_GRACE: Duration = Duration::from_secs(10);
