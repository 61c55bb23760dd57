//! Digital-lockbox provisioning pipeline
//!
//! Drives the back-end simulator through the license provisioning protocol:
//! access-token acquisition (PKCE + MyAM login walk + token exchange), then
//! lockbox recovery, digital-asset creation, license-request retrieval, and
//! license issuance, in that order. Every call after token acquisition
//! threads an opaque base64url state blob: the pipeline always forwards the
//! most recently returned value and only ever decodes it read-only for
//! precondition checks.
//!
//! Out-of-order calls fail locally with a descriptive precondition error
//! before any network traffic: the simulator's own errors for mis-ordered
//! calls are generic and misleading.

pub mod authorize;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod token;
pub mod types;

pub use client::SimClient;
pub use config::ProvisioningConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use state::{decode_state, encode_state, DeviceState, DigitalAsset};
