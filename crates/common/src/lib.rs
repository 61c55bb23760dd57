//! Common types for the lockbox license gateway

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
