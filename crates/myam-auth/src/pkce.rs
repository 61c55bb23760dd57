//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge that bind the authorization
//! code to this client. The verifier stays with the session and is sent during
//! token exchange; the challenge travels in the request object so the provider
//! can verify the exchange request came from the party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::constants::VERIFIER_BYTES;
use crate::error::{Error, Result};

/// Generate a cryptographically random PKCE code verifier.
///
/// Produces 32 random bytes encoded as URL-safe base64 without padding
/// (43 characters, within the 43-128 range RFC 7636 requires).
///
/// Fails only when the OS secure random source is unavailable. That failure
/// is fatal to the whole authentication attempt: a predictable verifier
/// defeats PKCE, so the caller must abort rather than retry.
pub fn generate_verifier() -> Result<String> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a verifier/challenge pair for one login attempt.
pub fn generate() -> Result<(String, String)> {
    let verifier = generate_verifier()?;
    let challenge = compute_challenge(&verifier);
    Ok((verifier, challenge))
}
