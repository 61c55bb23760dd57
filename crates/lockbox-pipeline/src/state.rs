//! Opaque server-state blob
//!
//! The simulator threads a base64url-encoded JSON document through the
//! pipeline. Callers treat it as opaque and always forward the latest value;
//! this module only decodes it to validate well-formedness and to read the
//! asset list for precondition checks. Nothing here ever mutates a decoded
//! state and sends it back.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decoded view of the simulator's device state.
///
/// Unknown fields are ignored: the simulator owns this document and adds
/// fields freely between versions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceState {
    pub da_list: HashMap<String, DigitalAsset>,
    pub last_license_request: LastLicenseRequest,
    pub client_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LastLicenseRequest {
    pub license_request_id: String,
    pub request_info: String,
}

/// One provisioned digital asset, keyed in [`DeviceState::da_list`] by its
/// asset type URI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigitalAsset {
    pub digital_asset_id: String,
    pub digital_asset_type: String,
    pub pseudonym_id: String,
    pub storage_type: String,
    pub dap_id: String,
    pub expiry_epoch_seconds: i64,
    pub last_sequence_number: i64,
    pub status: String,
}

/// Decode an opaque state blob.
///
/// The empty string is a valid empty state: a device that has never talked
/// to the simulator has no state yet.
pub fn decode_state(encoded: &str) -> Result<DeviceState> {
    if encoded.is_empty() {
        return Ok(DeviceState::default());
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Error::Decode(format!("server state is not valid base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Decode(format!("server state is not a valid state document: {e}")))
}

/// Encode a JSON document the way the simulator encodes state blobs.
///
/// The pipeline never writes state; this exists for test harnesses and
/// simulator stand-ins that need to fabricate one.
pub fn encode_state(value: &serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_string_is_a_valid_empty_state() {
        let state = decode_state("").unwrap();
        assert!(state.da_list.is_empty());
        assert!(state.client_id.is_empty());
        assert!(state.last_license_request.license_request_id.is_empty());
    }

    #[test]
    fn decodes_asset_list_and_client_id() {
        let encoded = encode_state(&json!({
            "clientId": "myClientIDbasic",
            "daList": {
                "vme://assets/foundationalIdentity": {
                    "digitalAssetId": "DA-1",
                    "digitalAssetType": "vme://assets/foundationalIdentity",
                    "lastSequenceNumber": 4,
                    "status": "ACTIVE"
                }
            },
            "lastLicenseRequest": {"licenseRequestId": "LR-9"}
        }));

        let state = decode_state(&encoded).unwrap();
        assert_eq!(state.client_id, "myClientIDbasic");
        let asset = &state.da_list["vme://assets/foundationalIdentity"];
        assert_eq!(asset.digital_asset_id, "DA-1");
        assert_eq!(asset.last_sequence_number, 4);
        assert_eq!(state.last_license_request.license_request_id, "LR-9");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let encoded = encode_state(&json!({
            "clientId": "c1",
            "someFutureField": {"nested": true}
        }));
        let state = decode_state(&encoded).unwrap();
        assert_eq!(state.client_id, "c1");
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_state("not~base64url!").unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    }

    #[test]
    fn rejects_non_json_payload() {
        let encoded = URL_SAFE_NO_PAD.encode(b"plain text, not json");
        let err = decode_state(&encoded).unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    }
}
