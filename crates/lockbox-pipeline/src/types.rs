//! Wire documents for the simulator protocol
//!
//! Field names are dictated by the simulator and are inconsistent on purpose
//! (`recoverLockboxBody` on requests vs `recoverLockBoxBody` on responses,
//! `CreateDigitalAssetBody` with a capital C); the serde renames pin them down
//! so the inconsistency lives in exactly one file. Envelope fields are named
//! explicitly rather than flattened so a reader can see the full document
//! shape at the type definition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::DigitalAsset;

// ---- requestobject ----

#[derive(Debug, Serialize)]
pub struct RequestObjectRequest {
    #[serde(rename = "requestObjBody")]
    pub body: RequestObjectBody,
}

#[derive(Debug, Serialize, Default)]
pub struct RequestObjectBody {
    #[serde(rename = "provider_url")]
    pub provider_url: String,
    #[serde(rename = "aud")]
    pub audience: String,
    #[serde(rename = "state", skip_serializing_if = "String::is_empty")]
    pub state: String,
    pub scopes: String,
    #[serde(rename = "acr_values", skip_serializing_if = "String::is_empty")]
    pub acr_values: String,
    #[serde(rename = "ui_locales")]
    pub ui_locales: String,
    #[serde(rename = "code_challenge", skip_serializing_if = "String::is_empty")]
    pub code_challenge: String,
    #[serde(
        rename = "code_challenge_method",
        skip_serializing_if = "String::is_empty"
    )]
    pub code_challenge_method: String,
    #[serde(rename = "clientId", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(rename = "redirecturl")]
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestObjectResponse {
    #[serde(rename = "loginurl", default)]
    pub login_url: String,
}

// ---- accesstoken ----

#[derive(Debug, Serialize)]
pub struct AccessTokenRequest {
    #[serde(rename = "accessTokenBody")]
    pub body: AccessTokenBody,
}

#[derive(Debug, Serialize, Default)]
pub struct AccessTokenBody {
    #[serde(rename = "provider_url")]
    pub provider_url: String,
    #[serde(rename = "aud")]
    pub audience: String,
    #[serde(rename = "authCode")]
    pub auth_code: String,
    #[serde(rename = "code_verifier")]
    pub code_verifier: String,
    #[serde(rename = "clientId", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(rename = "accesstoken", default)]
    pub access_token: String,
    #[serde(rename = "idtoken", default)]
    pub id_token: String,
}

// ---- recoverlockbox ----

#[derive(Debug, Serialize)]
pub struct RecoverLockboxRequest {
    #[serde(rename = "recoverLockboxBody")]
    pub body: RecoverLockboxBody,
}

#[derive(Debug, Serialize, Default)]
pub struct RecoverLockboxBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub endpoint: String,
    pub locale: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoverLockboxResponse {
    #[serde(rename = "recoverLockBoxBody", default)]
    pub body: serde_json::Value,
    #[serde(rename = "serverState", default)]
    pub server_state: String,
}

// ---- createdigitalasset ----

#[derive(Debug, Serialize)]
pub struct CreateDigitalAssetRequest {
    #[serde(rename = "CreateDigitalAssetBody")]
    pub body: CreateDigitalAssetBody,
}

#[derive(Debug, Serialize, Default)]
pub struct CreateDigitalAssetBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub endpoint: String,
    #[serde(rename = "assetTypes")]
    pub asset_types: Vec<String>,
    #[serde(rename = "serverState")]
    pub server_state: String,
    #[serde(rename = "pseudonymId")]
    pub pseudonym_id: String,
    #[serde(rename = "ui_locales")]
    pub ui_locales: String,
    #[serde(rename = "userInteractionInfo")]
    pub user_interaction_info: Option<serde_json::Value>,
    pub license: Option<String>,
    #[serde(rename = "appHostState")]
    pub app_host_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDigitalAssetResponse {
    #[serde(rename = "createDigitalAssetBody", default)]
    pub created: Vec<DigitalAsset>,
    #[serde(rename = "serverState", default)]
    pub server_state: String,
    #[serde(rename = "licenseEncKey", default)]
    pub license_enc_key: Option<String>,
    #[serde(rename = "appHostState", default)]
    pub app_host_state: Option<String>,
}

// ---- retrievelicenserequest ----

#[derive(Debug, Serialize)]
pub struct RetrieveLicenseRequestRequest {
    #[serde(rename = "retrieveLicenseRequestBody")]
    pub body: RetrieveLicenseRequestBody,
}

#[derive(Debug, Serialize, Default)]
pub struct RetrieveLicenseRequestBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "serverState")]
    pub server_state: String,
    pub endpoint: String,
    #[serde(rename = "licenseRequestId")]
    pub license_request_id: String,
    #[serde(rename = "requestEncKey", skip_serializing_if = "String::is_empty")]
    pub request_enc_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveLicenseRequestResponse {
    #[serde(rename = "retrieveLicenseRequestBody", default)]
    pub body: serde_json::Value,
    #[serde(rename = "serverState", default)]
    pub server_state: String,
}

// ---- issuelicense ----

#[derive(Debug, Serialize)]
pub struct IssueLicenseRequest {
    #[serde(rename = "issueLicenseBody")]
    pub body: IssueLicenseBody,
    #[serde(rename = "matchedAssets")]
    pub matched_assets: HashMap<String, AssetQueryEntry>,
}

#[derive(Debug, Serialize, Default)]
pub struct IssueLicenseBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "serverState")]
    pub server_state: String,
    pub endpoint: String,
    #[serde(rename = "licenseRequestId")]
    pub license_request_id: String,
    #[serde(rename = "encryptWholeAsset")]
    pub encrypt_whole_asset: bool,
    #[serde(rename = "doNotNotifyDAC")]
    pub do_not_notify_dac: bool,
}

/// One entry of the matched-assets map sent with an issue-license call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetQueryEntry {
    #[serde(rename = "assetSeqNo")]
    pub asset_seq_no: i64,
    #[serde(rename = "digitalAssetId")]
    pub digital_asset_id: String,
    #[serde(rename = "name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueLicenseResponse {
    #[serde(default)]
    pub license: String,
    #[serde(rename = "serverState", default)]
    pub server_state: String,
}

// ---- retrievecurrentterms ----

#[derive(Debug, Serialize)]
pub struct RetrieveCurrentTermsRequest {
    #[serde(rename = "retrieveCurrentTermsBody")]
    pub body: RetrieveCurrentTermsBody,
}

#[derive(Debug, Serialize, Default)]
pub struct RetrieveCurrentTermsBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub endpoint: String,
    pub locale: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveCurrentTermsResponse {
    #[serde(rename = "serverState", default)]
    pub server_state: String,
}

// ---- createlockbox ----

#[derive(Debug, Serialize)]
pub struct CreateLockboxRequest {
    #[serde(rename = "createLockboxBody")]
    pub body: CreateLockboxBody,
}

#[derive(Debug, Serialize, Default)]
pub struct CreateLockboxBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub endpoint: String,
    #[serde(rename = "serverState")]
    pub server_state: String,
    #[serde(rename = "doNotCreateRecoveryData")]
    pub do_not_create_recovery_data: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateLockboxResponse {
    #[serde(rename = "createLockBoxBody", default)]
    pub body: serde_json::Value,
    #[serde(rename = "serverState", default)]
    pub server_state: String,
}
