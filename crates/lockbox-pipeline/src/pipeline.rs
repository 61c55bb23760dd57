//! Provisioning pipeline driver
//!
//! Owns the ordering rules of the protocol. Each stage checks its
//! preconditions locally before touching the network, because the simulator
//! answers mis-ordered calls with generic errors that point nowhere. The
//! opaque server state is forwarded verbatim from the most recent response;
//! stages decode it only to validate it and to read the asset list.

use std::collections::HashMap;
use std::time::Duration;

use myam_auth::Authenticator;
use myam_auth::pkce;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::authorize;
use crate::client::SimClient;
use crate::config::ProvisioningConfig;
use crate::constants::{
    AUTH_LEVEL_ELEVATED, FOUNDATIONAL_IDENTITY_ASSET, FOUNDATIONAL_IDENTITY_NAME,
    OP_CREATE_DIGITAL_ASSET, OP_CREATE_LOCKBOX, OP_ISSUE_LICENSE, OP_RECOVER_LOCKBOX,
    OP_RETRIEVE_CURRENT_TERMS, OP_RETRIEVE_LICENSE_REQUEST, RECOVERY_GRACE, RETRY_ATTEMPTS,
    RETRY_BACKOFF, VERIFIED_ME_SCOPE,
};
use crate::error::{Error, Result};
use crate::state::{DigitalAsset, decode_state};
use crate::token;
use crate::types::{
    AssetQueryEntry, CreateDigitalAssetBody, CreateDigitalAssetRequest,
    CreateDigitalAssetResponse, CreateLockboxBody, CreateLockboxRequest, CreateLockboxResponse,
    IssueLicenseBody, IssueLicenseRequest, IssueLicenseResponse, RecoverLockboxBody,
    RecoverLockboxRequest, RecoverLockboxResponse, RetrieveCurrentTermsBody,
    RetrieveCurrentTermsRequest, RetrieveCurrentTermsResponse, RetrieveLicenseRequestBody,
    RetrieveLicenseRequestRequest, RetrieveLicenseRequestResponse,
};

pub struct Pipeline {
    client: SimClient,
    config: ProvisioningConfig,
    recovery_grace: Duration,
    retry_backoff: Duration,
}

impl Pipeline {
    pub fn new(config: ProvisioningConfig) -> Result<Self> {
        Self::with_timings(config, RECOVERY_GRACE, RETRY_BACKOFF)
    }

    /// Like [`new`](Self::new) with explicit recovery timings. Production
    /// code uses the defaults; tests shrink them.
    pub fn with_timings(
        config: ProvisioningConfig,
        recovery_grace: Duration,
        retry_backoff: Duration,
    ) -> Result<Self> {
        let client = SimClient::new(&config.sim_server_url)?;
        Ok(Self {
            client,
            config,
            recovery_grace,
            retry_backoff,
        })
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Obtain an access token for `scope`: PKCE pair, request object, MyAM
    /// login walk, token exchange.
    pub async fn get_access_token(
        &self,
        scope: &str,
        user_id: &str,
        password: &str,
        client_id: &str,
    ) -> Result<String> {
        let (verifier, challenge) = pkce::generate().map_err(Error::from)?;
        let login_url = authorize::request_login(
            &self.client,
            &self.config,
            scope,
            AUTH_LEVEL_ELEVATED,
            &challenge,
            client_id,
        )
        .await?;

        info!(%login_url, user_id, "walking provider login");
        let walker = Authenticator::new(user_id, password, login_url)?;
        let auth_code = walker.obtain_auth_code().await?;
        debug!("authorization code captured, exchanging for token");

        token::exchange_access_token(&self.client, &self.config, &auth_code, &verifier, client_id)
            .await
    }

    /// Recover the device's lockbox, returning the new server state and the
    /// recovery payload.
    ///
    /// Waits out a grace period before the first attempt (the provider-side
    /// session created during token acquisition needs time to propagate),
    /// then retries HTTP 504 up to [`RETRY_ATTEMPTS`] times with a fixed
    /// backoff. Every other failure is immediately fatal.
    pub async fn recover_lockbox(
        &self,
        access_token: &str,
        expected: StatusCode,
        client_id: &str,
    ) -> Result<(String, serde_json::Value)> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot recover lockbox, must obtain an access token first".to_string(),
            ));
        }

        tokio::time::sleep(self.recovery_grace).await;

        let request = RecoverLockboxRequest {
            body: RecoverLockboxBody {
                access_token: access_token.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                locale: self.config.ui_locales.clone(),
                client_id: client_id.to_string(),
            },
        };

        let mut attempt = 0u32;
        loop {
            match self
                .client
                .call_json::<_, RecoverLockboxResponse>(OP_RECOVER_LOCKBOX, &request, expected)
                .await
            {
                Ok(response) => return Ok((response.server_state, response.body)),
                Err(err) if err.is_gateway_timeout() && attempt < RETRY_ATTEMPTS => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_attempts = RETRY_ATTEMPTS,
                        backoff = ?self.retry_backoff,
                        "gateway timeout recovering lockbox, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Create the given asset types in the recovered lockbox.
    ///
    /// The create call is made even when the state already lists the
    /// requested types; the simulator treats re-creation as a refresh.
    /// Returns the new server state and the full asset list decoded from it.
    pub async fn create_digital_assets(
        &self,
        access_token: &str,
        server_state: &str,
        asset_types: &[String],
    ) -> Result<(String, HashMap<String, DigitalAsset>)> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot create digital assets, must obtain an access token first".to_string(),
            ));
        }
        if server_state.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot create digital assets, must recover the lockbox first".to_string(),
            ));
        }
        decode_state(server_state)?;

        let request = CreateDigitalAssetRequest {
            body: CreateDigitalAssetBody {
                access_token: access_token.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                asset_types: asset_types.to_vec(),
                server_state: server_state.to_string(),
                ui_locales: self.config.ui_locales.clone(),
                ..Default::default()
            },
        };

        info!(?asset_types, "creating digital assets");
        let response: CreateDigitalAssetResponse = self
            .client
            .call_json(OP_CREATE_DIGITAL_ASSET, &request, StatusCode::ACCEPTED)
            .await?;

        if response.created.len() != asset_types.len() {
            return Err(Error::AssetCountMismatch {
                expected: asset_types.len(),
                actual: response.created.len(),
            });
        }

        let new_state = decode_state(&response.server_state)?;
        Ok((response.server_state, new_state.da_list))
    }

    /// Fetch the license request identified by `license_request_id`.
    ///
    /// The state is validated both going in and coming out: a state blob the
    /// simulator cannot read back would poison every later stage.
    pub async fn retrieve_license_request(
        &self,
        access_token: &str,
        server_state: &str,
        license_request_id: &str,
        request_enc_key: &str,
        expected: StatusCode,
    ) -> Result<(String, RetrieveLicenseRequestResponse)> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot retrieve a license request, must obtain an access token first".to_string(),
            ));
        }
        if server_state.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot retrieve a license request, must recover the lockbox first".to_string(),
            ));
        }
        decode_state(server_state)?;

        let request = RetrieveLicenseRequestRequest {
            body: RetrieveLicenseRequestBody {
                access_token: access_token.to_string(),
                server_state: server_state.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                license_request_id: license_request_id.to_string(),
                request_enc_key: request_enc_key.to_string(),
            },
        };

        let response: RetrieveLicenseRequestResponse = self
            .client
            .call_json(OP_RETRIEVE_LICENSE_REQUEST, &request, expected)
            .await?;

        decode_state(&response.server_state)?;
        Ok((response.server_state.clone(), response))
    }

    /// Issue a license against the foundational identity asset.
    ///
    /// The matched-assets map carries exactly one entry under the
    /// foundational identity name, pointing at the asset created earlier in
    /// the pipeline.
    pub async fn issue_license(
        &self,
        access_token: &str,
        server_state: &str,
        license_request_id: &str,
        assets: &HashMap<String, DigitalAsset>,
    ) -> Result<String> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot issue a license, must obtain an access token first".to_string(),
            ));
        }
        if server_state.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot issue a license, must recover the lockbox first".to_string(),
            ));
        }
        if license_request_id.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot issue a license without a license request id".to_string(),
            ));
        }
        let Some(asset) = assets.get(FOUNDATIONAL_IDENTITY_ASSET) else {
            return Err(Error::PreconditionNotMet(
                "cannot issue a license, must create the foundational identity asset first"
                    .to_string(),
            ));
        };
        decode_state(server_state)?;

        let mut matched_assets = HashMap::new();
        matched_assets.insert(
            FOUNDATIONAL_IDENTITY_NAME.to_string(),
            AssetQueryEntry {
                asset_seq_no: 1,
                digital_asset_id: asset.digital_asset_id.clone(),
                name: "asset1".to_string(),
            },
        );

        let request = IssueLicenseRequest {
            body: IssueLicenseBody {
                access_token: access_token.to_string(),
                server_state: server_state.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                license_request_id: license_request_id.to_string(),
                encrypt_whole_asset: true,
                do_not_notify_dac: true,
            },
            matched_assets,
        };

        let response: IssueLicenseResponse = self
            .client
            .call_json(OP_ISSUE_LICENSE, &request, StatusCode::ACCEPTED)
            .await?;

        if response.license.is_empty() {
            return Err(Error::Decode(
                "issuelicense response carried no license".to_string(),
            ));
        }
        Ok(response.license)
    }

    /// Fetch the current terms-of-service document version, returning the
    /// server state that acknowledges it.
    pub async fn retrieve_current_terms(&self, access_token: &str) -> Result<String> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot retrieve terms, must obtain an access token first".to_string(),
            ));
        }

        let request = RetrieveCurrentTermsRequest {
            body: RetrieveCurrentTermsBody {
                access_token: access_token.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                locale: "en-CA".to_string(),
            },
        };

        let response: RetrieveCurrentTermsResponse = self
            .client
            .call_json(OP_RETRIEVE_CURRENT_TERMS, &request, StatusCode::ACCEPTED)
            .await?;
        Ok(response.server_state)
    }

    /// Create a fresh lockbox, accepting the current terms first.
    pub async fn create_lockbox(
        &self,
        access_token: &str,
        with_recovery_data: bool,
    ) -> Result<String> {
        if access_token.is_empty() {
            return Err(Error::PreconditionNotMet(
                "cannot create a lockbox, must obtain an access token first".to_string(),
            ));
        }
        let server_state = self.retrieve_current_terms(access_token).await?;

        let request = CreateLockboxRequest {
            body: CreateLockboxBody {
                access_token: access_token.to_string(),
                endpoint: self.config.bank_endpoint.clone(),
                server_state,
                do_not_create_recovery_data: !with_recovery_data,
            },
        };

        let response: CreateLockboxResponse = self
            .client
            .call_json(OP_CREATE_LOCKBOX, &request, StatusCode::ACCEPTED)
            .await?;

        if response.server_state.is_empty() {
            return Err(Error::Decode(
                "createlockbox response carried no server state".to_string(),
            ));
        }
        Ok(response.server_state)
    }

    /// Run the full flow for one license request: token, lockbox recovery,
    /// foundational identity asset, license request retrieval, issuance.
    ///
    /// Errors are annotated with the stage that produced them; with five
    /// network stages in sequence, an unannotated error is useless.
    pub async fn get_license_for_da(
        &self,
        user_id: &str,
        password: &str,
        license_request_id: &str,
        request_enc_key: &str,
    ) -> Result<String> {
        let token = self
            .get_access_token(VERIFIED_ME_SCOPE, user_id, password, "")
            .await
            .map_err(|e| Error::stage("GetAccessToken", e))?;

        let (state, _) = self
            .recover_lockbox(&token, StatusCode::ACCEPTED, "")
            .await
            .map_err(|e| Error::stage("RecoverLockbox", e))?;

        let asset_types = vec![FOUNDATIONAL_IDENTITY_ASSET.to_string()];
        let (state, assets) = self
            .create_digital_assets(&token, &state, &asset_types)
            .await
            .map_err(|e| Error::stage("CreateDigitalAssets", e))?;

        let (state, _) = self
            .retrieve_license_request(
                &token,
                &state,
                license_request_id,
                request_enc_key,
                StatusCode::ACCEPTED,
            )
            .await
            .map_err(|e| Error::stage("RetrieveLicenseRequest", e))?;

        let license = self
            .issue_license(&token, &state, license_request_id, &assets)
            .await
            .map_err(|e| Error::stage("IssueLicense", e))?;

        info!(license_request_id, "license issued");
        Ok(license)
    }
}
