//! Token exchange
//!
//! Trades the authorization code captured by the login walk (plus the PKCE
//! verifier that started the flow) for an access token, via the simulator's
//! `accesstoken` operation.

use reqwest::StatusCode;

use crate::client::SimClient;
use crate::config::ProvisioningConfig;
use crate::constants::OP_ACCESS_TOKEN;
use crate::error::{Error, Result};
use crate::types::{AccessTokenBody, AccessTokenRequest, AccessTokenResponse};

pub async fn exchange_access_token(
    client: &SimClient,
    config: &ProvisioningConfig,
    auth_code: &str,
    code_verifier: &str,
    client_id: &str,
) -> Result<String> {
    let request = AccessTokenRequest {
        body: AccessTokenBody {
            provider_url: config.provider_url.clone(),
            audience: String::new(),
            auth_code: auth_code.to_string(),
            code_verifier: code_verifier.to_string(),
            client_id: client_id.to_string(),
            redirect_url: String::new(),
        },
    };

    let response: AccessTokenResponse = client
        .call_json(OP_ACCESS_TOKEN, &request, StatusCode::ACCEPTED)
        .await?;

    if response.access_token.is_empty() {
        return Err(Error::Decode(
            "accesstoken response carried no access token".to_string(),
        ));
    }
    Ok(response.access_token)
}
