//! Request-object step
//!
//! Asks the simulator to register an OIDC request object and hand back the
//! login URL the MyAM walker should start from. The simulator answers 202
//! with `{"loginurl": ...}` on success.

use std::collections::HashMap;

use reqwest::StatusCode;
use url::Url;

use crate::client::SimClient;
use crate::config::ProvisioningConfig;
use crate::constants::{BASIC_CLIENT_ID, OP_REQUEST_OBJECT, REQUEST_STATE};
use crate::error::{Error, Result};
use crate::types::{RequestObjectBody, RequestObjectRequest, RequestObjectResponse};

/// Register a request object and return the login URL to walk.
///
/// For the basic client profile the returned URL must carry the configured
/// locale in its `ui_locales` query parameter; a missing or different value
/// means the simulator ignored our request object and the login that would
/// follow is not the one we asked for.
pub async fn request_login(
    client: &SimClient,
    config: &ProvisioningConfig,
    scope: &str,
    auth_level: &str,
    code_challenge: &str,
    client_id: &str,
) -> Result<Url> {
    let request = RequestObjectRequest {
        body: RequestObjectBody {
            provider_url: config.provider_url.clone(),
            audience: config.audience.clone(),
            state: REQUEST_STATE.to_string(),
            scopes: scope.to_string(),
            acr_values: auth_level.to_string(),
            ui_locales: config.ui_locales.clone(),
            code_challenge: code_challenge.to_string(),
            code_challenge_method: "S256".to_string(),
            client_id: client_id.to_string(),
            redirect_url: String::new(),
        },
    };

    let response: RequestObjectResponse = client
        .call_json(OP_REQUEST_OBJECT, &request, StatusCode::ACCEPTED)
        .await?;

    if response.login_url.is_empty() {
        return Err(Error::EmptyLoginUrl);
    }
    let login_url =
        Url::parse(&response.login_url).map_err(|_| Error::MalformedLoginUrl(response.login_url))?;

    let params: HashMap<String, String> = login_url.query_pairs().into_owned().collect();
    if params.get("client_id").map(String::as_str) == Some(BASIC_CLIENT_ID) {
        match params.get("ui_locales") {
            Some(locale) if *locale == config.ui_locales => {}
            other => {
                return Err(Error::LocaleMismatch {
                    expected: config.ui_locales.clone(),
                    actual: other.cloned(),
                });
            }
        }
    }
    Ok(login_url)
}
