//! OIDC login walker
//!
//! Walks the MyAM login pages the way a browser would: GET the login URL,
//! POST credentials, submit the login form, then answer step-up and consent
//! if the provider presents them. The walker never knows in advance which
//! branches will occur; it reacts to what the provider sends back.
//!
//! The authorization code is never in a response body. It appears only as a
//! `code` query parameter on the Location header of one of several possible
//! intermediate redirects. Redirects are therefore followed manually, one
//! hop at a time, and each hop is run through an explicit redirect decision
//! before being fetched: once a hop carries a code, the walker records it
//! and stops following. Chasing that redirect to completion would lose the
//! session context and could land on an endpoint outside the simulator.

use reqwest::header::LOCATION;
use tracing::{debug, info};
use url::Url;

use crate::constants::{
    DEFAULT_TIMEOUT, MAX_REDIRECT_HOPS, STEP_UP_FORM_MARKER, STEP_UP_PLACEHOLDER_QUERY,
};
use crate::error::{Error, Result};

/// Decision taken after inspecting a single redirect hop.
#[derive(Debug, PartialEq, Eq)]
enum RedirectOutcome {
    /// No code on this hop; fetch the target and keep walking.
    Follow,
    /// An authorization code has been captured; stop following.
    CodeCaptured,
}

/// One browser-less login attempt against MyAM.
///
/// Owns a dedicated HTTP client with an isolated cookie jar; the jar is the
/// only cross-request state the walk relies on. Dropping the walker discards
/// the session. Never share an instance across concurrent logins.
pub struct Authenticator {
    user_id: String,
    password: String,
    login_url: Url,
    client: reqwest::Client,
    auth_code: Option<String>,
    last_redirect: Option<Url>,
}

impl Authenticator {
    /// Build a walker for one user against one login URL.
    pub fn new(user_id: &str, password: &str, login_url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            user_id: user_id.to_string(),
            password: password.to_string(),
            login_url,
            client,
            auth_code: None,
            last_redirect: None,
        })
    }

    /// Walk the login flow to an authorization code.
    ///
    /// Step order: visit login page, authenticate with JSON credentials,
    /// submit the login form, then step-up (only when the form is shown)
    /// and consent (always, when no code has been captured yet — the
    /// provider silently skips consent for some scope combinations and
    /// entering it is harmless either way).
    pub async fn obtain_auth_code(mut self) -> Result<String> {
        // step 1: visit login URL
        let request = self.client.get(self.login_url.clone());
        self.run("authorize", request, false).await?;

        // step 2: submit userid/password
        let credentials = serde_json::json!({
            "username": self.user_id,
            "password": self.password,
            "rememberMe": false,
        });
        let request = self.client.post(self.operation_url("authenticate")).json(&credentials);
        self.run("authenticate", request, false).await?;

        // From here on any operation may redirect with the code, depending
        // on the OIDC scopes. Interception is active for all further steps.

        // step 3: submit login form
        let form = [
            ("username", self.user_id.clone()),
            ("password", self.password.clone()),
        ];
        let request = self.client.post(self.operation_url("login")).form(&form);
        let login_body = self.run("login", request, true).await?;
        if let Some(code) = self.auth_code.take() {
            return Ok(code);
        }

        // step 3.1: step-up authentication, answered with a placeholder
        // one-time code the simulator accepts
        if !login_body.is_empty() && login_body.contains(STEP_UP_FORM_MARKER) {
            let mut url = self.operation_url("stepup");
            url.set_query(Some(STEP_UP_PLACEHOLDER_QUERY));
            let request = self.client.get(url);
            self.run("stepup", request, true).await?;
            if let Some(code) = self.auth_code.take() {
                return Ok(code);
            }
        }

        // step 4: submit consent
        let request = self.client.get(self.operation_url("consent"));
        self.run("consent", request, true).await?;
        if let Some(code) = self.auth_code.take() {
            return Ok(code);
        }

        Err(Error::NoAuthCode)
    }

    /// Derive an operation endpoint from the login URL: same scheme and
    /// host, first `/authorize` path segment replaced, no query.
    fn operation_url(&self, operation: &str) -> Url {
        let path = self
            .login_url
            .path()
            .replacen("/authorize", &format!("/{operation}"), 1);
        let mut url = self.login_url.clone();
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Inspect one redirect target and decide whether to keep following.
    ///
    /// The first code observed wins: once captured it is final for this
    /// session and later hops cannot overwrite it.
    fn inspect_redirect(&mut self, target: &Url) -> RedirectOutcome {
        self.last_redirect = Some(target.clone());
        if self.auth_code.is_none() {
            let code = target
                .query_pairs()
                .find(|(key, _)| key == "code")
                .map(|(_, value)| value.into_owned())
                .filter(|code| !code.is_empty());
            if let Some(code) = code {
                info!(target = %target, "authorization code captured on redirect");
                self.auth_code = Some(code);
            }
        }
        if self.auth_code.is_some() {
            RedirectOutcome::CodeCaptured
        } else {
            RedirectOutcome::Follow
        }
    }

    /// Send one request and walk its redirect chain, consulting the redirect
    /// decision after each hop when `intercept` is set. Returns the final
    /// response body; returns an empty body when the walk was cut short by a
    /// captured code.
    async fn run(
        &mut self,
        operation: &str,
        request: reqwest::RequestBuilder,
        intercept: bool,
    ) -> Result<String> {
        let mut response = request.send().await.map_err(|e| Error::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;

        let mut hops = 0usize;
        while response.status().is_redirection() {
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
            else {
                break;
            };
            let target = response
                .url()
                .join(&location)
                .map_err(|_| Error::MalformedRedirect {
                    operation: operation.to_string(),
                    location: location.clone(),
                })?;

            if intercept && self.inspect_redirect(&target) == RedirectOutcome::CodeCaptured {
                return Ok(String::new());
            }

            hops += 1;
            if hops > MAX_REDIRECT_HOPS {
                return Err(Error::TooManyRedirects(operation.to_string()));
            }

            debug!(operation, target = %target, hop = hops, "following redirect");
            response = self
                .client
                .get(target)
                .send()
                .await
                .map_err(|e| Error::Transport {
                    operation: operation.to_string(),
                    message: e.to_string(),
                })?;
        }

        let status = response.status();
        if !status.is_success() {
            // A captured code makes the rest of this walk irrelevant.
            if self.auth_code.is_some() {
                return Ok(String::new());
            }
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AuthorizeFailed {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| Error::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    const SESSION_COOKIE: &str = "MYAMSESSION=walk-test-session";

    /// Scripted identity provider. Each flag turns on one branch of the
    /// simulated login flow; everything else answers 200 with an empty body.
    #[derive(Default)]
    struct MockProvider {
        code_on_login: bool,
        show_stepup_form: bool,
        code_on_stepup: bool,
        stepup_redirects_plain: bool,
        code_on_consent: bool,
        fail_authorize: bool,
        log: Mutex<Vec<String>>,
        stepup_query: Mutex<Option<String>>,
        callback_hits: AtomicUsize,
    }

    impl MockProvider {
        fn record(&self, operation: &str) {
            self.log.lock().unwrap().push(operation.to_string());
        }

        fn operations(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn handle(&self, request: Request<Body>) -> Response<Body> {
            let path = request.uri().path().to_string();
            let has_session = request
                .headers()
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains(SESSION_COOKIE));

            match path.as_str() {
                "/myam/oidc/authorize" => {
                    self.record("authorize");
                    if self.fail_authorize {
                        return plain(StatusCode::INTERNAL_SERVER_ERROR, "simulator down");
                    }
                    Response::builder()
                        .status(StatusCode::OK)
                        .header("set-cookie", format!("{SESSION_COOKIE}; Path=/"))
                        .body(Body::from("login page"))
                        .unwrap()
                }
                "/myam/oidc/authenticate" => {
                    self.record("authenticate");
                    plain(StatusCode::OK, "")
                }
                "/myam/oidc/login" => {
                    self.record("login");
                    // the walker must carry the session cookie, not re-derive it
                    if !has_session {
                        return plain(StatusCode::FORBIDDEN, "no session");
                    }
                    if self.code_on_login {
                        redirect("/myam/oidc/callback?code=AUTH-CODE-1&state=state")
                    } else if self.show_stepup_form {
                        plain(
                            StatusCode::OK,
                            r#"<form action="/myam/oidc/stepup" method="get">otp</form>"#,
                        )
                    } else {
                        plain(StatusCode::OK, "")
                    }
                }
                "/myam/oidc/stepup" => {
                    self.record("stepup");
                    *self.stepup_query.lock().unwrap() =
                        request.uri().query().map(str::to_owned);
                    if self.code_on_stepup {
                        redirect("/myam/oidc/callback?code=AUTH-CODE-2&state=state")
                    } else if self.stepup_redirects_plain {
                        redirect("/myam/oidc/interlude")
                    } else {
                        plain(StatusCode::OK, "")
                    }
                }
                "/myam/oidc/interlude" => {
                    self.record("interlude");
                    plain(StatusCode::OK, "")
                }
                "/myam/oidc/consent" => {
                    self.record("consent");
                    if self.code_on_consent {
                        redirect("/myam/oidc/callback?code=AUTH-CODE-3&state=state")
                    } else {
                        plain(StatusCode::OK, "")
                    }
                }
                "/myam/oidc/callback" => {
                    // the walker must refuse the redirect that carries the code
                    self.callback_hits.fetch_add(1, Ordering::SeqCst);
                    plain(StatusCode::OK, "should never be fetched")
                }
                _ => plain(StatusCode::NOT_FOUND, "not found"),
            }
        }
    }

    fn plain(status: StatusCode, body: &str) -> Response<Body> {
        Response::builder()
            .status(status)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn redirect(location: &str) -> Response<Body> {
        Response::builder()
            .status(StatusCode::FOUND)
            .header("location", location)
            .body(Body::empty())
            .unwrap()
    }

    /// Bind the mock provider on an ephemeral port and return its login URL.
    async fn start_provider(provider: Arc<MockProvider>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new().fallback(move |request: Request<Body>| {
            let provider = provider.clone();
            async move { provider.handle(request) }
        });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!(
            "http://{addr}/myam/oidc/authorize?client_id=myClientIDbasic&ui_locales=en"
        ))
        .unwrap()
    }

    async fn walk(provider: &Arc<MockProvider>) -> Result<String> {
        let login_url = start_provider(provider.clone()).await;
        let walker = Authenticator::new("jdoe7", "password", login_url).unwrap();
        walker.obtain_auth_code().await
    }

    #[tokio::test]
    async fn code_at_login_redirect_stops_the_walk() {
        let provider = Arc::new(MockProvider {
            code_on_login: true,
            ..Default::default()
        });

        let code = walk(&provider).await.unwrap();
        assert_eq!(code, "AUTH-CODE-1");
        assert_eq!(
            provider.operations(),
            vec!["authorize", "authenticate", "login"],
            "no requests may be issued past the point of capture"
        );
        assert_eq!(
            provider.callback_hits.load(Ordering::SeqCst),
            0,
            "the code-carrying redirect must not be followed"
        );
    }

    #[tokio::test]
    async fn stepup_branch_yields_code() {
        let provider = Arc::new(MockProvider {
            show_stepup_form: true,
            code_on_stepup: true,
            ..Default::default()
        });

        let code = walk(&provider).await.unwrap();
        assert_eq!(code, "AUTH-CODE-2");
        assert_eq!(
            provider.operations(),
            vec!["authorize", "authenticate", "login", "stepup"]
        );
        assert_eq!(
            provider.stepup_query.lock().unwrap().as_deref(),
            Some("code=1234"),
            "step-up must be answered with the placeholder one-time code"
        );
        assert_eq!(provider.callback_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn consent_branch_yields_code() {
        let provider = Arc::new(MockProvider {
            code_on_consent: true,
            ..Default::default()
        });

        let code = walk(&provider).await.unwrap();
        assert_eq!(code, "AUTH-CODE-3");
        assert_eq!(
            provider.operations(),
            vec!["authorize", "authenticate", "login", "consent"],
            "consent is attempted even without a body marker"
        );
    }

    #[tokio::test]
    async fn stepup_then_consent_yields_code() {
        // Step-up redirects somewhere harmless without a code; the walker
        // must follow that hop, then pick up the code at consent.
        let provider = Arc::new(MockProvider {
            show_stepup_form: true,
            stepup_redirects_plain: true,
            code_on_consent: true,
            ..Default::default()
        });

        let code = walk(&provider).await.unwrap();
        assert_eq!(code, "AUTH-CODE-3");
        assert_eq!(
            provider.operations(),
            vec![
                "authorize",
                "authenticate",
                "login",
                "stepup",
                "interlude",
                "consent"
            ]
        );
    }

    #[tokio::test]
    async fn no_code_anywhere_fails_after_consent() {
        let provider = Arc::new(MockProvider::default());

        let err = walk(&provider).await.unwrap_err();
        assert!(matches!(err, Error::NoAuthCode), "got: {err}");
        assert_eq!(
            provider.operations(),
            vec!["authorize", "authenticate", "login", "consent"],
            "failure must come only after step-up detection and consent"
        );
    }

    #[tokio::test]
    async fn non_2xx_on_authorize_is_terminal() {
        let provider = Arc::new(MockProvider {
            fail_authorize: true,
            ..Default::default()
        });

        let err = walk(&provider).await.unwrap_err();
        match err {
            Error::AuthorizeFailed {
                operation,
                status,
                body,
            } => {
                assert_eq!(operation, "authorize");
                assert_eq!(status, 500);
                assert!(body.contains("simulator down"));
            }
            other => panic!("expected AuthorizeFailed, got: {other}"),
        }
        assert_eq!(provider.operations(), vec!["authorize"]);
    }

    #[test]
    fn operation_url_rewrites_only_the_authorize_segment() {
        let login_url =
            Url::parse("https://idp.example/myam/oidc/authorize?client_id=c&ui_locales=en")
                .unwrap();
        let walker = Authenticator::new("u", "p", login_url).unwrap();

        let url = walker.operation_url("consent");
        assert_eq!(url.as_str(), "https://idp.example/myam/oidc/consent");

        let url = walker.operation_url("login");
        assert_eq!(url.as_str(), "https://idp.example/myam/oidc/login");
    }

    #[test]
    fn first_captured_code_is_final() {
        let login_url = Url::parse("https://idp.example/myam/oidc/authorize").unwrap();
        let mut walker = Authenticator::new("u", "p", login_url).unwrap();

        let first = Url::parse("https://idp.example/cb?code=first").unwrap();
        let second = Url::parse("https://idp.example/cb?code=second").unwrap();

        assert_eq!(walker.inspect_redirect(&first), RedirectOutcome::CodeCaptured);
        assert_eq!(
            walker.inspect_redirect(&second),
            RedirectOutcome::CodeCaptured
        );
        assert_eq!(walker.auth_code.as_deref(), Some("first"));
        assert_eq!(
            walker.last_redirect.as_ref().unwrap().as_str(),
            second.as_str(),
            "last redirect tracking still advances after capture"
        );
    }

    #[test]
    fn redirect_without_code_is_followed() {
        let login_url = Url::parse("https://idp.example/myam/oidc/authorize").unwrap();
        let mut walker = Authenticator::new("u", "p", login_url).unwrap();

        let target = Url::parse("https://idp.example/next?state=state").unwrap();
        assert_eq!(walker.inspect_redirect(&target), RedirectOutcome::Follow);
        assert!(walker.auth_code.is_none());
    }

    #[test]
    fn empty_code_parameter_is_ignored() {
        let login_url = Url::parse("https://idp.example/myam/oidc/authorize").unwrap();
        let mut walker = Authenticator::new("u", "p", login_url).unwrap();

        let target = Url::parse("https://idp.example/cb?code=").unwrap();
        assert_eq!(walker.inspect_redirect(&target), RedirectOutcome::Follow);
        assert!(walker.auth_code.is_none());
    }
}
