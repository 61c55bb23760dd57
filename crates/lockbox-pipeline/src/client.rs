//! Simulator protocol client
//!
//! One request shape for every operation: POST a JSON document to
//! `<base>/<operation>` with the operation name lowercased, then compare the
//! status code against the single expected value for that operation. No
//! retries live here; callers that retry (lockbox recovery) decide that
//! themselves from the returned error.

use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Clone)]
pub struct SimClient {
    client: reqwest::Client,
    base_url: String,
}

impl SimClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // The simulator expects one connection per exchange; pair the
        // `Connection: close` header with an empty idle pool so reqwest
        // never reuses a socket the server has half-closed.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::Transport {
                operation: "client-init".into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST `payload` to the operation's endpoint and return the raw body,
    /// provided the status matches `expected` exactly.
    pub async fn call<P: Serialize>(
        &self,
        operation: &str,
        payload: &P,
        expected: StatusCode,
    ) -> Result<Vec<u8>> {
        let operation = operation.to_lowercase();
        let url = format!("{}/{operation}", self.base_url);

        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::Decode(format!("unable to marshal {operation} request: {e}")))?;

        debug!(%operation, %url, "sending simulator request");
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "close")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport {
                operation: operation.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| Error::Transport {
            operation: operation.clone(),
            message: format!("reading response body: {e}"),
        })?;

        if status != expected {
            return Err(Error::StatusMismatch {
                operation,
                status: status.as_u16(),
                expected: expected.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    /// Like [`call`](Self::call), then deserialize the body as JSON.
    pub async fn call_json<P: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        payload: &P,
        expected: StatusCode,
    ) -> Result<T> {
        let body = self.call(operation, payload, expected).await?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::Decode(format!(
                "unable to parse {} response: {e}",
                operation.to_lowercase()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Recorded {
        path: String,
        headers: HashMap<String, String>,
        body: serde_json::Value,
    }

    async fn spawn_echo_server(status: StatusCode) -> (String, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = recorded.clone();
        let app = Router::new().fallback(
            move |State(state): State<Arc<Mutex<Recorded>>>,
                  uri: Uri,
                  headers: HeaderMap,
                  body: Bytes| async move {
                let mut rec = state.lock().unwrap();
                rec.path = uri.path().to_string();
                for (name, value) in &headers {
                    rec.headers
                        .insert(name.to_string(), value.to_str().unwrap_or("").to_string());
                }
                rec.body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
                (status, axum::Json(json!({"echo": true}))).into_response()
            },
        );
        let app = app.with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), recorded)
    }

    #[tokio::test]
    async fn lowercases_operation_in_path() {
        let (base, recorded) = spawn_echo_server(StatusCode::ACCEPTED).await;
        let client = SimClient::new(&base).unwrap();

        client
            .call("RecoverLockbox", &json!({}), StatusCode::ACCEPTED)
            .await
            .unwrap();

        assert_eq!(recorded.lock().unwrap().path, "/recoverlockbox");
    }

    #[tokio::test]
    async fn sends_protocol_headers() {
        let (base, recorded) = spawn_echo_server(StatusCode::ACCEPTED).await;
        let client = SimClient::new(&base).unwrap();

        client
            .call("requestobject", &json!({"a": 1}), StatusCode::ACCEPTED)
            .await
            .unwrap();

        let rec = recorded.lock().unwrap();
        assert_eq!(
            rec.headers.get("content-type").map(String::as_str),
            Some("application/json; charset=UTF-8")
        );
        assert_eq!(
            rec.headers.get("cache-control").map(String::as_str),
            Some("no-cache")
        );
        assert_eq!(rec.body, json!({"a": 1}));
    }

    #[tokio::test]
    async fn status_mismatch_carries_body_and_codes() {
        let (base, _) = spawn_echo_server(StatusCode::BAD_GATEWAY).await;
        let client = SimClient::new(&base).unwrap();

        let err = client
            .call("issuelicense", &json!({}), StatusCode::ACCEPTED)
            .await
            .unwrap_err();

        match err {
            Error::StatusMismatch {
                operation,
                status,
                expected,
                body,
            } => {
                assert_eq!(operation, "issuelicense");
                assert_eq!(status, 502);
                assert_eq!(expected, 202);
                assert!(body.contains("echo"), "body preserved: {body}");
            }
            other => panic!("expected StatusMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) is unassigned on the loopback in the test env.
        let client = SimClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .call("accesstoken", &json!({}), StatusCode::ACCEPTED)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn call_json_surfaces_parse_failures_as_decode() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::ACCEPTED, "this is not json") });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = SimClient::new(&format!("http://{addr}")).unwrap();
        let err = client
            .call_json::<_, serde_json::Value>("accesstoken", &json!({}), StatusCode::ACCEPTED)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    }
}
