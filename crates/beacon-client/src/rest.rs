//! REST implementation of [`BeaconApi`].

use async_trait::async_trait;
use http::{Method, StatusCode};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use beacon_core::http::{HttpClient, HttpResponse};
use beacon_core::{
    ExpectationInputs, ExpectationRecord, FailedExpectation, FulfilledExpectation,
    RescheduledExpectation, SystemInputs, SystemRecord,
};

use crate::api::{ApiError, ApiResult, BeaconApi};

/// Bytes that cannot appear verbatim in one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `/{collection}/{path}{suffix}` with `path` escaped as a single segment.
fn resource(collection: &str, path: &str, suffix: &str) -> String {
    format!("/{collection}/{}{suffix}", utf8_percent_encode(path, SEGMENT))
}

/// Talks JSON over HTTP/1.1 (plain or TLS) to a beacon service.
#[derive(Debug, Clone)]
pub struct HttpBeaconApi {
    base_url: String,
    token: Option<String>,
    http: HttpClient,
}

impl HttpBeaconApi {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:9005/`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            http: HttpClient::new(),
        }
    }

    /// Authorize every request with `Bearer <token>`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the transport, e.g. with one trusting a private CA.
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<HttpResponse> {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ApiError::Encode)?;
        let url = self.url(path);
        let resp = self
            .http
            .exchange(method.clone(), &url, self.token.as_deref(), payload)
            .await?;

        if resp.status != StatusCode::OK && resp.status != StatusCode::CREATED {
            debug!(%method, %url, status = %resp.status, "beacon rejected request");
            return Err(ApiError::Status {
                status: resp.status.as_u16(),
                body: resp.text(),
            });
        }
        Ok(resp)
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let resp = self.send(method, path, Some(body)).await?;
        serde_json::from_slice(&resp.body).map_err(ApiError::Decode)
    }
}

#[async_trait]
impl BeaconApi for HttpBeaconApi {
    async fn create_system(&self, inputs: &SystemInputs) -> ApiResult<SystemRecord> {
        self.send_json(Method::POST, "/systems", inputs).await
    }

    async fn delete_system(&self, path: &str) -> ApiResult<()> {
        self.send::<()>(Method::DELETE, &resource("systems", path, ""), None)
            .await
            .map(drop)
    }

    async fn create_expectation(
        &self,
        inputs: &ExpectationInputs,
    ) -> ApiResult<ExpectationRecord> {
        self.send_json(Method::POST, "/expectations", inputs).await
    }

    async fn delete_expectation(&self, path: &str) -> ApiResult<()> {
        self.send::<()>(Method::DELETE, &resource("expectations", path, ""), None)
            .await
            .map(drop)
    }

    async fn fulfil_expectation(&self, path: &str, body: &FulfilledExpectation) -> ApiResult<()> {
        self.send(Method::POST, &resource("expectations", path, "/fulfil"), Some(body))
            .await
            .map(drop)
    }

    async fn fail_expectation(&self, path: &str, body: &FailedExpectation) -> ApiResult<()> {
        self.send(Method::POST, &resource("expectations", path, "/fail"), Some(body))
            .await
            .map(drop)
    }

    async fn reschedule_expectation(
        &self,
        path: &str,
        body: &RescheduledExpectation,
    ) -> ApiResult<()> {
        self.send(
            Method::POST,
            &resource("expectations", path, "/reschedule"),
            Some(body),
        )
        .await
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, answer with `response`, and return the raw request.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed early");
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).into_owned();
                if let Some(end) = text.find("\r\n\r\n") {
                    let expected = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + expected {
                        break;
                    }
                }
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8(raw).unwrap()
        });
        (base, handle)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn inputs() -> SystemInputs {
        SystemInputs {
            name: "api".to_string(),
            tenant: "acme".to_string(),
            parent_path: "nrn:beacon:acme:fin:api:1.0.0:blue::blue".to_string(),
            feature_instance_path: "nrn:beacon:acme:fin:api:1.0.0:blue::blue".to_string(),
            display_name: None,
            description: None,
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpBeaconApi::new("http://localhost:9005/");
        assert_eq!(api.base_url(), "http://localhost:9005");
        assert_eq!(api.url("/systems"), "http://localhost:9005/systems");
    }

    #[tokio::test]
    async fn create_system_posts_inputs_and_decodes_record() {
        let (base, server) = serve_once(http_response(
            "201 Created",
            r#"{"path":"nrn:beacon:acme:sys:api:1.0.0:blue::api","tenant":"acme"}"#,
        ))
        .await;

        let api = HttpBeaconApi::new(base).with_token("secret");
        let record = api.create_system(&inputs()).await.unwrap();
        assert_eq!(record.path, "nrn:beacon:acme:sys:api:1.0.0:blue::api");
        assert_eq!(record.tenant, "acme");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /systems HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""parentPath":"nrn:beacon:acme:fin:api:1.0.0:blue::blue""#));
    }

    #[tokio::test]
    async fn fulfil_targets_expectation_path() {
        let (base, server) = serve_once(http_response("200 OK", "{}")).await;

        let api = HttpBeaconApi::new(base);
        api.fulfil_expectation(
            "nrn:beacon:acme:exp:api:1.0.0:blue:api:heartbeat",
            &FulfilledExpectation {
                message: "ok".to_string(),
            },
        )
        .await
        .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /expectations/nrn:beacon:acme:exp:api:1.0.0:blue:api:heartbeat/fulfil HTTP/1.1"
        ));
        assert!(request.ends_with(r#"{"message":"ok"}"#));
        assert!(!request.to_lowercase().contains("authorization"));
    }

    #[test]
    fn resource_escapes_path_as_one_segment() {
        assert_eq!(
            resource("systems", "nrn:beacon:acme:sys:api:1.0.0:blue::api", ""),
            "/systems/nrn:beacon:acme:sys:api:1.0.0:blue::api"
        );
        assert_eq!(
            resource("expectations", "a b/c?d#e%f", "/fail"),
            "/expectations/a%20b%2Fc%3Fd%23e%25f/fail"
        );
    }

    #[tokio::test]
    async fn names_with_reserved_characters_are_escaped() {
        let (base, server) = serve_once(http_response("200 OK", "{}")).await;

        HttpBeaconApi::new(base)
            .fulfil_expectation(
                "nrn:beacon:acme:exp:api:1.0.0:blue:my api:health?check",
                &FulfilledExpectation {
                    message: "ok".to_string(),
                },
            )
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /expectations/nrn:beacon:acme:exp:api:1.0.0:blue:my%20api:health%3Fcheck/fulfil HTTP/1.1"
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, _server) =
            serve_once(http_response("500 Internal Server Error", "boom")).await;

        let err = HttpBeaconApi::new(base)
            .delete_system("nrn:beacon:acme:sys:api:1.0.0:blue::api")
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (base, _server) = serve_once(http_response("201 Created", "not json")).await;

        let err = HttpBeaconApi::new(base)
            .create_system(&inputs())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let err = HttpBeaconApi::new("http://127.0.0.1:1")
            .delete_expectation("x")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }
}
