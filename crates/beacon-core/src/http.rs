//! Minimal HTTP/1.1 client over a fresh TCP or TLS connection.
//!
//! One request per connection. `https://` servers are verified against the
//! Mozilla root store unless the client is given its own rustls config.
//! Callers bound the exchange with their own timeout.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error("unsupported url scheme in {0:?} (expected http:// or https://)")]
    UnsupportedScheme(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("invalid tls server name {0:?}")]
    ServerName(String),

    #[error("tls handshake with {addr} failed: {source}")]
    Tls {
        addr: String,
        source: std::io::Error,
    },

    #[error("tls configuration error: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("http error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    /// Body as lossy UTF-8, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends single requests over `http://` or `https://`.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    /// `None` means the shared Mozilla-roots config.
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify `https://` servers with `config` instead of the Mozilla roots,
    /// e.g. to trust a private CA.
    pub fn with_tls_config(config: Arc<rustls::ClientConfig>) -> Self {
        Self { tls: Some(config) }
    }

    fn tls_config(&self) -> Result<Arc<rustls::ClientConfig>, HttpError> {
        match &self.tls {
            Some(config) => Ok(config.clone()),
            None => default_tls_config(),
        }
    }

    /// Send one request and buffer the whole response.
    ///
    /// `body`, when present, is sent as `application/json`.
    pub async fn exchange(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, HttpError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| HttpError::InvalidUrl(url.to_string()))?;
        let secure = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            Some(_) => return Err(HttpError::UnsupportedScheme(url.to_string())),
            None => return Err(HttpError::InvalidUrl(url.to_string())),
        };
        let host = uri
            .host()
            .ok_or_else(|| HttpError::InvalidUrl(url.to_string()))?;
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        let addr = format!("{host}:{port}");
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        let mut builder = Request::builder()
            .method(method)
            .uri(target)
            .header("host", &addr)
            .header("user-agent", "beacon-client/0.1")
            .header("accept", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let has_body = body.is_some();
        if has_body {
            builder = builder.header("content-type", "application/json");
        }
        let req = builder.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| HttpError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let (status, body) = if secure {
            let name = ServerName::try_from(host.to_string())
                .map_err(|_| HttpError::ServerName(host.to_string()))?;
            let tls = TlsConnector::from(self.tls_config()?)
                .connect(name, stream)
                .await
                .map_err(|source| HttpError::Tls {
                    addr: addr.clone(),
                    source,
                })?;
            send(tls, req).await?
        } else {
            send(stream, req).await?
        };

        debug!(%status, %url, secure, has_body, bytes = body.len(), "http exchange complete");

        Ok(HttpResponse { status, body })
    }
}

async fn send<S>(stream: S, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "http connection closed with error");
        }
    });

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let body = resp.into_body().collect().await?.to_bytes();
    Ok((status, body))
}

/// Client config trusting the Mozilla root store, built once per process.
fn default_tls_config() -> Result<Arc<rustls::ClientConfig>, HttpError> {
    static CONFIG: OnceLock<Arc<rustls::ClientConfig>> = OnceLock::new();
    if let Some(config) = CONFIG.get() {
        return Ok(config.clone());
    }

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder_with_provider(
        rustls::crypto::ring::default_provider().into(),
    )
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(CONFIG.get_or_init(|| Arc::new(config)).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
    use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A CA certificate and a `127.0.0.1` server chain + key signed by it.
    fn test_pki() -> (
        CertificateDer<'static>,
        Vec<CertificateDer<'static>>,
        PrivateKeyDer<'static>,
    ) {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::default();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "beacon test CA");
        ca_params.distinguished_name = dn;
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params = CertificateParams::new(vec!["127.0.0.1".to_string()]).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "beacon test server");
        server_params.distinguished_name = dn;
        let server_cert = server_params
            .signed_by(&server_key, &ca_cert, &ca_key)
            .unwrap();

        (
            ca_cert.der().clone(),
            vec![server_cert.der().clone()],
            PrivatePkcs8KeyDer::from(server_key.serialize_der()).into(),
        )
    }

    fn client_trusting(ca: CertificateDer<'static>) -> HttpClient {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(ca).unwrap();
        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
        HttpClient::with_tls_config(Arc::new(config))
    }

    /// Serve one request over TLS and return the raw request text.
    async fn serve_tls_once(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        response: &'static [u8],
    ) -> (std::net::SocketAddr, tokio::task::JoinHandle<String>) {
        let config = rustls::ServerConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .unwrap();
        let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            let Ok(mut tls) = acceptor.accept(sock).await else {
                return String::new();
            };
            let mut request = String::new();
            let mut buf = vec![0u8; 4096];
            while !request.ends_with("\r\n\r\n") {
                let n = tls.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed early");
                request.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            tls.write_all(response).await.unwrap();
            let _ = tls.shutdown().await;
            request
        });
        (addr, server)
    }

    #[tokio::test]
    async fn rejects_unknown_scheme() {
        let err = HttpClient::new()
            .exchange(Method::GET, "ftp://example.com/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn rejects_relative_url() {
        let err = HttpClient::new()
            .exchange(Method::GET, "/systems", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn closed_port_is_connect_error() {
        let err = HttpClient::new()
            .exchange(Method::GET, "http://127.0.0.1:1/healthz", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Connect { .. }));
    }

    #[tokio::test]
    async fn round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = String::new();
            let mut buf = vec![0u8; 4096];
            while !request.ends_with("\r\n\r\n{}") {
                let n = sock.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed early");
                request.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            sock.write_all(
                b"HTTP/1.1 201 Created\r\ncontent-length: 11\r\nconnection: close\r\n\r\n{\"ok\":true}",
            )
            .await
            .unwrap();
            request
        });

        let resp = HttpClient::new()
            .exchange(
                Method::POST,
                &format!("http://{addr}/systems"),
                Some("tok"),
                Some(b"{}".to_vec()),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.text(), "{\"ok\":true}");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /systems http/1.1"));
        assert!(request.contains("authorization: bearer tok"));
        assert!(request.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn https_round_trip_with_trusted_ca() {
        let (ca, chain, key) = test_pki();
        let (addr, server) = serve_tls_once(
            chain,
            key,
            b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
        )
        .await;

        let resp = client_trusting(ca)
            .exchange(
                Method::GET,
                &format!("https://{addr}/fin/worker"),
                Some("tok"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.text(), "ok");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /fin/worker http/1.1"));
        assert!(request.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn https_rejects_untrusted_certificate() {
        let (_ca, chain, key) = test_pki();
        let (addr, _server) = serve_tls_once(chain, key, b"").await;

        let err = HttpClient::new()
            .exchange(Method::GET, &format!("https://{addr}/fin/worker"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Tls { .. }), "unexpected error: {err:?}");
    }
}
