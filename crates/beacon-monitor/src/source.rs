//! Where feature-instance documents come from.

use async_trait::async_trait;
use http::{Method, StatusCode};
use tracing::debug;

use beacon_core::http::HttpClient;

use crate::error::SourceError;

/// A parsed document locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Local file: file:///etc/beacon/fin.json, ./fin.json or fin.json
    File { path: String },
    /// HTTP or HTTPS: https://config.internal/fin/worker
    Http { url: String },
}

impl SourceLocator {
    pub fn parse(locator: &str) -> Result<Self, SourceError> {
        if let Some(path) = locator.strip_prefix("file://") {
            Ok(SourceLocator::File {
                path: path.to_string(),
            })
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            Ok(SourceLocator::Http {
                url: locator.to_string(),
            })
        } else if locator.contains("://") {
            Err(SourceError::UnsupportedScheme(locator.to_string()))
        } else if locator.starts_with("./")
            || locator.starts_with('/')
            || locator.ends_with(".json")
        {
            Ok(SourceLocator::File {
                path: locator.to_string(),
            })
        } else {
            Err(SourceError::UnsupportedScheme(locator.to_string()))
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            SourceLocator::File { .. } => "file",
            SourceLocator::Http { url } if url.starts_with("https://") => "https",
            SourceLocator::Http { .. } => "http",
        }
    }
}

/// Resolves a locator to the raw bytes of a document.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, SourceError>;
}

/// Reads `file` locators from disk and `http`/`https` locators over the
/// network.
#[derive(Debug, Clone, Default)]
pub struct LocatorSource {
    http: HttpClient,
}

impl LocatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ConfigSource for LocatorSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, SourceError> {
        match SourceLocator::parse(locator)? {
            SourceLocator::File { path } => {
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| SourceError::Io { path, source })
            }
            SourceLocator::Http { url } => {
                let resp = self.http.exchange(Method::GET, &url, None, None).await?;
                if resp.status != StatusCode::OK {
                    debug!(%url, status = %resp.status, "config fetch rejected");
                    return Err(SourceError::Status {
                        url,
                        status: resp.status.as_u16(),
                    });
                }
                Ok(resp.body.to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_file_locators() {
        for (input, path) in [
            ("file:///etc/beacon/fin.json", "/etc/beacon/fin.json"),
            ("/etc/beacon/fin.json", "/etc/beacon/fin.json"),
            ("./fin.json", "./fin.json"),
            ("fin.json", "fin.json"),
        ] {
            let loc = SourceLocator::parse(input).unwrap();
            assert_eq!(loc.scheme(), "file");
            assert_eq!(
                loc,
                SourceLocator::File {
                    path: path.to_string()
                }
            );
        }
    }

    #[test]
    fn parse_http_and_https() {
        let loc = SourceLocator::parse("http://config.internal/fin/worker").unwrap();
        assert_eq!(loc.scheme(), "http");
        let loc = SourceLocator::parse("https://config.internal/fin/worker").unwrap();
        assert_eq!(loc.scheme(), "https");
    }

    #[test]
    fn parse_rejects_other_schemes() {
        for input in ["ftp://config.internal/fin", "s3://bucket/fin.json", "fin.yaml"] {
            assert!(matches!(
                SourceLocator::parse(input),
                Err(SourceError::UnsupportedScheme(_))
            ));
        }
    }

    #[tokio::test]
    async fn fetch_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"featureName":"worker"}"#).unwrap();

        let locator = format!("file://{}", file.path().display());
        let bytes = LocatorSource::new().fetch(&locator).await.unwrap();
        assert_eq!(bytes, br#"{"featureName":"worker"}"#);
    }

    #[tokio::test]
    async fn fetch_missing_file_is_io_error() {
        let err = LocatorSource::new()
            .fetch("/nonexistent/beacon/fin.json")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn fetch_https_goes_to_the_network() {
        let err = LocatorSource::new()
            .fetch("https://127.0.0.1:1/fin/worker")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Http(beacon_core::http::HttpError::Connect { .. })
        ));
    }
}
