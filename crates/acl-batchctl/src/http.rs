//! HTTP transport backed by `reqwest`.

use std::time::Duration;

use acl_batch::{Method, Transport, TransportError, TransportResponse};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::config::ApiConfig;

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    auth: Option<(HeaderName, HeaderValue)>,
}

impl HttpTransport {
    /// Creates a transport for `api`, sending `token` in the configured
    /// header when given. `timeout` bounds each request end to end.
    pub fn new(api: &ApiConfig, token: Option<&str>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let auth = match token {
            Some(token) => {
                let name = HeaderName::from_bytes(api.auth_header.as_bytes())
                    .with_context(|| format!("invalid auth header name '{}'", api.auth_header))?;
                let mut value = HeaderValue::from_str(token).context("API token is not a valid header value")?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };

        let mut builder = reqwest::Client::builder().user_agent(concat!("acl-batchctl/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: api.endpoint.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Io(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url(path);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Patch => self
                .client
                .patch(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
        };
        request = request.header(ACCEPT, "application/json");
        if let Some((name, value)) = &self.auth {
            request = request.header(name.clone(), value.clone());
        }

        let response = request.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_error)?;

        debug!(%method, path, status, bytes = body.len(), "acl-batchctl: HTTP exchange complete");
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_joins_endpoint_and_path() {
        let api = ApiConfig {
            endpoint: "https://api.example.com/".to_string(),
            ..ApiConfig::default()
        };
        let transport = HttpTransport::new(&api, None, None).unwrap();
        assert_eq!(
            transport.url("/service/svc/acl/acl/entries"),
            "https://api.example.com/service/svc/acl/acl/entries"
        );
        assert!(transport.auth.is_none());
    }

    #[test]
    fn test_auth_header_is_sensitive() {
        let transport = HttpTransport::new(&ApiConfig::default(), Some("secret"), None).unwrap();
        let (name, value) = transport.auth.unwrap();
        assert_eq!(name.as_str(), "fastly-key");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_rejects_bad_header_name() {
        let api = ApiConfig {
            auth_header: "bad header".to_string(),
            ..ApiConfig::default()
        };
        assert!(HttpTransport::new(&api, Some("secret"), None).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connect_failure() {
        let api = ApiConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..ApiConfig::default()
        };
        let transport = HttpTransport::new(&api, None, Some(Duration::from_secs(5))).unwrap();
        let err = transport
            .send(Method::Get, "/service/svc/acl/acl/entries", Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
