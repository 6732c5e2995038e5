//! Collaborator seams: the network transport and the entry lister.
//!
//! The engine never talks to the network directly. Submissions go through a
//! [`Transport`]; verification code reads remote state through a
//! [`Lister`]. [`TransportLister`] provides a `Lister` on top of any
//! transport that speaks the remote's listing endpoint.

use std::fmt;

use acl_types::AclEntry;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::builder::entries_path;
use crate::error::TransportError;

/// HTTP method of a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Patch,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable error message from the body.
    ///
    /// Uses the remote's `msg` and `detail` fields when the body is a JSON
    /// error document, otherwise the body text itself.
    pub fn error_message(&self) -> String {
        #[derive(Deserialize)]
        struct RemoteError {
            msg: Option<String>,
            detail: Option<String>,
        }

        match serde_json::from_slice::<RemoteError>(&self.body) {
            Ok(RemoteError {
                msg: Some(msg),
                detail: Some(detail),
            }) if !detail.is_empty() => format!("{}: {}", msg, detail),
            Ok(RemoteError { msg: Some(msg), .. }) => msg,
            Ok(RemoteError {
                detail: Some(detail),
                ..
            }) => detail,
            _ => String::from_utf8_lossy(&self.body).trim().to_string(),
        }
    }
}

/// Carries one request to the remote store.
///
/// Implementations report a completed exchange as `Ok` whatever its status;
/// `Err` is reserved for calls that produced no response. Dropping the
/// returned future must abandon the call, which is how the engine
/// propagates cancellation and timeouts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Reads the current entries of an ACL.
#[async_trait]
pub trait Lister: Send + Sync {
    /// Lists every entry of the ACL, in no particular order.
    async fn list(&self, service_id: &str, acl_id: &str) -> Result<Vec<AclEntry>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        (**self).send(method, path, body).await
    }
}

/// Default page size for listing calls.
pub const DEFAULT_PER_PAGE: usize = 100;

/// A [`Lister`] that pages through the remote listing endpoint using a
/// [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportLister<T> {
    transport: T,
    per_page: usize,
}

impl<T: Transport> TransportLister<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Sets the page size; zero is raised to one.
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: Transport> Lister for TransportLister<T> {
    #[instrument(skip(self))]
    async fn list(&self, service_id: &str, acl_id: &str) -> Result<Vec<AclEntry>, TransportError> {
        let base = entries_path(service_id, acl_id);
        let mut entries = Vec::new();
        let mut page = 1usize;

        loop {
            let path = format!("{}?page={}&per_page={}", base, page, self.per_page);
            let response = self.transport.send(Method::Get, &path, Vec::new()).await?;
            if !response.is_success() {
                return Err(TransportError::UnexpectedStatus {
                    status: response.status,
                    message: response.error_message(),
                });
            }

            let batch: Vec<AclEntry> = serde_json::from_slice(&response.body)
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
            let fetched = batch.len();
            entries.extend(batch);

            debug!(page, fetched, "acl-batch: Listed entry page");
            if fetched < self.per_page {
                break;
            }
            page += 1;
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_message_forms() {
        let json = TransportResponse::new(400, r#"{"msg":"Bad request","detail":"Unknown id"}"#);
        assert_eq!(json.error_message(), "Bad request: Unknown id");

        let msg_only = TransportResponse::new(404, r#"{"msg":"Record not found"}"#);
        assert_eq!(msg_only.error_message(), "Record not found");

        let text = TransportResponse::new(502, "upstream unavailable\n");
        assert_eq!(text.error_message(), "upstream unavailable");
    }

    #[test]
    fn test_is_success() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(409, "").is_success());
    }

    fn page(ips: &[(&str, &str)]) -> Vec<u8> {
        let entries: Vec<_> = ips
            .iter()
            .map(|(id, ip)| serde_json::json!({"id": id, "ip": ip, "negated": "0"}))
            .collect();
        serde_json::to_vec(&entries).unwrap()
    }

    #[tokio::test]
    async fn test_lister_follows_pages() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(
                eq(Method::Get),
                eq("/service/svc/acl/acl/entries?page=1&per_page=2"),
                eq(Vec::<u8>::new()),
            )
            .times(1)
            .returning(|_, _, _| Ok(TransportResponse::new(200, page(&[("a", "10.0.0.1"), ("b", "10.0.0.2")]))));
        transport
            .expect_send()
            .with(
                eq(Method::Get),
                eq("/service/svc/acl/acl/entries?page=2&per_page=2"),
                eq(Vec::<u8>::new()),
            )
            .times(1)
            .returning(|_, _, _| Ok(TransportResponse::new(200, page(&[("c", "10.0.0.3")]))));

        let lister = TransportLister::new(transport).with_per_page(2);
        let entries = lister.list("svc", "acl").await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_lister_maps_failures() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_, _, _| Ok(TransportResponse::new(404, r#"{"msg":"Record not found"}"#)));
        let err = TransportLister::new(transport).list("svc", "acl").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::UnexpectedStatus {
                status: 404,
                message: "Record not found".to_string()
            }
        );

        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_, _, _| Ok(TransportResponse::new(200, "not json")));
        let err = TransportLister::new(transport).list("svc", "acl").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }
}
