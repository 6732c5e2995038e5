//! Submission of built batches.
//!
//! A batch is sent as one `PATCH` of the ACL's entry collection. The remote
//! store applies a batch atomically, so the caller sees one of two outcomes:
//! every operation applied (`Ok`) or none known to be applied (`Err`).
//!
//! After a [`TransportFailure`](SubmissionError::TransportFailure) the
//! remote outcome is unknown. Updates and deletes by id are idempotent, so a
//! batch made only of those is retried under the configured
//! [`RetryPolicy`]. A batch containing any create is never retried: a blind
//! resend could duplicate entries, and the caller must re-list remote state
//! first.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::builder::BatchModifyAclEntriesRequest;
use crate::error::{SubmissionError, SubmissionResult, TransportError};
use crate::retry::RetryPolicy;
use crate::transport::{Method, Transport, TransportResponse};

/// Per-submission behaviour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmitOptions {
    /// Retry schedule for idempotent batches.
    pub retry: RetryPolicy,
    /// Limit on each attempt; `None` waits for the transport.
    pub timeout: Option<Duration>,
}

/// Sends batches and classifies their outcome.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    options: SubmitOptions,
}

impl Submitter {
    pub fn new(options: SubmitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    /// Submits `request` through `transport`.
    ///
    /// Cancelling `cancel` abandons the in-flight call (or a pending backoff)
    /// and returns `TransportFailure(Cancelled)`. Whether a cancelled batch
    /// reached the remote store is unknown.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::RemoteRejected`] for a non-2xx response; never
    ///   retried
    /// - [`SubmissionError::TransportFailure`] when no response was observed,
    ///   after any retries the batch qualifies for
    /// - [`SubmissionError::Encode`] if the body cannot be encoded
    #[instrument(
        skip_all,
        fields(
            service_id = %request.service_id(),
            acl_id = %request.acl_id(),
            operations = request.len()
        )
    )]
    pub async fn submit<T>(
        &self,
        request: BatchModifyAclEntriesRequest,
        transport: &T,
        cancel: &CancellationToken,
    ) -> SubmissionResult<()>
    where
        T: Transport + ?Sized,
    {
        let body = request.to_body()?;
        let path = request.path();
        let idempotent = request.is_idempotent();
        let retry = &self.options.retry;

        let mut attempt = 1u32;
        loop {
            debug!(attempt, "acl-batch: Sending batch");
            let err = match self.attempt(transport, &path, body.clone(), cancel).await {
                Ok(()) => {
                    info!(attempt, "acl-batch: Batch applied");
                    return Ok(());
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                warn!(attempt, error = %err, "acl-batch: Batch failed");
                return Err(err);
            }
            if !idempotent {
                warn!(
                    error = %err,
                    creates = request.create_count(),
                    "acl-batch: Outcome unknown for batch with creates; not retrying, re-list entries before resubmitting"
                );
                return Err(err);
            }
            if !retry.allows_retry_after(attempt) {
                warn!(attempt, error = %err, "acl-batch: Retry attempts exhausted");
                return Err(err);
            }

            let delay = retry.backoff(attempt);
            warn!(
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "acl-batch: Transport failure, retrying idempotent batch"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(TransportError::Cancelled.into());
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt<T>(
        &self,
        transport: &T,
        path: &str,
        body: Vec<u8>,
        cancel: &CancellationToken,
    ) -> SubmissionResult<()>
    where
        T: Transport + ?Sized,
    {
        let call = with_timeout(self.options.timeout, transport.send(Method::Patch, path, body));
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            result = call => result?,
        };

        if response.is_success() {
            return Ok(());
        }
        Err(SubmissionError::remote_rejected(
            response.status,
            response.error_message(),
        ))
    }
}

async fn with_timeout<F>(limit: Option<Duration>, call: F) -> Result<TransportResponse, TransportError>
where
    F: Future<Output = Result<TransportResponse, TransportError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(TransportError::Timeout)),
        None => call.await,
    }
}

/// Submits `request` with default options and no cancellation.
pub async fn submit<T>(request: BatchModifyAclEntriesRequest, transport: &T) -> SubmissionResult<()>
where
    T: Transport + ?Sized,
{
    Submitter::default()
        .submit(request, transport, &CancellationToken::new())
        .await
}
