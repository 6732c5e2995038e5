//! Batch assembly.
//!
//! [`BatchBuilder`] turns a caller-ordered sequence of descriptors into a
//! [`BatchModifyAclEntriesRequest`]. Every operation is validated in order
//! and the batch is size-checked; nothing is deduplicated or reordered.

use std::collections::HashSet;

use acl_types::BatchAclEntry;
use serde::Serialize;
use tracing::debug;

use crate::error::BuildError;
use crate::mutation::AclMutation;

/// Largest batch the remote store accepts in one call.
pub const MAX_BATCH_SIZE: usize = 1000;

/// A validated, size-bounded batch for one ACL.
///
/// Built fresh for each submission and consumed by the executor. The
/// operations keep the caller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchModifyAclEntriesRequest {
    service_id: String,
    acl_id: String,
    operations: Vec<AclMutation>,
}

/// Wire body of a batch request.
#[derive(Serialize)]
struct WireBatch<'a> {
    entries: &'a [AclMutation],
}

impl BatchModifyAclEntriesRequest {
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn acl_id(&self) -> &str {
        &self.acl_id
    }

    pub fn operations(&self) -> &[AclMutation] {
        &self.operations
    }

    /// Number of operations. Never zero.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns true if the batch contains no create, which makes it safe
    /// to resend after an ambiguous transport failure.
    pub fn is_idempotent(&self) -> bool {
        self.operations.iter().all(AclMutation::is_idempotent)
    }

    /// Number of create operations in the batch.
    pub fn create_count(&self) -> usize {
        self.operations.iter().filter(|op| !op.is_idempotent()).count()
    }

    /// Remote path of the ACL's entry collection.
    pub fn path(&self) -> String {
        entries_path(&self.service_id, &self.acl_id)
    }

    /// Encodes the request body: `{"entries": [...]}`.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&WireBatch {
            entries: &self.operations,
        })
    }
}

/// Remote path of an ACL's entry collection.
pub fn entries_path(service_id: &str, acl_id: &str) -> String {
    format!("/service/{}/acl/{}/entries", service_id, acl_id)
}

/// Checked construction of batch requests.
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    max_batch_size: usize,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowers the batch size limit. Values above [`MAX_BATCH_SIZE`] are
    /// clamped to it, and zero is raised to one.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Validates `operations` and packages them for `service_id`/`acl_id`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingServiceId`] / [`BuildError::MissingAclId`] for
    ///   empty identifiers
    /// - [`BuildError::EmptyBatch`] for zero operations
    /// - [`BuildError::BatchTooLarge`] above the size limit
    /// - [`BuildError::InvalidOperation`] for the first operation that fails
    ///   validation, with its index in the input
    /// - [`BuildError::DuplicateTarget`] when two operations address the
    ///   same entry id
    pub fn build<I>(
        &self,
        service_id: impl Into<String>,
        acl_id: impl Into<String>,
        operations: I,
    ) -> Result<BatchModifyAclEntriesRequest, BuildError>
    where
        I: IntoIterator<Item = BatchAclEntry>,
    {
        let service_id = service_id.into();
        let acl_id = acl_id.into();
        if service_id.is_empty() {
            return Err(BuildError::MissingServiceId);
        }
        if acl_id.is_empty() {
            return Err(BuildError::MissingAclId);
        }

        let operations: Vec<BatchAclEntry> = operations.into_iter().collect();
        if operations.is_empty() {
            return Err(BuildError::EmptyBatch);
        }
        if operations.len() > self.max_batch_size {
            return Err(BuildError::BatchTooLarge {
                actual: operations.len(),
                max: self.max_batch_size,
            });
        }

        let mut targets = HashSet::new();
        let mut mutations = Vec::with_capacity(operations.len());
        for (index, op) in operations.into_iter().enumerate() {
            let mutation = AclMutation::try_from(op)
                .map_err(|source| BuildError::invalid_operation(index, source))?;
            if let Some(id) = mutation.target_id() {
                if !targets.insert(id.to_string()) {
                    return Err(BuildError::DuplicateTarget(id.to_string()));
                }
            }
            mutations.push(mutation);
        }

        debug!(
            service_id = %service_id,
            acl_id = %acl_id,
            operations = mutations.len(),
            "acl-batch: Built batch"
        );

        Ok(BatchModifyAclEntriesRequest {
            service_id,
            acl_id,
            operations: mutations,
        })
    }
}

/// Builds a batch with the default size limit.
///
/// The caller's sequence is consumed; pass `ops.iter().cloned()` to keep it.
pub fn build<I>(
    service_id: impl Into<String>,
    acl_id: impl Into<String>,
    operations: I,
) -> Result<BatchModifyAclEntriesRequest, BuildError>
where
    I: IntoIterator<Item = BatchAclEntry>,
{
    BatchBuilder::default().build(service_id, acl_id, operations)
}
