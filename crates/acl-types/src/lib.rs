//! Value types for ACL entries and batched entry mutations.
//!
//! This crate provides the data model shared by the batch engine and its
//! callers:
//!
//! - [`AclEntry`]: An entry as listed by the remote ACL store
//! - [`BatchAclEntry`]: A presence-aware mutation descriptor for one entry
//! - [`BatchOperation`]: The create / update / delete tag
//! - [`Field`]: Names of the mutable entry fields
//! - [`IpFamily`]: Address family inference and prefix-length bounds
//!
//! Every optional field is an `Option<T>`, so an explicit `negated: false`
//! is never confused with leaving `negated` unset.

mod batch;
pub mod compat;
mod entry;
mod ip;

pub use batch::{fields_present, BatchAclEntry, BatchOperation, Field, FieldSet};
pub use entry::AclEntry;
pub use ip::IpFamily;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid batch operation: {0}")]
    InvalidOperation(String),

    #[error("invalid field name: {0}")]
    InvalidField(String),
}
