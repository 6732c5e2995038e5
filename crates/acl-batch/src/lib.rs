//! Client-side engine for batched ACL entry mutations.
//!
//! A caller describes the creates, updates and deletes it wants applied to
//! one ACL, and the engine:
//!
//! - [`validate`]s each operation locally against its field contract
//! - [`build`]s a size-bounded [`BatchModifyAclEntriesRequest`]
//! - [`submit`]s it as one atomic remote call through a [`Transport`],
//!   retrying only batches that are safe to resend
//! - reads remote state back through a [`Lister`] and [`normalize`]s it so
//!   it can be compared with an expectation ([`diff`])
//!
//! # Example
//!
//! ```ignore
//! use acl_batch::{build, submit, BatchAclEntry};
//!
//! async fn add_rules(transport: &impl acl_batch::Transport) -> anyhow::Result<()> {
//!     let request = build(
//!         "SU1Z0isxPaozGVKXdv0eY",
//!         "2cFflPOskFLhmnZJEfUake",
//!         vec![
//!             BatchAclEntry::create("127.0.0.1").with_subnet(24).with_comment("ACL Entry 1"),
//!             BatchAclEntry::delete("6yxNzlOpW1V7JfSwvLGtOc"),
//!         ],
//!     )?;
//!     submit(request, transport).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Outcomes
//!
//! | Result | Remote state |
//! |--------|--------------|
//! | `Ok(())` | every operation applied |
//! | `RemoteRejected` | nothing applied |
//! | `TransportFailure` | unknown; re-list before resubmitting creates |

mod builder;
pub mod config;
pub mod error;
mod executor;
mod mutation;
pub mod reconcile;
mod retry;
mod transport;
mod validate;

pub use builder::{build, entries_path, BatchBuilder, BatchModifyAclEntriesRequest, MAX_BATCH_SIZE};
pub use config::{ConfigError, EngineConfig};
pub use error::{BuildError, SubmissionError, SubmissionResult, TransportError, ValidationError};
pub use executor::{submit, SubmitOptions, Submitter};
pub use mutation::{AclMutation, CreateEntry, DeleteEntry, UpdateEntry};
pub use reconcile::{diff, fetch_normalized, normalize, Discrepancy, ExpectedEntry};
pub use retry::RetryPolicy;
pub use transport::{Lister, Method, Transport, TransportLister, TransportResponse, DEFAULT_PER_PAGE};
pub use validate::validate;

pub use acl_types::{AclEntry, BatchAclEntry, BatchOperation, Field, IpFamily};
pub use tokio_util::sync::CancellationToken;
