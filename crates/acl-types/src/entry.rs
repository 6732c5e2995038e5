//! ACL entry as listed by the remote store.

use crate::compat::{deserialize_loose_bool, deserialize_option_loose_prefix_len};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single rule within an ACL.
///
/// Entries are owned by the remote store; this engine only reads them.
/// `id` is the only stable identity: several entries may share the same
/// `(ip, subnet, negated)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    /// Opaque identifier assigned by the remote store.
    pub id: String,

    /// Owning ACL.
    #[serde(default)]
    pub acl_id: String,

    /// Owning service.
    #[serde(default)]
    pub service_id: String,

    /// IPv4 or IPv6 address literal.
    pub ip: String,

    /// Prefix length; `None` means host-exact match.
    #[serde(default, deserialize_with = "deserialize_option_loose_prefix_len")]
    pub subnet: Option<u8>,

    /// Whether the rule's match sense is inverted.
    #[serde(default, deserialize_with = "deserialize_loose_bool")]
    pub negated: bool,

    /// Free-text annotation.
    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AclEntry {
    /// Creates an entry with the given identity and address; all other
    /// fields take their defaults.
    pub fn new(id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            acl_id: String::new(),
            service_id: String::new(),
            ip: ip.into(),
            subnet: None,
            negated: false,
            comment: None,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Sets the owning service and ACL.
    pub fn with_owner(mut self, service_id: impl Into<String>, acl_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self.acl_id = acl_id.into();
        self
    }

    pub fn with_subnet(mut self, subnet: u8) -> Self {
        self.subnet = Some(subnet);
        self
    }

    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}", self.ip)?;
        if let Some(subnet) = self.subnet {
            write!(f, "/{}", subnet)?;
        }
        write!(f, " [{}]", self.id)
    }
}
