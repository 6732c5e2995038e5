//! Batch mutation descriptors.
//!
//! A [`BatchAclEntry`] describes one create, update or delete against an ACL
//! entry. It is deliberately flat and presence-aware so that caller input
//! (including operation files) can be checked field by field before anything
//! is sent; the engine turns valid descriptors into a closed sum type.

use crate::compat::deserialize_option_loose_bool;
use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Operation tag of a batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Create,
    Update,
    Delete,
}

impl BatchOperation {
    /// Wire tag (`"create"`, `"update"`, `"delete"`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Create => "create",
            BatchOperation::Update => "update",
            BatchOperation::Delete => "delete",
        }
    }

    /// Returns true if repeating the operation cannot change the outcome
    /// beyond its first application. Only creates are not idempotent.
    pub const fn is_idempotent(&self) -> bool {
        !matches!(self, BatchOperation::Create)
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchOperation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(ParseError::InvalidOperation(s.to_string())),
        }
    }
}

/// Mutable fields of an ACL entry, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Id,
    Ip,
    Subnet,
    Negated,
    Comment,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Id,
        Field::Ip,
        Field::Subnet,
        Field::Negated,
        Field::Comment,
    ];

    /// Wire name of the field.
    pub const fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Ip => "ip",
            Field::Subnet => "subnet",
            Field::Negated => "negated",
            Field::Comment => "comment",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| ParseError::InvalidField(s.to_string()))
    }
}

/// Set of fields present on a batch entry, iterated in wire order.
pub type FieldSet = BTreeSet<Field>;

/// A mutation descriptor for one ACL entry.
///
/// Which fields are required, optional or forbidden depends on
/// `operation`:
///
/// | Operation | id | ip | subnet | negated | comment |
/// |---|---|---|---|---|---|
/// | Create | forbidden | required | optional | optional | optional |
/// | Update | required | optional | optional | optional | optional |
/// | Delete | required | forbidden | forbidden | forbidden | forbidden |
///
/// For updates an absent field leaves the remote value unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchAclEntry {
    #[serde(rename = "op", alias = "operation")]
    pub operation: BatchOperation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<u8>,

    #[serde(
        default,
        deserialize_with = "deserialize_option_loose_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub negated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl BatchAclEntry {
    fn empty(operation: BatchOperation) -> Self {
        Self {
            operation,
            id: None,
            ip: None,
            subnet: None,
            negated: None,
            comment: None,
        }
    }

    /// Starts a create for `ip`.
    pub fn create(ip: impl Into<String>) -> Self {
        Self::empty(BatchOperation::Create).with_ip(ip)
    }

    /// Starts an update of the entry `id`; chain setters for the fields to
    /// overwrite.
    pub fn update(id: impl Into<String>) -> Self {
        Self::empty(BatchOperation::Update).with_id(id)
    }

    /// Deletes the entry `id`.
    pub fn delete(id: impl Into<String>) -> Self {
        Self::empty(BatchOperation::Delete).with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_subnet(mut self, subnet: u8) -> Self {
        self.subnet = Some(subnet);
        self
    }

    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = Some(negated);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Fields explicitly set on this entry.
    pub fn fields_present(&self) -> FieldSet {
        fields_present(self)
    }
}

/// Returns the set of fields actually set on `op`.
///
/// An explicitly set `negated: Some(false)` or empty `comment` counts as
/// present.
pub fn fields_present(op: &BatchAclEntry) -> FieldSet {
    let mut set = FieldSet::new();
    if op.id.is_some() {
        set.insert(Field::Id);
    }
    if op.ip.is_some() {
        set.insert(Field::Ip);
    }
    if op.subnet.is_some() {
        set.insert(Field::Subnet);
    }
    if op.negated.is_some() {
        set.insert(Field::Negated);
    }
    if op.comment.is_some() {
        set.insert(Field::Comment);
    }
    set
}
