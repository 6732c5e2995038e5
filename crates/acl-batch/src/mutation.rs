//! Validated mutations.
//!
//! [`AclMutation`] is the closed form of a [`BatchAclEntry`]: each variant
//! carries only the fields its operation accepts, so a request built from
//! mutations cannot contain an ill-formed entry. The only way to obtain one
//! is through validation.

use acl_types::compat::serialize_option_compat_bool;
use acl_types::{BatchAclEntry, BatchOperation, Field};
use serde::Serialize;

use crate::error::ValidationError;
use crate::validate::validate;

/// Fields of a new entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CreateEntry {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<u8>,
    #[serde(
        serialize_with = "serialize_option_compat_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub negated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Partial update of an existing entry. `None` leaves the remote value as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UpdateEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<u8>,
    #[serde(
        serialize_with = "serialize_option_compat_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub negated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Removal of an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeleteEntry {
    pub id: String,
}

/// A validated operation on one ACL entry.
///
/// Serializes to the wire element `{"op": "<tag>", ...present fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum AclMutation {
    Create(CreateEntry),
    Update(UpdateEntry),
    Delete(DeleteEntry),
}

impl AclMutation {
    pub fn operation(&self) -> BatchOperation {
        match self {
            AclMutation::Create(_) => BatchOperation::Create,
            AclMutation::Update(_) => BatchOperation::Update,
            AclMutation::Delete(_) => BatchOperation::Delete,
        }
    }

    /// Creates are not idempotent; updates and deletes by id are.
    pub fn is_idempotent(&self) -> bool {
        self.operation().is_idempotent()
    }

    /// The existing entry this mutation addresses, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            AclMutation::Create(_) => None,
            AclMutation::Update(entry) => Some(&entry.id),
            AclMutation::Delete(entry) => Some(&entry.id),
        }
    }
}

impl TryFrom<BatchAclEntry> for AclMutation {
    type Error = ValidationError;

    fn try_from(op: BatchAclEntry) -> Result<Self, Self::Error> {
        validate(&op)?;

        // Validation guarantees the required fields below are present.
        let mutation = match op.operation {
            BatchOperation::Create => AclMutation::Create(CreateEntry {
                ip: op.ip.ok_or(ValidationError::MissingRequiredField(Field::Ip))?,
                subnet: op.subnet,
                negated: op.negated,
                comment: op.comment,
            }),
            BatchOperation::Update => AclMutation::Update(UpdateEntry {
                id: op.id.ok_or(ValidationError::MissingRequiredField(Field::Id))?,
                ip: op.ip,
                subnet: op.subnet,
                negated: op.negated,
                comment: op.comment,
            }),
            BatchOperation::Delete => AclMutation::Delete(DeleteEntry {
                id: op.id.ok_or(ValidationError::MissingRequiredField(Field::Id))?,
            }),
        };
        Ok(mutation)
    }
}

impl From<AclMutation> for BatchAclEntry {
    fn from(mutation: AclMutation) -> Self {
        match mutation {
            AclMutation::Create(entry) => BatchAclEntry {
                operation: BatchOperation::Create,
                id: None,
                ip: Some(entry.ip),
                subnet: entry.subnet,
                negated: entry.negated,
                comment: entry.comment,
            },
            AclMutation::Update(entry) => BatchAclEntry {
                operation: BatchOperation::Update,
                id: Some(entry.id),
                ip: entry.ip,
                subnet: entry.subnet,
                negated: entry.negated,
                comment: entry.comment,
            },
            AclMutation::Delete(entry) => BatchAclEntry::delete(entry.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_try_from_create() {
        let op = BatchAclEntry::create("192.168.0.1")
            .with_subnet(24)
            .with_negated(true)
            .with_comment("ACL Entry 2");
        let mutation = AclMutation::try_from(op).unwrap();
        assert_eq!(
            mutation,
            AclMutation::Create(CreateEntry {
                ip: "192.168.0.1".to_string(),
                subnet: Some(24),
                negated: Some(true),
                comment: Some("ACL Entry 2".to_string()),
            })
        );
        assert!(!mutation.is_idempotent());
        assert_eq!(mutation.target_id(), None);
    }

    #[test]
    fn test_try_from_rejects_invalid() {
        let err = AclMutation::try_from(BatchAclEntry::delete("abc").with_ip("10.0.0.1"));
        assert_eq!(err, Err(ValidationError::ForbiddenField(Field::Ip)));
    }

    #[test]
    fn test_target_id() {
        let update = AclMutation::try_from(BatchAclEntry::update("abc").with_comment("c")).unwrap();
        assert_eq!(update.target_id(), Some("abc"));
        assert!(update.is_idempotent());

        let delete = AclMutation::try_from(BatchAclEntry::delete("def")).unwrap();
        assert_eq!(delete.target_id(), Some("def"));
        assert_eq!(delete.operation(), BatchOperation::Delete);
    }

    #[test]
    fn test_wire_shape_omits_absent_fields() {
        let create = AclMutation::try_from(
            BatchAclEntry::create("127.0.0.1")
                .with_subnet(24)
                .with_negated(false)
                .with_comment("ACL Entry 1"),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            serde_json::json!({
                "op": "create",
                "ip": "127.0.0.1",
                "subnet": 24,
                "negated": "0",
                "comment": "ACL Entry 1"
            })
        );

        let update = AclMutation::try_from(BatchAclEntry::update("abc").with_negated(false)).unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"op": "update", "id": "abc", "negated": "0"})
        );

        let delete = AclMutation::try_from(BatchAclEntry::delete("def")).unwrap();
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            serde_json::json!({"op": "delete", "id": "def"})
        );
    }

    #[test]
    fn test_back_to_descriptor() {
        let op = BatchAclEntry::update("abc").with_subnet(16).with_comment("");
        let mutation = AclMutation::try_from(op.clone()).unwrap();
        assert_eq!(BatchAclEntry::from(mutation), op);
    }
}
