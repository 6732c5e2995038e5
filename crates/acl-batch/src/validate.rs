//! Per-operation field contract checks.
//!
//! Validation is local and total: every operation is classified as valid or
//! invalid without touching the network, so a malformed entry is reported
//! with its exact cause instead of surfacing as an opaque remote 400.

use acl_types::{BatchAclEntry, BatchOperation, Field, IpFamily};

use crate::error::ValidationError;

/// Checks `op` against the field contract of its operation type.
///
/// # Errors
///
/// - Create: [`MissingRequiredField`](ValidationError::MissingRequiredField)
///   for a missing `ip`, [`ForbiddenField`](ValidationError::ForbiddenField)
///   for a present `id`.
/// - Update: `MissingRequiredField` for a missing `id`,
///   [`EmptyUpdate`](ValidationError::EmptyUpdate) if nothing else is set.
/// - Delete: `MissingRequiredField` for a missing `id`, `ForbiddenField` for
///   the first of `ip`, `subnet`, `negated`, `comment` that is present.
/// - Create and Update: [`InvalidIp`](ValidationError::InvalidIp) for an
///   unparseable `ip`, [`InvalidSubnet`](ValidationError::InvalidSubnet) for
///   a prefix length outside the address family's range.
pub fn validate(op: &BatchAclEntry) -> Result<(), ValidationError> {
    match op.operation {
        BatchOperation::Create => validate_create(op),
        BatchOperation::Update => validate_update(op),
        BatchOperation::Delete => validate_delete(op),
    }
}

fn validate_create(op: &BatchAclEntry) -> Result<(), ValidationError> {
    let ip = op
        .ip
        .as_deref()
        .ok_or(ValidationError::MissingRequiredField(Field::Ip))?;
    if op.id.is_some() {
        return Err(ValidationError::ForbiddenField(Field::Id));
    }

    let family = parse_family(ip)?;
    check_subnet(op.subnet, Some(family))
}

fn validate_update(op: &BatchAclEntry) -> Result<(), ValidationError> {
    require_id(op)?;

    if op.fields_present().iter().all(|field| *field == Field::Id) {
        return Err(ValidationError::EmptyUpdate);
    }

    let family = op.ip.as_deref().map(parse_family).transpose()?;
    check_subnet(op.subnet, family)
}

fn validate_delete(op: &BatchAclEntry) -> Result<(), ValidationError> {
    require_id(op)?;

    match op
        .fields_present()
        .into_iter()
        .find(|field| *field != Field::Id)
    {
        Some(field) => Err(ValidationError::ForbiddenField(field)),
        None => Ok(()),
    }
}

fn require_id(op: &BatchAclEntry) -> Result<&str, ValidationError> {
    match op.id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ValidationError::MissingRequiredField(Field::Id)),
    }
}

fn parse_family(ip: &str) -> Result<IpFamily, ValidationError> {
    IpFamily::of(ip).map_err(|_| ValidationError::InvalidIp(ip.to_string()))
}

/// An update without `ip` leaves the family unknown locally; its subnet is
/// bounded by the widest family and the remote store checks the rest.
fn check_subnet(subnet: Option<u8>, family: Option<IpFamily>) -> Result<(), ValidationError> {
    let Some(subnet) = subnet else {
        return Ok(());
    };
    let family = family.unwrap_or(IpFamily::V6);
    if !family.accepts_prefix_len(subnet) {
        return Err(ValidationError::InvalidSubnet {
            subnet,
            max: family.max_prefix_len(),
        });
    }
    Ok(())
}
