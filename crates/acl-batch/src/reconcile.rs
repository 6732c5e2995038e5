//! Deterministic views of remote ACL state.
//!
//! The listing endpoint makes no ordering guarantee, so any comparison of
//! "what the ACL looks like now" against an expectation goes through
//! [`normalize`] on both sides first.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use acl_types::{AclEntry, Field};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transport::Lister;

/// Total order used by [`normalize`]: `ip` bytes, then `id`, then the
/// remaining fields so that distinct entries never compare equal.
fn entry_order(a: &AclEntry, b: &AclEntry) -> Ordering {
    a.ip
        .as_bytes()
        .cmp(b.ip.as_bytes())
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.subnet.cmp(&b.subnet))
        .then_with(|| a.negated.cmp(&b.negated))
        .then_with(|| a.comment.cmp(&b.comment))
        .then_with(|| a.service_id.cmp(&b.service_id))
        .then_with(|| a.acl_id.cmp(&b.acl_id))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.updated_at.cmp(&b.updated_at))
        .then_with(|| a.deleted_at.cmp(&b.deleted_at))
}

/// Sorts entries by `ip` (byte-lexicographic), ties broken by `id`.
///
/// Pure, total and idempotent; every permutation of the input yields the
/// same output.
pub fn normalize<I>(entries: I) -> Vec<AclEntry>
where
    I: IntoIterator<Item = AclEntry>,
{
    let mut entries: Vec<AclEntry> = entries.into_iter().collect();
    entries.sort_by(entry_order);
    entries
}

/// Lists the ACL through `lister` and normalizes the result.
pub async fn fetch_normalized<L>(
    lister: &L,
    service_id: &str,
    acl_id: &str,
) -> Result<Vec<AclEntry>, TransportError>
where
    L: Lister + ?Sized,
{
    lister.list(service_id, acl_id).await.map(normalize)
}

/// An entry the caller expects to find.
///
/// Without `id` the expectation matches on content alone, which is how
/// freshly created entries (whose ids are assigned remotely) are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ip: String,
    #[serde(default)]
    pub subnet: Option<u8>,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ExpectedEntry {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            id: None,
            ip: ip.into(),
            subnet: None,
            negated: false,
            comment: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
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

    /// Fields of `actual` that differ from this expectation.
    ///
    /// The remote store lists an unset comment as `""`, so an absent and an
    /// empty comment compare equal.
    pub fn mismatches(&self, actual: &AclEntry) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.id.as_ref().is_some_and(|id| *id != actual.id) {
            fields.push(Field::Id);
        }
        if self.ip != actual.ip {
            fields.push(Field::Ip);
        }
        if self.subnet != actual.subnet {
            fields.push(Field::Subnet);
        }
        if self.negated != actual.negated {
            fields.push(Field::Negated);
        }
        if comment_text(&self.comment) != comment_text(&actual.comment) {
            fields.push(Field::Comment);
        }
        fields
    }

    /// Returns true if `actual` satisfies this expectation.
    pub fn matches(&self, actual: &AclEntry) -> bool {
        self.mismatches(actual).is_empty()
    }

    /// Expectations naming an id sort first so they claim their entries
    /// before content-only expectations do.
    fn order(a: &ExpectedEntry, b: &ExpectedEntry) -> Ordering {
        a.id
            .is_none()
            .cmp(&b.id.is_none())
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.subnet.cmp(&b.subnet))
            .then_with(|| a.negated.cmp(&b.negated))
            .then_with(|| comment_text(&a.comment).cmp(comment_text(&b.comment)))
    }
}

fn comment_text(comment: &Option<String>) -> &str {
    comment.as_deref().unwrap_or("")
}

impl fmt::Display for ExpectedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}", self.ip)?;
        if let Some(subnet) = self.subnet {
            write!(f, "/{}", subnet)?;
        }
        if let Some(id) = &self.id {
            write!(f, " [{}]", id)?;
        }
        Ok(())
    }
}

impl From<&AclEntry> for ExpectedEntry {
    fn from(entry: &AclEntry) -> Self {
        Self {
            id: Some(entry.id.clone()),
            ip: entry.ip.clone(),
            subnet: entry.subnet,
            negated: entry.negated,
            comment: entry.comment.clone(),
        }
    }
}

/// One difference between listed and expected state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// An expected entry has no counterpart in the listing.
    Missing(ExpectedEntry),
    /// A listed entry was not expected.
    Unexpected(AclEntry),
    /// A listed entry paired with an expectation differs in some fields.
    Mismatch {
        expected: ExpectedEntry,
        actual: AclEntry,
        fields: Vec<Field>,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::Missing(expected) => write!(f, "missing entry {}", expected),
            Discrepancy::Unexpected(actual) => write!(f, "unexpected entry {}", actual),
            Discrepancy::Mismatch { actual, fields, .. } => {
                let names: Vec<&str> = fields.iter().map(Field::name).collect();
                write!(f, "entry {} differs in {}", actual, names.join(", "))
            }
        }
    }
}

/// Compares a listing against expectations.
///
/// Entries and expectations are grouped by `ip` (byte order). Within a
/// group, each expectation first claims an entry it matches exactly
/// (expectations with an `id` go first), then expectations with an `id`
/// claim the entry carrying that id and report its differing fields. What is
/// left is paired in normalized order and reported as a mismatch, with the
/// surplus reported as missing or unexpected. An empty result means the
/// listing matches.
pub fn diff<I, E>(actual: I, expected: E) -> Vec<Discrepancy>
where
    I: IntoIterator<Item = AclEntry>,
    E: IntoIterator<Item = ExpectedEntry>,
{
    let mut groups: BTreeMap<String, (Vec<AclEntry>, Vec<ExpectedEntry>)> = BTreeMap::new();
    for entry in normalize(actual) {
        groups.entry(entry.ip.clone()).or_default().0.push(entry);
    }
    for entry in expected {
        groups.entry(entry.ip.clone()).or_default().1.push(entry);
    }

    let mut discrepancies = Vec::new();
    for (_, (actual, mut expected)) in groups {
        expected.sort_by(ExpectedEntry::order);
        diff_group(actual, expected, &mut discrepancies);
    }
    discrepancies
}

/// Takes the first remaining entry satisfying `pred`.
fn take_first(
    slots: &mut [Option<AclEntry>],
    pred: impl Fn(&AclEntry) -> bool,
) -> Option<AclEntry> {
    slots
        .iter_mut()
        .find(|slot| slot.as_ref().is_some_and(&pred))
        .and_then(Option::take)
}

/// Reconciles entries and expectations that share one `ip`.
fn diff_group(
    actual: Vec<AclEntry>,
    expected: Vec<ExpectedEntry>,
    discrepancies: &mut Vec<Discrepancy>,
) {
    let mut actual: Vec<Option<AclEntry>> = actual.into_iter().map(Some).collect();

    let mut unmatched = Vec::new();
    for e in expected {
        if take_first(&mut actual, |a| e.matches(a)).is_none() {
            unmatched.push(e);
        }
    }

    let mut leftover = Vec::new();
    for e in unmatched {
        let by_id = match &e.id {
            Some(id) => take_first(&mut actual, |a| a.id == *id),
            None => None,
        };
        match by_id {
            Some(a) => discrepancies.push(Discrepancy::Mismatch {
                fields: e.mismatches(&a),
                expected: e,
                actual: a,
            }),
            None => leftover.push(e),
        }
    }

    let mut remaining = actual.into_iter().flatten();
    for e in leftover {
        match remaining.next() {
            Some(a) => discrepancies.push(Discrepancy::Mismatch {
                fields: e.mismatches(&a),
                expected: e,
                actual: a,
            }),
            None => discrepancies.push(Discrepancy::Missing(e)),
        }
    }
    discrepancies.extend(remaining.map(Discrepancy::Unexpected));
}
