//! Operation and expectation files.
//!
//! Both are JSON. An operations file is either a bare array of descriptors
//! or the wire form `{"entries": [...]}`; descriptors use the `op` tag
//! (`operation` is accepted too).

use std::fs;
use std::path::Path;

use acl_batch::{BatchAclEntry, ExpectedEntry};
use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum OperationsFile {
    Bare(Vec<BatchAclEntry>),
    Wrapped { entries: Vec<BatchAclEntry> },
}

pub fn parse_operations(content: &str) -> anyhow::Result<Vec<BatchAclEntry>> {
    let file: OperationsFile = serde_json::from_str(content)
        .context("expected a JSON array of operations or an object with an 'entries' array")?;
    Ok(match file {
        OperationsFile::Bare(entries) | OperationsFile::Wrapped { entries } => entries,
    })
}

pub fn read_operations(path: &Path) -> anyhow::Result<Vec<BatchAclEntry>> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_operations(&content).with_context(|| format!("invalid operations file {}", path.display()))
}

pub fn read_expected(path: &Path) -> anyhow::Result<Vec<ExpectedEntry>> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid expectation file {}", path.display()))
}
