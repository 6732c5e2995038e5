//! In-memory ACL service used by the integration tests.
//!
//! Speaks the same paths and bodies as the remote store: `PATCH` applies a
//! batch atomically, `GET` pages through the entries in an order unrelated
//! to insertion.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use acl_batch::{
    entries_path, AclEntry, BatchAclEntry, BatchOperation, Method, Transport, TransportError,
    TransportResponse,
};
use async_trait::async_trait;
use serde::Deserialize;

pub const SERVICE_ID: &str = "SU1Z0isxPaozGVKXdv0eY";
pub const ACL_ID: &str = "2cFflPOskFLhmnZJEfUake";

#[derive(Deserialize)]
struct BatchBody {
    entries: Vec<BatchAclEntry>,
}

#[derive(Default)]
struct State {
    entries: Vec<AclEntry>,
    next_id: usize,
}

/// A single ACL held in memory.
pub struct FakeAclService {
    service_id: String,
    acl_id: String,
    state: Mutex<State>,
    patches: AtomicUsize,
    failures: Mutex<Vec<TransportError>>,
}

impl FakeAclService {
    pub fn new() -> Self {
        Self {
            service_id: SERVICE_ID.to_string(),
            acl_id: ACL_ID.to_string(),
            state: Mutex::new(State::default()),
            patches: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next calls fail with `errors`, in order, before reaching
    /// the store.
    pub fn fail_next(&self, errors: Vec<TransportError>) {
        let mut failures = self.failures.lock().unwrap();
        failures.extend(errors.into_iter().rev());
    }

    /// Number of batches applied.
    pub fn patches(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<AclEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    fn apply(&self, body: &[u8]) -> TransportResponse {
        let batch: BatchBody = match serde_json::from_slice(body) {
            Ok(batch) => batch,
            Err(e) => return error_response(400, "Bad request", &e.to_string()),
        };

        let mut state = self.state.lock().unwrap();
        let mut entries = state.entries.clone();
        let mut next_id = state.next_id;

        for op in batch.entries {
            match op.operation {
                BatchOperation::Create => {
                    next_id += 1;
                    let mut entry = AclEntry::new(format!("entry{:06}", next_id), op.ip.unwrap_or_default())
                        .with_owner(&self.service_id, &self.acl_id);
                    entry.subnet = op.subnet;
                    entry.negated = op.negated.unwrap_or(false);
                    entry.comment = op.comment;
                    entries.push(entry);
                }
                BatchOperation::Update => {
                    let id = op.id.unwrap_or_default();
                    let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
                        return error_response(400, "Bad request", "Record not found");
                    };
                    if let Some(ip) = op.ip {
                        entry.ip = ip;
                    }
                    if op.subnet.is_some() {
                        entry.subnet = op.subnet;
                    }
                    if let Some(negated) = op.negated {
                        entry.negated = negated;
                    }
                    if op.comment.is_some() {
                        entry.comment = op.comment;
                    }
                }
                BatchOperation::Delete => {
                    let id = op.id.unwrap_or_default();
                    let before = entries.len();
                    entries.retain(|e| e.id != id);
                    if entries.len() == before {
                        return error_response(400, "Bad request", "Record not found");
                    }
                }
            }
        }

        state.entries = entries;
        state.next_id = next_id;
        self.patches.fetch_add(1, Ordering::SeqCst);
        TransportResponse::new(200, r#"{"status":"ok"}"#)
    }

    fn list_page(&self, query: &HashMap<&str, usize>) -> TransportResponse {
        let page = query.get("page").copied().unwrap_or(1).max(1);
        let per_page = query.get("per_page").copied().unwrap_or(100).max(1);

        // Newest first, so callers cannot rely on insertion order.
        let mut entries = self.snapshot();
        entries.reverse();

        let slice: Vec<AclEntry> = entries
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        TransportResponse::new(200, serde_json::to_vec(&slice).unwrap())
    }
}

impl Default for FakeAclService {
    fn default() -> Self {
        Self::new()
    }
}

fn error_response(status: u16, msg: &str, detail: &str) -> TransportResponse {
    TransportResponse::new(
        status,
        serde_json::to_vec(&serde_json::json!({"msg": msg, "detail": detail})).unwrap(),
    )
}

fn parse_query(query: &str) -> HashMap<&str, usize> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(k, v)| v.parse().ok().map(|v| (k, v)))
        .collect()
}

#[async_trait]
impl Transport for FakeAclService {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        if let Some(err) = self.failures.lock().unwrap().pop() {
            return Err(err);
        }

        let (base, query) = path.split_once('?').unwrap_or((path, ""));
        if base != entries_path(&self.service_id, &self.acl_id) {
            return Ok(error_response(404, "Record not found", "Unknown ACL"));
        }

        Ok(match method {
            Method::Patch => self.apply(&body),
            Method::Get => self.list_page(&parse_query(query)),
        })
    }
}
