//! End-to-end batch scenarios against an in-memory ACL service.

mod common;

use std::time::Duration;

use acl_batch::{
    build, diff, fetch_normalized, submit, AclEntry, BatchAclEntry, CancellationToken,
    ExpectedEntry, RetryPolicy, SubmissionError, SubmitOptions, Submitter, TransportError,
    TransportLister,
};
use common::{FakeAclService, ACL_ID, SERVICE_ID};
use pretty_assertions::assert_eq;

async fn listed(service: &FakeAclService) -> Vec<AclEntry> {
    fetch_normalized(&TransportLister::new(service), SERVICE_ID, ACL_ID)
        .await
        .expect("listing failed")
}

/// Creates the two fixture entries and returns them, normalized.
async fn create_fixture_entries(service: &FakeAclService) -> Vec<AclEntry> {
    let request = build(
        SERVICE_ID,
        ACL_ID,
        vec![
            BatchAclEntry::create("127.0.0.1")
                .with_subnet(24)
                .with_negated(false)
                .with_comment("ACL Entry 1"),
            BatchAclEntry::create("192.168.0.1")
                .with_subnet(24)
                .with_negated(true)
                .with_comment("ACL Entry 2"),
        ],
    )
    .expect("build failed");

    submit(request, service).await.expect("submit failed");
    listed(service).await
}

#[tokio::test]
async fn test_batch_create() {
    let service = FakeAclService::new();
    let entries = create_fixture_entries(&service).await;

    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].ip, "127.0.0.1");
    assert_eq!(entries[0].subnet, Some(24));
    assert!(!entries[0].negated);
    assert_eq!(entries[0].comment.as_deref(), Some("ACL Entry 1"));
    assert_eq!(entries[0].service_id, SERVICE_ID);
    assert_eq!(entries[0].acl_id, ACL_ID);

    assert_eq!(entries[1].ip, "192.168.0.1");
    assert_eq!(entries[1].subnet, Some(24));
    assert!(entries[1].negated);
    assert_eq!(entries[1].comment.as_deref(), Some("ACL Entry 2"));

    assert_ne!(entries[0].id, entries[1].id);
    assert_eq!(service.patches(), 1);
}

#[tokio::test]
async fn test_batch_update() {
    let service = FakeAclService::new();
    let before = create_fixture_entries(&service).await;
    let target = before[0].id.clone();

    let request = build(
        SERVICE_ID,
        ACL_ID,
        vec![BatchAclEntry::update(&target)
            .with_ip("127.0.0.2")
            .with_subnet(16)
            .with_negated(true)
            .with_comment("Updated ACL Entry 1")],
    )
    .unwrap();
    submit(request, &service).await.unwrap();

    let after = listed(&service).await;
    assert_eq!(after.len(), 2);

    let updated = after.iter().find(|e| e.id == target).unwrap();
    assert_eq!(updated.ip, "127.0.0.2");
    assert_eq!(updated.subnet, Some(16));
    assert!(updated.negated);
    assert_eq!(updated.comment.as_deref(), Some("Updated ACL Entry 1"));

    let sibling = after.iter().find(|e| e.id != target).unwrap();
    assert_eq!(sibling, &before[1]);
}

#[tokio::test]
async fn test_batch_partial_update_keeps_other_fields() {
    let service = FakeAclService::new();
    let before = create_fixture_entries(&service).await;
    let target = before[1].id.clone();

    let request = build(
        SERVICE_ID,
        ACL_ID,
        vec![BatchAclEntry::update(&target).with_negated(false)],
    )
    .unwrap();
    submit(request, &service).await.unwrap();

    let after = listed(&service).await;
    let updated = after.iter().find(|e| e.id == target).unwrap();
    assert!(!updated.negated);
    assert_eq!(updated.ip, "192.168.0.1");
    assert_eq!(updated.subnet, Some(24));
    assert_eq!(updated.comment.as_deref(), Some("ACL Entry 2"));
}

#[tokio::test]
async fn test_batch_delete() {
    let service = FakeAclService::new();
    let before = create_fixture_entries(&service).await;

    let request = build(
        SERVICE_ID,
        ACL_ID,
        vec![BatchAclEntry::delete(&before[0].id)],
    )
    .unwrap();
    submit(request, &service).await.unwrap();

    let after = listed(&service).await;
    assert_eq!(after, vec![before[1].clone()]);
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let service = FakeAclService::new();
    let before = create_fixture_entries(&service).await;

    let request = build(
        SERVICE_ID,
        ACL_ID,
        vec![
            BatchAclEntry::create("10.0.0.1").with_subnet(8),
            BatchAclEntry::delete("doesNotExist000000000"),
        ],
    )
    .unwrap();
    let err = submit(request, &service).await.unwrap_err();

    match err {
        SubmissionError::RemoteRejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Record not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(listed(&service).await, before);
    assert_eq!(service.patches(), 1);
}

#[tokio::test]
async fn test_listing_spans_pages() {
    let service = FakeAclService::new();
    let ops: Vec<_> = (0..25)
        .map(|i| BatchAclEntry::create(format!("10.0.{}.0", i)).with_subnet(24))
        .collect();
    submit(build(SERVICE_ID, ACL_ID, ops).unwrap(), &service)
        .await
        .unwrap();

    let lister = TransportLister::new(&service).with_per_page(10);
    let entries = fetch_normalized(&lister, SERVICE_ID, ACL_ID).await.unwrap();
    assert_eq!(entries.len(), 25);
    assert_eq!(entries, listed(&service).await);
}

#[tokio::test]
async fn test_verify_against_expectation() {
    let service = FakeAclService::new();
    create_fixture_entries(&service).await;

    let expected = vec![
        ExpectedEntry::new("192.168.0.1")
            .with_subnet(24)
            .with_negated(true)
            .with_comment("ACL Entry 2"),
        ExpectedEntry::new("127.0.0.1")
            .with_subnet(24)
            .with_comment("ACL Entry 1"),
    ];
    assert!(diff(listed(&service).await, expected).is_empty());

    let stale = vec![ExpectedEntry::new("127.0.0.1").with_subnet(16)];
    assert_eq!(diff(listed(&service).await, stale).len(), 2);
}

#[tokio::test]
async fn test_idempotent_batch_survives_transient_failures() {
    let service = FakeAclService::new();
    let before = create_fixture_entries(&service).await;
    service.fail_next(vec![
        TransportError::Connect("connection refused".into()),
        TransportError::Timeout,
    ]);

    let submitter = Submitter::new(SubmitOptions {
        retry: RetryPolicy::default()
            .with_max_attempts(3)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(1)),
        timeout: None,
    });
    let request = build(SERVICE_ID, ACL_ID, vec![BatchAclEntry::delete(&before[0].id)]).unwrap();
    submitter
        .submit(request, &service, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(listed(&service).await, vec![before[1].clone()]);
}

#[tokio::test]
async fn test_create_batch_surfaces_transient_failure() {
    let service = FakeAclService::new();
    service.fail_next(vec![TransportError::Io("connection reset".into())]);

    let request = build(SERVICE_ID, ACL_ID, vec![BatchAclEntry::create("10.0.0.1")]).unwrap();
    let err = submit(request, &service).await.unwrap_err();

    assert!(matches!(
        err,
        SubmissionError::TransportFailure(TransportError::Io(_))
    ));
    assert!(listed(&service).await.is_empty());
}
