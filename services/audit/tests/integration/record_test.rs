use conveyor_audit::consumer::AuditEventHandler;
use conveyor_audit::domain::types::Recorded;
use conveyor_audit::usecase::audit::ListAuditEventsUseCase;
use conveyor_audit::usecase::record_event::RecordEventUseCase;
use conveyor_broker::dispatcher::{Handler, HandlerError};
use conveyor_domain::event::{RESOURCE_CREATED, RESOURCE_UPDATED, TASK_COMPLETED};
use conveyor_domain::id::EventId;

use crate::helpers::{MockAuditRepo, delivery, message, resource_changed, task_completed};

#[tokio::test]
async fn should_record_redelivered_event_once() {
    let repo = MockAuditRepo::new();
    let handler = AuditEventHandler::new(repo.clone());
    let msg = message(
        EventId::new(),
        RESOURCE_CREATED,
        "r-1",
        resource_changed("r-1", "X"),
    );

    handler.handle(delivery(&msg, "0")).await.unwrap();
    handler.handle(delivery(&msg, "0")).await.unwrap();

    let records = repo.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_id, "r-1");
    assert_eq!(records[0].action, "created");
}

#[tokio::test]
async fn should_report_duplicate_on_second_record() {
    let repo = MockAuditRepo::new();
    let uc = RecordEventUseCase { repo: repo.clone() };
    let id = EventId::new();
    let payload = task_completed("t-1", "r-1", "process_new_resource");

    assert_eq!(
        uc.execute(id, TASK_COMPLETED, &payload).await.unwrap(),
        Recorded::Recorded
    );
    assert_eq!(
        uc.execute(id, TASK_COMPLETED, &payload).await.unwrap(),
        Recorded::Duplicate
    );
    let records = repo.records();
    assert_eq!(records[0].task_id.as_deref(), Some("t-1"));
    assert_eq!(records[0].action, "process_new_resource");
}

#[tokio::test]
async fn should_classify_unregistered_event_as_permanent() {
    let handler = AuditEventHandler::new(MockAuditRepo::new());
    let msg = message(EventId::new(), "order.placed", "o-1", b"{}".to_vec());

    let err = handler.handle(delivery(&msg, "0")).await.unwrap_err();
    assert!(matches!(err, HandlerError::Permanent(_)));
}

#[tokio::test]
async fn should_classify_missing_event_id_as_permanent() {
    let handler = AuditEventHandler::new(MockAuditRepo::new());
    let mut msg = message(
        EventId::new(),
        RESOURCE_CREATED,
        "r-1",
        resource_changed("r-1", "X"),
    );
    msg.headers = conveyor_broker::Headers::new();

    let err = handler.handle(delivery(&msg, "0")).await.unwrap_err();
    assert!(matches!(err, HandlerError::Permanent(_)));
}

#[tokio::test]
async fn should_classify_store_failure_as_transient() {
    let repo = MockAuditRepo::new();
    repo.fail_next_records(1);
    let handler = AuditEventHandler::new(repo.clone());
    let msg = message(
        EventId::new(),
        RESOURCE_UPDATED,
        "r-1",
        resource_changed("r-1", "X"),
    );

    let err = handler.handle(delivery(&msg, "0")).await.unwrap_err();
    assert!(matches!(err, HandlerError::Transient(_)));
    assert!(repo.records().is_empty());

    handler.handle(delivery(&msg, "0")).await.unwrap();
    assert_eq!(repo.records().len(), 1);
}

#[tokio::test]
async fn should_list_newest_first() {
    let repo = MockAuditRepo::new();
    let uc = RecordEventUseCase { repo: repo.clone() };
    for id in ["r-1", "r-2", "r-3"] {
        uc.execute(EventId::new(), RESOURCE_CREATED, &resource_changed(id, "X"))
            .await
            .unwrap();
    }

    let list = ListAuditEventsUseCase { repo };
    let resources: Vec<String> = list
        .execute(Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.resource_id)
        .collect();
    assert_eq!(resources, vec!["r-3".to_owned(), "r-2".to_owned()]);
    assert_eq!(list.execute(None).await.unwrap().len(), 3);
}
