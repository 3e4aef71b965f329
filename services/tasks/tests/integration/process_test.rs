use conveyor_broker::dispatcher::{Handler, HandlerError};
use conveyor_broker::{Delivery, Headers};
use conveyor_domain::event::{
    RESOURCE_CREATED, RESOURCE_DELETED, RESOURCE_UPDATED, TASK_COMPLETED, TaskCompleted,
};
use conveyor_domain::id::{AggregateId, EventId, TaskId};
use conveyor_domain::task::TaskStatus;
use conveyor_tasks::consumer::TaskEventHandler;
use conveyor_tasks::domain::types::Applied;
use conveyor_tasks::error::TasksServiceError;
use conveyor_tasks::usecase::process_event::ProcessEventUseCase;
use conveyor_tasks::usecase::task::{DEFAULT_PAGE_SIZE, GetTaskUseCase, ListTasksUseCase};

use crate::helpers::{MockTaskRepo, delivery, resource_changed, resource_message};

fn task_for(aggregate: &str, event_type: &str) -> TaskId {
    TaskId::derive(&AggregateId::from(aggregate), event_type)
}

#[tokio::test]
async fn should_complete_task_and_emit_task_completed() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };
    let e1 = EventId::new();

    let processed = uc
        .execute(e1, RESOURCE_CREATED, &resource_changed("agg-1", "X"))
        .await
        .unwrap();

    assert_eq!(processed.applied, Applied::Applied);
    assert_eq!(processed.status, TaskStatus::Completed);
    let task = repo.task(task_for("agg-1", RESOURCE_CREATED)).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.action, "process_new_resource");
    assert_eq!(
        task.result.as_deref(),
        Some("Completed process_new_resource for resource agg-1")
    );
    assert_eq!(task.last_event_id, Some(e1));

    let outbox = repo.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].event_type, TASK_COMPLETED);
    assert_eq!(outbox[0].aggregate_id.as_str(), task.id.to_string());
    let body: TaskCompleted = serde_json::from_slice(&outbox[0].payload).unwrap();
    assert_eq!(body.task_id, task.id.to_string());
    assert_eq!(body.status, "completed");
}

#[tokio::test]
async fn should_write_single_row_when_event_is_redelivered() {
    let repo = MockTaskRepo::new();
    let handler = TaskEventHandler::new(repo.clone());
    let message = resource_message(
        EventId::new(),
        RESOURCE_CREATED,
        "agg-1",
        resource_changed("agg-1", "X"),
    );

    // Same message handed out twice before either delivery was committed.
    handler.handle(delivery(&message, "0")).await.unwrap();
    handler.handle(delivery(&message, "0")).await.unwrap();

    assert_eq!(repo.task_count(), 1);
    let task = repo.task(task_for("agg-1", RESOURCE_CREATED)).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(repo.outbox().len(), 1, "completion emitted once");
}

#[tokio::test]
async fn should_leave_same_state_after_any_number_of_duplicates() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };
    let e1 = EventId::new();
    let payload = resource_changed("agg-1", "X");

    uc.execute(e1, RESOURCE_UPDATED, &payload).await.unwrap();
    let after_first = repo.task(task_for("agg-1", RESOURCE_UPDATED)).unwrap();

    for _ in 0..4 {
        let processed = uc.execute(e1, RESOURCE_UPDATED, &payload).await.unwrap();
        assert_eq!(processed.applied, Applied::Duplicate);
        assert_eq!(processed.status, TaskStatus::Completed);
    }

    assert_eq!(repo.task(after_first.id).unwrap(), after_first);
    assert_eq!(repo.outbox().len(), 1);
}

#[tokio::test]
async fn should_reapply_transition_for_new_event_of_same_task() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };
    let payload = resource_changed("agg-1", "X");
    let (e1, e2) = (EventId::new(), EventId::new());

    uc.execute(e1, RESOURCE_UPDATED, &payload).await.unwrap();
    let processed = uc.execute(e2, RESOURCE_UPDATED, &payload).await.unwrap();

    assert_eq!(processed.applied, Applied::Applied);
    assert_eq!(repo.task_count(), 1);
    assert_eq!(repo.task(processed.task_id).unwrap().last_event_id, Some(e2));
    assert_eq!(repo.outbox().len(), 2);
}

#[tokio::test]
async fn should_not_let_older_event_overwrite_newer_state() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };
    let older = EventId::new();
    let newer = EventId::new();
    assert!(older < newer);

    uc.execute(newer, RESOURCE_UPDATED, &resource_changed("agg-1", "Y"))
        .await
        .unwrap();
    let processed = uc
        .execute(older, RESOURCE_UPDATED, &resource_changed("agg-1", ""))
        .await
        .unwrap();

    assert_eq!(processed.applied, Applied::Superseded);
    let task = repo.task(processed.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.last_event_id, Some(newer));
    assert_eq!(repo.outbox().len(), 1);

    let again = uc
        .execute(older, RESOURCE_UPDATED, &resource_changed("agg-1", ""))
        .await
        .unwrap();
    assert_eq!(again.applied, Applied::Duplicate);
}

#[tokio::test]
async fn should_fail_task_with_empty_resource_name() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };

    let processed = uc
        .execute(EventId::new(), RESOURCE_CREATED, &resource_changed("agg-1", ""))
        .await
        .unwrap();

    assert_eq!(processed.status, TaskStatus::Failed);
    let task = repo.task(processed.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.result.as_deref(), Some("resource name must not be empty"));
    assert!(repo.outbox().is_empty(), "failed tasks emit nothing");
}

#[tokio::test]
async fn should_keep_tasks_separate_per_event_type() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };

    uc.execute(EventId::new(), RESOURCE_CREATED, &resource_changed("agg-1", "X"))
        .await
        .unwrap();
    uc.execute(EventId::new(), RESOURCE_DELETED, br#"{"id":"agg-1"}"#)
        .await
        .unwrap();

    assert_eq!(repo.task_count(), 2);
    let cleanup = repo.task(task_for("agg-1", RESOURCE_DELETED)).unwrap();
    assert_eq!(cleanup.action, "cleanup_resource");
}

#[tokio::test]
async fn should_leave_task_processing_when_apply_fails() {
    let repo = MockTaskRepo::new();
    repo.fail_next_applies(1);
    let uc = ProcessEventUseCase { repo: repo.clone() };
    let e1 = EventId::new();
    let payload = resource_changed("agg-1", "X");

    let err = uc.execute(e1, RESOURCE_CREATED, &payload).await.unwrap_err();
    assert!(matches!(err, TasksServiceError::Internal(_)));
    let task = repo.task(task_for("agg-1", RESOURCE_CREATED)).unwrap();
    assert_eq!(task.status, TaskStatus::Processing);

    let processed = uc.execute(e1, RESOURCE_CREATED, &payload).await.unwrap();
    assert_eq!(processed.applied, Applied::Applied);
    assert_eq!(repo.task(task.id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn should_classify_store_failure_as_transient() {
    let repo = MockTaskRepo::new();
    repo.fail_next_applies(1);
    let handler = TaskEventHandler::new(repo);
    let message = resource_message(
        EventId::new(),
        RESOURCE_CREATED,
        "agg-1",
        resource_changed("agg-1", "X"),
    );

    let err = handler.handle(delivery(&message, "0")).await.unwrap_err();
    assert!(matches!(err, HandlerError::Transient(_)));
}

#[tokio::test]
async fn should_classify_missing_event_id_as_permanent() {
    let handler = TaskEventHandler::new(MockTaskRepo::new());
    let delivery = Delivery {
        topic: RESOURCE_CREATED.to_owned(),
        key: "agg-1".to_owned(),
        payload: resource_changed("agg-1", "X"),
        headers: Headers::new(),
        offset: "0".to_owned(),
        redelivered: false,
    };

    let err = handler.handle(delivery).await.unwrap_err();
    assert!(matches!(err, HandlerError::Permanent(_)));
}

#[tokio::test]
async fn should_classify_malformed_payload_as_permanent() {
    let repo = MockTaskRepo::new();
    let handler = TaskEventHandler::new(repo.clone());
    let message = resource_message(EventId::new(), RESOURCE_CREATED, "agg-1", b"{".to_vec());

    let err = handler.handle(delivery(&message, "0")).await.unwrap_err();
    assert!(matches!(err, HandlerError::Permanent(_)));
    assert_eq!(repo.task_count(), 0);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_task() {
    let uc = GetTaskUseCase {
        repo: MockTaskRepo::new(),
    };
    let result = uc.execute(task_for("missing", RESOURCE_CREATED)).await;
    assert!(matches!(result, Err(TasksServiceError::TaskNotFound)));
}

#[tokio::test]
async fn should_list_tasks_newest_first() {
    let repo = MockTaskRepo::new();
    let uc = ProcessEventUseCase { repo: repo.clone() };
    for aggregate in ["agg-1", "agg-2", "agg-3"] {
        uc.execute(
            EventId::new(),
            RESOURCE_CREATED,
            &resource_changed(aggregate, "X"),
        )
        .await
        .unwrap();
    }

    let list = ListTasksUseCase { repo: repo.clone() };
    let all = list.execute(None).await.unwrap();
    let resources: Vec<&str> = all.iter().map(|t| t.resource_id.as_str()).collect();
    assert_eq!(resources, vec!["agg-3", "agg-2", "agg-1"]);

    let first = list.execute(Some(1)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].resource_id, "agg-3");

    // Zero falls back to the default page.
    assert_eq!(list.execute(Some(0)).await.unwrap().len(), 3);
    assert!(DEFAULT_PAGE_SIZE >= 3);
}
