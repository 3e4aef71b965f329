use uuid::Uuid;

use conveyor_domain::event::{DomainEvent, RESOURCE_CREATED, RESOURCE_DELETED, RESOURCE_UPDATED};
use conveyor_resources::error::ResourcesServiceError;
use conveyor_resources::usecase::resource::{
    CreateResourceInput, CreateResourceUseCase, DeleteResourceUseCase, GetResourceUseCase,
    ListResourcesUseCase, UpdateResourceInput, UpdateResourceUseCase,
};

use crate::helpers::{MockResourceRepo, test_resource};

#[tokio::test]
async fn should_create_resource_with_created_event() {
    let repo = MockResourceRepo::empty();
    let resources = repo.resources_handle();
    let outbox = repo.outbox_handle();
    let uc = CreateResourceUseCase { repo };

    let created = uc
        .execute(CreateResourceInput {
            name: "X".to_owned(),
            description: "first".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(created.status, "active");
    assert_eq!(resources.lock().unwrap().len(), 1);

    let outbox = outbox.lock().unwrap();
    assert_eq!(outbox.len(), 1, "exactly one outbox row per write");
    let event = &outbox[0];
    assert_eq!(event.event_type, RESOURCE_CREATED);
    assert_eq!(event.aggregate_id.as_str(), created.id.to_string());
    match DomainEvent::decode(&event.event_type, &event.payload).unwrap() {
        DomainEvent::ResourceCreated(body) => {
            assert_eq!(body.id, created.id.to_string());
            assert_eq!(body.name, "X");
            assert_eq!(body.description, "first");
            assert_eq!(body.status, "active");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn should_leave_no_resource_and_no_event_when_write_fails() {
    let repo = MockResourceRepo::failing();
    let resources = repo.resources_handle();
    let outbox = repo.outbox_handle();
    let uc = CreateResourceUseCase { repo };

    let result = uc
        .execute(CreateResourceInput {
            name: "X".to_owned(),
            description: String::new(),
        })
        .await;

    assert!(matches!(result, Err(ResourcesServiceError::Internal(_))));
    assert!(resources.lock().unwrap().is_empty());
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_update_resource_with_updated_event() {
    let existing = test_resource("old");
    let repo = MockResourceRepo::new(vec![existing.clone()]);
    let outbox = repo.outbox_handle();
    let uc = UpdateResourceUseCase { repo };

    let updated = uc
        .execute(UpdateResourceInput {
            id: existing.id,
            name: "new".to_owned(),
            description: "d".to_owned(),
            status: "archived".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(updated.name, "new");
    assert_eq!(updated.created_at, existing.created_at);
    let outbox = outbox.lock().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].event_type, RESOURCE_UPDATED);
    assert_eq!(outbox[0].aggregate_id.as_str(), existing.id.to_string());
}

#[tokio::test]
async fn should_not_emit_event_when_updating_missing_resource() {
    let repo = MockResourceRepo::empty();
    let outbox = repo.outbox_handle();
    let uc = UpdateResourceUseCase { repo };

    let result = uc
        .execute(UpdateResourceInput {
            id: Uuid::new_v4(),
            name: "new".to_owned(),
            description: String::new(),
            status: "active".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(ResourcesServiceError::ResourceNotFound)),
        "expected ResourceNotFound, got {result:?}"
    );
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_delete_resource_with_deleted_event() {
    let existing = test_resource("doomed");
    let repo = MockResourceRepo::new(vec![existing.clone()]);
    let resources = repo.resources_handle();
    let outbox = repo.outbox_handle();
    let uc = DeleteResourceUseCase { repo };

    uc.execute(existing.id).await.unwrap();

    assert!(resources.lock().unwrap().is_empty());
    let outbox = outbox.lock().unwrap();
    assert_eq!(outbox[0].event_type, RESOURCE_DELETED);
    match DomainEvent::decode(RESOURCE_DELETED, &outbox[0].payload).unwrap() {
        DomainEvent::ResourceDeleted(body) => {
            assert_eq!(body.id, existing.id.to_string());
            assert_eq!(body.status, "deleted");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn should_return_not_found_when_deleting_missing_resource() {
    let repo = MockResourceRepo::empty();
    let outbox = repo.outbox_handle();
    let uc = DeleteResourceUseCase { repo };

    let result = uc.execute(Uuid::new_v4()).await;

    assert!(matches!(result, Err(ResourcesServiceError::ResourceNotFound)));
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_get_and_list_resources() {
    let a = test_resource("a");
    let b = test_resource("b");
    let repo = MockResourceRepo::new(vec![a.clone(), b.clone()]);

    let found = GetResourceUseCase { repo }.execute(a.id).await.unwrap();
    assert_eq!(found, a);

    let listed = ListResourcesUseCase {
        repo: MockResourceRepo::new(vec![a, b]),
    }
    .execute()
    .await
    .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_resource() {
    let result = GetResourceUseCase {
        repo: MockResourceRepo::empty(),
    }
    .execute(Uuid::new_v4())
    .await;

    assert!(matches!(result, Err(ResourcesServiceError::ResourceNotFound)));
}
