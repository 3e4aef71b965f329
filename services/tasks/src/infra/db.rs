use anyhow::Context;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, Insert, QueryOrder, QuerySelect,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use conveyor_domain::id::{EventId, TaskId};
use conveyor_domain::task::TaskStatus;
use conveyor_outbox::append_event;
use conveyor_tasks_schema::{processed_events, processed_tasks};

use crate::domain::repository::TaskRepository;
use crate::domain::types::{Applied, ProcessedTask, TaskTransition};
use crate::error::TasksServiceError;

#[derive(Clone)]
pub struct DbTaskRepository {
    pub db: DatabaseConnection,
}

impl TaskRepository for DbTaskRepository {
    async fn find(&self, id: TaskId) -> Result<Option<ProcessedTask>, TasksServiceError> {
        let model = processed_tasks::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find task")?;
        model.map(task_from_model).transpose()
    }

    async fn list(&self, limit: u64) -> Result<Vec<ProcessedTask>, TasksServiceError> {
        let models = processed_tasks::Entity::find()
            .order_by_desc(processed_tasks::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list tasks")?;
        models.into_iter().map(task_from_model).collect()
    }

    async fn ensure_processing(
        &self,
        transition: &TaskTransition,
    ) -> Result<(), TasksServiceError> {
        processing_insert(transition)
            .exec_without_returning(&self.db)
            .await
            .context("ensure task processing")?;
        Ok(())
    }

    async fn apply(&self, transition: &TaskTransition) -> Result<Applied, TasksServiceError> {
        let applied = self
            .db
            .transaction::<_, Applied, sea_orm::DbErr>(|txn| {
                let transition = transition.clone();
                Box::pin(async move {
                    let recorded = inbox_insert(&transition)
                        .exec_without_returning(txn)
                        .await?;
                    if recorded == 0 {
                        return Ok(Applied::Duplicate);
                    }
                    let written = terminal_upsert(&transition)
                        .exec_without_returning(txn)
                        .await?;
                    if written == 0 {
                        return Ok(Applied::Superseded);
                    }
                    if let Some(completion) = &transition.completion {
                        append_event(txn, completion).await?;
                    }
                    Ok(Applied::Applied)
                })
            })
            .await
            .context("apply task transition")?;
        Ok(applied)
    }
}

/// Insert `processing` unless the task row already exists.
fn processing_insert(transition: &TaskTransition) -> Insert<processed_tasks::ActiveModel> {
    processed_tasks::Entity::insert(processed_tasks::ActiveModel {
        id: Set(transition.task_id.0),
        resource_id: Set(transition.resource_id.clone()),
        action: Set(transition.action.as_str().to_owned()),
        status: Set(TaskStatus::Processing.as_str().to_owned()),
        result: Set(None),
        last_event_id: Set(None),
        created_at: Set(transition.at),
        updated_at: Set(transition.at),
    })
    .on_conflict(
        OnConflict::column(processed_tasks::Column::Id)
            .do_nothing()
            .to_owned(),
    )
}

/// Record the event id; affects zero rows when it was already applied.
fn inbox_insert(transition: &TaskTransition) -> Insert<processed_events::ActiveModel> {
    processed_events::Entity::insert(processed_events::ActiveModel {
        event_id: Set(transition.event_id.0),
        event_type: Set(transition.event_type.clone()),
        aggregate_id: Set(transition.resource_id.clone()),
        task_id: Set(transition.task_id.0),
        processed_at: Set(transition.at),
    })
    .on_conflict(
        OnConflict::column(processed_events::Column::EventId)
            .do_nothing()
            .to_owned(),
    )
}

/// Write the terminal columns unless the row already carries a newer event.
fn terminal_upsert(transition: &TaskTransition) -> Insert<processed_tasks::ActiveModel> {
    let last_event_id = Expr::col((
        processed_tasks::Entity,
        processed_tasks::Column::LastEventId,
    ));
    processed_tasks::Entity::insert(processed_tasks::ActiveModel {
        id: Set(transition.task_id.0),
        resource_id: Set(transition.resource_id.clone()),
        action: Set(transition.action.as_str().to_owned()),
        status: Set(transition.status.as_str().to_owned()),
        result: Set(Some(transition.result.clone())),
        last_event_id: Set(Some(transition.event_id.0)),
        created_at: Set(transition.at),
        updated_at: Set(transition.at),
    })
    .on_conflict(
        OnConflict::column(processed_tasks::Column::Id)
            .update_columns([
                processed_tasks::Column::Action,
                processed_tasks::Column::Status,
                processed_tasks::Column::Result,
                processed_tasks::Column::LastEventId,
                processed_tasks::Column::UpdatedAt,
            ])
            .action_and_where(
                last_event_id.clone().is_null().or(
                    last_event_id.lt(Expr::cust(r#""excluded"."last_event_id""#)),
                ),
            )
            .to_owned(),
    )
}

fn task_from_model(model: processed_tasks::Model) -> Result<ProcessedTask, TasksServiceError> {
    let status = model
        .status
        .parse::<TaskStatus>()
        .with_context(|| format!("task {} has a corrupt status", model.id))?;
    Ok(ProcessedTask {
        id: TaskId(model.id),
        resource_id: model.resource_id,
        action: model.action,
        status,
        result: model.result,
        last_event_id: model.last_event_id.map(EventId),
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
