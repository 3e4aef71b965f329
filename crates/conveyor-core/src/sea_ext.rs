use sea_orm::{
    EntityTrait, QuerySelect, Select,
    sea_query::{LockBehavior, LockType},
};

/// Row-claim helper for work-queue style polling.
///
/// Appends `FOR UPDATE SKIP LOCKED`: rows already locked by another
/// transaction are skipped instead of waited on, so concurrent pollers
/// never select the same row. The lock lives as long as the transaction
/// the query runs on.
pub trait ForUpdateSkipLocked {
    fn for_update_skip_locked(self) -> Self;
}

impl<E> ForUpdateSkipLocked for Select<E>
where
    E: EntityTrait,
{
    fn for_update_skip_locked(self) -> Self {
        self.lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
    }
}
