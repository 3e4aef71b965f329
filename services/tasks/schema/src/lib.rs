pub mod processed_events;
pub mod processed_tasks;
