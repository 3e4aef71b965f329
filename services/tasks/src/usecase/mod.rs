pub mod process_event;
pub mod task;
