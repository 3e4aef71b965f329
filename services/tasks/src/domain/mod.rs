pub mod repository;
pub mod types;
