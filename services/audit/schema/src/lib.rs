pub mod audit_events;
