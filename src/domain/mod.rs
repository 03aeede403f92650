// Domain layer - Core types and pure operations on telemetry state
pub mod command;
pub mod event_log;
pub mod message;
pub mod series;
pub mod telemetry;
