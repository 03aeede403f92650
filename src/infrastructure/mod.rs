// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod line_decoder;
pub mod serial_link;
pub mod snapshot_mapper;
