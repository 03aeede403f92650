// Serial telemetry monitor - streaming state core and serial/WebSocket bridge
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
