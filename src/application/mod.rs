// Application layer - Use cases driving the domain
pub mod bridge_service;
pub mod stream_controller;
