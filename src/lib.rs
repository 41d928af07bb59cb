// Main library entry point for retrograph.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
