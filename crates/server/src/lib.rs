pub mod api;
pub mod config;
pub mod error;
pub mod placeholder;
pub mod storage_factory;
pub mod telemetry;
