pub mod config;
pub mod consent;
pub mod cors;
pub mod error;
pub mod intake;
pub mod notify;
pub mod storage;
pub mod telemetry;
