//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod sources;
pub mod speech;
pub mod telemetry;
