//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod db;
pub mod error;
pub mod manifests;
pub mod memory;
pub mod telemetry;
