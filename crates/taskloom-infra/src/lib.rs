//! Infrastructure implementations of the Taskloom engine ports.
//!
//! Filesystem-backed template and run-log stores, an in-memory message
//! queue, generator backends for local runs and tests, the local tool
//! registry, and the `config.toml` loader.

pub mod config;
pub mod generator;
pub mod queue;
pub mod runlog_store;
pub mod template_store;
pub mod tools;
