//! Shared domain types for Taskloom.
//!
//! This crate holds the validated template model, the parameter type
//! vocabulary, run-log records, and engine configuration. It carries no
//! engine logic beyond value type checking and deliberately depends on
//! nothing heavier than serde.

pub mod config;
pub mod param;
pub mod runlog;
pub mod template;
