//! Execution engine core for Taskloom.
//!
//! Declarative JSON templates describe typed executables -- tasks,
//! processes, remote actions, generators, and local tools -- and this
//! crate interprets them: it validates template documents, resolves the
//! per-run variable space, drives the control-flow graph, and dispatches
//! calls with retry and error-handling policy.
//!
//! The crate defines the "ports" (template source, run-log sink, message
//! queue, generator backend, tool registry) that `taskloom-infra`
//! implements. It depends only on `taskloom-types`, never on infra.

pub mod condition;
pub mod engine;
pub mod error;
pub mod port;
pub mod runlog;
pub mod space;
pub mod validate;
