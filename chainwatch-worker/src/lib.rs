//! # Chainwatch Worker Library
//!
//! Background job runner for the Chainwatch platform. The API enqueues
//! work as rows in the `jobs` table; this crate claims due rows with
//! `FOR UPDATE SKIP LOCKED`, dispatches each to the handler registered
//! for its kind, and writes the outcome back (succeeded, or requeued
//! with backoff until the attempt budget runs out).
//!
//! ## Module Organization
//!
//! - `config`: environment-driven worker configuration
//! - `handlers`: the `JobHandler` trait and the per-kind handlers
//! - `runner`: the claim/dispatch/ack polling loop
//!
//! ## Example
//!
//! ```no_run
//! use chainwatch_worker::handlers::default_handlers;
//!
//! for handler in default_handlers(90) {
//!     println!("handler: {}", handler.kind());
//! }
//! ```

pub mod config;
pub mod handlers;
pub mod runner;

pub use config::WorkerConfig;
pub use handlers::{default_handlers, JobContext, JobError, JobHandler};
pub use runner::{JobRunner, RunnerConfig};

/// Current version of the Chainwatch worker
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
