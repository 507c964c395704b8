//! # Chainwatch API Server Library
//!
//! This library provides the core functionality for the Chainwatch API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `audit`: Fire-and-forget audit trail recording
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Request pipeline (request id, logging, auth, tenant, rate limit)
//! - `routes`: API route handlers

pub mod app;
pub mod audit;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
