//! # Chainwatch Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the Chainwatch API server and worker systems.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and authorization utilities
//! - `db`: PostgreSQL pool construction and migrations
//! - `redis`: Redis client, cache, and rate-limit counters
//! - `quota`: Plan tiers and per-tenant resource ceilings

pub mod auth;
pub mod db;
pub mod models;
pub mod quota;
pub mod redis;

/// Current version of the Chainwatch shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
