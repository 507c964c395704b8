/// Authentication and authorization utilities
///
/// This module provides secure authentication primitives for Chainwatch:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
/// - [`api_key`]: API key generation, format checks, and hashing
/// - [`context`]: Request-scoped auth and tenant context types
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **API Keys**: Secure random generation with SHA-256 hashing
/// - **Constant-time Comparison**: All verification uses constant-time operations
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::auth::password::{hash_password, verify_password};
/// use chainwatch_shared::auth::api_key::generate_api_key;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// // API key issuance (plaintext is shown once, only the hash is stored)
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("cwk_"));
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod context;
pub mod jwt;
pub mod password;
