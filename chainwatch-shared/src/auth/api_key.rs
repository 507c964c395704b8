/// API key generation and verification utilities
///
/// These work in conjunction with the `models::api_key` module for
/// database operations.
///
/// # Key Format
///
/// Issued keys follow the pattern `cwk_{40_chars}` (44 chars total):
/// - Prefix: "cwk_" (4 chars)
/// - Random part: 40 chars from the URL-safe alphabet `[A-Za-z0-9_-]`
///   (64^40, 240 bits of entropy)
///
/// # Storage
///
/// The plaintext key is shown once at creation and never stored. The
/// database keeps three derived values:
/// - `key_prefix`: first 12 chars, used to narrow candidate rows
/// - `last_four`: last 4 chars, shown in listings and used for narrowing
/// - `key_hash`: SHA-256 of the full key, hex encoded
///
/// Verification compares SHA-256(presented) against `key_hash` in
/// constant time.
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::{
///     generate_api_key, hash_api_key, validate_api_key_format,
/// };
///
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("cwk_"));
/// assert_eq!(key.len(), 44);
/// assert!(validate_api_key_format(&key));
/// assert_eq!(hash, hash_api_key(&key));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the API key (characters)
const KEY_RANDOM_LENGTH: usize = 40;

/// API key prefix
const KEY_PREFIX: &str = "cwk_";

/// Total length of an issued API key (prefix + random)
pub const API_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Length of the stored `key_prefix` column (first N chars of the key)
pub const STORED_PREFIX_LENGTH: usize = 12;

/// URL-safe alphabet for the random part
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Generates a new API key
///
/// Creates a cryptographically random key with the format `cwk_{40_chars}`
/// and returns it together with its SHA-256 hash for storage.
///
/// # Returns
///
/// Tuple of (plaintext_key, sha256_hash)
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::generate_api_key;
///
/// let (key, hash) = generate_api_key();
/// assert_eq!(key.len(), 44);
/// assert_eq!(hash.len(), 64); // SHA-256 hex is 64 chars
/// ```
pub fn generate_api_key() -> (String, String) {
    let mut rng = rand::thread_rng();
    let random_part: String = (0..KEY_RANDOM_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_api_key(&key);

    (key, hash)
}

/// Hashes an API key using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts the stored prefix (first 12 chars) of a key
///
/// Used for candidate-row narrowing before the hash comparison.
pub fn extract_prefix(key: &str) -> String {
    key.chars().take(STORED_PREFIX_LENGTH).collect()
}

/// Extracts the last four chars of a key
pub fn extract_last_four(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

/// Validates API key format
///
/// Checks that the key:
/// - Starts with "cwk_"
/// - Has correct length (44 chars)
/// - Contains only URL-safe characters after the prefix
///
/// This is a cheap pre-check so malformed credentials never reach the
/// database.
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::validate_api_key_format;
///
/// assert!(validate_api_key_format(
///     "cwk_AbCdEfGhIjKlMnOpQrStUvWxYz0123456789-_Ab"
/// ));
/// assert!(!validate_api_key_format("cwk_tooshort"));
/// assert!(!validate_api_key_format("wrong_prefix"));
/// ```
pub fn validate_api_key_format(key: &str) -> bool {
    if key.len() != API_KEY_LENGTH {
        return false;
    }

    if !key.starts_with(KEY_PREFIX) {
        return false;
    }

    let random_part = &key[KEY_PREFIX.len()..];
    random_part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Verifies an API key against a stored hash
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_api_key(key);
    constant_time_compare(&computed_hash, stored_hash)
}

/// Constant-time string comparison
///
/// Always compares the full length of both strings, accumulating
/// differences with bitwise OR instead of short-circuiting. Both sides
/// are 64-char hex digests in the verification path, so the length
/// check only rejects malformed stored values.
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::constant_time_compare;
///
/// assert!(constant_time_compare("hello", "hello"));
/// assert!(!constant_time_compare("hello", "world"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

/// Parses scopes from a comma-separated string
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::parse_scopes;
///
/// let scopes = parse_scopes("monitors:read, monitors:write");
/// assert_eq!(scopes, vec!["monitors:read", "monitors:write"]);
/// ```
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Checks if a scope list grants a required scope
///
/// Supports wildcard matching with `*`:
/// - `monitors:*` matches `monitors:read`, `monitors:write`, etc.
/// - `*` matches everything
///
/// # Example
///
/// ```
/// use chainwatch_shared::auth::api_key::has_scope;
///
/// let scopes = vec!["monitors:read".to_string(), "triggers:*".to_string()];
/// assert!(has_scope(&scopes, "monitors:read"));
/// assert!(has_scope(&scopes, "triggers:write"));
/// assert!(!has_scope(&scopes, "monitors:write"));
/// ```
pub fn has_scope(scopes: &[String], required: &str) -> bool {
    for scope in scopes {
        if scope == "*" {
            return true;
        }

        if scope == required {
            return true;
        }

        if scope.ends_with(":*") {
            let prefix = &scope[..scope.len() - 1]; // keep the ":"
            if required.starts_with(prefix) {
                return true;
            }
        }
    }

    false
}
