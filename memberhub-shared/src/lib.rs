//! # MemberHub Shared Library
//!
//! Domain types, access policy and persistence for the MemberHub association
//! portal, shared by the API server and its integration tests.
//!
//! ## Module Organization
//!
//! - `auth`: Access policy, password hashing, JWT tokens, request authentication
//! - `category`: Article category normalization and legacy aliases
//! - `db`: Connection pool and embedded migrations
//! - `models`: Database models and data structures

pub mod auth;
pub mod category;
pub mod db;
pub mod models;

/// Current version of the MemberHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
