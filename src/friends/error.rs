//! Error types for friend graph operations.
//!
//! Every business-rule violation is a typed outcome; only genuinely
//! unexpected store failures surface as `Storage`/`Database`, which the
//! routing layer logs and reports generically.

use thiserror::Error;

/// Error type for friend graph operations.
#[derive(Error, Debug)]
pub enum FriendError {
    /// The verified identity has no registered user record.
    #[error("No registered user for identity: {0}")]
    Unauthenticated(String),

    /// A user or friend request is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request targets the caller itself.
    #[error("Cannot send a friend request to yourself")]
    SelfReference,

    /// Operation parameters are inconsistent (e.g. approving own request).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The target is already in the caller's friend set.
    #[error("Already friends with: {0}")]
    AlreadyFriends(String),

    /// A request for the same ordered pair already exists.
    #[error("Friend request already pending: {from} -> {to}")]
    DuplicateRequest {
        /// Public id of the requester.
        from: String,
        /// Public id of the target.
        to: String,
    },

    /// The exclusion policy forbids interaction between the two users.
    #[error("Interaction excluded by block")]
    Excluded,

    /// The identity is already bound to a user record.
    #[error("Identity already registered: {0}")]
    AlreadyRegistered(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for friend graph operations.
pub type Result<T> = std::result::Result<T, FriendError>;
