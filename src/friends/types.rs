//! Core types for the friend graph.
//!
//! # Identity Model
//!
//! Every user carries two identifiers: the `identity_ref` (normalized
//! external identity, e.g. a lower-cased email) used only to resolve the
//! authenticated caller, and the `public_id` (opaque random handle) used in
//! every relationship operation. Only the `public_id` is ever shown to
//! other users; `User` does not implement `Serialize` and redacts the
//! `identity_ref` from its `Debug` output.

use serde::Serialize;

/// Default page size for request listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Upper bound on page size for request listings.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Upper bound on a batch profile lookup.
pub const MAX_PROFILE_BATCH: usize = 200;

/// Exclusion semantics, selected once per deployment.
///
/// This is the single behavioral branch point between the two service
/// variants: whether exclusions gate request creation and approval, or only
/// flag profiles for the viewer who added them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExclusionMode {
    /// Either party having excluded the other blocks interaction entirely.
    #[default]
    MutualBlock,
    /// Exclusions only flag profile projections; requests are never gated.
    AvoidOnly,
}

impl ExclusionMode {
    /// Converts to string representation for configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MutualBlock => "mutual_block",
            Self::AvoidOnly => "avoid_only",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mutual_block" => Some(Self::MutualBlock),
            "avoid_only" => Some(Self::AvoidOnly),
            _ => None,
        }
    }
}

/// A registered user.
///
/// Owned by the relationship store; the engine re-reads records per
/// operation and never caches them across calls.
#[derive(Clone)]
pub struct User {
    /// Store rowid. Never exposed outside the crate's own lookups.
    pub internal_key: i64,
    /// Normalized external identity. Resolution only, never displayed.
    pub identity_ref: String,
    /// Opaque shareable handle; globally unique, immutable.
    pub public_id: String,
    /// Display name shown to other users.
    pub display_name: String,
    /// Base64-encoded picture blob, if any.
    pub picture: Option<String>,
    /// When the user registered (Unix timestamp).
    pub created_at: i64,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("internal_key", &self.internal_key)
            .field("identity_ref", &"<redacted>")
            .field("public_id", &self.public_id)
            .field("display_name", &self.display_name)
            .field("picture", &self.picture.as_deref().map(|_| "<blob>"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A pending directed friend request.
///
/// At most one exists per ordered `(from_id, to_id)` pair. Destroyed the
/// instant it is approved, rejected, or cancelled; never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRequest {
    /// Public id of the requester.
    pub from_id: String,
    /// Public id of the target.
    pub to_id: String,
    /// When the request was created (Unix timestamp).
    pub created_at: i64,
}

/// Bounded limit/offset pagination for request listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: u32,
    offset: u32,
}

impl Page {
    /// Creates a page, clamping the limit to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }

    /// Number of entries per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of entries to skip.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_mode_default() {
        assert_eq!(ExclusionMode::default(), ExclusionMode::MutualBlock);
    }

    #[test]
    fn exclusion_mode_as_str() {
        assert_eq!(ExclusionMode::MutualBlock.as_str(), "mutual_block");
        assert_eq!(ExclusionMode::AvoidOnly.as_str(), "avoid_only");
    }

    #[test]
    fn exclusion_mode_parse() {
        assert_eq!(
            ExclusionMode::parse("mutual_block"),
            Some(ExclusionMode::MutualBlock)
        );
        assert_eq!(
            ExclusionMode::parse("avoid_only"),
            Some(ExclusionMode::AvoidOnly)
        );
        assert_eq!(ExclusionMode::parse("invalid"), None);
    }

    #[test]
    fn page_default() {
        let page = Page::default();
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit(), 1);
        assert_eq!(Page::new(1000, 0).limit(), MAX_PAGE_LIMIT);
        assert_eq!(Page::new(25, 10).limit(), 25);
        assert_eq!(Page::new(25, 10).offset(), 10);
    }

    #[test]
    fn user_debug_redacts_identity_ref() {
        let user = User {
            internal_key: 7,
            identity_ref: "secret@example.com".to_string(),
            public_id: "abc123".to_string(),
            display_name: "Alice".to_string(),
            picture: Some("aGVsbG8=".to_string()),
            created_at: 1_000_000,
        };

        let debug_str = format!("{user:?}");
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("secret@example.com"));
        assert!(debug_str.contains("abc123"));
        // Picture payload is elided too
        assert!(!debug_str.contains("aGVsbG8="));
    }

    #[test]
    fn friend_request_serializes_public_ids_only() {
        let request = FriendRequest {
            from_id: "u1".to_string(),
            to_id: "u2".to_string(),
            created_at: 42,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["from_id"], "u1");
        assert_eq!(json["to_id"], "u2");
        assert_eq!(json["created_at"], 42);
    }
}
