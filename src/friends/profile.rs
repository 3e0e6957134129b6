//! Profile projection: the viewer-safe subset of a user record.
//!
//! A projection carries the public handle, display name, picture, and the
//! viewer-relative exclusion flag. It never carries `identity_ref` or the
//! store key; the type simply has no fields for them, so they cannot leak
//! through serialization.

use serde::Serialize;

use super::types::User;

/// A user record as shown to another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendProfile {
    /// Opaque shareable handle.
    pub public_id: String,
    /// Display name.
    pub display_name: String,
    /// Base64-encoded picture blob, if any.
    pub picture: Option<String>,
    /// Whether the viewer has this user in their own exclusion list.
    ///
    /// Per-viewer: only reflects entries the viewer added, never the
    /// reverse direction, in both deployment variants.
    pub is_excluded: bool,
}

/// Projects a user record for a specific viewer.
///
/// `excluded_for_viewer` is the viewer's own exclusion-list membership for
/// this subject, already read from the store.
#[must_use]
pub fn project(subject: &User, excluded_for_viewer: bool) -> FriendProfile {
    FriendProfile {
        public_id: subject.public_id.clone(),
        display_name: subject.display_name.clone(),
        picture: subject.picture.clone(),
        is_excluded: excluded_for_viewer,
    }
}
