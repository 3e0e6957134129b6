//! Exclusion policy: the configurable block/avoid semantics.
//!
//! Two deployments of the same engine differ only in what an entry in a
//! user's exclusion list means:
//!
//! - **`MutualBlock`**: either party having excluded the other blocks
//!   request creation and approval, symmetrically.
//! - **`AvoidOnly`**: exclusions are display-only; the profile projection
//!   flags the subject for the viewer who added the entry, and nothing else
//!   consults the list.
//!
//! The policy is a pure predicate; the engine performs the set lookups and
//! asks the policy what they mean. It is chosen once at construction, never
//! per call.

use super::types::ExclusionMode;

/// Exclusion semantics wrapper, selected at deployment time.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionPolicy {
    mode: ExclusionMode,
}

impl ExclusionPolicy {
    /// Creates a policy for the given mode.
    #[must_use]
    pub const fn new(mode: ExclusionMode) -> Self {
        Self { mode }
    }

    /// The configured mode.
    #[must_use]
    pub const fn mode(&self) -> ExclusionMode {
        self.mode
    }

    /// Whether exclusions gate request creation and approval at all.
    ///
    /// When false, `excludes` is constant false and the engine skips the
    /// exclusion lookups entirely.
    #[must_use]
    pub const fn gates_requests(&self) -> bool {
        matches!(self.mode, ExclusionMode::MutualBlock)
    }

    /// Whether interaction between two users is excluded.
    ///
    /// Takes the two directed membership facts (`a` excludes `b`, `b`
    /// excludes `a`) already read from the store.
    #[must_use]
    pub const fn excludes(&self, a_excludes_b: bool, b_excludes_a: bool) -> bool {
        match self.mode {
            ExclusionMode::MutualBlock => a_excludes_b || b_excludes_a,
            ExclusionMode::AvoidOnly => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutual_block_gates_requests() {
        assert!(ExclusionPolicy::new(ExclusionMode::MutualBlock).gates_requests());
        assert!(!ExclusionPolicy::new(ExclusionMode::AvoidOnly).gates_requests());
    }

    #[test]
    fn mutual_block_is_symmetric() {
        let policy = ExclusionPolicy::new(ExclusionMode::MutualBlock);
        assert!(policy.excludes(true, false));
        assert!(policy.excludes(false, true));
        assert!(policy.excludes(true, true));
        assert!(!policy.excludes(false, false));
    }

    #[test]
    fn avoid_only_never_excludes() {
        let policy = ExclusionPolicy::new(ExclusionMode::AvoidOnly);
        assert!(!policy.excludes(true, true));
        assert!(!policy.excludes(true, false));
        assert!(!policy.excludes(false, false));
    }

    #[test]
    fn mode_accessor() {
        assert_eq!(
            ExclusionPolicy::new(ExclusionMode::AvoidOnly).mode(),
            ExclusionMode::AvoidOnly
        );
    }
}
