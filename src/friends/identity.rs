//! Principal normalization for the identity resolver.
//!
//! The surrounding service verifies the bearer credential and hands the
//! core an opaque identity string (`sub` claim equivalent). The resolver
//! normalizes it before lookup so that case or whitespace variations of the
//! same identity always map to the same user record.

/// Normalizes an authenticated principal for `identity_ref` lookup.
///
/// Trims surrounding whitespace and lower-cases the remainder.
#[must_use]
pub fn normalize_principal(principal: &str) -> String {
    principal.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(
            normalize_principal("  Alice@Example.COM "),
            "alice@example.com"
        );
    }

    #[test]
    fn already_normalized_is_unchanged() {
        assert_eq!(normalize_principal("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn empty_and_whitespace_collapse_to_empty() {
        assert_eq!(normalize_principal(""), "");
        assert_eq!(normalize_principal("   \t"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_principal(" MiXeD@Case.Org ");
        assert_eq!(normalize_principal(&once), once);
    }
}
