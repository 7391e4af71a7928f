//! Pagination defaults shared by list endpoints and repositories.

/// Default number of rows per page.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum number of rows per page.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Clamp a user-provided limit to `[1, max]`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_when_missing() {
        assert_eq!(clamp_limit(None, 50, 200), 50);
    }

    #[test]
    fn limit_is_clamped_to_bounds() {
        assert_eq!(clamp_limit(Some(0), 50, 200), 1);
        assert_eq!(clamp_limit(Some(-5), 50, 200), 1);
        assert_eq!(clamp_limit(Some(1000), 50, 200), 200);
        assert_eq!(clamp_limit(Some(25), 50, 200), 25);
    }

    #[test]
    fn offset_never_negative() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-3)), 0);
        assert_eq!(clamp_offset(Some(40)), 40);
    }
}
