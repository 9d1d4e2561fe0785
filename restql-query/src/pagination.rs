//! Page-size and total-results enforcement
//!
//! Three tiers, applied in order: default page size, page-size cap, then the
//! total-results quota. Only the last tier can be bypassed.

use tracing::warn;

use restql_common::config::QueryLimitsConfig;

/// Resolve the effective limit for a request.
///
/// `offset` counts as 0 when unset. Explicit zero or negative values are
/// taken verbatim.
#[must_use]
pub fn resolve_limit(
    limit: Option<i64>,
    offset: Option<i64>,
    limits: &QueryLimitsConfig,
    bypass_max_total_results: bool,
) -> Option<i64> {
    let mut limit = limit;

    if limit.is_none() && limits.default_page_size >= 0 {
        limit = Some(limits.default_page_size);
    }

    if let Some(requested) = limit {
        if limits.max_page_size >= 0 && requested > limits.max_page_size {
            warn!(
                requested,
                max_page_size = limits.max_page_size,
                "clamping limit to max page size"
            );
            limit = Some(limits.max_page_size);
        }
    }

    if limits.max_total_results >= 0 && !bypass_max_total_results {
        let offset = offset.unwrap_or(0);
        let remaining = limits.max_total_results.saturating_sub(offset);
        if remaining <= 0 {
            warn!(
                offset,
                max_total_results = limits.max_total_results,
                "offset is past the total results quota"
            );
            limit = Some(0);
        } else if limit.map_or(true, |l| l > remaining) {
            limit = Some(remaining);
        }
    }

    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_page: i64, max_total: i64, default_page: i64) -> QueryLimitsConfig {
        QueryLimitsConfig {
            max_page_size: max_page,
            max_total_results: max_total,
            default_page_size: default_page,
        }
    }

    #[test]
    fn test_total_results_quota() {
        let cfg = limits(1000, 10_000, -1);
        assert_eq!(resolve_limit(Some(1000), Some(9500), &cfg, false), Some(500));
        assert_eq!(resolve_limit(Some(1000), Some(10_500), &cfg, false), Some(0));
        assert_eq!(resolve_limit(Some(1000), Some(10_000), &cfg, false), Some(0));
        assert_eq!(resolve_limit(Some(100), Some(0), &cfg, false), Some(100));
    }

    #[test]
    fn test_unset_limit_takes_remaining_quota() {
        let cfg = limits(-1, 10_000, -1);
        assert_eq!(resolve_limit(None, Some(9990), &cfg, false), Some(10));
        assert_eq!(resolve_limit(None, None, &cfg, false), Some(10_000));
    }

    #[test]
    fn test_default_page_size() {
        let cfg = limits(1000, -1, 50);
        assert_eq!(resolve_limit(None, None, &cfg, false), Some(50));
        assert_eq!(resolve_limit(Some(10), None, &cfg, false), Some(10));
    }

    #[test]
    fn test_default_is_clamped_by_page_cap() {
        let cfg = limits(20, -1, 50);
        assert_eq!(resolve_limit(None, None, &cfg, false), Some(20));
    }

    #[test]
    fn test_page_cap() {
        let cfg = limits(100, -1, -1);
        assert_eq!(resolve_limit(Some(5000), None, &cfg, false), Some(100));
        assert_eq!(resolve_limit(None, None, &cfg, false), None);
    }

    #[test]
    fn test_bypass_skips_only_total_quota() {
        let cfg = limits(1000, 10_000, -1);
        assert_eq!(resolve_limit(Some(1000), Some(10_500), &cfg, true), Some(1000));
        assert_eq!(resolve_limit(Some(5000), Some(10_500), &cfg, true), Some(1000));
        assert_eq!(resolve_limit(None, Some(10_500), &cfg, true), None);
    }

    #[test]
    fn test_unlimited() {
        let cfg = QueryLimitsConfig::unlimited();
        assert_eq!(resolve_limit(None, None, &cfg, false), None);
        assert_eq!(resolve_limit(Some(1_000_000), Some(5), &cfg, false), Some(1_000_000));
    }

    #[test]
    fn test_explicit_zero_and_negative_pass_through() {
        let cfg = limits(1000, -1, 25);
        assert_eq!(resolve_limit(Some(0), None, &cfg, false), Some(0));
        assert_eq!(resolve_limit(Some(-3), None, &cfg, false), Some(-3));
    }

    #[test]
    fn test_negative_offset_widens_remaining() {
        let cfg = limits(-1, 100, -1);
        assert_eq!(resolve_limit(None, Some(-10), &cfg, false), Some(110));
    }
}
