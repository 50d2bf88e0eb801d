//! Shared helper functions for PostgreSQL row conversion and rollups.

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::IssueType;
use vigil_core::ports::OrderDirection;
use vigil_core::severity::{Severity, SeverityCounts};

/// SQL expression computing an issue's effective severity rank: the
/// highest rank across its joined variants (alias `iv`), NULL when the
/// issue has no variants at all.
///
/// Ranks must stay in lockstep with [`Severity::rank`].
pub const RATING_RANK_EXPR: &str = "MAX(CASE \
     WHEN iv.id IS NULL THEN NULL \
     WHEN iv.rating = 'Critical' THEN 4 \
     WHEN iv.rating = 'High' THEN 3 \
     WHEN iv.rating = 'Medium' THEN 2 \
     WHEN iv.rating = 'Low' THEN 1 \
     ELSE 0 END)";

/// Decode an optional stored rating label.
pub fn rating_from_label(label: Option<String>) -> Option<Severity> {
    label.map(|l| Severity::from_label(&l))
}

/// Decode an effective severity rank as produced by [`RATING_RANK_EXPR`].
pub fn severity_from_rank(rank: Option<i64>) -> Option<Severity> {
    rank.map(Severity::from_rank)
}

/// Decode a stored issue-type label with a descriptive error.
pub fn parse_issue_type(label: &str, field_name: &str) -> StorageResult<IssueType> {
    IssueType::from_label(label).ok_or_else(|| {
        StorageError::SerializationError(format!("{field_name} has unknown label: {label}"))
    })
}

/// Render one ORDER BY term with NULL placement matching the in-process
/// comparator (absent values lowest: first ascending, last descending).
pub fn order_term(column: &str, direction: OrderDirection) -> String {
    match direction {
        OrderDirection::Asc => format!("{column} ASC NULLS FIRST"),
        OrderDirection::Desc => format!("{column} DESC NULLS LAST"),
    }
}

/// Fold `(effective rank, row count)` aggregation rows into a rollup.
pub fn fold_rank_counts(rows: impl IntoIterator<Item = (Option<i64>, i64)>) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for (rank, n) in rows {
        counts.add(severity_from_rank(rank), n);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: erreurs incluent le nom du champ pour debug
    #[test]
    fn test_issue_type_error_includes_field_name() {
        let err = parse_issue_type("Exploit", "issue.issue_type").unwrap_err();
        assert!(err.to_string().contains("issue.issue_type"));
        assert!(err.to_string().contains("Exploit"));
    }

    #[test]
    fn test_fold_rank_counts_buckets() {
        let counts = fold_rank_counts([(Some(4), 2), (Some(1), 1), (Some(0), 3), (None, 5)]);
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.low, 1);
        // Rated-none and unrated both land in the none bucket
        assert_eq!(counts.none, 8);
        assert_eq!(counts.total, 11);
    }

    #[test]
    fn test_order_term_null_placement() {
        assert_eq!(order_term("s.region", OrderDirection::Asc), "s.region ASC NULLS FIRST");
        assert_eq!(order_term("s.region", OrderDirection::Desc), "s.region DESC NULLS LAST");
    }
}
