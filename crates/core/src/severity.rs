//! Severity ratings and aggregate counts.
//!
//! A severity rollup reduces the issues associated with an entity into
//! five buckets plus a running total. Each distinct issue contributes
//! exactly once, through its highest-rated variant; issues without a
//! resolvable rating land in the `none` bucket. The rollup's ordering
//! ranks entities "worst severity profile first".

use serde::{Deserialize, Serialize};

// =============================================================================
// Severity
// =============================================================================

/// Severity rating of an issue, ordered from least to most severe.
///
/// The declaration order defines the rank: `None < Low < Medium < High <
/// Critical`, so `Ord` and [`Severity::rank`] agree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank used for ordering and SQL-side aggregation.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Severity::rank`]; out-of-range ranks map to the
    /// lowest rating.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            4 => Severity::Critical,
            3 => Severity::High,
            2 => Severity::Medium,
            1 => Severity::Low,
            _ => Severity::None,
        }
    }

    /// Decode a rating label as emitted by scanners and advisories.
    ///
    /// Unmapped labels fall into the lowest bucket rather than failing;
    /// upstream data sources are not trusted to agree on vocabulary.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Critical" => Severity::Critical,
            "High" => Severity::High,
            "Medium" => Severity::Medium,
            "Low" => Severity::Low,
            _ => Severity::None,
        }
    }

    /// Canonical label for this rating.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::None => "None",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// SeverityCounts
// =============================================================================

/// Five-bucket severity rollup with running total.
///
/// Invariant: `critical + high + medium + low + none == total`. The
/// accessors maintain it; construct counts through [`accumulate`] or
/// [`from_ratings`] rather than by hand.
///
/// [`accumulate`]: SeverityCounts::accumulate
/// [`from_ratings`]: SeverityCounts::from_ratings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub none: i64,
    pub total: i64,
}

impl SeverityCounts {
    /// Count one issue with the given effective rating.
    ///
    /// An issue with no resolvable rating (no variant, or an unmapped
    /// rating) increments `none`.
    pub fn accumulate(&mut self, rating: Option<Severity>) {
        self.add(rating, 1);
    }

    /// Count `n` issues sharing the given effective rating.
    ///
    /// Used when folding pre-grouped aggregation rows from storage.
    pub fn add(&mut self, rating: Option<Severity>, n: i64) {
        match rating.unwrap_or(Severity::None) {
            Severity::Critical => self.critical += n,
            Severity::High => self.high += n,
            Severity::Medium => self.medium += n,
            Severity::Low => self.low += n,
            Severity::None => self.none += n,
        }
        self.total += n;
    }

    /// Build a rollup from one effective rating per distinct issue.
    pub fn from_ratings(ratings: impl IntoIterator<Item = Option<Severity>>) -> Self {
        let mut counts = Self::default();
        for rating in ratings {
            counts.accumulate(rating);
        }
        counts
    }
}

/// Strict total order over rollups: lexicographic over the bucket vector
/// `(critical, high, medium, low, none)`. The first differing bucket,
/// compared as a plain integer, decides; all buckets equal compares
/// equal. Descending order therefore ranks "worst profile first".
impl Ord for SeverityCounts {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.critical, self.high, self.medium, self.low, self.none).cmp(&(
            other.critical,
            other.high,
            other.medium,
            other.low,
            other.none,
        ))
    }
}

impl PartialOrd for SeverityCounts {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(critical: i64, high: i64, medium: i64, low: i64, none: i64) -> SeverityCounts {
        SeverityCounts {
            critical,
            high,
            medium,
            low,
            none,
            total: critical + high + medium + low + none,
        }
    }

    // Test critique: l'invariant somme == total tient pour toute séquence
    #[test]
    fn accumulate_preserves_total_invariant() {
        let ratings = [
            Some(Severity::Critical),
            Some(Severity::High),
            Some(Severity::High),
            Some(Severity::None),
            None,
            Some(Severity::Low),
        ];
        let c = SeverityCounts::from_ratings(ratings);

        assert_eq!(c.critical, 1);
        assert_eq!(c.high, 2);
        assert_eq!(c.medium, 0);
        assert_eq!(c.low, 1);
        // Unrated and explicitly-None both land in the none bucket
        assert_eq!(c.none, 2);
        assert_eq!(c.total, 6);
        assert_eq!(c.critical + c.high + c.medium + c.low + c.none, c.total);
    }

    #[test]
    fn unmapped_label_falls_into_lowest_bucket() {
        assert_eq!(Severity::from_label("CRITICAL!!"), Severity::None);
        assert_eq!(Severity::from_label(""), Severity::None);
        assert_eq!(Severity::from_label("Critical"), Severity::Critical);
    }

    #[test]
    fn rank_roundtrip() {
        for s in [
            Severity::None,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::from_rank(s.rank() as i64), s);
        }
        assert_eq!(Severity::from_rank(99), Severity::None);
    }

    #[test]
    fn ordering_is_bucket_lexicographic() {
        // First differing bucket decides, regardless of later buckets
        assert!(counts(1, 0, 0, 0, 0) > counts(0, 9, 9, 9, 9));
        assert!(counts(2, 0, 0, 0, 0) > counts(1, 9, 9, 9, 9));
        assert!(counts(1, 3, 0, 0, 0) > counts(1, 2, 9, 9, 9));
        assert!(counts(0, 0, 0, 1, 0) > counts(0, 0, 0, 0, 5));
        assert_eq!(counts(1, 2, 3, 4, 5).cmp(&counts(1, 2, 3, 4, 5)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn ordering_is_transitive() {
        let a = counts(0, 1, 0, 0, 0);
        let b = counts(0, 0, 5, 0, 0);
        let c = counts(0, 0, 4, 9, 9);
        assert!(a > b);
        assert!(b > c);
        assert!(a > c);
    }
}
