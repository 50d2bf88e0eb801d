//! Multi-key ordering with locale-aware collation.
//!
//! Clients order list queries with a sequence of `(field, direction)`
//! dimensions. Dimensions are applied left to right; the first non-equal
//! dimension decides. Full equality always falls through to the primary
//! key ascending, so the resulting order is total and repeated
//! pagination of an unchanged data set never reorders rows.
//!
//! Text dimensions compare under ICU collation rather than byte order,
//! so case and diacritics sort the way a human expects. Enum dimensions
//! compare through fixed rank tables with unknown values at the lowest
//! rank. Severity dimensions compare whole rollup vectors.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;

use crate::error::{DomainError, DomainResult};
use crate::models::{ComponentInstance, ComponentVersion, Issue, Service};
use crate::severity::SeverityCounts;

// =============================================================================
// Order specification
// =============================================================================

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

/// One client-requested sort dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    pub by: F,
    pub direction: OrderDirection,
}

/// Value of a single ordering dimension extracted from a row.
#[derive(Debug, Clone, Copy)]
pub enum OrderValue<'a> {
    /// Locale-collated text; absent or empty sorts first.
    Text(Option<&'a str>),
    /// Plain integer.
    Int(i64),
    /// Timestamp; absent sorts first.
    Time(Option<DateTime<Utc>>),
    /// Fixed enum rank; unknown values map to the lowest rank upstream.
    Rank(u8),
    /// Severity rollup, compared by its bucket-lexicographic order.
    Counts(&'a SeverityCounts),
}

/// Rows that can be ordered by a client-chosen field list.
///
/// `id` is the stable unique identifier used for the mandatory final
/// tie-break.
pub trait Orderable {
    /// Per-entity order-field enum.
    type Field: Copy;

    /// Extract the value of one ordering dimension.
    fn order_value(&self, field: Self::Field) -> OrderValue<'_>;

    /// Stable unique identifier.
    fn id(&self) -> i64;
}

// =============================================================================
// Comparator
// =============================================================================

/// Locale-aware row comparator.
///
/// Construction loads collation data; build one per request (or per
/// sort) and reuse it across comparisons.
pub struct RowComparator {
    collator: Collator,
}

impl RowComparator {
    /// Build a comparator with the default collation locale.
    pub fn new() -> DomainResult<Self> {
        let collator = Collator::try_new(&locale!("en").into(), CollatorOptions::new())
            .map_err(|e| DomainError::Internal(format!("collator init: {e}")))?;
        Ok(Self { collator })
    }

    /// Total order over rows: the given dimensions left to right, then
    /// the identifier ascending.
    pub fn compare<R: Orderable>(&self, order: &[OrderBy<R::Field>], a: &R, b: &R) -> Ordering {
        for dim in order {
            let ord = self.compare_values(a.order_value(dim.by), b.order_value(dim.by));
            let ord = match dim.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id().cmp(&b.id())
    }

    /// Sort a row set in place under `order`.
    pub fn sort<R: Orderable>(&self, order: &[OrderBy<R::Field>], rows: &mut [R]) {
        rows.sort_by(|a, b| self.compare(order, a, b));
    }

    fn compare_values(&self, a: OrderValue<'_>, b: OrderValue<'_>) -> Ordering {
        match (a, b) {
            (OrderValue::Text(a), OrderValue::Text(b)) => match (normalize(a), normalize(b)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => self.collator.compare(x, y),
            },
            (OrderValue::Int(a), OrderValue::Int(b)) => a.cmp(&b),
            (OrderValue::Time(a), OrderValue::Time(b)) => a.cmp(&b),
            (OrderValue::Rank(a), OrderValue::Rank(b)) => a.cmp(&b),
            (OrderValue::Counts(a), OrderValue::Counts(b)) => a.cmp(b),
            // A dimension always extracts the same kind on both sides.
            _ => Ordering::Equal,
        }
    }
}

/// Empty text is indistinguishable from absent text for ordering.
fn normalize(value: Option<&str>) -> Option<&str> {
    match value {
        Some("") | None => None,
        some => some,
    }
}

// =============================================================================
// Per-entity order fields
// =============================================================================

/// Sortable fields of issue list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOrderField {
    PrimaryName,
    Severity,
    TargetRemediationDate,
    CreatedAt,
}

impl IssueOrderField {
    /// Parse a client-supplied field name.
    pub fn parse(name: &str) -> DomainResult<Self> {
        match name {
            "primaryName" => Ok(Self::PrimaryName),
            "severity" => Ok(Self::Severity),
            "targetRemediationDate" => Ok(Self::TargetRemediationDate),
            "createdAt" => Ok(Self::CreatedAt),
            other => Err(DomainError::InvalidOrderField(other.to_string())),
        }
    }
}

impl Orderable for Issue {
    type Field = IssueOrderField;

    fn order_value(&self, field: IssueOrderField) -> OrderValue<'_> {
        match field {
            IssueOrderField::PrimaryName => OrderValue::Text(Some(&self.primary_name)),
            IssueOrderField::Severity => {
                OrderValue::Rank(self.severity.map(|s| s.rank()).unwrap_or(0))
            }
            IssueOrderField::TargetRemediationDate => {
                OrderValue::Time(self.target_remediation_date)
            }
            IssueOrderField::CreatedAt => OrderValue::Time(Some(self.created_at)),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Sortable fields of service list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOrderField {
    Ccrn,
    Region,
    Severity,
    CreatedAt,
}

impl ServiceOrderField {
    /// Parse a client-supplied field name.
    pub fn parse(name: &str) -> DomainResult<Self> {
        match name {
            "ccrn" => Ok(Self::Ccrn),
            "region" => Ok(Self::Region),
            "severity" => Ok(Self::Severity),
            "createdAt" => Ok(Self::CreatedAt),
            other => Err(DomainError::InvalidOrderField(other.to_string())),
        }
    }

    /// Whether this field orders by the aggregated severity rollup.
    ///
    /// Rollup ranks are not row columns; storage adapters rank these in
    /// process after aggregation.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Severity)
    }
}

impl Orderable for Service {
    type Field = ServiceOrderField;

    fn order_value(&self, field: ServiceOrderField) -> OrderValue<'_> {
        match field {
            ServiceOrderField::Ccrn => OrderValue::Text(Some(&self.ccrn)),
            ServiceOrderField::Region => OrderValue::Text(self.region.as_deref()),
            ServiceOrderField::Severity => OrderValue::Counts(&self.severity_counts),
            ServiceOrderField::CreatedAt => OrderValue::Time(Some(self.created_at)),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Sortable fields of component-instance list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentInstanceOrderField {
    Ccrn,
    Region,
    Cluster,
    Namespace,
    Type,
    Count,
    CreatedAt,
}

impl ComponentInstanceOrderField {
    /// Parse a client-supplied field name.
    pub fn parse(name: &str) -> DomainResult<Self> {
        match name {
            "ccrn" => Ok(Self::Ccrn),
            "region" => Ok(Self::Region),
            "cluster" => Ok(Self::Cluster),
            "namespace" => Ok(Self::Namespace),
            "type" => Ok(Self::Type),
            "count" => Ok(Self::Count),
            "createdAt" => Ok(Self::CreatedAt),
            other => Err(DomainError::InvalidOrderField(other.to_string())),
        }
    }
}

impl Orderable for ComponentInstance {
    type Field = ComponentInstanceOrderField;

    fn order_value(&self, field: ComponentInstanceOrderField) -> OrderValue<'_> {
        match field {
            ComponentInstanceOrderField::Ccrn => OrderValue::Text(Some(&self.ccrn)),
            ComponentInstanceOrderField::Region => OrderValue::Text(self.region.as_deref()),
            ComponentInstanceOrderField::Cluster => OrderValue::Text(self.cluster.as_deref()),
            ComponentInstanceOrderField::Namespace => OrderValue::Text(self.namespace.as_deref()),
            ComponentInstanceOrderField::Type => OrderValue::Rank(self.instance_type.rank()),
            ComponentInstanceOrderField::Count => OrderValue::Int(self.count as i64),
            ComponentInstanceOrderField::CreatedAt => OrderValue::Time(Some(self.created_at)),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Sortable fields of component-version list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentVersionOrderField {
    Version,
    Severity,
    CreatedAt,
}

impl ComponentVersionOrderField {
    /// Parse a client-supplied field name.
    pub fn parse(name: &str) -> DomainResult<Self> {
        match name {
            "version" => Ok(Self::Version),
            "severity" => Ok(Self::Severity),
            "createdAt" => Ok(Self::CreatedAt),
            other => Err(DomainError::InvalidOrderField(other.to_string())),
        }
    }

    /// Whether this field orders by the aggregated severity rollup.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Severity)
    }
}

impl Orderable for ComponentVersion {
    type Field = ComponentVersionOrderField;

    fn order_value(&self, field: ComponentVersionOrderField) -> OrderValue<'_> {
        match field {
            ComponentVersionOrderField::Version => OrderValue::Text(Some(&self.version)),
            ComponentVersionOrderField::Severity => OrderValue::Counts(&self.severity_counts),
            ComponentVersionOrderField::CreatedAt => OrderValue::Time(Some(self.created_at)),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentInstanceType, IssueType};
    use crate::severity::Severity;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn service(id: i64, ccrn: &str, region: Option<&str>) -> Service {
        Service {
            id,
            ccrn: ccrn.to_string(),
            region: region.map(str::to_string),
            severity_counts: SeverityCounts::default(),
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_000),
        }
    }

    fn instance(id: i64, instance_type: ComponentInstanceType) -> ComponentInstance {
        ComponentInstance {
            id,
            ccrn: format!("instance-{id}"),
            region: None,
            cluster: None,
            namespace: None,
            instance_type,
            count: 1,
            service_id: None,
            component_version_id: None,
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_000),
        }
    }

    fn issue(id: i64, name: &str, remediation: Option<i64>) -> Issue {
        Issue {
            id,
            primary_name: name.to_string(),
            issue_type: IssueType::Vulnerability,
            description: String::new(),
            severity: None,
            target_remediation_date: remediation.map(ts),
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_000),
        }
    }

    #[test]
    fn text_ordering_is_locale_aware() {
        let cmp = RowComparator::new().unwrap();
        let order = [OrderBy {
            by: ServiceOrderField::Ccrn,
            direction: OrderDirection::Asc,
        }];

        // Byte order would put "Banana" before "apple" and "Ärger" last
        let mut rows = vec![
            service(1, "Osten", None),
            service(2, "Ärger", None),
            service(3, "apple", None),
            service(4, "Banana", None),
        ];
        cmp.sort(&order, &mut rows);

        let ccrns: Vec<&str> = rows.iter().map(|s| s.ccrn.as_str()).collect();
        assert_eq!(ccrns, ["apple", "Ärger", "Banana", "Osten"]);
    }

    #[test]
    fn absent_and_empty_text_sort_first() {
        let cmp = RowComparator::new().unwrap();
        let order = [OrderBy {
            by: ServiceOrderField::Region,
            direction: OrderDirection::Asc,
        }];

        let mut rows = vec![
            service(1, "a", Some("eu-de-1")),
            service(2, "b", None),
            service(3, "c", Some("")),
            service(4, "d", Some("ap-jp-2")),
        ];
        cmp.sort(&order, &mut rows);

        // None and "" are equivalent and land before any region, ordered
        // between themselves by id
        let ids: Vec<i64> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, [2, 3, 4, 1]);
    }

    #[test]
    fn enum_rank_ordering_with_unknown_lowest() {
        let cmp = RowComparator::new().unwrap();
        let order = [OrderBy {
            by: ComponentInstanceOrderField::Type,
            direction: OrderDirection::Asc,
        }];

        let mut rows = vec![
            instance(1, ComponentInstanceType::User),
            instance(2, ComponentInstanceType::Unknown),
            instance(3, ComponentInstanceType::Project),
        ];
        cmp.sort(&order, &mut rows);

        let ids: Vec<i64> = rows.iter().map(|i| i.id).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn composite_order_with_identifier_tie_break() {
        let cmp = RowComparator::new().unwrap();
        let order = [
            OrderBy {
                by: IssueOrderField::PrimaryName,
                direction: OrderDirection::Asc,
            },
            OrderBy {
                by: IssueOrderField::TargetRemediationDate,
                direction: OrderDirection::Desc,
            },
        ];

        let mut rows = vec![
            issue(4, "CVE-2024-0001", Some(100)),
            issue(1, "CVE-2024-0002", None),
            issue(3, "CVE-2024-0001", Some(200)),
            issue(2, "CVE-2024-0001", Some(200)),
        ];
        cmp.sort(&order, &mut rows);

        // Name decides first; later remediation dates first within a name;
        // equal dates fall through to id ascending
        let ids: Vec<i64> = rows.iter().map(|i| i.id).collect();
        assert_eq!(ids, [2, 3, 4, 1]);
    }

    #[test]
    fn severity_rollup_ranking_worst_first() {
        let cmp = RowComparator::new().unwrap();
        let order = [OrderBy {
            by: ServiceOrderField::Severity,
            direction: OrderDirection::Desc,
        }];

        let mut critical = service(5, "critical", None);
        critical.severity_counts.add(Some(Severity::Critical), 1);
        let mut high = service(2, "high", None);
        high.severity_counts.add(Some(Severity::High), 3);
        let mut high_twin = service(1, "high-twin", None);
        high_twin.severity_counts.add(Some(Severity::High), 3);
        let clean = service(9, "clean", None);

        let mut rows = vec![high, clean, critical, high_twin];
        cmp.sort(&order, &mut rows);

        // One critical outranks any number of highs; equal rollups break
        // ties by id ascending
        let ids: Vec<i64> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, [5, 1, 2, 9]);
    }

    #[test]
    fn empty_order_falls_back_to_identifier() {
        let cmp = RowComparator::new().unwrap();
        let order: [OrderBy<ServiceOrderField>; 0] = [];

        let mut rows = vec![service(3, "c", None), service(1, "a", None), service(2, "b", None)];
        cmp.sort(&order, &mut rows);

        let ids: Vec<i64> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn unknown_order_field_is_rejected() {
        let err = IssueOrderField::parse("severty").unwrap_err();
        assert_eq!(err.to_string(), "unsupported order field: severty");
        assert!(ServiceOrderField::parse("ccrn").is_ok());
    }
}
