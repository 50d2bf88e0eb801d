//! Issue repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::{Issue, IssueVariant};
use vigil_core::ports::{
    IssueFilter, IssueOrderField, IssueRepository, IssueTypeCounts, OrderBy, RowWindow, Window,
};
use vigil_core::severity::SeverityCounts;

use super::database::Database;
use super::helpers::{
    fold_rank_counts, order_term, parse_issue_type, rating_from_label, severity_from_rank,
    RATING_RANK_EXPR,
};

/// PostgreSQL implementation of IssueRepository.
pub struct PgIssueRepository {
    pool: PgPool,
}

impl PgIssueRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl IssueRepository for PgIssueRepository {
    async fn get_issue(&self, id: i64) -> StorageResult<Option<Issue>> {
        let query = format!(
            r#"
            SELECT i.id, i.primary_name, i.issue_type, i.description,
                   i.target_remediation_date, i.created_at, i.updated_at,
                   {RATING_RANK_EXPR} AS rating_rank
            FROM issues i
            LEFT JOIN issue_variants iv ON iv.issue_id = i.id
            WHERE i.id = $1
            GROUP BY i.id
            "#
        );

        let row = sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(IssueRow::into_issue).transpose()
    }

    async fn list_issues(
        &self,
        filter: &IssueFilter,
        order: &[OrderBy<IssueOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Issue>> {
        let (where_clause, _) = build_where(filter);

        // Total count first; the window query can come back empty for an
        // out-of-range offset while the total stays meaningful.
        let count_query = format!("SELECT COUNT(*) FROM issues i {where_clause}");
        let total: (i64,) = bind_filter(sqlx::query_as(&count_query), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let query = format!(
            r#"
            SELECT i.id, i.primary_name, i.issue_type, i.description,
                   i.target_remediation_date, i.created_at, i.updated_at,
                   {RATING_RANK_EXPR} AS rating_rank
            FROM issues i
            LEFT JOIN issue_variants iv ON iv.issue_id = i.id
            {where_clause}
            GROUP BY i.id
            {order_clause}
            LIMIT {limit} OFFSET {offset}
            "#,
            order_clause = order_clause(order),
            limit = window.limit,
            offset = window.offset,
        );

        let rows: Vec<IssueRow> = bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let issues = rows
            .into_iter()
            .map(IssueRow::into_issue)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(RowWindow {
            rows: issues,
            total_count: total.0,
        })
    }

    async fn list_variants(&self, issue_id: i64) -> StorageResult<Vec<IssueVariant>> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT id, issue_id, secondary_name, rating, created_at
            FROM issue_variants
            WHERE issue_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(rows.into_iter().map(VariantRow::into_variant).collect())
    }

    async fn issue_type_counts(&self, filter: &IssueFilter) -> StorageResult<IssueTypeCounts> {
        let (where_clause, _) = build_where(filter);
        let query =
            format!("SELECT i.issue_type, COUNT(*) FROM issues i {where_clause} GROUP BY i.issue_type");

        let rows: Vec<(String, i64)> = bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut counts = IssueTypeCounts::default();
        for (label, n) in rows {
            match parse_issue_type(&label, "issue.issue_type")? {
                vigil_core::models::IssueType::Vulnerability => counts.vulnerability_count = n,
                vigil_core::models::IssueType::PolicyViolation => counts.policy_violation_count = n,
                vigil_core::models::IssueType::SecurityEvent => counts.security_event_count = n,
            }
        }
        Ok(counts)
    }

    async fn issue_severity_counts(
        &self,
        filter: &IssueFilter,
    ) -> StorageResult<SeverityCounts> {
        let (where_clause, _) = build_where(filter);
        let query = format!(
            r#"
            SELECT per_issue.rating_rank, COUNT(*)
            FROM (
                SELECT i.id, {RATING_RANK_EXPR} AS rating_rank
                FROM issues i
                LEFT JOIN issue_variants iv ON iv.issue_id = i.id
                {where_clause}
                GROUP BY i.id
            ) per_issue
            GROUP BY per_issue.rating_rank
            "#
        );

        let rows: Vec<(Option<i64>, i64)> = bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(fold_rank_counts(rows))
    }
}

// =============================================================================
// Query building
// =============================================================================

/// Build the WHERE clause for an issue filter.
///
/// SAFETY: safe from injection because column names and operators are
/// hardcoded; all values are bound separately via $1, $2, ... in the
/// order produced here (see `bind_filter`).
fn build_where(filter: &IssueFilter) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut param_idx = 0;

    if filter.primary_name.is_some() {
        param_idx += 1;
        conditions.push(format!("i.primary_name = ${param_idx}"));
    }
    if filter.issue_type.is_some() {
        param_idx += 1;
        conditions.push(format!("i.issue_type = ${param_idx}"));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, param_idx)
}

/// Bind filter values in the order `build_where` numbered them.
fn bind_filter<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    filter: &'q IssueFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(ref name) = filter.primary_name {
        query = query.bind(name);
    }
    if let Some(issue_type) = filter.issue_type {
        query = query.bind(issue_type.label());
    }
    query
}

/// Render the ORDER BY clause: client dimensions left to right, then the
/// mandatory identifier tie-break.
fn order_clause(order: &[OrderBy<IssueOrderField>]) -> String {
    let mut terms: Vec<String> = order
        .iter()
        .map(|dim| {
            let column = match dim.by {
                IssueOrderField::PrimaryName => "i.primary_name",
                IssueOrderField::Severity => "rating_rank",
                IssueOrderField::TargetRemediationDate => "i.target_remediation_date",
                IssueOrderField::CreatedAt => "i.created_at",
            };
            order_term(column, dim.direction)
        })
        .collect();
    terms.push("i.id ASC".to_string());
    format!("ORDER BY {}", terms.join(", "))
}

// =============================================================================
// Row mapping
// =============================================================================

/// Database row representation for Issue.
#[derive(sqlx::FromRow)]
struct IssueRow {
    id: i64,
    primary_name: String,
    issue_type: String,
    description: String,
    target_remediation_date: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    rating_rank: Option<i64>,
}

impl IssueRow {
    fn into_issue(self) -> StorageResult<Issue> {
        Ok(Issue {
            id: self.id,
            primary_name: self.primary_name,
            issue_type: parse_issue_type(&self.issue_type, "issue.issue_type")?,
            description: self.description,
            severity: severity_from_rank(self.rating_rank),
            target_remediation_date: self.target_remediation_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Database row representation for IssueVariant.
#[derive(sqlx::FromRow)]
struct VariantRow {
    id: i64,
    issue_id: i64,
    secondary_name: String,
    rating: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl VariantRow {
    fn into_variant(self) -> IssueVariant {
        IssueVariant {
            id: self.id,
            issue_id: self.issue_id,
            secondary_name: self.secondary_name,
            rating: rating_from_label(self.rating),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::models::IssueType;
    use vigil_core::ports::OrderDirection;

    #[test]
    fn where_clause_numbers_params_in_bind_order() {
        let filter = IssueFilter {
            primary_name: Some("CVE-2024-0001".into()),
            issue_type: Some(IssueType::Vulnerability),
        };
        let (clause, params) = build_where(&filter);
        assert_eq!(clause, "WHERE i.primary_name = $1 AND i.issue_type = $2");
        assert_eq!(params, 2);

        let (clause, params) = build_where(&IssueFilter::default());
        assert_eq!(clause, "");
        assert_eq!(params, 0);
    }

    #[test]
    fn order_clause_appends_identifier_tie_break() {
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
        assert_eq!(
            order_clause(&order),
            "ORDER BY i.primary_name ASC NULLS FIRST, \
             i.target_remediation_date DESC NULLS LAST, i.id ASC"
        );
        assert_eq!(order_clause(&[]), "ORDER BY i.id ASC");
    }
}
