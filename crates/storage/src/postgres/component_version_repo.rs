//! Component-version repository implementation for PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::ComponentVersion;
use vigil_core::ports::{
    ComponentVersionFilter, ComponentVersionOrderField, ComponentVersionRepository, OrderBy,
    RowComparator, RowWindow, Window,
};
use vigil_core::severity::SeverityCounts;

use super::database::Database;
use super::helpers::{fold_rank_counts, order_term, RATING_RANK_EXPR};

/// PostgreSQL implementation of ComponentVersionRepository.
pub struct PgComponentVersionRepository {
    pool: PgPool,
}

impl PgComponentVersionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Load severity rollups for a set of component versions: each
    /// distinct issue matched against any instance of a version
    /// contributes once, through its highest-rated variant.
    async fn severity_rollups(
        &self,
        version_ids: &[i64],
    ) -> StorageResult<HashMap<i64, SeverityCounts>> {
        if version_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            r#"
            SELECT per_issue.component_version_id, per_issue.rating_rank, COUNT(*)
            FROM (
                SELECT ci.component_version_id AS component_version_id, im.issue_id,
                       {RATING_RANK_EXPR} AS rating_rank
                FROM issue_matches im
                JOIN component_instances ci ON ci.id = im.component_instance_id
                LEFT JOIN issue_variants iv ON iv.issue_id = im.issue_id
                WHERE ci.component_version_id = ANY($1)
                GROUP BY ci.component_version_id, im.issue_id
            ) per_issue
            GROUP BY per_issue.component_version_id, per_issue.rating_rank
            "#
        );

        let rows: Vec<(i64, Option<i64>, i64)> = sqlx::query_as(&query)
            .bind(version_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut rollups: HashMap<i64, Vec<(Option<i64>, i64)>> = HashMap::new();
        for (version_id, rank, n) in rows {
            rollups.entry(version_id).or_default().push((rank, n));
        }

        Ok(rollups
            .into_iter()
            .map(|(id, ranks)| (id, fold_rank_counts(ranks)))
            .collect())
    }

    async fn with_rollups(&self, rows: Vec<VersionRow>) -> StorageResult<Vec<ComponentVersion>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut rollups = self.severity_rollups(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let counts = rollups.remove(&row.id).unwrap_or_default();
                row.into_version(counts)
            })
            .collect())
    }
}

#[async_trait]
impl ComponentVersionRepository for PgComponentVersionRepository {
    async fn get_component_version(&self, id: i64) -> StorageResult<Option<ComponentVersion>> {
        let row = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT id, version, tag, created_at, updated_at
            FROM component_versions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        match row {
            Some(row) => Ok(self.with_rollups(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_component_versions(
        &self,
        filter: &ComponentVersionFilter,
        order: &[OrderBy<ComponentVersionOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentVersion>> {
        let (where_clause, _) = build_where(filter);

        let count_query = format!("SELECT COUNT(*) FROM component_versions cv {where_clause}");
        let total: (i64,) = bind_filter(sqlx::query_as(&count_query), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        // Severity ranks live in aggregated variant data, not a column:
        // ranking by severity is applied in process after the rollup.
        if order.iter().any(|dim| dim.by.is_aggregate()) {
            let query = format!(
                r#"
                SELECT id, version, tag, created_at, updated_at
                FROM component_versions cv
                {where_clause}
                ORDER BY id ASC
                "#
            );
            let rows: Vec<VersionRow> = bind_filter(sqlx::query_as(&query), filter)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

            let mut versions = self.with_rollups(rows).await?;
            let comparator = RowComparator::new()
                .map_err(|e| StorageError::QueryError(format!("severity ranking unavailable: {e}")))?;
            comparator.sort(order, &mut versions);

            let rows = versions
                .into_iter()
                .skip(window.offset.max(0) as usize)
                .take(window.limit.max(0) as usize)
                .collect();
            return Ok(RowWindow {
                rows,
                total_count: total.0,
            });
        }

        let query = format!(
            r#"
            SELECT id, version, tag, created_at, updated_at
            FROM component_versions cv
            {where_clause}
            {order_clause}
            LIMIT {limit} OFFSET {offset}
            "#,
            order_clause = order_clause(order),
            limit = window.limit,
            offset = window.offset,
        );

        let rows: Vec<VersionRow> = bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(RowWindow {
            rows: self.with_rollups(rows).await?,
            total_count: total.0,
        })
    }
}

// =============================================================================
// Query building
// =============================================================================

/// Build the WHERE clause for a component-version filter.
///
/// SAFETY: column names and operators are hardcoded; values are bound
/// via `bind_filter` in the order numbered here.
fn build_where(filter: &ComponentVersionFilter) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut param_idx = 0;

    if filter.version.is_some() {
        param_idx += 1;
        conditions.push(format!("cv.version = ${param_idx}"));
    }
    if filter.tag.is_some() {
        param_idx += 1;
        conditions.push(format!("cv.tag = ${param_idx}"));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, param_idx)
}

fn bind_filter<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    filter: &'q ComponentVersionFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(ref version) = filter.version {
        query = query.bind(version);
    }
    if let Some(ref tag) = filter.tag {
        query = query.bind(tag);
    }
    query
}

/// ORDER BY clause for non-aggregate orderings.
fn order_clause(order: &[OrderBy<ComponentVersionOrderField>]) -> String {
    let mut terms: Vec<String> = order
        .iter()
        .filter_map(|dim| {
            let column = match dim.by {
                ComponentVersionOrderField::Version => "cv.version",
                ComponentVersionOrderField::CreatedAt => "cv.created_at",
                // Handled by the in-process ranking path.
                ComponentVersionOrderField::Severity => return None,
            };
            Some(order_term(column, dim.direction))
        })
        .collect();
    terms.push("cv.id ASC".to_string());
    format!("ORDER BY {}", terms.join(", "))
}

// =============================================================================
// Row mapping
// =============================================================================

/// Database row representation for ComponentVersion.
#[derive(sqlx::FromRow)]
struct VersionRow {
    id: i64,
    version: String,
    tag: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl VersionRow {
    fn into_version(self, severity_counts: SeverityCounts) -> ComponentVersion {
        ComponentVersion {
            id: self.id,
            version: self.version,
            tag: self.tag,
            severity_counts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
