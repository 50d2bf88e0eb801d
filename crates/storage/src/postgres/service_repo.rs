//! Service repository implementation for PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::Service;
use vigil_core::ports::{
    OrderBy, RowComparator, RowWindow, ServiceFilter, ServiceOrderField, ServiceRepository, Window,
};
use vigil_core::severity::SeverityCounts;

use super::database::Database;
use super::helpers::{fold_rank_counts, order_term, RATING_RANK_EXPR};

/// PostgreSQL implementation of ServiceRepository.
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Load severity rollups for a set of services.
    ///
    /// Each distinct issue matched against any instance of a service
    /// contributes once, through its highest-rated variant.
    async fn severity_rollups(
        &self,
        service_ids: &[i64],
    ) -> StorageResult<HashMap<i64, SeverityCounts>> {
        if service_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            r#"
            SELECT per_issue.service_id, per_issue.rating_rank, COUNT(*)
            FROM (
                SELECT ci.service_id AS service_id, im.issue_id,
                       {RATING_RANK_EXPR} AS rating_rank
                FROM issue_matches im
                JOIN component_instances ci ON ci.id = im.component_instance_id
                LEFT JOIN issue_variants iv ON iv.issue_id = im.issue_id
                WHERE ci.service_id = ANY($1)
                GROUP BY ci.service_id, im.issue_id
            ) per_issue
            GROUP BY per_issue.service_id, per_issue.rating_rank
            "#
        );

        let rows: Vec<(i64, Option<i64>, i64)> = sqlx::query_as(&query)
            .bind(service_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut rollups: HashMap<i64, Vec<(Option<i64>, i64)>> = HashMap::new();
        for (service_id, rank, n) in rows {
            rollups.entry(service_id).or_default().push((rank, n));
        }

        Ok(rollups
            .into_iter()
            .map(|(id, ranks)| (id, fold_rank_counts(ranks)))
            .collect())
    }

    /// Attach rollups to loaded service rows.
    async fn with_rollups(&self, rows: Vec<ServiceRow>) -> StorageResult<Vec<Service>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut rollups = self.severity_rollups(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let counts = rollups.remove(&row.id).unwrap_or_default();
                row.into_service(counts)
            })
            .collect())
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn get_service(&self, id: i64) -> StorageResult<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, ccrn, region, created_at, updated_at
            FROM services
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

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        order: &[OrderBy<ServiceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Service>> {
        let (where_clause, _) = build_where(filter);

        let count_query = format!("SELECT COUNT(*) FROM services s {where_clause}");
        let total: (i64,) = bind_filter(sqlx::query_as(&count_query), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        // Severity ranks live in aggregated variant data, not a column:
        // ranking by severity is applied in process after the rollup.
        if order.iter().any(|dim| dim.by.is_aggregate()) {
            let query = format!(
                r#"
                SELECT id, ccrn, region, created_at, updated_at
                FROM services s
                {where_clause}
                ORDER BY id ASC
                "#
            );
            let rows: Vec<ServiceRow> = bind_filter(sqlx::query_as(&query), filter)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

            let mut services = self.with_rollups(rows).await?;
            let comparator = RowComparator::new()
                .map_err(|e| StorageError::QueryError(format!("severity ranking unavailable: {e}")))?;
            comparator.sort(order, &mut services);

            let rows = services
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
            SELECT id, ccrn, region, created_at, updated_at
            FROM services s
            {where_clause}
            {order_clause}
            LIMIT {limit} OFFSET {offset}
            "#,
            order_clause = order_clause(order),
            limit = window.limit,
            offset = window.offset,
        );

        let rows: Vec<ServiceRow> = bind_filter(sqlx::query_as(&query), filter)
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

/// Build the WHERE clause for a service filter.
///
/// SAFETY: column names and operators are hardcoded; values are bound
/// via `bind_filter` in the order numbered here.
fn build_where(filter: &ServiceFilter) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut param_idx = 0;

    if filter.ccrn.is_some() {
        param_idx += 1;
        conditions.push(format!("s.ccrn = ${param_idx}"));
    }
    if filter.region.is_some() {
        param_idx += 1;
        conditions.push(format!("s.region = ${param_idx}"));
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
    filter: &'q ServiceFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(ref ccrn) = filter.ccrn {
        query = query.bind(ccrn);
    }
    if let Some(ref region) = filter.region {
        query = query.bind(region);
    }
    query
}

/// ORDER BY clause for non-aggregate orderings.
fn order_clause(order: &[OrderBy<ServiceOrderField>]) -> String {
    let mut terms: Vec<String> = order
        .iter()
        .filter_map(|dim| {
            let column = match dim.by {
                ServiceOrderField::Ccrn => "s.ccrn",
                ServiceOrderField::Region => "s.region",
                ServiceOrderField::CreatedAt => "s.created_at",
                // Handled by the in-process ranking path.
                ServiceOrderField::Severity => return None,
            };
            Some(order_term(column, dim.direction))
        })
        .collect();
    terms.push("s.id ASC".to_string());
    format!("ORDER BY {}", terms.join(", "))
}

// =============================================================================
// Row mapping
// =============================================================================

/// Database row representation for Service.
#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    ccrn: String,
    region: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ServiceRow {
    fn into_service(self, severity_counts: SeverityCounts) -> Service {
        Service {
            id: self.id,
            ccrn: self.ccrn,
            region: self.region,
            severity_counts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
