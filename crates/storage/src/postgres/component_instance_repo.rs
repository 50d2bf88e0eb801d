//! Component-instance repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::{ComponentInstance, ComponentInstanceType};
use vigil_core::ports::{
    ComponentInstanceFilter, ComponentInstanceOrderField, ComponentInstanceRepository, OrderBy,
    RowWindow, Window,
};

use super::database::Database;
use super::helpers::order_term;

/// SQL expression ranking instance types, in lockstep with
/// [`ComponentInstanceType::rank`].
const TYPE_RANK_EXPR: &str = "CASE ci.instance_type \
     WHEN 'Project' THEN 1 \
     WHEN 'Server' THEN 2 \
     WHEN 'SecurityGroup' THEN 3 \
     WHEN 'DnsZone' THEN 4 \
     WHEN 'FloatingIp' THEN 5 \
     WHEN 'RbacPolicy' THEN 6 \
     WHEN 'User' THEN 7 \
     ELSE 0 END";

/// PostgreSQL implementation of ComponentInstanceRepository.
pub struct PgComponentInstanceRepository {
    pool: PgPool,
}

impl PgComponentInstanceRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl ComponentInstanceRepository for PgComponentInstanceRepository {
    async fn get_component_instance(&self, id: i64) -> StorageResult<Option<ComponentInstance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, ccrn, region, cluster, namespace, instance_type,
                   count, service_id, component_version_id, created_at, updated_at
            FROM component_instances
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.map(InstanceRow::into_instance))
    }

    async fn list_component_instances(
        &self,
        filter: &ComponentInstanceFilter,
        order: &[OrderBy<ComponentInstanceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentInstance>> {
        let (where_clause, _) = build_where(filter);

        let count_query = format!("SELECT COUNT(*) FROM component_instances ci {where_clause}");
        let total: (i64,) = bind_filter(sqlx::query_as(&count_query), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let query = format!(
            r#"
            SELECT ci.id, ci.ccrn, ci.region, ci.cluster, ci.namespace, ci.instance_type,
                   ci.count, ci.service_id, ci.component_version_id, ci.created_at, ci.updated_at
            FROM component_instances ci
            {where_clause}
            {order_clause}
            LIMIT {limit} OFFSET {offset}
            "#,
            order_clause = order_clause(order),
            limit = window.limit,
            offset = window.offset,
        );

        let rows: Vec<InstanceRow> = bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(RowWindow {
            rows: rows.into_iter().map(InstanceRow::into_instance).collect(),
            total_count: total.0,
        })
    }
}

// =============================================================================
// Query building
// =============================================================================

/// Build the WHERE clause for a component-instance filter.
///
/// SAFETY: column names and operators are hardcoded; values are bound
/// via `bind_filter` in the order numbered here.
fn build_where(filter: &ComponentInstanceFilter) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut param_idx = 0;
    let mut push = |condition: &str| {
        param_idx += 1;
        conditions.push(format!("{condition} = ${param_idx}"));
    };

    if filter.ccrn.is_some() {
        push("ci.ccrn");
    }
    if filter.region.is_some() {
        push("ci.region");
    }
    if filter.cluster.is_some() {
        push("ci.cluster");
    }
    if filter.namespace.is_some() {
        push("ci.namespace");
    }
    if filter.instance_type.is_some() {
        push("ci.instance_type");
    }
    if filter.service_id.is_some() {
        push("ci.service_id");
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
    filter: &'q ComponentInstanceFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(ref ccrn) = filter.ccrn {
        query = query.bind(ccrn);
    }
    if let Some(ref region) = filter.region {
        query = query.bind(region);
    }
    if let Some(ref cluster) = filter.cluster {
        query = query.bind(cluster);
    }
    if let Some(ref namespace) = filter.namespace {
        query = query.bind(namespace);
    }
    if let Some(instance_type) = filter.instance_type {
        query = query.bind(instance_type.label());
    }
    if let Some(service_id) = filter.service_id {
        query = query.bind(service_id);
    }
    query
}

/// Render the ORDER BY clause, ranking instance types through their
/// fixed table.
fn order_clause(order: &[OrderBy<ComponentInstanceOrderField>]) -> String {
    let mut terms: Vec<String> = order
        .iter()
        .map(|dim| {
            let column = match dim.by {
                ComponentInstanceOrderField::Ccrn => "ci.ccrn",
                ComponentInstanceOrderField::Region => "ci.region",
                ComponentInstanceOrderField::Cluster => "ci.cluster",
                ComponentInstanceOrderField::Namespace => "ci.namespace",
                ComponentInstanceOrderField::Type => TYPE_RANK_EXPR,
                ComponentInstanceOrderField::Count => "ci.count",
                ComponentInstanceOrderField::CreatedAt => "ci.created_at",
            };
            order_term(column, dim.direction)
        })
        .collect();
    terms.push("ci.id ASC".to_string());
    format!("ORDER BY {}", terms.join(", "))
}

// =============================================================================
// Row mapping
// =============================================================================

/// Database row representation for ComponentInstance.
#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: i64,
    ccrn: String,
    region: Option<String>,
    cluster: Option<String>,
    namespace: Option<String>,
    instance_type: String,
    count: i32,
    service_id: Option<i64>,
    component_version_id: Option<i64>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl InstanceRow {
    fn into_instance(self) -> ComponentInstance {
        ComponentInstance {
            id: self.id,
            ccrn: self.ccrn,
            region: self.region,
            cluster: self.cluster,
            namespace: self.namespace,
            // Unmapped labels degrade to Unknown rather than failing the row
            instance_type: ComponentInstanceType::from_label(&self.instance_type),
            count: self.count,
            service_id: self.service_id,
            component_version_id: self.component_version_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::ports::OrderDirection;

    #[test]
    fn type_ordering_uses_rank_expression() {
        let order = [OrderBy {
            by: ComponentInstanceOrderField::Type,
            direction: OrderDirection::Asc,
        }];
        let clause = order_clause(&order);
        assert!(clause.contains("CASE ci.instance_type"));
        assert!(clause.ends_with("ci.id ASC"));
    }

    #[test]
    fn where_clause_composes_all_filters() {
        let filter = ComponentInstanceFilter {
            ccrn: Some("x".into()),
            region: Some("eu-de-1".into()),
            cluster: None,
            namespace: None,
            instance_type: Some(ComponentInstanceType::Server),
            service_id: Some(7),
        };
        let (clause, params) = build_where(&filter);
        assert_eq!(
            clause,
            "WHERE ci.ccrn = $1 AND ci.region = $2 AND ci.instance_type = $3 AND ci.service_id = $4"
        );
        assert_eq!(params, 4);
    }
}
