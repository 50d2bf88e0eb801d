//! GraphQL schema definition.
//!
//! This module provides the query root for the tracker: per entity, a
//! by-id getter and a paginated list query taking inline filter
//! arguments, a page size (`first`), a resume cursor (`after`) and a
//! client-chosen ordering (`orderBy`).
//!
//! Admission control (batch/depth limits) runs in the HTTP layer before
//! execution; the built-in schema limiters are deliberately not
//! installed so that rejection semantics live in one place.

use std::sync::Arc;
use std::time::Instant;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};

use vigil_core::error::DomainResult;
use vigil_core::metrics;
use vigil_core::ports::{
    decode_after, ComponentInstanceFilter, ComponentInstanceOrderField, ComponentVersionFilter,
    ComponentVersionOrderField, Connection, Cursor, IssueFilter, IssueOrderField, OrderBy,
    Repositories, ServiceFilter, ServiceOrderField, Window,
};

use crate::types::{
    ComponentInstance, ComponentInstanceConnection, ComponentInstanceType, ComponentVersion,
    ComponentVersionConnection, Issue, IssueConnection, IssueType, IssueVariant, OrderByInput,
    Service, ServiceConnection, VigilSchema,
};

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the GraphQL schema over a repository aggregate.
pub fn build_schema<R: Repositories + 'static>(repositories: Arc<R>) -> VigilSchema {
    let repos: Arc<dyn Repositories> = repositories;
    Schema::build(CoreQuery, EmptyMutation, EmptySubscription)
        .data(repos)
        .finish()
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Maximum page size for pagination.
const MAX_PAGE_SIZE: i32 = 100;
/// Default page size for pagination.
const DEFAULT_PAGE_SIZE: i32 = 20;

/// Validate and normalize pagination first parameter.
fn validate_pagination_first(first: Option<i32>) -> i32 {
    first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Decode the request cursor into a row offset.
fn decode_offset(after: Option<String>) -> Result<i64> {
    let cursor = after.map(|value| Cursor { value });
    Ok(decode_after(cursor.as_ref())?)
}

/// Parse client order inputs against an entity's sortable fields.
///
/// An unknown field name is a validation error surfaced before any
/// storage access.
fn parse_order<F>(
    order_by: Option<Vec<OrderByInput>>,
    parse: impl Fn(&str) -> DomainResult<F>,
) -> Result<Vec<OrderBy<F>>> {
    order_by
        .unwrap_or_default()
        .into_iter()
        .map(|input| {
            Ok(OrderBy {
                by: parse(&input.by)?,
                direction: input.direction.into(),
            })
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Core Query
// -----------------------------------------------------------------------------

/// Query root for the tracker.
#[derive(Default)]
pub struct CoreQuery;

#[Object]
impl CoreQuery {
    /// Get an issue by id.
    async fn issue<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<Option<Issue>> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let issue = repos.issues().get_issue(id).await?;
        Ok(issue.map(Issue::from))
    }

    /// List issues with pagination, filtering and ordering.
    async fn issues<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default = 20)] first: Option<i32>,
        after: Option<String>,
        primary_name: Option<String>,
        issue_type: Option<IssueType>,
        order_by: Option<Vec<OrderByInput>>,
    ) -> Result<IssueConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let started = Instant::now();

        let filter = IssueFilter {
            primary_name,
            issue_type: issue_type.map(Into::into),
        };
        let page_size = validate_pagination_first(first) as i64;
        let offset = decode_offset(after)?;
        let order = parse_order(order_by, IssueOrderField::parse)?;

        let window = repos
            .issues()
            .list_issues(&filter, &order, Window { offset, limit: page_size })
            .await?;
        let severity_counts = repos.issues().issue_severity_counts(&filter).await?;
        let type_counts = repos.issues().issue_type_counts(&filter).await?;

        let connection = Connection::from_window(window.rows, window.total_count, page_size, offset);

        metrics::record_list_query_duration("issues", started.elapsed().as_secs_f64());
        Ok(IssueConnection::from_parts(connection, severity_counts, type_counts))
    }

    /// List the variants of one issue.
    async fn issue_variants<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        issue_id: i64,
    ) -> Result<Vec<IssueVariant>> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let variants = repos.issues().list_variants(issue_id).await?;
        Ok(variants.into_iter().map(IssueVariant::from).collect())
    }

    /// Get a service by id.
    async fn service<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<Option<Service>> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let service = repos.services().get_service(id).await?;
        Ok(service.map(Service::from))
    }

    /// List services with pagination, filtering and ordering.
    async fn services<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default = 20)] first: Option<i32>,
        after: Option<String>,
        ccrn: Option<String>,
        region: Option<String>,
        order_by: Option<Vec<OrderByInput>>,
    ) -> Result<ServiceConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let started = Instant::now();

        let filter = ServiceFilter { ccrn, region };
        let page_size = validate_pagination_first(first) as i64;
        let offset = decode_offset(after)?;
        let order = parse_order(order_by, ServiceOrderField::parse)?;

        let window = repos
            .services()
            .list_services(&filter, &order, Window { offset, limit: page_size })
            .await?;

        let connection = Connection::from_window(window.rows, window.total_count, page_size, offset);

        metrics::record_list_query_duration("services", started.elapsed().as_secs_f64());
        Ok(ServiceConnection::from(connection))
    }

    /// Get a component instance by id.
    async fn component_instance<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        id: i64,
    ) -> Result<Option<ComponentInstance>> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let instance = repos.component_instances().get_component_instance(id).await?;
        Ok(instance.map(ComponentInstance::from))
    }

    /// List component instances with pagination, filtering and ordering.
    #[allow(clippy::too_many_arguments)]
    async fn component_instances<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default = 20)] first: Option<i32>,
        after: Option<String>,
        ccrn: Option<String>,
        region: Option<String>,
        cluster: Option<String>,
        namespace: Option<String>,
        instance_type: Option<ComponentInstanceType>,
        service_id: Option<i64>,
        order_by: Option<Vec<OrderByInput>>,
    ) -> Result<ComponentInstanceConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let started = Instant::now();

        let filter = ComponentInstanceFilter {
            ccrn,
            region,
            cluster,
            namespace,
            instance_type: instance_type.map(Into::into),
            service_id,
        };
        let page_size = validate_pagination_first(first) as i64;
        let offset = decode_offset(after)?;
        let order = parse_order(order_by, ComponentInstanceOrderField::parse)?;

        let window = repos
            .component_instances()
            .list_component_instances(&filter, &order, Window { offset, limit: page_size })
            .await?;

        let connection = Connection::from_window(window.rows, window.total_count, page_size, offset);

        metrics::record_list_query_duration("component_instances", started.elapsed().as_secs_f64());
        Ok(ComponentInstanceConnection::from(connection))
    }

    /// Get a component version by id.
    async fn component_version<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        id: i64,
    ) -> Result<Option<ComponentVersion>> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let version = repos.component_versions().get_component_version(id).await?;
        Ok(version.map(ComponentVersion::from))
    }

    /// List component versions with pagination, filtering and ordering.
    async fn component_versions<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default = 20)] first: Option<i32>,
        after: Option<String>,
        version: Option<String>,
        tag: Option<String>,
        order_by: Option<Vec<OrderByInput>>,
    ) -> Result<ComponentVersionConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let started = Instant::now();

        let filter = ComponentVersionFilter { version, tag };
        let page_size = validate_pagination_first(first) as i64;
        let offset = decode_offset(after)?;
        let order = parse_order(order_by, ComponentVersionOrderField::parse)?;

        let window = repos
            .component_versions()
            .list_component_versions(&filter, &order, Window { offset, limit: page_size })
            .await?;

        let connection = Connection::from_window(window.rows, window.total_count, page_size, offset);

        metrics::record_list_query_duration("component_versions", started.elapsed().as_secs_f64());
        Ok(ComponentVersionConnection::from(connection))
    }
}
