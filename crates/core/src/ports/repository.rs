//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g. `vigil-storage`).
//!
//! List operations consume a filter, an order specification, and a row
//! window, and return the ordered window plus the total number of
//! matching rows - everything pagination needs and nothing more.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    ComponentInstance, ComponentInstanceType, ComponentVersion, Issue, IssueType, IssueVariant,
    Service,
};
use crate::severity::SeverityCounts;

use super::ordering::{
    ComponentInstanceOrderField, ComponentVersionOrderField, IssueOrderField, OrderBy,
    ServiceOrderField,
};

// =============================================================================
// Windows
// =============================================================================

/// Row window request: rows `[offset, offset + limit)` of the ordered
/// result set.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

/// Ordered row window plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct RowWindow<T> {
    pub rows: Vec<T>,
    pub total_count: i64,
}

// =============================================================================
// Filter Types
// =============================================================================

/// Filter options for issue queries.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub primary_name: Option<String>,
    pub issue_type: Option<IssueType>,
}

/// Filter options for service queries.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub ccrn: Option<String>,
    pub region: Option<String>,
}

/// Filter options for component-instance queries.
#[derive(Debug, Clone, Default)]
pub struct ComponentInstanceFilter {
    pub ccrn: Option<String>,
    pub region: Option<String>,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub instance_type: Option<ComponentInstanceType>,
    pub service_id: Option<i64>,
}

/// Filter options for component-version queries.
#[derive(Debug, Clone, Default)]
pub struct ComponentVersionFilter {
    pub version: Option<String>,
    pub tag: Option<String>,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Per-type issue totals for a filtered issue set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueTypeCounts {
    pub vulnerability_count: i64,
    pub policy_violation_count: i64,
    pub security_event_count: i64,
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for issue data.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Get issue by id, with its effective severity populated.
    async fn get_issue(&self, id: i64) -> StorageResult<Option<Issue>>;

    /// List issues: the ordered window plus the total matching count.
    async fn list_issues(
        &self,
        filter: &IssueFilter,
        order: &[OrderBy<IssueOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Issue>>;

    /// List the variants of one issue.
    async fn list_variants(&self, issue_id: i64) -> StorageResult<Vec<IssueVariant>>;

    /// Count matching issues per issue type.
    async fn issue_type_counts(&self, filter: &IssueFilter) -> StorageResult<IssueTypeCounts>;

    /// Severity rollup over matching issues: each distinct issue counted
    /// once through its highest-rated variant.
    async fn issue_severity_counts(&self, filter: &IssueFilter)
        -> StorageResult<SeverityCounts>;
}

/// Repository for service data.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Get service by id, with its severity rollup populated.
    async fn get_service(&self, id: i64) -> StorageResult<Option<Service>>;

    /// List services with their severity rollups populated.
    async fn list_services(
        &self,
        filter: &ServiceFilter,
        order: &[OrderBy<ServiceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Service>>;
}

/// Repository for component-instance data.
#[async_trait]
pub trait ComponentInstanceRepository: Send + Sync {
    /// Get component instance by id.
    async fn get_component_instance(&self, id: i64) -> StorageResult<Option<ComponentInstance>>;

    /// List component instances.
    async fn list_component_instances(
        &self,
        filter: &ComponentInstanceFilter,
        order: &[OrderBy<ComponentInstanceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentInstance>>;
}

/// Repository for component-version data.
#[async_trait]
pub trait ComponentVersionRepository: Send + Sync {
    /// Get component version by id, with its severity rollup populated.
    async fn get_component_version(&self, id: i64) -> StorageResult<Option<ComponentVersion>>;

    /// List component versions with their severity rollups populated.
    async fn list_component_versions(
        &self,
        filter: &ComponentVersionFilter,
        order: &[OrderBy<ComponentVersionOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentVersion>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the API layer.
pub trait Repositories: Send + Sync {
    /// Access the issue repository.
    fn issues(&self) -> &dyn IssueRepository;

    /// Access the service repository.
    fn services(&self) -> &dyn ServiceRepository;

    /// Access the component-instance repository.
    fn component_instances(&self) -> &dyn ComponentInstanceRepository;

    /// Access the component-version repository.
    fn component_versions(&self) -> &dyn ComponentVersionRepository;
}
