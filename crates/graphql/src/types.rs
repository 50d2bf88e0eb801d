//! GraphQL type definitions.
//!
//! Mirrors of the core domain types, plus the uniform connection shapes
//! returned by every list query. Conversions from core types are
//! mechanical; the domain layer never sees these types.

use async_graphql::{EmptyMutation, EmptySubscription, Enum, InputObject, Schema, SimpleObject};
use chrono::{DateTime, Utc};

use vigil_core::models;
use vigil_core::ports;
use vigil_core::severity;

use crate::schema::CoreQuery;

/// The GraphQL schema type.
pub type VigilSchema = Schema<CoreQuery, EmptyMutation, EmptySubscription>;

// -----------------------------------------------------------------------------
// Enums and inputs
// -----------------------------------------------------------------------------

/// Ordering direction.
#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl From<OrderDirection> for ports::OrderDirection {
    fn from(direction: OrderDirection) -> Self {
        match direction {
            OrderDirection::Asc => ports::OrderDirection::Asc,
            OrderDirection::Desc => ports::OrderDirection::Desc,
        }
    }
}

/// One client-requested sort dimension.
///
/// `by` is validated against the queried entity's sortable fields;
/// unknown names are rejected before any storage access.
#[derive(InputObject)]
pub struct OrderByInput {
    pub by: String,
    #[graphql(default)]
    pub direction: OrderDirection,
}

/// Severity rating.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl From<severity::Severity> for Severity {
    fn from(rating: severity::Severity) -> Self {
        match rating {
            severity::Severity::None => Severity::None,
            severity::Severity::Low => Severity::Low,
            severity::Severity::Medium => Severity::Medium,
            severity::Severity::High => Severity::High,
            severity::Severity::Critical => Severity::Critical,
        }
    }
}

/// Issue classification.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueType {
    Vulnerability,
    PolicyViolation,
    SecurityEvent,
}

impl From<IssueType> for models::IssueType {
    fn from(issue_type: IssueType) -> Self {
        match issue_type {
            IssueType::Vulnerability => models::IssueType::Vulnerability,
            IssueType::PolicyViolation => models::IssueType::PolicyViolation,
            IssueType::SecurityEvent => models::IssueType::SecurityEvent,
        }
    }
}

impl From<models::IssueType> for IssueType {
    fn from(issue_type: models::IssueType) -> Self {
        match issue_type {
            models::IssueType::Vulnerability => IssueType::Vulnerability,
            models::IssueType::PolicyViolation => IssueType::PolicyViolation,
            models::IssueType::SecurityEvent => IssueType::SecurityEvent,
        }
    }
}

/// Kind of deployed resource a component instance represents.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentInstanceType {
    Unknown,
    Project,
    Server,
    SecurityGroup,
    DnsZone,
    FloatingIp,
    RbacPolicy,
    User,
}

impl From<ComponentInstanceType> for models::ComponentInstanceType {
    fn from(t: ComponentInstanceType) -> Self {
        match t {
            ComponentInstanceType::Unknown => models::ComponentInstanceType::Unknown,
            ComponentInstanceType::Project => models::ComponentInstanceType::Project,
            ComponentInstanceType::Server => models::ComponentInstanceType::Server,
            ComponentInstanceType::SecurityGroup => models::ComponentInstanceType::SecurityGroup,
            ComponentInstanceType::DnsZone => models::ComponentInstanceType::DnsZone,
            ComponentInstanceType::FloatingIp => models::ComponentInstanceType::FloatingIp,
            ComponentInstanceType::RbacPolicy => models::ComponentInstanceType::RbacPolicy,
            ComponentInstanceType::User => models::ComponentInstanceType::User,
        }
    }
}

impl From<models::ComponentInstanceType> for ComponentInstanceType {
    fn from(t: models::ComponentInstanceType) -> Self {
        match t {
            models::ComponentInstanceType::Unknown => ComponentInstanceType::Unknown,
            models::ComponentInstanceType::Project => ComponentInstanceType::Project,
            models::ComponentInstanceType::Server => ComponentInstanceType::Server,
            models::ComponentInstanceType::SecurityGroup => ComponentInstanceType::SecurityGroup,
            models::ComponentInstanceType::DnsZone => ComponentInstanceType::DnsZone,
            models::ComponentInstanceType::FloatingIp => ComponentInstanceType::FloatingIp,
            models::ComponentInstanceType::RbacPolicy => ComponentInstanceType::RbacPolicy,
            models::ComponentInstanceType::User => ComponentInstanceType::User,
        }
    }
}

// -----------------------------------------------------------------------------
// Aggregates and page metadata
// -----------------------------------------------------------------------------

/// Five-bucket severity rollup.
#[derive(SimpleObject)]
pub struct SeverityCounts {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub none: i64,
    pub total: i64,
}

impl From<severity::SeverityCounts> for SeverityCounts {
    fn from(counts: severity::SeverityCounts) -> Self {
        Self {
            critical: counts.critical,
            high: counts.high,
            medium: counts.medium,
            low: counts.low,
            none: counts.none,
            total: counts.total,
        }
    }
}

/// One jump-to-page descriptor.
#[derive(SimpleObject)]
pub struct Page {
    pub page_number: i64,
    pub after: String,
    pub is_current: bool,
    pub page_count: i64,
}

/// Page metadata for a connection.
#[derive(SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub is_valid_page: bool,
    pub page_number: i64,
    pub next_page_after: Option<String>,
    pub pages: Vec<Page>,
}

impl From<ports::PageInfo> for PageInfo {
    fn from(info: ports::PageInfo) -> Self {
        Self {
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            is_valid_page: info.is_valid_page,
            page_number: info.page_number,
            next_page_after: info.next_page_after.map(|c| c.value),
            pages: info
                .pages
                .into_iter()
                .map(|p| Page {
                    page_number: p.page_number,
                    after: p.after.value,
                    is_current: p.is_current,
                    page_count: p.page_count,
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// Node types
// -----------------------------------------------------------------------------

/// Tracked security issue.
#[derive(SimpleObject)]
pub struct Issue {
    pub id: i64,
    pub primary_name: String,
    pub issue_type: IssueType,
    pub description: String,
    pub severity: Option<Severity>,
    pub target_remediation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::Issue> for Issue {
    fn from(issue: models::Issue) -> Self {
        Self {
            id: issue.id,
            primary_name: issue.primary_name,
            issue_type: issue.issue_type.into(),
            description: issue.description,
            severity: issue.severity.map(Into::into),
            target_remediation_date: issue.target_remediation_date,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// One advisory's view of an issue.
#[derive(SimpleObject)]
pub struct IssueVariant {
    pub id: i64,
    pub issue_id: i64,
    pub secondary_name: String,
    pub rating: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

impl From<models::IssueVariant> for IssueVariant {
    fn from(variant: models::IssueVariant) -> Self {
        Self {
            id: variant.id,
            issue_id: variant.issue_id,
            secondary_name: variant.secondary_name,
            rating: variant.rating.map(Into::into),
            created_at: variant.created_at,
        }
    }
}

/// Operated service.
#[derive(SimpleObject)]
pub struct Service {
    pub id: i64,
    pub ccrn: String,
    pub region: Option<String>,
    pub severity_counts: SeverityCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::Service> for Service {
    fn from(service: models::Service) -> Self {
        Self {
            id: service.id,
            ccrn: service.ccrn,
            region: service.region,
            severity_counts: service.severity_counts.into(),
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

/// Released component version.
#[derive(SimpleObject)]
pub struct ComponentVersion {
    pub id: i64,
    pub version: String,
    pub tag: Option<String>,
    pub severity_counts: SeverityCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::ComponentVersion> for ComponentVersion {
    fn from(version: models::ComponentVersion) -> Self {
        Self {
            id: version.id,
            version: version.version,
            tag: version.tag,
            severity_counts: version.severity_counts.into(),
            created_at: version.created_at,
            updated_at: version.updated_at,
        }
    }
}

/// Deployed component instance.
#[derive(SimpleObject)]
pub struct ComponentInstance {
    pub id: i64,
    pub ccrn: String,
    pub region: Option<String>,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub instance_type: ComponentInstanceType,
    pub count: i32,
    pub service_id: Option<i64>,
    pub component_version_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::ComponentInstance> for ComponentInstance {
    fn from(instance: models::ComponentInstance) -> Self {
        Self {
            id: instance.id,
            ccrn: instance.ccrn,
            region: instance.region,
            cluster: instance.cluster,
            namespace: instance.namespace,
            instance_type: instance.instance_type.into(),
            count: instance.count,
            service_id: instance.service_id,
            component_version_id: instance.component_version_id,
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

/// Generate Relay-style connection types (Edge + Connection) with From impl.
macro_rules! define_connection {
    ($node:ty, $core_model:ty, $edge:ident, $connection:ident) => {
        #[derive(SimpleObject)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(SimpleObject)]
        pub struct $connection {
            pub total_count: i64,
            pub edges: Vec<$edge>,
            pub page_info: PageInfo,
        }

        impl From<ports::Connection<$core_model>> for $connection {
            fn from(conn: ports::Connection<$core_model>) -> Self {
                Self {
                    total_count: conn.total_count,
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: <$node>::from(e.node),
                            cursor: e.cursor.value,
                        })
                        .collect(),
                    page_info: conn.page_info.into(),
                }
            }
        }
    };
}

define_connection!(Service, models::Service, ServiceEdge, ServiceConnection);
define_connection!(
    ComponentInstance,
    models::ComponentInstance,
    ComponentInstanceEdge,
    ComponentInstanceConnection
);
define_connection!(
    ComponentVersion,
    models::ComponentVersion,
    ComponentVersionEdge,
    ComponentVersionConnection
);

/// Edge of the issue connection.
#[derive(SimpleObject)]
pub struct IssueEdge {
    pub node: Issue,
    pub cursor: String,
}

/// Issue connection; carries response-level aggregates alongside the
/// uniform connection shape.
#[derive(SimpleObject)]
pub struct IssueConnection {
    pub total_count: i64,
    pub edges: Vec<IssueEdge>,
    pub page_info: PageInfo,
    /// Severity rollup over all matching issues, not just this page.
    pub severity_counts: SeverityCounts,
    pub vulnerability_count: i64,
    pub policy_violation_count: i64,
    pub security_event_count: i64,
}

impl IssueConnection {
    /// Assemble from the core connection plus the filter-level aggregates.
    pub fn from_parts(
        conn: ports::Connection<models::Issue>,
        severity_counts: severity::SeverityCounts,
        type_counts: ports::IssueTypeCounts,
    ) -> Self {
        Self {
            total_count: conn.total_count,
            edges: conn
                .edges
                .into_iter()
                .map(|e| IssueEdge {
                    node: Issue::from(e.node),
                    cursor: e.cursor.value,
                })
                .collect(),
            page_info: conn.page_info.into(),
            severity_counts: severity_counts.into(),
            vulnerability_count: type_counts.vulnerability_count,
            policy_violation_count: type_counts.policy_violation_count,
            security_event_count: type_counts.security_event_count,
        }
    }
}
