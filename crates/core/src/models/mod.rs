//! Domain models representing tracked security data.
//!
//! These models are storage-agnostic and represent the canonical form of
//! tracked data within the domain layer. Derived fields (an issue's
//! effective severity, a parent's severity rollup) are populated by the
//! storage adapter at load time, the way row counts ride along on a
//! parent record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::{Severity, SeverityCounts};

// =============================================================================
// Issues
// =============================================================================

/// Classification of a tracked issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Vulnerability,
    PolicyViolation,
    SecurityEvent,
}

impl IssueType {
    /// Canonical label, as stored and exposed.
    pub fn label(self) -> &'static str {
        match self {
            IssueType::Vulnerability => "Vulnerability",
            IssueType::PolicyViolation => "PolicyViolation",
            IssueType::SecurityEvent => "SecurityEvent",
        }
    }

    /// Decode a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Vulnerability" => Some(IssueType::Vulnerability),
            "PolicyViolation" => Some(IssueType::PolicyViolation),
            "SecurityEvent" => Some(IssueType::SecurityEvent),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracked security issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Primary key.
    pub id: i64,
    /// Primary human-readable name (e.g. a CVE identifier).
    pub primary_name: String,
    /// Issue classification.
    pub issue_type: IssueType,
    /// Free-form description.
    pub description: String,
    /// Highest rating across this issue's variants (None when unrated).
    pub severity: Option<Severity>,
    /// Deadline by which the issue should be remediated.
    pub target_remediation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One advisory's view of an issue.
///
/// Different advisories may rate the same issue differently; the issue's
/// effective severity is the highest rating across its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueVariant {
    /// Primary key.
    pub id: i64,
    /// Issue this variant describes.
    pub issue_id: i64,
    /// Secondary name used by the issuing advisory.
    pub secondary_name: String,
    /// Rating assigned by the advisory (None when the advisory did not
    /// rate, or its label could not be mapped).
    pub rating: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

/// Highest-severity rating across an issue's variants.
///
/// Returns None when there are no rated variants; the aggregation layer
/// counts that in the `none` bucket.
pub fn highest_rating(variants: &[IssueVariant]) -> Option<Severity> {
    variants.iter().filter_map(|v| v.rating).max()
}

/// Join row linking an issue occurrence to a deployed component instance.
///
/// Matches are the ground truth for rollups: a service's severity profile
/// is the set of distinct issues matched against its instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueMatch {
    pub id: i64,
    pub issue_id: i64,
    pub component_instance_id: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Services
// =============================================================================

/// Operated service owning deployed component instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Primary key.
    pub id: i64,
    /// Human-readable resource name.
    pub ccrn: String,
    /// Deployment region (if scoped to one).
    pub region: Option<String>,
    /// Severity rollup over distinct issues matched against this
    /// service's instances.
    pub severity_counts: SeverityCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Components
// =============================================================================

/// Released version of a software component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentVersion {
    /// Primary key.
    pub id: i64,
    /// Version string as released.
    pub version: String,
    /// Optional release tag.
    pub tag: Option<String>,
    /// Severity rollup over distinct issues matched against instances of
    /// this version.
    pub severity_counts: SeverityCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of deployed resource a component instance represents.
///
/// The declaration order defines a fixed total rank used for ordering;
/// unmapped labels decode to `Unknown`, the lowest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
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

impl ComponentInstanceType {
    /// Numeric rank used for ordering.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Canonical label, as stored and exposed.
    pub fn label(self) -> &'static str {
        match self {
            ComponentInstanceType::Unknown => "Unknown",
            ComponentInstanceType::Project => "Project",
            ComponentInstanceType::Server => "Server",
            ComponentInstanceType::SecurityGroup => "SecurityGroup",
            ComponentInstanceType::DnsZone => "DnsZone",
            ComponentInstanceType::FloatingIp => "FloatingIp",
            ComponentInstanceType::RbacPolicy => "RbacPolicy",
            ComponentInstanceType::User => "User",
        }
    }

    /// Decode a stored label. Unmapped labels are `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Project" => ComponentInstanceType::Project,
            "Server" => ComponentInstanceType::Server,
            "SecurityGroup" => ComponentInstanceType::SecurityGroup,
            "DnsZone" => ComponentInstanceType::DnsZone,
            "FloatingIp" => ComponentInstanceType::FloatingIp,
            "RbacPolicy" => ComponentInstanceType::RbacPolicy,
            "User" => ComponentInstanceType::User,
            _ => ComponentInstanceType::Unknown,
        }
    }
}

impl std::fmt::Display for ComponentInstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Deployed instance of a component version within a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Primary key.
    pub id: i64,
    /// Human-readable resource name.
    pub ccrn: String,
    /// Deployment region.
    pub region: Option<String>,
    /// Cluster the instance runs in.
    pub cluster: Option<String>,
    /// Namespace within the cluster.
    pub namespace: Option<String>,
    /// Kind of deployed resource.
    pub instance_type: ComponentInstanceType,
    /// Number of replicas this record represents.
    pub count: i32,
    /// Owning service.
    pub service_id: Option<i64>,
    /// Deployed component version.
    pub component_version_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
