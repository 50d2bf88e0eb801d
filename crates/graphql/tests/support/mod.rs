//! In-memory repository implementations for schema-level tests.
//!
//! The store honors the exact storage contract the resolvers rely on:
//! filter, order with the core comparator, and return the requested row
//! window plus the total matching count.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use vigil_core::error::{StorageError, StorageResult};
use vigil_core::models::{
    ComponentInstance, ComponentInstanceType, ComponentVersion, Issue, IssueType, IssueVariant,
    Service,
};
use vigil_core::ports::{
    ComponentInstanceFilter, ComponentInstanceOrderField, ComponentInstanceRepository,
    ComponentVersionFilter, ComponentVersionOrderField, ComponentVersionRepository, IssueFilter,
    IssueOrderField, IssueRepository, IssueTypeCounts, OrderBy, Orderable, Repositories,
    RowComparator, RowWindow, ServiceFilter, ServiceOrderField, ServiceRepository, Window,
};
use vigil_core::severity::{Severity, SeverityCounts};

/// Fixture data store implementing every repository trait.
#[derive(Default)]
pub struct InMemoryStore {
    pub issues: Vec<Issue>,
    pub variants: Vec<IssueVariant>,
    pub services: Vec<Service>,
    pub instances: Vec<ComponentInstance>,
    pub versions: Vec<ComponentVersion>,
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn sorted_window<R, F>(
    mut rows: Vec<R>,
    order: &[OrderBy<F>],
    window: Window,
) -> StorageResult<RowWindow<R>>
where
    R: Orderable<Field = F>,
    F: Copy,
{
    let comparator = RowComparator::new()
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
    comparator.sort(order, &mut rows);

    let total_count = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(window.offset.max(0) as usize)
        .take(window.limit.max(0) as usize)
        .collect();

    Ok(RowWindow { rows, total_count })
}

#[async_trait]
impl IssueRepository for InMemoryStore {
    async fn get_issue(&self, id: i64) -> StorageResult<Option<Issue>> {
        Ok(self.issues.iter().find(|i| i.id == id).cloned())
    }

    async fn list_issues(
        &self,
        filter: &IssueFilter,
        order: &[OrderBy<IssueOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Issue>> {
        let rows: Vec<Issue> = self
            .issues
            .iter()
            .filter(|i| matches_issue(i, filter))
            .cloned()
            .collect();
        sorted_window(rows, order, window)
    }

    async fn list_variants(&self, issue_id: i64) -> StorageResult<Vec<IssueVariant>> {
        Ok(self
            .variants
            .iter()
            .filter(|v| v.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn issue_type_counts(&self, filter: &IssueFilter) -> StorageResult<IssueTypeCounts> {
        let mut counts = IssueTypeCounts::default();
        for issue in self.issues.iter().filter(|i| matches_issue(i, filter)) {
            match issue.issue_type {
                IssueType::Vulnerability => counts.vulnerability_count += 1,
                IssueType::PolicyViolation => counts.policy_violation_count += 1,
                IssueType::SecurityEvent => counts.security_event_count += 1,
            }
        }
        Ok(counts)
    }

    async fn issue_severity_counts(
        &self,
        filter: &IssueFilter,
    ) -> StorageResult<SeverityCounts> {
        Ok(SeverityCounts::from_ratings(
            self.issues
                .iter()
                .filter(|i| matches_issue(i, filter))
                .map(|i| i.severity),
        ))
    }
}

#[async_trait]
impl ServiceRepository for InMemoryStore {
    async fn get_service(&self, id: i64) -> StorageResult<Option<Service>> {
        Ok(self.services.iter().find(|s| s.id == id).cloned())
    }

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        order: &[OrderBy<ServiceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<Service>> {
        let rows: Vec<Service> = self
            .services
            .iter()
            .filter(|s| {
                filter.ccrn.as_ref().is_none_or(|c| &s.ccrn == c)
                    && filter.region.as_ref().is_none_or(|r| s.region.as_ref() == Some(r))
            })
            .cloned()
            .collect();
        sorted_window(rows, order, window)
    }
}

#[async_trait]
impl ComponentInstanceRepository for InMemoryStore {
    async fn get_component_instance(&self, id: i64) -> StorageResult<Option<ComponentInstance>> {
        Ok(self.instances.iter().find(|i| i.id == id).cloned())
    }

    async fn list_component_instances(
        &self,
        filter: &ComponentInstanceFilter,
        order: &[OrderBy<ComponentInstanceOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentInstance>> {
        let rows: Vec<ComponentInstance> = self
            .instances
            .iter()
            .filter(|i| {
                filter.ccrn.as_ref().is_none_or(|c| &i.ccrn == c)
                    && filter.region.as_ref().is_none_or(|r| i.region.as_ref() == Some(r))
                    && filter.cluster.as_ref().is_none_or(|c| i.cluster.as_ref() == Some(c))
                    && filter
                        .namespace
                        .as_ref()
                        .is_none_or(|n| i.namespace.as_ref() == Some(n))
                    && filter.instance_type.is_none_or(|t| i.instance_type == t)
                    && filter.service_id.is_none_or(|s| i.service_id == Some(s))
            })
            .cloned()
            .collect();
        sorted_window(rows, order, window)
    }
}

#[async_trait]
impl ComponentVersionRepository for InMemoryStore {
    async fn get_component_version(&self, id: i64) -> StorageResult<Option<ComponentVersion>> {
        Ok(self.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn list_component_versions(
        &self,
        filter: &ComponentVersionFilter,
        order: &[OrderBy<ComponentVersionOrderField>],
        window: Window,
    ) -> StorageResult<RowWindow<ComponentVersion>> {
        let rows: Vec<ComponentVersion> = self
            .versions
            .iter()
            .filter(|v| {
                filter.version.as_ref().is_none_or(|ver| &v.version == ver)
                    && filter.tag.as_ref().is_none_or(|t| v.tag.as_ref() == Some(t))
            })
            .cloned()
            .collect();
        sorted_window(rows, order, window)
    }
}

impl Repositories for InMemoryStore {
    fn issues(&self) -> &dyn IssueRepository {
        self
    }

    fn services(&self) -> &dyn ServiceRepository {
        self
    }

    fn component_instances(&self) -> &dyn ComponentInstanceRepository {
        self
    }

    fn component_versions(&self) -> &dyn ComponentVersionRepository {
        self
    }
}

fn matches_issue(issue: &Issue, filter: &IssueFilter) -> bool {
    filter
        .primary_name
        .as_ref()
        .is_none_or(|n| &issue.primary_name == n)
        && filter.issue_type.is_none_or(|t| issue.issue_type == t)
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn issue(id: i64, name: &str, issue_type: IssueType, severity: Option<Severity>) -> Issue {
    Issue {
        id,
        primary_name: name.to_string(),
        issue_type,
        description: format!("issue {name}"),
        severity,
        target_remediation_date: None,
        created_at: ts(id),
        updated_at: ts(id),
    }
}

pub fn service(id: i64, ccrn: &str, region: Option<&str>, counts: SeverityCounts) -> Service {
    Service {
        id,
        ccrn: ccrn.to_string(),
        region: region.map(str::to_string),
        severity_counts: counts,
        created_at: ts(id),
        updated_at: ts(id),
    }
}

pub fn instance(id: i64, ccrn: &str, region: Option<&str>) -> ComponentInstance {
    ComponentInstance {
        id,
        ccrn: ccrn.to_string(),
        region: region.map(str::to_string),
        cluster: None,
        namespace: None,
        instance_type: ComponentInstanceType::Server,
        count: 1,
        service_id: None,
        component_version_id: None,
        created_at: ts(id),
        updated_at: ts(id),
    }
}

pub fn severity_profile(critical: i64, high: i64, medium: i64, low: i64) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    counts.add(Some(Severity::Critical), critical);
    counts.add(Some(Severity::High), high);
    counts.add(Some(Severity::Medium), medium);
    counts.add(Some(Severity::Low), low);
    counts
}

/// Ten issues, five services with distinct severity profiles, ten
/// instances with mixed regions.
pub fn seeded_store() -> InMemoryStore {
    let issues = vec![
        issue(1, "CVE-2024-0001", IssueType::Vulnerability, Some(Severity::Critical)),
        issue(2, "CVE-2024-0002", IssueType::Vulnerability, Some(Severity::Critical)),
        issue(3, "CVE-2024-0003", IssueType::Vulnerability, Some(Severity::High)),
        issue(4, "CVE-2024-0004", IssueType::Vulnerability, Some(Severity::High)),
        issue(5, "CVE-2024-0005", IssueType::Vulnerability, Some(Severity::High)),
        issue(6, "CVE-2024-0006", IssueType::Vulnerability, Some(Severity::Low)),
        issue(7, "POL-0001", IssueType::PolicyViolation, None),
        issue(8, "POL-0002", IssueType::PolicyViolation, None),
        issue(9, "POL-0003", IssueType::PolicyViolation, None),
        issue(10, "EVT-0001", IssueType::SecurityEvent, None),
    ];

    let services = vec![
        service(1, "svc-payments", Some("eu-de-1"), severity_profile(0, 3, 0, 0)),
        service(2, "svc-identity", Some("eu-de-2"), severity_profile(1, 0, 0, 0)),
        service(3, "svc-billing", None, severity_profile(0, 3, 0, 0)),
        service(4, "svc-ingest", Some("ap-jp-1"), severity_profile(0, 0, 5, 0)),
        service(5, "svc-archive", Some("us-ca-1"), SeverityCounts::default()),
    ];

    let instances = vec![
        instance(1, "inst-01", Some("eu-de-1")),
        instance(2, "inst-02", Some("ap-jp-2")),
        instance(3, "inst-03", None),
        instance(4, "inst-04", Some("EU-DE-2")),
        instance(5, "inst-05", Some("us-ca-1")),
        instance(6, "inst-06", Some("")),
        instance(7, "inst-07", Some("eu-nl-1")),
        instance(8, "inst-08", Some("ap-ae-1")),
        instance(9, "inst-09", Some("eu-de-1")),
        instance(10, "inst-10", Some("na-us-1")),
    ];

    InMemoryStore {
        issues,
        variants: Vec::new(),
        services,
        instances,
        versions: Vec::new(),
    }
}
