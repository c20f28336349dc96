//! Planning Storage Interface
//!
//! The narrow read/write surface the planning stages use to reach persisted
//! projects, stage results and sites.

use async_trait::async_trait;
use common::{Headline, NewSite, Project, ProjectId, Site, SiteId, StageKind, StageReport, StageResult};

use crate::InterfaceError;

/// Storage collaborator for projects, stage results and sites
///
/// `upsert_stage_result` must be atomic per `(project, kind)`: concurrent
/// callers converge on exactly one stored record holding one of the
/// submitted reports. Implementations enforce this through the uniqueness
/// of that key, not by a read-then-write sequence.
#[async_trait]
pub trait PlanningStore: Send + Sync {
    /// Fetch a project by ID
    async fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, InterfaceError>;

    /// Fetch the stored result of one stage
    async fn fetch_stage_result(
        &self,
        project: ProjectId,
        kind: StageKind,
    ) -> Result<Option<StageResult>, InterfaceError>;

    /// Create or replace the result of one stage
    async fn upsert_stage_result(
        &self,
        project: ProjectId,
        kind: StageKind,
        headline: Headline,
        report: StageReport,
    ) -> Result<StageResult, InterfaceError>;

    /// Persist a new site
    async fn create_site(&self, site: NewSite) -> Result<Site, InterfaceError>;

    /// List a project's sites in creation order
    async fn list_sites(&self, project: ProjectId) -> Result<Vec<Site>, InterfaceError>;

    /// Delete a site
    async fn delete_site(&self, id: SiteId) -> Result<(), InterfaceError>;
}
