//! In-Memory Planning Store
//!
//! Keeps projects, stage results and sites behind a single async lock.
//! Stage results are keyed by `(ProjectId, StageKind)`, so an upsert is a
//! single keyed replace under the write guard.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    Headline, NewSite, Project, ProjectId, ProjectParams, Site, SiteId, StageKind, StageReport,
    StageResult,
};

use crate::{storage::PlanningStore, InterfaceError};

#[derive(Default)]
struct StoreState {
    projects: HashMap<ProjectId, Project>,
    results: HashMap<(ProjectId, StageKind), StageResult>,
    sites: BTreeMap<SiteId, Site>,
    next_project_id: i64,
    next_site_id: i64,
}

/// Process-local store used by the planner binary and tests
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

fn project_not_found(id: ProjectId) -> InterfaceError {
    InterfaceError::NotFound {
        entity: "Project",
        id: id.to_string(),
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a project and assign its ID
    pub async fn insert_project(&self, params: ProjectParams) -> Project {
        let mut state = self.state.write().await;
        state.next_project_id += 1;
        let project = Project {
            id: ProjectId(state.next_project_id),
            params,
        };
        state.projects.insert(project.id, project.clone());
        info!("Stored project {} ({})", project.id, project.params.name);
        project
    }

    /// Replace a project's parameters
    ///
    /// Stored stage results are left untouched; they are refreshed only by
    /// re-running the stages.
    pub async fn update_project(
        &self,
        id: ProjectId,
        params: ProjectParams,
    ) -> Result<Project, InterfaceError> {
        let mut state = self.state.write().await;
        let project = state.projects.get_mut(&id).ok_or_else(|| project_not_found(id))?;
        project.params = params;
        debug!("Updated project {}", id);
        Ok(project.clone())
    }

    /// Delete a project together with its stage results and sites
    pub async fn delete_project(&self, id: ProjectId) -> Result<(), InterfaceError> {
        let mut state = self.state.write().await;
        state.projects.remove(&id).ok_or_else(|| project_not_found(id))?;
        state.results.retain(|(project, _), _| *project != id);
        state.sites.retain(|_, site| site.project_id != id);
        info!("Deleted project {}", id);
        Ok(())
    }

    /// All stored stage results of a project, ordered by kind
    pub async fn stage_results(&self, project: ProjectId) -> Vec<StageResult> {
        let state = self.state.read().await;
        let mut results: Vec<StageResult> = state
            .results
            .values()
            .filter(|r| r.project_id == project)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.kind);
        results
    }
}

#[async_trait]
impl PlanningStore for MemoryStore {
    async fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, InterfaceError> {
        let state = self.state.read().await;
        Ok(state.projects.get(&id).cloned())
    }

    async fn fetch_stage_result(
        &self,
        project: ProjectId,
        kind: StageKind,
    ) -> Result<Option<StageResult>, InterfaceError> {
        let state = self.state.read().await;
        Ok(state.results.get(&(project, kind)).cloned())
    }

    async fn upsert_stage_result(
        &self,
        project: ProjectId,
        kind: StageKind,
        headline: Headline,
        report: StageReport,
    ) -> Result<StageResult, InterfaceError> {
        if headline.kind() != kind || report.kind() != kind {
            return Err(InterfaceError::Conflict(format!(
                "{} result cannot hold a {} headline and a {} report",
                kind,
                headline.kind(),
                report.kind()
            )));
        }

        let mut state = self.state.write().await;
        if !state.projects.contains_key(&project) {
            return Err(project_not_found(project));
        }

        let result = StageResult {
            project_id: project,
            kind,
            headline,
            report,
            computed_at: Utc::now(),
        };
        let replaced = state.results.insert((project, kind), result.clone()).is_some();

        debug!(
            "{} {} result for project {}",
            if replaced { "Replaced" } else { "Created" },
            kind,
            project
        );
        Ok(result)
    }

    async fn create_site(&self, site: NewSite) -> Result<Site, InterfaceError> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&site.project_id) {
            return Err(project_not_found(site.project_id));
        }

        state.next_site_id += 1;
        let stored = Site {
            id: SiteId(state.next_site_id),
            project_id: site.project_id,
            name: site.name,
            latitude: site.latitude,
            longitude: site.longitude,
            radius_km: site.radius_km,
            created_at: Utc::now(),
        };
        state.sites.insert(stored.id, stored.clone());
        debug!("Created site {} for project {}", stored.id, stored.project_id);
        Ok(stored)
    }

    async fn list_sites(&self, project: ProjectId) -> Result<Vec<Site>, InterfaceError> {
        let state = self.state.read().await;
        let mut sites: Vec<Site> = state
            .sites
            .values()
            .filter(|s| s.project_id == project)
            .cloned()
            .collect();
        sites.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(sites)
    }

    async fn delete_site(&self, id: SiteId) -> Result<(), InterfaceError> {
        let mut state = self.state.write().await;
        state
            .sites
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| InterfaceError::NotFound {
                entity: "Site",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CoverageReport, Service, UserId, ZoneType};
    use std::sync::Arc;

    fn sample_params() -> ProjectParams {
        ProjectParams {
            owner: UserId(1),
            name: "Harbour district".to_string(),
            description: None,
            area_km2: 10.0,
            user_density: 500.0,
            frequency_ghz: 2.1,
            bandwidth_mhz: 100.0,
            zone_type: ZoneType::Suburban,
            services: [Service::Embb, Service::Urllc].into_iter().collect(),
            power_dbm: Some(40.0),
            antenna_height_m: Some(30.0),
            user_height_m: Some(1.5),
            latitude: Some(43.2965),
            longitude: Some(5.3698),
        }
    }

    fn coverage_report(radius_km: f64) -> StageReport {
        StageReport::Coverage(CoverageReport {
            frequency_mhz: 2100.0,
            zone_type: ZoneType::Suburban,
            tx_power_dbm: 40.0,
            antenna_height_m: 30.0,
            user_height_m: 1.5,
            antenna_gain_dbi: 15.0,
            system_losses_db: 2.0,
            receiver_sensitivity_dbm: -100.0,
            mobile_height_correction_db: 0.0,
            zone_correction_db: 0.0,
            max_path_loss_db: 140.0,
            log10_radius: radius_km.log10(),
            radius_km,
            coverage_area_km2: std::f64::consts::PI * radius_km * radius_km,
            path_loss_db: 140.0,
            link_budget_db: 13.0,
        })
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        let project = store.insert_project(sample_params()).await;

        for radius in [1.1, 1.2] {
            let report = coverage_report(radius);
            store
                .upsert_stage_result(project.id, StageKind::Coverage, report.headline(), report)
                .await
                .unwrap();
        }

        let results = store.stage_results(project.id).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].coverage().unwrap().radius_km, 1.2);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge_to_one_record() {
        let store = Arc::new(MemoryStore::new());
        let project_id = store.insert_project(sample_params()).await.id;

        let radii: Vec<f64> = (1..=16).map(|i| 1.0 + i as f64 / 100.0).collect();
        let handles: Vec<_> = radii
            .iter()
            .map(|&radius| {
                let store = store.clone();
                tokio::spawn(async move {
                    let report = coverage_report(radius);
                    store
                        .upsert_stage_result(project_id, StageKind::Coverage, report.headline(), report)
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let results = store.stage_results(project_id).await;
        assert_eq!(results.len(), 1);
        let stored = results[0].coverage().unwrap();
        assert!(radii.contains(&stored.radius_km));
        assert_eq!(results[0].headline, Headline::CoverageAreaKm2(stored.coverage_area_km2));
    }

    #[tokio::test]
    async fn test_upsert_rejects_mismatched_kind_and_unknown_project() {
        let store = MemoryStore::new();
        let project = store.insert_project(sample_params()).await;
        let report = coverage_report(1.1);

        let mismatch = store
            .upsert_stage_result(project.id, StageKind::Capacity, report.headline(), report.clone())
            .await;
        assert!(matches!(mismatch, Err(InterfaceError::Conflict(_))));

        let missing = store
            .upsert_stage_result(ProjectId(99), StageKind::Coverage, report.headline(), report)
            .await;
        assert!(matches!(missing, Err(InterfaceError::NotFound { entity: "Project", .. })));
        assert!(store.stage_results(project.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_site_lifecycle() {
        let store = MemoryStore::new();
        let project = store.insert_project(sample_params()).await;

        for name in ["North", "East"] {
            store
                .create_site(NewSite {
                    project_id: project.id,
                    name: name.to_string(),
                    latitude: 43.3,
                    longitude: 5.37,
                    radius_km: 1.1,
                })
                .await
                .unwrap();
        }

        let sites = store.list_sites(project.id).await.unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name, "North");
        assert!(sites[0].id < sites[1].id);

        store.delete_site(sites[0].id).await.unwrap();
        assert_eq!(store.list_sites(project.id).await.unwrap().len(), 1);
        assert!(store.delete_site(sites[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_project_keeps_stage_results() {
        let store = MemoryStore::new();
        let project = store.insert_project(sample_params()).await;
        let report = coverage_report(1.1);
        let stored = store
            .upsert_stage_result(project.id, StageKind::Coverage, report.headline(), report)
            .await
            .unwrap();

        let mut params = sample_params();
        params.area_km2 = 25.0;
        params.zone_type = ZoneType::Urban;
        let updated = store.update_project(project.id, params).await.unwrap();
        assert_eq!(updated.params.area_km2, 25.0);
        assert_eq!(
            store.fetch_project(project.id).await.unwrap().unwrap().params.zone_type,
            ZoneType::Urban
        );
        assert_eq!(store.stage_results(project.id).await, vec![stored]);

        let missing = store.update_project(ProjectId(99), sample_params()).await;
        assert!(matches!(missing, Err(InterfaceError::NotFound { entity: "Project", .. })));
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let store = MemoryStore::new();
        let project = store.insert_project(sample_params()).await;
        let report = coverage_report(1.1);
        store
            .upsert_stage_result(project.id, StageKind::Coverage, report.headline(), report)
            .await
            .unwrap();

        store.delete_project(project.id).await.unwrap();
        assert!(store.fetch_project(project.id).await.unwrap().is_none());
        assert!(store.stage_results(project.id).await.is_empty());
    }
}
