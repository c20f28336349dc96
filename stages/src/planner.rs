//! Planner
//!
//! Entry point for the planning operations. Each stage loads the project,
//! gathers its prerequisites from the stage graph, computes, and upserts
//! exactly one result.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use common::{NewSite, Project, ProjectId, Site, SiteId, StageKind, StageReport, StageResult};
use interfaces::{Geocoder, PlanningStore};

use crate::capacity::{self, CapacityParams, TrafficProfile};
use crate::dimensioning::{self, CostParams};
use crate::graph::{self, PipelineStage};
use crate::placement::{self, PlacementSettings};
use crate::propagation::{self, PropagationParams, RadioSetup};
use crate::StageError;

/// Planner tuning
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerSettings {
    pub placement: PlacementSettings,
}

/// Inputs for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub propagation: PropagationParams,
    pub capacity: CapacityParams,
    pub cost: CostParams,
    /// Run site placement after dimensioning
    pub place_sites: bool,
}

/// Everything a full pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub project: Project,
    pub coverage: StageResult,
    pub capacity: StageResult,
    pub dimensioning: StageResult,
    pub sites: Vec<Site>,
}

/// Planning operations over a store and a geocoder
pub struct Planner {
    store: Arc<dyn PlanningStore>,
    geocoder: Arc<dyn Geocoder>,
    settings: PlannerSettings,
}

impl Planner {
    /// Create a planner with default settings
    pub fn new(store: Arc<dyn PlanningStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self::with_settings(store, geocoder, PlannerSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn PlanningStore>,
        geocoder: Arc<dyn Geocoder>,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            store,
            geocoder,
            settings,
        }
    }

    async fn load_project(&self, id: ProjectId) -> Result<Project, StageError> {
        self.store
            .fetch_project(id)
            .await?
            .ok_or(StageError::ProjectNotFound(id))
    }

    async fn persist(&self, project: ProjectId, report: StageReport) -> Result<StageResult, StageError> {
        let result = self
            .store
            .upsert_stage_result(project, report.kind(), report.headline(), report)
            .await?;
        Ok(result)
    }

    /// COVERAGE stage
    pub async fn compute_coverage(
        &self,
        project_id: ProjectId,
        params: &PropagationParams,
    ) -> Result<StageResult, StageError> {
        info!("Computing coverage for project {}", project_id);
        let project = self.load_project(project_id).await?;
        graph::gather_prerequisites(self.store.as_ref(), project_id, PipelineStage::Coverage)
            .await?;

        let radio = RadioSetup::from_project(&project.params)?;
        let report = propagation::compute_coverage(&radio, params)?;
        let result = self.persist(project_id, StageReport::Coverage(report)).await?;

        info!(
            "Coverage for project {}: {:?}",
            project_id, result.headline
        );
        Ok(result)
    }

    /// CAPACITY stage
    pub async fn compute_capacity(
        &self,
        project_id: ProjectId,
        params: &CapacityParams,
    ) -> Result<StageResult, StageError> {
        info!("Computing capacity for project {}", project_id);
        let project = self.load_project(project_id).await?;
        graph::gather_prerequisites(self.store.as_ref(), project_id, PipelineStage::Capacity)
            .await?;

        let traffic = TrafficProfile::from_project(&project.params)?;
        let report = capacity::compute_capacity(&traffic, params)?;
        let result = self.persist(project_id, StageReport::Capacity(report)).await?;

        info!(
            "Capacity for project {}: {:?}",
            project_id, result.headline
        );
        Ok(result)
    }

    /// GNODEB stage
    pub async fn compute_dimensioning(
        &self,
        project_id: ProjectId,
        cost: &CostParams,
    ) -> Result<StageResult, StageError> {
        info!("Computing dimensioning for project {}", project_id);
        let project = self.load_project(project_id).await?;
        let prerequisites =
            graph::gather_prerequisites(self.store.as_ref(), project_id, PipelineStage::Dimensioning)
                .await?;

        let report = dimensioning::reconcile(
            &project.params,
            prerequisites.coverage()?,
            prerequisites.capacity()?,
            cost,
        )?;
        let result = self.persist(project_id, StageReport::Gnodeb(report)).await?;

        info!(
            "Dimensioning for project {}: {:?}",
            project_id, result.headline
        );
        Ok(result)
    }

    /// Place the dimensioned stations around the project reference point
    ///
    /// Every call appends a fresh set of sites. Geocoding failures fall back
    /// to placeholder labels and never abort placement. A store failure
    /// removes the sites this call already wrote.
    pub async fn generate_sites(&self, project_id: ProjectId) -> Result<Vec<Site>, StageError> {
        info!("Generating sites for project {}", project_id);
        let project = self.load_project(project_id).await?;
        let reference = project
            .params
            .reference_point()
            .ok_or(StageError::MissingReferenceLocation(project_id))?;
        reference.validate()?;

        let prerequisites =
            graph::gather_prerequisites(self.store.as_ref(), project_id, PipelineStage::Placement)
                .await?;
        let count = prerequisites.dimensioning()?.stations_required;
        let radius_km = prerequisites.coverage()?.radius_km;

        if count == 0 {
            info!("Project {} needs no stations, nothing to place", project_id);
            return Ok(Vec::new());
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(StageError::PrerequisiteMissing {
                stage: PipelineStage::Placement,
                missing: vec![StageKind::Coverage],
            });
        }
        let limit = self.settings.placement.max_sites;
        if count > limit {
            return Err(StageError::TooManySites {
                requested: count,
                limit,
            });
        }

        let points = placement::radial_layout(reference, count, radius_km);
        let labels =
            placement::resolve_labels(self.geocoder.as_ref(), &points, &self.settings.placement)
                .await;

        let planned: Vec<NewSite> = points
            .into_iter()
            .zip(labels)
            .map(|(point, name)| NewSite {
                project_id,
                name,
                latitude: point.latitude,
                longitude: point.longitude,
                radius_km,
            })
            .collect();
        for site in &planned {
            site.validate()?;
        }

        let mut sites = Vec::with_capacity(planned.len());
        for site in planned {
            match self.store.create_site(site).await {
                Ok(stored) => {
                    debug!(
                        "Placed site {} \"{}\" at ({:.5}, {:.5})",
                        stored.id, stored.name, stored.latitude, stored.longitude
                    );
                    sites.push(stored);
                }
                Err(e) => {
                    self.discard_sites(&sites).await;
                    return Err(e.into());
                }
            }
        }

        info!(
            "Generated {} sites for project {} at radius {:.3} km",
            sites.len(),
            project_id,
            radius_km
        );
        Ok(sites)
    }

    /// Undo a partially persisted placement run
    async fn discard_sites(&self, sites: &[Site]) {
        warn!("Site placement failed, removing {} sites placed so far", sites.len());
        for site in sites {
            if let Err(e) = self.store.delete_site(site.id).await {
                warn!("Failed to remove site {}: {}", site.id, e);
            }
        }
    }

    /// Create a site by hand
    pub async fn add_site(&self, site: NewSite) -> Result<Site, StageError> {
        site.validate()?;
        self.load_project(site.project_id).await?;
        let stored = self.store.create_site(site).await?;
        info!("Added site {} to project {}", stored.id, stored.project_id);
        Ok(stored)
    }

    /// Sites of a project in creation order
    pub async fn sites(&self, project_id: ProjectId) -> Result<Vec<Site>, StageError> {
        Ok(self.store.list_sites(project_id).await?)
    }

    pub async fn remove_site(&self, id: SiteId) -> Result<(), StageError> {
        self.store.delete_site(id).await?;
        info!("Removed site {}", id);
        Ok(())
    }

    /// Run every stage in dependency order
    ///
    /// The two leaves run concurrently; dimensioning and placement follow.
    pub async fn run_pipeline(
        &self,
        project_id: ProjectId,
        inputs: &PipelineInputs,
    ) -> Result<PlanSummary, StageError> {
        debug!("Pipeline order: {:?}", graph::execution_order());

        let (coverage, capacity) = tokio::try_join!(
            self.compute_coverage(project_id, &inputs.propagation),
            self.compute_capacity(project_id, &inputs.capacity),
        )?;
        let dimensioning = self.compute_dimensioning(project_id, &inputs.cost).await?;

        let sites = if inputs.place_sites {
            self.generate_sites(project_id).await?
        } else {
            info!("Site placement skipped for project {}", project_id);
            Vec::new()
        };

        Ok(PlanSummary {
            project: self.load_project(project_id).await?,
            coverage,
            capacity,
            dimensioning,
            sites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{haversine_km, initial_bearing_deg, UNKNOWN_SITE, UNNAMED_SITE};
    use async_trait::async_trait;
    use common::{
        DimensioningReport, GeoPoint, Headline, ProjectParams, Service, UserId, ZoneType,
    };
    use interfaces::{InterfaceError, MemoryStore, OfflineGeocoder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn label_for(&self, _point: GeoPoint) -> Result<Option<String>, InterfaceError> {
            Err(InterfaceError::ApiError("OVER_QUERY_LIMIT".to_string()))
        }
    }

    /// Delegates to a `MemoryStore` but fails the Nth `create_site`
    struct FlakyStore {
        inner: MemoryStore,
        fail_on: usize,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl PlanningStore for FlakyStore {
        async fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, InterfaceError> {
            self.inner.fetch_project(id).await
        }

        async fn fetch_stage_result(
            &self,
            project: ProjectId,
            kind: StageKind,
        ) -> Result<Option<StageResult>, InterfaceError> {
            self.inner.fetch_stage_result(project, kind).await
        }

        async fn upsert_stage_result(
            &self,
            project: ProjectId,
            kind: StageKind,
            headline: Headline,
            report: StageReport,
        ) -> Result<StageResult, InterfaceError> {
            self.inner
                .upsert_stage_result(project, kind, headline, report)
                .await
        }

        async fn create_site(&self, site: NewSite) -> Result<Site, InterfaceError> {
            if self.creates.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(InterfaceError::Backend("disk full".to_string()));
            }
            self.inner.create_site(site).await
        }

        async fn list_sites(&self, project: ProjectId) -> Result<Vec<Site>, InterfaceError> {
            self.inner.list_sites(project).await
        }

        async fn delete_site(&self, id: SiteId) -> Result<(), InterfaceError> {
            self.inner.delete_site(id).await
        }
    }

    fn marseille(zone_type: ZoneType) -> ProjectParams {
        ProjectParams {
            owner: UserId(1),
            name: "Marseille Vieux-Port".to_string(),
            description: Some("Harbour rollout".to_string()),
            area_km2: 10.0,
            user_density: 500.0,
            frequency_ghz: 2.1,
            bandwidth_mhz: 100.0,
            zone_type,
            services: [Service::Embb, Service::Urllc].into_iter().collect(),
            power_dbm: Some(40.0),
            antenna_height_m: Some(30.0),
            user_height_m: Some(1.5),
            latitude: Some(43.2965),
            longitude: Some(5.3698),
        }
    }

    fn inputs() -> PipelineInputs {
        PipelineInputs {
            propagation: PropagationParams::new(15.0, 2.0, -100.0).unwrap(),
            capacity: CapacityParams::new(20.0, "64QAM", 2.0).unwrap(),
            cost: CostParams::new(50000.0, "USD").unwrap(),
            place_sites: true,
        }
    }

    async fn setup(params: ProjectParams) -> (Arc<MemoryStore>, Planner, ProjectId) {
        let store = Arc::new(MemoryStore::new());
        let project = store.insert_project(params).await;
        let planner = Planner::new(store.clone(), Arc::new(OfflineGeocoder));
        (store, planner, project.id)
    }

    #[tokio::test]
    async fn test_worked_example_pipeline() {
        let (_store, planner, id) = setup(marseille(ZoneType::Suburban)).await;

        let summary = planner.run_pipeline(id, &inputs()).await.unwrap();

        let coverage = summary.coverage.coverage().unwrap();
        assert!((coverage.radius_km - 1.102).abs() < 1e-3);
        assert_eq!(summary.capacity.capacity().unwrap().max_users, 922);

        let dimensioning = summary.dimensioning.dimensioning().unwrap();
        assert_eq!(dimensioning.stations_required, 6);
        assert_eq!(dimensioning.estimated_cost_display, "300,000 USD");
        assert_eq!(summary.dimensioning.headline, Headline::StationCount(6));

        assert_eq!(summary.sites.len(), 6);
        assert!(summary.sites.iter().all(|s| s.name == UNNAMED_SITE));
        assert!(summary.sites.iter().all(|s| s.radius_km == coverage.radius_km));
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let (store, planner, id) = setup(marseille(ZoneType::Rural)).await;
        let inputs = inputs();

        let coverage = [
            planner.compute_coverage(id, &inputs.propagation).await.unwrap(),
            planner.compute_coverage(id, &inputs.propagation).await.unwrap(),
        ];
        let capacity = [
            planner.compute_capacity(id, &inputs.capacity).await.unwrap(),
            planner.compute_capacity(id, &inputs.capacity).await.unwrap(),
        ];
        let gnodeb = [
            planner.compute_dimensioning(id, &inputs.cost).await.unwrap(),
            planner.compute_dimensioning(id, &inputs.cost).await.unwrap(),
        ];

        for [first, second] in [coverage, capacity, gnodeb] {
            assert_eq!(first.report, second.report);
            assert_eq!(first.headline, second.headline);
        }

        let stored = store.stage_results(id).await;
        let kinds: Vec<StageKind> = stored.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_dimensioning_requires_both_leaves() {
        let (store, planner, id) = setup(marseille(ZoneType::Suburban)).await;
        let inputs = inputs();

        let err = planner.compute_dimensioning(id, &inputs.cost).await.unwrap_err();
        match err {
            StageError::PrerequisiteMissing { stage, missing } => {
                assert_eq!(stage, PipelineStage::Dimensioning);
                assert_eq!(missing, vec![StageKind::Coverage, StageKind::Capacity]);
            }
            other => panic!("unexpected error: {other}"),
        }

        planner.compute_coverage(id, &inputs.propagation).await.unwrap();
        let err = planner.compute_dimensioning(id, &inputs.cost).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::PrerequisiteMissing { ref missing, .. } if missing == &vec![StageKind::Capacity]
        ));
        assert!(store
            .fetch_stage_result(id, StageKind::Gnodeb)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_urban_worked_example_stores_nothing() {
        let (store, planner, id) = setup(marseille(ZoneType::Urban)).await;

        let err = planner
            .compute_coverage(id, &inputs().propagation)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InfeasibleGeometry(_)));
        assert!(store.stage_results(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let (_store, planner, _id) = setup(marseille(ZoneType::Rural)).await;
        let err = planner
            .compute_capacity(ProjectId(404), &inputs().capacity)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ProjectNotFound(ProjectId(404))));
    }

    #[tokio::test]
    async fn test_placement_needs_reference_location_first() {
        let mut params = marseille(ZoneType::Suburban);
        params.latitude = None;
        params.longitude = None;
        let (_store, planner, id) = setup(params).await;

        // No stage has run, yet the location error wins
        let err = planner.generate_sites(id).await.unwrap_err();
        assert!(matches!(err, StageError::MissingReferenceLocation(_)));
    }

    #[tokio::test]
    async fn test_placement_geometry() {
        let (_store, planner, id) = setup(marseille(ZoneType::Suburban)).await;
        let mut inputs = inputs();
        inputs.place_sites = false;
        let summary = planner.run_pipeline(id, &inputs).await.unwrap();
        assert!(summary.sites.is_empty());

        let sites = planner.generate_sites(id).await.unwrap();
        let radius = summary.coverage.coverage().unwrap().radius_km;
        let center = GeoPoint::new(43.2965, 5.3698);
        let step = 360.0 / sites.len() as f64;

        let bearings: Vec<f64> = sites
            .iter()
            .map(|s| initial_bearing_deg(center, s.location()))
            .collect();
        assert!(bearings[0] < 0.05 || bearings[0] > 359.95);
        for pair in bearings.windows(2) {
            assert!(((pair[1] - pair[0]).rem_euclid(360.0) - step).abs() < 0.05);
        }
        for site in &sites {
            assert!((haversine_km(center, site.location()) - radius).abs() < 1e-3);
        }
        assert_eq!(planner.sites(id).await.unwrap().len(), sites.len());
    }

    #[tokio::test]
    async fn test_zero_stations_places_nothing() {
        let (store, planner, id) = setup(marseille(ZoneType::Suburban)).await;
        planner
            .compute_coverage(id, &inputs().propagation)
            .await
            .unwrap();

        let report = StageReport::Gnodeb(DimensioningReport {
            area_km2: 10.0,
            user_density: 500.0,
            total_users: 0.0,
            coverage_per_station_km2: 3.8,
            max_users_per_station: 922,
            stations_for_coverage: 0,
            stations_for_capacity: 0,
            stations_required: 0,
            coverage_efficiency_pct: 0.0,
            cost_per_station: 50000.0,
            currency: "USD".to_string(),
            estimated_cost: 0.0,
            estimated_cost_display: "0 USD".to_string(),
        });
        store
            .upsert_stage_result(id, StageKind::Gnodeb, report.headline(), report)
            .await
            .unwrap();

        assert!(planner.generate_sites(id).await.unwrap().is_empty());
        assert!(planner.sites(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_removes_partial_placement() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_on: 4,
            creates: AtomicUsize::new(0),
        });
        let id = store.inner.insert_project(marseille(ZoneType::Suburban)).await.id;
        let planner = Planner::new(store.clone(), Arc::new(OfflineGeocoder));
        let mut inputs = inputs();
        inputs.place_sites = false;
        planner.run_pipeline(id, &inputs).await.unwrap();

        let err = planner.generate_sites(id).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::Persistence(InterfaceError::Backend(ref msg)) if msg == "disk full"
        ));
        assert_eq!(store.creates.load(Ordering::SeqCst), 4);
        assert!(store.list_sites(id).await.unwrap().is_empty());

        // The next run goes through and stores one full set
        let sites = planner.generate_sites(id).await.unwrap();
        assert_eq!(sites.len(), 6);
        assert_eq!(store.list_sites(id).await.unwrap(), sites);
    }

    #[tokio::test]
    async fn test_placement_respects_site_limit() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert_project(marseille(ZoneType::Suburban)).await.id;
        let settings = PlannerSettings {
            placement: PlacementSettings {
                max_sites: 5,
                ..PlacementSettings::default()
            },
        };
        let planner = Planner::with_settings(store.clone(), Arc::new(OfflineGeocoder), settings);

        let mut inputs = inputs();
        inputs.place_sites = false;
        planner.run_pipeline(id, &inputs).await.unwrap();

        let err = planner.generate_sites(id).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::TooManySites {
                requested: 6,
                limit: 5
            }
        ));
        assert!(store.list_sites(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_geocoder_failure_does_not_abort_placement() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert_project(marseille(ZoneType::Suburban)).await.id;
        let planner = Planner::new(store.clone(), Arc::new(FailingGeocoder));

        let summary = planner.run_pipeline(id, &inputs()).await.unwrap();
        assert_eq!(summary.sites.len(), 6);
        assert!(summary.sites.iter().all(|s| s.name == UNKNOWN_SITE));
    }

    #[tokio::test]
    async fn test_manual_site_management() {
        let (store, planner, id) = setup(marseille(ZoneType::Suburban)).await;

        let site = planner
            .add_site(NewSite {
                project_id: id,
                name: "Fort Saint-Jean rooftop".to_string(),
                latitude: 43.2951,
                longitude: 5.3610,
                radius_km: 0.8,
            })
            .await
            .unwrap();
        assert_eq!(planner.sites(id).await.unwrap(), vec![site.clone()]);

        let invalid = planner
            .add_site(NewSite {
                project_id: id,
                name: "Offshore".to_string(),
                latitude: 95.0,
                longitude: 5.0,
                radius_km: 1.0,
            })
            .await;
        assert!(matches!(invalid, Err(StageError::Validation(_))));

        let orphan = planner
            .add_site(NewSite {
                project_id: ProjectId(77),
                name: "Nowhere".to_string(),
                latitude: 43.0,
                longitude: 5.0,
                radius_km: 1.0,
            })
            .await;
        assert!(matches!(orphan, Err(StageError::ProjectNotFound(_))));

        planner.remove_site(site.id).await.unwrap();
        assert!(store.list_sites(id).await.unwrap().is_empty());
        assert!(matches!(
            planner.remove_site(site.id).await,
            Err(StageError::Persistence(InterfaceError::NotFound { .. }))
        ));
    }
}
