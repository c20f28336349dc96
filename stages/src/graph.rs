//! Stage Dependency Graph
//!
//! Declares which stored results each pipeline stage consumes and produces.
//! Every stage gathers its prerequisites through [`gather_prerequisites`]
//! before computing anything.

use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::debug;

use common::{CapacityReport, CoverageReport, DimensioningReport, ProjectId, StageKind, StageResult};
use interfaces::PlanningStore;

use crate::StageError;

/// A step of the planning pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Coverage,
    Capacity,
    Dimensioning,
    Placement,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 4] = [
        PipelineStage::Coverage,
        PipelineStage::Capacity,
        PipelineStage::Dimensioning,
        PipelineStage::Placement,
    ];

    /// Stored results that must exist before this stage runs
    pub fn requires(&self) -> &'static [StageKind] {
        match self {
            PipelineStage::Coverage | PipelineStage::Capacity => &[],
            PipelineStage::Dimensioning => &[StageKind::Coverage, StageKind::Capacity],
            PipelineStage::Placement => &[StageKind::Coverage, StageKind::Gnodeb],
        }
    }

    /// Stored result written by this stage; placement writes sites instead
    pub fn produces(&self) -> Option<StageKind> {
        match self {
            PipelineStage::Coverage => Some(StageKind::Coverage),
            PipelineStage::Capacity => Some(StageKind::Capacity),
            PipelineStage::Dimensioning => Some(StageKind::Gnodeb),
            PipelineStage::Placement => None,
        }
    }

    /// Stage that writes results of the given kind
    pub fn producer_of(kind: StageKind) -> PipelineStage {
        match kind {
            StageKind::Coverage => PipelineStage::Coverage,
            StageKind::Capacity => PipelineStage::Capacity,
            StageKind::Gnodeb => PipelineStage::Dimensioning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Coverage => "coverage",
            PipelineStage::Capacity => "capacity",
            PipelineStage::Dimensioning => "dimensioning",
            PipelineStage::Placement => "placement",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topological order of the pipeline (Kahn's algorithm)
///
/// Ties are broken by declaration order, so the independent leaves come
/// out as coverage then capacity. A cyclic declaration would leave the
/// stages on the cycle out of the returned order.
pub fn execution_order() -> Vec<PipelineStage> {
    let mut in_degree: BTreeMap<PipelineStage, usize> = PipelineStage::ALL
        .iter()
        .map(|stage| (*stage, stage.requires().len()))
        .collect();

    let mut ready: VecDeque<PipelineStage> = PipelineStage::ALL
        .iter()
        .copied()
        .filter(|stage| stage.requires().is_empty())
        .collect();

    let mut order = Vec::with_capacity(PipelineStage::ALL.len());
    while let Some(stage) = ready.pop_front() {
        order.push(stage);

        let Some(produced) = stage.produces() else {
            continue;
        };
        for dependent in PipelineStage::ALL {
            if !dependent.requires().contains(&produced) {
                continue;
            }
            if let Some(remaining) = in_degree.get_mut(&dependent) {
                *remaining -= 1;
                if *remaining == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    order
}

/// Prerequisite results fetched for one stage run
#[derive(Debug, Clone)]
pub struct Prerequisites {
    stage: PipelineStage,
    results: BTreeMap<StageKind, StageResult>,
}

impl Prerequisites {
    pub fn get(&self, kind: StageKind) -> Option<&StageResult> {
        self.results.get(&kind)
    }

    fn missing(&self, kind: StageKind) -> StageError {
        StageError::PrerequisiteMissing {
            stage: self.stage,
            missing: vec![kind],
        }
    }

    /// Coverage report, if this stage requires one
    pub fn coverage(&self) -> Result<&CoverageReport, StageError> {
        self.get(StageKind::Coverage)
            .and_then(StageResult::coverage)
            .ok_or_else(|| self.missing(StageKind::Coverage))
    }

    /// Capacity report, if this stage requires one
    pub fn capacity(&self) -> Result<&CapacityReport, StageError> {
        self.get(StageKind::Capacity)
            .and_then(StageResult::capacity)
            .ok_or_else(|| self.missing(StageKind::Capacity))
    }

    /// Dimensioning report, if this stage requires one
    pub fn dimensioning(&self) -> Result<&DimensioningReport, StageError> {
        self.get(StageKind::Gnodeb)
            .and_then(StageResult::dimensioning)
            .ok_or_else(|| self.missing(StageKind::Gnodeb))
    }
}

/// Fetch every result `stage` requires
///
/// Fails with `PrerequisiteMissing` naming all absent kinds at once.
pub async fn gather_prerequisites(
    store: &dyn PlanningStore,
    project: ProjectId,
    stage: PipelineStage,
) -> Result<Prerequisites, StageError> {
    let required = stage.requires();
    let fetched = try_join_all(
        required
            .iter()
            .map(|kind| store.fetch_stage_result(project, *kind)),
    )
    .await?;

    let mut results = BTreeMap::new();
    let mut missing = Vec::new();
    for (kind, result) in required.iter().zip(fetched) {
        match result {
            Some(result) => {
                results.insert(*kind, result);
            }
            None => missing.push(*kind),
        }
    }

    if !missing.is_empty() {
        debug!(
            "Project {} cannot run {}: missing {:?}",
            project, stage, missing
        );
        return Err(StageError::PrerequisiteMissing { stage, missing });
    }

    Ok(Prerequisites { stage, results })
}
