//! Explicit session state and the staged pipeline that fills it.
//!
//! A [`Session`] belongs to the caller and carries one participant's results
//! from stage to stage. [`Pipeline`] owns the read-only model and the
//! collaborators, so one pipeline can serve many sessions.

use std::path::PathBuf;

use rand::Rng;
use serde::Serialize;

use crate::config::Parameters;
use crate::counter::{CountComparison, ParticleCounter, ThresholdCounter};
use crate::error::{PipelineError, Result};
use crate::exposure::{ExposureEstimator, ExposureTotals, Route, TableEstimator};
use crate::histology::{HistologyLibrary, HistologyResolver};
use crate::survey::{select_random_participant, Participant, Survey};
use crate::twin::{AccumulationSimulator, Organ, OrganBurdenTable};

/// Histology image chosen for one organ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistologySelection {
    /// Organ the burden was read from (differs from the request on fallback)
    pub organ: Organ,
    pub burden: f64,
    pub image: PathBuf,
}

/// Headline per-route particle totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExposureSummary {
    pub ingestion: i64,
    pub inhalation: i64,
    pub dermal: i64,
}

impl From<&ExposureTotals> for ExposureSummary {
    fn from(totals: &ExposureTotals) -> Self {
        Self {
            ingestion: totals.route_sum(Route::Oral),
            inhalation: totals.route_sum(Route::Inhalation),
            dermal: totals.route_sum(Route::Dermal),
        }
    }
}

/// Results for the currently selected participant
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub participant: Option<Participant>,
    pub exposure: Option<ExposureTotals>,
    pub burdens: Option<OrganBurdenTable>,
    pub histology: Option<HistologySelection>,
    pub comparison: Option<CountComparison>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new participant and drop everything derived from the old one
    pub fn set_participant(&mut self, participant: Participant) {
        *self = Self {
            participant: Some(participant),
            ..Self::default()
        };
    }

    pub fn exposure_summary(&self) -> Option<ExposureSummary> {
        self.exposure.as_ref().map(ExposureSummary::from)
    }
}

/// Staged microplastic pipeline
pub struct Pipeline {
    simulator: AccumulationSimulator,
    estimator: Box<dyn ExposureEstimator>,
    resolver: Box<dyn HistologyResolver>,
    counter: Box<dyn ParticleCounter>,
    allowed_participant_ids: Vec<String>,
}

impl Pipeline {
    /// Build the default pipeline from a parameter set
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            simulator: AccumulationSimulator::new(params.transfer.clone())?,
            estimator: Box::new(TableEstimator::new(params.exposure.clone())?),
            resolver: Box::new(HistologyLibrary::new(params.histology.clone())?),
            counter: Box::new(ThresholdCounter::new(params.counter.clone())),
            allowed_participant_ids: params.survey.allowed_participant_ids.clone(),
        })
    }

    /// Build a pipeline around custom collaborators
    pub fn new(
        simulator: AccumulationSimulator,
        estimator: Box<dyn ExposureEstimator>,
        resolver: Box<dyn HistologyResolver>,
        counter: Box<dyn ParticleCounter>,
    ) -> Self {
        Self {
            simulator,
            estimator,
            resolver,
            counter,
            allowed_participant_ids: Vec::new(),
        }
    }

    pub fn with_allowed_participants(mut self, ids: Vec<String>) -> Self {
        self.allowed_participant_ids = ids;
        self
    }

    pub fn simulator(&self) -> &AccumulationSimulator {
        &self.simulator
    }

    /// Stage 1: pick a participant at random
    pub fn select_participant<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        survey: &Survey,
        rng: &mut R,
    ) -> Result<()> {
        let participant = select_random_participant(survey, rng, &self.allowed_participant_ids)?;
        session.set_participant(participant);
        Ok(())
    }

    /// Stage 2: estimate route exposure
    pub fn assess_exposure(&self, session: &mut Session) -> Result<()> {
        let participant = session
            .participant
            .as_ref()
            .ok_or(PipelineError::MissingStage("participant selection"))?;
        let exposure = self.estimator.estimate(participant)?;
        session.exposure = Some(exposure);
        session.burdens = None;
        session.histology = None;
        session.comparison = None;
        Ok(())
    }

    /// Stage 3: run the compartmental simulation
    pub fn simulate(&self, session: &mut Session) -> Result<()> {
        let exposure = session
            .exposure
            .as_ref()
            .ok_or(PipelineError::MissingStage("exposure assessment"))?;
        let burdens = self.simulator.simulate(exposure)?;
        session.burdens = Some(burdens);
        session.histology = None;
        session.comparison = None;
        Ok(())
    }

    /// Stage 4: look up a histology image for `organ`.
    ///
    /// Falls back to the first table row if the organ has no burden.
    pub fn resolve_histology(&self, session: &mut Session, organ: Organ) -> Result<()> {
        let burdens = session
            .burdens
            .as_ref()
            .ok_or(PipelineError::MissingStage("simulation"))?;

        let (organ, burden) = match burdens.get(organ) {
            Some(burden) => (organ, burden),
            None => {
                let first = burdens
                    .rows()
                    .first()
                    .ok_or(PipelineError::MissingStage("simulation"))?;
                log::warn!("No burden for {}, using {}", organ, first.organ);
                (first.organ, first.microplastic_count)
            }
        };

        let image = self.resolver.resolve(organ, burden)?;
        session.histology = Some(HistologySelection {
            organ,
            burden,
            image,
        });
        session.comparison = None;
        Ok(())
    }

    /// Stage 5: count particles and compare with the human estimate
    pub fn count_particles(&self, session: &mut Session, human_guess: u64) -> Result<CountComparison> {
        let histology = session
            .histology
            .as_ref()
            .ok_or(PipelineError::MissingStage("histology lookup"))?;
        let model = self.counter.count(&histology.image)?;
        let comparison = CountComparison::new(human_guess, model);
        session.comparison = Some(comparison);
        Ok(comparison)
    }
}
