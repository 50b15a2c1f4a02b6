//! Error types for the simulator and the surrounding pipeline.
//!
//! The simulator core only ever fails with [`SimulationError`]. Pipeline
//! stages (survey loading, image lookup, counting) wrap it in
//! [`PipelineError`] so a caller can match on one type per call site.

use std::path::PathBuf;

use thiserror::Error;

use crate::histology::BurdenLevel;
use crate::twin::Organ;

/// Failure of the accumulation simulator or the exposure estimator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Exposure input is null, incomplete, or out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The parameter table is incomplete or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SimulationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Failure of a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("survey error: {0}")]
    Survey(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("no eligible participant in survey")]
    NoEligibleParticipant,

    #[error("no histology image for {organ} ({level}) in {}", dir.display())]
    ImageNotFound {
        organ: Organ,
        level: BurdenLevel,
        dir: PathBuf,
    },

    /// A stage was run before the stage it depends on.
    #[error("pipeline stage not run yet: {0}")]
    MissingStage(&'static str),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_simulation_errors() {
        let err = SimulationError::invalid("oral_total is missing");
        assert_eq!(err.to_string(), "invalid input: oral_total is missing");

        let err = SimulationError::config("no fraction for oral -> Liver");
        assert!(err.to_string().starts_with("configuration error"));
    }

    #[test]
    fn simulation_error_passes_through_pipeline_error() {
        let err: PipelineError = SimulationError::invalid("negative count").into();
        assert_eq!(err.to_string(), "invalid input: negative count");
        assert!(matches!(
            err,
            PipelineError::Simulation(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn display_image_not_found() {
        let err = PipelineError::ImageNotFound {
            organ: Organ::Liver,
            level: BurdenLevel::High,
            dir: PathBuf::from("data/histology"),
        };
        let msg = err.to_string();
        assert!(msg.contains("Liver"));
        assert!(msg.contains("high"));
        assert!(msg.contains("data/histology"));
    }
}
