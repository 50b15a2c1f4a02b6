//! MP-Twin - microplastic exposure and organ-burden digital twin
//!
//! Survey answers are turned into route-specific particle exposure, a
//! deterministic compartmental model predicts where those particles
//! accumulate, and a histology image for the target organ is counted and
//! compared with a human estimate.

pub mod config;
pub mod counter;
pub mod error;
pub mod export;
pub mod exposure;
pub mod histology;
pub mod session;
pub mod survey;
pub mod twin;

pub use config::{AccumulationMode, Parameters, TransferParameters};
pub use counter::{run_cnn_inference, CountComparison, ParticleCounter, ThresholdCounter};
pub use error::{PipelineError, SimulationError};
pub use exposure::{run_exposure_model, ExposureEstimator, ExposureTotals, Route, TableEstimator};
pub use histology::{get_histology_image, BurdenLevel, HistologyLibrary, HistologyResolver};
pub use session::{Pipeline, Session};
pub use survey::{select_random_participant, Participant, Survey};
pub use twin::{run_digital_twin, AccumulationSimulator, Organ, OrganBurden, OrganBurdenTable};
