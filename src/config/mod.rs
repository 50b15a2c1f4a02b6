//! Configuration module for loading model and pipeline parameters.
//!
//! Parameters are plain JSON files; anything missing falls back to the
//! built-in demonstration defaults.

mod parameters;

pub use parameters::{
    AccumulationMode, CounterParameters, ExposureParameters, ExposureSource,
    HistologyParameters, Parameters, SurveyParameters, TransferParameters,
};
