//! Survey-driven exposure estimation.
//!
//! Each configured source reads one survey column, multiplies it by a
//! particles-per-unit factor and credits the result to a route/category.

use super::{ExposureTotals, Route};
use crate::config::{ExposureParameters, ExposureSource};
use crate::error::SimulationError;
use crate::survey::Participant;

/// Converts a participant's survey answers into route-specific exposure.
pub trait ExposureEstimator: Send + Sync {
    fn estimate(&self, participant: &Participant) -> Result<ExposureTotals, SimulationError>;
}

/// Linear estimator driven by an [`ExposureParameters`] table
#[derive(Debug, Clone)]
pub struct TableEstimator {
    params: ExposureParameters,
}

impl TableEstimator {
    pub fn new(params: ExposureParameters) -> Result<Self, SimulationError> {
        for source in &params.sources {
            if !source.particles_per_unit.is_finite() || source.particles_per_unit < 0.0 {
                return Err(SimulationError::config(format!(
                    "particles_per_unit for '{}' must be finite and non-negative, got {}",
                    source.column, source.particles_per_unit
                )));
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &ExposureParameters {
        &self.params
    }

    fn source_count(
        source: &ExposureSource,
        participant: &Participant,
    ) -> Result<i64, SimulationError> {
        let raw = participant.get(&source.column).ok_or_else(|| {
            SimulationError::invalid(format!(
                "participant {} has no '{}' answer",
                participant.id(),
                source.column
            ))
        })?;

        // Blank answers count as none
        if raw.is_empty() {
            return Ok(0);
        }

        let amount: f64 = raw.parse().map_err(|_| {
            SimulationError::invalid(format!(
                "'{}' = '{}' is not a number (participant {})",
                source.column,
                raw,
                participant.id()
            ))
        })?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimulationError::invalid(format!(
                "'{}' must be a non-negative amount, got {} (participant {})",
                source.column,
                amount,
                participant.id()
            )));
        }

        let particles = (amount * source.particles_per_unit).round();
        if !particles.is_finite() || particles >= i64::MAX as f64 {
            return Err(SimulationError::invalid(format!(
                "'{}' = {} gives more particles than can be counted (participant {})",
                source.column,
                amount,
                participant.id()
            )));
        }
        Ok(particles as i64)
    }
}

impl ExposureEstimator for TableEstimator {
    fn estimate(&self, participant: &Participant) -> Result<ExposureTotals, SimulationError> {
        // Every route is reported even when no source feeds it
        let mut totals = ExposureTotals::zero();
        for source in &self.params.sources {
            let count = Self::source_count(source, participant)?;
            totals.add(source.route, &source.category, count);
        }

        log::debug!(
            "Exposure for participant {}: oral={} inhalation={} dermal={}",
            participant.id(),
            totals.route_sum(Route::Oral),
            totals.route_sum(Route::Inhalation),
            totals.route_sum(Route::Dermal)
        );
        Ok(totals)
    }
}

/// Estimate exposure for one participant with the given parameter table
pub fn run_exposure_model(
    participant: &Participant,
    params: &ExposureParameters,
) -> Result<ExposureTotals, SimulationError> {
    TableEstimator::new(params.clone())?.estimate(participant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(fields: &[(&str, &str)]) -> Participant {
        Participant::from_pairs(Some("P-7"), fields)
    }

    fn params() -> ExposureParameters {
        ExposureParameters {
            sources: vec![
                ExposureSource {
                    column: "Bottled".to_string(),
                    route: Route::Oral,
                    category: "bottled_water".to_string(),
                    particles_per_unit: 240.0,
                },
                ExposureSource {
                    column: "Seafood".to_string(),
                    route: Route::Oral,
                    category: "seafood".to_string(),
                    particles_per_unit: 11.0,
                },
                ExposureSource {
                    column: "Indoor".to_string(),
                    route: Route::Inhalation,
                    category: "indoor_air".to_string(),
                    particles_per_unit: 11.0,
                },
            ],
        }
    }

    #[test]
    fn test_linear_estimate() {
        let p = participant(&[("Bottled", "1.5"), ("Seafood", "2"), ("Indoor", "20")]);
        let totals = run_exposure_model(&p, &params()).unwrap();

        let oral = totals.oral_total.as_ref().unwrap();
        assert_eq!(oral["bottled_water"], 360);
        assert_eq!(oral["seafood"], 22);
        assert_eq!(totals.route_sum(Route::Inhalation), 220);
        // No dermal source, but the route is still present
        assert_eq!(totals.dermal_total, Some(Default::default()));
        assert!(totals.validate().is_ok());
    }

    #[test]
    fn test_rounds_to_whole_particles() {
        let p = participant(&[("Bottled", "0.001"), ("Seafood", "0.08"), ("Indoor", "0")]);
        let totals = run_exposure_model(&p, &params()).unwrap();
        let oral = totals.oral_total.unwrap();
        assert_eq!(oral["bottled_water"], 0); // 0.24
        assert_eq!(oral["seafood"], 1); // 0.88
    }

    #[test]
    fn test_blank_answer_is_zero() {
        let p = participant(&[("Bottled", ""), ("Seafood", "1"), ("Indoor", "1")]);
        let totals = run_exposure_model(&p, &params()).unwrap();
        assert_eq!(totals.oral_total.unwrap()["bottled_water"], 0);
    }

    #[test]
    fn test_missing_column() {
        let p = participant(&[("Bottled", "1")]);
        let err = run_exposure_model(&p, &params()).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
        assert!(err.to_string().contains("Seafood"));
    }

    #[test]
    fn test_non_numeric_and_negative_answers() {
        let p = participant(&[("Bottled", "lots"), ("Seafood", "1"), ("Indoor", "1")]);
        assert!(matches!(
            run_exposure_model(&p, &params()),
            Err(SimulationError::InvalidInput(_))
        ));

        let p = participant(&[("Bottled", "-2"), ("Seafood", "1"), ("Indoor", "1")]);
        assert!(matches!(
            run_exposure_model(&p, &params()),
            Err(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_out_of_range_answer_is_invalid() {
        let p = participant(&[("Bottled", "1e300"), ("Seafood", "1"), ("Indoor", "1")]);
        let err = run_exposure_model(&p, &params()).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
        assert!(err.to_string().contains("Bottled"));

        // Overflows f64 after scaling
        let p = participant(&[("Bottled", "1e307"), ("Seafood", "1"), ("Indoor", "1")]);
        assert!(matches!(
            run_exposure_model(&p, &params()),
            Err(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_factor_is_configuration_error() {
        let mut bad = params();
        bad.sources[0].particles_per_unit = -1.0;
        assert!(matches!(
            TableEstimator::new(bad),
            Err(SimulationError::Configuration(_))
        ));
    }
}
