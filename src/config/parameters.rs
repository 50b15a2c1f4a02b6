//! Parameter structures for every pipeline stage.
//!
//! The transfer table is the auditable part of the model: the default set
//! below is an illustrative demonstration table, not fitted values. Real
//! studies should ship their own `transfer.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::exposure::Route;
use crate::twin::integrator::{step_count, MAX_STEPS};
use crate::twin::Organ;

/// Slack allowed when checking that a route's fractions sum to at most one.
const FRACTION_SUM_TOLERANCE: f64 = 1e-9;

/// Top-level parameters container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Route-to-organ transfer coefficients and accumulation settings
    pub transfer: TransferParameters,
    /// Survey column to exposure source mapping
    pub exposure: ExposureParameters,
    /// Survey loading and participant eligibility
    pub survey: SurveyParameters,
    /// Histology image library
    pub histology: HistologyParameters,
    /// Threshold particle counter
    pub counter: CounterParameters,
}

impl Parameters {
    /// Load parameters from JSON files, or use defaults if files don't exist
    pub fn load_or_default() -> Self {
        Self::load_from_dir("data/parameters")
    }

    /// Load parameters from specific directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            transfer: load_json_or_default(dir.join("transfer.json"), "transfer"),
            exposure: load_json_or_default(dir.join("exposure.json"), "exposure"),
            survey: load_json_or_default(dir.join("survey.json"), "survey"),
            histology: load_json_or_default(dir.join("histology.json"), "histology"),
            counter: load_json_or_default(dir.join("counter.json"), "counter"),
        }
    }
}

fn load_json_or_default<T, P>(path: P, label: &str) -> T
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(params) => {
                log::info!("Loaded {} parameters from {:?}", label, path.as_ref());
                params
            }
            Err(e) => {
                log::warn!("Failed to parse {} parameters: {}, using defaults", label, e);
                T::default()
            }
        },
        Err(_) => {
            log::info!("{} parameters file not found, using defaults", label);
            T::default()
        }
    }
}

/// How organ uptake turns into a reported burden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AccumulationMode {
    /// burden = uptake × retention
    #[default]
    Retention,
    /// Uptake is a daily intake into a compartment with first-order
    /// clearance, integrated from zero up to `horizon_days`.
    FirstOrder {
        /// Modelled time point (days)
        horizon_days: f64,
        /// Integration step (days)
        dt_days: f64,
    },
}

/// Compartmental transfer parameters
///
/// `fractions[route][organ]` is the share of a route's particles that
/// reaches the organ. Whatever a route does not deliver is excreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferParameters {
    /// Route → organ transfer coefficients (fraction, 0-1)
    pub fractions: BTreeMap<Route, BTreeMap<Organ, f64>>,

    /// Organ retention factor applied in `retention` mode
    /// (1.0 = everything delivered stays)
    pub retention: BTreeMap<Organ, f64>,

    /// Accumulation mode
    #[serde(default)]
    pub accumulation: AccumulationMode,

    /// First-order clearance rate (1/day), required in `first_order` mode
    #[serde(default)]
    pub clearance_per_day: BTreeMap<Organ, f64>,
}

impl TransferParameters {
    /// Load from a JSON file, failing instead of falling back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SimulationError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let params: Self = serde_json::from_str(&contents).map_err(|e| {
            SimulationError::config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        params.validate()?;
        log::info!("Loaded transfer parameters from {:?}", path);
        Ok(params)
    }

    /// Look up the transfer coefficient for one route/organ pair
    pub fn fraction(&self, route: Route, organ: Organ) -> Option<f64> {
        self.fractions.get(&route)?.get(&organ).copied()
    }

    /// Check that the table is complete and physically meaningful
    pub fn validate(&self) -> Result<(), SimulationError> {
        for route in Route::ALL {
            let mut sum = 0.0;
            for organ in Organ::ALL {
                let fraction = self.fraction(route, organ).ok_or_else(|| {
                    SimulationError::config(format!(
                        "no transfer coefficient for {} -> {}",
                        route, organ
                    ))
                })?;
                if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                    return Err(SimulationError::config(format!(
                        "transfer coefficient {} -> {} must be within [0, 1], got {}",
                        route, organ, fraction
                    )));
                }
                sum += fraction;
            }
            if sum > 1.0 + FRACTION_SUM_TOLERANCE {
                return Err(SimulationError::config(format!(
                    "{} fractions sum to {:.6}, more than the route delivers",
                    route, sum
                )));
            }
        }

        for organ in Organ::ALL {
            let retention = self.retention.get(&organ).copied().ok_or_else(|| {
                SimulationError::config(format!("no retention factor for {}", organ))
            })?;
            if !retention.is_finite() || retention < 0.0 {
                return Err(SimulationError::config(format!(
                    "retention for {} must be finite and non-negative, got {}",
                    organ, retention
                )));
            }
        }

        if let AccumulationMode::FirstOrder {
            horizon_days,
            dt_days,
        } = self.accumulation
        {
            if !horizon_days.is_finite() || horizon_days < 0.0 {
                return Err(SimulationError::config(format!(
                    "horizon_days must be finite and non-negative, got {}",
                    horizon_days
                )));
            }
            if !dt_days.is_finite() || dt_days <= 0.0 {
                return Err(SimulationError::config(format!(
                    "dt_days must be finite and positive, got {}",
                    dt_days
                )));
            }
            let steps = step_count(horizon_days, dt_days);
            if steps > MAX_STEPS as f64 {
                return Err(SimulationError::config(format!(
                    "horizon_days / dt_days needs {} steps, at most {} allowed",
                    steps, MAX_STEPS
                )));
            }
            for organ in Organ::ALL {
                let k = self.clearance_per_day.get(&organ).copied().ok_or_else(|| {
                    SimulationError::config(format!("no clearance rate for {}", organ))
                })?;
                if !k.is_finite() || k < 0.0 {
                    return Err(SimulationError::config(format!(
                        "clearance for {} must be finite and non-negative, got {}",
                        organ, k
                    )));
                }
                // k·dt above one lets RK4 overshoot below zero
                if k * dt_days > 1.0 {
                    return Err(SimulationError::config(format!(
                        "clearance for {} ({} /day) is too fast for dt_days = {}",
                        organ, k, dt_days
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for TransferParameters {
    fn default() -> Self {
        use Organ::{Brain, Gut, Kidney, Liver, Lung};

        let oral = BTreeMap::from([
            (Gut, 0.25),
            (Liver, 0.05),
            (Lung, 0.0),
            (Kidney, 0.02),
            (Brain, 0.005),
        ]);
        // Mucociliary clearance swallows part of the inhaled load
        let inhalation = BTreeMap::from([
            (Gut, 0.10),
            (Liver, 0.02),
            (Lung, 0.45),
            (Kidney, 0.01),
            (Brain, 0.005),
        ]);
        // Intact skin is a strong barrier
        let dermal = BTreeMap::from([
            (Gut, 0.0),
            (Liver, 0.005),
            (Lung, 0.0),
            (Kidney, 0.002),
            (Brain, 0.0005),
        ]);

        Self {
            fractions: BTreeMap::from([
                (Route::Oral, oral),
                (Route::Inhalation, inhalation),
                (Route::Dermal, dermal),
            ]),
            retention: BTreeMap::from([
                (Gut, 0.1),
                (Liver, 0.6),
                (Lung, 0.5),
                (Kidney, 0.4),
                (Brain, 0.9),
            ]),
            accumulation: AccumulationMode::Retention,
            clearance_per_day: BTreeMap::from([
                (Gut, 0.5),
                (Liver, 0.02),
                (Lung, 0.05),
                (Kidney, 0.03),
                (Brain, 0.005),
            ]),
        }
    }
}

/// One survey column feeding one exposure source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSource {
    /// Survey column holding the activity amount
    pub column: String,
    /// Route the particles enter by
    pub route: Route,
    /// Source category reported in the exposure totals
    pub category: String,
    /// Particles per unit of the column value
    pub particles_per_unit: f64,
}

impl ExposureSource {
    fn new(column: &str, route: Route, category: &str, particles_per_unit: f64) -> Self {
        Self {
            column: column.to_string(),
            route,
            category: category.to_string(),
            particles_per_unit,
        }
    }
}

/// Exposure estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureParameters {
    pub sources: Vec<ExposureSource>,
}

impl Default for ExposureParameters {
    fn default() -> Self {
        // Order-of-magnitude daily emission factors.
        // Source: Cox et al., Environ Sci Technol 2019; Kosuth et al., PLoS One 2018;
        // Vianello et al., Sci Rep 2019
        Self {
            sources: vec![
                ExposureSource::new("Bottled_Water_L_per_Day", Route::Oral, "bottled_water", 240.0),
                ExposureSource::new("Tap_Water_L_per_Day", Route::Oral, "tap_water", 5.5),
                ExposureSource::new("Seafood_Servings_per_Day", Route::Oral, "seafood", 11.0),
                ExposureSource::new("Indoor_Hours_per_Day", Route::Inhalation, "indoor_air", 11.0),
                ExposureSource::new("Outdoor_Hours_per_Day", Route::Inhalation, "outdoor_air", 2.0),
                ExposureSource::new(
                    "Synthetic_Clothing_Hours_per_Day",
                    Route::Dermal,
                    "synthetic_textiles",
                    1.0,
                ),
                ExposureSource::new(
                    "Cosmetic_Applications_per_Day",
                    Route::Dermal,
                    "personal_care",
                    4.0,
                ),
            ],
        }
    }
}

/// Survey loading parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyParameters {
    /// Column holding the participant identifier
    pub index_column: String,
    /// Participants eligible for selection (empty = everyone)
    #[serde(default)]
    pub allowed_participant_ids: Vec<String>,
}

impl Default for SurveyParameters {
    fn default() -> Self {
        Self {
            index_column: "Participant_Index".to_string(),
            allowed_participant_ids: Vec::new(),
        }
    }
}

/// Histology image library parameters
///
/// Burden thresholds are in particles and grade a burden into
/// low / moderate / high / severe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistologyParameters {
    pub image_dir: String,
    pub moderate_threshold: f64,
    pub high_threshold: f64,
    pub severe_threshold: f64,
}

impl Default for HistologyParameters {
    fn default() -> Self {
        Self {
            image_dir: "data/histology".to_string(),
            moderate_threshold: 10.0,
            high_threshold: 50.0,
            severe_threshold: 200.0,
        }
    }
}

/// Threshold particle counter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterParameters {
    /// Grayscale cut-off (0-255) separating particles from background
    pub threshold: u8,
    /// Smallest connected blob counted as a particle (pixels)
    pub min_area_px: usize,
    /// Particles are brighter than the background (fluorescence stains)
    #[serde(default)]
    pub bright_particles: bool,
}

impl Default for CounterParameters {
    fn default() -> Self {
        Self {
            threshold: 100,
            min_area_px: 4,
            bright_particles: false,
        }
    }
}
