//! Compartmental accumulation simulator.
//!
//! Each route delivers a fixed fraction of its particles to each organ.
//! Organ uptake is the route-weighted sum of those deliveries; the burden is
//! either uptake scaled by a retention factor or, in first-order mode, the
//! compartment content after integrating constant daily uptake against
//! first-order clearance:
//!
//! dB/dt = uptake − k·B,  B(0) = 0
//!
//! The simulator holds only a validated, read-only parameter table, so it
//! is `Send + Sync` and every call is a pure function of its input.

use crate::config::{AccumulationMode, TransferParameters};
use crate::error::SimulationError;
use crate::exposure::{ExposureTotals, Route, RouteTotals};

use super::integrator::{IntegratorConfig, RK4Integrator};
use super::{Organ, OrganBurdenTable};

/// Deterministic organ-burden model
#[derive(Debug, Clone)]
pub struct AccumulationSimulator {
    params: TransferParameters,
}

impl AccumulationSimulator {
    /// Build a simulator, rejecting incomplete or inconsistent tables
    pub fn new(params: TransferParameters) -> Result<Self, SimulationError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TransferParameters {
        &self.params
    }

    /// Predict per-organ burden for one exposure record
    pub fn simulate(&self, exposure: &ExposureTotals) -> Result<OrganBurdenTable, SimulationError> {
        let routes = exposure.validate()?;
        let uptake = self.uptake(&routes);

        let table = match self.params.accumulation {
            AccumulationMode::Retention => OrganBurdenTable::from_fn(|organ| {
                uptake[organ_slot(organ)] * self.params.retention[&organ]
            }),
            AccumulationMode::FirstOrder {
                horizon_days,
                dt_days,
            } => {
                let burdens = self.integrate(&uptake, horizon_days, dt_days);
                OrganBurdenTable::from_fn(|organ| burdens[organ_slot(organ)])
            }
        };

        log::debug!(
            "Simulated burden: total={:.3} (oral={}, inhalation={}, dermal={})",
            table.total(),
            routes.oral,
            routes.inhalation,
            routes.dermal
        );
        Ok(table)
    }

    /// Parse dynamic JSON exposure data and simulate it
    pub fn simulate_json(&self, value: &serde_json::Value) -> Result<OrganBurdenTable, SimulationError> {
        let exposure = ExposureTotals::from_json_value(value)?;
        self.simulate(&exposure)
    }

    /// Particles reaching each organ, indexed by `Organ::ALL` position
    fn uptake(&self, routes: &RouteTotals) -> [f64; Organ::COUNT] {
        let mut uptake = [0.0; Organ::COUNT];
        for organ in Organ::ALL {
            uptake[organ_slot(organ)] = Route::ALL
                .iter()
                .map(|&route| routes.get(route) * self.params.fractions[&route][&organ])
                .sum();
        }
        uptake
    }

    fn integrate(
        &self,
        uptake: &[f64; Organ::COUNT],
        horizon_days: f64,
        dt_days: f64,
    ) -> Vec<f64> {
        let clearance: Vec<f64> = Organ::ALL
            .iter()
            .map(|organ| self.params.clearance_per_day[organ])
            .collect();

        let mut integrator = RK4Integrator::new(Organ::ALL.len(), IntegratorConfig { dt_days });
        let mut burdens = vec![0.0; Organ::COUNT];
        integrator.run(
            &mut burdens,
            |state: &[f64], dydt: &mut [f64]| {
                for i in 0..state.len() {
                    dydt[i] = uptake[i] - clearance[i] * state[i];
                }
            },
            horizon_days,
        );
        burdens
    }
}

#[inline]
fn organ_slot(organ: Organ) -> usize {
    organ as usize
}

/// One-shot simulation with a given parameter table
pub fn run_digital_twin(
    exposure: &ExposureTotals,
    params: &TransferParameters,
) -> Result<OrganBurdenTable, SimulationError> {
    AccumulationSimulator::new(params.clone())?.simulate(exposure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn table(oral_liver: f64, inhalation_liver: f64) -> TransferParameters {
        let mut params = TransferParameters::default();
        params
            .fractions
            .get_mut(&Route::Oral)
            .unwrap()
            .insert(Organ::Liver, oral_liver);
        params
            .fractions
            .get_mut(&Route::Inhalation)
            .unwrap()
            .insert(Organ::Liver, inhalation_liver);
        params.retention = Organ::ALL.into_iter().map(|o| (o, 1.0)).collect();
        params
    }

    fn counts(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_liver_scenario_arithmetic() {
        let sim = AccumulationSimulator::new(table(0.40, 0.10)).unwrap();
        let exposure = ExposureTotals::new(
            counts(&[("food_a", 100)]),
            counts(&[("air_a", 50)]),
            BTreeMap::new(),
        );
        let burdens = sim.simulate(&exposure).unwrap();
        assert!((burdens.get(Organ::Liver).unwrap() - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_retention_scales_uptake() {
        let mut params = table(0.40, 0.10);
        params.retention.insert(Organ::Liver, 0.5);
        let sim = AccumulationSimulator::new(params).unwrap();
        let exposure = ExposureTotals::new(counts(&[("food_a", 100)]), BTreeMap::new(), BTreeMap::new());
        let burdens = sim.simulate(&exposure).unwrap();
        assert!((burdens.get(Organ::Liver).unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_exposure_gives_zero_burden() {
        let sim = AccumulationSimulator::new(TransferParameters::default()).unwrap();
        let burdens = sim.simulate(&ExposureTotals::zero()).unwrap();
        assert_eq!(burdens.len(), Organ::ALL.len());
        assert!(burdens.iter().all(|row| row.microplastic_count == 0.0));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut params = TransferParameters::default();
        params.retention.clear();
        assert!(matches!(
            AccumulationSimulator::new(params),
            Err(SimulationError::Configuration(_))
        ));
    }

    #[test]
    fn test_first_order_matches_analytic_solution() {
        let mut params = table(0.40, 0.10);
        params.accumulation = AccumulationMode::FirstOrder {
            horizon_days: 30.0,
            dt_days: 0.1,
        };
        params.clearance_per_day = Organ::ALL.into_iter().map(|o| (o, 0.05)).collect();
        let sim = AccumulationSimulator::new(params).unwrap();

        let exposure = ExposureTotals::new(counts(&[("food_a", 100)]), BTreeMap::new(), BTreeMap::new());
        let burdens = sim.simulate(&exposure).unwrap();

        // u/k (1 - e^{-kT}) with u = 40/day, k = 0.05/day, T = 30 days
        let expected = 40.0 / 0.05 * (1.0 - (-0.05_f64 * 30.0).exp());
        let liver = burdens.get(Organ::Liver).unwrap();
        assert!((liver - expected).abs() / expected < 1e-8, "{} vs {}", liver, expected);
    }

    #[test]
    fn test_first_order_without_clearance_accumulates_linearly() {
        let mut params = table(0.40, 0.10);
        params.accumulation = AccumulationMode::FirstOrder {
            horizon_days: 10.0,
            dt_days: 1.0,
        };
        params.clearance_per_day = Organ::ALL.into_iter().map(|o| (o, 0.0)).collect();
        let sim = AccumulationSimulator::new(params).unwrap();

        let exposure = ExposureTotals::new(BTreeMap::new(), counts(&[("air", 10)]), BTreeMap::new());
        let burdens = sim.simulate(&exposure).unwrap();
        assert!((burdens.get(Organ::Liver).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_digital_twin_propagates_errors() {
        let mut exposure = ExposureTotals::zero();
        exposure.oral_total = None;
        assert!(matches!(
            run_digital_twin(&exposure, &TransferParameters::default()),
            Err(SimulationError::InvalidInput(_))
        ));
    }
}
