//! Exposure data model.
//!
//! [`ExposureTotals`] is the wire shape produced by the exposure estimator:
//! three route mappings from source category to particle count. A route that
//! is absent is missing data; a route with an empty mapping is zero exposure.
//! [`ExposureTotals::validate`] turns the former into an error and reduces
//! the latter to [`RouteTotals`].

mod estimator;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

pub use estimator::{run_exposure_model, ExposureEstimator, TableEstimator};

/// Exposure pathway by which particles enter the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Oral,
    Inhalation,
    Dermal,
}

impl Route {
    /// All routes in reporting order
    pub const ALL: [Route; 3] = [Route::Oral, Route::Inhalation, Route::Dermal];

    pub fn name(&self) -> &'static str {
        match self {
            Route::Oral => "oral",
            Route::Inhalation => "inhalation",
            Route::Dermal => "dermal",
        }
    }

    /// Field name in [`ExposureTotals`]
    pub fn field_name(&self) -> &'static str {
        match self {
            Route::Oral => "oral_total",
            Route::Inhalation => "inhalation_total",
            Route::Dermal => "dermal_total",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Particle counts per source category for one route
pub type CategoryCounts = BTreeMap<String, i64>;

/// Route-specific particle counts for one participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oral_total: Option<CategoryCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inhalation_total: Option<CategoryCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dermal_total: Option<CategoryCounts>,
}

impl ExposureTotals {
    /// Totals with every route present
    pub fn new(oral: CategoryCounts, inhalation: CategoryCounts, dermal: CategoryCounts) -> Self {
        Self {
            oral_total: Some(oral),
            inhalation_total: Some(inhalation),
            dermal_total: Some(dermal),
        }
    }

    /// Every route present and empty
    pub fn zero() -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new(), BTreeMap::new())
    }

    /// Parse exposure data arriving as dynamic JSON.
    ///
    /// `null`, non-object values, fractional or non-numeric counts all fail
    /// with `InvalidInput`.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, SimulationError> {
        if value.is_null() {
            return Err(SimulationError::invalid("exposure data is null"));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| SimulationError::invalid(format!("malformed exposure data: {}", e)))
    }

    pub fn route(&self, route: Route) -> Option<&CategoryCounts> {
        match route {
            Route::Oral => self.oral_total.as_ref(),
            Route::Inhalation => self.inhalation_total.as_ref(),
            Route::Dermal => self.dermal_total.as_ref(),
        }
    }

    fn route_mut(&mut self, route: Route) -> &mut CategoryCounts {
        let slot = match route {
            Route::Oral => &mut self.oral_total,
            Route::Inhalation => &mut self.inhalation_total,
            Route::Dermal => &mut self.dermal_total,
        };
        slot.get_or_insert_with(BTreeMap::new)
    }

    /// Add particles to a category, creating the route if needed
    pub fn add(&mut self, route: Route, category: &str, count: i64) {
        let entry = self.route_mut(route).entry(category.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Sum of a route's categories (0 when the route is missing)
    pub fn route_sum(&self, route: Route) -> i64 {
        self.route(route)
            .map(|counts| counts.values().fold(0i64, |acc, &c| acc.saturating_add(c)))
            .unwrap_or(0)
    }

    /// Check completeness and sign, then reduce to per-route totals
    pub fn validate(&self) -> Result<RouteTotals, SimulationError> {
        let mut totals = RouteTotals::default();
        for route in Route::ALL {
            let counts = self.route(route).ok_or_else(|| {
                SimulationError::invalid(format!("{} is missing", route.field_name()))
            })?;

            let mut sum: i64 = 0;
            for (category, &count) in counts {
                if count < 0 {
                    return Err(SimulationError::invalid(format!(
                        "{}[{}] is negative ({})",
                        route.field_name(),
                        category,
                        count
                    )));
                }
                sum = sum.checked_add(count).ok_or_else(|| {
                    SimulationError::invalid(format!("{} overflows", route.field_name()))
                })?;
            }
            totals.set(route, sum as f64);
        }
        Ok(totals)
    }
}

/// Validated per-route particle totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteTotals {
    pub oral: f64,
    pub inhalation: f64,
    pub dermal: f64,
}

impl RouteTotals {
    pub fn get(&self, route: Route) -> f64 {
        match route {
            Route::Oral => self.oral,
            Route::Inhalation => self.inhalation,
            Route::Dermal => self.dermal,
        }
    }

    fn set(&mut self, route: Route, value: f64) {
        match route {
            Route::Oral => self.oral = value,
            Route::Inhalation => self.inhalation = value,
            Route::Dermal => self.dermal = value,
        }
    }

    pub fn is_zero(&self) -> bool {
        Route::ALL.iter().all(|&r| self.get(r) == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_sums_categories() {
        let totals = ExposureTotals::new(
            BTreeMap::from([("food_a".to_string(), 100), ("food_b".to_string(), 20)]),
            BTreeMap::from([("air_a".to_string(), 50)]),
            BTreeMap::new(),
        );
        let routes = totals.validate().unwrap();
        assert_eq!(routes.oral, 120.0);
        assert_eq!(routes.inhalation, 50.0);
        assert_eq!(routes.dermal, 0.0);
    }

    #[test]
    fn test_missing_route_is_invalid() {
        let totals = ExposureTotals {
            oral_total: Some(BTreeMap::new()),
            inhalation_total: None,
            dermal_total: Some(BTreeMap::new()),
        };
        let err = totals.validate().unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidInput("inhalation_total is missing".to_string())
        );
    }

    #[test]
    fn test_negative_count_is_invalid() {
        let mut totals = ExposureTotals::zero();
        totals.add(Route::Dermal, "lotion", -3);
        let err = totals.validate().unwrap_err();
        assert!(err.to_string().contains("dermal_total[lotion]"));
    }

    #[test]
    fn test_null_json_is_invalid() {
        let err = ExposureTotals::from_json_value(&serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
    }

    #[test]
    fn test_scalar_route_json_is_invalid() {
        let value = json!({"oral_total": -1, "inhalation_total": {}, "dermal_total": {}});
        assert!(matches!(
            ExposureTotals::from_json_value(&value),
            Err(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_absent_json_route_is_missing() {
        let value = json!({"oral_total": {"food_a": 1}, "dermal_total": {}});
        let totals = ExposureTotals::from_json_value(&value).unwrap();
        assert!(totals.inhalation_total.is_none());
        assert!(totals.validate().is_err());
    }

    #[test]
    fn test_route_sum_and_add() {
        let mut totals = ExposureTotals::default();
        totals.add(Route::Oral, "seafood", 11);
        totals.add(Route::Oral, "seafood", 4);
        totals.add(Route::Oral, "tap_water", 5);
        assert_eq!(totals.route_sum(Route::Oral), 20);
        assert_eq!(totals.route_sum(Route::Dermal), 0);
        assert_eq!(totals.oral_total.unwrap()["seafood"], 15);
    }

    #[test]
    fn test_route_serde_names() {
        assert_eq!(serde_json::to_string(&Route::Inhalation).unwrap(), "\"inhalation\"");
        assert_eq!(Route::Dermal.field_name(), "dermal_total");
    }
}
