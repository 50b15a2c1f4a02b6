//! Per-organ burden table.

use serde::{Deserialize, Serialize};

use super::Organ;

/// One row of the burden table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrganBurden {
    #[serde(rename = "Organ")]
    pub organ: Organ,
    /// Predicted particle-equivalent burden
    #[serde(rename = "Microplastic_Count")]
    pub microplastic_count: f64,
}

/// Predicted burden for every modelled organ, in [`Organ::ALL`] order.
///
/// Only the simulator builds these, so a table always has exactly one row
/// per organ.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrganBurdenTable {
    rows: Vec<OrganBurden>,
}

impl OrganBurdenTable {
    pub(crate) fn from_fn<F>(mut burden: F) -> Self
    where
        F: FnMut(Organ) -> f64,
    {
        Self {
            rows: Organ::ALL
                .into_iter()
                .map(|organ| OrganBurden {
                    organ,
                    microplastic_count: burden(organ),
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[OrganBurden] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrganBurden> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Burden for one organ
    pub fn get(&self, organ: Organ) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.organ == organ)
            .map(|row| row.microplastic_count)
    }

    /// Burden summed over all organs
    pub fn total(&self) -> f64 {
        self.rows.iter().map(|row| row.microplastic_count).sum()
    }
}

impl<'a> IntoIterator for &'a OrganBurdenTable {
    type Item = &'a OrganBurden;
    type IntoIter = std::slice::Iter<'a, OrganBurden>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
