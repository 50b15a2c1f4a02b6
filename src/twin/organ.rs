//! Modelled organ compartments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Organ compartment in the accumulation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Organ {
    Gut,
    Liver,
    Lung,
    Kidney,
    Brain,
}

impl Organ {
    pub const COUNT: usize = 5;

    /// Fixed organ set, in table order
    pub const ALL: [Organ; Organ::COUNT] = [
        Organ::Gut,
        Organ::Liver,
        Organ::Lung,
        Organ::Kidney,
        Organ::Brain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Organ::Gut => "Gut",
            Organ::Liver => "Liver",
            Organ::Lung => "Lung",
            Organ::Kidney => "Kidney",
            Organ::Brain => "Brain",
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Organ {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Organ::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown organ '{}'", s))
    }
}
