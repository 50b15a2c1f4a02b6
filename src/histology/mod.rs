//! Histology image lookup.
//!
//! Representative (synthetic) tissue sections are stored per organ and
//! burden grade. The resolver grades a predicted burden and returns the
//! closest image on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::HistologyParameters;
use crate::error::{PipelineError, Result, SimulationError};
use crate::twin::Organ;

/// Burden grade used to pick an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BurdenLevel {
    #[default]
    Low,
    Moderate,
    High,
    Severe,
}

impl BurdenLevel {
    /// Grade a burden against the configured thresholds
    pub fn from_burden(burden: f64, params: &HistologyParameters) -> Self {
        if burden >= params.severe_threshold {
            BurdenLevel::Severe
        } else if burden >= params.high_threshold {
            BurdenLevel::High
        } else if burden >= params.moderate_threshold {
            BurdenLevel::Moderate
        } else {
            BurdenLevel::Low
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BurdenLevel::Low => "low",
            BurdenLevel::Moderate => "moderate",
            BurdenLevel::High => "high",
            BurdenLevel::Severe => "severe",
        }
    }
}

impl fmt::Display for BurdenLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps an organ and its predicted burden to a representative image.
pub trait HistologyResolver: Send + Sync {
    fn resolve(&self, organ: Organ, burden: f64) -> Result<PathBuf>;
}

/// Directory of `<organ>_<level>.png` / `<organ>.png` images
#[derive(Debug, Clone)]
pub struct HistologyLibrary {
    params: HistologyParameters,
}

impl HistologyLibrary {
    /// Build a library, rejecting non-finite or misordered thresholds
    pub fn new(params: HistologyParameters) -> std::result::Result<Self, SimulationError> {
        let thresholds = [
            ("moderate_threshold", params.moderate_threshold),
            ("high_threshold", params.high_threshold),
            ("severe_threshold", params.severe_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if params.moderate_threshold > params.high_threshold
            || params.high_threshold > params.severe_threshold
        {
            return Err(SimulationError::config(format!(
                "histology thresholds must satisfy moderate <= high <= severe, got {} / {} / {}",
                params.moderate_threshold, params.high_threshold, params.severe_threshold
            )));
        }
        Ok(Self { params })
    }

    pub fn image_dir(&self) -> &Path {
        Path::new(&self.params.image_dir)
    }

    /// Candidate paths, most specific first
    pub fn candidates(&self, organ: Organ, level: BurdenLevel) -> [PathBuf; 2] {
        let organ_name = organ.name().to_ascii_lowercase();
        let dir = self.image_dir();
        [
            dir.join(format!("{}_{}.png", organ_name, level)),
            dir.join(format!("{}.png", organ_name)),
        ]
    }
}

impl HistologyResolver for HistologyLibrary {
    fn resolve(&self, organ: Organ, burden: f64) -> Result<PathBuf> {
        if !burden.is_finite() || burden < 0.0 {
            return Err(SimulationError::invalid(format!(
                "burden for {} must be finite and non-negative, got {}",
                organ, burden
            ))
            .into());
        }

        let level = BurdenLevel::from_burden(burden, &self.params);
        let found = self
            .candidates(organ, level)
            .into_iter()
            .find(|path| path.is_file());

        match found {
            Some(path) => {
                log::info!("Histology image for {} ({}): {}", organ, level, path.display());
                Ok(path)
            }
            None => Err(PipelineError::ImageNotFound {
                organ,
                level,
                dir: self.image_dir().to_path_buf(),
            }),
        }
    }
}

/// Resolve an image with the given library parameters
pub fn get_histology_image(
    organ: Organ,
    burden: f64,
    params: &HistologyParameters,
) -> Result<PathBuf> {
    HistologyLibrary::new(params.clone())?.resolve(organ, burden)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(dir: &Path) -> HistologyParameters {
        HistologyParameters {
            image_dir: dir.to_string_lossy().into_owned(),
            ..HistologyParameters::default()
        }
    }

    #[test]
    fn test_grading_thresholds() {
        let p = HistologyParameters::default();
        assert_eq!(BurdenLevel::from_burden(0.0, &p), BurdenLevel::Low);
        assert_eq!(BurdenLevel::from_burden(9.99, &p), BurdenLevel::Low);
        assert_eq!(BurdenLevel::from_burden(10.0, &p), BurdenLevel::Moderate);
        assert_eq!(BurdenLevel::from_burden(50.0, &p), BurdenLevel::High);
        assert_eq!(BurdenLevel::from_burden(1e6, &p), BurdenLevel::Severe);
    }

    #[test]
    fn test_prefers_graded_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("liver_high.png"), b"png").unwrap();
        std::fs::write(dir.path().join("liver.png"), b"png").unwrap();

        let path = get_histology_image(Organ::Liver, 75.0, &params(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("liver_high.png"));
    }

    #[test]
    fn test_falls_back_to_organ_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("liver.png"), b"png").unwrap();

        let path = get_histology_image(Organ::Liver, 3.0, &params(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("liver.png"));
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_histology_image(Organ::Brain, 3.0, &params(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ImageNotFound {
                organ: Organ::Brain,
                level: BurdenLevel::Low,
                ..
            }
        ));
    }

    #[test]
    fn test_misordered_thresholds_are_configuration_error() {
        let swapped = HistologyParameters {
            high_threshold: 300.0,
            ..HistologyParameters::default()
        };
        assert!(matches!(
            HistologyLibrary::new(swapped),
            Err(SimulationError::Configuration(_))
        ));

        let nan = HistologyParameters {
            moderate_threshold: f64::NAN,
            ..HistologyParameters::default()
        };
        let err = get_histology_image(Organ::Liver, 1.0, &nan).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Simulation(SimulationError::Configuration(_))
        ));

        assert!(HistologyLibrary::new(HistologyParameters::default()).is_ok());
    }

    #[test]
    fn test_negative_burden_is_invalid() {
        let err = get_histology_image(Organ::Liver, -1.0, &HistologyParameters::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Simulation(SimulationError::InvalidInput(_))
        ));
    }
}
