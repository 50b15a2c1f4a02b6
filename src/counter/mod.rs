//! Particle counting on histology images.
//!
//! [`ParticleCounter`] is the seam a trained detector plugs into. The
//! bundled [`ThresholdCounter`] thresholds the grayscale image and counts
//! 4-connected blobs, which is enough for the synthetic sections the
//! histology library ships.

use std::collections::VecDeque;
use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::config::CounterParameters;
use crate::error::Result;

/// Absolute error below which a human count matches the model
pub const MATCH_TOLERANCE: u64 = 5;

/// Counts particles in an image.
pub trait ParticleCounter: Send + Sync {
    fn count(&self, image_path: &Path) -> Result<u64>;
}

/// Threshold + connected-component counter
#[derive(Debug, Clone)]
pub struct ThresholdCounter {
    params: CounterParameters,
}

impl ThresholdCounter {
    pub fn new(params: CounterParameters) -> Self {
        Self { params }
    }

    fn is_particle(&self, luma: u8) -> bool {
        if self.params.bright_particles {
            luma > self.params.threshold
        } else {
            luma < self.params.threshold
        }
    }

    /// Count blobs in an already decoded image
    pub fn count_image(&self, img: &GrayImage) -> u64 {
        let (width, height) = img.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut visited = vec![false; w * h];
        let mut queue = VecDeque::new();
        let mut count = 0;

        for start in 0..w * h {
            if visited[start] || !self.is_particle(img.as_raw()[start]) {
                continue;
            }

            // Flood fill one blob
            visited[start] = true;
            queue.push_back(start);
            let mut area = 0usize;
            while let Some(idx) = queue.pop_front() {
                area += 1;
                let (x, y) = (idx % w, idx / w);
                let neighbours = [
                    (x > 0).then(|| idx - 1),
                    (x + 1 < w).then(|| idx + 1),
                    (y > 0).then(|| idx - w),
                    (y + 1 < h).then(|| idx + w),
                ];
                for n in neighbours.into_iter().flatten() {
                    if !visited[n] && self.is_particle(img.as_raw()[n]) {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }

            if area >= self.params.min_area_px {
                count += 1;
            }
        }
        count
    }
}

impl ParticleCounter for ThresholdCounter {
    fn count(&self, image_path: &Path) -> Result<u64> {
        let img = image::open(image_path)?.to_luma8();
        let count = self.count_image(&img);
        log::info!("Counted {} particles in {}", count, image_path.display());
        Ok(count)
    }
}

/// Count particles with the given counter parameters
pub fn run_cnn_inference(image_path: &Path, params: &CounterParameters) -> Result<u64> {
    ThresholdCounter::new(params.clone()).count(image_path)
}

/// Human estimate versus model count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountComparison {
    pub human: u64,
    pub model: u64,
    pub absolute_error: u64,
}

impl CountComparison {
    pub fn new(human: u64, model: u64) -> Self {
        Self {
            human,
            model,
            absolute_error: human.abs_diff(model),
        }
    }

    /// True when the human count is within [`MATCH_TOLERANCE`] of the model
    pub fn matches_model(&self) -> bool {
        self.absolute_error < MATCH_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    /// White field with dark square particles of the given side at the given corners
    fn field(particles: &[(u32, u32, u32)]) -> GrayImage {
        ImageBuffer::from_fn(64, 64, |x, y| {
            let inside = particles
                .iter()
                .any(|&(px, py, s)| x >= px && x < px + s && y >= py && y < py + s);
            if inside {
                Luma([20u8])
            } else {
                Luma([230u8])
            }
        })
    }

    #[test]
    fn test_counts_separate_blobs() {
        let img = field(&[(2, 2, 3), (20, 20, 4), (40, 5, 3), (50, 50, 5)]);
        let counter = ThresholdCounter::new(CounterParameters::default());
        assert_eq!(counter.count_image(&img), 4);
    }

    #[test]
    fn test_ignores_specks_below_min_area() {
        // 1x1 speck is below the default 4 px minimum
        let img = field(&[(2, 2, 1), (20, 20, 3)]);
        let counter = ThresholdCounter::new(CounterParameters::default());
        assert_eq!(counter.count_image(&img), 1);
    }

    #[test]
    fn test_touching_squares_are_one_blob() {
        let img = field(&[(10, 10, 3), (13, 10, 3)]);
        let counter = ThresholdCounter::new(CounterParameters::default());
        assert_eq!(counter.count_image(&img), 1);
    }

    #[test]
    fn test_bright_particles() {
        let img: GrayImage = ImageBuffer::from_fn(16, 16, |x, y| {
            if (2..5).contains(&x) && (2..5).contains(&y) {
                Luma([250u8])
            } else {
                Luma([10u8])
            }
        });
        let counter = ThresholdCounter::new(CounterParameters {
            bright_particles: true,
            ..CounterParameters::default()
        });
        assert_eq!(counter.count_image(&img), 1);
    }

    #[test]
    fn test_counts_png_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liver.png");
        field(&[(5, 5, 3), (30, 30, 3)]).save(&path).unwrap();

        let count = run_cnn_inference(&path, &CounterParameters::default()).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unreadable_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(run_cnn_inference(&path, &CounterParameters::default()).is_err());
    }

    #[test]
    fn test_comparison_tolerance() {
        let close = CountComparison::new(12, 16);
        assert_eq!(close.absolute_error, 4);
        assert!(close.matches_model());

        let far = CountComparison::new(20, 15);
        assert_eq!(far.absolute_error, 5);
        assert!(!far.matches_model());
    }
}
