//! Camera and sampling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::spectrum::SpectralBins;
use crate::ConfigError;

/// Everything that controls a render, fixed once the render starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Field of view across the larger image dimension, in degrees
    pub field_of_view: f32,
    /// Depth from which Russian roulette applies
    pub ray_min_depth: u32,
    /// Hard limit on path depth
    pub ray_max_depth: u32,
    /// Russian roulette termination probability
    pub ray_extinction_prob: f32,
    /// Primary ray directions per pixel
    pub pixel_samples: u32,
    /// Independent path evaluations per primary direction
    pub rays: u32,
    /// Wavelength bins per path evaluation
    pub spectral_samples: u32,
    /// Image size (width, height)
    pub pixel_resolution: (u32, u32),
    /// Stratified jitter of primary rays inside the pixel
    pub sub_sample: bool,
    /// Whether the progress observer is called during the render
    pub display_progress: bool,
    /// Minimum wall-clock seconds between progress snapshots
    pub display_update_interval: f32,
    pub min_wavelength: f32,
    pub max_wavelength: f32,
    /// Seed for all sampling
    pub seed: u64,
    /// Intersections and spans closer than this are ignored
    pub degeneracy_epsilon: f32,
    /// Weight below which paths are stochastically culled (0 disables)
    pub importance_threshold: f32,
    /// Edge length of a render bucket in pixels
    pub bucket_size: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view: 45.0,
            ray_min_depth: 3,
            ray_max_depth: 100,
            ray_extinction_prob: 0.1,
            pixel_samples: 100,
            rays: 1,
            spectral_samples: 15,
            pixel_resolution: (512, 512),
            sub_sample: true,
            display_progress: true,
            display_update_interval: 10.0,
            min_wavelength: 375.0,
            max_wavelength: 740.0,
            seed: 0,
            degeneracy_epsilon: 1e-6,
            importance_threshold: 1e-3,
            bucket_size: 32,
        }
    }
}

impl CameraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view = degrees;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.pixel_resolution = (width, height);
        self
    }

    /// Set path depth limits and the roulette probability.
    pub fn with_depth(mut self, min_depth: u32, max_depth: u32, extinction_prob: f32) -> Self {
        self.ray_min_depth = min_depth;
        self.ray_max_depth = max_depth;
        self.ray_extinction_prob = extinction_prob;
        self
    }

    /// Set pixel samples, rays per sample and spectral bins.
    pub fn with_sampling(mut self, pixel_samples: u32, rays: u32, spectral_samples: u32) -> Self {
        self.pixel_samples = pixel_samples;
        self.rays = rays;
        self.spectral_samples = spectral_samples;
        self
    }

    pub fn with_sub_sample(mut self, enabled: bool) -> Self {
        self.sub_sample = enabled;
        self
    }

    /// Enable progress snapshots every `interval` seconds.
    pub fn with_progress(mut self, enabled: bool, interval: f32) -> Self {
        self.display_progress = enabled;
        self.display_update_interval = interval;
        self
    }

    pub fn with_wavelength_range(mut self, min: f32, max: f32) -> Self {
        self.min_wavelength = min;
        self.max_wavelength = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.degeneracy_epsilon = epsilon;
        self
    }

    pub fn with_importance_threshold(mut self, threshold: f32) -> Self {
        self.importance_threshold = threshold;
        self
    }

    pub fn with_bucket_size(mut self, size: u32) -> Self {
        self.bucket_size = size;
        self
    }

    /// Check every constraint; the first violation is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.ray_extinction_prob;
        if !(0.0..1.0).contains(&p) {
            return Err(ConfigError::ExtinctionProbability(p));
        }
        if self.ray_max_depth < self.ray_min_depth {
            return Err(ConfigError::DepthOrder {
                min: self.ray_min_depth,
                max: self.ray_max_depth,
            });
        }
        for (name, value) in [
            ("pixel_samples", self.pixel_samples),
            ("rays", self.rays),
            ("spectral_samples", self.spectral_samples),
            ("bucket_size", self.bucket_size),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount(name));
            }
        }

        let (width, height) = self.pixel_resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::Resolution { width, height });
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(ConfigError::FieldOfView(self.field_of_view));
        }
        let interval = self.display_update_interval;
        if interval < 0.0 || Duration::try_from_secs_f32(interval).is_err() {
            return Err(ConfigError::UpdateInterval(interval));
        }
        let (min, max) = (self.min_wavelength, self.max_wavelength);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
            return Err(ConfigError::WavelengthRange { min, max });
        }
        let eps = self.degeneracy_epsilon;
        if !(eps.is_finite() && eps > 0.0) {
            return Err(ConfigError::Epsilon(eps));
        }
        let threshold = self.importance_threshold;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::ImportanceThreshold(threshold));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.display_update_interval).unwrap_or(Duration::MAX)
    }

    pub fn bins(&self) -> SpectralBins {
        SpectralBins::new(
            self.min_wavelength,
            self.max_wavelength,
            self.spectral_samples as usize,
        )
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_resolution.0 as usize * self.pixel_resolution.1 as usize
    }
}
