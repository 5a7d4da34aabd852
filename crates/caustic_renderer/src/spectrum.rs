//! Wavelength binning and binned radiance.

use caustic_core::color::{integrate_cie_xyz, luminance_normalisation};
use caustic_math::Vec3;
use rand::Rng;

use crate::ConfigError;

/// Division of `[min, max]` nm into equal-width bins.
///
/// Fixed per render and shared by every ray of that render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralBins {
    pub min_wavelength: f32,
    pub max_wavelength: f32,
    pub count: usize,
}

impl SpectralBins {
    pub fn new(min_wavelength: f32, max_wavelength: f32, count: usize) -> Self {
        Self {
            min_wavelength,
            max_wavelength,
            count,
        }
    }

    /// Width of one bin in nm.
    pub fn width(&self) -> f32 {
        (self.max_wavelength - self.min_wavelength) / self.count as f32
    }

    /// Lower and upper wavelength of bin `index`.
    pub fn range(&self, index: usize) -> (f32, f32) {
        let lower = self.min_wavelength + index as f32 * self.width();
        (lower, lower + self.width())
    }

    pub fn center(&self, index: usize) -> f32 {
        let (lower, upper) = self.range(index);
        0.5 * (lower + upper)
    }

    /// Uniformly jittered wavelength inside bin `index`.
    pub fn sample<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> f32 {
        let (lower, _) = self.range(index);
        lower + rng.gen::<f32>() * self.width()
    }

    /// Per-bin CIE XYZ weights, normalised so a flat unit spectrum has Y ≈ 1.
    pub fn xyz_weights(&self) -> Vec<Vec3> {
        let norm = luminance_normalisation();
        (0..self.count)
            .map(|i| {
                let (lower, upper) = self.range(i);
                integrate_cie_xyz(lower, upper) / norm
            })
            .collect()
    }
}

/// Radiance per wavelength bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    bins: SpectralBins,
    values: Vec<f32>,
}

impl Spectrum {
    /// A spectrum of zeros.
    pub fn zeros(bins: SpectralBins) -> Self {
        Self {
            bins,
            values: vec![0.0; bins.count],
        }
    }

    pub fn from_values(bins: SpectralBins, values: Vec<f32>) -> Result<Self, ConfigError> {
        if values.len() != bins.count {
            return Err(ConfigError::FrameMismatch);
        }
        Ok(Self { bins, values })
    }

    pub fn bins(&self) -> &SpectralBins {
        &self.bins
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Add another spectrum bin by bin. Binnings must match.
    pub fn accumulate(&mut self, other: &Spectrum) -> Result<(), ConfigError> {
        if other.bins != self.bins {
            return Err(ConfigError::FrameMismatch);
        }
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    pub fn scale(&mut self, factor: f32) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    /// Mean over bins.
    pub fn mean(&self) -> f32 {
        self.values.iter().sum::<f32>() / self.values.len().max(1) as f32
    }

    /// CIE XYZ given precomputed [`SpectralBins::xyz_weights`].
    pub fn to_xyz(&self, weights: &[Vec3]) -> Vec3 {
        self.values
            .iter()
            .zip(weights)
            .fold(Vec3::ZERO, |acc, (&v, &w)| acc + w * v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bin_ranges() {
        let bins = SpectralBins::new(400.0, 700.0, 3);
        assert_eq!(bins.width(), 100.0);
        assert_eq!(bins.range(1), (500.0, 600.0));
        assert_eq!(bins.center(2), 650.0);
    }

    #[test]
    fn test_sample_stays_in_bin() {
        let bins = SpectralBins::new(375.0, 740.0, 20);
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..bins.count {
            let (lower, upper) = bins.range(i);
            for _ in 0..50 {
                let w = bins.sample(i, &mut rng);
                assert!(w >= lower && w <= upper);
            }
        }
    }

    #[test]
    fn test_accumulate_requires_identical_binning() {
        let a_bins = SpectralBins::new(400.0, 700.0, 3);
        let mut a = Spectrum::from_values(a_bins, vec![1.0, 2.0, 3.0]).unwrap();
        let b = Spectrum::from_values(a_bins, vec![1.0, 1.0, 1.0]).unwrap();
        a.accumulate(&b).unwrap();
        assert_eq!(a.values(), &[2.0, 3.0, 4.0]);

        let other = Spectrum::zeros(SpectralBins::new(400.0, 700.0, 4));
        assert_eq!(a.accumulate(&other), Err(ConfigError::FrameMismatch));
    }

    #[test]
    fn test_flat_spectrum_luminance() {
        // Visible range carries nearly all of ȳ
        let bins = SpectralBins::new(375.0, 740.0, 15);
        let weights = bins.xyz_weights();
        let flat = Spectrum::from_values(bins, vec![1.0; 15]).unwrap();
        let y = flat.to_xyz(&weights).y;
        assert!(y > 0.97 && y < 1.01, "Y = {}", y);
    }
}
