//! Progressive spectral frame buffer.

use caustic_core::color::{linear_to_rgba8, xyz_to_linear_srgb};
use caustic_math::Vec3;

use crate::config::CameraConfig;
use crate::spectrum::{SpectralBins, Spectrum};
use crate::ConfigError;

/// Per-pixel spectral sums and sample counts.
///
/// Pixel values are means (sum / count), so contributions may arrive in any
/// order and over any number of render passes.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    bins: SpectralBins,
    sums: Vec<f32>,
    counts: Vec<u64>,
    passes: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, bins: SpectralBins) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            bins,
            sums: vec![0.0; pixels * bins.count],
            counts: vec![0; pixels],
            passes: 0,
        }
    }

    /// Empty frame sized for a camera configuration.
    pub fn for_config(config: &CameraConfig) -> Self {
        let (width, height) = config.pixel_resolution;
        Self::new(width, height, config.bins())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bins(&self) -> &SpectralBins {
        &self.bins
    }

    /// Completed render passes accumulated into this frame.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub(crate) fn finish_pass(&mut self) {
        self.passes += 1;
    }

    /// Fail unless the frame can accumulate renders made with `config`.
    pub fn check_compatible(&self, config: &CameraConfig) -> Result<(), ConfigError> {
        if config.pixel_resolution != (self.width, self.height) || config.bins() != self.bins {
            return Err(ConfigError::FrameMismatch);
        }
        Ok(())
    }

    fn pixel_index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    fn spectrum_at(&self, index: usize) -> Spectrum {
        let mut spectrum = Spectrum::zeros(self.bins);
        let count = self.counts[index];
        if count > 0 {
            let start = index * self.bins.count;
            spectrum
                .values_mut()
                .copy_from_slice(&self.sums[start..start + self.bins.count]);
            spectrum.scale(1.0 / count as f32);
        }
        spectrum
    }

    /// Add `samples` estimates whose spectra sum to `sum` to pixel (x, y).
    pub fn accumulate(&mut self, x: u32, y: u32, sum: &Spectrum, samples: u64) -> Result<(), ConfigError> {
        let index = match self.pixel_index(x, y) {
            Some(index) if *sum.bins() == self.bins => index,
            _ => return Err(ConfigError::FrameMismatch),
        };
        let start = index * self.bins.count;
        for (acc, v) in self.sums[start..start + self.bins.count].iter_mut().zip(sum.values()) {
            *acc += v;
        }
        self.counts[index] += samples;
        Ok(())
    }

    /// Samples accumulated at (x, y), or `None` outside the frame.
    pub fn sample_count(&self, x: u32, y: u32) -> Option<u64> {
        self.pixel_index(x, y).map(|index| self.counts[index])
    }

    /// Mean spectrum of a pixel; zeros while it has no samples.
    pub fn mean_spectrum(&self, x: u32, y: u32) -> Option<Spectrum> {
        self.pixel_index(x, y).map(|index| self.spectrum_at(index))
    }

    /// Mean radiance of a pixel averaged over wavelength bins.
    pub fn mean_radiance(&self, x: u32, y: u32) -> Option<f32> {
        self.mean_spectrum(x, y).map(|spectrum| spectrum.mean())
    }

    /// CIE XYZ of every pixel in row-major order.
    pub fn to_xyz(&self) -> Vec<Vec3> {
        let weights = self.bins.xyz_weights();
        (0..self.counts.len())
            .map(|index| self.spectrum_at(index).to_xyz(&weights))
            .collect()
    }

    /// 8-bit sRGBA pixels, row-major, after scaling radiance by `exposure`.
    pub fn to_rgba8(&self, exposure: f32) -> Vec<u8> {
        self.to_xyz()
            .into_iter()
            .flat_map(|xyz| linear_to_rgba8(xyz_to_linear_srgb(xyz * exposure)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins() -> SpectralBins {
        SpectralBins::new(375.0, 740.0, 3)
    }

    #[test]
    fn test_mean_of_accumulated_samples() {
        let mut frame = FrameBuffer::new(2, 2, bins());
        let a = Spectrum::from_values(bins(), vec![1.0, 2.0, 3.0]).unwrap();
        let b = Spectrum::from_values(bins(), vec![3.0, 2.0, 1.0]).unwrap();
        frame.accumulate(1, 0, &a, 1).unwrap();
        frame.accumulate(1, 0, &b, 1).unwrap();

        assert_eq!(frame.sample_count(1, 0), Some(2));
        assert_eq!(frame.mean_spectrum(1, 0).unwrap().values(), &[2.0, 2.0, 2.0]);
        assert_eq!(frame.mean_radiance(1, 0), Some(2.0));
        assert_eq!(frame.mean_radiance(0, 0), Some(0.0));
    }

    #[test]
    fn test_pixels_outside_frame() {
        let mut frame = FrameBuffer::new(2, 2, bins());
        let flat = Spectrum::from_values(bins(), vec![1.0; 3]).unwrap();
        assert_eq!(frame.accumulate(2, 0, &flat, 1), Err(ConfigError::FrameMismatch));
        assert_eq!(frame.sample_count(2, 0), None);
        assert!(frame.mean_spectrum(0, 2).is_none());
        assert_eq!(frame.mean_radiance(5, 5), None);
    }

    #[test]
    fn test_rejects_other_binning() {
        let mut frame = FrameBuffer::new(1, 1, bins());
        let other = Spectrum::zeros(SpectralBins::new(375.0, 740.0, 4));
        assert_eq!(frame.accumulate(0, 0, &other, 1), Err(ConfigError::FrameMismatch));

        let config = CameraConfig::default().with_resolution(1, 1).with_sampling(1, 1, 3);
        assert_eq!(frame.check_compatible(&config), Ok(()));
        let config = config.with_resolution(2, 1);
        assert_eq!(frame.check_compatible(&config), Err(ConfigError::FrameMismatch));
    }

    #[test]
    fn test_black_and_white_pixels() {
        let bins = SpectralBins::new(375.0, 740.0, 15);
        let mut frame = FrameBuffer::new(2, 1, bins);
        let flat = Spectrum::from_values(bins, vec![1.0; 15]).unwrap();
        frame.accumulate(1, 0, &flat, 1).unwrap();

        let rgba = frame.to_rgba8(1.0);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        // flat spectrum is close to neutral
        let white = &rgba[4..8];
        assert!(white[1] > 230);
        assert!((white[0] as i32 - white[2] as i32).abs() < 40);
    }
}
