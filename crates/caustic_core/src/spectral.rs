//! Spectral functions: wavelength (nm) -> value.
//!
//! Used for emission spectra and per-length transmission of dielectrics.

use thiserror::Error;

/// Errors constructing a sampled spectral function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    #[error("wavelength and value arrays differ in length ({wavelengths} vs {values})")]
    LengthMismatch { wavelengths: usize, values: usize },

    #[error("at least two samples are required, got {0}")]
    TooFewSamples(usize),

    #[error("wavelengths must be strictly increasing")]
    Unsorted,
}

/// A piecewise-linear function through sampled points.
///
/// Outside the sampled range the edge values are held constant.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedSpectrum {
    wavelengths: Vec<f32>,
    values: Vec<f32>,
}

impl InterpolatedSpectrum {
    pub fn new(wavelengths: Vec<f32>, values: Vec<f32>) -> Result<Self, SpectrumError> {
        if wavelengths.len() != values.len() {
            return Err(SpectrumError::LengthMismatch {
                wavelengths: wavelengths.len(),
                values: values.len(),
            });
        }
        if wavelengths.len() < 2 {
            return Err(SpectrumError::TooFewSamples(wavelengths.len()));
        }
        if wavelengths.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SpectrumError::Unsorted);
        }
        Ok(Self {
            wavelengths,
            values,
        })
    }

    pub fn evaluate(&self, wavelength: f32) -> f32 {
        let last = self.wavelengths.len() - 1;
        if wavelength <= self.wavelengths[0] {
            return self.values[0];
        }
        if wavelength >= self.wavelengths[last] {
            return self.values[last];
        }
        // first sample strictly greater than the wavelength
        let upper = self.wavelengths.partition_point(|&w| w <= wavelength);
        let lower = upper - 1;
        let span = self.wavelengths[upper] - self.wavelengths[lower];
        let f = (wavelength - self.wavelengths[lower]) / span;
        self.values[lower] + f * (self.values[upper] - self.values[lower])
    }
}

/// A spectral distribution.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralFunction {
    Constant(f32),
    Interpolated(InterpolatedSpectrum),
}

impl SpectralFunction {
    /// Value at a wavelength in nanometres.
    pub fn evaluate(&self, wavelength: f32) -> f32 {
        match self {
            SpectralFunction::Constant(value) => *value,
            SpectralFunction::Interpolated(samples) => samples.evaluate(wavelength),
        }
    }
}

impl From<f32> for SpectralFunction {
    fn from(value: f32) -> Self {
        SpectralFunction::Constant(value)
    }
}

/// CIE standard illuminant D65 relative power, 300-780 nm in 10 nm steps.
const D65: [f32; 49] = [
    0.0341, 3.2945, 20.236, 37.0535, 39.9488, 44.9117, 46.6383, 52.0891, 49.9755, 54.6482,
    82.7549, 91.486, 93.4318, 86.6823, 104.865, 117.008, 117.812, 114.861, 115.923, 108.811,
    109.354, 107.802, 104.79, 107.689, 104.405, 104.046, 100.0, 96.3342, 95.788, 88.6856,
    90.0062, 89.5991, 87.6987, 83.2886, 83.6992, 80.0268, 80.2146, 82.2778, 78.2842, 69.7213,
    71.6091, 74.349, 61.604, 69.8856, 75.087, 63.5927, 46.4182, 66.8054, 63.3828,
];

/// D65 daylight spectrum normalised to 1.0 at 560 nm.
pub fn d65_white() -> SpectralFunction {
    let wavelengths = (0..D65.len()).map(|i| 300.0 + 10.0 * i as f32).collect();
    let values = D65.iter().map(|v| v / 100.0).collect();
    // table is sorted and sized correctly
    SpectralFunction::Interpolated(InterpolatedSpectrum { wavelengths, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_and_clamping() {
        let s = InterpolatedSpectrum::new(vec![400.0, 500.0, 600.0], vec![0.0, 1.0, 3.0]).unwrap();
        assert_eq!(s.evaluate(450.0), 0.5);
        assert_eq!(s.evaluate(550.0), 2.0);
        assert_eq!(s.evaluate(500.0), 1.0);
        assert_eq!(s.evaluate(300.0), 0.0);
        assert_eq!(s.evaluate(900.0), 3.0);
    }

    #[test]
    fn test_constructor_validation() {
        assert_eq!(
            InterpolatedSpectrum::new(vec![400.0], vec![1.0]),
            Err(SpectrumError::TooFewSamples(1))
        );
        assert_eq!(
            InterpolatedSpectrum::new(vec![500.0, 400.0], vec![1.0, 1.0]),
            Err(SpectrumError::Unsorted)
        );
        assert!(matches!(
            InterpolatedSpectrum::new(vec![400.0, 500.0], vec![1.0]),
            Err(SpectrumError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_d65_normalised_at_560() {
        let d65 = d65_white();
        assert!((d65.evaluate(560.0) - 1.0).abs() < 1e-6);
        assert!(d65.evaluate(460.0) > 1.1);
    }
}
