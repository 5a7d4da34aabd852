//! Spectrum to colour conversion.
//!
//! CIE 1931 2° colour matching functions use the multi-lobe Gaussian fit of
//! Wyman, Sloan and Shirley (2013), which stays within a few percent of the
//! tabulated observer across the visible range.

use caustic_math::{Mat3, Vec3};

/// Piecewise Gaussian with separate left/right widths.
#[inline]
fn lobe(x: f32, mu: f32, sigma_left: f32, sigma_right: f32) -> f32 {
    let sigma = if x < mu { sigma_left } else { sigma_right };
    let t = (x - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// CIE 1931 colour matching functions (x̄, ȳ, z̄) at a wavelength in nm.
pub fn cie_xyz(wavelength: f32) -> Vec3 {
    let l = wavelength;
    let x = 1.056 * lobe(l, 599.8, 37.9, 31.0) + 0.362 * lobe(l, 442.0, 16.0, 26.7)
        - 0.065 * lobe(l, 501.1, 20.4, 26.2);
    let y = 0.821 * lobe(l, 568.8, 46.9, 40.5) + 0.286 * lobe(l, 530.9, 16.3, 31.1);
    let z = 1.217 * lobe(l, 437.0, 11.8, 36.0) + 0.681 * lobe(l, 459.0, 26.0, 13.8);
    Vec3::new(x, y, z)
}

/// Integral of the matching functions over `[min, max]` nm.
pub fn integrate_cie_xyz(min: f32, max: f32) -> Vec3 {
    let width = max - min;
    if width <= 0.0 {
        return Vec3::ZERO;
    }
    let steps = (width * 4.0).ceil().max(1.0) as usize;
    let step = width / steps as f32;
    (0..steps)
        .map(|i| cie_xyz(min + (i as f32 + 0.5) * step))
        .fold(Vec3::ZERO, |acc, v| acc + v)
        * step
}

/// ∫ȳ over 360-830 nm. Dividing by this maps a flat unit spectrum to Y ≈ 1.
pub fn luminance_normalisation() -> f32 {
    integrate_cie_xyz(360.0, 830.0).y
}

/// CIE XYZ -> linear sRGB (D65 white point).
pub fn xyz_to_linear_srgb(xyz: Vec3) -> Vec3 {
    let m = Mat3::from_cols(
        Vec3::new(3.240_454_2, -0.969_266, 0.055_643_4),
        Vec3::new(-1.537_138_5, 1.876_010_8, -0.204_025_9),
        Vec3::new(-0.498_531_4, 0.041_556, 1.057_225_2),
    );
    m * xyz
}

/// sRGB transfer function for one linear channel.
#[inline]
pub fn srgb_encode(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Linear RGB to 8-bit sRGBA, clamped.
pub fn linear_to_rgba8(rgb: Vec3) -> [u8; 4] {
    let encode = |c: f32| (255.0 * srgb_encode(c.clamp(0.0, 1.0)) + 0.5) as u8;
    [encode(rgb.x), encode(rgb.y), encode(rgb.z), 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_peaks_near_555() {
        let peak = cie_xyz(555.0).y;
        assert!(peak > 0.95 && peak < 1.05);
        assert!(cie_xyz(450.0).y < 0.1);
        assert!(cie_xyz(450.0).z > 1.0);
    }

    #[test]
    fn test_luminance_normalisation_close_to_tabulated() {
        // The tabulated CIE 1931 ȳ integrates to ~106.9 nm
        let norm = luminance_normalisation();
        assert!((norm - 106.9).abs() < 3.0, "got {}", norm);
    }

    #[test]
    fn test_equal_energy_white_is_neutral_ish() {
        let xyz = integrate_cie_xyz(360.0, 830.0);
        let chroma = xyz / (xyz.x + xyz.y + xyz.z);
        assert!((chroma.x - 0.3333).abs() < 0.02);
        assert!((chroma.y - 0.3333).abs() < 0.02);
    }

    #[test]
    fn test_srgb_encode_and_rgba() {
        assert_eq!(srgb_encode(0.0), 0.0);
        assert!((srgb_encode(1.0) - 1.0).abs() < 1e-5);
        assert_eq!(linear_to_rgba8(Vec3::new(2.0, -1.0, 1.0)), [255, 0, 255, 255]);
    }
}
