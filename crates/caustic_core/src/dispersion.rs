//! Refractive index models and a small glass catalogue.

/// Sellmeier dispersion: `n² = 1 + Σ Bᵢ λ² / (λ² - Cᵢ)` with λ in micrometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sellmeier {
    pub b: [f32; 3],
    pub c: [f32; 3],
}

impl Sellmeier {
    pub const fn new(b1: f32, b2: f32, b3: f32, c1: f32, c2: f32, c3: f32) -> Self {
        Self {
            b: [b1, b2, b3],
            c: [c1, c2, c3],
        }
    }

    /// Refractive index at a wavelength in nanometres.
    pub fn index(&self, wavelength: f32) -> f32 {
        let w2 = (wavelength * 1e-3).powi(2);
        let n2 = 1.0
            + self
                .b
                .iter()
                .zip(self.c.iter())
                .map(|(b, c)| b * w2 / (w2 - c))
                .sum::<f32>();
        n2.max(0.0).sqrt()
    }
}

/// Wavelength -> refractive index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefractiveIndex {
    Constant(f32),
    Sellmeier(Sellmeier),
}

impl RefractiveIndex {
    pub fn evaluate(&self, wavelength: f32) -> f32 {
        match self {
            RefractiveIndex::Constant(n) => *n,
            RefractiveIndex::Sellmeier(s) => s.index(wavelength),
        }
    }
}

impl From<Sellmeier> for RefractiveIndex {
    fn from(s: Sellmeier) -> Self {
        RefractiveIndex::Sellmeier(s)
    }
}

impl From<f32> for RefractiveIndex {
    fn from(n: f32) -> Self {
        RefractiveIndex::Constant(n)
    }
}

const GLASSES: &[(&str, Sellmeier)] = &[
    (
        "N-BK7",
        Sellmeier::new(1.039_612_1, 0.231_792_34, 1.010_469_5, 0.006_000_699, 0.020_017_914, 103.560_65),
    ),
    (
        "N-BAK1",
        Sellmeier::new(1.123_656_6, 0.309_276_85, 0.881_511_96, 0.006_447_427_5, 0.022_228_44, 107.297_75),
    ),
    (
        "N-SF11",
        Sellmeier::new(1.737_597, 0.313_747_35, 1.898_781, 0.013_188_707, 0.062_306_814, 155.236_29),
    ),
    (
        "F2",
        Sellmeier::new(1.345_333_6, 0.209_073_18, 0.937_357_16, 0.009_977_439, 0.047_045_077, 111.886_76),
    ),
    (
        "FUSED-SILICA",
        Sellmeier::new(0.696_166_3, 0.407_942_6, 0.897_479_4, 0.004_679_148, 0.013_512_063, 97.934_0),
    ),
    (
        "DIAMOND",
        Sellmeier::new(0.3306, 4.3356, 0.0, 0.030_625, 0.011_236, 0.0),
    ),
];

/// Look up a catalogue glass by name (case-insensitive).
pub fn schott(name: &str) -> Option<Sellmeier> {
    GLASSES
        .iter()
        .find(|(glass, _)| glass.eq_ignore_ascii_case(name))
        .map(|(_, s)| *s)
}

/// Names accepted by [`schott`].
pub fn glass_names() -> impl Iterator<Item = &'static str> {
    GLASSES.iter().map(|(name, _)| *name)
}
