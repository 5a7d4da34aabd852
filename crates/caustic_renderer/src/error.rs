//! Error types for rendering.

use caustic_core::SceneError;
use thiserror::Error;

/// Invalid camera configuration, detected before any ray is traced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("ray_extinction_prob must lie in [0, 1), got {0}")]
    ExtinctionProbability(f32),

    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    #[error("ray_max_depth ({max}) is smaller than ray_min_depth ({min})")]
    DepthOrder { min: u32, max: u32 },

    #[error("pixel resolution {width}x{height} has a zero dimension")]
    Resolution { width: u32, height: u32 },

    #[error("field of view must lie in (0, 180) degrees, got {0}")]
    FieldOfView(f32),

    #[error("display update interval must be a non-negative number of seconds that fits a Duration, got {0}")]
    UpdateInterval(f32),

    #[error("wavelength range {min}..{max} nm is not a valid positive range")]
    WavelengthRange { min: f32, max: f32 },

    #[error("degeneracy epsilon must be finite and positive, got {0}")]
    Epsilon(f32),

    #[error("importance threshold must be finite and non-negative, got {0}")]
    ImportanceThreshold(f32),

    #[error("frame buffer does not match the camera resolution or spectral binning")]
    FrameMismatch,
}

/// A solid whose surface does not bound a closed volume.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("surface of '{primitive}' is not watertight: {detail}")]
    NotWatertight { primitive: String, detail: String },
}

impl GeometryError {
    /// Attach the owning primitive's name.
    pub fn for_primitive(self, name: &str) -> Self {
        match self {
            GeometryError::NotWatertight { detail, .. } => GeometryError::NotWatertight {
                primitive: name.to_string(),
                detail,
            },
        }
    }
}

/// Failure to start a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid camera configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Result type for render entry points.
pub type RenderResult<T> = Result<T, RenderError>;
