//! Materials: how a primitive's surface and interior respond to light.
//!
//! Materials are a closed set of variants. The surface response decides
//! which sub-paths leave an interaction; the volume response scales or adds
//! radiance along segments travelled inside the primitive.

use caustic_core::{RefractiveIndex, SpectralFunction};
use caustic_math::Vec3;

/// Transparent medium with a wavelength-dependent index of refraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dielectric {
    pub index: RefractiveIndex,
    /// Index of the medium surrounding the solid.
    pub external_index: f32,
    /// Fraction of light surviving one unit of path length inside the
    /// medium, per wavelength. `None` means perfectly clear.
    pub transmission: Option<SpectralFunction>,
}

impl Dielectric {
    pub fn new(index: impl Into<RefractiveIndex>) -> Self {
        Self {
            index: index.into(),
            external_index: 1.0,
            transmission: None,
        }
    }

    pub fn with_external_index(mut self, external_index: f32) -> Self {
        self.external_index = external_index;
        self
    }

    pub fn with_transmission(mut self, transmission: impl Into<SpectralFunction>) -> Self {
        self.transmission = Some(transmission.into());
        self
    }

    /// Split an incident direction at the surface into Fresnel-weighted
    /// reflected and refracted branches.
    ///
    /// `normal` is the outward surface normal; `exiting` tells whether the
    /// ray leaves the solid at this crossing.
    fn scatter(&self, direction: Vec3, normal: Vec3, exiting: bool, wavelength: f32) -> SurfaceResponse {
        let internal = self.index.evaluate(wavelength);
        let (n1, n2) = if exiting {
            (internal, self.external_index)
        } else {
            (self.external_index, internal)
        };

        // normal on the incident side
        let facing = if direction.dot(normal) < 0.0 { normal } else { -normal };
        let cos_i = (-direction.dot(facing)).clamp(0.0, 1.0);
        let reflected = reflect(direction, facing);

        match refract(direction, facing, n1 / n2) {
            None => SurfaceResponse::Split {
                reflected: Branch::new(reflected, 1.0, false),
                transmitted: None,
            },
            Some(refracted) => {
                let r = fresnel_reflectance(cos_i, n1, n2);
                let transmitted = (r < 1.0).then(|| Branch::new(refracted, 1.0 - r, true));
                SurfaceResponse::Split {
                    reflected: Branch::new(reflected, r, false),
                    transmitted,
                }
            }
        }
    }
}

/// Volume that glows uniformly along every unit of path length inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformVolumeEmitter {
    pub emission_spectrum: SpectralFunction,
    pub scale: f32,
}

impl UniformVolumeEmitter {
    pub fn new(emission_spectrum: impl Into<SpectralFunction>, scale: f32) -> Self {
        Self {
            emission_spectrum: emission_spectrum.into(),
            scale,
        }
    }
}

/// Surface and volume behaviour of a primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Dielectric(Dielectric),
    /// Perfect black absorber.
    AbsorbingSurface,
    UniformVolumeEmitter(UniformVolumeEmitter),
}

impl From<Dielectric> for Material {
    fn from(d: Dielectric) -> Self {
        Material::Dielectric(d)
    }
}

impl From<UniformVolumeEmitter> for Material {
    fn from(e: UniformVolumeEmitter) -> Self {
        Material::UniformVolumeEmitter(e)
    }
}

/// One sub-path leaving a surface interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    /// Unit direction of the new ray.
    pub direction: Vec3,
    /// Multiplier applied to the parent path weight.
    pub weight: f32,
    /// Whether the new ray continues on the far side of the surface.
    pub crosses: bool,
}

impl Branch {
    pub fn new(direction: Vec3, weight: f32, crosses: bool) -> Self {
        Self {
            direction,
            weight,
            crosses,
        }
    }
}

/// Outcome of a ray meeting a material's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceResponse {
    /// The path ends here.
    Absorb,
    /// The surface is invisible; the ray continues unchanged.
    PassThrough,
    /// Reflected and (unless totally internally reflected) refracted
    /// sub-paths, to be summed.
    Split {
        reflected: Branch,
        transmitted: Option<Branch>,
    },
}

impl Material {
    /// Surface response for a unit `direction` meeting a surface with
    /// outward `normal`.
    pub fn scatter(&self, direction: Vec3, normal: Vec3, exiting: bool, wavelength: f32) -> SurfaceResponse {
        match self {
            Material::Dielectric(d) => d.scatter(direction, normal, exiting, wavelength),
            Material::AbsorbingSurface => SurfaceResponse::Absorb,
            Material::UniformVolumeEmitter(_) => SurfaceResponse::PassThrough,
        }
    }

    /// Radiance added by travelling `length` inside the material.
    pub fn emission(&self, wavelength: f32, length: f32) -> f32 {
        match self {
            Material::UniformVolumeEmitter(e) => e.emission_spectrum.evaluate(wavelength) * e.scale * length,
            _ => 0.0,
        }
    }

    /// Weight multiplier for travelling `length` inside the material.
    pub fn attenuation(&self, wavelength: f32, length: f32) -> f32 {
        match self {
            Material::Dielectric(Dielectric {
                transmission: Some(t),
                ..
            }) => t.evaluate(wavelength).clamp(0.0, 1.0).powf(length),
            _ => 1.0,
        }
    }
}

/// Fresnel reflectance of unpolarised light going from index `n1` into
/// `n2`, for the cosine of the incidence angle. Returns 1 under total
/// internal reflection.
pub fn fresnel_reflectance(cos_i: f32, n1: f32, n2: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin2_t = (n1 / n2).powi(2) * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin2_t).sqrt();

    let rs_den = n1 * cos_i + n2 * cos_t;
    let rp_den = n2 * cos_i + n1 * cos_t;
    if rs_den <= f32::EPSILON || rp_den <= f32::EPSILON {
        // grazing incidence
        return 1.0;
    }
    let rs = (n1 * cos_i - n2 * cos_t) / rs_den;
    let rp = (n2 * cos_i - n1 * cos_t) / rp_den;
    (0.5 * (rs * rs + rp * rp)).min(1.0)
}

/// Mirror `v` about the unit normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Snell refraction of unit `v` through a surface whose unit normal `n`
/// faces the incident side, with `eta = n1 / n2`. `None` on total internal
/// reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-v.dot(n)).clamp(0.0, 1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((eta * v + (eta * cos_i - cos_t) * n).normalize())
}
