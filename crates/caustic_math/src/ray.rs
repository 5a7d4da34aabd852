use crate::Vec3;

/// Half-line `origin + t * direction`.
///
/// The direction need not be unit length. Distances are multiples of
/// `direction`, which keeps `t` unchanged when a ray is mapped through a
/// rigid transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Same origin, unit direction. Afterwards `t` measures distance.
    pub fn normalized(&self) -> Self {
        Self::new(self.origin, self.direction.normalize())
    }
}
