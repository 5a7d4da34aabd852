// Re-export glam for convenience
pub use glam::*;

// caustic math types
mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{rotate, rotate_x, rotate_y, rotate_z, translate, Transform};
