//! Closed triangle mesh geometry.
//!
//! This is the hand-off type between mesh importers and the renderer. The
//! renderer treats a mesh as a solid, so it expects a watertight surface
//! with outward-facing (counter-clockwise) winding.

use std::collections::HashMap;

use caustic_math::{Aabb, Vec3};
use thiserror::Error;

/// Structural problems found by [`Mesh::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },

    #[error("mesh has no triangles")]
    Empty,
}

/// A mesh consisting of vertex positions and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            indices,
            bounds,
        }
    }

    /// Check index layout before the mesh is handed to the renderer.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.indices.len()));
        }
        if self.indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertices: self.positions.len(),
            });
        }
        Ok(())
    }

    /// Get the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let base = i * 3;
        [
            self.positions[self.indices[base] as usize],
            self.positions[self.indices[base + 1] as usize],
            self.positions[self.indices[base + 2] as usize],
        ]
    }

    /// True when every edge is shared by exactly two triangles.
    ///
    /// Edges are matched by vertex index, so meshes with duplicated
    /// vertices along seams must be welded first.
    pub fn is_watertight(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        edges.values().all(|&count| count == 2)
    }

    /// Uniformly scale all positions about the origin.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.positions {
            *p *= factor;
        }
        self.bounds = Self::compute_bounds(&self.positions);
    }

    /// Compute bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let (min, max) = positions
            .iter()
            .fold((positions[0], positions[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));

        Aabb::from_points(min, max)
    }

    /// Axis-aligned cube between two corners, wound outward.
    pub fn cuboid(lower: Vec3, upper: Vec3) -> Self {
        let positions = vec![
            Vec3::new(lower.x, lower.y, lower.z),
            Vec3::new(upper.x, lower.y, lower.z),
            Vec3::new(upper.x, upper.y, lower.z),
            Vec3::new(lower.x, upper.y, lower.z),
            Vec3::new(lower.x, lower.y, upper.z),
            Vec3::new(upper.x, lower.y, upper.z),
            Vec3::new(upper.x, upper.y, upper.z),
            Vec3::new(lower.x, upper.y, upper.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Self::new(positions, indices)
    }
}
