//! Bounding Volume Hierarchy over mesh triangles.
//!
//! Uses a binary tree structure with median splits. Unlike a nearest-hit
//! BVH, traversal here reports every crossing along the ray's full line,
//! which the solid needs to build inside/outside spans.

use caustic_core::Mesh;
use caustic_math::{Aabb, Interval, Ray, Vec3};

/// Maximum triangles per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangles.
#[derive(Debug)]
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of triangle indices.
    Leaf { triangles: Vec<u32>, bbox: Aabb },
    /// Empty node (for edge cases).
    Empty,
}

/// Bounds and centroid of each triangle, computed once for construction.
struct TriangleInfo {
    index: u32,
    bbox: Aabb,
    centroid: Vec3,
}

impl BvhNode {
    /// Build a BVH over all triangles of a mesh.
    pub fn build(mesh: &Mesh) -> Self {
        let infos: Vec<TriangleInfo> = (0..mesh.triangle_count())
            .map(|i| {
                let [a, b, c] = mesh.triangle(i);
                let bbox = Aabb::from_points(a.min(b).min(c), a.max(b).max(c));
                TriangleInfo {
                    index: i as u32,
                    bbox,
                    centroid: (a + b + c) / 3.0,
                }
            })
            .collect();

        if infos.is_empty() {
            return BvhNode::Empty;
        }
        Self::build_recursive(infos)
    }

    /// Simple median-split approach: sort triangles by centroid on the
    /// longest axis, split in half, recurse.
    fn build_recursive(mut infos: Vec<TriangleInfo>) -> Self {
        let bounds = infos
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bbox));

        if infos.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles: infos.iter().map(|t| t.index).collect(),
                bbox: bounds,
            };
        }

        let centroid_bounds = infos.iter().fold(Aabb::EMPTY, |acc, t| {
            Aabb::surrounding(&acc, &Aabb::from_points(t.centroid, t.centroid))
        });
        let axis = centroid_bounds.longest_axis();

        infos.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        let right = infos.split_off(infos.len() / 2);
        BvhNode::Branch {
            left: Box::new(Self::build_recursive(infos)),
            right: Box::new(Self::build_recursive(right)),
            bbox: bounds,
        }
    }

    /// Call `visit(t, normal)` for every triangle crossing on the full line.
    ///
    /// `normal` is the unnormalized geometric normal from the triangle's
    /// winding.
    pub fn for_each_crossing(&self, mesh: &Mesh, ray: &Ray, visit: &mut dyn FnMut(f32, Vec3)) {
        match self {
            BvhNode::Empty => {}
            BvhNode::Leaf { triangles, bbox } => {
                if bbox.hit(ray, Interval::UNIVERSE).is_none() {
                    return;
                }
                for &index in triangles {
                    let [v0, v1, v2] = mesh.triangle(index as usize);
                    if let Some((t, normal)) = intersect_triangle(ray, v0, v1, v2) {
                        visit(t, normal);
                    }
                }
            }
            BvhNode::Branch { left, right, bbox } => {
                if bbox.hit(ray, Interval::UNIVERSE).is_none() {
                    return;
                }
                left.for_each_crossing(mesh, ray, visit);
                right.for_each_crossing(mesh, ray, visit);
            }
        }
    }
}

/// Möller-Trumbore ray-triangle intersection without back-face culling.
///
/// Returns any `t` along the line (negative included) and the face normal.
fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, Vec3)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    Some((t, edge1.cross(edge2)))
}
