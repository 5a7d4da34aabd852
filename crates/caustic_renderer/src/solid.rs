//! Closed solids and their intersection spans.
//!
//! Every solid answers three questions in its own local frame: where a
//! ray's line enters and leaves it ([`Solid::spans`]), what box bounds it,
//! and whether a point lies inside it. CSG nodes answer them by combining
//! their operands.

use std::sync::Arc;

use caustic_core::{Mesh, MeshError};
use caustic_math::{Aabb, Interval, Ray, Transform, Vec3};

use crate::bvh::BvhNode;
use crate::span::{combine, discard_degenerate, Crossing, CsgOp, Span};
use crate::GeometryError;

/// Direction used for ray-parity containment tests; skewed off the axes so
/// it rarely runs along mesh edges.
const PROBE_DIRECTION: Vec3 = Vec3::new(0.577_215_7, 0.577_350_3, 0.577_485);

/// An axis-aligned box between two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl Cuboid {
    pub fn new(lower: Vec3, upper: Vec3) -> Self {
        Self {
            lower: lower.min(upper),
            upper: lower.max(upper),
        }
    }

    /// Slab intersection that remembers which face bounds each end.
    fn span(&self, ray: &Ray) -> Option<Span> {
        let mut enter = Crossing::new(f32::NEG_INFINITY, Vec3::ZERO);
        let mut exit = Crossing::new(f32::INFINITY, Vec3::ZERO);

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            if direction == 0.0 {
                if origin < self.lower[axis] || origin > self.upper[axis] {
                    return None;
                }
                continue;
            }

            let mut face = Vec3::ZERO;
            face[axis] = 1.0;
            let inv = 1.0 / direction;
            let t_lower = (self.lower[axis] - origin) * inv;
            let t_upper = (self.upper[axis] - origin) * inv;
            let (near, far) = if inv > 0.0 {
                (Crossing::new(t_lower, -face), Crossing::new(t_upper, face))
            } else {
                (Crossing::new(t_upper, face), Crossing::new(t_lower, -face))
            };

            if near.t > enter.t {
                enter = near;
            }
            if far.t < exit.t {
                exit = far;
            }
        }

        if exit.t <= enter.t || !enter.t.is_finite() || !exit.t.is_finite() {
            return None;
        }
        Some(Span::new(enter, exit))
    }

    fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.lower).all() && p.cmple(self.upper).all()
    }
}

/// A closed triangle mesh treated as a solid.
#[derive(Debug)]
pub struct MeshSolid {
    mesh: Arc<Mesh>,
    bvh: BvhNode,
}

impl MeshSolid {
    /// Build the BVH for a mesh, rejecting malformed index data.
    pub fn new(mesh: Arc<Mesh>) -> Result<Self, MeshError> {
        mesh.validate()?;
        if !mesh.is_watertight() {
            log::warn!(
                "mesh with {} triangles is not watertight; rays may pass through holes",
                mesh.triangle_count()
            );
        }
        let bvh = BvhNode::build(&mesh);
        Ok(Self { mesh, bvh })
    }

    /// Pair sorted crossings into spans.
    ///
    /// A ray through a shared edge reports the same crossing twice, so
    /// consecutive crossings of the same orientation closer than `epsilon`
    /// are merged. Anything else out of order means the surface is open.
    fn spans(&self, ray: &Ray, epsilon: f32) -> Result<Vec<Span>, GeometryError> {
        let mut crossings: Vec<(Crossing, bool)> = Vec::new();
        self.bvh.for_each_crossing(&self.mesh, ray, &mut |t, normal| {
            let entering = normal.dot(ray.direction) < 0.0;
            crossings.push((Crossing::new(t, normal.normalize_or_zero()), entering));
        });
        crossings.sort_by(|a, b| a.0.t.total_cmp(&b.0.t));
        crossings.dedup_by(|next, prev| next.1 == prev.1 && (next.0.t - prev.0.t).abs() < epsilon);

        if crossings.len() % 2 != 0 {
            return Err(open_surface(format!(
                "odd number of crossings ({})",
                crossings.len()
            )));
        }

        let mut spans = Vec::with_capacity(crossings.len() / 2);
        for pair in crossings.chunks_exact(2) {
            let (enter, entering) = pair[0];
            let (exit, exiting_is_entry) = pair[1];
            if !entering || exiting_is_entry {
                return Err(open_surface(format!(
                    "crossing orientation out of order at t = {}",
                    enter.t
                )));
            }
            spans.push(Span::new(enter, exit));
        }
        Ok(spans)
    }
}

fn open_surface(detail: String) -> GeometryError {
    GeometryError::NotWatertight {
        primitive: String::new(),
        detail,
    }
}

/// Two solids joined by a boolean operator.
#[derive(Debug)]
pub struct Csg {
    pub op: CsgOp,
    pub a: Solid,
    pub b: Solid,
}

/// Geometry variants.
#[derive(Debug)]
pub enum Shape {
    Cuboid(Cuboid),
    Mesh(MeshSolid),
    Csg(Box<Csg>),
}

/// A shape placed by a transform relative to its owner
/// (the primitive's node, or the enclosing CSG node).
#[derive(Debug)]
pub struct Solid {
    pub shape: Shape,
    pub transform: Transform,
}

impl Solid {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            transform: Transform::IDENTITY,
        }
    }

    /// Axis-aligned box between two corners.
    pub fn cuboid(lower: Vec3, upper: Vec3) -> Self {
        Self::new(Shape::Cuboid(Cuboid::new(lower, upper)))
    }

    pub fn mesh(mesh: Arc<Mesh>) -> Result<Self, MeshError> {
        Ok(Self::new(Shape::Mesh(MeshSolid::new(mesh)?)))
    }

    pub fn csg(op: CsgOp, a: Solid, b: Solid) -> Self {
        Self::new(Shape::Csg(Box::new(Csg { op, a, b })))
    }

    pub fn union(a: Solid, b: Solid) -> Self {
        Self::csg(CsgOp::Union, a, b)
    }

    pub fn intersect(a: Solid, b: Solid) -> Self {
        Self::csg(CsgOp::Intersect, a, b)
    }

    pub fn subtract(a: Solid, b: Solid) -> Self {
        Self::csg(CsgOp::Subtract, a, b)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Spans of a ray given in the owner's frame, with crossings expressed
    /// in that same frame. Spans shorter than `epsilon` are dropped.
    pub fn spans(&self, ray: &Ray, epsilon: f32) -> Result<Vec<Span>, GeometryError> {
        let local_ray = self.transform.inverse().transform_ray(ray);
        let mut spans = match &self.shape {
            Shape::Cuboid(cuboid) => cuboid.span(&local_ray).into_iter().collect(),
            Shape::Mesh(mesh) => mesh.spans(&local_ray, epsilon)?,
            Shape::Csg(csg) => {
                // operands carry their own transforms
                let a = csg.a.culled_spans(&local_ray, epsilon)?;
                if a.is_empty() && csg.op != CsgOp::Union {
                    return Ok(Vec::new());
                }
                let b = csg.b.culled_spans(&local_ray, epsilon)?;
                combine(&a, &b, csg.op, epsilon)
            }
        };

        discard_degenerate(&mut spans, epsilon);
        if self.transform != Transform::IDENTITY {
            for span in &mut spans {
                span.enter.normal = self.transform.transform_normal(span.enter.normal);
                span.exit.normal = self.transform.transform_normal(span.exit.normal);
            }
        }
        Ok(spans)
    }

    /// Bounds in the owner's frame.
    pub fn bounds(&self) -> Aabb {
        let local = match &self.shape {
            Shape::Cuboid(cuboid) => Aabb::from_points(cuboid.lower, cuboid.upper),
            Shape::Mesh(mesh) => mesh.mesh.bounds,
            Shape::Csg(csg) => match csg.op {
                CsgOp::Union => Aabb::surrounding(&csg.a.bounds(), &csg.b.bounds()),
                CsgOp::Intersect => Aabb::intersection(&csg.a.bounds(), &csg.b.bounds()),
                CsgOp::Subtract => csg.a.bounds(),
            },
        };
        self.transform.transform_aabb(&local)
    }

    /// Whether a point in the owner's frame lies inside the solid.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.transform.inverse().transform_point(point);
        match &self.shape {
            Shape::Cuboid(cuboid) => cuboid.contains(local),
            Shape::Mesh(mesh) => {
                if !mesh.mesh.bounds.contains(local) {
                    return false;
                }
                let probe = Ray::new(local, PROBE_DIRECTION);
                match mesh.spans(&probe, 1e-6) {
                    Ok(spans) => spans.iter().any(|s| s.enter.t <= 0.0 && 0.0 <= s.exit.t),
                    Err(_) => false,
                }
            }
            Shape::Csg(csg) => csg.op.classify(csg.a.contains(local), csg.b.contains(local)),
        }
    }

    /// True when the ray's full line overlaps the bounds.
    pub fn may_intersect(&self, ray: &Ray) -> bool {
        self.bounds().hit(ray, Interval::UNIVERSE).is_some()
    }

    fn culled_spans(&self, ray: &Ray, epsilon: f32) -> Result<Vec<Span>, GeometryError> {
        if self.may_intersect(ray) {
            self.spans(ray, epsilon)
        } else {
            Ok(Vec::new())
        }
    }
}
