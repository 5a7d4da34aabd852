use crate::{Interval, Ray, Vec3};

/// Smallest extent of any axis, so flat geometry still has a hittable box.
const MIN_EXTENT: f32 = 1e-4;

/// Axis-aligned box used to cull primitives and mesh BVH nodes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    /// Box spanned by two opposite corners, in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let (lo, hi) = (a.min(b), a.max(b));
        Self {
            x: Interval::new(lo.x, hi.x).padded_to(MIN_EXTENT),
            y: Interval::new(lo.y, hi.y).padded_to(MIN_EXTENT),
            z: Interval::new(lo.z, hi.z).padded_to(MIN_EXTENT),
        }
    }

    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&a.x, &b.x),
            y: Interval::surrounding(&a.y, &b.y),
            z: Interval::surrounding(&a.z, &b.z),
        }
    }

    /// Overlap of two boxes; may be empty.
    pub fn intersection(a: &Aabb, b: &Aabb) -> Self {
        Self {
            x: a.x.intersect(&b.x),
            y: a.y.intersect(&b.y),
            z: a.z.intersect(&b.z),
        }
    }

    /// Interval along axis 0 (x), 1 (y) or 2 (z).
    pub fn axis(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub fn contains(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Part of `range` the ray spends inside the box (slab test), or `None`
    /// when it misses within `range`.
    pub fn hit(&self, ray: &Ray, range: Interval) -> Option<Interval> {
        let mut inside = range;
        for axis in 0..3 {
            let slab = self.axis(axis);
            let inv = 1.0 / ray.direction[axis];
            let a = (slab.min - ray.origin[axis]) * inv;
            let b = (slab.max - ray.origin[axis]) * inv;
            let (near, far) = if inv < 0.0 { (b, a) } else { (a, b) };
            // 0 * inf gives NaN, which leaves the bound untouched
            if near > inside.min {
                inside.min = near;
            }
            if far < inside.max {
                inside.max = far;
            }
            if inside.is_empty() {
                return None;
            }
        }
        Some(inside)
    }

    /// Axis (0, 1 or 2) with the largest extent.
    pub fn longest_axis(&self) -> usize {
        let size = Vec3::new(self.x.size(), self.y.size(), self.z.size());
        if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        })
    }
}
