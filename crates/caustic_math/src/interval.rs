/// Closed range `[min, max]` of ray parameters or of one coordinate axis.
///
/// `min > max` encodes the empty range, so intersecting disjoint ranges
/// needs no special case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// The whole real line, used to intersect a ray's full line rather than
    /// only its forward half.
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    /// Inclusive on both ends.
    pub fn contains(&self, x: f32) -> bool {
        (self.min..=self.max).contains(&x)
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }

    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }

    /// Grow symmetrically to at least `width`. Empty ranges stay empty.
    pub fn padded_to(&self, width: f32) -> Interval {
        if self.is_empty() || self.size() >= width {
            return *self;
        }
        let centre = 0.5 * (self.min + self.max);
        Interval::new(centre - 0.5 * width, centre + 0.5 * width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let interval = Interval::new(0.0, 10.0);
        assert!(interval.contains(0.0));
        assert!(interval.contains(10.0));
        assert!(!interval.contains(10.1));
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(Interval::UNIVERSE.contains(1e10));
    }

    #[test]
    fn test_intersect_and_surround() {
        let a = Interval::new(0.0, 5.0);
        let b = Interval::new(3.0, 8.0);
        assert_eq!(a.intersect(&b), Interval::new(3.0, 5.0));
        assert_eq!(Interval::surrounding(&a, &b), Interval::new(0.0, 8.0));
        assert!(a.intersect(&Interval::new(6.0, 7.0)).is_empty());
    }

    #[test]
    fn test_padding_keeps_centre() {
        let flat = Interval::new(2.0, 2.0).padded_to(1.0);
        assert_eq!(flat, Interval::new(1.5, 2.5));
        let wide = Interval::new(0.0, 4.0);
        assert_eq!(wide.padded_to(1.0), wide);
        assert!(Interval::EMPTY.padded_to(1.0).is_empty());
    }
}
