//! Ray/solid overlap intervals and their boolean algebra.
//!
//! A solid intersected with the full line of a ray yields a sorted list of
//! disjoint [`Span`]s, each bounded by an entering and an exiting
//! [`Crossing`]. Crossing normals always point out of the solid the span
//! belongs to, so combining spans only ever has to flip the normals of
//! material carved away by a subtraction.

use caustic_math::Vec3;
use serde::{Deserialize, Serialize};

/// A surface crossing at ray parameter `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub t: f32,
    /// Outward surface normal (not necessarily unit length).
    pub normal: Vec3,
}

impl Crossing {
    pub fn new(t: f32, normal: Vec3) -> Self {
        Self { t, normal }
    }

    fn flipped(self) -> Self {
        Self::new(self.t, -self.normal)
    }
}

/// The part of a ray inside a solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub enter: Crossing,
    pub exit: Crossing,
}

impl Span {
    pub fn new(enter: Crossing, exit: Crossing) -> Self {
        Self { enter, exit }
    }

    pub fn length(&self) -> f32 {
        self.exit.t - self.enter.t
    }
}

/// Boolean operator of a CSG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsgOp {
    Union,
    Intersect,
    Subtract,
}

impl CsgOp {
    /// Inside/outside classification of the combined solid.
    #[inline]
    pub fn classify(self, in_a: bool, in_b: bool) -> bool {
        match self {
            CsgOp::Union => in_a || in_b,
            CsgOp::Intersect => in_a && in_b,
            CsgOp::Subtract => in_a && !in_b,
        }
    }
}

/// Drop spans shorter than `epsilon`.
pub fn discard_degenerate(spans: &mut Vec<Span>, epsilon: f32) {
    spans.retain(|s| s.length() >= epsilon);
}

#[derive(Clone, Copy)]
struct Event {
    crossing: Crossing,
    entering: bool,
    from_b: bool,
}

/// Combine two sorted span lists.
///
/// Boundaries of both operands are swept in ray order while tracking
/// whether the ray is inside A and inside B; every change of the combined
/// classification emits a crossing. At equal `t`, entering crossings are
/// processed before exiting ones and A before B, which coalesces touching
/// spans of a union and collapses `A - A` to zero-length spans.
/// Spans shorter than `epsilon` are discarded.
pub fn combine(a: &[Span], b: &[Span], op: CsgOp, epsilon: f32) -> Vec<Span> {
    let mut events = Vec::with_capacity(2 * (a.len() + b.len()));
    for (spans, from_b) in [(a, false), (b, true)] {
        for span in spans {
            events.push(Event {
                crossing: span.enter,
                entering: true,
                from_b,
            });
            events.push(Event {
                crossing: span.exit,
                entering: false,
                from_b,
            });
        }
    }
    events.sort_by(|x, y| {
        x.crossing
            .t
            .total_cmp(&y.crossing.t)
            .then(y.entering.cmp(&x.entering))
            .then(x.from_b.cmp(&y.from_b))
    });

    let mut result = Vec::new();
    let (mut in_a, mut in_b) = (false, false);
    let mut inside = false;
    let mut open: Option<Crossing> = None;

    for event in events {
        if event.from_b {
            in_b = event.entering;
        } else {
            in_a = event.entering;
        }
        let now_inside = op.classify(in_a, in_b);
        if now_inside == inside {
            continue;
        }
        inside = now_inside;

        let crossing = if event.from_b && op == CsgOp::Subtract {
            event.crossing.flipped()
        } else {
            event.crossing
        };
        if inside {
            open = Some(crossing);
        } else if let Some(enter) = open.take() {
            result.push(Span::new(enter, crossing));
        }
    }

    discard_degenerate(&mut result, epsilon);
    result
}
