use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub type Vec2 = Vector2<f64>;

const EPS: f64 = 1.0e-12;

#[inline]
pub fn vec2(x: f64, y: f64) -> Vec2 {
    Vec2::new(x, y)
}

/// Unit vector along `v`, or zero when `v` has no usable length.
pub fn normalized_or_zero(v: Vec2) -> Vec2 {
    let n2 = v.norm_squared();
    if n2 > EPS && n2.is_finite() {
        v / n2.sqrt()
    } else {
        Vec2::zeros()
    }
}

/// Rescale `v` to magnitude `m`; a zero vector stays zero.
pub fn set_magnitude(v: Vec2, m: f64) -> Vec2 {
    normalized_or_zero(v) * m
}

/// Clamp the magnitude of `v` to at most `max`.
pub fn limit(v: Vec2, max: f64) -> Vec2 {
    if max <= 0.0 {
        return Vec2::zeros();
    }
    let n2 = v.norm_squared();
    if n2 > max * max {
        v * (max / n2.sqrt())
    } else {
        v
    }
}

/// Axis-aligned rectangle. Stored as exact corners so that the quadrants produced by
/// [`Rect::quadrants`] tile their parent without floating point gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    min: Vec2,
    max: Vec2,
}

impl Rect {
    /// Rectangle centred on (`cx`, `cy`) with full width `w` and height `h`.
    pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        let half = vec2(w.abs() * 0.5, h.abs() * 0.5);
        let c = vec2(cx, cy);
        Self { min: c - half, max: c + half }
    }

    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self {
            min: vec2(min.x.min(max.x), min.y.min(max.y)),
            max: vec2(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Square of side `2 * radius` around `center`.
    pub fn around(center: Vec2, radius: f64) -> Self {
        Self::new(center.x, center.y, radius * 2.0, radius * 2.0)
    }

    pub fn cx(&self) -> f64 { 0.5 * (self.min.x + self.max.x) }
    pub fn cy(&self) -> f64 { 0.5 * (self.min.y + self.max.y) }
    pub fn w(&self) -> f64 { self.max.x - self.min.x }
    pub fn h(&self) -> f64 { self.max.y - self.min.y }
    pub fn min(&self) -> Vec2 { self.min }
    pub fn max(&self) -> Vec2 { self.max }

    /// Closed on every edge.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Overlap test; rectangles that only share an edge do not intersect. Because
    /// [`Rect::contains`] is closed, a point lying exactly on this rectangle's edge is not
    /// reached by a range whose opposite edge merely touches it.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.min.x >= self.max.x
            || other.max.x <= self.min.x
            || other.min.y >= self.max.y
            || other.max.y <= self.min.y)
    }

    /// Four equal quadrants in NW, NE, SW, SE order (y grows downwards).
    pub fn quadrants(&self) -> [Rect; 4] {
        let mid = vec2(self.cx(), self.cy());
        let (lo, hi) = (self.min, self.max);
        [
            Rect::from_corners(lo, mid),
            Rect::from_corners(vec2(mid.x, lo.y), vec2(hi.x, mid.y)),
            Rect::from_corners(vec2(lo.x, mid.y), vec2(mid.x, hi.y)),
            Rect::from_corners(mid, hi),
        ]
    }
}

/// World extent plus per-axis wrap flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub width: f64,
    pub height: f64,
    pub wrap: [bool; 2],
}

impl Topology {
    pub fn new(width: f64, height: f64, wrap: [bool; 2]) -> Self {
        Self { width, height, wrap }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_corners(Vec2::zeros(), vec2(self.width, self.height))
    }

    /// Shortest offset from `from` to `to`, crossing wrapped edges when that is shorter.
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        let mut d = to - from;
        if self.wrap[0] && d.x.abs() > self.width * 0.5 {
            d.x -= d.x.signum() * self.width;
        }
        if self.wrap[1] && d.y.abs() > self.height * 0.5 {
            d.y -= d.y.signum() * self.height;
        }
        d
    }

    pub fn distance_squared(&self, a: Vec2, b: Vec2) -> f64 {
        self.delta(a, b).norm_squared()
    }

    /// Copies of `p` shifted by whole world extents along wrapping axes, `p` itself first.
    pub fn images(&self, p: Vec2) -> Vec<Vec2> {
        let xs: &[f64] = if self.wrap[0] { &[0.0, -1.0, 1.0] } else { &[0.0] };
        let ys: &[f64] = if self.wrap[1] { &[0.0, -1.0, 1.0] } else { &[0.0] };
        let mut out = Vec::with_capacity(xs.len() * ys.len());
        for &sy in ys {
            for &sx in xs {
                out.push(vec2(p.x + sx * self.width, p.y + sy * self.height));
            }
        }
        out
    }
}

/// `value mod extent`, guaranteed to land in `[0, extent)`.
pub fn wrap_coordinate(value: f64, extent: f64) -> f64 {
    let r = value.rem_euclid(extent);
    if r >= extent { 0.0 } else { r }
}
