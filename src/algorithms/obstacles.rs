use crate::error::FlockError;
use crate::geometry::{Vec2, normalized_or_zero};
use crate::models::boid::Boid;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OBSTACLE_FORCE: f64 = 1.0;

/// Loose obstacle description as accepted by `place_obstacle`: either `w` + `h` or `r`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub r: Option<f64>,
    #[serde(default)]
    pub force: Option<f64>,
}

/// Static obstacle. Rectangles are anchored at their top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Obstacle {
    Rectangle { x: f64, y: f64, w: f64, h: f64, force: f64 },
    Circle { x: f64, y: f64, r: f64, force: f64 },
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl TryFrom<ObstacleSpec> for Obstacle {
    type Error = FlockError;

    fn try_from(spec: ObstacleSpec) -> Result<Self, Self::Error> {
        if !(spec.x.is_finite() && spec.y.is_finite()) {
            return Err(FlockError::InvalidObstacle("position must be finite"));
        }
        let force = spec.force.unwrap_or(DEFAULT_OBSTACLE_FORCE);
        if !force.is_finite() {
            return Err(FlockError::InvalidObstacle("force must be finite"));
        }
        match (spec.w, spec.h, spec.r) {
            (Some(_), Some(_), Some(_)) | (Some(_), None, Some(_)) | (None, Some(_), Some(_)) => {
                Err(FlockError::InvalidObstacle("give either w and h or r, not both"))
            }
            (Some(w), Some(h), None) => {
                if !(positive(w) && positive(h)) {
                    return Err(FlockError::InvalidObstacle("w and h must be positive"));
                }
                Ok(Obstacle::Rectangle { x: spec.x, y: spec.y, w, h, force })
            }
            (Some(_), None, None) | (None, Some(_), None) => {
                Err(FlockError::InvalidObstacle("rectangle needs both w and h"))
            }
            (None, None, Some(r)) => {
                if !positive(r) {
                    return Err(FlockError::InvalidObstacle("r must be positive"));
                }
                Ok(Obstacle::Circle { x: spec.x, y: spec.y, r, force })
            }
            (None, None, None) => Err(FlockError::InvalidObstacle("missing w/h or r")),
        }
    }
}

impl Obstacle {
    pub fn force(&self) -> f64 {
        match *self {
            Obstacle::Rectangle { force, .. } | Obstacle::Circle { force, .. } => force,
        }
    }

    /// Push `boid` out of this obstacle after it has moved by its current velocity.
    ///
    /// Rectangles reflect one velocity component: the axis along which the boid was not yet
    /// overlapping before the move (x is checked first). A boid that already overlapped on both
    /// axes, or that enters diagonally through a corner, is resolved on that single axis only.
    /// Circles apply a soft push away from the centre instead of correcting position.
    pub fn resolve(&self, boid: &mut Boid) {
        match *self {
            Obstacle::Rectangle { x, y, w, h, force } => {
                let half = boid.size * 0.5;
                let overlaps_x = |px: f64| px + half > x && px - half < x + w;
                let overlaps_y = |py: f64| py + half > y && py - half < y + h;

                let now = boid.position;
                if !(overlaps_x(now.x) && overlaps_y(now.y)) {
                    return;
                }
                let before = boid.position - boid.velocity;
                if !overlaps_x(before.x) {
                    boid.velocity.x = -boid.velocity.x * force;
                    boid.position.x += boid.velocity.x;
                } else if !overlaps_y(before.y) {
                    boid.velocity.y = -boid.velocity.y * force;
                    boid.position.y += boid.velocity.y;
                }
            }
            Obstacle::Circle { x, y, r, force } => {
                let to_centre = Vec2::new(x, y) - boid.position;
                if to_centre.norm() < boid.size.max(r) {
                    boid.velocity -= normalized_or_zero(to_centre) * force;
                }
            }
        }
    }
}

/// Append-only set of obstacles; read-only while a tick runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleRegistry {
    obstacles: Vec<Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `spec` and append it. Returns the obstacle's index.
    pub fn place(&mut self, spec: ObstacleSpec) -> Result<usize, FlockError> {
        let obstacle = Obstacle::try_from(spec)?;
        Ok(self.push(obstacle))
    }

    pub fn push(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn as_slice(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Run every obstacle's resolution against `boid`, in registration order.
    pub fn resolve(&self, boid: &mut Boid) {
        for obstacle in &self.obstacles {
            obstacle.resolve(boid);
        }
    }
}
