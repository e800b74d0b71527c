use crate::error::FlockError;
use crate::geometry::{Topology, Vec2, vec2};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

pub const DEFAULT_WIDTH: f64 = 400.0;
pub const DEFAULT_HEIGHT: f64 = 400.0;
pub const DEFAULT_MAX_SPEED: f64 = 2.0;
pub const DEFAULT_MAX_FORCE: f64 = 0.2;
pub const DEFAULT_BOID_SIZE: f64 = 5.0;
pub const DEFAULT_QUADTREE_CAPACITY: usize = 3;

/// Neighbourhood radius and weight of one steering rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Behaviour {
    pub radius: f64,
    pub strength: f64,
}

impl Behaviour {
    pub const fn new(radius: f64, strength: f64) -> Self {
        Self { radius, strength }
    }
}

/// Where the initial population is dropped. Missing fields fall back to the world centre and
/// half the smaller world extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub center: Option<[f64; 2]>,
    pub radius: Option<f64>,
}

/// Pointer attraction used by interactive front-ends; strength 0 disables it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    pub strength: f64,
    pub radius: f64,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self { strength: 0.0, radius: 50.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// Per axis: true wraps the coordinate, false reflects off the wall.
    pub wrap: [bool; 2],
    /// Velocity factor applied when reflecting off a wall.
    pub wrapreflect: f64,
    pub alignment: Behaviour,
    pub cohesion: Behaviour,
    pub separation: Behaviour,
    pub max_speed: f64,
    pub max_force: f64,
    pub friction: f64,
    pub gravity: f64,
    pub brownian: f64,
    pub collision_force: f64,
    pub boid_size: f64,
    pub quadtree_capacity: usize,
    pub num_boids: usize,
    pub placement: Placement,
    /// Speed of freshly placed boids; defaults to `max_speed`.
    pub initial_speed: Option<f64>,
    /// RNG seed; a random seed is drawn (and logged) when absent.
    pub seed: Option<u64>,
    pub mouse: MouseConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            wrap: [true, true],
            wrapreflect: 1.0,
            alignment: Behaviour::new(30.0, 1.0),
            cohesion: Behaviour::new(30.0, 1.0),
            separation: Behaviour::new(15.0, 1.5),
            max_speed: DEFAULT_MAX_SPEED,
            max_force: DEFAULT_MAX_FORCE,
            friction: 0.0,
            gravity: 0.0,
            brownian: 0.0,
            collision_force: 0.0,
            boid_size: DEFAULT_BOID_SIZE,
            quadtree_capacity: DEFAULT_QUADTREE_CAPACITY,
            num_boids: 0,
            placement: Placement::default(),
            initial_speed: None,
            seed: None,
            mouse: MouseConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_json(text: &str) -> Result<Self, FlockError> {
        let cfg: WorldConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn topology(&self) -> Topology {
        Topology::new(self.width, self.height, self.wrap)
    }

    /// Union radius for the per-tick neighbour query.
    pub fn interaction_radius(&self) -> f64 {
        self.alignment
            .radius
            .max(self.cohesion.radius)
            .max(self.separation.radius)
    }

    /// Leaf capacity for the quadtree; 0 is a configuration error, never coerced.
    pub fn index_capacity(&self) -> Result<NonZeroUsize, FlockError> {
        NonZeroUsize::new(self.quadtree_capacity)
            .ok_or_else(|| FlockError::config("quadtree_capacity must be at least 1"))
    }

    pub fn placement_center(&self) -> Vec2 {
        match self.placement.center {
            Some([x, y]) => vec2(x, y),
            None => vec2(self.width * 0.5, self.height * 0.5),
        }
    }

    pub fn placement_radius(&self) -> f64 {
        self.placement
            .radius
            .unwrap_or(0.5 * self.width.min(self.height))
    }

    pub fn validate(&self) -> Result<(), FlockError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(FlockError::config("width must be positive"));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(FlockError::config("height must be positive"));
        }
        self.index_capacity()?;
        let non_negative = [
            ("wrapreflect", self.wrapreflect),
            ("alignment.radius", self.alignment.radius),
            ("alignment.strength", self.alignment.strength),
            ("cohesion.radius", self.cohesion.radius),
            ("cohesion.strength", self.cohesion.strength),
            ("separation.radius", self.separation.radius),
            ("separation.strength", self.separation.strength),
            ("max_speed", self.max_speed),
            ("max_force", self.max_force),
            ("brownian", self.brownian),
            ("collision_force", self.collision_force),
            ("boid_size", self.boid_size),
            ("mouse.radius", self.mouse.radius),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FlockError::config(format!("{name} must be finite and non-negative, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(FlockError::config(format!("friction must lie in [0, 1], got {}", self.friction)));
        }
        if !self.gravity.is_finite() || !self.mouse.strength.is_finite() {
            return Err(FlockError::config("gravity and mouse.strength must be finite"));
        }
        if let Some(speed) = self.initial_speed {
            if !(speed.is_finite() && speed >= 0.0) {
                return Err(FlockError::config("initial_speed must be finite and non-negative"));
            }
        }
        if let Some(r) = self.placement.radius {
            if !(r.is_finite() && r >= 0.0) {
                return Err(FlockError::config("placement.radius must be finite and non-negative"));
            }
        }
        if let Some([x, y]) = self.placement.center {
            if !(x.is_finite() && y.is_finite()) {
                return Err(FlockError::config("placement.center must be finite"));
            }
        }
        Ok(())
    }
}
