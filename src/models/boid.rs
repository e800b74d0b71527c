use crate::config::WorldConfig;
use crate::error::FlockError;
use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identity of a boid; survives removal of other boids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoidId(pub u64);

/// Per-boid replacements for world-wide values. `None` means "use the world setting".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoidOverrides {
    pub max_speed: Option<f64>,
    pub max_force: Option<f64>,
    pub friction: Option<f64>,
    pub gravity: Option<f64>,
    pub collision_force: Option<f64>,
    pub brownian: Option<f64>,
    /// Strength of the alignment rule.
    pub alignment: Option<f64>,
    pub cohesion: Option<f64>,
    pub separation: Option<f64>,
}

impl BoidOverrides {
    pub fn validate(&self) -> Result<(), FlockError> {
        let non_negative = [
            ("max_speed", self.max_speed),
            ("max_force", self.max_force),
            ("collision_force", self.collision_force),
            ("brownian", self.brownian),
            ("alignment", self.alignment),
            ("cohesion", self.cohesion),
            ("separation", self.separation),
        ];
        for (field, value) in non_negative {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(FlockError::InvalidOverride { field, value: v });
                }
            }
        }
        if let Some(v) = self.friction {
            if !(0.0..=1.0).contains(&v) {
                return Err(FlockError::InvalidOverride { field: "friction", value: v });
            }
        }
        if let Some(v) = self.gravity {
            if !v.is_finite() {
                return Err(FlockError::InvalidOverride { field: "gravity", value: v });
            }
        }
        Ok(())
    }

    /// Effective values for one tick.
    pub fn resolve(&self, world: &WorldConfig) -> Kinetics {
        Kinetics {
            max_speed: self.max_speed.unwrap_or(world.max_speed),
            max_force: self.max_force.unwrap_or(world.max_force),
            friction: self.friction.unwrap_or(world.friction),
            gravity: self.gravity.unwrap_or(world.gravity),
            collision_force: self.collision_force.unwrap_or(world.collision_force),
            brownian: self.brownian.unwrap_or(world.brownian),
            alignment: self.alignment.unwrap_or(world.alignment.strength),
            cohesion: self.cohesion.unwrap_or(world.cohesion.strength),
            separation: self.separation.unwrap_or(world.separation.strength),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinetics {
    pub max_speed: f64,
    pub max_force: f64,
    pub friction: f64,
    pub gravity: f64,
    pub collision_force: f64,
    pub brownian: f64,
    pub alignment: f64,
    pub cohesion: f64,
    pub separation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boid {
    id: BoidId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Diameter of the collision envelope.
    pub size: f64,
    pub overrides: BoidOverrides,
    /// Boids skipped by this boid's collision rule.
    pub ignore: BTreeSet<BoidId>,
    /// Locked boids are never integrated but remain visible to others.
    pub locked: bool,
    overlapping: bool,
}

impl Boid {
    pub fn new(position: Vec2, velocity: Vec2, size: f64) -> Self {
        Self {
            id: BoidId(u64::MAX),
            position,
            velocity,
            acceleration: Vec2::zeros(),
            size,
            overrides: BoidOverrides::default(),
            ignore: BTreeSet::new(),
            locked: false,
            overlapping: false,
        }
    }

    pub fn with_overrides(mut self, overrides: BoidOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Assigned by the simulator when the boid is added.
    pub fn id(&self) -> BoidId { self.id }

    pub(crate) fn assign_id(&mut self, id: BoidId) { self.id = id; }

    /// True when another boid sat inside this boid's envelope during the last tick.
    pub fn overlapping(&self) -> bool { self.overlapping }

    pub(crate) fn set_overlapping(&mut self, overlapping: bool) { self.overlapping = overlapping; }

    pub fn validate(&self) -> Result<(), FlockError> {
        if !(self.position.x.is_finite() && self.position.y.is_finite()) {
            return Err(FlockError::OutOfBounds { x: self.position.x, y: self.position.y });
        }
        if !(self.velocity.x.is_finite() && self.velocity.y.is_finite()) {
            return Err(FlockError::InvalidOverride { field: "velocity", value: self.velocity.norm() });
        }
        if !(self.size.is_finite() && self.size >= 0.0) {
            return Err(FlockError::InvalidOverride { field: "size", value: self.size });
        }
        self.overrides.validate()
    }
}
