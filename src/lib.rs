//! Boid flocking on a rectangular, optionally toroidal world.
//!
//! Each tick every boid is steered by alignment, cohesion, separation and collision rules
//! computed against a quadtree built at the end of the previous tick, then integrated, bounced
//! off obstacles and wrapped or reflected at the world edges.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod neighbours;
pub mod quadtree;
pub mod sim;

pub mod algorithms {
    pub mod flocking;
    pub mod obstacles;
}

pub mod models {
    pub mod boid;
    pub mod population;
}

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use algorithms::flocking::Attractor;
pub use algorithms::obstacles::{Obstacle, ObstacleRegistry, ObstacleSpec};
pub use config::{Behaviour, MouseConfig, Placement, WorldConfig};
pub use engine::{Engine, FlockStats, SceneInfo, scene_catalog};
pub use error::FlockError;
pub use geometry::{Rect, Topology, Vec2, vec2};
pub use models::boid::{Boid, BoidId, BoidOverrides, Kinetics};
pub use quadtree::Quadtree;
pub use sim::{Simulator, TickPhase};
