use crate::algorithms::flocking::Attractor;
use crate::algorithms::obstacles::{Obstacle, ObstacleSpec};
use crate::config::{Behaviour, Placement, WorldConfig};
use crate::error::FlockError;
use crate::geometry::vec2;
use crate::models::boid::{Boid, BoidId};
use crate::models::population;
use crate::sim::Simulator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

pub const SCENE_FLOCK: &str = "flock";
pub const SCENE_OBSTACLE_COURSE: &str = "obstacle-course";
pub const SCENE_RAIN: &str = "rain";
pub const SCENE_MILL: &str = "mill";

pub struct SceneInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn scene_catalog() -> &'static [SceneInfo] {
    &[
        SceneInfo {
            id: SCENE_FLOCK,
            name: "Toroidal flock",
            description: "Boids on a wrapping world with alignment, cohesion and separation.",
        },
        SceneInfo {
            id: SCENE_OBSTACLE_COURSE,
            name: "Obstacle course",
            description: "Walled world with rectangular and circular obstacles to bounce off.",
        },
        SceneInfo {
            id: SCENE_RAIN,
            name: "Rain",
            description: "Gravity, friction and brownian jitter; boids pile up on the floor.",
        },
        SceneInfo {
            id: SCENE_MILL,
            name: "Mill",
            description: "Boids start on a ring heading tangentially and keep milling around its centre.",
        },
    ]
}

/// Aggregate numbers over the current flock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockStats {
    pub boids: usize,
    pub mean_speed: f64,
    pub overlapping: usize,
    /// Variance of all pairwise (shortest, possibly wrapped) distances.
    pub pairwise_distance_variance: f64,
}

/// A simulator plus the random stream that drives it.
pub struct Engine {
    sim: Simulator,
    rng: ChaCha8Rng,
    seed: u64,
}

impl Engine {
    pub fn new(config: WorldConfig) -> Result<Self, FlockError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut sim = Simulator::new(config.clone())?;

        let topology = config.topology();
        let speed = config.initial_speed.unwrap_or(config.max_speed);
        let boids = population::disc(
            &mut rng,
            &topology,
            config.num_boids,
            config.placement_center(),
            config.placement_radius(),
            speed,
            config.boid_size,
        );
        sim.extend(boids)?;

        info!(seed, boids = sim.len(), width = config.width, height = config.height, "flock created");
        Ok(Self { sim, rng, seed })
    }

    pub fn from_json(text: &str) -> Result<Self, FlockError> {
        Self::new(WorldConfig::from_json(text)?)
    }

    pub fn new_scene(scene_id: &str, seed: Option<u64>) -> Result<Self, FlockError> {
        match scene_id {
            SCENE_FLOCK => Self::new(WorldConfig {
                width: 200.0,
                height: 200.0,
                num_boids: 50,
                alignment: Behaviour::new(50.0, 0.3),
                cohesion: Behaviour::new(50.0, 0.5),
                separation: Behaviour::new(10.0, 1.0),
                seed,
                ..WorldConfig::default()
            }),
            SCENE_OBSTACLE_COURSE => {
                let mut engine = Self::new(WorldConfig {
                    width: 300.0,
                    height: 200.0,
                    wrap: [false, false],
                    num_boids: 80,
                    collision_force: 0.5,
                    placement: Placement { center: Some([60.0, 100.0]), radius: Some(40.0) },
                    seed,
                    ..WorldConfig::default()
                })?;
                engine.sim.push_obstacle(Obstacle::Rectangle { x: 140.0, y: 40.0, w: 20.0, h: 120.0, force: 1.0 });
                engine.sim.push_obstacle(Obstacle::Circle { x: 230.0, y: 100.0, r: 25.0, force: 0.5 });
                Ok(engine)
            }
            SCENE_RAIN => {
                let mut engine = Self::new(WorldConfig {
                    width: 200.0,
                    height: 200.0,
                    wrap: [true, false],
                    wrapreflect: 0.5,
                    gravity: 0.1,
                    friction: 0.02,
                    brownian: 0.05,
                    collision_force: 1.0,
                    alignment: Behaviour::new(0.0, 0.0),
                    cohesion: Behaviour::new(0.0, 0.0),
                    seed,
                    ..WorldConfig::default()
                })?;
                let topology = *engine.sim.topology();
                engine.sim.extend(population::lattice(&topology, 10, vec2(55.0, 10.0), 10.0, 5.0))?;
                Ok(engine)
            }
            SCENE_MILL => {
                let mut engine = Self::new(WorldConfig {
                    width: 300.0,
                    height: 300.0,
                    alignment: Behaviour::new(20.0, 1.0),
                    cohesion: Behaviour::new(20.0, 0.2),
                    separation: Behaviour::new(6.0, 1.0),
                    seed,
                    ..WorldConfig::default()
                })?;
                let topology = *engine.sim.topology();
                engine
                    .sim
                    .extend(population::ring(&topology, 60, vec2(150.0, 150.0), 80.0, 2.0, 5.0))?;
                Ok(engine)
            }
            other => Err(FlockError::UnknownScene(other.to_string())),
        }
    }

    pub fn seed(&self) -> u64 { self.seed }
    pub fn len(&self) -> usize { self.sim.len() }
    pub fn is_empty(&self) -> bool { self.sim.is_empty() }
    pub fn simulator(&self) -> &Simulator { &self.sim }

    /// Between-tick access for adding/removing boids or editing them.
    pub fn simulator_mut(&mut self) -> &mut Simulator { &mut self.sim }

    pub fn tick(&mut self) -> Result<(), FlockError> {
        self.sim.tick(&mut self.rng)
    }

    /// Stops at the first tick that fails.
    pub fn run(&mut self, ticks: u64) -> Result<(), FlockError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    pub fn place_obstacle(&mut self, spec: ObstacleSpec) -> Result<usize, FlockError> {
        self.sim.place_obstacle(spec)
    }

    /// Add a boid at `(x, y)` with a random heading at the configured initial speed.
    pub fn spawn(&mut self, x: f64, y: f64) -> Result<BoidId, FlockError> {
        let cfg = self.sim.config();
        let speed = cfg.initial_speed.unwrap_or(cfg.max_speed);
        let size = cfg.boid_size;
        let velocity = population::random_velocity(&mut self.rng, speed);
        self.sim.add_boid(Boid::new(vec2(x, y), velocity, size))
    }

    /// Install (or with `None` remove) the pointer attractor configured under `mouse`.
    pub fn set_pointer(&mut self, pointer: Option<(f64, f64)>) {
        self.sim.clear_attractors();
        let mouse = self.sim.config().mouse;
        if let Some((x, y)) = pointer {
            if mouse.strength != 0.0 {
                self.sim.add_attractor(Attractor {
                    position: [x, y],
                    strength: mouse.strength,
                    radius: mouse.radius,
                });
            }
        }
    }

    /// Interleaved `x, y` per boid.
    pub fn positions_flat(&self) -> Vec<f32> {
        let boids = self.sim.boids();
        let mut out = Vec::with_capacity(boids.len() * 2);
        for b in boids {
            out.push(b.position.x as f32);
            out.push(b.position.y as f32);
        }
        out
    }

    /// Interleaved `x, y, vx, vy, size` per boid.
    pub fn states_flat(&self) -> Vec<f32> {
        let boids = self.sim.boids();
        let mut out = Vec::with_capacity(boids.len() * 5);
        for b in boids {
            out.extend_from_slice(&[
                b.position.x as f32,
                b.position.y as f32,
                b.velocity.x as f32,
                b.velocity.y as f32,
                b.size as f32,
            ]);
        }
        out
    }

    pub fn overlapping_flags(&self) -> Vec<u8> {
        self.sim.boids().iter().map(|b| u8::from(b.overlapping())).collect()
    }

    pub fn stats(&self) -> FlockStats {
        let boids = self.sim.boids();
        let topology = self.sim.topology();
        let n = boids.len();
        let mean_speed = if n == 0 {
            0.0
        } else {
            boids.iter().map(|b| b.velocity.norm()).sum::<f64>() / n as f64
        };

        let (mut sum, mut sum_sq, mut pairs) = (0.0, 0.0, 0usize);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = topology.distance_squared(boids[i].position, boids[j].position).sqrt();
                sum += d;
                sum_sq += d * d;
                pairs += 1;
            }
        }
        let pairwise_distance_variance = if pairs == 0 {
            0.0
        } else {
            let mean = sum / pairs as f64;
            (sum_sq / pairs as f64 - mean * mean).max(0.0)
        };

        FlockStats {
            boids: n,
            mean_speed,
            overlapping: boids.iter().filter(|b| b.overlapping()).count(),
            pairwise_distance_variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_scene_builds() {
        for scene in scene_catalog() {
            let mut engine = Engine::new_scene(scene.id, Some(5)).expect(scene.id);
            assert!(!engine.is_empty());
            engine.run(3).expect("run");
            assert_eq!(engine.simulator().tick_count(), 3);
        }
        assert!(matches!(Engine::new_scene("nope", None), Err(FlockError::UnknownScene(_))));
    }

    #[test]
    fn flat_buffers_have_expected_stride() {
        let engine = Engine::new_scene(SCENE_FLOCK, Some(1)).expect("scene");
        assert_eq!(engine.positions_flat().len(), engine.len() * 2);
        assert_eq!(engine.states_flat().len(), engine.len() * 5);
        assert_eq!(engine.overlapping_flags().len(), engine.len());
    }

    #[test]
    fn pointer_requires_mouse_strength() {
        let mut engine = Engine::new(WorldConfig { seed: Some(2), ..WorldConfig::default() }).expect("engine");
        engine.set_pointer(Some((10.0, 10.0)));
        assert!(engine.simulator().attractors().is_empty());

        let cfg = WorldConfig {
            seed: Some(2),
            mouse: crate::config::MouseConfig { strength: 1.0, radius: 30.0 },
            ..WorldConfig::default()
        };
        let mut engine = Engine::new(cfg).expect("engine");
        engine.set_pointer(Some((10.0, 10.0)));
        assert_eq!(engine.simulator().attractors().len(), 1);
        engine.set_pointer(None);
        assert!(engine.simulator().attractors().is_empty());
    }

    #[test]
    fn spawn_adds_boid_inside_world() {
        let mut engine = Engine::new(WorldConfig { seed: Some(4), ..WorldConfig::default() }).expect("engine");
        let id = engine.spawn(20.0, 30.0).expect("spawn");
        assert_eq!(engine.simulator().boid(id).expect("boid").position, vec2(20.0, 30.0));
        assert!(engine.spawn(-5.0, 30.0).is_err());
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        assert!(matches!(Engine::from_json("{ not json"), Err(FlockError::Parse(_))));
        assert!(matches!(
            Engine::from_json(r#"{"quadtree_capacity": 0}"#),
            Err(FlockError::InvalidConfig(_))
        ));
    }
}
