use crate::algorithms::flocking::{self, Attractor, Neighbour};
use crate::algorithms::obstacles::{Obstacle, ObstacleRegistry, ObstacleSpec};
use crate::config::WorldConfig;
use crate::error::FlockError;
use crate::geometry::{Topology, Vec2, limit, wrap_coordinate};
use crate::models::boid::{Boid, BoidId, BoidOverrides};
use crate::neighbours::neighbours_in_range;
use crate::quadtree::Quadtree;
use rand::Rng;
use std::num::NonZeroUsize;
use tracing::{debug, trace, warn};

/// Stages of one tick, run strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// Steering for every unlocked boid against the previous tick's index; boids untouched.
    Read,
    /// Velocity/position update, obstacles and world boundary.
    Integrate,
    /// Fresh quadtree from the integrated positions.
    Rebuild,
}

impl TickPhase {
    pub fn next(self) -> Option<TickPhase> {
        match self {
            TickPhase::Read => Some(TickPhase::Integrate),
            TickPhase::Integrate => Some(TickPhase::Rebuild),
            TickPhase::Rebuild => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Steering {
    acceleration: Vec2,
    overlapping: bool,
}

/// Owns the boids, the obstacle registry and the spatial index of one flock.
#[derive(Debug)]
pub struct Simulator {
    config: WorldConfig,
    topology: Topology,
    boids: Vec<Boid>,
    obstacles: ObstacleRegistry,
    attractors: Vec<Attractor>,
    capacity: NonZeroUsize,
    tree: Quadtree,
    // Positions the current tree was built from, indexed like `boids`.
    positions: Vec<Vec2>,
    stale: bool,
    // Set by `boid_mut`; the next tick re-validates every boid before reading them.
    unchecked: bool,
    next_id: u64,
    ticks: u64,
    steering: Vec<Steering>,
}

impl Simulator {
    pub fn new(config: WorldConfig) -> Result<Self, FlockError> {
        config.validate()?;
        let topology = config.topology();
        let capacity = config.index_capacity()?;
        let tree = Quadtree::new(topology.bounds(), capacity);
        Ok(Self {
            config,
            topology,
            boids: Vec::new(),
            obstacles: ObstacleRegistry::new(),
            attractors: Vec::new(),
            capacity,
            tree,
            positions: Vec::new(),
            stale: false,
            unchecked: false,
            next_id: 0,
            ticks: 0,
            steering: Vec::new(),
        })
    }

    pub fn config(&self) -> &WorldConfig { &self.config }
    pub fn topology(&self) -> &Topology { &self.topology }
    pub fn len(&self) -> usize { self.boids.len() }
    pub fn is_empty(&self) -> bool { self.boids.is_empty() }
    pub fn tick_count(&self) -> u64 { self.ticks }
    pub fn obstacles(&self) -> &ObstacleRegistry { &self.obstacles }
    pub fn attractors(&self) -> &[Attractor] { &self.attractors }

    /// Read-only view for renderers.
    pub fn boids(&self) -> &[Boid] { &self.boids }

    /// Index built at the end of the last tick (or after the last structural change).
    pub fn quadtree(&self) -> &Quadtree { &self.tree }

    /// Replace the world configuration between ticks.
    pub fn set_config(&mut self, config: WorldConfig) -> Result<(), FlockError> {
        config.validate()?;
        self.capacity = config.index_capacity()?;
        self.topology = config.topology();
        self.config = config;
        self.stale = true;
        Ok(())
    }

    /// Add a boid; overrides are validated here once rather than on every tick.
    pub fn add_boid(&mut self, mut boid: Boid) -> Result<BoidId, FlockError> {
        self.admit(&boid)?;
        let id = BoidId(self.next_id);
        self.next_id += 1;
        boid.assign_id(id);
        self.boids.push(boid);
        self.stale = true;
        Ok(id)
    }

    pub fn extend<I: IntoIterator<Item = Boid>>(&mut self, boids: I) -> Result<Vec<BoidId>, FlockError> {
        boids.into_iter().map(|b| self.add_boid(b)).collect()
    }

    /// Remove a boid, keeping the others in insertion order.
    pub fn remove_boid(&mut self, id: BoidId) -> Option<Boid> {
        let idx = self.index_of(id)?;
        self.stale = true;
        Some(self.boids.remove(idx))
    }

    pub fn boid(&self, id: BoidId) -> Option<&Boid> {
        self.index_of(id).map(|i| &self.boids[i])
    }

    /// Between-tick write access (locking, overrides, nudging positions). Whatever is written
    /// here is validated again at the start of the next tick, which fails rather than simulate
    /// a malformed boid.
    pub fn boid_mut(&mut self, id: BoidId) -> Option<&mut Boid> {
        let idx = self.index_of(id)?;
        self.stale = true;
        self.unchecked = true;
        Some(&mut self.boids[idx])
    }

    /// Replace a boid's overrides, rejecting malformed values immediately.
    pub fn set_overrides(&mut self, id: BoidId, overrides: BoidOverrides) -> Result<(), FlockError> {
        overrides.validate()?;
        let idx = self.index_of(id).ok_or(FlockError::UnknownBoid(id.0))?;
        self.boids[idx].overrides = overrides;
        Ok(())
    }

    fn admit(&self, boid: &Boid) -> Result<(), FlockError> {
        boid.validate()?;
        if !self.topology.bounds().contains(boid.position) {
            return Err(FlockError::OutOfBounds { x: boid.position.x, y: boid.position.y });
        }
        Ok(())
    }

    fn index_of(&self, id: BoidId) -> Option<usize> {
        self.boids.iter().position(|b| b.id() == id)
    }

    pub fn place_obstacle(&mut self, spec: ObstacleSpec) -> Result<usize, FlockError> {
        self.obstacles.place(spec)
    }

    pub fn push_obstacle(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle)
    }

    pub fn add_attractor(&mut self, attractor: Attractor) {
        self.attractors.push(attractor);
    }

    pub fn clear_attractors(&mut self) {
        self.attractors.clear();
    }

    /// Boids within `radius` of `position`, wrapping across seams where the world wraps.
    pub fn neighbours_of(&mut self, position: Vec2, radius: f64) -> Vec<BoidId> {
        self.ensure_index();
        neighbours_in_range(&self.tree, &self.positions, &self.topology, position, radius)
            .into_iter()
            .map(|i| self.boids[i].id())
            .collect()
    }

    /// Advance one tick. Fails before touching any boid if a boid edited through
    /// [`Simulator::boid_mut`] no longer validates; otherwise the tick runs to completion.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), FlockError> {
        if self.unchecked {
            for boid in &self.boids {
                self.admit(boid)?;
            }
            self.unchecked = false;
        }

        let mut phase = Some(TickPhase::Read);
        while let Some(current) = phase {
            trace!(tick = self.ticks, phase = ?current, "phase");
            match current {
                TickPhase::Read => self.read(),
                TickPhase::Integrate => self.integrate(rng),
                TickPhase::Rebuild => self.rebuild(),
            }
            phase = current.next();
        }
        self.ticks += 1;
        Ok(())
    }

    fn ensure_index(&mut self) {
        if self.stale || self.positions.len() != self.boids.len() {
            self.rebuild();
        }
    }

    fn read(&mut self) {
        self.ensure_index();
        let mut steering = std::mem::take(&mut self.steering);
        steering.clear();
        steering.extend((0..self.boids.len()).map(|i| {
            if self.boids[i].locked {
                Steering::default()
            } else {
                self.steering_for(i)
            }
        }));
        self.steering = steering;
    }

    fn steering_for(&self, i: usize) -> Steering {
        let boid = &self.boids[i];
        let k = boid.overrides.resolve(&self.config);
        let cfg = &self.config;
        let radius = cfg.interaction_radius().max(boid.size);

        let neighbours: Vec<Neighbour<'_>> =
            neighbours_in_range(&self.tree, &self.positions, &self.topology, boid.position, radius)
                .into_iter()
                .filter(|&j| j != i)
                .map(|j| Neighbour::new(j, &self.boids[j], boid.position, &self.topology))
                .collect();

        let limit_speed = k.max_speed;
        let mut acc = boid.acceleration;
        acc += flocking::alignment(boid, &neighbours, cfg.alignment.radius, limit_speed) * k.alignment;
        acc += flocking::cohesion(boid, &neighbours, cfg.cohesion.radius, limit_speed) * k.cohesion;
        acc += flocking::separation(boid, &neighbours, cfg.separation.radius, limit_speed) * k.separation;
        let collision = flocking::collision(boid, &neighbours, limit_speed);
        acc += collision.steering * k.collision_force;
        acc.y += k.gravity;
        for attractor in &self.attractors {
            acc += attractor.steering(boid, &self.topology, limit_speed);
        }

        Steering { acceleration: acc, overlapping: collision.overlapping }
    }

    fn integrate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let cfg = &self.config;
        for (boid, s) in self.boids.iter_mut().zip(&self.steering) {
            if boid.locked {
                continue;
            }
            let k = boid.overrides.resolve(cfg);
            boid.set_overlapping(s.overlapping);
            boid.acceleration = limit(s.acceleration, k.max_force);

            boid.velocity *= 1.0 - k.friction;
            if k.brownian != 0.0 {
                boid.velocity.x += k.brownian * (2.0 * rng.gen_range(0.0..1.0f64) - 1.0);
                boid.velocity.y += k.brownian * (2.0 * rng.gen_range(0.0..1.0f64) - 1.0);
            }
            boid.velocity += boid.acceleration;
            boid.velocity = limit(boid.velocity, k.max_speed);
            boid.position += boid.velocity;

            self.obstacles.resolve(boid);
            apply_boundary(&self.topology, cfg.wrapreflect, boid);
            boid.acceleration = Vec2::zeros();
        }
    }

    fn rebuild(&mut self) {
        self.positions.clear();
        self.positions.extend(self.boids.iter().map(|b| b.position));
        let (tree, rejected) =
            Quadtree::build(self.topology.bounds(), self.capacity, self.positions.iter().copied());
        for &i in &rejected {
            let p = self.positions[i];
            warn!(boid = self.boids[i].id().0, x = p.x, y = p.y, "boid outside world, not indexed");
        }
        debug!(entries = tree.len(), depth = tree.depth(), "quadtree rebuilt");
        if tree.largest_bucket() > self.capacity.get() {
            warn!(bucket = tree.largest_bucket(), "colocated boids overflowed a quadtree leaf");
        }
        self.tree = tree;
        self.stale = false;
    }
}

/// Wrap wrapping axes into `[0, extent)`; clamp walled axes to `[size/2, extent - size/2]` and
/// reflect the offending velocity component scaled by `wrapreflect`.
fn apply_boundary(topology: &Topology, wrapreflect: f64, boid: &mut Boid) {
    let extents = [topology.width, topology.height];
    for axis in 0..2 {
        let extent = extents[axis];
        if topology.wrap[axis] {
            boid.position[axis] = wrap_coordinate(boid.position[axis], extent);
            continue;
        }
        let half = (boid.size * 0.5).min(extent * 0.5);
        if boid.position[axis] < half {
            boid.position[axis] = half;
            boid.velocity[axis] = -boid.velocity[axis] * wrapreflect;
        } else if boid.position[axis] > extent - half {
            boid.position[axis] = extent - half;
            boid.velocity[axis] = -boid.velocity[axis] * wrapreflect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Behaviour;
    use crate::geometry::vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quiet_config() -> WorldConfig {
        WorldConfig {
            width: 100.0,
            height: 100.0,
            alignment: Behaviour::new(0.0, 0.0),
            cohesion: Behaviour::new(0.0, 0.0),
            separation: Behaviour::new(0.0, 0.0),
            max_speed: 5.0,
            max_force: 1.0,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn phases_run_in_order() {
        assert_eq!(TickPhase::Read.next(), Some(TickPhase::Integrate));
        assert_eq!(TickPhase::Integrate.next(), Some(TickPhase::Rebuild));
        assert_eq!(TickPhase::Rebuild.next(), None);
    }

    #[test]
    fn symmetric_pair_stays_mirrored() {
        let cfg = WorldConfig {
            wrap: [false, false],
            separation: Behaviour::new(5.0, 1.0),
            ..quiet_config()
        };
        let mut sim = Simulator::new(cfg).expect("sim");
        let a = sim.add_boid(Boid::new(vec2(49.0, 50.0), Vec2::zeros(), 1.0)).expect("a");
        let b = sim.add_boid(Boid::new(vec2(51.0, 50.0), Vec2::zeros(), 1.0)).expect("b");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.tick(&mut rng).expect("tick");
        let (a, b) = (sim.boid(a).expect("a"), sim.boid(b).expect("b"));
        assert!(a.velocity.x < 0.0);
        assert_eq!(a.velocity.x, -b.velocity.x);
        assert_eq!(a.position.x - 50.0, 50.0 - b.position.x);
    }

    #[test]
    fn locked_boids_do_not_move_but_are_seen() {
        let cfg = WorldConfig { separation: Behaviour::new(5.0, 1.0), ..quiet_config() };
        let mut sim = Simulator::new(cfg).expect("sim");
        let anchor = sim
            .add_boid(Boid::new(vec2(50.0, 50.0), vec2(1.0, 0.0), 1.0).locked(true))
            .expect("anchor");
        let mover = sim.add_boid(Boid::new(vec2(52.0, 50.0), Vec2::zeros(), 1.0)).expect("mover");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.tick(&mut rng).expect("tick");
        assert_eq!(sim.boid(anchor).expect("anchor").position, vec2(50.0, 50.0));
        assert!(sim.boid(mover).expect("mover").velocity.x > 0.0);
    }

    #[test]
    fn gravity_and_friction_apply_per_boid() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let falling = Boid::new(vec2(50.0, 50.0), vec2(2.0, 0.0), 1.0)
            .with_overrides(BoidOverrides { gravity: Some(0.5), friction: Some(0.5), ..Default::default() });
        let id = sim.add_boid(falling).expect("add");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        let b = sim.boid(id).expect("boid");
        assert!((b.velocity - vec2(1.0, 0.5)).norm() < 1e-12);
        assert!((b.position - vec2(51.0, 50.5)).norm() < 1e-12);
        assert_eq!(b.acceleration, Vec2::zeros());
    }

    #[test]
    fn acceleration_clamped_to_max_force() {
        let cfg = WorldConfig { gravity: 10.0, max_force: 0.3, ..quiet_config() };
        let mut sim = Simulator::new(cfg).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), Vec2::zeros(), 1.0)).expect("add");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert!((sim.boid(id).expect("boid").velocity.y - 0.3).abs() < 1e-12);
    }

    #[test]
    fn removal_keeps_order_and_reindexes() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let ids = sim
            .extend((0..4).map(|i| Boid::new(vec2(10.0 + i as f64, 10.0), Vec2::zeros(), 1.0)))
            .expect("extend");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert!(sim.remove_boid(ids[1]).is_some());
        assert!(sim.remove_boid(ids[1]).is_none());
        let order: Vec<_> = sim.boids().iter().map(Boid::id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
        let near = sim.neighbours_of(vec2(12.0, 10.0), 0.5);
        assert_eq!(near, vec![ids[2]]);
    }

    #[test]
    fn rejects_out_of_world_and_invalid_boids() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        assert!(matches!(
            sim.add_boid(Boid::new(vec2(150.0, 10.0), Vec2::zeros(), 1.0)),
            Err(FlockError::OutOfBounds { .. })
        ));
        let bad = Boid::new(vec2(10.0, 10.0), Vec2::zeros(), 1.0)
            .with_overrides(BoidOverrides { max_force: Some(-1.0), ..Default::default() });
        assert!(matches!(sim.add_boid(bad), Err(FlockError::InvalidOverride { .. })));
        assert!(sim.is_empty());
    }

    #[test]
    fn collision_sets_overlapping_flag() {
        let cfg = WorldConfig { collision_force: 1.0, ..quiet_config() };
        let mut sim = Simulator::new(cfg).expect("sim");
        let a = sim.add_boid(Boid::new(vec2(50.0, 50.0), Vec2::zeros(), 4.0)).expect("a");
        let b = sim.add_boid(Boid::new(vec2(60.0, 50.0), Vec2::zeros(), 4.0)).expect("b");
        let c = sim.add_boid(Boid::new(vec2(51.0, 50.0), Vec2::zeros(), 4.0)).expect("c");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert!(sim.boid(a).expect("a").overlapping());
        assert!(!sim.boid(b).expect("b").overlapping());
        assert!(sim.boid(c).expect("c").overlapping());
        assert!(sim.boid(a).expect("a").velocity.x < 0.0);
    }

    #[test]
    fn boundary_wraps_and_reflects() {
        let torus = Topology::new(100.0, 100.0, [true, false]);
        let mut boid = Boid::new(vec2(-1.0, -3.0), vec2(-1.0, -2.0), 4.0);
        apply_boundary(&torus, 0.5, &mut boid);
        assert_eq!(boid.position, vec2(99.0, 2.0));
        assert_eq!(boid.velocity, vec2(-1.0, 1.0));
    }

    #[test]
    fn attractor_pulls_boids() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), Vec2::zeros(), 1.0)).expect("add");
        sim.add_attractor(Attractor { position: [60.0, 50.0], strength: 1.0, radius: 20.0 });
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert!(sim.boid(id).expect("boid").velocity.x > 0.0);
    }

    #[test]
    fn edited_overrides_are_checked_before_the_next_tick() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), vec2(1.0, 0.0), 1.0)).expect("add");
        let boid = sim.boid_mut(id).expect("boid");
        boid.overrides.friction = Some(2.0);
        boid.overrides.max_speed = Some(f64::NAN);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(sim.tick(&mut rng), Err(FlockError::InvalidOverride { .. })));
        assert_eq!(sim.tick_count(), 0);
        let b = sim.boid(id).expect("boid");
        assert_eq!((b.position, b.velocity), (vec2(50.0, 50.0), vec2(1.0, 0.0)));

        sim.boid_mut(id).expect("boid").overrides = BoidOverrides::default();
        sim.tick(&mut rng).expect("tick");
        assert_eq!(sim.boid(id).expect("boid").position, vec2(51.0, 50.0));
    }

    #[test]
    fn set_overrides_rejects_bad_values_up_front() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), Vec2::zeros(), 1.0)).expect("add");
        let bad = BoidOverrides { friction: Some(2.0), ..Default::default() };
        assert!(matches!(sim.set_overrides(id, bad), Err(FlockError::InvalidOverride { field: "friction", .. })));
        assert_eq!(sim.boid(id).expect("boid").overrides, BoidOverrides::default());

        let good = BoidOverrides { gravity: Some(0.5), ..Default::default() };
        sim.set_overrides(id, good).expect("valid overrides");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert!((sim.boid(id).expect("boid").velocity.y - 0.5).abs() < 1e-12);

        sim.remove_boid(id);
        assert!(matches!(sim.set_overrides(id, good), Err(FlockError::UnknownBoid(_))));
    }

    fn jittered(brownian: f64, seed: u64) -> Vec2 {
        let cfg = WorldConfig { brownian, ..quiet_config() };
        let mut sim = Simulator::new(cfg).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), Vec2::zeros(), 1.0)).expect("add");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(seed)).expect("tick");
        sim.boid(id).expect("boid").velocity
    }

    #[test]
    fn brownian_jitter_moves_resting_boids_within_bounds() {
        let b = 0.5;
        let v = jittered(b, 21);
        for axis in 0..2 {
            assert!(v[axis] != 0.0, "axis {axis} did not jitter");
            assert!(v[axis].abs() <= b, "axis {axis} jittered by {}", v[axis]);
        }
        assert_ne!(v, jittered(b, 22));
        assert_eq!(jittered(b, 21), v);
        assert_eq!(jittered(0.0, 21), Vec2::zeros());
    }

    #[test]
    fn brownian_override_applies_to_that_boid_only() {
        let mut sim = Simulator::new(quiet_config()).expect("sim");
        let shaky = sim
            .add_boid(
                Boid::new(vec2(30.0, 50.0), Vec2::zeros(), 1.0)
                    .with_overrides(BoidOverrides { brownian: Some(0.3), ..Default::default() }),
            )
            .expect("shaky");
        let calm = sim.add_boid(Boid::new(vec2(70.0, 50.0), Vec2::zeros(), 1.0)).expect("calm");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(5)).expect("tick");

        let v = sim.boid(shaky).expect("shaky").velocity;
        assert!(v.x != 0.0 && v.y != 0.0);
        assert!(v.x.abs() <= 0.3 && v.y.abs() <= 0.3);
        assert_eq!(sim.boid(calm).expect("calm").velocity, Vec2::zeros());
    }

    #[test]
    fn lone_boid_is_not_its_own_neighbour() {
        let cfg = WorldConfig {
            alignment: Behaviour::new(30.0, 1.0),
            cohesion: Behaviour::new(30.0, 1.0),
            separation: Behaviour::new(30.0, 1.0),
            ..quiet_config()
        };
        let mut sim = Simulator::new(cfg).expect("sim");
        let id = sim.add_boid(Boid::new(vec2(50.0, 50.0), vec2(1.0, 0.0), 1.0)).expect("add");
        sim.tick(&mut ChaCha8Rng::seed_from_u64(0)).expect("tick");
        assert_eq!(sim.boid(id).expect("boid").velocity, vec2(1.0, 0.0));
    }
}
