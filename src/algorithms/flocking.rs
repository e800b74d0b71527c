//! Reynolds steering rules.
//!
//! Every rule produces `desired - velocity`, where `desired` points along the rule's preferred
//! direction at magnitude `limit` (the boid's max speed). Empty neighbourhoods and zero-length
//! directions give a zero vector.

use crate::geometry::{Topology, Vec2, normalized_or_zero};
use crate::models::boid::Boid;
use serde::{Deserialize, Serialize};

/// Another boid seen from the boid being steered.
#[derive(Debug, Clone, Copy)]
pub struct Neighbour<'a> {
    pub index: usize,
    pub boid: &'a Boid,
    /// Shortest offset from the steered boid to this one.
    pub offset: Vec2,
    pub distance_squared: f64,
}

impl<'a> Neighbour<'a> {
    pub fn new(index: usize, boid: &'a Boid, from: Vec2, topology: &Topology) -> Self {
        let offset = topology.delta(from, boid.position);
        Self {
            index,
            boid,
            offset,
            distance_squared: offset.norm_squared(),
        }
    }

    fn within(&self, radius: f64) -> bool {
        self.distance_squared <= radius * radius
    }

    fn strictly_within(&self, radius: f64) -> bool {
        self.distance_squared < radius * radius
    }
}

fn steer(boid: &Boid, direction: Vec2, limit: f64) -> Vec2 {
    let desired = normalized_or_zero(direction);
    if desired == Vec2::zeros() {
        return Vec2::zeros();
    }
    desired * limit - boid.velocity
}

/// Match the average heading of neighbours within `radius`.
pub fn alignment(boid: &Boid, neighbours: &[Neighbour<'_>], radius: f64, limit: f64) -> Vec2 {
    let mut sum = Vec2::zeros();
    let mut count = 0usize;
    for n in neighbours.iter().filter(|n| n.within(radius)) {
        sum += n.boid.velocity;
        count += 1;
    }
    if count == 0 {
        return Vec2::zeros();
    }
    steer(boid, sum / count as f64, limit)
}

/// Head for the local centre of mass, measured through the shortest (possibly wrapped) offsets.
pub fn cohesion(boid: &Boid, neighbours: &[Neighbour<'_>], radius: f64, limit: f64) -> Vec2 {
    let mut sum = Vec2::zeros();
    let mut count = 0usize;
    for n in neighbours.iter().filter(|n| n.within(radius)) {
        sum += n.offset;
        count += 1;
    }
    if count == 0 {
        return Vec2::zeros();
    }
    steer(boid, sum / count as f64, limit)
}

/// Move away from neighbours strictly inside `radius`.
pub fn separation(boid: &Boid, neighbours: &[Neighbour<'_>], radius: f64, limit: f64) -> Vec2 {
    let mut sum = Vec2::zeros();
    let mut count = 0usize;
    for n in neighbours.iter().filter(|n| n.strictly_within(radius)) {
        sum += normalized_or_zero(-n.offset);
        count += 1;
    }
    if count == 0 {
        return Vec2::zeros();
    }
    steer(boid, sum, limit)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub steering: Vec2,
    /// Another boid (ignored ones included) sits inside the envelope.
    pub overlapping: bool,
}

/// Separation restricted to the boid's own envelope (`size`), skipping its `ignore` set.
pub fn collision(boid: &Boid, neighbours: &[Neighbour<'_>], limit: f64) -> Collision {
    let mut sum = Vec2::zeros();
    let mut touching = 0usize;
    let mut count = 0usize;
    for n in neighbours
        .iter()
        .filter(|n| n.boid.id() != boid.id() && n.strictly_within(boid.size))
    {
        touching += 1;
        if boid.ignore.contains(&n.boid.id()) {
            continue;
        }
        sum += normalized_or_zero(-n.offset);
        count += 1;
    }
    let steering = if count == 0 { Vec2::zeros() } else { steer(boid, sum, limit) };
    Collision { steering, overlapping: touching > 0 }
}

/// Point attractor (negative strength repels), e.g. a mouse pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub position: [f64; 2],
    pub strength: f64,
    pub radius: f64,
}

impl Attractor {
    pub fn steering(&self, boid: &Boid, topology: &Topology, limit: f64) -> Vec2 {
        let target = Vec2::new(self.position[0], self.position[1]);
        let offset = topology.delta(boid.position, target);
        if offset.norm_squared() > self.radius * self.radius {
            return Vec2::zeros();
        }
        steer(boid, offset, limit) * self.strength
    }
}
