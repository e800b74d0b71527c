use crate::geometry::{Topology, Vec2, vec2, wrap_coordinate};
use crate::models::boid::Boid;
use rand::Rng;
use std::f64::consts::PI;

/// Bring a sampled point into the world: wrap on wrapping axes, clamp on walled ones.
pub fn confine(topology: &Topology, p: Vec2, size: f64) -> Vec2 {
    let axis = |value: f64, extent: f64, wraps: bool| {
        if wraps {
            wrap_coordinate(value, extent)
        } else {
            let half = (size * 0.5).min(extent * 0.5);
            value.clamp(half, extent - half)
        }
    };
    vec2(
        axis(p.x, topology.width, topology.wrap[0]),
        axis(p.y, topology.height, topology.wrap[1]),
    )
}

/// Uniform random heading at `speed`.
pub fn random_velocity<R: Rng + ?Sized>(rng: &mut R, speed: f64) -> Vec2 {
    let angle = rng.gen_range(0.0..2.0 * PI);
    vec2(angle.cos(), angle.sin()) * speed
}

/// `count` boids uniformly distributed over a disc, each with a random heading.
pub fn disc<R: Rng + ?Sized>(
    rng: &mut R,
    topology: &Topology,
    count: usize,
    center: Vec2,
    radius: f64,
    speed: f64,
    size: f64,
) -> Vec<Boid> {
    let mut boids = Vec::with_capacity(count);
    for _ in 0..count {
        let angle = rng.gen_range(0.0..2.0 * PI);
        let dist = radius * rng.gen_range(0.0..1.0f64).sqrt();
        let p = center + vec2(angle.cos(), angle.sin()) * dist;
        let v = random_velocity(rng, speed);
        boids.push(Boid::new(confine(topology, p, size), v, size));
    }
    boids
}

/// Evenly spaced ring, heading tangentially. Deterministic; used by demo scenes.
pub fn ring(topology: &Topology, count: usize, center: Vec2, radius: f64, speed: f64, size: f64) -> Vec<Boid> {
    let mut boids = Vec::with_capacity(count);
    if count == 0 {
        return boids;
    }
    for i in 0..count {
        let angle = (i as f64 / count as f64) * 2.0 * PI;
        let p = center + vec2(angle.cos(), angle.sin()) * radius;
        let tangent = vec2(-angle.sin(), angle.cos());
        boids.push(Boid::new(confine(topology, p, size), tangent * speed, size));
    }
    boids
}

/// Square lattice with the given spacing, at rest.
pub fn lattice(topology: &Topology, side: usize, origin: Vec2, spacing: f64, size: f64) -> Vec<Boid> {
    let mut boids = Vec::with_capacity(side * side);
    for ix in 0..side {
        for iy in 0..side {
            let p = origin + vec2(ix as f64 * spacing, iy as f64 * spacing);
            boids.push(Boid::new(confine(topology, p, size), Vec2::zeros(), size));
        }
    }
    boids
}
