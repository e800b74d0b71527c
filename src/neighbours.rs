//! Circular neighbour search over a quadtree on a possibly toroidal world.

use crate::geometry::{Rect, Topology, Vec2};
use crate::quadtree::Quadtree;

/// Indices of points within `radius` of `position`, in ascending index order.
///
/// On a wrapping axis a single range query misses points that are only close across the seam,
/// so the square window is also queried at the position shifted by one world extent in each
/// direction (nine windows when both axes wrap). Candidates are then filtered by the unwrapped
/// distance.
pub fn neighbours_in_range(
    tree: &Quadtree,
    positions: &[Vec2],
    topology: &Topology,
    position: Vec2,
    radius: f64,
) -> Vec<usize> {
    if radius.is_nan() || radius < 0.0 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for image in topology.images(position) {
        tree.query_into(&Rect::around(image, radius), &mut candidates);
    }
    candidates.sort_unstable();
    candidates.dedup();

    let r2 = radius * radius;
    candidates.retain(|&i| {
        positions
            .get(i)
            .is_some_and(|&p| topology.distance_squared(position, p) <= r2)
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vec2;
    use std::num::NonZeroUsize;

    fn build(topology: &Topology, positions: &[Vec2]) -> Quadtree {
        Quadtree::build(topology.bounds(), NonZeroUsize::new(3).expect("non-zero"), positions.iter().copied()).0
    }

    #[test]
    fn finds_neighbour_across_both_seams() {
        let torus = Topology::new(100.0, 100.0, [true, true]);
        let positions = vec![vec2(1.0, 1.0), vec2(99.0, 99.0), vec2(50.0, 50.0)];
        let tree = build(&torus, &positions);
        let found = neighbours_in_range(&tree, &positions, &torus, positions[0], 5.0);
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn bounded_world_does_not_wrap() {
        let walls = Topology::new(100.0, 100.0, [false, false]);
        let positions = vec![vec2(1.0, 1.0), vec2(99.0, 99.0)];
        let tree = build(&walls, &positions);
        let found = neighbours_in_range(&tree, &positions, &walls, positions[0], 5.0);
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn filters_square_corners_by_true_distance() {
        let torus = Topology::new(100.0, 100.0, [true, true]);
        let positions = vec![vec2(50.0, 50.0), vec2(54.0, 54.0), vec2(53.0, 50.0)];
        let tree = build(&torus, &positions);
        let found = neighbours_in_range(&tree, &positions, &torus, positions[0], 5.0);
        assert_eq!(found, vec![0, 2]);
    }

    #[test]
    fn large_radius_does_not_duplicate() {
        let torus = Topology::new(10.0, 10.0, [true, true]);
        let positions = vec![vec2(1.0, 1.0), vec2(6.0, 6.0)];
        let tree = build(&torus, &positions);
        let found = neighbours_in_range(&tree, &positions, &torus, positions[0], 20.0);
        assert_eq!(found, vec![0, 1]);
    }
}
