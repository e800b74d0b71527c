//! Point quadtree rebuilt from scratch every tick.
//!
//! Nodes hold up to `capacity` entries before splitting into four quadrants. Colocated points
//! can never be separated by splitting, so subdivision stops at [`MAX_DEPTH`] and the node at
//! that depth keeps every further point in its own bucket.

use crate::geometry::{Rect, Vec2};
use std::num::NonZeroUsize;

/// Deepest level a node may be created at.
pub const MAX_DEPTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: usize,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct Quadtree {
    boundary: Rect,
    capacity: usize,
    depth: usize,
    entries: Vec<Entry>,
    children: Option<Box<[Quadtree; 4]>>,
}

impl Quadtree {
    /// Empty tree over `boundary`. Configured capacities go through
    /// [`WorldConfig::index_capacity`](crate::config::WorldConfig::index_capacity), which rejects 0.
    pub fn new(boundary: Rect, capacity: NonZeroUsize) -> Self {
        Self::with_depth(boundary, capacity.get(), 0)
    }

    fn with_depth(boundary: Rect, capacity: usize, depth: usize) -> Self {
        Self {
            boundary,
            capacity,
            depth,
            entries: Vec::with_capacity(capacity),
            children: None,
        }
    }

    /// Build a tree over `boundary` from positions in order. Returns the tree and the indices
    /// that fell outside the boundary.
    pub fn build(boundary: Rect, capacity: NonZeroUsize, positions: impl IntoIterator<Item = Vec2>) -> (Self, Vec<usize>) {
        let mut tree = Self::new(boundary, capacity);
        let mut rejected = Vec::new();
        for (index, position) in positions.into_iter().enumerate() {
            if !tree.insert(index, position) {
                rejected.push(index);
            }
        }
        (tree, rejected)
    }

    pub fn boundary(&self) -> &Rect { &self.boundary }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn is_divided(&self) -> bool { self.children.is_some() }

    /// Insert a point. Fails only when `position` is outside this node's boundary.
    pub fn insert(&mut self, index: usize, position: Vec2) -> bool {
        if !self.boundary.contains(position) {
            return false;
        }

        if self.entries.len() < self.capacity || self.depth >= MAX_DEPTH {
            self.entries.push(Entry { index, position });
            return true;
        }

        if self.children.is_none() {
            self.subdivide();
        }

        match self.children.as_deref_mut() {
            Some(children) => children.iter_mut().any(|child| child.insert(index, position)),
            None => false,
        }
    }

    fn subdivide(&mut self) {
        let depth = self.depth + 1;
        let cap = self.capacity;
        let [nw, ne, sw, se] = self.boundary.quadrants();
        self.children = Some(Box::new([
            Quadtree::with_depth(nw, cap, depth),
            Quadtree::with_depth(ne, cap, depth),
            Quadtree::with_depth(sw, cap, depth),
            Quadtree::with_depth(se, cap, depth),
        ]));
    }

    /// Indices of all points inside `range`.
    pub fn query(&self, range: &Rect) -> Vec<usize> {
        let mut found = Vec::new();
        self.query_into(range, &mut found);
        found
    }

    /// Appends to `found` rather than allocating; used by the neighbour search for its nine
    /// image queries.
    pub fn query_into(&self, range: &Rect, found: &mut Vec<usize>) {
        if !self.boundary.intersects(range) {
            return;
        }
        found.extend(
            self.entries
                .iter()
                .filter(|e| range.contains(e.position))
                .map(|e| e.index),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_into(range, found);
            }
        }
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.entries.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(Quadtree::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Levels below and including this node.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(Quadtree::depth).max().unwrap_or(0))
    }

    /// Largest bucket in the tree; exceeds `capacity` only in depth-bounded overflow nodes.
    pub fn largest_bucket(&self) -> usize {
        let own = self.entries.len();
        self.children
            .as_ref()
            .map_or(own, |c| c.iter().map(Quadtree::largest_bucket).fold(own, usize::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vec2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero capacity")
    }

    fn world() -> Rect {
        Rect::new(50.0, 50.0, 100.0, 100.0)
    }

    #[test]
    fn rejects_points_outside_boundary() {
        let mut tree = Quadtree::new(world(), cap(3));
        assert!(!tree.insert(0, vec2(-0.5, 10.0)));
        assert!(!tree.insert(1, vec2(10.0, 100.5)));
        assert!(tree.insert(2, vec2(100.0, 100.0)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn splits_only_when_full() {
        let mut tree = Quadtree::new(world(), cap(2));
        tree.insert(0, vec2(10.0, 10.0));
        tree.insert(1, vec2(90.0, 10.0));
        assert!(!tree.is_divided());
        tree.insert(2, vec2(10.0, 90.0));
        assert!(tree.is_divided());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn full_range_returns_every_point_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let points: Vec<_> = (0..500)
            .map(|_| vec2(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        for capacity in [1, 3, 16] {
            let (tree, rejected) = Quadtree::build(world(), cap(capacity), points.iter().copied());
            assert!(rejected.is_empty());
            let mut found = tree.query(&world());
            found.sort_unstable();
            assert_eq!(found, (0..500).collect::<Vec<_>>());
        }
    }

    #[test]
    fn range_query_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let points: Vec<_> = (0..300)
            .map(|_| vec2(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        let (tree, _) = Quadtree::build(world(), cap(3), points.iter().copied());
        let range = Rect::new(30.0, 60.0, 25.0, 40.0);
        let mut found = tree.query(&range);
        found.sort_unstable();
        let expected: Vec<_> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| range.contains(**p))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn colocated_points_hit_depth_bound_instead_of_recursing() {
        let points = vec![vec2(25.0, 25.0); 200];
        let (tree, rejected) = Quadtree::build(world(), cap(3), points);
        assert!(rejected.is_empty());
        assert_eq!(tree.len(), 200);
        assert!(tree.depth() <= MAX_DEPTH + 1);
        assert!(tree.largest_bucket() > 3);
        assert_eq!(tree.query(&Rect::new(25.0, 25.0, 1.0, 1.0)).len(), 200);
    }

    #[test]
    fn disjoint_range_returns_nothing() {
        let (tree, _) = Quadtree::build(world(), cap(3), vec![vec2(10.0, 10.0), vec2(20.0, 20.0)]);
        assert!(tree.query(&Rect::new(500.0, 500.0, 10.0, 10.0)).is_empty());
    }
}
