//! # Bounding Volume Hierarchy
//!
//! Rebuilt from scratch every tick: bulk median-split build over the
//! current AABBs, stack-based overlap query. Leaves store entity ids in
//! a parallel array, so queries return ids directly with no reverse
//! lookup.

use crate::math::Aabb;

const LEAF_SIZE: usize = 2;
const NO_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    /// Child indices, `NO_CHILD` for leaves.
    left: u32,
    right: u32,
    /// Leaf primitive range into `prims`.
    first: u32,
    count: u32,
}

/// A transient BVH over `(entity id, AABB)` pairs.
///
/// Owned by the tick that built it; never incrementally updated.
#[derive(Debug, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
    /// Primitives reordered during the build; ids ride along with their
    /// bounds so leaf hits map straight back to entities.
    prims: Vec<(u32, Aabb)>,
}

impl Bvh {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed primitives.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.prims.len()
    }

    /// True if nothing is indexed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    /// Rebuilds the hierarchy over the given primitives.
    ///
    /// Median split on the wider centroid axis, O(n log n).
    pub fn build(&mut self, items: &[(u32, Aabb)]) {
        self.nodes.clear();
        self.prims.clear();
        self.prims.extend_from_slice(items);
        if self.prims.is_empty() {
            return;
        }
        let count = self.prims.len();
        self.build_node(0, count);
    }

    /// Builds the subtree over `prims[first..first + count]`, returning
    /// the node index.
    fn build_node(&mut self, first: usize, count: usize) -> u32 {
        let mut bounds = self.prims[first].1;
        for &(_, aabb) in &self.prims[first + 1..first + count] {
            bounds = bounds.union(&aabb);
        }

        let node_index = self.nodes.len() as u32;
        self.nodes.push(Node {
            bounds,
            left: NO_CHILD,
            right: NO_CHILD,
            first: first as u32,
            count: count as u32,
        });

        if count <= LEAF_SIZE {
            return node_index;
        }

        // Split at the median centroid along the wider axis.
        let extent = bounds.max - bounds.min;
        let split_x = extent.x >= extent.y;
        let mid = count / 2;
        self.prims[first..first + count].select_nth_unstable_by(mid, |a, b| {
            let (ca, cb) = (a.1.center(), b.1.center());
            if split_x {
                ca.x.total_cmp(&cb.x)
            } else {
                ca.y.total_cmp(&cb.y)
            }
        });

        let left = self.build_node(first, mid);
        let right = self.build_node(first + mid, count - mid);
        let node = &mut self.nodes[node_index as usize];
        node.left = left;
        node.right = right;
        node.count = 0;
        node_index
    }

    /// Collects ids of all primitives whose AABB overlaps `query` into
    /// `out`. `out` is cleared first. O(log n + k) for k hits.
    pub fn query(&self, query: &Aabb, out: &mut Vec<u32>) {
        out.clear();
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !query.intersects(&node.bounds) {
                continue;
            }
            if node.left == NO_CHILD {
                let first = node.first as usize;
                for &(id, aabb) in &self.prims[first..first + node.count as usize] {
                    if query.intersects(&aabb) {
                        out.push(id);
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    fn unit_box(x: f32, y: f32) -> Aabb {
        Aabb::from_center(Vec2::new(x, y), Vec2::new(0.5, 0.5))
    }

    #[test]
    fn empty_bvh_returns_nothing() {
        let mut bvh = Bvh::new();
        bvh.build(&[]);
        let mut hits = Vec::new();
        bvh.query(&unit_box(0.0, 0.0), &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn query_finds_exactly_the_overlapping_boxes() {
        let mut bvh = Bvh::new();
        let items: Vec<(u32, Aabb)> = (0..32)
            .map(|i| (i, unit_box(i as f32 * 3.0, 0.0)))
            .collect();
        bvh.build(&items);

        let mut hits = Vec::new();
        bvh.query(&unit_box(9.0, 0.0), &mut hits);
        assert_eq!(hits, vec![3]);

        // A wide query spanning several cells.
        bvh.query(
            &Aabb::new(Vec2::new(-0.4, -0.4), Vec2::new(6.4, 0.4)),
            &mut hits,
        );
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn query_matches_brute_force() {
        let mut bvh = Bvh::new();
        // Deterministic scattered layout, including overlapping boxes.
        let items: Vec<(u32, Aabb)> = (0..100)
            .map(|i| {
                let x = ((i * 37) % 50) as f32 * 0.7;
                let y = ((i * 61) % 40) as f32 * 0.9;
                (i, unit_box(x, y))
            })
            .collect();
        bvh.build(&items);

        let probe = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(15.0, 12.0));
        let mut hits = Vec::new();
        bvh.query(&probe, &mut hits);
        hits.sort_unstable();

        let mut expected: Vec<u32> = items
            .iter()
            .filter(|(_, aabb)| probe.intersects(aabb))
            .map(|&(id, _)| id)
            .collect();
        expected.sort_unstable();
        assert_eq!(hits, expected);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut bvh = Bvh::new();
        bvh.build(&[(1, unit_box(0.0, 0.0))]);
        bvh.build(&[(2, unit_box(10.0, 0.0))]);

        let mut hits = Vec::new();
        bvh.query(&unit_box(0.0, 0.0), &mut hits);
        assert!(hits.is_empty());
        bvh.query(&unit_box(10.0, 0.0), &mut hits);
        assert_eq!(hits, vec![2]);
    }
}
