//! Bounding Volume Hierarchy over points.

use pbrt_core::geometry::*;
use pbrt_core::pbrt::*;
use pbrt_core::stat_inc;
use order_stat::kth_by;
use shared_arena::{ArenaArc, SharedArena};
use std::cmp::Ordering;

mod common;

pub use common::*;

/// Maximum depth of the traversal stack.
const MAX_TODO: usize = 64;

/// Static Bounding Volume Hierarchy over point-like entries. The hierarchy is
/// built once and is read-only afterwards, so queries are safe from any number
/// of threads.
pub struct PointBVH<T: BVHEntry> {
    /// The entries ordered such that entries in leaf nodes occupy contiguous ranges.
    entries: Vec<T>,

    /// Radius of influence of an entry. Node bounds are padded by it.
    entry_radius: Float,

    /// Maximum number of entries in a leaf node.
    max_entries_per_leaf: usize,

    /// The list of nodes in depth-first order.
    nodes: Vec<LinearBVHNode>,
}

impl<T: BVHEntry> PointBVH<T> {
    /// Create a new point BVH. Entries are recursively partitioned at the
    /// median along the axis of largest extent until a leaf holds at most
    /// `max_entries_per_leaf` entries.
    ///
    /// * `entries`              - The entries.
    /// * `entry_radius`         - Radius of influence of an entry.
    /// * `max_entries_per_leaf` - Maximum number of entries in a leaf node.
    pub fn new(entries: Vec<T>, entry_radius: Float, max_entries_per_leaf: usize) -> Self {
        register_stats();

        let max_entries_per_leaf = clamp(max_entries_per_leaf, 1, u16::MAX as usize);
        let n_entries = entries.len();
        if n_entries == 0 {
            return Self {
                entries,
                entry_radius,
                max_entries_per_leaf,
                nodes: vec![],
            };
        }

        let positions: Vec<Point3f> = entries.iter().map(|e| e.position()).collect();
        let mut indices: Vec<usize> = (0..n_entries).collect();

        let arena = SharedArena::<BVHBuildNode>::with_capacity(2 * n_entries / max_entries_per_leaf + 1);
        let mut total_nodes = 0;
        let mut ordered = Vec::<usize>::with_capacity(n_entries);
        let root = Self::build(
            &arena,
            &positions,
            &mut indices,
            0,
            n_entries,
            entry_radius,
            max_entries_per_leaf,
            &mut total_nodes,
            &mut ordered,
        );

        let (arena_used, _arena_free) = arena.stats();
        info!(
            "BVH created with {} nodes for {} entries ({:.2} MB), arena allocated {:.2} MB",
            total_nodes,
            n_entries,
            (total_nodes * std::mem::size_of::<LinearBVHNode>()) as f32 / (1024.0 * 1024.0),
            arena_used as f32 / (1024.0 * 1024.0)
        );

        let tree_bytes = total_nodes * std::mem::size_of::<LinearBVHNode>()
            + std::mem::size_of::<Self>()
            + n_entries * std::mem::size_of::<T>();
        stat_inc!(TREE_BYTES, tree_bytes as u64);

        // Compute representation of depth-first traversal of BVH tree.
        let mut nodes = vec![LinearBVHNode::default(); total_nodes];
        let mut offset = 0_u32;
        Self::flatten_bvh_tree(root, &mut nodes, &mut offset);
        debug_assert!(total_nodes == offset as usize);

        // Move the entries into leaf order.
        let mut slots: Vec<Option<T>> = entries.into_iter().map(Some).collect();
        let entries = ordered.iter().filter_map(|&i| slots[i].take()).collect();

        Self {
            entries,
            entry_radius,
            max_entries_per_leaf,
            nodes,
        }
    }

    /// Recursively build the hierarchy for the entries `indices[start..end]`.
    ///
    /// * `arena`                - Arena for build nodes.
    /// * `positions`            - Entry positions indexed by entry.
    /// * `indices`              - Entry indices; partitioned in place.
    /// * `start`                - Starting index.
    /// * `end`                  - Ending index + 1.
    /// * `entry_radius`         - Radius used to pad node bounds.
    /// * `max_entries_per_leaf` - Maximum number of entries in a leaf node.
    /// * `total_nodes`          - Used to return total number of nodes.
    /// * `ordered`              - Used to return the entry indices in leaf order.
    #[allow(clippy::too_many_arguments)]
    fn build(
        arena: &SharedArena<BVHBuildNode>,
        positions: &[Point3f],
        indices: &mut [usize],
        start: usize,
        end: usize,
        entry_radius: Float,
        max_entries_per_leaf: usize,
        total_nodes: &mut usize,
        ordered: &mut Vec<usize>,
    ) -> ArenaArc<BVHBuildNode> {
        *total_nodes += 1;

        let mut centroid_bounds = Bounds3f::empty();
        for &i in indices[start..end].iter() {
            centroid_bounds = centroid_bounds.union(&positions[i]);
        }

        let n = end - start;
        if n <= max_entries_per_leaf {
            let first = ordered.len();
            ordered.extend_from_slice(&indices[start..end]);
            return arena.alloc_arc(BVHBuildNode::new_leaf_node(
                first,
                n,
                centroid_bounds.expand(entry_radius),
            ));
        }

        // Median split along the axis of largest extent.
        let dim = centroid_bounds.maximum_extent();
        let mid = start + n / 2;
        kth_by(&mut indices[start..end], mid - start, |&a, &b| {
            positions[a][dim].partial_cmp(&positions[b][dim]).unwrap_or(Ordering::Equal)
        });

        let c0 = Self::build(
            arena,
            positions,
            indices,
            start,
            mid,
            entry_radius,
            max_entries_per_leaf,
            total_nodes,
            ordered,
        );
        let c1 = Self::build(
            arena,
            positions,
            indices,
            mid,
            end,
            entry_radius,
            max_entries_per_leaf,
            total_nodes,
            ordered,
        );
        arena.alloc_arc(BVHBuildNode::new_interior_node(dim, c0, c1))
    }

    /// Flatten the tree to the linear representation.
    ///
    /// * `node`   - The node.
    /// * `nodes`  - The linear nodes.
    /// * `offset` - Tracks current offset into `nodes`.
    fn flatten_bvh_tree(node: ArenaArc<BVHBuildNode>, nodes: &mut Vec<LinearBVHNode>, offset: &mut u32) -> u32 {
        let my_offset = *offset;
        *offset += 1;

        if node.n_entries > 0 {
            nodes[my_offset as usize] =
                LinearBVHNode::new_leaf_node(node.bounds, node.first_entry_offset as u32, node.n_entries as u16);
        } else {
            if let Some(child) = node.children[0].clone() {
                Self::flatten_bvh_tree(child, nodes, offset);
            }

            if let Some(child) = node.children[1].clone() {
                let second_child_offset = Self::flatten_bvh_tree(child, nodes, offset);
                nodes[my_offset as usize] =
                    LinearBVHNode::new_interior_node(node.bounds, second_child_offset, node.split_axis.into());
            }
        }

        my_offset
    }

    /// Returns the entries in leaf order.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the radius of influence of an entry.
    pub fn entry_radius(&self) -> Float {
        self.entry_radius
    }

    /// Returns the maximum number of entries in a leaf node.
    pub fn max_entries_per_leaf(&self) -> usize {
        self.max_entries_per_leaf
    }

    /// Returns the bounds of all entries padded by the entry radius.
    pub fn world_bound(&self) -> Bounds3f {
        self.nodes.first().map_or_else(Bounds3f::empty, |n| n.bounds)
    }

    /// Returns the nearest entry within `max_distance` of `p` that the
    /// predicate accepts.
    ///
    /// * `p`            - Query point.
    /// * `max_distance` - Maximum distance from `p`.
    /// * `accept`       - Acceptance predicate.
    pub fn get_nearest_entry<F>(&self, p: &Point3f, max_distance: Float, accept: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<&T> = None;
        let mut best_dist2 = max_distance * max_distance;

        let mut to_visit_offset = 0;
        let mut current_node_index = 0;
        let mut nodes_to_visit = [0_usize; MAX_TODO];
        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.distance_squared(p) <= best_dist2 {
                if node.is_leaf() {
                    let first = node.offset as usize;
                    for entry in self.entries[first..first + node.n_entries as usize].iter() {
                        let d2 = entry.position().distance_squared(p);
                        let closer = d2 < best_dist2 || (best.is_none() && d2 <= best_dist2);
                        if closer && accept(entry) {
                            best = Some(entry);
                            best_dist2 = d2;
                        }
                    }
                } else {
                    // Visit the nearer child first.
                    let first_child = current_node_index + 1;
                    let second_child = node.offset as usize;
                    let d0 = self.nodes[first_child].bounds.distance_squared(p);
                    let d1 = self.nodes[second_child].bounds.distance_squared(p);
                    let (near, far) = if d0 <= d1 {
                        (first_child, second_child)
                    } else {
                        (second_child, first_child)
                    };
                    nodes_to_visit[to_visit_offset] = far;
                    to_visit_offset += 1;
                    current_node_index = near;
                    continue;
                }
            }

            if to_visit_offset == 0 {
                break;
            }
            to_visit_offset -= 1;
            current_node_index = nodes_to_visit[to_visit_offset];
        }

        best
    }

    /// Returns every entry within `radius` of `p` that the predicate accepts.
    ///
    /// * `p`      - Query point.
    /// * `radius` - Query radius.
    /// * `accept` - Acceptance predicate.
    pub fn get_all_near_entries<F>(&self, p: &Point3f, radius: Float, accept: F) -> Vec<&T>
    where
        F: Fn(&T) -> bool,
    {
        let mut result = vec![];
        if self.nodes.is_empty() {
            return result;
        }

        let radius2 = radius * radius;
        let mut to_visit_offset = 0;
        let mut current_node_index = 0;
        let mut nodes_to_visit = [0_usize; MAX_TODO];
        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.distance_squared(p) <= radius2 {
                if node.is_leaf() {
                    let first = node.offset as usize;
                    for entry in self.entries[first..first + node.n_entries as usize].iter() {
                        if entry.position().distance_squared(p) <= radius2 && accept(entry) {
                            result.push(entry);
                        }
                    }
                } else {
                    nodes_to_visit[to_visit_offset] = node.offset as usize;
                    to_visit_offset += 1;
                    current_node_index += 1;
                    continue;
                }
            }

            if to_visit_offset == 0 {
                break;
            }
            to_visit_offset -= 1;
            current_node_index = nodes_to_visit[to_visit_offset];
        }

        result
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
