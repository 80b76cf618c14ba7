//! BVH Common

use pbrt_core::geometry::*;
use pbrt_core::pbrt::*;
use pbrt_core::{stat_counter, stat_inc, stat_memory_counter, stat_ratio, stat_register_fns};
use shared_arena::ArenaArc;

stat_memory_counter!("Memory/BVH tree", TREE_BYTES, bvh_stats_tree_bytes);
stat_ratio!(
    "BVH/Entries per leaf node",
    TOTAL_ENTRIES,
    TOTAL_LEAF_NODES,
    bvh_stats_entries_per_leaf_node,
);
stat_counter!("BVH/Interior nodes", INTERIOR_NODES, bvh_stats_interior_nodes);
stat_counter!("BVH/Leaf nodes", LEAF_NODES, bvh_stats_leaf_nodes);

stat_register_fns!(
    bvh_stats_tree_bytes,
    bvh_stats_entries_per_leaf_node,
    bvh_stats_interior_nodes,
    bvh_stats_leaf_nodes,
);

/// A point-like record stored in a `PointBVH`.
pub trait BVHEntry {
    /// Returns the position of the entry.
    fn position(&self) -> Point3f;
}

/// BVHBuildNode represents a node of the Bound Volume Hierarchy.
#[derive(Clone)]
pub struct BVHBuildNode {
    /// Bounding box of all entries beneath this node, padded by the entry radius.
    pub bounds: Bounds3f,

    /// Children of this node.
    pub children: [Option<ArenaArc<BVHBuildNode>>; 2],

    /// Coordinate axis along which entries are partitioned between the two children.
    pub split_axis: Axis,

    /// Index of first entry from `PointBVH::entries` stored at this node.
    pub first_entry_offset: usize,

    /// Number of entries stored at this node starting at `first_entry_offset`.
    pub n_entries: usize,
}

impl BVHBuildNode {
    /// Create a leaf BVH node.
    ///
    /// * `first`  - Index of first entry stored at this node.
    /// * `n`      - Number of entries stored at this node.
    /// * `bounds` - Bounding box.
    pub fn new_leaf_node(first: usize, n: usize, bounds: Bounds3f) -> Self {
        stat_inc!(LEAF_NODES, 1);
        stat_inc!(TOTAL_LEAF_NODES, 1);
        stat_inc!(TOTAL_ENTRIES, n as i64);
        Self {
            first_entry_offset: first,
            n_entries: n,
            bounds,
            children: [None, None],
            split_axis: Axis::default(),
        }
    }

    /// Allocates an interior BVH node.
    ///
    /// * `axis` - Axis used for partitioning children.
    /// * `c0`   - First child.
    /// * `c1`   - Second child.
    pub fn new_interior_node(axis: Axis, c0: ArenaArc<BVHBuildNode>, c1: ArenaArc<BVHBuildNode>) -> Self {
        stat_inc!(INTERIOR_NODES, 1);
        Self {
            first_entry_offset: 0,
            n_entries: 0,
            bounds: c0.bounds.union(&c1.bounds),
            children: [Some(c0), Some(c1)],
            split_axis: axis,
        }
    }
}

/// Stores information needed to traverse the BVH.
#[derive(Copy, Clone, Debug)]
pub struct LinearBVHNode {
    /// Bounding box for the node.
    pub bounds: Bounds3f,

    /// For leaf nodes, offset for the entries in the node. For interior nodes, offset to the second child.
    pub offset: u32,

    /// For leaf nodes, the number of entries in the node. For interior nodes, 0.
    pub n_entries: u16,

    /// For interior nodes, which coordinate axis was used for partitioning.
    pub axis: u8,

    /// Padding used to align everything to 32 byte total size.
    pub pad: u8,
}

impl Default for LinearBVHNode {
    /// Returns the "default value" for `LinearBVHNode`.
    fn default() -> Self {
        Self {
            bounds: Bounds3f::empty(),
            offset: 0,
            n_entries: 0,
            axis: 0,
            pad: 0,
        }
    }
}

impl LinearBVHNode {
    /// Creates a leaf linear bvh node.
    ///
    /// * `bounds`    - Bounding box for the node.
    /// * `offset`    - Offset for entries in the node.
    /// * `n_entries` - Number of entries in the node.
    pub fn new_leaf_node(bounds: Bounds3f, offset: u32, n_entries: u16) -> Self {
        Self {
            bounds,
            offset,
            n_entries,
            axis: 0,
            pad: 0,
        }
    }

    /// Creates an interior linear bvh node.
    ///
    /// * `bounds` - Bounding box for the node.
    /// * `offset` - Offset to the second child.
    /// * `axis`   - Axis used for partitioning.
    pub fn new_interior_node(bounds: Bounds3f, offset: u32, axis: u8) -> Self {
        Self {
            bounds,
            offset,
            axis,
            n_entries: 0,
            pad: 0,
        }
    }

    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        self.n_entries > 0
    }
}
