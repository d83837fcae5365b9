// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::fmt;

use thiserror::Error;

use crate::broad::ray::RayCastInput;
use crate::math::Vect;
use crate::types::aabb::Aabb;

/// Margin added on every side of a proxy's true AABB when it is (re)inserted.
pub const AABB_EXTENSION: f64 = 0.1;

/// Scale applied to a proxy's displacement when predicting its fat AABB.
pub const AABB_MULTIPLIER: f64 = 2.0;

/// Stable handle to a proxy stored in a [`DynamicTree`].
///
/// Ids are node-arena indices. They stay valid until the proxy is removed;
/// afterwards the slot may be handed out again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyId(usize);

impl ProxyId {
    /// Raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy#{}", self.0)
    }
}

/// Structural problems reported by [`DynamicTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A child does not point back at the node that owns it.
    #[error("node {node} has a parent link that does not match its owner")]
    ParentMismatch {
        /// Offending node index.
        node: usize,
    },
    /// Stored height differs from `1 + max(child heights)`.
    #[error("node {node} stores height {stored}, expected {expected}")]
    HeightMismatch {
        /// Offending node index.
        node: usize,
        /// Height recorded on the node.
        stored: usize,
        /// Height recomputed from the children.
        expected: usize,
    },
    /// An internal node's AABB does not enclose one of its children.
    #[error("node {node} does not contain the AABB of child {child}")]
    ContainmentViolated {
        /// Internal node index.
        node: usize,
        /// Child that escapes the parent's bounds.
        child: usize,
    },
    /// A freed slot is still linked into the tree.
    #[error("free node {node} is reachable from the root")]
    FreeNodeReachable {
        /// Freed slot index.
        node: usize,
    },
    /// Leaves reachable from the root disagree with the proxy counter.
    #[error("tree holds {found} leaves but tracks {expected} proxies")]
    LeafCountMismatch {
        /// Proxy counter value.
        expected: usize,
        /// Leaves found by traversal.
        found: usize,
    },
    /// Live plus free slots do not account for the whole arena.
    #[error("{reachable} reachable + {free} free nodes != {capacity} slots")]
    NodeLeak {
        /// Nodes reachable from the root.
        reachable: usize,
        /// Entries in the free list.
        free: usize,
        /// Arena length.
        capacity: usize,
    },
}

#[derive(Debug, Clone)]
enum NodeKind<T> {
    Leaf(T),
    Internal { child1: usize, child2: usize },
    Free,
}

#[derive(Debug, Clone)]
struct TreeNode<T> {
    /// Fat AABB for leaves, tight union of the children otherwise.
    aabb: Aabb,
    parent: Option<usize>,
    height: usize,
    kind: NodeKind<T>,
}

/// Read-only view of one live tree node, for debug drawing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodeView {
    /// Node bounds (fat AABB for leaves).
    pub aabb: Aabb,
    /// Height above the leaves (`0` for leaves).
    pub height: usize,
    /// Whether the node carries a proxy.
    pub is_leaf: bool,
}

/// Dynamic AABB tree.
///
/// A binary tree whose leaves are proxies with fat AABBs and whose internal
/// nodes tightly enclose their two children. Leaves are placed with a
/// perimeter cost heuristic and ancestors are rebalanced bottom-up with
/// AVL-style rotations, keeping insert/remove/query near `O(log n)`.
///
/// Fat AABBs absorb small motions: [`DynamicTree::move_proxy`] only
/// restructures when the true AABB escapes the fat one, and the new fat box is
/// stretched along the displacement so fast proxies do not thrash.
#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    free_list: Vec<usize>,
    root: Option<usize>,
    proxy_count: usize,
}

impl<T> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DynamicTree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            free_list: Vec::new(),
            root: None,
            proxy_count: 0,
        }
    }

    /// Number of live proxies.
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Inserts a proxy for `aabb`, fattened by [`AABB_EXTENSION`].
    pub fn add_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId {
        let leaf = self.allocate(TreeNode {
            aabb: aabb.inflate(AABB_EXTENSION),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf(user_data),
        });
        self.insert_leaf(leaf);
        self.proxy_count += 1;
        ProxyId(leaf)
    }

    /// Removes a proxy and returns its payload.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    pub fn remove_proxy(&mut self, id: ProxyId) -> T {
        let leaf = self.leaf_index(id);
        self.remove_leaf(leaf);
        self.proxy_count -= 1;
        match self.free(leaf) {
            NodeKind::Leaf(data) => data,
            // leaf_index guarantees a leaf.
            NodeKind::Internal { .. } | NodeKind::Free => unreachable!("proxy {id} was not a leaf"),
        }
    }

    /// Moves a proxy whose true bounds are now `aabb`.
    ///
    /// Returns `false` without touching the tree when the fat AABB still
    /// contains `aabb`. Otherwise the leaf is reinserted with a fat AABB grown
    /// by [`AABB_EXTENSION`] and stretched by `AABB_MULTIPLIER * displacement`,
    /// and `true` is returned.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    pub fn move_proxy(&mut self, id: ProxyId, aabb: Aabb, displacement: Vect) -> bool {
        let leaf = self.leaf_index(id);
        if self.nodes[leaf].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(leaf);
        self.nodes[leaf].aabb = aabb
            .inflate(AABB_EXTENSION)
            .swept(displacement.scale(AABB_MULTIPLIER));
        self.insert_leaf(leaf);
        true
    }

    /// Fat AABB of a proxy.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    #[must_use]
    pub fn fat_aabb(&self, id: ProxyId) -> Aabb {
        self.nodes[self.leaf_index(id)].aabb
    }

    /// Payload of a proxy.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    #[must_use]
    pub fn user_data(&self, id: ProxyId) -> &T {
        match &self.nodes[self.leaf_index(id)].kind {
            NodeKind::Leaf(data) => data,
            NodeKind::Internal { .. } | NodeKind::Free => unreachable!("proxy {id} was not a leaf"),
        }
    }

    /// Mutable payload of a proxy.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    pub fn user_data_mut(&mut self, id: ProxyId) -> &mut T {
        let leaf = self.leaf_index(id);
        match &mut self.nodes[leaf].kind {
            NodeKind::Leaf(data) => data,
            NodeKind::Internal { .. } | NodeKind::Free => unreachable!("proxy {id} was not a leaf"),
        }
    }

    /// Visits every proxy whose fat AABB overlaps `aabb`.
    ///
    /// The callback returns `true` to keep searching and `false` to stop.
    pub fn query<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf(_) => {
                    if !callback(ProxyId(index)) {
                        return;
                    }
                }
                NodeKind::Internal { child1, child2 } => {
                    stack.push(child1);
                    stack.push(child2);
                }
                NodeKind::Free => {}
            }
        }
    }

    /// Casts a segment against the proxies in the tree.
    ///
    /// Each candidate leaf is handed to `callback` together with the input
    /// clipped to the current max fraction. The callback decides the exact hit
    /// (and any filtering) and returns:
    /// - `0.0` to terminate the cast,
    /// - a negative value to ignore this proxy,
    /// - otherwise the new max fraction, which clips the ray for the remaining
    ///   traversal.
    ///
    /// Cost is roughly `k * log(n)` for `k` candidate hits among `n` proxies.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mut callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f64,
    {
        let Some(root) = self.root else {
            return;
        };
        let mut sub_input = *input;
        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.aabb.ray_cast(&sub_input).is_none() {
                continue;
            }
            match node.kind {
                NodeKind::Leaf(_) => {
                    let value = callback(&sub_input, ProxyId(index));
                    if value == 0.0 {
                        return;
                    }
                    if value > 0.0 {
                        sub_input.max_fraction = value;
                    }
                }
                NodeKind::Internal { child1, child2 } => {
                    stack.push(child1);
                    stack.push(child2);
                }
                NodeKind::Free => {}
            }
        }
    }

    /// Height of the root (`0` for an empty or single-leaf tree). `O(1)`.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Recomputes the tree height by full traversal. `O(n)`, diagnostics only.
    #[must_use]
    pub fn compute_height(&self) -> usize {
        self.root.map_or(0, |root| self.compute_height_from(root))
    }

    /// Iterates over live nodes (internal and leaf) for debug drawing.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView> + '_ {
        self.nodes.iter().filter_map(|node| match node.kind {
            NodeKind::Free => None,
            NodeKind::Leaf(_) => Some(NodeView {
                aabb: node.aabb,
                height: node.height,
                is_leaf: true,
            }),
            NodeKind::Internal { .. } => Some(NodeView {
                aabb: node.aabb,
                height: node.height,
                is_leaf: false,
            }),
        })
    }

    /// Checks parent links, heights, containment and arena accounting.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut reachable = 0;
        let mut leaves = 0;
        if let Some(root) = self.root {
            if self.nodes[root].parent.is_some() {
                return Err(TreeError::ParentMismatch { node: root });
            }
            let mut stack = vec![root];
            while let Some(index) = stack.pop() {
                reachable += 1;
                let node = &self.nodes[index];
                match node.kind {
                    NodeKind::Free => return Err(TreeError::FreeNodeReachable { node: index }),
                    NodeKind::Leaf(_) => {
                        leaves += 1;
                        if node.height != 0 {
                            return Err(TreeError::HeightMismatch {
                                node: index,
                                stored: node.height,
                                expected: 0,
                            });
                        }
                    }
                    NodeKind::Internal { child1, child2 } => {
                        for child in [child1, child2] {
                            if self.nodes[child].parent != Some(index) {
                                return Err(TreeError::ParentMismatch { node: child });
                            }
                            if !node.aabb.contains(&self.nodes[child].aabb) {
                                return Err(TreeError::ContainmentViolated { node: index, child });
                            }
                        }
                        let expected = 1 + self.nodes[child1].height.max(self.nodes[child2].height);
                        if node.height != expected {
                            return Err(TreeError::HeightMismatch {
                                node: index,
                                stored: node.height,
                                expected,
                            });
                        }
                        stack.push(child1);
                        stack.push(child2);
                    }
                }
            }
        }

        if leaves != self.proxy_count {
            return Err(TreeError::LeafCountMismatch {
                expected: self.proxy_count,
                found: leaves,
            });
        }
        if reachable + self.free_list.len() != self.nodes.len() {
            return Err(TreeError::NodeLeak {
                reachable,
                free: self.free_list.len(),
                capacity: self.nodes.len(),
            });
        }
        Ok(())
    }

    fn leaf_index(&self, id: ProxyId) -> usize {
        assert!(
            matches!(self.nodes.get(id.0).map(|n| &n.kind), Some(NodeKind::Leaf(_))),
            "{id} is not a live proxy"
        );
        id.0
    }

    fn allocate(&mut self, node: TreeNode<T>) -> usize {
        if let Some(index) = self.free_list.pop() {
            self.nodes[index] = node;
            index
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn free(&mut self, index: usize) -> NodeKind<T> {
        let node = &mut self.nodes[index];
        node.parent = None;
        node.height = 0;
        self.free_list.push(index);
        core::mem::replace(&mut node.kind, NodeKind::Free)
    }

    fn children(&self, index: usize) -> Option<(usize, usize)> {
        match self.nodes[index].kind {
            NodeKind::Internal { child1, child2 } => Some((child1, child2)),
            NodeKind::Leaf(_) | NodeKind::Free => None,
        }
    }

    fn set_children(&mut self, index: usize, child1: usize, child2: usize) {
        self.nodes[index].kind = NodeKind::Internal { child1, child2 };
    }

    /// Points `parent` (or the root) at `new` where it used to point at `old`.
    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(p) => {
                if let Some((c1, c2)) = self.children(p) {
                    if c1 == old {
                        self.set_children(p, new, c2);
                    } else {
                        self.set_children(p, c1, new);
                    }
                }
            }
            None => self.root = Some(new),
        }
    }

    fn insert_leaf(&mut self, leaf: usize) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        };

        // Find the best sibling for the new leaf.
        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = root;
        while let Some((child1, child2)) = self.children(index) {
            let area = self.nodes[index].aabb.perimeter();
            let combined_area = self.nodes[index].aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the new leaf.
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree.
            let inheritance = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb, inheritance);
            let cost2 = self.descend_cost(child2, &leaf_aabb, inheritance);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }
        let sibling = index;

        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate(TreeNode {
            aabb: leaf_aabb.union(&self.nodes[sibling].aabb),
            parent: old_parent,
            height: self.nodes[sibling].height + 1,
            kind: NodeKind::Internal {
                child1: sibling,
                child2: leaf,
            },
        });
        self.replace_child(old_parent, sibling, new_parent);
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        self.refit_ancestors(Some(new_parent));
    }

    fn descend_cost(&self, child: usize, leaf_aabb: &Aabb, inheritance: f64) -> f64 {
        let node = &self.nodes[child];
        let combined = leaf_aabb.union(&node.aabb).perimeter();
        match node.kind {
            NodeKind::Leaf(_) => combined + inheritance,
            NodeKind::Internal { .. } | NodeKind::Free => {
                (combined - node.aabb.perimeter()) + inheritance
            }
        }
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let grand_parent = self.nodes[parent].parent;
        let sibling = match self.children(parent) {
            Some((c1, c2)) if c1 == leaf => c2,
            Some((c1, _)) => c1,
            None => return,
        };

        self.replace_child(grand_parent, parent, sibling);
        self.nodes[sibling].parent = grand_parent;
        self.free(parent);
        self.nodes[leaf].parent = None;

        self.refit_ancestors(grand_parent);
    }

    /// Walks from `start` to the root, rebalancing and refitting bounds.
    fn refit_ancestors(&mut self, start: Option<usize>) {
        let mut cursor = start;
        while let Some(index) = cursor {
            let index = self.balance(index);
            if let Some((child1, child2)) = self.children(index) {
                self.nodes[index].height =
                    1 + self.nodes[child1].height.max(self.nodes[child2].height);
                self.nodes[index].aabb = self.nodes[child1].aabb.union(&self.nodes[child2].aabb);
            }
            cursor = self.nodes[index].parent;
        }
    }

    /// Rotates `a` if its subtrees differ in height by more than one.
    /// Returns the index of the subtree root after rotation.
    fn balance(&mut self, a: usize) -> usize {
        if self.nodes[a].height < 2 {
            return a;
        }
        let Some((b, c)) = self.children(a) else {
            return a;
        };
        let hb = self.nodes[b].height;
        let hc = self.nodes[c].height;

        if hc > hb + 1 {
            self.rotate_up(a, c, b, true)
        } else if hb > hc + 1 {
            self.rotate_up(a, b, c, false)
        } else {
            a
        }
    }

    /// Promotes `up` (a child of `a`) to `a`'s position. `stay` is `a`'s other
    /// child. `up_is_child2` records which slot of `a` held `up`.
    fn rotate_up(&mut self, a: usize, up: usize, stay: usize, up_is_child2: bool) -> usize {
        let Some((f, g)) = self.children(up) else {
            return a;
        };

        // Swap `a` and `up`.
        let a_parent = self.nodes[a].parent;
        self.nodes[up].parent = a_parent;
        self.nodes[a].parent = Some(up);
        self.replace_child(a_parent, a, up);

        // The taller grandchild stays with `up`; the shorter one moves to `a`.
        let (keep, give) = if self.nodes[f].height > self.nodes[g].height {
            (f, g)
        } else {
            (g, f)
        };
        self.set_children(up, a, keep);
        if up_is_child2 {
            self.set_children(a, stay, give);
        } else {
            self.set_children(a, give, stay);
        }
        self.nodes[give].parent = Some(a);

        self.nodes[a].aabb = self.nodes[stay].aabb.union(&self.nodes[give].aabb);
        self.nodes[a].height = 1 + self.nodes[stay].height.max(self.nodes[give].height);
        self.nodes[up].aabb = self.nodes[a].aabb.union(&self.nodes[keep].aabb);
        self.nodes[up].height = 1 + self.nodes[a].height.max(self.nodes[keep].height);

        up
    }

    fn compute_height_from(&self, index: usize) -> usize {
        match self.children(index) {
            Some((c1, c2)) => 1 + self.compute_height_from(c1).max(self.compute_height_from(c2)),
            None => 0,
        }
    }
}
