// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::broad::dynamic_tree::{DynamicTree, ProxyId};
use crate::broad::ray::RayCastInput;
use crate::math::Vect;
use crate::types::aabb::Aabb;

/// Unordered proxy pair, canonicalized so `proxy_a < proxy_b`.
///
/// The derived ordering is lexicographic on `(proxy_a, proxy_b)`, which is
/// what the pair buffer sorts by to expose duplicates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    /// Smaller proxy id.
    pub proxy_a: ProxyId,
    /// Larger proxy id.
    pub proxy_b: ProxyId,
}

impl Pair {
    /// Builds the canonical pair for two distinct proxies.
    #[must_use]
    pub fn new(a: ProxyId, b: ProxyId) -> Self {
        Self {
            proxy_a: a.min(b),
            proxy_b: a.max(b),
        }
    }
}

/// Entry in the move buffer.
///
/// A proxy removed while it still has a pending move is tombstoned instead of
/// being dropped from the buffer, so the next update never queries a freed id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveEntry {
    /// Proxy whose fat AABB changed since the last update.
    Active(ProxyId),
    /// Slot of a proxy that was removed before the update ran.
    Removed,
}

/// Broad phase built on a [`DynamicTree`].
///
/// Computes candidate pairs and answers volume queries and ray casts. Pairs
/// are not persisted: [`BroadPhase::update_pairs`] reports potentially new
/// pairs for the proxies that moved, and the client tracks overlap from there.
#[derive(Debug, Clone)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    move_buffer: Vec<MoveEntry>,
    pair_buffer: Vec<Pair>,
    proxy_count: usize,
}

impl<T> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BroadPhase<T> {
    /// Creates an empty broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::with_capacity(16),
            pair_buffer: Vec::with_capacity(16),
            proxy_count: 0,
        }
    }

    /// Number of live proxies.
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Creates a proxy with an initial AABB. Its pairs are not reported until
    /// the next [`BroadPhase::update_pairs`].
    pub fn add_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId {
        let id = self.tree.add_proxy(aabb, user_data);
        self.proxy_count += 1;
        self.buffer_move(id);
        id
    }

    /// Destroys a proxy and returns its payload. Removing pairs that involve
    /// it is up to the client.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    pub fn remove_proxy(&mut self, id: ProxyId) -> T {
        self.unbuffer_move(id);
        self.proxy_count -= 1;
        self.tree.remove_proxy(id)
    }

    /// Moves a proxy; it is buffered for the next update only when the tree
    /// had to reinsert it.
    ///
    /// # Panics
    /// Panics if `id` is not a live proxy.
    pub fn move_proxy(&mut self, id: ProxyId, aabb: Aabb, displacement: Vect) {
        if self.tree.move_proxy(id, aabb, displacement) {
            self.buffer_move(id);
        }
    }

    /// Forces `id` to be re-queried on the next update.
    pub fn touch_proxy(&mut self, id: ProxyId) {
        self.buffer_move(id);
    }

    /// Fat AABB of a proxy.
    #[must_use]
    pub fn fat_aabb(&self, id: ProxyId) -> Aabb {
        self.tree.fat_aabb(id)
    }

    /// Payload of a proxy.
    #[must_use]
    pub fn user_data(&self, id: ProxyId) -> &T {
        self.tree.user_data(id)
    }

    /// Tests overlap of the fat AABBs of two proxies.
    #[must_use]
    pub fn test_overlap(&self, a: ProxyId, b: ProxyId) -> bool {
        self.tree.fat_aabb(a).overlaps(&self.tree.fat_aabb(b))
    }

    /// Entries waiting for the next update (tombstones included).
    #[must_use]
    pub fn pending_moves(&self) -> &[MoveEntry] {
        &self.move_buffer
    }

    /// Reports every overlapping pair that involves a moved proxy.
    ///
    /// Each distinct pair reaches `callback` exactly once, in ascending
    /// canonical order, even when both of its proxies moved. This only ever
    /// adds pairs.
    pub fn update_pairs<F>(&mut self, mut callback: F)
    where
        F: FnMut(&T, &T),
    {
        self.pair_buffer.clear();

        // Query the tree with each moved proxy's fat AABB so that pairs which
        // may touch later are not missed.
        let tree = &self.tree;
        let pairs = &mut self.pair_buffer;
        for entry in &self.move_buffer {
            let MoveEntry::Active(query_id) = *entry else {
                continue;
            };
            let fat = tree.fat_aabb(query_id);
            tree.query(&fat, |other| {
                // A proxy cannot form a pair with itself.
                if other != query_id {
                    pairs.push(Pair::new(query_id, other));
                }
                true
            });
        }
        self.move_buffer.clear();

        // Sort to bring duplicates next to each other.
        self.pair_buffer.sort_unstable();

        let mut previous: Option<Pair> = None;
        for pair in &self.pair_buffer {
            if previous == Some(*pair) {
                continue;
            }
            previous = Some(*pair);
            callback(
                self.tree.user_data(pair.proxy_a),
                self.tree.user_data(pair.proxy_b),
            );
        }
        self.pair_buffer.clear();
    }

    /// Visits every proxy whose fat AABB overlaps `aabb`; see
    /// [`DynamicTree::query`].
    pub fn query<F>(&self, aabb: &Aabb, callback: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        self.tree.query(aabb, callback);
    }

    /// Casts a segment against the proxies; see [`DynamicTree::ray_cast`].
    pub fn ray_cast<F>(&self, input: &RayCastInput, callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f64,
    {
        self.tree.ray_cast(input, callback);
    }

    /// Height of the embedded tree, by full traversal.
    #[must_use]
    pub fn compute_height(&self) -> usize {
        self.tree.compute_height()
    }

    /// The embedded tree, for diagnostics and debug drawing.
    #[must_use]
    pub fn tree(&self) -> &DynamicTree<T> {
        &self.tree
    }

    fn buffer_move(&mut self, id: ProxyId) {
        self.move_buffer.push(MoveEntry::Active(id));
    }

    fn unbuffer_move(&mut self, id: ProxyId) {
        for entry in &mut self.move_buffer {
            if *entry == MoveEntry::Active(id) {
                *entry = MoveEntry::Removed;
            }
        }
    }
}
