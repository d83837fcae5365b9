// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bridges broad-phase pairs to persistent arbiters.
//!
//! Arbiters live in an arena of reusable slots and are threaded into a
//! doubly linked list (newest first) so creation and retirement are `O(1)`.
//! A hash index maps canonical shape pairs to slots.
//!
//! Pairs whose fat bounds still overlap but which have no arbiter (rejected
//! by the filter, or separated) are remembered until the fat bounds part, so
//! the filter runs once per encounter and a separated pair can regain an
//! arbiter without being reported by the broad phase again.

use mater_geom::BroadPhase;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::arbiter::{Arbiter, ArbiterId};
use crate::body::{Body, BodyId, BodySet};
use crate::narrow_phase::{ManifoldPoint, NarrowPhase};
use crate::shape::{Shape, ShapeId};

/// Pair filter consulted once when a broad-phase pair is first seen.
pub type ShouldCollide = Box<dyn FnMut(&Shape, &Shape) -> bool>;

/// Notification invoked once per step for every live arbiter.
pub type OnCollision = Box<dyn FnMut(&Arbiter)>;

/// A nearby pair without an arbiter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Proximity {
    /// The filter refused the pair.
    Rejected,
    /// Accepted, but the shapes are not touching.
    Separated,
}

/// Owns the live arbiters.
#[derive(Debug, Default)]
pub struct ContactManager {
    arbiters: Vec<Option<Arbiter>>,
    free: Vec<usize>,
    head: Option<ArbiterId>,
    index: FxHashMap<(ShapeId, ShapeId), ArbiterId>,
    nearby: FxHashMap<(ShapeId, ShapeId), Proximity>,
}

impl ContactManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live arbiters.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no arbiter is live.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Arbiter in slot `id`, if live.
    pub fn get(&self, id: ArbiterId) -> Option<&Arbiter> {
        self.arbiters.get(id.0).and_then(Option::as_ref)
    }

    /// Arbiter for the pair `(a, b)` in either order.
    pub fn find(&self, a: ShapeId, b: ShapeId) -> Option<&Arbiter> {
        self.index.get(&canonical(a, b)).and_then(|id| self.get(*id))
    }

    /// Walks the list from the most recently created arbiter.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            manager: self,
            cursor: self.head,
        }
    }

    /// Creates arbiters for newly reported broad-phase pairs.
    ///
    /// A pair gets an arbiter when none exists yet, its shapes belong to
    /// different bodies, at least one body is dynamic, and `filter` (if any)
    /// accepts it.
    pub(crate) fn find_new_contacts(
        &mut self,
        broad_phase: &mut BroadPhase<ShapeId>,
        bodies: &BodySet,
        mut filter: Option<&mut ShouldCollide>,
    ) {
        broad_phase.update_pairs(|&id_a, &id_b| {
            if id_a.body == id_b.body {
                return;
            }
            let key = canonical(id_a, id_b);
            if self.index.contains_key(&key) || self.nearby.contains_key(&key) {
                return;
            }
            let (Some(body_a), Some(body_b)) = (bodies.get(key.0.body), bodies.get(key.1.body))
            else {
                return;
            };
            if body_a.is_static() && body_b.is_static() {
                return;
            }
            let (Some(shape_a), Some(shape_b)) = (bodies.shape(key.0), bodies.shape(key.1)) else {
                return;
            };
            if let Some(filter) = filter.as_deref_mut() {
                if !filter(shape_a, shape_b) {
                    self.nearby.insert(key, Proximity::Rejected);
                    trace!(a = %key.0, b = %key.1, "pair rejected by filter");
                    return;
                }
            }
            let id = self.link(Arbiter::new(key.0, shape_a, key.1, shape_b));
            self.index.insert(key, id);
            debug!(a = %key.0, b = %key.1, "arbiter created");
        });
    }

    /// Refreshes every manifold, retiring arbiters whose shapes separated.
    ///
    /// Nearby pairs are checked first: entries whose fat bounds no longer
    /// overlap are forgotten, and separated pairs that touch again get a
    /// fresh arbiter. A retired arbiter's pair is remembered as separated.
    pub(crate) fn collide(
        &mut self,
        bodies: &BodySet,
        broad_phase: &BroadPhase<ShapeId>,
        narrow_phase: &dyn NarrowPhase,
        mut on_collision: Option<&mut OnCollision>,
    ) {
        self.revisit_nearby(bodies, broad_phase, narrow_phase);

        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(arb) = self.arbiters[id.0].as_mut() else {
                break;
            };
            cursor = arb.next;

            let points = manifold(bodies, narrow_phase, arb.shape_a(), arb.shape_b());
            if points.is_empty() {
                let Some(arb) = self.retire(id) else {
                    continue;
                };
                self.nearby
                    .insert((arb.shape_a(), arb.shape_b()), Proximity::Separated);
                trace!(a = %arb.shape_a(), b = %arb.shape_b(), "arbiter separated");
                continue;
            }

            arb.update(&points);
            if let Some(callback) = on_collision.as_deref_mut() {
                callback(&*arb);
            }
        }
    }

    /// Drops nearby pairs whose fat bounds parted and re-arms separated pairs
    /// that touch again. Visits pairs in ascending order.
    fn revisit_nearby(
        &mut self,
        bodies: &BodySet,
        broad_phase: &BroadPhase<ShapeId>,
        narrow_phase: &dyn NarrowPhase,
    ) {
        let mut keys: Vec<(ShapeId, ShapeId)> = self.nearby.keys().copied().collect();
        keys.sort_unstable();
        for key in keys {
            let (Some(shape_a), Some(shape_b)) = (bodies.shape(key.0), bodies.shape(key.1)) else {
                self.nearby.remove(&key);
                continue;
            };
            let still_near = match (shape_a.proxy(), shape_b.proxy()) {
                (Some(pa), Some(pb)) => broad_phase.test_overlap(pa, pb),
                _ => false,
            };
            if !still_near {
                self.nearby.remove(&key);
                continue;
            }
            if self.nearby.get(&key) != Some(&Proximity::Separated)
                || manifold(bodies, narrow_phase, key.0, key.1).is_empty()
            {
                continue;
            }
            self.nearby.remove(&key);
            let id = self.link(Arbiter::new(key.0, shape_a, key.1, shape_b));
            self.index.insert(key, id);
            debug!(a = %key.0, b = %key.1, "arbiter created");
        }
    }

    /// Retires every arbiter that touches `body`.
    pub(crate) fn remove_body(&mut self, body: BodyId) {
        let doomed: Vec<ArbiterId> = self
            .iter_ids()
            .filter(|id| {
                self.get(*id)
                    .is_some_and(|arb| arb.body_a() == body || arb.body_b() == body)
            })
            .collect();
        for arb in doomed.into_iter().filter_map(|id| self.retire(id)) {
            debug!(a = %arb.shape_a(), b = %arb.shape_b(), "arbiter retired with body");
        }
        self.nearby.retain(|key, _| key.0.body != body && key.1.body != body);
    }

    /// Calls `f` with each non-sensor arbiter and its two bodies, in list order.
    pub(crate) fn for_each_solvable<F>(&mut self, bodies: &mut BodySet, mut f: F)
    where
        F: FnMut(&mut Arbiter, &mut Body, &mut Body),
    {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(arb) = self.arbiters[id.0].as_mut() else {
                break;
            };
            cursor = arb.next;
            if arb.is_sensor() {
                continue;
            }
            if let Some((a, b)) = bodies.pair_mut(arb.body_a(), arb.body_b()) {
                f(arb, a, b);
            }
        }
    }

    fn iter_ids(&self) -> impl Iterator<Item = ArbiterId> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.get(id).and_then(|arb| arb.next);
            Some(id)
        })
    }

    /// Stores `arb` and links it at the head of the list.
    fn link(&mut self, mut arb: Arbiter) -> ArbiterId {
        arb.prev = None;
        arb.next = self.head;
        let id = match self.free.pop() {
            Some(slot) => {
                self.arbiters[slot] = Some(arb);
                ArbiterId(slot)
            }
            None => {
                self.arbiters.push(Some(arb));
                ArbiterId(self.arbiters.len() - 1)
            }
        };
        if let Some(old_head) = self.head {
            if let Some(next) = self.arbiters[old_head.0].as_mut() {
                next.prev = Some(id);
            }
        }
        self.head = Some(id);
        id
    }

    /// Unlinks and frees slot `id`, returning its arbiter.
    fn retire(&mut self, id: ArbiterId) -> Option<Arbiter> {
        let arb = self.arbiters.get_mut(id.0)?.take()?;
        match arb.prev {
            Some(prev) => {
                if let Some(p) = self.arbiters[prev.0].as_mut() {
                    p.next = arb.next;
                }
            }
            None => self.head = arb.next,
        }
        if let Some(next) = arb.next {
            if let Some(n) = self.arbiters[next.0].as_mut() {
                n.prev = arb.prev;
            }
        }
        self.index.remove(&(arb.shape_a(), arb.shape_b()));
        self.free.push(id.0);
        Some(arb)
    }
}

/// Current contacts of a pair; empty when either shape is gone.
fn manifold(
    bodies: &BodySet,
    narrow_phase: &dyn NarrowPhase,
    a: ShapeId,
    b: ShapeId,
) -> Vec<ManifoldPoint> {
    match (
        bodies.get(a.body),
        bodies.get(b.body),
        bodies.shape(a),
        bodies.shape(b),
    ) {
        (Some(body_a), Some(body_b), Some(shape_a), Some(shape_b)) => {
            narrow_phase.collide(shape_a, body_a.transform(), shape_b, body_b.transform())
        }
        _ => Vec::new(),
    }
}

fn canonical(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Iterator over live arbiters, newest first.
#[derive(Debug)]
pub struct Iter<'a> {
    manager: &'a ContactManager,
    cursor: Option<ArbiterId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arbiter;

    fn next(&mut self) -> Option<Self::Item> {
        let arb = self.manager.get(self.cursor?)?;
        self.cursor = arb.next;
        Some(arb)
    }
}
