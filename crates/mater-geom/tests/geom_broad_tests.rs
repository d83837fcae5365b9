// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Integration tests for the mater-geom broad phase (dynamic tree + pairs).

use mater_geom::{Aabb, BroadPhase, MoveEntry, RayCastInput, Vect};

fn square(x: f64, y: f64) -> Aabb {
    Aabb::from_center_half_extents(Vect::new(x, y), 0.5, 0.5)
}

fn collect_pairs(bp: &mut BroadPhase<u32>) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    bp.update_pairs(|a, b| out.push((*a.min(b), *a.max(b))));
    out
}

#[test]
fn new_proxies_pair_on_next_update_only() {
    let mut bp = BroadPhase::new();
    bp.add_proxy(square(0.0, 0.0), 0);
    bp.add_proxy(square(0.5, 0.0), 1);
    bp.add_proxy(square(50.0, 0.0), 2);
    assert_eq!(bp.proxy_count(), 3);
    assert_eq!(bp.pending_moves().len(), 3);

    assert_eq!(collect_pairs(&mut bp), vec![(0, 1)]);
    // Nothing moved since: no pairs are re-reported.
    assert!(collect_pairs(&mut bp).is_empty());
}

#[test]
fn pair_reported_once_when_both_proxies_moved() {
    let mut bp = BroadPhase::new();
    let a = bp.add_proxy(square(0.0, 0.0), 10);
    let b = bp.add_proxy(square(0.9, 0.0), 20);
    // Extra touches put both proxies in the buffer several times.
    bp.touch_proxy(a);
    bp.touch_proxy(b);
    bp.touch_proxy(a);

    let mut seen = Vec::new();
    bp.update_pairs(|x, y| seen.push((*x, *y)));
    assert_eq!(seen.len(), 1, "pair must be unique, got {seen:?}");
}

#[test]
fn no_self_pairs_even_when_buffered_twice() {
    let mut bp = BroadPhase::new();
    let a = bp.add_proxy(square(0.0, 0.0), 7);
    bp.touch_proxy(a);
    bp.touch_proxy(a);
    assert!(collect_pairs(&mut bp).is_empty());
}

#[test]
fn pairs_arrive_in_canonical_order() {
    let mut bp = BroadPhase::new();
    // Cluster of mutually overlapping proxies inserted in scrambled order.
    let mut proxies = Vec::new();
    for (i, x) in [(3u32, 0.3), (0, 0.0), (2, 0.2), (1, 0.1)] {
        proxies.push((bp.add_proxy(square(x, 0.0), i), i));
    }
    let mut ids = Vec::new();
    bp.update_pairs(|a, b| ids.push((*a, *b)));

    // Every pair once, lower proxy id first, pairs ascending.
    proxies.sort_unstable();
    let mut expected = Vec::new();
    for (k, &(_, a)) in proxies.iter().enumerate() {
        for &(_, b) in &proxies[k + 1..] {
            expected.push((a, b));
        }
    }
    assert_eq!(ids, expected);
}

#[test]
fn removing_a_buffered_proxy_tombstones_its_entry() {
    let mut bp = BroadPhase::new();
    let a = bp.add_proxy(square(0.0, 0.0), 1);
    let b = bp.add_proxy(square(0.5, 0.0), 2);
    assert_eq!(bp.remove_proxy(a), 1);
    assert_eq!(bp.pending_moves(), &[MoveEntry::Removed, MoveEntry::Active(b)]);

    // Reusing the freed slot must not resurrect the tombstone.
    let c = bp.add_proxy(square(30.0, 0.0), 3);
    assert!(collect_pairs(&mut bp).is_empty());
    assert_eq!(bp.proxy_count(), 2);
    assert!(!bp.test_overlap(b, c));
}

#[test]
fn moves_within_fat_bounds_are_not_rebuffered() {
    let mut bp = BroadPhase::new();
    let a = bp.add_proxy(square(0.0, 0.0), 1);
    let _ = collect_pairs(&mut bp);
    let before = bp.fat_aabb(a);
    for step in 0..10u32 {
        let x = f64::from(step) * 0.005;
        bp.move_proxy(a, square(x, 0.0), Vect::new(0.005, 0.0));
        assert!(bp.pending_moves().is_empty());
    }
    assert_eq!(bp.fat_aabb(a), before);

    bp.move_proxy(a, square(2.0, 0.0), Vect::new(2.0, 0.0));
    assert_eq!(bp.pending_moves(), &[MoveEntry::Active(a)]);
}

#[test]
fn query_stops_when_callback_returns_false() {
    let mut bp = BroadPhase::new();
    for i in 0..10u32 {
        bp.add_proxy(square(f64::from(i) * 0.1, 0.0), i);
    }
    let mut visited = 0;
    bp.query(&square(0.0, 0.0), |_| {
        visited += 1;
        false
    });
    assert_eq!(visited, 1);

    let mut all = 0;
    bp.query(&square(0.5, 0.0), |_| {
        all += 1;
        true
    });
    assert_eq!(all, 10);
}

#[test]
fn ray_cast_clips_to_closest_hit() {
    let mut bp = BroadPhase::new();
    let near = bp.add_proxy(square(2.0, 0.0), 0u32);
    bp.add_proxy(square(6.0, 0.0), 1u32);
    bp.add_proxy(square(4.0, 10.0), 2u32);

    let input = RayCastInput::new(Vect::new(0.0, 0.0), Vect::new(10.0, 0.0));
    let mut hits = Vec::new();
    let mut closest = None;
    bp.ray_cast(&input, |sub, id| {
        hits.push(id);
        // Exact hit: entry into the true (unfattened) square.
        let exact = square(if id == near { 2.0 } else { 6.0 }, 0.0);
        match exact.ray_cast(sub) {
            Some(t) => {
                closest = Some((id, t));
                t
            }
            None => -1.0,
        }
    });
    let (id, t) = closest.expect("ray must hit");
    assert_eq!(id, near);
    assert!((t - 0.15).abs() < 1e-12);
    assert!(hits.len() <= 2);
    assert!(hits.contains(&near));
}

#[test]
fn ray_cast_terminates_on_zero() {
    let mut bp = BroadPhase::new();
    for i in 0..5u32 {
        bp.add_proxy(square(f64::from(i) * 2.0 + 1.0, 0.0), i);
    }
    let input = RayCastInput::new(Vect::new(0.0, 0.0), Vect::new(20.0, 0.0));
    let mut calls = 0;
    bp.ray_cast(&input, |_, _| {
        calls += 1;
        0.0
    });
    assert_eq!(calls, 1);
}

#[test]
fn tree_height_tracks_population() {
    let mut bp = BroadPhase::new();
    assert_eq!(bp.compute_height(), 0);
    let ids: Vec<_> = (0..64u32).map(|i| bp.add_proxy(square(f64::from(i) * 3.0, 0.0), i)).collect();
    assert!(bp.compute_height() >= 6);
    for id in ids {
        bp.remove_proxy(id);
    }
    assert_eq!(bp.compute_height(), 0);
    assert_eq!(bp.tree().validate(), Ok(()));
}
