// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end behaviour of `Space::step`.

use std::cell::Cell;
use std::rc::Rc;

use mater_core::{moment_for_circle, Body, BodyId, Settings, Shape, Space, SpaceError};
use mater_geom::{Aabb, RayCastInput, Vect};

const DT: f64 = 1.0 / 60.0;

fn ball(space: &mut Space, position: Vect, velocity: Vect, shape: Shape) -> BodyId {
    let mut body = Body::new_dynamic(1.0, moment_for_circle(1.0, 0.0, 0.5, Vect::ZERO))
        .expect("valid mass")
        .at(position, 0.0)
        .with_shape(shape);
    body.velocity = velocity;
    space.add_body(body)
}

fn circle() -> Shape {
    Shape::circle(0.5, Vect::ZERO)
}

fn ground(space: &mut Space) -> BodyId {
    space.add_body(
        Body::new_static().with_shape(Shape::segment(Vect::new(-10.0, 0.0), Vect::new(10.0, 0.0), 0.0)),
    )
}

#[test]
fn non_positive_dt_is_a_no_op() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    let id = ball(&mut space, Vect::new(0.0, 5.0), Vect::new(1.0, 0.0), circle());
    let before = space.body(id).expect("body").clone();

    space.step(0.0);
    space.step(-DT);
    assert_eq!(space.body(id).expect("body"), &before);
    assert_eq!(space.prev_dt(), 0.0);

    space.enabled = false;
    space.step(DT);
    assert_eq!(space.body(id).expect("body"), &before);
}

#[test]
fn free_fall_integrates_gravity_then_position() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    let id = ball(&mut space, Vect::ZERO, Vect::ZERO, circle());
    space.step(0.1);
    let body = space.body(id).expect("body");
    // Semi-implicit Euler: velocity first, then position with the new velocity.
    assert!((body.velocity.y + 1.0).abs() < 1e-12);
    assert!((body.position().y + 0.1).abs() < 1e-12);
    assert_eq!(space.prev_dt(), 0.1);
}

#[test]
fn forces_are_cleared_unless_disabled() {
    let mut space = Space::new();
    let id = ball(&mut space, Vect::ZERO, Vect::ZERO, circle());
    space.body_mut(id).expect("body").apply_force(Vect::new(6.0, 0.0));
    space.step(0.5);
    let body = space.body(id).expect("body");
    assert!((body.velocity.x - 3.0).abs() < 1e-12);
    assert_eq!(body.force(), Vect::ZERO);

    let mut keep = Space::with_settings(Settings {
        auto_clear_forces: false,
        ..Settings::default()
    });
    let id = ball(&mut keep, Vect::ZERO, Vect::ZERO, circle());
    keep.body_mut(id).expect("body").apply_force(Vect::new(6.0, 0.0));
    keep.step(0.5);
    keep.step(0.5);
    assert!((keep.body(id).expect("body").velocity.x - 6.0).abs() < 1e-12);
}

#[test]
fn ignore_gravity_opts_out() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    let id = ball(&mut space, Vect::ZERO, Vect::ZERO, circle());
    space.body_mut(id).expect("body").ignore_gravity = true;
    for _ in 0..10 {
        space.step(DT);
    }
    assert_eq!(space.body(id).expect("body").position(), Vect::ZERO);
}

#[test]
fn head_on_collision_conserves_momentum_and_separates() {
    let mut space = Space::new();
    let a = ball(&mut space, Vect::new(-1.0, 0.0), Vect::new(1.0, 0.0), circle().with_restitution(1.0));
    let b = ball(&mut space, Vect::new(1.0, 0.0), Vect::new(-1.0, 0.0), circle().with_restitution(1.0));

    let mut collided = false;
    for _ in 0..120 {
        space.step(DT);
        collided |= space.arbiters().next().is_some();
        let va = space.body(a).expect("a").velocity;
        let vb = space.body(b).expect("b").velocity;
        assert!((va + vb).length() < 1e-9, "momentum drifted: {va:?} + {vb:?}");
    }
    assert!(collided);

    let a = space.body(a).expect("a");
    let b = space.body(b).expect("b");
    assert!(a.velocity.x < 0.0);
    assert!(b.velocity.x > 0.0);
    assert!(b.position().x - a.position().x > 1.0);
    assert_eq!(space.arbiters().count(), 0);
}

#[test]
fn resting_circle_settles_within_slop() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    let slop = space.settings.collision_slop;
    ground(&mut space);
    let id = ball(&mut space, Vect::new(0.0, 0.5), Vect::ZERO, circle());

    let penetration = |space: &Space| 0.5 - space.body(id).expect("ball").position().y;
    for _ in 0..300 {
        space.step(DT);
    }
    let settled = penetration(&space);
    for _ in 0..300 {
        space.step(DT);
    }
    let later = penetration(&space);

    assert!(settled <= slop + 1e-3, "penetration {settled} exceeds slop {slop}");
    assert!(later <= settled + 1e-6, "penetration grew from {settled} to {later}");
    assert!(space.body(id).expect("ball").velocity.length() < 1e-6);
    assert_eq!(space.arbiters().count(), 1);
}

#[test]
fn deep_overlap_is_pushed_out_by_bias_not_velocity() {
    let mut space = Space::new();
    ground(&mut space);
    let id = ball(&mut space, Vect::new(0.0, 0.2), Vect::ZERO, circle());
    for _ in 0..240 {
        space.step(DT);
    }
    let body = space.body(id).expect("ball");
    assert!(0.5 - body.position().y <= space.settings.collision_slop + 1e-3);
    // Correction goes through the bias velocity, which is discarded every step.
    assert!(body.velocity.length() < 1e-9);
}

#[test]
fn disabled_position_correction_leaves_overlap() {
    let mut space = Space::with_settings(Settings {
        position_correction: false,
        ..Settings::default()
    });
    ground(&mut space);
    let id = ball(&mut space, Vect::new(0.0, 0.2), Vect::ZERO, circle());
    for _ in 0..60 {
        space.step(DT);
    }
    assert!((space.body(id).expect("ball").position().y - 0.2).abs() < 1e-9);
}

#[test]
fn sensors_are_notified_but_never_solved() {
    let mut space = Space::new();
    let hits = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&hits);
    space.set_on_collision(move |arb| {
        assert!(arb.is_sensor());
        seen.set(seen.get() + 1);
    });

    let a = ball(&mut space, Vect::ZERO, Vect::new(0.5, 0.0), circle().with_sensor(true));
    let b = ball(&mut space, Vect::new(0.6, 0.0), Vect::ZERO, circle());
    for _ in 0..3 {
        space.step(DT);
    }

    assert_eq!(hits.get(), 3);
    assert_eq!(space.arbiters().count(), 1);
    assert_eq!(space.body(a).expect("a").velocity, Vect::new(0.5, 0.0));
    assert_eq!(space.body(b).expect("b").velocity, Vect::ZERO);
    let arb = space.arbiters().next().expect("sensor arbiter");
    assert!(arb.contacts().iter().all(|c| c.normal_impulse() == 0.0));
}

#[test]
fn should_collide_filter_lets_shapes_pass_through() {
    let mut space = Space::new();
    space.set_should_collide(|_, _| false);
    let a = ball(&mut space, Vect::new(-0.6, 0.0), Vect::new(1.0, 0.0), circle());
    let b = ball(&mut space, Vect::new(0.6, 0.0), Vect::new(-1.0, 0.0), circle());
    for _ in 0..60 {
        space.step(DT);
        assert_eq!(space.arbiters().count(), 0);
    }
    assert!(space.body(a).expect("a").position().x > 0.0);
    assert!(space.body(b).expect("b").position().x < 0.0);
}

#[test]
fn warm_start_reuses_impulse_of_persistent_contact() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    ground(&mut space);
    ball(&mut space, Vect::new(0.0, 0.495), Vect::ZERO, circle());
    space.step(DT);
    space.step(DT);
    let arb = space.arbiters().next().expect("contact");
    // Resting support: the accumulated impulse carries the weight m*g*dt.
    let jn = arb.contacts()[0].normal_impulse();
    assert!((jn - 10.0 * DT).abs() < 1e-9, "jn = {jn}");
    assert!((Space::warm_start_ratio(DT, space.prev_dt()) - 1.0).abs() < 1e-12);
}

#[test]
fn removing_a_body_retires_its_arbiters() {
    let mut space = Space::new();
    let g = ground(&mut space);
    let id = ball(&mut space, Vect::new(0.0, 0.45), Vect::ZERO, circle());
    space.step(DT);
    assert_eq!(space.arbiters().count(), 1);

    let body = space.remove_body(id).expect("live body");
    assert!(body.shapes().iter().all(|s| s.proxy().is_none()));
    assert_eq!(space.arbiters().count(), 0);
    assert_eq!(space.remove_body(id), Err(SpaceError::UnknownBody(id)));
    assert!(space.body(g).is_ok());
    space.step(DT);
    assert_eq!(space.body_count(), 1);
}

#[test]
fn queries_resolve_proxies_to_shapes() {
    let mut space = Space::new();
    let g = ground(&mut space);
    let b = ball(&mut space, Vect::new(0.0, 5.0), Vect::ZERO, circle());

    let mut found = Vec::new();
    space.query_aabb(&Aabb::from_center_half_extents(Vect::new(0.0, 5.0), 0.1, 0.1), |id, _| {
        found.push(id.body);
        true
    });
    assert_eq!(found, vec![b]);

    let input = RayCastInput::new(Vect::new(0.0, 10.0), Vect::new(0.0, -10.0));
    let mut first = None;
    space.ray_cast(&input, |sub, id, shape| {
        let Some(t) = shape.aabb().ray_cast(sub) else {
            return -1.0;
        };
        first = Some(id.body);
        t
    });
    assert_eq!(first, Some(b));
    assert!(space.body(g).is_ok());
    assert!(space.dynamic_tree_nodes().iter().filter(|n| n.is_leaf).count() == 2);
}

#[test]
fn nan_force_stays_on_its_body() {
    let mut space = Space::new();
    space.gravity = Vect::new(0.0, -10.0);
    ground(&mut space);
    let poisoned = ball(&mut space, Vect::new(0.0, 0.45), Vect::ZERO, circle());
    let bystander = ball(&mut space, Vect::new(5.0, 0.45), Vect::ZERO, circle());
    space
        .body_mut(poisoned)
        .expect("body")
        .apply_force(Vect::new(f64::NAN, 0.0));

    for _ in 0..3 {
        space.step(DT);
    }

    assert!(space.body(poisoned).expect("body").position().x.is_nan());
    let calm = space.body(bystander).expect("body");
    assert!(calm.position().x.is_finite() && calm.position().y.is_finite());
    assert!(calm.velocity.x.is_finite() && calm.velocity.y.is_finite());
    for (_, body) in space.bodies().filter(|(_, b)| b.is_static()) {
        assert_eq!(body.velocity, Vect::ZERO);
    }
}

#[test]
fn near_miss_pair_is_filtered_once() {
    let mut space = Space::new();
    let calls = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&calls);
    space.set_should_collide(move |_, _| {
        seen.set(seen.get() + 1);
        true
    });
    let left = ball(&mut space, Vect::ZERO, Vect::ZERO, circle());
    ball(&mut space, Vect::new(1.05, 0.0), Vect::ZERO, circle());

    for _ in 0..10 {
        space.step(DT);
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(space.arbiters().count(), 0);

    // Closing the gap builds the arbiter without asking the filter again.
    space.body_mut(left).expect("body").velocity = Vect::new(1.0, 0.0);
    let mut touched = false;
    for _ in 0..10 {
        space.step(DT);
        touched |= space.arbiters().count() > 0;
    }
    assert!(touched);
    assert_eq!(calls.get(), 1);
}
