// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Property tests for the position-bias coefficient and warm-start ratio.

use mater_core::{Settings, Space};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bias_coefficient_stays_in_unit_interval(
        base in 0.9..1.0f64,
        dt in 0.0..50.0f64,
    ) {
        let settings = Settings { collision_bias: base, ..Settings::default() };
        let coef = settings.bias_coefficient(dt);
        prop_assert!((0.0..1.0).contains(&coef), "coef {coef} for base {base}, dt {dt}");
    }

    #[test]
    fn default_bias_coefficient_grows_with_dt(dt in 1e-4..10.0f64, extra in 1e-4..1.0f64) {
        let settings = Settings::default();
        let coef = settings.bias_coefficient(dt);
        prop_assert!((0.0..1.0).contains(&coef));
        prop_assert!(settings.bias_coefficient(dt + extra) >= coef);
    }

    #[test]
    fn equal_steps_warm_start_fully(dt in 1e-6..1.0f64) {
        prop_assert_eq!(Space::warm_start_ratio(dt, dt), 1.0);
        prop_assert_eq!(Space::warm_start_ratio(dt, 0.0), 0.0);
    }
}
