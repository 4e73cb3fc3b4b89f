//! Invariants of the recalculation engine over randomized edits.

use proptest::prelude::*;
use vtolplan_geo::{heading_difference, Coordinate};
use vtolplan_pattern::engine::DistanceBounds;
use vtolplan_pattern::landing::LandingParam;
use vtolplan_pattern::pattern::scan_for_pattern;
use vtolplan_pattern::takeoff::TakeoffParam;
use vtolplan_pattern::{LandingPattern, PlanContext, TakeoffPattern};

fn site(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon, 0.0)
}

mod takeoff_properties {
    use super::*;

    proptest! {
        #[test]
        fn distance_always_within_bounds(
            lat in -60.0_f64..60.0,
            lon in -179.0_f64..179.0,
            heading in 0.0_f64..360.0,
            requested in -500.0_f64..5000.0,
            loiter in any::<bool>(),
        ) {
            let mut p = TakeoffPattern::new(PlanContext::default());
            p.set_param(TakeoffParam::UseLoiterToAlt, loiter);
            p.set_vtol_takeoff_coordinate(site(lat, lon));
            p.set_param(TakeoffParam::TakeoffHeading, heading);
            p.set_param(TakeoffParam::TakeoffDist, requested);

            let bounds = DistanceBounds::effective(10.0, 2000.0, loiter.then_some(75.0));
            let d = p.param(TakeoffParam::TakeoffDist);
            prop_assert!(bounds.contains(d), "distance {} outside {:?}", d, bounds);
            prop_assert!((p.complex_distance() - d).abs() < 1e-4, "measured {} vs param {}", p.complex_distance(), d);
        }

        #[test]
        fn heading_and_coordinates_agree(
            heading in 0.0_f64..360.0,
            distance in 20.0_f64..2000.0,
        ) {
            let mut p = TakeoffPattern::new(PlanContext::default());
            p.set_vtol_takeoff_coordinate(site(47.0, 8.0));
            p.set_param(TakeoffParam::TakeoffHeading, heading);
            p.set_param(TakeoffParam::TakeoffDist, distance);

            let entry = p.vtol_takeoff_coordinate();
            let exit = p.climbout_coordinate();
            prop_assert!(heading_difference(entry.azimuth_to(&exit), heading) < 1e-6);

            // Dragging the climbout along the line is measured back into the params.
            let before = p.recalc_count();
            p.set_climbout_coordinate(entry.at_distance_and_azimuth(distance + 10.0, heading));
            prop_assert_eq!(p.recalc_count(), before + 1);
            let expected = (distance + 10.0).min(2000.0);
            prop_assert!((p.param(TakeoffParam::TakeoffDist) - expected).abs() < 1e-4);
            prop_assert!(heading_difference(p.param(TakeoffParam::TakeoffHeading), heading) < 1e-6);
        }

        #[test]
        fn remeasuring_unchanged_coordinates_is_a_no_op(
            lat in -60.0_f64..60.0,
            heading in 0.0_f64..360.0,
            distance in 20.0_f64..2000.0,
        ) {
            let mut p = TakeoffPattern::new(PlanContext::default());
            p.set_vtol_takeoff_coordinate(site(lat, 8.0));
            p.set_param(TakeoffParam::TakeoffHeading, heading);
            p.set_param(TakeoffParam::TakeoffDist, distance);
            let distance = p.param(TakeoffParam::TakeoffDist);
            let climbout = p.climbout_coordinate();

            p.recalc_from_coordinate_change();
            prop_assert!(heading_difference(p.param(TakeoffParam::TakeoffHeading), heading) < 1e-6);
            prop_assert!((p.param(TakeoffParam::TakeoffDist) - distance).abs() < 1e-4);
            prop_assert!(p.climbout_coordinate().distance_to(&climbout) < 1e-4);
        }

        #[test]
        fn save_load_is_stable(
            heading in 0.0_f64..360.0,
            distance in 100.0_f64..2000.0,
            relative in any::<bool>(),
        ) {
            let mut p = TakeoffPattern::new(PlanContext::offline(300.0));
            p.set_param(TakeoffParam::TakeoffHeading, heading);
            p.set_param(TakeoffParam::TakeoffDist, distance);
            p.set_altitudes_are_relative(relative);
            p.set_vtol_takeoff_coordinate(site(-33.9, 151.2));

            let q = TakeoffPattern::from_json(&p.save(), 0, PlanContext::offline(300.0)).unwrap();
            prop_assert!(!q.is_dirty());
            prop_assert_eq!(q.altitudes_are_relative(), relative);
            prop_assert!(q.climbout_coordinate().distance_to(&p.climbout_coordinate()) < 1e-4);
            prop_assert_eq!(q.amsl_exit_alt(), p.amsl_exit_alt());
        }
    }
}

mod landing_properties {
    use super::*;

    proptest! {
        #[test]
        fn glide_slope_is_the_inverse_of_distance(slope in 2.0_f64..40.0) {
            let mut p = LandingPattern::new(PlanContext::default());
            p.set_landing_coordinate(site(47.0, 8.0));
            p.set_param(LandingParam::GlideSlope, slope);

            prop_assert!((p.param(LandingParam::GlideSlope) - slope).abs() < 1e-6);
            let run = p.param(LandingParam::LandingDistance) - p.param(LandingParam::TransitionDistance);
            let drop = p.param(LandingParam::FinalApproachAltitude) - p.param(LandingParam::TransitionAltitude);
            prop_assert!(((drop / run).atan().to_degrees() - slope).abs() < 1e-6);
        }

        #[test]
        fn glide_slope_stays_inside_bounds(
            distance in -100.0_f64..4000.0,
            approach_alt in 10.0_f64..300.0,
            transition_alt in 5.0_f64..200.0,
        ) {
            let mut p = LandingPattern::new(PlanContext::default());
            p.set_landing_coordinate(site(47.0, 8.0));
            p.set_param(LandingParam::FinalApproachAltitude, approach_alt);
            p.set_param(LandingParam::TransitionAltitude, transition_alt);
            p.set_param(LandingParam::LandingDistance, distance);

            let slope = p.param(LandingParam::GlideSlope);
            prop_assert!(slope > 1.0 && slope < 45.0, "glide slope {}", slope);
            let d = p.param(LandingParam::LandingDistance);
            prop_assert!(d >= 85.0 && d <= 3000.0, "distance {}", d);
            prop_assert!(p.param(LandingParam::TransitionDistance) <= d);
        }

        #[test]
        fn dragged_final_approach_keeps_loiter_geometry(
            bearing in 0.0_f64..360.0,
            range in 150.0_f64..2500.0,
            clockwise in any::<bool>(),
        ) {
            let mut p = LandingPattern::new(PlanContext::default());
            p.set_param(LandingParam::LoiterClockwise, clockwise);
            let landing = site(47.0, 8.0);
            p.set_landing_coordinate(landing);
            p.set_final_approach_coordinate(landing.at_distance_and_azimuth(range, bearing));

            let centre = p.final_approach_coordinate();
            let tangent = p.loiter_tangent_coordinate();
            prop_assert!((centre.distance_to(&tangent) - 75.0).abs() < 1e-2);
            prop_assert!((landing.distance_to(&tangent) - p.param(LandingParam::LandingDistance)).abs() < 1e-4);
            prop_assert!(heading_difference(landing.azimuth_to(&centre), bearing) < 1e-6);
        }

        #[test]
        fn scanned_landing_matches_its_source(heading in 0.0_f64..360.0, distance in 100.0_f64..2500.0) {
            let mut p = LandingPattern::new(PlanContext::default());
            p.set_param(LandingParam::LandingHeading, heading);
            p.set_param(LandingParam::LandingDistance, distance);
            p.set_landing_coordinate(site(47.0, 8.0));

            let items = p.mission_items();
            let (scanned, consumed) = scan_for_pattern(&items, PlanContext::default()).unwrap();
            prop_assert_eq!(consumed, 3);
            prop_assert_eq!(scanned.mission_items().len(), 3);
            prop_assert!(scanned.complex_distance() - p.complex_distance() < 1e-3);
            prop_assert!(p.complex_distance() - scanned.complex_distance() < 1e-3);
        }
    }
}
