use serde_json::json;
use vtolplan_geo::{heading_difference, Coordinate};
use vtolplan_pattern::landing::LandingParam;
use vtolplan_pattern::{LandingPattern, LoadError, NoTerrain, PatternEvent, PlanContext, ReadyForSave};
use vtolplan_proto::{FlightPathSegment, SegmentKind};

fn strip() -> Coordinate {
    Coordinate::new(47.3977, 8.5456, 0.0)
}

fn anchored() -> LandingPattern {
    let mut p = LandingPattern::new(PlanContext::offline(400.0));
    p.set_landing_coordinate(strip());
    p
}

#[test]
fn unanchored_pattern_is_not_ready() {
    let mut p = LandingPattern::new(PlanContext::default());
    assert_eq!(p.ready_for_save(), ReadyForSave::NotReadyForSaveData);
    p.set_param(LandingParam::LandingHeading, 180.0);
    assert_eq!(p.recalc_count(), 0);
    p.set_landing_coordinate(strip());
    assert_eq!(p.ready_for_save(), ReadyForSave::Ready);
    assert_eq!(p.recalc_count(), 1);
    let tangent = p.loiter_tangent_coordinate();
    assert!(heading_difference(strip().azimuth_to(&tangent), 0.0) < 1e-6);
}

#[test]
fn save_then_load_restores_approach() {
    let mut p = anchored();
    p.set_param(LandingParam::LandingHeading, 200.0);
    p.set_param(LandingParam::LandingDistance, 500.0);
    p.set_param(LandingParam::StopTakingVideo, true);

    let saved = p.save();
    assert_eq!(saved["complexItemType"], "vtolLandingPattern");
    assert_eq!(saved["stopTakingVideo"], true);
    assert!(saved.get("landingHeading").is_none());

    let q = LandingPattern::from_json(&saved, 5, PlanContext::offline(400.0)).unwrap();
    assert!(!q.is_dirty());
    assert!((q.param(LandingParam::LandingDistance) - 500.0).abs() < 1e-4);
    assert!(heading_difference(q.param(LandingParam::LandingHeading), 200.0) < 1e-6);
    assert!((q.param(LandingParam::TransitionDistance) - 60.0).abs() < 1e-9);
    assert!((q.param(LandingParam::GlideSlope) - p.param(LandingParam::GlideSlope)).abs() < 1e-6);
    assert!(q.final_approach_coordinate().distance_to(&p.final_approach_coordinate()) < 1e-3);
    assert_eq!(q.last_sequence_number(), 8);
}

#[test]
fn split_relative_flags_need_both() {
    let mut v = anchored().save();
    let obj = v.as_object_mut().unwrap();
    obj.remove("altitudesAreRelative");
    obj.insert("landAltitudeRelative".into(), json!(true));
    obj.insert("loiterAltitudeRelative".into(), json!(false));
    let p = LandingPattern::from_json(&v, 0, PlanContext::default()).unwrap();
    assert!(!p.altitudes_are_relative());

    obj_remove(&mut v, "loiterAltitudeRelative");
    assert_eq!(
        LandingPattern::from_json(&v, 0, PlanContext::default()).unwrap_err(),
        LoadError::MissingKey("altitudesAreRelative".into())
    );
}

fn obj_remove(v: &mut serde_json::Value, key: &str) {
    v.as_object_mut().unwrap().remove(key);
}

#[test]
fn required_keys_enforced() {
    let base = anchored().save();
    for key in ["landCoordinate", "transitionDistance", "stopTakingPhotos", "loiterRadius"] {
        let mut v = base.clone();
        obj_remove(&mut v, key);
        assert_eq!(
            LandingPattern::from_json(&v, 0, PlanContext::default()).unwrap_err(),
            LoadError::MissingKey(key.into()),
            "{key}"
        );
    }
}

#[test]
fn older_stop_video_key_is_read() {
    let mut v = anchored().save();
    obj_remove(&mut v, "stopTakingVideo");
    assert_eq!(
        LandingPattern::from_json(&v, 0, PlanContext::default()).unwrap_err(),
        LoadError::MissingKey("stopTakingVideo".into())
    );

    v["stopVideoPhotos"] = json!(true);
    let p = LandingPattern::from_json(&v, 0, PlanContext::default()).unwrap();
    assert!(p.params().bool(LandingParam::StopTakingVideo));
    let saved = p.save();
    assert_eq!(saved["stopTakingVideo"], true);
    assert!(saved.get("stopVideoPhotos").is_none());
}

#[test]
fn fractional_version_is_unsupported() {
    let mut v = anchored().save();
    v["version"] = json!(1.5);
    assert!(matches!(
        LandingPattern::from_json(&v, 0, PlanContext::default()),
        Err(LoadError::UnsupportedVersion { version, .. }) if version == 1.5
    ));
}

#[test]
fn glide_slope_edit_moves_the_approach() {
    let mut p = anchored();
    p.set_param(LandingParam::GlideSlope, 10.0);
    let expected = 30.0 / 10f64.to_radians().tan() + 60.0;
    assert!((p.param(LandingParam::LandingDistance) - expected).abs() < 1e-9);
    assert!((p.param(LandingParam::GlideSlope) - 10.0).abs() < 1e-9);
    let tangent = p.loiter_tangent_coordinate();
    assert!((p.landing_coordinate().distance_to(&tangent) - expected).abs() < 1e-6);
}

#[test]
fn altitude_edits_keep_glide_slope_consistent() {
    let mut p = anchored();
    p.set_param(LandingParam::FinalApproachAltitude, 90.0);
    let expected = (60.0f64 / 240.0).atan().to_degrees();
    assert!((p.param(LandingParam::GlideSlope) - expected).abs() < 1e-9);
    assert_eq!(p.final_approach_coordinate().altitude, 90.0);
    assert_eq!(p.loiter_tangent_coordinate().altitude, 90.0);
    assert_eq!(p.amsl_entry_alt(), 490.0);
}

#[test]
fn nudged_glide_slope_matches_the_geometry() {
    let mut p = anchored();
    p.set_param(LandingParam::UseLoiterToAlt, false);
    p.set_param(LandingParam::TransitionDistance, 0.0);
    p.set_param(LandingParam::FinalApproachAltitude, 1000.0);
    p.set_param(LandingParam::LandingDistance, 10.0);

    let slope = p.param(LandingParam::GlideSlope);
    assert!(slope < 45.0);
    let run = p.landing_coordinate().distance_to(&p.final_approach_coordinate());
    let drop = p.param(LandingParam::FinalApproachAltitude) - p.param(LandingParam::TransitionAltitude);
    assert!(((drop / run).atan().to_degrees() - slope).abs() < 1e-6, "slope {slope} over {run} m");
    assert!((run - p.param(LandingParam::LandingDistance)).abs() < 1e-6);
}

#[test]
fn moving_landing_point_carries_the_approach() {
    let mut p = anchored();
    let distance = p.param(LandingParam::LandingDistance);
    let moved = strip().at_distance_and_azimuth(1000.0, 0.0);
    p.set_landing_coordinate(moved);
    assert_eq!(p.param(LandingParam::LandingDistance), distance);
    assert!((p.landing_coordinate().distance_to(&p.loiter_tangent_coordinate()) - distance).abs() < 1e-6);
    assert!(p.transition_coordinate().distance_to(&strip()) > 900.0);
}

#[test]
fn dragging_final_approach_remeasures() {
    let mut p = anchored();
    p.set_param(LandingParam::UseLoiterToAlt, false);
    let dragged = strip().at_distance_and_azimuth(800.0, 45.0);
    p.set_final_approach_coordinate(dragged);
    assert!((p.param(LandingParam::LandingDistance) - 800.0).abs() < 1e-6);
    assert!(heading_difference(strip().azimuth_to(&p.final_approach_coordinate()), 45.0) < 1e-6);
    assert_eq!(p.final_approach_coordinate(), p.loiter_tangent_coordinate());
}

#[test]
fn terrain_collisions_are_reported_and_cleared() {
    let mut p = anchored();
    let probe = |s: &FlightPathSegment| s.kind == SegmentKind::Land;
    assert!(p.flush(&probe));
    assert_eq!(p.flight_path().terrain_collisions(), 1);
    assert!(p.flight_path().segments().iter().any(|s| s.terrain_collision));
    assert!(p.take_events().contains(&PatternEvent::TerrainCollisionChanged(true)));

    p.set_param(LandingParam::LandingHeading, 90.0);
    assert!(p.flush(&NoTerrain));
    assert_eq!(p.flight_path().terrain_collisions(), 0);
    assert!(p.take_events().contains(&PatternEvent::TerrainCollisionChanged(false)));
}

#[test]
fn flight_path_follows_loiter_setting() {
    let mut p = anchored();
    p.flush(&NoTerrain);
    let segments = p.flight_path().segments();
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[3].kind, SegmentKind::Land);
    assert_eq!(segments[3].start_amsl_m, 430.0);
    assert_eq!(segments[3].end_amsl_m, 400.0);

    p.set_param(LandingParam::UseLoiterToAlt, false);
    p.flush(&NoTerrain);
    assert_eq!(p.flight_path().segments().len(), 3);
}

#[test]
fn context_change_only_rebases_altitudes() {
    let mut p = anchored();
    p.flush(&NoTerrain);
    let landing = p.landing_coordinate();
    p.set_context(PlanContext { vehicle_home: Some(Coordinate::new(47.4, 8.5, 500.0)), planned_home_alt_m: 500.0 });
    assert_eq!(p.landing_coordinate(), landing);
    assert!(p.flight_path().is_stale());
    assert_eq!(p.amsl_exit_alt(), 500.0);
}
