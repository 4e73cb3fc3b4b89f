use mavlink::common::MavCmd;
use vtolplan_geo::Coordinate;
use vtolplan_pattern::landing::LandingParam;
use vtolplan_pattern::mission::{build_mission, scan_mission, PlanEntry};
use vtolplan_pattern::pattern::scan_for_pattern;
use vtolplan_pattern::takeoff::TakeoffParam;
use vtolplan_pattern::{LandingPattern, Pattern, PatternKind, PlanContext, TakeoffPattern};
use vtolplan_proto::{altitude_frame, MissionItem};

const EPS_DEG: f64 = 1e-7;

fn takeoff() -> TakeoffPattern {
    let mut p = TakeoffPattern::new(PlanContext::default());
    p.set_param(TakeoffParam::TakeoffHeading, 60.0);
    p.set_param(TakeoffParam::UseLoiterToAlt, true);
    p.set_param(TakeoffParam::LoiterClockwise, false);
    p.set_vtol_takeoff_coordinate(Coordinate::new(47.3977, 8.5456, 0.0));
    p.set_sequence_number(1);
    p
}

fn landing() -> LandingPattern {
    let mut p = LandingPattern::new(PlanContext::default());
    p.set_param(LandingParam::LandingHeading, 240.0);
    p.set_param(LandingParam::StopTakingPhotos, true);
    p.set_landing_coordinate(Coordinate::new(47.3977, 8.5456, 0.0));
    p.set_sequence_number(4);
    p
}

fn assert_same_items(a: &[MissionItem], b: &[MissionItem]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_eq!((x.seq, x.command, x.frame), (y.seq, y.command, y.frame));
        assert_eq!(x.param1, y.param1, "param1 of seq {}", x.seq);
        assert_eq!(x.param2, y.param2, "param2 of seq {}", x.seq);
        assert!((x.param5 - y.param5).abs() < EPS_DEG, "lat of seq {}", x.seq);
        assert!((x.param6 - y.param6).abs() < EPS_DEG, "lon of seq {}", x.seq);
        assert_eq!(x.param7, y.param7, "alt of seq {}", x.seq);
    }
}

#[test]
fn takeoff_items_scan_back_to_the_same_pattern() {
    let items = takeoff().mission_items();
    assert_eq!(items[0].command, MavCmd::MAV_CMD_NAV_VTOL_TAKEOFF);
    assert_eq!(items[1].command, MavCmd::MAV_CMD_NAV_LOITER_TO_ALT);
    assert!(items[1].param2 < 0.0);

    let (p, consumed) = scan_for_pattern(&items, PlanContext::default()).unwrap();
    assert_eq!(consumed, 2);
    assert_eq!(p.kind(), PatternKind::Takeoff);
    assert!(!p.is_dirty());
    assert_same_items(&p.mission_items(), &items);
}

#[test]
fn landing_items_scan_back_to_the_same_pattern() {
    let items = landing().mission_items();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].command, MavCmd::MAV_CMD_IMAGE_STOP_CAPTURE);
    assert_eq!(items[3].command, MavCmd::MAV_CMD_NAV_VTOL_LAND);

    let (p, consumed) = scan_for_pattern(&items, PlanContext::default()).unwrap();
    assert_eq!(consumed, 4);
    let Pattern::Landing(l) = &p else {
        panic!("expected a landing pattern, got {:?}", p.kind());
    };
    assert!(l.params().bool(LandingParam::StopTakingPhotos));
    assert!(!l.params().bool(LandingParam::StopTakingVideo));
    assert!((l.param(LandingParam::TransitionDistance) - 60.0).abs() < 1e-6);
    assert_same_items(&p.mission_items(), &items);
}

#[test]
fn plain_land_from_older_planners_is_recognized() {
    let mut items = landing().mission_items();
    items[3].command = MavCmd::MAV_CMD_NAV_LAND;
    let (p, _) = scan_for_pattern(&items, PlanContext::default()).unwrap();
    // Re-emitted as a VTOL land.
    assert_eq!(p.mission_items()[3].command, MavCmd::MAV_CMD_NAV_VTOL_LAND);
}

#[test]
fn wrong_shapes_are_left_alone() {
    let at = Coordinate::new(47.0, 8.0, 30.0);
    let frame = altitude_frame(true);

    // Takeoff without a climbout.
    let items = [MissionItem::vtol_takeoff(0, frame, &at)];
    assert!(scan_for_pattern(&items, PlanContext::default()).is_none());

    // Takeoff followed by a hold waypoint.
    let mut hold = MissionItem::waypoint(1, frame, &at);
    hold.param1 = 5.0;
    let items = [MissionItem::vtol_takeoff(0, frame, &at), hold];
    assert!(scan_for_pattern(&items, PlanContext::default()).is_none());

    // Landing approach in a local frame.
    let mut items = landing().mission_items();
    items[2].frame = mavlink::common::MavFrame::MAV_FRAME_LOCAL_NED;
    assert!(scan_for_pattern(&items[1..], PlanContext::default()).is_none());
}

#[test]
fn whole_mission_round_trips_through_scan() {
    let mut items = takeoff().mission_items();
    items.push(MissionItem::waypoint(3, altitude_frame(true), &Coordinate::new(47.41, 8.55, 80.0)));
    items.extend(landing().mission_items());
    assert_eq!(items.len(), 7);

    let mut entries = scan_mission(&items, PlanContext::default());
    let kinds: Vec<_> = entries
        .iter()
        .map(|e| match e {
            PlanEntry::Simple(_) => None,
            PlanEntry::Complex(p) => Some(p.kind()),
        })
        .collect();
    assert_eq!(kinds, vec![Some(PatternKind::Takeoff), None, Some(PatternKind::Landing)]);

    let rebuilt = build_mission(&mut entries, 1);
    assert_same_items(&rebuilt, &items);

    // Scanning the rebuilt mission is stable.
    let again = build_mission(&mut scan_mission(&rebuilt, PlanContext::default()), 1);
    assert_same_items(&again, &rebuilt);
}

#[test]
fn saved_plan_loads_through_dispatch() {
    let records = [Pattern::Takeoff(takeoff()).save(), Pattern::Landing(landing()).save()];
    let loaded: Vec<_> = records
        .iter()
        .map(|r| Pattern::load(r, 0, PlanContext::default()).unwrap())
        .collect();
    assert_eq!(loaded[0].kind(), PatternKind::Takeoff);
    assert_eq!(loaded[1].kind(), PatternKind::Landing);
    assert!(loaded.iter().all(|p| !p.is_dirty()));
}

#[test]
fn older_records_load_through_dispatch() {
    let mut takeoff_record = takeoff().save();
    takeoff_record["complexItemType"] = serde_json::json!("VTOLTakeoffPattern");
    let p = Pattern::load(&takeoff_record, 0, PlanContext::default()).unwrap();
    assert_eq!(p.kind(), PatternKind::Takeoff);

    let mut landing_record = landing().save();
    let video = landing_record.as_object_mut().unwrap().remove("stopTakingVideo").unwrap();
    landing_record["stopVideoPhotos"] = video;
    let p = Pattern::load(&landing_record, 0, PlanContext::default()).unwrap();
    assert_eq!(p.kind(), PatternKind::Landing);
    assert_eq!(p.mission_items().len(), 4);
}
