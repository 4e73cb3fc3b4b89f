//! VTOL landing: approach (optionally through a loiter-to-altitude
//! circle), transition point, then a vertical landing.
//!
//! The landing point is the anchor. Heading is the direction of flight
//! into it and `landingDistance` runs from it back to the start of the
//! straight approach leg. The glide slope is kept consistent with the
//! altitudes and distances in both directions: editing it moves the
//! approach, editing anything else re-measures it.

use serde_json::{json, Value};
use tracing::debug;
use vtolplan_geo::Coordinate;
use vtolplan_proto::{altitude_frame, MissionItem};

use crate::context::PlanContext;
use crate::engine::{self, ApproachSolution, DistanceBounds, Loiter};
use crate::error::{LoadError, ParamError};
use crate::param::{ParamKey, ParamMeta, ParamStore, ParamValue};
use crate::pattern::ReadyForSave;
use crate::persist::{self, JsonKind, KeySpec};
use crate::projector::{self, TerrainProbe};
use crate::state::{CoordinateRole, PatternEvent, PatternState, RecalcGuard};

pub const JSON_COMPLEX_ITEM_TYPE: &str = "vtolLandingPattern";
pub const LEGACY_JSON_COMPLEX_ITEM_TYPES: &[&str] = &[];

const FINAL_APPROACH_COORDINATE_KEY: &str = "finalApproachCoordinate";
const LAND_COORDINATE_KEY: &str = "landCoordinate";
const LOITER_RADIUS_KEY: &str = "loiterRadius";
const LOITER_CLOCKWISE_KEY: &str = "loiterClockwise";
const USE_LOITER_TO_ALT_KEY: &str = "useLoiterToAlt";
const TRANSITION_ALTITUDE_KEY: &str = "transitionAltitude";
const TRANSITION_DISTANCE_KEY: &str = "transitionDistance";
const STOP_TAKING_PHOTOS_KEY: &str = "stopTakingPhotos";
const STOP_TAKING_VIDEO_KEY: &str = "stopTakingVideo";
const DEPRECATED_STOP_VIDEO_PHOTOS_KEY: &str = "stopVideoPhotos";
const ALTITUDES_ARE_RELATIVE_KEY: &str = "altitudesAreRelative";
const DEPRECATED_LOITER_COORDINATE_KEY: &str = "loiterCoordinate";
const DEPRECATED_LAND_ALTITUDE_RELATIVE_KEY: &str = "landAltitudeRelative";
const DEPRECATED_LOITER_ALTITUDE_RELATIVE_KEY: &str = "loiterAltitudeRelative";

const KEYS: &[KeySpec] = &[
    KeySpec::required(persist::VERSION_KEY, JsonKind::Number),
    KeySpec::optional(persist::TYPE_KEY, JsonKind::String),
    KeySpec::optional(persist::COMPLEX_ITEM_TYPE_KEY, JsonKind::String),
    KeySpec::optional(FINAL_APPROACH_COORDINATE_KEY, JsonKind::Array),
    KeySpec::optional(DEPRECATED_LOITER_COORDINATE_KEY, JsonKind::Array),
    KeySpec::required(LAND_COORDINATE_KEY, JsonKind::Array),
    KeySpec::required(LOITER_RADIUS_KEY, JsonKind::Number),
    KeySpec::required(LOITER_CLOCKWISE_KEY, JsonKind::Bool),
    KeySpec::optional(USE_LOITER_TO_ALT_KEY, JsonKind::Bool),
    KeySpec::required(TRANSITION_ALTITUDE_KEY, JsonKind::Number),
    KeySpec::required(TRANSITION_DISTANCE_KEY, JsonKind::Number),
    KeySpec::required(STOP_TAKING_PHOTOS_KEY, JsonKind::Bool),
    KeySpec::optional(STOP_TAKING_VIDEO_KEY, JsonKind::Bool),
    KeySpec::optional(DEPRECATED_STOP_VIDEO_PHOTOS_KEY, JsonKind::Bool),
    KeySpec::optional(ALTITUDES_ARE_RELATIVE_KEY, JsonKind::Bool),
    KeySpec::optional(DEPRECATED_LAND_ALTITUDE_RELATIVE_KEY, JsonKind::Bool),
    KeySpec::optional(DEPRECATED_LOITER_ALTITUDE_RELATIVE_KEY, JsonKind::Bool),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingParam {
    LandingDistance,
    FinalApproachAltitude,
    TransitionAltitude,
    TransitionDistance,
    LandingAltitude,
    LoiterRadius,
    LoiterClockwise,
    LandingHeading,
    UseLoiterToAlt,
    GlideSlope,
    StopTakingPhotos,
    StopTakingVideo,
}

const fn number(name: &'static str, default: f64, min: f64, max: f64, units: &'static str, description: &'static str) -> ParamMeta {
    ParamMeta { name, default: ParamValue::Number(default), min, max, units, description }
}

const fn flag(name: &'static str, default: bool, description: &'static str) -> ParamMeta {
    ParamMeta { name, default: ParamValue::Bool(default), min: 0.0, max: 1.0, units: "", description }
}

static META: [ParamMeta; 12] = [
    number("landingDistance", 300.0, 10.0, 3000.0, "m", "Distance from the start of the approach leg to the landing point."),
    number("finalApproachAltitude", 60.0, 10.0, 1000.0, "m", "Altitude of the final approach."),
    number("transitionAltitude", 30.0, 5.0, 500.0, "m", "Altitude at which the vehicle transitions to hover."),
    number("transitionDistance", 60.0, 0.0, 2000.0, "m", "Distance from the transition point to the landing point."),
    number("landingAltitude", 0.0, -100.0, 500.0, "m", "Altitude of the landing point."),
    number("loiterRadius", 75.0, 5.0, 1000.0, "m", "Radius of the approach loiter."),
    flag("loiterClockwise", true, "Approach loiter direction."),
    number("landingHeading", 270.0, 0.0, 360.0, "deg", "Heading of the final approach."),
    flag("useLoiterToAlt", true, "Descend to the approach altitude in a loiter."),
    number("glideSlope", 6.0, 1.0, 45.0, "deg", "Descent angle between final approach and transition."),
    flag("stopTakingPhotos", false, "Stop image capture before the approach."),
    flag("stopTakingVideo", false, "Stop video capture before the approach."),
];

impl ParamKey for LandingParam {
    const ALL: &'static [Self] = &[
        LandingParam::LandingDistance,
        LandingParam::FinalApproachAltitude,
        LandingParam::TransitionAltitude,
        LandingParam::TransitionDistance,
        LandingParam::LandingAltitude,
        LandingParam::LoiterRadius,
        LandingParam::LoiterClockwise,
        LandingParam::LandingHeading,
        LandingParam::UseLoiterToAlt,
        LandingParam::GlideSlope,
        LandingParam::StopTakingPhotos,
        LandingParam::StopTakingVideo,
    ];

    fn meta(self) -> &'static ParamMeta {
        &META[self as usize]
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LandingRecord {
    final_approach: Coordinate,
    landing: Coordinate,
    transition_alt_m: f64,
    transition_distance_m: f64,
    loiter_radius_m: f64,
    loiter_clockwise: bool,
    use_loiter_to_alt: bool,
    stop_taking_photos: bool,
    stop_taking_video: bool,
    altitudes_are_relative: bool,
}

impl LandingRecord {
    fn from_json(v: &Value) -> Result<Self, LoadError> {
        let obj = persist::as_object(v)?;
        persist::check_header(obj, JSON_COMPLEX_ITEM_TYPE, LEGACY_JSON_COMPLEX_ITEM_TYPES)?;
        persist::validate_keys(obj, JSON_COMPLEX_ITEM_TYPE, KEYS)?;

        let final_approach_key = [FINAL_APPROACH_COORDINATE_KEY, DEPRECATED_LOITER_COORDINATE_KEY]
            .into_iter()
            .find(|k| obj.contains_key(*k))
            .ok_or_else(|| LoadError::MissingKey(FINAL_APPROACH_COORDINATE_KEY.to_string()))?;

        // The split flags predate the combined one; relative only if both were.
        let altitudes_are_relative = match (
            persist::bool_key(obj, ALTITUDES_ARE_RELATIVE_KEY),
            persist::bool_key(obj, DEPRECATED_LAND_ALTITUDE_RELATIVE_KEY),
            persist::bool_key(obj, DEPRECATED_LOITER_ALTITUDE_RELATIVE_KEY),
        ) {
            (Some(rel), _, _) => rel,
            (None, Some(land), Some(loiter)) => land && loiter,
            _ => return Err(LoadError::MissingKey(ALTITUDES_ARE_RELATIVE_KEY.to_string())),
        };

        let stop_taking_video = [STOP_TAKING_VIDEO_KEY, DEPRECATED_STOP_VIDEO_PHOTOS_KEY]
            .into_iter()
            .find_map(|k| persist::bool_key(obj, k))
            .ok_or_else(|| LoadError::MissingKey(STOP_TAKING_VIDEO_KEY.to_string()))?;

        let coordinate = |key: &str| {
            obj.get(key)
                .ok_or_else(|| LoadError::MissingKey(key.to_string()))
                .and_then(|v| persist::coordinate_from_json(key, v))
        };

        Ok(Self {
            final_approach: coordinate(final_approach_key)?,
            landing: coordinate(LAND_COORDINATE_KEY)?,
            transition_alt_m: persist::f64_key(obj, TRANSITION_ALTITUDE_KEY).unwrap_or_default(),
            transition_distance_m: persist::f64_key(obj, TRANSITION_DISTANCE_KEY).unwrap_or_default(),
            loiter_radius_m: persist::f64_key(obj, LOITER_RADIUS_KEY).unwrap_or_default(),
            loiter_clockwise: persist::bool_key(obj, LOITER_CLOCKWISE_KEY).unwrap_or(true),
            use_loiter_to_alt: persist::bool_key(obj, USE_LOITER_TO_ALT_KEY).unwrap_or(true),
            stop_taking_photos: persist::bool_key(obj, STOP_TAKING_PHOTOS_KEY).unwrap_or(false),
            stop_taking_video,
            altitudes_are_relative,
        })
    }

    fn from_items(
        approach: &MissionItem,
        transition: &MissionItem,
        land: &MissionItem,
        stop_taking_photos: bool,
        stop_taking_video: bool,
    ) -> Self {
        let landing = land.coordinate();
        let (loiter_radius_m, loiter_clockwise) = approach
            .loiter()
            .unwrap_or((LandingParam::LoiterRadius.meta().default.as_f64(), true));
        Self {
            final_approach: approach.coordinate(),
            landing,
            transition_alt_m: transition.param7,
            transition_distance_m: landing.distance_to(&transition.coordinate()),
            loiter_radius_m,
            loiter_clockwise,
            use_loiter_to_alt: approach.is_loiter_to_alt(),
            stop_taking_photos,
            stop_taking_video,
            altitudes_are_relative: land.is_relative_alt(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LandingPattern {
    params: ParamStore<LandingParam>,
    final_approach: Coordinate,
    loiter_tangent: Coordinate,
    transition: Coordinate,
    landing: Coordinate,
    state: PatternState,
}

impl RecalcGuard for LandingPattern {
    fn state(&self) -> &PatternState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PatternState {
        &mut self.state
    }
}

impl LandingPattern {
    pub fn new(context: PlanContext) -> Self {
        let params = ParamStore::<LandingParam>::new();
        let approach_alt = params.f64(LandingParam::FinalApproachAltitude);
        let origin = Coordinate::default();
        Self {
            final_approach: origin.with_altitude(approach_alt),
            loiter_tangent: origin.with_altitude(approach_alt),
            transition: origin.with_altitude(params.f64(LandingParam::TransitionAltitude)),
            landing: origin.with_altitude(params.f64(LandingParam::LandingAltitude)),
            params,
            state: PatternState::new(context),
        }
    }

    pub fn params(&self) -> &ParamStore<LandingParam> {
        &self.params
    }

    pub fn param(&self, key: LandingParam) -> f64 {
        self.params.f64(key)
    }

    pub fn set_param(&mut self, key: LandingParam, value: impl Into<ParamValue>) {
        if self.params.set_raw_value(key, value) {
            self.state.emit(PatternEvent::ParameterChanged { name: key.name() });
            self.on_param_changed(key);
        }
    }

    pub fn set_param_by_name(&mut self, name: &str, value: ParamValue) -> Result<bool, ParamError> {
        let (key, changed) = self.params.set_by_name(name, value)?;
        if changed {
            self.state.emit(PatternEvent::ParameterChanged { name: key.name() });
            self.on_param_changed(key);
        }
        Ok(changed)
    }

    fn on_param_changed(&mut self, key: LandingParam) {
        use LandingParam::*;
        match key {
            LandingDistance | LandingHeading | LoiterRadius | LoiterClockwise | UseLoiterToAlt
            | TransitionDistance => self.recalc_from_heading_and_distance(),
            FinalApproachAltitude => {
                let alt = self.param(key);
                self.store(CoordinateRole::FinalApproach, self.final_approach.with_altitude(alt));
                self.store(CoordinateRole::LoiterTangent, self.loiter_tangent.with_altitude(alt));
                self.calc_glide_slope();
                self.state.geometry_changed();
            }
            TransitionAltitude => {
                let alt = self.param(key);
                self.store(CoordinateRole::Transition, self.transition.with_altitude(alt));
                self.calc_glide_slope();
                self.state.geometry_changed();
            }
            LandingAltitude => {
                let alt = self.param(key);
                self.store(CoordinateRole::Landing, self.landing.with_altitude(alt));
                self.state.geometry_changed();
            }
            GlideSlope => self.glide_slope_changed(),
            StopTakingPhotos | StopTakingVideo => self.state.set_dirty(true),
        }
    }

    pub fn final_approach_coordinate(&self) -> Coordinate {
        self.final_approach
    }

    pub fn loiter_tangent_coordinate(&self) -> Coordinate {
        self.loiter_tangent
    }

    pub fn transition_coordinate(&self) -> Coordinate {
        self.transition
    }

    pub fn landing_coordinate(&self) -> Coordinate {
        self.landing
    }

    pub fn use_loiter_to_alt(&self) -> bool {
        self.params.bool(LandingParam::UseLoiterToAlt)
    }

    fn store(&mut self, role: CoordinateRole, c: Coordinate) {
        let slot = match role {
            CoordinateRole::FinalApproach => &mut self.final_approach,
            CoordinateRole::LoiterTangent => &mut self.loiter_tangent,
            CoordinateRole::Transition => &mut self.transition,
            CoordinateRole::Landing => &mut self.landing,
            CoordinateRole::VtolTakeoff | CoordinateRole::Climbout => return,
        };
        if *slot != c {
            *slot = c;
            self.state.emit_coordinate(role, c);
        }
    }

    /// Moves the landing point. The approach follows it unchanged in
    /// heading and distance; the first placement anchors the pattern.
    pub fn set_landing_coordinate(&mut self, c: Coordinate) {
        let c = c.with_altitude(self.param(LandingParam::LandingAltitude));
        if !self.state.coordinate_set {
            self.store(CoordinateRole::Landing, c);
            self.state.set_coordinate_set();
            debug!("landing: anchored on {:.7},{:.7}", c.latitude, c.longitude);
            self.recalc_from_heading_and_distance();
            return;
        }
        if c != self.landing {
            self.store(CoordinateRole::Landing, c);
            self.recalc_from_heading_and_distance();
        }
    }

    pub fn set_final_approach_coordinate(&mut self, c: Coordinate) {
        let c = c.with_altitude(self.param(LandingParam::FinalApproachAltitude));
        if c == self.final_approach {
            return;
        }
        self.store(CoordinateRole::FinalApproach, c);
        self.recalc_from_coordinate_change();
    }

    /// A dragged transition point sets the transition distance and is then
    /// put back on the approach line.
    pub fn set_transition_coordinate(&mut self, c: Coordinate) {
        let c = c.with_altitude(self.param(LandingParam::TransitionAltitude));
        if c == self.transition {
            return;
        }
        self.store(CoordinateRole::Transition, c);
        if self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        let d = self.landing.distance_to(&c).min(self.param(LandingParam::LandingDistance));
        if self.params.set_raw_value(LandingParam::TransitionDistance, d) {
            self.state.emit(PatternEvent::ParameterChanged { name: LandingParam::TransitionDistance.name() });
        }
        self.recalc_from_heading_and_distance();
    }

    fn loiter(&self) -> Option<Loiter> {
        self.use_loiter_to_alt().then(|| Loiter {
            radius_m: self.param(LandingParam::LoiterRadius),
            clockwise: self.params.bool(LandingParam::LoiterClockwise),
        })
    }

    fn bounds(&self) -> DistanceBounds {
        let dist = self.params.get(LandingParam::LandingDistance);
        let loiter = self.loiter().map(|l| l.radius_m);
        DistanceBounds::effective(dist.raw_min(), dist.raw_max(), loiter)
    }

    pub fn recalc_from_heading_and_distance(&mut self) {
        if self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        let sol = engine::approach_from_heading_and_distance(
            self.landing,
            self.param(LandingParam::LandingHeading),
            self.param(LandingParam::LandingDistance),
            self.param(LandingParam::TransitionDistance),
            self.loiter(),
            self.bounds(),
        );
        debug!("landing: recalc from heading {:.1} distance {:.1}", sol.heading_deg, sol.distance_m);
        self.apply_approach(sol);
    }

    pub fn recalc_from_coordinate_change(&mut self) {
        if self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        let sol = engine::approach_from_coordinates(
            self.landing,
            self.final_approach,
            self.param(LandingParam::TransitionDistance),
            self.param(LandingParam::LandingHeading),
            self.loiter(),
            self.bounds(),
        );
        debug!("landing: recalc from coordinates heading {:.1} distance {:.1}", sol.heading_deg, sol.distance_m);
        self.apply_approach(sol);
    }

    fn apply_approach(&mut self, sol: ApproachSolution) {
        self.state.recalcs += 1;
        let approach_alt = self.param(LandingParam::FinalApproachAltitude);
        let transition_alt = self.param(LandingParam::TransitionAltitude);
        self.suppressed(|p| {
            p.set_param(LandingParam::LandingDistance, sol.distance_m);
            p.set_param(LandingParam::LandingHeading, sol.heading_deg);
            p.set_param(LandingParam::TransitionDistance, sol.transition_distance_m);
            p.store(CoordinateRole::FinalApproach, sol.final_approach.with_altitude(approach_alt));
            p.store(CoordinateRole::LoiterTangent, sol.loiter_tangent.with_altitude(approach_alt));
            p.store(CoordinateRole::Transition, sol.transition.with_altitude(transition_alt));
        });
        self.calc_glide_slope();
        self.state.geometry_changed();
    }

    /// Glide slope edited: move the approach so the descent matches it.
    pub fn glide_slope_changed(&mut self) {
        if self.recalc_suppressed() {
            return;
        }
        let d = engine::landing_distance_from_glide_slope(
            self.param(LandingParam::FinalApproachAltitude),
            self.param(LandingParam::TransitionAltitude),
            self.param(LandingParam::GlideSlope),
            self.param(LandingParam::TransitionDistance),
        );
        debug!("landing: glide slope {:.2} gives distance {:.1}", self.param(LandingParam::GlideSlope), d);
        self.set_param(LandingParam::LandingDistance, d);
    }

    /// Re-measures the glide slope from altitudes and distances. A slope
    /// outside its bounds is nudged back in and, once anchored, the
    /// approach is moved to the distance the nudged slope implies.
    pub fn calc_glide_slope(&mut self) {
        let (fa, ta, ld, td) = (
            self.param(LandingParam::FinalApproachAltitude),
            self.param(LandingParam::TransitionAltitude),
            self.param(LandingParam::LandingDistance),
            self.param(LandingParam::TransitionDistance),
        );
        let slope_param = self.params.get(LandingParam::GlideSlope);
        let slope = engine::glide_slope(fa, ta, ld, td, slope_param.raw_min(), slope_param.raw_max());
        self.suppressed(|p| p.set_param(LandingParam::GlideSlope, slope));

        let measured = engine::measured_glide_slope(fa, ta, ld, td);
        if slope == measured || self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        // The clamp ends the re-solve when no distance reaches the slope.
        let d = self.bounds().clamp(engine::landing_distance_from_glide_slope(fa, ta, slope, td));
        if d != ld {
            debug!("landing: glide slope {:.2} nudged to {:.2}, distance {:.1}", measured, slope, d);
            self.set_param(LandingParam::LandingDistance, d);
        }
    }

    fn item_count(&self) -> u16 {
        3 + u16::from(self.params.bool(LandingParam::StopTakingPhotos))
            + u16::from(self.params.bool(LandingParam::StopTakingVideo))
    }

    pub fn append_mission_items(&self, items: &mut Vec<MissionItem>) {
        let frame = altitude_frame(self.state.altitudes_are_relative);
        let mut seq = self.state.sequence_number;
        let mut next = || {
            let s = seq;
            seq = seq.saturating_add(1);
            s
        };

        if self.params.bool(LandingParam::StopTakingPhotos) {
            items.push(MissionItem::stop_image_capture(next()));
        }
        if self.params.bool(LandingParam::StopTakingVideo) {
            items.push(MissionItem::stop_video_capture(next()));
        }
        match self.loiter() {
            Some(l) => items.push(MissionItem::loiter_to_alt(next(), frame, &self.final_approach, l.radius_m, l.clockwise)),
            None => items.push(MissionItem::waypoint(next(), frame, &self.final_approach)),
        }
        items.push(MissionItem::waypoint(next(), frame, &self.transition));
        items.push(MissionItem::vtol_land(next(), frame, &self.landing));
    }

    pub fn mission_items(&self) -> Vec<MissionItem> {
        let mut items = Vec::with_capacity(usize::from(self.item_count()));
        self.append_mission_items(&mut items);
        items
    }

    pub fn save(&self) -> Value {
        let mut obj = persist::header(JSON_COMPLEX_ITEM_TYPE);
        obj.insert(FINAL_APPROACH_COORDINATE_KEY.into(), persist::coordinate_to_json(&self.final_approach));
        obj.insert(LAND_COORDINATE_KEY.into(), persist::coordinate_to_json(&self.landing));
        obj.insert(LOITER_RADIUS_KEY.into(), json!(self.param(LandingParam::LoiterRadius)));
        obj.insert(LOITER_CLOCKWISE_KEY.into(), json!(self.params.bool(LandingParam::LoiterClockwise)));
        obj.insert(USE_LOITER_TO_ALT_KEY.into(), json!(self.use_loiter_to_alt()));
        obj.insert(TRANSITION_ALTITUDE_KEY.into(), json!(self.param(LandingParam::TransitionAltitude)));
        obj.insert(TRANSITION_DISTANCE_KEY.into(), json!(self.param(LandingParam::TransitionDistance)));
        obj.insert(STOP_TAKING_PHOTOS_KEY.into(), json!(self.params.bool(LandingParam::StopTakingPhotos)));
        obj.insert(STOP_TAKING_VIDEO_KEY.into(), json!(self.params.bool(LandingParam::StopTakingVideo)));
        obj.insert(ALTITUDES_ARE_RELATIVE_KEY.into(), json!(self.state.altitudes_are_relative));
        Value::Object(obj)
    }

    /// Restores a saved record. On error the pattern is left untouched.
    pub fn load(&mut self, v: &Value, sequence_number: u16) -> Result<(), LoadError> {
        let record = LandingRecord::from_json(v)?;
        self.restore(record, sequence_number);
        Ok(())
    }

    pub fn from_json(v: &Value, sequence_number: u16, context: PlanContext) -> Result<Self, LoadError> {
        let mut p = Self::new(context);
        p.load(v, sequence_number)?;
        Ok(p)
    }

    fn restore(&mut self, r: LandingRecord, sequence_number: u16) {
        self.suppressed(|p| {
            p.set_param(LandingParam::UseLoiterToAlt, r.use_loiter_to_alt);
            p.set_param(LandingParam::LoiterRadius, r.loiter_radius_m);
            p.set_param(LandingParam::LoiterClockwise, r.loiter_clockwise);
            p.set_param(LandingParam::FinalApproachAltitude, r.final_approach.altitude);
            p.set_param(LandingParam::TransitionAltitude, r.transition_alt_m);
            p.set_param(LandingParam::LandingAltitude, r.landing.altitude);
            p.set_param(LandingParam::TransitionDistance, r.transition_distance_m);
            p.set_param(LandingParam::StopTakingPhotos, r.stop_taking_photos);
            p.set_param(LandingParam::StopTakingVideo, r.stop_taking_video);
            p.store(CoordinateRole::FinalApproach, r.final_approach);
            p.store(CoordinateRole::Landing, r.landing);
        });
        self.state.set_sequence_number(sequence_number);
        self.state.set_altitudes_are_relative(r.altitudes_are_relative);
        self.state.set_coordinate_set();
        self.recalc_from_coordinate_change();
        self.state.set_dirty(false);
    }

    /// Recognizes `[stop photos?] [stop video?] approach, transition, land`
    /// at the front of `items`.
    pub fn scan_for_item(items: &[MissionItem], context: PlanContext) -> Option<(Self, usize)> {
        let first_seq = items.first()?.seq;
        let mut skipped = 0;
        let stop_photos = items.get(skipped).is_some_and(MissionItem::is_stop_image_capture);
        skipped += usize::from(stop_photos);
        let stop_video = items.get(skipped).is_some_and(MissionItem::is_stop_video_capture);
        skipped += usize::from(stop_video);

        let [approach, transition, land, ..] = &items[skipped..] else {
            return None;
        };
        if !land.is_land() {
            return None;
        }
        if !transition.is_plain_waypoint() || !(approach.is_loiter_to_alt() || approach.is_plain_waypoint()) {
            debug!("scan: land at seq {} without a matching approach", land.seq);
            return None;
        }

        let mut p = Self::new(context);
        p.restore(LandingRecord::from_items(approach, transition, land, stop_photos, stop_video), first_seq);
        p.state.take_events();
        Some((p, skipped + 3))
    }

    pub fn flush(&mut self, probe: &dyn TerrainProbe) -> bool {
        if !self.state.path.is_stale() {
            return false;
        }
        let segments = projector::landing_segments(self);
        let state = &mut self.state;
        state.path.rebuild(segments, probe, &mut state.events);
        true
    }

    pub fn flight_path(&self) -> &projector::FlightPath {
        &self.state.path
    }

    pub fn take_events(&mut self) -> Vec<PatternEvent> {
        self.state.take_events()
    }

    pub fn amsl_entry_alt(&self) -> f64 {
        self.state.context.amsl(self.param(LandingParam::FinalApproachAltitude), self.state.altitudes_are_relative)
    }

    /// The loiter ends at the final approach altitude.
    pub fn amsl_loiter_alt(&self) -> f64 {
        self.amsl_entry_alt()
    }

    pub fn amsl_transition_alt(&self) -> f64 {
        self.state.context.amsl(self.param(LandingParam::TransitionAltitude), self.state.altitudes_are_relative)
    }

    pub fn amsl_exit_alt(&self) -> f64 {
        self.state.context.amsl(self.param(LandingParam::LandingAltitude), self.state.altitudes_are_relative)
    }

    pub fn min_amsl_altitude(&self) -> f64 {
        self.amsl_entry_alt().min(self.amsl_transition_alt()).min(self.amsl_exit_alt())
    }

    pub fn max_amsl_altitude(&self) -> f64 {
        self.amsl_entry_alt().max(self.amsl_transition_alt()).max(self.amsl_exit_alt())
    }

    pub fn complex_distance(&self) -> f64 {
        self.final_approach.distance_to(&self.landing)
    }

    pub fn greatest_distance_to(&self, other: &Coordinate) -> f64 {
        [self.final_approach, self.loiter_tangent, self.transition, self.landing]
            .iter()
            .map(|c| c.distance_to(other))
            .fold(0.0, f64::max)
    }

    pub fn sequence_number(&self) -> u16 {
        self.state.sequence_number
    }

    pub fn last_sequence_number(&self) -> u16 {
        self.state.sequence_number.saturating_add(self.item_count() - 1)
    }

    pub fn set_sequence_number(&mut self, seq: u16) {
        self.state.set_sequence_number(seq);
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.state.set_dirty(dirty);
    }

    pub fn coordinate_is_set(&self) -> bool {
        self.state.coordinate_set
    }

    pub fn altitudes_are_relative(&self) -> bool {
        self.state.altitudes_are_relative
    }

    pub fn set_altitudes_are_relative(&mut self, relative: bool) {
        self.state.set_altitudes_are_relative(relative);
    }

    pub fn context(&self) -> &PlanContext {
        &self.state.context
    }

    /// Landing never anchors on home; only the AMSL base can change.
    pub fn set_context(&mut self, context: PlanContext) {
        if self.state.context != context {
            self.state.context = context;
            self.state.path.invalidate();
        }
    }

    pub fn ready_for_save(&self) -> ReadyForSave {
        if self.state.coordinate_set {
            ReadyForSave::Ready
        } else {
            ReadyForSave::NotReadyForSaveData
        }
    }

    pub fn recalc_count(&self) -> u64 {
        self.state.recalcs
    }
}
