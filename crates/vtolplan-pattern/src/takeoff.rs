//! Two-point VTOL takeoff: vertical climb at the takeoff point, then a
//! climbout leg to the exit point.

use serde_json::{json, Value};
use tracing::debug;
use vtolplan_geo::Coordinate;
use vtolplan_proto::{altitude_frame, MissionItem};

use crate::context::PlanContext;
use crate::engine::{self, Anchor, DistanceBounds, LineSolution};
use crate::error::{LoadError, ParamError};
use crate::param::{ParamKey, ParamMeta, ParamStore, ParamValue};
use crate::pattern::ReadyForSave;
use crate::persist::{self, JsonKind, KeySpec};
use crate::projector::{self, TerrainProbe};
use crate::state::{CoordinateRole, PatternEvent, PatternState, RecalcGuard};

pub const JSON_COMPLEX_ITEM_TYPE: &str = "vtolTakeoffPattern";
/// Type names older planners saved takeoff patterns under.
pub const LEGACY_JSON_COMPLEX_ITEM_TYPES: &[&str] = &["VTOLTakeoffPattern"];

const VTOL_TAKEOFF_COORDINATE_KEY: &str = "vtolTakeoffCoordinate";
const CLIMBOUT_COORDINATE_KEY: &str = "climboutCoordinate";
const LOITER_RADIUS_KEY: &str = "loiterRadius";
const LOITER_CLOCKWISE_KEY: &str = "loiterClockwise";
const USE_LOITER_TO_ALT_KEY: &str = "useLoiterToAlt";
const ALTITUDES_ARE_RELATIVE_KEY: &str = "altitudesAreRelative";
// Older plans named the climbout point after the landing pattern's key.
const DEPRECATED_LAND_COORDINATE_KEY: &str = "landCoordinate";

const KEYS: &[KeySpec] = &[
    KeySpec::required(persist::VERSION_KEY, JsonKind::Number),
    KeySpec::optional(persist::TYPE_KEY, JsonKind::String),
    KeySpec::optional(persist::COMPLEX_ITEM_TYPE_KEY, JsonKind::String),
    KeySpec::required(VTOL_TAKEOFF_COORDINATE_KEY, JsonKind::Array),
    KeySpec::optional(CLIMBOUT_COORDINATE_KEY, JsonKind::Array),
    KeySpec::optional(DEPRECATED_LAND_COORDINATE_KEY, JsonKind::Array),
    KeySpec::required(LOITER_RADIUS_KEY, JsonKind::Number),
    KeySpec::required(LOITER_CLOCKWISE_KEY, JsonKind::Bool),
    KeySpec::optional(USE_LOITER_TO_ALT_KEY, JsonKind::Bool),
    KeySpec::required(ALTITUDES_ARE_RELATIVE_KEY, JsonKind::Bool),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoffParam {
    TakeoffDist,
    VtolAlt,
    ClimboutAlt,
    TakeoffHeading,
    LoiterRadius,
    LoiterClockwise,
    UseLoiterToAlt,
}

static META: [ParamMeta; 7] = [
    ParamMeta {
        name: "takeoffDist",
        default: ParamValue::Number(200.0),
        min: 10.0,
        max: 2000.0,
        units: "m",
        description: "Distance from the takeoff point to the climbout point.",
    },
    ParamMeta {
        name: "vtolAlt",
        default: ParamValue::Number(30.0),
        min: 5.0,
        max: 300.0,
        units: "m",
        description: "Altitude reached in VTOL mode before transitioning.",
    },
    ParamMeta {
        name: "climboutAlt",
        default: ParamValue::Number(60.0),
        min: 10.0,
        max: 1000.0,
        units: "m",
        description: "Altitude at the climbout point.",
    },
    ParamMeta {
        name: "takeoffHeading",
        default: ParamValue::Number(0.0),
        min: 0.0,
        max: 360.0,
        units: "deg",
        description: "Heading from the takeoff point to the climbout point.",
    },
    ParamMeta {
        name: "loiterRadius",
        default: ParamValue::Number(75.0),
        min: 5.0,
        max: 1000.0,
        units: "m",
        description: "Radius of the climbout loiter.",
    },
    ParamMeta {
        name: "loiterClockwise",
        default: ParamValue::Bool(true),
        min: 0.0,
        max: 1.0,
        units: "",
        description: "Climbout loiter direction.",
    },
    ParamMeta {
        name: "useLoiterToAlt",
        default: ParamValue::Bool(false),
        min: 0.0,
        max: 1.0,
        units: "",
        description: "Climb out with a loiter-to-altitude instead of a waypoint.",
    },
];

impl ParamKey for TakeoffParam {
    const ALL: &'static [Self] = &[
        TakeoffParam::TakeoffDist,
        TakeoffParam::VtolAlt,
        TakeoffParam::ClimboutAlt,
        TakeoffParam::TakeoffHeading,
        TakeoffParam::LoiterRadius,
        TakeoffParam::LoiterClockwise,
        TakeoffParam::UseLoiterToAlt,
    ];

    fn meta(self) -> &'static ParamMeta {
        &META[self as usize]
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Everything a load or a scan restores, validated before the pattern is
/// touched.
#[derive(Debug, Clone, PartialEq)]
struct TakeoffRecord {
    vtol_takeoff: Coordinate,
    climbout: Coordinate,
    loiter_radius_m: f64,
    loiter_clockwise: bool,
    use_loiter_to_alt: bool,
    altitudes_are_relative: bool,
}

impl TakeoffRecord {
    fn from_json(v: &Value) -> Result<Self, LoadError> {
        let obj = persist::as_object(v)?;
        persist::check_header(obj, JSON_COMPLEX_ITEM_TYPE, LEGACY_JSON_COMPLEX_ITEM_TYPES)?;
        persist::validate_keys(obj, JSON_COMPLEX_ITEM_TYPE, KEYS)?;

        let climbout_key = [CLIMBOUT_COORDINATE_KEY, DEPRECATED_LAND_COORDINATE_KEY]
            .into_iter()
            .find(|k| obj.contains_key(*k))
            .ok_or_else(|| LoadError::MissingKey(CLIMBOUT_COORDINATE_KEY.to_string()))?;

        let coordinate = |key: &str| {
            obj.get(key)
                .ok_or_else(|| LoadError::MissingKey(key.to_string()))
                .and_then(|v| persist::coordinate_from_json(key, v))
        };

        Ok(Self {
            vtol_takeoff: coordinate(VTOL_TAKEOFF_COORDINATE_KEY)?,
            climbout: coordinate(climbout_key)?,
            loiter_radius_m: persist::f64_key(obj, LOITER_RADIUS_KEY).unwrap_or_default(),
            loiter_clockwise: persist::bool_key(obj, LOITER_CLOCKWISE_KEY).unwrap_or(true),
            use_loiter_to_alt: persist::bool_key(obj, USE_LOITER_TO_ALT_KEY).unwrap_or(true),
            altitudes_are_relative: persist::bool_key(obj, ALTITUDES_ARE_RELATIVE_KEY).unwrap_or(true),
        })
    }

    fn from_items(takeoff: &MissionItem, climbout: &MissionItem) -> Self {
        let (loiter_radius_m, loiter_clockwise) = climbout
            .loiter()
            .unwrap_or((TakeoffParam::LoiterRadius.meta().default.as_f64(), true));
        Self {
            vtol_takeoff: takeoff.coordinate(),
            climbout: climbout.coordinate(),
            loiter_radius_m,
            loiter_clockwise,
            use_loiter_to_alt: climbout.is_loiter_to_alt(),
            altitudes_are_relative: climbout.is_relative_alt(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TakeoffPattern {
    params: ParamStore<TakeoffParam>,
    vtol_takeoff: Coordinate,
    climbout: Coordinate,
    state: PatternState,
}

impl RecalcGuard for TakeoffPattern {
    fn state(&self) -> &PatternState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PatternState {
        &mut self.state
    }
}

impl TakeoffPattern {
    pub fn new(context: PlanContext) -> Self {
        let params = ParamStore::<TakeoffParam>::new();
        let vtol_takeoff = Coordinate::default().with_altitude(params.f64(TakeoffParam::VtolAlt));
        let climbout = Coordinate::default().with_altitude(params.f64(TakeoffParam::ClimboutAlt));
        Self { params, vtol_takeoff, climbout, state: PatternState::new(context) }
    }

    pub fn params(&self) -> &ParamStore<TakeoffParam> {
        &self.params
    }

    pub fn param(&self, key: TakeoffParam) -> f64 {
        self.params.f64(key)
    }

    /// Stores the raw value and runs whatever depends on it.
    pub fn set_param(&mut self, key: TakeoffParam, value: impl Into<ParamValue>) {
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

    fn on_param_changed(&mut self, key: TakeoffParam) {
        match key {
            TakeoffParam::TakeoffDist
            | TakeoffParam::TakeoffHeading
            | TakeoffParam::UseLoiterToAlt
            | TakeoffParam::LoiterRadius => self.recalc_from_heading_and_distance(),
            TakeoffParam::VtolAlt => {
                let c = self.vtol_takeoff.with_altitude(self.param(key));
                self.store_vtol_takeoff(c);
                self.state.geometry_changed();
            }
            TakeoffParam::ClimboutAlt => {
                let c = self.climbout.with_altitude(self.param(key));
                self.store_climbout(c);
                self.state.geometry_changed();
            }
            TakeoffParam::LoiterClockwise => self.state.set_dirty(true),
        }
    }

    pub fn vtol_takeoff_coordinate(&self) -> Coordinate {
        self.vtol_takeoff
    }

    pub fn climbout_coordinate(&self) -> Coordinate {
        self.climbout
    }

    pub fn use_loiter_to_alt(&self) -> bool {
        self.params.bool(TakeoffParam::UseLoiterToAlt)
    }

    /// Moves the takeoff point. The first placement anchors the pattern and
    /// derives the climbout from heading and distance.
    pub fn set_vtol_takeoff_coordinate(&mut self, c: Coordinate) {
        let c = c.with_altitude(self.param(TakeoffParam::VtolAlt));
        if !self.state.coordinate_set {
            self.store_vtol_takeoff(c);
            self.state.set_coordinate_set();
            debug!("takeoff: anchored on takeoff point {:.7},{:.7}", c.latitude, c.longitude);
            self.recalc_from_heading_and_distance();
            return;
        }
        if c != self.vtol_takeoff {
            self.store_vtol_takeoff(c);
            self.recalc_from_coordinate_change();
        }
    }

    /// Moves the climbout point. Placed before the takeoff point, it
    /// derives the takeoff point behind it and the pattern anchors there.
    pub fn set_climbout_coordinate(&mut self, c: Coordinate) {
        let c = c.with_altitude(self.param(TakeoffParam::ClimboutAlt));
        if !self.state.coordinate_set {
            self.store_climbout(c);
            let sol = engine::line_from_heading_and_distance(
                self.vtol_takeoff,
                self.climbout,
                Anchor::Exit,
                self.param(TakeoffParam::TakeoffHeading),
                self.param(TakeoffParam::TakeoffDist),
                self.bounds(),
                self.state.context.valid_home(),
            );
            self.state.set_coordinate_set();
            debug!("takeoff: anchored from climbout point {:.7},{:.7}", c.latitude, c.longitude);
            self.apply_line(sol);
            return;
        }
        if c != self.climbout {
            self.store_climbout(c);
            self.recalc_from_coordinate_change();
        }
    }

    fn store_vtol_takeoff(&mut self, c: Coordinate) {
        if c != self.vtol_takeoff {
            self.vtol_takeoff = c;
            self.state.emit_coordinate(CoordinateRole::VtolTakeoff, c);
        }
    }

    fn store_climbout(&mut self, c: Coordinate) {
        if c != self.climbout {
            self.climbout = c;
            self.state.emit_coordinate(CoordinateRole::Climbout, c);
        }
    }

    fn bounds(&self) -> DistanceBounds {
        let dist = self.params.get(TakeoffParam::TakeoffDist);
        let loiter = self.use_loiter_to_alt().then(|| self.param(TakeoffParam::LoiterRadius));
        DistanceBounds::effective(dist.raw_min(), dist.raw_max(), loiter)
    }

    /// Parameters are ground truth; the climbout is re-placed from the
    /// takeoff point (or home, when the vehicle reports one).
    pub fn recalc_from_heading_and_distance(&mut self) {
        if self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        let sol = engine::line_from_heading_and_distance(
            self.vtol_takeoff,
            self.climbout,
            Anchor::Entry,
            self.param(TakeoffParam::TakeoffHeading),
            self.param(TakeoffParam::TakeoffDist),
            self.bounds(),
            self.state.context.valid_home(),
        );
        debug!("takeoff: recalc from heading {:.1} distance {:.1}", sol.heading_deg, sol.distance_m);
        self.apply_line(sol);
    }

    /// Coordinates are ground truth; heading and distance are measured and
    /// the climbout snaps onto the clamped distance.
    pub fn recalc_from_coordinate_change(&mut self) {
        if self.recalc_suppressed() || !self.state.coordinate_set {
            return;
        }
        let sol = engine::line_from_coordinates(
            self.vtol_takeoff,
            self.climbout,
            self.param(TakeoffParam::TakeoffHeading),
            self.bounds(),
            self.state.context.valid_home(),
        );
        debug!("takeoff: recalc from coordinates heading {:.1} distance {:.1}", sol.heading_deg, sol.distance_m);
        self.apply_line(sol);
    }

    fn apply_line(&mut self, sol: LineSolution) {
        self.state.recalcs += 1;
        self.suppressed(|p| {
            p.set_param(TakeoffParam::TakeoffDist, sol.distance_m);
            p.set_param(TakeoffParam::TakeoffHeading, sol.heading_deg);
            p.store_vtol_takeoff(sol.entry);
            p.store_climbout(sol.exit);
        });
        self.state.geometry_changed();
    }

    pub fn append_mission_items(&self, items: &mut Vec<MissionItem>) {
        let frame = altitude_frame(self.state.altitudes_are_relative);
        let seq = self.state.sequence_number;
        let next = seq.saturating_add(1);
        items.push(MissionItem::vtol_takeoff(seq, frame, &self.vtol_takeoff));
        if self.use_loiter_to_alt() {
            items.push(MissionItem::loiter_to_alt(
                next,
                frame,
                &self.climbout,
                self.param(TakeoffParam::LoiterRadius),
                self.params.bool(TakeoffParam::LoiterClockwise),
            ));
        } else {
            items.push(MissionItem::waypoint(next, frame, &self.climbout));
        }
    }

    pub fn mission_items(&self) -> Vec<MissionItem> {
        let mut items = Vec::with_capacity(2);
        self.append_mission_items(&mut items);
        items
    }

    pub fn save(&self) -> Value {
        let mut obj = persist::header(JSON_COMPLEX_ITEM_TYPE);
        obj.insert(VTOL_TAKEOFF_COORDINATE_KEY.into(), persist::coordinate_to_json(&self.vtol_takeoff));
        obj.insert(CLIMBOUT_COORDINATE_KEY.into(), persist::coordinate_to_json(&self.climbout));
        obj.insert(LOITER_RADIUS_KEY.into(), json!(self.param(TakeoffParam::LoiterRadius)));
        obj.insert(LOITER_CLOCKWISE_KEY.into(), json!(self.params.bool(TakeoffParam::LoiterClockwise)));
        obj.insert(USE_LOITER_TO_ALT_KEY.into(), json!(self.use_loiter_to_alt()));
        obj.insert(ALTITUDES_ARE_RELATIVE_KEY.into(), json!(self.state.altitudes_are_relative));
        Value::Object(obj)
    }

    /// Restores a saved record. On error the pattern is left untouched.
    pub fn load(&mut self, v: &Value, sequence_number: u16) -> Result<(), LoadError> {
        let record = TakeoffRecord::from_json(v)?;
        self.restore(record, sequence_number);
        Ok(())
    }

    pub fn from_json(v: &Value, sequence_number: u16, context: PlanContext) -> Result<Self, LoadError> {
        let mut p = Self::new(context);
        p.load(v, sequence_number)?;
        Ok(p)
    }

    fn restore(&mut self, r: TakeoffRecord, sequence_number: u16) {
        self.suppressed(|p| {
            p.set_param(TakeoffParam::UseLoiterToAlt, r.use_loiter_to_alt);
            p.set_param(TakeoffParam::LoiterRadius, r.loiter_radius_m);
            p.set_param(TakeoffParam::LoiterClockwise, r.loiter_clockwise);
            p.set_param(TakeoffParam::VtolAlt, r.vtol_takeoff.altitude);
            p.set_param(TakeoffParam::ClimboutAlt, r.climbout.altitude);
            p.store_vtol_takeoff(r.vtol_takeoff);
            p.store_climbout(r.climbout);
        });
        self.state.set_sequence_number(sequence_number);
        self.state.set_altitudes_are_relative(r.altitudes_are_relative);
        self.state.set_coordinate_set();
        self.recalc_from_coordinate_change();
        self.state.set_dirty(false);
    }

    /// Recognizes `[VTOL takeoff, climbout]` at the front of `items`.
    pub fn scan_for_item(items: &[MissionItem], context: PlanContext) -> Option<(Self, usize)> {
        let [takeoff, climbout, ..] = items else {
            return None;
        };
        if !takeoff.is_vtol_takeoff() {
            return None;
        }
        if !(climbout.is_loiter_to_alt() || climbout.is_plain_waypoint()) {
            debug!("scan: takeoff at seq {} not followed by a climbout item", takeoff.seq);
            return None;
        }

        let mut p = Self::new(context);
        p.restore(TakeoffRecord::from_items(takeoff, climbout), takeoff.seq);
        p.state.take_events();
        Some((p, 2))
    }

    /// Rebuilds the flight path if anything changed since the last flush.
    pub fn flush(&mut self, probe: &dyn TerrainProbe) -> bool {
        if !self.state.path.is_stale() {
            return false;
        }
        let segments = projector::takeoff_segments(self);
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

    pub fn amsl_ground_alt(&self) -> f64 {
        self.state.context.amsl(0.0, self.state.altitudes_are_relative)
    }

    pub fn amsl_entry_alt(&self) -> f64 {
        self.state.context.amsl(self.param(TakeoffParam::VtolAlt), self.state.altitudes_are_relative)
    }

    pub fn amsl_exit_alt(&self) -> f64 {
        self.state.context.amsl(self.param(TakeoffParam::ClimboutAlt), self.state.altitudes_are_relative)
    }

    pub fn min_amsl_altitude(&self) -> f64 {
        self.amsl_entry_alt().min(self.amsl_exit_alt())
    }

    pub fn max_amsl_altitude(&self) -> f64 {
        self.amsl_entry_alt().max(self.amsl_exit_alt())
    }

    pub fn complex_distance(&self) -> f64 {
        self.vtol_takeoff.distance_to(&self.climbout)
    }

    pub fn greatest_distance_to(&self, other: &Coordinate) -> f64 {
        self.vtol_takeoff.distance_to(other).max(self.climbout.distance_to(other))
    }

    pub fn sequence_number(&self) -> u16 {
        self.state.sequence_number
    }

    pub fn last_sequence_number(&self) -> u16 {
        self.state.sequence_number.saturating_add(1)
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

    /// A newly valid vehicle home pins the takeoff point to it.
    pub fn set_context(&mut self, context: PlanContext) {
        if self.state.context == context {
            return;
        }
        self.state.context = context;
        self.state.path.invalidate();
        if context.valid_home().is_some() {
            self.recalc_from_heading_and_distance();
        }
    }

    pub fn ready_for_save(&self) -> ReadyForSave {
        if self.state.coordinate_set {
            ReadyForSave::Ready
        } else {
            ReadyForSave::NotReadyForSaveData
        }
    }

    pub fn apply_new_altitude(&mut self, altitude_m: f64) {
        self.set_param(TakeoffParam::ClimboutAlt, altitude_m);
    }

    pub fn recalc_count(&self) -> u64 {
        self.state.recalcs
    }
}
