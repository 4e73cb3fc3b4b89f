//! Kind-tagged dispatch over the two pattern types.

use serde_json::Value;
use tracing::debug;
use vtolplan_geo::Coordinate;
use vtolplan_proto::MissionItem;

use crate::context::PlanContext;
use crate::error::LoadError;
use crate::landing::{self, LandingPattern};
use crate::persist;
use crate::projector::{FlightPath, TerrainProbe};
use crate::state::PatternEvent;
use crate::takeoff::{self, TakeoffPattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Takeoff,
    Landing,
}

impl PatternKind {
    pub fn json_type(self) -> &'static str {
        match self {
            PatternKind::Takeoff => takeoff::JSON_COMPLEX_ITEM_TYPE,
            PatternKind::Landing => landing::JSON_COMPLEX_ITEM_TYPE,
        }
    }

    /// Older type names still accepted on load. Saves always use `json_type`.
    pub fn legacy_json_types(self) -> &'static [&'static str] {
        match self {
            PatternKind::Takeoff => takeoff::LEGACY_JSON_COMPLEX_ITEM_TYPES,
            PatternKind::Landing => landing::LEGACY_JSON_COMPLEX_ITEM_TYPES,
        }
    }

    pub fn from_json_type(s: &str) -> Option<Self> {
        [PatternKind::Takeoff, PatternKind::Landing]
            .into_iter()
            .find(|k| k.json_type() == s || k.legacy_json_types().contains(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyForSave {
    Ready,
    NotReadyForSaveData,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Takeoff(TakeoffPattern),
    Landing(LandingPattern),
}

pub type Recognizer = fn(&[MissionItem], PlanContext) -> Option<(Pattern, usize)>;

fn scan_takeoff(items: &[MissionItem], ctx: PlanContext) -> Option<(Pattern, usize)> {
    TakeoffPattern::scan_for_item(items, ctx).map(|(p, n)| (Pattern::Takeoff(p), n))
}

fn scan_landing(items: &[MissionItem], ctx: PlanContext) -> Option<(Pattern, usize)> {
    LandingPattern::scan_for_item(items, ctx).map(|(p, n)| (Pattern::Landing(p), n))
}

/// Tried in order at every mission position.
pub const RECOGNIZERS: &[(PatternKind, Recognizer)] =
    &[(PatternKind::Takeoff, scan_takeoff), (PatternKind::Landing, scan_landing)];

/// First pattern recognized at the front of `items`, with the number of
/// items it consumed.
pub fn scan_for_pattern(items: &[MissionItem], ctx: PlanContext) -> Option<(Pattern, usize)> {
    RECOGNIZERS.iter().find_map(|(kind, scan)| {
        let hit = scan(items, ctx);
        if hit.is_some() {
            debug!("scan: recognized {:?} at seq {}", kind, items.first().map_or(0, |i| i.seq));
        }
        hit
    })
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            Pattern::Takeoff($p) => $body,
            Pattern::Landing($p) => $body,
        }
    };
}

impl Pattern {
    pub fn new(kind: PatternKind, ctx: PlanContext) -> Self {
        match kind {
            PatternKind::Takeoff => Pattern::Takeoff(TakeoffPattern::new(ctx)),
            PatternKind::Landing => Pattern::Landing(LandingPattern::new(ctx)),
        }
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Takeoff(_) => PatternKind::Takeoff,
            Pattern::Landing(_) => PatternKind::Landing,
        }
    }

    /// Loads any complex item record, picking the kind from its
    /// `complexItemType`.
    pub fn load(v: &Value, sequence_number: u16, ctx: PlanContext) -> Result<Self, LoadError> {
        let obj = persist::as_object(v)?;
        let type_name = obj
            .get(persist::COMPLEX_ITEM_TYPE_KEY)
            .ok_or_else(|| LoadError::MissingKey(persist::COMPLEX_ITEM_TYPE_KEY.to_string()))?
            .as_str()
            .ok_or(LoadError::WrongType { key: persist::COMPLEX_ITEM_TYPE_KEY.to_string(), expected: "string" })?;
        let kind = PatternKind::from_json_type(type_name)
            .ok_or_else(|| LoadError::UnknownComplexType(type_name.to_string()))?;
        Ok(match kind {
            PatternKind::Takeoff => Pattern::Takeoff(TakeoffPattern::from_json(v, sequence_number, ctx)?),
            PatternKind::Landing => Pattern::Landing(LandingPattern::from_json(v, sequence_number, ctx)?),
        })
    }

    pub fn save(&self) -> Value {
        dispatch!(self, p => p.save())
    }

    pub fn append_mission_items(&self, items: &mut Vec<MissionItem>) {
        dispatch!(self, p => p.append_mission_items(items))
    }

    pub fn mission_items(&self) -> Vec<MissionItem> {
        dispatch!(self, p => p.mission_items())
    }

    pub fn flush(&mut self, probe: &dyn TerrainProbe) -> bool {
        dispatch!(self, p => p.flush(probe))
    }

    pub fn flight_path(&self) -> &FlightPath {
        dispatch!(self, p => p.flight_path())
    }

    pub fn take_events(&mut self) -> Vec<PatternEvent> {
        dispatch!(self, p => p.take_events())
    }

    pub fn sequence_number(&self) -> u16 {
        dispatch!(self, p => p.sequence_number())
    }

    pub fn set_sequence_number(&mut self, seq: u16) {
        dispatch!(self, p => p.set_sequence_number(seq))
    }

    pub fn last_sequence_number(&self) -> u16 {
        dispatch!(self, p => p.last_sequence_number())
    }

    pub fn is_dirty(&self) -> bool {
        dispatch!(self, p => p.is_dirty())
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        dispatch!(self, p => p.set_dirty(dirty))
    }

    pub fn ready_for_save(&self) -> ReadyForSave {
        dispatch!(self, p => p.ready_for_save())
    }

    pub fn complex_distance(&self) -> f64 {
        dispatch!(self, p => p.complex_distance())
    }

    pub fn greatest_distance_to(&self, other: &Coordinate) -> f64 {
        dispatch!(self, p => p.greatest_distance_to(other))
    }

    pub fn amsl_entry_alt(&self) -> f64 {
        dispatch!(self, p => p.amsl_entry_alt())
    }

    pub fn amsl_exit_alt(&self) -> f64 {
        dispatch!(self, p => p.amsl_exit_alt())
    }

    pub fn min_amsl_altitude(&self) -> f64 {
        dispatch!(self, p => p.min_amsl_altitude())
    }

    pub fn max_amsl_altitude(&self) -> f64 {
        dispatch!(self, p => p.max_amsl_altitude())
    }

    pub fn set_altitudes_are_relative(&mut self, relative: bool) {
        dispatch!(self, p => p.set_altitudes_are_relative(relative))
    }

    pub fn set_context(&mut self, ctx: PlanContext) {
        dispatch!(self, p => p.set_context(ctx))
    }

    /// Entry point of the pattern as flown.
    pub fn entry_coordinate(&self) -> Coordinate {
        match self {
            Pattern::Takeoff(p) => p.vtol_takeoff_coordinate(),
            Pattern::Landing(p) => p.final_approach_coordinate(),
        }
    }

    pub fn exit_coordinate(&self) -> Coordinate {
        match self {
            Pattern::Takeoff(p) => p.climbout_coordinate(),
            Pattern::Landing(p) => p.landing_coordinate(),
        }
    }
}
