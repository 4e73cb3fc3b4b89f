use vtolplan_geo::Coordinate;

use crate::context::PlanContext;
use crate::projector::FlightPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateRole {
    VtolTakeoff,
    Climbout,
    FinalApproach,
    LoiterTangent,
    Transition,
    Landing,
}

/// Change notifications a pattern queues for whoever renders or persists
/// it. Drained with `take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternEvent {
    CoordinateChanged { role: CoordinateRole, coordinate: Coordinate },
    ParameterChanged { name: &'static str },
    CoordinateSetChanged(bool),
    AltitudesAreRelativeChanged(bool),
    DirtyChanged(bool),
    SequenceNumberChanged(u16),
    FlightPathChanged,
    TerrainCollisionChanged(bool),
}

/// Bookkeeping shared by every pattern kind.
#[derive(Debug, Clone)]
pub struct PatternState {
    pub(crate) sequence_number: u16,
    pub(crate) dirty: bool,
    pub(crate) altitudes_are_relative: bool,
    pub(crate) coordinate_set: bool,
    pub(crate) ignore_recalc: bool,
    pub(crate) recalcs: u64,
    pub(crate) context: PlanContext,
    pub(crate) path: FlightPath,
    pub(crate) events: Vec<PatternEvent>,
}

impl PatternState {
    pub(crate) fn new(context: PlanContext) -> Self {
        Self {
            sequence_number: 0,
            dirty: false,
            altitudes_are_relative: true,
            coordinate_set: false,
            ignore_recalc: false,
            recalcs: 0,
            context,
            path: FlightPath::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, ev: PatternEvent) {
        self.events.push(ev);
    }

    pub(crate) fn emit_coordinate(&mut self, role: CoordinateRole, coordinate: Coordinate) {
        self.events.push(PatternEvent::CoordinateChanged { role, coordinate });
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.emit(PatternEvent::DirtyChanged(dirty));
        }
    }

    /// Anything that moves a point or an altitude: unsaved, and the flight
    /// path needs a rebuild at the next flush.
    pub(crate) fn geometry_changed(&mut self) {
        self.set_dirty(true);
        self.path.invalidate();
    }

    pub(crate) fn set_sequence_number(&mut self, seq: u16) {
        if self.sequence_number != seq {
            self.sequence_number = seq;
            self.emit(PatternEvent::SequenceNumberChanged(seq));
        }
    }

    pub(crate) fn set_altitudes_are_relative(&mut self, relative: bool) -> bool {
        if self.altitudes_are_relative == relative {
            return false;
        }
        self.altitudes_are_relative = relative;
        self.emit(PatternEvent::AltitudesAreRelativeChanged(relative));
        self.geometry_changed();
        true
    }

    pub(crate) fn set_coordinate_set(&mut self) {
        if !self.coordinate_set {
            self.coordinate_set = true;
            self.emit(PatternEvent::CoordinateSetChanged(true));
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<PatternEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Feedback gate for recalculations. While suppressed, derived values
/// written by a recalculation do not trigger another one.
pub trait RecalcGuard {
    fn state(&self) -> &PatternState;

    fn state_mut(&mut self) -> &mut PatternState;

    fn recalc_suppressed(&self) -> bool {
        self.state().ignore_recalc
    }

    /// Runs `f` with recalculation suppressed and restores the previous
    /// gate on the way out, whatever `f` returns.
    fn suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        let prev = std::mem::replace(&mut self.state_mut().ignore_recalc, true);
        let out = f(self);
        self.state_mut().ignore_recalc = prev;
        out
    }
}
