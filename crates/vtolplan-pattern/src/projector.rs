use vtolplan_proto::{FlightPathSegment, SegmentKind};

use crate::landing::LandingPattern;
use crate::state::PatternEvent;
use crate::takeoff::TakeoffPattern;

/// External terrain check. The projector only counts what this reports.
pub trait TerrainProbe {
    fn collides(&self, segment: &FlightPathSegment) -> bool;
}

/// Probe for planning without terrain data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl TerrainProbe for NoTerrain {
    fn collides(&self, _segment: &FlightPathSegment) -> bool {
        false
    }
}

impl<F> TerrainProbe for F
where
    F: Fn(&FlightPathSegment) -> bool,
{
    fn collides(&self, segment: &FlightPathSegment) -> bool {
        self(segment)
    }
}

/// Rendered flight path of one pattern. Always rebuilt from scratch.
#[derive(Debug, Clone)]
pub struct FlightPath {
    segments: Vec<FlightPathSegment>,
    collisions: usize,
    stale: bool,
    rebuilds: u64,
}

impl Default for FlightPath {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightPath {
    /// Starts stale so the first flush builds it.
    pub fn new() -> Self {
        Self { segments: Vec::new(), collisions: 0, stale: true, rebuilds: 0 }
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn segments(&self) -> &[FlightPathSegment] {
        &self.segments
    }

    pub fn terrain_collisions(&self) -> usize {
        self.collisions
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub(crate) fn rebuild(
        &mut self,
        segments: Vec<FlightPathSegment>,
        probe: &dyn TerrainProbe,
        events: &mut Vec<PatternEvent>,
    ) {
        if self.collisions != 0 {
            self.collisions = 0;
            events.push(PatternEvent::TerrainCollisionChanged(false));
        }

        self.segments.clear();
        for mut seg in segments {
            if probe.collides(&seg) {
                seg.terrain_collision = true;
                self.collisions += 1;
            }
            self.segments.push(seg);
        }
        self.stale = false;
        self.rebuilds += 1;
        events.push(PatternEvent::FlightPathChanged);

        if self.collisions != 0 {
            events.push(PatternEvent::TerrainCollisionChanged(true));
        }
    }
}

/// Vertical VTOL climb at the takeoff point, then the climbout leg.
pub fn takeoff_segments(p: &TakeoffPattern) -> Vec<FlightPathSegment> {
    let entry = p.vtol_takeoff_coordinate();
    vec![
        FlightPathSegment::new(SegmentKind::Takeoff, entry, p.amsl_ground_alt(), entry, p.amsl_entry_alt()),
        FlightPathSegment::new(
            SegmentKind::Generic,
            entry,
            p.amsl_entry_alt(),
            p.climbout_coordinate(),
            p.amsl_exit_alt(),
        ),
    ]
}

/// Approach legs in flight order, ending with the vertical descent which
/// is tagged as a land segment.
pub fn landing_segments(p: &LandingPattern) -> Vec<FlightPathSegment> {
    let mut out = Vec::with_capacity(4);
    let entry = p.final_approach_coordinate();
    let transition = p.transition_coordinate();
    let landing = p.landing_coordinate();

    if p.use_loiter_to_alt() {
        let tangent = p.loiter_tangent_coordinate();
        out.push(FlightPathSegment::new(SegmentKind::Generic, entry, p.amsl_entry_alt(), tangent, p.amsl_loiter_alt()));
        out.push(FlightPathSegment::new(
            SegmentKind::Generic,
            tangent,
            p.amsl_loiter_alt(),
            transition,
            p.amsl_transition_alt(),
        ));
    } else {
        out.push(FlightPathSegment::new(
            SegmentKind::Generic,
            entry,
            p.amsl_entry_alt(),
            transition,
            p.amsl_transition_alt(),
        ));
    }

    out.push(FlightPathSegment::new(
        SegmentKind::Generic,
        transition,
        p.amsl_transition_alt(),
        landing,
        p.amsl_transition_alt(),
    ));
    out.push(FlightPathSegment::new(
        SegmentKind::Land,
        landing,
        p.amsl_transition_alt(),
        landing,
        p.amsl_exit_alt(),
    ));
    out
}
