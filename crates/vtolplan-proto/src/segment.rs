use serde::{Deserialize, Serialize};
use vtolplan_geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Takeoff,
    Land,
    Generic,
}

/// One straight 3-D leg of a pattern's flight path, altitudes AMSL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPathSegment {
    pub kind: SegmentKind,
    pub start: Coordinate,
    pub start_amsl_m: f64,
    pub end: Coordinate,
    pub end_amsl_m: f64,
    pub terrain_collision: bool,
}

impl FlightPathSegment {
    pub fn new(kind: SegmentKind, start: Coordinate, start_amsl_m: f64, end: Coordinate, end_amsl_m: f64) -> Self {
        Self { kind, start, start_amsl_m, end, end_amsl_m, terrain_collision: false }
    }

    pub fn horizontal_length_m(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn climb_m(&self) -> f64 {
        self.end_amsl_m - self.start_amsl_m
    }
}
