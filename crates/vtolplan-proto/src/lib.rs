pub mod mission;
pub mod segment;

pub use mission::{altitude_frame, MissionItem};
pub use segment::{FlightPathSegment, SegmentKind};
