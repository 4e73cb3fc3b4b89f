use std::fmt;

use mavlink::common::{MavCmd, MavFrame};
use vtolplan_geo::Coordinate;

/// A single mission command as handed to / received from the mission
/// upload path. Params follow MAVLink MISSION_ITEM numbering
/// (param5/6/7 = lat/lon/alt for NAV commands).
#[derive(Debug, Clone, PartialEq)]
pub struct MissionItem {
    pub seq: u16,
    pub command: MavCmd,
    pub frame: MavFrame,
    pub param1: f64,
    pub param2: f64,
    pub param3: f64,
    pub param4: f64,
    pub param5: f64,
    pub param6: f64,
    pub param7: f64,
    pub autocontinue: bool,
    pub current: bool,
}

impl MissionItem {
    pub fn new(seq: u16, command: MavCmd, frame: MavFrame, params: [f64; 7]) -> Self {
        let [param1, param2, param3, param4, param5, param6, param7] = params;
        Self {
            seq,
            command,
            frame,
            param1,
            param2,
            param3,
            param4,
            param5,
            param6,
            param7,
            autocontinue: true,
            current: false,
        }
    }

    /// Plain pass-through waypoint: no hold, default acceptance, yaw unset.
    pub fn waypoint(seq: u16, frame: MavFrame, at: &Coordinate) -> Self {
        Self::new(
            seq,
            MavCmd::MAV_CMD_NAV_WAYPOINT,
            frame,
            [0.0, 0.0, 0.0, f64::NAN, at.latitude, at.longitude, at.altitude],
        )
    }

    /// Loiter-to-altitude with heading required and tangent exit. The
    /// radius sign encodes the turn direction (positive is clockwise).
    pub fn loiter_to_alt(seq: u16, frame: MavFrame, at: &Coordinate, radius_m: f64, clockwise: bool) -> Self {
        let radius = if clockwise { radius_m } else { -radius_m };
        Self::new(
            seq,
            MavCmd::MAV_CMD_NAV_LOITER_TO_ALT,
            frame,
            [1.0, radius, 0.0, 1.0, at.latitude, at.longitude, at.altitude],
        )
    }

    pub fn vtol_takeoff(seq: u16, frame: MavFrame, at: &Coordinate) -> Self {
        Self::new(
            seq,
            MavCmd::MAV_CMD_NAV_VTOL_TAKEOFF,
            frame,
            [0.0, 0.0, 0.0, f64::NAN, at.latitude, at.longitude, at.altitude],
        )
    }

    pub fn vtol_land(seq: u16, frame: MavFrame, at: &Coordinate) -> Self {
        Self::new(
            seq,
            MavCmd::MAV_CMD_NAV_VTOL_LAND,
            frame,
            [0.0, 0.0, 0.0, f64::NAN, at.latitude, at.longitude, at.altitude],
        )
    }

    pub fn stop_image_capture(seq: u16) -> Self {
        Self::new(seq, MavCmd::MAV_CMD_IMAGE_STOP_CAPTURE, MavFrame::MAV_FRAME_MISSION, [0.0; 7])
    }

    pub fn stop_video_capture(seq: u16) -> Self {
        Self::new(seq, MavCmd::MAV_CMD_VIDEO_STOP_CAPTURE, MavFrame::MAV_FRAME_MISSION, [0.0; 7])
    }

    fn has_nav_signature(&self) -> bool {
        self.param1 == 0.0
            && self.param2 == 0.0
            && self.param3 == 0.0
            && self.param4.is_nan()
            && self.is_global_frame()
            && self.has_finite_position()
    }

    pub fn is_plain_waypoint(&self) -> bool {
        self.command == MavCmd::MAV_CMD_NAV_WAYPOINT && self.has_nav_signature()
    }

    pub fn is_loiter_to_alt(&self) -> bool {
        self.command == MavCmd::MAV_CMD_NAV_LOITER_TO_ALT
            && self.param1 == 1.0
            && self.param3 == 0.0
            && self.param4 == 1.0
            && self.is_global_frame()
            && self.has_finite_position()
    }

    pub fn is_vtol_takeoff(&self) -> bool {
        self.command == MavCmd::MAV_CMD_NAV_VTOL_TAKEOFF && self.has_nav_signature()
    }

    /// VTOL land, or a plain land written by older planners.
    pub fn is_land(&self) -> bool {
        matches!(self.command, MavCmd::MAV_CMD_NAV_VTOL_LAND | MavCmd::MAV_CMD_NAV_LAND) && self.has_nav_signature()
    }

    pub fn is_stop_image_capture(&self) -> bool {
        self.command == MavCmd::MAV_CMD_IMAGE_STOP_CAPTURE
    }

    pub fn is_stop_video_capture(&self) -> bool {
        self.command == MavCmd::MAV_CMD_VIDEO_STOP_CAPTURE
    }

    /// Radius and direction of a loiter item, `None` for anything else.
    pub fn loiter(&self) -> Option<(f64, bool)> {
        self.is_loiter_to_alt().then(|| (self.param2.abs(), self.param2 >= 0.0))
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.param5, self.param6, self.param7)
    }

    pub fn has_finite_position(&self) -> bool {
        self.param5.is_finite() && self.param6.is_finite() && self.param7.is_finite()
    }

    /// True for the two frames patterns are emitted in.
    pub fn is_global_frame(&self) -> bool {
        matches!(self.frame, MavFrame::MAV_FRAME_GLOBAL | MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT)
    }

    pub fn is_relative_alt(&self) -> bool {
        self.frame == MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT
    }
}

pub fn altitude_frame(altitudes_are_relative: bool) -> MavFrame {
    if altitudes_are_relative {
        MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT
    } else {
        MavFrame::MAV_FRAME_GLOBAL
    }
}

impl fmt::Display for MissionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {:?} {:?} p1={} p2={} p3={} p4={} lat={:.7} lon={:.7} alt={:.1}",
            self.seq,
            self.command,
            self.frame,
            self.param1,
            self.param2,
            self.param3,
            self.param4,
            self.param5,
            self.param6,
            self.param7,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_signature() {
        let wp = MissionItem::waypoint(4, altitude_frame(true), &Coordinate::new(1.0, 2.0, 3.0));
        assert_eq!(wp.command, MavCmd::MAV_CMD_NAV_WAYPOINT);
        assert_eq!(wp.frame, MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT);
        assert_eq!((wp.param1, wp.param2, wp.param3), (0.0, 0.0, 0.0));
        assert!(wp.param4.is_nan());
        assert_eq!(wp.coordinate(), Coordinate::new(1.0, 2.0, 3.0));
        assert!(wp.autocontinue);
        assert!(!wp.current);
        assert!(wp.is_global_frame() && wp.is_relative_alt());
    }

    #[test]
    fn loiter_radius_sign_encodes_direction() {
        let at = Coordinate::new(47.0, 8.0, 60.0);
        let cw = MissionItem::loiter_to_alt(1, altitude_frame(false), &at, 75.0, true);
        let ccw = MissionItem::loiter_to_alt(1, altitude_frame(false), &at, 75.0, false);
        assert_eq!(cw.param2, 75.0);
        assert_eq!(ccw.param2, -75.0);
        assert_eq!(cw.loiter(), Some((75.0, true)));
        assert_eq!(ccw.loiter(), Some((75.0, false)));
        assert!(!cw.is_plain_waypoint());
    }

    #[test]
    fn nav_predicates_reject_wrong_params() {
        let at = Coordinate::new(47.0, 8.0, 30.0);
        let mut land = MissionItem::vtol_land(3, altitude_frame(true), &at);
        assert!(land.is_land());
        land.command = MavCmd::MAV_CMD_NAV_LAND;
        assert!(land.is_land());
        land.param4 = 0.0;
        assert!(!land.is_land());

        let mut takeoff = MissionItem::vtol_takeoff(0, altitude_frame(true), &at);
        assert!(takeoff.is_vtol_takeoff());
        takeoff.param7 = f64::NAN;
        assert!(!takeoff.is_vtol_takeoff());
    }

    #[test]
    fn mission_frame_is_not_global() {
        let it = MissionItem::new(0, MavCmd::MAV_CMD_IMAGE_STOP_CAPTURE, MavFrame::MAV_FRAME_MISSION, [0.0; 7]);
        assert!(!it.is_global_frame());
    }
}
