//! Pure geometry behind the takeoff and landing patterns.
//!
//! Every pattern has two dual derivations. "From heading and distance"
//! treats the parameters as ground truth and places the derived
//! coordinates; "from coordinates" measures heading and distance from the
//! points the operator moved and then re-derives the far point so it sits
//! exactly on the clamped distance. Both go through the same
//! [`DistanceBounds`], so the two representations never drift apart.

use vtolplan_geo::{normalize_heading, Coordinate};

/// Below this many meters two points are treated as coincident and no
/// azimuth is measured between them.
const COINCIDENT_M: f64 = 1e-6;

/// Inset applied when a computed glide slope hits a bound.
pub const GLIDE_SLOPE_NUDGE_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBounds {
    pub min: f64,
    pub max: f64,
}

impl DistanceBounds {
    /// Bounds for a pattern distance. With loiter-to-altitude the loiter
    /// circle must fit between the two ends, so its radius raises the
    /// minimum.
    pub fn effective(raw_min: f64, raw_max: f64, loiter_radius_m: Option<f64>) -> Self {
        let min = raw_min + loiter_radius_m.unwrap_or(0.0).max(0.0);
        Self { min, max: raw_max.max(min) }
    }

    pub fn clamp(&self, d: f64) -> f64 {
        if !(d >= self.min) {
            self.min
        } else if d > self.max {
            self.max
        } else {
            d
        }
    }

    pub fn contains(&self, d: f64) -> bool {
        d >= self.min && d <= self.max
    }
}

/// Which end of a two-point pattern stays put when the other is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loiter {
    pub radius_m: f64,
    pub clockwise: bool,
}

impl Loiter {
    fn turn_sign(&self) -> f64 {
        if self.clockwise { -1.0 } else { 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSolution {
    pub entry: Coordinate,
    pub exit: Coordinate,
    pub heading_deg: f64,
    pub distance_m: f64,
}

/// Two-point pattern (takeoff) driven by heading and distance.
///
/// With a usable vehicle home the entry is pinned to home, the heading is
/// re-measured towards the current exit and the exit is re-placed along
/// it. Without one the non-anchored end is derived from the anchored end.
pub fn line_from_heading_and_distance(
    entry: Coordinate,
    exit: Coordinate,
    anchor: Anchor,
    heading_deg: f64,
    distance_m: f64,
    bounds: DistanceBounds,
    home: Option<Coordinate>,
) -> LineSolution {
    let distance_m = bounds.clamp(distance_m);

    if let Some(home) = home {
        let entry = entry.with_lat_lon_of(&home);
        let heading_deg = if entry.distance_to(&exit) > COINCIDENT_M {
            entry.azimuth_to(&exit)
        } else {
            normalize_heading(heading_deg)
        };
        let exit = entry.at_distance_and_azimuth(distance_m, heading_deg).with_altitude(exit.altitude);
        return LineSolution { entry, exit, heading_deg, distance_m };
    }

    let heading_deg = normalize_heading(heading_deg);
    match anchor {
        Anchor::Entry => {
            let exit = entry.at_distance_and_azimuth(distance_m, heading_deg).with_altitude(exit.altitude);
            LineSolution { entry, exit, heading_deg, distance_m }
        }
        Anchor::Exit => {
            let entry = exit
                .at_distance_and_azimuth(distance_m, heading_deg + 180.0)
                .with_altitude(entry.altitude);
            LineSolution { entry, exit, heading_deg, distance_m }
        }
    }
}

/// Two-point pattern (takeoff) driven by its coordinates. The exit is
/// snapped back onto the clamped distance rather than rejecting the move.
pub fn line_from_coordinates(
    entry: Coordinate,
    exit: Coordinate,
    heading_hint_deg: f64,
    bounds: DistanceBounds,
    home: Option<Coordinate>,
) -> LineSolution {
    let entry = home.map_or(entry, |h| entry.with_lat_lon_of(&h));
    let measured = entry.distance_to(&exit);
    let heading_deg = if measured > COINCIDENT_M {
        entry.azimuth_to(&exit)
    } else {
        normalize_heading(heading_hint_deg)
    };
    let distance_m = bounds.clamp(measured);
    let exit = entry.at_distance_and_azimuth(distance_m, heading_deg).with_altitude(exit.altitude);
    LineSolution { entry, exit, heading_deg, distance_m }
}

/// Derived points of a landing approach. All coordinates carry the
/// landing point's altitude; the pattern assigns stage altitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachSolution {
    pub final_approach: Coordinate,
    pub loiter_tangent: Coordinate,
    pub transition: Coordinate,
    pub heading_deg: f64,
    pub distance_m: f64,
    pub transition_distance_m: f64,
}

/// Landing approach driven by heading and distances.
///
/// `heading_deg` is the direction of flight into the landing point and
/// `distance_m` runs from the landing point back to where the approach
/// line starts (the loiter tangent). With a loiter the final approach
/// point is the loiter centre, offset sideways by the radius so the
/// circle exits tangentially onto the approach line.
pub fn approach_from_heading_and_distance(
    landing: Coordinate,
    heading_deg: f64,
    distance_m: f64,
    transition_distance_m: f64,
    loiter: Option<Loiter>,
    bounds: DistanceBounds,
) -> ApproachSolution {
    let heading_deg = normalize_heading(heading_deg);
    let distance_m = bounds.clamp(distance_m);
    let transition_distance_m = if transition_distance_m.is_finite() {
        transition_distance_m.max(0.0).min(distance_m)
    } else {
        0.0
    };
    let back = heading_deg + 180.0;

    let loiter_tangent = landing.at_distance_and_azimuth(distance_m, back);
    let transition = landing.at_distance_and_azimuth(transition_distance_m, back);
    let final_approach = match loiter {
        Some(l) => {
            let offset = (l.radius_m / distance_m).atan().to_degrees();
            landing.at_distance_and_azimuth(distance_m.hypot(l.radius_m), back + l.turn_sign() * offset)
        }
        None => loiter_tangent,
    };

    ApproachSolution {
        final_approach,
        loiter_tangent,
        transition,
        heading_deg,
        distance_m,
        transition_distance_m,
    }
}

/// Landing approach driven by a moved final approach point: the heading
/// and tangent distance are measured back out of it, then everything is
/// re-derived so the point lands on the clamped distance.
pub fn approach_from_coordinates(
    landing: Coordinate,
    final_approach: Coordinate,
    transition_distance_m: f64,
    heading_hint_deg: f64,
    loiter: Option<Loiter>,
    bounds: DistanceBounds,
) -> ApproachSolution {
    let centre_dist = landing.distance_to(&final_approach);
    let azimuth = if centre_dist > COINCIDENT_M {
        landing.azimuth_to(&final_approach)
    } else {
        heading_hint_deg + 180.0
    };

    let (distance_m, heading_deg) = match loiter {
        Some(l) if centre_dist > l.radius_m => {
            let offset = (l.radius_m / centre_dist).asin().to_degrees();
            let tangent_dist = (centre_dist * centre_dist - l.radius_m * l.radius_m).sqrt();
            (tangent_dist, azimuth - 180.0 - l.turn_sign() * offset)
        }
        // Dragged inside the circle: the tangent collapses onto the
        // landing point and the clamp pushes it back out.
        Some(l) => (0.0, azimuth - 180.0 - l.turn_sign() * 90.0),
        None => (centre_dist, azimuth - 180.0),
    };

    approach_from_heading_and_distance(landing, heading_deg, distance_m, transition_distance_m, loiter, bounds)
}

/// Landing distance implied by a glide slope between the final approach
/// altitude and the transition point.
pub fn landing_distance_from_glide_slope(
    final_approach_alt_m: f64,
    transition_alt_m: f64,
    glide_slope_deg: f64,
    transition_distance_m: f64,
) -> f64 {
    (final_approach_alt_m - transition_alt_m) / glide_slope_deg.to_radians().tan() + transition_distance_m
}

/// Glide slope measured from the altitudes and distances, unbounded.
pub fn measured_glide_slope(
    final_approach_alt_m: f64,
    transition_alt_m: f64,
    landing_distance_m: f64,
    transition_distance_m: f64,
) -> f64 {
    let alt_diff = final_approach_alt_m - transition_alt_m;
    let run = landing_distance_m - transition_distance_m;
    (alt_diff / run).atan().to_degrees()
}

/// Glide slope implied by the altitudes and distances, kept strictly
/// inside `(min, max)` so a drag never produces a flat or vertical slope.
pub fn glide_slope(
    final_approach_alt_m: f64,
    transition_alt_m: f64,
    landing_distance_m: f64,
    transition_distance_m: f64,
    min_deg: f64,
    max_deg: f64,
) -> f64 {
    let slope = measured_glide_slope(final_approach_alt_m, transition_alt_m, landing_distance_m, transition_distance_m);

    if !(slope > min_deg) {
        min_deg + GLIDE_SLOPE_NUDGE_DEG
    } else if slope >= max_deg {
        max_deg - GLIDE_SLOPE_NUDGE_DEG
    } else {
        slope
    }
}
