use vtolplan_geo::Coordinate;

/// Everything the recalculation engine needs from outside the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanContext {
    /// Home reported by the active vehicle, if any.
    pub vehicle_home: Option<Coordinate>,
    /// Altitude of the plan's home position, base for relative altitudes.
    pub planned_home_alt_m: f64,
}

impl PlanContext {
    pub fn offline(planned_home_alt_m: f64) -> Self {
        Self { vehicle_home: None, planned_home_alt_m }
    }

    /// Home is only usable when it is present, finite and not the 0/0
    /// placeholder vehicles report before a fix.
    pub fn valid_home(&self) -> Option<Coordinate> {
        self.vehicle_home.filter(|h| h.is_valid() && !h.has_zero_lat_lon())
    }

    /// AMSL altitude for a pattern altitude in the given reference.
    pub fn amsl(&self, alt_m: f64, relative: bool) -> f64 {
        if relative { alt_m + self.planned_home_alt_m } else { alt_m }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_home_is_ignored() {
        let ctx = PlanContext { vehicle_home: Some(Coordinate::default()), planned_home_alt_m: 0.0 };
        assert!(ctx.valid_home().is_none());
        let ctx = PlanContext { vehicle_home: Some(Coordinate::new(47.0, 8.0, 400.0)), ..ctx };
        assert!(ctx.valid_home().is_some());
    }

    #[test]
    fn amsl_offsets_relative_only() {
        let ctx = PlanContext::offline(500.0);
        assert_eq!(ctx.amsl(30.0, true), 530.0);
        assert_eq!(ctx.amsl(30.0, false), 30.0);
    }
}
