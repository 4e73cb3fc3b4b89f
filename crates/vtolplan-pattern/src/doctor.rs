use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::warn;
use vtolplan_geo::Coordinate;

use crate::context::PlanContext;
use crate::param::{ParamKey, ParamValue};

pub fn check_coordinate(label: &str, c: &Coordinate) -> Result<()> {
    anyhow::ensure!(c.is_valid(), "{label}: lat/lon out of range ({}, {})", c.latitude, c.longitude);
    anyhow::ensure!(c.altitude.is_finite(), "{label}: altitude is not finite");
    anyhow::ensure!(!c.has_zero_lat_lon(), "{label}: 0/0 is not a usable position");
    Ok(())
}

pub fn check_context(ctx: &PlanContext) -> Result<()> {
    anyhow::ensure!(ctx.planned_home_alt_m.is_finite(), "context.planned_home_alt_m is not finite");
    if let Some(home) = &ctx.vehicle_home {
        check_coordinate("context.vehicle_home", home)?;
    }
    Ok(())
}

/// Offline defaults must name real parameters with the right value type.
/// Out-of-range numbers are accepted (the engine clamps) but reported.
pub fn check_param_overrides<K: ParamKey>(section: &str, overrides: &BTreeMap<String, ParamValue>) -> Result<()> {
    for (name, value) in overrides {
        let key = K::from_name(name).with_context(|| format!("{section}: unknown parameter '{name}'"))?;
        let meta = key.meta();
        anyhow::ensure!(
            std::mem::discriminant(&meta.default) == std::mem::discriminant(value),
            "{section}.{name}: expected a {} value",
            meta.default.type_name()
        );
        if let ParamValue::Number(v) = value {
            anyhow::ensure!(v.is_finite(), "{section}.{name}: not a finite number");
            if *v < meta.min || *v > meta.max {
                warn!("doctor: {section}.{name} = {v} outside [{}, {}], will be clamped", meta.min, meta.max);
            }
        }
    }
    Ok(())
}

pub fn check_loiter_radius(section: &str, radius_m: f64) -> Result<()> {
    anyhow::ensure!(radius_m.is_finite() && radius_m > 0.0, "{section}.loiter_radius_m must be positive");
    Ok(())
}

/// The approach needs room between transition and landing for the descent.
pub fn check_landing_altitudes(final_approach_alt_m: f64, transition_alt_m: f64, landing_alt_m: f64) -> Result<()> {
    anyhow::ensure!(
        final_approach_alt_m > transition_alt_m,
        "landing: final approach altitude must be above transition altitude"
    );
    anyhow::ensure!(transition_alt_m > landing_alt_m, "landing: transition altitude must be above landing altitude");
    Ok(())
}
