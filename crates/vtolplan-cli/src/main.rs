use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};

use vtolplan_geo::Coordinate;
use vtolplan_pattern::doctor;
use vtolplan_pattern::landing::LandingParam;
use vtolplan_pattern::mission::{scan_mission, PlanEntry};
use vtolplan_pattern::param::ParamValue;
use vtolplan_pattern::takeoff::TakeoffParam;
use vtolplan_pattern::{LandingPattern, NoTerrain, ParamError, Pattern, PlanContext, ReadyForSave, TakeoffPattern};
use vtolplan_proto::{FlightPathSegment, MissionItem};

#[derive(Debug, Parser)]
#[command(name = "vtolplan", version, about = "VTOL takeoff and landing pattern planner")]
struct Cli {
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config file.
    Doctor,
    /// Build the takeoff pattern and print its mission items.
    Takeoff {
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Build the landing pattern and print its mission items.
    Landing {
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Load a saved plan, print it and re-scan its mission items.
    Load { plan: PathBuf },
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct Point {
    lat: f64,
    lon: f64,
    #[serde(default)]
    alt_m: f64,
}

impl From<Point> for Coordinate {
    fn from(p: Point) -> Self {
        Coordinate::new(p.lat, p.lon, p.alt_m)
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    context: ContextCfg,
    #[serde(default)]
    defaults: DefaultsCfg,
    takeoff: Option<TakeoffCfg>,
    landing: Option<LandingCfg>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ContextCfg {
    vehicle_home: Option<Point>,
    #[serde(default)]
    planned_home_alt_m: f64,
}

impl ContextCfg {
    fn plan_context(&self) -> PlanContext {
        PlanContext { vehicle_home: self.vehicle_home.map(Coordinate::from), planned_home_alt_m: self.planned_home_alt_m }
    }
}

/// Offline defaults by parameter name, applied before the pattern section.
#[derive(Debug, Default, serde::Deserialize)]
struct DefaultsCfg {
    #[serde(default)]
    takeoff: BTreeMap<String, ParamValue>,
    #[serde(default)]
    landing: BTreeMap<String, ParamValue>,
}

#[derive(Debug, serde::Deserialize)]
struct TakeoffCfg {
    takeoff_point: Point,
    climbout_point: Option<Point>,
    heading_deg: Option<f64>,
    distance_m: Option<f64>,
    vtol_alt_m: Option<f64>,
    climbout_alt_m: Option<f64>,
    loiter_radius_m: Option<f64>,
    loiter_clockwise: Option<bool>,
    use_loiter_to_alt: Option<bool>,
    #[serde(default = "default_true")]
    altitudes_are_relative: bool,
    #[serde(default = "default_first_seq")]
    sequence_number: u16,
}

#[derive(Debug, serde::Deserialize)]
struct LandingCfg {
    landing_point: Point,
    final_approach_point: Option<Point>,
    heading_deg: Option<f64>,
    distance_m: Option<f64>,
    final_approach_alt_m: Option<f64>,
    transition_alt_m: Option<f64>,
    transition_distance_m: Option<f64>,
    landing_alt_m: Option<f64>,
    loiter_radius_m: Option<f64>,
    loiter_clockwise: Option<bool>,
    use_loiter_to_alt: Option<bool>,
    glide_slope_deg: Option<f64>,
    #[serde(default)]
    stop_taking_photos: bool,
    #[serde(default)]
    stop_taking_video: bool,
    #[serde(default = "default_true")]
    altitudes_are_relative: bool,
    #[serde(default = "default_first_seq")]
    sequence_number: u16,
}

fn default_true() -> bool {
    true
}

fn default_first_seq() -> u16 {
    1
}

fn load_config(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).context("parse config toml")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor_cmd(&cfg),
        Command::Takeoff { save } => takeoff_cmd(&cfg, save.as_deref()),
        Command::Landing { save } => landing_cmd(&cfg, save.as_deref()),
        Command::Load { plan } => load_cmd(&cfg, &plan),
    }
}

fn doctor_cmd(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_context(&cfg.context.plan_context())?;
    doctor::check_param_overrides::<TakeoffParam>("defaults.takeoff", &cfg.defaults.takeoff)?;
    doctor::check_param_overrides::<LandingParam>("defaults.landing", &cfg.defaults.landing)?;

    if let Some(t) = &cfg.takeoff {
        doctor::check_coordinate("takeoff.takeoff_point", &t.takeoff_point.into())?;
        if let Some(p) = t.climbout_point {
            doctor::check_coordinate("takeoff.climbout_point", &p.into())?;
        }
        if let Some(r) = t.loiter_radius_m {
            doctor::check_loiter_radius("takeoff", r)?;
        }
    } else {
        warn!("doctor: no [takeoff] section");
    }

    if let Some(l) = &cfg.landing {
        doctor::check_coordinate("landing.landing_point", &l.landing_point.into())?;
        if let Some(p) = l.final_approach_point {
            doctor::check_coordinate("landing.final_approach_point", &p.into())?;
        }
        if let Some(r) = l.loiter_radius_m {
            doctor::check_loiter_radius("landing", r)?;
        }
        let defaults = LandingPattern::new(PlanContext::default());
        let or_default = |v: Option<f64>, k: LandingParam| v.unwrap_or_else(|| defaults.param(k));
        doctor::check_landing_altitudes(
            or_default(l.final_approach_alt_m, LandingParam::FinalApproachAltitude),
            or_default(l.transition_alt_m, LandingParam::TransitionAltitude),
            or_default(l.landing_alt_m, LandingParam::LandingAltitude),
        )?;
    } else {
        warn!("doctor: no [landing] section");
    }

    info!("doctor: OK");
    Ok(())
}

fn apply_defaults(
    section: &str,
    defaults: &BTreeMap<String, ParamValue>,
    mut set: impl FnMut(&str, ParamValue) -> std::result::Result<bool, ParamError>,
) -> Result<()> {
    for (name, value) in defaults {
        set(name, *value).with_context(|| format!("{section}.{name}"))?;
    }
    Ok(())
}

fn build_takeoff(cfg: &Config) -> Result<TakeoffPattern> {
    let t = cfg.takeoff.as_ref().context("config has no [takeoff] section")?;
    let mut p = TakeoffPattern::new(cfg.context.plan_context());
    apply_defaults("defaults.takeoff", &cfg.defaults.takeoff, |n, v| p.set_param_by_name(n, v))?;

    let overrides = [
        (TakeoffParam::TakeoffHeading, t.heading_deg.map(ParamValue::from)),
        (TakeoffParam::TakeoffDist, t.distance_m.map(ParamValue::from)),
        (TakeoffParam::VtolAlt, t.vtol_alt_m.map(ParamValue::from)),
        (TakeoffParam::ClimboutAlt, t.climbout_alt_m.map(ParamValue::from)),
        (TakeoffParam::LoiterRadius, t.loiter_radius_m.map(ParamValue::from)),
        (TakeoffParam::LoiterClockwise, t.loiter_clockwise.map(ParamValue::from)),
        (TakeoffParam::UseLoiterToAlt, t.use_loiter_to_alt.map(ParamValue::from)),
    ];
    for (key, value) in overrides {
        if let Some(v) = value {
            p.set_param(key, v);
        }
    }

    p.set_altitudes_are_relative(t.altitudes_are_relative);
    p.set_sequence_number(t.sequence_number);
    p.set_vtol_takeoff_coordinate(t.takeoff_point.into());
    if let Some(c) = t.climbout_point {
        p.set_climbout_coordinate(c.into());
    }
    Ok(p)
}

fn build_landing(cfg: &Config) -> Result<LandingPattern> {
    let l = cfg.landing.as_ref().context("config has no [landing] section")?;
    let mut p = LandingPattern::new(cfg.context.plan_context());
    apply_defaults("defaults.landing", &cfg.defaults.landing, |n, v| p.set_param_by_name(n, v))?;

    let overrides = [
        (LandingParam::LandingHeading, l.heading_deg.map(ParamValue::from)),
        (LandingParam::LandingDistance, l.distance_m.map(ParamValue::from)),
        (LandingParam::FinalApproachAltitude, l.final_approach_alt_m.map(ParamValue::from)),
        (LandingParam::TransitionAltitude, l.transition_alt_m.map(ParamValue::from)),
        (LandingParam::TransitionDistance, l.transition_distance_m.map(ParamValue::from)),
        (LandingParam::LandingAltitude, l.landing_alt_m.map(ParamValue::from)),
        (LandingParam::LoiterRadius, l.loiter_radius_m.map(ParamValue::from)),
        (LandingParam::LoiterClockwise, l.loiter_clockwise.map(ParamValue::from)),
        (LandingParam::UseLoiterToAlt, l.use_loiter_to_alt.map(ParamValue::from)),
        (LandingParam::StopTakingPhotos, Some(l.stop_taking_photos.into())),
        (LandingParam::StopTakingVideo, Some(l.stop_taking_video.into())),
    ];
    for (key, value) in overrides {
        if let Some(v) = value {
            p.set_param(key, v);
        }
    }

    p.set_altitudes_are_relative(l.altitudes_are_relative);
    p.set_sequence_number(l.sequence_number);
    p.set_landing_coordinate(l.landing_point.into());
    if let Some(c) = l.final_approach_point {
        p.set_final_approach_coordinate(c.into());
    }
    // Glide slope last: it moves the approach the section just laid out.
    if let Some(slope) = l.glide_slope_deg {
        p.set_param(LandingParam::GlideSlope, slope);
    }
    Ok(p)
}

fn print_items(items: &[MissionItem]) {
    for item in items {
        println!("{item}");
    }
}

fn print_segments(segments: &[FlightPathSegment]) {
    for s in segments {
        println!(
            "segment {:?} {:.7},{:.7} @{:.1} -> {:.7},{:.7} @{:.1} ({:.0} m, {:+.1} m){}",
            s.kind,
            s.start.latitude,
            s.start.longitude,
            s.start_amsl_m,
            s.end.latitude,
            s.end.longitude,
            s.end_amsl_m,
            s.horizontal_length_m(),
            s.climb_m(),
            if s.terrain_collision { " terrain" } else { "" },
        );
    }
}

fn report(mut pattern: Pattern, save: Option<&Path>) -> Result<()> {
    pattern.flush(&NoTerrain);
    print_items(&pattern.mission_items());
    print_segments(pattern.flight_path().segments());
    let (entry, exit) = (pattern.entry_coordinate(), pattern.exit_coordinate());
    println!(
        "entry={:.7},{:.7} exit={:.7},{:.7} distance={:.1} amsl={:.1}..{:.1}",
        entry.latitude,
        entry.longitude,
        exit.latitude,
        exit.longitude,
        pattern.complex_distance(),
        pattern.min_amsl_altitude(),
        pattern.max_amsl_altitude()
    );

    if let Some(path) = save {
        anyhow::ensure!(pattern.ready_for_save() == ReadyForSave::Ready, "pattern is not anchored, nothing to save");
        let plan = json!({ "items": [pattern.save()] });
        let text = serde_json::to_string_pretty(&plan).context("serialize plan")?;
        std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
        info!("save: wrote {}", path.display());
    }
    Ok(())
}

fn takeoff_cmd(cfg: &Config, save: Option<&Path>) -> Result<()> {
    let p = build_takeoff(cfg)?;
    info!("takeoff: built, {} recalcs", p.recalc_count());
    report(Pattern::Takeoff(p), save)
}

fn landing_cmd(cfg: &Config, save: Option<&Path>) -> Result<()> {
    let p = build_landing(cfg)?;
    info!("landing: built, {} recalcs", p.recalc_count());
    report(Pattern::Landing(p), save)
}

fn load_cmd(cfg: &Config, path: &Path) -> Result<()> {
    let ctx = cfg.context.plan_context();
    let text = std::fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let plan: Value = serde_json::from_str(&text).context("parse plan json")?;
    let records = plan
        .get("items")
        .and_then(Value::as_array)
        .context("plan has no 'items' array")?;

    let mut seq = 1u16;
    let mut items = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let mut pattern = Pattern::load(record, seq, ctx).with_context(|| format!("load: item {i}"))?;
        info!("load: item {} is {:?}", i, pattern.kind());
        pattern.flush(&NoTerrain);
        print_segments(pattern.flight_path().segments());
        pattern.append_mission_items(&mut items);
        seq = pattern.last_sequence_number().saturating_add(1);
    }
    print_items(&items);

    for entry in scan_mission(&items, ctx) {
        match entry {
            PlanEntry::Complex(p) => println!("scan: {:?} at seq {}", p.kind(), p.sequence_number()),
            PlanEntry::Simple(item) => println!("scan: simple item seq {} {:?}", item.seq, item.command),
        }
    }
    Ok(())
}
