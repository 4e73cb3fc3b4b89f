pub mod context;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod landing;
pub mod mission;
pub mod param;
pub mod pattern;
pub mod projector;
pub mod state;
mod persist;
pub mod takeoff;

pub use context::PlanContext;
pub use error::{LoadError, ParamError};
pub use landing::LandingPattern;
pub use pattern::{Pattern, PatternKind, ReadyForSave};
pub use projector::{NoTerrain, TerrainProbe};
pub use state::{CoordinateRole, PatternEvent};
pub use takeoff::TakeoffPattern;

/// Version tag written to and required from every complex item record.
pub const JSON_VERSION: i64 = 1;
