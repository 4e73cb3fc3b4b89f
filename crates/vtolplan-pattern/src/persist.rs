//! JSON plumbing shared by the complex item loaders.

use serde_json::{json, Map, Value};
use vtolplan_geo::Coordinate;

use crate::error::LoadError;
use crate::JSON_VERSION;

pub(crate) const VERSION_KEY: &str = "version";
pub(crate) const TYPE_KEY: &str = "type";
pub(crate) const COMPLEX_ITEM_TYPE_KEY: &str = "complexItemType";
pub(crate) const COMPLEX_ITEM_VALUE: &str = "ComplexItem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonKind {
    Number,
    Bool,
    String,
    Array,
}

impl JsonKind {
    fn name(self) -> &'static str {
        match self {
            JsonKind::Number => "number",
            JsonKind::Bool => "bool",
            JsonKind::String => "string",
            JsonKind::Array => "array",
        }
    }

    fn matches(self, v: &Value) -> bool {
        match self {
            JsonKind::Number => v.is_number(),
            JsonKind::Bool => v.is_boolean(),
            JsonKind::String => v.is_string(),
            JsonKind::Array => v.is_array(),
        }
    }
}

pub(crate) struct KeySpec {
    pub key: &'static str,
    pub kind: JsonKind,
    pub required: bool,
}

impl KeySpec {
    pub const fn required(key: &'static str, kind: JsonKind) -> Self {
        Self { key, kind, required: true }
    }

    pub const fn optional(key: &'static str, kind: JsonKind) -> Self {
        Self { key, kind, required: false }
    }
}

pub(crate) fn as_object(v: &Value) -> Result<&Map<String, Value>, LoadError> {
    v.as_object().ok_or(LoadError::NotAnObject)
}

/// Required keys must be present; any present key must have its type.
/// Keys not listed are rejected.
pub(crate) fn validate_keys(
    obj: &Map<String, Value>,
    kind: &'static str,
    specs: &[KeySpec],
) -> Result<(), LoadError> {
    for spec in specs {
        match obj.get(spec.key) {
            None if spec.required => return Err(LoadError::MissingKey(spec.key.to_string())),
            None => {}
            Some(v) if !spec.kind.matches(v) => {
                return Err(LoadError::WrongType { key: spec.key.to_string(), expected: spec.kind.name() })
            }
            Some(_) => {}
        }
    }
    if let Some(unknown) = obj.keys().find(|k| !specs.iter().any(|s| s.key == k.as_str())) {
        return Err(LoadError::UnknownKey { kind, key: unknown.clone() });
    }
    Ok(())
}

/// Checks the version tag before anything else so an unsupported record
/// is reported as such rather than as a schema mismatch. `aliases` are
/// older spellings of `kind` still accepted on load.
pub(crate) fn check_header(
    obj: &Map<String, Value>,
    kind: &'static str,
    aliases: &[&str],
) -> Result<(), LoadError> {
    let version = obj
        .get(VERSION_KEY)
        .ok_or_else(|| LoadError::MissingKey(VERSION_KEY.to_string()))?
        .as_f64()
        .ok_or(LoadError::WrongType { key: VERSION_KEY.to_string(), expected: "number" })?;
    // Fractional versions are rejected, not truncated.
    if version != JSON_VERSION as f64 {
        return Err(LoadError::UnsupportedVersion { kind, version });
    }

    if let Some(found) = obj.get(COMPLEX_ITEM_TYPE_KEY).and_then(Value::as_str) {
        if found != kind && !aliases.contains(&found) {
            return Err(LoadError::WrongComplexType { expected: kind, found: found.to_string() });
        }
    }
    if let Some(found) = obj.get(TYPE_KEY).and_then(Value::as_str) {
        if found != COMPLEX_ITEM_VALUE {
            return Err(LoadError::WrongComplexType { expected: COMPLEX_ITEM_VALUE, found: found.to_string() });
        }
    }
    Ok(())
}

pub(crate) fn header(kind: &'static str) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(VERSION_KEY.into(), json!(JSON_VERSION));
    obj.insert(TYPE_KEY.into(), json!(COMPLEX_ITEM_VALUE));
    obj.insert(COMPLEX_ITEM_TYPE_KEY.into(), json!(kind));
    obj
}

/// `[lat, lon, alt]`
pub(crate) fn coordinate_to_json(c: &Coordinate) -> Value {
    json!([c.latitude, c.longitude, c.altitude])
}

pub(crate) fn coordinate_from_json(key: &str, v: &Value) -> Result<Coordinate, LoadError> {
    let bad = || LoadError::BadCoordinate(key.to_string());
    let arr = v.as_array().ok_or_else(bad)?;
    if arr.len() != 3 {
        return Err(bad());
    }
    let mut vals = [0.0; 3];
    for (slot, item) in vals.iter_mut().zip(arr) {
        *slot = item.as_f64().ok_or_else(bad)?;
    }
    let c = Coordinate::new(vals[0], vals[1], vals[2]);
    if !c.is_valid() || !c.altitude.is_finite() {
        return Err(bad());
    }
    Ok(c)
}

pub(crate) fn f64_key(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

pub(crate) fn bool_key(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}
