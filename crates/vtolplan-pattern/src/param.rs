use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::ParamError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Number(v) => v,
            ParamValue::Bool(b) => if b { 1.0 } else { 0.0 },
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            ParamValue::Bool(b) => b,
            ParamValue::Number(v) => v != 0.0,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
        }
    }

    fn same_type(self, other: ParamValue) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Number(v) => write!(f, "{}", v),
        }
    }
}

/// Static description of one pattern parameter.
#[derive(Debug)]
pub struct ParamMeta {
    pub name: &'static str,
    pub default: ParamValue,
    pub min: f64,
    pub max: f64,
    pub units: &'static str,
    pub description: &'static str,
}

/// Typed key into a [`ParamStore`]. Implementors are fieldless enums whose
/// `ALL` lists every variant in declaration order.
pub trait ParamKey: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn meta(self) -> &'static ParamMeta;

    fn index(self) -> usize;

    fn name(self) -> &'static str {
        self.meta().name
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    meta: &'static ParamMeta,
    value: ParamValue,
}

impl Param {
    pub fn name(&self) -> &'static str {
        self.meta.name
    }

    pub fn raw_value(&self) -> ParamValue {
        self.value
    }

    pub fn raw_min(&self) -> f64 {
        self.meta.min
    }

    pub fn raw_max(&self) -> f64 {
        self.meta.max
    }

    pub fn meta(&self) -> &'static ParamMeta {
        self.meta
    }

    pub fn as_f64(&self) -> f64 {
        self.value.as_f64()
    }

    pub fn as_bool(&self) -> bool {
        self.value.as_bool()
    }
}

/// Named parameter values of one pattern. Values are stored as given;
/// bounds are advisory and applied by the recalculation engine.
#[derive(Debug, Clone)]
pub struct ParamStore<K: ParamKey> {
    params: Vec<Param>,
    _key: PhantomData<K>,
}

impl<K: ParamKey> Default for ParamStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ParamKey> ParamStore<K> {
    pub fn new() -> Self {
        let params = K::ALL
            .iter()
            .map(|k| Param { meta: k.meta(), value: k.meta().default })
            .collect();
        Self { params, _key: PhantomData }
    }

    pub fn get(&self, key: K) -> &Param {
        &self.params[key.index()]
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Param> {
        K::from_name(name).map(|k| self.get(k))
    }

    pub fn f64(&self, key: K) -> f64 {
        self.get(key).as_f64()
    }

    pub fn bool(&self, key: K) -> bool {
        self.get(key).as_bool()
    }

    /// Stores `value` coerced to the parameter's type. Returns whether the
    /// stored value changed, which is the caller's cue to notify dependents.
    pub fn set_raw_value(&mut self, key: K, value: impl Into<ParamValue>) -> bool {
        let param = &mut self.params[key.index()];
        let value = match (param.meta.default, value.into()) {
            (ParamValue::Bool(_), v) => ParamValue::Bool(v.as_bool()),
            (ParamValue::Number(_), v) => ParamValue::Number(v.as_f64()),
        };
        if param.value == value {
            return false;
        }
        param.value = value;
        true
    }

    /// String-keyed setter for values coming from config files or a UI.
    pub fn set_by_name(&mut self, name: &str, value: ParamValue) -> Result<(K, bool), ParamError> {
        let key = K::from_name(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        let meta = key.meta();
        if !meta.default.same_type(value) {
            return Err(ParamError::TypeMismatch { name: meta.name, expected: meta.default.type_name() });
        }
        Ok((key, self.set_raw_value(key, value)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }
}
