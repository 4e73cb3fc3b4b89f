use thiserror::Error;

/// Schema problems found while loading a saved complex item. Nothing is
/// applied to the pattern when one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("complex item must be a JSON object")]
    NotAnObject,
    #[error("key '{0}' is required")]
    MissingKey(String),
    #[error("incorrect type for key '{key}', expected {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("unknown key '{key}' in {kind} complex item")]
    UnknownKey { kind: &'static str, key: String },
    #[error("{kind} complex item version {version} not supported")]
    UnsupportedVersion { kind: &'static str, version: f64 },
    #[error("complex item type '{found}' is not {expected}")]
    WrongComplexType { expected: &'static str, found: String },
    #[error("unknown complex item type '{0}'")]
    UnknownComplexType(String),
    #[error("invalid coordinate for key '{0}'")]
    BadCoordinate(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    #[error("parameter '{name}' expects a {expected} value")]
    TypeMismatch { name: &'static str, expected: &'static str },
}
