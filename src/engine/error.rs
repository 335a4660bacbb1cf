// Error types for grid construction, configuration and the scripting bridge.
//
// Degenerate geometry and out-of-bounds tiles are NOT errors: the navigation
// code answers those with "no interaction" / "unreachable".

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = NavError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("tile size must be a finite value > 0, got {0}")]
    InvalidTileSize(f32),

    #[error("navigation bounds produce an empty grid ({size_x} x {size_y} tiles)")]
    DegenerateBounds { size_x: u32, size_y: u32 },

    #[error("navigation bounds produce too many tiles ({size_x} x {size_y})")]
    GridTooLarge { size_x: u32, size_y: u32 },

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}

/// Failures surfaced to a scripting layer through [`super::bridge::ScriptBridge`].
#[derive(Debug, Error, PartialEq)]
pub enum BridgeError {
    #[error("entity {0} does not exist")]
    NoSuchEntity(String),

    #[error("entity has no component `{0}`")]
    MissingComponent(String),

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("component `{component}` has no field `{field}`")]
    UnknownField { component: String, field: String },

    #[error("field `{field}` expects a {expected} value")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("no behaviour registered under `{0}`")]
    UnknownBehaviour(String),
}
