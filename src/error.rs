use std::path::PathBuf;

use thiserror::Error;

/// Failures of the outer layer (settings, file I/O, command line). The
/// pixel core itself never fails: bad geometry clamps or no-ops.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image codec error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid settings file: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    #[error("invalid operation '{op}': {reason}")]
    InvalidOp { op: String, reason: String },

    #[error("image size {width}x{height} exceeds the limit of {limit}")]
    TooLarge { width: i32, height: i32, limit: i32 },

    #[error("no input files matched")]
    NoInputs,
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image { path: path.into(), source }
    }

    pub fn invalid_op(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOp { op: op.into(), reason: reason.into() }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
