use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompkitError {
    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("module already exists: {0}")]
    ModuleExists(String),

    #[error("component already exists: {0}")]
    ComponentExists(String),

    #[error("no modules found under {0}")]
    NoModules(PathBuf),

    #[error("invalid name '{0}': must start with a letter and contain only letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("invalid build configuration: {0}")]
    InvalidBuild(String),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CompkitError>;
