pub mod assets;
pub mod autocomplete;
pub mod cleanup;
pub mod compilation;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exports;
pub mod io;
pub mod loader;
pub mod manifest;
pub mod paths;
pub mod plan;
pub mod scaffold;
pub mod schema;
pub mod version;
pub mod walker;

pub use error::{CompkitError, Result};
