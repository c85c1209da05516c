pub mod build;
pub mod config;
pub mod deploy;
pub mod exports;
pub mod new;
pub mod schema;
pub mod tunnel;
pub mod version;

use anyhow::Context;
use compkit_core::plan::ENV_TARGET_MODULE;
use compkit_core::walker;
use std::path::Path;

/// Explicit module, else `TARGET_COLLECTION`, else the first module under `src`.
pub(crate) fn pick_module(src: &Path, explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(module) = explicit {
        return Ok(module);
    }
    if let Some(module) = std::env::var(ENV_TARGET_MODULE)
        .ok()
        .filter(|m| !m.trim().is_empty())
    {
        return Ok(module);
    }
    walker::list_modules(src)
        .context("failed to list modules")?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no modules found under {}", src.display()))
}
