use crate::error::{CompkitError, Result};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File and directory names
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "compkit.yaml";

pub const MODULE_CONFIG_FILE: &str = "config.yml";
pub const COMPONENTS_DIR: &str = "components";
pub const META_DIR: &str = "meta";
pub const COMPONENT_CONFIG_FILE: &str = "config.yml";
pub const NOTES_FILE: &str = "notes.md";
pub const SHARED_DIR: &str = "_shared";

/// Files that mark a directory as a component. The first one is what the
/// scaffolder writes.
pub const ENTRY_FILES: &[&str] = &["index.js", "index.jsx", "index.ts", "index.tsx"];

pub const ASSETS_DIR: &str = "assets";
pub const EXPORTS_FILE: &str = "dynamicExports.js";
pub const PACKAGE_JSON: &str = "package.json";
pub const TAILWIND_CONFIG: &str = "tailwind.config.js";

pub const VERSION_FILE: &str = "version.json";
pub const LATEST_VERSION_FILE: &str = "latest_version.txt";
pub const REMOTE_REGISTRY_FILE: &str = "remoteRegistry.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn module_dir(src: &Path, module: &str) -> PathBuf {
    src.join(module)
}

pub fn module_config(module_root: &Path) -> PathBuf {
    module_root.join(MODULE_CONFIG_FILE)
}

pub fn components_dir(module_root: &Path) -> PathBuf {
    module_root.join(COMPONENTS_DIR)
}

pub fn meta_dir(component_dir: &Path) -> PathBuf {
    component_dir.join(META_DIR)
}

pub fn component_config(component_dir: &Path) -> PathBuf {
    meta_dir(component_dir).join(COMPONENT_CONFIG_FILE)
}

pub fn has_entry_file(component_dir: &Path) -> bool {
    ENTRY_FILES
        .iter()
        .any(|name| component_dir.join(name).is_file())
}

/// Output-relative asset path for a component image, always `/`-separated.
///
/// `relative` is the image path as written in the component config, relative
/// to its `meta/` directory. Subdirectories are kept, so two sources never
/// share an asset name. Paths that climb out of `meta/` are rejected.
pub fn asset_path(component: &str, relative: &str) -> Result<String> {
    let mut parts = vec![ASSETS_DIR.to_string(), component.to_string()];
    for part in Path::new(relative).components() {
        match part {
            Component::Normal(p) => parts.push(p.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(CompkitError::InvalidBuild(format!(
                    "image path '{relative}' must stay inside the meta directory"
                )))
            }
        }
    }
    if parts.len() == 2 {
        return Err(CompkitError::InvalidBuild(format!(
            "image path '{relative}' names no file"
        )));
    }
    Ok(parts.join("/"))
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*$").unwrap())
}

/// Validate a module or component name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(CompkitError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
