use crate::error::{CompkitError, Result};
use crate::paths;
use std::path::{Path, PathBuf};

/// A component directory that carries both an entry file and a
/// `meta/config.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDir {
    pub name: String,
    pub dir: PathBuf,
    pub config_path: PathBuf,
}

impl ComponentDir {
    pub fn meta_dir(&self) -> PathBuf {
        paths::meta_dir(&self.dir)
    }
}

/// Walk `components/*/` under a module root.
///
/// Directories missing an entry file or `meta/config.yml` are skipped without
/// error. Order follows the directory listing.
pub fn discover_components(module_root: &Path) -> Result<Vec<ComponentDir>> {
    if !module_root.is_dir() {
        return Err(CompkitError::MissingInput(module_root.to_path_buf()));
    }
    let components = paths::components_dir(module_root);
    if !components.is_dir() {
        return Err(CompkitError::MissingInput(components));
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(&components)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir = entry.path();
        let config_path = paths::component_config(&dir);
        if !paths::has_entry_file(&dir) || !config_path.is_file() {
            tracing::debug!(dir = %dir.display(), "skipping directory without entry file or meta config");
            continue;
        }
        found.push(ComponentDir {
            name: entry.file_name().to_string_lossy().into_owned(),
            dir,
            config_path,
        });
    }
    Ok(found)
}

/// List module directories under `src`, sorted by name.
///
/// Hidden directories, `_`-prefixed directories and `utils` are not modules.
pub fn list_modules(src: &Path) -> Result<Vec<String>> {
    if !src.is_dir() {
        return Err(CompkitError::MissingInput(src.to_path_buf()));
    }
    let mut modules = Vec::new();
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('_') || name.starts_with('.') || name == "utils" {
            continue;
        }
        modules.push(name);
    }
    modules.sort();
    Ok(modules)
}

/// Recursively collect files under `root` whose extension equals `suffix`
/// (without the dot). Symlinked directories are not followed.
pub fn find_files_with_suffix(root: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk(root, suffix, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, suffix: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // file_type() does not traverse symlinks, so linked dirs never recurse.
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(&path, suffix, out)?;
        } else if path.extension().is_some_and(|ext| ext == suffix) {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
