//! Copy the newest development build of a module to a deploy directory.

use crate::config::Config;
use crate::error::{CompkitError, Result};
use crate::io::{copy_dir_all, ensure_dir};
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub module: String,
    pub version: String,
    pub target: PathBuf,
    pub copied: Vec<PathBuf>,
}

/// Copy `version.json`, `latest_version.txt` and the `<version>/` tree from
/// `<dev_dir>/<module>/` into `<target_dir>/<module>/`.
pub fn copy_build(
    root: &Path,
    config: &Config,
    module: &str,
    target_dir: &Path,
) -> Result<DeployReport> {
    paths::validate_name(module)?;
    let source = config.dev_path(root).join(module);
    let latest = source.join(paths::LATEST_VERSION_FILE);
    if !latest.is_file() {
        return Err(CompkitError::MissingInput(latest));
    }
    let version = std::fs::read_to_string(&latest)?.trim().to_string();
    if version.is_empty() || version.contains(['/', '\\']) || version.starts_with('.') {
        return Err(CompkitError::InvalidBuild(format!(
            "{} does not name a build",
            latest.display()
        )));
    }
    let build_dir = source.join(&version);
    if !build_dir.is_dir() {
        return Err(CompkitError::MissingInput(build_dir));
    }

    let target = target_dir.join(module);
    ensure_dir(&target)?;
    let mut copied = Vec::new();
    for file in [paths::VERSION_FILE, paths::LATEST_VERSION_FILE] {
        let from = source.join(file);
        if !from.is_file() {
            tracing::warn!("{} not found, skipping", from.display());
            continue;
        }
        let to = target.join(file);
        std::fs::copy(&from, &to)?;
        copied.push(to);
    }
    let to = target.join(&version);
    copy_dir_all(&build_dir, &to)?;
    copied.push(to);

    tracing::info!(
        "copied {module} build {version} to {}",
        target.display()
    );
    Ok(DeployReport {
        module: module.to_string(),
        version,
        target,
        copied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_build(root: &Path, module: &str, version: &str) {
        let dest = root.join("build_dev").join(module);
        std::fs::create_dir_all(dest.join(version).join("assets/Hero")).unwrap();
        std::fs::write(dest.join(version).join("remoteEntry.js"), "// entry").unwrap();
        std::fs::write(dest.join(version).join("assets/Hero/hero.png"), b"png").unwrap();
        std::fs::write(dest.join("version.json"), "[]").unwrap();
        std::fs::write(dest.join("latest_version.txt"), version).unwrap();
        std::fs::create_dir_all(dest.join("older-build")).unwrap();
    }

    #[test]
    fn copies_latest_build_only() {
        let dir = TempDir::new().unwrap();
        seed_build(dir.path(), "Kit", "build-1");
        let target = dir.path().join("out");

        let report = copy_build(dir.path(), &Config::default(), "Kit", &target).unwrap();
        assert_eq!(report.version, "build-1");
        assert_eq!(report.copied.len(), 3);
        assert!(target.join("Kit/version.json").is_file());
        assert!(target.join("Kit/build-1/assets/Hero/hero.png").is_file());
        assert!(!target.join("Kit/older-build").exists());
    }

    #[test]
    fn missing_latest_version_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = copy_build(dir.path(), &Config::default(), "Kit", dir.path()).unwrap_err();
        assert!(matches!(err, CompkitError::MissingInput(_)));
    }

    #[test]
    fn latest_version_must_name_a_directory() {
        let dir = TempDir::new().unwrap();
        seed_build(dir.path(), "Kit", "build-1");
        std::fs::write(dir.path().join("build_dev/Kit/latest_version.txt"), "../escape").unwrap();
        let err = copy_build(dir.path(), &Config::default(), "Kit", dir.path()).unwrap_err();
        assert!(matches!(err, CompkitError::InvalidBuild(_)));
    }
}
