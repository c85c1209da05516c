//! Semantic version bumps for module `package.json` files.

use crate::error::{CompkitError, Result};
use crate::io::atomic_write;
use crate::paths;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl FromStr for Bump {
    type Err = CompkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(Bump::Major),
            "minor" => Ok(Bump::Minor),
            "patch" => Ok(Bump::Patch),
            other => Err(CompkitError::InvalidVersion(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn bump(self, bump: Bump) -> Self {
        match bump {
            Bump::Major => Version { major: self.major + 1, minor: 0, patch: 0 },
            Bump::Minor => Version { minor: self.minor + 1, patch: 0, ..self },
            Bump::Patch => Version { patch: self.patch + 1, ..self },
        }
    }
}

impl FromStr for Version {
    type Err = CompkitError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CompkitError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Version {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionChange {
    pub module: String,
    pub old: String,
    pub new: String,
}

/// Bump `src/<module>/package.json`. Other keys keep their order.
pub fn bump_module_version(src: &Path, module: &str, bump: Bump) -> Result<VersionChange> {
    let package_path = paths::module_dir(src, module).join(paths::PACKAGE_JSON);
    if !package_path.exists() {
        return Err(CompkitError::ModuleNotFound(module.to_string()));
    }
    let text = std::fs::read_to_string(&package_path)?;
    let mut package: Value = serde_json::from_str(&text)?;

    let old = package
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let new = old.parse::<Version>()?.bump(bump).to_string();

    if let Value::Object(map) = &mut package {
        map.insert("version".to_string(), Value::String(new.clone()));
    }
    atomic_write(
        &package_path,
        format!("{}\n", serde_json::to_string_pretty(&package)?).as_bytes(),
    )?;

    tracing::info!("{module}: {old} -> {new}");
    Ok(VersionChange {
        module: module.to_string(),
        old,
        new,
    })
}

/// The `version` field of `src/<module>/package.json`, if any.
pub fn current_version(src: &Path, module: &str) -> Result<Option<String>> {
    let package_path = paths::module_dir(src, module).join(paths::PACKAGE_JSON);
    if !package_path.is_file() {
        return Ok(None);
    }
    let package: Value = serde_json::from_str(&std::fs::read_to_string(&package_path)?)?;
    Ok(package
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Modules under `src` that carry a `package.json`.
pub fn list_versioned_modules(src: &Path) -> Result<Vec<String>> {
    Ok(crate::walker::list_modules(src)?
        .into_iter()
        .filter(|m| paths::module_dir(src, m).join(paths::PACKAGE_JSON).is_file())
        .collect())
}
