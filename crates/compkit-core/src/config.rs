use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

/// Project-level settings read from `compkit.yaml`. Every field has a
/// default, so the file itself is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
    #[serde(default = "default_dev_dir")]
    pub dev_dir: PathBuf,
    #[serde(default = "default_schema_output")]
    pub schema_output: String,
    #[serde(default = "default_manifest_output")]
    pub manifest_output: String,
    #[serde(default = "default_keep_builds")]
    pub keep_builds: usize,
    /// Upper bound on components processed at once. `None` uses the number
    /// of available cores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default = "default_dev_server_port")]
    pub dev_server_port: u16,
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_dev_dir() -> PathBuf {
    PathBuf::from("build_dev")
}

fn default_schema_output() -> String {
    "schema.json".to_string()
}

fn default_manifest_output() -> String {
    "manifest.json".to_string()
}

fn default_keep_builds() -> usize {
    5
}

fn default_dev_server_port() -> u16 {
    3005
}

fn default_remote_name() -> String {
    "WebsiteRemote".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            dist_dir: default_dist_dir(),
            dev_dir: default_dev_dir(),
            schema_output: default_schema_output(),
            manifest_output: default_manifest_output(),
            keep_builds: default_keep_builds(),
            concurrency: None,
            dev_server_port: default_dev_server_port(),
            remote_name: default_remote_name(),
        }
    }
}

impl Config {
    /// Load `compkit.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn src_path(&self, root: &Path) -> PathBuf {
        root.join(&self.src_dir)
    }

    pub fn dist_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dist_dir)
    }

    pub fn dev_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dev_dir)
    }

    /// Effective concurrency limit, never zero.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.src_path(root).is_dir() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "source directory '{}' does not exist",
                    self.src_dir.display()
                ),
            });
        }

        if self.keep_builds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "keep_builds must be at least 1".to_string(),
            });
        }

        if self.concurrency == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "concurrency 0 is treated as 1".to_string(),
            });
        }

        if self.schema_output == self.manifest_output {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "schema_output and manifest_output are both '{}'",
                    self.schema_output
                ),
            });
        }

        if self.dist_dir == self.dev_dir {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "dist_dir and dev_dir are both '{}'; development builds will be cleaned alongside releases",
                    self.dist_dir.display()
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.src_dir, PathBuf::from("src"));
        assert_eq!(cfg.schema_output, "schema.json");
        assert_eq!(cfg.keep_builds, 5);
        assert_eq!(cfg.dev_server_port, 3005);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("compkit.yaml"),
            "schema_output: meta.json\nconcurrency: 2\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.schema_output, "meta.json");
        assert_eq!(cfg.concurrency_limit(), 2);
        assert_eq!(cfg.manifest_output, "manifest.json");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            keep_builds: 3,
            ..Config::default()
        };
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.keep_builds, 3);
    }

    #[test]
    fn validate_flags_missing_src_and_zero_keep() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            keep_builds: 0,
            ..Config::default()
        };
        let warnings = cfg.validate(dir.path());
        let errors = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn validate_clean_project() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        assert!(Config::default().validate(dir.path()).is_empty());
    }

    #[test]
    fn zero_concurrency_clamps_to_one() {
        let cfg = Config {
            concurrency: Some(0),
            ..Config::default()
        };
        assert_eq!(cfg.concurrency_limit(), 1);
    }
}
