//! Build plan derivation: which module to build, in which mode, where the
//! output lands and under which public path it will be served.
//!
//! The build id is generated once here and carried in the [`BuildPlan`];
//! everything downstream takes the plan as a parameter.

use crate::config::Config;
use crate::error::{CompkitError, Result};
use crate::paths;
use crate::walker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// BuildMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = CompkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "production" | "prod" => Ok(BuildMode::Production),
            "development" | "dev" => Ok(BuildMode::Development),
            other => Err(CompkitError::InvalidBuild(format!("unknown mode '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildTarget
// ---------------------------------------------------------------------------

/// The named build flavours a project's scripts invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTarget {
    Build,
    BuildDev,
    WatchTunnel,
    WatchLocal,
    BuildProd,
    BuildProdCommit,
    BuildProdCopy,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 7] = [
        BuildTarget::Build,
        BuildTarget::BuildDev,
        BuildTarget::WatchTunnel,
        BuildTarget::WatchLocal,
        BuildTarget::BuildProd,
        BuildTarget::BuildProdCommit,
        BuildTarget::BuildProdCopy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Build => "build",
            BuildTarget::BuildDev => "build-dev",
            BuildTarget::WatchTunnel => "watch-tunnel",
            BuildTarget::WatchLocal => "watch-local",
            BuildTarget::BuildProd => "build-prod",
            BuildTarget::BuildProdCommit => "build-prod-commit",
            BuildTarget::BuildProdCopy => "build-prod-copy",
        }
    }

    /// Targets whose output goes to the development directory.
    pub fn writes_to_dev_dir(self) -> bool {
        matches!(
            self,
            BuildTarget::WatchTunnel | BuildTarget::WatchLocal | BuildTarget::BuildProdCopy
        )
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = CompkitError;

    /// Accepts both `build-prod` and the npm-script spelling `build:prod`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace(':', "-");
        // `build:prod-copy-commit` builds exactly like `build:prod-copy`.
        if normalized == "build-prod-copy-commit" {
            return Ok(BuildTarget::BuildProdCopy);
        }
        BuildTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CompkitError::InvalidBuild(format!("unknown build target '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// BuildEnv / BuildRequest
// ---------------------------------------------------------------------------

pub const ENV_PUBLIC_URL: &str = "PUBLIC_URL";
pub const ENV_TUNNEL_URL: &str = "TUNNEL_URL";
pub const ENV_TARGET_MODULE: &str = "TARGET_COLLECTION";
pub const ENV_REMOTE_TYPE: &str = "REMOTE_TYPE";
pub const ENV_CF_PAGES_URL: &str = "CF_PAGES_URL";
pub const ENV_CF_PAGES_BRANCH: &str = "CF_PAGES_BRANCH";

/// Environment inputs to plan resolution. Read by the caller, never from
/// inside the library.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    pub public_url: Option<String>,
    pub tunnel_url: Option<String>,
    pub target_module: Option<String>,
    pub remote_type: Option<String>,
    pub cf_pages_url: Option<String>,
    pub cf_pages_branch: Option<String>,
}

impl BuildEnv {
    /// Build from a variable lookup, e.g. `|k| std::env::var(k).ok()`.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            public_url: get(ENV_PUBLIC_URL),
            tunnel_url: get(ENV_TUNNEL_URL),
            target_module: get(ENV_TARGET_MODULE),
            remote_type: get(ENV_REMOTE_TYPE),
            cf_pages_url: get(ENV_CF_PAGES_URL),
            cf_pages_branch: get(ENV_CF_PAGES_BRANCH),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub target: BuildTarget,
    pub mode: Option<BuildMode>,
    /// Local development: publish a remote registry instead of version files.
    pub local: bool,
}

// ---------------------------------------------------------------------------
// BuildPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub build_id: String,
    pub target: BuildTarget,
    pub mode: BuildMode,
    pub module: String,
    pub module_root: PathBuf,
    pub public_path: Option<String>,
    pub dest: PathBuf,
    pub output_path: PathBuf,
    pub remote_name: String,
    pub exposes: BTreeMap<String, String>,
    pub tailwind_config: Option<PathBuf>,
    pub local: bool,
    pub created_at: DateTime<Utc>,
}

impl BuildPlan {
    pub fn resolve(
        root: &Path,
        config: &Config,
        request: &BuildRequest,
        env: &BuildEnv,
    ) -> Result<Self> {
        let public_url = normalize_url(env.public_url.as_deref())?;
        let cf_pages_url = normalize_url(env.cf_pages_url.as_deref())?;

        let mode = resolve_mode(
            request.mode,
            cf_pages_url.as_deref(),
            env.cf_pages_branch.as_deref(),
        );

        let src = config.src_path(root);
        let module = match &env.target_module {
            Some(m) => m.clone(),
            None => {
                let first = walker::list_modules(&src)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CompkitError::NoModules(src.clone()))?;
                tracing::info!("no module specified, using first module '{first}'");
                first
            }
        };
        let module_root = paths::module_dir(&src, &module);
        if !module_root.is_dir() {
            return Err(CompkitError::ModuleNotFound(module));
        }

        if mode == BuildMode::Production && cf_pages_url.is_none() && public_url.is_none() {
            return Err(CompkitError::InvalidBuild(
                "no public url received under production mode; set PUBLIC_URL".to_string(),
            ));
        }

        let tunnel_url = if request.target == BuildTarget::WatchTunnel {
            match normalize_url(env.tunnel_url.as_deref())? {
                Some(url) => Some(url),
                None => {
                    return Err(CompkitError::InvalidBuild(
                        "missing tunnel URL; set TUNNEL_URL (see `compkit tunnel`)".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let build_id = uuid::Uuid::new_v4().to_string();
        let versioned = |base: &str| format!("{base}/{module}/{build_id}/");
        let cf_or_public = cf_pages_url.as_deref().or(public_url.as_deref());

        let (dev_path, prod_path) = match request.target {
            BuildTarget::Build => match mode {
                BuildMode::Development => (cf_pages_url.as_deref().map(versioned), None),
                BuildMode::Production => (None, cf_or_public.map(versioned)),
            },
            BuildTarget::BuildDev => match cf_pages_url.as_deref() {
                Some(cf) => (Some(versioned(cf)), None),
                None => {
                    return Err(CompkitError::InvalidBuild(
                        "build-dev requires a Cloudflare Pages environment; use watch-local instead"
                            .to_string(),
                    ))
                }
            },
            BuildTarget::WatchTunnel => (tunnel_url.as_deref().map(versioned), None),
            BuildTarget::WatchLocal => (
                Some(versioned(&format!(
                    "http://localhost:{}",
                    config.dev_server_port
                ))),
                None,
            ),
            BuildTarget::BuildProd => (None, cf_or_public.map(versioned)),
            BuildTarget::BuildProdCommit | BuildTarget::BuildProdCopy => {
                (None, public_url.as_deref().map(versioned))
            }
        };
        let public_path = match mode {
            BuildMode::Development => dev_path,
            BuildMode::Production => prod_path,
        };

        let dest = if request.target.writes_to_dev_dir() {
            config.dev_path(root).join(&module)
        } else {
            config.dist_path(root).join(&module)
        };
        let output_path = dest.join(&build_id);

        let mut exposes = BTreeMap::new();
        exposes.insert(
            "./widgets".to_string(),
            module_root.to_string_lossy().into_owned(),
        );

        let tailwind = module_root.join(paths::TAILWIND_CONFIG);
        let tailwind_config = tailwind.is_file().then_some(tailwind);

        let remote_name = env
            .remote_type
            .clone()
            .unwrap_or_else(|| config.remote_name.clone());

        tracing::info!(
            module = %module,
            mode = %mode,
            public_path = public_path.as_deref().unwrap_or("<none>"),
            "resolved build plan"
        );

        Ok(Self {
            build_id,
            target: request.target,
            mode,
            module,
            module_root,
            public_path,
            dest,
            output_path,
            remote_name,
            exposes,
            tailwind_config,
            local: request.local,
            created_at: Utc::now(),
        })
    }

    /// Record this build as the newest one for its module.
    ///
    /// Local development builds publish `remoteRegistry.json` in the dev
    /// directory instead. Returns the files written.
    pub fn write_version_files(&self, root: &Path, config: &Config) -> Result<Vec<PathBuf>> {
        if self.mode == BuildMode::Development && self.local {
            let path = config.dev_path(root).join(paths::REMOTE_REGISTRY_FILE);
            let entry = format!("{}remoteEntry.js", self.public_path.as_deref().unwrap_or(""));
            let mut registry = serde_json::Map::new();
            registry.insert(self.remote_name.clone(), serde_json::Value::String(entry));
            crate::io::atomic_write(&path, serde_json::to_string_pretty(&registry)?.as_bytes())?;
            return Ok(vec![path]);
        }

        let version_path = self.dest.join(paths::VERSION_FILE);
        let versions = serde_json::json!([{
            "version": self.build_id,
            "date": self.created_at.to_rfc2822(),
        }]);
        crate::io::atomic_write(
            &version_path,
            serde_json::to_string_pretty(&versions)?.as_bytes(),
        )?;

        let latest_path = self.dest.join(paths::LATEST_VERSION_FILE);
        crate::io::atomic_write(&latest_path, self.build_id.as_bytes())?;
        Ok(vec![version_path, latest_path])
    }
}

fn resolve_mode(
    explicit: Option<BuildMode>,
    cf_pages_url: Option<&str>,
    branch: Option<&str>,
) -> BuildMode {
    if let Some(mode) = explicit {
        return mode;
    }
    if let (Some(_), Some(branch)) = (cf_pages_url, branch) {
        let mode = if branch == "main" || branch == "master" {
            BuildMode::Production
        } else {
            BuildMode::Development
        };
        tracing::info!("set build mode {mode} based on branch {branch}");
        return mode;
    }
    tracing::info!("no build mode specified, building in production mode");
    BuildMode::Production
}

/// Reduce a URL to `scheme://host[:port]/path` with no trailing slash.
/// Query and fragment are dropped. `None` and empty strings pass through as
/// `None`.
pub fn normalize_url(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let url = url::Url::parse(raw).map_err(|_| CompkitError::InvalidUrl(raw.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| CompkitError::InvalidUrl(raw.to_string()))?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let href = format!("{}://{host}{port}{}", url.scheme(), url.path());
    Ok(Some(href.trim_end_matches('/').to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(modules: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for m in modules {
            std::fs::create_dir_all(dir.path().join("src").join(m).join("components")).unwrap();
        }
        dir
    }

    fn request(target: BuildTarget, mode: Option<BuildMode>) -> BuildRequest {
        BuildRequest {
            target,
            mode,
            local: false,
        }
    }

    fn env_with_public() -> BuildEnv {
        BuildEnv {
            public_url: Some("https://cdn.example.com/libs/".to_string()),
            ..BuildEnv::default()
        }
    }

    #[test]
    fn normalize_url_strips_query_and_trailing_slash() {
        assert_eq!(
            normalize_url(Some("https://cdn.example.com/libs/?x=1#top")).unwrap(),
            Some("https://cdn.example.com/libs".to_string())
        );
        assert_eq!(
            normalize_url(Some("http://localhost:3005/")).unwrap(),
            Some("http://localhost:3005".to_string())
        );
        assert_eq!(normalize_url(None).unwrap(), None);
        assert_eq!(normalize_url(Some("  ")).unwrap(), None);
        assert!(normalize_url(Some("not a url")).is_err());
    }

    #[test]
    fn target_parses_both_spellings() {
        assert_eq!("build:prod".parse::<BuildTarget>().unwrap(), BuildTarget::BuildProd);
        assert_eq!("watch-local".parse::<BuildTarget>().unwrap(), BuildTarget::WatchLocal);
        assert!("deploy".parse::<BuildTarget>().is_err());
    }

    #[test]
    fn prod_copy_commit_is_an_alias() {
        let target = "build:prod-copy-commit".parse::<BuildTarget>().unwrap();
        assert_eq!(target, BuildTarget::BuildProdCopy);
        assert!(target.writes_to_dev_dir());
        assert_eq!(
            "build-prod-copy-commit".parse::<BuildTarget>().unwrap(),
            BuildTarget::BuildProdCopy
        );
    }

    #[test]
    fn production_build_uses_public_url() {
        let dir = project(&["Kit"]);
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env_with_public(),
        )
        .unwrap();

        assert_eq!(plan.mode, BuildMode::Production);
        assert_eq!(plan.module, "Kit");
        assert_eq!(
            plan.public_path.as_deref().unwrap(),
            format!("https://cdn.example.com/libs/Kit/{}/", plan.build_id)
        );
        assert_eq!(plan.dest, dir.path().join("dist/Kit"));
        assert_eq!(plan.output_path, plan.dest.join(&plan.build_id));
        assert_eq!(plan.remote_name, "WebsiteRemote");
    }

    #[test]
    fn production_without_urls_fails() {
        let dir = project(&["Kit"]);
        let err = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, Some(BuildMode::Production)),
            &BuildEnv::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("public url"));
    }

    #[test]
    fn cloudflare_branch_selects_mode() {
        let dir = project(&["Kit"]);
        let env = BuildEnv {
            cf_pages_url: Some("https://abc.pages.dev".to_string()),
            cf_pages_branch: Some("feature-x".to_string()),
            ..BuildEnv::default()
        };
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env,
        )
        .unwrap();
        assert_eq!(plan.mode, BuildMode::Development);
        assert!(plan
            .public_path
            .unwrap()
            .starts_with("https://abc.pages.dev/Kit/"));

        let env = BuildEnv {
            cf_pages_branch: Some("main".to_string()),
            ..env
        };
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env,
        )
        .unwrap();
        assert_eq!(plan.mode, BuildMode::Production);
    }

    #[test]
    fn watch_local_targets_dev_dir_and_localhost() {
        let dir = project(&["Kit"]);
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::WatchLocal, Some(BuildMode::Development)),
            &BuildEnv::default(),
        )
        .unwrap();
        assert_eq!(plan.dest, dir.path().join("build_dev/Kit"));
        assert_eq!(
            plan.public_path.unwrap(),
            format!("http://localhost:3005/Kit/{}/", plan.build_id)
        );
    }

    #[test]
    fn watch_tunnel_requires_tunnel_url() {
        let dir = project(&["Kit"]);
        let req = request(BuildTarget::WatchTunnel, Some(BuildMode::Development));
        assert!(BuildPlan::resolve(dir.path(), &Config::default(), &req, &BuildEnv::default()).is_err());

        let env = BuildEnv {
            tunnel_url: Some("https://fancy-rabbit.trycloudflare.com".to_string()),
            ..BuildEnv::default()
        };
        let plan = BuildPlan::resolve(dir.path(), &Config::default(), &req, &env).unwrap();
        assert!(plan
            .public_path
            .unwrap()
            .starts_with("https://fancy-rabbit.trycloudflare.com/Kit/"));
    }

    #[test]
    fn build_dev_outside_cloudflare_fails() {
        let dir = project(&["Kit"]);
        let err = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::BuildDev, Some(BuildMode::Development)),
            &BuildEnv::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("watch-local"));
    }

    #[test]
    fn explicit_module_must_exist() {
        let dir = project(&["Kit"]);
        let env = BuildEnv {
            target_module: Some("Ghost".to_string()),
            ..env_with_public()
        };
        let err = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env,
        )
        .unwrap_err();
        assert!(matches!(err, CompkitError::ModuleNotFound(m) if m == "Ghost"));
    }

    #[test]
    fn no_modules_is_an_error() {
        let dir = project(&[]);
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let err = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env_with_public(),
        )
        .unwrap_err();
        assert!(matches!(err, CompkitError::NoModules(_)));
    }

    #[test]
    fn detects_tailwind_config() {
        let dir = project(&["Kit"]);
        std::fs::write(dir.path().join("src/Kit/tailwind.config.js"), "").unwrap();
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env_with_public(),
        )
        .unwrap();
        assert_eq!(
            plan.tailwind_config,
            Some(dir.path().join("src/Kit/tailwind.config.js"))
        );
    }

    #[test]
    fn version_files_written_to_dest() {
        let dir = project(&["Kit"]);
        let plan = BuildPlan::resolve(
            dir.path(),
            &Config::default(),
            &request(BuildTarget::Build, None),
            &env_with_public(),
        )
        .unwrap();
        let written = plan.write_version_files(dir.path(), &Config::default()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(plan.dest.join("latest_version.txt")).unwrap(),
            plan.build_id
        );
        let versions: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(plan.dest.join("version.json")).unwrap())
                .unwrap();
        assert_eq!(versions[0]["version"], plan.build_id.as_str());
    }

    #[test]
    fn local_development_writes_remote_registry() {
        let dir = project(&["Kit"]);
        let req = BuildRequest {
            target: BuildTarget::WatchLocal,
            mode: Some(BuildMode::Development),
            local: true,
        };
        let env = BuildEnv {
            remote_type: Some("ShopRemote".to_string()),
            ..BuildEnv::default()
        };
        let plan = BuildPlan::resolve(dir.path(), &Config::default(), &req, &env).unwrap();
        let written = plan.write_version_files(dir.path(), &Config::default()).unwrap();
        assert_eq!(written, vec![dir.path().join("build_dev/remoteRegistry.json")]);
        let registry: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(
            registry["ShopRemote"],
            format!("http://localhost:3005/Kit/{}/remoteEntry.js", plan.build_id)
        );
        assert!(!plan.dest.join("version.json").exists());
    }

    #[test]
    fn env_lookup_treats_empty_as_unset() {
        let env = BuildEnv::from_lookup(|k| match k {
            ENV_PUBLIC_URL => Some(String::new()),
            ENV_TARGET_MODULE => Some("Kit".to_string()),
            _ => None,
        });
        assert!(env.public_url.is_none());
        assert_eq!(env.target_module.as_deref(), Some("Kit"));
    }
}
