//! Post-build housekeeping: prune old build folders and point
//! `latest_version.txt` at the current build.

use crate::error::Result;
use crate::paths;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub latest_version_file: Option<PathBuf>,
}

/// Remove build folders under `dest` so that at most `keep` builds remain,
/// counting the current one. The newest folders (by mtime) survive; the
/// current build is never removed.
pub fn clean_old_builds(dest: &Path, current_build: &str, keep: usize) -> Result<Vec<PathBuf>> {
    if !dest.is_dir() {
        return Ok(Vec::new());
    }
    let mut folders: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dest)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() || entry.file_name() == current_build {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        folders.push((modified, entry.path()));
    }
    folders.sort_by(|a, b| b.0.cmp(&a.0));

    let retain = keep.saturating_sub(1);
    let mut removed = Vec::new();
    for (_, folder) in folders.into_iter().skip(retain) {
        std::fs::remove_dir_all(&folder)?;
        tracing::info!("cleaned old build: {}", folder.display());
        removed.push(folder);
    }
    Ok(removed)
}

pub fn write_latest_version(dest: &Path, build_id: &str) -> Result<PathBuf> {
    let path = dest.join(paths::LATEST_VERSION_FILE);
    crate::io::atomic_write(&path, build_id.as_bytes())?;
    tracing::info!("wrote {} with build id {build_id}", path.display());
    Ok(path)
}

/// Strip the build-id segment and trailing slashes from a public path, giving
/// the stable URL of the library.
pub fn clean_public_url(public_path: &str, build_id: &str) -> String {
    let pattern = format!("/{}/|/+$", regex::escape(build_id));
    let cleaned = match Regex::new(&pattern) {
        Ok(re) => re.replace_all(public_path, "/").into_owned(),
        Err(_) => public_path.to_string(),
    };
    cleaned.trim_end_matches('/').to_string()
}

/// Full post-build step. With `had_errors` nothing is touched.
pub fn finish_build(
    dest: &Path,
    build_id: &str,
    keep: usize,
    had_errors: bool,
) -> Result<CleanupReport> {
    if had_errors {
        tracing::error!("build encountered errors; public URL not available");
        return Ok(CleanupReport::default());
    }
    let removed = clean_old_builds(dest, build_id, keep)?;
    let latest = write_latest_version(dest, build_id)?;
    Ok(CleanupReport {
        removed,
        latest_version_file: Some(latest),
    })
}
