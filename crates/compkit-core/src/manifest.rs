use crate::compilation::Compilation;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: usize,
    pub hash: String,
}

/// Describe every asset on `compilation` except `filename` itself.
pub fn build_manifest(compilation: &Compilation, filename: &str) -> Manifest {
    let hash = compilation.hash();
    let files = compilation
        .assets()
        .filter(|(name, _)| *name != filename)
        .map(|(name, data)| ManifestEntry {
            name: name.to_string(),
            size: data.len(),
            hash: hash.clone(),
        })
        .collect();
    Manifest {
        generated_at: Utc::now(),
        files,
    }
}

/// Build the manifest and register it on `compilation` as `filename`.
/// Runs last, after every other asset has been emitted.
pub fn emit_manifest(compilation: &mut Compilation, filename: &str) -> Result<Manifest> {
    let manifest = build_manifest(compilation, filename);
    let json = serde_json::to_string_pretty(&manifest)?;
    compilation.emit_asset(filename, json.into_bytes());
    tracing::debug!(files = manifest.files.len(), "emitted manifest");
    Ok(manifest)
}
