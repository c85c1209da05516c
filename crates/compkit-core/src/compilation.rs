//! In-memory build output: emitted assets plus the diagnostics collected
//! while producing them.

use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

const HASH_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Compilation {
    assets: BTreeMap<String, Vec<u8>>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Compilation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output asset under an output-relative, `/`-separated name.
    /// A later emit with the same name replaces the earlier bytes.
    pub fn emit_asset(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        if self.assets.insert(name.clone(), data).is_some() {
            tracing::warn!(asset = %name, "asset emitted twice, keeping the latest");
        }
    }

    pub fn asset(&self, name: &str) -> Option<&[u8]> {
        self.assets.get(name).map(Vec::as_slice)
    }

    pub fn assets(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.assets
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn error(&mut self, component: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.errors.push(Diagnostic {
            component: component.map(str::to_string),
            message,
        });
    }

    pub fn warning(&mut self, component: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(Diagnostic {
            component: component.map(str::to_string),
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Content hash over every asset name and body, truncated to 20 hex chars.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, data) in &self.assets {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(data);
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..HASH_LEN].to_string()
    }

    /// Write every asset below `output_dir`. Returns the number written.
    pub fn write_to(&self, output_dir: &Path) -> Result<usize> {
        for (name, data) in &self.assets {
            let path = output_dir.join(name);
            crate::io::atomic_write(&path, data)?;
        }
        Ok(self.assets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn emit_and_read_back() {
        let mut c = Compilation::new();
        c.emit_asset("schema.json", b"{}".to_vec());
        assert_eq!(c.asset("schema.json"), Some(&b"{}"[..]));
        assert_eq!(c.asset_count(), 1);
        assert!(c.asset("missing").is_none());
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let mut a = Compilation::new();
        a.emit_asset("x", b"1".to_vec());
        let mut b = Compilation::new();
        b.emit_asset("x", b"1".to_vec());
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 20);

        b.emit_asset("x", b"2".to_vec());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn diagnostics_are_recorded() {
        let mut c = Compilation::new();
        assert!(!c.has_errors());
        c.warning(Some("Card"), "missing image");
        c.error(Some("Hero"), "bad yaml");
        assert!(c.has_errors());
        assert_eq!(c.errors[0].component.as_deref(), Some("Hero"));
        assert_eq!(c.warnings.len(), 1);
    }

    #[test]
    fn write_to_creates_nested_assets() {
        let dir = TempDir::new().unwrap();
        let mut c = Compilation::new();
        c.emit_asset("assets/Button/icon.png", vec![1, 2, 3]);
        c.emit_asset("schema.json", b"{}".to_vec());
        assert_eq!(c.write_to(dir.path()).unwrap(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("assets/Button/icon.png")).unwrap(),
            vec![1, 2, 3]
        );
    }
}
