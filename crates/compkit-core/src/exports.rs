//! Generate `dynamicExports.js`, the list of exported components a module
//! re-exports for the bundler.

use crate::error::Result;
use crate::loader;
use crate::paths;
use crate::walker;
use serde_json::Value;
use std::path::{Path, PathBuf};

const GENERATED_HEADER: &str = "// WARNING: This file is auto-generated. DO NOT EDIT MANUALLY.\n";

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportsReport {
    pub module: String,
    pub path: PathBuf,
    pub components: Vec<String>,
    pub written: bool,
}

/// Components of `module_root` that should be exported, sorted by name.
/// A component is exported when its config has content and does not say
/// `export: false`. Configs that fail to parse are logged and skipped.
pub fn exported_components(module_root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for component in walker::discover_components(module_root)? {
        match loader::load_yaml(&component.config_path) {
            Ok(Some(config)) => {
                let empty = config.as_object().is_some_and(|m| m.is_empty());
                if empty {
                    tracing::debug!("{} has an empty config, not exported", component.name);
                } else if config.get("export") != Some(&Value::Bool(false)) {
                    names.push(component.name);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!("error processing config for {}: {e}", component.name),
        }
    }
    names.sort();
    Ok(names)
}

pub fn render_exports(components: &[String]) -> String {
    let lines: Vec<String> = components
        .iter()
        .map(|c| format!("export {{ default as {c} }} from './components/{c}';"))
        .collect();
    format!("{GENERATED_HEADER}{}", lines.join("\n"))
}

/// Regenerate the exports file for one module; the file is only rewritten
/// when its content changes.
pub fn generate_module_exports(src: &Path, module: &str) -> Result<ExportsReport> {
    let module_root = paths::module_dir(src, module);
    let components = exported_components(&module_root)?;
    let path = module_root.join(paths::EXPORTS_FILE);
    let written = crate::io::write_if_changed(&path, render_exports(&components).as_bytes())?;
    if written {
        tracing::info!(
            "generated {} with {} exported components",
            path.display(),
            components.len()
        );
    }
    Ok(ExportsReport {
        module: module.to_string(),
        path,
        components,
        written,
    })
}

/// Regenerate exports for `module`, or for every module under `src`.
/// Modules without a `components/` directory are skipped in the latter case.
pub fn generate_exports(src: &Path, module: Option<&str>) -> Result<Vec<ExportsReport>> {
    if let Some(module) = module {
        return Ok(vec![generate_module_exports(src, module)?]);
    }
    let mut reports = Vec::new();
    for module in walker::list_modules(src)? {
        if !paths::components_dir(&paths::module_dir(src, &module)).is_dir() {
            continue;
        }
        reports.push(generate_module_exports(src, &module)?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn component(src: &Path, module: &str, name: &str, config: &str) {
        let dir = src.join(module).join("components").join(name);
        std::fs::create_dir_all(dir.join("meta")).unwrap();
        std::fs::write(dir.join("index.js"), "").unwrap();
        std::fs::write(dir.join("meta/config.yml"), config).unwrap();
    }

    #[test]
    fn writes_only_exported_components() {
        let dir = TempDir::new().unwrap();
        component(dir.path(), "Kit", "Hero", "label: Hero\n");
        component(dir.path(), "Kit", "Card", "export: true\n");
        component(dir.path(), "Kit", "Internal", "export: false\n");
        component(dir.path(), "Kit", "Broken", "x: [\n");

        let report = generate_module_exports(dir.path(), "Kit").unwrap();
        assert_eq!(report.components, ["Card", "Hero"]);
        assert!(report.written);

        let content = std::fs::read_to_string(dir.path().join("Kit/dynamicExports.js")).unwrap();
        assert!(content.starts_with("// WARNING"));
        assert!(content.contains("export { default as Card } from './components/Card';"));
        assert!(!content.contains("Internal"));
    }

    #[test]
    fn empty_config_is_not_exported() {
        let dir = TempDir::new().unwrap();
        component(dir.path(), "Kit", "Hero", "label: Hero\n");
        component(dir.path(), "Kit", "Blank", "");
        component(dir.path(), "Kit", "Tilde", "~\n");

        let report = generate_module_exports(dir.path(), "Kit").unwrap();
        assert_eq!(report.components, ["Hero"]);
    }

    #[test]
    fn unchanged_content_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        component(dir.path(), "Kit", "Hero", "label: Hero\n");
        assert!(generate_module_exports(dir.path(), "Kit").unwrap().written);
        assert!(!generate_module_exports(dir.path(), "Kit").unwrap().written);
    }

    #[test]
    fn all_modules_skips_those_without_components() {
        let dir = TempDir::new().unwrap();
        component(dir.path(), "Kit", "Hero", "label: Hero\n");
        std::fs::create_dir_all(dir.path().join("Empty")).unwrap();
        let reports = generate_exports(dir.path(), None).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].module, "Kit");
    }

    #[test]
    fn render_with_no_components_is_header_only() {
        assert_eq!(render_exports(&[]), GENERATED_HEADER);
    }
}
