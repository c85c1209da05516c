//! Boilerplate generation for new modules and components.

use crate::error::{CompkitError, Result};
use crate::io::{atomic_write, ensure_dir};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct ModuleConfigFile<'a> {
    name: &'a str,
    description: &'a str,
    version: &'a str,
    author: &'a str,
    license: &'a str,
}

pub const DEFAULT_MODULE_DESCRIPTION: &str = "A web component library";

/// Create `src/<name>/` with its config, entry, stylesheet, package and
/// tailwind files. Fails if the module already exists.
pub fn create_module(src: &Path, name: &str, description: Option<&str>) -> Result<PathBuf> {
    paths::validate_name(name)?;
    let module_root = paths::module_dir(src, name);
    if module_root.exists() {
        return Err(CompkitError::ModuleExists(name.to_string()));
    }
    ensure_dir(&paths::components_dir(&module_root))?;

    let description = description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_MODULE_DESCRIPTION);
    let config = serde_yaml::to_string(&ModuleConfigFile {
        name,
        description,
        version: "1.0.0",
        author: "Your Name",
        license: "MIT",
    })?;
    atomic_write(&paths::module_config(&module_root), config.as_bytes())?;
    atomic_write(&module_root.join("index.js"), b"// Export components here\n")?;
    atomic_write(
        &module_root.join("index.css"),
        b"/* Add your module-specific styles here */\n",
    )?;

    let package = serde_json::json!({
        "name": name.to_lowercase(),
        "version": "1.0.0",
        "description": description,
        "main": "index.js",
        "keywords": ["module"],
        "author": "",
        "license": "MIT",
    });
    atomic_write(
        &module_root.join(paths::PACKAGE_JSON),
        format!("{}\n", serde_json::to_string_pretty(&package)?).as_bytes(),
    )?;
    atomic_write(
        &module_root.join(paths::TAILWIND_CONFIG),
        TAILWIND_TEMPLATE.as_bytes(),
    )?;

    tracing::info!("created module {name} at {}", module_root.display());
    Ok(module_root)
}

const TAILWIND_TEMPLATE: &str = "module.exports = {
  content: ['./**/*.{js,jsx,ts,tsx}'],
  theme: {
    extend: {},
  },
  plugins: [],
}
";

/// The most recently modified module directory under `src`, ignoring
/// `_`-prefixed directories.
pub fn newest_module(src: &Path) -> Result<Option<String>> {
    if !src.is_dir() {
        return Ok(None);
    }
    let mut newest: Option<(std::time::SystemTime, String)> = None;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, name));
        }
    }
    Ok(newest.map(|(_, name)| name))
}

// ---------------------------------------------------------------------------
// Component kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Exported, with meta files, listed in the module index.
    Export,
    /// Not exported, but with meta files.
    Config,
    /// Entry file only.
    Plain,
    /// Entry file only, under `components/_shared/`.
    Shared,
}

impl ComponentKind {
    pub fn is_exported(self) -> bool {
        self == ComponentKind::Export
    }

    pub fn has_meta(self) -> bool {
        matches!(self, ComponentKind::Export | ComponentKind::Config)
    }
}

impl FromStr for ComponentKind {
    type Err = CompkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "export" => Ok(ComponentKind::Export),
            "config" => Ok(ComponentKind::Config),
            "plain" => Ok(ComponentKind::Plain),
            "shared" => Ok(ComponentKind::Shared),
            other => Err(CompkitError::InvalidBuild(format!(
                "unknown component kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Section,
    Block,
    Element,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentType::Section => "section",
            ComponentType::Block => "block",
            ComponentType::Element => "element",
        })
    }
}

impl FromStr for ComponentType {
    type Err = CompkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "section" => Ok(ComponentType::Section),
            "block" => Ok(ComponentType::Block),
            "element" => Ok(ComponentType::Element),
            other => Err(CompkitError::InvalidBuild(format!(
                "unknown component type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
}

/// Parse `"align:string,items:number"`. A missing type defaults to `string`;
/// blank entries are dropped.
pub fn parse_parameters(raw: &str) -> Vec<ParameterSpec> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (name, kind) = p.split_once(':').unwrap_or((p, "string"));
            let name = name.trim().to_string();
            let kind = match kind.trim() {
                "" => "string".to_string(),
                k => k.to_string(),
            };
            ParameterSpec {
                label: capitalize(&name),
                name,
                kind,
            }
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ComponentOptions {
    pub name: String,
    pub module: Option<String>,
    pub kind: ComponentKind,
    pub component_type: ComponentType,
    pub description: Option<String>,
    pub parameters: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedComponent {
    pub module: String,
    pub path: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ComponentMetaFile<'a> {
    label: &'a str,
    description: &'a str,
    export: bool,
    parameters: &'a [ParameterSpec],
}

pub const DEFAULT_COMPONENT_DESCRIPTION: &str = "A new web component";
pub const FALLBACK_MODULE: &str = "StarterLibrary";

pub fn create_component(src: &Path, opts: &ComponentOptions) -> Result<CreatedComponent> {
    paths::validate_name(&opts.name)?;
    let module = match &opts.module {
        Some(m) => m.clone(),
        None => newest_module(src)?.unwrap_or_else(|| FALLBACK_MODULE.to_string()),
    };
    paths::validate_name(&module)?;

    let module_root = paths::module_dir(src, &module);
    let mut components = paths::components_dir(&module_root);
    if opts.kind == ComponentKind::Shared {
        components = components.join(paths::SHARED_DIR);
    }
    let component_dir = components.join(&opts.name);
    if component_dir.exists() {
        return Err(CompkitError::ComponentExists(opts.name.clone()));
    }
    ensure_dir(&component_dir)?;

    let mut files = Vec::new();
    let entry = component_dir.join(paths::ENTRY_FILES[0]);
    atomic_write(
        &entry,
        render_component(&opts.name, opts.component_type).as_bytes(),
    )?;
    files.push(entry);

    if opts.kind.has_meta() {
        let description = opts
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_COMPONENT_DESCRIPTION);
        let parameters = parse_parameters(&opts.parameters);

        let config_path = paths::component_config(&component_dir);
        let meta = serde_yaml::to_string(&ComponentMetaFile {
            label: &opts.name,
            description,
            export: opts.kind.is_exported(),
            parameters: &parameters,
        })?;
        atomic_write(&config_path, meta.as_bytes())?;
        files.push(config_path);

        let notes_path = paths::meta_dir(&component_dir).join(paths::NOTES_FILE);
        atomic_write(
            &notes_path,
            render_notes(&opts.name, description, &parameters).as_bytes(),
        )?;
        files.push(notes_path);
    }

    if opts.kind.is_exported() {
        update_module_index(&module_root, &opts.name)?;
    }

    tracing::info!("created component {} in module {module}", opts.name);
    Ok(CreatedComponent {
        module,
        path: component_dir,
        files,
    })
}

fn render_component(name: &str, component_type: ComponentType) -> String {
    format!(
        "import React from 'react';

export default function {name}(props) {{
  return (
    <div>
      <h2>{name}</h2>
      <p>This is a new {component_type} component.</p>
    </div>
  );
}}
"
    )
}

fn render_notes(name: &str, description: &str, parameters: &[ParameterSpec]) -> String {
    let params = if parameters.is_empty() {
        "_None yet._".to_string()
    } else {
        parameters
            .iter()
            .map(|p| format!("- `{}`: {}", p.name, p.kind))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "# {name}

{description}

## Usage

Describe how to use this component.

## Parameters

{params}

## Examples

Add examples of this component in use.
"
    )
}

/// Append the component's export to the module `index.js`, once.
fn update_module_index(module_root: &Path, component: &str) -> Result<()> {
    let index = module_root.join("index.js");
    let mut content = if index.exists() {
        std::fs::read_to_string(&index)?
    } else {
        String::new()
    };
    let statement =
        format!("export {{ default as {component} }} from './components/{component}';");
    if content.contains(&statement) {
        return Ok(());
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&statement);
    content.push('\n');
    atomic_write(&index, content.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
