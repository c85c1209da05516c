//! Aggregate per-component YAML metadata into one JSON schema artifact.
//!
//! Each exported component is loaded, normalized against the auto-schema
//! template, and has its preset and image files pushed through the
//! [`AssetPipeline`]. Components run as independent tasks bounded by a
//! semaphore; this function is the single owner of the [`Compilation`] and
//! appends their results once every task has finished.

use crate::assets::AssetPipeline;
use crate::autocomplete::{self, AutoSchemaTemplate};
use crate::compilation::Compilation;
use crate::error::{CompkitError, Result};
use crate::loader;
use crate::paths;
use crate::plan::BuildMode;
use crate::walker::{self, ComponentDir};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Schema key holding the module's own `config.yml`.
pub const MODULE_SELF_KEY: &str = "_self";

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SchemaRequest {
    pub module_root: PathBuf,
    pub mode: BuildMode,
    pub output_dir: PathBuf,
    pub schema_output: String,
    pub concurrency: usize,
    pub template: Arc<AutoSchemaTemplate>,
}

impl SchemaRequest {
    pub fn new(
        module_root: impl Into<PathBuf>,
        mode: BuildMode,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module_root: module_root.into(),
            mode,
            output_dir: output_dir.into(),
            schema_output: "schema.json".to_string(),
            concurrency: 4,
            template: Arc::new(AutoSchemaTemplate::bundled().clone()),
        }
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.schema_output = name.into();
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn with_template(mut self, template: AutoSchemaTemplate) -> Self {
        self.template = Arc::new(template);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    pub exported: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub assets: usize,
    #[serde(skip)]
    pub schema: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Build the schema for one module and register it (plus any encoded image
/// assets) on `compilation`.
///
/// Fails only on fatal input problems: a missing module root or
/// `components/` directory, or an unparseable module `config.yml`.
/// Component-level failures are recorded as compilation errors.
pub async fn build_schema(
    request: &SchemaRequest,
    compilation: &mut Compilation,
) -> Result<SchemaReport> {
    let module_root = &request.module_root;
    if !tokio::fs::try_exists(module_root).await? {
        return Err(CompkitError::MissingInput(module_root.clone()));
    }

    let module_config = loader::load_yaml_async(&paths::module_config(module_root))
        .await?
        .unwrap_or_else(|| Value::Object(Map::new()));

    let components = walker::discover_components(module_root)?;
    tracing::info!(
        module = %module_root.display(),
        components = components.len(),
        "building schema"
    );

    let pipeline = AssetPipeline::new(request.mode, &request.output_dir);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(request.concurrency.max(1)));
    let mut handles = Vec::with_capacity(components.len());
    let mut report = SchemaReport::default();

    for component in components {
        if component.name == MODULE_SELF_KEY {
            compilation.error(
                Some(&component.name),
                format!(
                    "component '{}' at {} uses the name reserved for the module config",
                    component.name,
                    component.dir.display()
                ),
            );
            report.failed.push(component.name);
            continue;
        }
        let sem = semaphore.clone();
        let template = request.template.clone();
        let pipeline = pipeline.clone();
        let name = component.name.clone();
        let handle = tokio::spawn(async move {
            let _permit = match sem.acquire().await {
                Ok(p) => p,
                Err(_) => {
                    return ComponentOutcome::Failed {
                        name: component.name,
                        message: "semaphore closed".to_string(),
                    }
                }
            };
            process_component(component, &template, &pipeline).await
        });
        handles.push((name, handle));
    }

    let mut schema = Map::new();
    schema.insert(MODULE_SELF_KEY.to_string(), module_config);

    for (name, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => ComponentOutcome::Failed {
                name,
                message: format!("task join error: {e}"),
            },
        };
        match outcome {
            ComponentOutcome::Exported {
                name,
                config,
                assets,
                warnings,
            } => {
                for message in warnings {
                    compilation.warning(Some(&name), message);
                }
                report.assets += assets.len();
                for (asset_name, data) in assets {
                    compilation.emit_asset(asset_name, data);
                }
                schema.insert(name.clone(), Value::Object(config));
                report.exported.push(name);
            }
            ComponentOutcome::Skipped { name } => report.skipped.push(name),
            ComponentOutcome::Failed { name, message } => {
                compilation.error(Some(&name), message);
                report.failed.push(name);
            }
        }
    }

    let json = serde_json::to_string_pretty(&schema)?;
    compilation.emit_asset(request.schema_output.clone(), json.into_bytes());
    report.schema = schema;
    Ok(report)
}

// ---------------------------------------------------------------------------
// Per-component processing
// ---------------------------------------------------------------------------

enum ComponentOutcome {
    Exported {
        name: String,
        config: Map<String, Value>,
        assets: Vec<(String, Vec<u8>)>,
        warnings: Vec<String>,
    },
    Skipped {
        name: String,
    },
    Failed {
        name: String,
        message: String,
    },
}

/// Image work gathered while resolving one component.
#[derive(Default)]
struct Resolved {
    assets: Vec<(String, Vec<u8>)>,
    warnings: Vec<String>,
}

async fn process_component(
    component: ComponentDir,
    template: &AutoSchemaTemplate,
    pipeline: &AssetPipeline,
) -> ComponentOutcome {
    let fail = |message: String| ComponentOutcome::Failed {
        name: component.name.clone(),
        message: format!(
            "Error processing {}: {message}",
            component.config_path.display()
        ),
    };

    let mut config = match loader::load_yaml_async(&component.config_path).await {
        Ok(Some(Value::Object(map))) => map,
        Ok(Some(_)) => return fail("expected a mapping at the top level".to_string()),
        Ok(None) => {
            return ComponentOutcome::Skipped {
                name: component.name.clone(),
            }
        }
        Err(CompkitError::Parse { source, .. }) => return fail(source.to_string()),
        Err(e) => return fail(e.to_string()),
    };

    if config.get("export") == Some(&Value::Bool(false)) {
        tracing::debug!(component = %component.name, "not exported");
        return ComponentOutcome::Skipped {
            name: component.name.clone(),
        };
    }

    autocomplete::autocomplete(&mut config, template);

    let mut resolved = Resolved::default();
    let meta_dir = component.meta_dir();
    if let Err(e) =
        resolve_images(&mut config, &component.name, &meta_dir, pipeline, &mut resolved).await
    {
        return fail(e.to_string());
    }

    config.insert("name".to_string(), Value::String(component.name.clone()));

    ComponentOutcome::Exported {
        name: component.name,
        config,
        assets: resolved.assets,
        warnings: resolved.warnings,
    }
}

async fn resolve_images(
    config: &mut Map<String, Value>,
    component: &str,
    meta_dir: &Path,
    pipeline: &AssetPipeline,
    resolved: &mut Resolved,
) -> Result<()> {
    if let Some(Value::Object(presets)) = config.get_mut("presets") {
        for (preset_name, preset) in presets.iter_mut() {
            normalize_preset(preset);
            let Value::Object(preset) = preset else {
                resolved.warnings.push(format!(
                    "{component}: preset '{preset_name}' is a list, expected a mapping"
                ));
                continue;
            };
            let file = match preset.get("image") {
                Some(Value::String(file)) => file.clone(),
                _ => format!("{preset_name}.png"),
            };
            let info = resolve_one(component, meta_dir, &file, pipeline, resolved).await?;
            preset.insert("image".to_string(), info);
        }
    }

    if let Some(Value::Array(images)) = config.get_mut("images") {
        for image in images.iter_mut() {
            let info = match image {
                Value::String(file) => {
                    let file = file.clone();
                    resolve_one(component, meta_dir, &file, pipeline, resolved).await?
                }
                _ => Value::Object(Map::new()),
            };
            *image = info;
        }
    }

    Ok(())
}

/// Null presets become `{}`; scalar presets become `{label: <scalar>}`.
fn normalize_preset(preset: &mut Value) {
    match preset {
        Value::Null => *preset = Value::Object(Map::new()),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            let mut map = Map::new();
            map.insert("label".to_string(), std::mem::take(preset));
            *preset = Value::Object(map);
        }
        Value::Object(_) | Value::Array(_) => {}
    }
}

async fn resolve_one(
    component: &str,
    meta_dir: &Path,
    file: &str,
    pipeline: &AssetPipeline,
    resolved: &mut Resolved,
) -> Result<Value> {
    match pipeline.process(component, meta_dir, file).await? {
        Some(processed) => {
            if let Some(data) = processed.encoded {
                resolved.assets.push((processed.info.path.clone(), data));
            }
            Ok(serde_json::to_value(processed.info)?)
        }
        None => {
            resolved.warnings.push(format!(
                "{component}: image not found: {}",
                meta_dir.join(file).display()
            ));
            Ok(Value::Object(Map::new()))
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy layout
// ---------------------------------------------------------------------------

/// Older layout: every `.yml` under `src` is a component config, keyed by the
/// directory two levels up (`<Name>/meta/config.yml`). No normalization or
/// asset work is performed. Parse errors are recorded on `compilation`.
pub fn build_legacy_schema(src: &Path, compilation: &mut Compilation) -> Result<Map<String, Value>> {
    if !src.is_dir() {
        return Err(CompkitError::MissingInput(src.to_path_buf()));
    }
    let mut schema = Map::new();
    for file in walker::find_files_with_suffix(src, "yml")? {
        let Some(name) = file
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        match loader::load_yaml(&file) {
            Ok(Some(data)) => {
                schema.insert(name, data);
            }
            Ok(None) => {}
            Err(e) => compilation.error(
                Some(&name),
                format!("Error processing {}: {e}", file.display()),
            ),
        }
    }
    Ok(schema)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
