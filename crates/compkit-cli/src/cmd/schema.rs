use crate::cmd::pick_module;
use crate::output::print_json;
use anyhow::Context;
use compkit_core::compilation::Compilation;
use compkit_core::config::Config;
use compkit_core::paths;
use compkit_core::plan::BuildMode;
use compkit_core::schema::{build_legacy_schema, build_schema, SchemaRequest};
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    module: Option<String>,
    mode: &str,
    out: Option<PathBuf>,
    legacy: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let src = config.src_path(root);
    let mode: BuildMode = mode.parse()?;
    let mut compilation = Compilation::new();

    let (out, summary) = if legacy {
        let out = out.unwrap_or_else(|| config.dist_path(root));
        let schema = build_legacy_schema(&src, &mut compilation)?;
        let summary = serde_json::json!({ "components": schema.keys().collect::<Vec<_>>() });
        compilation.emit_asset(
            config.schema_output.clone(),
            serde_json::to_string_pretty(&schema)?.into_bytes(),
        );
        (out, summary)
    } else {
        let module = pick_module(&src, module)?;
        let out = out.unwrap_or_else(|| config.dev_path(root).join(&module).join("schema"));
        let request = SchemaRequest::new(paths::module_dir(&src, &module), mode, &out)
            .with_output(config.schema_output.clone())
            .with_concurrency(config.concurrency_limit());
        let rt = tokio::runtime::Runtime::new()?;
        let report = rt.block_on(build_schema(&request, &mut compilation))?;
        (out, serde_json::to_value(&report)?)
    };

    compilation
        .write_to(&out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    let schema_path = out.join(&config.schema_output);

    if json {
        print_json(&serde_json::json!({
            "path": schema_path,
            "report": summary,
            "errors": compilation.errors,
            "warnings": compilation.warnings,
        }))?;
    } else {
        println!("Wrote {}", schema_path.display());
        for w in &compilation.warnings {
            println!("  [warning] {}", w.message);
        }
        for e in &compilation.errors {
            println!("  [error] {}", e.message);
        }
    }

    if compilation.has_errors() {
        anyhow::bail!("schema generation finished with errors");
    }
    Ok(())
}
