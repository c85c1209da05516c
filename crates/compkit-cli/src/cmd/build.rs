use crate::output::print_json;
use anyhow::Context;
use compkit_core::cleanup::{clean_public_url, finish_build};
use compkit_core::compilation::Compilation;
use compkit_core::config::Config;
use compkit_core::manifest::emit_manifest;
use compkit_core::plan::{BuildEnv, BuildMode, BuildPlan, BuildRequest, BuildTarget};
use compkit_core::schema::{build_schema, SchemaRequest};
use std::path::Path;

pub fn run(
    root: &Path,
    target: &str,
    mode: Option<&str>,
    local: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let target: BuildTarget = target.parse()?;
    let mode = mode.map(str::parse::<BuildMode>).transpose()?;
    let request = BuildRequest {
        target,
        mode,
        local: local || target == BuildTarget::WatchLocal,
    };
    let env = BuildEnv::from_lookup(|key| std::env::var(key).ok());

    let plan = BuildPlan::resolve(root, &config, &request, &env)?;
    tracing::info!(
        "building {} ({}) into {}",
        plan.module,
        plan.mode,
        plan.output_path.display()
    );
    plan.write_version_files(root, &config)
        .context("failed to write version files")?;

    let schema_request = SchemaRequest::new(&plan.module_root, plan.mode, &plan.output_path)
        .with_output(config.schema_output.clone())
        .with_concurrency(config.concurrency_limit());
    let mut compilation = Compilation::new();

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(build_schema(&schema_request, &mut compilation))?;

    emit_manifest(&mut compilation, &config.manifest_output)?;
    compilation
        .write_to(&plan.output_path)
        .context("failed to write build output")?;

    let had_errors = compilation.has_errors();
    let cleanup = finish_build(&plan.dest, &plan.build_id, config.keep_builds, had_errors)?;
    let public_url = match (&plan.public_path, had_errors) {
        (Some(path), false) => Some(clean_public_url(path, &plan.build_id)),
        _ => None,
    };
    if let Some(url) = &public_url {
        tracing::info!("public url: {url}");
    }

    if json {
        print_json(&serde_json::json!({
            "build_id": plan.build_id,
            "module": plan.module,
            "target": plan.target,
            "mode": plan.mode,
            "output_path": plan.output_path,
            "public_url": public_url,
            "schema": report,
            "removed": cleanup.removed,
            "errors": compilation.errors,
            "warnings": compilation.warnings,
        }))?;
    } else {
        println!(
            "Built {} [{}] -> {}",
            plan.module,
            plan.mode,
            plan.output_path.display()
        );
        println!(
            "  components: {} exported, {} skipped, {} failed",
            report.exported.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for w in &compilation.warnings {
            println!("  [warning] {}", w.message);
        }
        for e in &compilation.errors {
            println!("  [error] {}", e.message);
        }
        if let Some(url) = &public_url {
            println!("  url: {url}");
        }
    }

    if had_errors {
        anyhow::bail!(
            "build finished with {} error(s)",
            compilation.errors.len()
        );
    }
    Ok(())
}
