use crate::cmd::pick_module;
use crate::output::print_json;
use anyhow::Context;
use compkit_core::config::Config;
use compkit_core::deploy::copy_build;
use std::path::Path;

pub fn run(root: &Path, module: Option<String>, target: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let module = pick_module(&config.src_path(root), module)?;
    let report = copy_build(root, &config, &module, target)
        .with_context(|| format!("failed to copy build for {module}"))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Copied {} build {} to {}",
            report.module,
            report.version,
            report.target.display()
        );
    }
    Ok(())
}
