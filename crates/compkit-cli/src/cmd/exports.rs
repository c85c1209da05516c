use crate::output::{print_json, print_table};
use anyhow::Context;
use compkit_core::config::Config;
use compkit_core::exports::generate_exports;
use std::path::Path;

pub fn run(root: &Path, module: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let reports = generate_exports(&config.src_path(root), module)?;

    if json {
        print_json(&reports)?;
        return Ok(());
    }
    if reports.is_empty() {
        println!("No modules with components found.");
        return Ok(());
    }
    let rows = reports
        .iter()
        .map(|r| {
            vec![
                r.module.clone(),
                r.components.len().to_string(),
                if r.written { "updated" } else { "unchanged" }.to_string(),
            ]
        })
        .collect();
    print_table(&["MODULE", "EXPORTS", "STATUS"], rows);
    Ok(())
}
