use crate::output::{print_json, print_table};
use anyhow::Context;
use compkit_core::config::Config;
use compkit_core::version::{bump_module_version, current_version, list_versioned_modules, Bump};
use std::path::Path;

pub fn run(root: &Path, module: Option<&str>, bump: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let src = config.src_path(root);

    let Some(module) = module else {
        let mut rows = Vec::new();
        for module in list_versioned_modules(&src)? {
            let version = current_version(&src, &module)?.unwrap_or_else(|| "-".to_string());
            rows.push(vec![module, version]);
        }
        if json {
            let value: Vec<_> = rows
                .iter()
                .map(|r| serde_json::json!({ "module": r[0], "version": r[1] }))
                .collect();
            print_json(&value)?;
        } else if rows.is_empty() {
            println!("No versioned modules.");
        } else {
            print_table(&["MODULE", "VERSION"], rows);
        }
        return Ok(());
    };

    let bump: Bump = bump.parse()?;
    let change = bump_module_version(&src, module, bump)?;
    if json {
        print_json(&change)?;
    } else {
        println!("{}: {} -> {}", change.module, change.old, change.new);
    }
    Ok(())
}
