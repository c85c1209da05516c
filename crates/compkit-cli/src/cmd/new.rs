use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use compkit_core::config::Config;
use compkit_core::scaffold::{self, ComponentKind, ComponentOptions, ComponentType};
use std::path::Path;

#[derive(Subcommand)]
pub enum NewSubcommand {
    /// Create a module under the source directory
    Module {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Create a component inside a module
    Component {
        name: String,
        /// Target module (default: most recently modified)
        #[arg(long)]
        module: Option<String>,
        /// export, config, plain or shared
        #[arg(long, default_value = "export")]
        kind: String,
        /// section, block or element
        #[arg(long = "type", value_name = "TYPE", default_value = "section")]
        component_type: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated `name:type` pairs, e.g. `title:string,count:number`
        #[arg(long, default_value = "")]
        parameters: String,
    },
}

pub fn run(root: &Path, subcmd: NewSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let src = config.src_path(root);

    match subcmd {
        NewSubcommand::Module { name, description } => {
            let path = scaffold::create_module(&src, &name, description.as_deref())?;
            if json {
                print_json(&serde_json::json!({ "module": name, "path": path }))?;
            } else {
                println!("Created module '{name}' at {}", path.display());
            }
        }
        NewSubcommand::Component {
            name,
            module,
            kind,
            component_type,
            description,
            parameters,
        } => {
            let opts = ComponentOptions {
                name,
                module,
                kind: kind.parse::<ComponentKind>()?,
                component_type: component_type.parse::<ComponentType>()?,
                description,
                parameters,
            };
            let created = scaffold::create_component(&src, &opts)?;
            if json {
                print_json(&created)?;
            } else {
                println!(
                    "Created component '{}' in module '{}'",
                    opts.name, created.module
                );
                for file in &created.files {
                    println!("  {}", file.display());
                }
            }
        }
    }
    Ok(())
}
