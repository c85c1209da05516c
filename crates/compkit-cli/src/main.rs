mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, new::NewSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "compkit",
    about = "Build and scaffold component-library modules",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from compkit.yaml or .git/)
    #[arg(long, global = true, env = "COMPKIT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a module: schema, image assets, manifest and version files
    Build {
        /// Build target, e.g. build, build:prod, watch:local
        #[arg(default_value = "build")]
        target: String,

        /// production or development (default: from CF_PAGES_BRANCH, else production)
        #[arg(long)]
        mode: Option<String>,

        /// Publish a local remote registry instead of version files
        #[arg(long)]
        local: bool,
    },

    /// Generate the schema for one module without a full build
    Schema {
        /// Module name (default: TARGET_COLLECTION, else the first module)
        module: Option<String>,

        /// production or development
        #[arg(long, default_value = "development")]
        mode: String,

        /// Output directory (default: <dev_dir>/<module>/schema)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Read every .yml under the source tree instead of one module
        #[arg(long)]
        legacy: bool,
    },

    /// Regenerate dynamicExports.js for one or all modules
    Exports {
        /// Module name (omit for all modules)
        module: Option<String>,
    },

    /// Create a module or component from templates
    New {
        #[command(subcommand)]
        subcommand: NewSubcommand,
    },

    /// Show module versions or bump one
    Version {
        /// Module to bump (omit to list versions)
        module: Option<String>,

        /// major, minor or patch
        #[arg(long, default_value = "patch")]
        bump: String,
    },

    /// Copy the latest development build of a module to a deploy directory
    Deploy {
        /// Module name (default: TARGET_COLLECTION, else the first module)
        module: Option<String>,

        /// Destination directory
        #[arg(long, env = "OUTPUT_COPY_DIR")]
        target: PathBuf,
    },

    /// Open a public cloudflared tunnel to the local dev server
    Tunnel {
        /// Local port (default: dev_server_port from compkit.yaml)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate compkit.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Build { .. } | Commands::Tunnel { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Build {
            target,
            mode,
            local,
        } => cmd::build::run(&root, &target, mode.as_deref(), local, cli.json),
        Commands::Schema {
            module,
            mode,
            out,
            legacy,
        } => cmd::schema::run(&root, module, &mode, out, legacy, cli.json),
        Commands::Exports { module } => cmd::exports::run(&root, module.as_deref(), cli.json),
        Commands::New { subcommand } => cmd::new::run(&root, subcommand, cli.json),
        Commands::Version { module, bump } => {
            cmd::version::run(&root, module.as_deref(), &bump, cli.json)
        }
        Commands::Deploy { module, target } => cmd::deploy::run(&root, module, &target, cli.json),
        Commands::Tunnel { port } => cmd::tunnel::run(&root, port),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
