mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::GenerateArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "openapi-gen")]
#[command(about = "Generate OpenAPI documents from registered models and controllers")]
struct Cli {
    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "openapi_gen=info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the OpenAPI document
    Generate(GenerateArgs),

    /// Validate a written OpenAPI document
    Validate {
        /// Document to validate (JSON or YAML)
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Generate(args) => commands::generate(args),
        Commands::Validate { path } => commands::validate(&path),
    }
}
