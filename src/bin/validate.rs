//! Schema Validation CLI
//!
//! Loads declarative schema definitions and validates JSON documents
//! against them.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use record_schemas::{EngineConfig, OutputFormat, SchemaLoader, SchemaRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-validate")]
#[command(about = "Validate JSON documents against declared record schemas")]
struct Cli {
    /// Definition file or directory (repeatable; defaults to the configured paths)
    #[arg(short, long)]
    definitions: Vec<PathBuf>,

    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Compact JSON output
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered schemas
    List,

    /// Print the descriptive representation of a schema
    Describe {
        /// Schema name
        schema: String,
    },

    /// Validate a JSON document and print its serialized form
    Check {
        /// Schema name
        schema: String,
        /// JSON file holding one object
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = EngineConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let format = if cli.compact { OutputFormat::Compact } else { config.output.format };

    let paths = if cli.definitions.is_empty() {
        config.definition_paths()
    } else {
        cli.definitions.clone()
    };
    if paths.is_empty() {
        bail!("no definition paths given; pass --definitions or set [definitions] paths in the config");
    }

    let loader = SchemaLoader::from_config(&config);
    let mut registry = SchemaRegistry::new();
    for path in &paths {
        loader
            .load_path(&mut registry, path)
            .with_context(|| format!("loading definitions from {}", path.display()))?;
    }

    match cli.command {
        Commands::List => {
            for name in registry.names() {
                let schema = registry.schema(name)?;
                println!("{} ({} fields)", name, schema.len());
            }
            Ok(())
        }

        Commands::Describe { schema } => {
            let repr = registry.representation(&schema)?;
            println!("{}", format.render(&repr)?);
            Ok(())
        }

        Commands::Check { schema, input } => {
            let content = std::fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
            let document: serde_json::Value =
                serde_json::from_str(&content).with_context(|| format!("parsing {}", input.display()))?;

            match registry.construct_json(&schema, document) {
                Ok(record) => {
                    println!("{}", format.render(&record.to_json())?);
                    Ok(())
                }
                Err(e) => {
                    println!("❌ {} - {}", input.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }
}
