use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use schemarel::config::{CliOverrides, GeneratorConfig};
use schemarel::generator::{Generator, ModelDescriptor};
use schemarel::report;
use schemarel::sql::{Dialect, SqlDump};

#[derive(Parser)]
#[command(name = "schemarel")]
#[command(about = "Infer model fields and relationships from a SQL schema dump")]
struct Cli {
    /// SQL DDL dump to introspect
    #[arg(required_unless_present = "fields_file")]
    input: Option<PathBuf>,
    /// Table to describe
    #[arg(short, long, required_unless_present = "fields_file")]
    table: Option<String>,
    /// JSON fields file to describe instead of a table (needs --model)
    #[arg(long, conflicts_with_all = ["input", "table"], requires = "model")]
    fields_file: Option<PathBuf>,
    /// Model name (default: singular of the table name)
    #[arg(short, long)]
    model: Option<String>,
    /// SQL dialect: auto, generic, postgres, mysql
    #[arg(short, long, default_value = "auto")]
    dialect: Dialect,
    /// Config file (default: ./schemarel.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Columns to skip, comma separated
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,
    /// Tables to leave out of the schema, comma separated
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
    /// Make introspected fields searchable
    #[arg(long, overrides_with = "no_searchable")]
    searchable: bool,
    /// Make introspected fields unsearchable, whatever the config file says
    #[arg(long, overrides_with = "searchable")]
    no_searchable: bool,
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let searchable_default = if self.searchable {
            Some(true)
        } else if self.no_searchable {
            Some(false)
        } else {
            None
        };

        CliOverrides {
            ignored_fields: self.ignore.clone(),
            excluded_tables: self.exclude.clone(),
            searchable_default,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let overrides = cli.overrides();
    let root = std::env::current_dir().context("Failed to read working directory")?;
    let config = GeneratorConfig::load(&root, cli.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;

    let descriptor = describe(&cli, &config)?;

    let rendered = match cli.format {
        Format::Text => report::render(&descriptor),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(&descriptor)
                .context("Failed to serialize model descriptor")?;
            json.push('\n');
            json
        }
    };

    match &cli.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}

fn describe(cli: &Cli, config: &GeneratorConfig) -> Result<ModelDescriptor> {
    if let Some(path) = &cli.fields_file {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(model) = cli.model.as_deref() else {
            bail!("--model is required with --fields-file");
        };
        return Generator::from_fields_file(&json, model, config)
            .with_context(|| format!("Failed to describe {}", path.display()));
    }

    let (Some(input), Some(table)) = (&cli.input, cli.table.as_deref()) else {
        bail!("an input dump and --table are required");
    };
    let sql = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let dump = SqlDump::new(sql, cli.dialect);

    Generator::from_table(&dump, config, table, cli.model.as_deref())
        .with_context(|| format!("Failed to describe table `{table}`"))
}
