use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use datasrc::{
    Context, Registry,
    config::{Config, ConfigLoader, ConfigValidator},
    globals, parse_data_source, read_data_source,
};

#[derive(Parser)]
#[command(name = "datasrc")]
#[command(about = "Read and parse declared data sources (files, URLs, buckets, secrets, KV stores, git)", long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Define a datasource, as `alias=URL` or a bare file name
    #[arg(short = 'd', long = "datasource", value_name = "ALIAS=URL")]
    datasources: Vec<String>,

    /// Add a header to a datasource, as `alias=Name: value`
    #[arg(short = 'H', long = "datasource-header", value_name = "ALIAS=HEADER")]
    headers: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the raw data of a datasource to stdout
    Read {
        alias: String,
        /// Sub-path, key or reference appended to the datasource URL
        arg: Option<String>,
    },
    /// Decode a datasource and print it as JSON
    Parse { alias: String, arg: Option<String> },
    /// List the defined datasource aliases
    List,
    /// List the supported URL schemes
    Schemes,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "datasrc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .map_err(|e| eyre!("{e:#}"))
            .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config
        .merge_args(&cli.datasources, &cli.headers)
        .map_err(|e| eyre!("{e:#}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = Arc::new(Registry::with_defaults());

    if let Command::Schemes = cli.command {
        for scheme in registry.schemes() {
            println!("{scheme}");
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    ConfigValidator::validate(&config, &registry).map_err(|e| eyre!("{e:#}"))?;

    let aliases = config.data_sources().map_err(|e| eyre!("{e:#}"))?;
    let http_client = globals::build_http_client(config.http.timeout().map_err(|e| eyre!("{e:#}"))?);
    let ctx = Context::new(registry)
        .with_http_client(http_client)
        .with_aliases(aliases);

    match &cli.command {
        Command::Read { alias, arg } => {
            let ds = ctx
                .alias(alias)
                .ok_or_else(|| eyre!("Undefined datasource '{alias}'"))?;
            let args: Vec<&str> = arg.iter().map(String::as_str).collect();
            let (content_type, data) = read_data_source(&ctx, ds, &args).await?;
            if cli.verbose {
                eprintln!("Content-Type: {content_type}");
            }
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Command::Parse { alias, arg } => {
            let ds = ctx
                .alias(alias)
                .ok_or_else(|| eyre!("Undefined datasource '{alias}'"))?;
            let args: Vec<&str> = arg.iter().map(String::as_str).collect();
            let value = parse_data_source(&ctx, ds, &args).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::List => {
            let mut names: Vec<&String> = ctx.aliases().keys().collect();
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
        Command::Schemes => {}
    }

    Ok(())
}
