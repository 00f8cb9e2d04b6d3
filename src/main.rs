mod cli;
mod config;

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{
    Args, Command, Dict2iniArgs, InventoryArgs, OutputFormat, ResolvedArgs, ResolvedDict2ini,
};
use config::Config;
use http_inventory::filter;
use http_inventory::inventory::limit::apply_limit;
use http_inventory::inventory::render;
use http_inventory::inventory::Inventory;
use http_inventory::source::HttpInventorySource;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = Config::load();

    match args.command {
        Command::Inventory(cmd) => run_inventory(&cmd, &config),
        Command::Dict2ini(cmd) => run_dict2ini(&cmd, &config),
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level one step from warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .try_init()
        .ok();
}

fn run_inventory(cmd: &InventoryArgs, config: &Config) -> Result<()> {
    // Merge: CLI > config > defaults
    let args = ResolvedArgs {
        inventory: cmd
            .inventory
            .clone()
            .unwrap_or_else(|| config.inventory.clone()),
        limit: cmd.limit.clone(),
    };

    let source = HttpInventorySource::from_env();
    let mut inv = Inventory::new();
    source
        .parse(&mut inv, Path::new(&args.inventory))
        .with_context(|| format!("Failed to load inventory from: {}", args.inventory))?;
    inv.reconcile();

    if let Some(host) = &cmd.host {
        let vars = render::to_host(&inv, host)
            .with_context(|| format!("You must pass a single valid host to --host parameter: {host}"))?;
        println!("{}", serde_json::to_string_pretty(&vars)?);
        return Ok(());
    }

    let available: Vec<String> = if let Some(ref limit) = args.limit {
        let host_names = apply_limit(&inv, limit)?;
        if host_names.is_empty() {
            anyhow::bail!("No hosts matched the limit pattern: {limit}");
        }
        host_names
    } else {
        inv.all_hosts().into_iter().map(|h| h.name.clone()).collect()
    };

    if let Some(root) = &cmd.graph {
        let graph = render::to_graph(&inv, root, &available).with_context(|| {
            format!(
                "Unknown group '{root}', known groups: {}",
                inv.group_names().join(", ")
            )
        })?;
        println!("{graph}");
    } else {
        let list = render::to_list(&inv, &available);
        println!("{}", serde_json::to_string_pretty(&list)?);
    }
    Ok(())
}

fn run_dict2ini(cmd: &Dict2iniArgs, config: &Config) -> Result<()> {
    let args = ResolvedDict2ini::new(cmd, config.quote, config.format);

    let content = if cmd.file == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read mapping from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&cmd.file)
            .with_context(|| format!("Failed to read: {}", cmd.file))?
    };

    let data: Value = serde_yaml::from_str(&content).context("Failed to parse input mapping")?;
    let dict2ini = filter::lookup(filter::dict2ini::NAME).context("dict2ini filter missing")?;
    let records = dict2ini(&data, args.quote)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&records)?),
    }
    Ok(())
}
