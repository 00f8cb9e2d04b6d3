use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

/// http-inventory - HTTP(s) inventory source and dict2ini filter for Ansible
#[derive(Parser, Debug, Clone)]
#[command(name = "http-inventory", version, about)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load an inventory from an HTTP(s) endpoint and print it
    Inventory(InventoryArgs),

    /// Flatten a {section: {option: value}} mapping into records
    Dict2ini(Dict2iniArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct InventoryArgs {
    /// Path to the http_inventory.yml config file
    #[arg(short, long)]
    pub inventory: Option<String>,

    /// Print the whole inventory as JSON (default)
    #[arg(long, conflicts_with_all = ["host", "graph"])]
    pub list: bool,

    /// Print the variables of one host
    #[arg(long, value_name = "HOST", conflicts_with = "graph")]
    pub host: Option<String>,

    /// Print the group tree, starting at GROUP (default: all)
    #[arg(long, value_name = "GROUP", num_args = 0..=1, default_missing_value = "all")]
    pub graph: Option<String>,

    /// Limit to a host pattern (groups, globs, ~regex, `!` exclusion, `&` intersection)
    #[arg(short, long)]
    pub limit: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct Dict2iniArgs {
    /// YAML or JSON file holding the mapping, `-` for stdin
    #[arg(default_value = "-")]
    pub file: String,

    /// Leave string values unquoted
    #[arg(long)]
    pub no_quote: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Inventory args after merging CLI + config + defaults
#[derive(Debug, Clone)]
pub struct ResolvedArgs {
    pub inventory: String,
    pub limit: Option<String>,
}

/// dict2ini settings after merging CLI + config + defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDict2ini {
    pub quote: bool,
    pub format: OutputFormat,
}

impl ResolvedDict2ini {
    pub fn new(cmd: &Dict2iniArgs, quote: bool, format: OutputFormat) -> Self {
        Self {
            quote: quote && !cmd.no_quote,
            format: cmd.format.unwrap_or(format),
        }
    }
}
