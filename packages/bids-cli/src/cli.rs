use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bidscat",
    version,
    about = "Inspect and query BIDS-style EEG dataset layouts",
    long_about = "Index a dataset laid out as sub-<id>/ses-<id>/<datatype>/<file>, \
                  select files by entity and check paths against the naming convention.\n\
                  Scan options are read from --config, $BIDS_CATALOG_SKIP_MARKER and \
                  $BIDS_CATALOG_PARALLEL."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file (default: <config dir>/bids-catalog/config.json)
    #[arg(long, global = true, env = "BIDS_CATALOG_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a dataset and print a summary
    Scan(ScanArgs),
    /// Print the files matching a selection
    Select(SelectArgs),
    /// Decode and validate a single path
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Dataset root directory
    #[arg(long)]
    pub root: String,

    /// Only scan this subject
    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub session: Option<String>,

    #[arg(long)]
    pub datatype: Option<String>,

    #[arg(long)]
    pub task: Option<String>,

    #[arg(long)]
    pub run: Option<String>,

    #[arg(long)]
    pub acquisition: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub suffix: Option<String>,

    /// File extension, with or without the leading dot
    #[arg(long)]
    pub extension: Option<String>,

    /// Fail (exit code 3) if any file is rejected
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// List every rejected file
    #[arg(long, default_value_t = false)]
    pub errors: bool,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Dataset root directory
    #[arg(long)]
    pub root: String,

    /// Keep files where column matches, as "column=value[,value...]"
    #[arg(long = "where", value_name = "COLUMN=VALUES", value_parser = parse_criterion)]
    pub filters: Vec<(String, String)>,

    /// Drop files where column matches, as "column=value[,value...]"
    #[arg(long, value_name = "COLUMN=VALUES", value_parser = parse_criterion)]
    pub exclude: Vec<(String, String)>,

    /// Output matching records as JSON instead of paths
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Path to check; the file does not need to exist
    pub path: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Parse "column=value" into its two halves.
pub fn parse_criterion(s: &str) -> Result<(String, String), String> {
    let (column, value) = s.split_once('=').ok_or_else(|| {
        format!(
            "Invalid criterion '{}': expected 'column=value' (e.g. 'subject=001,002')",
            s
        )
    })?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Invalid criterion '{}': column name is empty", s));
    }
    Ok((column.to_string(), value.trim().to_string()))
}
