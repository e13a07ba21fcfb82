/// Command-line arguments.
use clap::{ArgGroup, Parser, ValueEnum};
use foldersweep_core::{size_to_bytes, ProbeConfig, ScanConfig, SortOrder};
use std::path::PathBuf;
use std::time::Duration;

/// FolderSweep - size up subfolders and clear out the ones you don't need
#[derive(Parser, Debug)]
#[command(name = "foldersweep")]
#[command(about = "Measure every subfolder of a directory in parallel, then bulk-delete the ones you pick")]
#[command(version)]
#[command(group(ArgGroup::new("selection").args(["select_below", "select_all"])))]
pub struct Cli {
    /// Folder whose subfolders should be measured
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Maximum parallel size probes [default: min(8, 2 x CPUs)]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Overall scan deadline in seconds [default: max(60, folders / 10)]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Size column sort direction
    #[arg(long, value_enum, default_value_t = SortArg::Asc)]
    pub sort: SortArg,

    /// Select folders smaller than SIZE, e.g. "20 MB"
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub select_below: Option<u64>,

    /// Select every folder
    #[arg(long)]
    pub select_all: bool,

    /// Delete the selected folders after the scan
    #[arg(long, requires = "selection")]
    pub delete: bool,

    /// Do not ask for confirmation before deleting
    #[arg(short, long)]
    pub yes: bool,

    /// Output format for the results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Never use the platform listing command; always walk the tree
    #[arg(long)]
    pub walk_only: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortOrder::Ascending,
            SortArg::Desc => SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    /// Scan configuration implied by the flags.
    pub fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::default();
        if let Some(workers) = self.workers {
            config = config.with_max_workers(workers);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_deadline(Duration::from_secs(secs));
        }
        if self.walk_only {
            config = config.with_probe(ProbeConfig {
                use_dir_command: false,
                ..ProbeConfig::default()
            });
        }
        config
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn parse_size_arg(text: &str) -> Result<u64, String> {
    size_to_bytes(text).ok_or_else(|| format!("invalid size `{text}` (try \"20 MB\")"))
}
