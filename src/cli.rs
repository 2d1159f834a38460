use crate::view::Column;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gpuutil",
    version,
    about = "Observe GPU usage and pick devices for downstream jobs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a table of GPUs and the processes using them (the default)
    Show(ShowArgs),
    /// Pick GPUs and hand them to a downstream command
    Select(SelectArgs),
    /// Configure replay sources for captured nvidia-smi / ps output
    Redirect(RedirectArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ShowArgs {
    /// Columns to display, comma separated
    #[arg(long, value_enum, value_delimiter = ',')]
    pub columns: Option<Vec<Column>>,
    /// Column style string, e.g. "|r|r|l:30|"
    #[arg(long)]
    pub style: Option<String>,
    /// Per-column width limits, e.g. "10,,30" (blank = size to content)
    #[arg(long)]
    pub limits: Option<String>,
    /// Skip the process sub-table
    #[arg(long)]
    pub no_command: bool,
    /// One process owner per line in the Users column
    #[arg(long)]
    pub vertical: bool,
    /// Load display options from a saved profile
    #[arg(long)]
    pub profile: Option<String>,
    /// Save the resolved display options under this profile name
    #[arg(long)]
    pub save_profile: Option<String>,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Number of devices to select
    #[arg(short = 'n', long)]
    pub num: usize,
    /// Fill up with busy devices when free ones run out
    #[arg(long)]
    pub allow_nonfree: bool,
    /// Never prompt; accept proposed busy devices
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// Device ids never to select, comma separated
    #[arg(long, value_delimiter = ',')]
    pub blacklist: Vec<usize>,
    /// Command to run with CUDA_VISIBLE_DEVICES set (after `--`)
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RedirectArgs {
    /// File with captured `nvidia-smi --query-gpu` output
    #[arg(long)]
    pub nvsmi: Option<PathBuf>,
    /// File with captured `nvidia-smi --query-compute-apps` output
    #[arg(long)]
    pub apps: Option<PathBuf>,
    /// File with captured `ps axo user:20,pid,args` output
    #[arg(long)]
    pub ps: Option<PathBuf>,
    /// Remove all configured replay sources
    #[arg(long, conflicts_with_all = ["nvsmi", "apps", "ps"])]
    pub clear: bool,
}

/// Parse a `10,,30`-style width limit list; a blank entry means
/// size-to-content for that column.
pub fn parse_limits(spec: &str) -> anyhow::Result<Vec<Option<usize>>> {
    spec.split(',')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                let limit: usize = part
                    .parse()
                    .with_context(|| format!("invalid width limit {part:?}"))?;
                anyhow::ensure!(limit > 0, "width limit must be positive, got {part:?}");
                Ok(Some(limit))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_limits() {
        assert_eq!(parse_limits("10,,30").unwrap(), vec![Some(10), None, Some(30)]);
        assert_eq!(parse_limits("5").unwrap(), vec![Some(5)]);
        assert!(parse_limits("a,b").is_err());
        assert!(parse_limits("10,0").is_err());
    }

    #[test]
    fn test_show_args() {
        let cli = Cli::parse_from([
            "gpuutil",
            "show",
            "--columns",
            "id,free-mem,users",
            "--vertical",
        ]);
        let Some(Command::Show(args)) = cli.command else {
            panic!("expected show subcommand");
        };
        assert_eq!(
            args.columns,
            Some(vec![Column::Id, Column::FreeMem, Column::Users])
        );
        assert!(args.vertical);
        assert!(!args.no_command);
    }

    #[test]
    fn test_select_args_with_downstream_command() {
        let cli = Cli::parse_from([
            "gpuutil", "select", "-n", "2", "--blacklist", "0,3", "--", "python",
            "train.py",
        ]);
        let Some(Command::Select(args)) = cli.command else {
            panic!("expected select subcommand");
        };
        assert_eq!(args.num, 2);
        assert_eq!(args.blacklist, vec![0, 3]);
        assert_eq!(args.command, vec!["python", "train.py"]);
    }
}
