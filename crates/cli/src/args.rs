//! Command-line definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sidesnap - snapshot scratch drafts into a sidecar git store
#[derive(Debug, Parser)]
#[command(name = "sidesnap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Work tree that holds the scratch directory (default: current directory)
    #[arg(long, global = true, env = "SIDESNAP_WORK_TREE")]
    pub work_tree: Option<PathBuf>,

    /// Scratch directory relative to the work tree
    #[arg(long, global = true, env = "SIDESNAP_SCRATCH")]
    pub scratch: Option<String>,

    /// Sidecar store directory relative to the work tree
    #[arg(long, global = true, env = "SIDESNAP_GIT_DIR")]
    pub git_dir: Option<String>,

    /// Print one JSON document on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Without a subcommand a short hint is printed
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the sidecar store and scratch directory if missing
    Ensure,
    /// Snapshot a scratch file
    Snap {
        /// File inside the scratch directory
        path: Option<String>,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
        /// Snapshot every changed file under the scratch directory
        #[arg(long)]
        all: bool,
        /// Write stdin to the path before snapshotting
        #[arg(long)]
        stdin: bool,
        /// Tag the commit message with a space name
        #[arg(long)]
        space: Option<String>,
    },
    /// List snapshots, newest first
    Log {
        path: Option<String>,
        /// Per-snapshot line counts for a single path
        #[arg(long)]
        timeline: bool,
        /// Only the latest N snapshots
        #[arg(long)]
        since: Option<usize>,
    },
    /// Show changes between snapshots
    Diff {
        path: Option<String>,
        /// Compare the latest snapshot with the working tree
        #[arg(long)]
        current: bool,
        /// Compare with the snapshot N commits back
        #[arg(long)]
        since: Option<usize>,
    },
    /// Show store state and pending scratch changes
    Status,
    /// Write a file's content from an older snapshot
    Restore {
        /// Commit, or an expression such as HEAD~2
        revision: String,
        path: Option<String>,
    },
    /// Drop all but the newest snapshots
    Prune {
        /// Number of snapshots to keep (at least 1)
        #[arg(long, allow_negative_numbers = true)]
        keep: Option<i64>,
    },
    /// Snapshot scratch files automatically as they change
    Watch {
        /// Glob limited to the scratch directory
        pattern: Option<String>,
        /// Quiet period in milliseconds before a snapshot
        #[arg(long, allow_negative_numbers = true)]
        debounce: Option<i64>,
        /// Also record deletions
        #[arg(long)]
        include_delete: bool,
        /// Skip snapshots for files that exist at startup
        #[arg(long)]
        no_initial: bool,
    },
    /// Print usage guidance for coding agents
    Prompt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_snap_with_global_flags() {
        let cli = Cli::try_parse_from([
            "sidesnap", "snap", "scratch/a.md", "-m", "outline", "--json", "--scratch", "drafts",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.scratch.as_deref(), Some("drafts"));
        match cli.command {
            Some(Commands::Snap { path, message, all, .. }) => {
                assert_eq!(path.as_deref(), Some("scratch/a.md"));
                assert_eq!(message.as_deref(), Some("outline"));
                assert!(!all);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_debounce() {
        let cli = Cli::try_parse_from(["sidesnap", "watch", "--debounce", "-5"]).unwrap();
        match cli.command {
            Some(Commands::Watch { debounce, .. }) => assert_eq!(debounce, Some(-5)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_keep() {
        let cli = Cli::try_parse_from(["sidesnap", "prune", "--keep", "-1"]).unwrap();
        match cli.command {
            Some(Commands::Prune { keep }) => assert_eq!(keep, Some(-1)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_is_optional() {
        let cli = Cli::try_parse_from(["sidesnap", "--json"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.json);
    }

    #[test]
    fn test_restore_requires_revision() {
        assert!(Cli::try_parse_from(["sidesnap", "restore"]).is_err());
    }
}
