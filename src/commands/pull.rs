//! Pull command implementation
//!
//! The pull command drives the full sync pipeline for the selected
//! subtree(s): pull upstream history, optionally collapse it, place files
//! according to the destination rules, commit, and merge back into the
//! host mainline.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use hg_subtree::config;
use hg_subtree::hg::HgCli;
use hg_subtree::output::{emoji, OutputConfig};
use hg_subtree::sync::{SyncEngine, SyncOptions, SyncOutcome};

/// Arguments for the pull command
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Subtree to pull; all configured subtrees when omitted
    pub name: Option<String>,

    /// Path to the host repository root
    #[arg(short = 'R', long, value_name = "DIR", default_value = ".")]
    pub repo: PathBuf,

    /// Path to the configuration file (defaults to .hgsubtree.yaml in the
    /// repository root)
    #[arg(short, long, value_name = "FILE", env = "HG_SUBTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Invoke the editor on commit messages
    #[arg(short, long)]
    pub edit: bool,

    /// Pull from this source instead of the configured one (requires a
    /// subtree name)
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<String>,

    /// Pull this revision instead of the configured one
    #[arg(short, long, value_name = "REV")]
    pub rev: Option<String>,

    /// Keep imported upstream history after a collapse instead of
    /// stripping it
    #[arg(long)]
    pub no_prune: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the pull command
pub fn execute(args: PullArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let config_path = args
        .config
        .unwrap_or_else(|| args.repo.join(config::DEFAULT_CONFIG_FILE));
    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }

    let specs = config::from_file(&config_path)?;
    let selected = config::resolve(
        &specs,
        args.name.as_deref(),
        &config_path.display().to_string(),
    )?;

    if selected.is_empty() {
        if !args.quiet {
            println!(
                "{} No subtrees configured in {}",
                emoji(&out, "ℹ️", "[INFO]"),
                config_path.display()
            );
        }
        return Ok(());
    }

    let vcs = HgCli::new(&args.repo);
    let engine = SyncEngine::new(
        &vcs,
        SyncOptions {
            edit: args.edit,
            prune: !args.no_prune,
            source_override: args.source,
            rev_override: args.rev,
        },
    );

    let reports = engine.run(&selected)?;

    if !args.quiet {
        for report in &reports {
            match &report.outcome {
                SyncOutcome::NoChanges => {
                    println!(
                        "{} {}: no changes, nothing for subtree to do",
                        emoji(&out, "⏭️", "[SKIP]"),
                        report.name
                    );
                }
                SyncOutcome::Synced {
                    merge_commit,
                    prune_warning,
                } => {
                    println!(
                        "{} {}: updated, merged as {}",
                        emoji(&out, "✅", "[OK]"),
                        report.name,
                        merge_commit.short()
                    );
                    if let Some(warning) = prune_warning {
                        println!(
                            "{} {}: history pruning failed: {}",
                            emoji(&out, "⚠️", "[WARN]"),
                            report.name,
                            warning
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
