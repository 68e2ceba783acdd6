//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks a
//! `.hgsubtree.yaml` configuration file without performing any sync.
//!
//! ## Functionality
//!
//! - **Configuration Validation**: Parses the configuration file and
//!   validates its structure and contents.
//! - **Rule Validation**: Parses every subtree's destination rule block
//!   and compiles its glob patterns.
//!
//! This command is a safe, read-only operation: it makes no VCS calls and
//! modifies no files.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use hg_subtree::config;
use hg_subtree::output::{emoji, OutputConfig};
use hg_subtree::rules::{self, DestinationRule};

/// Validate a .hgsubtree.yaml configuration file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file to validate
    #[arg(short, long, value_name = "FILE", default_value = config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating configuration: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.config.display()
    );

    let specs = config::from_file(&args.config)?;
    println!(
        "{} Configuration file parsed successfully ({} subtree(s))",
        emoji(&out, "✅", "[OK]"),
        specs.len()
    );

    let mut problems = 0;
    for spec in &specs {
        match spec
            .destination
            .as_deref()
            .filter(|text| !text.trim().is_empty())
        {
            None => {
                problems += 1;
                println!(
                    "{} {}: no destination rules",
                    emoji(&out, "❌", "[ERR]"),
                    spec.name
                );
            }
            Some(text) => match validate_rules(text) {
                Ok(count) => {
                    println!(
                        "{} {}: {} destination rule(s)",
                        emoji(&out, "✅", "[OK]"),
                        spec.name,
                        count
                    );
                }
                Err(e) => {
                    problems += 1;
                    println!("{} {}: {}", emoji(&out, "❌", "[ERR]"), spec.name, e);
                }
            },
        }
    }

    if problems > 0 {
        anyhow::bail!("{} subtree spec(s) failed validation", problems);
    }
    Ok(())
}

/// Parse a rule block and compile its glob patterns; returns the rule
/// count.
fn validate_rules(text: &str) -> hg_subtree::error::Result<usize> {
    let parsed = rules::parse_rules(text)?;
    for rule in &parsed {
        if let DestinationRule::Move { pattern, .. } | DestinationRule::Copy { pattern, .. } = rule
        {
            glob::Pattern::new(pattern)?;
        }
    }
    Ok(parsed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/config.yaml"),
        };
        assert!(execute(args, "never").is_err());
    }

    #[test]
    fn test_validate_good_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(config::DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "lib:\n  source: ../upstream\n  destination: |\n    mkdir lib\n    move *.c lib\n",
        )
        .unwrap();

        let args = ValidateArgs { config: path };
        assert!(execute(args, "never").is_ok());
    }

    #[test]
    fn test_validate_flags_missing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(config::DEFAULT_CONFIG_FILE);
        fs::write(&path, "lib:\n  source: ../upstream\n").unwrap();

        let args = ValidateArgs { config: path };
        let result = execute(args, "never");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("failed validation"));
    }

    #[test]
    fn test_validate_rules_rejects_bad_glob() {
        assert!(validate_rules("move [ lib\n").is_err());
        assert_eq!(validate_rules("mkdir lib\nmove *.c lib\n").unwrap(), 2);
    }
}
