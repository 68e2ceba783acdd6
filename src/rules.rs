//! # Destination Rules and Placement Planning
//!
//! A subtree's `destination` block describes where the pulled files belong
//! inside the host repository. Each non-blank line is one rule:
//!
//! ```text
//! mkdir third_party/lib
//! move *.c third_party/lib
//! copy LICENSE docs/licenses
//! ```
//!
//! ## Key Components
//!
//! - **`DestinationRule`**: One parsed rule: `mkdir PATH`,
//!   `move PATTERN TARGET` or `copy PATTERN TARGET`. Patterns are shell
//!   globs matched against manifest-relative paths.
//!
//! - **`parse_rules`**: Tokenizes rule text into an ordered rule list.
//!
//! - **`plan`**: Applies the rules to a file manifest and produces a
//!   [`PlacementPlan`], the full move/copy/remove assignment for the sync.
//!
//! Rules are order-preserving but not mutually exclusive: a file matching
//! both a `copy` and a `move` rule is duplicated *and* relocated. A file
//! matching no rule at all is scheduled for removal unless the subtree's
//! `keep` flag is set.
//!
//! Planning is deterministic: the manifest is iterated in sorted order and
//! buckets are sorted maps, so identical inputs always produce identical
//! operation batches (and therefore identical commits).

use crate::error::{Error, Result};
use glob::Pattern;
use std::collections::{BTreeMap, BTreeSet};

/// One line of a destination rule block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationRule {
    /// Create a directory (verbatim path) before any file lands in it.
    Mkdir { path: String },
    /// Rename every manifest path matching `pattern` into `target`.
    Move { pattern: String, target: String },
    /// Copy every manifest path matching `pattern` into `target`.
    Copy { pattern: String, target: String },
}

/// The computed move/copy/remove assignment for one sync.
///
/// `copies` and `moves` group source files by target directory because the
/// underlying rename/copy primitives take multiple sources and a single
/// destination per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Directories to create, in rule declaration order, deduplicated.
    pub mkdirs: Vec<String>,
    /// target directory -> source files to copy there
    pub copies: BTreeMap<String, Vec<String>>,
    /// target directory -> source files to rename there
    pub moves: BTreeMap<String, Vec<String>>,
    /// Manifest paths matched by no rule, scheduled for removal.
    pub removals: BTreeSet<String>,
}

/// Parses destination rule text into an ordered rule list.
///
/// Blank lines are ignored; every other line is tokenized on whitespace
/// into an operation and its arguments. Unknown operations and wrong
/// argument counts fail with [`Error::Config`].
pub fn parse_rules(text: &str) -> Result<Vec<DestinationRule>> {
    let mut rules = Vec::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (op, args) = match tokens.split_first() {
            Some((op, args)) => (*op, args),
            None => continue,
        };

        let rule = match op {
            "mkdir" => match args {
                [path] => DestinationRule::Mkdir {
                    path: path.to_string(),
                },
                _ => return Err(arity_error(op, 1, args.len())),
            },
            "move" => match args {
                [pattern, target] => DestinationRule::Move {
                    pattern: pattern.to_string(),
                    target: target.to_string(),
                },
                _ => return Err(arity_error(op, 2, args.len())),
            },
            "copy" => match args {
                [pattern, target] => DestinationRule::Copy {
                    pattern: pattern.to_string(),
                    target: target.to_string(),
                },
                _ => return Err(arity_error(op, 2, args.len())),
            },
            other => {
                return Err(Error::Config {
                    message: format!("unknown destination rule '{}'", other),
                    hint: Some(
                        "valid rules are 'mkdir PATH', 'move PATTERN TARGET', 'copy PATTERN TARGET'"
                            .to_string(),
                    ),
                });
            }
        };

        rules.push(rule);
    }

    Ok(rules)
}

fn arity_error(op: &str, expected: usize, got: usize) -> Error {
    Error::Config {
        message: format!(
            "destination rule '{}' takes {} argument{}, got {}",
            op,
            expected,
            if expected == 1 { "" } else { "s" },
            got
        ),
        hint: None,
    }
}

/// Computes the placement plan for a manifest under the given rules.
///
/// Every manifest path ends up either in at least one copy/move bucket, in
/// `removals`, or (with `keep`) untouched, never in limbo. Glob patterns
/// are compiled here, so an invalid pattern surfaces as [`Error::Glob`]
/// before any file operation runs.
pub fn plan(rules: &[DestinationRule], manifest: &[String], keep: bool) -> Result<PlacementPlan> {
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        let pattern = match rule {
            DestinationRule::Move { pattern, .. } | DestinationRule::Copy { pattern, .. } => {
                Some(Pattern::new(pattern)?)
            }
            DestinationRule::Mkdir { .. } => None,
        };
        compiled.push((rule, pattern));
    }

    let mut plan = PlacementPlan::default();

    for (rule, _) in &compiled {
        if let DestinationRule::Mkdir { path } = rule {
            if !plan.mkdirs.iter().any(|existing| existing == path) {
                plan.mkdirs.push(path.clone());
            }
        }
    }

    let mut paths: Vec<&String> = manifest.iter().collect();
    paths.sort();

    for path in paths {
        let mut matched = false;

        for (rule, pattern) in &compiled {
            let (target, bucket) = match rule {
                DestinationRule::Move { target, .. } => (target, &mut plan.moves),
                DestinationRule::Copy { target, .. } => (target, &mut plan.copies),
                DestinationRule::Mkdir { .. } => continue,
            };
            // Patterns are compiled for every move/copy rule above.
            let pattern = match pattern {
                Some(pattern) => pattern,
                None => continue,
            };
            if pattern.matches(path) {
                matched = true;
                bucket.entry(target.clone()).or_default().push(path.clone());
            }
        }

        if !matched && !keep {
            plan.removals.insert(path.clone());
        }
    }

    Ok(plan)
}
