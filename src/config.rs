//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `.hgsubtree.yaml`
//! configuration file, as well as the logic for parsing it. The file is a
//! YAML mapping from subtree name to a small record describing where that
//! subtree comes from and where its files belong:
//!
//! ```yaml
//! vendor:
//!   source: https://example.com/vendor-lib
//!   rev: stable
//!   collapse: true
//!   destination: |
//!     mkdir third_party/vendor
//!     move *.c third_party/vendor
//!     move *.h third_party/vendor
//! ```
//!
//! ## Key Components
//!
//! - **`SubtreeSpec`**: One configured import: name, source location,
//!   optional revision selector, raw destination rule text, and the
//!   `collapse` / `keep` flags. Specs are immutable for the duration of a
//!   sync run.
//!
//! - **`parse` / `from_file`**: Turn configuration text into an ordered
//!   `Vec<SubtreeSpec>`.
//!
//! - **`resolve`**: Select the specs a run operates on: a single named
//!   spec, or every spec in declaration order.
//!
//! ## Parsing
//!
//! The top-level mapping is walked manually rather than derived, for two
//! reasons: declaration order is significant (batch runs process subtrees
//! in the order they are written, and later merges build on earlier ones),
//! and duplicate names must be rejected rather than silently last-wins.
//! The record under each name is deserialized with serde. Destination rule
//! *text* is carried verbatim here; its line syntax is parsed by
//! [`crate::rules`].

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// Default configuration file name, relative to the host repository root.
pub const DEFAULT_CONFIG_FILE: &str = ".hgsubtree.yaml";

/// One configured subtree import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeSpec {
    /// Unique name of the subtree, the top-level mapping key.
    pub name: String,
    /// Location of the upstream repository (anything the VCS can pull from).
    pub source: String,
    /// Revision selector to pull instead of the upstream tip.
    pub rev: Option<String>,
    /// Raw destination rule text; one `mkdir`/`move`/`copy` rule per line.
    ///
    /// `None` when the config omits the block. That is only diagnosed when
    /// the spec is actually synced, so other subtrees in a batch run are
    /// not held hostage by one incomplete entry.
    pub destination: Option<String>,
    /// Collapse pulled history into a single synthetic changeset per sync.
    pub collapse: bool,
    /// Leave files unmatched by any rule in place instead of removing them.
    pub keep: bool,
}

/// The raw shape of one subtree record.
///
/// The flags are `Option<Value>` rather than `Option<bool>` so a bare
/// `collapse:` (present, null) can count as true.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    source: Option<String>,
    rev: Option<String>,
    destination: Option<String>,
    collapse: Option<Value>,
    keep: Option<Value>,
}

/// Parses configuration text into an ordered list of subtree specs.
///
/// Fails with [`Error::Config`] on anything other than a mapping of
/// mappings, on duplicate subtree names, on unknown keys, and on a missing
/// `source`.
pub fn parse(yaml_content: &str) -> Result<Vec<SubtreeSpec>> {
    let root: Value = serde_yaml::from_str(yaml_content)?;

    let mapping = match root {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(Error::Config {
                message: "top level of the configuration must be a mapping of subtree names"
                    .to_string(),
                hint: None,
            });
        }
    };

    let mut specs: Vec<SubtreeSpec> = Vec::with_capacity(mapping.len());

    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| Error::Config {
                message: "subtree names must be strings".to_string(),
                hint: None,
            })?
            .to_string();

        if specs.iter().any(|spec| spec.name == name) {
            return Err(Error::Config {
                message: format!("duplicate subtree name '{}'", name),
                hint: None,
            });
        }

        specs.push(parse_spec(name, value)?);
    }

    Ok(specs)
}

/// Parse one subtree record.
fn parse_spec(name: String, value: Value) -> Result<SubtreeSpec> {
    let raw: RawSpec = serde_yaml::from_value(value).map_err(|e| Error::Config {
        message: format!("subtree '{}': {}", name, e),
        hint: Some("valid keys are source, rev, destination, collapse, keep".to_string()),
    })?;

    let source = raw.source.ok_or_else(|| Error::Config {
        message: format!("subtree '{}' is missing required key 'source'", name),
        hint: None,
    })?;

    let collapse = flag_value(&name, "collapse", raw.collapse)?;
    let keep = flag_value(&name, "keep", raw.keep)?;

    Ok(SubtreeSpec {
        name,
        source,
        rev: raw.rev,
        destination: raw.destination,
        collapse,
        keep,
    })
}

/// Flags are presence-as-boolean: a bare `collapse:` counts as true.
fn flag_value(name: &str, key: &str, value: Option<Value>) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(Value::Null) => Ok(true),
        Some(Value::Bool(b)) => Ok(b),
        Some(_) => Err(Error::Config {
            message: format!("key '{}' of subtree '{}' must be a boolean", key, name),
            hint: None,
        }),
    }
}

/// Reads and parses a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtreeSpec>> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Selects the specs a run operates on.
///
/// With a name, returns the single matching spec or [`Error::NotFound`]
/// (the `config` argument is only used for that message). Without a name,
/// returns every spec in declaration order.
pub fn resolve<'a>(
    specs: &'a [SubtreeSpec],
    name: Option<&str>,
    config: &str,
) -> Result<Vec<&'a SubtreeSpec>> {
    match name {
        Some(name) => {
            let spec = specs
                .iter()
                .find(|spec| spec.name == name)
                .ok_or_else(|| Error::NotFound {
                    name: name.to_string(),
                    config: config.to_string(),
                })?;
            Ok(vec![spec])
        }
        None => Ok(specs.iter().collect()),
    }
}
