//! # Sync Orchestrator
//!
//! The top-level state machine that synchronizes configured subtrees into
//! the host repository. One invocation processes its selected specs
//! strictly in sequence; each spec runs through the states
//!
//! ```text
//! Pull -> {NoOp | Materialize} -> PlaceFiles -> CommitPlacement
//!      -> MergeBack -> CommitMerge -> Done
//! ```
//!
//! where `Materialize` is either a collapse ([`crate::collapse`]) or a
//! clean checkout of the pulled head. Every state mutates the single
//! shared working copy through the VCS abstraction and completes before
//! the next begins; repository state is re-read after each mutating call,
//! never cached.
//!
//! Two global rules frame the run:
//!
//! - The working copy must be clean before anything happens. A dirty
//!   working copy (including one left behind by an interrupted earlier
//!   run) aborts the whole invocation with zero mutations.
//! - Each synced spec's merge commit becomes the merge-back target of the
//!   next spec, so batch imports compose onto each other instead of
//!   racing on a stale origin.
//!
//! A failing state aborts the run; commits made by earlier specs are
//! already durable history and are not rolled back.

use crate::collapse::{self, CollapseOptions, CollapseOutcome};
use crate::config::SubtreeSpec;
use crate::error::{Error, Result};
use crate::rules::{self, PlacementPlan};
use crate::vcs::{CommitId, CommitOutcome, Vcs};
use log::debug;

/// Message template for the file-placement changeset.
pub const MOVE_MESSAGE: &str = "subtree: move {name}";

/// Message template for the merge-back changeset.
pub const MERGE_MESSAGE: &str = "subtree: update {name}";

/// Per-invocation options, shared by every spec in the run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Open the operator's editor on every commit message.
    pub edit: bool,
    /// Strip imported upstream history after a successful collapse.
    pub prune: bool,
    /// Pull from this location instead of the spec's `source`. Only legal
    /// when exactly one spec is selected.
    pub source_override: Option<String>,
    /// Pull this revision instead of the spec's `rev`.
    pub rev_override: Option<String>,
}

/// Outcome of one spec's sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pull brought nothing new (or the collapse was content-identical);
    /// no commits were made.
    NoChanges,
    /// The subtree was grafted and merged back into the mainline.
    Synced {
        merge_commit: CommitId,
        /// Set when collapse-time history pruning failed (non-fatal).
        prune_warning: Option<String>,
    },
}

/// One spec's result, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub name: String,
    pub outcome: SyncOutcome,
}

/// The per-spec state machine states. Payloads carry exactly what the next
/// transition needs.
enum State {
    Pull,
    Materialize {
        pulled: CommitId,
    },
    PlaceFiles {
        prune_warning: Option<String>,
    },
    CommitPlacement {
        prune_warning: Option<String>,
    },
    MergeBack {
        placement: CommitId,
        prune_warning: Option<String>,
    },
    CommitMerge {
        prune_warning: Option<String>,
    },
    Done(SyncOutcome),
}

/// Drives sync runs against a VCS backend.
pub struct SyncEngine<'a> {
    vcs: &'a dyn Vcs,
    options: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(vcs: &'a dyn Vcs, options: SyncOptions) -> Self {
        SyncEngine { vcs, options }
    }

    /// Run the selected specs in order.
    ///
    /// Aborts before any mutation if the working copy is dirty or the
    /// option combination is illegal.
    pub fn run(&self, specs: &[&SubtreeSpec]) -> Result<Vec<SyncReport>> {
        if self.options.source_override.is_some() && specs.len() != 1 {
            return Err(Error::InvalidArgument {
                message: "a source override requires selecting a single subtree by name"
                    .to_string(),
            });
        }

        let status = self.vcs.status()?;
        if !status.is_clean() {
            return Err(Error::Precondition {
                message: "uncommitted changes in the working copy; a subtree sync rewrites \
                          the working copy, so it cannot proceed"
                    .to_string(),
            });
        }

        let mut origin = self.vcs.current_revision()?;
        let mut reports = Vec::with_capacity(specs.len());

        for spec in specs {
            let report = self.sync_one(spec, &origin)?;
            if let SyncOutcome::Synced { merge_commit, .. } = &report.outcome {
                // The next spec merges onto what this one produced.
                origin = merge_commit.clone();
            }
            reports.push(report);
        }

        Ok(reports)
    }

    /// Run one spec through the state machine.
    fn sync_one(&self, spec: &SubtreeSpec, origin: &CommitId) -> Result<SyncReport> {
        // Rule problems are diagnosed before the first VCS call for the
        // spec, so a broken entry costs nothing.
        let rule_text = spec
            .destination
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("no destination found for {}", spec.name),
                hint: Some("add a 'destination' block of mkdir/move/copy rules".to_string()),
            })?;
        let rules = rules::parse_rules(rule_text)?;

        let mut state = State::Pull;
        loop {
            state = match state {
                State::Pull => {
                    let before = self.vcs.tip()?;
                    let source = self
                        .options
                        .source_override
                        .as_deref()
                        .unwrap_or(&spec.source);
                    let rev = self.options.rev_override.as_deref().or(spec.rev.as_deref());
                    let pulled = self.vcs.pull(source, rev)?;
                    if pulled == before {
                        debug!("{}: no new upstream history", spec.name);
                        State::Done(SyncOutcome::NoChanges)
                    } else {
                        debug!("{}: pulled {}", spec.name, pulled.short());
                        State::Materialize { pulled }
                    }
                }

                State::Materialize { pulled } => {
                    if spec.collapse {
                        let options = CollapseOptions {
                            edit: self.options.edit,
                            prune: self.options.prune,
                        };
                        match collapse::collapse(self.vcs, &spec.name, &pulled, &options)? {
                            CollapseOutcome::NoChanges => {
                                debug!("{}: collapse produced no changes", spec.name);
                                State::Done(SyncOutcome::NoChanges)
                            }
                            CollapseOutcome::Collapsed { prune_warning, .. } => {
                                State::PlaceFiles { prune_warning }
                            }
                        }
                    } else {
                        self.vcs.checkout(pulled.as_str(), true)?;
                        State::PlaceFiles {
                            prune_warning: None,
                        }
                    }
                }

                State::PlaceFiles { prune_warning } => {
                    let manifest = self.vcs.manifest()?;
                    let plan = rules::plan(&rules, &manifest, spec.keep)?;
                    self.execute_plan(&plan)?;
                    State::CommitPlacement { prune_warning }
                }

                State::CommitPlacement { prune_warning } => {
                    let message = MOVE_MESSAGE.replace("{name}", &spec.name);
                    let placement = match self.vcs.commit(&message, self.options.edit)? {
                        CommitOutcome::Committed(id) => id,
                        // Placement changed nothing (e.g. keep with no
                        // matching rules); merge the materialized head
                        // itself.
                        CommitOutcome::NoChanges => self.vcs.current_revision()?,
                    };
                    State::MergeBack {
                        placement,
                        prune_warning,
                    }
                }

                State::MergeBack {
                    placement,
                    prune_warning,
                } => {
                    self.vcs.checkout(origin.short(), false)?;
                    self.vcs.merge(placement.short())?;
                    State::CommitMerge { prune_warning }
                }

                State::CommitMerge { prune_warning } => {
                    let message = MERGE_MESSAGE.replace("{name}", &spec.name);
                    let merge_commit = match self.vcs.commit(&message, self.options.edit)? {
                        CommitOutcome::Committed(id) => id,
                        CommitOutcome::NoChanges => self.vcs.current_revision()?,
                    };
                    State::Done(SyncOutcome::Synced {
                        merge_commit,
                        prune_warning,
                    })
                }

                State::Done(outcome) => {
                    return Ok(SyncReport {
                        name: spec.name.clone(),
                        outcome,
                    });
                }
            };
        }
    }

    /// Execute a placement plan: directories first so files have somewhere
    /// to land, copies before moves so a file can be duplicated and
    /// relocated in one pass, removals last so only truly unmatched files
    /// go.
    fn execute_plan(&self, plan: &PlacementPlan) -> Result<()> {
        for dir in &plan.mkdirs {
            self.vcs.mkdir(dir)?;
        }
        for (target, sources) in &plan.copies {
            self.vcs.copy(sources, target)?;
        }
        for (target, sources) in &plan.moves {
            self.vcs.rename(sources, target)?;
        }
        for path in &plan.removals {
            self.vcs.remove(path)?;
        }
        Ok(())
    }
}
