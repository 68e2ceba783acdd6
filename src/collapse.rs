//! # Collapse Engine
//!
//! Collapsing compresses an arbitrary range of pulled upstream history into
//! a single synthetic changeset per sync, anchored to a persistent marker
//! named `subtree@{name}`. The synthetic changeset carries the upstream
//! *content* but none of its ancestry, so the host's history gains one
//! commit per sync instead of the upstream's full graph.
//!
//! The protocol, for a freshly pulled upstream tip:
//!
//! 1. Check out the subtree's marker if it exists, otherwise the empty
//!    state (first collapse ever starts from nothing).
//! 2. Revert the working copy's content to exactly match the pulled tip's
//!    tree.
//! 3. Drop substructure metadata files (`.hgsub`, `.hgsubstate`) that
//!    would corrupt the host repository's own subrepository bookkeeping.
//! 4. Commit. If nothing changed, the whole sync is a no-op and no marker
//!    moves.
//! 5. Move the marker to the new changeset (forced, inactive; it is
//!    bookkeeping, not the working branch).
//! 6. Optionally prune: delete other subtree markers now subsumed by this
//!    pull, then strip the imported upstream history. Pruning runs only
//!    after the commit has succeeded, and a pruning failure is demoted to
//!    a warning; the graft itself is already durable history.

use crate::error::Result;
use crate::vcs::{CommitId, CommitOutcome, Vcs};
use log::{debug, warn};

/// Message template for the synthetic changeset.
pub const COLLAPSE_MESSAGE: &str = "subtree: collapse {name} @ {rev}";

/// Substructure metadata files never imported into the host.
const SUBSTRUCTURE_FILES: [&str; 2] = [".hgsub", ".hgsubstate"];

/// Marker prefix shared by every subtree.
const MARKER_PREFIX: &str = "subtree@";

/// The persistent marker name for a subtree.
pub fn marker_name(name: &str) -> String {
    format!("{}{}", MARKER_PREFIX, name)
}

#[derive(Debug, Clone, Copy)]
pub struct CollapseOptions {
    /// Open the operator's editor on the commit message.
    pub edit: bool,
    /// Strip the imported upstream history after a successful collapse.
    pub prune: bool,
}

/// What a collapse attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollapseOutcome {
    /// The pulled tree is identical to the marker's tree; nothing was
    /// committed and the marker did not move.
    NoChanges,
    /// A synthetic changeset was created and the marker now points at it.
    Collapsed {
        commit: CommitId,
        /// Set when step 6 failed; the sync itself still succeeded.
        prune_warning: Option<String>,
    },
}

/// Collapse the pulled history of `name` into one synthetic changeset.
///
/// Failures before the commit leave the marker untouched and nothing
/// pruned; a failure during pruning is reported in the outcome instead of
/// failing the sync.
pub fn collapse(
    vcs: &dyn Vcs,
    name: &str,
    pulled_head: &CommitId,
    options: &CollapseOptions,
) -> Result<CollapseOutcome> {
    let marker = marker_name(name);

    if vcs.marker_exists(&marker)? {
        debug!("collapse {}: checking out marker {}", name, marker);
        vcs.checkout(&marker, true)?;
    } else {
        debug!("collapse {}: no marker yet, starting from empty", name);
        vcs.checkout_empty()?;
    }

    vcs.revert_all_to_tree(pulled_head.as_str())?;
    strip_substructure(vcs)?;

    let message = COLLAPSE_MESSAGE
        .replace("{name}", name)
        .replace("{rev}", pulled_head.short());

    let commit = match vcs.commit(&message, options.edit)? {
        CommitOutcome::NoChanges => return Ok(CollapseOutcome::NoChanges),
        CommitOutcome::Committed(commit) => commit,
    };

    vcs.set_marker(&marker, &commit, true)?;

    let prune_warning = if options.prune {
        prune_upstream(vcs, &marker, pulled_head)
            .err()
            .map(|e| e.to_string())
    } else {
        None
    };
    if let Some(warning) = &prune_warning {
        warn!("pruning upstream history of {} failed: {}", name, warning);
    }

    Ok(CollapseOutcome::Collapsed {
        commit,
        prune_warning,
    })
}

/// Remove `.hgsub` / `.hgsubstate` from the working copy if the revert
/// brought them in.
fn strip_substructure(vcs: &dyn Vcs) -> Result<()> {
    let status = vcs.status()?;
    let present = |path: &str| {
        status.added.iter().any(|p| p == path)
            || status.modified.iter().any(|p| p == path)
            || status.clean.iter().any(|p| p == path)
    };
    for path in SUBSTRUCTURE_FILES {
        if present(path) {
            debug!("dropping substructure metadata file {}", path);
            vcs.remove(path)?;
        }
    }
    Ok(())
}

/// Step 6: delete subtree markers subsumed by this pull, then strip the
/// imported upstream history.
fn prune_upstream(vcs: &dyn Vcs, keep: &str, pulled_head: &CommitId) -> Result<()> {
    for (name, commit) in vcs.list_markers()? {
        if name == keep || !name.starts_with(MARKER_PREFIX) {
            continue;
        }
        if vcs.is_ancestor(&commit, pulled_head)? {
            debug!("deleting subsumed marker {}", name);
            vcs.delete_marker(&name)?;
        }
    }
    vcs.prune_history(pulled_head)
}
