//! # Subtree Repository Management Library
//!
//! This library grafts the history of external repositories into
//! subdirectories of a Mercurial host repository, keeping a durable,
//! mergeable record of each import rather than a flat copy. It is designed
//! to be used by the `hg-subtree` command-line tool but can also be driven
//! directly by applications that manage vendored subtrees.
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The `.hgsubtree.yaml` schema, one
//!   [`config::SubtreeSpec`] per named import, with its upstream source,
//!   optional revision selector, destination rules, and the `collapse` /
//!   `keep` flags.
//! - **Destination Rules (`rules`)**: `mkdir`/`move`/`copy` lines matched
//!   as shell globs against the pulled manifest, compiled into a
//!   deterministic [`rules::PlacementPlan`].
//! - **VCS Abstraction (`vcs`, `hg`)**: The primitive operations the
//!   engine consumes (pull, checkout, revert, rename, commit, merge,
//!   markers, strip) behind the [`vcs::Vcs`] trait, with
//!   [`hg::HgCli`] as the Mercurial subprocess adapter.
//! - **Collapse (`collapse`)**: Compressing a pulled history range into a
//!   single synthetic changeset anchored to a `subtree@{name}` marker,
//!   with optional pruning of the imported history.
//! - **Synchronization (`sync`)**: The per-subtree state machine that
//!   drives one sync from pull to merge-back.
//!
//! ## Execution Flow
//!
//! The main entry point is [`sync::SyncEngine::run`], which for each
//! selected spec executes the following states:
//!
//! 1.  **Pull**: Fetch new upstream history (force mode, unrelated
//!     histories allowed); stop with a no-op report if the tip is
//!     unchanged.
//! 2.  **Materialize**: Collapse the pulled range into one synthetic
//!     changeset, or check out the pulled head directly.
//! 3.  **PlaceFiles**: Apply the destination rules to the manifest:
//!     mkdirs, then copies, then moves, then removals.
//! 4.  **CommitPlacement / MergeBack / CommitMerge**: Commit the placed
//!     tree, merge it back into the mainline, and commit the merge.
//!
//! Within a batch run each spec's merge commit becomes the merge-back
//! target of the next, so sequential imports compose. A dirty working
//! copy aborts the whole run before any mutation.

pub mod collapse;
pub mod config;
pub mod error;
pub mod hg;
pub mod output;
pub mod rules;
pub mod sync;
pub mod vcs;

#[cfg(test)]
mod rules_proptest;
