//! # VCS Abstraction
//!
//! This module defines the `Vcs` trait, the capability set the sync engine
//! consumes from the underlying version-control system. The engine never
//! touches repository storage directly: every side effect (pull, checkout,
//! rename, commit, merge, bookmark, strip) goes through this interface.
//!
//! ## Design
//!
//! The trait-based design separates the synchronization logic from the
//! concrete VCS, which is particularly useful for testing: the shipped
//! backend is [`crate::hg::HgCli`], a thin Mercurial subprocess adapter,
//! while the engine tests run against an in-memory mock repository defined
//! at the bottom of this module. The engine itself is agnostic: anything
//! offering these semantics (force-pull of unrelated histories, clean
//! checkout, tree revert, named persistent markers, history pruning) can
//! back it.
//!
//! Repository state is never cached across mutating calls; every read
//! (`status`, `tip`, `current_revision`, `manifest`) is a fresh round-trip.

use crate::error::Result;
use std::fmt;

/// The null revision: no files, no ancestry. Checking this out yields the
/// engine's designated "empty" state.
pub const NULL_REVISION: &str = "0000000000000000000000000000000000000000";

/// Identifier of a committed changeset (full hex node).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        CommitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in commit messages and checkout targets.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    /// Whether this is the null revision.
    pub fn is_null(&self) -> bool {
        self.0 == NULL_REVISION
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Working-copy status, one path set per state.
#[derive(Debug, Clone, Default)]
pub struct Status {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub deleted: Vec<String>,
    pub unknown: Vec<String>,
    pub ignored: Vec<String>,
    pub clean: Vec<String>,
}

impl Status {
    /// A sync may proceed only on a clean working copy. Unknown and ignored
    /// files do not count: they are not part of any commit the sync makes.
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.deleted.is_empty()
    }
}

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new changeset was created.
    Committed(CommitId),
    /// The working copy matched its parent; nothing was committed.
    NoChanges,
}

/// The primitive operations the sync engine drives.
///
/// All methods take `&self`: implementations either shell out per call or
/// keep interior state. Errors are [`crate::error::Error::Vcs`] carrying
/// the failing command and its stderr.
pub trait Vcs {
    /// Fresh working-copy status.
    fn status(&self) -> Result<Status>;

    /// Pull from `source` in force mode (unrelated histories allowed),
    /// optionally restricted to `rev`. Returns the post-pull tip.
    fn pull(&self, source: &str, rev: Option<&str>) -> Result<CommitId>;

    /// The repository tip.
    fn tip(&self) -> Result<CommitId>;

    /// Parent revision of the working copy.
    fn current_revision(&self) -> Result<CommitId>;

    /// Check out `rev` (a changeset id, prefix, or marker name). With
    /// `clean`, local modifications are discarded.
    fn checkout(&self, rev: &str, clean: bool) -> Result<()>;

    /// Check out the empty state: no files, no ancestry to the mainline.
    fn checkout_empty(&self) -> Result<()>;

    /// Make the working copy's content exactly match `rev`'s tree without
    /// adopting its ancestry.
    fn revert_all_to_tree(&self, rev: &str) -> Result<()>;

    /// Sorted file paths of the current checkout.
    fn manifest(&self) -> Result<Vec<String>>;

    /// Create a directory in the working copy (parents included).
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Rename `sources` into the directory `target`, recording the moves.
    fn rename(&self, sources: &[String], target: &str) -> Result<()>;

    /// Copy `sources` into the directory `target`, recording the copies.
    fn copy(&self, sources: &[String], target: &str) -> Result<()>;

    /// Remove a tracked file.
    fn remove(&self, path: &str) -> Result<()>;

    /// Commit the working copy. `edit` opens the operator's editor on the
    /// message before committing.
    fn commit(&self, message: &str, edit: bool) -> Result<CommitOutcome>;

    /// Merge `rev` into the working copy. Conflicts fail the call and leave
    /// the working copy mid-merge for manual resolution.
    fn merge(&self, rev: &str) -> Result<()>;

    /// Create or forcibly move the named persistent marker to `rev`.
    fn set_marker(&self, name: &str, rev: &CommitId, inactive: bool) -> Result<()>;

    fn marker_exists(&self, name: &str) -> Result<bool>;

    fn delete_marker(&self, name: &str) -> Result<()>;

    /// All markers with the changesets they point at.
    fn list_markers(&self) -> Result<Vec<(String, CommitId)>>;

    /// Destroy `ancestors_of` and everything reachable only through it.
    /// Irreversible; callers gate this behind a successful graft.
    fn prune_history(&self, ancestors_of: &CommitId) -> Result<()>;

    /// Whether `a` is an ancestor of `b`.
    fn is_ancestor(&self, a: &CommitId, b: &CommitId) -> Result<bool>;
}

/// In-memory mock repository for engine tests.
///
/// Models just enough of a VCS to exercise the sync state machine: a
/// commit graph with trees, a working copy, markers, and scripted pulls.
/// Renames and copies follow the multi-source-into-directory semantics of
/// the real backend (files land at `target/<basename>`).
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

    pub type Tree = BTreeMap<String, String>;

    #[derive(Debug, Clone)]
    struct MockCommit {
        tree: Tree,
        parents: Vec<String>,
    }

    #[derive(Debug, Default)]
    struct Repo {
        commits: BTreeMap<String, MockCommit>,
        tip: Option<String>,
        /// Working-copy parent; `None` models the null revision.
        head: Option<String>,
        wc: Tree,
        merge_parent: Option<String>,
        markers: BTreeMap<String, String>,
        /// Scripted incoming batches, one popped per `pull`.
        incoming: VecDeque<Vec<(String, Tree, Vec<String>)>>,
        next_commit: u32,
        ops: Vec<String>,
        fail_ops: HashSet<String>,
    }

    pub struct MockVcs {
        state: RefCell<Repo>,
    }

    pub fn tree(entries: &[(&str, &str)]) -> Tree {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    impl MockVcs {
        /// A host repository with a single base commit containing `base`.
        pub fn with_base(base: Tree) -> Self {
            let mut repo = Repo::default();
            let id = "b000000000000000000000000000000000000000".to_string();
            repo.commits.insert(
                id.clone(),
                MockCommit {
                    tree: base.clone(),
                    parents: Vec::new(),
                },
            );
            repo.tip = Some(id.clone());
            repo.head = Some(id);
            repo.wc = base;
            MockVcs {
                state: RefCell::new(repo),
            }
        }

        /// Script the next `pull` to add these commits; the last one becomes
        /// the new tip.
        pub fn queue_pull(&self, commits: Vec<(&str, Tree, Vec<&str>)>) {
            self.state.borrow_mut().incoming.push_back(
                commits
                    .into_iter()
                    .map(|(id, tree, parents)| {
                        (
                            id.to_string(),
                            tree,
                            parents.into_iter().map(String::from).collect(),
                        )
                    })
                    .collect(),
            );
        }

        /// Make the named operation fail with a `Vcs` error.
        pub fn fail_op(&self, op: &str) {
            self.state.borrow_mut().fail_ops.insert(op.to_string());
        }

        /// Dirty the working copy with an added file.
        pub fn touch(&self, path: &str, content: &str) {
            self.state
                .borrow_mut()
                .wc
                .insert(path.to_string(), content.to_string());
        }

        pub fn head(&self) -> CommitId {
            let repo = self.state.borrow();
            CommitId::new(repo.head.clone().unwrap_or_else(|| NULL_REVISION.to_string()))
        }

        pub fn wc_paths(&self) -> Vec<String> {
            self.state.borrow().wc.keys().cloned().collect()
        }

        pub fn commit_count(&self) -> usize {
            self.state.borrow().commits.len()
        }

        pub fn has_commit(&self, id: &str) -> bool {
            self.state.borrow().commits.contains_key(id)
        }

        pub fn marker(&self, name: &str) -> Option<CommitId> {
            self.state.borrow().markers.get(name).cloned().map(CommitId::new)
        }

        pub fn tree_of(&self, id: &CommitId) -> Tree {
            self.state.borrow().commits[id.as_str()].tree.clone()
        }

        pub fn ops(&self) -> Vec<String> {
            self.state.borrow().ops.clone()
        }

        fn check(&self, op: &str) -> Result<()> {
            let mut repo = self.state.borrow_mut();
            repo.ops.push(op.to_string());
            if repo.fail_ops.contains(op.split_whitespace().next().unwrap_or(op)) {
                return Err(err(op, "injected failure"));
            }
            Ok(())
        }
    }

    fn err(command: &str, message: &str) -> Error {
        Error::Vcs {
            command: command.to_string(),
            message: message.to_string(),
            stderr: String::new(),
        }
    }

    impl Repo {
        /// Resolve a revision argument: marker name, full id, or 12-char
        /// prefix.
        fn resolve(&self, rev: &str) -> Option<String> {
            if let Some(id) = self.markers.get(rev) {
                return Some(id.clone());
            }
            if self.commits.contains_key(rev) {
                return Some(rev.to_string());
            }
            self.commits
                .keys()
                .find(|id| id.starts_with(rev))
                .cloned()
        }

        fn head_tree(&self) -> Tree {
            self.head
                .as_ref()
                .and_then(|id| self.commits.get(id))
                .map(|c| c.tree.clone())
                .unwrap_or_default()
        }

        fn ancestors(&self, id: &str) -> BTreeSet<String> {
            let mut seen = BTreeSet::new();
            let mut stack = vec![id.to_string()];
            while let Some(id) = stack.pop() {
                if !seen.insert(id.clone()) {
                    continue;
                }
                if let Some(commit) = self.commits.get(&id) {
                    stack.extend(commit.parents.iter().cloned());
                }
            }
            seen
        }
    }

    impl Vcs for MockVcs {
        fn status(&self) -> Result<Status> {
            self.check("status")?;
            let repo = self.state.borrow();
            let base = repo.head_tree();
            let mut status = Status::default();
            for (path, content) in &repo.wc {
                match base.get(path) {
                    Some(existing) if existing == content => status.clean.push(path.clone()),
                    Some(_) => status.modified.push(path.clone()),
                    None => status.added.push(path.clone()),
                }
            }
            for path in base.keys() {
                if !repo.wc.contains_key(path) {
                    status.removed.push(path.clone());
                }
            }
            Ok(status)
        }

        fn pull(&self, source: &str, rev: Option<&str>) -> Result<CommitId> {
            self.check(&format!("pull {} {:?}", source, rev))?;
            let mut repo = self.state.borrow_mut();
            if let Some(batch) = repo.incoming.pop_front() {
                for (id, tree, parents) in batch {
                    repo.tip = Some(id.clone());
                    repo.commits.insert(id, MockCommit { tree, parents });
                }
            }
            repo.tip
                .clone()
                .map(CommitId::new)
                .ok_or_else(|| err("pull", "empty repository"))
        }

        fn tip(&self) -> Result<CommitId> {
            let repo = self.state.borrow();
            repo.tip
                .clone()
                .map(CommitId::new)
                .ok_or_else(|| err("tip", "empty repository"))
        }

        fn current_revision(&self) -> Result<CommitId> {
            let repo = self.state.borrow();
            Ok(CommitId::new(
                repo.head.clone().unwrap_or_else(|| NULL_REVISION.to_string()),
            ))
        }

        fn checkout(&self, rev: &str, clean: bool) -> Result<()> {
            self.check(&format!("checkout {} clean={}", rev, clean))?;
            let mut repo = self.state.borrow_mut();
            let id = repo
                .resolve(rev)
                .ok_or_else(|| err("checkout", &format!("unknown revision '{}'", rev)))?;
            repo.wc = repo.commits[&id].tree.clone();
            repo.head = Some(id);
            repo.merge_parent = None;
            Ok(())
        }

        fn checkout_empty(&self) -> Result<()> {
            self.check("checkout-empty")?;
            let mut repo = self.state.borrow_mut();
            repo.head = None;
            repo.wc.clear();
            repo.merge_parent = None;
            Ok(())
        }

        fn revert_all_to_tree(&self, rev: &str) -> Result<()> {
            self.check(&format!("revert {}", rev))?;
            let mut repo = self.state.borrow_mut();
            let id = repo
                .resolve(rev)
                .ok_or_else(|| err("revert", &format!("unknown revision '{}'", rev)))?;
            repo.wc = repo.commits[&id].tree.clone();
            Ok(())
        }

        fn manifest(&self) -> Result<Vec<String>> {
            Ok(self.state.borrow().wc.keys().cloned().collect())
        }

        fn mkdir(&self, path: &str) -> Result<()> {
            // Directories are implicit in the path-keyed trees.
            self.check(&format!("mkdir {}", path))
        }

        fn rename(&self, sources: &[String], target: &str) -> Result<()> {
            self.check(&format!("rename {:?} {}", sources, target))?;
            let mut repo = self.state.borrow_mut();
            for source in sources {
                let content = repo
                    .wc
                    .remove(source)
                    .ok_or_else(|| err("rename", &format!("no such file '{}'", source)))?;
                let basename = source.rsplit('/').next().unwrap_or(source);
                repo.wc.insert(format!("{}/{}", target, basename), content);
            }
            Ok(())
        }

        fn copy(&self, sources: &[String], target: &str) -> Result<()> {
            self.check(&format!("copy {:?} {}", sources, target))?;
            let mut repo = self.state.borrow_mut();
            for source in sources {
                let content = repo
                    .wc
                    .get(source)
                    .cloned()
                    .ok_or_else(|| err("copy", &format!("no such file '{}'", source)))?;
                let basename = source.rsplit('/').next().unwrap_or(source);
                repo.wc.insert(format!("{}/{}", target, basename), content);
            }
            Ok(())
        }

        fn remove(&self, path: &str) -> Result<()> {
            self.check(&format!("remove {}", path))?;
            let mut repo = self.state.borrow_mut();
            repo.wc
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| err("remove", &format!("no such file '{}'", path)))
        }

        fn commit(&self, message: &str, _edit: bool) -> Result<CommitOutcome> {
            self.check(&format!("commit {}", message))?;
            let mut repo = self.state.borrow_mut();
            if repo.wc == repo.head_tree() && repo.merge_parent.is_none() {
                return Ok(CommitOutcome::NoChanges);
            }
            // Counter first so 12-char short forms stay unique.
            let id = format!("c{:011x}{}", repo.next_commit, "f".repeat(28));
            repo.next_commit += 1;
            let mut parents: Vec<String> = repo.head.iter().cloned().collect();
            parents.extend(repo.merge_parent.take());
            let tree = repo.wc.clone();
            repo.commits.insert(
                id.clone(),
                MockCommit {
                    tree,
                    parents,
                },
            );
            repo.head = Some(id.clone());
            repo.tip = Some(id.clone());
            Ok(CommitOutcome::Committed(CommitId::new(id)))
        }

        fn merge(&self, rev: &str) -> Result<()> {
            self.check(&format!("merge {}", rev))?;
            let mut repo = self.state.borrow_mut();
            let id = repo
                .resolve(rev)
                .ok_or_else(|| err("merge", &format!("unknown revision '{}'", rev)))?;
            let other = repo.commits[&id].tree.clone();
            repo.wc.extend(other);
            repo.merge_parent = Some(id);
            Ok(())
        }

        fn set_marker(&self, name: &str, rev: &CommitId, _inactive: bool) -> Result<()> {
            self.check(&format!("set-marker {} {}", name, rev.short()))?;
            self.state
                .borrow_mut()
                .markers
                .insert(name.to_string(), rev.as_str().to_string());
            Ok(())
        }

        fn marker_exists(&self, name: &str) -> Result<bool> {
            Ok(self.state.borrow().markers.contains_key(name))
        }

        fn delete_marker(&self, name: &str) -> Result<()> {
            self.check(&format!("delete-marker {}", name))?;
            self.state
                .borrow_mut()
                .markers
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| err("delete-marker", &format!("no such marker '{}'", name)))
        }

        fn list_markers(&self) -> Result<Vec<(String, CommitId)>> {
            Ok(self
                .state
                .borrow()
                .markers
                .iter()
                .map(|(name, id)| (name.clone(), CommitId::new(id.clone())))
                .collect())
        }

        fn prune_history(&self, ancestors_of: &CommitId) -> Result<()> {
            self.check(&format!("prune {}", ancestors_of.short()))?;
            let mut repo = self.state.borrow_mut();
            let doomed = repo.ancestors(ancestors_of.as_str());
            repo.commits.retain(|id, _| !doomed.contains(id));
            if repo.tip.as_ref().is_some_and(|tip| doomed.contains(tip)) {
                repo.tip = repo.head.clone();
            }
            Ok(())
        }

        fn is_ancestor(&self, a: &CommitId, b: &CommitId) -> Result<bool> {
            let repo = self.state.borrow();
            Ok(repo.ancestors(b.as_str()).contains(a.as_str()))
        }
    }
}
