//! # Mercurial Adapter
//!
//! `HgCli` implements the [`crate::vcs::Vcs`] trait by shelling out to the
//! system `hg` binary, the same way the host user would.
//!
//! This uses the system hg command, which automatically handles:
//! - Authentication configured in `~/.hgrc` (ssh, auth sections)
//! - Extensions and path aliases the host repository relies on
//! - The user's editor for `--edit` commit messages
//!
//! Every invocation runs with `HGPLAIN=1` so templated output is stable
//! regardless of the user's configuration, and is rooted at the host
//! repository via `-R` so the engine works from any current directory.
//!
//! Markers are Mercurial bookmarks; history pruning uses the bundled
//! `strip` extension (enabled per invocation with
//! `--config extensions.strip=`).

use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};
use crate::vcs::{CommitId, CommitOutcome, Status, Vcs};

/// Mercurial command-line adapter for a single host repository.
pub struct HgCli {
    root: PathBuf,
}

impl HgCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HgCli { root: root.into() }
    }

    /// Run `hg` with the given arguments, returning raw output.
    fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let command = format!("hg {}", args.join(" "));
        log::debug!("running {}", command);
        Command::new("hg")
            .arg("-R")
            .arg(&self.root)
            .args(args)
            .env("HGPLAIN", "1")
            .output()
            .map_err(|e| Error::Vcs {
                command,
                message: format!("failed to spawn hg: {}", e),
                stderr: String::new(),
            })
    }

    /// Run `hg`, failing unless it exits successfully; returns stdout.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn node_of(&self, rev: &str) -> Result<CommitId> {
        let stdout = self.run_checked(&["log", "-r", rev, "-T", "{node}"])?;
        Ok(CommitId::new(stdout.trim().to_string()))
    }
}

fn command_error(args: &[&str], output: &std::process::Output) -> Error {
    Error::Vcs {
        command: format!("hg {}", args.join(" ")),
        message: format!("exited with {}", output.status),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Parse `hg status -A` output into path sets.
fn parse_status(output: &str) -> Status {
    let mut status = Status::default();
    for line in output.lines() {
        let Some((code, path)) = line.split_once(' ') else {
            continue;
        };
        let path = path.to_string();
        match code {
            "M" => status.modified.push(path),
            "A" => status.added.push(path),
            "R" => status.removed.push(path),
            "!" => status.deleted.push(path),
            "?" => status.unknown.push(path),
            "I" => status.ignored.push(path),
            "C" => status.clean.push(path),
            _ => {}
        }
    }
    status
}

/// Parse `hg bookmarks -T "{bookmark} {node}\n"` output.
fn parse_bookmarks(output: &str) -> Vec<(String, CommitId)> {
    output
        .lines()
        .filter_map(|line| {
            let (name, node) = line.rsplit_once(' ')?;
            Some((name.to_string(), CommitId::new(node.to_string())))
        })
        .collect()
}

impl Vcs for HgCli {
    fn status(&self) -> Result<Status> {
        let stdout = self.run_checked(&["status", "-A"])?;
        Ok(parse_status(&stdout))
    }

    fn pull(&self, source: &str, rev: Option<&str>) -> Result<CommitId> {
        let mut args = vec!["pull", "--force"];
        if let Some(rev) = rev {
            args.push("--rev");
            args.push(rev);
        }
        args.push(source);
        self.run_checked(&args)?;
        self.tip()
    }

    fn tip(&self) -> Result<CommitId> {
        self.node_of("tip")
    }

    fn current_revision(&self) -> Result<CommitId> {
        self.node_of(".")
    }

    fn checkout(&self, rev: &str, clean: bool) -> Result<()> {
        let mut args = vec!["update"];
        if clean {
            args.push("--clean");
        }
        args.push(rev);
        self.run_checked(&args).map(|_| ())
    }

    fn checkout_empty(&self) -> Result<()> {
        self.checkout("null", true)
    }

    fn revert_all_to_tree(&self, rev: &str) -> Result<()> {
        self.run_checked(&["revert", "--all", "--rev", rev])
            .map(|_| ())
    }

    fn manifest(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["manifest"])?;
        let mut paths: Vec<String> = stdout.lines().map(String::from).collect();
        paths.sort();
        Ok(paths)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        std::fs::create_dir_all(self.root.join(path)).map_err(Error::Io)
    }

    fn rename(&self, sources: &[String], target: &str) -> Result<()> {
        let mut args = vec!["rename"];
        args.extend(sources.iter().map(String::as_str));
        args.push(target);
        self.run_checked(&args).map(|_| ())
    }

    fn copy(&self, sources: &[String], target: &str) -> Result<()> {
        let mut args = vec!["copy"];
        args.extend(sources.iter().map(String::as_str));
        args.push(target);
        self.run_checked(&args).map(|_| ())
    }

    fn remove(&self, path: &str) -> Result<()> {
        // --force also covers files still in added state, e.g. the
        // substructure metadata dropped right after a revert onto the
        // empty parent.
        self.run_checked(&["remove", "--force", path]).map(|_| ())
    }

    fn commit(&self, message: &str, edit: bool) -> Result<CommitOutcome> {
        let mut args = vec!["commit", "--message", message];
        if edit {
            args.push("--edit");
        }
        let output = self.run(&args)?;
        if output.status.success() {
            return Ok(CommitOutcome::Committed(self.current_revision()?));
        }
        // hg exits 1 with "nothing changed" when the tree is identical to
        // the parent; that is a signal, not a failure.
        let chatter = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if output.status.code() == Some(1) && chatter.contains("nothing changed") {
            return Ok(CommitOutcome::NoChanges);
        }
        Err(command_error(&args, &output))
    }

    fn merge(&self, rev: &str) -> Result<()> {
        // A conflicting merge exits non-zero; the error propagates and the
        // working copy is left mid-merge for the operator.
        self.run_checked(&["merge", rev]).map(|_| ())
    }

    fn set_marker(&self, name: &str, rev: &CommitId, inactive: bool) -> Result<()> {
        let mut args = vec!["bookmark", "--force", "--rev", rev.as_str()];
        if inactive {
            args.push("--inactive");
        }
        args.push(name);
        self.run_checked(&args).map(|_| ())
    }

    fn marker_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_markers()?.iter().any(|(n, _)| n == name))
    }

    fn delete_marker(&self, name: &str) -> Result<()> {
        self.run_checked(&["bookmark", "--delete", name]).map(|_| ())
    }

    fn list_markers(&self) -> Result<Vec<(String, CommitId)>> {
        let stdout = self.run_checked(&["bookmarks", "-T", "{bookmark} {node}\n"])?;
        Ok(parse_bookmarks(&stdout))
    }

    fn prune_history(&self, ancestors_of: &CommitId) -> Result<()> {
        let revset = format!("ancestors({})", ancestors_of.as_str());
        self.run_checked(&[
            "--config",
            "extensions.strip=",
            "strip",
            "--no-backup",
            "--rev",
            &revset,
        ])
        .map(|_| ())
    }

    fn is_ancestor(&self, a: &CommitId, b: &CommitId) -> Result<bool> {
        let revset = format!("{} and ancestors({})", a.as_str(), b.as_str());
        // An empty revset is a valid, empty query result.
        let stdout = self.run_checked(&["log", "-r", &revset, "-T", "{node}"])?;
        Ok(!stdout.trim().is_empty())
    }
}
