//! Materialise two revisions of a package directory side by side.
//!
//! Committed revisions are cloned into temporary directories that live as
//! long as their [`Snapshot`]; the working tree is used in place.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use error_set::error_set;
use tempfile::TempDir;
use tracing::debug;

error_set! {
    /// Errors from retrieving package revisions
    RevisionError := {
        #[display("{path} is not inside a git work tree")]
        NotARepository { path: String },
        #[display("Cannot use {path}: {message}")]
        InvalidPath { path: String, message: String },
        #[display("Failed to run {command}: {message}")]
        GitSpawnFailed { command: String, message: String },
        #[display("{command} failed: {stderr}")]
        GitFailed { command: String, stderr: String },
        #[display("Failed to create temporary directory: {message}")]
        TempDirFailed { message: String },
        #[display("Retrieval of {revision} was cancelled")]
        Cancelled { revision: String },
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// The files currently on disk
    WorkingTree,
    /// Anything `git checkout` accepts
    Commit(String),
}

impl Revision {
    /// `current` names the working tree, anything else a commit.
    pub fn parse(text: &str) -> Self {
        match text {
            "current" => Revision::WorkingTree,
            other => Revision::Commit(other.to_string()),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::WorkingTree => f.write_str("working tree"),
            Revision::Commit(revision) => f.write_str(revision),
        }
    }
}

/// Package directory at one revision. Dropping it removes any checkout.
#[derive(Debug)]
pub struct Snapshot {
    dir: PathBuf,
    _checkout: Option<TempDir>,
}

impl Snapshot {
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

#[derive(Clone, Copy)]
enum Side {
    Old,
    New,
}

/// Retrieve `package_dir` at both revisions concurrently.
///
/// The first failure cancels the other retrieval and is returned; partial
/// checkouts are removed.
pub fn retrieve(
    package_dir: &Path,
    old: &Revision,
    new: &Revision,
) -> Result<(Snapshot, Snapshot), RevisionError> {
    let display = package_dir.display().to_string();
    let dir = package_dir
        .canonicalize()
        .map_err(|e| RevisionError::InvalidPath {
            path: display.clone(),
            message: e.to_string(),
        })?;

    if !git_output(&dir, &["rev-parse", "--is-inside-work-tree"])
        .is_ok_and(|inside| inside.trim() == "true")
    {
        return Err(RevisionError::NotARepository { path: display });
    }

    let root = PathBuf::from(git_output(&dir, &["rev-parse", "--show-toplevel"])?.trim())
        .canonicalize()
        .map_err(|e| RevisionError::InvalidPath {
            path: display.clone(),
            message: e.to_string(),
        })?;
    let relative = dir
        .strip_prefix(&root)
        .map_err(|e| RevisionError::InvalidPath {
            path: display,
            message: e.to_string(),
        })?
        .to_path_buf();
    debug!(root = %root.display(), package = %relative.display(), "located repository");

    let cancel = AtomicBool::new(false);
    thread::scope(|scope| {
        let (sender, receiver) = mpsc::channel();
        for (side, revision) in [(Side::Old, old), (Side::New, new)] {
            let sender = sender.clone();
            let (root, relative, cancel) = (&root, &relative, &cancel);
            scope.spawn(move || {
                let result = checkout(root, relative, revision, cancel);
                // The receiver outlives every sender in this scope.
                let _ = sender.send((side, result));
            });
        }
        drop(sender);

        let (mut old_snapshot, mut new_snapshot, mut failure) = (None, None, None);
        for (side, result) in receiver {
            match (side, result) {
                (Side::Old, Ok(snapshot)) => old_snapshot = Some(snapshot),
                (Side::New, Ok(snapshot)) => new_snapshot = Some(snapshot),
                (_, Err(e)) => {
                    cancel.store(true, Ordering::SeqCst);
                    failure.get_or_insert(e);
                }
            }
        }

        match (failure, old_snapshot, new_snapshot) {
            (Some(e), _, _) => Err(e),
            (None, Some(old), Some(new)) => Ok((old, new)),
            (None, None, _) => Err(RevisionError::Cancelled {
                revision: old.to_string(),
            }),
            (None, _, None) => Err(RevisionError::Cancelled {
                revision: new.to_string(),
            }),
        }
    })
}

fn checkout(
    root: &Path,
    relative: &Path,
    revision: &Revision,
    cancel: &AtomicBool,
) -> Result<Snapshot, RevisionError> {
    let Revision::Commit(commit) = revision else {
        return Ok(Snapshot {
            dir: root.join(relative),
            _checkout: None,
        });
    };

    let checkout = tempfile::Builder::new()
        .prefix("apidiff-")
        .tempdir()
        .map_err(|e| RevisionError::TempDirFailed {
            message: e.to_string(),
        })?;
    let clone = checkout.path().join("repo");

    let mut clone_cmd = Command::new("git");
    clone_cmd
        .args(["clone", "--local", "--quiet"])
        .arg(root)
        .arg(&clone);
    run(clone_cmd, revision, cancel)?;

    let mut checkout_cmd = Command::new("git");
    checkout_cmd
        .arg("-C")
        .arg(&clone)
        .args(["checkout", "--quiet", commit.as_str()]);
    run(checkout_cmd, revision, cancel)?;

    debug!(revision = %commit, dir = %clone.display(), "checked out revision");
    Ok(Snapshot {
        dir: clone.join(relative),
        _checkout: Some(checkout),
    })
}

/// Run a git command to completion unless `cancel` is raised first.
fn run(mut cmd: Command, revision: &Revision, cancel: &AtomicBool) -> Result<(), RevisionError> {
    let command = describe(&cmd);
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RevisionError::GitSpawnFailed {
            command: command.clone(),
            message: e.to_string(),
        })?;

    // Read on its own thread so a full pipe never blocks the child.
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    });

    let status = loop {
        if cancel.load(Ordering::SeqCst) {
            // Killing an already exited child is harmless.
            let _ = child.kill();
            let _ = child.wait();
            return Err(RevisionError::Cancelled {
                revision: revision.to_string(),
            });
        }
        let exited = child
            .try_wait()
            .map_err(|e| RevisionError::GitSpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;
        if let Some(status) = exited {
            break status;
        }
        thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        return Err(RevisionError::GitFailed {
            command,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Stdout of `git -C dir <args>`.
fn git_output(dir: &Path, args: &[&str]) -> Result<String, RevisionError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    let command = describe(&cmd);

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| RevisionError::GitSpawnFailed {
            command: command.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RevisionError::GitFailed {
            command,
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn describe(cmd: &Command) -> String {
    let mut text = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        text.push(' ');
        text.push_str(&arg.to_string_lossy());
    }
    text
}
