//! Structural API diff between two revisions of a Go package.
//!
//! The pipeline retrieves both revisions ([`revision`]), loads each into a
//! resolved [`Package`] ([`frontend`]) and compares their exported
//! declarations ([`diff`]), writing `+`/`-` lines to a [`Report`].

use std::path::Path;

use error_set::error_set;
use tracing::{debug, warn};

pub mod diff;
pub mod frontend;
pub mod report;
pub mod revision;
pub mod types;

pub use diff::diff;
pub use frontend::{FrontendError, Note};
pub use report::{Report, WriteReport};
pub use revision::{Revision, RevisionError};
pub use types::Package;

error_set! {
    /// Top-level error for apidiff operations
    ApiDiffError := {
        RevisionError(RevisionError),
        FrontendError(FrontendError),
    }
}

/// Most front-end notes surfaced per package; each side of a comparison
/// has its own allowance.
pub const NOTE_LIMIT: usize = 4;

/// Main interface for comparing revisions of one package directory
pub struct ApiDiff<'a> {
    package_dir: &'a Path,
}

impl<'a> ApiDiff<'a> {
    pub fn new(package_dir: &'a Path) -> Self {
        Self { package_dir }
    }

    /// Compare the package's API at `old` against `new`.
    ///
    /// Nothing is written to `report` unless both revisions load.
    ///
    /// # Examples
    /// ```no_run
    /// # use std::path::Path;
    /// # use apidiff::{ApiDiff, Revision};
    /// let mut lines: Vec<String> = Vec::new();
    /// ApiDiff::new(Path::new("src/github.com/me/pack"))
    ///     .compare(&Revision::Commit("v1.0.0".into()), &Revision::WorkingTree, &mut lines)
    ///     .unwrap();
    /// ```
    pub fn compare(
        &self,
        old: &Revision,
        new: &Revision,
        report: &mut dyn Report,
    ) -> Result<(), ApiDiffError> {
        let (old_snapshot, new_snapshot) = revision::retrieve(self.package_dir, old, new)?;

        let before = frontend::load_package(old_snapshot.path())?;
        surface_notes(old, &before.notes);
        let after = frontend::load_package(new_snapshot.path())?;
        surface_notes(new, &after.notes);

        diff::diff(&before.package, &after.package, report);
        Ok(())
    }
}

fn surface_notes(revision: &Revision, notes: &[Note]) {
    let (shown, suppressed) = capped(notes);
    for note in shown {
        warn!(%revision, "NOTE: {note}");
    }
    if suppressed > 0 {
        debug!(%revision, suppressed, "further notes suppressed");
    }
}

/// The notes shown for one package and how many more are suppressed.
fn capped(notes: &[Note]) -> (&[Note], usize) {
    let (shown, rest) = notes.split_at(notes.len().min(NOTE_LIMIT));
    (shown, rest.len())
}
