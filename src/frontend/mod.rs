//! Go source front-end: loads one package directory into a [`Package`].
//!
//! Files are selected the way `go build` does for the host platform,
//! parsed and resolved. Problems that do not prevent loading are
//! collected as [`Note`]s instead of failing the whole package.

pub mod constraint;
pub mod parser;
pub mod resolve;

use std::fmt;
use std::fs;
use std::path::Path;

use error_set::error_set;
use tracing::debug;

use crate::types::Package;
use constraint::Platform;
use parser::GoParser;

error_set! {
    /// Errors from loading a package directory
    FrontendError := {
        #[display("Failed to read {path}: {message}")]
        ReadFailed { path: String, message: String },
        #[display("No buildable Go source files in {dir}")]
        NoBuildableFiles { dir: String },
        #[display("Found packages {names} in {dir}")]
        MultiplePackages { dir: String, names: String },
        #[display("Failed to load the Go grammar: {message}")]
        GrammarFailed { message: String },
    }
}

/// Non-fatal problem found while loading a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// A loaded package and the notes collected on the way.
#[derive(Debug)]
pub struct Loaded {
    pub package: Package,
    pub notes: Vec<Note>,
}

/// Load the package in `dir` for the host platform.
pub fn load_package(dir: &Path) -> Result<Loaded, FrontendError> {
    load_package_for(dir, &Platform::host())
}

/// Load the package in `dir` for `platform`.
pub fn load_package_for(dir: &Path, platform: &Platform) -> Result<Loaded, FrontendError> {
    let read_failed = |path: &Path, e: std::io::Error| FrontendError::ReadFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| read_failed(dir, e))? {
        let entry = entry.map_err(|e| read_failed(dir, e))?;
        let is_file = entry.file_type().map_err(|e| read_failed(dir, e))?.is_file();
        if let Some(name) = entry.file_name().to_str()
            && is_file
            && is_candidate(name, platform)
        {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut parser = GoParser::new().map_err(|e| FrontendError::GrammarFailed {
        message: e.to_string(),
    })?;
    let mut notes = Vec::new();
    let mut files = Vec::new();
    for name in names {
        let path = dir.join(&name);
        let source = fs::read_to_string(&path).map_err(|e| read_failed(&path, e))?;

        let mut file = match parser.parse_file(&source) {
            Ok(file) => file,
            Err(e) => {
                notes.push(Note {
                    file: name,
                    line: e.line(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Some(expr) = &file.build_constraint {
            match constraint::parse(expr) {
                Ok(constraint) if !constraint.eval(platform) => {
                    debug!(file = %name, constraint = %expr, "excluded by build constraint");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    notes.push(Note {
                        file: name,
                        line: 1,
                        message: e.to_string(),
                    });
                    continue;
                }
            }
        }

        notes.extend(file.errors.drain(..).map(|e| Note {
            file: name.clone(),
            line: e.line(),
            message: e.to_string(),
        }));
        files.push((name, file));
    }

    if files.is_empty() {
        return Err(FrontendError::NoBuildableFiles {
            dir: dir.display().to_string(),
        });
    }

    let mut packages: Vec<&str> = files.iter().map(|(_, file)| file.package.as_str()).collect();
    packages.sort_unstable();
    packages.dedup();
    if packages.len() > 1 {
        return Err(FrontendError::MultiplePackages {
            dir: dir.display().to_string(),
            names: packages.join(", "),
        });
    }

    debug!(dir = %dir.display(), files = files.len(), "parsed package files");
    let package = resolve::resolve(&files, &mut notes);
    Ok(Loaded { package, notes })
}

/// Whether `name` is a non-test Go source file built on `platform`.
pub fn is_candidate(name: &str, platform: &Platform) -> bool {
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('_')
        && !name.starts_with('.')
        && platform.matches_file_name(name)
}
