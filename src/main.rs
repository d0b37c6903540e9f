use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use apidiff::{ApiDiff, Revision, WriteReport};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apidiff")]
#[command(about = "Structural diff of a Go package's exported API between git revisions")]
#[command(version)]
struct Cli {
    /// Package directory, or import path under $GOPATH/src
    #[arg(required_unless_present_any = ["completions", "man"])]
    package: Option<PathBuf>,

    /// Old and new revision; with only one, it is compared against the working tree
    #[arg(num_args = 1..=2, required_unless_present_any = ["completions", "man"])]
    revisions: Vec<String>,

    /// Go workspace used to resolve import paths (defaults to $HOME/go)
    #[arg(long, env = "GOPATH")]
    gopath: Option<PathBuf>,

    /// More logging on stderr; repeat for more detail (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a shell completion script
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,

    /// Print the manual page
    #[arg(long, exclusive = true)]
    man: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "apidiff", &mut io::stdout());
        return Ok(());
    }
    if cli.man {
        clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        return Ok(());
    }

    let package = cli.package.ok_or("a package is required")?;
    let package_dir = resolve_package_dir(&package, cli.gopath.as_deref());
    let (old, new) = match cli.revisions.as_slice() {
        [new] => (Revision::WorkingTree, Revision::parse(new)),
        [old, new] => (Revision::parse(old), Revision::parse(new)),
        _ => return Err("expected one or two revisions".into()),
    };
    tracing::info!(package = %package_dir.display(), %old, %new, "comparing");

    let stdout = io::stdout();
    let mut report = WriteReport::new(stdout.lock());
    ApiDiff::new(&package_dir).compare(&old, &new, &mut report)?;
    report.finish()?;
    Ok(())
}

/// Use `package` as given when it is a directory, else look it up in the Go workspace.
fn resolve_package_dir(package: &Path, gopath: Option<&Path>) -> PathBuf {
    if package.is_dir() {
        return package.to_path_buf();
    }
    let workspace = gopath.map(Path::to_path_buf).unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join("go")
    });
    workspace.join("src").join(package)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn one_or_two_revisions() {
        let cli = Cli::try_parse_from(["apidiff", "pack", "v1"]).unwrap();
        assert_eq!(cli.revisions, vec!["v1".to_string()]);
        let cli = Cli::try_parse_from(["apidiff", "pack", "v1", "v2"]).unwrap();
        assert_eq!(cli.revisions, vec!["v1".to_string(), "v2".to_string()]);
        assert!(Cli::try_parse_from(["apidiff", "pack"]).is_err());
        assert!(Cli::try_parse_from(["apidiff", "pack", "v1", "v2", "v3"]).is_err());
    }

    #[test]
    fn completions_need_no_package() {
        let cli = Cli::try_parse_from(["apidiff", "--completions", "bash"]).unwrap();
        assert_eq!(cli.completions, Some(Shell::Bash));
        assert!(Cli::try_parse_from(["apidiff", "--man", "pack", "v1"]).is_err());
    }

    #[test]
    fn import_paths_resolve_under_the_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(resolve_package_dir(dir.path(), None), dir.path().to_path_buf());
        assert_eq!(
            resolve_package_dir(Path::new("github.com/me/pack"), Some(Path::new("/gopath"))),
            PathBuf::from("/gopath/src/github.com/me/pack")
        );
    }
}
