//! Build constraints: `//go:build` expressions and `_GOOS_GOARCH` file suffixes.

use error_set::error_set;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::all_consuming,
    sequence::{delimited, preceded},
};

error_set! {
    /// Errors from parsing a build constraint
    ConstraintError := {
        #[display("invalid build constraint '{expr}'")]
        Invalid { expr: String },
    }
}

const KNOWN_OS: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "js",
    "linux",
    "nacl",
    "netbsd",
    "openbsd",
    "plan9",
    "solaris",
    "wasip1",
    "windows",
    "zos",
];

const UNIX_OS: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "linux",
    "netbsd",
    "openbsd",
    "solaris",
];

const KNOWN_ARCH: &[&str] = &[
    "386",
    "amd64",
    "amd64p32",
    "arm",
    "armbe",
    "arm64",
    "arm64be",
    "loong64",
    "mips",
    "mipsle",
    "mips64",
    "mips64le",
    "mips64p32",
    "mips64p32le",
    "ppc",
    "ppc64",
    "ppc64le",
    "riscv",
    "riscv64",
    "s390",
    "s390x",
    "sparc",
    "sparc64",
    "wasm",
];

/// Target platform files are selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this process runs on, in Go's naming.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            "wasm32" => "wasm",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Whether a single build tag holds.
    pub fn satisfies(&self, tag: &str) -> bool {
        tag == self.os
            || tag == self.arch
            || (tag == "unix" && UNIX_OS.contains(&self.os.as_str()))
            || tag == "cgo"
            || tag == "gc"
            || tag.strip_prefix("go1.").is_some_and(|minor| minor.parse::<u32>().is_ok())
    }

    /// Whether a file name's `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix allows this platform.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = file_name.strip_suffix(".go").unwrap_or(file_name);
        let Some(start) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[start..].split('_').collect();
        let n = parts.len();

        if n >= 3 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.os_matches(parts[n - 2]) && parts[n - 1] == self.arch;
        }
        match parts.last() {
            Some(&os) if KNOWN_OS.contains(&os) => self.os_matches(os),
            Some(&arch) if KNOWN_ARCH.contains(&arch) => arch == self.arch,
            _ => true,
        }
    }

    fn os_matches(&self, os: &str) -> bool {
        os == self.os
            || (os == "linux" && self.os == "android")
            || (os == "darwin" && self.os == "ios")
            || (os == "solaris" && self.os == "illumos")
    }
}

/// Parsed `//go:build` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, platform: &Platform) -> bool {
        match self {
            Expr::Tag(tag) => platform.satisfies(tag),
            Expr::Not(inner) => !inner.eval(platform),
            Expr::And(left, right) => left.eval(platform) && right.eval(platform),
            Expr::Or(left, right) => left.eval(platform) || right.eval(platform),
        }
    }
}

/// Parse the text following `//go:build`.
pub fn parse(input: &str) -> Result<Expr, ConstraintError> {
    all_consuming(delimited(multispace0, or_expr, multispace0))
        .parse(input)
        .map(|(_, expr)| expr)
        .map_err(|_| ConstraintError::Invalid {
            expr: input.to_string(),
        })
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = and_expr(input)?;
    while let Ok((rest, rhs)) = preceded((multispace0, tag("||")), and_expr).parse(input) {
        expr = Expr::Or(Box::new(expr), Box::new(rhs));
        input = rest;
    }
    Ok((input, expr))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = unary(input)?;
    while let Ok((rest, rhs)) = preceded((multispace0, tag("&&")), unary).parse(input) {
        expr = Expr::And(Box::new(expr), Box::new(rhs));
        input = rest;
    }
    Ok((input, expr))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            preceded(char('!'), unary).map(|inner| Expr::Not(Box::new(inner))),
            delimited(char('('), or_expr, (multispace0, char(')'))),
            take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.')
                .map(|name: &str| Expr::Tag(name.to_string())),
        )),
    )
    .parse(input)
}
