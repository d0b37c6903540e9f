//! Structural comparison of two resolved packages.
//!
//! [`diff`] walks the exported scope of the old package in identifier order,
//! pairs each declaration with its counterpart in the new package and emits
//! report lines for whatever changed. Identifiers only present in the old
//! package are flushed afterwards as removals, then identifiers only present
//! in the new package as additions.

mod aggregate;
mod contract;
mod methods;

use std::collections::HashSet;

use tracing::warn;

use crate::report::{Marker, Report, render};
use crate::types::{DeclKind, Declaration, Package, Shape};

pub use methods::{METHOD_LIMIT, METHOD_SENTINEL};

/// The two packages being compared.
#[derive(Clone, Copy)]
pub(crate) struct Sides<'p> {
    pub old: &'p Package,
    pub new: &'p Package,
}

/// Compare the exported API of `old` against `new`, writing to `report`.
pub fn diff(old: &Package, new: &Package, report: &mut dyn Report) {
    let sides = Sides { old, new };
    let mut seen = HashSet::new();
    let mut removed = Vec::new();

    for before in old.exported() {
        seen.insert(before.name.as_str());
        match new.lookup(&before.name) {
            Some(after) => compare(sides, before, after, report),
            None => removed.push(before),
        }
    }

    for before in removed {
        report.line(&render(before, old, Marker::Removed, ""));
    }

    for after in new.exported() {
        if !seen.contains(after.name.as_str()) {
            report.line(&render(after, new, Marker::Added, ""));
        }
    }
}

fn compare(sides: Sides<'_>, before: &Declaration, after: &Declaration, report: &mut dyn Report) {
    let signatures_differ = || sides.old.signature(before) != sides.new.signature(after);

    match &before.kind {
        DeclKind::Var(_) | DeclKind::Const(_) | DeclKind::Func(_) => {
            if signatures_differ() {
                replaced(sides, before, after, report);
            }
        }
        DeclKind::Type(named) => {
            let DeclKind::Type(counterpart) = &after.kind else {
                replaced(sides, before, after, report);
                return;
            };

            match (named.shape(), counterpart.shape()) {
                (Shape::Aggregate(fields), Shape::Aggregate(other)) => {
                    aggregate::diff(&before.name, fields, other, sides, report);
                    methods::diff(&before.name, named, counterpart, sides, report);
                }
                (Shape::Aggregate(_), _) => {
                    replaced(sides, before, after, report);
                    methods::diff(&before.name, named, counterpart, sides, report);
                }
                (Shape::Contract(interface), Shape::Contract(other)) => {
                    contract::diff(&before.name, interface, other, sides, report);
                }
                (Shape::Contract(_), _) => replaced(sides, before, after, report),
                (Shape::Other, _) => {
                    if signatures_differ() {
                        replaced(sides, before, after, report);
                    }
                }
            }
        }
        DeclKind::Untreated(reason) => {
            warn!(
                name = %before.name,
                old = %reason,
                new = %sides.new.signature(after),
                "cannot compare untreated declaration"
            );
            if !matches!(after.kind, DeclKind::Untreated(_)) {
                replaced(sides, before, after, report);
            }
        }
    }
}

/// The general pair: new declaration added, old one removed.
fn replaced(sides: Sides<'_>, before: &Declaration, after: &Declaration, report: &mut dyn Report) {
    report.line(&render(after, sides.new, Marker::Added, ""));
    report.line(&render(before, sides.old, Marker::Removed, ""));
}

/// Emit `header`, the entries and a closing brace, or nothing at all.
fn block(report: &mut dyn Report, header: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    report.line(header);
    for entry in entries {
        report.line(entry);
    }
    report.line("}");
}
