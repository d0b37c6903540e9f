use std::collections::HashSet;

use super::{Sides, block};
use crate::report::{Marker, Report, render_field};
use crate::types::{Field, Package, WriteQualified};

/// Field-level diff of two struct types named `name`.
///
/// Fields match on their exact `name type` text, so a type change shows up
/// as one addition plus one removal.
pub(super) fn diff(name: &str, before: &[Field], after: &[Field], sides: Sides<'_>, report: &mut dyn Report) {
    let old_keys: HashSet<String> = exported(before).map(|field| key(field, sides.old)).collect();
    let mut new_keys = HashSet::new();
    let mut entries = Vec::new();

    for field in exported(after) {
        let key = key(field, sides.new);
        if !old_keys.contains(&key) {
            entries.push(render_field(field, sides.new, Marker::Added));
        }
        new_keys.insert(key);
    }

    for field in exported(before) {
        if !new_keys.contains(&key(field, sides.old)) {
            entries.push(render_field(field, sides.old, Marker::Removed));
        }
    }

    block(report, &format!("type {name} struct {{"), &entries);
}

fn exported(fields: &[Field]) -> impl Iterator<Item = &Field> {
    fields.iter().filter(|field| field.exported())
}

fn key(field: &Field, package: &Package) -> String {
    format!(
        "{} {}",
        field.name,
        field.ty.qualified(package.qualifier())
    )
}
