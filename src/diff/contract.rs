use std::collections::HashSet;

use super::{Sides, block};
use crate::report::{Marker, Report, render_contract_method, render_embedded};
use crate::types::{Interface, Type, WriteQualified, is_exported};

/// Diff of two interface types named `name`.
///
/// Explicit methods match on their name alone: a method whose signature
/// changed but kept its name produces no entry. Embedded interfaces match on
/// their stripped qualified name.
pub(super) fn diff(
    name: &str,
    before: &Interface,
    after: &Interface,
    sides: Sides<'_>,
    report: &mut dyn Report,
) {
    let old_methods: HashSet<&str> = before.methods.iter().map(|m| m.name.as_str()).collect();
    let new_methods: HashSet<&str> = after.methods.iter().map(|m| m.name.as_str()).collect();

    let added_methods = after
        .methods
        .iter()
        .filter(|method| method.exported() && !old_methods.contains(method.name.as_str()))
        .map(|method| render_contract_method(method, sides.new, Marker::Added));
    let removed_methods = before
        .methods
        .iter()
        .filter(|method| method.exported() && !new_methods.contains(method.name.as_str()))
        .map(|method| render_contract_method(method, sides.old, Marker::Removed));

    let old_embeds: HashSet<String> = exported_embeds(before)
        .map(|ty| ty.qualified(sides.old.qualifier()).to_string())
        .collect();
    let new_embeds: HashSet<String> = exported_embeds(after)
        .map(|ty| ty.qualified(sides.new.qualifier()).to_string())
        .collect();

    let added_embeds = exported_embeds(after)
        .filter(|ty| !old_embeds.contains(&ty.qualified(sides.new.qualifier()).to_string()))
        .map(|ty| render_embedded(ty, sides.new, Marker::Added));
    let removed_embeds = exported_embeds(before)
        .filter(|ty| !new_embeds.contains(&ty.qualified(sides.old.qualifier()).to_string()))
        .map(|ty| render_embedded(ty, sides.old, Marker::Removed));

    let entries: Vec<String> = added_methods
        .chain(added_embeds)
        .chain(removed_methods)
        .chain(removed_embeds)
        .collect();

    block(report, &format!("type {name} interface {{"), &entries);
}

fn exported_embeds(interface: &Interface) -> impl Iterator<Item = &Type> {
    interface
        .embeddeds
        .iter()
        .filter(|ty| ty.type_name().is_some_and(is_exported))
}
