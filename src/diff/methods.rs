use std::collections::HashSet;

use super::Sides;
use crate::report::{Marker, Report, render_attached_method};
use crate::types::{AttachedMethod, NamedType, Package};

/// Most method entries listed for one named type.
pub const METHOD_LIMIT: usize = 5;

/// Printed once a type's method listing hits [`METHOD_LIMIT`].
pub const METHOD_SENTINEL: &str = "\tOther Methods ....";

/// Diff of the methods attached to the named type `name`.
pub(super) fn diff(
    name: &str,
    before: &NamedType,
    after: &NamedType,
    sides: Sides<'_>,
    report: &mut dyn Report,
) {
    let old_keys: HashSet<String> = exported(before)
        .map(|method| key(method, sides.old))
        .collect();
    let mut new_keys = HashSet::new();
    let mut listing = Listing::new(name, report);

    for method in exported(after) {
        let key = key(method, sides.new);
        if !old_keys.contains(&key) {
            listing.entry(|| render_attached_method(method, sides.new, Marker::Added));
        }
        new_keys.insert(key);
    }

    for method in exported(before) {
        if !new_keys.contains(&key(method, sides.old)) {
            listing.entry(|| render_attached_method(method, sides.old, Marker::Removed));
        }
    }

    listing.finish();
}

fn exported(named: &NamedType) -> impl Iterator<Item = &AttachedMethod> {
    named.methods.iter().filter(|method| method.exported())
}

fn key(method: &AttachedMethod, package: &Package) -> String {
    method.object(package.name(), package.qualifier()).to_string()
}

/// Lazily headed, capped list of method entries.
struct Listing<'a> {
    label: &'a str,
    emitted: usize,
    report: &'a mut dyn Report,
}

impl<'a> Listing<'a> {
    fn new(label: &'a str, report: &'a mut dyn Report) -> Self {
        Self {
            label,
            emitted: 0,
            report,
        }
    }

    fn entry(&mut self, line: impl FnOnce() -> String) {
        if self.emitted >= METHOD_LIMIT {
            return;
        }
        if self.emitted == 0 {
            self.report.line(self.label);
        }
        self.report.line(&line());
        self.emitted += 1;
    }

    fn finish(self) {
        if self.emitted == METHOD_LIMIT {
            self.report.line(METHOD_SENTINEL);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Param, Signature, Type};
    use similar_asserts::assert_eq;

    fn method(name: &str, pointer_receiver: bool) -> AttachedMethod {
        AttachedMethod {
            receiver: "T2".into(),
            pointer_receiver,
            name: name.to_string(),
            signature: Signature::default(),
        }
    }

    fn named(methods: Vec<AttachedMethod>) -> NamedType {
        NamedType {
            methods,
            ..NamedType::new(Type::Struct(Vec::new()))
        }
    }

    fn run(before: NamedType, after: NamedType) -> Vec<String> {
        let package = Package::new("pack");
        let mut lines = Vec::new();
        let sides = Sides {
            old: &package,
            new: &package,
        };
        diff("T2", &before, &after, sides, &mut lines);
        lines
    }

    #[test]
    fn header_is_printed_lazily() {
        let methods = vec![method("Name", false)];
        assert!(run(named(methods.clone()), named(methods)).is_empty());
    }

    #[test]
    fn additions_then_removals() {
        let mut pointer = method("WhatPointer", true);
        pointer.signature = Signature {
            params: vec![
                Param {
                    name: Some("_".into()),
                    ty: Type::Pointer(Box::new(Type::Basic("int".into()))),
                },
                Param {
                    name: Some("_".into()),
                    ty: Type::Slice(Box::new(Type::Basic("int".into()))),
                },
            ],
            ..Signature::default()
        };

        assert_eq!(
            run(named(vec![method("Name", false)]), named(vec![pointer])),
            vec![
                "T2",
                "\t+func (*T2).WhatPointer(_ *int, _ []int)",
                "\t-func (T2).Name()",
            ]
        );
    }

    #[test]
    fn receiver_kind_is_part_of_the_key() {
        assert_eq!(
            run(named(vec![method("M", false)]), named(vec![method("M", true)])),
            vec!["T2", "\t+func (*T2).M()", "\t-func (T2).M()"]
        );
    }

    #[test]
    fn listing_is_capped_with_one_sentinel() {
        let added = (0..9).map(|i| method(&format!("Added{i}"), false)).collect();
        let removed = (0..4).map(|i| method(&format!("Removed{i}"), false)).collect();
        let lines = run(named(removed), named(added));

        assert_eq!(lines.len(), 1 + METHOD_LIMIT + 1);
        assert_eq!(lines[0], "T2");
        assert_eq!(lines.iter().filter(|l| l.as_str() == METHOD_SENTINEL).count(), 1);
        assert_eq!(lines.last().unwrap(), METHOD_SENTINEL);
    }

    #[test]
    fn exactly_five_entries_also_print_the_sentinel() {
        let added = (0..5).map(|i| method(&format!("M{i}"), false)).collect();
        let lines = run(named(Vec::new()), named(added));
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[6], METHOD_SENTINEL);
    }

    #[test]
    fn unexported_methods_are_ignored() {
        assert!(run(named(vec![method("hidden", false)]), named(Vec::new())).is_empty());
    }
}
