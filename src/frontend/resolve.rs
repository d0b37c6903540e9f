//! Merge parsed files into one [`Package`].
//!
//! Underlying types follow chains of local named types, value types are
//! inferred from initializers as far as the syntax allows, and methods are
//! attached to their receiver's named type. Whatever cannot be resolved
//! becomes an invalid type or an untreated declaration plus a [`Note`].

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::Note;
use super::parser::{Decl, Expr, FuncDecl, Operand, SourceFile, TypeSpec, ValueSpec};
use crate::types::{
    AttachedMethod, DeclKind, Declaration, NamedType, PREDECLARED_TYPES, Package, Type, UntypedKind,
};

#[derive(Clone, Copy)]
struct Origin<'f> {
    file: &'f str,
    line: usize,
}

#[derive(Clone, Copy)]
enum Source<'f> {
    Expr(&'f Expr),
    /// Element of a multi-value initializer such as `a, b = f()`
    Tuple(&'f Expr, usize),
    Missing,
}

#[derive(Clone, Copy)]
struct Value<'f> {
    constant: bool,
    ty: Option<&'f Type>,
    source: Source<'f>,
    origin: Origin<'f>,
}

/// Resolve the files of one package into its scope.
///
/// All files are expected to share one package name.
pub fn resolve(files: &[(String, SourceFile)], notes: &mut Vec<Note>) -> Package {
    let name = files
        .first()
        .map(|(_, file)| file.package.clone())
        .unwrap_or_default();

    let mut resolver = Resolver::new(name, notes);
    for (file_name, file) in files {
        resolver.collect(file_name, file);
    }
    resolver.finish()
}

struct Resolver<'f, 'n> {
    package: String,
    notes: &'n mut Vec<Note>,
    declared: HashSet<&'f str>,
    types: BTreeMap<&'f str, (&'f TypeSpec, Origin<'f>)>,
    values: BTreeMap<&'f str, Value<'f>>,
    funcs: BTreeMap<&'f str, &'f FuncDecl>,
    untreated: BTreeMap<&'f str, (&'f str, Origin<'f>)>,
    methods: Vec<(&'f FuncDecl, Origin<'f>)>,
    underlying: HashMap<&'f str, Type>,
    value_types: HashMap<&'f str, Option<Type>>,
    in_progress: HashSet<&'f str>,
}

impl<'f, 'n> Resolver<'f, 'n> {
    fn new(package: String, notes: &'n mut Vec<Note>) -> Self {
        Self {
            package,
            notes,
            declared: HashSet::new(),
            types: BTreeMap::new(),
            values: BTreeMap::new(),
            funcs: BTreeMap::new(),
            untreated: BTreeMap::new(),
            methods: Vec::new(),
            underlying: HashMap::new(),
            value_types: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn note(&mut self, origin: Origin<'_>, message: String) {
        self.notes.push(Note {
            file: origin.file.to_string(),
            line: origin.line,
            message,
        });
    }

    /// Claim `name` in the package scope; `_` never is.
    fn declare(&mut self, name: &'f str, origin: Origin<'f>) -> bool {
        if name == "_" {
            return false;
        }
        if !self.declared.insert(name) {
            self.note(origin, format!("{name} redeclared in this block"));
            return false;
        }
        true
    }

    fn collect(&mut self, file_name: &'f str, file: &'f SourceFile) {
        for decl in &file.decls {
            match decl {
                Decl::Const(spec) => self.collect_values(file_name, spec, true),
                Decl::Var(spec) => self.collect_values(file_name, spec, false),
                Decl::Type(spec) => {
                    let origin = Origin {
                        file: file_name,
                        line: spec.line,
                    };
                    if self.declare(&spec.name, origin) {
                        self.types.insert(&spec.name, (spec, origin));
                    }
                }
                Decl::Func(func) => {
                    let origin = Origin {
                        file: file_name,
                        line: func.line,
                    };
                    if func.receiver.is_some() {
                        self.methods.push((func, origin));
                    } else if func.name != "init" && self.declare(&func.name, origin) {
                        self.funcs.insert(&func.name, func);
                    }
                }
                Decl::Untreated { name, line, reason } => {
                    let origin = Origin {
                        file: file_name,
                        line: *line,
                    };
                    if self.declare(name, origin) {
                        self.untreated.insert(name, (reason.as_str(), origin));
                    }
                }
            }
        }
    }

    fn collect_values(&mut self, file_name: &'f str, spec: &'f ValueSpec, constant: bool) {
        let origin = Origin {
            file: file_name,
            line: spec.line,
        };

        for (index, name) in spec.names.iter().enumerate() {
            let source = if spec.values.len() == spec.names.len() {
                Source::Expr(&spec.values[index])
            } else if spec.values.len() == 1 && !constant {
                Source::Tuple(&spec.values[0], index)
            } else {
                Source::Missing
            };

            if spec.ty.is_none() && matches!(source, Source::Missing) {
                self.note(origin, format!("missing init expr for {name}"));
            }
            if self.declare(name, origin) {
                self.values.insert(
                    name,
                    Value {
                        constant,
                        ty: spec.ty.as_ref(),
                        source,
                        origin,
                    },
                );
            }
        }
    }

    fn finish(mut self) -> Package {
        let mut package = Package::new(self.package.clone());

        let types: Vec<(&'f str, &'f TypeSpec)> =
            self.types.iter().map(|(name, (spec, _))| (*name, *spec)).collect();
        for (name, spec) in types {
            let named = NamedType {
                underlying: self.underlying_of(name),
                alias_of: spec.alias.then(|| spec.ty.clone()),
                methods: Vec::new(),
            };
            package.insert(Declaration::new(name, DeclKind::Type(named)));
        }

        let values: Vec<(&'f str, Value<'f>)> =
            self.values.iter().map(|(name, value)| (*name, *value)).collect();
        for (name, value) in values {
            let ty = self.value_type(name).unwrap_or_else(|| {
                self.note(value.origin, format!("cannot infer type of {name}"));
                Type::Invalid
            });
            let kind = if value.constant {
                DeclKind::Const(ty)
            } else {
                DeclKind::Var(ty)
            };
            package.insert(Declaration::new(name, kind));
        }

        for (name, func) in &self.funcs {
            package.insert(Declaration::new(
                *name,
                DeclKind::Func(func.signature.clone()),
            ));
        }

        let untreated: Vec<(&'f str, &'f str, Origin<'f>)> = self
            .untreated
            .iter()
            .map(|(name, (reason, origin))| (*name, *reason, *origin))
            .collect();
        for (name, reason, origin) in untreated {
            self.note(origin, format!("{name}: {reason} not analysed"));
            package.insert(Declaration::new(name, DeclKind::Untreated(reason.to_string())));
        }

        let methods = std::mem::take(&mut self.methods);
        for (func, origin) in methods {
            self.attach(&mut package, func, origin);
        }

        debug!(
            package = %package.name(),
            declarations = package.len(),
            "resolved package"
        );
        package
    }

    fn attach(&mut self, package: &mut Package, func: &'f FuncDecl, origin: Origin<'f>) {
        let Some(receiver) = &func.receiver else {
            return;
        };

        let target = match package.lookup_mut(&receiver.type_name) {
            Some(Declaration {
                kind: DeclKind::Type(named),
                ..
            }) if named.alias_of.is_none() && !receiver.generic => named,
            _ => {
                self.note(
                    origin,
                    format!(
                        "method {}.{} has no resolvable receiver type",
                        receiver.type_name, func.name
                    ),
                );
                return;
            }
        };

        if func.name != "_" && target.methods.iter().any(|method| method.name == func.name) {
            self.note(
                origin,
                format!("method {}.{} already declared", receiver.type_name, func.name),
            );
            return;
        }

        target.methods.push(AttachedMethod {
            receiver: receiver.type_name.clone(),
            pointer_receiver: receiver.pointer,
            name: func.name.clone(),
            signature: func.signature.clone(),
        });
    }

    /// Underlying type of the local named type `name`.
    fn underlying_of(&mut self, name: &'f str) -> Type {
        if let Some(ty) = self.underlying.get(name) {
            return ty.clone();
        }

        let mut chain = vec![name];
        let mut current = name;
        let resolved = loop {
            let Some((spec, origin)) = self.types.get(current).copied() else {
                break Type::Invalid;
            };
            match &spec.ty {
                Type::Named {
                    package: Some(owner),
                    name: next,
                } if *owner == self.package && self.types.contains_key(next.as_str()) => {
                    if chain.contains(&next.as_str()) {
                        self.note(origin, format!("invalid recursive type {name}"));
                        break Type::Invalid;
                    }
                    if let Some(known) = self.underlying.get(next.as_str()) {
                        break known.clone();
                    }
                    chain.push(next.as_str());
                    current = next.as_str();
                }
                other => break other.clone(),
            }
        };

        for link in chain {
            self.underlying.insert(link, resolved.clone());
        }
        resolved
    }

    /// Type of the value `name`; constants may stay untyped.
    fn value_type(&mut self, name: &'f str) -> Option<Type> {
        if let Some(ty) = self.value_types.get(name) {
            return ty.clone();
        }
        let value = *self.values.get(name)?;
        if !self.in_progress.insert(name) {
            return None;
        }

        let ty = match (value.ty, value.source) {
            (Some(ty), _) => Some(ty.clone()),
            (None, Source::Expr(expr)) => self.infer(expr),
            (None, Source::Tuple(expr, index)) => self.tuple_element(expr, index),
            (None, Source::Missing) => None,
        };
        let ty = if value.constant {
            ty
        } else {
            ty.and_then(|ty| match ty {
                Type::Untyped(kind) => kind.default_type(),
                typed => Some(typed),
            })
        };

        self.in_progress.remove(name);
        self.value_types.insert(name, ty.clone());
        ty
    }

    fn infer(&mut self, expr: &'f Expr) -> Option<Type> {
        if expr.boolean {
            return Some(Type::Untyped(UntypedKind::Bool));
        }

        let mut untyped: Option<UntypedKind> = None;
        for operand in &expr.operands {
            match self.operand_type(operand)? {
                Type::Untyped(kind) => {
                    untyped = Some(untyped.map_or(kind, |seen| seen.combine(kind)));
                }
                typed => return Some(typed),
            }
        }
        untyped.map(Type::Untyped)
    }

    fn operand_type(&mut self, operand: &'f Operand) -> Option<Type> {
        match operand {
            Operand::Literal(kind) => Some(Type::Untyped(*kind)),
            Operand::Typed(ty) => Some(ty.clone()),
            Operand::Group(inner) => self.infer(inner),
            Operand::Ident(name) => {
                if self.values.contains_key(name.as_str()) {
                    self.value_type(name)
                } else {
                    self.funcs
                        .get(name.as_str())
                        .map(|func| Type::Func(func.signature.clone()))
                }
            }
            Operand::Call(name) => self.call_type(name),
            Operand::Opaque => None,
        }
    }

    /// Result type of `name(...)`: a conversion, a builtin or a local function.
    fn call_type(&self, name: &str) -> Option<Type> {
        if PREDECLARED_TYPES.contains(&name) || self.types.contains_key(name) {
            return Some(Type::from_ident(&self.package, name));
        }
        match name {
            "len" | "cap" | "copy" => Some(Type::Basic("int".to_string())),
            "real" | "imag" => Some(Type::Basic("float64".to_string())),
            "complex" => Some(Type::Basic("complex128".to_string())),
            _ => match self.funcs.get(name)?.signature.results.as_slice() {
                [result] => Some(result.ty.clone()),
                _ => None,
            },
        }
    }

    fn tuple_element(&self, expr: &Expr, index: usize) -> Option<Type> {
        match expr.operands.as_slice() {
            [Operand::Call(name)] if !expr.boolean => self
                .funcs
                .get(name.as_str())?
                .signature
                .results
                .get(index)
                .map(|result| result.ty.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::frontend::parser::GoParser;
    use crate::types::{Qualifier, WriteQualified};
    use similar_asserts::assert_eq;

    fn resolve_sources(sources: &[(&str, &str)]) -> (Package, Vec<Note>) {
        let mut parser = GoParser::new().unwrap();
        let files: Vec<(String, SourceFile)> = sources
            .iter()
            .map(|(name, source)| (name.to_string(), parser.parse_file(source).unwrap()))
            .collect();
        let mut notes = Vec::new();
        let package = resolve(&files, &mut notes);
        (package, notes)
    }

    fn signature(package: &Package, name: &str) -> String {
        package.signature(package.lookup(name).unwrap())
    }

    fn kind(package: &Package, name: &str) -> &'static str {
        match package.lookup(name).unwrap().kind {
            DeclKind::Var(_) => "var",
            DeclKind::Const(_) => "const",
            DeclKind::Func(_) => "func",
            DeclKind::Type(_) => "type",
            DeclKind::Untreated(_) => "untreated",
        }
    }

    #[test]
    fn untyped_constants_and_var_defaults() {
        let (package, notes) = resolve_sources(&[(
            "a.go",
            "package p\nconst (\n\tA = 1\n\tB = 2.5 * A\n\tC = 'x'\n\tD = \"s\"\n\tE = A > 0\n)\nvar (\n\tV = A\n\tW = B\n\tX = C\n)\n",
        )]);

        assert!(notes.is_empty(), "{notes:?}");
        assert_eq!(signature(&package, "A"), "untyped int");
        assert_eq!(signature(&package, "B"), "untyped float");
        assert_eq!(signature(&package, "C"), "untyped rune");
        assert_eq!(signature(&package, "D"), "untyped string");
        assert_eq!(signature(&package, "E"), "untyped bool");
        assert_eq!(signature(&package, "V"), "int");
        assert_eq!(signature(&package, "W"), "float64");
        assert_eq!(signature(&package, "X"), "rune");
    }

    #[test]
    fn iota_groups_share_their_type() {
        let (package, _) = resolve_sources(&[(
            "kind.go",
            "package p\ntype Kind int\nconst (\n\tFirst Kind = iota\n\tSecond\n)\n",
        )]);
        assert_eq!(signature(&package, "Second"), "Kind");
        assert_eq!(kind(&package, "Second"), "const");
    }

    #[test]
    fn typed_initializers() {
        let (package, notes) = resolve_sources(&[(
            "a.go",
            "package p\nimport \"io\"\ntype T struct{ A int }\nfunc New() *T { return nil }\nfunc Pair() (int, error) { return 0, nil }\nvar (\n\tA = T{}\n\tB = &T{A: 1}\n\tC = New()\n\tD = int64(3)\n\tE = make([]string, 0)\n\tF, G = Pair()\n\tH = New\n\tI io.Reader\n\tJ = len(\"abc\")\n)\n",
        )]);

        assert!(notes.is_empty(), "{notes:?}");
        assert_eq!(signature(&package, "A"), "T");
        assert_eq!(signature(&package, "B"), "*T");
        assert_eq!(signature(&package, "C"), "*T");
        assert_eq!(signature(&package, "D"), "int64");
        assert_eq!(signature(&package, "E"), "[]string");
        assert_eq!(signature(&package, "F"), "int");
        assert_eq!(signature(&package, "G"), "error");
        assert_eq!(signature(&package, "H"), "func() *T");
        assert_eq!(signature(&package, "I"), "io.Reader");
        assert_eq!(signature(&package, "J"), "int");
    }

    #[test]
    fn uninferable_values_are_invalid_with_a_note() {
        let (package, notes) = resolve_sources(&[(
            "a.go",
            "package p\nimport \"errors\"\nvar ErrX = errors.New(\"x\")\n",
        )]);
        assert_eq!(signature(&package, "ErrX"), "invalid type");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].to_string(), "a.go:3: cannot infer type of ErrX");
    }

    #[test]
    fn underlying_types_follow_local_chains() {
        let (package, notes) = resolve_sources(&[(
            "a.go",
            "package p\ntype A B\ntype B struct{ X int }\ntype C = A\ntype D time.Duration\ntype E F\ntype F E\n",
        )]);

        assert_eq!(signature(&package, "A"), "struct{X int}");
        assert_eq!(signature(&package, "C"), "= A");
        assert_eq!(signature(&package, "D"), "time.Duration");
        assert_eq!(signature(&package, "E"), "invalid type");
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.starts_with("invalid recursive type"));

        let DeclKind::Type(alias) = &package.lookup("C").unwrap().kind else {
            panic!("expected type");
        };
        assert_eq!(
            alias.underlying.qualified(Qualifier::Full).to_string(),
            "struct{X int}"
        );
    }

    #[test]
    fn methods_attach_across_files_in_order() {
        let (package, notes) = resolve_sources(&[
            ("a.go", "package p\ntype T struct{}\nfunc (T) Value() int { return 0 }\n"),
            (
                "b.go",
                "package p\nfunc (t *T) Pointer(_ *int, _ []int) {}\nfunc (m Missing) Gone() {}\n",
            ),
        ]);

        let DeclKind::Type(named) = &package.lookup("T").unwrap().kind else {
            panic!("expected type");
        };
        let methods: Vec<String> = named
            .methods
            .iter()
            .map(|method| method.object("p", Qualifier::Strip("p")).to_string())
            .collect();
        assert_eq!(
            methods,
            vec!["func (T).Value() int", "func (*T).Pointer(_ *int, _ []int)"]
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].file, "b.go");
        assert_eq!(notes[0].line, 3);
    }

    #[test]
    fn duplicates_and_generics_produce_notes() {
        let (package, notes) = resolve_sources(&[
            ("a.go", "package p\nvar X int\nfunc Map[T any](x T) T { return x }\n"),
            ("b.go", "package p\nvar X string\n"),
        ]);

        assert_eq!(signature(&package, "X"), "int");
        assert_eq!(kind(&package, "Map"), "untreated");
        let messages: Vec<&str> = notes.iter().map(|note| note.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["X redeclared in this block", "Map: generic function not analysed"]
        );
    }

    #[test]
    fn blank_and_init_are_not_declared() {
        let (package, notes) = resolve_sources(&[(
            "a.go",
            "package p\nvar _ = 1\nfunc init() {}\nfunc init() {}\n",
        )]);
        assert!(package.is_empty());
        assert!(notes.is_empty());
    }
}
