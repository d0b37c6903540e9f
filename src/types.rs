//! Resolved package model consumed by the diff engine.
//!
//! A [`Package`] is an immutable, name-ordered scope of [`Declaration`]s.
//! Every type carries enough structure to print itself the way Go's `types`
//! package does (`struct{A int; B string}`, `func(int) error`, ...), either
//! fully qualified or with the owning package's qualification stripped.
//! Stripped strings are what the diff engine compares, so identical shapes
//! declared in differently named packages compare equal.

use std::collections::BTreeMap;
use std::fmt;

/// Names the Go universe scope declares as types.
pub const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Whether an identifier is part of the public surface (starts upper-case).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// How package-qualified names are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier<'a> {
    /// Every named type keeps its package prefix (`pack.T`).
    Full,
    /// Names declared in the given package lose their prefix (`T`).
    Strip(&'a str),
}

impl Qualifier<'_> {
    fn write_name(self, f: &mut fmt::Formatter<'_>, package: Option<&str>, name: &str) -> fmt::Result {
        match (self, package) {
            (Qualifier::Strip(local), Some(package)) if package == local => f.write_str(name),
            (_, Some(package)) => write!(f, "{package}.{name}"),
            (_, None) => f.write_str(name),
        }
    }
}

/// Anything that prints differently depending on a [`Qualifier`].
pub trait WriteQualified {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, qualifier: Qualifier<'_>) -> fmt::Result;

    /// Borrow `self` as a `Display` value under `qualifier`.
    fn qualified<'a>(&'a self, qualifier: Qualifier<'a>) -> Qualified<'a, Self> {
        Qualified {
            item: self,
            qualifier,
        }
    }
}

/// `Display` adapter returned by [`WriteQualified::qualified`].
pub struct Qualified<'a, T: ?Sized> {
    item: &'a T,
    qualifier: Qualifier<'a>,
}

impl<T: WriteQualified + ?Sized> fmt::Display for Qualified<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.item.write_qualified(f, self.qualifier)
    }
}

/// Kinds of untyped constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntypedKind {
    Bool,
    Int,
    Rune,
    Float,
    Complex,
    String,
    Nil,
}

impl UntypedKind {
    pub fn name(self) -> &'static str {
        match self {
            UntypedKind::Bool => "bool",
            UntypedKind::Int => "int",
            UntypedKind::Rune => "rune",
            UntypedKind::Float => "float",
            UntypedKind::Complex => "complex",
            UntypedKind::String => "string",
            UntypedKind::Nil => "nil",
        }
    }

    /// Type a variable gets when initialized from this kind of constant.
    pub fn default_type(self) -> Option<Type> {
        let name = match self {
            UntypedKind::Bool => "bool",
            UntypedKind::Int => "int",
            UntypedKind::Rune => "rune",
            UntypedKind::Float => "float64",
            UntypedKind::Complex => "complex128",
            UntypedKind::String => "string",
            UntypedKind::Nil => return None,
        };
        Some(Type::Basic(name.to_string()))
    }

    /// Kind of a constant expression mixing two operand kinds.
    ///
    /// Numeric kinds widen `int < rune < float < complex`; anything else
    /// keeps the left operand.
    pub fn combine(self, other: UntypedKind) -> UntypedKind {
        fn rank(kind: UntypedKind) -> Option<u8> {
            match kind {
                UntypedKind::Int => Some(0),
                UntypedKind::Rune => Some(1),
                UntypedKind::Float => Some(2),
                UntypedKind::Complex => Some(3),
                _ => None,
            }
        }

        match (rank(self), rank(other)) {
            (Some(left), Some(right)) if right > left => other,
            _ => self,
        }
    }
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A Go type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Predeclared type (`int`, `string`, `error`, ...)
    Basic(String),
    /// Type of an untyped constant expression
    Untyped(UntypedKind),
    /// Reference to a declared type; `package` is `None` only for names
    /// the front-end could not attribute to any package
    Named {
        package: Option<String>,
        name: String,
    },
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array {
        len: String,
        elem: Box<Type>,
    },
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<Type>,
    },
    Func(Signature),
    Struct(Vec<Field>),
    Interface(Interface),
    /// Placeholder for a type the front-end could not resolve
    Invalid,
}

impl Type {
    /// Type named by a bare identifier inside `package`.
    pub fn from_ident(package: &str, name: &str) -> Type {
        if PREDECLARED_TYPES.contains(&name) {
            Type::Basic(name.to_string())
        } else {
            Type::Named {
                package: Some(package.to_string()),
                name: name.to_string(),
            }
        }
    }

    /// Name of the declared type this expression refers to, if it is one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Type::Named { name, .. } => Some(name),
            Type::Basic(name) => Some(name),
            _ => None,
        }
    }
}

impl WriteQualified for Type {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, q: Qualifier<'_>) -> fmt::Result {
        match self {
            Type::Basic(name) => f.write_str(name),
            Type::Untyped(kind) => write!(f, "untyped {}", kind.name()),
            Type::Named { package, name } => q.write_name(f, package.as_deref(), name),
            Type::Pointer(elem) => {
                f.write_str("*")?;
                elem.write_qualified(f, q)
            }
            Type::Slice(elem) => {
                f.write_str("[]")?;
                elem.write_qualified(f, q)
            }
            Type::Array { len, elem } => {
                write!(f, "[{len}]")?;
                elem.write_qualified(f, q)
            }
            Type::Map { key, value } => {
                f.write_str("map[")?;
                key.write_qualified(f, q)?;
                f.write_str("]")?;
                value.write_qualified(f, q)
            }
            Type::Chan { dir, elem } => {
                let (prefix, parenthesize) = match dir {
                    ChanDir::Both => (
                        "chan ",
                        matches!(
                            elem.as_ref(),
                            Type::Chan {
                                dir: ChanDir::Recv,
                                ..
                            }
                        ),
                    ),
                    ChanDir::Send => ("chan<- ", false),
                    ChanDir::Recv => ("<-chan ", false),
                };
                f.write_str(prefix)?;
                if parenthesize {
                    f.write_str("(")?;
                    elem.write_qualified(f, q)?;
                    f.write_str(")")
                } else {
                    elem.write_qualified(f, q)
                }
            }
            Type::Func(signature) => {
                f.write_str("func")?;
                signature.write_qualified(f, q)
            }
            Type::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    field.write_qualified(f, q)?;
                    if let Some(tag) = &field.tag {
                        write!(f, " {tag:?}")?;
                    }
                }
                f.write_str("}")
            }
            Type::Interface(interface) => interface.write_qualified(f, q),
            Type::Invalid => f.write_str("invalid type"),
        }
    }
}

/// One parameter or result of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

impl Param {
    pub fn unnamed(ty: Type) -> Self {
        Self { name: None, ty }
    }
}

/// Function signature. For a variadic signature the last parameter holds the
/// element type (`...T` is stored as `T`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub variadic: bool,
}

impl WriteQualified for Signature {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, q: Qualifier<'_>) -> fmt::Result {
        write_tuple(f, &self.params, self.variadic, q)?;

        match self.results.as_slice() {
            [] => Ok(()),
            [Param { name: None, ty }] => {
                f.write_str(" ")?;
                ty.write_qualified(f, q)
            }
            results => {
                f.write_str(" ")?;
                write_tuple(f, results, false, q)
            }
        }
    }
}

fn write_tuple(
    f: &mut fmt::Formatter<'_>,
    params: &[Param],
    variadic: bool,
    q: Qualifier<'_>,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &param.name {
            write!(f, "{name} ")?;
        }
        if variadic && i + 1 == params.len() {
            f.write_str("...")?;
        }
        param.ty.write_qualified(f, q)?;
    }
    f.write_str(")")
}

/// Struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name; for embedded fields the embedded type's name
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
    pub tag: Option<String>,
}

impl Field {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }
}

impl WriteQualified for Field {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, q: Qualifier<'_>) -> fmt::Result {
        if !self.embedded {
            write!(f, "{} ", self.name)?;
        }
        self.ty.write_qualified(f, q)
    }
}

/// Method declared in an interface body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub signature: Signature,
}

impl Method {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }
}

impl WriteQualified for Method {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, q: Qualifier<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        self.signature.write_qualified(f, q)
    }
}

/// Interface type: explicit methods plus embedded interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interface {
    pub methods: Vec<Method>,
    pub embeddeds: Vec<Type>,
}

impl WriteQualified for Interface {
    fn write_qualified(&self, f: &mut fmt::Formatter<'_>, q: Qualifier<'_>) -> fmt::Result {
        f.write_str("interface{")?;
        let mut first = true;
        for method in &self.methods {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            method.write_qualified(f, q)?;
        }
        for embedded in &self.embeddeds {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            embedded.write_qualified(f, q)?;
        }
        f.write_str("}")
    }
}

/// Method attached to a named type through a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedMethod {
    /// Name of the receiver's base type
    pub receiver: String,
    pub pointer_receiver: bool,
    pub name: String,
    pub signature: Signature,
}

impl AttachedMethod {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// `func (T).Name(sig)` / `func (*T).Name(sig)` for a receiver declared in `package`.
    pub fn object<'a>(&'a self, package: &'a str, qualifier: Qualifier<'a>) -> MethodObject<'a> {
        MethodObject {
            method: self,
            package,
            qualifier,
        }
    }
}

/// `Display` adapter returned by [`AttachedMethod::object`].
pub struct MethodObject<'a> {
    method: &'a AttachedMethod,
    package: &'a str,
    qualifier: Qualifier<'a>,
}

impl fmt::Display for MethodObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func (")?;
        if self.method.pointer_receiver {
            f.write_str("*")?;
        }
        self.qualifier
            .write_name(f, Some(self.package), &self.method.receiver)?;
        write!(f, ").{}", self.method.name)?;
        self.method.signature.write_qualified(f, self.qualifier)
    }
}

/// Declared type with its underlying type and attached methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    /// Fully resolved underlying type (struct, interface, basic, ...)
    pub underlying: Type,
    /// Right-hand side of `type A = B`
    pub alias_of: Option<Type>,
    pub methods: Vec<AttachedMethod>,
}

/// Underlying shape of a named type.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Aggregate(&'a [Field]),
    Contract(&'a Interface),
    Other,
}

impl NamedType {
    pub fn new(underlying: Type) -> Self {
        Self {
            underlying,
            alias_of: None,
            methods: Vec::new(),
        }
    }

    pub fn shape(&self) -> Shape<'_> {
        match &self.underlying {
            Type::Struct(fields) => Shape::Aggregate(fields),
            Type::Interface(interface) => Shape::Contract(interface),
            _ => Shape::Other,
        }
    }
}

/// Top-level declaration kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Var(Type),
    Const(Type),
    Func(Signature),
    Type(NamedType),
    /// Seen by the front-end but not modelled; the string says why
    Untreated(String),
}

/// A top-level named entity of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// Canonical signature string used for equality checks.
    pub fn signature(&self, qualifier: Qualifier<'_>) -> String {
        match &self.kind {
            DeclKind::Var(ty) | DeclKind::Const(ty) => ty.qualified(qualifier).to_string(),
            DeclKind::Func(signature) => format!("func{}", signature.qualified(qualifier)),
            DeclKind::Type(named) => match &named.alias_of {
                Some(aliased) => format!("= {}", aliased.qualified(qualifier)),
                None => named.underlying.qualified(qualifier).to_string(),
            },
            DeclKind::Untreated(reason) => format!("untreated {reason}"),
        }
    }

    /// Object string as Go prints it, e.g. `var pack.Me io.Writer`.
    pub fn object<'a>(&'a self, package: &'a str, qualifier: Qualifier<'a>) -> DeclarationObject<'a> {
        DeclarationObject {
            declaration: self,
            package,
            qualifier,
        }
    }
}

/// `Display` adapter returned by [`Declaration::object`].
pub struct DeclarationObject<'a> {
    declaration: &'a Declaration,
    package: &'a str,
    qualifier: Qualifier<'a>,
}

impl fmt::Display for DeclarationObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.qualifier;
        let keyword = match &self.declaration.kind {
            DeclKind::Var(_) => "var",
            DeclKind::Const(_) => "const",
            DeclKind::Func(_) => "func",
            DeclKind::Type(_) => "type",
            DeclKind::Untreated(_) => "untreated",
        };
        write!(f, "{keyword} ")?;
        q.write_name(f, Some(self.package), &self.declaration.name)?;

        match &self.declaration.kind {
            DeclKind::Var(ty) | DeclKind::Const(ty) => {
                f.write_str(" ")?;
                ty.write_qualified(f, q)
            }
            DeclKind::Func(signature) => signature.write_qualified(f, q),
            DeclKind::Type(named) => match &named.alias_of {
                Some(aliased) => {
                    f.write_str(" = ")?;
                    aliased.write_qualified(f, q)
                }
                None => {
                    f.write_str(" ")?;
                    named.underlying.write_qualified(f, q)
                }
            },
            DeclKind::Untreated(_) => Ok(()),
        }
    }
}

/// Resolved package: a name plus its scope ordered by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    name: String,
    scope: BTreeMap<String, Declaration>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualifier that strips this package's own prefix.
    pub fn qualifier(&self) -> Qualifier<'_> {
        Qualifier::Strip(&self.name)
    }

    /// Insert a declaration, returning the one it replaced.
    pub fn insert(&mut self, declaration: Declaration) -> Option<Declaration> {
        self.scope.insert(declaration.name.clone(), declaration)
    }

    /// Builder form of [`Package::insert`].
    #[must_use]
    pub fn with(mut self, declaration: Declaration) -> Self {
        self.insert(declaration);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Declaration> {
        self.scope.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Declaration> {
        self.scope.get_mut(name)
    }

    /// All declarations in ascending identifier order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.scope.values()
    }

    /// Exported declarations in ascending identifier order.
    pub fn exported(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations().filter(|declaration| declaration.exported())
    }

    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Stripped signature of `declaration` as declared in this package.
    pub fn signature(&self, declaration: &Declaration) -> String {
        declaration.signature(self.qualifier())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn named(package: &str, name: &str) -> Type {
        Type::Named {
            package: Some(package.to_string()),
            name: name.to_string(),
        }
    }

    fn basic(name: &str) -> Type {
        Type::Basic(name.to_string())
    }

    #[test]
    fn struct_string_matches_go_notation() {
        let ty = Type::Struct(vec![
            Field {
                name: "A".into(),
                ty: basic("int"),
                embedded: false,
                tag: None,
            },
            Field {
                name: "Reader".into(),
                ty: named("io", "Reader"),
                embedded: true,
                tag: None,
            },
            Field {
                name: "F".into(),
                ty: named("pack", "I4"),
                embedded: false,
                tag: Some("json:\"f\"".into()),
            },
        ]);

        assert_eq!(
            ty.qualified(Qualifier::Full).to_string(),
            r#"struct{A int; io.Reader; F pack.I4 "json:\"f\""}"#
        );
        assert_eq!(
            ty.qualified(Qualifier::Strip("pack")).to_string(),
            r#"struct{A int; io.Reader; F I4 "json:\"f\""}"#
        );
    }

    #[test]
    fn signature_string_covers_names_variadics_and_results() {
        let signature = Signature {
            params: vec![
                Param {
                    name: Some("_".into()),
                    ty: Type::Pointer(Box::new(basic("int"))),
                },
                Param {
                    name: Some("rest".into()),
                    ty: basic("string"),
                },
            ],
            results: vec![Param::unnamed(basic("int")), Param::unnamed(basic("error"))],
            variadic: true,
        };

        assert_eq!(
            signature.qualified(Qualifier::Full).to_string(),
            "(_ *int, rest ...string) (int, error)"
        );
    }

    #[test]
    fn single_unnamed_result_is_not_parenthesized() {
        let signature = Signature {
            params: vec![Param::unnamed(basic("int"))],
            results: vec![Param::unnamed(basic("string"))],
            variadic: false,
        };
        assert_eq!(
            signature.qualified(Qualifier::Full).to_string(),
            "(int) string"
        );
    }

    #[test]
    fn interface_lists_methods_before_embeddeds() {
        let ty = Type::Interface(Interface {
            methods: vec![Method {
                name: "M".into(),
                signature: Signature {
                    results: vec![Param::unnamed(basic("int"))],
                    ..Signature::default()
                },
            }],
            embeddeds: vec![named("io", "Reader")],
        });
        assert_eq!(
            ty.qualified(Qualifier::Full).to_string(),
            "interface{M() int; io.Reader}"
        );
        assert_eq!(
            Type::Interface(Interface::default())
                .qualified(Qualifier::Full)
                .to_string(),
            "interface{}"
        );
    }

    #[test]
    fn channel_directions() {
        let recv = Type::Chan {
            dir: ChanDir::Recv,
            elem: Box::new(basic("int")),
        };
        let nested = Type::Chan {
            dir: ChanDir::Both,
            elem: Box::new(recv.clone()),
        };
        assert_eq!(recv.qualified(Qualifier::Full).to_string(), "<-chan int");
        assert_eq!(
            nested.qualified(Qualifier::Full).to_string(),
            "chan (<-chan int)"
        );
    }

    #[test]
    fn object_strings() {
        let var = Declaration::new("Me", DeclKind::Var(named("io", "Writer")));
        let constant = Declaration::new("N", DeclKind::Const(Type::Untyped(UntypedKind::Int)));
        let alias = Declaration::new(
            "Alias",
            DeclKind::Type(NamedType {
                underlying: basic("int"),
                alias_of: Some(named("pack", "Number")),
                methods: Vec::new(),
            }),
        );

        assert_eq!(
            var.object("pack", Qualifier::Full).to_string(),
            "var pack.Me io.Writer"
        );
        assert_eq!(
            constant.object("pack", Qualifier::Strip("pack")).to_string(),
            "const N untyped int"
        );
        assert_eq!(
            alias.object("pack", Qualifier::Strip("pack")).to_string(),
            "type Alias = Number"
        );
    }

    #[test]
    fn method_object_string() {
        let method = AttachedMethod {
            receiver: "T2".into(),
            pointer_receiver: true,
            name: "WhatPointer".into(),
            signature: Signature {
                params: vec![
                    Param {
                        name: Some("_".into()),
                        ty: Type::Pointer(Box::new(basic("int"))),
                    },
                    Param {
                        name: Some("_".into()),
                        ty: Type::Slice(Box::new(basic("int"))),
                    },
                ],
                ..Signature::default()
            },
        };
        assert_eq!(
            method.object("pack", Qualifier::Full).to_string(),
            "func (*pack.T2).WhatPointer(_ *int, _ []int)"
        );
        assert_eq!(
            method.object("pack", Qualifier::Strip("pack")).to_string(),
            "func (*T2).WhatPointer(_ *int, _ []int)"
        );
    }

    #[test]
    fn stripped_signatures_ignore_package_name() {
        let old = Package::new("v1").with(Declaration::new(
            "F",
            DeclKind::Func(Signature {
                params: vec![Param::unnamed(named("v1", "T"))],
                ..Signature::default()
            }),
        ));
        let new = Package::new("v2").with(Declaration::new(
            "F",
            DeclKind::Func(Signature {
                params: vec![Param::unnamed(named("v2", "T"))],
                ..Signature::default()
            }),
        ));

        let before = old.lookup("F").unwrap();
        let after = new.lookup("F").unwrap();
        assert_eq!(old.signature(before), "func(T)");
        assert_eq!(old.signature(before), new.signature(after));
    }

    #[test]
    fn untyped_kinds_widen() {
        assert_eq!(
            UntypedKind::Int.combine(UntypedKind::Float),
            UntypedKind::Float
        );
        assert_eq!(
            UntypedKind::Complex.combine(UntypedKind::Rune),
            UntypedKind::Complex
        );
        assert_eq!(
            UntypedKind::String.combine(UntypedKind::Int),
            UntypedKind::String
        );
    }

    #[test]
    fn exported_names() {
        assert!(is_exported("Name"));
        assert!(is_exported("Ärger"));
        assert!(!is_exported("name"));
        assert!(!is_exported("_Name"));
        assert!(!is_exported(""));
    }

    #[test]
    fn exported_iteration_is_sorted_and_filtered() {
        let package = Package::new("p")
            .with(Declaration::new("b", DeclKind::Var(basic("int"))))
            .with(Declaration::new("Z", DeclKind::Var(basic("int"))))
            .with(Declaration::new("A", DeclKind::Var(basic("int"))));
        let names: Vec<_> = package.exported().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Z"]);
    }
}
