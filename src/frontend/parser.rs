//! Declaration-level view of Go source files.
//!
//! Files are parsed with tree-sitter's Go grammar and the syntax tree is
//! reduced to what the API surface needs: the package clause, imports (for
//! qualifier names), top-level `const`/`var`/`type`/`func` declarations with
//! full type syntax, and initializer expressions reduced to the operands
//! that decide their type. A declaration containing a syntax error is
//! recorded in [`SourceFile::errors`] and skipped.

use std::collections::HashMap;

use error_set::error_set;
use tree_sitter::{LanguageError, Node, Parser};

use crate::types::{ChanDir, Field, Interface, Method, Param, Signature, Type, UntypedKind};

error_set! {
    /// Errors from reading a Go syntax tree
    SyntaxError := {
        #[display("{message}")]
        Unexpected { line: usize, message: String },
    }
}

impl SyntaxError {
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::Unexpected { line, .. } => *line,
        }
    }
}

type PResult<T> = Result<T, SyntaxError>;

const COMPARISON_OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">=", "&&", "||"];

/// Operand of an initializer expression, reduced to what decides its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(UntypedKind),
    /// Reference to another declaration
    Ident(String),
    /// Composite literal, conversion, `make`, `new` or function literal
    Typed(Type),
    /// Call of an unqualified name (function or conversion)
    Call(String),
    Group(Box<Expr>),
    /// Anything whose type cannot be read off the syntax
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub operands: Vec<Operand>,
    /// Contains a comparison or logical operator
    pub boolean: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<Type>,
    pub values: Vec<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub alias: bool,
    pub ty: Type,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
    /// Receiver type carries type parameters
    pub generic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<Receiver>,
    pub signature: Signature,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Const(ValueSpec),
    Var(ValueSpec),
    Type(TypeSpec),
    Func(FuncDecl),
    /// Declaration recognised but not modelled (generics, type sets)
    Untreated {
        name: String,
        line: usize,
        reason: String,
    },
}

/// Parsed file: package name, declarations and recovered syntax errors.
#[derive(Debug)]
pub struct SourceFile {
    pub package: String,
    /// Expression of a `//go:build` line ahead of the package clause
    pub build_constraint: Option<String>,
    pub decls: Vec<Decl>,
    pub errors: Vec<SyntaxError>,
}

/// Go parser, reused for every file of a package.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, LanguageError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Parse one file.
    ///
    /// Fails only when the package clause is missing; every later error is
    /// collected into [`SourceFile::errors`].
    pub fn parse_file(&mut self, source: &str) -> PResult<SourceFile> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SyntaxError::Unexpected {
                line: 1,
                message: "parser returned no syntax tree".to_string(),
            })?;

        Extractor {
            source,
            package: String::new(),
            imports: HashMap::new(),
        }
        .file(tree.root_node())
    }
}

/// Name a package is referred to by when imported from `path`.
pub fn import_name(path: &str) -> String {
    let is_version = |segment: &str| {
        segment
            .strip_prefix('v')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    };

    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let name = if is_version(last) {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    let name = match name.rsplit_once('.') {
        Some((base, version)) if is_version(version) => base,
        _ => name,
    };
    let name = name.strip_prefix("go-").unwrap_or(name);
    let name = name.strip_suffix("-go").unwrap_or(name);
    name.replace(['-', '.'], "_")
}

/// Walks one syntax tree into [`Decl`]s.
struct Extractor<'s> {
    source: &'s str,
    package: String,
    /// Local import name to package name
    imports: HashMap<String, String>,
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn file(mut self, root: Node<'_>) -> PResult<SourceFile> {
        let mut cursor = root.walk();
        let top: Vec<Node<'_>> = root.named_children(&mut cursor).collect();

        let Some(clause) = top.iter().copied().find(|node| node.kind() == "package_clause") else {
            return Err(SyntaxError::Unexpected {
                line: 1,
                message: "missing package clause".to_string(),
            });
        };
        if clause.has_error() {
            return Err(self.syntax_error(clause));
        }
        self.package = self.text(first_named(clause)?).to_string();

        let build_constraint = top
            .iter()
            .take_while(|node| node.kind() != "package_clause")
            .filter(|node| node.kind() == "comment")
            .find_map(|node| build_expression(self.text(*node)));

        let mut file = SourceFile {
            package: self.package.clone(),
            build_constraint,
            decls: Vec::new(),
            errors: Vec::new(),
        };

        for node in top.iter().filter(|node| node.kind() == "import_declaration") {
            if let Err(error) = self.imports(*node) {
                file.errors.push(error);
            }
        }

        for node in top {
            let result = match node.kind() {
                "comment" | "package_clause" | "import_declaration" => Ok(()),
                _ if node.has_error() => Err(self.syntax_error(node)),
                "const_declaration" => self.value_decl(node, true, &mut file.decls),
                "var_declaration" => self.value_decl(node, false, &mut file.decls),
                "type_declaration" => self.type_decl(node, &mut file.decls),
                "function_declaration" | "method_declaration" => {
                    self.func_decl(node).map(|decl| file.decls.push(decl))
                }
                _ => Err(unexpected(node, "non-declaration statement outside function body")),
            };
            if let Err(error) = result {
                file.errors.push(error);
            }
        }

        Ok(file)
    }

    /// Error naming the first broken or missing node under `node`.
    fn syntax_error(&self, node: Node<'_>) -> SyntaxError {
        let culprit = first_error(node);
        let message = if culprit.is_missing() {
            format!("syntax error: missing {}", culprit.kind())
        } else {
            match self.text(culprit).lines().next().map(str::trim) {
                Some(found) if !found.is_empty() => format!("syntax error: unexpected {found}"),
                _ => "syntax error".to_string(),
            }
        };
        SyntaxError::Unexpected {
            line: line(culprit),
            message,
        }
    }

    // ==================================================================
    // Declarations
    // ==================================================================

    fn imports(&mut self, declaration: Node<'_>) -> PResult<()> {
        if declaration.has_error() {
            return Err(self.syntax_error(declaration));
        }
        for spec in specs(declaration, "import_spec") {
            let path = string_value(self.text(child(spec, "path")?));
            match spec.child_by_field_name("name").map(|name| self.text(name)) {
                Some("_" | ".") | None => {}
                Some(local) => {
                    self.imports.insert(local.to_string(), import_name(&path));
                }
            }
        }
        Ok(())
    }

    fn value_decl(&self, declaration: Node<'_>, constant: bool, decls: &mut Vec<Decl>) -> PResult<()> {
        let (kind, wrap): (&str, fn(ValueSpec) -> Decl) = if constant {
            ("const_spec", Decl::Const)
        } else {
            ("var_spec", Decl::Var)
        };

        let mut previous: Option<(Option<Type>, Vec<Expr>)> = None;
        for spec in specs(declaration, kind) {
            let line = line(spec);
            let names: Vec<String> = field_nodes(spec, "name")
                .into_iter()
                .map(|name| self.text(name).to_string())
                .collect();
            let ty = spec
                .child_by_field_name("type")
                .map(|ty| self.parse_type(ty))
                .transpose()?;
            let values = match spec.child_by_field_name("value") {
                Some(list) => named(list)
                    .into_iter()
                    .map(|value| self.expr(value))
                    .collect::<PResult<Vec<_>>>()?,
                None => Vec::new(),
            };

            // A bare const line repeats the previous line of its group.
            let (ty, values) = if ty.is_some() || !values.is_empty() {
                (ty, values)
            } else if let Some(repeated) = previous.clone().filter(|_| constant) {
                repeated
            } else {
                return Err(SyntaxError::Unexpected {
                    line,
                    message: format!("missing type or init expr for {}", names.join(", ")),
                });
            };
            if constant {
                previous = Some((ty.clone(), values.clone()));
            }

            decls.push(wrap(ValueSpec {
                names,
                ty,
                values,
                line,
            }));
        }
        Ok(())
    }

    fn type_decl(&self, declaration: Node<'_>, decls: &mut Vec<Decl>) -> PResult<()> {
        for spec in named(declaration) {
            decls.push(self.type_spec(spec)?);
        }
        Ok(())
    }

    fn type_spec(&self, spec: Node<'_>) -> PResult<Decl> {
        let line = line(spec);
        let name = self.text(child(spec, "name")?).to_string();
        let ty = child(spec, "type")?;

        let reason = if spec.child_by_field_name("type_parameters").is_some() {
            Some("generic type")
        } else if contains_type_set(ty) {
            Some("type constraint")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Ok(Decl::Untreated {
                name,
                line,
                reason: reason.to_string(),
            });
        }

        Ok(Decl::Type(TypeSpec {
            name,
            alias: spec.kind() == "type_alias",
            ty: self.parse_type(ty)?,
            line,
        }))
    }

    fn func_decl(&self, node: Node<'_>) -> PResult<Decl> {
        let line = line(node);
        let name = self.text(child(node, "name")?).to_string();
        if node.child_by_field_name("type_parameters").is_some() {
            return Ok(Decl::Untreated {
                name,
                line,
                reason: "generic function".to_string(),
            });
        }

        let receiver = match node.child_by_field_name("receiver") {
            Some(list) => Some(self.receiver(list)?),
            None => None,
        };
        Ok(Decl::Func(FuncDecl {
            name,
            receiver,
            signature: self.signature(node)?,
            line,
        }))
    }

    fn receiver(&self, list: Node<'_>) -> PResult<Receiver> {
        let mut ty = child(first_named(list)?, "type")?;
        while ty.kind() == "parenthesized_type" {
            ty = first_named(ty)?;
        }
        let pointer = ty.kind() == "pointer_type";
        if pointer {
            ty = first_named(ty)?;
        }
        let generic = ty.kind() == "generic_type";
        if generic {
            ty = child(ty, "type")?;
        }

        Ok(Receiver {
            type_name: self.text(ty).to_string(),
            pointer,
            generic,
        })
    }

    // ==================================================================
    // Types
    // ==================================================================

    fn parse_type(&self, node: Node<'_>) -> PResult<Type> {
        let boxed = |node: Node<'_>| self.parse_type(node).map(Box::new);

        Ok(match node.kind() {
            "type_identifier" | "identifier" => Type::from_ident(&self.package, self.text(node)),
            "qualified_type" => self.qualified(child(node, "package")?, child(node, "name")?),
            "selector_expression" => self.qualified(child(node, "operand")?, child(node, "field")?),
            "generic_type" => {
                let arguments = collapse(self.text(child(node, "type_arguments")?));
                match self.parse_type(child(node, "type")?)? {
                    Type::Named { package, name } => Type::Named {
                        package,
                        name: format!("{name}{arguments}"),
                    },
                    other => other,
                }
            }
            "parenthesized_type" => self.parse_type(first_named(node)?)?,
            "pointer_type" => Type::Pointer(boxed(first_named(node)?)?),
            "slice_type" => Type::Slice(boxed(child(node, "element")?)?),
            "array_type" => Type::Array {
                len: collapse(self.text(child(node, "length")?)),
                elem: boxed(child(node, "element")?)?,
            },
            "implicit_length_array_type" => Type::Array {
                len: "...".to_string(),
                elem: boxed(child(node, "element")?)?,
            },
            "map_type" => Type::Map {
                key: boxed(child(node, "key")?)?,
                value: boxed(child(node, "value")?)?,
            },
            "channel_type" => {
                let tokens: Vec<&str> = children(node)
                    .into_iter()
                    .filter(|token| !token.is_named())
                    .map(|token| token.kind())
                    .collect();
                let dir = match tokens.as_slice() {
                    ["<-", ..] => ChanDir::Recv,
                    [_, "<-", ..] => ChanDir::Send,
                    _ => ChanDir::Both,
                };
                Type::Chan {
                    dir,
                    elem: boxed(child(node, "value")?)?,
                }
            }
            "function_type" => Type::Func(self.signature(node)?),
            "struct_type" => Type::Struct(self.struct_fields(node)?),
            "interface_type" => Type::Interface(self.interface(node)?),
            other => return Err(unexpected(node, format!("expected type, found {other}"))),
        })
    }

    fn qualified(&self, package: Node<'_>, name: Node<'_>) -> Type {
        let local = self.text(package);
        Type::Named {
            package: Some(self.imports.get(local).map_or(local, String::as_str).to_string()),
            name: self.text(name).to_string(),
        }
    }

    fn struct_fields(&self, node: Node<'_>) -> PResult<Vec<Field>> {
        let mut fields = Vec::new();
        for declaration in named(first_named(node)?) {
            let ty = self.parse_type(child(declaration, "type")?)?;
            let tag = declaration
                .child_by_field_name("tag")
                .map(|tag| string_value(self.text(tag)));

            let names = field_nodes(declaration, "name");
            if names.is_empty() {
                let name = ty
                    .type_name()
                    .and_then(|name| name.split('[').next())
                    .unwrap_or_default()
                    .to_string();
                let pointer = children(declaration).iter().any(|token| token.kind() == "*");
                fields.push(Field {
                    name,
                    ty: if pointer { Type::Pointer(Box::new(ty)) } else { ty },
                    embedded: true,
                    tag,
                });
                continue;
            }

            for name in names {
                fields.push(Field {
                    name: self.text(name).to_string(),
                    ty: ty.clone(),
                    embedded: false,
                    tag: tag.clone(),
                });
            }
        }
        Ok(fields)
    }

    fn interface(&self, node: Node<'_>) -> PResult<Interface> {
        let mut interface = Interface::default();
        for element in named(node) {
            match element.kind() {
                "method_elem" | "method_spec" => interface.methods.push(Method {
                    name: self.text(child(element, "name")?).to_string(),
                    signature: self.signature(element)?,
                }),
                // Type sets only occur in constraints, which are untreated.
                "type_elem" | "constraint_elem" => {
                    let terms = named(element);
                    if let [embedded] = terms.as_slice()
                        && is_embeddable(*embedded)
                    {
                        interface.embeddeds.push(self.parse_type(*embedded)?);
                    }
                }
                other => return Err(unexpected(element, format!("unexpected {other} in interface"))),
            }
        }
        Ok(interface)
    }

    /// Signature of a node with `parameters` and optional `result` fields.
    fn signature(&self, node: Node<'_>) -> PResult<Signature> {
        let (params, variadic) = self.parameters(child(node, "parameters")?)?;
        let results = match node.child_by_field_name("result") {
            None => Vec::new(),
            Some(list) if list.kind() == "parameter_list" => self.parameters(list)?.0,
            Some(result) => vec![Param::unnamed(self.parse_type(result)?)],
        };
        Ok(Signature {
            params,
            results,
            variadic,
        })
    }

    fn parameters(&self, list: Node<'_>) -> PResult<(Vec<Param>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        let (mut named_seen, mut unnamed_seen) = (false, false);

        for declaration in named(list) {
            let ty = self.parse_type(child(declaration, "type")?)?;
            variadic = declaration.kind() == "variadic_parameter_declaration";

            let names = field_nodes(declaration, "name");
            if names.is_empty() {
                unnamed_seen = true;
                params.push(Param::unnamed(ty));
                continue;
            }
            named_seen = true;
            for name in names {
                params.push(Param {
                    name: Some(self.text(name).to_string()),
                    ty: ty.clone(),
                });
            }
        }

        if named_seen && unnamed_seen {
            return Err(unexpected(list, "mixed named and unnamed parameters"));
        }
        Ok((params, variadic))
    }

    // ==================================================================
    // Initializer expressions
    // ==================================================================

    fn expr(&self, node: Node<'_>) -> PResult<Expr> {
        let mut expr = Expr {
            operands: Vec::new(),
            boolean: false,
        };
        self.collect_operands(node, &mut expr)?;
        Ok(expr)
    }

    fn collect_operands(&self, node: Node<'_>, expr: &mut Expr) -> PResult<()> {
        match node.kind() {
            "binary_expression" => {
                let operator = self.text(child(node, "operator")?);
                if COMPARISON_OPS.contains(&operator) {
                    expr.boolean = true;
                }
                self.collect_operands(child(node, "left")?, expr)?;
                // A shift has the type of its left operand.
                if !matches!(operator, "<<" | ">>") {
                    self.collect_operands(child(node, "right")?, expr)?;
                }
            }
            "unary_expression" => {
                let operand = child(node, "operand")?;
                match self.text(child(node, "operator")?) {
                    "!" => {
                        expr.boolean = true;
                        self.collect_operands(operand, expr)?;
                    }
                    "&" => expr.operands.push(match self.operand(operand)? {
                        Operand::Typed(ty) => Operand::Typed(Type::Pointer(Box::new(ty))),
                        _ => Operand::Opaque,
                    }),
                    "*" | "<-" => expr.operands.push(Operand::Opaque),
                    _ => self.collect_operands(operand, expr)?,
                }
            }
            _ => expr.operands.push(self.operand(node)?),
        }
        Ok(())
    }

    fn operand(&self, node: Node<'_>) -> PResult<Operand> {
        Ok(match node.kind() {
            "int_literal" | "iota" => Operand::Literal(UntypedKind::Int),
            "float_literal" => Operand::Literal(UntypedKind::Float),
            "imaginary_literal" => Operand::Literal(UntypedKind::Complex),
            "rune_literal" => Operand::Literal(UntypedKind::Rune),
            "interpreted_string_literal" | "raw_string_literal" => Operand::Literal(UntypedKind::String),
            "true" | "false" => Operand::Literal(UntypedKind::Bool),
            "nil" => Operand::Literal(UntypedKind::Nil),
            "identifier" => Operand::Ident(self.text(node).to_string()),
            "parenthesized_expression" => Operand::Group(Box::new(self.expr(first_named(node)?)?)),
            "composite_literal" | "type_conversion_expression" => {
                Operand::Typed(self.parse_type(child(node, "type")?)?)
            }
            "func_literal" => Operand::Typed(Type::Func(self.signature(node)?)),
            "call_expression" => self.call(node)?,
            _ => Operand::Opaque,
        })
    }

    fn call(&self, node: Node<'_>) -> PResult<Operand> {
        let function = child(node, "function")?;
        if function.kind() != "identifier" {
            return Ok(Operand::Opaque);
        }

        let name = self.text(function);
        if matches!(name, "make" | "new")
            && let Some(first) = named(child(node, "arguments")?).into_iter().next()
        {
            return Ok(match self.parse_type(first) {
                Ok(ty) if name == "new" => Operand::Typed(Type::Pointer(Box::new(ty))),
                Ok(ty) => Operand::Typed(ty),
                Err(_) => Operand::Opaque,
            });
        }
        Ok(Operand::Call(name.to_string()))
    }
}

// ==================================================================
// Tree helpers
// ==================================================================

fn line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn unexpected(node: Node<'_>, message: impl Into<String>) -> SyntaxError {
    SyntaxError::Unexpected {
        line: line(node),
        message: message.into(),
    }
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children without comments.
fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn first_named<'t>(node: Node<'t>) -> PResult<Node<'t>> {
    named(node)
        .into_iter()
        .next()
        .ok_or_else(|| unexpected(node, format!("empty {}", node.kind())))
}

fn child<'t>(node: Node<'t>, field: &str) -> PResult<Node<'t>> {
    node.child_by_field_name(field)
        .ok_or_else(|| unexpected(node, format!("{} without {field}", node.kind())))
}

fn field_nodes<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Specs of a declaration, looking through parenthesised `_list` groups.
fn specs<'t>(declaration: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    named(declaration)
        .into_iter()
        .flat_map(|child| {
            if child.kind() == kind {
                vec![child]
            } else {
                named(child)
            }
        })
        .filter(|child| child.kind() == kind)
        .collect()
}

fn first_error<'t>(node: Node<'t>) -> Node<'t> {
    if node.is_error() || node.is_missing() {
        return node;
    }
    let mut cursor = node.walk();
    let culprit = node
        .children(&mut cursor)
        .find(|child| child.has_error() || child.is_missing());
    culprit.map_or(node, first_error)
}

fn is_embeddable(node: Node<'_>) -> bool {
    matches!(node.kind(), "type_identifier" | "qualified_type" | "generic_type")
}

/// Whether an interface under `node` lists a type set (`~T`, `A | B`).
fn contains_type_set(node: Node<'_>) -> bool {
    let terms = named(node);
    match node.kind() {
        "negated_type" => true,
        "type_elem" | "constraint_elem" if !matches!(terms.as_slice(), [single] if is_embeddable(*single)) => {
            true
        }
        _ => terms.into_iter().any(contains_type_set),
    }
}

fn build_expression(comment: &str) -> Option<String> {
    let expr = comment.strip_prefix("//go:build")?;
    (expr.is_empty() || expr.starts_with([' ', '\t'])).then(|| expr.trim().to_string())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Value of an interpreted or raw string literal.
fn string_value(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')) {
        return raw.replace('\r', "");
    }
    let quoted = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(literal);
    unescape(quoted)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(escaped @ ('\\' | '"' | '\'')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
