//! Report sink and line rendering.

use std::fmt;
use std::io::{self, Write};

use crate::types::{AttachedMethod, DeclKind, Declaration, Field, Method, Package, Type, WriteQualified};

/// Longest type line printed before its body is elided.
pub const MAX_LINE_WIDTH: usize = 115;

/// Replacement for an elided body.
pub const ELISION: &str = "....";

/// Marks an entry as present only in the new or only in the old package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Added,
    Removed,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Marker::Added => "+",
            Marker::Removed => "-",
        })
    }
}

/// Destination for report lines.
pub trait Report {
    fn line(&mut self, line: &str);
}

impl Report for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes each line to `W`, remembering the first I/O failure.
pub struct WriteReport<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriteReport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Flush the writer and return the first error seen while reporting.
    pub fn finish(mut self) -> io::Result<()> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.writer.flush()
    }
}

impl<W: Write> Report for WriteReport<W> {
    fn line(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = writeln!(self.writer, "{line}") {
            self.error = Some(error);
        }
    }
}

/// Render one declaration as a report line.
///
/// Qualification by `package` is always stripped. Named types longer than
/// [`MAX_LINE_WIDTH`] have their body elided.
pub fn render(declaration: &Declaration, package: &Package, marker: Marker, indent: &str) -> String {
    let object = || {
        declaration
            .object(package.name(), package.qualifier())
            .to_string()
    };

    let text = match &declaration.kind {
        DeclKind::Var(_) | DeclKind::Const(_) => object().replace("untyped ", ""),
        DeclKind::Func(_) => object(),
        DeclKind::Type(_) => bound_type_text(object()),
        DeclKind::Untreated(_) => format!("Untreated{}", declaration.name),
    };

    format!("{indent}{marker}{text}")
}

/// `\t+Name Type` entry of a struct block.
pub fn render_field(field: &Field, package: &Package, marker: Marker) -> String {
    format!("\t{marker}{}", field.qualified(package.qualifier()))
}

/// `\t+func Name(sig)` entry of an interface block.
pub fn render_contract_method(method: &Method, package: &Package, marker: Marker) -> String {
    format!("\t{marker}func {}", method.qualified(package.qualifier()))
}

/// `\t+func (*T).Name(sig)` entry of a method listing.
pub fn render_attached_method(method: &AttachedMethod, package: &Package, marker: Marker) -> String {
    format!(
        "\t{marker}{}",
        method.object(package.name(), package.qualifier())
    )
}

/// Entry for an embedded interface of a contract block.
///
/// Embeds declared in `package` render as their full declaration, anything
/// else as `type pkg.Name`.
pub fn render_embedded(embedded: &Type, package: &Package, marker: Marker) -> String {
    if let Type::Named {
        package: Some(owner),
        name,
    } = embedded
        && owner == package.name()
        && let Some(declaration) = package.lookup(name)
    {
        return render(declaration, package, marker, "\t");
    }

    format!(
        "\t{marker}type {}",
        embedded.qualified(package.qualifier())
    )
}

fn bound_type_text(text: String) -> String {
    let text = if text.len() > MAX_LINE_WIDTH {
        match (text.find('{'), text.rfind('}')) {
            (Some(open), Some(close)) if open < close => {
                format!("{}{ELISION}{}", &text[..=open], &text[close..])
            }
            _ => text.replacen("{}", "{....}", 1),
        }
    } else {
        text
    };

    text.replacen('{', " {", 1).replace("\\\"", "")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Interface, NamedType, Param, Signature, UntypedKind};
    use similar_asserts::assert_eq;

    fn field(name: &str, ty: Type) -> Field {
        Field {
            name: name.to_string(),
            ty,
            embedded: false,
            tag: None,
        }
    }

    fn basic(name: &str) -> Type {
        Type::Basic(name.to_string())
    }

    fn struct_decl(name: &str, fields: Vec<Field>) -> Declaration {
        Declaration::new(name, DeclKind::Type(NamedType::new(Type::Struct(fields))))
    }

    #[test]
    fn values_drop_untyped_marker() {
        let package = Package::new("pack");
        let constant = Declaration::new("N", DeclKind::Const(Type::Untyped(UntypedKind::Int)));
        let var = Declaration::new(
            "Me",
            DeclKind::Var(Type::Named {
                package: Some("io".into()),
                name: "Writer".into(),
            }),
        );

        assert_eq!(render(&constant, &package, Marker::Added, ""), "+const N int");
        assert_eq!(
            render(&var, &package, Marker::Removed, ""),
            "-var Me io.Writer"
        );
    }

    #[test]
    fn functions_strip_local_qualification() {
        let package = Package::new("pack");
        let func = Declaration::new(
            "K",
            DeclKind::Func(Signature {
                params: vec![Param::unnamed(Type::Named {
                    package: Some("pack".into()),
                    name: "T1".into(),
                })],
                results: vec![Param::unnamed(basic("string"))],
                variadic: false,
            }),
        );

        assert_eq!(
            render(&func, &package, Marker::Added, ""),
            "+func K(T1) string"
        );
    }

    #[test]
    fn short_types_get_a_space_before_the_body() {
        let package = Package::new("pack");
        let decl = struct_decl(
            "T1",
            vec![field("A", basic("int")), field("G", basic("string"))],
        );
        assert_eq!(
            render(&decl, &package, Marker::Added, ""),
            "+type T1 struct {A int; G string}"
        );
    }

    #[test]
    fn empty_interface_renders_as_is() {
        let package = Package::new("pack");
        let decl = Declaration::new(
            "Empty",
            DeclKind::Type(NamedType::new(Type::Interface(Interface::default()))),
        );
        assert_eq!(
            render(&decl, &package, Marker::Removed, "\t"),
            "\t-type Empty interface {}"
        );
    }

    #[test]
    fn long_types_are_elided() {
        let package = Package::new("pack");
        let fields = (0..20)
            .map(|i| field(&format!("Field{i}"), basic("string")))
            .collect();
        let decl = struct_decl("Wide", fields);

        insta::assert_snapshot!(
            render(&decl, &package, Marker::Removed, ""),
            @"-type Wide struct {....}"
        );
    }

    #[test]
    fn escaped_quotes_are_removed() {
        let package = Package::new("pack");
        let decl = struct_decl(
            "Tagged",
            vec![Field {
                tag: Some("json:\"a\"".into()),
                ..field("A", basic("int"))
            }],
        );
        assert_eq!(
            render(&decl, &package, Marker::Added, ""),
            "+type Tagged struct {A int \"json:a\"}"
        );
    }

    #[test]
    fn untreated_placeholder() {
        let package = Package::new("pack");
        let decl = Declaration::new("Map", DeclKind::Untreated("generic function".into()));
        assert_eq!(render(&decl, &package, Marker::Added, ""), "+UntreatedMap");
    }

    #[test]
    fn embedded_from_same_package_renders_declaration() {
        let package = Package::new("pack").with(Declaration::new(
            "I0",
            DeclKind::Type(NamedType::new(Type::Interface(Interface {
                methods: vec![Method {
                    name: "M".into(),
                    signature: Signature {
                        results: vec![Param::unnamed(basic("int"))],
                        ..Signature::default()
                    },
                }],
                embeddeds: Vec::new(),
            }))),
        ));

        let local = Type::Named {
            package: Some("pack".into()),
            name: "I0".into(),
        };
        let foreign = Type::Named {
            package: Some("io".into()),
            name: "Reader".into(),
        };

        assert_eq!(
            render_embedded(&local, &package, Marker::Added),
            "\t+type I0 interface {M() int}"
        );
        assert_eq!(
            render_embedded(&foreign, &package, Marker::Removed),
            "\t-type io.Reader"
        );
    }

    #[test]
    fn write_report_writes_lines() {
        let mut buffer = Vec::new();
        let mut report = WriteReport::new(&mut buffer);
        report.line("+var A int");
        report.line("-var B int");
        report.finish().unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "+var A int\n-var B int\n");
    }

    #[test]
    fn write_report_keeps_first_error() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut report = WriteReport::new(Broken);
        report.line("+var A int");
        report.line("+var B int");
        let error = report.finish().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }
}
