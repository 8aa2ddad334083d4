use crate::project::{ClassDecl, Declaration, FunctionDecl, ParamDecl, SourceFile};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Turns the declaration tree of a file into python source.
pub struct Formatter {
    line_width: usize,
}

impl Formatter {
    pub fn new() -> Self {
        Formatter { line_width: 88 }
    }

    pub fn format(&self, file: &SourceFile) -> Result<String, std::fmt::Error> {
        let mut out = String::with_capacity(4 * 1024);

        let mut previous: Option<&Declaration> = None;
        for declaration in &file.declarations {
            if let Some(prev) = previous {
                let spacing = if is_block(prev) || is_block(declaration) {
                    "\n\n"
                } else {
                    "\n"
                };
                out.push_str(spacing);
            }

            self.write_declaration(&mut out, declaration, 0)?;
            previous = Some(declaration);
        }

        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }

        Ok(out)
    }

    fn write_declaration(
        &self,
        out: &mut String,
        declaration: &Declaration,
        depth: usize,
    ) -> std::fmt::Result {
        match declaration {
            Declaration::Raw(code) => {
                for line in code.trim_end().lines() {
                    write_line(out, depth, line)?;
                }
                Ok(())
            }
            Declaration::Class(class) => self.write_class(out, class, depth),
            Declaration::Function(function) => self.write_function(out, function, depth),
        }
    }

    fn write_class(&self, out: &mut String, class: &ClassDecl, depth: usize) -> std::fmt::Result {
        if class.bases.is_empty() {
            write_line(out, depth, &format!("class {}:", class.name))?;
        } else {
            write_line(
                out,
                depth,
                &format!("class {}({}):", class.name, class.bases.join(", ")),
            )?;
        }

        if let Some(doc) = &class.docstring {
            write_line(out, depth + 1, &format!("\"\"\"{}\"\"\"", doc.replace("\"\"\"", "'''")))?;
        }

        if class.body.is_empty() {
            if class.docstring.is_none() {
                write_line(out, depth + 1, "pass")?;
            }
            return Ok(());
        }

        if class.docstring.is_some() {
            out.push('\n');
        }

        for (index, member) in class.body.iter().enumerate() {
            if index > 0 && (is_block(member) || is_block(&class.body[index - 1])) {
                out.push('\n');
            }
            self.write_declaration(out, member, depth + 1)?;
        }

        Ok(())
    }

    fn write_function(
        &self,
        out: &mut String,
        function: &FunctionDecl,
        depth: usize,
    ) -> std::fmt::Result {
        for decorator in &function.decorators {
            write_line(out, depth, &format!("@{}", decorator))?;
        }

        let prefix = if function.is_async { "async def" } else { "def" };
        let returns = function
            .returns
            .as_ref()
            .map(|r| format!(" -> {}", r))
            .unwrap_or_default();

        let params = function.params.iter().map(render_param).collect::<Vec<_>>();
        let single = format!(
            "{} {}({}){}:",
            prefix,
            function.name,
            params.join(", "),
            returns
        );

        if single.len() + depth * INDENT.len() <= self.line_width {
            write_line(out, depth, &single)?;
        } else {
            write_line(out, depth, &format!("{} {}(", prefix, function.name))?;
            for param in &params {
                write_line(out, depth + 1, &format!("{},", param))?;
            }
            write_line(out, depth, &format!("){}:", returns))?;
        }

        if function.body.is_empty() {
            return write_line(out, depth + 1, "pass");
        }

        for line in &function.body {
            write_line(out, depth + 1, line)?;
        }

        Ok(())
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_block(declaration: &Declaration) -> bool {
    !matches!(declaration, Declaration::Raw(_))
}

fn render_param(param: &ParamDecl) -> String {
    match (&param.annotation, &param.default) {
        (Some(a), Some(d)) => format!("{}: {} = {}", param.name, a, d),
        (Some(a), None) => format!("{}: {}", param.name, a),
        (None, Some(d)) => format!("{}={}", param.name, d),
        (None, None) => param.name.clone(),
    }
}

fn write_line(out: &mut String, depth: usize, line: &str) -> std::fmt::Result {
    if line.is_empty() {
        out.push('\n');
        return Ok(());
    }

    writeln!(out, "{}{}", INDENT.repeat(depth), line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ParamDecl;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_classes_and_methods() {
        let mut file = SourceFile::new("x.py");
        file.push(Declaration::Raw("from typing import Optional".to_owned()));
        file.push(Declaration::Class(ClassDecl {
            name: "Users".to_owned(),
            bases: vec![],
            docstring: None,
            body: vec![
                Declaration::Function(FunctionDecl {
                    name: "__init__".to_owned(),
                    params: vec![
                        ParamDecl::new("self"),
                        ParamDecl::annotated("client", "Transport"),
                    ],
                    returns: Some("None".to_owned()),
                    body: vec!["self.client = client".to_owned()],
                    ..Default::default()
                }),
                Declaration::Function(FunctionDecl {
                    name: "get".to_owned(),
                    is_async: true,
                    decorators: vec!["operation(\"GET\", \"/users\")".to_owned()],
                    params: vec![
                        ParamDecl::new("self"),
                        ParamDecl::annotated("limit_query", "Optional[int]").with_default("NOT_SET"),
                    ],
                    returns: Some("Any".to_owned()),
                    body: vec![],
                }),
            ],
        }));

        let text = Formatter::new().format(&file).unwrap();
        assert_eq!(
            text,
            indoc! {r#"
                from typing import Optional


                class Users:
                    def __init__(self, client: Transport) -> None:
                        self.client = client

                    @operation("GET", "/users")
                    async def get(self, limit_query: Optional[int] = NOT_SET) -> Any:
                        pass
            "#}
        );
    }

    #[test]
    fn long_signatures_are_wrapped() {
        let mut file = SourceFile::new("x.py");
        file.push(Declaration::Function(FunctionDecl {
            name: "create_something_with_a_long_name".to_owned(),
            params: (0..6)
                .map(|i| ParamDecl::annotated(format!("parameter_{}", i), "Optional[str]"))
                .collect(),
            returns: Some("None".to_owned()),
            body: vec!["return None".to_owned()],
            ..Default::default()
        }));

        let text = Formatter::new().format(&file).unwrap();
        assert!(text.starts_with("def create_something_with_a_long_name(\n    parameter_0: Optional[str],\n"));
        assert!(text.contains("\n) -> None:\n    return None\n"));
    }

    #[test]
    fn empty_classes_get_pass() {
        let mut file = SourceFile::new("x.py");
        file.push(Declaration::Class(ClassDecl {
            name: "Empty".to_owned(),
            bases: vec!["BaseModel".to_owned()],
            ..Default::default()
        }));

        assert_eq!(
            Formatter::new().format(&file).unwrap(),
            "class Empty(BaseModel):\n    pass\n"
        );
    }
}
