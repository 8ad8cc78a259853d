use std::fmt::{Display, Formatter, Result, Write};

use super::{Body, ClassDef, MethodDef, Stmt, Type};

const MEMBER_INDENT: &str = "    ";
const STMT_INDENT: &str = "        ";
const LABEL_INDENT: &str = "     ";

impl Display for ClassDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !self.modifiers.is_empty() {
            write!(f, "{} ", self.modifiers)?;
        }
        let kw = if self.is_interface { "interface" } else { "class" };
        write!(f, "{} {}", kw, self.name)?;
        if let Some(sup) = &self.superclass {
            write!(f, " extends {}", sup)?;
        }
        if !self.interfaces.is_empty() {
            f.write_str(" implements ")?;
            write_list(f, self.interfaces.iter())?;
        }
        f.write_str("\n{\n")?;

        for field in self.fields.iter() {
            f.write_str(MEMBER_INDENT)?;
            if !field.modifiers.is_empty() {
                write!(f, "{} ", field.modifiers)?;
            }
            writeln!(f, "{} {};", field.ty, field.name)?;
        }
        if !self.fields.is_empty() && !self.methods.is_empty() {
            f.write_char('\n')?;
        }

        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write_method(f, method)?;
        }
        f.write_str("}\n")
    }
}

fn write_list<T: Display, I: Iterator<Item = T>>(f: &mut Formatter<'_>, items: I) -> Result {
    for (i, it) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", it)?;
    }
    Ok(())
}

fn write_method(f: &mut Formatter<'_>, method: &MethodDef) -> Result {
    f.write_str(MEMBER_INDENT)?;
    if !method.modifiers.is_empty() {
        write!(f, "{} ", method.modifiers)?;
    }
    write!(f, "{} {}(", method.sig.ret, method.sig.name)?;
    write_list(f, method.sig.params.iter())?;
    f.write_char(')')?;
    if !method.throws.is_empty() {
        f.write_str(" throws ")?;
        write_list(f, method.throws.iter())?;
    }
    match &method.body {
        Some(body) => write!(f, "\n{}", body),
        None => f.write_str(";\n"),
    }
}

/// Locals grouped by type, in order of first declaration
fn grouped_locals(body: &Body) -> Vec<(&Type, Vec<&str>)> {
    let mut groups: Vec<(&Type, Vec<&str>)> = Vec::new();
    for local in body.locals() {
        match groups.iter_mut().find(|(ty, _)| *ty == &local.ty) {
            Some((_, names)) => names.push(local.name.as_str()),
            None => groups.push((&local.ty, vec![local.name.as_str()])),
        }
    }
    groups
}

impl Display for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "{}{{", MEMBER_INDENT)?;
        let groups = grouped_locals(self);
        for (ty, names) in groups.iter() {
            writeln!(f, "{}{} {};", STMT_INDENT, ty, names.join(", "))?;
        }
        if !groups.is_empty() && !self.is_empty() {
            f.write_char('\n')?;
        }
        for (i, stmt) in self.statements().enumerate() {
            match stmt {
                Stmt::Label(_) => {
                    if i > 0 {
                        f.write_char('\n')?;
                    }
                    writeln!(f, "{}{}", LABEL_INDENT, stmt)?;
                }
                Stmt::Other(raw) if raw.contains('\n') => write_block(f, raw)?,
                _ => writeln!(f, "{}{};", STMT_INDENT, stmt)?,
            }
        }
        writeln!(f, "{}}}", MEMBER_INDENT)
    }
}

/// Multi-line statements (switches) keep their braces at statement level
/// and indent the cases one step further
fn write_block(f: &mut Formatter<'_>, raw: &str) -> Result {
    let lines: Vec<&str> = raw.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let indent = if i == 0 || *line == "{" || *line == "}" {
            STMT_INDENT.to_string()
        } else {
            format!("{}{}", STMT_INDENT, MEMBER_INDENT)
        };
        let end = if i + 1 == lines.len() { ";" } else { "" };
        writeln!(f, "{}{}{}", indent, line, end)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::ir::{parse_body, Stmt, Type};

    #[test]
    fn test_print_generated_locals() {
        let mut body = parse_body(
            "<a.B: void c()>",
            "a.B r0;\nr0 := @this: a.B;\nreturn;",
        )
        .unwrap();
        let local = body.generate_local(Type::class("a.B"));
        let ret = body.terminal_return().unwrap();
        body.insert_before(ret, vec![Stmt::assign(local.name.as_str(), crate::ir::Value::local("r0"))])
            .unwrap();
        assert_eq!(
            body.to_string(),
            "    {\n        a.B r0, $r0;\n\n        r0 := @this: a.B;\n        $r0 = r0;\n        return;\n    }\n"
        );
    }
}
