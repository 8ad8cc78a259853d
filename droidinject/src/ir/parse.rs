use lazy_static::lazy_static;
use regex::Regex;

use super::value::{opens_member_ref, unescape_string};
use super::{
    Body, ClassDef, Constant, FieldDef, FieldRef, IdentityRef, InvokeExpr, InvokeKind, IrError,
    IrResult, Local, MethodDef, MethodRef, MethodSig, Modifier, Modifiers, Stmt, Type, Value,
};
use crate::utils::ClassName;

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"^\$?[A-Za-z_][A-Za-z0-9_$]*$").expect("valid regex");
    static ref LABEL: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*):$").expect("valid regex");
    static ref INT: Regex = Regex::new(r"^-?[0-9]+$").expect("valid regex");
    static ref LONG: Regex = Regex::new(r"^(-?[0-9]+)L$").expect("valid regex");
    static ref FLOAT: Regex =
        Regex::new(r"^-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?F$").expect("valid regex");
    static ref DOUBLE: Regex =
        Regex::new(r"^-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?$").expect("valid regex");
    static ref IDENTITY: Regex =
        Regex::new(r"^(\S+) := @(this|parameter([0-9]+)|caughtexception)(: (.+))?$")
            .expect("valid regex");
}

/// Leading words that start a statement and can never begin a local
/// declaration
const STMT_KEYWORDS: &[&str] = &[
    "return",
    "throw",
    "goto",
    "if",
    "nop",
    "breakpoint",
    "entermonitor",
    "exitmonitor",
    "tableswitch",
    "lookupswitch",
    "catch",
    "virtualinvoke",
    "specialinvoke",
    "interfaceinvoke",
    "staticinvoke",
    "dynamicinvoke",
];

/// Parse a single class in textual form
pub fn parse_class(text: &str) -> IrResult<ClassDef> {
    let mut lines = Lines::new(text);
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| IrError::parse(0, "empty class file"))?;
    let mut class = parse_class_header(line_no, header)?;
    lines.expect("{")?;

    loop {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| IrError::parse(lines.last_line(), "unterminated class"))?;
        if line == "}" {
            break;
        }
        if !line.contains('(') {
            class.fields.push(parse_field(line_no, line)?);
            continue;
        }
        let (mut method, has_body) = parse_method_header(line_no, line)?;
        if has_body {
            lines.expect("{")?;
            let mut body = Body::new(class.method_ref(&method.sig));
            parse_body_lines(&mut lines, &mut body, true)?;
            method.body = Some(body);
        }
        class.methods.push(method);
    }

    if let Some((line_no, _)) = lines.next() {
        return Err(IrError::parse(line_no, "trailing content after class"));
    }
    Ok(class)
}

/// Parse a lone method body (locals and statements, optionally wrapped in
/// braces) for the method `method`
pub fn parse_body(method: &str, text: &str) -> IrResult<Body> {
    let method = MethodRef::parse(method)?;
    let mut body = Body::new(method);
    let mut lines = Lines::new(text);
    let braced = lines.peek().map_or(false, |(_, it)| it == "{");
    if braced {
        lines.next();
    }
    parse_body_lines(&mut lines, &mut body, braced)?;
    if let Some((line_no, _)) = lines.next() {
        return Err(IrError::parse(line_no, "trailing content after body"));
    }
    Ok(body)
}

struct Lines<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, it)| (i + 1, it.trim()))
            .filter(|(_, it)| !it.is_empty() && !it.starts_with("//"))
            .collect();
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let it = self.peek()?;
        self.pos += 1;
        Some(it)
    }

    fn last_line(&self) -> usize {
        self.lines.last().map_or(0, |(n, _)| *n)
    }

    fn expect(&mut self, want: &str) -> IrResult<()> {
        match self.next() {
            Some((_, line)) if line == want => Ok(()),
            Some((line_no, line)) => Err(IrError::parse(
                line_no,
                &format!("expected `{}`, found `{}`", want, line),
            )),
            None => Err(IrError::parse(
                self.last_line(),
                &format!("expected `{}`, found end of input", want),
            )),
        }
    }
}

fn split_modifiers(tokens: &[&str]) -> (Modifiers, usize) {
    let mut mods = Vec::new();
    let mut idx = 0;
    while let Some(m) = tokens.get(idx).and_then(|it| Modifier::from_keyword(it)) {
        mods.push(m);
        idx += 1;
    }
    (Modifiers::new(mods), idx)
}

fn parse_class_list(s: &str) -> Vec<ClassName> {
    s.split(',')
        .map(|it| it.trim())
        .filter(|it| !it.is_empty())
        .map(ClassName::from)
        .collect()
}

fn parse_class_header(line_no: usize, line: &str) -> IrResult<ClassDef> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (modifiers, idx) = split_modifiers(&tokens);
    let is_interface = match tokens.get(idx) {
        Some(&"class") => false,
        Some(&"interface") => true,
        _ => return Err(IrError::parse(line_no, "expected `class` or `interface`")),
    };
    let name = tokens
        .get(idx + 1)
        .ok_or_else(|| IrError::parse(line_no, "missing class name"))?;

    let mut class = ClassDef::new(*name);
    class.modifiers = modifiers;
    class.is_interface = is_interface;

    let rest = &tokens[idx + 2..];
    let split = rest
        .iter()
        .position(|it| *it == "implements")
        .unwrap_or(rest.len());
    let (extends, implements) = rest.split_at(split);
    match extends {
        [] => {}
        ["extends", sup] => class.superclass = Some(ClassName::from(*sup)),
        _ => {
            return Err(IrError::parse(
                line_no,
                &format!("unexpected `{}` in class header", extends.join(" ")),
            ))
        }
    }
    if let Some((_, list)) = implements.split_first() {
        class.interfaces = parse_class_list(&list.join(" "));
    }
    Ok(class)
}

fn parse_field(line_no: usize, line: &str) -> IrResult<FieldDef> {
    let decl = line
        .strip_suffix(';')
        .ok_or_else(|| IrError::parse(line_no, "field declaration must end with `;`"))?;
    let tokens: Vec<&str> = decl.split_whitespace().collect();
    let (modifiers, idx) = split_modifiers(&tokens);
    match &tokens[idx..] {
        [ty, name] => Ok(FieldDef {
            name: (*name).into(),
            ty: Type::parse(ty).ok_or_else(|| IrError::parse(line_no, "invalid field type"))?,
            modifiers,
        }),
        _ => Err(IrError::parse(line_no, "invalid field declaration")),
    }
}

/// Returns the method and whether a body follows
fn parse_method_header(line_no: usize, line: &str) -> IrResult<(MethodDef, bool)> {
    let (decl, has_body) = match line.strip_suffix(';') {
        Some(it) => (it, false),
        None => (line, true),
    };
    let bad = || IrError::parse(line_no, &format!("invalid method header `{}`", line));
    let open = decl.find('(').ok_or_else(bad)?;
    let close = decl.rfind(')').ok_or_else(bad)?;
    if close < open {
        return Err(bad());
    }
    let tokens: Vec<&str> = decl[..open].split_whitespace().collect();
    let (modifiers, idx) = split_modifiers(&tokens);
    let [ret, name] = &tokens[idx..] else {
        return Err(bad());
    };
    let params = &decl[open + 1..close];
    let sig = MethodSig::parse(&format!("{} {}({})", ret, name, params))
        .map_err(|e| IrError::parse(line_no, &e))?;

    let tail = decl[close + 1..].trim();
    let throws = if tail.is_empty() {
        Vec::new()
    } else {
        parse_class_list(tail.strip_prefix("throws").ok_or_else(bad)?)
    };

    Ok((
        MethodDef {
            sig,
            modifiers,
            throws,
            body: None,
        },
        has_body,
    ))
}

/// Try to read a line as a local declaration: `type name1, name2;`
fn parse_local_decl(line: &str) -> Option<Vec<Local>> {
    let decl = line.strip_suffix(';')?;
    let (ty, names) = decl.split_once(' ')?;
    if STMT_KEYWORDS.contains(&ty) {
        return None;
    }
    let ty = Type::parse(ty)?;
    let names: Vec<&str> = names.split(',').map(|it| it.trim()).collect();
    if names.is_empty() || !names.iter().all(|it| IDENT.is_match(it)) {
        return None;
    }
    Some(names.into_iter().map(|it| Local::new(it, ty.clone())).collect())
}

fn parse_body_lines(lines: &mut Lines, body: &mut Body, braced: bool) -> IrResult<()> {
    let mut declaring = true;
    while let Some((line_no, line)) = lines.next() {
        if line == "}" {
            if braced {
                return Ok(());
            }
            return Err(IrError::parse(line_no, "unexpected `}`"));
        }
        if declaring {
            if let Some(locals) = parse_local_decl(line) {
                for local in locals {
                    body.add_local(local)
                        .map_err(|e| IrError::parse(line_no, &e))?;
                }
                continue;
            }
            declaring = false;
        }
        if let Some(caps) = LABEL.captures(line) {
            body.push(Stmt::Label(caps[1].into()));
            continue;
        }
        if line.starts_with("tableswitch") || line.starts_with("lookupswitch") {
            body.push(parse_switch(lines, line_no, line)?);
            continue;
        }
        let stmt = line
            .strip_suffix(';')
            .ok_or_else(|| IrError::parse(line_no, "statement must end with `;`"))?;
        body.push(parse_stmt(line_no, stmt)?);
    }
    if braced {
        return Err(IrError::parse(lines.last_line(), "unterminated body"));
    }
    Ok(())
}

/// Switch statements span several lines, they are kept verbatim
fn parse_switch(lines: &mut Lines, line_no: usize, first: &str) -> IrResult<Stmt> {
    let mut raw = vec![first.to_string()];
    loop {
        let (_, line) = lines
            .next()
            .ok_or_else(|| IrError::parse(line_no, "unterminated switch"))?;
        if line == "};" {
            raw.push("}".into());
            break;
        }
        raw.push(line.into());
    }
    Ok(Stmt::Other(raw.join("\n")))
}

fn parse_stmt(line_no: usize, s: &str) -> IrResult<Stmt> {
    if s == "return" {
        return Ok(Stmt::return_void());
    }
    if let Some(v) = s.strip_prefix("return ") {
        return Ok(Stmt::Return(Some(parse_value(line_no, v)?)));
    }
    if let Some(caps) = IDENTITY.captures(s) {
        let local = caps[1].to_string();
        let ty = caps
            .get(5)
            .map(|it| Type::parse(it.as_str()).ok_or_else(|| IrError::parse(line_no, "bad type")))
            .transpose()?;
        let rhs = match (&caps[2], caps.get(3), ty) {
            ("this", _, Some(ty)) => IdentityRef::This(ty),
            ("caughtexception", _, _) => IdentityRef::CaughtException,
            (_, Some(idx), Some(ty)) => {
                let idx = idx
                    .as_str()
                    .parse()
                    .map_err(|_| IrError::parse(line_no, "bad parameter index"))?;
                IdentityRef::Parameter(idx, ty)
            }
            _ => return Err(IrError::parse(line_no, "invalid identity statement")),
        };
        return Ok(Stmt::Identity { local, rhs });
    }
    if let Some(expr) = parse_invoke(line_no, s)? {
        return Ok(Stmt::Invoke(expr));
    }
    if let Some(idx) = find_top_level(s, " = ") {
        let (lhs, rhs) = (&s[..idx], &s[idx + 3..]);
        return Ok(Stmt::Assign {
            lhs: parse_value(line_no, lhs)?,
            rhs: parse_value(line_no, rhs)?,
        });
    }
    Ok(Stmt::Other(s.into()))
}

/// Characters of `s` with their byte offsets, skipping string literals and
/// `<...>` member references
fn top_level_chars(s: &str) -> Vec<(usize, char)> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut ref_depth = 0usize;
    for (i, &(offset, c)) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if ref_depth > 0 {
            match c {
                '<' => ref_depth += 1,
                '>' => ref_depth -= 1,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '<' if opens_member_ref(chars.get(i + 1).map(|(_, n)| *n)) => ref_depth = 1,
            _ => out.push((offset, c)),
        }
    }
    out
}

fn find_top_level(s: &str, pat: &str) -> Option<usize> {
    top_level_chars(s)
        .into_iter()
        .map(|(offset, _)| offset)
        .find(|offset| s[*offset..].starts_with(pat))
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (offset, c) in top_level_chars(s) {
        if c == sep {
            parts.push(&s[start..offset]);
            start = offset + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Index of the `>` closing the member reference opened at `start`
fn member_ref_end(s: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in s[start..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_invoke(line_no: usize, s: &str) -> IrResult<Option<InvokeExpr>> {
    let Some((kw, rest)) = s.split_once(' ') else {
        return Ok(None);
    };
    let Some(kind) = InvokeKind::from_keyword(kw) else {
        return Ok(None);
    };
    let bad = || IrError::parse(line_no, &format!("invalid invocation `{}`", s));

    let (base, ref_start) = if kind == InvokeKind::Static {
        (None, 0)
    } else {
        let dot = rest.find(".<").ok_or_else(bad)?;
        (Some(rest[..dot].trim().to_string()), dot + 1)
    };
    let ref_end = member_ref_end(rest, ref_start).ok_or_else(bad)?;
    let method =
        MethodRef::parse(&rest[ref_start..=ref_end]).map_err(|e| IrError::parse(line_no, &e))?;

    let args = rest[ref_end + 1..]
        .trim()
        .strip_prefix('(')
        .and_then(|it| it.strip_suffix(')'))
        .ok_or_else(bad)?;
    let args = if args.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(args, ',')
            .into_iter()
            .map(|it| parse_value(line_no, it))
            .collect::<IrResult<Vec<Value>>>()?
    };

    Ok(Some(InvokeExpr {
        kind,
        base,
        method,
        args,
    }))
}

fn parse_value(line_no: usize, s: &str) -> IrResult<Value> {
    let s = s.trim();
    if let Some(expr) = parse_invoke(line_no, s)? {
        return Ok(Value::Invoke(expr));
    }
    if s == "null" {
        return Ok(Constant::Null.into());
    }
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') && top_level_chars(s).is_empty() {
        return Ok(Constant::Str(unescape_string(&s[1..s.len() - 1])).into());
    }
    if let Some(cls) = s
        .strip_prefix("class \"")
        .and_then(|it| it.strip_suffix('"'))
    {
        return Ok(Constant::Class(cls.into()).into());
    }
    if INT.is_match(s) {
        if let Ok(v) = s.parse() {
            return Ok(Constant::Int(v).into());
        }
    }
    if let Some(caps) = LONG.captures(s) {
        if let Ok(v) = caps[1].parse() {
            return Ok(Constant::Long(v).into());
        }
    }
    if FLOAT.is_match(s) {
        return Ok(Constant::Float(s.into()).into());
    }
    if DOUBLE.is_match(s) {
        return Ok(Constant::Double(s.into()).into());
    }
    if let Some(cls) = s.strip_prefix("new ") {
        if let Some(Type::Ref(cn)) = Type::parse(cls) {
            return Ok(Value::New(cn));
        }
    }
    if s.starts_with('<') && member_ref_end(s, 0) == Some(s.len() - 1) {
        if let Ok(field) = FieldRef::parse(s) {
            return Ok(Value::StaticField(field));
        }
    }
    if let Some((base, field)) = s.split_once(".<") {
        let field = format!("<{}", field);
        if IDENT.is_match(base) && member_ref_end(&field, 0) == Some(field.len() - 1) {
            if let Ok(field) = FieldRef::parse(&field) {
                return Ok(Value::InstanceField {
                    base: base.into(),
                    field,
                });
            }
        }
    }
    if IDENT.is_match(s) {
        return Ok(Value::Local(s.into()));
    }
    Ok(Value::Expr(s.into()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::StmtKind;

    const CLASS: &str = r#"public class com.example.Main extends android.app.Activity implements android.view.View$OnClickListener
{
    private android.view.View$OnClickListener listener;
    public static int counter;

    public void <init>()
    {
        com.example.Main r0;

        r0 := @this: com.example.Main;
        specialinvoke r0.<android.app.Activity: void <init>()>();
        return;
    }

    public void onCreate(android.os.Bundle)
    {
        com.example.Main r0;
        android.os.Bundle r1;
        java.lang.String $r2, $r3;
        int i0;

        r0 := @this: com.example.Main;
        r1 := @parameter0: android.os.Bundle;
        specialinvoke r0.<android.app.Activity: void onCreate(android.os.Bundle)>(r1);
        $r2 = "a \"quoted\" string";
        i0 = <com.example.Main: int counter>;
        if i0 < 2 goto label1;
        $r3 = virtualinvoke $r2.<java.lang.String: java.lang.String concat(java.lang.String)>("x, y");
        tableswitch(i0)
        {
            case 0: goto label1;
            default: goto label1;
        };

     label1:
        return;
    }

    public abstract void onClick(android.view.View);

    public void load() throws java.io.IOException, java.lang.InterruptedException
    {
        return;
    }
}
"#;

    #[test]
    fn test_parse_class() {
        let class = parse_class(CLASS).unwrap();
        assert_eq!(class.name, "com.example.Main");
        assert_eq!(
            class.superclass.as_ref().map(|it| it.as_str()),
            Some("android.app.Activity")
        );
        assert_eq!(class.interfaces.len(), 1);
        assert_eq!(class.fields.len(), 2);
        assert!(class.fields[1].is_static());
        assert_eq!(class.methods.len(), 4);
        assert!(class.methods[2].body.is_none());
        assert!(class.methods[2].is_abstract());
        assert_eq!(class.methods[3].throws.len(), 2);

        let body = class.methods[1].body.as_ref().unwrap();
        assert_eq!(body.locals().len(), 5);
        let kinds: Vec<StmtKind> = body.statements().map(|it| it.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StmtKind::Identity,
                StmtKind::Identity,
                StmtKind::Invoke,
                StmtKind::Assign,
                StmtKind::Assign,
                StmtKind::Other,
                StmtKind::Assign,
                StmtKind::Other,
                StmtKind::Label,
                StmtKind::Return,
            ]
        );
    }

    #[test]
    fn test_parse_values() {
        let class = parse_class(CLASS).unwrap();
        let body = class.methods[1].body.as_ref().unwrap();
        let stmts: Vec<&Stmt> = body.statements().collect();
        match stmts[3] {
            Stmt::Assign {
                rhs: Value::Const(Constant::Str(s)),
                ..
            } => assert_eq!(s, "a \"quoted\" string"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            stmts[4],
            Stmt::Assign {
                rhs: Value::StaticField(_),
                ..
            }
        ));
        let call = stmts[6].invoke_expr().unwrap();
        assert_eq!(call.base.as_deref(), Some("$r2"));
        assert_eq!(call.args, vec![Value::Const(Constant::Str("x, y".into()))]);
    }

    #[test]
    fn test_round_trip() {
        let class = parse_class(CLASS).unwrap();
        assert_eq!(class.to_string(), CLASS);
    }

    #[test]
    fn test_parse_body_errors() {
        let err = parse_body("<a.B: void c()>", "r0 := @this: a.B\nreturn;").unwrap_err();
        assert!(matches!(err, IrError::Parse { line: 1, .. }));
        let err = parse_body(
            "<a.B: void c()>",
            "virtualinvoke r0.<a.B: void nope(>();",
        )
        .unwrap_err();
        assert!(matches!(err, IrError::Parse { .. }));
        assert!(parse_body("a.B c", "return;").is_err());
    }

    #[test]
    fn test_unbalanced_member_ref() {
        assert_eq!(member_ref_end("<a.B: int f>", 0), Some(11));
        assert_eq!(member_ref_end("> <a.B: int f>", 0), None);
        let err = parse_body("<a.B: void c()>", "staticinvoke >a.B: void d()>();").unwrap_err();
        assert!(matches!(err, IrError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_special_values() {
        let body = parse_body(
            "<a.B: void c()>",
            r#"
        a.B r0;
        long l0;
        float f0;
        a.C $r1;

        r0 := @this: a.B;
        l0 = 5L;
        f0 = 1.5F;
        $r1 = new a.C;
        r0.<a.B: a.C field> = $r1;
        throw $r1;
"#,
        )
        .unwrap();
        let stmts: Vec<&Stmt> = body.statements().collect();
        assert_eq!(stmts[1], &Stmt::assign("l0", Constant::Long(5).into()));
        assert_eq!(stmts[2], &Stmt::assign("f0", Constant::Float("1.5F".into()).into()));
        assert_eq!(stmts[3], &Stmt::assign("$r1", Value::New(ClassName::from("a.C"))));
        assert!(matches!(
            stmts[4],
            Stmt::Assign {
                lhs: Value::InstanceField { .. },
                ..
            }
        ));
        assert_eq!(stmts[5], &Stmt::Other("throw $r1".into()));
    }
}
