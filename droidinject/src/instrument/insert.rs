use log::{debug, trace};
use regex::Regex;

use crate::ir::{Body, EditLog, IrResult, Stmt, StmtId, StmtKind};

/// Selects the statements an insertion is anchored on
pub trait StmtPredicate {
    fn matches(&self, stmt: &Stmt) -> bool;
}

impl StmtPredicate for StmtKind {
    fn matches(&self, stmt: &Stmt) -> bool {
        stmt.kind() == *self
    }
}

impl<F> StmtPredicate for F
where
    F: Fn(&Stmt) -> bool,
{
    fn matches(&self, stmt: &Stmt) -> bool {
        self(stmt)
    }
}

/// Regular expression that has to match the whole canonical text of a
/// statement, e.g. `virtualinvoke .*\.<.*: void finish\(\)>\(\)`
#[derive(Debug, Clone)]
pub struct TextPattern {
    re: Regex,
}

impl TextPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}

impl StmtPredicate for TextPattern {
    fn matches(&self, stmt: &Stmt) -> bool {
        self.re.is_match(&stmt.to_string())
    }
}

/// Index of the first statement past the prologue: identity statements and
/// at most one call to a method named like the body's own method
fn prologue_end(body: &Body) -> usize {
    let name = body.method().sig.name.as_str();
    let mut stmts = body.statements().peekable();
    let mut idx = 0;
    while stmts.next_if(|it| it.is_identity()).is_some() {
        idx += 1;
    }
    let delegates = stmts.peek().map_or(false, |it| match it {
        Stmt::Invoke(expr) => expr.method.sig.name == name,
        _ => false,
    });
    if delegates {
        idx += 1;
    }
    idx
}

/// Insert `stmts` right after the prologue of `body`
///
/// Constructors keep their `super.<init>` call first. A body that consists
/// of the prologue only gets the statements appended.
pub fn insert_at_beginning(body: &mut Body, stmts: Vec<Stmt>) -> IrResult<Vec<StmtId>> {
    let idx = prologue_end(body);
    debug!(
        "inserting {} statements at beginning of {}",
        stmts.len(),
        body.method()
    );
    let anchor = body.iter().nth(idx).map(|(id, _)| id);
    match anchor {
        Some(anchor) => body.insert_before(anchor, stmts),
        None => Ok(body.append(stmts)),
    }
}

/// Append `stmts` after the last statement of `body`
///
/// Exception regions are not taken into account, statements end up after
/// the final `return` or `throw` when nothing follows them.
pub fn insert_at_end(body: &mut Body, stmts: Vec<Stmt>) -> Vec<StmtId> {
    debug!("inserting {} statements at end of {}", stmts.len(), body.method());
    body.append(stmts)
}

fn insert_matching<P>(body: &mut Body, stmts: &[Stmt], pred: &P, before: bool) -> IrResult<usize>
where
    P: StmtPredicate + ?Sized,
{
    let mut log = EditLog::new();
    let mut matched = 0;
    for (id, stmt) in body.snapshot() {
        if !pred.matches(&stmt) {
            continue;
        }
        trace!("matched `{}` in {}", stmt, body.method());
        matched += 1;
        if before {
            log.insert_before(id, stmts.to_vec());
        } else {
            log.insert_after(id, stmts.to_vec());
        }
    }
    let inserted = log.commit(body)?;
    debug!(
        "{} matches in {}, inserted {} statements",
        matched,
        body.method(),
        inserted
    );
    Ok(matched)
}

/// Insert a copy of `stmts` before every statement matching `pred`,
/// returning the number of matches
pub fn insert_before_matching<P>(body: &mut Body, stmts: &[Stmt], pred: &P) -> IrResult<usize>
where
    P: StmtPredicate + ?Sized,
{
    insert_matching(body, stmts, pred, true)
}

/// Insert a copy of `stmts` after every statement matching `pred`,
/// returning the number of matches
pub fn insert_after_matching<P>(body: &mut Body, stmts: &[Stmt], pred: &P) -> IrResult<usize>
where
    P: StmtPredicate + ?Sized,
{
    insert_matching(body, stmts, pred, false)
}

pub fn insert_before_regex(body: &mut Body, stmts: &[Stmt], pattern: &str) -> crate::Result<usize> {
    let pattern = TextPattern::new(pattern)?;
    Ok(insert_before_matching(body, stmts, &pattern)?)
}

pub fn insert_after_regex(body: &mut Body, stmts: &[Stmt], pattern: &str) -> crate::Result<usize> {
    let pattern = TextPattern::new(pattern)?;
    Ok(insert_after_matching(body, stmts, &pattern)?)
}
