use std::fmt::{Display, Formatter};

use super::{IdentityRef, IrError, IrResult, MethodRef, Stmt, Type};

/// Stable handle to a statement inside a [Body]
///
/// Handles stay valid across insertions and removals of other statements,
/// which is what makes snapshot-then-mutate iteration safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl Display for StmtId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty: Type,
}

impl Local {
    pub fn new<S: Into<String>>(name: S, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Method body: typed locals and the statement chain
#[derive(Debug, Clone)]
pub struct Body {
    method: MethodRef,
    locals: Vec<Local>,
    stmts: Vec<(StmtId, Stmt)>,
    next_id: u32,
}

impl Body {
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            locals: Vec::new(),
            stmts: Vec::new(),
            next_id: 0,
        }
    }

    /// The method that owns this body
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    pub fn locals(&self) -> &[Local] {
        self.locals.as_slice()
    }

    pub fn local(&self, name: &str) -> Option<&Local> {
        self.locals.iter().find(|it| it.name == name)
    }

    pub fn add_local(&mut self, local: Local) -> IrResult<()> {
        if self.local(&local.name).is_some() {
            return Err(IrError::DuplicateLocal(local.name));
        }
        self.locals.push(local);
        Ok(())
    }

    /// Create a fresh local named after its type (`$r3`, `$i0`, ...) and
    /// declare it in this body
    pub fn generate_local(&mut self, ty: Type) -> Local {
        let prefix = ty.local_prefix();
        let mut n = 0usize;
        let name = loop {
            let candidate = format!("${}{}", prefix, n);
            if self.local(&candidate).is_none() {
                break candidate;
            }
            n += 1;
        };
        let local = Local::new(name, ty);
        self.locals.push(local.clone());
        local
    }

    /// Rename and retype a local, rewriting every use in the body
    pub fn retype_local(&mut self, name: &str, new_name: &str, ty: Type) -> IrResult<Local> {
        if name != new_name && self.local(new_name).is_some() {
            return Err(IrError::DuplicateLocal(new_name.into()));
        }
        let local = self
            .locals
            .iter_mut()
            .find(|it| it.name == name)
            .ok_or_else(|| IrError::UnknownLocal(name.into()))?;
        local.name = new_name.into();
        local.ty = ty;
        let updated = local.clone();
        for (_, stmt) in self.stmts.iter_mut() {
            stmt.rename_local(name, new_name);
        }
        Ok(updated)
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StmtId, &Stmt)> {
        self.stmts.iter().map(|(id, stmt)| (*id, stmt))
    }

    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts.iter().map(|(_, stmt)| stmt)
    }

    /// Copy of the current statement sequence, safe to iterate while the
    /// body is mutated
    pub fn snapshot(&self) -> Vec<(StmtId, Stmt)> {
        self.stmts.clone()
    }

    pub fn get(&self, id: StmtId) -> Option<&Stmt> {
        self.stmts
            .iter()
            .find(|(it, _)| *it == id)
            .map(|(_, stmt)| stmt)
    }

    pub fn get_mut(&mut self, id: StmtId) -> Option<&mut Stmt> {
        self.stmts
            .iter_mut()
            .find(|(it, _)| *it == id)
            .map(|(_, stmt)| stmt)
    }

    pub fn position(&self, id: StmtId) -> Option<usize> {
        self.stmts.iter().position(|(it, _)| *it == id)
    }

    pub fn first(&self) -> Option<StmtId> {
        self.stmts.first().map(|(id, _)| *id)
    }

    pub fn last(&self) -> Option<StmtId> {
        self.stmts.last().map(|(id, _)| *id)
    }

    fn next_id(&mut self) -> StmtId {
        let id = StmtId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn push(&mut self, stmt: Stmt) -> StmtId {
        let id = self.next_id();
        self.stmts.push((id, stmt));
        id
    }

    fn insert_at(&mut self, idx: usize, stmts: Vec<Stmt>) -> Vec<StmtId> {
        let mut ids = Vec::with_capacity(stmts.len());
        for (offset, stmt) in stmts.into_iter().enumerate() {
            let id = self.next_id();
            self.stmts.insert(idx + offset, (id, stmt));
            ids.push(id);
        }
        ids
    }

    /// Insert `stmts`, in order, immediately before `anchor`
    pub fn insert_before(&mut self, anchor: StmtId, stmts: Vec<Stmt>) -> IrResult<Vec<StmtId>> {
        let idx = self
            .position(anchor)
            .ok_or(IrError::UnknownStmt(anchor))?;
        Ok(self.insert_at(idx, stmts))
    }

    /// Insert `stmts`, in order, immediately after `anchor`
    pub fn insert_after(&mut self, anchor: StmtId, stmts: Vec<Stmt>) -> IrResult<Vec<StmtId>> {
        let idx = self
            .position(anchor)
            .ok_or(IrError::UnknownStmt(anchor))?;
        Ok(self.insert_at(idx + 1, stmts))
    }

    pub fn append(&mut self, stmts: Vec<Stmt>) -> Vec<StmtId> {
        let idx = self.stmts.len();
        self.insert_at(idx, stmts)
    }

    pub fn remove(&mut self, id: StmtId) -> Option<Stmt> {
        let idx = self.position(id)?;
        Some(self.stmts.remove(idx).1)
    }

    /// Name of the local bound to `@this`
    pub fn this_local(&self) -> Option<&Local> {
        self.statements().find_map(|stmt| match stmt {
            Stmt::Identity {
                local,
                rhs: IdentityRef::This(_),
            } => self.local(local),
            _ => None,
        })
    }

    /// All `return` statements without a value, in body order
    pub fn void_returns(&self) -> Vec<StmtId> {
        self.iter()
            .filter(|(_, stmt)| stmt.is_void_return())
            .map(|(id, _)| id)
            .collect()
    }

    /// The lexically last void return, used as the epilogue anchor
    pub fn terminal_return(&self) -> Option<StmtId> {
        self.iter()
            .filter(|(_, stmt)| stmt.is_void_return())
            .map(|(id, _)| id)
            .last()
    }
}

enum Edit {
    InsertBefore(StmtId, Vec<Stmt>),
    InsertAfter(StmtId, Vec<Stmt>),
    Remove(StmtId),
}

/// Queue of edits collected while scanning a snapshot and applied in order
/// once the scan is over
#[derive(Default)]
pub struct EditLog {
    edits: Vec<Edit>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_before(&mut self, anchor: StmtId, stmts: Vec<Stmt>) -> &mut Self {
        self.edits.push(Edit::InsertBefore(anchor, stmts));
        self
    }

    pub fn insert_after(&mut self, anchor: StmtId, stmts: Vec<Stmt>) -> &mut Self {
        self.edits.push(Edit::InsertAfter(anchor, stmts));
        self
    }

    pub fn remove(&mut self, id: StmtId) -> &mut Self {
        self.edits.push(Edit::Remove(id));
        self
    }

    /// Insert `stmt` right after `id`, then drop `id`
    pub fn replace(&mut self, id: StmtId, stmt: Stmt) -> &mut Self {
        self.insert_after(id, vec![stmt]).remove(id)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all queued edits to `body`, returning the number of inserted
    /// statements
    pub fn commit(self, body: &mut Body) -> IrResult<usize> {
        let mut inserted = 0;
        for edit in self.edits {
            match edit {
                Edit::InsertBefore(anchor, stmts) => {
                    inserted += body.insert_before(anchor, stmts)?.len();
                }
                Edit::InsertAfter(anchor, stmts) => {
                    inserted += body.insert_after(anchor, stmts)?.len();
                }
                Edit::Remove(id) => {
                    body.remove(id).ok_or(IrError::UnknownStmt(id))?;
                }
            }
        }
        Ok(inserted)
    }
}
