use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use super::{parse_class, Body, FieldRef, IrError, IrResult, MethodRef, MethodSig, Type};
use crate::utils::{ensure_dir_exists, path_has_ext, path_must_str, read_file, ClassName};

pub const JIMPLE_EXT: &str = "jimple";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
    Abstract,
    Native,
    Synchronized,
    Transient,
    Volatile,
    Strictfp,
    Synthetic,
    Enum,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Static => "static",
            Self::Final => "final",
            Self::Abstract => "abstract",
            Self::Native => "native",
            Self::Synchronized => "synchronized",
            Self::Transient => "transient",
            Self::Volatile => "volatile",
            Self::Strictfp => "strictfp",
            Self::Synthetic => "synthetic",
            Self::Enum => "enum",
        }
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "public" => Self::Public,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "static" => Self::Static,
            "final" => Self::Final,
            "abstract" => Self::Abstract,
            "native" => Self::Native,
            "synchronized" => Self::Synchronized,
            "transient" => Self::Transient,
            "volatile" => Self::Volatile,
            "strictfp" => Self::Strictfp,
            "synthetic" => Self::Synthetic,
            "enum" => Self::Enum,
            _ => return None,
        })
    }
}

/// Ordered set of modifiers as written in the source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers(Vec<Modifier>);

impl Modifiers {
    pub fn new(mods: Vec<Modifier>) -> Self {
        Self(mods)
    }

    pub fn contains(&self, m: Modifier) -> bool {
        self.0.contains(&m)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, m) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(m.keyword())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub modifiers: Modifiers,
}

impl FieldDef {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifier::Static)
    }

    pub fn field_ref(&self, class: &ClassName) -> FieldRef {
        FieldRef {
            class: class.clone(),
            ty: self.ty.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub sig: MethodSig,
    pub modifiers: Modifiers,
    pub throws: Vec<ClassName>,
    /// Absent for abstract and native methods
    pub body: Option<Body>,
}

impl MethodDef {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifier::Static)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifier::Abstract)
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: ClassName,
    pub modifiers: Modifiers,
    pub is_interface: bool,
    pub superclass: Option<ClassName>,
    pub interfaces: Vec<ClassName>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    pub fn new<C: Into<ClassName>>(name: C) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::default(),
            is_interface: false,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.is_interface || self.modifiers.contains(Modifier::Abstract)
    }

    pub fn method(&self, sig: &MethodSig) -> Option<&MethodDef> {
        self.methods.iter().find(|it| &it.sig == sig)
    }

    pub fn method_mut(&mut self, sig: &MethodSig) -> Option<&mut MethodDef> {
        self.methods.iter_mut().find(|it| &it.sig == sig)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|it| it.name == name)
    }

    pub fn method_ref(&self, sig: &MethodSig) -> MethodRef {
        MethodRef::new(self.name.clone(), sig.clone())
    }
}

/// All classes of the program being instrumented plus its entry points
#[derive(Debug, Default)]
pub struct Scene {
    classes: BTreeMap<ClassName, ClassDef>,
    entry_points: Vec<MethodRef>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, returning the definition it replaced if any
    pub fn add_class(&mut self, class: ClassDef) -> Option<ClassDef> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDef> {
        self.classes.get_mut(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn method(&self, m: &MethodRef) -> Option<&MethodDef> {
        self.class(m.class.as_str())?.method(&m.sig)
    }

    /// Find the method `sig` on `class` or the nearest superclass declaring it
    pub fn resolve_method(&self, class: &str, sig: &MethodSig) -> Option<(&ClassDef, &MethodDef)> {
        let mut seen = HashSet::new();
        let mut current = self.class(class);
        while let Some(cls) = current {
            if !seen.insert(cls.name.as_str()) {
                break;
            }
            if let Some(m) = cls.method(sig) {
                return Some((cls, m));
            }
            current = cls
                .superclass
                .as_ref()
                .and_then(|it| self.class(it.as_str()));
        }
        None
    }

    pub fn body(&self, m: &MethodRef) -> IrResult<&Body> {
        self.method(m)
            .ok_or_else(|| IrError::UnknownMethod(m.to_string()))?
            .body
            .as_ref()
            .ok_or_else(|| IrError::NoBody(m.to_string()))
    }

    pub fn body_mut(&mut self, m: &MethodRef) -> IrResult<&mut Body> {
        self.class_mut(m.class.as_str())
            .and_then(|it| it.method_mut(&m.sig))
            .ok_or_else(|| IrError::UnknownMethod(m.to_string()))?
            .body
            .as_mut()
            .ok_or_else(|| IrError::NoBody(m.to_string()))
    }

    /// Run `f` against a copy of the body of `m` and store the copy only if
    /// `f` succeeds, so a failed rewrite leaves the scene untouched
    pub fn rewrite_body<T, E, F>(&mut self, m: &MethodRef, f: F) -> Result<T, E>
    where
        E: From<IrError>,
        F: FnOnce(&mut Body, &Scene) -> Result<T, E>,
    {
        let mut copy = self.body(m)?.clone();
        let res = f(&mut copy, self)?;
        *self.body_mut(m)? = copy;
        Ok(res)
    }

    pub fn entry_points(&self) -> &[MethodRef] {
        self.entry_points.as_slice()
    }

    pub fn set_entry_points(&mut self, entry_points: Vec<MethodRef>) {
        self.entry_points = entry_points;
    }

    pub fn add_entry_point(&mut self, m: MethodRef) {
        if !self.entry_points.contains(&m) {
            self.entry_points.push(m);
        }
    }

    /// Methods invoked directly from the body of `m`, resolved through the
    /// superclass chain, in first-call order
    pub fn callees_of(&self, m: &MethodRef) -> IrResult<Vec<MethodRef>> {
        let body = self.body(m)?;
        let mut callees: Vec<MethodRef> = Vec::new();
        for expr in body.statements().filter_map(|it| it.invoke_expr()) {
            let target = &expr.method;
            let Some((cls, def)) = self.resolve_method(target.class.as_str(), &target.sig) else {
                debug!("callee {} of {} is not in the scene", target, m);
                continue;
            };
            let resolved = cls.method_ref(&def.sig);
            if !callees.contains(&resolved) {
                callees.push(resolved);
            }
        }
        Ok(callees)
    }

    /// Whether `child` is `parent` or inherits from it through superclasses
    /// or interfaces known to the scene
    pub fn is_subclass_of(&self, child: &str, parent: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![child];
        while let Some(name) = pending.pop() {
            if name == parent {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            let Some(cls) = self.class(name) else {
                continue;
            };
            if let Some(sup) = &cls.superclass {
                pending.push(sup.as_str());
            }
            pending.extend(cls.interfaces.iter().map(|it| it.as_str()));
        }
        false
    }

    /// Load every `.jimple` file found under `dir`
    pub fn load_dir(dir: &Path) -> crate::Result<Self> {
        let mut scene = Self::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| crate::Error::new_generic(&e))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !path_has_ext(path, JIMPLE_EXT) {
                continue;
            }
            scene.load_file(path)?;
        }
        info!("loaded {} classes from {}", scene.len(), path_must_str(dir));
        Ok(scene)
    }

    pub fn load_file(&mut self, path: &Path) -> crate::Result<&ClassDef> {
        let text = read_file(path)?;
        let class = parse_class(&text).map_err(|e| {
            crate::Error::Generic(format!("{}: {}", path_must_str(path), e))
        })?;
        debug!("loaded {} from {}", class.name, path_must_str(path));
        let name = class.name.clone();
        self.add_class(class);
        self.class(name.as_str())
            .ok_or_else(|| IrError::UnknownClass(name.to_string()).into())
    }

    /// Write a single class to `<dir>/<name>.jimple`
    pub fn write_class(&self, name: &str, dir: &Path) -> crate::Result<PathBuf> {
        let class = self
            .class(name)
            .ok_or_else(|| IrError::UnknownClass(name.into()))?;
        ensure_dir_exists(dir)?;
        let path = dir.join(format!("{}.{}", class.name, JIMPLE_EXT));
        fs::write(&path, class.to_string())?;
        Ok(path)
    }

    /// Write every class in the scene to `dir`
    pub fn dump_dir(&self, dir: &Path) -> crate::Result<usize> {
        let mut count = 0;
        for class in self.classes() {
            self.write_class(class.name.as_str(), dir)?;
            count += 1;
        }
        info!("wrote {} classes to {}", count, path_must_str(dir));
        Ok(count)
    }
}
