use std::collections::BTreeSet;

use itertools::Itertools;
use log::{debug, info};

use super::ListenerRegistry;
use crate::ir::{ClassDef, FieldDef, IrError, MethodRef, MethodSig, Scene, Type};
use crate::layout::HandlerSource;
use crate::utils::ClassName;
use crate::Error;

pub const CREATION_SIGNATURE: &str = "void onCreate(android.os.Bundle)";
pub const BUNDLE_CLASS: &str = "android.os.Bundle";

/// Subsignature of the activity creation callback
pub fn creation_signature() -> MethodSig {
    MethodSig::new(Type::Void, "onCreate", vec![Type::class(BUNDLE_CLASS)])
}

/// What has to be called from the creation method
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub creation: MethodRef,
    /// Fields of the creation method's class typed with a registered
    /// listener interface, in declaration order
    pub listener_fields: Vec<FieldDef>,
    /// Declarative handlers declared on the creation method's class, sorted
    pub handlers: Vec<MethodSig>,
}

impl Lifecycle {
    pub fn class(&self) -> &ClassName {
        &self.creation.class
    }

    pub fn is_empty(&self) -> bool {
        self.listener_fields.is_empty() && self.handlers.is_empty()
    }
}

/// Find the method the calls are injected into
///
/// Entry points with subsignature `sig` win. Otherwise the direct callees
/// of the first entry point are searched, which is where a synthetic dummy
/// main ends up calling the real activity.
pub fn find_creation_method(scene: &Scene, sig: &MethodSig) -> crate::Result<MethodRef> {
    if let Some(m) = scene.entry_points().iter().find(|it| &it.sig == sig) {
        debug!("creation method {} is an entry point", m);
        return Ok(m.clone());
    }

    if let Some(first) = scene.entry_points().first() {
        let callees = match scene.callees_of(first) {
            Ok(v) => v,
            Err(e) => {
                debug!("no callees for entry point {}: {}", first, e);
                Vec::new()
            }
        };
        if let Some(m) = callees.into_iter().find(|it| &it.sig == sig) {
            debug!("creation method {} is called from {}", m, first);
            return Ok(m);
        }
    }

    log::error!(
        "none of the {} entry points is or calls {}",
        scene.entry_points().len(),
        sig
    );
    Err(Error::NoCreationMethod(sig.to_string()))
}

/// Fields of `class` whose declared type is a registered listener interface
pub fn listener_fields(class: &ClassDef, registry: &ListenerRegistry) -> Vec<FieldDef> {
    class
        .fields
        .iter()
        .filter(|it| {
            it.ty
                .class_name()
                .map_or(false, |cn| registry.contains(cn.as_str()))
        })
        .cloned()
        .collect()
}

/// Keep the handlers declared on `class`
pub fn resolve_handlers(class: &ClassDef, handlers: BTreeSet<MethodSig>) -> Vec<MethodSig> {
    handlers
        .into_iter()
        .filter(|sig| {
            let found = class.method(sig).is_some();
            if !found {
                debug!("handler {} is not declared on {}, dropping", sig, class.name);
            }
            found
        })
        .collect()
}

/// Locate the creation method and collect the listener fields and
/// declarative handlers to call from it
pub fn discover(
    scene: &Scene,
    registry: &ListenerRegistry,
    source: &dyn HandlerSource,
    sig: &MethodSig,
) -> crate::Result<Lifecycle> {
    let creation = find_creation_method(scene, sig)?;
    let class = scene
        .class(creation.class.as_str())
        .ok_or_else(|| IrError::UnknownClass(creation.class.to_string()))?;

    let listener_fields = listener_fields(class, registry);
    let handlers = resolve_handlers(class, source.handlers()?);
    debug!(
        "listener fields [{}], handlers [{}]",
        listener_fields.iter().map(|it| &it.name).join(", "),
        handlers.iter().join(", ")
    );

    info!(
        "{}: {} listener fields, {} declarative handlers",
        creation,
        listener_fields.len(),
        handlers.len()
    );

    Ok(Lifecycle {
        creation,
        listener_fields,
        handlers,
    })
}
