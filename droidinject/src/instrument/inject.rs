use log::{debug, info, warn};
use serde::Serialize;

use super::{discover, Lifecycle, ListenerRegistry};
use crate::ir::{
    Body, Constant, FieldDef, InvokeExpr, MethodRef, MethodSig, Scene, Stmt, Type, Value,
    CONSTRUCTOR_NAME,
};
use crate::layout::HandlerSource;
use crate::utils::ClassName;
use crate::Error;

pub const CONTEXT_CLASS: &str = "android.content.Context";
pub const STRING_CLASS: &str = "java.lang.String";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InjectionReport {
    pub method: MethodRef,
    /// Listener fields whose callbacks are now invoked
    pub fields: Vec<String>,
    pub handlers: Vec<MethodSig>,
    pub context_local: String,
    /// The context local had to be obtained through `getApplicationContext`
    pub generated_context: bool,
    /// Number of statements added before the terminal return
    pub inserted: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InjectionOutcome {
    Injected(InjectionReport),
    NothingToInject,
    Skipped { reason: String },
}

fn application_context_ref() -> MethodRef {
    MethodRef::new(
        CONTEXT_CLASS,
        MethodSig::new(Type::class(CONTEXT_CLASS), "getApplicationContext", vec![]),
    )
}

/// Last declared local typed as a context
fn context_local(body: &Body) -> Option<String> {
    body.locals()
        .iter()
        .rev()
        .find(|it| it.ty.is_class(CONTEXT_CLASS))
        .map(|it| it.name.clone())
}

/// Builds the statements of one injection, allocating locals as it goes
struct CallBuilder<'a> {
    body: &'a mut Body,
    scene: &'a Scene,
    this: String,
    context: String,
    stmts: Vec<Stmt>,
}

impl<'a> CallBuilder<'a> {
    /// New object of `class` built through its context or no-arg
    /// constructor, `None` if the class can't be instantiated that way
    fn construct(&mut self, class: &str) -> Option<Value> {
        let scene = self.scene;
        let def = scene.class(class)?;
        if def.is_abstract() {
            return None;
        }
        let with_context = MethodSig::new(
            Type::Void,
            CONSTRUCTOR_NAME,
            vec![Type::class(CONTEXT_CLASS)],
        );
        let no_args = MethodSig::new(Type::Void, CONSTRUCTOR_NAME, vec![]);
        let (sig, args) = if def.method(&with_context).is_some() {
            (with_context, vec![Value::local(self.context.as_str())])
        } else if def.method(&no_args).is_some() {
            (no_args, vec![])
        } else {
            return None;
        };

        let ctor = def.method_ref(&sig);
        let local = self.body.generate_local(Type::Ref(def.name.clone()));
        self.stmts
            .push(Stmt::assign(local.name.as_str(), Value::New(def.name.clone())));
        self.stmts.push(Stmt::Invoke(InvokeExpr::new_special(
            local.name.as_str(),
            ctor,
            args,
        )));
        Some(Value::Local(local.name))
    }

    fn placeholder(&mut self, ty: &Type) -> Value {
        if ty.is_primitive() {
            return Constant::default_for(ty).into();
        }
        if ty.is_class(STRING_CLASS) {
            return Constant::Str(String::new()).into();
        }
        if ty.is_class(CONTEXT_CLASS) {
            return Value::local(self.context.as_str());
        }
        match ty.class_name() {
            Some(cn) => self
                .construct(cn.as_str())
                .unwrap_or(Value::Const(Constant::Null)),
            None => Value::Const(Constant::Null),
        }
    }

    fn placeholders(&mut self, sig: &MethodSig) -> Vec<Value> {
        sig.params.iter().map(|it| self.placeholder(it)).collect()
    }

    fn call_listener(&mut self, class: &ClassName, field: &FieldDef, registry: &ListenerRegistry) {
        let Some(iface) = field.ty.class_name() else {
            return;
        };
        let local = self.body.generate_local(field.ty.clone());
        let field_ref = field.field_ref(class);
        let load = if field.is_static() {
            Value::StaticField(field_ref)
        } else {
            Value::InstanceField {
                base: self.this.clone(),
                field: field_ref,
            }
        };
        self.stmts.push(Stmt::assign(local.name.as_str(), load));

        for callback in registry.callbacks(iface.as_str()) {
            let args = self.placeholders(callback);
            let target = MethodRef::new(iface.clone(), callback.clone());
            self.stmts.push(Stmt::Invoke(InvokeExpr::new_interface(
                local.name.as_str(),
                target,
                args,
            )));
        }
    }

    fn call_handler(&mut self, class: &ClassName, sig: &MethodSig) {
        let args = self.placeholders(sig);
        let target = MethodRef::new(class.clone(), sig.clone());
        self.stmts.push(Stmt::Invoke(InvokeExpr::new_virtual(
            self.this.as_str(),
            target,
            args,
        )));
    }
}

fn inject_into(
    body: &mut Body,
    scene: &Scene,
    lifecycle: &Lifecycle,
    registry: &ListenerRegistry,
) -> crate::Result<InjectionReport> {
    let method = body.method().clone();
    let anchor = body
        .terminal_return()
        .ok_or_else(|| Error::NoTerminalReturn(method.to_string()))?;
    let this = body
        .this_local()
        .ok_or_else(|| Error::NoThisLocal(method.to_string()))?
        .name
        .clone();

    let mut stmts = Vec::new();
    let (context, generated_context) = match context_local(body) {
        Some(name) => (name, false),
        None => {
            let local = body.generate_local(Type::class(CONTEXT_CLASS));
            stmts.push(Stmt::assign(
                local.name.as_str(),
                Value::Invoke(InvokeExpr::new_virtual(
                    this.as_str(),
                    application_context_ref(),
                    vec![],
                )),
            ));
            debug!("generated context local {} in {}", local.name, method);
            (local.name, true)
        }
    };

    let mut builder = CallBuilder {
        body,
        scene,
        this,
        context: context.clone(),
        stmts,
    };
    for field in lifecycle.listener_fields.iter() {
        builder.call_listener(lifecycle.class(), field, registry);
    }
    for sig in lifecycle.handlers.iter() {
        builder.call_handler(lifecycle.class(), sig);
    }

    let CallBuilder { body, stmts, .. } = builder;
    for stmt in stmts.iter() {
        debug!("{}: {}", method, stmt);
    }
    let inserted = body.insert_before(anchor, stmts)?.len();

    Ok(InjectionReport {
        method,
        fields: lifecycle
            .listener_fields
            .iter()
            .map(|it| it.name.clone())
            .collect(),
        handlers: lifecycle.handlers.clone(),
        context_local: context,
        generated_context,
        inserted,
    })
}

/// Call every listener callback and declarative handler of `lifecycle`
/// right before the terminal return of its creation method
///
/// The body is only replaced once every call has been built.
pub fn inject(
    scene: &mut Scene,
    lifecycle: &Lifecycle,
    registry: &ListenerRegistry,
) -> crate::Result<InjectionOutcome> {
    if lifecycle.is_empty() {
        info!("nothing to inject into {}", lifecycle.creation);
        return Ok(InjectionOutcome::NothingToInject);
    }
    let report = scene.rewrite_body(&lifecycle.creation, |body, scene| {
        inject_into(body, scene, lifecycle, registry)
    })?;
    info!(
        "injected {} statements into {}",
        report.inserted, report.method
    );
    Ok(InjectionOutcome::Injected(report))
}

/// Discover the creation method of the scene and inject the lifecycle calls
///
/// A failing handler source skips the injection without touching the scene.
pub fn insert_calls_to_lifecycle_methods(
    scene: &mut Scene,
    registry: &ListenerRegistry,
    handlers: &dyn HandlerSource,
    sig: &MethodSig,
) -> crate::Result<InjectionOutcome> {
    let lifecycle = match discover(scene, registry, handlers, sig) {
        Ok(v) => v,
        Err(Error::Layout(e)) => {
            warn!("skipping lifecycle injection: {}", e);
            return Ok(InjectionOutcome::Skipped {
                reason: e.to_string(),
            });
        }
        Err(e) => return Err(e),
    };
    inject(scene, &lifecycle, registry)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instrument::creation_signature;
    use crate::ir::parse_class;
    use crate::layout::{on_click_signature, LayoutError};
    use crate::testing::MockHandlerSource;
    use rstest::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    const MAIN: &str = r#"public class com.example.Main extends android.app.Activity
{
    private android.view.View$OnClickListener clickListener;
    private java.lang.Runnable task;
    static android.view.View$OnKeyListener keys;

    public void onCreate(android.os.Bundle)
    {
        com.example.Main r0;
        android.os.Bundle r1;
        int i0;

        r0 := @this: com.example.Main;
        r1 := @parameter0: android.os.Bundle;
        i0 = virtualinvoke r0.<com.example.Main: int pick()>();
        if i0 == 0 goto label1;
        return;

     label1:
        specialinvoke r0.<android.app.Activity: void onCreate(android.os.Bundle)>(r1);
        return;
    }

    public void onGo(android.view.View)
    {
        return;
    }

    public void onPick(com.example.Model,java.lang.String,long)
    {
        return;
    }

    public int pick()
    {
        return 1;
    }
}
"#;

    const MODEL: &str = r#"public class com.example.Model extends java.lang.Object
{
    public void <init>(android.content.Context)
    {
        return;
    }
}
"#;

    const WITH_CONTEXT: &str = r#"public class com.example.Other extends android.app.Activity
{
    private android.view.View$OnClickListener clickListener;

    public void onCreate(android.os.Bundle)
    {
        com.example.Other r0;
        android.content.Context r1, r2;

        r0 := @this: com.example.Other;
        r1 = virtualinvoke r0.<android.app.Activity: android.content.Context getBaseContext()>();
        r2 = r1;
        return;
    }
}
"#;

    const NO_RETURN: &str = r#"public class com.example.Broken extends android.app.Activity
{
    private android.view.View$OnClickListener clickListener;

    public void onCreate(android.os.Bundle)
    {
        com.example.Broken r0;

        r0 := @this: com.example.Broken;
        throw null;
    }
}
"#;

    fn on_create(class: &str) -> MethodRef {
        MethodRef::new(class, creation_signature())
    }

    #[fixture]
    fn scene() -> Scene {
        let mut scene = Scene::new();
        for text in [MAIN, MODEL, WITH_CONTEXT, NO_RETURN] {
            scene.add_class(parse_class(text).unwrap());
        }
        scene.set_entry_points(vec![on_create("com.example.Main")]);
        scene
    }

    fn texts(scene: &Scene, m: &MethodRef) -> Vec<String> {
        scene
            .body(m)
            .unwrap()
            .statements()
            .map(|it| it.to_string())
            .collect()
    }

    fn sources(names: &[&str]) -> BTreeSet<MethodSig> {
        let mut set: BTreeSet<MethodSig> = names.iter().map(|it| on_click_signature(it)).collect();
        set.insert(MethodSig::parse("void onPick(com.example.Model,java.lang.String,long)").unwrap());
        set
    }

    #[rstest]
    fn test_inject_before_last_return(mut scene: Scene) {
        let registry = ListenerRegistry::android_view();
        let m = on_create("com.example.Main");
        let before = texts(&scene, &m);

        let outcome = insert_calls_to_lifecycle_methods(
            &mut scene,
            &registry,
            &sources(&["onGo", "onGone"]),
            &creation_signature(),
        )
        .unwrap();
        let report = match outcome {
            InjectionOutcome::Injected(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.fields, vec!["clickListener", "keys"]);
        assert!(report.generated_context);
        assert_eq!(report.context_local, "$r0");

        let after = texts(&scene, &m);
        assert_eq!(after.len(), before.len() + report.inserted);
        assert_eq!(&after[..7], &before[..7]);
        assert_eq!(after.last().unwrap(), "return");
        assert_eq!(after[4], "return");

        let injected = &after[7..after.len() - 1];
        assert_eq!(
            injected,
            &[
                "$r0 = virtualinvoke r0.<android.content.Context: android.content.Context getApplicationContext()>()",
                "$r1 = r0.<com.example.Main: android.view.View$OnClickListener clickListener>",
                "interfaceinvoke $r1.<android.view.View$OnClickListener: void onClick(android.view.View)>(null)",
                "$r2 = <com.example.Main: android.view.View$OnKeyListener keys>",
                "interfaceinvoke $r2.<android.view.View$OnKeyListener: boolean onKey(android.view.View,int,android.view.KeyEvent)>(null, 0, null)",
                "virtualinvoke r0.<com.example.Main: void onGo(android.view.View)>(null)",
                "$r3 = new com.example.Model",
                "specialinvoke $r3.<com.example.Model: void <init>(android.content.Context)>($r0)",
                "virtualinvoke r0.<com.example.Main: void onPick(com.example.Model,java.lang.String,long)>($r3, \"\", 0L)",
            ]
        );
        assert_eq!(report.inserted, injected.len());
        assert!(scene.body(&m).unwrap().local("$r3").is_some());
    }

    #[rstest]
    fn test_reuses_last_context_local(mut scene: Scene) {
        let registry = ListenerRegistry::android_view();
        scene.set_entry_points(vec![on_create("com.example.Other")]);
        let outcome = insert_calls_to_lifecycle_methods(
            &mut scene,
            &registry,
            &BTreeSet::new(),
            &creation_signature(),
        )
        .unwrap();
        match outcome {
            InjectionOutcome::Injected(report) => {
                assert_eq!(report.context_local, "r2");
                assert!(!report.generated_context);
                assert_eq!(report.inserted, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[rstest]
    fn test_nothing_to_inject(mut scene: Scene) {
        let m = on_create("com.example.Main");
        let before = texts(&scene, &m);
        let outcome = insert_calls_to_lifecycle_methods(
            &mut scene,
            &ListenerRegistry::default(),
            &BTreeSet::new(),
            &creation_signature(),
        )
        .unwrap();
        assert_eq!(outcome, InjectionOutcome::NothingToInject);
        assert_eq!(texts(&scene, &m), before);
    }

    #[rstest]
    fn test_handler_failure_skips(mut scene: Scene) {
        let m = on_create("com.example.Main");
        let before = texts(&scene, &m);
        let mut source = MockHandlerSource::new();
        source.expect_handlers().returning(|| {
            Err(LayoutError::Xml(
                PathBuf::from("res/layout/main.xml"),
                "unexpected end".into(),
            ))
        });
        let outcome = insert_calls_to_lifecycle_methods(
            &mut scene,
            &ListenerRegistry::android_view(),
            &source,
            &creation_signature(),
        )
        .unwrap();
        assert!(matches!(outcome, InjectionOutcome::Skipped { .. }));
        assert_eq!(texts(&scene, &m), before);
    }

    #[rstest]
    fn test_missing_return_leaves_body(mut scene: Scene) {
        let m = on_create("com.example.Broken");
        scene.set_entry_points(vec![m.clone()]);
        let before = texts(&scene, &m);
        let res = insert_calls_to_lifecycle_methods(
            &mut scene,
            &ListenerRegistry::android_view(),
            &BTreeSet::new(),
            &creation_signature(),
        );
        assert!(matches!(res, Err(Error::NoTerminalReturn(_))));
        assert_eq!(texts(&scene, &m), before);
        assert_eq!(scene.body(&m).unwrap().locals().len(), 1);
    }

    #[rstest]
    fn test_no_creation_method_is_fatal(mut scene: Scene) {
        scene.set_entry_points(vec![]);
        let res = insert_calls_to_lifecycle_methods(
            &mut scene,
            &ListenerRegistry::android_view(),
            &BTreeSet::new(),
            &creation_signature(),
        );
        assert!(matches!(res, Err(Error::NoCreationMethod(_))));
    }

    #[test]
    fn test_outcome_json() {
        let outcome = InjectionOutcome::Skipped {
            reason: "no res".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"outcome":"skipped","reason":"no res"}"#);
    }
}
