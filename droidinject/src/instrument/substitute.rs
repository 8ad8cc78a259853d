use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Serialize;

use crate::ir::{
    Body, EditLog, InvokeExpr, InvokeKind, IrResult, MethodRef, Scene, Stmt, StmtId, Type, Value,
};

pub const REPLACED_PREFIX: &str = "replaced_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The allocation result is not stored in a local
    NonLocalTarget,
    /// The allocation target or constructor receiver is not a retyped local
    MissingLocal,
    /// The rewritten constructor does not exist on the replacement class
    UnresolvedConstructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipDiagnostic {
    pub stmt: String,
    pub reason: SkipReason,
}

/// Outcome of replacing a class by another one in a single body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    /// Retyped locals as `(old name, new name)`
    pub renamed: Vec<(String, String)>,
    /// Allocations and constructor calls that now use the replacement
    pub rewritten: usize,
    /// Other statements mentioning the replaced class, left as they were
    pub untouched: usize,
    pub skipped: Vec<SkipDiagnostic>,
    pub warnings: Vec<String>,
}

impl SubstitutionReport {
    fn warn(&mut self, msg: String) {
        warn!("{}", msg);
        self.warnings.push(msg);
    }

    fn skip(&mut self, stmt: &Stmt, reason: SkipReason) {
        warn!("not rewriting `{}`: {:?}", stmt, reason);
        self.skipped.push(SkipDiagnostic {
            stmt: stmt.to_string(),
            reason,
        });
    }
}

fn check_replacement(scene: &Scene, old: &str, new: &str, report: &mut SubstitutionReport) {
    match scene.class(new) {
        None => report.warn(format!("replacement class {} is not in the scene", new)),
        Some(cls) => {
            if cls.is_abstract() {
                report.warn(format!("replacement class {} is abstract", new));
            }
            if !scene.is_subclass_of(new, old) {
                report.warn(format!("{} is not a subclass of {}", new, old));
            }
        }
    }
}

/// Rewrite a `specialinvoke` mentioning `old` to target `new`
fn rewrite_special(
    stmt: &Stmt,
    expr: &InvokeExpr,
    scene: &Scene,
    old: &str,
    new: &str,
    retyped: &HashSet<String>,
) -> Result<Stmt, SkipReason> {
    let target = MethodRef::parse(&expr.method.to_string().replace(old, new))
        .map_err(|_| SkipReason::UnresolvedConstructor)?;
    if scene.method(&target).is_none() {
        debug!("{} has no method {} for `{}`", new, target, stmt);
        return Err(SkipReason::UnresolvedConstructor);
    }
    let base = expr
        .base
        .as_ref()
        .filter(|it| retyped.contains(it.as_str()))
        .ok_or(SkipReason::MissingLocal)?;
    Ok(Stmt::Invoke(InvokeExpr::new_special(
        base.as_str(),
        target,
        expr.args.clone(),
    )))
}

/// Replace uses of class `old` in `body` by class `new`
///
/// Locals typed `old` are renamed with the `replaced_` prefix and retyped,
/// allocations into them become allocations of `new` and their constructor
/// calls are redirected to `new`. An allocation only changes together with
/// its constructor call, so both stay on `old` when the constructor does not
/// resolve on `new`. Statements that can't be rewritten are reported and
/// kept.
pub fn replace_type(
    body: &mut Body,
    scene: &Scene,
    old: &str,
    new: &str,
) -> IrResult<SubstitutionReport> {
    info!("replacing {} by {} in {}", old, new, body.method());
    let mut report = SubstitutionReport::default();
    check_replacement(scene, old, new, &mut report);

    let to_rename: Vec<String> = body
        .locals()
        .iter()
        .filter(|it| it.ty.is_class(old))
        .map(|it| it.name.clone())
        .collect();
    let mut retyped = HashSet::new();
    for name in to_rename {
        let renamed = format!("{}{}", REPLACED_PREFIX, name);
        body.retype_local(&name, &renamed, Type::class(new))?;
        debug!("retyped local {} as {} {}", name, new, renamed);
        retyped.insert(renamed.clone());
        report.renamed.push((name, renamed));
    }

    // allocations waiting for their constructor call, by local
    let mut pending: HashMap<String, (StmtId, Stmt)> = HashMap::new();
    let mut log = EditLog::new();
    for (id, stmt) in body.snapshot() {
        if !stmt.mentions(old) {
            continue;
        }
        match &stmt {
            Stmt::Assign {
                lhs,
                rhs: Value::New(cn),
            } if cn == old => match lhs {
                Value::Local(name) if retyped.contains(name) => {
                    let alloc = Stmt::assign(name.as_str(), Value::New(new.into()));
                    if let Some((prev, replacement)) = pending.insert(name.clone(), (id, alloc)) {
                        log.replace(prev, replacement);
                        report.rewritten += 1;
                    }
                }
                Value::Local(_) => report.skip(&stmt, SkipReason::MissingLocal),
                _ => report.skip(&stmt, SkipReason::NonLocalTarget),
            },
            Stmt::Invoke(expr) if expr.kind == InvokeKind::Special && expr.method.class == old => {
                let alloc = expr.base.as_ref().and_then(|it| pending.remove(it.as_str()));
                match rewrite_special(&stmt, expr, scene, old, new, &retyped) {
                    Ok(replacement) => {
                        log.replace(id, replacement);
                        report.rewritten += 1;
                        if let Some((alloc_id, alloc)) = alloc {
                            log.replace(alloc_id, alloc);
                            report.rewritten += 1;
                        }
                    }
                    Err(reason) => {
                        report.skip(&stmt, reason);
                        if let Some(base) = expr.base.as_ref().filter(|_| alloc.is_some()) {
                            report.warn(format!(
                                "allocation into {} keeps {} since its constructor was not rewritten",
                                base, old
                            ));
                        }
                    }
                }
            }
            _ => {
                debug!("leaving `{}` untouched", stmt);
                report.untouched += 1;
            }
        }
    }
    for (_, (id, alloc)) in pending {
        debug!("allocation `{}` has no constructor call in this body", alloc);
        log.replace(id, alloc);
        report.rewritten += 1;
    }
    log.commit(body)?;

    info!(
        "{}: {} locals retyped, {} statements rewritten, {} skipped",
        body.method(),
        report.renamed.len(),
        report.rewritten,
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::{parse_body, parse_class};
    use rstest::*;

    const TRACKER: &str = r#"public class com.example.Tracker extends java.lang.Object
{
    public void <init>()
    {
        return;
    }

    public void <init>(int)
    {
        return;
    }
}
"#;

    const LOGGING_TRACKER: &str = r#"public class com.example.LoggingTracker extends com.example.Tracker
{
    public void <init>()
    {
        return;
    }
}
"#;

    const ABSTRACT_TRACKER: &str = r#"public abstract class com.example.AbstractTracker extends java.lang.Object
{
}
"#;

    const BODY: &str = r#"
        com.example.Main r0;
        com.example.Tracker $r1, $r2;
        java.lang.Object $r3;

        r0 := @this: com.example.Main;
        $r1 = new com.example.Tracker;
        specialinvoke $r1.<com.example.Tracker: void <init>()>();
        $r2 = new com.example.Tracker;
        specialinvoke $r2.<com.example.Tracker: void <init>(int)>(5);
        $r3 = new com.example.Tracker;
        r0.<com.example.Main: com.example.Tracker tracker> = new com.example.Tracker;
        r0.<com.example.Main: com.example.Tracker tracker> = $r1;
        virtualinvoke $r1.<com.example.Tracker: void track(java.lang.String)>("start");
        return;
"#;

    #[fixture]
    fn scene() -> Scene {
        let mut scene = Scene::new();
        for text in [TRACKER, LOGGING_TRACKER, ABSTRACT_TRACKER] {
            scene.add_class(parse_class(text).unwrap());
        }
        scene
    }

    #[fixture]
    fn body() -> Body {
        parse_body("<com.example.Main: void onCreate(android.os.Bundle)>", BODY).unwrap()
    }

    fn texts(body: &Body) -> Vec<String> {
        body.statements().map(|it| it.to_string()).collect()
    }

    #[rstest]
    fn test_replace_type(scene: Scene, mut body: Body) {
        let before = body.len();
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Tracker",
            "com.example.LoggingTracker",
        )
        .unwrap();

        assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
        assert!(report.warnings[0].contains("replaced_$r2"));
        assert_eq!(
            report.renamed,
            vec![
                ("$r1".to_string(), "replaced_$r1".to_string()),
                ("$r2".to_string(), "replaced_$r2".to_string()),
            ]
        );
        assert_eq!(report.rewritten, 2);
        assert_eq!(report.untouched, 2);
        let reasons: Vec<SkipReason> = report.skipped.iter().map(|it| it.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::UnresolvedConstructor,
                SkipReason::MissingLocal,
                SkipReason::NonLocalTarget,
            ]
        );

        assert_eq!(body.len(), before);
        assert!(body
            .locals()
            .iter()
            .all(|it| !it.ty.is_class("com.example.Tracker")));
        assert_eq!(
            body.local("replaced_$r1").unwrap().ty,
            Type::class("com.example.LoggingTracker")
        );

        let text = texts(&body);
        assert_eq!(text[1], "replaced_$r1 = new com.example.LoggingTracker");
        assert_eq!(
            text[2],
            "specialinvoke replaced_$r1.<com.example.LoggingTracker: void <init>()>()"
        );
        // no `<init>(int)` on the replacement, the pair stays on the old class
        assert_eq!(text[3], "replaced_$r2 = new com.example.Tracker");
        assert_eq!(
            text[4],
            "specialinvoke replaced_$r2.<com.example.Tracker: void <init>(int)>(5)"
        );
        assert_eq!(text[5], "$r3 = new com.example.Tracker");
        assert_eq!(
            text[8],
            "virtualinvoke replaced_$r1.<com.example.Tracker: void track(java.lang.String)>(\"start\")"
        );
    }

    #[rstest]
    fn test_warnings_for_bad_replacement(scene: Scene, mut body: Body) {
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Tracker",
            "com.example.AbstractTracker",
        )
        .unwrap();
        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings[0].contains("abstract"));
        assert!(report.warnings[1].contains("not a subclass"));
        assert!(report.warnings[2..]
            .iter()
            .all(|it| it.contains("constructor was not rewritten")));
        assert_eq!(report.rewritten, 0);

        let mut body = parse_body("<com.example.Main: void run()>", BODY).unwrap();
        let report = replace_type(&mut body, &scene, "com.example.Tracker", "com.example.Gone").unwrap();
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings[0].contains("not in the scene"));
        assert_eq!(report.renamed.len(), 2);
    }

    #[rstest]
    fn test_unused_class(scene: Scene, mut body: Body) {
        let before = texts(&body);
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Unused",
            "com.example.LoggingTracker",
        )
        .unwrap();
        assert!(report.renamed.is_empty());
        assert_eq!(report.rewritten, 0);
        assert_eq!(texts(&body), before);
    }

    #[rstest]
    fn test_single_allocation_is_fully_replaced(scene: Scene) {
        let mut body = parse_body(
            "<com.example.Main: void run()>",
            r#"
        com.example.Tracker x;

        x = new com.example.Tracker;
        specialinvoke x.<com.example.Tracker: void <init>()>();
        return;
"#,
        )
        .unwrap();
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Tracker",
            "com.example.LoggingTracker",
        )
        .unwrap();

        assert!(report.skipped.is_empty());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(body.statements().all(|it| !it.mentions("com.example.Tracker")));
        let text = texts(&body);
        assert_eq!(
            text.iter()
                .filter(|it| *it == "replaced_x = new com.example.LoggingTracker")
                .count(),
            1
        );
        assert_eq!(
            text,
            vec![
                "replaced_x = new com.example.LoggingTracker",
                "specialinvoke replaced_x.<com.example.LoggingTracker: void <init>()>()",
                "return",
            ]
        );
    }

    #[rstest]
    fn test_unresolved_constructor_keeps_allocation(scene: Scene) {
        let mut body = parse_body(
            "<com.example.Main: void run()>",
            r#"
        com.example.Tracker $r1;

        $r1 = new com.example.Tracker;
        specialinvoke $r1.<com.example.Tracker: void <init>(int)>(5);
        return;
"#,
        )
        .unwrap();
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Tracker",
            "com.example.LoggingTracker",
        )
        .unwrap();

        assert_eq!(report.rewritten, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::UnresolvedConstructor);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            texts(&body)[..2],
            [
                "replaced_$r1 = new com.example.Tracker",
                "specialinvoke replaced_$r1.<com.example.Tracker: void <init>(int)>(5)",
            ]
        );
    }

    #[rstest]
    fn test_special_call_on_other_class_untouched(scene: Scene) {
        let mut body = parse_body(
            "<com.example.Main: void <init>(com.example.Tracker)>",
            r#"
        com.example.Main r0;
        com.example.Tracker r1;

        r0 := @this: com.example.Main;
        r1 := @parameter0: com.example.Tracker;
        specialinvoke r0.<com.example.Base: void <init>(com.example.Tracker)>(r1);
        return;
"#,
        )
        .unwrap();
        let report = replace_type(
            &mut body,
            &scene,
            "com.example.Tracker",
            "com.example.LoggingTracker",
        )
        .unwrap();

        assert_eq!(report.rewritten, 0);
        assert!(report.skipped.is_empty());
        assert_eq!(
            texts(&body)[2],
            "specialinvoke r0.<com.example.Base: void <init>(com.example.Tracker)>(replaced_r1)"
        );
    }
}
