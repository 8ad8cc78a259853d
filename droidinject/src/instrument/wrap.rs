use log::{debug, info};

use crate::ir::{Body, InvokeExpr, IrResult, MethodRef, Stmt, StmtId, Type, Value};

/// Route the first argument of selected invocations through `helper`
///
/// For every invoke statement whose first argument has a type accepted by
/// `predicate`, `$n = staticinvoke <helper>(arg)` is inserted before the
/// call and the call then uses `$n`. Returns the number of wrapped calls.
pub fn wrap_first_argument<P>(body: &mut Body, helper: &MethodRef, predicate: P) -> IrResult<usize>
where
    P: Fn(&Type) -> bool,
{
    let mut targets: Vec<(StmtId, Type)> = Vec::new();
    for (id, stmt) in body.iter() {
        let Stmt::Invoke(expr) = stmt else {
            continue;
        };
        let Some(ty) = expr.args.first().and_then(|it| it.ty(body)) else {
            continue;
        };
        if predicate(&ty) {
            targets.push((id, ty));
        }
    }

    for (id, ty) in targets.iter() {
        let wrapped = body.generate_local(ty.clone());
        let Some(Stmt::Invoke(expr)) = body.get_mut(*id) else {
            continue;
        };
        let original = std::mem::replace(&mut expr.args[0], Value::local(wrapped.name.as_str()));
        debug!("wrapping {} through {} into {}", original, helper, wrapped.name);
        let call = Stmt::assign(
            wrapped.name.as_str(),
            Value::Invoke(InvokeExpr::new_static(helper.clone(), vec![original])),
        );
        body.insert_before(*id, vec![call])?;
    }

    info!(
        "wrapped {} arguments through {} in {}",
        targets.len(),
        helper,
        body.method()
    );
    Ok(targets.len())
}
