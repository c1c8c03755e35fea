//! Generic traversals over expressions and statement lists.
use super::{
    expr::{Callee, Expr, ExprKind, Stmt, StmtKind},
    Program, Qualifiers, VarId,
};
use crate::glsl::intrinsics::intrinsic_out_arguments;

/// Direct sub-expressions of `e`, in evaluation order.
pub fn children(e: &Expr) -> Vec<&Expr> {
    match &e.kind {
        ExprKind::Literal(_) | ExprKind::Var(_) => vec![],
        ExprKind::Call { args, .. } => args.iter().collect(),
        ExprKind::Method { object, args, .. } => {
            let mut v = vec![object.as_ref()];
            v.extend(args.iter());
            v
        }
        ExprKind::Field { base, .. } | ExprKind::Swizzle { base, .. } => vec![base],
        ExprKind::Index { base, index } => vec![base, index],
        ExprKind::Unary { operand, .. } => vec![operand],
        ExprKind::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        ExprKind::Assign { target, value, .. } => vec![target, value],
        ExprKind::Conditional {
            cond,
            then,
            otherwise,
        } => vec![cond, then, otherwise],
        ExprKind::Cast { expr, .. } | ExprKind::Paren(expr) => vec![expr],
        ExprKind::InitList(items) => items.iter().collect(),
    }
}

pub fn children_mut(e: &mut Expr) -> Vec<&mut Expr> {
    match &mut e.kind {
        ExprKind::Literal(_) | ExprKind::Var(_) => vec![],
        ExprKind::Call { args, .. } => args.iter_mut().collect(),
        ExprKind::Method { object, args, .. } => {
            let mut v = vec![object.as_mut()];
            v.extend(args.iter_mut());
            v
        }
        ExprKind::Field { base, .. } | ExprKind::Swizzle { base, .. } => vec![base],
        ExprKind::Index { base, index } => vec![base, index],
        ExprKind::Unary { operand, .. } => vec![operand],
        ExprKind::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        ExprKind::Assign { target, value, .. } => vec![target, value],
        ExprKind::Conditional {
            cond,
            then,
            otherwise,
        } => vec![cond, then, otherwise],
        ExprKind::Cast { expr, .. } | ExprKind::Paren(expr) => vec![expr],
        ExprKind::InitList(items) => items.iter_mut().collect(),
    }
}

/// Pre-order walk over `e` and all of its sub-expressions.
pub fn walk_expr<'a>(e: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(e);
    for c in children(e) {
        walk_expr(c, f);
    }
}

/// Post-order mutable walk, children are visited before their parent.
pub fn walk_expr_mut(e: &mut Expr, f: &mut impl FnMut(&mut Expr)) {
    for c in children_mut(e) {
        walk_expr_mut(c, f);
    }
    f(e);
}

/// Expressions directly owned by a statement (not by nested statements).
fn stmt_exprs(s: &Stmt) -> Vec<&Expr> {
    match &s.kind {
        StmtKind::Expr(e) => vec![e],
        StmtKind::If { cond, .. } | StmtKind::While { cond, .. } | StmtKind::DoWhile { cond, .. } => vec![cond],
        StmtKind::For { cond, step, .. } => cond.iter().chain(step.iter()).collect(),
        StmtKind::Return(Some(e)) => vec![e],
        _ => vec![],
    }
}

/// Nested statements of `s`
pub fn sub_stmts(s: &Stmt) -> Vec<&Stmt> {
    match &s.kind {
        StmtKind::Block(stmts) => stmts.iter().collect(),
        StmtKind::If {
            then, otherwise, ..
        } => {
            let mut v = vec![then.as_ref()];
            v.extend(otherwise.as_deref());
            v
        }
        StmtKind::For { init, body, .. } => {
            let mut v: Vec<&Stmt> = init.iter().map(|s| s.as_ref()).collect();
            v.push(body);
            v
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => vec![body],
        _ => vec![],
    }
}

pub fn sub_stmts_mut(s: &mut Stmt) -> Vec<&mut Stmt> {
    match &mut s.kind {
        StmtKind::Block(stmts) => stmts.iter_mut().collect(),
        StmtKind::If {
            then, otherwise, ..
        } => {
            let mut v = vec![then.as_mut()];
            v.extend(otherwise.as_deref_mut());
            v
        }
        StmtKind::For { init, body, .. } => {
            let mut v: Vec<&mut Stmt> = init.iter_mut().map(|s| s.as_mut()).collect();
            v.push(body);
            v
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => vec![body],
        _ => vec![],
    }
}

/// Pre-order walk over statements
pub fn walk_stmts<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for s in stmts {
        f(s);
        for sub in sub_stmts(s) {
            walk_stmts(std::slice::from_ref(sub), f);
        }
    }
}

/// Visit every expression reachable from `stmts`, including initializers of declared locals.
pub fn walk_stmt_exprs<'a>(program: &'a Program, stmts: &'a [Stmt], f: &mut impl FnMut(&'a Expr)) {
    walk_stmts(stmts, &mut |s| {
        if let StmtKind::Decl(vars) = &s.kind {
            for v in vars {
                if let Some(init) = &program.var(*v).initializer {
                    walk_expr(init, f);
                }
            }
        }
        for e in stmt_exprs(s) {
            walk_expr(e, f);
        }
    });
}

/// Mutable post-order walk over every expression owned by `stmts`.
/// Initializers of declared locals live in the arena and are not visited.
pub fn walk_stmt_exprs_mut(stmts: &mut [Stmt], f: &mut impl FnMut(&mut Expr)) {
    for s in stmts.iter_mut() {
        match &mut s.kind {
            StmtKind::Expr(e) => walk_expr_mut(e, f),
            StmtKind::If { cond, .. } | StmtKind::While { cond, .. } | StmtKind::DoWhile { cond, .. } => {
                walk_expr_mut(cond, f)
            }
            StmtKind::For { cond, step, .. } => {
                if let Some(c) = cond {
                    walk_expr_mut(c, f);
                }
                if let Some(st) = step {
                    walk_expr_mut(st, f);
                }
            }
            StmtKind::Return(Some(e)) => walk_expr_mut(e, f),
            _ => {}
        }
        for sub in sub_stmts_mut(s) {
            walk_stmt_exprs_mut(std::slice::from_mut(sub), f);
        }
    }
}

/// Locals declared anywhere inside `stmts`
pub fn declared_locals(stmts: &[Stmt]) -> Vec<VarId> {
    let mut out = vec![];
    walk_stmts(stmts, &mut |s| {
        if let StmtKind::Decl(vars) = &s.kind {
            out.extend(vars.iter().copied());
        }
    });
    out
}

/// Variables written within `stmts`: assignment and increment targets, arguments bound
/// to `out`/`inout` parameters of user functions and the output slots of intrinsics such
/// as `sincos`. Every argument of `GetDimensions` counts as written.
pub fn assigned_vars(program: &Program, stmts: &[Stmt]) -> Vec<VarId> {
    let mut out = vec![];
    walk_stmt_exprs(program, stmts, &mut |e| match &e.kind {
        ExprKind::Assign { target, .. } => out.extend(target.root_var()),
        ExprKind::Unary { op, operand } if op.writes_operand() => out.extend(operand.root_var()),
        ExprKind::Call {
            callee: Callee::Function(f),
            args,
        } => {
            let params = &program.function(*f).params;
            for (arg, p) in args.iter().zip(params) {
                if program.var(*p).qualifiers.contains(Qualifiers::OUT) {
                    out.extend(arg.root_var());
                }
            }
        }
        ExprKind::Call {
            callee: Callee::Intrinsic(name),
            args,
        } => {
            for &i in intrinsic_out_arguments(name) {
                out.extend(args.get(i).and_then(Expr::root_var));
            }
        }
        ExprKind::Method { method, args, .. } if method == "GetDimensions" => {
            out.extend(args.iter().filter_map(Expr::root_var));
        }
        _ => {}
    });
    out
}

/// Whether `stmts` contain a `break`/`continue` that targets the enclosing loop, i.e. one
/// that is not nested in an inner loop.
pub fn contains_jump(stmts: &[Stmt], want_break: bool) -> bool {
    stmts.iter().any(|s| match &s.kind {
        StmtKind::Break => want_break,
        StmtKind::Continue => !want_break,
        StmtKind::For { .. } | StmtKind::While { .. } | StmtKind::DoWhile { .. } => false,
        _ => sub_stmts(s)
            .into_iter()
            .any(|sub| contains_jump(std::slice::from_ref(sub), want_break)),
    })
}

/// User functions called from an expression
pub fn called_functions(e: &Expr, out: &mut Vec<super::FuncId>) {
    walk_expr(e, &mut |e| {
        if let ExprKind::Call {
            callee: Callee::Function(f),
            ..
        } = &e.kind
        {
            out.push(*f);
        }
    });
}

/// Pre-order mutable walk over statements
pub fn walk_stmts_mut(stmts: &mut [Stmt], f: &mut impl FnMut(&mut Stmt)) {
    for s in stmts.iter_mut() {
        f(s);
        for sub in sub_stmts_mut(s) {
            walk_stmts_mut(std::slice::from_mut(sub), f);
        }
    }
}
