//! `for` loops, and the unrolling of `[unroll]` loops with constant bounds.
//!
//! An unrollable loop has the shape `for (i = a; i op b; i += k)` with literal `a`, `b`
//! and `k`, and a body that never writes `i`. Each iteration becomes a copy of the body
//! with `i` replaced by its value. `break` and `continue` become flag variables guarding
//! the rest of the iteration and the following copies.
use std::collections::HashMap;

use crate::{
    ast::{
        display::for_header,
        expr::{Attribute, BinaryOp, Expr, ExprKind, Literal, Stmt, StmtKind, UnaryOp},
        types::{ScalarKind, Type},
        visit::{assigned_vars, contains_jump, sub_stmts_mut},
        VarId,
    },
    error::{ConvertError, SourceSpan},
};

use super::{convert_literal, literal_value, Rewriter};

/// Upper bound on the iterations of an unrolled loop
const MAX_UNROLLED_ITERATIONS: usize = 1024;

pub(super) fn for_loop(
    rw: &mut Rewriter,
    init: Option<Box<Stmt>>,
    cond: Option<Expr>,
    step: Option<Expr>,
    body: Stmt,
    attributes: Vec<Attribute>,
    span: SourceSpan,
) -> Vec<Stmt> {
    let unroll = attributes.iter().any(|a| a.name.eq_ignore_ascii_case("unroll"));
    if unroll && rw.ctx.config.unroll_loops {
        match analyse(rw, init.as_deref(), cond.as_ref(), step.as_ref(), &body) {
            Some(plan) => return unroll_loop(rw, plan, init.map(|i| *i), step, body, span),
            None => {
                let header = for_header(rw.program(), init.as_deref(), cond.as_ref(), step.as_ref());
                rw.ctx.error(ConvertError::NotUnrollable(header), span);
            }
        }
    }
    plain(rw, init, cond, step, body, span)
}

fn plain(
    rw: &mut Rewriter,
    init: Option<Box<Stmt>>,
    cond: Option<Expr>,
    step: Option<Expr>,
    body: Stmt,
    span: SourceSpan,
) -> Vec<Stmt> {
    let mut prefix = vec![];
    let init = match init {
        Some(init) => {
            let mut stmts = rw.stmt(*init);
            if stmts.len() == 1 {
                Some(Box::new(stmts.remove(0)))
            } else {
                prefix = stmts;
                None
            }
        }
        None => None,
    };
    let cond = cond.map(|c| rw.condition(c));
    let step = step.map(|s| rw.expr(s));
    let body = Box::new(rw.nested(body));
    let for_stmt = Stmt::new(StmtKind::For {
        init,
        cond,
        step,
        body,
        attributes: vec![],
    })
    .at(span);
    if prefix.is_empty() {
        vec![for_stmt]
    } else {
        prefix.push(for_stmt);
        vec![Stmt::block(prefix).at(span)]
    }
}

/// Loop variable and the values it takes
struct Plan {
    var: VarId,
    /// The variable is declared by the loop header rather than before the loop
    declared: bool,
    values: Vec<f64>,
}

fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Less => BinaryOp::Greater,
        BinaryOp::LessEqual => BinaryOp::GreaterEqual,
        BinaryOp::Greater => BinaryOp::Less,
        BinaryOp::GreaterEqual => BinaryOp::LessEqual,
        other => other,
    }
}

fn step_delta(var: VarId, step: &Expr) -> Option<f64> {
    match &step.kind {
        ExprKind::Unary { op, operand } if operand.as_var() == Some(var) => match op {
            UnaryOp::PreInc | UnaryOp::PostInc => Some(1.0),
            UnaryOp::PreDec | UnaryOp::PostDec => Some(-1.0),
            _ => None,
        },
        ExprKind::Assign {
            op: Some(op),
            target,
            value,
        } if target.as_var() == Some(var) => match op {
            BinaryOp::Add => literal_value(value),
            BinaryOp::Sub => literal_value(value).map(|v| -v),
            _ => None,
        },
        ExprKind::Assign { op: None, target, value } if target.as_var() == Some(var) => match &value.kind {
            ExprKind::Binary { op, lhs, rhs } if lhs.as_var() == Some(var) => match op {
                BinaryOp::Add => literal_value(rhs),
                BinaryOp::Sub => literal_value(rhs).map(|v| -v),
                _ => None,
            },
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } if rhs.as_var() == Some(var) => literal_value(lhs),
            _ => None,
        },
        ExprKind::Paren(inner) => step_delta(var, inner),
        _ => None,
    }
}

fn analyse(rw: &Rewriter, init: Option<&Stmt>, cond: Option<&Expr>, step: Option<&Expr>, body: &Stmt) -> Option<Plan> {
    let program = rw.program();
    let (var, start, declared) = match &init?.kind {
        StmtKind::Decl(vars) if vars.len() == 1 => {
            let start = literal_value(program.var(vars[0]).initializer.as_ref()?)?;
            (vars[0], start, true)
        }
        StmtKind::Expr(Expr {
            kind: ExprKind::Assign {
                op: None,
                target,
                value,
            },
            ..
        }) => (target.as_var()?, literal_value(value)?, false),
        _ => return None,
    };
    let (op, limit) = match &cond?.kind {
        ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
            if lhs.as_var() == Some(var) {
                (*op, literal_value(rhs)?)
            } else if rhs.as_var() == Some(var) {
                (flip(*op), literal_value(lhs)?)
            } else {
                return None;
            }
        }
        _ => return None,
    };
    let delta = step_delta(var, step?)?;
    if assigned_vars(program, std::slice::from_ref(body)).contains(&var) {
        return None;
    }

    let holds = |i: f64| match op {
        BinaryOp::Less => i < limit,
        BinaryOp::LessEqual => i <= limit,
        BinaryOp::Greater => i > limit,
        BinaryOp::GreaterEqual => i >= limit,
        BinaryOp::Equal => i == limit,
        _ => i != limit,
    };
    let mut values = vec![];
    let mut i = start;
    while holds(i) {
        if values.len() == MAX_UNROLLED_ITERATIONS {
            return None;
        }
        values.push(i);
        i += delta;
    }
    Some(Plan { var, declared, values })
}

/// Flags standing in for `break` and `continue` inside an unrolled copy
#[derive(Clone, Copy)]
struct JumpFlags {
    brk: Option<VarId>,
    cont: Option<VarId>,
}
impl JumpFlags {
    fn set(flag: VarId) -> Stmt {
        Stmt::assign(Expr::var(flag, Type::BOOL), Expr::bool(true))
    }

    /// `!isBreak && !isContinue`, or `None` without flags
    fn not_jumped(self) -> Option<Expr> {
        let not = |flag: VarId| Expr::unary(UnaryOp::Not, Expr::var(flag, Type::BOOL));
        match (self.brk.map(not), self.cont.map(not)) {
            (Some(b), Some(c)) => Some(Expr::binary(BinaryOp::LogicalAnd, b, c, Some(Type::BOOL))),
            (b, c) => b.or(c),
        }
    }
}

/// Replace `break`/`continue` of the unrolled loop with flag writes and guard whatever
/// follows them.
fn lower_jumps(stmts: Vec<Stmt>, flags: JumpFlags) -> Vec<Stmt> {
    let mut out = vec![];
    let mut rest = stmts.into_iter();
    while let Some(s) = rest.next() {
        let jumps = contains_jump(std::slice::from_ref(&s), true) || contains_jump(std::slice::from_ref(&s), false);
        out.push(lower_stmt(s, flags));
        if jumps {
            let remainder: Vec<Stmt> = rest.by_ref().collect();
            if !remainder.is_empty() {
                let guarded = Stmt::block(lower_jumps(remainder, flags));
                match flags.not_jumped() {
                    Some(cond) => out.push(Stmt::if_then(cond, guarded)),
                    None => out.push(guarded),
                }
            }
            break;
        }
    }
    out
}

fn lower_stmt(mut s: Stmt, flags: JumpFlags) -> Stmt {
    let span = s.span;
    match s.kind {
        StmtKind::Break => match flags.brk {
            Some(flag) => JumpFlags::set(flag).at(span),
            None => Stmt::new(StmtKind::Break).at(span),
        },
        StmtKind::Continue => match flags.cont {
            Some(flag) => JumpFlags::set(flag).at(span),
            None => Stmt::new(StmtKind::Continue).at(span),
        },
        StmtKind::Block(stmts) => Stmt::block(lower_jumps(stmts, flags)).at(span),
        // Jumps in inner loops belong to them
        StmtKind::For { .. } | StmtKind::While { .. } | StmtKind::DoWhile { .. } => s,
        _ => {
            for sub in sub_stmts_mut(&mut s) {
                let inner = std::mem::replace(sub, Stmt::new(StmtKind::Empty));
                *sub = lower_stmt(inner, flags);
            }
            s
        }
    }
}

/// A `bool` local initialised to `false`, named uniquely
fn flag(rw: &mut Rewriter, name: &str) -> VarId {
    let id = rw.ctx.next_id();
    rw.ctx.add_local(&format!("{}{}", name, id), Type::BOOL, Some(Expr::bool(false)))
}

fn unroll_loop(
    rw: &mut Rewriter,
    plan: Plan,
    init: Option<Stmt>,
    step: Option<Expr>,
    body: Stmt,
    span: SourceSpan,
) -> Vec<Stmt> {
    let kind = rw
        .program()
        .var(plan.var)
        .ty
        .scalar_kind()
        .unwrap_or(ScalarKind::Int);
    let body = match body.kind {
        StmtKind::Block(stmts) => stmts,
        _ => vec![body],
    };
    tracing::debug!(iterations = plan.values.len(), "unrolling loop");

    let mut out = vec![];
    if !plan.declared {
        if let Some(init) = init {
            out.extend(rw.stmt(init));
        }
    }
    if plan.values.is_empty() {
        if out.is_empty() {
            out.push(Stmt::new(StmtKind::Empty).at(span));
        }
        return out;
    }

    let flags = JumpFlags {
        brk: contains_jump(&body, true).then(|| flag(rw, "isBreak")),
        cont: contains_jump(&body, false).then(|| flag(rw, "isContinue")),
    };

    let mut unrolled = vec![];
    unrolled.extend(flags.brk.map(|f| Stmt::decl(f).at(span)));
    unrolled.extend(flags.cont.map(|f| Stmt::decl(f).at(span)));
    for (n, value) in plan.values.iter().enumerate() {
        let mut copy = body.clone();
        rw.ctx.clone_locals(&mut copy, &mut HashMap::new());
        if plan.declared {
            let literal = Expr::lit(convert_literal(Literal::Float(*value), kind));
            rw.ctx.substitute_var(&mut copy, plan.var, &literal);
        }

        let mut stmts = vec![];
        if let Some(cont) = flags.cont {
            stmts.push(Stmt::assign(Expr::var(cont, Type::BOOL), Expr::bool(false)).at(span));
        }
        stmts.extend(rw.stmts(lower_jumps(copy, flags)));
        if !plan.declared {
            if let Some(step) = step.clone() {
                let step = Stmt::expr(rw.expr(step)).at(span);
                match flags.brk {
                    Some(brk) => stmts.push(Stmt::if_then(Expr::unary(UnaryOp::Not, Expr::var(brk, Type::BOOL)), step)),
                    None => stmts.push(step),
                }
            }
        }

        let copy = Stmt::block(stmts).at(span);
        match flags.brk {
            Some(brk) if n > 0 => unrolled.push(Stmt::if_then(Expr::unary(UnaryOp::Not, Expr::var(brk, Type::BOOL)), copy).at(span)),
            _ => unrolled.push(copy),
        }
    }

    if flags.brk.is_some() || flags.cont.is_some() {
        out.push(Stmt::block(unrolled).at(span));
    } else {
        out.extend(unrolled);
    }
    out
}
