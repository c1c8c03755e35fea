//! HLSL intrinsic functions without a same-shaped GLSL counterpart.
use crate::{
    ast::{
        expr::{BinaryOp, Callee, Expr, ExprKind, Stmt, StmtKind, UnaryOp},
        types::{ScalarKind, Type},
    },
    error::{ConvertError, SourceSpan},
    glsl::intrinsics::{legacy_fetch, renamed_intrinsic, structural_intrinsic, StructuralIntrinsic},
};

use super::{sampling, Rewriter};

/// Exactly `N` arguments, or an error naming the intrinsic
fn arity<const N: usize>(rw: &mut Rewriter, name: &str, args: Vec<Expr>, span: SourceSpan) -> Option<[Expr; N]> {
    let count = args.len();
    match <[Expr; N]>::try_from(args) {
        Ok(args) => Some(args),
        Err(_) => {
            rw.ctx.error(
                ConvertError::Unsupported(format!("{} with {} arguments, expected {}", name, count, N)),
                span,
            );
            None
        }
    }
}

fn unsupported_call(name: &str, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
    Expr::call(name, args, ty).at(span)
}

/// Call of an intrinsic used as an expression
pub(super) fn call(rw: &mut Rewriter, name: &str, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
    if let Some((dim, fetch)) = legacy_fetch(name) {
        return sampling::legacy(rw, name, dim, fetch, args, ty, span);
    }
    let args = rw.exprs(args);
    let structural = match structural_intrinsic(name) {
        Some(s) => s,
        None => {
            let name = renamed_intrinsic(name).unwrap_or(name);
            return Expr::call(name, args, ty).at(span);
        }
    };
    let original = args.clone();
    match structural {
        StructuralIntrinsic::Mul => match arity::<2>(rw, name, args, span) {
            Some([a, b]) => super::matrix::mul(rw, a, b, ty, span),
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::Lit => match arity::<3>(rw, name, args, span) {
            Some([n_dot_l, n_dot_h, m]) => lit(rw, n_dot_l, n_dot_h, m, span),
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::Saturate => match arity::<1>(rw, name, args, span) {
            Some([x]) => Expr::call("clamp", vec![x, Expr::float(0.0), Expr::float(1.0)], ty).at(span),
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::All | StructuralIntrinsic::Any => match arity::<1>(rw, name, args, span) {
            Some([x]) => all_any(rw, name, x, span),
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::IsFinite => match arity::<1>(rw, name, args, span) {
            Some([x]) => {
                let is_vector = rw.type_of(&x).is_vector();
                let isinf = Expr::call("isinf", vec![x], ty.clone());
                if is_vector {
                    Expr::call("not", vec![isinf], ty).at(span)
                } else {
                    Expr::unary(UnaryOp::Not, isinf).at(span)
                }
            }
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::Log10 => match arity::<1>(rw, name, args, span) {
            Some([x]) => {
                let log = Expr::call("log", vec![x], ty.clone());
                let ten = Expr::call("log", vec![Expr::float(10.0)], Some(Type::FLOAT));
                Expr::binary(BinaryOp::Div, log, ten, ty).paren().at(span)
            }
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::ColorToUByte4 => match arity::<1>(rw, name, args, span) {
            Some([x]) => Expr::construct(Type::Vector(ScalarKind::Int, 4), vec![x]).at(span),
            None => unsupported_call(name, original, ty, span),
        },
        StructuralIntrinsic::Clip | StructuralIntrinsic::SinCos => {
            rw.ctx.error(
                ConvertError::Unsupported(format!("{} used as a value", name)),
                span,
            );
            unsupported_call(name, original, ty, span)
        }
    }
}

/// `lit(n_dot_l, n_dot_h, m)`: ambient, diffuse and specular lighting coefficients
fn lit(rw: &mut Rewriter, n_dot_l: Expr, n_dot_h: Expr, m: Expr, span: SourceSpan) -> Expr {
    let n_dot_l = rw.coerce(n_dot_l, &Type::FLOAT);
    let n_dot_h = rw.coerce(n_dot_h, &Type::FLOAT);
    let m = rw.coerce(m, &Type::FLOAT);
    let negative = |e: &Expr| Expr::binary(BinaryOp::Less, e.clone(), Expr::float(0.0), Some(Type::BOOL));
    let conditional = |cond: Expr, then: Expr, otherwise: Expr| {
        Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            Some(Type::FLOAT),
        )
    };
    let diffuse = conditional(negative(&n_dot_l), Expr::float(0.0), n_dot_l.clone());
    let either_negative = Expr::binary(BinaryOp::LogicalOr, negative(&n_dot_l), negative(&n_dot_h), Some(Type::BOOL));
    let specular = conditional(
        either_negative,
        Expr::float(0.0),
        Expr::call("pow", vec![n_dot_h, m], Some(Type::FLOAT)),
    );
    Expr::construct(
        Type::float_vec(4),
        vec![Expr::float(1.0), diffuse, specular, Expr::float(1.0)],
    )
    .at(span)
}

/// GLSL `all`/`any` only take boolean vectors
fn all_any(rw: &mut Rewriter, name: &str, x: Expr, span: SourceSpan) -> Expr {
    match rw.type_of(&x) {
        Type::Vector(ScalarKind::Bool, _) => Expr::call(name, vec![x], Some(Type::BOOL)).at(span),
        Type::Vector(kind, n) => {
            let zero = Expr::construct(Type::Vector(kind, n), vec![Expr::zero_of(&Type::Scalar(kind))]);
            let mask = Expr::call("notEqual", vec![x, zero], Some(Type::Vector(ScalarKind::Bool, n)));
            Expr::call(name, vec![mask], Some(Type::BOOL)).at(span)
        }
        Type::Scalar(ScalarKind::Bool) => x,
        Type::Scalar(kind) => {
            let zero = Expr::zero_of(&Type::Scalar(kind));
            Expr::binary(BinaryOp::NotEqual, x, zero, Some(Type::BOOL)).at(span)
        }
        _ => Expr::call(name, vec![x], Some(Type::BOOL)).at(span),
    }
}

/// `clip(x)` and `sincos(x, s, c)`, which become statements
pub(super) fn statement(rw: &mut Rewriter, e: Expr, span: SourceSpan) -> Vec<Stmt> {
    let (name, args) = match e.kind {
        ExprKind::Call { callee, args } => match callee {
            Callee::Intrinsic(name) => (name, args),
            callee => {
                let e = Expr::new(ExprKind::Call { callee, args }, e.ty).at(span);
                return vec![Stmt::expr(rw.expr(e))];
            }
        },
        kind => {
            let e = Expr::new(kind, e.ty).at(span);
            return vec![Stmt::expr(rw.expr(e))];
        }
    };
    let args = rw.exprs(args);
    let original = args.clone();
    if name == "clip" {
        if let Some([x]) = arity::<1>(rw, &name, args, span) {
            return vec![clip(rw, x, span)];
        }
    } else if let Some([x, s, c]) = arity::<3>(rw, &name, args, span) {
        let x_ty = rw.type_of(&x);
        let sin = Expr::call("sin", vec![x.clone()], Some(x_ty.clone()));
        let cos = Expr::call("cos", vec![x], Some(x_ty));
        let s_ty = rw.type_of(&s);
        let c_ty = rw.type_of(&c);
        let sin = rw.coerce(sin, &s_ty);
        let cos = rw.coerce(cos, &c_ty);
        return vec![Stmt::assign(s, sin).at(span), Stmt::assign(c, cos).at(span)];
    }
    vec![Stmt::expr(Expr::call(&name, original, None)).at(span)]
}

/// `clip(x)` discards when `x` is negative, or when every component of a vector `x` is negative
fn clip(rw: &mut Rewriter, x: Expr, span: SourceSpan) -> Stmt {
    let cond = match rw.type_of(&x) {
        Type::Vector(kind, n) => {
            let zero = Expr::construct(Type::Vector(kind, n), vec![Expr::zero_of(&Type::Scalar(kind))]);
            let less = Expr::call("lessThan", vec![x, zero], Some(Type::Vector(ScalarKind::Bool, n)));
            Expr::call("all", vec![less], Some(Type::BOOL))
        }
        ty => {
            let zero = Expr::zero_of(&ty);
            Expr::binary(BinaryOp::Less, x, zero, Some(Type::BOOL))
        }
    };
    Stmt::new(StmtKind::If {
        cond,
        then: Box::new(Stmt::new(StmtKind::Discard).at(span)),
        otherwise: None,
    })
    .at(span)
}
