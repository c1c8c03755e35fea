//! Local declarations, brace initializers and multi-dimensional arrays.
//!
//! GLSL before 4.3 has no arrays of arrays, so `float a[2][3]` becomes `float a[6]` and
//! `a[i][j]` becomes `a[i * 3 + j]`.
use std::collections::VecDeque;

use crate::{
    ast::{
        expr::{BinaryOp, Callee, Expr, ExprKind, Stmt, UnaryOp},
        types::{ScalarKind, Type},
        Qualifiers, VarId,
    },
    error::{ConvertError, SourceSpan},
};

use super::{literal_value, total_components, Rewriter};
use crate::convert::ConvertContext;

/// Give every fully sized multi-dimensional array a single dimension.
pub(super) fn flatten_declarations(ctx: &mut ConvertContext) {
    let ids: Vec<VarId> = ctx.program.var_ids().collect();
    for id in ids {
        let var = ctx.program.var_mut(id);
        let (elem, dims) = match &var.ty {
            Type::Array(elem, dims) if dims.len() > 1 => (elem.clone(), dims.clone()),
            _ => continue,
        };
        let sizes: Option<Vec<u32>> = dims.iter().copied().collect();
        if let Some(sizes) = sizes {
            let len = sizes.iter().product();
            var.ty = Type::Array(elem, vec![Some(len)]);
            tracing::trace!(name = %var.name, ?sizes, "flattened array");
            ctx.flattened.insert(id, sizes);
        }
    }
}

/// Linear index for an access chain rooted at a flattened array, or `None` when `base`
/// is not such a chain.
pub(super) fn flattened_index(rw: &mut Rewriter, base: &Expr, index: &Expr, span: SourceSpan) -> Option<Expr> {
    let mut indices = vec![index.clone()];
    let mut root = base;
    while let ExprKind::Index { base, index } = &root.kind {
        indices.push(index.as_ref().clone());
        root = base;
    }
    let var = root.as_var()?;
    let dims = rw.ctx.flattened.get(&var)?.clone();
    indices.reverse();
    if indices.len() < dims.len() {
        let name = rw.program().var(var).name.clone();
        rw.ctx.error(
            ConvertError::Unsupported(format!("partial indexing of multi-dimensional array {}", name)),
            span,
        );
        return None;
    }

    let var_ty = rw.program().var(var).ty.clone();
    let elem = var_ty.element().clone();
    let mut linear: Option<Expr> = None;
    let mut folded = 0i64;
    let mut all_literal = true;
    let rest = indices.split_off(dims.len());
    for (k, index) in indices.into_iter().enumerate() {
        let stride: u32 = dims[k + 1..].iter().product();
        let index = rw.expr(index);
        let index = rw.coerce_kind(index, ScalarKind::Int);
        if let Some(value) = literal_value(&index) {
            folded += value as i64 * stride as i64;
            continue;
        }
        all_literal = false;
        let term = if stride == 1 {
            index
        } else {
            Expr::binary(BinaryOp::Mul, index, Expr::int(stride as i64), Some(Type::INT))
        };
        linear = Some(match linear {
            Some(sum) => Expr::binary(BinaryOp::Add, sum, term, Some(Type::INT)),
            None => term,
        });
    }
    let linear = match (linear, all_literal) {
        (None, _) | (_, true) => Expr::int(folded),
        (Some(sum), false) if folded == 0 => sum,
        (Some(sum), false) => Expr::binary(BinaryOp::Add, sum, Expr::int(folded), Some(Type::INT)),
    };

    let mut e = Expr::var(var, var_ty).at(root.span).index(linear, Some(elem)).at(span);
    for index in rest {
        let index = rw.expr(index);
        let index = rw.coerce_kind(index, ScalarKind::Int);
        let ty = rw.type_of(&e).element().clone();
        let ty = match ty {
            Type::Vector(kind, _) => Type::Scalar(kind),
            Type::Matrix(kind, _, cols) => Type::vector(kind, cols),
            other => other,
        };
        e = e.index(index, Some(ty)).at(span);
    }
    Some(e)
}

/// Literals and constructors of literals
fn is_constant(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Literal(_) => true,
        ExprKind::Call {
            callee: Callee::Constructor(_),
            args,
        } => args.iter().all(is_constant),
        ExprKind::Unary {
            op: UnaryOp::Neg | UnaryOp::Plus,
            operand,
        } => is_constant(operand),
        ExprKind::Paren(inner) => is_constant(inner),
        _ => false,
    }
}

/// A local declaration, one statement per variable
pub(super) fn declaration(rw: &mut Rewriter, vars: Vec<VarId>, span: SourceSpan) -> Vec<Stmt> {
    let mut out = vec![];
    for v in vars {
        let (ty, name, init) = {
            let var = rw.ctx.program.var_mut(v);
            var.qualifiers.remove(Qualifiers::STATIC | Qualifiers::CONST);
            var.semantic = None;
            var.register = None;
            (var.ty.clone(), var.name.clone(), var.initializer.take())
        };
        let init = init.map(|init| match init.kind {
            ExprKind::InitList(items) => initializer(rw, &ty, items, &name, init.span),
            kind => {
                let init = rw.expr(Expr::new(kind, init.ty).at(init.span));
                rw.coerce(init, &ty)
            }
        });

        let split = matches!(rw.program().resolve_type(&ty), Type::Array(_, _))
            && !rw.ctx.config.keep_non_uniform_array_initializers;
        match init {
            Some(Expr {
                kind:
                    ExprKind::Call {
                        callee: Callee::Constructor(_),
                        args,
                    },
                ..
            }) if split && !args.iter().all(is_constant) => {
                out.push(Stmt::decl(v).at(span));
                let elem = ty.element().clone();
                for (k, value) in args.into_iter().enumerate() {
                    let target = Expr::var(v, ty.clone()).index(Expr::int(k as i64), Some(elem.clone()));
                    out.push(Stmt::assign(target, value).at(span));
                }
            }
            init => {
                rw.ctx.program.var_mut(v).initializer = init;
                out.push(Stmt::decl(v).at(span));
            }
        }
    }
    out
}

fn flatten_leaves(items: Vec<Expr>, out: &mut Vec<Expr>) {
    for item in items {
        match item.kind {
            ExprKind::InitList(inner) => flatten_leaves(inner, out),
            kind => out.push(Expr::new(kind, item.ty).at(item.span)),
        }
    }
}

/// Brace initializer `{ ... }` for a value of type `ty`. Nested braces are optional in
/// HLSL, so the leaves are consumed in order and regrouped by the shape of `ty`.
pub(super) fn initializer(rw: &mut Rewriter, ty: &Type, items: Vec<Expr>, name: &str, span: SourceSpan) -> Expr {
    let mut leaves = vec![];
    flatten_leaves(items, &mut leaves);
    let leaves: Vec<Expr> = leaves.into_iter().map(|l| rw.expr(l)).collect();
    let found: u32 = leaves
        .iter()
        .map(|l| {
            let ty = rw.type_of(l);
            value_count(rw, &ty).unwrap_or(1)
        })
        .sum();
    let mut queue: VecDeque<Expr> = leaves.into();

    let built = build(rw, ty, &mut queue, span);
    if built.is_none() || !queue.is_empty() {
        let name = name.to_string();
        let expected = value_count(rw, ty).unwrap_or(found);
        let error = if matches!(rw.program().resolve_type(ty), Type::Array(_, _)) {
            ConvertError::ArrayDimensionMismatch { name, expected, found }
        } else {
            ConvertError::InitializerMismatch { name, expected, found }
        };
        rw.ctx.error(error, span);
    }
    built.unwrap_or_else(|| Expr::construct(ty.clone(), queue.into_iter().collect()).at(span))
}

/// Scalar values a brace initializer needs for `ty`, `None` for unsized arrays and objects
fn value_count(rw: &Rewriter, ty: &Type) -> Option<u32> {
    match rw.program().resolve_type(ty) {
        Type::Array(elem, dims) => {
            let len: Option<u32> = dims.iter().copied().product();
            Some(value_count(rw, elem)? * len?)
        }
        Type::Struct(id) => rw
            .program()
            .struct_type(*id)
            .fields
            .iter()
            .map(|f| value_count(rw, &rw.program().var(*f).ty))
            .sum(),
        other => total_components(other),
    }
}

fn build(rw: &mut Rewriter, ty: &Type, queue: &mut VecDeque<Expr>, span: SourceSpan) -> Option<Expr> {
    let resolved = rw.program().resolve_type(ty).clone();
    match resolved {
        Type::Array(elem, dims) => {
            let mut elems = vec![];
            match dims.first().copied().flatten() {
                Some(_) => {
                    for _ in 0..resolved_len(&dims) {
                        elems.push(build(rw, &elem, queue, span)?);
                    }
                }
                // Unsized arrays take every remaining leaf
                None => {
                    while !queue.is_empty() {
                        elems.push(build(rw, &elem, queue, span)?);
                    }
                }
            }
            let ty = Type::Array(elem, vec![Some(elems.len() as u32)]);
            Some(Expr::construct(ty, elems).at(span))
        }
        Type::Struct(id) => {
            let fields = rw.program().struct_type(id).fields.clone();
            let mut values = vec![];
            for f in fields {
                let fty = rw.program().var(f).ty.clone();
                values.push(build(rw, &fty, queue, span)?);
            }
            Some(Expr::construct(ty.clone(), values).at(span))
        }
        ref numeric if numeric.is_numeric() => {
            let need = total_components(numeric)?;
            let first = queue.pop_front()?;
            let first_ty = rw.type_of(&first);
            if need == 1 || first_ty == *numeric || total_components(&first_ty) == Some(need) {
                return Some(rw.coerce(first, numeric));
            }
            let mut have = total_components(&first_ty).unwrap_or(1);
            let mut args = vec![first];
            while have < need {
                let next = queue.pop_front()?;
                have += total_components(&rw.type_of(&next)).unwrap_or(1);
                args.push(next);
            }
            let kind = numeric.scalar_kind().unwrap_or(ScalarKind::Float);
            let args = args.into_iter().map(|a| rw.coerce_kind(a, kind)).collect();
            Some(rw.constructor(ty.clone(), args, span))
        }
        _ => queue.pop_front(),
    }
}

fn resolved_len(dims: &[Option<u32>]) -> u32 {
    dims.iter().map(|d| d.unwrap_or(1)).product()
}
