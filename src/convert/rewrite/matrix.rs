//! Matrix element order.
//!
//! With [MatrixLayout::PreserveRows] an HLSL `floatRxC` becomes a GLSL `matCxR`, so the
//! first GLSL index selects an HLSL column. Every element access, row access and
//! constructor is transposed accordingly. [MatrixLayout::RowsAsColumns] keeps all of
//! them as written and only swaps the operands of `mul`.
use crate::{
    ast::{
        expr::{BinaryOp, Expr, ExprKind, Stmt},
        types::{ScalarKind, Type},
    },
    config::MatrixLayout,
    error::SourceSpan,
    hlsl::syntax::{parse_matrix_accessor, parse_swizzle, MatrixElement},
};

use super::Rewriter;

/// Position of an HLSL matrix element in the target matrix, as `[row][col]` indices.
pub fn apply_layout(layout: MatrixLayout, element: MatrixElement) -> MatrixElement {
    match layout {
        MatrixLayout::PreserveRows => element.transposed(),
        MatrixLayout::RowsAsColumns => element,
    }
}

fn preserve_rows(rw: &Rewriter) -> bool {
    rw.ctx.config.matrix_layout == MatrixLayout::PreserveRows
}

fn indexed(base: Expr, first: Expr, second: Expr, kind: ScalarKind) -> Expr {
    base.index(first, None).index(second, Some(Type::Scalar(kind)))
}

/// `m[row][col]` with both indices arbitrary expressions
pub(super) fn element(rw: &mut Rewriter, matrix: Expr, row: Expr, col: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
    let kind = rw.type_of(&matrix).scalar_kind().unwrap_or(ScalarKind::Float);
    let matrix = rw.expr(matrix);
    let row = rw.expr(row);
    let row = rw.coerce_kind(row, ScalarKind::Int);
    let col = rw.expr(col);
    let col = rw.coerce_kind(col, ScalarKind::Int);
    let e = if preserve_rows(rw) {
        indexed(matrix, col, row, kind)
    } else {
        indexed(matrix, row, col, kind)
    };
    match ty {
        Some(ty) => e.typed(ty),
        None => e,
    }
    .at(span)
}

/// Read of a whole HLSL row, `m[i]`
pub(super) fn row(rw: &mut Rewriter, matrix: Expr, index: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
    let (kind, cols) = match rw.type_of(&matrix) {
        Type::Matrix(kind, _, cols) => (kind, cols),
        _ => (ScalarKind::Float, 4),
    };
    let matrix = rw.expr(matrix);
    let index = rw.expr(index);
    let index = rw.coerce_kind(index, ScalarKind::Int);
    if !preserve_rows(rw) {
        return matrix.index(index, ty).at(span);
    }
    let components = (0..cols)
        .map(|c| indexed(matrix.clone(), Expr::int(c as i64), index.clone(), kind))
        .collect();
    Expr::construct(Type::vector(kind, cols), components).at(span)
}

/// Whether `target` writes a whole HLSL row, which is not contiguous in the target layout
pub(super) fn is_row_write(rw: &Rewriter, target: &Expr) -> bool {
    match &target.kind {
        ExprKind::Index { base, .. } => preserve_rows(rw) && rw.type_of(base).is_matrix(),
        _ => false,
    }
}

/// `m[i] = v` and `m[i] op= v` under [MatrixLayout::PreserveRows]: write the row one
/// element at a time through a temporary.
pub(super) fn row_assignment(rw: &mut Rewriter, e: Expr, span: SourceSpan) -> Vec<Stmt> {
    let parts = match &e.kind {
        ExprKind::Assign { op, target, value } => match &target.kind {
            ExprKind::Index { base, index } => Some((*op, (**base).clone(), (**index).clone(), (**value).clone())),
            _ => None,
        },
        _ => None,
    };
    let (op, matrix, index, value) = match parts {
        Some(parts) => parts,
        None => return vec![Stmt::expr(rw.expr(e)).at(span)],
    };
    let (kind, cols) = match rw.type_of(&matrix) {
        Type::Matrix(kind, _, cols) => (kind, cols),
        _ => (ScalarKind::Float, 4),
    };
    let row_ty = Type::vector(kind, cols);
    let matrix = rw.expr(matrix);
    let index = rw.expr(index);
    let index = rw.coerce_kind(index, ScalarKind::Int);
    let value = rw.expr(value);
    let value = rw.coerce(value, &row_ty);

    let mut stmts = vec![];
    // The index is read once per component
    let index = if matches!(index.kind, ExprKind::Literal(_) | ExprKind::Var(_)) {
        index
    } else {
        let slot = rw.ctx.add_local("_localidx_", Type::INT, Some(index));
        stmts.push(Stmt::decl(slot).at(span));
        Expr::var(slot, Type::INT)
    };
    let temp = rw.ctx.add_local("_localmat_", row_ty.clone(), Some(value));
    stmts.push(Stmt::decl(temp).at(span));
    for c in 0..cols {
        let target = indexed(matrix.clone(), Expr::int(c as i64), index.clone(), kind);
        let source = Expr::var(temp, row_ty.clone()).index(Expr::int(c as i64), Some(Type::Scalar(kind)));
        let assign = Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(source),
            },
            Some(Type::Scalar(kind)),
        );
        stmts.push(Stmt::expr(assign).at(span));
    }
    vec![Stmt::block(stmts).at(span)]
}

/// Swizzles of matrices (`m._m01_m10`) and of scalars (`s.xxx`)
pub(super) fn swizzle(rw: &mut Rewriter, base: Expr, components: String, ty: Option<Type>, span: SourceSpan) -> Expr {
    match rw.type_of(&base) {
        Type::Matrix(kind, _, _) => {
            if let Some(accessor) = parse_matrix_accessor(&components) {
                let layout = rw.ctx.config.matrix_layout;
                let base = rw.expr(base);
                let mut elements: Vec<Expr> = accessor
                    .iter()
                    .map(|e| {
                        let e = apply_layout(layout, *e);
                        indexed(base.clone(), Expr::int(e.row as i64), Expr::int(e.col as i64), kind)
                    })
                    .collect();
                return if elements.len() == 1 {
                    elements.remove(0).at(span)
                } else {
                    Expr::construct(Type::vector(kind, elements.len() as u8), elements).at(span)
                };
            }
        }
        Type::Scalar(kind) => {
            if let Some(swizzle) = parse_swizzle(&components) {
                let base = rw.expr(base);
                return if swizzle.len() == 1 {
                    base
                } else {
                    Expr::construct(Type::vector(kind, swizzle.len() as u8), vec![base]).at(span)
                };
            }
        }
        _ => {}
    }
    let base = rw.expr(base);
    Expr::new(
        ExprKind::Swizzle {
            base: Box::new(base),
            components,
        },
        ty,
    )
    .at(span)
}

/// HLSL matrix constructors list elements row by row, GLSL ones column by column.
pub(super) fn constructor(
    rw: &mut Rewriter,
    kind: ScalarKind,
    rows: u8,
    cols: u8,
    args: Vec<Expr>,
    span: SourceSpan,
) -> Expr {
    let ty = Type::Matrix(kind, rows, cols);
    if !preserve_rows(rw) || args.len() <= 1 {
        return Expr::construct(ty, args).at(span);
    }
    let (r, c) = (rows as usize, cols as usize);
    let types: Vec<Type> = args.iter().map(|a| rw.type_of(a)).collect();

    if args.len() == r * c && types.iter().all(Type::is_scalar) {
        let args: Vec<Expr> = args.into_iter().map(|a| rw.coerce_kind(a, kind)).collect();
        let reordered = (0..r * c).map(|i| args[(i % r) * c + i / r].clone()).collect();
        return Expr::construct(ty, reordered).at(span);
    }
    if args.len() == r && types.iter().all(|t| t.components() == Some(cols)) {
        let transposed = Type::Matrix(kind, cols, rows);
        let inner = Expr::construct(transposed, args);
        return Expr::call("transpose", vec![inner], Some(ty)).at(span);
    }
    let message = format!(
        "Matrix constructor {} with {} mixed arguments is emitted without reordering",
        rw.program().type_name(&ty),
        args.len()
    );
    rw.ctx.warning(message, span);
    Expr::construct(ty, args).at(span)
}

/// Operands of `mul(a, b)` in target order
pub(super) fn mul_operands(rw: &Rewriter, a: Expr, b: Expr) -> (Expr, Expr) {
    match rw.ctx.config.matrix_layout {
        MatrixLayout::PreserveRows => (a, b),
        MatrixLayout::RowsAsColumns => (b, a),
    }
}

/// `mul(a, b)` with both operands rewritten
pub(super) fn mul(rw: &mut Rewriter, a: Expr, b: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
    let at = rw.type_of(&a);
    let bt = rw.type_of(&b);
    if at.is_scalar() || bt.is_scalar() {
        return Expr::binary(BinaryOp::Mul, a, b, ty).paren().at(span);
    }
    if at.is_vector() && bt.is_vector() {
        let n = at.components().min(bt.components()).unwrap_or(4);
        let kind = at.scalar_kind().unwrap_or(ScalarKind::Float);
        let a = rw.coerce(a, &Type::vector(kind, n));
        let b = rw.coerce(b, &Type::vector(kind, n));
        return Expr::call("dot", vec![a, b], ty).at(span);
    }
    let (lhs, rhs) = mul_operands(rw, a, b);
    Expr::binary(BinaryOp::Mul, lhs, rhs, ty).paren().at(span)
}
