//! Rewrite of function bodies from HLSL constructs into GLSL ones.
//!
//! Bodies are rebuilt bottom-up. A statement may expand into several (`sincos`, array
//! initializers, unrolled loops), so [Rewriter::stmt] returns a list; [Rewriter::expr]
//! rebuilds one expression. Types on expressions stay in HLSL vocabulary until
//! [super::finish] maps them.
use std::collections::HashMap;

use crate::{
    ast::{
        expr::{BinaryOp, Callee, Expr, ExprKind, Literal, Stmt, StmtKind, UnaryOp},
        types::{ScalarKind, Type},
        Decl, FuncId, Program, Qualifiers, VarId,
    },
    error::SourceSpan,
};

use super::ConvertContext;

mod arrays;
mod entry;
mod intrinsics;
mod loops;
mod matrix;
mod sampling;

pub use self::matrix::apply_layout;

/// Convert the entry point and rewrite every function and global initializer.
pub fn run(ctx: &mut ConvertContext) {
    arrays::flatten_declarations(ctx);

    let functions: Vec<FuncId> = ctx
        .program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Function(f) => Some(*f),
            _ => None,
        })
        .collect();
    for f in functions {
        if f != ctx.entry {
            rewrite_function(ctx, f);
        }
    }
    entry::convert_entry(ctx);

    for v in ctx.program.global_vars() {
        if let Some(init) = ctx.program.var_mut(v).initializer.take() {
            let ty = ctx.program.var(v).ty.clone();
            let mut rw = Rewriter::new(ctx, Type::Void);
            let init = match init.kind {
                ExprKind::InitList(items) => {
                    let name = rw.ctx.program.var(v).name.clone();
                    arrays::initializer(&mut rw, &ty, items, &name, init.span)
                }
                _ => {
                    let init = rw.expr(init);
                    rw.coerce(init, &ty)
                }
            };
            ctx.program.var_mut(v).initializer = Some(init);
        }
    }
}

fn rewrite_function(ctx: &mut ConvertContext, f: FuncId) {
    let body = match ctx.program.function_mut(f).body.take() {
        Some(body) => body,
        None => return,
    };
    let return_type = ctx.program.function(f).return_type.clone();
    let body = Rewriter::new(ctx, return_type).stmts(body);

    let func = ctx.program.function_mut(f);
    func.body = Some(body);
    func.return_semantic = None;
    func.attributes.clear();
    for p in func.params.clone() {
        let var = ctx.program.var_mut(p);
        var.semantic = None;
        var.register = None;
    }
}

/// Integer and floating kinds GLSL treats as the same type
fn same_kind(a: ScalarKind, b: ScalarKind) -> bool {
    a == b || (a.is_floating() && b.is_floating() && a != ScalarKind::Double && b != ScalarKind::Double)
}

/// Common kind of a binary arithmetic expression
fn binary_kind(a: ScalarKind, b: ScalarKind) -> ScalarKind {
    use ScalarKind::*;
    if a == Double || b == Double {
        Double
    } else if a.is_floating() || b.is_floating() {
        Float
    } else if a == UInt || b == UInt {
        UInt
    } else {
        Int
    }
}

fn convert_literal(literal: Literal, kind: ScalarKind) -> Literal {
    let value = match literal {
        Literal::Bool(b) => b as i64 as f64,
        Literal::Int(i) => i as f64,
        Literal::UInt(u) => u as f64,
        Literal::Float(f) => f,
    };
    match kind {
        ScalarKind::Bool => Literal::Bool(value != 0.0),
        ScalarKind::Int => Literal::Int(value as i64),
        ScalarKind::UInt => Literal::UInt(value as u64),
        ScalarKind::Half | ScalarKind::Float | ScalarKind::Double => Literal::Float(value),
    }
}

/// Numeric value of a literal, possibly negated
pub(crate) fn literal_value(e: &Expr) -> Option<f64> {
    match &e.kind {
        ExprKind::Literal(Literal::Int(i)) => Some(*i as f64),
        ExprKind::Literal(Literal::UInt(u)) => Some(*u as f64),
        ExprKind::Literal(Literal::Float(f)) => Some(*f),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => literal_value(operand).map(|v| -v),
        ExprKind::Paren(inner) => literal_value(inner),
        _ => None,
    }
}

/// Components of a scalar, vector or matrix
fn total_components(ty: &Type) -> Option<u32> {
    match ty {
        Type::Scalar(_) => Some(1),
        Type::Vector(_, n) => Some(*n as u32),
        Type::Matrix(_, r, c) => Some(*r as u32 * *c as u32),
        _ => None,
    }
}

const COMPONENTS: &str = "xyzw";

/// Per-function rewriting state
pub(crate) struct Rewriter<'c, 'a> {
    pub(crate) ctx: &'c mut ConvertContext<'a>,
    /// Expressions standing in for entry point parameters
    substitutions: HashMap<VarId, Expr>,
    entry: Option<entry::EntryState>,
    return_type: Type,
}
impl<'c, 'a> Rewriter<'c, 'a> {
    fn new(ctx: &'c mut ConvertContext<'a>, return_type: Type) -> Self {
        Self {
            ctx,
            substitutions: HashMap::new(),
            entry: None,
            return_type,
        }
    }

    fn program(&self) -> &Program {
        &self.ctx.program
    }

    /// Type of `e` with aliases resolved, `void` when the front end inferred none
    fn type_of(&self, e: &Expr) -> Type {
        match &e.ty {
            Some(ty) => self.program().resolve_type(ty).clone(),
            None => Type::Void,
        }
    }

    pub(crate) fn stmts(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        stmts.into_iter().flat_map(|s| self.stmt(s)).collect()
    }

    /// Rewrite a statement that must stay a single statement, e.g. the body of an `if`
    fn nested(&mut self, s: Stmt) -> Stmt {
        let span = s.span;
        Stmt::from_list(self.stmt(s), span)
    }

    pub(crate) fn stmt(&mut self, s: Stmt) -> Vec<Stmt> {
        let span = s.span;
        match s.kind {
            StmtKind::Expr(e) => self.expr_stmt(e, span),
            StmtKind::Decl(vars) => arrays::declaration(self, vars, span),
            StmtKind::Block(stmts) => vec![Stmt::block(self.stmts(stmts)).at(span)],
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.condition(cond);
                let then = Box::new(self.nested(*then));
                let otherwise = otherwise.map(|o| Box::new(self.nested(*o)));
                vec![Stmt::new(StmtKind::If {
                    cond,
                    then,
                    otherwise,
                })
                .at(span)]
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
                attributes,
            } => loops::for_loop(self, init, cond, step, *body, attributes, span),
            StmtKind::While { cond, body, .. } => {
                let cond = self.condition(cond);
                let body = Box::new(self.nested(*body));
                vec![Stmt::new(StmtKind::While {
                    cond,
                    body,
                    attributes: vec![],
                })
                .at(span)]
            }
            StmtKind::DoWhile { body, cond } => {
                let body = Box::new(self.nested(*body));
                let cond = self.condition(cond);
                vec![Stmt::new(StmtKind::DoWhile { body, cond }).at(span)]
            }
            StmtKind::Return(value) => self.return_stmt(value, true, span),
            kind @ (StmtKind::Empty | StmtKind::Break | StmtKind::Continue | StmtKind::Discard) => {
                vec![Stmt::new(kind).at(span)]
            }
        }
    }

    fn return_stmt(&mut self, value: Option<Expr>, emit_return: bool, span: SourceSpan) -> Vec<Stmt> {
        if self.entry.is_some() {
            return entry::convert_return(self, value, emit_return, span);
        }
        let value = value.map(|v| {
            let v = self.expr(v);
            let ty = self.return_type.clone();
            self.coerce(v, &ty)
        });
        vec![Stmt::new(StmtKind::Return(value)).at(span)]
    }

    /// Expression statements, some of which expand into several statements
    fn expr_stmt(&mut self, e: Expr, span: SourceSpan) -> Vec<Stmt> {
        match &e.kind {
            ExprKind::Call {
                callee: Callee::Intrinsic(name),
                ..
            } if name == "clip" || name == "sincos" => intrinsics::statement(self, e, span),
            ExprKind::Method { method, .. } if method == "GetDimensions" => sampling::get_dimensions(self, e, span),
            ExprKind::Method { object, method, .. }
                if matches!(self.type_of(object), Type::Stream(_, _))
                    && (method == "Append" || method == "RestartStrip") =>
            {
                entry::stream_call(self, e, span)
            }
            ExprKind::Assign { target, .. } if matrix::is_row_write(self, target) => matrix::row_assignment(self, e, span),
            _ => vec![Stmt::expr(self.expr(e)).at(span)],
        }
    }

    pub(crate) fn exprs(&mut self, exprs: Vec<Expr>) -> Vec<Expr> {
        exprs.into_iter().map(|e| self.expr(e)).collect()
    }

    pub(crate) fn expr(&mut self, e: Expr) -> Expr {
        let Expr { kind, ty, span } = e;
        match kind {
            ExprKind::Literal(literal) => Expr::new(ExprKind::Literal(literal), ty).at(span),
            ExprKind::Var(id) => match self.substitutions.get(&id) {
                Some(sub) => sub.clone(),
                None => Expr::new(ExprKind::Var(id), ty).at(span),
            },
            ExprKind::Call {
                callee: Callee::Function(f),
                args,
            } => self.function_call(f, args, ty, span),
            ExprKind::Call {
                callee: Callee::Intrinsic(name),
                args,
            } => intrinsics::call(self, &name, args, ty, span),
            ExprKind::Call {
                callee: Callee::Constructor(cty),
                args,
            } => {
                let args = self.exprs(args);
                self.constructor(cty, args, span)
            }
            ExprKind::Method { object, method, args } => sampling::method(self, *object, &method, args, ty, span),
            ExprKind::Field { base, field } => {
                let base = self.expr(*base);
                Expr::new(
                    ExprKind::Field {
                        base: Box::new(base),
                        field,
                    },
                    ty,
                )
                .at(span)
            }
            ExprKind::Swizzle { base, components } => matrix::swizzle(self, *base, components, ty, span),
            ExprKind::Index { base, index } => self.index(*base, *index, ty, span),
            ExprKind::Unary { op, operand } => {
                let mut operand = self.expr(*operand);
                if matches!(op, UnaryOp::Neg | UnaryOp::Plus) {
                    operand = self.front_facing_value(operand);
                }
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
                .at(span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(*lhs);
                let rhs = self.expr(*rhs);
                self.binary(op, lhs, rhs, ty, span)
            }
            ExprKind::Assign { op, target, value } => self.assignment(op, *target, *value, ty, span),
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => self.conditional(*cond, *then, *otherwise, ty, span),
            ExprKind::Cast { ty: to, expr } => {
                let e = self.expr(*expr);
                self.cast(to, e, span)
            }
            ExprKind::InitList(items) => match ty {
                Some(ty) => arrays::initializer(self, &ty, items, "initializer", span),
                None => {
                    let items = self.exprs(items);
                    Expr::new(ExprKind::InitList(items), None).at(span)
                }
            },
            ExprKind::Paren(inner) => {
                let inner = self.expr(*inner);
                if matches!(inner.kind, ExprKind::Paren(_)) {
                    inner
                } else {
                    Expr::new(ExprKind::Paren(Box::new(inner)), ty).at(span)
                }
            }
        }
    }

    fn function_call(&mut self, f: FuncId, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
        let params = self.program().function(f).params.clone();
        let mut args = self.exprs(args);
        // Default parameter values
        for p in params.iter().skip(args.len()) {
            match self.program().var(*p).initializer.clone() {
                Some(default) => {
                    let default = self.expr(default);
                    args.push(default);
                }
                None => break,
            }
        }
        let args = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| match params.get(i) {
                Some(p) if !self.program().var(*p).qualifiers.contains(Qualifiers::OUT) => {
                    let pty = self.program().var(*p).ty.clone();
                    self.coerce(arg, &pty)
                }
                _ => arg,
            })
            .collect();
        Expr::new(
            ExprKind::Call {
                callee: Callee::Function(f),
                args,
            },
            ty,
        )
        .at(span)
    }

    /// Constructor call with already rewritten arguments
    fn constructor(&mut self, ty: Type, args: Vec<Expr>, span: SourceSpan) -> Expr {
        match self.program().resolve_type(&ty).clone() {
            Type::Matrix(kind, rows, cols) => matrix::constructor(self, kind, rows, cols, args, span),
            Type::Struct(id) => {
                let fields = self.program().struct_type(id).fields.clone();
                let args = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, arg)| match fields.get(i) {
                        Some(f) => {
                            let fty = self.program().var(*f).ty.clone();
                            self.coerce(arg, &fty)
                        }
                        None => arg,
                    })
                    .collect();
                Expr::construct(ty, args).at(span)
            }
            _ => Expr::construct(ty, args).at(span),
        }
    }

    fn index(&mut self, base: Expr, index: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
        if let Some(e) = arrays::flattened_index(self, &base, &index, span) {
            return e;
        }
        if let ExprKind::Index {
            base: matrix,
            index: row,
        } = &base.kind
        {
            if self.type_of(matrix).is_matrix() {
                let (matrix, row) = (matrix.as_ref().clone(), row.as_ref().clone());
                return matrix::element(self, matrix, row, index, ty, span);
            }
        }
        if self.type_of(&base).is_matrix() {
            return matrix::row(self, base, index, ty, span);
        }
        let base = self.expr(base);
        let index = self.expr(index);
        let index = self.coerce_kind(index, ScalarKind::Int);
        base.index(index, ty).at(span)
    }

    fn assignment(&mut self, op: Option<BinaryOp>, target: Expr, value: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
        let target = self.expr(target);
        let value = self.expr(value);
        let target_ty = self.type_of(&target);
        let value_ty = self.type_of(&value);
        let kind = target_ty.scalar_kind();

        let floating_mod = op == Some(BinaryOp::Mod) && !target_ty.is_integer();
        let matrix_mul = op == Some(BinaryOp::Mul) && target_ty.is_matrix() && value_ty.is_matrix();
        if floating_mod || matrix_mul {
            // GLSL has no `%=` on floats and `*=` on matrices is a matrix product
            let value = self.binary(op.unwrap_or(BinaryOp::Mod), target.clone(), value, Some(target_ty.clone()), span);
            return Expr::assign(target, value).at(span);
        }

        let value = match (op, kind) {
            (None, _) => self.coerce(value, &target_ty),
            (Some(_), Some(kind)) => self.coerce_kind(value, kind),
            (Some(_), None) => value,
        };
        Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
        )
        .at(span)
    }

    /// Fix up a binary expression whose operands are already rewritten.
    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
        if op.is_comparison() {
            if let Some(e) = self.front_facing_comparison(op, &lhs, &rhs, span) {
                return e;
            }
        }
        let arithmetic = matches!(
            op,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        );
        let (lhs, rhs) = if arithmetic || op.is_comparison() {
            (self.front_facing_value(lhs), self.front_facing_value(rhs))
        } else {
            (lhs, rhs)
        };
        let lt = self.type_of(&lhs);
        let rt = self.type_of(&rhs);

        match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if lt.is_vector() || rt.is_vector() {
                    self.ctx.warning(
                        format!(
                            "Operator {} is not applied per component on vectors in GLSL, rewrite the expression with all()/any()",
                            op.symbol()
                        ),
                        span,
                    );
                    return Expr::binary(op, lhs, rhs, ty).at(span);
                }
                let lhs = self.condition_value(lhs);
                let rhs = self.condition_value(rhs);
                return Expr::binary(op, lhs, rhs, Some(Type::BOOL)).at(span);
            }
            BinaryOp::Mul if lt.is_matrix() && rt.is_matrix() => {
                return Expr::call("matrixCompMult", vec![lhs, rhs], ty).at(span);
            }
            BinaryOp::Mod if !(lt.is_integer() && rt.is_integer()) && lt.is_numeric() && rt.is_numeric() => {
                let kind = binary_kind(lt.scalar_kind().unwrap_or(ScalarKind::Float), ScalarKind::Float);
                let lhs = self.coerce_kind(lhs, kind);
                let rhs = self.coerce_kind(rhs, kind);
                return Expr::call("mod", vec![lhs, rhs], ty).at(span);
            }
            _ => {}
        }

        let (lhs, rhs) = match (lt.scalar_kind(), rt.scalar_kind()) {
            (Some(a), Some(b)) if (arithmetic || op.is_comparison()) && !same_kind(a, b) => {
                let kind = binary_kind(a, b);
                (self.coerce_kind(lhs, kind), self.coerce_kind(rhs, kind))
            }
            _ => (lhs, rhs),
        };

        if op.is_comparison() && (lt.is_vector() || rt.is_vector()) {
            if let Some(function) = op.vector_comparison() {
                let n = lt.components().max(rt.components()).unwrap_or(1);
                let lhs = self.splat(lhs, n);
                let rhs = self.splat(rhs, n);
                return Expr::call(function, vec![lhs, rhs], Some(Type::Vector(ScalarKind::Bool, n))).at(span);
            }
        }
        Expr::binary(op, lhs, rhs, ty).at(span)
    }

    /// Broadcast a scalar to an `n` component vector of the same kind
    fn splat(&mut self, e: Expr, n: u8) -> Expr {
        match self.type_of(&e) {
            Type::Scalar(kind) => self.coerce(e, &Type::Vector(kind, n)),
            _ => e,
        }
    }

    fn conditional(&mut self, cond: Expr, then: Expr, otherwise: Expr, ty: Option<Type>, span: SourceSpan) -> Expr {
        let cond = self.expr(cond);
        let then = self.expr(then);
        let otherwise = self.expr(otherwise);
        let result_ty = match &ty {
            Some(t) => self.program().resolve_type(t).clone(),
            None => self.type_of(&then),
        };
        let then = self.coerce(then, &result_ty);
        let otherwise = self.coerce(otherwise, &result_ty);

        match self.type_of(&cond) {
            Type::Vector(kind, n) => {
                // Picks `otherwise` where the condition component is zero
                let zero = Expr::construct(Type::Vector(kind, n), vec![Expr::zero_of(&Type::Scalar(kind))]);
                let mask = Expr::call("equal", vec![cond, zero], Some(Type::Vector(ScalarKind::Bool, n)));
                Expr::call("mix", vec![then, otherwise, mask], ty).at(span)
            }
            _ => {
                let cond = self.condition_value(cond);
                Expr::new(
                    ExprKind::Conditional {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    },
                    ty,
                )
                .at(span)
            }
        }
    }

    fn cast(&mut self, to: Type, e: Expr, span: SourceSpan) -> Expr {
        let resolved = self.program().resolve_type(&to).clone();
        if resolved.is_scalar() || resolved.is_vector() {
            let from = self.type_of(&e);
            if from.is_scalar() || from.is_vector() {
                return self.coerce(e, &resolved).at(span);
            }
        }
        if self.type_of(&e) == resolved {
            return e;
        }
        Expr::construct(to, vec![e]).at(span)
    }

    /// Rewrite a condition of `if`, `while` or `for`
    fn condition(&mut self, cond: Expr) -> Expr {
        let cond = self.expr(cond);
        self.condition_value(cond)
    }

    /// Wrap a non-bool scalar used as a condition in `bool(...)`
    fn condition_value(&mut self, e: Expr) -> Expr {
        let ty = self.type_of(&e);
        if ty.is_scalar() && !ty.is_bool() {
            let span = e.span;
            Expr::construct(Type::BOOL, vec![e]).at(span)
        } else {
            e
        }
    }

    fn is_front_facing(&self, e: &Expr) -> bool {
        e.as_var().map_or(false, |v| {
            let var = self.program().var(v);
            var.builtin && var.name == "gl_FrontFacing"
        })
    }

    /// `gl_FrontFacing` used as a number is `1.0` for front faces and `-1.0` for back faces.
    fn front_facing_value(&mut self, e: Expr) -> Expr {
        if !self.is_front_facing(&e) {
            return e;
        }
        let span = e.span;
        Expr::new(
            ExprKind::Conditional {
                cond: Box::new(e),
                then: Box::new(Expr::float(1.0)),
                otherwise: Box::new(Expr::float(-1.0)),
            },
            Some(Type::FLOAT),
        )
        .paren()
        .at(span)
    }

    /// Simplify `face > 0` style comparisons of `gl_FrontFacing` against a literal.
    fn front_facing_comparison(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: SourceSpan) -> Option<Expr> {
        let (face, value, flipped) = if self.is_front_facing(lhs) {
            (lhs, literal_value(rhs)?, false)
        } else if self.is_front_facing(rhs) {
            (rhs, literal_value(lhs)?, true)
        } else {
            return None;
        };
        let compare = |face_value: f64| {
            let (a, b) = if flipped { (value, face_value) } else { (face_value, value) };
            match op {
                BinaryOp::Less => a < b,
                BinaryOp::LessEqual => a <= b,
                BinaryOp::Greater => a > b,
                BinaryOp::GreaterEqual => a >= b,
                BinaryOp::Equal => a == b,
                _ => a != b,
            }
        };
        let face = face.clone();
        Some(
            match (compare(1.0), compare(-1.0)) {
                (true, false) => face,
                (false, true) => Expr::unary(UnaryOp::Not, face),
                (always, _) => Expr::bool(always),
            }
            .at(span),
        )
    }

    /// Convert `e` to the kind of `kind`, keeping its shape
    pub(crate) fn coerce_kind(&mut self, e: Expr, kind: ScalarKind) -> Expr {
        let ty = self.type_of(&e);
        match ty.scalar_kind() {
            Some(k) if !same_kind(k, kind) && !ty.is_matrix() => self.coerce(e, &ty.with_kind(kind)),
            _ => e,
        }
    }

    /// Convert `e` to `to` the way HLSL converts implicitly: extra components are dropped,
    /// scalars are broadcast and missing components are zero.
    pub(crate) fn coerce(&mut self, e: Expr, to: &Type) -> Expr {
        let to = self.program().resolve_type(to).clone();
        let e = if to.is_numeric() && !to.is_bool() {
            self.front_facing_value(e)
        } else {
            e
        };
        let from = self.type_of(&e);
        if from == to {
            return e;
        }
        let (n, m, from_kind, to_kind) = match (from.components(), to.components(), from.scalar_kind(), to.scalar_kind()) {
            (Some(n), Some(m), Some(fk), Some(tk)) => (n, m, fk, tk),
            _ => return e,
        };
        if n == m && same_kind(from_kind, to_kind) {
            return e;
        }
        let span = e.span;

        if let ExprKind::Literal(literal) = e.kind {
            let literal = Expr::lit(convert_literal(literal, to_kind)).at(span);
            return if m == 1 {
                literal
            } else {
                Expr::construct(to, vec![literal]).at(span)
            };
        }

        let mut e = e;
        let mut n = n;
        if n > m {
            e = e.swizzle(&COMPONENTS[..m as usize], Type::vector(from_kind, m)).at(span);
            n = m;
            if same_kind(from_kind, to_kind) {
                return e;
            }
        }
        if n == m || n == 1 {
            return Expr::construct(to, vec![e]).at(span);
        }
        let mut args = vec![e];
        for _ in n..m {
            args.push(Expr::zero_of(&Type::Scalar(to_kind)));
        }
        Expr::construct(to, args).at(span)
    }
}
