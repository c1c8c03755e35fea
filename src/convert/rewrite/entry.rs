//! Entry point signature.
//!
//! Parameters and the return value of the entry point carry semantics. Each leaf of
//! them (a scalar, vector or matrix, possibly inside nested structs) is bound to a
//! global by [LocationBinder](crate::convert::layout::LocationBinder), and the function
//! becomes `void main()` reading those globals on entry and writing them at every
//! `return`.
use crate::{
    ast::{
        expr::{BinaryOp, Expr, ExprKind, Stmt, StmtKind, UnaryOp},
        types::{GeometryPrimitive, Type},
        visit::assigned_vars,
        Decl, Direction, LayoutDecl, Qualifiers, VarId,
    },
    config::{Capabilities, PipelineStage},
    convert::{layout::BoundSemantic, ConvertContext},
    error::{ConvertError, SourceSpan},
    glsl::builtins::{builtin_for, Builtin},
    hlsl::semantic::Semantic,
};

use super::{literal_value, Rewriter};

/// A value with a semantic, reached from a parameter or return value through `path`
#[derive(Debug, Clone)]
struct Leaf {
    path: Vec<(VarId, Type)>,
    semantic: Option<String>,
    name: String,
    ty: Type,
}
impl Leaf {
    fn access(&self, base: Expr) -> Expr {
        self.path
            .iter()
            .fold(base, |e, (field, ty)| e.field(*field, ty.clone()))
    }
}

/// Where one output leaf is written
#[derive(Debug, Clone)]
struct OutputTarget {
    leaf: Leaf,
    bound: BoundSemantic,
}

/// Outputs of the entry point being converted
#[derive(Debug, Default)]
pub(super) struct EntryState {
    returns: Vec<OutputTarget>,
    /// Locals standing in for `out` parameters and the globals they are copied to
    writebacks: Vec<(Expr, OutputTarget)>,
    stream: Option<Vec<OutputTarget>>,
}

fn leaves(ctx: &ConvertContext, ty: &Type, semantic: Option<&str>, name: &str, path: Vec<(VarId, Type)>, out: &mut Vec<Leaf>) {
    match ctx.program.resolve_type(ty) {
        Type::Struct(id) => {
            for field in ctx.program.struct_type(*id).fields.clone() {
                let var = ctx.program.var(field);
                let name = if name.is_empty() {
                    var.name.clone()
                } else {
                    format!("{}_{}", name, var.name)
                };
                let mut path = path.clone();
                path.push((field, var.ty.clone()));
                let semantic = var.semantic.as_deref().or(semantic);
                leaves(ctx, &var.ty.clone(), semantic, &name, path, out);
            }
        }
        _ => out.push(Leaf {
            path,
            semantic: semantic.map(str::to_string),
            name: name.to_string(),
            ty: ty.clone(),
        }),
    }
}

fn parse_semantic(ctx: &mut ConvertContext, leaf: &Leaf, span: SourceSpan) -> Option<Semantic> {
    let text = match &leaf.semantic {
        Some(text) => text,
        None => {
            ctx.error(ConvertError::MissingSemantic(leaf.name.clone()), span);
            return None;
        }
    };
    match Semantic::parse(text) {
        Ok(semantic) => Some(semantic),
        Err(e) => {
            ctx.error(e, span);
            None
        }
    }
}

fn bind(ctx: &mut ConvertContext, leaf: &Leaf, ty: &Type, direction: Direction, span: SourceSpan) -> Option<BoundSemantic> {
    let semantic = parse_semantic(ctx, leaf, span)?;
    let result = ctx.locations.bind_location(
        &mut ctx.program,
        ctx.config,
        &mut ctx.diagnostics,
        &semantic,
        ty,
        direction,
        &leaf.name,
        span,
    );
    match result {
        Ok(bound) => Some(bound),
        Err(e) => {
            ctx.error(e, span);
            None
        }
    }
}

fn bind_outputs(ctx: &mut ConvertContext, leaves: Vec<Leaf>, span: SourceSpan) -> Vec<OutputTarget> {
    leaves
        .into_iter()
        .filter_map(|leaf| {
            let ty = leaf.ty.clone();
            bind(ctx, &leaf, &ty, Direction::Out, span).map(|bound| OutputTarget { leaf, bound })
        })
        .collect()
}

fn attribute_value(rw: &Rewriter, name: &str, arg: usize) -> Option<u32> {
    let func = rw.program().function(rw.ctx.entry);
    let value = literal_value(func.attribute(name)?.args.get(arg)?)?;
    Some(value.max(0.0) as u32)
}

/// Rewrite the entry point into `void main()`.
pub(super) fn convert_entry(ctx: &mut ConvertContext) {
    let entry = ctx.entry;
    let func = ctx.program.function(entry).clone();
    let mut body = match ctx.program.function_mut(entry).body.take() {
        Some(body) => body,
        None => {
            let message = format!("entry point {} without a body", func.name);
            ctx.error(ConvertError::Unsupported(message), func.span);
            return;
        }
    };
    tracing::debug!(name = %func.name, params = func.params.len(), "converting entry point");

    let assigned = assigned_vars(&ctx.program, &body);
    let mut rw = Rewriter::new(ctx, Type::Void);
    let mut state = EntryState::default();
    let mut prologue = vec![];
    for &p in &func.params {
        parameter(&mut rw, p, assigned.contains(&p), &mut state, &mut prologue);
    }

    if !matches!(rw.program().resolve_type(&func.return_type), Type::Void) {
        let mut found = vec![];
        leaves(rw.ctx, &func.return_type, func.return_semantic.as_deref(), "", vec![], &mut found);
        state.returns = bind_outputs(rw.ctx, found, func.span);
    }

    if rw.ctx.config.stage == PipelineStage::Compute {
        let size: Vec<(String, Option<u32>)> = ["local_size_x", "local_size_y", "local_size_z"]
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), Some(attribute_value(&rw, "numthreads", i).unwrap_or(1))))
            .collect();
        rw.ctx.program.decls.push(Decl::Layout(LayoutDecl {
            direction: Direction::In,
            entries: size,
        }));
    }

    rw.entry = Some(state);
    let trailing = match body.last() {
        Some(s) if s.is_return() => body.pop(),
        _ => None,
    };
    let mut stmts = prologue;
    stmts.extend(rw.stmts(body));
    match trailing {
        Some(Stmt {
            kind: StmtKind::Return(value),
            span,
        }) => stmts.extend(rw.return_stmt(value, false, span)),
        _ => stmts.extend(convert_return(&mut rw, None, false, func.span)),
    }

    let main = ctx.program.function_mut(entry);
    main.body = Some(stmts);
    main.params.clear();
    main.return_type = Type::Void;
    main.return_semantic = None;
    main.name = "main".to_string();
    main.attributes.clear();
}

fn parameter(rw: &mut Rewriter, p: VarId, assigned: bool, state: &mut EntryState, prologue: &mut Vec<Stmt>) {
    let var = rw.program().var(p).clone();
    let span = var.span;
    let ty = rw.program().resolve_type(&var.ty).clone();

    if let Type::Stream(kind, elem) = &ty {
        if !rw.ctx.config.capabilities.contains(Capabilities::GEOMETRY_STREAMS) {
            rw.ctx.error(
                ConvertError::MissingCapability {
                    construct: format!("geometry output stream {}", var.name),
                },
                span,
            );
            return;
        }
        let mut found = vec![];
        leaves(rw.ctx, elem, var.semantic.as_deref(), "", vec![], &mut found);
        state.stream = Some(bind_outputs(rw.ctx, found, span));
        let max_vertices = attribute_value(rw, "maxvertexcount", 0);
        rw.ctx.program.decls.push(Decl::Layout(LayoutDecl {
            direction: Direction::Out,
            entries: vec![
                (kind.layout_name().to_string(), None),
                ("max_vertices".to_string(), max_vertices),
            ],
        }));
        return;
    }

    if let Some(primitive) = var.primitive {
        primitive_input(rw, p, primitive, prologue);
        return;
    }

    if var.qualifiers.contains(Qualifiers::UNIFORM) {
        let global = rw.ctx.program.var_mut(p);
        global.name = format!("{}_uniform", global.name);
        global.qualifiers = Qualifiers::empty();
        global.semantic = None;
        rw.ctx.program.decls.push(Decl::Variables(vec![p]));
        return;
    }

    let is_struct = matches!(ty, Type::Struct(_));
    let is_output = var.qualifiers.contains(Qualifiers::OUT);
    let is_input = !is_output || var.qualifiers.contains(Qualifiers::IN);
    let base_name = if is_struct { String::new() } else { var.name.clone() };
    let mut found = vec![];
    leaves(rw.ctx, &var.ty, var.semantic.as_deref(), &base_name, vec![], &mut found);

    if !(is_struct || is_output || assigned) {
        let leaf = match found.into_iter().next() {
            Some(leaf) => leaf,
            None => return,
        };
        if let Some(bound) = bind(rw.ctx, &leaf, &leaf.ty.clone(), Direction::In, span) {
            let value = bound.to_expr(rw.program());
            let value = if rw.is_front_facing(&value) {
                value
            } else {
                rw.coerce(value, &var.ty)
            };
            rw.substitutions.insert(p, value);
        }
        return;
    }

    {
        let local = rw.ctx.program.var_mut(p);
        local.qualifiers = Qualifiers::empty();
        local.semantic = None;
        local.register = None;
        if !is_struct && !is_output {
            local.name = format!("local_{}", local.name);
        }
    }
    prologue.push(Stmt::decl(p).at(span));
    let local = Expr::var(p, var.ty.clone());

    for leaf in found {
        if is_input {
            if let Some(bound) = bind(rw.ctx, &leaf, &leaf.ty.clone(), Direction::In, span) {
                let value = bound.to_expr(rw.program());
                let value = rw.coerce(value, &leaf.ty);
                if leaf.path.is_empty() {
                    rw.ctx.program.var_mut(p).initializer = Some(value);
                } else {
                    prologue.push(Stmt::assign(leaf.access(local.clone()), value).at(span));
                }
            }
        }
        if is_output {
            if let Some(bound) = bind(rw.ctx, &leaf, &leaf.ty.clone(), Direction::Out, span) {
                let source = leaf.access(local.clone());
                state.writebacks.push((source, OutputTarget { leaf, bound }));
            }
        }
    }
}

/// Geometry shader input array: a local filled vertex by vertex from `gl_in` and from
/// unsized input arrays.
fn primitive_input(rw: &mut Rewriter, p: VarId, primitive: GeometryPrimitive, prologue: &mut Vec<Stmt>) {
    let var = rw.program().var(p).clone();
    let span = var.span;
    rw.ctx.program.decls.push(Decl::Layout(LayoutDecl {
        direction: Direction::In,
        entries: vec![(primitive.layout_name().to_string(), None)],
    }));
    {
        let local = rw.ctx.program.var_mut(p);
        local.qualifiers = Qualifiers::empty();
        local.semantic = None;
        local.primitive = None;
    }
    prologue.push(Stmt::decl(p).at(span));

    let elem = var.ty.element().clone();
    let mut found = vec![];
    leaves(rw.ctx, &elem, var.semantic.as_deref(), "", vec![], &mut found);
    let stage = rw.ctx.config.stage;
    let model = rw.ctx.config.shader_model;

    let mut sources = vec![];
    for leaf in found {
        let semantic = match parse_semantic(rw.ctx, &leaf, span) {
            Some(semantic) => semantic,
            None => continue,
        };
        let source = match builtin_for(stage, model, Direction::In, &semantic) {
            Some(Builtin::Var("gl_PrimitiveIDIn")) => {
                let id = rw
                    .ctx
                    .locations
                    .builtin_var(&mut rw.ctx.program, "gl_PrimitiveIDIn", Type::INT);
                Source::Plain(Expr::var(id, Type::INT))
            }
            Some(builtin) => {
                let per_vertex = Type::Array(Box::new(Type::Named("gl_PerVertex".to_string())), vec![None]);
                let gl_in = rw.ctx.locations.builtin_var(&mut rw.ctx.program, "gl_in", per_vertex);
                let member = rw
                    .ctx
                    .locations
                    .builtin_var(&mut rw.ctx.program, builtin.name(), leaf.ty.clone());
                let index = match builtin {
                    Builtin::Indexed(_) => Some(semantic.index),
                    Builtin::Var(_) => None,
                };
                Source::PerVertex { gl_in, member, index }
            }
            None => {
                let array = Type::Array(Box::new(leaf.ty.clone()), vec![None]);
                match bind(rw.ctx, &leaf, &array, Direction::In, span) {
                    Some(bound) => Source::Array(bound.var),
                    None => continue,
                }
            }
        };
        sources.push((leaf, source));
    }

    let count = match &var.ty {
        Type::Array(_, dims) if dims.iter().all(Option::is_some) => var.ty.array_len(),
        _ => primitive.vertex_count(),
    };
    for i in 0..count {
        let vertex = Expr::var(p, var.ty.clone()).index(Expr::int(i as i64), Some(elem.clone()));
        for (leaf, source) in &sources {
            let value = source.vertex(rw, i, &leaf.ty);
            let value = rw.coerce(value, &leaf.ty);
            prologue.push(Stmt::assign(leaf.access(vertex.clone()), value).at(span));
        }
    }
}

enum Source {
    Plain(Expr),
    PerVertex {
        gl_in: VarId,
        member: VarId,
        index: Option<u32>,
    },
    Array(VarId),
}
impl Source {
    fn vertex(&self, rw: &Rewriter, i: u32, ty: &Type) -> Expr {
        let vertex = Expr::int(i as i64);
        match self {
            Source::Plain(e) => e.clone(),
            Source::PerVertex { gl_in, member, index } => {
                let gl_in_ty = rw.program().var(*gl_in).ty.clone();
                let member_ty = rw.program().var(*member).ty.clone();
                let e = Expr::var(*gl_in, gl_in_ty.clone())
                    .index(vertex, Some(gl_in_ty.element().clone()))
                    .field(*member, member_ty);
                match index {
                    Some(k) => e.index(Expr::int(*k as i64), Some(ty.clone())),
                    None => e,
                }
            }
            Source::Array(var) => {
                let array_ty = rw.program().var(*var).ty.clone();
                Expr::var(*var, array_ty).index(vertex, Some(ty.clone()))
            }
        }
    }
}

/// Assign `value` to every output target
fn write_outputs(rw: &mut Rewriter, value: Expr, targets: &[OutputTarget], span: SourceSpan) -> Vec<Stmt> {
    if let [target] = targets {
        if target.leaf.path.is_empty() {
            let dest = target.bound.to_expr(rw.program());
            let value = rw.coerce(value, &target.bound.ty);
            return vec![Stmt::assign(dest, value).at(span)];
        }
    }
    let is_lvalue = value.root_var().is_some()
        && matches!(value.kind, ExprKind::Var(_) | ExprKind::Field { .. } | ExprKind::Index { .. });
    let mut stmts = vec![];
    let base = if is_lvalue {
        value
    } else {
        let ty = rw.type_of(&value);
        let temp = rw.ctx.add_local("_local_ret_", ty.clone(), Some(value));
        stmts.push(Stmt::decl(temp).at(span));
        Expr::var(temp, ty)
    };
    for target in targets {
        let dest = target.bound.to_expr(rw.program());
        let source = target.leaf.access(base.clone());
        let source = rw.coerce(source, &target.bound.ty);
        stmts.push(Stmt::assign(dest, source).at(span));
    }
    if is_lvalue {
        stmts
    } else {
        vec![Stmt::block(stmts).at(span)]
    }
}

/// Output writes replacing `return value;` in the entry point
pub(super) fn convert_return(rw: &mut Rewriter, value: Option<Expr>, emit_return: bool, span: SourceSpan) -> Vec<Stmt> {
    let state = match rw.entry.take() {
        Some(state) => state,
        None => return vec![Stmt::new(StmtKind::Return(value)).at(span)],
    };
    let mut stmts = vec![];
    if let Some(value) = value {
        let value = rw.expr(value);
        stmts.extend(write_outputs(rw, value, &state.returns, span));
    }
    for (local, target) in &state.writebacks {
        let dest = target.bound.to_expr(rw.program());
        let source = rw.coerce(local.clone(), &target.bound.ty);
        stmts.push(Stmt::assign(dest, source).at(span));
    }
    rw.entry = Some(state);

    let position = match rw.ctx.locations.builtin("gl_Position") {
        Some(id) if rw.ctx.config.stage == PipelineStage::Vertex => Some(id),
        _ => None,
    };
    if let Some(id) = position {
        let pos = Expr::var(id, Type::float_vec(4));
        let component = |c: &str| pos.clone().swizzle(c, Type::FLOAT);
        if rw.ctx.config.remap_depth {
            let scaled = Expr::binary(
                BinaryOp::Mul,
                component("z"),
                Expr::float(2.0),
                Some(Type::FLOAT),
            );
            let remapped = Expr::binary(BinaryOp::Sub, scaled, component("w"), Some(Type::FLOAT));
            stmts.push(Stmt::assign(component("z"), remapped).at(span));
        }
        if rw.ctx.config.flip_y {
            let flipped = Expr::unary(UnaryOp::Neg, component("y"));
            stmts.push(Stmt::assign(component("y"), flipped).at(span));
        }
    }

    if emit_return {
        stmts.push(Stmt::new(StmtKind::Return(None)).at(span));
    }
    stmts
}

/// `stream.Append(v)` and `stream.RestartStrip()` in a geometry shader
pub(super) fn stream_call(rw: &mut Rewriter, e: Expr, span: SourceSpan) -> Vec<Stmt> {
    let (method, mut args) = match e.kind {
        ExprKind::Method { method, args, .. } => (method, args),
        kind => return vec![Stmt::expr(rw.expr(Expr::new(kind, e.ty))).at(span)],
    };
    if method == "RestartStrip" {
        return vec![Stmt::expr(Expr::call("EndPrimitive", vec![], None)).at(span)];
    }
    let targets = match rw.entry.as_ref().and_then(|s| s.stream.clone()) {
        Some(targets) => targets,
        None => {
            rw.ctx.error(
                ConvertError::Unsupported("Append on a stream that is not an entry point parameter".to_string()),
                span,
            );
            return vec![];
        }
    };
    if args.len() != 1 {
        rw.ctx.error(
            ConvertError::Unsupported(format!("Append with {} arguments, expected 1", args.len())),
            span,
        );
        return vec![];
    }
    let value = rw.expr(args.remove(0));
    let mut stmts = write_outputs(rw, value, &targets, span);
    stmts.push(Stmt::expr(Expr::call("EmitVertex", vec![], None)).at(span));
    stmts
}
