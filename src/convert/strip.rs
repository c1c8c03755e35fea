//! Removal of declarations the entry point cannot reach.
use std::collections::HashSet;

use crate::ast::{
    expr::{Callee, Expr, ExprKind},
    types::Type,
    visit::{declared_locals, walk_expr, walk_stmt_exprs},
    AliasId, Decl, FuncId, Program, StructId, VarId,
};

use super::ConvertContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Function(FuncId),
    Variable(VarId),
    Struct(StructId),
    Alias(AliasId),
}

/// Transitive closure of the declarations referenced from a set of roots
struct Reachability<'p> {
    program: &'p Program,
    reached: HashSet<Node>,
    pending: Vec<Node>,
}
impl<'p> Reachability<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            reached: HashSet::new(),
            pending: vec![],
        }
    }

    fn visit(&mut self, node: Node) {
        if self.reached.insert(node) {
            self.pending.push(node);
        }
    }

    fn visit_type(&mut self, ty: &Type) {
        match ty {
            Type::Struct(id) => self.visit(Node::Struct(*id)),
            Type::Alias(id) => self.visit(Node::Alias(*id)),
            Type::Array(elem, _) | Type::Stream(_, elem) => self.visit_type(elem),
            _ => {}
        }
    }

    fn visit_expr(&mut self, e: &'p Expr) {
        let mut nodes = vec![];
        let mut types: Vec<&'p Type> = vec![];
        walk_expr(e, &mut |e| {
            types.extend(e.ty.as_ref());
            match &e.kind {
                ExprKind::Var(id) | ExprKind::Field { field: id, .. } => nodes.push(Node::Variable(*id)),
                ExprKind::Call {
                    callee: Callee::Function(f),
                    ..
                } => nodes.push(Node::Function(*f)),
                ExprKind::Call {
                    callee: Callee::Constructor(ty),
                    ..
                }
                | ExprKind::Cast { ty, .. } => types.push(ty),
                _ => {}
            }
        });
        for node in nodes {
            self.visit(node);
        }
        for ty in types {
            self.visit_type(ty);
        }
    }

    fn run(&mut self) {
        let program = self.program;
        while let Some(node) = self.pending.pop() {
            match node {
                Node::Function(f) => {
                    let func = program.function(f);
                    self.visit_type(&func.return_type);
                    for p in &func.params {
                        self.visit(Node::Variable(*p));
                    }
                    for a in &func.attributes {
                        for arg in &a.args {
                            self.visit_expr(arg);
                        }
                    }
                    if let Some(body) = &func.body {
                        for v in declared_locals(body) {
                            self.visit(Node::Variable(v));
                        }
                        let mut exprs = vec![];
                        walk_stmt_exprs(program, body, &mut |e| exprs.push(e));
                        for e in exprs {
                            self.visit_expr(e);
                        }
                    }
                    // Prototypes and overloads share the name
                    for other in program.function_ids() {
                        if program.function(other).name == func.name {
                            self.visit(Node::Function(other));
                        }
                    }
                }
                Node::Variable(v) => {
                    let var = program.var(v);
                    self.visit_type(&var.ty);
                    if let Some(init) = &var.initializer {
                        self.visit_expr(init);
                    }
                }
                Node::Struct(s) => {
                    for field in &program.struct_type(s).fields {
                        self.visit(Node::Variable(*field));
                    }
                }
                Node::Alias(a) => self.visit_type(&program.alias(a).ty),
            }
        }
    }
}

/// Drop every top-level declaration not reachable from the entry point, the combined
/// samplers and, when constant buffers are kept, the constant buffer members.
pub fn strip_unreachable(ctx: &mut ConvertContext) {
    let keep_cbuffers = ctx.config.keep_constant_buffers;
    let reached = {
        let program = &ctx.program;
        let mut reach = Reachability::new(program);
        reach.visit(Node::Function(ctx.entry));
        for v in ctx.samplers.declared_vars(ctx.config.sampler_mode) {
            reach.visit(Node::Variable(v));
        }
        if keep_cbuffers {
            for cb in program.cbuffer_ids() {
                for m in &program.cbuffer(cb).members {
                    reach.visit(Node::Variable(*m));
                }
            }
        }
        reach.run();
        reach.reached
    };

    let before = ctx.program.decls.len();
    let decls = std::mem::take(&mut ctx.program.decls);
    for decl in decls {
        let keep = match &decl {
            Decl::Function(f) => reached.contains(&Node::Function(*f)),
            Decl::Variables(vars) => {
                let vars: Vec<VarId> = vars
                    .iter()
                    .copied()
                    .filter(|v| reached.contains(&Node::Variable(*v)))
                    .collect();
                if !vars.is_empty() {
                    ctx.program.decls.push(Decl::Variables(vars));
                }
                continue;
            }
            Decl::Struct(s) => reached.contains(&Node::Struct(*s)),
            Decl::TypeAlias(a) => reached.contains(&Node::Alias(*a)),
            Decl::ConstantBuffer(cb) => {
                if !keep_cbuffers {
                    ctx.program
                        .cbuffer_mut(*cb)
                        .members
                        .retain(|m| reached.contains(&Node::Variable(*m)));
                }
                !ctx.program.cbuffer(*cb).members.is_empty()
            }
            Decl::Layout(_) => true,
        };
        if keep {
            ctx.program.decls.push(decl);
        }
    }
    tracing::debug!(
        removed = before.saturating_sub(ctx.program.decls.len()),
        "stripped unreachable declarations"
    );
}
