//! Last pass over the rewritten program: storage qualifiers, bindings, constant buffers,
//! target type names and identifier escaping.
use std::collections::HashSet;

use crate::{
    ast::{
        expr::{Callee, Expr, ExprKind},
        types::Type,
        visit::{assigned_vars, walk_expr_mut, walk_stmt_exprs_mut},
        Decl, Location, Program, Qualifiers, VarId,
    },
    config::{Capabilities, PipelineStage, SamplerMode},
    error::ConvertError,
    glsl::{keywords::escape_unique, types::map_type},
    hlsl::syntax::RegisterHint,
};

use super::{
    layout::{LocationAssignment, SlotClass},
    ConvertContext,
};

pub fn run(ctx: &mut ConvertContext) {
    remove_separate_objects(ctx);
    qualify_globals(ctx);
    assign_bindings(ctx);
    lower_constant_buffers(ctx);
    map_types(ctx);
    clear_annotations(ctx);
    split_declarations(&mut ctx.program);
    order_declarations(&mut ctx.program);
    escape_names(ctx);
    fill_report(ctx);
}

/// The report names every declaration as it is finally spelled.
fn fill_report(ctx: &mut ConvertContext) {
    let program = &ctx.program;
    let renamed = |mut a: LocationAssignment| {
        a.name = program.var(a.var).name.clone();
        a
    };
    ctx.report.inputs = ctx.locations.inputs.iter().cloned().map(renamed).collect();
    ctx.report.outputs = ctx.locations.outputs.iter().cloned().map(renamed).collect();
    if ctx.config.stage == PipelineStage::Vertex {
        ctx.report.attributes = ctx
            .report
            .inputs
            .iter()
            .filter_map(|a| match a.location {
                Location::Index(i) => Some((i, a.name.clone())),
                Location::Named(_) => None,
            })
            .collect();
    }

    for mut assignment in ctx.bindings.assignments() {
        assignment.name = program.var(assignment.var).name.clone();
        match assignment.class {
            SlotClass::Sampler => ctx.report.sampler_bindings.push(assignment),
            SlotClass::Uniform => ctx.report.uniform_bindings.push(assignment),
        }
    }

    ctx.report.constant_buffers = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::ConstantBuffer(id) => {
                let cb = program.cbuffer(*id);
                cb.binding.map(|b| (cb.name.clone(), b))
            }
            _ => None,
        })
        .collect();
}

fn retain_globals(program: &mut Program, mut keep: impl FnMut(VarId) -> bool) {
    for d in &mut program.decls {
        if let Decl::Variables(vars) = d {
            vars.retain(|v| keep(*v));
        }
    }
    program
        .decls
        .retain(|d| !matches!(d, Decl::Variables(vars) if vars.is_empty()));
}

/// With combined samplers, the separate texture and sampler globals are replaced.
fn remove_separate_objects(ctx: &mut ConvertContext) {
    if ctx.config.sampler_mode != SamplerMode::Combined {
        return;
    }
    let replaced: HashSet<VarId> = ctx
        .samplers
        .entries()
        .iter()
        .flat_map(|e| e.key.sampler.into_iter().chain(Some(e.key.texture)))
        .collect();
    retain_globals(&mut ctx.program, |v| !replaced.contains(&v));
}

fn written_globals(program: &Program) -> HashSet<VarId> {
    program
        .function_ids()
        .filter_map(|f| program.function(f).body.as_ref())
        .flat_map(|body| assigned_vars(program, body))
        .collect()
}

/// HLSL globals are uniforms unless marked otherwise. ES 2.0 spells stage inputs and
/// outputs `attribute` and `varying`.
fn qualify_globals(ctx: &mut ConvertContext) {
    let written = written_globals(&ctx.program);
    let es2 = ctx.config.is_es2();
    let stage = ctx.config.stage;
    let globals: Vec<VarId> = ctx
        .program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Variables(vars) => Some(vars.clone()),
            _ => None,
        })
        .flatten()
        .collect();

    for v in globals {
        let var = ctx.program.var_mut(v);
        if var.builtin {
            continue;
        }
        let shared = var.qualifiers.intersects(Qualifiers::SHARED | Qualifiers::GROUPSHARED);
        if var.is_uniform_like() && !shared && !written.contains(&v) {
            var.qualifiers |= Qualifiers::UNIFORM;
        }
        var.qualifiers.remove(Qualifiers::STATIC | Qualifiers::EXTERN);
        if es2 {
            if var.qualifiers.contains(Qualifiers::IN) {
                var.qualifiers.remove(Qualifiers::IN);
                var.qualifiers |= match stage {
                    PipelineStage::Vertex => Qualifiers::ATTRIBUTE,
                    _ => Qualifiers::VARYING,
                };
            } else if var.qualifiers.contains(Qualifiers::OUT) {
                var.qualifiers.remove(Qualifiers::OUT);
                var.qualifiers |= Qualifiers::VARYING;
            }
        }
    }
}

fn assign_bindings(ctx: &mut ConvertContext) {
    if !ctx.config.explicit_bindings {
        return;
    }
    let uniforms: Vec<VarId> = ctx
        .program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Variables(vars) => Some(vars.clone()),
            _ => None,
        })
        .flatten()
        .filter(|v| ctx.program.var(*v).qualifiers.contains(Qualifiers::UNIFORM))
        .collect();
    ctx.bindings
        .allocate_all(&ctx.program, &uniforms, &mut ctx.diagnostics);
    for v in uniforms {
        if let Some(binding) = ctx.bindings.binding_of(v) {
            ctx.program.var_mut(v).layout.binding = Some(binding);
        }
    }
}

/// `cbuffer`s become `std140` uniform blocks, or plain uniforms when blocks are
/// unavailable or not wanted.
fn lower_constant_buffers(ctx: &mut ConvertContext) {
    let as_blocks = ctx.config.keep_constant_buffers
        && ctx.config.capabilities.contains(Capabilities::UNIFORM_BLOCKS);
    let mut decls = std::mem::take(&mut ctx.program.decls);
    for d in &mut decls {
        let id = match d {
            Decl::ConstantBuffer(id) => *id,
            _ => continue,
        };
        let cb = ctx.program.cbuffer(id).clone();
        for &m in &cb.members {
            let member = ctx.program.var_mut(m);
            member.register = None;
            if member.initializer.take().is_some() {
                let message = format!(
                    "Initializer of constant buffer member {} in {} is dropped",
                    member.name, cb.name
                );
                let span = member.span;
                ctx.warning(message, span);
            }
        }

        let configured = cb
            .register
            .as_ref()
            .and_then(|r| ctx.config.constant_buffer_bindings.get(r))
            .or_else(|| ctx.config.constant_buffer_bindings.get(&cb.name))
            .copied();
        let binding = match configured {
            Some(binding) => Some(binding),
            // `bN` binds at N + 1, binding 0 stays free
            None => match cb.register.as_deref().map(RegisterHint::parse) {
                Some(Ok(hint)) if hint.class == 'b' => Some(hint.index + 1),
                Some(Ok(_)) => None,
                Some(Err(_)) => {
                    ctx.error(ConvertError::InvalidRegister(cb.register.clone().unwrap_or_default()), cb.span);
                    None
                }
                None => None,
            },
        };

        if as_blocks {
            let block = ctx.program.cbuffer_mut(id);
            block.std140 = true;
            block.binding = binding;
            tracing::debug!(name = %cb.name, ?binding, "uniform block");
        } else {
            for &m in &cb.members {
                ctx.program.var_mut(m).qualifiers |= Qualifiers::UNIFORM;
            }
            tracing::debug!(name = %cb.name, members = cb.members.len(), "flattened constant buffer");
            *d = Decl::Variables(cb.members.clone());
        }
    }
    ctx.program.decls = decls;
}

fn map_types(ctx: &mut ConvertContext) {
    let layout = ctx.config.matrix_layout;

    // Anonymous structs take the name of the typedef naming them
    for a in ctx.program.alias_ids().collect::<Vec<_>>() {
        let alias = ctx.program.alias(a).clone();
        if let Type::Struct(s) = alias.ty {
            let st = ctx.program.struct_type_mut(s);
            if st.name.is_empty() {
                st.name = alias.name;
            }
        }
    }
    ctx.program
        .decls
        .retain(|d| !matches!(d, Decl::TypeAlias(_)));

    let program = ctx.program.clone();
    let map = |ty: &mut Type| *ty = map_type(&program, ty, layout);
    let mut map_expr = |e: &mut Expr| {
        walk_expr_mut(e, &mut |e| {
            if let Some(ty) = &mut e.ty {
                map(ty);
            }
            match &mut e.kind {
                ExprKind::Call {
                    callee: Callee::Constructor(ty),
                    ..
                }
                | ExprKind::Cast { ty, .. } => map(ty),
                _ => {}
            }
        })
    };

    for v in program.var_ids() {
        let var = ctx.program.var_mut(v);
        map(&mut var.ty);
        if let Some(init) = &mut var.initializer {
            map_expr(init);
        }
    }
    for f in program.function_ids() {
        let func = ctx.program.function_mut(f);
        map(&mut func.return_type);
        if let Some(body) = &mut func.body {
            walk_stmt_exprs_mut(body, &mut map_expr);
        }
    }
}

/// Semantics, registers and default parameter values have no target spelling.
fn clear_annotations(ctx: &mut ConvertContext) {
    for v in ctx.program.var_ids().collect::<Vec<_>>() {
        let var = ctx.program.var_mut(v);
        var.semantic = None;
        var.register = None;
    }
    for f in ctx.program.function_ids().collect::<Vec<_>>() {
        let func = ctx.program.function(f).clone();
        for p in func.params {
            ctx.program.var_mut(p).initializer = None;
        }
        ctx.program.function_mut(f).return_semantic = None;
    }
}

/// `float a, b;` becomes one declaration per variable
fn split_declarations(program: &mut Program) {
    let decls = std::mem::take(&mut program.decls);
    for d in decls {
        match d {
            Decl::Variables(vars) if vars.len() > 1 => {
                program
                    .decls
                    .extend(vars.into_iter().map(|v| Decl::Variables(vec![v])));
            }
            d => program.decls.push(d),
        }
    }
}

/// Layout declarations and types first, then globals, then functions, keeping the
/// relative order within each group.
fn order_declarations(program: &mut Program) {
    program.decls.sort_by_key(|d| match d {
        Decl::Layout(_) => 0,
        Decl::Struct(_) | Decl::TypeAlias(_) => 1,
        Decl::Variables(_) | Decl::ConstantBuffer(_) => 2,
        Decl::Function(_) => 3,
    });
}

/// Escapes never reuse a name already declared in the program.
fn escape_names(ctx: &mut ConvertContext) {
    let program = &ctx.program;
    let mut taken: HashSet<String> = program
        .var_ids()
        .map(|v| program.var(v).name.clone())
        .chain(program.function_ids().map(|f| program.function(f).name.clone()))
        .chain(program.struct_ids().map(|s| program.struct_type(s).name.clone()))
        .chain(program.cbuffer_ids().map(|c| program.cbuffer(c).name.clone()))
        .collect();

    for v in ctx.program.var_ids().collect::<Vec<_>>() {
        let var = ctx.program.var_mut(v);
        if !var.builtin {
            var.name = escape_unique(&var.name, &mut taken);
        }
    }
    for f in ctx.program.function_ids().collect::<Vec<_>>() {
        if f != ctx.entry {
            let func = ctx.program.function_mut(f);
            func.name = escape_unique(&func.name, &mut taken);
        }
    }
    for s in ctx.program.struct_ids().collect::<Vec<_>>() {
        let st = ctx.program.struct_type_mut(s);
        st.name = escape_unique(&st.name, &mut taken);
    }
    for c in ctx.program.cbuffer_ids().collect::<Vec<_>>() {
        let cb = ctx.program.cbuffer_mut(c);
        cb.name = escape_unique(&cb.name, &mut taken);
    }
}
