//! Pairing of textures with the sampler states they are sampled through.
//!
//! HLSL keeps textures and samplers apart and pairs them at each sampling call; GLSL
//! (outside Vulkan) only knows combined samplers. Every distinct `(sampler, texture)` pair
//! reachable from the entry point gets one [CombinedSampler]. `Load` and
//! `GetDimensions` take no sampler and reuse whatever pair already exists for their
//! texture, falling back to a `(None, texture)` pair.
use std::collections::{HashMap, HashSet};

use crate::{
    ast::{
        expr::{Callee, Expr, ExprKind},
        types::{SamplerKind, ScalarKind, TextureDim, Type},
        Decl, FuncId, Function, Program, VarId, Variable,
    },
    config::SamplerMode,
    error::{ConvertError, SourceSpan},
    glsl::{intrinsics::texture_method, types::combined_sampler_name},
};

use super::ConvertContext;

/// Name of the placeholder sampler used for fetches without a sampler state
pub const NO_SAMPLER: &str = "NoSampler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerTextureKey {
    pub sampler: Option<VarId>,
    pub texture: VarId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSampler {
    pub key: SamplerTextureKey,
    /// Generated global, declared only in [SamplerMode::Combined]
    pub var: VarId,
    pub dim: TextureDim,
    pub kind: Option<ScalarKind>,
    pub shadow: bool,
}
impl CombinedSampler {
    pub fn type_name(&self) -> String {
        combined_sampler_name(self.dim, self.kind, self.shadow)
    }
}

#[derive(Debug, Default)]
pub struct SamplerTable {
    entries: Vec<CombinedSampler>,
    by_key: HashMap<SamplerTextureKey, usize>,
    no_sampler: Option<VarId>,
}
impl SamplerTable {
    pub fn get(&self, key: SamplerTextureKey) -> Option<&CombinedSampler> {
        self.by_key.get(&key).map(|i| &self.entries[*i])
    }

    /// The first pair created for `texture`, whatever its sampler
    pub fn for_texture(&self, texture: VarId) -> Option<&CombinedSampler> {
        self.entries.iter().find(|e| e.key.texture == texture)
    }

    pub fn entries(&self) -> &[CombinedSampler] {
        &self.entries
    }

    pub fn no_sampler(&self) -> Option<VarId> {
        self.no_sampler
    }

    /// Globals the combined samplers introduce
    pub fn declared_vars(&self, mode: SamplerMode) -> Vec<VarId> {
        match mode {
            SamplerMode::Combined => self.entries.iter().map(|e| e.var).collect(),
            SamplerMode::SeparateCollapsed => self.no_sampler.into_iter().collect(),
        }
    }

    fn get_or_insert(&mut self, program: &mut Program, mode: SamplerMode, key: SamplerTextureKey) -> Option<usize> {
        if let Some(index) = self.by_key.get(&key) {
            return Some(*index);
        }
        let texture = program.var(key.texture).clone();
        let (dim, kind, dims) = match program.resolve_type(&texture.ty) {
            Type::Texture(dim, kind) => (*dim, *kind, None),
            Type::Array(elem, dims) => match elem.as_ref() {
                Type::Texture(dim, kind) => (*dim, *kind, Some(dims.clone())),
                _ => return None,
            },
            _ => return None,
        };
        let (sampler_name, shadow) = match key.sampler {
            Some(s) => {
                let sampler = program.var(s);
                (
                    sampler.name.clone(),
                    matches!(program.resolve_type(&sampler.ty), Type::Sampler(SamplerKind::Comparison)),
                )
            }
            None => (NO_SAMPLER.to_string(), false),
        };

        let name = format!("{}_{}", texture.name, sampler_name);
        let mut ty = Type::Named(combined_sampler_name(dim, kind, shadow));
        if let Some(dims) = dims {
            ty = Type::Array(Box::new(ty), dims);
        }
        let mut var = Variable::new(&name, ty).at(texture.span);
        var.register = texture.register.clone();
        let var = match mode {
            SamplerMode::Combined => program.push_global(var),
            SamplerMode::SeparateCollapsed => {
                if key.sampler.is_none() && self.no_sampler.is_none() {
                    let placeholder = Variable::new(NO_SAMPLER, Type::Sampler(SamplerKind::State));
                    self.no_sampler = Some(program.push_global(placeholder));
                }
                program.add_var(var)
            }
        };
        tracing::debug!(%name, ?key, "combined sampler");

        self.entries.push(CombinedSampler {
            key,
            var,
            dim,
            kind,
            shadow,
        });
        self.by_key.insert(key, self.entries.len() - 1);
        Some(self.entries.len() - 1)
    }

    /// Expression standing for a combined sampler at a use site, indexed when the texture
    /// is an array.
    pub fn use_expr(&self, program: &Program, mode: SamplerMode, entry: &CombinedSampler, index: Option<Expr>) -> Expr {
        let index_into = |base: Expr| match &index {
            Some(i) => {
                let elem = base.ty.as_ref().map(|t| t.element().clone());
                base.index(i.clone(), elem)
            }
            None => base,
        };
        match mode {
            SamplerMode::Combined => index_into(Expr::var(entry.var, program.var(entry.var).ty.clone())),
            SamplerMode::SeparateCollapsed => {
                let texture = index_into(Expr::var(entry.key.texture, program.var(entry.key.texture).ty.clone()));
                let mut args = vec![texture];
                args.extend(
                    entry
                        .key
                        .sampler
                        .or(self.no_sampler)
                        .map(|s| Expr::var(s, program.var(s).ty.clone())),
                );
                Expr::construct(Type::Named(entry.type_name()), args)
            }
        }
    }
}

/// The global a texture or sampler expression refers to, looking through parentheses,
/// array indexing and locals initialised from a global.
pub fn resolve_object(program: &Program, globals: &HashSet<VarId>, e: &Expr) -> Option<VarId> {
    match &e.kind {
        ExprKind::Var(id) if globals.contains(id) => Some(*id),
        ExprKind::Var(id) => program
            .var(*id)
            .initializer
            .as_ref()
            .and_then(|init| resolve_object(program, globals, init)),
        ExprKind::Paren(inner) | ExprKind::Index { base: inner, .. } => resolve_object(program, globals, inner),
        _ => None,
    }
}

/// Walk every function reachable from the entry point, specialising calls with object
/// arguments and recording the sampler/texture pairs used.
pub fn combine(ctx: &mut ConvertContext) {
    let globals: HashSet<VarId> = ctx.program.global_vars().into_iter().collect();
    let mode = ctx.config.sampler_mode;
    let mut queue = vec![ctx.entry];
    let mut visited = HashSet::new();
    let mut specialised: HashMap<(FuncId, Vec<VarId>), FuncId> = HashMap::new();
    let mut deferred = vec![];

    while let Some(func) = queue.pop() {
        if !visited.insert(func) {
            continue;
        }
        let mut body = match ctx.program.function_mut(func).body.take() {
            Some(body) => body,
            None => continue,
        };

        ctx.rewrite_exprs_in(&mut body, &mut |ctx, e| {
            let span = e.span;
            match &mut e.kind {
                ExprKind::Call {
                    callee: Callee::Function(callee),
                    args,
                } => {
                    let params = ctx.program.function(*callee).params.clone();
                    let objects: Vec<usize> = params
                        .iter()
                        .enumerate()
                        .filter(|(i, p)| *i < args.len() && ctx.program.var(**p).ty.is_object())
                        .map(|(i, _)| i)
                        .collect();
                    if objects.is_empty() {
                        queue.push(*callee);
                        return;
                    }
                    let bound: Option<Vec<VarId>> = objects
                        .iter()
                        .map(|i| resolve_object(&ctx.program, &globals, &args[*i]))
                        .collect();
                    let bound = match bound {
                        Some(bound) => bound,
                        None => {
                            let name = ctx.program.function(*callee).name.clone();
                            ctx.error(ConvertError::UnresolvedTexture(name), span);
                            queue.push(*callee);
                            return;
                        }
                    };
                    let key = (*callee, bound);
                    let target = match specialised.get(&key) {
                        Some(f) => *f,
                        None => {
                            let f = specialise(ctx, key.0, &objects, &key.1);
                            specialised.insert(key, f);
                            f
                        }
                    };
                    for i in objects.iter().rev() {
                        args.remove(*i);
                    }
                    *callee = target;
                    queue.push(target);
                }
                ExprKind::Method { object, method, args } => {
                    let method = match texture_method(method) {
                        Some(m) => m,
                        None => return,
                    };
                    let texture = match resolve_object(&ctx.program, &globals, object) {
                        Some(t) => t,
                        None => {
                            ctx.error(ConvertError::UnresolvedTexture(format!("{:?}", method)), span);
                            return;
                        }
                    };
                    if !method.takes_sampler() {
                        deferred.push(texture);
                        return;
                    }
                    match args.first().and_then(|s| resolve_object(&ctx.program, &globals, s)) {
                        Some(sampler) => {
                            let key = SamplerTextureKey {
                                sampler: Some(sampler),
                                texture,
                            };
                            if ctx.samplers.get_or_insert(&mut ctx.program, mode, key).is_none() {
                                let name = ctx.program.var(texture).name.clone();
                                ctx.error(ConvertError::UnresolvedTexture(name), span);
                            }
                        }
                        None => ctx.error(ConvertError::UnresolvedTexture(format!("{:?}", method)), span),
                    }
                }
                _ => {}
            }
        });

        ctx.program.function_mut(func).body = Some(body);
    }

    for texture in deferred {
        if ctx.samplers.for_texture(texture).is_none() {
            let key = SamplerTextureKey {
                sampler: None,
                texture,
            };
            if ctx.samplers.get_or_insert(&mut ctx.program, mode, key).is_none() {
                let name = ctx.program.var(texture).name.clone();
                ctx.error(ConvertError::UnresolvedTexture(name), SourceSpan::default());
            }
        }
    }
}

/// Copy of `func` with its object parameters (at `objects`) replaced by the globals `bound`.
/// The copy is declared right after the original.
fn specialise(ctx: &mut ConvertContext, func: FuncId, objects: &[usize], bound: &[VarId]) -> FuncId {
    let original = ctx.program.function(func).clone();
    let mut map = HashMap::new();
    let mut params = vec![];
    for (i, p) in original.params.iter().enumerate() {
        match objects.iter().position(|o| *o == i) {
            Some(slot) => {
                map.insert(*p, bound[slot]);
            }
            None => {
                let copy = ctx.program.var(*p).clone();
                let id = ctx.program.add_var(copy);
                map.insert(*p, id);
                params.push(id);
            }
        }
    }
    let mut body = original.body.clone();
    if let Some(body) = &mut body {
        ctx.clone_locals(body, &mut map);
    }

    let suffix = bound
        .iter()
        .map(|v| ctx.program.var(*v).name.clone())
        .collect::<Vec<_>>()
        .join("_");
    let name = format!("{}_{}", original.name, suffix);
    tracing::debug!(function = %original.name, specialised = %name, "specialised function");
    let id = ctx.program.add_function(Function {
        name,
        params,
        body,
        ..original
    });
    let position = ctx
        .program
        .decls
        .iter()
        .position(|d| *d == Decl::Function(func))
        .map_or(ctx.program.decls.len(), |p| p + 1);
    ctx.program.decls.insert(position, Decl::Function(id));
    id
}
