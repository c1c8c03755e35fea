//! Texture object methods and shader model 3 `texNN` fetches.
//!
//! Every call is redirected to the combined sampler [super::super::samplers] recorded for
//! its texture. The sampling function gets its suffix (`Lod`, `Grad`, `Offset`) from the
//! method and from the number of arguments.
use std::collections::HashSet;

use crate::{
    ast::{
        expr::{BinaryOp, Expr, ExprKind, Stmt},
        types::{ScalarKind, TextureDim, Type},
        VarId,
    },
    config::Capabilities,
    convert::samplers::{resolve_object, CombinedSampler, SamplerTextureKey},
    error::{ConvertError, SourceSpan},
    glsl::intrinsics::{sampling_function, texture_method, LegacyFetch, TextureMethod},
};

use super::{Rewriter, COMPONENTS};

fn globals(rw: &Rewriter) -> HashSet<VarId> {
    rw.program().global_vars().into_iter().collect()
}

/// Index into a texture array, looking through parentheses
fn array_index(e: &Expr) -> Option<&Expr> {
    match &e.kind {
        ExprKind::Index { index, .. } => Some(index),
        ExprKind::Paren(inner) => array_index(inner),
        _ => None,
    }
}

fn has_capability(rw: &Rewriter, capability: Capabilities) -> bool {
    rw.ctx.config.capabilities.contains(capability)
}

/// `texture`, `textureLod`, ... or their compatibility spellings
fn function_name(rw: &Rewriter, dim: TextureDim, suffix: &str) -> String {
    format!(
        "{}{}",
        sampling_function(dim, rw.ctx.config.texture_compatibility_functions),
        suffix
    )
}

/// First `n` components of an integer or float vector, converted to `kind`
fn leading(rw: &mut Rewriter, e: Expr, n: u8, kind: ScalarKind) -> Expr {
    let e = match rw.type_of(&e).components() {
        Some(m) if m > n => {
            let elem_kind = rw.type_of(&e).scalar_kind().unwrap_or(kind);
            e.paren().swizzle(&COMPONENTS[..n as usize], Type::vector(elem_kind, n))
        }
        _ => e,
    };
    rw.coerce(e, &Type::vector(kind, n))
}

/// Component `i` of a vector, converted to `kind`
fn component(rw: &mut Rewriter, e: Expr, i: u8, kind: ScalarKind) -> Expr {
    let elem_kind = rw.type_of(&e).scalar_kind().unwrap_or(kind);
    let i = i.min(3) as usize;
    let c = &COMPONENTS[i..i + 1];
    let e = e.paren().swizzle(c, Type::Scalar(elem_kind));
    rw.coerce(e, &Type::Scalar(kind))
}

/// Convert the raw `vec4` result of a sampling function to the type HLSL gives the call
fn result(rw: &mut Rewriter, call: Expr, ty: Option<Type>) -> Expr {
    match ty {
        Some(ty) => rw.coerce(call, &ty),
        None => call,
    }
}

fn untouched(rw: &mut Rewriter, object: Expr, method: &str, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
    let object = rw.expr(object);
    let args = rw.exprs(args);
    Expr::new(
        ExprKind::Method {
            object: Box::new(object),
            method: method.to_string(),
            args,
        },
        ty,
    )
    .at(span)
}

/// The combined sampler of a method call and the expression standing for it at the call site
fn combined(
    rw: &mut Rewriter,
    object: &Expr,
    method: TextureMethod,
    args: &[Expr],
    span: SourceSpan,
) -> Option<(CombinedSampler, Expr)> {
    let globals = globals(rw);
    let program = rw.program();
    let texture = resolve_object(program, &globals, object);
    let entry = texture.and_then(|texture| {
        if method.takes_sampler() {
            let sampler = args.first().and_then(|s| resolve_object(program, &globals, s))?;
            rw.ctx.samplers.get(SamplerTextureKey {
                sampler: Some(sampler),
                texture,
            })
        } else {
            rw.ctx.samplers.for_texture(texture)
        }
    });
    let entry = match entry {
        Some(entry) => entry.clone(),
        None => {
            rw.ctx.error(ConvertError::UnresolvedTexture(format!("{:?}", method)), span);
            return None;
        }
    };
    let index = array_index(object).cloned().map(|i| {
        let i = rw.expr(i);
        rw.coerce_kind(i, ScalarKind::Int)
    });
    let expr = rw
        .ctx
        .samplers
        .use_expr(&rw.ctx.program, rw.ctx.config.sampler_mode, &entry, index);
    Some((entry, expr))
}

pub(super) fn method(rw: &mut Rewriter, object: Expr, method: &str, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
    let kind = match texture_method(method) {
        Some(TextureMethod::GetDimensions) | None => {
            rw.ctx.error(ConvertError::Unsupported(format!("method call {}", method)), span);
            return untouched(rw, object, method, args, ty, span);
        }
        Some(kind) => kind,
    };
    let (entry, sampler) = match combined(rw, &object, kind, &args, span) {
        Some(found) => found,
        None => return untouched(rw, object, method, args, ty, span),
    };
    let mut args = args;
    if kind.takes_sampler() && !args.is_empty() {
        args.remove(0);
    }
    let args = rw.exprs(args);
    if kind == TextureMethod::Load {
        load(rw, &entry, sampler, args, ty, span)
    } else {
        sample(rw, &entry, kind, sampler, args, ty, span)
    }
}

fn sample(
    rw: &mut Rewriter,
    entry: &CombinedSampler,
    method: TextureMethod,
    sampler: Expr,
    args: Vec<Expr>,
    ty: Option<Type>,
    span: SourceSpan,
) -> Expr {
    // Arguments after the sampler, without the optional offset
    let (base, suffix) = match method {
        TextureMethod::Sample | TextureMethod::Load | TextureMethod::GetDimensions => (1, ""),
        TextureMethod::SampleBias | TextureMethod::SampleCmp => (2, ""),
        TextureMethod::SampleGrad => (3, "Grad"),
        TextureMethod::SampleLevel | TextureMethod::SampleCmpLevelZero => (2, "Lod"),
    };
    let offset = match args.len() {
        n if n == base => false,
        n if n == base + 1 => true,
        n => {
            let texture = rw.program().var(entry.key.texture).name.clone();
            rw.ctx.error(
                ConvertError::UnsupportedSampling {
                    method: format!("{:?}", method),
                    texture,
                    args: n,
                },
                span,
            );
            return Expr::call("texture", args, ty).at(span);
        }
    };

    let n = entry.dim.coordinate_components();
    let mut args = args.into_iter();
    let mut call_args = vec![sampler];
    let coord = args.next().map(|c| rw.coerce(c, &Type::float_vec(n)));
    if method.is_comparison() {
        let compare = args.next().map(|c| rw.coerce(c, &Type::FLOAT));
        let merged: Vec<Expr> = coord.into_iter().chain(compare).collect();
        call_args.push(Expr::construct(Type::float_vec(n + 1), merged));
    } else {
        call_args.extend(coord);
    }
    let rest: Vec<Expr> = args.collect();
    let (rest, offset_arg) = if offset {
        let mut rest = rest;
        let last = rest.pop();
        (rest, last.map(|o| rw.coerce_kind(o, ScalarKind::Int)))
    } else {
        (rest, None)
    };

    match method {
        TextureMethod::SampleBias => {
            // textureOffset takes the bias last
            let bias: Vec<Expr> = rest.into_iter().map(|b| rw.coerce(b, &Type::FLOAT)).collect();
            call_args.extend(offset_arg.clone());
            call_args.extend(bias);
        }
        TextureMethod::SampleLevel => {
            call_args.extend(rest.into_iter().map(|l| rw.coerce(l, &Type::FLOAT)));
            call_args.extend(offset_arg.clone());
        }
        TextureMethod::SampleCmpLevelZero => {
            call_args.push(Expr::float(0.0));
            call_args.extend(offset_arg.clone());
        }
        _ => {
            call_args.extend(rest);
            call_args.extend(offset_arg.clone());
        }
    }

    let suffix = if offset_arg.is_some() {
        format!("{}Offset", suffix)
    } else {
        suffix.to_string()
    };
    let name = function_name(rw, entry.dim, &suffix);
    let raw_ty = if method.is_comparison() {
        Type::FLOAT
    } else {
        Type::Vector(entry.kind.unwrap_or(ScalarKind::Float), 4)
    };
    let call = Expr::call(&name, call_args, Some(raw_ty)).at(span);
    result(rw, call, ty)
}

/// `Load` reads one texel at integer coordinates: `texelFetch` where the target has it,
/// a normalized `textureLod` otherwise.
fn load(rw: &mut Rewriter, entry: &CombinedSampler, sampler: Expr, args: Vec<Expr>, ty: Option<Type>, span: SourceSpan) -> Expr {
    let dim = entry.dim;
    let base = match dim {
        TextureDim::Tex2DMS | TextureDim::Tex2DMSArray => 2,
        _ => 1,
    };
    let offset = match args.len() {
        n if n == base => None,
        n if n == base + 1 => args.last().cloned(),
        n => {
            let texture = rw.program().var(entry.key.texture).name.clone();
            rw.ctx.error(
                ConvertError::UnsupportedSampling {
                    method: "Load".to_string(),
                    texture,
                    args: n,
                },
                span,
            );
            return Expr::call("texelFetch", args, ty).at(span);
        }
    };
    let offset = offset.map(|o| rw.coerce_kind(o, ScalarKind::Int));
    let mut args = args.into_iter();
    let location = match args.next() {
        Some(location) => location,
        None => return Expr::call("texelFetch", vec![sampler], ty).at(span),
    };
    let raw_ty = Some(Type::Vector(entry.kind.unwrap_or(ScalarKind::Float), 4));
    let n = dim.coordinate_components();

    let call = match dim {
        TextureDim::Buffer => {
            let location = rw.coerce(location, &Type::INT);
            let name = if has_capability(rw, Capabilities::TEXTURE_BUFFER_FETCH) {
                "texelFetch"
            } else {
                "texelFetchBuffer"
            };
            Expr::call(name, vec![sampler, location], raw_ty)
        }
        TextureDim::Tex2DMS | TextureDim::Tex2DMSArray => {
            let location = leading(rw, location, n, ScalarKind::Int);
            let sample = args.next().map(|s| rw.coerce(s, &Type::INT));
            let call_args = std::iter::once(sampler).chain(Some(location)).chain(sample).collect();
            Expr::call("texelFetch", call_args, raw_ty)
        }
        _ if has_capability(rw, Capabilities::INTEGER_TEXEL_FETCH) => {
            let lod = component(rw, location.clone(), n, ScalarKind::Int);
            let coords = leading(rw, location, n, ScalarKind::Int);
            let name = if offset.is_some() { "texelFetchOffset" } else { "texelFetch" };
            let call_args = vec![sampler, coords, lod].into_iter().chain(offset).collect();
            Expr::call(name, call_args, raw_ty)
        }
        _ => {
            let lod = component(rw, location.clone(), n, ScalarKind::Float);
            let coords = leading(rw, location, n, ScalarKind::Float);
            let size = Expr::call(
                "textureSize",
                vec![sampler.clone(), Expr::int(0)],
                Some(Type::vector(ScalarKind::Int, n)),
            );
            let size = rw.coerce(size, &Type::float_vec(n));
            let uv = Expr::binary(BinaryOp::Div, coords, size, Some(Type::float_vec(n)));
            let name = function_name(rw, dim, if offset.is_some() { "LodOffset" } else { "Lod" });
            let call_args = vec![sampler, uv, lod].into_iter().chain(offset).collect();
            Expr::call(&name, call_args, raw_ty)
        }
    };
    result(rw, call.at(span), ty)
}

/// `tex2D(s, t)` and friends on shader model 3 samplers
pub(super) fn legacy(
    rw: &mut Rewriter,
    name: &str,
    dim: TextureDim,
    fetch: LegacyFetch,
    args: Vec<Expr>,
    ty: Option<Type>,
    span: SourceSpan,
) -> Expr {
    let args = rw.exprs(args);
    let n = dim.coordinate_components();
    let raw_ty = Some(Type::float_vec(4));
    let expected = match fetch {
        LegacyFetch::Plain => args.len() == 2 || args.len() == 4,
        LegacyFetch::Grad => args.len() == 4,
        LegacyFetch::Lod | LegacyFetch::Bias | LegacyFetch::Proj => args.len() == 2,
    };
    if !expected {
        rw.ctx.error(
            ConvertError::UnsupportedSampling {
                method: name.to_string(),
                texture: format!("{:?}", dim),
                args: args.len(),
            },
            span,
        );
        return Expr::call(name, args, ty).at(span);
    }

    let mut args = args.into_iter();
    let sampler = args.next().into_iter();
    let call = match fetch {
        LegacyFetch::Plain | LegacyFetch::Grad => {
            let coord = args.next().map(|t| rw.coerce(t, &Type::float_vec(n)));
            let gradients: Vec<Expr> = args.map(|d| rw.coerce(d, &Type::float_vec(n))).collect();
            let suffix = if gradients.is_empty() { "" } else { "Grad" };
            let name = function_name(rw, dim, suffix);
            Expr::call(&name, sampler.chain(coord).chain(gradients).collect(), raw_ty)
        }
        LegacyFetch::Lod | LegacyFetch::Bias => {
            // The mip level or bias rides in the `w` component
            let t = args.next().map(|t| rw.coerce(t, &Type::float_vec(4)));
            let (coord, extra) = match t {
                Some(t) => (
                    Some(leading(rw, t.clone(), n, ScalarKind::Float)),
                    Some(component(rw, t, 3, ScalarKind::Float)),
                ),
                None => (None, None),
            };
            let suffix = if fetch == LegacyFetch::Lod { "Lod" } else { "" };
            let name = function_name(rw, dim, suffix);
            Expr::call(&name, sampler.chain(coord).chain(extra).collect(), raw_ty)
        }
        LegacyFetch::Proj => {
            let t = args.next().map(|t| rw.coerce(t, &Type::float_vec(4)));
            let name = function_name(rw, dim, "Proj");
            Expr::call(&name, sampler.chain(t).collect(), raw_ty)
        }
    };
    result(rw, call.at(span), ty)
}

/// `GetDimensions` writes its results through out parameters:
/// `(width[, height[, depth]])`, `(mip, width[, ...], levels)` or, for multisampled
/// textures, `(width, height[, elements], samples)`.
pub(super) fn get_dimensions(rw: &mut Rewriter, e: Expr, span: SourceSpan) -> Vec<Stmt> {
    let (object, args) = match e.kind {
        ExprKind::Method { object, args, .. } => (*object, args),
        kind => return vec![Stmt::expr(rw.expr(Expr::new(kind, e.ty).at(span)))],
    };
    let (entry, sampler) = match combined(rw, &object, TextureMethod::GetDimensions, &args, span) {
        Some(found) => found,
        None => return vec![Stmt::expr(untouched(rw, object, "GetDimensions", args, None, span))],
    };
    if !has_capability(rw, Capabilities::TEXTURE_SIZE) {
        rw.ctx.warning(
            "textureSize is not available on this target and must be provided by the host",
            span,
        );
    }
    let dim = entry.dim;
    let n = dim.size_components() as usize;
    let multisampled = matches!(dim, TextureDim::Tex2DMS | TextureDim::Tex2DMSArray);
    let args = rw.exprs(args);

    let (mip, sizes, levels, samples) = match args.len() {
        len if len == n => (None, args, None, None),
        len if len == n + 1 && multisampled => {
            let mut args = args;
            let samples = args.pop();
            (None, args, None, samples)
        }
        len if len == n + 2 && !multisampled => {
            let mut args = args.into_iter();
            let mip = args.next();
            let mut sizes: Vec<Expr> = args.collect();
            let levels = sizes.pop();
            (mip, sizes, levels, None)
        }
        len => {
            let texture = rw.program().var(entry.key.texture).name.clone();
            rw.ctx.error(
                ConvertError::UnsupportedSampling {
                    method: "GetDimensions".to_string(),
                    texture,
                    args: len,
                },
                span,
            );
            return vec![Stmt::expr(Expr::call("textureSize", args, None)).at(span)];
        }
    };

    let size_ty = Type::vector(ScalarKind::Int, n as u8);
    let mut size_args = vec![sampler.clone()];
    if !multisampled && dim != TextureDim::Buffer {
        let lod = match mip {
            Some(mip) => rw.coerce(mip, &Type::INT),
            None => Expr::int(0),
        };
        size_args.push(lod);
    }
    let size_call = Expr::call("textureSize", size_args, Some(size_ty.clone()));
    let temp = rw.ctx.add_local("tempTextureSize", size_ty.clone(), Some(size_call));

    let mut stmts = vec![Stmt::decl(temp).at(span)];
    for (i, target) in sizes.into_iter().enumerate() {
        let value = if n == 1 {
            Expr::var(temp, size_ty.clone())
        } else {
            Expr::var(temp, size_ty.clone()).swizzle(&COMPONENTS[i..i + 1], Type::INT)
        };
        let target_ty = rw.type_of(&target);
        let value = rw.coerce(value, &target_ty);
        stmts.push(Stmt::assign(target, value).at(span));
    }
    if let Some(levels) = levels {
        let value = Expr::call("textureQueryLevels", vec![sampler.clone()], Some(Type::INT));
        let target_ty = rw.type_of(&levels);
        let value = rw.coerce(value, &target_ty);
        stmts.push(Stmt::assign(levels, value).at(span));
    }
    if let Some(samples) = samples {
        let value = Expr::call("textureSamples", vec![sampler], Some(Type::INT));
        let target_ty = rw.type_of(&samples);
        let value = rw.coerce(value, &target_ty);
        stmts.push(Stmt::assign(samples, value).at(span));
    }
    vec![Stmt::block(stmts).at(span)]
}
