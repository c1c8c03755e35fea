//! HLSL to GLSL type mapping.
use crate::{
    ast::{
        types::{SamplerKind, ScalarKind, TextureDim, Type},
        Program,
    },
    config::MatrixLayout,
};

pub fn scalar_name(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "bool",
        ScalarKind::Int => "int",
        ScalarKind::UInt => "uint",
        ScalarKind::Half | ScalarKind::Float => "float",
        ScalarKind::Double => "double",
    }
}

/// `i`/`u` prefix distinguishing integer vectors, samplers and textures
fn kind_prefix(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "b",
        ScalarKind::Int => "i",
        ScalarKind::UInt => "u",
        ScalarKind::Double => "d",
        ScalarKind::Half | ScalarKind::Float => "",
    }
}

fn object_prefix(kind: Option<ScalarKind>) -> &'static str {
    match kind {
        Some(ScalarKind::Int) => "i",
        Some(ScalarKind::UInt) => "u",
        _ => "",
    }
}

pub fn vector_name(kind: ScalarKind, n: u8) -> String {
    if n <= 1 {
        scalar_name(kind).to_string()
    } else {
        format!("{}vec{}", kind_prefix(kind), n)
    }
}

/// GLSL name of an HLSL `kind{rows}x{cols}` matrix.
///
/// GLSL spells matrices `mat{columns}x{rows}`. Under [MatrixLayout::PreserveRows] the
/// HLSL column count stays the GLSL column count, otherwise the two are exchanged.
pub fn matrix_name(kind: ScalarKind, rows: u8, cols: u8, layout: MatrixLayout) -> String {
    if rows == 1 || cols == 1 {
        return vector_name(kind, rows.max(cols));
    }
    let (columns, rows) = match layout {
        MatrixLayout::PreserveRows => (cols, rows),
        MatrixLayout::RowsAsColumns => (rows, cols),
    };
    let prefix = if kind == ScalarKind::Double { "d" } else { "" };
    if columns == rows {
        format!("{}mat{}", prefix, columns)
    } else {
        format!("{}mat{}x{}", prefix, columns, rows)
    }
}

pub fn texture_name(dim: TextureDim, kind: Option<ScalarKind>) -> String {
    format!("{}texture{}", object_prefix(kind), dim.glsl_suffix())
}

/// Type name of the combined object replacing a texture (and its sampler).
pub fn combined_sampler_name(dim: TextureDim, kind: Option<ScalarKind>, shadow: bool) -> String {
    format!(
        "{}sampler{}{}",
        object_prefix(kind),
        dim.glsl_suffix(),
        if shadow { "Shadow" } else { "" }
    )
}

/// Map a type into the target vocabulary. Struct types are kept, aliases are resolved.
pub fn map_type(program: &Program, ty: &Type, layout: MatrixLayout) -> Type {
    match ty {
        Type::Scalar(k) => Type::Named(scalar_name(*k).to_string()),
        Type::Vector(k, n) => Type::Named(vector_name(*k, *n)),
        Type::Matrix(k, r, c) => Type::Named(matrix_name(*k, *r, *c, layout)),
        Type::Array(elem, dims) => Type::Array(Box::new(map_type(program, elem, layout)), dims.clone()),
        Type::Alias(id) => map_type(program, &program.alias(*id).ty, layout),
        Type::Sampler(SamplerKind::State) => Type::Named("sampler".to_string()),
        Type::Sampler(SamplerKind::Comparison) => Type::Named("samplerShadow".to_string()),
        Type::Sampler(SamplerKind::Legacy(dim)) => Type::Named(combined_sampler_name(*dim, None, false)),
        Type::Texture(dim, kind) => Type::Named(texture_name(*dim, *kind)),
        Type::Void | Type::Struct(_) | Type::Stream(_, _) | Type::Named(_) => ty.clone(),
    }
}
