use std::collections::HashSet;

use phf::phf_set;

/// GLSL keywords, reserved words, type names, and builtin functions that the
/// converter emits. A user identifier spelled like one of these must be renamed.
static RESERVED: phf::Set<&'static str> = phf_set! {
    "attribute", "const", "uniform", "varying", "buffer", "shared", "coherent", "volatile",
    "restrict", "readonly", "writeonly", "atomic_uint", "layout", "centroid", "flat", "smooth",
    "noperspective", "patch", "sample", "break", "continue", "do", "for", "while", "switch",
    "case", "default", "if", "else", "subroutine", "in", "out", "inout", "float", "double",
    "int", "void", "bool", "true", "false", "invariant", "precise", "discard", "return",
    "lowp", "mediump", "highp", "precision", "struct",
    "mat2", "mat3", "mat4", "dmat2", "dmat3", "dmat4",
    "mat2x2", "mat2x3", "mat2x4", "dmat2x2", "dmat2x3", "dmat2x4",
    "mat3x2", "mat3x3", "mat3x4", "dmat3x2", "dmat3x3", "dmat3x4",
    "mat4x2", "mat4x3", "mat4x4", "dmat4x2", "dmat4x3", "dmat4x4",
    "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "bvec2", "bvec3", "bvec4",
    "dvec2", "dvec3", "dvec4", "uint", "uvec2", "uvec3", "uvec4",
    "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler1DShadow", "sampler2DShadow",
    "samplerCubeShadow", "sampler1DArray", "sampler2DArray", "sampler1DArrayShadow",
    "sampler2DArrayShadow", "isampler1D", "isampler2D", "isampler3D", "isamplerCube",
    "isampler1DArray", "isampler2DArray", "usampler1D", "usampler2D", "usampler3D",
    "usamplerCube", "usampler1DArray", "usampler2DArray", "sampler2DRect", "samplerBuffer",
    "isamplerBuffer", "usamplerBuffer", "sampler2DMS", "isampler2DMS", "usampler2DMS",
    "sampler2DMSArray", "samplerCubeArray", "texture1D", "texture2D", "texture3D", "textureCube",
    "texture2DArray", "textureBuffer", "sampler", "samplerShadow", "image1D", "image2D", "image3D",
    "common", "partition", "active", "asm", "class", "union", "enum", "typedef", "template",
    "this", "resource", "goto", "inline", "noinline", "public", "static", "extern", "external",
    "interface", "long", "short", "half", "fixed", "unsigned", "superp", "input", "output",
    "hvec2", "hvec3", "hvec4", "fvec2", "fvec3", "fvec4", "filter", "sizeof", "cast",
    "namespace", "using", "main",
    "texture", "textureLod", "textureGrad", "textureOffset", "textureProj", "texelFetch",
    "textureSize", "mix", "fract", "mod", "dFdx", "dFdy", "inversesqrt", "lessThan",
    "lessThanEqual", "greaterThan", "greaterThanEqual", "equal", "notEqual", "not",
    "matrixCompMult", "EmitVertex", "EndPrimitive",
};

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

/// Name an identifier gets in the target: reserved words are prefixed with `_`, and
/// double underscores (reserved in GLSL) become `_0`.
pub fn escape_identifier(name: &str) -> String {
    let name = if is_reserved(name) {
        format!("_{}", name)
    } else {
        name.to_string()
    };
    name.replace("__", "_0")
}

/// [escape_identifier], numbered until the result is not in `taken`. The chosen name is
/// added to `taken`. Names that need no escaping are returned unchanged.
pub fn escape_unique(name: &str, taken: &mut HashSet<String>) -> String {
    let escaped = escape_identifier(name);
    if escaped == name {
        return escaped;
    }
    let mut candidate = escaped.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}{}", escaped, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
