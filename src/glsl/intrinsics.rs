//! HLSL intrinsic and object-method tables.
use phf::phf_map;

use crate::ast::types::TextureDim;

/// Intrinsics that only change name
static INTRINSIC_RENAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "ddx" => "dFdx",
    "ddy" => "dFdy",
    "ddx_fine" => "dFdxFine",
    "ddy_fine" => "dFdyFine",
    "ddx_coarse" => "dFdxCoarse",
    "ddy_coarse" => "dFdyCoarse",
    "fmod" => "mod",
    "frac" => "fract",
    "lerp" => "mix",
    "rsqrt" => "inversesqrt",
    "atan2" => "atan",
    "countbits" => "bitCount",
    "reversebits" => "bitfieldReverse",
    "firstbithigh" => "findMSB",
    "firstbitlow" => "findLSB",
};

pub fn renamed_intrinsic(name: &str) -> Option<&'static str> {
    INTRINSIC_RENAMES.get(name).copied()
}

/// Intrinsics rewritten into a different expression or statement shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralIntrinsic {
    Mul,
    Lit,
    Clip,
    SinCos,
    Saturate,
    All,
    Any,
    IsFinite,
    Log10,
    ColorToUByte4,
}

static STRUCTURAL_INTRINSICS: phf::Map<&'static str, StructuralIntrinsic> = phf_map! {
    "mul" => StructuralIntrinsic::Mul,
    "lit" => StructuralIntrinsic::Lit,
    "clip" => StructuralIntrinsic::Clip,
    "sincos" => StructuralIntrinsic::SinCos,
    "saturate" => StructuralIntrinsic::Saturate,
    "all" => StructuralIntrinsic::All,
    "any" => StructuralIntrinsic::Any,
    "isfinite" => StructuralIntrinsic::IsFinite,
    "log10" => StructuralIntrinsic::Log10,
    "D3DCOLORtoUBYTE4" => StructuralIntrinsic::ColorToUByte4,
};

pub fn structural_intrinsic(name: &str) -> Option<StructuralIntrinsic> {
    STRUCTURAL_INTRINSICS.get(name).copied()
}

/// Argument positions of an intrinsic that are `out` parameters
static INTRINSIC_OUT_ARGUMENTS: phf::Map<&'static str, &'static [usize]> = phf_map! {
    "sincos" => &[1, 2],
    "modf" => &[1],
    "frexp" => &[1],
};

pub fn intrinsic_out_arguments(name: &str) -> &'static [usize] {
    INTRINSIC_OUT_ARGUMENTS.get(name).copied().unwrap_or(&[])
}

/// Texture object methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureMethod {
    Sample,
    SampleBias,
    SampleGrad,
    SampleLevel,
    SampleCmp,
    SampleCmpLevelZero,
    Load,
    GetDimensions,
}
impl TextureMethod {
    /// Whether the first argument is a sampler state
    pub fn takes_sampler(self) -> bool {
        !matches!(self, Self::Load | Self::GetDimensions)
    }
    pub fn is_comparison(self) -> bool {
        matches!(self, Self::SampleCmp | Self::SampleCmpLevelZero)
    }
}

static TEXTURE_METHODS: phf::Map<&'static str, TextureMethod> = phf_map! {
    "Sample" => TextureMethod::Sample,
    "SampleBias" => TextureMethod::SampleBias,
    "SampleGrad" => TextureMethod::SampleGrad,
    "SampleLevel" => TextureMethod::SampleLevel,
    "SampleCmp" => TextureMethod::SampleCmp,
    "SampleCmpLevelZero" => TextureMethod::SampleCmpLevelZero,
    "Load" => TextureMethod::Load,
    "GetDimensions" => TextureMethod::GetDimensions,
};

pub fn texture_method(name: &str) -> Option<TextureMethod> {
    TEXTURE_METHODS.get(name).copied()
}

/// Variant of a shader model 3 `texNN*` fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyFetch {
    Plain,
    Lod,
    Bias,
    Grad,
    Proj,
}

static LEGACY_FETCHES: phf::Map<&'static str, (TextureDim, LegacyFetch)> = phf_map! {
    "tex1D" => (TextureDim::Tex1D, LegacyFetch::Plain),
    "tex1Dlod" => (TextureDim::Tex1D, LegacyFetch::Lod),
    "tex1Dbias" => (TextureDim::Tex1D, LegacyFetch::Bias),
    "tex1Dgrad" => (TextureDim::Tex1D, LegacyFetch::Grad),
    "tex1Dproj" => (TextureDim::Tex1D, LegacyFetch::Proj),
    "tex2D" => (TextureDim::Tex2D, LegacyFetch::Plain),
    "tex2Dlod" => (TextureDim::Tex2D, LegacyFetch::Lod),
    "tex2Dbias" => (TextureDim::Tex2D, LegacyFetch::Bias),
    "tex2Dgrad" => (TextureDim::Tex2D, LegacyFetch::Grad),
    "tex2Dproj" => (TextureDim::Tex2D, LegacyFetch::Proj),
    "tex3D" => (TextureDim::Tex3D, LegacyFetch::Plain),
    "tex3Dlod" => (TextureDim::Tex3D, LegacyFetch::Lod),
    "tex3Dbias" => (TextureDim::Tex3D, LegacyFetch::Bias),
    "tex3Dgrad" => (TextureDim::Tex3D, LegacyFetch::Grad),
    "tex3Dproj" => (TextureDim::Tex3D, LegacyFetch::Proj),
    "texCUBE" => (TextureDim::Cube, LegacyFetch::Plain),
    "texCUBElod" => (TextureDim::Cube, LegacyFetch::Lod),
    "texCUBEbias" => (TextureDim::Cube, LegacyFetch::Bias),
    "texCUBEgrad" => (TextureDim::Cube, LegacyFetch::Grad),
    "texCUBEproj" => (TextureDim::Cube, LegacyFetch::Proj),
};

pub fn legacy_fetch(name: &str) -> Option<(TextureDim, LegacyFetch)> {
    LEGACY_FETCHES.get(name).copied()
}

/// Name of the GLSL sampling function for a texture dimension.
///
/// The compatibility names (`texture2D`, `textureCube`, ...) predate the overloaded
/// `texture` family and are the only ones available on GLSL ES 1.0.
pub fn sampling_function(dim: TextureDim, compatibility: bool) -> String {
    if !compatibility {
        return "texture".to_string();
    }
    match dim {
        TextureDim::Tex1D | TextureDim::Tex1DArray => "texture1D".to_string(),
        TextureDim::Tex3D => "texture3D".to_string(),
        TextureDim::Cube | TextureDim::CubeArray => "textureCube".to_string(),
        _ => "texture2D".to_string(),
    }
}
