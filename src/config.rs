//! Per-run conversion settings.
use std::collections::HashMap;

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProfile {
    /// Desktop GLSL
    Glsl,
    /// OpenGL ES GLSL
    GlslEs,
    /// GLSL for Vulkan
    Vulkan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Vertex,
    Geometry,
    Pixel,
    Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}
impl ShaderModel {
    pub const SM3: ShaderModel = ShaderModel { major: 3, minor: 0 };
    pub const SM4: ShaderModel = ShaderModel { major: 4, minor: 0 };
    pub const SM5: ShaderModel = ShaderModel { major: 5, minor: 0 };

    /// `SV_*` system-value semantics exist from shader model 4 onwards
    pub fn has_system_values(self) -> bool {
        self >= Self::SM4
    }
}

/// How HLSL `floatRxC` matrices are laid out in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixLayout {
    /// Keep the HLSL meaning of rows and columns. Types become `matCxR`, element
    /// accesses are transposed and `mul(a, b)` stays `a * b`.
    PreserveRows,
    /// Reinterpret HLSL rows as GLSL columns. Types become `matRxC`, element accesses
    /// are kept and `mul(a, b)` becomes `b * a`.
    RowsAsColumns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    /// Every (sampler, texture) pair becomes one combined sampler global.
    Combined,
    /// Textures and samplers stay separate declarations and each use site builds the
    /// combined object with a constructor call, e.g. `sampler2D(tex, samp)`.
    SeparateCollapsed,
}

bitflags! {
    /// Target features some rewrites depend on
    pub struct Capabilities: u32 {
        /// `texelFetch` with integer coordinates
        const INTEGER_TEXEL_FETCH = 0b0000_0001;
        /// `texelFetch` on buffer samplers, otherwise `texelFetchBuffer`
        const TEXTURE_BUFFER_FETCH = 0b0000_0010;
        /// User-declared fragment outputs, otherwise `gl_FragData`
        const FRAG_DATA_OUTPUTS = 0b0000_0100;
        /// Geometry shaders with `EmitVertex`/`EndPrimitive`
        const GEOMETRY_STREAMS = 0b0000_1000;
        /// `uniform Block { ... };`
        const UNIFORM_BLOCKS = 0b0001_0000;
        /// `flat` interpolation qualifier
        const FLAT_INTERPOLATION = 0b0010_0000;
        /// `textureSize`
        const TEXTURE_SIZE = 0b0100_0000;
    }
}
impl Capabilities {
    /// Capabilities implied by a profile and version, e.g. GLES 300 or desktop 410.
    pub fn for_target(profile: TargetProfile, version: u32) -> Self {
        match profile {
            TargetProfile::Vulkan => Self::all(),
            TargetProfile::Glsl => {
                let mut caps = Self::INTEGER_TEXEL_FETCH
                    | Self::TEXTURE_BUFFER_FETCH
                    | Self::FRAG_DATA_OUTPUTS
                    | Self::FLAT_INTERPOLATION
                    | Self::TEXTURE_SIZE;
                if version >= 140 {
                    caps |= Self::UNIFORM_BLOCKS;
                }
                if version >= 150 {
                    caps |= Self::GEOMETRY_STREAMS;
                }
                caps
            }
            TargetProfile::GlslEs => {
                if version < 300 {
                    Self::empty()
                } else {
                    let mut caps = Self::INTEGER_TEXEL_FETCH
                        | Self::FRAG_DATA_OUTPUTS
                        | Self::UNIFORM_BLOCKS
                        | Self::FLAT_INTERPOLATION
                        | Self::TEXTURE_SIZE;
                    if version >= 320 {
                        caps |= Self::TEXTURE_BUFFER_FETCH | Self::GEOMETRY_STREAMS;
                    }
                    caps
                }
            }
        }
    }
}

/// Externally supplied layout for a semantic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableLayoutRule {
    /// Location index, or a placeholder name resolved by the host
    pub location: Option<String>,
    /// Name of the generated variable when it is a stage input
    pub name: Option<String>,
    /// Name of the generated variable when it is a stage output
    pub name_output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub profile: TargetProfile,
    pub version: u32,
    pub stage: PipelineStage,
    pub shader_model: ShaderModel,
    pub entry_point: String,
    pub matrix_layout: MatrixLayout,
    pub unroll_loops: bool,
    pub flip_y: bool,
    pub remap_depth: bool,
    /// Assign `layout(binding = N)` to uniforms and samplers
    pub explicit_bindings: bool,
    /// Assign `layout(location = N)` to stage inputs and outputs
    pub explicit_locations: bool,
    pub keep_constant_buffers: bool,
    pub keep_non_uniform_array_initializers: bool,
    pub sampler_mode: SamplerMode,
    /// Use `texture2D`, `textureCube`, ... instead of the overloaded `texture`
    pub texture_compatibility_functions: bool,
    /// Locations become `S_<semantic>` placeholders instead of indices
    pub use_semantic_for_location: bool,
    /// Varyings are named after their semantic instead of the declaring variable
    pub use_semantic_for_variable: bool,
    /// Pixel stage `TEXCOORD0` reads `gl_PointCoord`
    pub point_sprite: bool,
    pub capabilities: Capabilities,
    /// Keyed by semantic, e.g. `TEXCOORD0`
    pub variable_layouts: HashMap<String, VariableLayoutRule>,
    /// Keyed by constant buffer register (`b0`) or name
    pub constant_buffer_bindings: HashMap<String, u32>,
}
impl Configuration {
    /// Defaults for a profile, version and stage. Entry point `main`, shader model 4.0.
    pub fn new(profile: TargetProfile, version: u32, stage: PipelineStage) -> Self {
        let is_es2 = profile == TargetProfile::GlslEs && version < 300;
        let is_vulkan = profile == TargetProfile::Vulkan;
        Self {
            profile,
            version,
            stage,
            shader_model: ShaderModel::SM4,
            entry_point: "main".to_string(),
            matrix_layout: MatrixLayout::PreserveRows,
            unroll_loops: true,
            flip_y: true,
            remap_depth: !is_vulkan,
            explicit_bindings: is_vulkan,
            explicit_locations: is_vulkan,
            keep_constant_buffers: !is_es2,
            keep_non_uniform_array_initializers: profile != TargetProfile::GlslEs,
            sampler_mode: if is_vulkan {
                SamplerMode::SeparateCollapsed
            } else {
                SamplerMode::Combined
            },
            texture_compatibility_functions: is_es2,
            use_semantic_for_location: false,
            use_semantic_for_variable: false,
            point_sprite: false,
            capabilities: Capabilities::for_target(profile, version),
            variable_layouts: HashMap::new(),
            constant_buffer_bindings: HashMap::new(),
        }
    }

    pub fn with_entry_point(mut self, name: &str) -> Self {
        self.entry_point = name.to_string();
        self
    }

    pub fn with_shader_model(mut self, major: u8, minor: u8) -> Self {
        self.shader_model = ShaderModel { major, minor };
        self
    }

    pub fn is_es2(&self) -> bool {
        self.profile == TargetProfile::GlslEs && self.version < 300
    }
}
