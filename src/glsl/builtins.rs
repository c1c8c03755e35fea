//! Mapping of HLSL system semantics onto GLSL builtin variables.
//!
//! Tables are selected by stage, direction and whether the shader model uses `SV_`
//! system values. Keys are uppercase semantic names without their index.
use phf::phf_map;

use crate::{
    ast::{types::{ScalarKind, Type}, Direction},
    config::{PipelineStage, ShaderModel},
    hlsl::semantic::Semantic,
};

/// A GLSL builtin a semantic resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Plain builtin, e.g. `gl_Position`
    Var(&'static str),
    /// Array builtin indexed by the semantic index, e.g. `gl_FragData[1]`
    Indexed(&'static str),
}
impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Var(n) | Builtin::Indexed(n) => n,
        }
    }
}

type Table = phf::Map<&'static str, Builtin>;

static VERTEX_INPUTS: Table = phf_map! {
    "SV_VERTEXID" => Builtin::Var("gl_VertexID"),
    "SV_INSTANCEID" => Builtin::Var("gl_InstanceID"),
};
static VERTEX_OUTPUTS_SM3: Table = phf_map! {
    "POSITION" => Builtin::Var("gl_Position"),
    "PSIZE" => Builtin::Var("gl_PointSize"),
};
static VERTEX_OUTPUTS: Table = phf_map! {
    "SV_POSITION" => Builtin::Var("gl_Position"),
    "SV_CLIPDISTANCE" => Builtin::Indexed("gl_ClipDistance"),
};
static GEOMETRY_SM3: Table = phf_map! {
    "PSIZE" => Builtin::Var("gl_PointSize"),
};
static GEOMETRY_INPUTS: Table = phf_map! {
    "SV_POSITION" => Builtin::Var("gl_Position"),
    "SV_CLIPDISTANCE" => Builtin::Indexed("gl_ClipDistance"),
    "SV_PRIMITIVEID" => Builtin::Var("gl_PrimitiveIDIn"),
};
static GEOMETRY_OUTPUTS: Table = phf_map! {
    "SV_POSITION" => Builtin::Var("gl_Position"),
    "SV_CLIPDISTANCE" => Builtin::Indexed("gl_ClipDistance"),
    "SV_RENDERTARGETARRAYINDEX" => Builtin::Var("gl_Layer"),
};
static PIXEL_INPUTS_SM3: Table = phf_map! {
    "VPOS" => Builtin::Var("gl_FragCoord"),
    "VFACE" => Builtin::Var("gl_FrontFacing"),
    "POSITION" => Builtin::Var("gl_FragCoord"),
};
static PIXEL_INPUTS: Table = phf_map! {
    "SV_POSITION" => Builtin::Var("gl_FragCoord"),
    "SV_ISFRONTFACE" => Builtin::Var("gl_FrontFacing"),
    "SV_CLIPDISTANCE" => Builtin::Indexed("gl_ClipDistance"),
    "SV_PRIMITIVEID" => Builtin::Var("gl_PrimitiveID"),
    "SV_SAMPLEINDEX" => Builtin::Var("gl_SampleID"),
};
static PIXEL_OUTPUTS_SM3: Table = phf_map! {
    "DEPTH" => Builtin::Var("gl_FragDepth"),
    "COLOR" => Builtin::Indexed("gl_FragData"),
};
static PIXEL_OUTPUTS: Table = phf_map! {
    "SV_DEPTH" => Builtin::Var("gl_FragDepth"),
    "SV_TARGET" => Builtin::Indexed("gl_FragData"),
};
static COMPUTE_INPUTS: Table = phf_map! {
    "SV_DISPATCHTHREADID" => Builtin::Var("gl_GlobalInvocationID"),
    "SV_GROUPID" => Builtin::Var("gl_WorkGroupID"),
    "SV_GROUPTHREADID" => Builtin::Var("gl_LocalInvocationID"),
    "SV_GROUPINDEX" => Builtin::Var("gl_LocalInvocationIndex"),
};

/// Base kind and component count of each builtin
static BUILTIN_TYPES: phf::Map<&'static str, (ScalarKind, u8)> = phf_map! {
    "gl_ClipDistance" => (ScalarKind::Float, 1),
    "gl_FragDepth" => (ScalarKind::Float, 1),
    "gl_PointSize" => (ScalarKind::Float, 1),
    "gl_FragCoord" => (ScalarKind::Float, 4),
    "gl_FragColor" => (ScalarKind::Float, 4),
    "gl_FragData" => (ScalarKind::Float, 4),
    "gl_Position" => (ScalarKind::Float, 4),
    "gl_FrontFacing" => (ScalarKind::Bool, 1),
    "gl_InstanceID" => (ScalarKind::Int, 1),
    "gl_InvocationID" => (ScalarKind::Int, 1),
    "gl_Layer" => (ScalarKind::Int, 1),
    "gl_NumSamples" => (ScalarKind::Int, 1),
    "gl_PatchVerticesIn" => (ScalarKind::Int, 1),
    "gl_PrimitiveID" => (ScalarKind::Int, 1),
    "gl_PrimitiveIDIn" => (ScalarKind::Int, 1),
    "gl_SampleID" => (ScalarKind::Int, 1),
    "gl_SampleMask" => (ScalarKind::Int, 1),
    "gl_SampleMaskIn" => (ScalarKind::Int, 1),
    "gl_VertexID" => (ScalarKind::Int, 1),
    "gl_ViewportIndex" => (ScalarKind::Int, 1),
    "gl_PointCoord" => (ScalarKind::Float, 2),
    "gl_SamplePosition" => (ScalarKind::Float, 2),
    "gl_TessCoord" => (ScalarKind::Float, 3),
    "gl_GlobalInvocationID" => (ScalarKind::UInt, 3),
    "gl_WorkGroupID" => (ScalarKind::UInt, 3),
    "gl_LocalInvocationID" => (ScalarKind::UInt, 3),
    "gl_LocalInvocationIndex" => (ScalarKind::UInt, 1),
};

fn table(stage: PipelineStage, model: ShaderModel, direction: Direction) -> Option<&'static Table> {
    let sv = model.has_system_values();
    let table = match (stage, direction) {
        (PipelineStage::Vertex, Direction::In) => Some(&VERTEX_INPUTS),
        (PipelineStage::Vertex, Direction::Out) if sv => Some(&VERTEX_OUTPUTS),
        (PipelineStage::Vertex, Direction::Out) => Some(&VERTEX_OUTPUTS_SM3),
        (PipelineStage::Geometry, _) if !sv => Some(&GEOMETRY_SM3),
        (PipelineStage::Geometry, Direction::In) => Some(&GEOMETRY_INPUTS),
        (PipelineStage::Geometry, Direction::Out) => Some(&GEOMETRY_OUTPUTS),
        (PipelineStage::Pixel, Direction::In) if sv => Some(&PIXEL_INPUTS),
        (PipelineStage::Pixel, Direction::In) => Some(&PIXEL_INPUTS_SM3),
        (PipelineStage::Pixel, Direction::Out) if sv => Some(&PIXEL_OUTPUTS),
        (PipelineStage::Pixel, Direction::Out) => Some(&PIXEL_OUTPUTS_SM3),
        (PipelineStage::Compute, Direction::In) => Some(&COMPUTE_INPUTS),
        (PipelineStage::Compute, Direction::Out) => None,
    };
    table
}

/// Builtin bound to `semantic` for a stage and direction, if any.
pub fn builtin_for(
    stage: PipelineStage,
    model: ShaderModel,
    direction: Direction,
    semantic: &Semantic,
) -> Option<Builtin> {
    table(stage, model, direction)?
        .get(semantic.key().as_str())
        .copied()
}

/// Default type of a builtin variable (the element type for array builtins).
pub fn builtin_type(name: &str) -> Option<Type> {
    BUILTIN_TYPES
        .get(name)
        .map(|(kind, n)| Type::vector(*kind, *n))
}
