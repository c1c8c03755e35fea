use super::{AliasId, StructId};

/// Numeric base kind of scalars, vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Half,
    Float,
    Double,
}
impl ScalarKind {
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::UInt)
    }
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double)
    }
    /// The HLSL spelling, e.g. `uint`
    pub fn hlsl_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDim {
    Buffer,
    Tex1D,
    Tex1DArray,
    Tex2D,
    Tex2DArray,
    Tex2DMS,
    Tex2DMSArray,
    Tex3D,
    Cube,
    CubeArray,
}
impl TextureDim {
    /// Number of components of a sampling coordinate, excluding any mip level.
    pub fn coordinate_components(self) -> u8 {
        match self {
            Self::Buffer | Self::Tex1D => 1,
            Self::Tex1DArray | Self::Tex2D | Self::Tex2DMS => 2,
            Self::Tex2DArray | Self::Tex2DMSArray | Self::Tex3D | Self::Cube => 3,
            Self::CubeArray => 4,
        }
    }

    /// Number of values `GetDimensions` reports before the optional mip count.
    pub fn size_components(self) -> u8 {
        match self {
            Self::Buffer | Self::Tex1D => 1,
            Self::Tex1DArray | Self::Tex2D | Self::Tex2DMS | Self::Cube => 2,
            Self::Tex2DArray | Self::Tex2DMSArray | Self::Tex3D | Self::CubeArray => 3,
        }
    }

    /// Suffix shared by the GLSL `texture*` and `sampler*` type names.
    pub fn glsl_suffix(self) -> &'static str {
        match self {
            Self::Buffer => "Buffer",
            Self::Tex1D => "1D",
            Self::Tex1DArray => "1DArray",
            Self::Tex2D => "2D",
            Self::Tex2DArray => "2DArray",
            Self::Tex2DMS => "2DMS",
            Self::Tex2DMSArray => "2DMSArray",
            Self::Tex3D => "3D",
            Self::Cube => "Cube",
            Self::CubeArray => "CubeArray",
        }
    }

    pub fn hlsl_name(self) -> &'static str {
        match self {
            Self::Buffer => "Buffer",
            Self::Tex1D => "Texture1D",
            Self::Tex1DArray => "Texture1DArray",
            Self::Tex2D => "Texture2D",
            Self::Tex2DArray => "Texture2DArray",
            Self::Tex2DMS => "Texture2DMS",
            Self::Tex2DMSArray => "Texture2DMSArray",
            Self::Tex3D => "Texture3D",
            Self::Cube => "TextureCube",
            Self::CubeArray => "TextureCubeArray",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// `SamplerState`
    State,
    /// `SamplerComparisonState`
    Comparison,
    /// Shader model 3 `sampler1D`/`sampler2D`/... objects, already combined with their texture
    Legacy(TextureDim),
}

/// Geometry shader output stream kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Point,
    Line,
    Triangle,
}
impl StreamKind {
    pub fn layout_name(self) -> &'static str {
        match self {
            Self::Point => "points",
            Self::Line => "line_strip",
            Self::Triangle => "triangle_strip",
        }
    }
}

/// Geometry shader input primitive qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryPrimitive {
    Point,
    Line,
    LineAdj,
    Triangle,
    TriangleAdj,
}
impl GeometryPrimitive {
    pub fn layout_name(self) -> &'static str {
        match self {
            Self::Point => "points",
            Self::Line => "lines",
            Self::LineAdj => "lines_adjacency",
            Self::Triangle => "triangles",
            Self::TriangleAdj => "triangles_adjacency",
        }
    }
    pub fn vertex_count(self) -> u32 {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::LineAdj => 4,
            Self::Triangle => 3,
            Self::TriangleAdj => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// Base kind, rows, columns
    Matrix(ScalarKind, u8, u8),
    /// Element type and dimensions, outermost first. `None` is an unsized dimension.
    Array(Box<Type>, Vec<Option<u32>>),
    Struct(StructId),
    Alias(AliasId),
    Sampler(SamplerKind),
    /// Texture dimension and declared component kind (`Texture2D<uint4>` has `UInt`)
    Texture(TextureDim, Option<ScalarKind>),
    Stream(StreamKind, Box<Type>),
    /// A type spelled directly in the target vocabulary
    Named(String),
}
impl Type {
    pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);

    pub fn float_vec(n: u8) -> Type {
        Type::vector(ScalarKind::Float, n)
    }

    /// Vector of `n` components, collapsing single-component vectors to scalars.
    pub fn vector(kind: ScalarKind, n: u8) -> Type {
        if n <= 1 {
            Type::Scalar(kind)
        } else {
            Type::Vector(kind, n)
        }
    }

    pub fn array(elem: Type, len: u32) -> Type {
        Type::Array(Box::new(elem), vec![Some(len)])
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(k) | Type::Vector(k, _) | Type::Matrix(k, _, _) => Some(*k),
            _ => None,
        }
    }

    /// Component count of a scalar (1) or vector.
    pub fn components(&self) -> Option<u8> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }
    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(_, _))
    }
    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Matrix(_, _, _))
    }
    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }
    pub fn is_integer(&self) -> bool {
        self.scalar_kind().map_or(false, ScalarKind::is_integer)
    }
    pub fn is_numeric(&self) -> bool {
        self.scalar_kind().is_some()
    }

    /// Samplers, textures and the combined objects that replace them.
    pub fn is_object(&self) -> bool {
        match self {
            Type::Sampler(_) | Type::Texture(_, _) | Type::Stream(_, _) => true,
            Type::Named(n) => n.contains("sampler") || n.contains("texture"),
            Type::Array(elem, _) => elem.is_object(),
            _ => false,
        }
    }

    /// Same shape with another base kind
    pub fn with_kind(&self, kind: ScalarKind) -> Type {
        match self {
            Type::Scalar(_) => Type::Scalar(kind),
            Type::Vector(_, n) => Type::Vector(kind, *n),
            Type::Matrix(_, r, c) => Type::Matrix(kind, *r, *c),
            other => other.clone(),
        }
    }

    /// Element type of an array, or the type itself.
    pub fn element(&self) -> &Type {
        match self {
            Type::Array(elem, _) => elem,
            other => other,
        }
    }

    /// Number of elements an array holds over all its dimensions; unsized dimensions count as one.
    pub fn array_len(&self) -> u32 {
        match self {
            Type::Array(_, dims) => dims.iter().map(|d| d.unwrap_or(1)).product(),
            _ => 1,
        }
    }

    /// Varying location slots consumed by a value of this type.
    pub fn location_slots(&self) -> u32 {
        match self {
            Type::Matrix(_, _, _) => 4,
            Type::Array(elem, _) => elem.location_slots() * self.array_len(),
            _ => 1,
        }
    }
}
