//! Tagged-variant shader AST.
//!
//! Declarations live in per-kind arenas inside [Program] and are referred to by index
//! ([VarId], [FuncId], ...). Expressions hold these indices rather than names, so a
//! declaration can be renamed once and every reference follows.
//! [Program::decls] is the ordered list of top-level declarations.
use bitflags::bitflags;

use crate::error::SourceSpan;

pub mod display;
pub mod expr;
pub mod types;
pub mod visit;

use self::expr::{Attribute, Expr, Stmt};
use self::types::{GeometryPrimitive, Type};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
arena_id!(VarId);
arena_id!(FuncId);
arena_id!(StructId);
arena_id!(CBufferId);
arena_id!(AliasId);

bitflags! {
    /// Storage, parameter and interpolation qualifiers of a variable
    pub struct Qualifiers: u32 {
        const IN              = 0b0000_0000_0000_0001;
        const OUT             = 0b0000_0000_0000_0010;
        const INOUT           = Self::IN.bits | Self::OUT.bits;
        const UNIFORM         = 0b0000_0000_0000_0100;
        const CONST           = 0b0000_0000_0000_1000;
        const STATIC          = 0b0000_0000_0001_0000;
        const SHARED          = 0b0000_0000_0010_0000;
        const GROUPSHARED     = 0b0000_0000_0100_0000;
        const FLAT            = 0b0000_0000_1000_0000;
        const NOPERSPECTIVE   = 0b0000_0001_0000_0000;
        const CENTROID        = 0b0000_0010_0000_0000;
        const ROW_MAJOR       = 0b0000_0100_0000_0000;
        const COLUMN_MAJOR    = 0b0000_1000_0000_0000;
        const ATTRIBUTE       = 0b0001_0000_0000_0000;
        const VARYING         = 0b0010_0000_0000_0000;
        const EXTERN          = 0b0100_0000_0000_0000;

        const STORAGE = Self::UNIFORM.bits | Self::CONST.bits | Self::STATIC.bits | Self::SHARED.bits | Self::GROUPSHARED.bits | Self::EXTERN.bits;
    }
}

/// Explicit layout location. Placeholders are resolved by the host at link time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Index(u32),
    Named(String),
}

/// Layout information attached to a declaration during conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub location: Option<Location>,
    pub binding: Option<u32>,
}
impl Layout {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.binding.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub qualifiers: Qualifiers,
    /// Semantic as written, e.g. `SV_Target1`
    pub semantic: Option<String>,
    /// Register hint as written, e.g. `s0`, `c[4]` or `b1`
    pub register: Option<String>,
    /// Geometry shader input primitive, only on entry parameters
    pub primitive: Option<GeometryPrimitive>,
    pub initializer: Option<Expr>,
    pub layout: Layout,
    /// Predeclared target identifier, never emitted as a declaration
    pub builtin: bool,
    pub span: SourceSpan,
}
impl Variable {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            qualifiers: Qualifiers::empty(),
            semantic: None,
            register: None,
            primitive: None,
            initializer: None,
            layout: Layout::default(),
            builtin: false,
            span: SourceSpan::default(),
        }
    }
    pub fn with_semantic(mut self, semantic: &str) -> Self {
        self.semantic = Some(semantic.to_string());
        self
    }
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers |= qualifiers;
        self
    }
    pub fn with_register(mut self, register: &str) -> Self {
        self.register = Some(register.to_string());
        self
    }
    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Globals without in/out/static/const qualifiers are uniforms in HLSL.
    pub fn is_uniform_like(&self) -> bool {
        !self.builtin
            && !self.qualifiers.intersects(
                Qualifiers::IN | Qualifiers::OUT | Qualifiers::STATIC | Qualifiers::CONST,
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub return_semantic: Option<String>,
    pub params: Vec<VarId>,
    /// `None` for a forward declaration
    pub body: Option<Vec<Stmt>>,
    pub attributes: Vec<Attribute>,
    pub span: SourceSpan,
}
impl Function {
    pub fn new(name: &str, return_type: Type) -> Self {
        Self {
            name: name.to_string(),
            return_type,
            return_semantic: None,
            params: vec![],
            body: Some(vec![]),
            attributes: vec![],
            span: SourceSpan::default(),
        }
    }
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<VarId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    CBuffer,
    TBuffer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantBuffer {
    pub name: String,
    pub kind: BufferKind,
    pub members: Vec<VarId>,
    pub register: Option<String>,
    pub binding: Option<u32>,
    pub std140: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    pub name: String,
    pub ty: Type,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

/// Stage-wide layout declaration, e.g. `layout(triangle_strip, max_vertices = 3) out;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDecl {
    pub direction: Direction,
    pub entries: Vec<(String, Option<u32>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Function(FuncId),
    /// Global variables, grouped as declared (`float a, b;`)
    Variables(Vec<VarId>),
    Struct(StructId),
    ConstantBuffer(CBufferId),
    TypeAlias(AliasId),
    Layout(LayoutDecl),
}

/// Root of a shader: declaration arenas plus the ordered top-level declaration list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
    vars: Vec<Variable>,
    funcs: Vec<Function>,
    structs: Vec<StructType>,
    cbuffers: Vec<ConstantBuffer>,
    aliases: Vec<TypeAlias>,
}
impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, var: Variable) -> VarId {
        self.vars.push(var);
        VarId((self.vars.len() - 1) as u32)
    }
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }
    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.index()]
    }

    pub fn add_function(&mut self, func: Function) -> FuncId {
        self.funcs.push(func);
        FuncId((self.funcs.len() - 1) as u32)
    }
    pub fn function(&self, id: FuncId) -> &Function {
        &self.funcs[id.index()]
    }
    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.funcs[id.index()]
    }

    pub fn add_struct(&mut self, s: StructType) -> StructId {
        self.structs.push(s);
        StructId((self.structs.len() - 1) as u32)
    }
    pub fn struct_type(&self, id: StructId) -> &StructType {
        &self.structs[id.index()]
    }
    pub fn struct_type_mut(&mut self, id: StructId) -> &mut StructType {
        &mut self.structs[id.index()]
    }

    pub fn add_cbuffer(&mut self, cb: ConstantBuffer) -> CBufferId {
        self.cbuffers.push(cb);
        CBufferId((self.cbuffers.len() - 1) as u32)
    }
    pub fn cbuffer(&self, id: CBufferId) -> &ConstantBuffer {
        &self.cbuffers[id.index()]
    }
    pub fn cbuffer_mut(&mut self, id: CBufferId) -> &mut ConstantBuffer {
        &mut self.cbuffers[id.index()]
    }

    pub fn add_alias(&mut self, alias: TypeAlias) -> AliasId {
        self.aliases.push(alias);
        AliasId((self.aliases.len() - 1) as u32)
    }
    pub fn alias(&self, id: AliasId) -> &TypeAlias {
        &self.aliases[id.index()]
    }
    pub fn alias_mut(&mut self, id: AliasId) -> &mut TypeAlias {
        &mut self.aliases[id.index()]
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.vars.len() as u32).map(VarId)
    }
    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.funcs.len() as u32).map(FuncId)
    }
    pub fn struct_ids(&self) -> impl Iterator<Item = StructId> {
        (0..self.structs.len() as u32).map(StructId)
    }
    pub fn cbuffer_ids(&self) -> impl Iterator<Item = CBufferId> {
        (0..self.cbuffers.len() as u32).map(CBufferId)
    }
    pub fn alias_ids(&self) -> impl Iterator<Item = AliasId> {
        (0..self.aliases.len() as u32).map(AliasId)
    }

    /// Declare a global at the end of the declaration list
    pub fn push_global(&mut self, var: Variable) -> VarId {
        let id = self.add_var(var);
        self.decls.push(Decl::Variables(vec![id]));
        id
    }
    pub fn push_function(&mut self, func: Function) -> FuncId {
        let id = self.add_function(func);
        self.decls.push(Decl::Function(id));
        id
    }
    pub fn push_struct(&mut self, name: &str, fields: Vec<Variable>) -> StructId {
        let fields = fields.into_iter().map(|f| self.add_var(f)).collect();
        let id = self.add_struct(StructType {
            name: name.to_string(),
            fields,
            span: SourceSpan::default(),
        });
        self.decls.push(Decl::Struct(id));
        id
    }

    /// First declared function with this name, compared case-sensitively.
    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.decls.iter().find_map(|d| match d {
            Decl::Function(f) if self.function(*f).name == name => Some(*f),
            _ => None,
        })
    }

    /// Global variables in declaration order, constant-buffer members included.
    pub fn global_vars(&self) -> Vec<VarId> {
        let mut out = vec![];
        for d in &self.decls {
            match d {
                Decl::Variables(vs) => out.extend(vs.iter().copied()),
                Decl::ConstantBuffer(cb) => out.extend(self.cbuffer(*cb).members.iter().copied()),
                _ => {}
            }
        }
        out
    }

    /// Follow type aliases to the underlying type.
    pub fn resolve_type<'a>(&'a self, mut ty: &'a Type) -> &'a Type {
        while let Type::Alias(id) = ty {
            ty = &self.alias(*id).ty;
        }
        ty
    }

    /// Name of a type in HLSL spelling, for diagnostics and for types not yet mapped.
    pub fn type_name(&self, ty: &Type) -> String {
        use self::types::SamplerKind;
        match ty {
            Type::Void => "void".to_string(),
            Type::Scalar(k) => k.hlsl_name().to_string(),
            Type::Vector(k, n) => format!("{}{}", k.hlsl_name(), n),
            Type::Matrix(k, r, c) => format!("{}{}x{}", k.hlsl_name(), r, c),
            Type::Array(elem, _) => self.type_name(elem),
            Type::Struct(id) => self.struct_type(*id).name.clone(),
            Type::Alias(id) => self.alias(*id).name.clone(),
            Type::Sampler(SamplerKind::State) => "SamplerState".to_string(),
            Type::Sampler(SamplerKind::Comparison) => "SamplerComparisonState".to_string(),
            Type::Sampler(SamplerKind::Legacy(dim)) => format!("sampler{}", dim.glsl_suffix()),
            Type::Texture(dim, _) => dim.hlsl_name().to_string(),
            Type::Stream(kind, elem) => {
                let name = match kind {
                    types::StreamKind::Point => "PointStream",
                    types::StreamKind::Line => "LineStream",
                    types::StreamKind::Triangle => "TriangleStream",
                };
                format!("{}<{}>", name, self.type_name(elem))
            }
            Type::Named(n) => n.clone(),
        }
    }
}
