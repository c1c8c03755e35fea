//! Varying locations and uniform/sampler bindings.
//!
//! [LocationBinder] turns a semantic on an entry-point input or output into the global
//! the converted shader reads or writes. [BindingAllocator] hands out `binding` slots
//! to uniforms and samplers from two fixed-size bitmaps.
use std::collections::{BTreeMap, HashMap};

use crate::{
    ast::{
        expr::Expr,
        types::{ScalarKind, Type},
        Direction, Location, Program, Qualifiers, VarId, Variable,
    },
    config::{Capabilities, Configuration, PipelineStage},
    error::{ConvertError, Diagnostics, SourceSpan},
    glsl::builtins::{builtin_for, builtin_type, Builtin},
    hlsl::{semantic::Semantic, syntax::RegisterHint},
};

/// Sampler slots per stage (`s0..s15`).
pub const MAX_SAMPLER_SLOTS: usize = 16;
/// Uniform slots, each one `float4` wide.
pub const MAX_UNIFORM_SLOTS: usize = 256;

/// A semantic resolved to the global it is read from or written to.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSemantic {
    pub var: VarId,
    /// Element of an array builtin, e.g. `gl_FragData[1]`
    pub index: Option<u32>,
    /// Type of a single value, the element type for array builtins
    pub ty: Type,
}
impl BoundSemantic {
    pub fn to_expr(&self, program: &Program) -> Expr {
        match self.index {
            Some(i) => Expr::var(self.var, program.var(self.var).ty.clone())
                .index(Expr::int(i as i64), Some(self.ty.clone())),
            None => Expr::var(self.var, self.ty.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationAssignment {
    /// Semantic as written in the source, modifiers stripped
    pub semantic: String,
    pub var: VarId,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct LocationBinder {
    next_input: u32,
    next_output: u32,
    builtins: HashMap<&'static str, VarId>,
    generated: HashMap<(Direction, String), VarId>,
    pub inputs: Vec<LocationAssignment>,
    pub outputs: Vec<LocationAssignment>,
}
impl LocationBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builtin variable already in use
    pub fn builtin(&self, name: &str) -> Option<VarId> {
        self.builtins.get(name).copied()
    }

    /// Builtin variable by name, created on first use. Builtins are never declared.
    pub fn builtin_var(&mut self, program: &mut Program, name: &'static str, ty: Type) -> VarId {
        *self.builtins.entry(name).or_insert_with(|| {
            let mut var = Variable::new(name, ty);
            var.builtin = true;
            program.add_var(var)
        })
    }

    /// The global a semantic reads or writes, created on first use.
    ///
    /// `default_name` names the generated variable unless the semantic names it.
    /// Non-builtin globals take the next location of their direction.
    pub fn bind_location(
        &mut self,
        program: &mut Program,
        config: &Configuration,
        diagnostics: &mut Diagnostics,
        semantic: &Semantic,
        ty: &Type,
        direction: Direction,
        default_name: &str,
        span: SourceSpan,
    ) -> Result<BoundSemantic, ConvertError> {
        let builtin = if config.point_sprite
            && config.stage == PipelineStage::Pixel
            && direction == Direction::In
            && semantic.is("TEXCOORD")
            && semantic.index == 0
        {
            Some(Builtin::Var("gl_PointCoord"))
        } else {
            builtin_for(config.stage, config.shader_model, direction, semantic)
        };

        match builtin {
            Some(Builtin::Indexed("gl_FragData"))
                if config.capabilities.contains(Capabilities::FRAG_DATA_OUTPUTS) =>
            {
                let name = if default_name.is_empty() {
                    "out_gl_fragdata".to_string()
                } else {
                    format!("out_gl_fragdata_{}", default_name)
                };
                let is_new = !self.generated.contains_key(&(direction, name.clone()));
                let var = self.generated_var(program, direction, &name, ty, span, |var| {
                    var.layout.location = Some(Location::Index(semantic.index));
                });
                if is_new {
                    self.outputs.push(LocationAssignment {
                        semantic: semantic.to_string(),
                        var,
                        name,
                        location: Location::Index(semantic.index),
                    });
                }
                Ok(BoundSemantic {
                    var,
                    index: None,
                    ty: ty.clone(),
                })
            }
            Some(builtin) => {
                let elem_ty = match builtin_type(builtin.name()) {
                    Some(t) => t,
                    None if !matches!(ty, Type::Void) => {
                        diagnostics.warning(
                            format!("No default type defined for glsl semantic {}", builtin.name()),
                            span,
                        );
                        ty.clone()
                    }
                    None => {
                        return Err(ConvertError::UnresolvedSemantic {
                            semantic: semantic.to_string(),
                            builtin: builtin.name().to_string(),
                        })
                    }
                };
                match builtin {
                    Builtin::Var(name) => Ok(BoundSemantic {
                        var: self.builtin_var(program, name, elem_ty.clone()),
                        index: None,
                        ty: elem_ty,
                    }),
                    Builtin::Indexed(name) => Ok(BoundSemantic {
                        var: self.builtin_var(
                            program,
                            name,
                            Type::Array(Box::new(elem_ty.clone()), vec![None]),
                        ),
                        index: Some(semantic.index),
                        ty: elem_ty,
                    }),
                }
            }
            None => self.bind_varying(program, config, semantic, ty, direction, default_name, span),
        }
    }

    fn bind_varying(
        &mut self,
        program: &mut Program,
        config: &Configuration,
        semantic: &Semantic,
        ty: &Type,
        direction: Direction,
        default_name: &str,
        span: SourceSpan,
    ) -> Result<BoundSemantic, ConvertError> {
        let key = semantic.to_string();
        let rule = config
            .variable_layouts
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            .map(|(_, rule)| rule);
        let override_name = rule.and_then(|r| match direction {
            Direction::In => r.name.clone(),
            Direction::Out => r.name_output.clone().or_else(|| r.name.clone()),
        });
        let name = override_name.unwrap_or_else(|| {
            let prefix = match (config.stage, direction) {
                (PipelineStage::Vertex, Direction::In) => "a_",
                (PipelineStage::Pixel, Direction::Out) => "vout_",
                _ => "v_",
            };
            if config.use_semantic_for_variable || default_name.is_empty() {
                format!("{}{}", prefix, semantic)
            } else {
                format!("{}{}", prefix, default_name)
            }
        });

        if let Some(var) = self.generated.get(&(direction, name.clone())) {
            return Ok(BoundSemantic {
                var: *var,
                index: None,
                ty: program.var(*var).ty.clone(),
            });
        }

        let location = match rule.and_then(|r| r.location.as_ref()) {
            Some(loc) => match loc.parse::<u32>() {
                Ok(i) => Location::Index(i),
                Err(_) => Location::Named(loc.clone()),
            },
            None if config.use_semantic_for_location => Location::Named(format!("S_{}", semantic)),
            None => {
                let counter = match direction {
                    Direction::In => &mut self.next_input,
                    Direction::Out => &mut self.next_output,
                };
                let loc = *counter;
                *counter += ty.location_slots();
                Location::Index(loc)
            }
        };

        let flat = ty.scalar_kind().map_or(false, ScalarKind::is_integer)
            && !(config.stage == PipelineStage::Vertex && direction == Direction::In)
            && config.capabilities.contains(Capabilities::FLAT_INTERPOLATION);
        let explicit = config.explicit_locations;
        let loc = location.clone();
        let var = self.generated_var(program, direction, &name, ty, span, |var| {
            if flat {
                var.qualifiers |= Qualifiers::FLAT;
            }
            if explicit {
                var.layout.location = Some(loc);
            }
        });
        tracing::trace!(%semantic, %name, ?location, ?direction, "bound varying");

        let assignment = LocationAssignment {
            semantic: semantic.to_string(),
            var,
            name,
            location,
        };
        match direction {
            Direction::In => self.inputs.push(assignment),
            Direction::Out => self.outputs.push(assignment),
        }
        Ok(BoundSemantic {
            var,
            index: None,
            ty: ty.clone(),
        })
    }

    fn generated_var(
        &mut self,
        program: &mut Program,
        direction: Direction,
        name: &str,
        ty: &Type,
        span: SourceSpan,
        init: impl FnOnce(&mut Variable),
    ) -> VarId {
        let key = (direction, name.to_string());
        if let Some(var) = self.generated.get(&key) {
            return *var;
        }
        let qualifier = match direction {
            Direction::In => Qualifiers::IN,
            Direction::Out => Qualifiers::OUT,
        };
        let mut var = Variable::new(name, ty.clone())
            .with_qualifiers(qualifier)
            .at(span);
        init(&mut var);
        let id = program.push_global(var);
        self.generated.insert(key, id);
        id
    }
}

/// Layout metadata a host needs to match the converted shader against its pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub inputs: Vec<LocationAssignment>,
    pub outputs: Vec<LocationAssignment>,
    pub uniform_bindings: Vec<BindingAssignment>,
    pub sampler_bindings: Vec<BindingAssignment>,
    /// Constant buffer name and binding
    pub constant_buffers: Vec<(String, u32)>,
    /// Vertex input attribute names by location
    pub attributes: BTreeMap<u32, String>,
}
impl LayoutReport {
    pub fn input(&self, semantic: &str) -> Option<&LocationAssignment> {
        self.inputs
            .iter()
            .find(|a| a.semantic.eq_ignore_ascii_case(semantic))
    }
    pub fn output(&self, semantic: &str) -> Option<&LocationAssignment> {
        self.outputs
            .iter()
            .find(|a| a.semantic.eq_ignore_ascii_case(semantic))
    }
}

/// Fixed-size occupancy map of binding slots
#[derive(Debug, Clone)]
pub struct SlotBitmap {
    used: Vec<bool>,
}
impl SlotBitmap {
    pub fn new(slots: usize) -> Self {
        Self {
            used: vec![false; slots],
        }
    }

    /// First index at or after `start` where `size` contiguous slots are free.
    pub fn find_available(&self, start: u32, size: u32) -> Option<u32> {
        let (start, size) = (start as usize, size.max(1) as usize);
        if start + size > self.used.len() {
            return None;
        }
        (start..=self.used.len() - size)
            .find(|i| self.used[*i..*i + size].iter().all(|u| !u))
            .map(|i| i as u32)
    }

    pub fn allocate(&mut self, start: u32, size: u32) {
        let start = start as usize;
        for slot in &mut self.used[start..start + size.max(1) as usize] {
            *slot = true;
        }
    }

    pub fn is_used(&self, slot: u32) -> bool {
        self.used.get(slot as usize).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotClass {
    Sampler,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingAssignment {
    pub var: VarId,
    pub name: String,
    pub class: SlotClass,
    pub binding: u32,
    pub slots: u32,
}

/// Number of `float4` slots a uniform of this type occupies.
pub fn uniform_slots(program: &Program, ty: &Type) -> u32 {
    match program.resolve_type(ty) {
        Type::Matrix(_, r, c) => ((*r as u32) * (*c as u32) + 3) / 4,
        Type::Array(elem, _) => uniform_slots(program, elem) * ty_len(program, ty),
        Type::Struct(id) => program
            .struct_type(*id)
            .fields
            .iter()
            .map(|f| uniform_slots(program, &program.var(*f).ty))
            .sum::<u32>()
            .max(1),
        _ => 1,
    }
}

fn ty_len(program: &Program, ty: &Type) -> u32 {
    program.resolve_type(ty).array_len()
}

#[derive(Debug)]
pub struct BindingAllocator {
    samplers: SlotBitmap,
    uniforms: SlotBitmap,
    assigned: HashMap<VarId, BindingAssignment>,
    order: Vec<VarId>,
}
impl Default for BindingAllocator {
    fn default() -> Self {
        Self::new()
    }
}
impl BindingAllocator {
    pub fn new() -> Self {
        Self {
            samplers: SlotBitmap::new(MAX_SAMPLER_SLOTS),
            uniforms: SlotBitmap::new(MAX_UNIFORM_SLOTS),
            assigned: HashMap::new(),
            order: vec![],
        }
    }

    pub fn slot_class(program: &Program, var: VarId) -> SlotClass {
        if program.var(var).ty.is_object() {
            SlotClass::Sampler
        } else {
            SlotClass::Uniform
        }
    }

    fn bitmap(&mut self, class: SlotClass) -> &mut SlotBitmap {
        match class {
            SlotClass::Sampler => &mut self.samplers,
            SlotClass::Uniform => &mut self.uniforms,
        }
    }

    /// Slot count of `var` in its bitmap
    fn size_of(program: &Program, var: VarId, class: SlotClass) -> u32 {
        let ty = &program.var(var).ty;
        match class {
            SlotClass::Sampler => program.resolve_type(ty).array_len(),
            SlotClass::Uniform => uniform_slots(program, ty),
        }
    }

    /// Allocate a binding for `var`, honouring its register hint when that slot range is free.
    ///
    /// Re-allocating a bound variable returns its existing slot. `None` means the
    /// allocation failed and an error was recorded.
    pub fn allocate(&mut self, program: &Program, var: VarId, diagnostics: &mut Diagnostics) -> Option<u32> {
        if let Some(existing) = self.assigned.get(&var) {
            return Some(existing.binding);
        }
        let v = program.var(var);
        let class = Self::slot_class(program, var);
        let size = Self::size_of(program, var, class);

        if let Some(register) = &v.register {
            match RegisterHint::parse(register) {
                Ok(hint) => {
                    if self.bitmap(class).find_available(hint.index, size) == Some(hint.index) {
                        return Some(self.commit(program, var, class, hint.index, size));
                    }
                    diagnostics.warning(
                        format!(
                            "Unable to use explicit layout for variable {} as the location is already used. Use of an implicit layout",
                            v.name
                        ),
                        v.span,
                    );
                }
                Err(_) => {
                    diagnostics.error(ConvertError::InvalidBinding(v.name.clone()), v.span);
                    return None;
                }
            }
        }
        self.allocate_implicit(program, var, class, size, diagnostics)
    }

    fn allocate_implicit(
        &mut self,
        program: &Program,
        var: VarId,
        class: SlotClass,
        size: u32,
        diagnostics: &mut Diagnostics,
    ) -> Option<u32> {
        match self.bitmap(class).find_available(0, size) {
            Some(index) => Some(self.commit(program, var, class, index, size)),
            None => {
                let v = program.var(var);
                diagnostics.error(
                    ConvertError::BindingExhausted {
                        name: v.name.clone(),
                        slots: size,
                    },
                    v.span,
                );
                None
            }
        }
    }

    fn commit(&mut self, program: &Program, var: VarId, class: SlotClass, index: u32, size: u32) -> u32 {
        self.bitmap(class).allocate(index, size);
        tracing::debug!(name = %program.var(var).name, ?class, index, size, "allocated binding");
        self.assigned.insert(
            var,
            BindingAssignment {
                var,
                name: program.var(var).name.clone(),
                class,
                binding: index,
                slots: size,
            },
        );
        self.order.push(var);
        index
    }

    /// Allocate every variable of `vars`: register hints first, then the rest in order.
    /// Failures are recorded and allocation continues with the next variable.
    pub fn allocate_all(&mut self, program: &Program, vars: &[VarId], diagnostics: &mut Diagnostics) {
        let (hinted, implicit): (Vec<VarId>, Vec<VarId>) =
            vars.iter().partition(|v| program.var(**v).register.is_some());
        for var in hinted.into_iter().chain(implicit) {
            self.allocate(program, var, diagnostics);
        }
    }

    pub fn binding_of(&self, var: VarId) -> Option<u32> {
        self.assigned.get(&var).map(|a| a.binding)
    }

    pub fn is_slot_used(&self, class: SlotClass, slot: u32) -> bool {
        match class {
            SlotClass::Sampler => self.samplers.is_used(slot),
            SlotClass::Uniform => self.uniforms.is_used(slot),
        }
    }

    /// Assignments in allocation order
    pub fn assignments(&self) -> Vec<BindingAssignment> {
        self.order
            .iter()
            .filter_map(|v| self.assigned.get(v).cloned())
            .collect()
    }
}
