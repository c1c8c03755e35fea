use hlsl2glsl::{
    ast::{
        types::{SamplerKind, ScalarKind, TextureDim, Type},
        Direction, Location, Program, Variable,
    },
    config::{Configuration, PipelineStage, TargetProfile},
    convert::layout::{BindingAllocator, LocationBinder, SlotClass, MAX_SAMPLER_SLOTS},
    error::{Diagnostics, SourceSpan},
    hlsl::semantic::Semantic,
};

fn texture(name: &str) -> Variable {
    Variable::new(name, Type::Texture(TextureDim::Tex2D, None))
}

#[test]
fn test_register_hints_are_honoured() {
    let mut program = Program::new();
    let diffuse = texture("diffuse").with_register("t2");
    let diffuse = program.push_global(diffuse);
    let normal = texture("normal");
    let normal = program.push_global(normal);

    let mut diagnostics = Diagnostics::new();
    let mut allocator = BindingAllocator::new();
    allocator.allocate_all(&program, &[normal, diffuse], &mut diagnostics);

    assert!(diagnostics.is_empty());
    assert_eq!(allocator.binding_of(diffuse), Some(2));
    assert_eq!(allocator.binding_of(normal), Some(0));
    assert!(allocator.is_slot_used(SlotClass::Sampler, 2));
    assert!(!allocator.is_slot_used(SlotClass::Sampler, 1));
}

#[test]
fn test_reallocation_is_stable() {
    let mut program = Program::new();
    let s = program.push_global(Variable::new("samp", Type::Sampler(SamplerKind::State)));
    let mut diagnostics = Diagnostics::new();
    let mut allocator = BindingAllocator::new();

    let first = allocator.allocate(&program, s, &mut diagnostics);
    let second = allocator.allocate(&program, s, &mut diagnostics);
    assert_eq!(first, Some(0));
    assert_eq!(first, second);
    assert_eq!(allocator.assignments().len(), 1);
}

#[test]
fn test_colliding_hint_falls_back_to_free_slot() {
    let mut program = Program::new();
    let a = texture("a").with_register("t0");
    let a = program.push_global(a);
    let b = texture("b").with_register("t0");
    let b = program.push_global(b);

    let mut diagnostics = Diagnostics::new();
    let mut allocator = BindingAllocator::new();
    allocator.allocate_all(&program, &[a, b], &mut diagnostics);

    assert_eq!(allocator.binding_of(a), Some(0));
    assert_eq!(allocator.binding_of(b), Some(1));
    assert_eq!(diagnostics.warnings().count(), 1);
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_uniform_ranges_do_not_overlap() {
    let mut program = Program::new();
    let world = program.push_global(Variable::new("world", Type::Matrix(ScalarKind::Float, 4, 4)));
    let tint = program.push_global(Variable::new("tint", Type::float_vec(4)));
    let lights = program.push_global(Variable::new("lights", Type::array(Type::float_vec(4), 3)));

    let mut diagnostics = Diagnostics::new();
    let mut allocator = BindingAllocator::new();
    allocator.allocate_all(&program, &[world, tint, lights], &mut diagnostics);

    let assignments = allocator.assignments();
    assert_eq!(assignments.len(), 3);
    for (i, a) in assignments.iter().enumerate() {
        assert_eq!(a.class, SlotClass::Uniform);
        for b in &assignments[i + 1..] {
            let disjoint = a.binding + a.slots <= b.binding || b.binding + b.slots <= a.binding;
            assert!(disjoint, "{:?} overlaps {:?}", a, b);
        }
    }
    assert_eq!(allocator.binding_of(world), Some(0));
    assert_eq!(allocator.binding_of(tint), Some(4));
    assert_eq!(allocator.binding_of(lights), Some(5));
}

#[test]
fn test_sampler_slots_exhausted() {
    let mut program = Program::new();
    let vars: Vec<_> = (0..=MAX_SAMPLER_SLOTS)
        .map(|i| program.push_global(texture(&format!("t{}", i))))
        .collect();

    let mut diagnostics = Diagnostics::new();
    let mut allocator = BindingAllocator::new();
    allocator.allocate_all(&program, &vars, &mut diagnostics);

    assert_eq!(diagnostics.errors().count(), 1);
    assert_eq!(allocator.binding_of(vars[MAX_SAMPLER_SLOTS]), None);
    assert_eq!(allocator.binding_of(vars[MAX_SAMPLER_SLOTS - 1]), Some(MAX_SAMPLER_SLOTS as u32 - 1));
}

#[test]
fn test_varyings_get_sequential_locations() {
    let config = Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Pixel);
    let mut program = Program::new();
    let mut diagnostics = Diagnostics::new();
    let mut binder = LocationBinder::new();
    let mut bind = |program: &mut Program, semantic: &str, ty: Type, name: &str| {
        binder
            .bind_location(
                program,
                &config,
                &mut diagnostics,
                &Semantic::parse(semantic).unwrap(),
                &ty,
                Direction::In,
                name,
                SourceSpan::default(),
            )
            .unwrap()
    };

    let uv = bind(&mut program, "TEXCOORD0", Type::float_vec(2), "uv");
    let basis = bind(&mut program, "TEXCOORD1", Type::Matrix(ScalarKind::Float, 3, 3), "basis");
    let color = bind(&mut program, "COLOR0", Type::float_vec(4), "color");
    let uv_again = bind(&mut program, "TEXCOORD0", Type::float_vec(2), "uv");

    assert_eq!(uv.var, uv_again.var);
    assert_eq!(program.var(uv.var).name, "v_uv");
    assert_ne!(uv.var, color.var);
    assert_ne!(basis.var, color.var);

    let locations: Vec<_> = binder.inputs.iter().map(|a| a.location.clone()).collect();
    assert_eq!(
        locations,
        vec![Location::Index(0), Location::Index(1), Location::Index(5)]
    );
    assert_eq!(binder.inputs[2].semantic, "COLOR0");
}

#[test]
fn test_pixel_target_binds_fragdata() {
    let config = Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Pixel);
    let mut program = Program::new();
    let mut diagnostics = Diagnostics::new();
    let mut binder = LocationBinder::new();

    let bound = binder
        .bind_location(
            &mut program,
            &config,
            &mut diagnostics,
            &Semantic::parse("SV_Target1").unwrap(),
            &Type::float_vec(4),
            Direction::Out,
            "normal",
            SourceSpan::default(),
        )
        .unwrap();

    let var = program.var(bound.var);
    assert_eq!(var.name, "out_gl_fragdata_normal");
    assert_eq!(var.layout.location, Some(Location::Index(1)));
    assert_eq!(binder.outputs.len(), 1);
}
