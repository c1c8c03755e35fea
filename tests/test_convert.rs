mod common;

use common::*;
use hlsl2glsl::{
    ast::{
        expr::{Attribute, BinaryOp, Callee, Expr, ExprKind, Stmt, StmtKind, UnaryOp},
        types::{GeometryPrimitive, SamplerKind, ScalarKind, StreamKind, TextureDim, Type},
        BufferKind, ConstantBuffer, Decl, Function, Program, Qualifiers, Variable,
    },
    config::{Capabilities, Configuration, PipelineStage, SamplerMode, TargetProfile},
    convert,
    error::SourceSpan,
};

fn for_loop(i: hlsl2glsl::ast::VarId, bound: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::For {
        init: Some(Box::new(Stmt::decl(i))),
        cond: Some(Expr::binary(BinaryOp::Less, Expr::var(i, Type::INT), bound, Some(Type::BOOL))),
        step: Some(Expr::unary(UnaryOp::PostInc, Expr::var(i, Type::INT))),
        body: Box::new(Stmt::block(body)),
        attributes: vec![Attribute::new("unroll")],
    })
}

fn add_assign(target: Expr, value: Expr) -> Stmt {
    let ty = target.ty.clone();
    Stmt::expr(Expr::new(
        ExprKind::Assign {
            op: Some(BinaryOp::Add),
            target: Box::new(target),
            value: Box::new(value),
        },
        ty,
    ))
}

#[test]
fn test_pixel_output_becomes_fragdata() {
    let mut program = Program::new();
    let body = vec![returns(float4(vec![
        Expr::float(1.0),
        Expr::float(0.0),
        Expr::float(0.0),
        Expr::float(1.0),
    ]))];
    pixel_main(&mut program, vec![], body);

    let (result, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("layout(location = 0) out vec4 out_gl_fragdata;"), "{}", text);
    assert!(text.contains("void main()"), "{}", text);
    assert!(text.contains("out_gl_fragdata = vec4(1.0, 0.0, 0.0, 1.0);"), "{}", text);
    assert!(!text.contains("PS_Main"), "{}", text);
    assert!(result.layout.output("SV_Target0").is_some());
}

#[test]
fn test_clip_scalar_and_vector() {
    let mut program = Program::new();
    let color = param(&mut program, "color", Type::float_vec(4), "COLOR0");
    let body = vec![
        Stmt::expr(Expr::call(
            "clip",
            vec![Expr::var(color, Type::float_vec(4)).swizzle("w", Type::FLOAT)],
            Some(Type::Void),
        )),
        Stmt::expr(Expr::call("clip", vec![Expr::var(color, Type::float_vec(4))], Some(Type::Void))),
        returns(Expr::var(color, Type::float_vec(4))),
    ];
    pixel_main(&mut program, vec![color], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("in vec4 v_color;"), "{}", text);
    assert!(text.contains("if (v_color.w < 0.0)"), "{}", text);
    assert!(text.contains("all(lessThan(v_color, vec4(0.0)))"), "{}", text);
    assert_eq!(text.matches("discard;").count(), 2, "{}", text);
    assert!(!text.contains("clip("), "{}", text);
}

#[test]
fn test_unroll_constant_loop() {
    let mut program = Program::new();
    let sum = program.add_var(Variable::new("sum", Type::FLOAT).with_initializer(Expr::float(0.0)));
    let i = program.add_var(Variable::new("i", Type::INT).with_initializer(Expr::int(0)));
    let body = vec![
        Stmt::decl(sum),
        for_loop(
            i,
            Expr::int(5),
            vec![add_assign(Expr::var(sum, Type::FLOAT), Expr::var(i, Type::INT))],
        ),
        returns(float4(vec![Expr::var(sum, Type::FLOAT)])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert_eq!(text.matches("sum += ").count(), 5, "{}", text);
    assert!(text.contains("sum += 0.0;"), "{}", text);
    assert!(text.contains("sum += 4.0;"), "{}", text);
    assert!(!text.contains("for ("), "{}", text);
}

#[test]
fn test_unroll_with_uniform_bound_fails() {
    let mut program = Program::new();
    let count = global(&mut program, "count", Type::INT);
    let sum = program.add_var(Variable::new("sum", Type::FLOAT).with_initializer(Expr::float(0.0)));
    let i = program.add_var(Variable::new("i", Type::INT).with_initializer(Expr::int(0)));
    let body = vec![
        Stmt::decl(sum),
        for_loop(
            i,
            Expr::var(count, Type::INT),
            vec![add_assign(Expr::var(sum, Type::FLOAT), Expr::float(1.0))],
        ),
        returns(float4(vec![Expr::var(sum, Type::FLOAT)])),
    ];
    pixel_main(&mut program, vec![], body);

    let result = convert(program, &pixel_config());
    let errors: Vec<String> = result.diagnostics.errors().map(|d| d.to_string()).collect();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("Unable to unroll for statement"), "{:?}", errors);
    let text = result.to_text();
    assert!(text.contains("for ("), "{}", text);
    assert!(text.contains("uniform int count;"), "{}", text);
}

fn sample_program(with_load: bool) -> Program {
    let mut program = Program::new();
    let tex = global(&mut program, "tex", Type::Texture(TextureDim::Tex2D, None));
    let samp = global(&mut program, "samp", Type::Sampler(SamplerKind::State));
    let uv = param(&mut program, "uv", Type::float_vec(2), "TEXCOORD0");

    let tex_ty = Type::Texture(TextureDim::Tex2D, None);
    let sample = Expr::new(
        ExprKind::Method {
            object: Box::new(Expr::var(tex, tex_ty.clone())),
            method: "Sample".to_string(),
            args: vec![
                Expr::var(samp, Type::Sampler(SamplerKind::State)),
                Expr::var(uv, Type::float_vec(2)),
            ],
        },
        Some(Type::float_vec(4)),
    );
    let mut value = sample;
    if with_load {
        let coords = Expr::construct(Type::vector(ScalarKind::Int, 3), vec![Expr::int(0), Expr::int(0), Expr::int(0)]);
        let load = Expr::new(
            ExprKind::Method {
                object: Box::new(Expr::var(tex, tex_ty)),
                method: "Load".to_string(),
                args: vec![coords],
            },
            Some(Type::float_vec(4)),
        );
        value = Expr::binary(BinaryOp::Add, value, load, Some(Type::float_vec(4)));
    }
    pixel_main(&mut program, vec![uv], vec![returns(value)]);
    program
}

#[test]
fn test_separate_objects_collapse_to_combined_sampler() {
    let (_, text) = convert_ok(sample_program(false), &pixel_config());
    assert!(text.contains("uniform sampler2D tex_samp;"), "{}", text);
    assert!(text.contains("texture(tex_samp, v_uv)"), "{}", text);
    assert!(!text.contains("Texture2D"), "{}", text);
    assert!(!text.contains("SamplerState"), "{}", text);
}

#[test]
fn test_load_reuses_combined_sampler() {
    let (_, text) = convert_ok(sample_program(true), &pixel_config());
    assert!(text.contains("texelFetch(tex_samp, "), "{}", text);
    assert!(!text.contains("NoSampler"), "{}", text);
}

#[test]
fn test_vertex_position_flip_and_remap() {
    let mut program = Program::new();
    let pos = param(&mut program, "pos", Type::float_vec(4), "POSITION");
    vertex_main(&mut program, vec![pos], vec![returns(Expr::var(pos, Type::float_vec(4)))]);

    let (result, text) = convert_ok(program, &vertex_config());
    assert!(text.contains("in vec4 a_pos;"), "{}", text);
    assert!(text.contains("gl_Position = a_pos;"), "{}", text);
    assert!(text.contains("gl_Position.z = gl_Position.z * 2.0 - gl_Position.w;"), "{}", text);
    assert!(text.contains("gl_Position.y = -gl_Position.y;"), "{}", text);
    assert!(!text.contains("vec4 gl_Position"), "{}", text);

    let position = result.layout.input("POSITION0").expect("position input");
    assert_eq!(position.name, "a_pos");
    assert_eq!(result.layout.attributes.get(&0).map(String::as_str), Some("a_pos"));
}

#[test]
fn test_vertex_no_flip() {
    let mut program = Program::new();
    let pos = param(&mut program, "pos", Type::float_vec(4), "POSITION");
    vertex_main(&mut program, vec![pos], vec![returns(Expr::var(pos, Type::float_vec(4)))]);

    let mut config = vertex_config();
    config.flip_y = false;
    config.remap_depth = false;
    let (_, text) = convert_ok(program, &config);
    assert!(text.contains("gl_Position = a_pos;"), "{}", text);
    assert!(!text.contains("gl_Position.y"), "{}", text);
    assert!(!text.contains("gl_Position.z"), "{}", text);
}

#[test]
fn test_es2_uses_attribute_qualifier() {
    let mut program = Program::new();
    let pos = param(&mut program, "pos", Type::float_vec(4), "POSITION");
    vertex_main(&mut program, vec![pos], vec![returns(Expr::var(pos, Type::float_vec(4)))]);

    let config = Configuration::new(TargetProfile::GlslEs, 100, PipelineStage::Vertex).with_entry_point("VS_Main");
    let (_, text) = convert_ok(program, &config);
    assert!(text.contains("attribute vec4 a_pos;"), "{}", text);
    assert!(!text.contains("in vec4 a_pos;"), "{}", text);
}

#[test]
fn test_constant_buffer_becomes_uniform_block() {
    let mut program = Program::new();
    let tint = program.add_var(Variable::new("tint", Type::float_vec(4)));
    let cb = program.add_cbuffer(ConstantBuffer {
        name: "PerFrame".to_string(),
        kind: BufferKind::CBuffer,
        members: vec![tint],
        register: Some("b1".to_string()),
        binding: None,
        std140: false,
        span: SourceSpan::default(),
    });
    program.decls.push(Decl::ConstantBuffer(cb));
    pixel_main(&mut program, vec![], vec![returns(Expr::var(tint, Type::float_vec(4)))]);

    let (result, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("layout(std140, binding = 2) uniform PerFrame {"), "{}", text);
    assert!(text.contains("vec4 tint;"), "{}", text);
    assert_eq!(result.layout.constant_buffers, vec![("PerFrame".to_string(), 2)]);
}

#[test]
fn test_missing_entry_point() {
    let mut program = Program::new();
    pixel_main(&mut program, vec![], vec![returns(float4(vec![Expr::float(0.0)]))]);

    let config = pixel_config().with_entry_point("Other");
    let result = convert(program, &config);
    assert!(!result.succeeded());
    assert_eq!(result.entry_point, None);
    let errors: Vec<String> = result.diagnostics.errors().map(|d| d.message.clone()).collect();
    assert_eq!(errors, vec!["Entry point 'Other' not found".to_string()]);
}

fn error_messages(program: Program, config: &Configuration) -> Vec<String> {
    let result = convert(program, config);
    result.diagnostics.errors().map(|d| d.to_string()).collect()
}

fn local(program: &mut Program, name: &str, ty: Type, init: Option<Expr>) -> hlsl2glsl::ast::VarId {
    let mut var = Variable::new(name, ty);
    var.initializer = init;
    program.add_var(var)
}

fn method(object: Expr, name: &str, args: Vec<Expr>, ty: Type) -> Expr {
    Expr::new(
        ExprKind::Method {
            object: Box::new(object),
            method: name.to_string(),
            args,
        },
        Some(ty),
    )
}

fn call_function(f: hlsl2glsl::ast::FuncId, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Callee::Function(f),
            args,
        },
        Some(Type::Void),
    )
}

#[test]
fn test_struct_entry_inputs_and_outputs() {
    let mut program = Program::new();
    let ps_in = program.push_struct(
        "PSIn",
        vec![
            Variable::new("color", Type::float_vec(4)).with_semantic("COLOR0"),
            Variable::new("uv", Type::float_vec(2)).with_semantic("TEXCOORD0"),
        ],
    );
    let ps_out = program.push_struct(
        "PSOut",
        vec![
            Variable::new("target", Type::float_vec(4)).with_semantic("SV_Target0"),
            Variable::new("depth", Type::FLOAT).with_semantic("SV_Depth"),
        ],
    );
    let in_fields = program.struct_type(ps_in).fields.clone();
    let out_fields = program.struct_type(ps_out).fields.clone();
    let pin = program.add_var(Variable::new("pin", Type::Struct(ps_in)));
    let o = local(&mut program, "o", Type::Struct(ps_out), None);

    let out_var = Expr::var(o, Type::Struct(ps_out));
    let body = vec![
        Stmt::decl(o),
        Stmt::assign(
            out_var.clone().field(out_fields[0], Type::float_vec(4)),
            Expr::var(pin, Type::Struct(ps_in)).field(in_fields[0], Type::float_vec(4)),
        ),
        Stmt::assign(out_var.clone().field(out_fields[1], Type::FLOAT), Expr::float(0.5)),
        returns(out_var),
    ];
    let mut func = Function::new("PS_Main", Type::Struct(ps_out));
    func.params = vec![pin];
    func.body = Some(body);
    program.push_function(func);

    let (result, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("PSIn pin;"), "{}", text);
    assert!(text.contains("pin.color = v_color;"), "{}", text);
    assert!(text.contains("pin.uv = v_uv;"), "{}", text);
    assert!(text.contains("o.target = pin.color;"), "{}", text);
    assert!(text.contains("layout(location = 0) out vec4 out_gl_fragdata_target;"), "{}", text);
    assert!(text.contains("out_gl_fragdata_target = o.target;"), "{}", text);
    assert!(text.contains("gl_FragDepth = o.depth;"), "{}", text);
    assert!(result.layout.input("COLOR0").is_some());
    assert!(result.layout.input("TEXCOORD0").is_some());
}

#[test]
fn test_matrix_access_and_mul_in_row_layout() {
    let mut program = Program::new();
    let mat4 = Type::Matrix(ScalarKind::Float, 4, 4);
    let world = global(&mut program, "world", mat4.clone());
    let pos = param(&mut program, "pos", Type::float_vec(4), "POSITION");
    let world_expr = || Expr::var(world, mat4.clone());

    let element = local(
        &mut program,
        "element",
        Type::FLOAT,
        Some(
            world_expr()
                .index(Expr::int(1), Some(Type::float_vec(4)))
                .index(Expr::int(2), Some(Type::FLOAT)),
        ),
    );
    let picked = local(
        &mut program,
        "picked",
        Type::float_vec(2),
        Some(world_expr().swizzle("_m01_m10", Type::float_vec(2))),
    );
    let row = local(
        &mut program,
        "row",
        Type::float_vec(4),
        Some(world_expr().index(Expr::int(3), Some(Type::float_vec(4)))),
    );
    let transformed = Expr::call(
        "mul",
        vec![Expr::var(pos, Type::float_vec(4)), world_expr()],
        Some(Type::float_vec(4)),
    );
    let body = vec![Stmt::decl(element), Stmt::decl(picked), Stmt::decl(row), returns(transformed)];
    vertex_main(&mut program, vec![pos], body);

    let (_, text) = convert_ok(program, &vertex_config());
    assert!(text.contains("uniform mat4 world;"), "{}", text);
    assert!(text.contains("float element = world[2][1];"), "{}", text);
    assert!(text.contains("vec2 picked = vec2(world[1][0], world[0][1]);"), "{}", text);
    assert!(
        text.contains("vec4 row = vec4(world[0][3], world[1][3], world[2][3], world[3][3]);"),
        "{}",
        text
    );
    assert!(text.contains("gl_Position = (a_pos * world);"), "{}", text);
}

#[test]
fn test_matrix_constructor_product_and_row_writes() {
    let mut program = Program::new();
    let mat2 = Type::Matrix(ScalarKind::Float, 2, 2);
    let float2 = Type::float_vec(2);
    let m = local(
        &mut program,
        "m",
        mat2.clone(),
        Some(Expr::construct(
            mat2.clone(),
            vec![Expr::float(1.0), Expr::float(2.0), Expr::float(3.0), Expr::float(4.0)],
        )),
    );
    let m2 = local(
        &mut program,
        "m2",
        mat2.clone(),
        Some(Expr::binary(
            BinaryOp::Mul,
            Expr::var(m, mat2.clone()),
            Expr::var(m, mat2.clone()),
            Some(mat2.clone()),
        )),
    );
    let body = vec![
        Stmt::decl(m),
        Stmt::decl(m2),
        Stmt::expr(Expr::assign(
            Expr::var(m, mat2).index(Expr::int(1), Some(float2.clone())),
            Expr::construct(float2, vec![Expr::float(3.0), Expr::float(4.0)]),
        )),
        returns(float4(vec![Expr::float(0.0)])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("mat2 m = mat2(1.0, 3.0, 2.0, 4.0);"), "{}", text);
    assert!(text.contains("mat2 m2 = matrixCompMult(m, m);"), "{}", text);
    assert!(text.contains("vec2 _localmat_ = vec2(3.0, 4.0);"), "{}", text);
    assert!(text.contains("m[0][1] = _localmat_[0];"), "{}", text);
    assert!(text.contains("m[1][1] = _localmat_[1];"), "{}", text);
}

#[test]
fn test_row_write_reads_index_once() {
    let mut program = Program::new();
    let mat2 = Type::Matrix(ScalarKind::Float, 2, 2);
    let float2 = Type::float_vec(2);
    let m = local(&mut program, "m", mat2.clone(), None);
    let k = local(&mut program, "k", Type::INT, Some(Expr::int(0)));
    let body = vec![
        Stmt::decl(m),
        Stmt::decl(k),
        Stmt::expr(Expr::assign(
            Expr::var(m, mat2).index(Expr::unary(UnaryOp::PostInc, Expr::var(k, Type::INT)), Some(float2.clone())),
            Expr::construct(float2, vec![Expr::float(5.0), Expr::float(6.0)]),
        )),
        returns(float4(vec![Expr::float(0.0)])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert_eq!(text.matches("k++").count(), 1, "{}", text);
    assert!(text.contains("int _localidx_ = k++;"), "{}", text);
    assert!(text.contains("m[0][_localidx_] = _localmat_[0];"), "{}", text);
    assert!(text.contains("m[1][_localidx_] = _localmat_[1];"), "{}", text);
}

#[test]
fn test_vector_select_compare_and_float_mod() {
    let mut program = Program::new();
    let float4_ty = Type::float_vec(4);
    let color = param(&mut program, "color", float4_ty.clone(), "COLOR0");
    let color_expr = || Expr::var(color, Type::float_vec(4));

    let select = Expr::new(
        ExprKind::Conditional {
            cond: Box::new(color_expr()),
            then: Box::new(color_expr()),
            otherwise: Box::new(float4(vec![Expr::float(0.0)])),
        },
        Some(float4_ty.clone()),
    );
    let picked = local(&mut program, "picked", float4_ty.clone(), Some(select));
    let bool4 = Type::Vector(ScalarKind::Bool, 4);
    let less = local(
        &mut program,
        "less",
        bool4.clone(),
        Some(Expr::binary(BinaryOp::Less, color_expr(), Expr::var(picked, float4_ty.clone()), Some(bool4.clone()))),
    );
    let same = local(
        &mut program,
        "same",
        bool4.clone(),
        Some(Expr::binary(BinaryOp::Equal, color_expr(), Expr::var(picked, float4_ty.clone()), Some(bool4))),
    );
    let wrapped = local(
        &mut program,
        "wrapped",
        Type::FLOAT,
        Some(Expr::binary(
            BinaryOp::Mod,
            color_expr().swizzle("x", Type::FLOAT),
            Expr::float(2.0),
            Some(Type::FLOAT),
        )),
    );
    let body = vec![
        Stmt::decl(picked),
        Stmt::decl(less),
        Stmt::decl(same),
        Stmt::decl(wrapped),
        returns(Expr::var(picked, float4_ty)),
    ];
    pixel_main(&mut program, vec![color], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(
        text.contains("vec4 picked = mix(v_color, vec4(0.0), equal(v_color, vec4(0.0)));"),
        "{}",
        text
    );
    assert!(text.contains("bvec4 less = lessThan(v_color, picked);"), "{}", text);
    assert!(text.contains("bvec4 same = equal(v_color, picked);"), "{}", text);
    assert!(text.contains("float wrapped = mod(v_color.x, 2.0);"), "{}", text);
    assert!(!text.contains(" % "), "{}", text);
}

fn unroll_with_jump(jump: StmtKind) -> String {
    let mut program = Program::new();
    let sum = local(&mut program, "sum", Type::FLOAT, Some(Expr::float(0.0)));
    let i = local(&mut program, "i", Type::INT, Some(Expr::int(0)));
    let at_one = Expr::binary(BinaryOp::Equal, Expr::var(i, Type::INT), Expr::int(1), Some(Type::BOOL));
    let body = vec![
        Stmt::decl(sum),
        for_loop(
            i,
            Expr::int(3),
            vec![
                Stmt::if_then(at_one, Stmt::new(jump)),
                add_assign(Expr::var(sum, Type::FLOAT), Expr::float(1.0)),
            ],
        ),
        returns(float4(vec![Expr::var(sum, Type::FLOAT)])),
    ];
    pixel_main(&mut program, vec![], body);
    convert_ok(program, &pixel_config()).1
}

#[test]
fn test_unroll_lowers_break_to_flag() {
    let text = unroll_with_jump(StmtKind::Break);
    assert!(text.contains("bool isBreak"), "{}", text);
    assert_eq!(text.matches(" = true;").count(), 3, "{}", text);
    assert!(text.contains("if (!isBreak"), "{}", text);
    assert_eq!(text.matches("sum += 1.0;").count(), 3, "{}", text);
    assert!(!text.contains("break;"), "{}", text);
    assert!(!text.contains("for ("), "{}", text);
}

#[test]
fn test_unroll_lowers_continue_to_flag() {
    let text = unroll_with_jump(StmtKind::Continue);
    assert!(text.contains("bool isContinue"), "{}", text);
    // The declaration and a reset at the top of each copy
    assert_eq!(text.matches(" = false;").count(), 4, "{}", text);
    assert!(text.contains("if (!isContinue"), "{}", text);
    assert!(!text.contains("continue;"), "{}", text);
    assert!(!text.contains("for ("), "{}", text);
}

#[test]
fn test_structural_intrinsics() {
    let mut program = Program::new();
    let float4_ty = Type::float_vec(4);
    let color = param(&mut program, "color", float4_ty.clone(), "COLOR0");
    let color_expr = || Expr::var(color, Type::float_vec(4));
    let component = |c: &str| Expr::var(color, Type::float_vec(4)).swizzle(c, Type::FLOAT);

    let s = local(&mut program, "s", Type::FLOAT, None);
    let c = local(&mut program, "c", Type::FLOAT, None);
    let lit = local(
        &mut program,
        "lighting",
        float4_ty.clone(),
        Some(Expr::call("lit", vec![component("x"), component("y"), component("z")], Some(float4_ty.clone()))),
    );
    let clamped = local(
        &mut program,
        "clamped",
        Type::FLOAT,
        Some(Expr::call("saturate", vec![component("w")], Some(Type::FLOAT))),
    );
    let every = local(
        &mut program,
        "every",
        Type::BOOL,
        Some(Expr::call("all", vec![color_expr()], Some(Type::BOOL))),
    );
    let some = local(
        &mut program,
        "some",
        Type::BOOL,
        Some(Expr::call("any", vec![color_expr()], Some(Type::BOOL))),
    );
    let body = vec![
        Stmt::decl(s),
        Stmt::decl(c),
        Stmt::expr(Expr::call(
            "sincos",
            vec![component("x"), Expr::var(s, Type::FLOAT), Expr::var(c, Type::FLOAT)],
            Some(Type::Void),
        )),
        Stmt::decl(lit),
        Stmt::decl(clamped),
        Stmt::decl(every),
        Stmt::decl(some),
        returns(Expr::var(lit, float4_ty)),
    ];
    pixel_main(&mut program, vec![color], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("s = sin(v_color.x);"), "{}", text);
    assert!(text.contains("c = cos(v_color.x);"), "{}", text);
    assert!(text.contains("v_color.x < 0.0 ? 0.0 : v_color.x"), "{}", text);
    assert!(text.contains("pow(v_color.y, v_color.z)"), "{}", text);
    assert!(text.contains("float clamped = clamp(v_color.w, 0.0, 1.0);"), "{}", text);
    assert!(text.contains("bool every = all(notEqual(v_color, vec4(0.0)));"), "{}", text);
    assert!(text.contains("bool some = any(notEqual(v_color, vec4(0.0)));"), "{}", text);
    assert!(!text.contains("sincos"), "{}", text);
    assert!(!text.contains("saturate"), "{}", text);
    assert!(!text.contains("lit("), "{}", text);
}

#[test]
fn test_sincos_into_entry_parameter_copies_input() {
    let mut program = Program::new();
    let x = param(&mut program, "x", Type::FLOAT, "TEXCOORD0");
    let c = local(&mut program, "c", Type::FLOAT, None);
    let body = vec![
        Stmt::decl(c),
        Stmt::expr(Expr::call(
            "sincos",
            vec![Expr::float(1.0), Expr::var(x, Type::FLOAT), Expr::var(c, Type::FLOAT)],
            Some(Type::Void),
        )),
        returns(float4(vec![
            Expr::var(x, Type::FLOAT),
            Expr::var(c, Type::FLOAT),
            Expr::float(0.0),
            Expr::float(1.0),
        ])),
    ];
    pixel_main(&mut program, vec![x], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("in float v_x;"), "{}", text);
    assert!(text.contains("float local_x = v_x;"), "{}", text);
    assert!(text.contains("local_x = sin(1.0);"), "{}", text);
    assert!(text.contains("c = cos(1.0);"), "{}", text);
    assert!(!text.contains("v_x = "), "{}", text);
}

#[test]
fn test_global_written_through_out_parameter_is_not_uniform() {
    let mut program = Program::new();
    let scale = global(&mut program, "scale", Type::FLOAT);
    let v = program.add_var(Variable::new("v", Type::FLOAT).with_qualifiers(Qualifiers::OUT));
    let mut set_one = Function::new("setOne", Type::Void);
    set_one.params = vec![v];
    set_one.body = Some(vec![Stmt::assign(Expr::var(v, Type::FLOAT), Expr::float(1.0))]);
    let set_one = program.push_function(set_one);

    let body = vec![
        Stmt::expr(call_function(set_one, vec![Expr::var(scale, Type::FLOAT)])),
        returns(float4(vec![Expr::var(scale, Type::FLOAT)])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("setOne(scale);"), "{}", text);
    assert!(text.contains("float scale;"), "{}", text);
    assert!(!text.contains("uniform float scale;"), "{}", text);
}

#[test]
fn test_loop_counter_written_through_inout_is_not_unrolled() {
    let mut program = Program::new();
    let v = program.add_var(Variable::new("v", Type::INT).with_qualifiers(Qualifiers::INOUT));
    let mut bump = Function::new("bump", Type::Void);
    bump.params = vec![v];
    bump.body = Some(vec![Stmt::expr(Expr::unary(UnaryOp::PostInc, Expr::var(v, Type::INT)))]);
    let bump = program.push_function(bump);

    let i = local(&mut program, "i", Type::INT, Some(Expr::int(0)));
    let body = vec![
        for_loop(
            i,
            Expr::int(4),
            vec![Stmt::expr(call_function(bump, vec![Expr::var(i, Type::INT)]))],
        ),
        returns(float4(vec![Expr::float(0.0)])),
    ];
    pixel_main(&mut program, vec![], body);

    let errors = error_messages(program, &pixel_config());
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("Unable to unroll for statement"), "{:?}", errors);
}

fn geometry_program() -> Program {
    let mut program = Program::new();
    let float4_ty = Type::float_vec(4);
    let vertex = program.push_struct(
        "VSOut",
        vec![
            Variable::new("pos", float4_ty.clone()).with_semantic("SV_Position"),
            Variable::new("color", float4_ty).with_semantic("COLOR0"),
        ],
    );
    let vertex_ty = Type::Struct(vertex);
    let mut verts = Variable::new("verts", Type::array(vertex_ty.clone(), 3));
    verts.primitive = Some(GeometryPrimitive::Triangle);
    let verts = program.add_var(verts);
    let stream_ty = Type::Stream(StreamKind::Triangle, Box::new(vertex_ty.clone()));
    let stream = program.add_var(Variable::new("stream", stream_ty.clone()).with_qualifiers(Qualifiers::INOUT));

    let first = Expr::var(verts, Type::array(vertex_ty.clone(), 3)).index(Expr::int(0), Some(vertex_ty));
    let body = vec![
        Stmt::expr(method(Expr::var(stream, stream_ty.clone()), "Append", vec![first], Type::Void)),
        Stmt::expr(method(Expr::var(stream, stream_ty), "RestartStrip", vec![], Type::Void)),
    ];
    let mut func = Function::new("GS_Main", Type::Void);
    func.params = vec![verts, stream];
    func.body = Some(body);
    func.attributes = vec![Attribute::with_args("maxvertexcount", vec![Expr::int(3)])];
    program.push_function(func);
    program
}

#[test]
fn test_geometry_stream_append_and_restart() {
    let config = Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Geometry).with_entry_point("GS_Main");
    let (_, text) = convert_ok(geometry_program(), &config);
    assert!(text.contains("layout(triangles) in;"), "{}", text);
    assert!(text.contains("layout(triangle_strip, max_vertices = 3) out;"), "{}", text);
    assert!(text.contains("verts[0].pos = gl_in[0].gl_Position;"), "{}", text);
    assert!(text.contains("verts[2].pos = gl_in[2].gl_Position;"), "{}", text);
    assert!(text.contains("gl_Position = verts[0].pos;"), "{}", text);
    assert_eq!(text.matches("EmitVertex();").count(), 1, "{}", text);
    assert_eq!(text.matches("EndPrimitive();").count(), 1, "{}", text);
    assert!(!text.contains("Append"), "{}", text);
    assert!(!text.contains("RestartStrip"), "{}", text);
}

#[test]
fn test_unreachable_declarations_are_stripped() {
    let mut program = Program::new();
    let tint = global(&mut program, "tint", Type::float_vec(4));
    global(&mut program, "unusedGlobal", Type::float_vec(4));
    let mut helper = Function::new("unusedHelper", Type::FLOAT);
    helper.body = Some(vec![returns(Expr::float(1.0))]);
    program.push_function(helper);
    pixel_main(&mut program, vec![], vec![returns(Expr::var(tint, Type::float_vec(4)))]);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("uniform vec4 tint;"), "{}", text);
    assert!(!text.contains("unusedGlobal"), "{}", text);
    assert!(!text.contains("unusedHelper"), "{}", text);
}

#[test]
fn test_constant_buffer_flattened_to_uniforms() {
    let mut program = Program::new();
    let tint = program.add_var(Variable::new("tint", Type::float_vec(4)));
    let cb = program.add_cbuffer(ConstantBuffer {
        name: "PerFrame".to_string(),
        kind: BufferKind::CBuffer,
        members: vec![tint],
        register: Some("b0".to_string()),
        binding: None,
        std140: false,
        span: SourceSpan::default(),
    });
    program.decls.push(Decl::ConstantBuffer(cb));
    pixel_main(&mut program, vec![], vec![returns(Expr::var(tint, Type::float_vec(4)))]);

    let mut config = pixel_config();
    config.keep_constant_buffers = false;
    let (result, text) = convert_ok(program, &config);
    assert!(text.contains("uniform vec4 tint;"), "{}", text);
    assert!(!text.contains("PerFrame"), "{}", text);
    assert!(result.layout.constant_buffers.is_empty());
}

#[test]
fn test_constant_buffer_without_b_register_has_no_binding() {
    let mut program = Program::new();
    let tint = program.add_var(Variable::new("tint", Type::float_vec(4)));
    let cb = program.add_cbuffer(ConstantBuffer {
        name: "PerDraw".to_string(),
        kind: BufferKind::CBuffer,
        members: vec![tint],
        register: Some("c0".to_string()),
        binding: None,
        std140: false,
        span: SourceSpan::default(),
    });
    program.decls.push(Decl::ConstantBuffer(cb));
    pixel_main(&mut program, vec![], vec![returns(Expr::var(tint, Type::float_vec(4)))]);

    let (result, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("uniform PerDraw {"), "{}", text);
    assert!(!text.contains("binding"), "{}", text);
    assert!(result.layout.constant_buffers.is_empty());
}

#[test]
fn test_separate_objects_build_sampler_at_use_site() {
    let mut config = pixel_config();
    config.sampler_mode = SamplerMode::SeparateCollapsed;
    let (_, text) = convert_ok(sample_program(false), &config);
    assert!(text.contains("uniform texture2D tex;"), "{}", text);
    assert!(text.contains("uniform sampler samp;"), "{}", text);
    assert!(text.contains("texture(sampler2D(tex, samp), v_uv)"), "{}", text);
    assert!(!text.contains("tex_samp"), "{}", text);
}

#[test]
fn test_multi_dimensional_array_is_flattened() {
    let mut program = Program::new();
    let row = global(&mut program, "row", Type::INT);
    let grid_ty = Type::Array(Box::new(Type::FLOAT), vec![Some(2), Some(3)]);
    let grid = local(&mut program, "grid", grid_ty.clone(), None);
    let cell = |first: Expr, second: Expr| {
        Expr::var(grid, grid_ty.clone())
            .index(first, Some(Type::array(Type::FLOAT, 3)))
            .index(second, Some(Type::FLOAT))
    };
    let body = vec![
        Stmt::decl(grid),
        Stmt::assign(cell(Expr::int(1), Expr::int(2)), Expr::float(5.0)),
        returns(float4(vec![cell(Expr::var(row, Type::INT), Expr::int(1))])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("float grid[6];"), "{}", text);
    assert!(text.contains("grid[5] = 5.0;"), "{}", text);
    assert!(text.contains("grid[row * 3 + 1]"), "{}", text);
    assert!(!text.contains("]["), "{}", text);
}

fn init_list(values: &[f64]) -> Expr {
    Expr::new(ExprKind::InitList(values.iter().map(|v| Expr::float(*v)).collect()), None)
}

#[test]
fn test_brace_initializer_regrouped_by_type() {
    let mut program = Program::new();
    let pair_ty = Type::array(Type::float_vec(4), 2);
    let pair = local(
        &mut program,
        "pair",
        pair_ty.clone(),
        Some(init_list(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])),
    );
    let second = Expr::var(pair, pair_ty).index(Expr::int(1), Some(Type::float_vec(4)));
    pixel_main(&mut program, vec![], vec![Stmt::decl(pair), returns(second)]);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("vec4 pair[2] = "), "{}", text);
    assert!(text.contains("(vec4(1.0, 2.0, 3.0, 4.0), vec4(5.0, 6.0, 7.0, 8.0))"), "{}", text);
}

#[test]
fn test_initializer_size_mismatch_names_the_shape() {
    let mut program = Program::new();
    let v = local(&mut program, "v", Type::float_vec(4), Some(init_list(&[1.0, 2.0])));
    let a = local(&mut program, "a", Type::array(Type::FLOAT, 2), Some(init_list(&[1.0, 2.0, 3.0])));
    let body = vec![Stmt::decl(v), Stmt::decl(a), returns(Expr::var(v, Type::float_vec(4)))];
    pixel_main(&mut program, vec![], body);

    let errors = error_messages(program, &pixel_config());
    assert_eq!(errors.len(), 2, "{:?}", errors);
    assert!(errors[0].contains("Initializer for v has 2 values, expected 4"), "{:?}", errors);
    assert!(!errors[0].contains("Array"), "{:?}", errors);
    assert!(errors[1].contains("Array initializer for a has 3 values, expected 2"), "{:?}", errors);
}

#[test]
fn test_get_dimensions_queries_texture_size() {
    let mut program = Program::new();
    let tex_ty = Type::Texture(TextureDim::Tex2D, None);
    let tex = global(&mut program, "tex", tex_ty.clone());
    let w = local(&mut program, "w", Type::FLOAT, None);
    let h = local(&mut program, "h", Type::FLOAT, None);
    let body = vec![
        Stmt::decl(w),
        Stmt::decl(h),
        Stmt::expr(method(
            Expr::var(tex, tex_ty),
            "GetDimensions",
            vec![Expr::var(w, Type::FLOAT), Expr::var(h, Type::FLOAT)],
            Type::Void,
        )),
        returns(float4(vec![Expr::var(w, Type::FLOAT), Expr::var(h, Type::FLOAT), Expr::float(0.0), Expr::float(1.0)])),
    ];
    pixel_main(&mut program, vec![], body);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("uniform sampler2D tex_NoSampler;"), "{}", text);
    assert!(text.contains("ivec2 tempTextureSize = textureSize(tex_NoSampler, 0);"), "{}", text);
    assert!(text.contains("w = float(tempTextureSize.x);"), "{}", text);
    assert!(text.contains("h = float(tempTextureSize.y);"), "{}", text);
    assert!(!text.contains("GetDimensions"), "{}", text);
}

#[test]
fn test_reported_names_are_escaped() {
    let mut program = Program::new();
    let input = program.push_global(Variable::new("input", Type::float_vec(4)).with_register("c0"));
    pixel_main(&mut program, vec![], vec![returns(Expr::var(input, Type::float_vec(4)))]);

    let mut config = pixel_config();
    config.explicit_bindings = true;
    let (result, text) = convert_ok(program, &config);
    assert!(text.contains("uniform vec4 _input;"), "{}", text);
    let names: Vec<&str> = result.layout.uniform_bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["_input"]);
}

#[test]
fn test_escaped_names_do_not_collide() {
    let mut program = Program::new();
    let input = global(&mut program, "input", Type::float_vec(4));
    let escaped = global(&mut program, "_input", Type::float_vec(4));
    let sum = Expr::binary(
        BinaryOp::Add,
        Expr::var(input, Type::float_vec(4)),
        Expr::var(escaped, Type::float_vec(4)),
        Some(Type::float_vec(4)),
    );
    pixel_main(&mut program, vec![], vec![returns(sum)]);

    let (_, text) = convert_ok(program, &pixel_config());
    assert!(text.contains("uniform vec4 _input1;"), "{}", text);
    assert!(text.contains("uniform vec4 _input;"), "{}", text);
    assert!(text.contains("out_gl_fragdata = _input1 + _input;"), "{}", text);
}

#[test]
fn test_load_without_texel_fetch_samples_lod() {
    let mut config = pixel_config();
    config.capabilities.remove(Capabilities::INTEGER_TEXEL_FETCH);
    let (_, text) = convert_ok(sample_program(true), &config);
    assert!(text.contains("textureLod(tex_samp, "), "{}", text);
    assert!(text.contains("textureSize(tex_samp, 0)"), "{}", text);
    assert!(!text.contains("texelFetch"), "{}", text);
}

#[test]
fn test_geometry_stream_without_capability_fails() {
    let mut config = Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Geometry).with_entry_point("GS_Main");
    config.capabilities.remove(Capabilities::GEOMETRY_STREAMS);
    let errors = error_messages(geometry_program(), &config);
    assert!(
        errors.iter().any(|e| e.contains("geometry output stream stream is not supported by the target profile")),
        "{:?}",
        errors
    );
}

#[test]
fn test_constant_buffer_without_uniform_blocks_is_flattened() {
    let mut program = Program::new();
    let tint = program.add_var(Variable::new("tint", Type::float_vec(4)));
    let cb = program.add_cbuffer(ConstantBuffer {
        name: "PerFrame".to_string(),
        kind: BufferKind::CBuffer,
        members: vec![tint],
        register: Some("b1".to_string()),
        binding: None,
        std140: false,
        span: SourceSpan::default(),
    });
    program.decls.push(Decl::ConstantBuffer(cb));
    pixel_main(&mut program, vec![], vec![returns(Expr::var(tint, Type::float_vec(4)))]);

    let mut config = pixel_config();
    config.capabilities.remove(Capabilities::UNIFORM_BLOCKS);
    let (_, text) = convert_ok(program, &config);
    assert!(text.contains("uniform vec4 tint;"), "{}", text);
    assert!(!text.contains("uniform PerFrame {"), "{}", text);
}
