#![allow(dead_code)]

use hlsl2glsl::{
    ast::{
        expr::{Expr, Stmt, StmtKind},
        types::Type,
        FuncId, Function, Program, VarId, Variable,
    },
    config::{Configuration, PipelineStage, TargetProfile},
    convert, ConvertResult,
};

pub fn pixel_config() -> Configuration {
    Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Pixel).with_entry_point("PS_Main")
}

pub fn vertex_config() -> Configuration {
    Configuration::new(TargetProfile::Glsl, 330, PipelineStage::Vertex).with_entry_point("VS_Main")
}

/// Entry point parameter with a semantic
pub fn param(program: &mut Program, name: &str, ty: Type, semantic: &str) -> VarId {
    program.add_var(Variable::new(name, ty).with_semantic(semantic))
}

pub fn global(program: &mut Program, name: &str, ty: Type) -> VarId {
    program.push_global(Variable::new(name, ty))
}

/// `float4 PS_Main(params) : SV_Target { body }`
pub fn pixel_main(program: &mut Program, params: Vec<VarId>, body: Vec<Stmt>) -> FuncId {
    entry(program, "PS_Main", "SV_Target", params, body)
}

/// `float4 VS_Main(params) : SV_Position { body }`
pub fn vertex_main(program: &mut Program, params: Vec<VarId>, body: Vec<Stmt>) -> FuncId {
    entry(program, "VS_Main", "SV_Position", params, body)
}

fn entry(program: &mut Program, name: &str, semantic: &str, params: Vec<VarId>, body: Vec<Stmt>) -> FuncId {
    let mut func = Function::new(name, Type::float_vec(4));
    func.return_semantic = Some(semantic.to_string());
    func.params = params;
    func.body = Some(body);
    program.push_function(func)
}

pub fn returns(e: Expr) -> Stmt {
    Stmt::new(StmtKind::Return(Some(e)))
}

pub fn float4(args: Vec<Expr>) -> Expr {
    Expr::construct(Type::float_vec(4), args)
}

/// Convert and fail the test on any error, returning the debug text of the result.
pub fn convert_ok(program: Program, config: &Configuration) -> (ConvertResult, String) {
    let result = convert(program, config);
    let errors: Vec<String> = result.diagnostics.errors().map(|d| d.to_string()).collect();
    assert!(errors.is_empty(), "conversion failed: {:?}", errors);
    let text = result.to_text();
    (result, text)
}
