//! Conversion of a whole [Program] from HLSL to GLSL.
//!
//! [convert] runs the passes in order, threading one [ConvertContext] through all of them:
//!
//! 1. [samplers] pairs every sampled texture with its sampler and specialises functions
//!    that take textures or samplers as parameters
//! 2. [strip] removes declarations unreachable from the entry point
//! 3. [rewrite] converts the entry point into a parameterless `main` and rewrites every
//!    function body into GLSL constructs
//! 4. [finish] maps types, assigns qualifiers and bindings, escapes reserved names and
//!    orders the declarations
//!
//! Hard errors never stop a run. They are recorded in [ConvertResult::diagnostics] and the
//! offending statement or declaration is left as it was.
use std::collections::HashMap;

use crate::{
    ast::{
        display::program_to_string,
        expr::{Expr, ExprKind, Stmt, StmtKind},
        types::Type,
        visit::{declared_locals, walk_expr_mut, walk_stmt_exprs_mut, walk_stmts_mut},
        FuncId, Program, VarId, Variable,
    },
    config::Configuration,
    error::{ConvertError, Diagnostics, SourceSpan},
};

pub mod finish;
pub mod layout;
pub mod rewrite;
pub mod samplers;
pub mod strip;

use self::{
    layout::{BindingAllocator, LayoutReport, LocationBinder},
    samplers::SamplerTable,
};

/// Per-run state shared by every pass
pub struct ConvertContext<'a> {
    pub program: Program,
    pub config: &'a Configuration,
    pub diagnostics: Diagnostics,
    pub entry: FuncId,
    pub locations: LocationBinder,
    pub bindings: BindingAllocator,
    pub samplers: SamplerTable,
    pub report: LayoutReport,
    /// Original dimensions of multi-dimensional arrays flattened to one dimension
    pub flattened: HashMap<VarId, Vec<u32>>,
    next_id: u32,
}
impl<'a> ConvertContext<'a> {
    pub fn new(program: Program, config: &'a Configuration, entry: FuncId) -> Self {
        Self {
            program,
            config,
            diagnostics: Diagnostics::new(),
            entry,
            locations: LocationBinder::new(),
            bindings: BindingAllocator::new(),
            samplers: SamplerTable::default(),
            report: LayoutReport::default(),
            flattened: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn error(&mut self, error: ConvertError, span: SourceSpan) {
        self.diagnostics.error(error, span);
    }

    pub fn warning(&mut self, message: impl Into<String>, span: SourceSpan) {
        self.diagnostics.warning(message, span);
    }

    /// Counter for names that must be unique within the run, e.g. loop flags
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// A local variable, declared by the caller with [Stmt::decl].
    pub fn add_local(&mut self, name: &str, ty: Type, init: Option<Expr>) -> VarId {
        let mut var = Variable::new(name, ty);
        var.initializer = init;
        self.program.add_var(var)
    }

    /// Apply `f` to every expression of `stmts`, including initializers of the locals they declare.
    pub(crate) fn rewrite_exprs_in(
        &mut self,
        stmts: &mut [Stmt],
        f: &mut impl FnMut(&mut ConvertContext<'a>, &mut Expr),
    ) {
        walk_stmt_exprs_mut(stmts, &mut |e| f(self, e));
        for v in declared_locals(stmts) {
            if let Some(mut init) = self.program.var_mut(v).initializer.take() {
                walk_expr_mut(&mut init, &mut |e| f(self, e));
                self.program.var_mut(v).initializer = Some(init);
            }
        }
    }

    /// Give every local declared in `stmts` a fresh copy and redirect references to it.
    /// `map` may already hold replacements for outer variables, e.g. parameters.
    pub(crate) fn clone_locals(&mut self, stmts: &mut [Stmt], map: &mut HashMap<VarId, VarId>) {
        for v in declared_locals(stmts) {
            let copy = self.program.var(v).clone();
            let id = self.program.add_var(copy);
            map.insert(v, id);
        }
        walk_stmts_mut(stmts, &mut |s| {
            if let StmtKind::Decl(vars) = &mut s.kind {
                for v in vars.iter_mut() {
                    if let Some(new) = map.get(v) {
                        *v = *new;
                    }
                }
            }
        });
        self.rewrite_exprs_in(stmts, &mut |_, e| {
            if let ExprKind::Var(id) = &mut e.kind {
                if let Some(new) = map.get(id) {
                    *id = *new;
                }
            }
        });
    }

    /// Replace every reference to `var` in `stmts` with `with`.
    pub(crate) fn substitute_var(&mut self, stmts: &mut [Stmt], var: VarId, with: &Expr) {
        self.rewrite_exprs_in(stmts, &mut |_, e| {
            if e.as_var() == Some(var) && matches!(e.kind, ExprKind::Var(_)) {
                let span = e.span;
                *e = with.clone().at(span);
            }
        });
    }

    fn into_result(self) -> ConvertResult {
        ConvertResult {
            program: self.program,
            entry_point: Some(self.entry),
            layout: self.report,
            diagnostics: self.diagnostics,
        }
    }
}

/// Outcome of one [convert] run
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The rewritten program, in GLSL vocabulary when the run succeeded
    pub program: Program,
    /// The converted entry point, now named `main`
    pub entry_point: Option<FuncId>,
    pub layout: LayoutReport,
    pub diagnostics: Diagnostics,
}
impl ConvertResult {
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Debug rendering of the converted program
    pub fn to_text(&self) -> String {
        program_to_string(&self.program)
    }
}

/// Convert `program` for the stage and target described by `config`.
pub fn convert(program: Program, config: &Configuration) -> ConvertResult {
    let span = tracing::debug_span!("convert", entry = %config.entry_point, stage = ?config.stage);
    let _guard = span.enter();

    let entry = match program.find_function(&config.entry_point) {
        Some(entry) => entry,
        None => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.error(
                ConvertError::MissingEntryPoint(config.entry_point.clone()),
                SourceSpan::default(),
            );
            return ConvertResult {
                program,
                entry_point: None,
                layout: LayoutReport::default(),
                diagnostics,
            };
        }
    };

    let mut ctx = ConvertContext::new(program, config, entry);
    samplers::combine(&mut ctx);
    strip::strip_unreachable(&mut ctx);
    rewrite::run(&mut ctx);
    finish::run(&mut ctx);
    tracing::debug!(
        errors = ctx.diagnostics.errors().count(),
        warnings = ctx.diagnostics.warnings().count(),
        "conversion finished"
    );
    ctx.into_result()
}
