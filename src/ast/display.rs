//! Debug rendering of a [Program] as GLSL-flavoured text.
//!
//! This is not a conforming emitter. It prints whatever vocabulary the tree currently
//! holds (HLSL before conversion, GLSL after) and is used for diagnostics and tests.
use std::fmt::{Display, Formatter, Write};

use super::{
    expr::{Callee, Expr, ExprKind, Literal, Stmt, StmtKind},
    types::Type,
    Decl, Direction, FuncId, Location, Program, Qualifiers, VarId,
};

pub struct DWrap<T>(pub T);

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::UInt(u) => write!(f, "{}u", u),
            Literal::Float(v) => write!(f, "{:?}", v),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Index(i) => write!(f, "{}", i),
            Location::Named(n) => write!(f, "{}", n),
        }
    }
}

impl Display for DWrap<(&Program, &Type)> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (program, ty) = self.0;
        write!(f, "{}", program.type_name(ty))
    }
}

const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_UNARY: u8 = 13;
const PREC_POSTFIX: u8 = 14;
const PREC_PRIMARY: u8 = 15;

fn precedence(e: &Expr) -> u8 {
    match &e.kind {
        ExprKind::Assign { .. } => PREC_ASSIGN,
        ExprKind::Conditional { .. } => PREC_CONDITIONAL,
        ExprKind::Binary { op, .. } => op.precedence() + 2,
        ExprKind::Unary { op, .. } if op.is_postfix() => PREC_POSTFIX,
        ExprKind::Unary { .. } | ExprKind::Cast { .. } => PREC_UNARY,
        ExprKind::Literal(Literal::Int(i)) if *i < 0 => PREC_UNARY,
        ExprKind::Literal(Literal::Float(v)) if v.is_sign_negative() => PREC_UNARY,
        ExprKind::Index { .. }
        | ExprKind::Field { .. }
        | ExprKind::Swizzle { .. }
        | ExprKind::Call { .. }
        | ExprKind::Method { .. } => PREC_POSTFIX,
        _ => PREC_PRIMARY,
    }
}

struct ExprPrinter<'a> {
    program: &'a Program,
}
impl<'a> ExprPrinter<'a> {
    fn operand(&self, f: &mut Formatter<'_>, e: &Expr, min: u8) -> std::fmt::Result {
        if precedence(e) < min {
            write!(f, "(")?;
            self.expr(f, e)?;
            write!(f, ")")
        } else {
            self.expr(f, e)
        }
    }

    fn list(&self, f: &mut Formatter<'_>, items: &[Expr]) -> std::fmt::Result {
        for (i, a) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.operand(f, a, PREC_ASSIGN)?;
        }
        Ok(())
    }

    fn expr(&self, f: &mut Formatter<'_>, e: &Expr) -> std::fmt::Result {
        let p = self.program;
        match &e.kind {
            ExprKind::Literal(l) => write!(f, "{}", l),
            ExprKind::Var(id) => write!(f, "{}", p.var(*id).name),
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::Function(id) => write!(f, "{}", p.function(*id).name)?,
                    Callee::Intrinsic(name) => write!(f, "{}", name)?,
                    Callee::Constructor(ty) => {
                        write!(f, "{}", p.type_name(ty))?;
                        if let Type::Array(_, dims) = ty {
                            for d in dims {
                                match d {
                                    Some(n) => write!(f, "[{}]", n)?,
                                    None => write!(f, "[]")?,
                                }
                            }
                        }
                    }
                }
                write!(f, "(")?;
                self.list(f, args)?;
                write!(f, ")")
            }
            ExprKind::Method {
                object,
                method,
                args,
            } => {
                self.operand(f, object, PREC_POSTFIX)?;
                write!(f, ".{}(", method)?;
                self.list(f, args)?;
                write!(f, ")")
            }
            ExprKind::Field { base, field } => {
                self.operand(f, base, PREC_POSTFIX)?;
                write!(f, ".{}", p.var(*field).name)
            }
            ExprKind::Swizzle { base, components } => {
                self.operand(f, base, PREC_POSTFIX)?;
                write!(f, ".{}", components)
            }
            ExprKind::Index { base, index } => {
                self.operand(f, base, PREC_POSTFIX)?;
                write!(f, "[")?;
                self.expr(f, index)?;
                write!(f, "]")
            }
            ExprKind::Unary { op, operand } => {
                if op.is_postfix() {
                    self.operand(f, operand, PREC_POSTFIX)?;
                    write!(f, "{}", op.symbol())
                } else {
                    write!(f, "{}", op.symbol())?;
                    self.operand(f, operand, PREC_UNARY)
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = op.precedence() + 2;
                self.operand(f, lhs, prec)?;
                write!(f, " {} ", op.symbol())?;
                self.operand(f, rhs, prec + 1)
            }
            ExprKind::Assign { op, target, value } => {
                self.operand(f, target, PREC_UNARY)?;
                match op {
                    Some(op) => write!(f, " {}= ", op.symbol())?,
                    None => write!(f, " = ")?,
                }
                self.operand(f, value, PREC_ASSIGN)
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.operand(f, cond, PREC_CONDITIONAL + 1)?;
                write!(f, " ? ")?;
                self.operand(f, then, PREC_ASSIGN)?;
                write!(f, " : ")?;
                self.operand(f, otherwise, PREC_CONDITIONAL)
            }
            ExprKind::Cast { ty, expr } => {
                write!(f, "({})", p.type_name(ty))?;
                self.operand(f, expr, PREC_UNARY)
            }
            ExprKind::InitList(items) => {
                write!(f, "{{")?;
                self.list(f, items)?;
                write!(f, "}}")
            }
            ExprKind::Paren(inner) => {
                write!(f, "(")?;
                self.expr(f, inner)?;
                write!(f, ")")
            }
        }
    }
}

impl Display for DWrap<(&Program, &Expr)> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (program, e) = self.0;
        ExprPrinter { program }.expr(f, e)
    }
}

fn qualifier_words(q: Qualifiers) -> Vec<&'static str> {
    let mut words = vec![];
    if q.contains(Qualifiers::FLAT) {
        words.push("flat");
    }
    if q.contains(Qualifiers::NOPERSPECTIVE) {
        words.push("noperspective");
    }
    if q.contains(Qualifiers::CENTROID) {
        words.push("centroid");
    }
    if q.contains(Qualifiers::EXTERN) {
        words.push("extern");
    }
    if q.contains(Qualifiers::STATIC) {
        words.push("static");
    }
    if q.contains(Qualifiers::SHARED) {
        words.push("shared");
    }
    if q.contains(Qualifiers::GROUPSHARED) {
        words.push("groupshared");
    }
    if q.contains(Qualifiers::CONST) {
        words.push("const");
    }
    if q.contains(Qualifiers::UNIFORM) {
        words.push("uniform");
    }
    if q.contains(Qualifiers::ATTRIBUTE) {
        words.push("attribute");
    }
    if q.contains(Qualifiers::VARYING) {
        words.push("varying");
    }
    if q.contains(Qualifiers::INOUT) {
        words.push("inout");
    } else if q.contains(Qualifiers::IN) {
        words.push("in");
    } else if q.contains(Qualifiers::OUT) {
        words.push("out");
    }
    if q.contains(Qualifiers::ROW_MAJOR) {
        words.push("row_major");
    }
    if q.contains(Qualifiers::COLUMN_MAJOR) {
        words.push("column_major");
    }
    words
}

/// Declaration text of a variable, without the trailing `;`
pub fn variable_decl(program: &Program, id: VarId) -> String {
    let v = program.var(id);
    let mut out = String::new();
    let mut layout = vec![];
    if let Some(loc) = &v.layout.location {
        layout.push(format!("location = {}", loc));
    }
    if let Some(b) = v.layout.binding {
        layout.push(format!("binding = {}", b));
    }
    if !layout.is_empty() {
        let _ = write!(out, "layout({}) ", layout.join(", "));
    }
    for w in qualifier_words(v.qualifiers) {
        out.push_str(w);
        out.push(' ');
    }
    let _ = write!(out, "{} {}", program.type_name(&v.ty), v.name);
    if let Type::Array(_, dims) = program.resolve_type(&v.ty) {
        for d in dims {
            match d {
                Some(n) => {
                    let _ = write!(out, "[{}]", n);
                }
                None => out.push_str("[]"),
            }
        }
    }
    if let Some(sem) = &v.semantic {
        let _ = write!(out, " : {}", sem);
    }
    if let Some(reg) = &v.register {
        let _ = write!(out, " : register({})", reg);
    }
    if let Some(init) = &v.initializer {
        let _ = write!(out, " = {}", DWrap((program, init)));
    }
    out
}

struct StmtPrinter<'a> {
    program: &'a Program,
    out: String,
    indent: usize,
}
impl<'a> StmtPrinter<'a> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn e(&self, e: &Expr) -> String {
        DWrap((self.program, e)).to_string()
    }

    /// Inline form used for `for` initializers
    fn inline(&self, s: &Stmt) -> String {
        match &s.kind {
            StmtKind::Expr(e) => self.e(e),
            StmtKind::Decl(vars) => self.decl(vars),
            _ => String::new(),
        }
    }

    fn decl(&self, vars: &[VarId]) -> String {
        vars.iter()
            .map(|v| variable_decl(self.program, *v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn body(&mut self, header: String, s: &Stmt) {
        match &s.kind {
            StmtKind::Block(stmts) => {
                self.line(&format!("{} {{", header));
                self.indent += 1;
                for s in stmts {
                    self.stmt(s);
                }
                self.indent -= 1;
                self.line("}");
            }
            _ => {
                self.line(&header);
                self.indent += 1;
                self.stmt(s);
                self.indent -= 1;
            }
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Empty => self.line(";"),
            StmtKind::Expr(e) => {
                let t = format!("{};", self.e(e));
                self.line(&t)
            }
            StmtKind::Decl(vars) => {
                let t = format!("{};", self.decl(vars));
                self.line(&t)
            }
            StmtKind::Block(stmts) => {
                self.line("{");
                self.indent += 1;
                for s in stmts {
                    self.stmt(s);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let header = format!("if ({})", self.e(cond));
                self.body(header, then);
                if let Some(o) = otherwise {
                    self.body("else".to_string(), o);
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
                attributes,
            } => {
                for a in attributes {
                    self.line(&format!("[{}]", a.name));
                }
                let header = for_header(self.program, init.as_deref(), cond.as_ref(), step.as_ref());
                self.body(header, body);
            }
            StmtKind::While { cond, body, .. } => {
                let header = format!("while ({})", self.e(cond));
                self.body(header, body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.body("do".to_string(), body);
                let t = format!("while ({});", self.e(cond));
                self.line(&t);
            }
            StmtKind::Return(None) => self.line("return;"),
            StmtKind::Return(Some(e)) => {
                let t = format!("return {};", self.e(e));
                self.line(&t)
            }
            StmtKind::Break => self.line("break;"),
            StmtKind::Continue => self.line("continue;"),
            StmtKind::Discard => self.line("discard;"),
        }
    }
}

/// `for (init; cond; step)`
pub fn for_header(program: &Program, init: Option<&Stmt>, cond: Option<&Expr>, step: Option<&Expr>) -> String {
    let p = StmtPrinter {
        program,
        out: String::new(),
        indent: 0,
    };
    format!(
        "for ({}; {}; {})",
        init.map(|s| p.inline(s)).unwrap_or_default(),
        cond.map(|c| p.e(c)).unwrap_or_default(),
        step.map(|s| p.e(s)).unwrap_or_default()
    )
}

/// Render a statement list, one statement per line, indented by four spaces per level.
pub fn stmts_to_string(program: &Program, stmts: &[Stmt]) -> String {
    let mut p = StmtPrinter {
        program,
        out: String::new(),
        indent: 0,
    };
    for s in stmts {
        p.stmt(s);
    }
    p.out
}

pub fn function_to_string(program: &Program, id: FuncId) -> String {
    let func = program.function(id);
    let params = func
        .params
        .iter()
        .map(|p| variable_decl(program, *p))
        .collect::<Vec<_>>()
        .join(", ");
    let mut header = format!("{} {}({})", program.type_name(&func.return_type), func.name, params);
    if let Some(sem) = &func.return_semantic {
        let _ = write!(header, " : {}", sem);
    }
    match &func.body {
        None => format!("{};\n", header),
        Some(body) => {
            let mut p = StmtPrinter {
                program,
                out: String::new(),
                indent: 0,
            };
            p.body(header, &Stmt::block(body.clone()));
            p.out
        }
    }
}

pub fn program_to_string(program: &Program) -> String {
    let mut out = String::new();
    for d in &program.decls {
        match d {
            Decl::Function(id) => out.push_str(&function_to_string(program, *id)),
            Decl::Variables(vars) => {
                let vars: Vec<VarId> = vars.iter().copied().filter(|v| !program.var(*v).builtin).collect();
                if !vars.is_empty() {
                    let text = vars
                        .iter()
                        .map(|v| variable_decl(program, *v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let _ = writeln!(out, "{};", text);
                }
            }
            Decl::Struct(id) => {
                let s = program.struct_type(*id);
                let _ = writeln!(out, "struct {} {{", s.name);
                for field in &s.fields {
                    let _ = writeln!(out, "    {};", variable_decl(program, *field));
                }
                let _ = writeln!(out, "}};");
            }
            Decl::ConstantBuffer(id) => {
                let cb = program.cbuffer(*id);
                let mut layout = vec![];
                if cb.std140 {
                    layout.push("std140".to_string());
                }
                if let Some(b) = cb.binding {
                    layout.push(format!("binding = {}", b));
                }
                if !layout.is_empty() {
                    let _ = write!(out, "layout({}) ", layout.join(", "));
                }
                let _ = writeln!(out, "uniform {} {{", cb.name);
                for m in &cb.members {
                    let _ = writeln!(out, "    {};", variable_decl(program, *m));
                }
                let _ = writeln!(out, "}};");
            }
            Decl::TypeAlias(id) => {
                let a = program.alias(*id);
                let _ = writeln!(out, "typedef {} {};", program.type_name(&a.ty), a.name);
            }
            Decl::Layout(l) => {
                let entries = l
                    .entries
                    .iter()
                    .map(|(k, v)| match v {
                        Some(v) => format!("{} = {}", k, v),
                        None => k.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let dir = match l.direction {
                    Direction::In => "in",
                    Direction::Out => "out",
                };
                let _ = writeln!(out, "layout({}) {};", entries, dir);
            }
        }
    }
    out
}
