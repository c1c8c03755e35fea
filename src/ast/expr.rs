use crate::error::SourceSpan;

use super::{types::Type, FuncId, VarId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}
impl Literal {
    pub fn ty(&self) -> Type {
        use super::types::ScalarKind;
        match self {
            Literal::Bool(_) => Type::Scalar(ScalarKind::Bool),
            Literal::Int(_) => Type::Scalar(ScalarKind::Int),
            Literal::UInt(_) => Type::Scalar(ScalarKind::UInt),
            Literal::Float(_) => Type::Scalar(ScalarKind::Float),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}
impl UnaryOp {
    pub fn is_postfix(self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }
    pub fn writes_operand(self) -> bool {
        matches!(self, Self::PreInc | Self::PreDec | Self::PostInc | Self::PostDec)
    }
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::PreInc | Self::PostInc => "++",
            Self::PreDec | Self::PostDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}
impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    /// C operator precedence, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Mod => 10,
            Self::Add | Self::Sub => 9,
            Self::Shl | Self::Shr => 8,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual => 7,
            Self::Equal | Self::NotEqual => 6,
            Self::BitAnd => 5,
            Self::BitXor => 4,
            Self::BitOr => 3,
            Self::LogicalAnd => 2,
            Self::LogicalOr => 1,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    /// Component-wise GLSL function implementing a vector comparison
    pub fn vector_comparison(self) -> Option<&'static str> {
        match self {
            Self::Less => Some("lessThan"),
            Self::LessEqual => Some("lessThanEqual"),
            Self::Greater => Some("greaterThan"),
            Self::GreaterEqual => Some("greaterThanEqual"),
            Self::Equal => Some("equal"),
            Self::NotEqual => Some("notEqual"),
            _ => None,
        }
    }
}

/// Target of a call expression
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Function(FuncId),
    Intrinsic(String),
    Constructor(Type),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Var(VarId),
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    /// Object method call, e.g. `tex.Sample(s, uv)`
    Method {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// Access to a struct field, resolved by the front end
    Field {
        base: Box<Expr>,
        field: VarId,
    },
    /// Vector swizzle or matrix accessor, e.g. `.xyz` or `._m01_m02`
    Swizzle {
        base: Box<Expr>,
        components: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `target = value`, or a compound assignment when `op` is set
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        ty: Type,
        expr: Box<Expr>,
    },
    /// Brace initializer `{ a, b, ... }`
    InitList(Vec<Expr>),
    Paren(Box<Expr>),
}

/// An expression together with the type the front end inferred for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
    pub span: SourceSpan,
}
impl Expr {
    pub fn new(kind: ExprKind, ty: Option<Type>) -> Self {
        Self {
            kind,
            ty,
            span: SourceSpan::default(),
        }
    }
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
    pub fn typed(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn lit(literal: Literal) -> Self {
        let ty = literal.ty();
        Self::new(ExprKind::Literal(literal), Some(ty))
    }
    pub fn float(v: f64) -> Self {
        Self::lit(Literal::Float(v))
    }
    pub fn int(v: i64) -> Self {
        Self::lit(Literal::Int(v))
    }
    pub fn bool(v: bool) -> Self {
        Self::lit(Literal::Bool(v))
    }
    /// A zero literal matching the base kind of `ty`
    pub fn zero_of(ty: &Type) -> Self {
        use super::types::ScalarKind;
        match ty.scalar_kind() {
            Some(ScalarKind::Int) => Self::int(0),
            Some(ScalarKind::UInt) => Self::lit(Literal::UInt(0)),
            Some(ScalarKind::Bool) => Self::bool(false),
            _ => Self::float(0.0),
        }
    }

    pub fn var(id: VarId, ty: Type) -> Self {
        Self::new(ExprKind::Var(id), Some(ty))
    }
    pub fn call(name: &str, args: Vec<Expr>, ty: Option<Type>) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Callee::Intrinsic(name.to_string()),
                args,
            },
            ty,
        )
    }
    pub fn construct(ty: Type, args: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Callee::Constructor(ty.clone()),
                args,
            },
            Some(ty),
        )
    }
    pub fn field(self, field: VarId, ty: Type) -> Self {
        Self::new(
            ExprKind::Field {
                base: Box::new(self),
                field,
            },
            Some(ty),
        )
    }
    pub fn swizzle(self, components: &str, ty: Type) -> Self {
        Self::new(
            ExprKind::Swizzle {
                base: Box::new(self),
                components: components.to_string(),
            },
            Some(ty),
        )
    }
    pub fn index(self, index: Expr, ty: Option<Type>) -> Self {
        Self::new(
            ExprKind::Index {
                base: Box::new(self),
                index: Box::new(index),
            },
            ty,
        )
    }
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: Option<Type>) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = operand.ty.clone();
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }
    pub fn assign(target: Expr, value: Expr) -> Self {
        let ty = target.ty.clone();
        Self::new(
            ExprKind::Assign {
                op: None,
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
        )
    }
    pub fn paren(self) -> Self {
        let ty = self.ty.clone();
        let span = self.span;
        Self::new(ExprKind::Paren(Box::new(self)), ty).at(span)
    }

    pub fn as_var(&self) -> Option<VarId> {
        match &self.kind {
            ExprKind::Var(id) => Some(*id),
            ExprKind::Paren(inner) => inner.as_var(),
            _ => None,
        }
    }

    /// The variable at the root of an l-value chain (`a.b[2].xy` is rooted at `a`).
    pub fn root_var(&self) -> Option<VarId> {
        match &self.kind {
            ExprKind::Var(id) => Some(*id),
            ExprKind::Field { base, .. }
            | ExprKind::Swizzle { base, .. }
            | ExprKind::Index { base, .. } => base.root_var(),
            ExprKind::Paren(inner) => inner.root_var(),
            _ => None,
        }
    }

    pub fn intrinsic_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call {
                callee: Callee::Intrinsic(name),
                ..
            } => Some(name),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Binary { .. } | ExprKind::Conditional { .. } | ExprKind::Assign { .. }
        )
    }
}

/// An attribute such as `[unroll]` or `[maxvertexcount(3)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<Expr>,
}
impl Attribute {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: vec![],
        }
    }
    pub fn with_args(name: &str, args: Vec<Expr>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Expr(Expr),
    /// Local variable declaration, possibly grouped (`float a, b;`)
    Decl(Vec<VarId>),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        attributes: Vec<Attribute>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        attributes: Vec<Attribute>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}
impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            span: SourceSpan::default(),
        }
    }
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
    pub fn expr(e: Expr) -> Self {
        let span = e.span;
        Self::new(StmtKind::Expr(e)).at(span)
    }
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::expr(Expr::assign(target, value))
    }
    pub fn decl(var: VarId) -> Self {
        Self::new(StmtKind::Decl(vec![var]))
    }
    pub fn block(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(stmts))
    }
    pub fn if_then(cond: Expr, then: Stmt) -> Self {
        Self::new(StmtKind::If {
            cond,
            then: Box::new(then),
            otherwise: None,
        })
    }

    /// Collapse a rewritten statement list back into one statement.
    pub fn from_list(mut stmts: Vec<Stmt>, span: SourceSpan) -> Self {
        if stmts.len() == 1 {
            stmts.remove(0)
        } else if stmts.is_empty() {
            Self::new(StmtKind::Empty).at(span)
        } else {
            Self::block(stmts).at(span)
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return(_))
    }
}
