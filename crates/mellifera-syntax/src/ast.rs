//! Abstract syntax tree for the Mellifera language.

use crate::token::{RegexpLiteral, SourceLocation};
use std::cell::RefCell;
use std::rc::Rc;

/// A complete program: an ordered sequence of statements.
#[derive(Debug, Clone)]
pub struct Program {
    pub location: Option<SourceLocation>,
    pub statements: Vec<Stmt>,
}

/// A brace-delimited block executed in a fresh lexical scope.
#[derive(Debug, Clone)]
pub struct Block {
    pub location: Option<SourceLocation>,
    pub statements: Vec<Stmt>,
}

/// An identifier with its source location.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub location: Option<SourceLocation>,
    pub name: String,
}

/// One `if`/`elif` arm: a condition and the block guarded by it.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub location: Option<SourceLocation>,
    pub condition: Expr,
    pub body: Block,
}

/// A statement with its source location.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub location: Option<SourceLocation>,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(location: Option<SourceLocation>, kind: StmtKind) -> Self {
        Self { location, kind }
    }
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `let name = expr;`
    Let {
        identifier: Identifier,
        expression: Expr,
    },
    /// `lvalue = expr;`
    Assignment { lhs: Expr, rhs: Expr },
    /// `if cond { ... } elif cond { ... } else { ... }`
    If {
        conditionals: Vec<Conditional>,
        else_block: Option<Block>,
    },
    /// `for k in collection { ... }` or `for k, v in collection { ... }`
    For {
        key: Identifier,
        value: Option<Identifier>,
        collection: Expr,
        block: Block,
    },
    /// `while cond { ... }`
    While { condition: Expr, block: Block },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `try { ... } catch [name] { ... }`
    Try {
        try_block: Block,
        catch_identifier: Option<Identifier>,
        catch_block: Block,
    },
    /// `error expr;`
    Error { expression: Expr },
    /// `return;` or `return expr;`
    Return { expression: Option<Expr> },
    /// `expr;`
    Expression { expression: Expr },
}

/// A function literal. Shared between the AST and function values, so that
/// evaluating the same literal twice produces functions that compare equal
/// by definition site.
#[derive(Debug)]
pub struct FunctionLiteral {
    pub location: Option<SourceLocation>,
    pub parameters: Vec<Identifier>,
    pub body: Block,
    /// Display name, filled in by the parser for `let`-bound and map-valued
    /// functions.
    pub name: RefCell<Option<Vec<u8>>>,
}

/// One piece of a template string: literal text or an interpolated expression.
#[derive(Debug, Clone)]
pub enum TemplatePart {
    Text(Vec<u8>),
    Expression(Expr),
}

/// An expression with its source location.
#[derive(Debug, Clone)]
pub struct Expr {
    pub location: Option<SourceLocation>,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(location: Option<SourceLocation>, kind: ExprKind) -> Self {
        Self { location, kind }
    }
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Name lookup.
    Identifier(String),
    /// Template string with interpolated expressions.
    Template(Vec<TemplatePart>),
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Number literal.
    Number(f64),
    /// String literal (decoded bytes).
    Str(Vec<u8>),
    /// Regexp literal.
    Regexp(Rc<RegexpLiteral>),
    /// `[a, b, c]`
    Vector(Vec<Expr>),
    /// `{k: v, ...}` / `Map{...}`
    Map(Vec<(Expr, Expr)>),
    /// `{a, b, c}` / `Set{...}`
    Set(Vec<Expr>),
    /// `function(params) { ... }`
    Function(Rc<FunctionLiteral>),
    /// `type expr`
    Type {
        name: Vec<u8>,
        expression: Box<Expr>,
    },
    /// `new meta expr`
    New {
        meta: Box<Expr>,
        expression: Box<Expr>,
    },
    /// `(expr)`
    Grouped(Box<Expr>),
    /// `+x`, `-x`, `not x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `lhs op rhs`
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `f(args...)`
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `store[field]`
    Index { store: Box<Expr>, field: Box<Expr> },
    /// `store.field`
    Dot {
        store: Box<Expr>,
        field: Identifier,
    },
    /// `store::field`
    Scope {
        store: Box<Expr>,
        field: Identifier,
    },
    /// `expr.&`
    Mkref(Box<Expr>),
    /// `expr.*`
    Deref(Box<Expr>),
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

impl UnaryOp {
    /// The operator as written in source, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Positive => "+",
            UnaryOp::Negative => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    EqRe,
    NeRe,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// The operator as written in source, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::EqRe => "=~",
            BinaryOp::NeRe => "!~",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}
