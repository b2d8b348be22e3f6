//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Both node families are closed sum types; every pass over the tree
//! (resolver, interpreter, [`AstPrinter`](crate::ast_printer::AstPrinter))
//! is an exhaustive `match`, so adding a variant is a compile error in every
//! pass that forgot about it.

use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// Stable identity of an expression node that takes part in name
/// resolution.  The resolver keys its distance map on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix operator, including the comma operator (`operator` is `,`).
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    This { id: ExprId, keyword: Token },

    Unary { operator: Token, right: Box<Expr> },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Variable { id: ExprId, name: Token },

    /// `fun (params) { body }` used as a value.
    AnonymousFunction(Rc<FunctionDecl>),
}

impl Expr {
    /// Best‑effort source line of the expression.
    pub fn line(&self) -> usize {
        match self {
            Expr::Assign { name, .. } => name.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Grouping(inner) => inner.line(),
            Expr::Literal(_) => 0,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Set { name, .. } => name.line,
            Expr::Super { keyword, .. } => keyword.line,
            Expr::This { keyword, .. } => keyword.line,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Ternary { condition, .. } => condition.line(),
            Expr::Variable { name, .. } => name.line,
            Expr::AnonymousFunction(decl) => decl.keyword.line,
        }
    }
}

/// A function, method, getter or anonymous function body.
///
/// Shared behind an `Rc` because every runtime function value created from
/// the declaration points back at it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// `None` for anonymous functions.
    pub name: Option<Token>,

    /// The token that introduced the function: its name, or `fun` when anonymous.
    pub keyword: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .map(|t| t.lexeme.as_str())
            .unwrap_or("anonymous")
    }
}

/// `class Name < Superclass { … }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,

    /// Always an [`Expr::Variable`] when present.
    pub superclass: Option<Expr>,

    pub methods: Vec<Rc<FunctionDecl>>,

    /// Parameterless members written without `()`.
    pub getters: Vec<Rc<FunctionDecl>>,

    /// Members prefixed with `class`.
    pub static_methods: Vec<Rc<FunctionDecl>>,
}

/// Every kind of *statement*.  A program is a `Vec<Stmt>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),

    Class(ClassDecl),

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    Break { keyword: Token },
}
