//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does four things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, Binding>` tracking
//!    declared / defined / used).
//! 2. Report static errors (redeclaration, forward‑read in initializer,
//!    misplaced `return` / `break` / `this` / `super`, self‑inheritance).
//! 3. Record, for *each* variable / `this` / `super` occurrence, how many
//!    scopes away its declaration lives.  Occurrences without an entry are
//!    globals.
//! 4. Warn about locals that are declared but never touched.
//!
//! The pass never stops at the first problem; everything it finds lands in
//! the [`Diagnostics`] sink.

use std::collections::HashMap;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Diagnostics, LoxError, LoxWarning};
use crate::token::Token;

use log::{debug, info};

/// Expression id → number of scope hops to the binding.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `return` / `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
    StaticMethod,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Debug)]
struct Binding {
    token: Token,
    initialized: bool,
    used: bool,
    /// `this` / `super`: never reported as unused.
    implicit: bool,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances into a [`Locals`] map owned by the caller.
pub struct Resolver<'r> {
    locals: &'r mut Locals,
    diagnostics: &'r mut Diagnostics,
    scopes: Vec<HashMap<String, Binding>>,
    current_function: FunctionType,
    current_class: ClassType,
    in_loop: bool,
    static_context: bool,
}

impl<'r> Resolver<'r> {
    pub fn new(locals: &'r mut Locals, diagnostics: &'r mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        Resolver {
            locals,
            diagnostics,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_loop: false,
            static_context: false,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        info!("Resolve pass finished: {} local(s) bound", self.locals.len());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Class(class) => self.resolve_class(class),

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body (recursion)
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                let enclosing = self.in_loop;
                self.in_loop = true;
                self.resolve_stmt(body);
                self.in_loop = enclosing;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Break { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Can't use 'break' outside of a loop.");
                }
            }
        }
    }

    fn resolve_class(&mut self, class: &ClassDecl) {
        debug!("Resolving class '{}'", class.name.lexeme);

        let enclosing_class = self.current_class;
        let enclosing_static = self.static_context;
        self.current_class = ClassType::Class;
        self.static_context = false;

        self.declare(&class.name);
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            if let Expr::Variable { name, .. } = superclass {
                if name.lexeme == class.name.lexeme {
                    self.error(name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.declare_implicit("super", &class.name);
        }

        self.begin_scope();
        self.declare_implicit("this", &class.name);

        for method in &class.methods {
            let kind = if method.display_name() == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        for getter in &class.getters {
            self.resolve_function(getter, FunctionType::Method);
        }

        for static_method in &class.static_methods {
            self.resolve_function(static_method, FunctionType::StaticMethod);
        }

        self.end_scope();

        if class.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        self.static_context = enclosing_static;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop = self.in_loop;
        let enclosing_static = self.static_context;

        self.current_function = kind;
        self.in_loop = false;
        if kind == FunctionType::StaticMethod {
            self.static_context = true;
        }

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.in_loop = enclosing_loop;
        self.static_context = enclosing_static;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .is_some_and(|binding| !binding.initialized);

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None || self.static_context {
                    self.error(keyword, "Can't use 'this' outside of an instance method.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassType::Subclass => {}
                }

                if self.static_context {
                    self.error(keyword, "Can't use 'super' in a static method.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::AnonymousFunction(decl) => {
                self.resolve_function(decl, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind `id` to the innermost scope declaring `name`, or leave it global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let depth = self.scopes.len();

        for (i, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(binding) = scope.get_mut(&name.lexeme) {
                binding.used = true;

                let distance = depth - 1 - i;
                debug!("Bound '{}' {} at distance {}", name.lexeme, id, distance);
                self.locals.insert(id, distance);
                return;
            }
        }

        debug!("'{}' {} left global", name.lexeme, id);
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<Binding> = scope
            .into_values()
            .filter(|b| !b.used && !b.implicit)
            .collect();

        unused.sort_by(|a, b| {
            (a.token.line, &a.token.lexeme).cmp(&(b.token.line, &b.token.lexeme))
        });

        for binding in unused {
            let message = format!("Local variable '{}' is never used.", binding.token.lexeme);
            self.diagnostics.warn(LoxWarning::new(&binding.token, message));
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // globals are not tracked
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(
            name.lexeme.clone(),
            Binding {
                token: name.clone(),
                initialized: false,
                used: false,
                implicit: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(binding) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            binding.initialized = true;
        }
    }

    fn declare_implicit(&mut self, name: &str, at: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Binding {
                    token: at.clone(),
                    initialized: true,
                    used: false,
                    implicit: true,
                },
            );
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.error(LoxError::resolve(token, message));
    }
}
