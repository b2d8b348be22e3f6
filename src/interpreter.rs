use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, LiteralValue, Stmt};
use crate::class::{LoxClass, MethodTable};
use crate::config::Config;
use crate::environment::{EnvId, Environments};
use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{NativeFunction, Value};

/// How a statement finished.  Errors travel separately in `Result::Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter<W: Write> {
    out: W,
    environments: Environments,
    current: EnvId,
    locals: Locals,
    config: Config,
    depth: usize,
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter writing program output to `out`.
    pub fn new(out: W) -> Self {
        Self::with_config(out, Config::default())
    }

    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn with_config(out: W, config: Config) -> Self {
        info!("Initializing Interpreter");

        let mut environments = Environments::new();
        let global = environments.global();

        debug!("Defining native function 'clock'");

        environments.define(
            global,
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 =
                        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;
                    debug!("Native function 'clock' returned: {}", timestamp);
                    Ok(Value::Number(timestamp))
                },
            })),
        );

        Self {
            out,
            environments,
            current: global,
            locals: Locals::new(),
            config,
            depth: 0,
        }
    }

    /// Adds resolver output for statements about to be interpreted.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Merging {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error aborts the rest of the list.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                info!("Runtime error caught: {}", e);
                self.current = self.environments.global();
                self.depth = 0;
                return Err(e);
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    pub(crate) fn environments_mut(&mut self) -> &mut Environments {
        &mut self.environments
    }

    /// Runs `statements` inside the already-populated scope `env`, then
    /// restores the previous scope and releases `env`, whatever happened.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], env: EnvId) -> Result<Flow> {
        debug!("Entering block with {} statements", statements.len());

        let previous = self.current;
        self.current = env;

        let mut result = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.current = previous;
        self.environments.release(env);

        debug!("Exited block");
        result
    }

    /// Executes a single statement.
    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Variable '{}' defined with value: {}", name.lexeme, value);
                self.environments.define(self.current, &name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = self.environments.push(self.current);
                self.execute_block(statements, env)
            }

            Stmt::Function(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), self.current, false, &mut self.environments);
                debug!("Function '{}' defined", function.name());
                self.environments.define(
                    self.current,
                    decl.display_name(),
                    Value::Function(Rc::new(function)),
                );
                Ok(Flow::Normal)
            }

            Stmt::Class(class) => {
                self.execute_class(class)?;
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Break { .. } => Ok(Flow::Break),
        }
    }

    fn execute_class(&mut self, class: &ClassDecl) -> Result<()> {
        debug!("Declaring class '{}'", class.name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match &class.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(superclass) => Some(superclass),
                _ => {
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => &class.name,
                    };
                    return Err(LoxError::runtime(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environments
            .define(self.current, &class.name.lexeme, Value::Nil);

        let enclosing = self.current;
        if let Some(superclass) = &superclass {
            self.current = self.environments.push(enclosing);
            self.environments.define(
                self.current,
                "super",
                Value::Class(Rc::clone(superclass)),
            );
        }

        let mut methods = MethodTable::new();
        for decl in &class.methods {
            let name = decl.display_name();
            let function = LoxFunction::new(
                Rc::clone(decl),
                self.current,
                name == "init",
                &mut self.environments,
            );
            methods.insert(name.to_string(), Rc::new(function));
        }

        let mut getters = MethodTable::new();
        for decl in &class.getters {
            let function =
                LoxFunction::new(Rc::clone(decl), self.current, false, &mut self.environments);
            getters.insert(decl.display_name().to_string(), Rc::new(function));
        }

        let mut static_methods = MethodTable::new();
        for decl in &class.static_methods {
            let function =
                LoxFunction::new(Rc::clone(decl), self.current, false, &mut self.environments);
            static_methods.insert(decl.display_name().to_string(), Rc::new(function));
        }

        let class_value = LoxClass::new(
            class.name.lexeme.as_str(),
            superclass,
            methods,
            getters,
            static_methods,
        );

        if self.current != enclosing {
            let super_env = self.current;
            self.current = enclosing;
            self.environments.release(super_env);
        }

        self.environments.define(
            self.current,
            &class.name.lexeme,
            Value::Class(Rc::new(class_value)),
        );

        Ok(())
    }

    /// Evaluates an expression and returns a Value.
    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    return Ok(left_val);
                }

                self.evaluate(right)
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => self.environments.assign_at(
                        self.current,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.environments.assign_global(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(undefined_variable(name));
                }

                debug!("Assigned value {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(callee_val, paren, arg_values)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                let target = match &object {
                    Value::Instance(instance) => Some(instance.as_ref()),
                    Value::Class(class) => class.meta(),
                    _ => None,
                };

                let Some(target) = target else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                target.set_field(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::AnonymousFunction(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), self.current, false, &mut self.environments);
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn evaluate_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value> {
        let right_val = self.evaluate(expr)?;

        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(op, "Operand must be a number.")),
            },
            _ => Ok(Value::Bool(!right_val.is_truthy())),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        debug!(
            "Binary '{}': left {}, right {}",
            op.lexeme, left_val, right_val
        );

        match op.token_type {
            TokenType::COMMA => Ok(right_val),

            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::from(format!("{}{}", left_val, right_val)))
                }
                _ => Err(LoxError::runtime(
                    op,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => {
                let (Value::Number(a), Value::Number(b)) = (left_val, right_val) else {
                    return Err(LoxError::runtime(op, "Operands must be numbers."));
                };

                match op.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH if b == 0.0 => {
                        Err(LoxError::runtime(op, "Division by zero."))
                    }
                    TokenType::SLASH => Ok(Value::Number(a / b)),
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    _ => Err(LoxError::runtime(op, "Invalid binary operator.")),
                }
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => self
                .environments
                .get_at(self.current, distance, &name.lexeme),
            None => self.environments.get_global(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }

    /// Fields, then getters (invoked), then methods (bound).
    fn get_property(&mut self, object: Value, name: &Token) -> Result<Value> {
        let instance = match &object {
            Value::Instance(instance) => Some(instance.as_ref()),
            Value::Class(class) => class.meta(),
            _ => None,
        };

        let Some(instance) = instance else {
            return Err(LoxError::runtime(name, "Only instances have properties."));
        };

        if let Some(value) = instance.field(&name.lexeme) {
            return Ok(value);
        }

        if let Some(getter) = instance.class().find_getter(&name.lexeme) {
            let bound = getter.bind(object.clone());
            return self.invoke(&bound, name, Vec::new());
        }

        if let Some(method) = instance.class().find_method(&name.lexeme) {
            let bound = method.bind(object.clone());
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// `super.method`: starts at the superclass captured when the enclosing
    /// class was declared, with `this` one scope further in.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(undefined_variable(keyword));
        };

        let superclass = match self.environments.get_at(self.current, distance, "super") {
            Some(Value::Class(superclass)) => superclass,
            _ => return Err(undefined_variable(keyword)),
        };

        let this = self
            .environments
            .get_at(self.current, distance.saturating_sub(1), "this")
            .ok_or_else(|| LoxError::runtime(keyword, "Undefined variable 'this'."))?;

        if let Some(found) = superclass.find_method(&method.lexeme) {
            let bound = found.bind(this);
            return Ok(Value::Function(Rc::new(bound)));
        }

        if let Some(getter) = superclass.find_getter(&method.lexeme) {
            let bound = getter.bind(this);
            return self.invoke(&bound, method, Vec::new());
        }

        Err(LoxError::runtime(
            method,
            format!("Undefined property '{}'.", method.lexeme),
        ))
    }

    /// Invokes a callable (native function, user function or class).
    fn invoke_callable(
        &mut self,
        callee_val: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        match callee_val {
            Value::NativeFunction(native) => self.invoke(native.as_ref(), paren, arguments),
            Value::Function(function) => self.invoke(function.as_ref(), paren, arguments),
            Value::Class(class) => self.invoke(&class, paren, arguments),
            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Arity and depth checks shared by every call.
    fn invoke(
        &mut self,
        callable: &dyn Callable<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.depth >= self.config.max_call_depth {
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.depth += 1;
        let result = callable.call(self, paren, arguments);
        self.depth -= 1;

        result
    }
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
