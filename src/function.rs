//! Callable values: user functions, natives and (in [`crate::class`]) classes.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{EnvId, Environments};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::{NativeFunction, Value};

use log::debug;

/// Anything a call expression can invoke.
///
/// Arity is checked by the interpreter before `call` runs.
pub trait Callable<W: Write> {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value>;
}

/// A script function together with the scope it closes over.
///
/// A bound method also carries its receiver.  The `this` scope is only
/// opened while the method runs, so binding costs no arena slot.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvId,
    this: Option<Value>,
    is_initializer: bool,
}

impl LoxFunction {
    /// Creating a function value pins its closure scope.
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: EnvId,
        is_initializer: bool,
        environments: &mut Environments,
    ) -> Self {
        environments.capture(closure);

        LoxFunction {
            declaration,
            closure,
            this: None,
            is_initializer,
        }
    }

    /// A copy of this function that runs with `this` bound to `this`.
    pub fn bind(&self, this: Value) -> LoxFunction {
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: self.closure,
            this: Some(this),
            is_initializer: self.is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.display_name()
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("closure", &self.closure)
            .field("bound", &self.this.is_some())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl<W: Write> Callable<W> for LoxFunction {
    fn arity(&self) -> usize {
        LoxFunction::arity(self)
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling <fn {}> with {} argument(s)", self.name(), arguments.len());

        let environments = interpreter.environments_mut();

        // Receiver scope sits between the closure and the parameters.
        let this_env = self.this.as_ref().map(|this| {
            let env = environments.push(self.closure);
            environments.define(env, "this", this.clone());
            env
        });

        let env = environments.push(this_env.unwrap_or(self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environments.define(env, &param.lexeme, argument);
        }

        let flow = interpreter.execute_block(&self.declaration.body, env);

        if let Some(this_env) = this_env {
            interpreter.environments_mut().release(this_env);
        }

        let flow = flow?;

        if self.is_initializer {
            return self
                .this
                .clone()
                .ok_or_else(|| LoxError::runtime(paren, "Undefined variable 'this'."));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }
}

impl<W: Write> Callable<W> for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}
