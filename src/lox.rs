//! Session driver: one persistent interpreter fed by whole files or REPL lines.
//!
//! Each input goes scan → parse → resolve → interpret.  Any lexical, syntax or
//! resolution error stops the input before evaluation; a runtime error stops
//! it part way.  Globals, the environment arena and resolved locals carry over
//! to the next input either way.

use std::io::Write;

use log::info;

use crate::config::Config;
use crate::error::{Diagnostics, LoxError, LoxWarning};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    StaticError,
    RuntimeError,
}

/// Everything one input produced besides program output.
#[derive(Debug, Default)]
pub struct RunReport {
    pub errors: Vec<LoxError>,
    pub warnings: Vec<LoxWarning>,
}

impl RunReport {
    fn from_diagnostics(diagnostics: Diagnostics) -> Self {
        let (errors, warnings) = diagnostics.into_parts();
        RunReport { errors, warnings }
    }

    pub fn status(&self) -> RunStatus {
        if self.errors.iter().any(LoxError::is_static) {
            RunStatus::StaticError
        } else if !self.errors.is_empty() {
            RunStatus::RuntimeError
        } else {
            RunStatus::Ok
        }
    }

    /// 0, 65 (static error), 70 (runtime error) or 74 (output failed).
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            RunStatus::Ok => 0,
            RunStatus::StaticError => 65,
            RunStatus::RuntimeError => self.errors.first().map_or(70, LoxError::exit_code),
        }
    }
}

pub struct Lox<W: Write> {
    interpreter: Interpreter<W>,
    /// First expression id not yet handed to any parser in this session.
    next_id: usize,
}

impl<W: Write> Lox<W> {
    pub fn new(out: W) -> Self {
        Self::with_config(out, Config::default())
    }

    pub fn with_config(out: W, config: Config) -> Self {
        Lox {
            interpreter: Interpreter::with_config(out, config),
            next_id: 0,
        }
    }

    /// Run a whole program.
    pub fn run(&mut self, source: &str) -> RunReport {
        self.run_source(source, false)
    }

    /// Run one REPL line; a bare expression is printed.
    pub fn run_line(&mut self, source: &str) -> RunReport {
        self.run_source(source, true)
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    fn run_source(&mut self, source: &str, repl: bool) -> RunReport {
        let mut diagnostics = Diagnostics::new();

        let (tokens, lex_errors) = scanner::scan(source);
        for e in lex_errors {
            diagnostics.error(e);
        }

        let mut parser = Parser::new(tokens).with_first_id(self.next_id);
        let statements = if repl {
            parser.parse_repl(&mut diagnostics)
        } else {
            parser.parse(&mut diagnostics)
        };
        self.next_id = parser.next_id();

        if diagnostics.had_error() {
            info!("Static errors found, skipping resolution");
            return RunReport::from_diagnostics(diagnostics);
        }

        let mut locals = Locals::new();
        Resolver::new(&mut locals, &mut diagnostics).resolve(&statements);

        if diagnostics.had_error() {
            info!("Resolution errors found, skipping execution");
            return RunReport::from_diagnostics(diagnostics);
        }

        self.interpreter.resolve(locals);

        if let Err(e) = self.interpreter.interpret(&statements) {
            diagnostics.error(e);
        }

        RunReport::from_diagnostics(diagnostics)
    }
}
