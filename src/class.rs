//! Classes and instances.
//!
//! A class value is itself an instance: its `meta` instance belongs to a
//! metaclass whose methods are the class's `class`‑prefixed static methods.
//! Property access on a class therefore goes through the same
//! fields → getters → methods protocol as access on an ordinary instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::error::Result;
use crate::function::{Callable, LoxFunction};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

use log::debug;

pub type MethodTable = HashMap<String, Rc<LoxFunction>>;

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: MethodTable,
    getters: MethodTable,
    /// `None` only for metaclasses.
    meta: Option<LoxInstance>,
}

impl LoxClass {
    /// A regular class, together with the metaclass holding `static_methods`.
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: MethodTable,
        getters: MethodTable,
        static_methods: MethodTable,
    ) -> Self {
        let name: String = name.into();

        let metaclass = Rc::new(LoxClass {
            name: format!("{} metaclass", name),
            superclass: None,
            methods: static_methods,
            getters: MethodTable::new(),
            meta: None,
        });

        debug!(
            "Creating class '{}' with {} method(s), {} getter(s)",
            name,
            methods.len(),
            getters.len()
        );

        LoxClass {
            name,
            superclass,
            methods,
            getters,
            meta: Some(LoxInstance::new(metaclass)),
        }
    }

    /// Own methods first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    pub fn find_getter(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.getters.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_getter(name))
        })
    }

    /// The instance that carries static methods and class‑level fields.
    pub fn meta(&self) -> Option<&LoxInstance> {
        self.meta.as_ref()
    }
}

impl<W: Write> Callable<W> for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Construct an instance and run `init` on it, if there is one.
    fn call(
        &self,
        interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let instance = Value::Instance(Rc::new(LoxInstance::new(Rc::clone(self))));

        if let Some(init) = self.find_method("init") {
            let bound = init.bind(instance.clone());
            bound.call(interpreter, paren, arguments)?;
        }

        Ok(instance)
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

// Fields may refer back to the instance, so only the class name is shown.
impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
