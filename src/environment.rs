//! Scope storage for the interpreter.
//!
//! Scopes live in one arena and point at their parent by index.  The global
//! scope is slot 0 and is never released.  Block and call scopes go back to
//! a free list when the interpreter leaves them, unless a function value
//! captured them, either directly or through a descendant scope.

use std::collections::HashMap;

use crate::value::Value;

use log::debug;

/// Index of a scope in [`Environments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, Value>,
    parent: Option<EnvId>,
    captured: bool,
}

#[derive(Debug)]
pub struct Environments {
    scopes: Vec<Scope>,
    free: Vec<EnvId>,
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

impl Environments {
    const GLOBAL: EnvId = EnvId(0);

    pub fn new() -> Self {
        Environments {
            scopes: vec![Scope {
                captured: true,
                ..Scope::default()
            }],
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn global(&self) -> EnvId {
        Self::GLOBAL
    }

    /// Open a new empty scope whose parent is `parent`.
    pub fn push(&mut self, parent: EnvId) -> EnvId {
        if let Some(id) = self.free.pop() {
            let scope = &mut self.scopes[id.0];
            scope.parent = Some(parent);
            scope.captured = false;
            return id;
        }

        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });

        EnvId(self.scopes.len() - 1)
    }

    /// Hand `id` back to the free list unless something captured it.
    pub fn release(&mut self, id: EnvId) {
        let scope = &mut self.scopes[id.0];

        if scope.captured {
            return;
        }

        scope.values.clear();
        scope.parent = None;
        self.free.push(id);
    }

    /// Keep `id` and all of its ancestors alive for the rest of the session.
    pub fn capture(&mut self, id: EnvId) {
        let mut cursor = Some(id);

        while let Some(env) = cursor {
            let scope = &mut self.scopes[env.0];
            if scope.captured {
                break; // ancestors of a captured scope are captured already
            }
            scope.captured = true;
            cursor = scope.parent;
        }
    }

    pub fn define(&mut self, env: EnvId, name: &str, value: Value) {
        debug!("define '{}' in {:?}", name, env);
        self.scopes[env.0].values.insert(name.to_string(), value);
    }

    pub fn get_at(&self, env: EnvId, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(env, distance)
            .and_then(|id| self.scopes[id.0].values.get(name))
            .cloned()
    }

    /// Overwrite an existing binding; `false` when there is none.
    pub fn assign_at(&mut self, env: EnvId, distance: usize, name: &str, value: Value) -> bool {
        let Some(id) = self.ancestor(env, distance) else {
            return false;
        };

        match self.scopes[id.0].values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.get_at(Self::GLOBAL, 0, name)
    }

    pub fn assign_global(&mut self, name: &str, value: Value) -> bool {
        self.assign_at(Self::GLOBAL, 0, name, value)
    }

    fn ancestor(&self, env: EnvId, distance: usize) -> Option<EnvId> {
        let mut id = env;

        for _ in 0..distance {
            id = self.scopes[id.0].parent?;
        }

        Some(id)
    }

    /// Number of scopes currently in use (allocated and not on the free list).
    pub fn live_count(&self) -> usize {
        self.scopes.len() - self.free.len()
    }
}
