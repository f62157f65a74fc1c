//! Lexically scoped environments.
//!
//! An environment maps names to value slots and optionally chains to an
//! outer scope. Bindings are slots (`Rc<RefCell<Value>>`) rather than bare
//! values so that references and place assignment can alias them.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to an environment frame.
pub type EnvRef = Rc<Environment>;

/// One lexical scope.
pub struct Environment {
    outer: Option<EnvRef>,
    store: RefCell<HashMap<String, Rc<RefCell<Value>>>>,
}

impl Environment {
    /// Create a root environment with no outer scope.
    pub fn new() -> EnvRef {
        Rc::new(Self {
            outer: None,
            store: RefCell::new(HashMap::new()),
        })
    }

    /// Create a child scope of `outer`.
    pub fn with_outer(outer: EnvRef) -> EnvRef {
        Rc::new(Self {
            outer: Some(outer),
            store: RefCell::new(HashMap::new()),
        })
    }

    /// Bind a name in this scope, shadowing any outer binding.
    pub fn declare(&self, name: &str, value: Value) {
        self.store
            .borrow_mut()
            .insert(name.to_string(), Rc::new(RefCell::new(value)));
    }

    /// Find the slot bound to a name, walking outward.
    pub fn slot(&self, name: &str) -> Option<Rc<RefCell<Value>>> {
        if let Some(slot) = self.store.borrow().get(name) {
            return Some(slot.clone());
        }
        self.outer.as_ref()?.slot(name)
    }

    /// Read the value bound to a name, walking outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let slot = self.slot(name)?;
        let value = slot.borrow().clone();
        Some(value)
    }

    /// Write the nearest existing binding of a name. Returns false when the
    /// name is not bound anywhere.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        match self.slot(name) {
            Some(slot) => {
                *slot.borrow_mut() = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.store.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}
