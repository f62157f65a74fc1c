//! Per-interpreter context: the base environment, constructors for every
//! value variant, and the host-installable method tables.

use crate::env::{EnvRef, Environment};
use crate::error::Error;
use crate::value::{Map, Reference, Set, Value, Vector};
use mellifera_syntax::escape;
use mellifera_syntax::token::RegexpLiteral;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The per-interpreter holder of shared state. The base environment is the
/// ultimate outer scope of every program evaluation; the host installs its
/// standard library into it (and into the per-typename method tables)
/// before evaluation begins.
pub struct Context {
    base: EnvRef,
    methods: RefCell<HashMap<&'static str, HashMap<String, Value>>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            base: Environment::new(),
            methods: RefCell::new(HashMap::new()),
        }
    }

    pub fn base_environment(&self) -> &EnvRef {
        &self.base
    }

    /// Bind a name in the base environment.
    pub fn install(&self, name: &str, value: Value) {
        self.base.declare(name, value);
    }

    /// Register a method for one of the fixed typenames ("string",
    /// "vector", ...). Methods receive their receiver by reference as an
    /// implicit first argument.
    pub fn install_method(&self, typename: &'static str, name: &str, value: Value) {
        self.methods
            .borrow_mut()
            .entry(typename)
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Look up a method registered for a typename.
    pub fn method(&self, typename: &str, name: &str) -> Option<Value> {
        self.methods.borrow().get(typename)?.get(name).cloned()
    }

    // === Constructors ===

    pub fn new_null(&self) -> Value {
        Value::Null
    }

    pub fn new_boolean(&self, data: bool) -> Value {
        Value::Boolean(data)
    }

    pub fn new_number(&self, data: f64) -> Value {
        Value::Number(data)
    }

    pub fn new_string(&self, data: impl AsRef<[u8]>) -> Value {
        Value::string(data)
    }

    /// Compile a regular expression into a regexp value.
    pub fn new_regexp(&self, text: &str) -> Result<Value, Error> {
        let pattern = regex::bytes::Regex::new(text).map_err(|_| {
            Error::message(
                None,
                format!("invalid regular expression \"{}\"", escape(text)),
            )
        })?;
        Ok(Value::Regexp(Rc::new(RegexpLiteral {
            pattern,
            text: text.as_bytes().to_vec(),
        })))
    }

    pub fn new_vector(&self, elements: Vec<Value>) -> Value {
        Value::Vector(Vector::new(elements))
    }

    /// Build a map from pairs, folded left-to-right with later duplicates
    /// overwriting earlier ones.
    pub fn new_map(&self, pairs: Vec<(Value, Value)>) -> Value {
        Value::Map(Map::from_pairs(pairs))
    }

    /// Build a set from elements, folded left-to-right; duplicate insertion
    /// is idempotent.
    pub fn new_set(&self, elements: Vec<Value>) -> Value {
        Value::Set(Set::from_elements(elements))
    }

    pub fn new_reference(&self, value: Value) -> Value {
        Value::Reference(Reference::new(value))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
