//! Runtime values: a tagged sum with value semantics, structural equality,
//! and copy-on-write containers.
//!
//! Containers hold their elements in an `Rc`-shared data cell. `copy` clones
//! the handle (bumping the cell's use count); `cow` gives a handle a private
//! cell before any mutation when the cell is shared. Immutable variants copy
//! as themselves.

use crate::comb::{CombEncoder, CombError};
use crate::context::Context;
use crate::env::EnvRef;
use crate::error::Error;
use crate::ordered::OrderedMap;
use mellifera_syntax::ast::FunctionLiteral;
use mellifera_syntax::escape;
use mellifera_syntax::token::RegexpLiteral;
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a over a byte slice.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    fnv1a_extend(FNV_OFFSET_BASIS, bytes)
}

fn fnv1a_extend(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Render a number the way the language prints it: `NaN`, `Inf`, `-Inf`, or
/// the shortest round-tripping decimal without an exponent.
pub fn number_string(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number == f64::INFINITY {
        return "Inf".to_string();
    }
    if number == f64::NEG_INFINITY {
        return "-Inf".to_string();
    }
    format!("{number}")
}

fn runes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Signature of a host-installed builtin function.
pub type BuiltinFn = fn(&Context, Vec<Value>) -> Result<Value, Error>;

/// A host-installed builtin function value.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub f: BuiltinFn,
}

/// A user function: the shared literal it was created from plus the captured
/// environment.
pub struct FunctionValue {
    pub literal: Rc<FunctionLiteral>,
    pub env: EnvRef,
}

impl FunctionValue {
    /// Display name: the bound name (quoted if it contains unusual
    /// characters) tagged with the definition location.
    pub fn display_name(&self) -> String {
        let name = self.literal.name.borrow();
        let name = match name.as_deref() {
            Some(bytes) => runes(bytes),
            None => "function".to_string(),
        };
        let ugly = !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
        let name = if ugly {
            format!("\"{}\"", escape(&name))
        } else {
            name
        };
        match &self.literal.location {
            Some(location) => format!("{name}@[{location}]"),
            None => name,
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A user-declared type: a display name plus a map of methods.
#[derive(Debug)]
pub struct TypeValue {
    pub name: Vec<u8>,
    pub methods: Map,
}

impl TypeValue {
    pub fn name_string(&self) -> String {
        runes(&self.name)
    }
}

/// A map-shaped value tagged with a user type.
#[derive(Debug, Clone)]
pub struct Record {
    pub ty: Rc<TypeValue>,
    pub data: Map,
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Str(Rc<[u8]>),
    Regexp(Rc<RegexpLiteral>),
    Vector(Vector),
    Map(Map),
    Set(Set),
    Reference(Reference),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Type(Rc<TypeValue>),
    Record(Record),
}

impl Value {
    pub fn string(data: impl AsRef<[u8]>) -> Value {
        Value::Str(Rc::from(data.as_ref()))
    }

    pub fn vector(elements: Vec<Value>) -> Value {
        Value::Vector(Vector::new(elements))
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Value {
        Value::Map(Map::from_pairs(pairs))
    }

    pub fn set(elements: Vec<Value>) -> Value {
        Value::Set(Set::from_elements(elements))
    }

    pub fn reference(value: Value) -> Value {
        Value::Reference(Reference::new(value))
    }

    /// The fixed name of the underlying variant.
    pub fn base_typename(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Regexp(_) => "regexp",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Reference(_) => "reference",
            Value::Function(_) | Value::Builtin(_) => "function",
            Value::Type(_) => "type",
            Value::Record(_) => "record",
        }
    }

    /// The name shown to users: the user type name for records, the variant
    /// name otherwise.
    pub fn typename(&self) -> String {
        match self {
            Value::Record(record) => record.ty.name_string(),
            other => other.base_typename().to_string(),
        }
    }

    /// Logical deep copy. Containers share their data cell until a mutation;
    /// immutable variants return the same handle.
    pub fn copy(&self) -> Value {
        self.clone()
    }

    /// Materialize a private data cell if this handle shares one. A no-op
    /// for immutable variants.
    pub fn cow(&mut self) {
        match self {
            Value::Vector(vector) => vector.cow(),
            Value::Map(map) => map.cow(),
            Value::Set(set) => set.cow(),
            _ => {}
        }
    }

    /// 64-bit hash. Equal values hash equal.
    pub fn hash(&self) -> u64 {
        match self {
            Value::Null => 0,
            Value::Boolean(data) => u64::from(*data),
            // Negative zero compares equal to zero, so both must hash alike.
            Value::Number(data) if *data == 0.0 => 0.0f64.to_bits(),
            Value::Number(data) => data.to_bits(),
            Value::Str(data) => fnv1a(data),
            Value::Regexp(data) => fnv1a(&data.text),
            Value::Vector(vector) => {
                let mut hash = fnv1a(b"vector");
                for element in vector.data.borrow().iter() {
                    hash = fnv1a_extend(hash, &element.hash().to_le_bytes());
                }
                hash
            }
            Value::Map(map) => {
                // Commutative combination: map equality is insertion-order
                // independent, so the hash must be as well.
                let mut sum = 0u64;
                for (key, value) in map.data.borrow().iter() {
                    let pair = fnv1a_extend(
                        fnv1a_extend(FNV_OFFSET_BASIS, &key.hash().to_le_bytes()),
                        &value.hash().to_le_bytes(),
                    );
                    sum = sum.wrapping_add(pair);
                }
                fnv1a(b"map").wrapping_add(sum)
            }
            Value::Set(set) => {
                let mut sum = 0u64;
                for (key, _) in set.data.borrow().iter() {
                    sum = sum.wrapping_add(key.hash());
                }
                fnv1a(b"set").wrapping_add(sum)
            }
            Value::Reference(reference) => reference.address() as u64,
            Value::Function(function) => Rc::as_ptr(function) as u64,
            Value::Builtin(builtin) => builtin.f as usize as u64,
            Value::Type(ty) => Rc::as_ptr(ty) as u64,
            Value::Record(record) => {
                let ty = Rc::as_ptr(&record.ty) as u64;
                fnv1a_extend(
                    fnv1a_extend(FNV_OFFSET_BASIS, &ty.to_le_bytes()),
                    &Value::Map(record.data.clone()).hash().to_le_bytes(),
                )
            }
        }
    }

    /// Structural equality.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // IEEE-754 equality, so NaN != NaN.
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Regexp(a), Value::Regexp(b)) => a.text == b.text,
            (Value::Vector(a), Value::Vector(b)) => {
                if a.shares_data(b) {
                    return true;
                }
                let a = a.data.borrow();
                let b = b.data.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            (Value::Map(a), Value::Map(b)) => map_equal(a, b),
            (Value::Set(a), Value::Set(b)) => {
                if a.shares_data(b) {
                    return true;
                }
                let a_data = a.data.borrow();
                let b_data = b.data.borrow();
                a_data.len() == b_data.len()
                    && a_data.iter().all(|(key, _)| b_data.contains(key))
            }
            (Value::Reference(a), Value::Reference(b)) => a.aliases(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.literal, &b.literal),
            (Value::Builtin(a), Value::Builtin(b)) => a.f as usize == b.f as usize,
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(&a.ty, &b.ty) && map_equal(&a.data, &b.data)
            }
            _ => false,
        }
    }

    /// Handle identity: whether two values are the same handle or share the
    /// same backing allocation. Used to detect in-place mutation.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Regexp(a), Value::Regexp(b)) => Rc::ptr_eq(a, b),
            (Value::Vector(a), Value::Vector(b)) => a.shares_data(b),
            (Value::Map(a), Value::Map(b)) => a.shares_data(b),
            (Value::Set(a), Value::Set(b)) => a.shares_data(b),
            (Value::Reference(a), Value::Reference(b)) => a.aliases(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.f as usize == b.f as usize,
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(&a.ty, &b.ty) && a.data.shares_data(&b.data)
            }
            _ => false,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(data) => Some(*data),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(data) => Some(*data),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Vector> {
        match self {
            Value::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// Emit this value to a comb encoder. Regexps, references, functions,
    /// types, records, and non-finite numbers are not encodable.
    pub fn comb_encode<W: Write>(&self, encoder: &mut CombEncoder<W>) -> Result<(), CombError> {
        match self {
            Value::Null | Value::Boolean(_) | Value::Str(_) => {
                encoder.write_str(&self.to_string())
            }
            Value::Number(number) => {
                if !number.is_finite() {
                    return Err(encoder.fail_invalid(self.to_string()));
                }
                encoder.write_str(&self.to_string())
            }
            Value::Vector(vector) => {
                let elements = vector.snapshot();
                if elements.is_empty() {
                    return encoder.write_str("[]");
                }
                encoder.write_str("[")?;
                if encoder.has_indent() {
                    encoder.write_end_of_line()?;
                }
                encoder.ascend();
                for (i, element) in elements.iter().enumerate() {
                    encoder.write_indent("")?;
                    element.comb_encode(encoder)?;
                    if i != elements.len() - 1 {
                        encoder.write_str(",")?;
                        encoder.write_end_of_line()?;
                    } else if encoder.has_indent() {
                        encoder.write_end_of_line()?;
                    }
                }
                encoder.descend();
                encoder.write_indent("]")
            }
            Value::Map(map) => {
                let entries = map.entries();
                if entries.is_empty() {
                    return encoder.write_str("Map{}");
                }
                encoder.write_str("{")?;
                if encoder.has_indent() {
                    encoder.write_end_of_line()?;
                }
                encoder.ascend();
                for (i, (key, value)) in entries.iter().enumerate() {
                    encoder.write_indent("")?;
                    key.comb_encode(encoder)?;
                    encoder.write_str(": ")?;
                    value.comb_encode(encoder)?;
                    if i != entries.len() - 1 {
                        encoder.write_str(",")?;
                        encoder.write_end_of_line()?;
                    } else if encoder.has_indent() {
                        encoder.write_end_of_line()?;
                    }
                }
                encoder.descend();
                encoder.write_indent("}")
            }
            Value::Set(set) => {
                let elements = set.elements();
                if elements.is_empty() {
                    return encoder.write_str("Set{}");
                }
                encoder.write_str("{")?;
                if encoder.has_indent() {
                    encoder.write_end_of_line()?;
                }
                encoder.ascend();
                for (i, element) in elements.iter().enumerate() {
                    encoder.write_indent("")?;
                    element.comb_encode(encoder)?;
                    if i != elements.len() - 1 {
                        encoder.write_str(",")?;
                        encoder.write_end_of_line()?;
                    } else if encoder.has_indent() {
                        encoder.write_end_of_line()?;
                    }
                }
                encoder.descend();
                encoder.write_indent("}")
            }
            _ => Err(encoder.fail_invalid(self.to_string())),
        }
    }
}

fn map_equal(a: &Map, b: &Map) -> bool {
    if a.shares_data(b) {
        return true;
    }
    let a_data = a.data.borrow();
    let b_data = b.data.borrow();
    if a_data.len() != b_data.len() {
        return false;
    }
    a_data
        .iter()
        .all(|(key, value)| b_data.get(key).is_some_and(|other| value.equal(other)))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(true) => f.write_str("true"),
            Value::Boolean(false) => f.write_str("false"),
            Value::Number(number) => f.write_str(&number_string(*number)),
            Value::Str(data) => write!(f, "\"{}\"", escape(&runes(data))),
            Value::Regexp(data) => write!(f, "r\"{}\"", escape(&runes(&data.text))),
            Value::Vector(vector) => {
                f.write_str("[")?;
                for (i, element) in vector.data.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => fmt_map(f, map),
            Value::Set(set) => {
                if set.count() == 0 {
                    return f.write_str("Set{}");
                }
                f.write_str("{")?;
                for (i, (key, _)) in set.data.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}")?;
                }
                f.write_str("}")
            }
            Value::Reference(reference) => write!(f, "reference@{:#x}", reference.address()),
            Value::Function(function) => f.write_str(&function.display_name()),
            Value::Builtin(builtin) => write!(f, "{}@builtin", builtin.name),
            Value::Type(ty) => fmt_map(f, &ty.methods),
            Value::Record(record) => fmt_map(f, &record.data),
        }
    }
}

fn fmt_map(f: &mut fmt::Formatter<'_>, map: &Map) -> fmt::Result {
    if map.count() == 0 {
        return f.write_str("Map{}");
    }
    f.write_str("{")?;
    for (i, (key, value)) in map.data.borrow().iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    f.write_str("}")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// An ordered sequence of values with copy-on-write sharing.
#[derive(Clone)]
pub struct Vector {
    data: Rc<RefCell<Vec<Value>>>,
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Vector(self.clone()))
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_map(f, self)
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Set(self.clone()))
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reference@{:#x}", self.address())
    }
}

impl Vector {
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            data: Rc::new(RefCell::new(elements)),
        }
    }

    /// The number of handles sharing this vector's data cell.
    pub fn uses(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    pub fn shares_data(&self, other: &Vector) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Materialize a private data cell if the current one is shared.
    pub fn cow(&mut self) {
        if Rc::strong_count(&self.data) > 1 {
            let elements: Vec<Value> = self.data.borrow().iter().map(Value::copy).collect();
            self.data = Rc::new(RefCell::new(elements));
        }
    }

    pub fn count(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.data.borrow().get(index).cloned()
    }

    /// Replace the element at `index`. Returns false when out of bounds.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        self.cow();
        let mut data = self.data.borrow_mut();
        match data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.cow();
        self.data.borrow_mut().push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.cow();
        self.data.borrow_mut().pop()
    }

    /// Insert before `index`. Returns false when the index is past the end.
    pub fn insert(&mut self, index: usize, value: Value) -> bool {
        self.cow();
        let mut data = self.data.borrow_mut();
        if index > data.len() {
            return false;
        }
        data.insert(index, value);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        self.cow();
        let mut data = self.data.borrow_mut();
        if index >= data.len() {
            return None;
        }
        Some(data.remove(index))
    }

    /// A handle-copy snapshot of the elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.data.borrow().clone()
    }

    /// Run `f` on a mutable reference to the element at `index`.
    pub fn with_element_mut<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Value) -> R,
    ) -> Option<R> {
        self.cow();
        let mut data = self.data.borrow_mut();
        data.get_mut(index).map(f)
    }
}

/// An insertion-ordered map with copy-on-write sharing.
#[derive(Clone, Default)]
pub struct Map {
    data: Rc<RefCell<OrderedMap>>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, folding left-to-right with later duplicates
    /// overwriting earlier ones.
    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Self {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.insert(key, value);
        }
        map
    }

    pub fn uses(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    pub fn shares_data(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn cow(&mut self) {
        if Rc::strong_count(&self.data) > 1 {
            let copied = self.data.borrow().clone();
            self.data = Rc::new(RefCell::new(copied));
        }
    }

    pub fn count(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn lookup(&self, key: &Value) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.data.borrow().contains(key)
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        self.cow();
        self.data.borrow_mut().insert(key, value);
    }

    pub fn remove(&mut self, key: &Value) -> bool {
        self.cow();
        self.data.borrow_mut().remove(key)
    }

    /// A handle-copy snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.data
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.data.borrow().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Run `f` on a mutable reference to the value stored under `key`.
    pub fn with_value_mut<R>(
        &mut self,
        key: &Value,
        f: impl FnOnce(&mut Value) -> R,
    ) -> Option<R> {
        self.cow();
        let mut data = self.data.borrow_mut();
        data.get_mut(key).map(f)
    }
}

/// An insertion-ordered set with copy-on-write sharing.
#[derive(Clone, Default)]
pub struct Set {
    data: Rc<RefCell<OrderedMap>>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from elements, folding left-to-right; duplicate insertion is
    /// idempotent.
    pub fn from_elements(elements: Vec<Value>) -> Self {
        let mut set = Self::new();
        for element in elements {
            set.insert(element);
        }
        set
    }

    pub fn uses(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    pub fn shares_data(&self, other: &Set) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn cow(&mut self) {
        if Rc::strong_count(&self.data) > 1 {
            let copied = self.data.borrow().clone();
            self.data = Rc::new(RefCell::new(copied));
        }
    }

    pub fn count(&self) -> usize {
        self.data.borrow().len()
    }

    /// Look up the stored element equal to `value`.
    pub fn lookup(&self, value: &Value) -> Option<Value> {
        self.data.borrow().get_key(value).cloned()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.data.borrow().contains(value)
    }

    pub fn insert(&mut self, value: Value) {
        self.cow();
        self.data.borrow_mut().insert(value, Value::Null);
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.cow();
        self.data.borrow_mut().remove(value)
    }

    /// A handle-copy snapshot of the elements in insertion order.
    pub fn elements(&self) -> Vec<Value> {
        self.data.borrow().iter().map(|(key, _)| key.clone()).collect()
    }
}

/// A first-class alias to a value cell. Mutation through a reference is
/// visible to every holder of the same cell.
#[derive(Clone)]
pub struct Reference {
    cell: Rc<RefCell<Value>>,
}

impl Reference {
    /// Wrap a value in a fresh cell.
    pub fn new(value: Value) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// Alias an existing cell, typically an environment slot.
    pub fn from_cell(cell: Rc<RefCell<Value>>) -> Self {
        Self { cell }
    }

    pub fn get(&self) -> Value {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.cell.borrow_mut() = value;
    }

    pub fn cell(&self) -> &Rc<RefCell<Value>> {
        &self.cell
    }

    pub fn aliases(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.cell) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typenames() {
        assert_eq!(Value::Null.typename(), "null");
        assert_eq!(Value::Boolean(true).typename(), "boolean");
        assert_eq!(Value::Number(123.456).typename(), "number");
        assert_eq!(Value::string("foo").typename(), "string");
        assert_eq!(Value::vector(vec![]).typename(), "vector");
        assert_eq!(Value::map(vec![]).typename(), "map");
        assert_eq!(Value::set(vec![]).typename(), "set");
        assert_eq!(Value::reference(Value::Null).typename(), "reference");
    }

    #[test]
    fn test_null_string_and_hash() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Null.hash(), 0);
        assert!(Value::Null.equal(&Value::Null));
    }

    #[test]
    fn test_boolean_string_and_hash() {
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Boolean(true).hash(), 1);
        assert_eq!(Value::Boolean(false).hash(), 0);
    }

    #[test]
    fn test_number_string() {
        assert_eq!(Value::Number(0.0).to_string(), "0");
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(-1.0).to_string(), "-1");
        assert_eq!(Value::Number(123.456).to_string(), "123.456");
        assert_eq!(Value::Number(-123.456).to_string(), "-123.456");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Inf");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Inf");
    }

    #[test]
    fn test_number_hash_is_bit_pattern() {
        assert_eq!(Value::Number(123.456).hash(), 123.456f64.to_bits());
    }

    #[test]
    fn test_nan_not_equal_to_itself() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.equal(&nan));
    }

    #[test]
    fn test_string_escaping() {
        let value = Value::string("foo\t\n\"\\bar");
        assert_eq!(value.to_string(), "\"foo\\t\\n\\\"\\\\bar\"");
        assert_eq!(value.hash(), fnv1a(b"foo\t\n\"\\bar"));
    }

    #[test]
    fn test_vector_string() {
        assert_eq!(Value::vector(vec![]).to_string(), "[]");
        let vector = Value::vector(vec![
            Value::string("foo"),
            Value::string("bar"),
            Value::string("baz"),
        ]);
        assert_eq!(vector.to_string(), "[\"foo\", \"bar\", \"baz\"]");
    }

    #[test]
    fn test_map_string() {
        assert_eq!(Value::map(vec![]).to_string(), "Map{}");
        let map = Value::map(vec![
            (Value::Number(123.456), Value::string("abc")),
            (Value::string("foo"), Value::string("def")),
            (Value::vector(vec![]), Value::string("hij")),
        ]);
        assert_eq!(map.to_string(), "{123.456: \"abc\", \"foo\": \"def\", []: \"hij\"}");
    }

    #[test]
    fn test_set_string() {
        assert_eq!(Value::set(vec![]).to_string(), "Set{}");
        let set = Value::set(vec![
            Value::Number(123.456),
            Value::string("foo"),
            Value::vector(vec![]),
        ]);
        assert_eq!(set.to_string(), "{123.456, \"foo\", []}");
    }

    #[test]
    fn test_map_duplicate_keys_overwrite() {
        let map = Value::map(vec![
            (Value::string("k"), Value::Number(1.0)),
            (Value::string("k"), Value::Number(2.0)),
        ]);
        let Value::Map(map) = map else { unreachable!() };
        assert_eq!(map.count(), 1);
        assert_eq!(map.lookup(&Value::string("k")), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_vector_copy_on_write() {
        let mut a = Vector::new(vec![
            Value::string("foo"),
            Value::string("bar"),
            Value::string("baz"),
        ]);
        let mut b = a.clone();
        assert_eq!(a.count(), b.count());
        assert_eq!(a.uses(), 2);
        assert_eq!(b.uses(), 2);
        assert!(a.shares_data(&b));

        b.set(1, Value::Number(123.456));
        assert_eq!(a.uses(), 1);
        assert_eq!(b.uses(), 1);
        assert!(!a.shares_data(&b));

        assert_eq!(a.get(1), Some(Value::string("bar")));
        assert_eq!(b.get(1), Some(Value::Number(123.456)));

        // Mutating the original no longer affects the copy either.
        a.push(Value::Null);
        assert_eq!(a.count(), 4);
        assert_eq!(b.count(), 3);
    }

    #[test]
    fn test_map_copy_on_write() {
        let mut a = Map::from_pairs(vec![
            (Value::Number(123.456), Value::string("abc")),
            (Value::string("foo"), Value::string("def")),
            (Value::vector(vec![]), Value::string("hij")),
        ]);
        let mut b = a.clone();
        assert_eq!(a.uses(), 2);
        assert!(a.shares_data(&b));

        b.insert(Value::Number(123.456), Value::Null);
        assert_eq!(a.uses(), 1);
        assert_eq!(b.uses(), 1);
        assert!(!a.shares_data(&b));
        assert_eq!(a.lookup(&Value::Number(123.456)), Some(Value::string("abc")));
        assert_eq!(b.lookup(&Value::Number(123.456)), Some(Value::Null));

        let mut c = a.clone();
        c.remove(&Value::string("foo"));
        assert_eq!(c.count(), a.count() - 1);
        assert!(!a.shares_data(&c));
        assert_eq!(a.lookup(&Value::string("foo")), Some(Value::string("def")));
        assert_eq!(c.lookup(&Value::string("foo")), None);
    }

    #[test]
    fn test_set_copy_on_write() {
        let mut a = Set::from_elements(vec![
            Value::Number(123.456),
            Value::string("foo"),
            Value::vector(vec![]),
        ]);
        let mut b = a.clone();
        assert_eq!(a.uses(), 2);
        assert!(a.shares_data(&b));

        b.insert(Value::string("bar"));
        assert_eq!(a.count() + 1, b.count());
        assert_eq!(a.uses(), 1);
        assert_eq!(b.uses(), 1);
        assert!(!a.shares_data(&b));
        assert!(!a.contains(&Value::string("bar")));
        assert!(b.contains(&Value::string("bar")));

        let mut c = a.clone();
        c.remove(&Value::string("foo"));
        assert!(a.contains(&Value::string("foo")));
        assert!(!c.contains(&Value::string("foo")));
    }

    #[test]
    fn test_structural_equality_after_copy() {
        let original = Value::vector(vec![
            Value::vector(vec![
                Value::string("foo"),
                Value::map(vec![(Value::string("bar"), Value::Number(123.0))]),
            ]),
            Value::string("baz"),
        ]);
        let copied = original.copy();
        assert!(original.equal(&copied));
        assert_eq!(original.hash(), copied.hash());
    }

    #[test]
    fn test_map_equality_is_order_insensitive() {
        let a = Value::map(vec![
            (Value::string("x"), Value::Number(1.0)),
            (Value::string("y"), Value::Number(2.0)),
        ]);
        let b = Value::map(vec![
            (Value::string("y"), Value::Number(2.0)),
            (Value::string("x"), Value::Number(1.0)),
        ]);
        assert!(a.equal(&b));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_copy_is_idempotent() {
        let value = Value::vector(vec![Value::Number(1.0), Value::string("two")]);
        assert!(value.copy().copy().equal(&value.copy()));
    }

    #[test]
    fn test_reference_identity() {
        let a = Reference::new(Value::Number(123.456));
        let b = a.clone();
        let c = Reference::new(Value::Number(123.456));
        assert!(Value::Reference(a.clone()).equal(&Value::Reference(b)));
        assert!(!Value::Reference(a.clone()).equal(&Value::Reference(c)));
        assert!(Value::Reference(a).to_string().starts_with("reference@"));
    }

    #[test]
    fn test_reference_mutation_is_shared() {
        let a = Reference::new(Value::Number(1.0));
        let b = a.clone();
        b.set(Value::Number(2.0));
        assert_eq!(a.get(), Value::Number(2.0));
    }

    #[test]
    fn test_set_insert_is_idempotent() {
        let mut set = Set::from_elements(vec![Value::Number(1.0), Value::Number(1.0)]);
        assert_eq!(set.count(), 1);
        set.insert(Value::Number(1.0));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_cow_deep_isolation() {
        // Mutation of a nested container in the copy must not show through
        // to the original.
        let inner = Value::vector(vec![Value::Number(1.0)]);
        let a = Vector::new(vec![inner]);
        let mut b = a.clone();
        b.with_element_mut(0, |element| {
            element.cow();
            if let Value::Vector(v) = element {
                v.push(Value::Number(2.0));
            }
        });
        let Some(Value::Vector(original_inner)) = a.get(0) else {
            panic!("expected inner vector");
        };
        assert_eq!(original_inner.count(), 1);
        let Some(Value::Vector(copied_inner)) = b.get(0) else {
            panic!("expected inner vector");
        };
        assert_eq!(copied_inner.count(), 2);
    }
}
