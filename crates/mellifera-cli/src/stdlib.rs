//! The standard library subset installed by the `mf` host.
//!
//! The language core only exposes the base environment and the per-typename
//! method tables; everything here is host-installed. Methods receive their
//! receiver by reference as an implicit first argument. A small prelude
//! written in Mellifera itself provides `assert`, `min`, `max`, `extends`-
//! based iterator types, and `range`.

use mellifera_eval::{
    call, Builtin, Context, Error, Map, Set, SourceError, Value, Vector,
};
use std::io::{Read, Write};

/// Mellifera-source prelude evaluated into the base environment during
/// installation.
const PRELUDE: &str = r#"
let assert = function(condition) {
    if not condition {
        error "assertion failure";
    }
};

let iterator = type {
    "next": function(self) {
        error "unimplemented iterator::next";
    },
    "count": function(self) {
        let count = 0;
        for _ in self.* {
            count = count + 1;
        }
        return count;
    },
    "contains": function(self, value) {
        for x in self.* {
            if x == value {
                return true;
            }
        }
        return false;
    },
    "into_vector": function(self) {
        let result = [];
        for x in self.* {
            result.push(x);
        }
        return result;
    },
};

let range_iterator = type extends(iterator, {
    "next": function(self) {
        if self.cur >= self.end {
            error null; # end-of-iteration
        }
        let result = self.cur;
        self.cur = self.cur + 1;
        return result;
    },
});
let range = function(bgn, end) {
    if end < bgn {
        error $"end-of-range {repr(end)} is less than beginning-of-range {repr(bgn)}";
    }
    return new range_iterator {
        "cur": bgn,
        "end": end,
    };
};

let min = function(a, b) {
    if a <= b {
        return a;
    }
    return b;
};
let max = function(a, b) {
    if a >= b {
        return a;
    }
    return b;
};
"#;

/// Install the standard library into a context.
pub fn install(ctx: &Context) -> Result<(), SourceError> {
    install_globals(ctx);
    install_number_methods(ctx);
    install_string_methods(ctx);
    install_vector_methods(ctx);
    install_map_methods(ctx);
    install_set_methods(ctx);
    mellifera_eval::eval_source(ctx, PRELUDE, None, Some(ctx.base_environment()))?;
    Ok(())
}

fn builtin(name: &'static str, f: mellifera_eval::BuiltinFn) -> Value {
    Value::Builtin(Builtin { name, f })
}

// === Argument helpers ===

fn expect_argument_count(arguments: &[Value], count: usize) -> Result<(), Error> {
    if arguments.len() != count {
        return Err(Error::message(
            None,
            format!(
                "invalid argument count (expected {count}, received {})",
                arguments.len()
            ),
        ));
    }
    Ok(())
}

fn argument_type_error(expected: &str, index: usize, argument: &Value) -> Error {
    Error::message(
        None,
        format!(
            "expected {expected}-like value for argument {index}, received {}",
            argument.typename()
        ),
    )
}

fn reference_type_error(expected: &str, index: usize, argument: &Value) -> Error {
    Error::message(
        None,
        format!(
            "expected reference to {expected}-like value for argument {index}, received {}",
            argument.typename()
        ),
    )
}

fn number_argument(arguments: &[Value], index: usize) -> Result<f64, Error> {
    arguments[index]
        .as_number()
        .ok_or_else(|| argument_type_error("number", index, &arguments[index]))
}

fn string_argument<'a>(arguments: &'a [Value], index: usize) -> Result<&'a [u8], Error> {
    arguments[index]
        .as_str_bytes()
        .ok_or_else(|| argument_type_error("string", index, &arguments[index]))
}

fn integer_index(arguments: &[Value], index: usize) -> Result<i64, Error> {
    let number = number_argument(arguments, index)?;
    if number.fract() != 0.0 {
        return Err(Error::message(
            None,
            format!("expected integer index, received {}", arguments[index]),
        ));
    }
    Ok(number as i64)
}

fn self_number(arguments: &[Value]) -> Result<f64, Error> {
    let argument = &arguments[0];
    let value = argument
        .as_reference()
        .map(|reference| reference.get())
        .ok_or_else(|| reference_type_error("number", 0, argument))?;
    value
        .as_number()
        .ok_or_else(|| reference_type_error("number", 0, argument))
}

fn self_string(arguments: &[Value]) -> Result<Vec<u8>, Error> {
    let argument = &arguments[0];
    let value = argument
        .as_reference()
        .map(|reference| reference.get())
        .ok_or_else(|| reference_type_error("string", 0, argument))?;
    value
        .as_str_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| reference_type_error("string", 0, argument))
}

fn self_vector(arguments: &[Value]) -> Result<Vector, Error> {
    let argument = &arguments[0];
    let value = argument
        .as_reference()
        .map(|reference| reference.get())
        .ok_or_else(|| reference_type_error("vector", 0, argument))?;
    value
        .as_vector()
        .cloned()
        .ok_or_else(|| reference_type_error("vector", 0, argument))
}

fn with_self_vector<R>(
    arguments: &[Value],
    f: impl FnOnce(&mut Vector) -> Result<R, Error>,
) -> Result<R, Error> {
    let argument = &arguments[0];
    let reference = argument
        .as_reference()
        .ok_or_else(|| reference_type_error("vector", 0, argument))?;
    let mut cell = reference.cell().borrow_mut();
    match &mut *cell {
        Value::Vector(vector) => f(vector),
        _ => Err(reference_type_error("vector", 0, argument)),
    }
}

fn self_map(arguments: &[Value]) -> Result<Map, Error> {
    let argument = &arguments[0];
    let value = argument
        .as_reference()
        .map(|reference| reference.get())
        .ok_or_else(|| reference_type_error("map", 0, argument))?;
    value
        .as_map()
        .cloned()
        .ok_or_else(|| reference_type_error("map", 0, argument))
}

fn with_self_map<R>(
    arguments: &[Value],
    f: impl FnOnce(&mut Map) -> Result<R, Error>,
) -> Result<R, Error> {
    let argument = &arguments[0];
    let reference = argument
        .as_reference()
        .ok_or_else(|| reference_type_error("map", 0, argument))?;
    let mut cell = reference.cell().borrow_mut();
    match &mut *cell {
        Value::Map(map) => f(map),
        _ => Err(reference_type_error("map", 0, argument)),
    }
}

fn self_set(arguments: &[Value]) -> Result<Set, Error> {
    let argument = &arguments[0];
    let value = argument
        .as_reference()
        .map(|reference| reference.get())
        .ok_or_else(|| reference_type_error("set", 0, argument))?;
    value
        .as_set()
        .cloned()
        .ok_or_else(|| reference_type_error("set", 0, argument))
}

fn with_self_set<R>(
    arguments: &[Value],
    f: impl FnOnce(&mut Set) -> Result<R, Error>,
) -> Result<R, Error> {
    let argument = &arguments[0];
    let reference = argument
        .as_reference()
        .ok_or_else(|| reference_type_error("set", 0, argument))?;
    let mut cell = reference.cell().borrow_mut();
    match &mut *cell {
        Value::Set(set) => f(set),
        _ => Err(reference_type_error("set", 0, argument)),
    }
}

// === Output ===

/// Render a value for `print`-family builtins: string contents verbatim,
/// `into_string` for records that define it, display form otherwise.
fn printable_bytes(ctx: &Context, value: &Value) -> Result<Vec<u8>, Error> {
    if let Value::Record(record) = value {
        if let Some(metafunction) = record.ty.methods.lookup(&Value::string("into_string")) {
            let result = call(ctx, &None, &metafunction, vec![Value::reference(value.copy())])?;
            return match result {
                Value::Str(bytes) => Ok(bytes.to_vec()),
                other => Err(Error::message(
                    None,
                    format!("metafunction `into_string` returned {other}"),
                )),
            };
        }
    }
    match value {
        Value::Str(bytes) => Ok(bytes.to_vec()),
        other => Ok(other.to_string().into_bytes()),
    }
}

fn write_stream(stream: &mut dyn Write, bytes: &[u8]) -> Result<(), Error> {
    stream
        .write_all(bytes)
        .map_err(|error| Error::message(None, error.to_string()))
}

fn builtin_print(ctx: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let bytes = printable_bytes(ctx, &arguments[0])?;
    write_stream(&mut std::io::stdout(), &bytes)?;
    Ok(Value::Null)
}

fn builtin_println(ctx: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let mut bytes = printable_bytes(ctx, &arguments[0])?;
    bytes.push(b'\n');
    write_stream(&mut std::io::stdout(), &bytes)?;
    Ok(Value::Null)
}

fn builtin_eprint(ctx: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let bytes = printable_bytes(ctx, &arguments[0])?;
    write_stream(&mut std::io::stderr(), &bytes)?;
    Ok(Value::Null)
}

fn builtin_eprintln(ctx: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let mut bytes = printable_bytes(ctx, &arguments[0])?;
    bytes.push(b'\n');
    write_stream(&mut std::io::stderr(), &bytes)?;
    Ok(Value::Null)
}

fn builtin_dump(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    write_stream(&mut std::io::stdout(), arguments[0].to_string().as_bytes())?;
    Ok(Value::Null)
}

fn builtin_dumpln(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let mut bytes = arguments[0].to_string().into_bytes();
    bytes.push(b'\n');
    write_stream(&mut std::io::stdout(), &bytes)?;
    Ok(Value::Null)
}

// === Input ===

fn builtin_input(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 0)?;
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|error| Error::message(None, error.to_string()))?;
    Ok(Value::string(bytes))
}

fn builtin_inputln(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 0)?;
    let mut line = String::new();
    let count = std::io::stdin()
        .read_line(&mut line)
        .map_err(|error| Error::message(None, error.to_string()))?;
    if count == 0 {
        return Ok(Value::Null);
    }
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(Value::string(line))
}

// === Miscellaneous globals ===

fn builtin_typename(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::string(arguments[0].typename()))
}

fn builtin_typeof(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    match &arguments[0] {
        Value::Record(record) => Ok(Value::Type(record.ty.clone())),
        _ => Ok(Value::Null),
    }
}

fn builtin_repr(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::string(arguments[0].to_string()))
}

fn builtin_exit(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let code = number_argument(&arguments, 0)?;
    if code.fract() != 0.0 {
        return Err(Error::message(
            None,
            format!("expected integer exit code, received {}", arguments[0]),
        ));
    }
    std::process::exit(code as i32);
}

/// Merge two map-like values into a new map; entries of the second override
/// entries of the first. Accepts types as the first argument so user types
/// can extend each other.
fn builtin_extends(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let base = match &arguments[0] {
        Value::Map(map) => map.clone(),
        Value::Type(ty) => ty.methods.clone(),
        other => return Err(argument_type_error("map", 0, other)),
    };
    let overrides = match &arguments[1] {
        Value::Map(map) => map.clone(),
        Value::Type(ty) => ty.methods.clone(),
        other => return Err(argument_type_error("map", 1, other)),
    };
    let mut result = Map::new();
    for (key, value) in base.entries() {
        result.insert(key.copy(), value.copy());
    }
    for (key, value) in overrides.entries() {
        result.insert(key.copy(), value.copy());
    }
    Ok(Value::Map(result))
}

// === fs ===

fn builtin_fs_read(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let path = String::from_utf8_lossy(string_argument(&arguments, 0)?).into_owned();
    let bytes = std::fs::read(&path).map_err(|error| Error::message(None, error.to_string()))?;
    Ok(Value::string(bytes))
}

fn builtin_fs_write(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let path = String::from_utf8_lossy(string_argument(&arguments, 0)?).into_owned();
    let data = string_argument(&arguments, 1)?;
    std::fs::write(&path, data).map_err(|error| Error::message(None, error.to_string()))?;
    Ok(Value::Null)
}

fn builtin_fs_append(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let path = String::from_utf8_lossy(string_argument(&arguments, 0)?).into_owned();
    let data = string_argument(&arguments, 1)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|error| Error::message(None, error.to_string()))?;
    file.write_all(data)
        .map_err(|error| Error::message(None, error.to_string()))?;
    Ok(Value::Null)
}

// === math ===

fn math_unary(arguments: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(f(number_argument(&arguments, 0)?)))
}

fn math_abs(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::abs)
}

fn math_sqrt(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::sqrt)
}

fn math_floor(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::floor)
}

fn math_ceil(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::ceil)
}

fn math_round(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::round)
}

fn math_trunc(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::trunc)
}

fn math_log(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::ln)
}

fn math_log2(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::log2)
}

fn math_log10(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    math_unary(arguments, f64::log10)
}

fn math_pow(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let base = number_argument(&arguments, 0)?;
    let exponent = number_argument(&arguments, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

fn math_is_nan(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Boolean(number_argument(&arguments, 0)?.is_nan()))
}

fn math_is_inf(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Boolean(number_argument(&arguments, 0)?.is_infinite()))
}

fn install_globals(ctx: &Context) {
    ctx.install("NaN", Value::Number(f64::NAN));
    ctx.install("Inf", Value::Number(f64::INFINITY));
    ctx.install("typename", builtin("typename", builtin_typename));
    ctx.install("typeof", builtin("typeof", builtin_typeof));
    ctx.install("repr", builtin("repr", builtin_repr));
    ctx.install("exit", builtin("exit", builtin_exit));
    ctx.install("extends", builtin("extends", builtin_extends));
    ctx.install("print", builtin("print", builtin_print));
    ctx.install("println", builtin("println", builtin_println));
    ctx.install("eprint", builtin("eprint", builtin_eprint));
    ctx.install("eprintln", builtin("eprintln", builtin_eprintln));
    ctx.install("dump", builtin("dump", builtin_dump));
    ctx.install("dumpln", builtin("dumpln", builtin_dumpln));
    ctx.install("input", builtin("input", builtin_input));
    ctx.install("inputln", builtin("inputln", builtin_inputln));
    ctx.install(
        "fs",
        Value::map(vec![
            (Value::string("read"), builtin("fs::read", builtin_fs_read)),
            (Value::string("write"), builtin("fs::write", builtin_fs_write)),
            (
                Value::string("append"),
                builtin("fs::append", builtin_fs_append),
            ),
        ]),
    );
    ctx.install(
        "math",
        Value::map(vec![
            (Value::string("pi"), Value::Number(std::f64::consts::PI)),
            (Value::string("e"), Value::Number(std::f64::consts::E)),
            (Value::string("abs"), builtin("math::abs", math_abs)),
            (Value::string("sqrt"), builtin("math::sqrt", math_sqrt)),
            (Value::string("pow"), builtin("math::pow", math_pow)),
            (Value::string("floor"), builtin("math::floor", math_floor)),
            (Value::string("ceil"), builtin("math::ceil", math_ceil)),
            (Value::string("round"), builtin("math::round", math_round)),
            (Value::string("trunc"), builtin("math::trunc", math_trunc)),
            (Value::string("log"), builtin("math::log", math_log)),
            (Value::string("log2"), builtin("math::log2", math_log2)),
            (Value::string("log10"), builtin("math::log10", math_log10)),
            (Value::string("is_nan"), builtin("math::is_nan", math_is_nan)),
            (Value::string("is_inf"), builtin("math::is_inf", math_is_inf)),
        ]),
    );
}

// === number methods ===

fn number_is_nan(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Boolean(self_number(&arguments)?.is_nan()))
}

fn number_is_inf(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Boolean(self_number(&arguments)?.is_infinite()))
}

fn number_is_integer(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let number = self_number(&arguments)?;
    Ok(Value::Boolean(number.fract() == 0.0))
}

fn number_trunc(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_number(&arguments)?.trunc()))
}

fn number_round(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_number(&arguments)?.round()))
}

fn number_floor(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_number(&arguments)?.floor()))
}

fn number_ceil(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_number(&arguments)?.ceil()))
}

fn install_number_methods(ctx: &Context) {
    ctx.install_method("number", "is_nan", builtin("number::is_nan", number_is_nan));
    ctx.install_method("number", "is_inf", builtin("number::is_inf", number_is_inf));
    ctx.install_method(
        "number",
        "is_integer",
        builtin("number::is_integer", number_is_integer),
    );
    ctx.install_method("number", "trunc", builtin("number::trunc", number_trunc));
    ctx.install_method("number", "round", builtin("number::round", number_round));
    ctx.install_method("number", "floor", builtin("number::floor", number_floor));
    ctx.install_method("number", "ceil", builtin("number::ceil", number_ceil));
}

// === string methods ===

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(haystack.len());
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

fn string_count(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_string(&arguments)?.len() as f64))
}

fn string_contains(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    Ok(Value::Boolean(find_subsequence(&string, target).is_some()))
}

fn string_starts_with(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    Ok(Value::Boolean(string.starts_with(target)))
}

fn string_ends_with(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    Ok(Value::Boolean(string.ends_with(target)))
}

fn string_trim(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let string = self_string(&arguments)?;
    let start = string
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(string.len());
    let end = string
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map(|index| index + 1)
        .unwrap_or(start);
    Ok(Value::string(&string[start..end]))
}

fn string_find(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    match find_subsequence(&string, target) {
        Some(index) => Ok(Value::Number(index as f64)),
        None => Ok(Value::Null),
    }
}

fn string_rfind(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    match rfind_subsequence(&string, target) {
        Some(index) => Ok(Value::Number(index as f64)),
        None => Ok(Value::Null),
    }
}

fn slice_bounds(arguments: &[Value], length: usize, what: &str) -> Result<(usize, usize), Error> {
    let bgn = integer_index(arguments, 1)?;
    let end = integer_index(arguments, 2)?;
    if bgn < 0 {
        return Err(Error::message(None, "slice begin is less than zero"));
    }
    if bgn as usize > length {
        return Err(Error::message(
            None,
            format!("slice begin is greater than the {what} length"),
        ));
    }
    if end < 0 {
        return Err(Error::message(None, "slice end is less than zero"));
    }
    if end as usize > length {
        return Err(Error::message(
            None,
            format!("slice end is greater than the {what} length"),
        ));
    }
    if end < bgn {
        return Err(Error::message(None, "slice end is less than slice begin"));
    }
    Ok((bgn as usize, end as usize))
}

fn string_slice(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 3)?;
    let string = self_string(&arguments)?;
    let (bgn, end) = slice_bounds(&arguments, string.len(), "string")?;
    Ok(Value::string(&string[bgn..end]))
}

fn string_split(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    if target.is_empty() {
        let bytes = string
            .iter()
            .map(|byte| Value::string([*byte]))
            .collect();
        return Ok(Value::vector(bytes));
    }
    let mut pieces = Vec::new();
    let mut rest: &[u8] = &string;
    while let Some(index) = find_subsequence(rest, target) {
        pieces.push(Value::string(&rest[..index]));
        rest = &rest[index + target.len()..];
    }
    pieces.push(Value::string(rest));
    Ok(Value::vector(pieces))
}

fn string_join(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let string = self_string(&arguments)?;
    let vector = arguments[1]
        .as_vector()
        .ok_or_else(|| argument_type_error("vector", 1, &arguments[1]))?;
    let mut data = Vec::new();
    for (index, value) in vector.snapshot().into_iter().enumerate() {
        let Value::Str(bytes) = &value else {
            return Err(Error::message(
                None,
                format!(
                    "expected string-like value for vector element at index {index}, received {}",
                    value.typename()
                ),
            ));
        };
        if index != 0 {
            data.extend_from_slice(&string);
        }
        data.extend_from_slice(bytes);
    }
    Ok(Value::string(data))
}

fn string_replace(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 3)?;
    let string = self_string(&arguments)?;
    let target = string_argument(&arguments, 1)?;
    let replacement = string_argument(&arguments, 2)?;
    if target.is_empty() {
        return Ok(Value::string(string));
    }
    let mut data = Vec::new();
    let mut rest: &[u8] = &string;
    while let Some(index) = find_subsequence(rest, target) {
        data.extend_from_slice(&rest[..index]);
        data.extend_from_slice(replacement);
        rest = &rest[index + target.len()..];
    }
    data.extend_from_slice(rest);
    Ok(Value::string(data))
}

fn string_to_upper(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let string = self_string(&arguments)?;
    Ok(Value::string(
        String::from_utf8_lossy(&string).to_uppercase(),
    ))
}

fn string_to_lower(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let string = self_string(&arguments)?;
    Ok(Value::string(
        String::from_utf8_lossy(&string).to_lowercase(),
    ))
}

fn install_string_methods(ctx: &Context) {
    ctx.install_method("string", "count", builtin("string::count", string_count));
    ctx.install_method(
        "string",
        "contains",
        builtin("string::contains", string_contains),
    );
    ctx.install_method(
        "string",
        "starts_with",
        builtin("string::starts_with", string_starts_with),
    );
    ctx.install_method(
        "string",
        "ends_with",
        builtin("string::ends_with", string_ends_with),
    );
    ctx.install_method("string", "trim", builtin("string::trim", string_trim));
    ctx.install_method("string", "find", builtin("string::find", string_find));
    ctx.install_method("string", "rfind", builtin("string::rfind", string_rfind));
    ctx.install_method("string", "slice", builtin("string::slice", string_slice));
    ctx.install_method("string", "split", builtin("string::split", string_split));
    ctx.install_method("string", "join", builtin("string::join", string_join));
    ctx.install_method(
        "string",
        "replace",
        builtin("string::replace", string_replace),
    );
    ctx.install_method(
        "string",
        "to_upper",
        builtin("string::to_upper", string_to_upper),
    );
    ctx.install_method(
        "string",
        "to_lower",
        builtin("string::to_lower", string_to_lower),
    );
}

// === vector methods ===

fn vector_count(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_vector(&arguments)?.count() as f64))
}

fn vector_contains(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let vector = self_vector(&arguments)?;
    let found = vector
        .snapshot()
        .iter()
        .any(|element| element.equal(&arguments[1]));
    Ok(Value::Boolean(found))
}

fn vector_find(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let vector = self_vector(&arguments)?;
    for (index, element) in vector.snapshot().iter().enumerate() {
        if element.equal(&arguments[1]) {
            return Ok(Value::Number(index as f64));
        }
    }
    Ok(Value::Null)
}

fn vector_rfind(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let vector = self_vector(&arguments)?;
    for (index, element) in vector.snapshot().iter().enumerate().rev() {
        if element.equal(&arguments[1]) {
            return Ok(Value::Number(index as f64));
        }
    }
    Ok(Value::Null)
}

fn vector_push(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let value = arguments[1].copy();
    with_self_vector(&arguments, |vector| {
        vector.push(value);
        Ok(Value::Null)
    })
}

fn vector_pop(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    with_self_vector(&arguments, |vector| {
        vector
            .pop()
            .ok_or_else(|| Error::message(None, "attempted vector::pop on an empty vector"))
    })
}

fn vector_insert(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 3)?;
    let index = integer_index(&arguments, 1)?;
    let value = arguments[2].copy();
    with_self_vector(&arguments, |vector| {
        // Out-of-range indices clamp to the ends.
        let count = vector.count() as i64;
        let index = index.clamp(0, count) as usize;
        vector.insert(index, value);
        Ok(Value::Null)
    })
}

fn vector_remove(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let index = integer_index(&arguments, 1)?;
    let display = arguments[1].clone();
    with_self_vector(&arguments, |vector| {
        if index < 0 || index as usize >= vector.count() {
            return Err(Error::message(
                None,
                format!("attempted vector::remove with invalid index {display}"),
            ));
        }
        vector
            .remove(index as usize)
            .ok_or_else(|| {
                Error::message(
                    None,
                    format!("attempted vector::remove with invalid index {display}"),
                )
            })
    })
}

fn vector_slice(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 3)?;
    let vector = self_vector(&arguments)?;
    let elements = vector.snapshot();
    let (bgn, end) = slice_bounds(&arguments, elements.len(), "vector")?;
    Ok(Value::vector(
        elements[bgn..end].iter().map(Value::copy).collect(),
    ))
}

fn vector_reversed(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    let vector = self_vector(&arguments)?;
    let mut elements = vector.snapshot();
    elements.reverse();
    Ok(Value::vector(elements.iter().map(Value::copy).collect()))
}

fn install_vector_methods(ctx: &Context) {
    ctx.install_method("vector", "count", builtin("vector::count", vector_count));
    ctx.install_method(
        "vector",
        "contains",
        builtin("vector::contains", vector_contains),
    );
    ctx.install_method("vector", "find", builtin("vector::find", vector_find));
    ctx.install_method("vector", "rfind", builtin("vector::rfind", vector_rfind));
    ctx.install_method("vector", "push", builtin("vector::push", vector_push));
    ctx.install_method("vector", "pop", builtin("vector::pop", vector_pop));
    ctx.install_method("vector", "insert", builtin("vector::insert", vector_insert));
    ctx.install_method("vector", "remove", builtin("vector::remove", vector_remove));
    ctx.install_method("vector", "slice", builtin("vector::slice", vector_slice));
    ctx.install_method(
        "vector",
        "reversed",
        builtin("vector::reversed", vector_reversed),
    );
}

// === map methods ===

fn map_count(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_map(&arguments)?.count() as f64))
}

fn map_contains(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    Ok(Value::Boolean(self_map(&arguments)?.contains(&arguments[1])))
}

fn map_insert(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 3)?;
    let key = arguments[1].copy();
    let value = arguments[2].copy();
    with_self_map(&arguments, |map| {
        map.insert(key, value);
        Ok(Value::Null)
    })
}

fn map_remove(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let key = arguments[1].clone();
    with_self_map(&arguments, |map| {
        let value = map.lookup(&key).ok_or_else(|| {
            Error::message(
                None,
                format!("attempted map::remove on a map without key {key}"),
            )
        })?;
        map.remove(&key);
        Ok(value.copy())
    })
}

fn map_union(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let map = self_map(&arguments)?;
    let other = arguments[1]
        .as_map()
        .ok_or_else(|| argument_type_error("map", 1, &arguments[1]))?;
    let mut result = Map::new();
    for (key, value) in map.entries() {
        result.insert(key.copy(), value.copy());
    }
    for (key, value) in other.entries() {
        result.insert(key.copy(), value.copy());
    }
    Ok(Value::Map(result))
}

fn install_map_methods(ctx: &Context) {
    ctx.install_method("map", "count", builtin("map::count", map_count));
    ctx.install_method("map", "contains", builtin("map::contains", map_contains));
    ctx.install_method("map", "insert", builtin("map::insert", map_insert));
    ctx.install_method("map", "remove", builtin("map::remove", map_remove));
    ctx.install_method("map", "union", builtin("map::union", map_union));
}

// === set methods ===

fn set_count(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 1)?;
    Ok(Value::Number(self_set(&arguments)?.count() as f64))
}

fn set_contains(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    Ok(Value::Boolean(self_set(&arguments)?.contains(&arguments[1])))
}

fn set_insert(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let element = arguments[1].copy();
    with_self_set(&arguments, |set| {
        set.insert(element);
        Ok(Value::Null)
    })
}

fn set_remove(_: &Context, arguments: Vec<Value>) -> Result<Value, Error> {
    expect_argument_count(&arguments, 2)?;
    let element = arguments[1].clone();
    with_self_set(&arguments, |set| {
        if !set.remove(&element) {
            return Err(Error::message(
                None,
                format!("attempted set::remove on a set without element {element}"),
            ));
        }
        Ok(Value::Null)
    })
}

fn install_set_methods(ctx: &Context) {
    ctx.install_method("set", "count", builtin("set::count", set_count));
    ctx.install_method("set", "contains", builtin("set::contains", set_contains));
    ctx.install_method("set", "insert", builtin("set::insert", set_insert));
    ctx.install_method("set", "remove", builtin("set::remove", set_remove));
}
