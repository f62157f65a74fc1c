//! Tree-walking evaluator.
//!
//! Expressions evaluate to a value or a runtime error; statements evaluate
//! to an optional control-flow signal (return/break/continue) or an error.
//! Errors accumulate a call trace as they unwind through function calls.

use crate::context::Context;
use crate::env::{EnvRef, Environment};
use crate::error::{Error, Flow, TraceFrame};
use crate::value::{FunctionValue, Record, Reference, TypeValue, Value};
use mellifera_syntax::ast::*;
use mellifera_syntax::token::SourceLocation;
use mellifera_syntax::{escape, quote};
use std::cell::RefCell;
use std::rc::Rc;

type Location = Option<SourceLocation>;

/// Evaluate a program. The result is the value of the last top-level
/// expression statement (null if none was evaluated); a top-level `return`
/// yields its payload.
pub fn eval_program(ctx: &Context, program: &Program, env: &EnvRef) -> Result<Value, Error> {
    let mut result = Value::Null;
    for statement in &program.statements {
        // The result of the last top-level expression statement becomes the
        // result of program execution.
        if let StmtKind::Expression { expression } = &statement.kind {
            result = eval_expr(ctx, expression, env)?;
            continue;
        }
        match eval_stmt(ctx, statement, env)? {
            None => {}
            Some(Flow::Return(value)) => return Ok(value),
            Some(Flow::Break(location)) => {
                return Err(Error::message(
                    location,
                    "attempted to break outside of a loop",
                ));
            }
            Some(Flow::Continue(location)) => {
                return Err(Error::message(
                    location,
                    "attempted to continue outside of a loop",
                ));
            }
        }
    }
    Ok(result)
}

/// Evaluate a block in a fresh lexical scope.
fn eval_block(ctx: &Context, block: &Block, env: &EnvRef) -> Result<Option<Flow>, Error> {
    let env = Environment::with_outer(env.clone());
    for statement in &block.statements {
        if let Some(flow) = eval_stmt(ctx, statement, &env)? {
            return Ok(Some(flow));
        }
    }
    Ok(None)
}

fn eval_stmt(ctx: &Context, stmt: &Stmt, env: &EnvRef) -> Result<Option<Flow>, Error> {
    match &stmt.kind {
        StmtKind::Let {
            identifier,
            expression,
        } => {
            let value = eval_expr(ctx, expression, env)?;
            env.declare(&identifier.name, value.copy());
            Ok(None)
        }
        StmtKind::Assignment { lhs, rhs } => {
            eval_assignment(ctx, &stmt.location, lhs, rhs, env)?;
            Ok(None)
        }
        StmtKind::If {
            conditionals,
            else_block,
        } => {
            for conditional in conditionals {
                let condition = eval_expr(ctx, &conditional.condition, env)?;
                let Some(test) = condition.as_boolean() else {
                    return Err(Error::message(
                        conditional.location.clone(),
                        format!(
                            "conditional with non-boolean type {}",
                            quote(&condition.typename())
                        ),
                    ));
                };
                if test {
                    return eval_block(ctx, &conditional.body, env);
                }
            }
            match else_block {
                Some(block) => eval_block(ctx, block, env),
                None => Ok(None),
            }
        }
        StmtKind::For {
            key,
            value,
            collection,
            block,
        } => eval_for(ctx, stmt, key, value.as_ref(), collection, block, env),
        StmtKind::While { condition, block } => {
            loop {
                let test = eval_expr(ctx, condition, env)?;
                let Some(test) = test.as_boolean() else {
                    return Err(Error::message(
                        stmt.location.clone(),
                        format!(
                            "conditional with non-boolean type {}",
                            quote(&test.typename())
                        ),
                    ));
                };
                if !test {
                    break;
                }
                match eval_block(ctx, block, env)? {
                    None | Some(Flow::Continue(_)) => {}
                    Some(Flow::Break(_)) => break,
                    flow @ Some(Flow::Return(_)) => return Ok(flow),
                }
            }
            Ok(None)
        }
        StmtKind::Break => Ok(Some(Flow::Break(stmt.location.clone()))),
        StmtKind::Continue => Ok(Some(Flow::Continue(stmt.location.clone()))),
        StmtKind::Try {
            try_block,
            catch_identifier,
            catch_block,
        } => match eval_block(ctx, try_block, env) {
            Ok(flow) => Ok(flow),
            Err(error) => {
                let catch_env = Environment::with_outer(env.clone());
                if let Some(identifier) = catch_identifier {
                    catch_env.declare(&identifier.name, error.value);
                }
                eval_block(ctx, catch_block, &catch_env)
            }
        },
        StmtKind::Error { expression } => {
            let value = eval_expr(ctx, expression, env)?;
            Err(Error::new(stmt.location.clone(), value))
        }
        StmtKind::Return { expression } => {
            let value = match expression {
                Some(expression) => eval_expr(ctx, expression, env)?,
                None => Value::Null,
            };
            Ok(Some(Flow::Return(value)))
        }
        StmtKind::Expression { expression } => {
            eval_expr(ctx, expression, env)?;
            Ok(None)
        }
    }
}

fn eval_for(
    ctx: &Context,
    stmt: &Stmt,
    key: &Identifier,
    value: Option<&Identifier>,
    collection: &Expr,
    block: &Block,
    env: &EnvRef,
) -> Result<Option<Flow>, Error> {
    let collection = eval_expr(ctx, collection, env)?.copy();
    let loop_env = Environment::with_outer(env.clone());

    macro_rules! iteration {
        ($body:expr) => {
            match $body? {
                None | Some(Flow::Continue(_)) => {}
                Some(Flow::Break(_)) => return Ok(None),
                flow @ Some(Flow::Return(_)) => return Ok(flow),
            }
        };
    }

    // Records whose type defines `next` drive iteration through it; the end
    // of iteration is signaled by an error with a null payload.
    if let Value::Record(record) = &collection {
        if let Some(next) = record.ty.methods.lookup(&Value::string("next")) {
            if value.is_some() {
                return Err(Error::message(
                    stmt.location.clone(),
                    format!(
                        "attempted key-value iteration over iterator {}",
                        quote(&collection.typename())
                    ),
                ));
            }
            let reference = Reference::new(collection.copy());
            loop {
                let item = call(
                    ctx,
                    &stmt.location,
                    &next,
                    vec![Value::Reference(reference.clone())],
                );
                match item {
                    Err(error) if matches!(error.value, Value::Null) => break,
                    Err(error) => return Err(error),
                    Ok(item) => {
                        loop_env.declare(&key.name, item);
                        iteration!(eval_block(ctx, block, &loop_env));
                    }
                }
            }
            return Ok(None);
        }
    }

    match &collection {
        Value::Number(number) => {
            if value.is_some() {
                return Err(key_value_iteration_error(stmt, &collection));
            }
            if number.fract() != 0.0 {
                return Err(Error::message(
                    stmt.location.clone(),
                    format!(
                        "attempted iteration over non-integer number {}",
                        quote(&collection.to_string())
                    ),
                ));
            }
            for i in 0..(*number as i64) {
                loop_env.declare(&key.name, Value::Number(i as f64));
                iteration!(eval_block(ctx, block, &loop_env));
            }
        }
        Value::Vector(vector) => {
            if value.is_some() {
                return Err(key_value_iteration_error(stmt, &collection));
            }
            for element in vector.snapshot() {
                loop_env.declare(&key.name, element.copy());
                iteration!(eval_block(ctx, block, &loop_env));
            }
        }
        Value::Map(map) => {
            for (k, v) in map.entries() {
                loop_env.declare(&key.name, k.copy());
                if let Some(value) = value {
                    loop_env.declare(&value.name, v.copy());
                }
                iteration!(eval_block(ctx, block, &loop_env));
            }
        }
        Value::Set(set) => {
            if value.is_some() {
                return Err(key_value_iteration_error(stmt, &collection));
            }
            for element in set.elements() {
                loop_env.declare(&key.name, element.copy());
                iteration!(eval_block(ctx, block, &loop_env));
            }
        }
        Value::Record(record) => {
            // A record without `next` iterates like the map it is shaped as.
            for (k, v) in record.data.entries() {
                loop_env.declare(&key.name, k.copy());
                if let Some(value) = value {
                    loop_env.declare(&value.name, v.copy());
                }
                iteration!(eval_block(ctx, block, &loop_env));
            }
        }
        other => {
            return Err(Error::message(
                stmt.location.clone(),
                format!(
                    "attempted iteration over type {}",
                    quote(&other.typename())
                ),
            ));
        }
    }
    Ok(None)
}

fn key_value_iteration_error(stmt: &Stmt, collection: &Value) -> Error {
    Error::message(
        stmt.location.clone(),
        format!(
            "attempted key-value iteration over type {}",
            quote(&collection.typename())
        ),
    )
}

fn eval_expr(ctx: &Context, expr: &Expr, env: &EnvRef) -> Result<Value, Error> {
    let location = &expr.location;
    match &expr.kind {
        ExprKind::Identifier(name) => env.get(name).ok_or_else(|| {
            Error::message(
                location.clone(),
                format!("identifier {} is not defined", quote(name)),
            )
        }),
        ExprKind::Template(parts) => eval_template(ctx, location, parts, env),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Boolean(data) => Ok(Value::Boolean(*data)),
        ExprKind::Number(data) => Ok(Value::Number(*data)),
        ExprKind::Str(data) => Ok(Value::string(data)),
        ExprKind::Regexp(data) => Ok(Value::Regexp(data.clone())),
        ExprKind::Vector(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(eval_expr(ctx, element, env)?.copy());
            }
            Ok(Value::vector(values))
        }
        ExprKind::Map(elements) => {
            let mut pairs = Vec::with_capacity(elements.len());
            for (key, value) in elements {
                let key = eval_expr(ctx, key, env)?.copy();
                let value = eval_expr(ctx, value, env)?.copy();
                pairs.push((key, value));
            }
            Ok(Value::map(pairs))
        }
        ExprKind::Set(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(eval_expr(ctx, element, env)?.copy());
            }
            Ok(Value::set(values))
        }
        ExprKind::Function(literal) => Ok(Value::Function(Rc::new(FunctionValue {
            literal: literal.clone(),
            env: env.clone(),
        }))),
        ExprKind::Type { name, expression } => {
            let value = eval_expr(ctx, expression, env)?;
            match value {
                Value::Map(methods) => Ok(Value::Type(Rc::new(TypeValue {
                    name: name.clone(),
                    methods,
                }))),
                Value::Type(ty) => Ok(Value::Type(Rc::new(TypeValue {
                    name: name.clone(),
                    methods: ty.methods.clone(),
                }))),
                other => Err(Error::message(
                    expression.location.clone(),
                    format!("expected map-like value, received {}", other.typename()),
                )),
            }
        }
        ExprKind::New { meta, expression } => {
            let meta_value = eval_expr(ctx, meta, env)?;
            let value = eval_expr(ctx, expression, env)?;
            match meta_value {
                Value::Type(ty) => match value {
                    Value::Map(data) => Ok(Value::Record(Record { ty, data })),
                    other => Err(Error::message(
                        expression.location.clone(),
                        format!("expected map-like value, received {}", other.typename()),
                    )),
                },
                Value::Map(map) => Err(Error::message(
                    meta.location.clone(),
                    format!(
                        "expected map-like value created with the `type` expression, \
                         received regular map value {}",
                        Value::Map(map)
                    ),
                )),
                other => Err(Error::message(
                    meta.location.clone(),
                    format!("expected map-like value, received {}", other.typename()),
                )),
            }
        }
        ExprKind::Grouped(expression) => eval_expr(ctx, expression, env),
        ExprKind::Unary { op, operand } => eval_unary(ctx, location, *op, operand, env),
        ExprKind::Binary { op, lhs, rhs } => eval_binary(ctx, location, *op, lhs, rhs, env),
        ExprKind::Call {
            function,
            arguments,
        } => {
            // A dot access called directly is a method call: the receiver is
            // passed by reference as an implicit first argument.
            if let ExprKind::Dot { store, field } = &function.kind {
                return eval_method_call(ctx, location, store, field, arguments, env);
            }
            let callee = eval_expr(ctx, function, env)?;
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(eval_expr(ctx, argument, env)?.copy());
            }
            call(ctx, location, &callee, args)
        }
        ExprKind::Index { store, field } => {
            let store = eval_expr(ctx, store, env)?;
            let field = eval_expr(ctx, field, env)?;
            index_get(&store, &field, location)
        }
        ExprKind::Dot { store, field } => {
            let store = eval_expr(ctx, store, env)?;
            match &store {
                Value::Reference(reference) => {
                    let inner = reference.get();
                    method_lookup(ctx, &inner, &field.name).ok_or_else(|| {
                        Error::message(
                            location.clone(),
                            format!(
                                "invalid reference to {} access with field \"{}\"",
                                inner.base_typename(),
                                escape(&field.name)
                            ),
                        )
                    })
                }
                _ => method_lookup(ctx, &store, &field.name).ok_or_else(|| {
                    Error::message(
                        location.clone(),
                        format!(
                            "invalid {} access with field \"{}\"",
                            store.base_typename(),
                            escape(&field.name)
                        ),
                    )
                }),
            }
        }
        ExprKind::Scope { store, field } => {
            let store_value = eval_expr(ctx, store, env)?;
            let key = Value::string(&field.name);
            let lookup = match &store_value {
                Value::Map(map) => map.lookup(&key),
                Value::Type(ty) => ty.methods.lookup(&key),
                Value::Record(record) => record.data.lookup(&key),
                other => {
                    return Err(Error::message(
                        location.clone(),
                        format!(
                            "attempted to access field of type {}",
                            quote(&other.typename())
                        ),
                    ));
                }
            };
            lookup.ok_or_else(|| {
                Error::message(
                    location.clone(),
                    format!("invalid map access with field \"{}\"", escape(&field.name)),
                )
            })
        }
        ExprKind::Mkref(operand) => match resolve_place(ctx, operand, env)? {
            Some(place) if place.path.is_empty() => {
                Ok(Value::Reference(Reference::from_cell(place.slot)))
            }
            Some(place) => {
                let value = place_read(&place, location)?;
                Ok(Value::reference(value))
            }
            None => {
                let value = eval_expr(ctx, operand, env)?;
                Ok(Value::reference(value))
            }
        },
        ExprKind::Deref(operand) => {
            let value = eval_expr(ctx, operand, env)?;
            match value {
                Value::Reference(reference) => Ok(reference.get()),
                other => Err(Error::message(
                    location.clone(),
                    format!(
                        "attempted dereference of non-reference type {}",
                        quote(&other.typename())
                    ),
                )),
            }
        }
    }
}

fn eval_template(
    ctx: &Context,
    location: &Location,
    parts: &[TemplatePart],
    env: &EnvRef,
) -> Result<Value, Error> {
    let mut output: Vec<u8> = Vec::new();
    for part in parts {
        match part {
            TemplatePart::Text(bytes) => output.extend_from_slice(bytes),
            TemplatePart::Expression(expression) => {
                let child = Environment::with_outer(env.clone());
                let mut result = eval_expr(ctx, expression, &child)?;
                // A record type may customize interpolation with an
                // `into_string` method.
                if let Value::Record(record) = &result {
                    if let Some(metafunction) =
                        record.ty.methods.lookup(&Value::string("into_string"))
                    {
                        let converted = call(
                            ctx,
                            location,
                            &metafunction,
                            vec![Value::reference(result.copy())],
                        )?;
                        if !matches!(converted, Value::Str(_)) {
                            return Err(Error::message(
                                None,
                                format!("metafunction `into_string` returned {converted}"),
                            ));
                        }
                        result = converted;
                    }
                }
                match &result {
                    Value::Str(bytes) => output.extend_from_slice(bytes),
                    other => output.extend_from_slice(other.to_string().as_bytes()),
                }
            }
        }
    }
    Ok(Value::string(output))
}

fn eval_unary(
    ctx: &Context,
    location: &Location,
    op: UnaryOp,
    operand: &Expr,
    env: &EnvRef,
) -> Result<Value, Error> {
    let value = eval_expr(ctx, operand, env)?;
    match (op, &value) {
        (UnaryOp::Positive, Value::Number(n)) => Ok(Value::Number(*n)),
        (UnaryOp::Negative, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        _ => Err(Error::message(
            location.clone(),
            format!(
                "attempted unary {} operation with type {}",
                op.symbol(),
                quote(&value.typename())
            ),
        )),
    }
}

fn eval_binary(
    ctx: &Context,
    location: &Location,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    env: &EnvRef,
) -> Result<Value, Error> {
    // Boolean operators short-circuit on either operand.
    if op == BinaryOp::And {
        let lhs = eval_expr(ctx, lhs, env)?;
        if lhs.as_boolean() == Some(false) {
            return Ok(Value::Boolean(false));
        }
        let rhs = eval_expr(ctx, rhs, env)?;
        if rhs.as_boolean() == Some(false) {
            return Ok(Value::Boolean(false));
        }
        return match (lhs.as_boolean(), rhs.as_boolean()) {
            (Some(a), Some(b)) => Ok(Value::Boolean(a && b)),
            _ => Err(binary_type_error(location, "binary and", &lhs, &rhs)),
        };
    }
    if op == BinaryOp::Or {
        let lhs = eval_expr(ctx, lhs, env)?;
        if lhs.as_boolean() == Some(true) {
            return Ok(Value::Boolean(true));
        }
        let rhs = eval_expr(ctx, rhs, env)?;
        if rhs.as_boolean() == Some(true) {
            return Ok(Value::Boolean(true));
        }
        return match (lhs.as_boolean(), rhs.as_boolean()) {
            (Some(a), Some(b)) => Ok(Value::Boolean(a || b)),
            _ => Err(binary_type_error(location, "binary or", &lhs, &rhs)),
        };
    }

    let lhs = eval_expr(ctx, lhs, env)?;
    let rhs = eval_expr(ctx, rhs, env)?;
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(lhs.equal(&rhs))),
        BinaryOp::Ne => Ok(Value::Boolean(!lhs.equal(&rhs))),
        BinaryOp::Le | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Gt => {
            let result = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => match op {
                    BinaryOp::Le => a <= b,
                    BinaryOp::Ge => a >= b,
                    BinaryOp::Lt => a < b,
                    _ => a > b,
                },
                (Value::Str(a), Value::Str(b)) => match op {
                    BinaryOp::Le => a <= b,
                    BinaryOp::Ge => a >= b,
                    BinaryOp::Lt => a < b,
                    _ => a > b,
                },
                _ => return Err(binary_type_error(location, op.symbol(), &lhs, &rhs)),
            };
            Ok(Value::Boolean(result))
        }
        BinaryOp::EqRe | BinaryOp::NeRe => match (&lhs, &rhs) {
            (Value::Str(text), Value::Regexp(regexp)) => {
                let matched = regexp.pattern.is_match(text);
                Ok(Value::Boolean(if op == BinaryOp::EqRe {
                    matched
                } else {
                    !matched
                }))
            }
            _ => Err(binary_type_error(location, op.symbol(), &lhs, &rhs)),
        },
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => {
                let mut bytes = a.to_vec();
                bytes.extend_from_slice(b);
                Ok(Value::string(bytes))
            }
            (Value::Vector(a), Value::Vector(b)) => {
                let mut elements = a.snapshot();
                elements.extend(b.snapshot());
                Ok(Value::vector(elements))
            }
            _ => Err(binary_type_error(location, "+", &lhs, &rhs)),
        },
        BinaryOp::Sub => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            _ => Err(binary_type_error(location, "-", &lhs, &rhs)),
        },
        BinaryOp::Mul => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            _ => Err(binary_type_error(location, "*", &lhs, &rhs)),
        },
        BinaryOp::Div => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                if *b == 0.0 {
                    return Err(Error::message(location.clone(), "division by zero"));
                }
                Ok(Value::Number(a / b))
            }
            _ => Err(binary_type_error(location, "/", &lhs, &rhs)),
        },
        BinaryOp::Rem => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                if *b == 0.0 {
                    return Err(Error::message(
                        location.clone(),
                        "remainder with divisor zero",
                    ));
                }
                // Same sign as the dividend, as in C.
                Ok(Value::Number(a % b))
            }
            _ => Err(binary_type_error(location, "%", &lhs, &rhs)),
        },
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn binary_type_error(location: &Location, symbol: &str, lhs: &Value, rhs: &Value) -> Error {
    Error::message(
        location.clone(),
        format!(
            "attempted {} operation with types {} and {}",
            symbol,
            quote(&lhs.typename()),
            quote(&rhs.typename())
        ),
    )
}

/// Call a function or builtin value with already-evaluated arguments.
pub fn call(
    ctx: &Context,
    location: &Location,
    function: &Value,
    arguments: Vec<Value>,
) -> Result<Value, Error> {
    match function {
        Value::Builtin(builtin) => {
            tracing::trace!(name = builtin.name, "calling builtin");
            (builtin.f)(ctx, arguments).map_err(|mut error| {
                error.trace.push(TraceFrame {
                    location: location.clone(),
                    function: function.clone(),
                });
                error
            })
        }
        Value::Function(f) => {
            tracing::trace!(function = %f.display_name(), "calling function");
            if arguments.len() != f.literal.parameters.len() {
                return Err(Error::message(
                    location.clone(),
                    format!(
                        "invalid function argument count (expected {}, received {})",
                        f.literal.parameters.len(),
                        arguments.len()
                    ),
                ));
            }
            let env = Environment::with_outer(f.env.clone());
            for (parameter, argument) in f.literal.parameters.iter().zip(arguments) {
                env.declare(&parameter.name, argument);
            }
            match eval_block(ctx, &f.literal.body, &env) {
                Ok(None) => Ok(Value::Null),
                Ok(Some(Flow::Return(value))) => Ok(value),
                Ok(Some(Flow::Break(l))) => {
                    Err(Error::message(l, "attempted to break outside of a loop"))
                }
                Ok(Some(Flow::Continue(l))) => {
                    Err(Error::message(l, "attempted to continue outside of a loop"))
                }
                Err(mut error) => {
                    error.trace.push(TraceFrame {
                        location: location.clone(),
                        function: function.clone(),
                    });
                    Err(error)
                }
            }
        }
        other => Err(Error::message(
            location.clone(),
            format!(
                "attempted to call non-function type {} with value {}",
                quote(&other.typename()),
                other
            ),
        )),
    }
}

/// Look up a method on a value: map entries first, then record data, the
/// record's type, or the context's per-typename method table.
fn method_lookup(ctx: &Context, value: &Value, name: &str) -> Option<Value> {
    let key = Value::string(name);
    match value {
        Value::Map(map) => map
            .lookup(&key)
            .or_else(|| ctx.method("map", name)),
        Value::Record(record) => record
            .data
            .lookup(&key)
            .or_else(|| record.ty.methods.lookup(&key)),
        Value::Type(ty) => ty.methods.lookup(&key),
        Value::Reference(_) => None,
        other => ctx.method(other.base_typename(), name),
    }
}

fn eval_method_call(
    ctx: &Context,
    location: &Location,
    store: &Expr,
    field: &Identifier,
    argument_exprs: &[Expr],
    env: &EnvRef,
) -> Result<Value, Error> {
    let place = resolve_place(ctx, store, env)?;
    let receiver = match &place {
        Some(place) => place_read(place, location)?,
        None => eval_expr(ctx, store, env)?,
    };

    // Reference receivers are implicitly dereferenced for the lookup and
    // passed through as the self argument, so mutation lands in the
    // referenced cell. Other receivers get a fresh cell whose final content
    // is written back to the receiver's place if the method mutated it.
    let (function, self_ref, write_back) = match &receiver {
        Value::Reference(inner) => {
            let target = inner.get();
            (method_lookup(ctx, &target, &field.name), inner.clone(), false)
        }
        _ => (
            method_lookup(ctx, &receiver, &field.name),
            Reference::new(receiver.copy()),
            place.is_some(),
        ),
    };
    let Some(function) = function else {
        return Err(Error::message(
            location.clone(),
            format!(
                "invalid method access with name \"{}\"",
                escape(&field.name)
            ),
        ));
    };

    let mut arguments = vec![Value::Reference(self_ref.clone())];
    for expr in argument_exprs {
        arguments.push(eval_expr(ctx, expr, env)?.copy());
    }
    let result = call(ctx, location, &function, arguments);

    if write_back {
        let after = self_ref.get();
        if !after.identical(&receiver) {
            if let Some(place) = &place {
                place_write(place, after, location)?;
            }
        }
    }
    result
}

// === Places ===
//
// A place is a storage location an assignment or a by-reference method call
// can target: an environment slot plus a path of index/field/dereference
// steps into it. Writes copy-on-write every container along the path.

enum PathSeg {
    Index(Value),
    Field(String),
    Deref,
}

struct Place {
    slot: Rc<RefCell<Value>>,
    path: Vec<PathSeg>,
}

/// Resolve an expression into a place. Expressions with no storage (calls,
/// literals, operators) resolve to `None`; a place rooted at one of those
/// still resolves, anchored at a temporary cell.
fn resolve_place(ctx: &Context, expr: &Expr, env: &EnvRef) -> Result<Option<Place>, Error> {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            let slot = env.slot(name).ok_or_else(|| {
                Error::message(
                    expr.location.clone(),
                    format!("identifier {} is not defined", quote(name)),
                )
            })?;
            Ok(Some(Place {
                slot,
                path: Vec::new(),
            }))
        }
        ExprKind::Grouped(inner) => resolve_place(ctx, inner, env),
        ExprKind::Index { store, field } => {
            let base = resolve_place(ctx, store, env)?;
            let field = eval_expr(ctx, field, env)?;
            Ok(Some(extend_place(
                ctx,
                base,
                store,
                PathSeg::Index(field),
                env,
            )?))
        }
        ExprKind::Dot { store, field } | ExprKind::Scope { store, field } => {
            let base = resolve_place(ctx, store, env)?;
            Ok(Some(extend_place(
                ctx,
                base,
                store,
                PathSeg::Field(field.name.clone()),
                env,
            )?))
        }
        ExprKind::Deref(inner) => {
            let base = resolve_place(ctx, inner, env)?;
            Ok(Some(extend_place(ctx, base, inner, PathSeg::Deref, env)?))
        }
        _ => Ok(None),
    }
}

fn extend_place(
    ctx: &Context,
    base: Option<Place>,
    store: &Expr,
    seg: PathSeg,
    env: &EnvRef,
) -> Result<Place, Error> {
    let mut place = match base {
        Some(place) => place,
        // Rooted at an rvalue: anchor the path at a temporary cell so the
        // access still evaluates (mutations are discarded with it).
        None => Place {
            slot: Rc::new(RefCell::new(eval_expr(ctx, store, env)?)),
            path: Vec::new(),
        },
    };
    place.path.push(seg);
    Ok(place)
}

/// Read the value a place currently holds.
fn place_read(place: &Place, location: &Location) -> Result<Value, Error> {
    let mut current = place.slot.borrow().clone();
    for seg in &place.path {
        current = match seg {
            PathSeg::Index(field) => index_get(&current, field, location)?,
            PathSeg::Field(name) => field_get(&current, name, location)?,
            PathSeg::Deref => match current {
                Value::Reference(reference) => reference.get(),
                other => {
                    return Err(Error::message(
                        location.clone(),
                        format!(
                            "attempted dereference of non-reference type {}",
                            quote(&other.typename())
                        ),
                    ));
                }
            },
        };
    }
    Ok(current)
}

/// Write a value into a place, copy-on-writing every container on the path.
fn place_write(place: &Place, value: Value, location: &Location) -> Result<(), Error> {
    if place.path.is_empty() {
        *place.slot.borrow_mut() = value;
        return Ok(());
    }
    let mut slot = place.slot.borrow_mut();
    write_path(&mut *slot, &place.path, value, location)
}

fn write_path(
    container: &mut Value,
    path: &[PathSeg],
    value: Value,
    location: &Location,
) -> Result<(), Error> {
    let (seg, rest) = match path.split_first() {
        Some(split) => split,
        None => {
            *container = value;
            return Ok(());
        }
    };

    // Field access through a reference lands in the referenced cell.
    if let Value::Reference(reference) = container {
        if matches!(seg, PathSeg::Field(_)) {
            let cell = reference.cell().clone();
            let mut inner = cell.borrow_mut();
            return write_path(&mut *inner, path, value, location);
        }
    }

    match seg {
        PathSeg::Deref => match container {
            Value::Reference(reference) => {
                let cell = reference.cell().clone();
                let mut inner = cell.borrow_mut();
                write_path(&mut *inner, rest, value, location)
            }
            other => Err(Error::message(
                location.clone(),
                format!(
                    "attempted dereference of non-reference type {}",
                    quote(&other.typename())
                ),
            )),
        },
        PathSeg::Index(field) => {
            container.cow();
            if rest.is_empty() {
                return assign_index(container, field, value, location);
            }
            match container {
                Value::Vector(vector) => {
                    let index = vector_index(field, vector.count()).ok_or_else(|| {
                        invalid_vector_index(location, field)
                    })?;
                    vector
                        .with_element_mut(index, |element| {
                            write_path(element, rest, value, location)
                        })
                        .unwrap_or_else(|| Err(invalid_vector_index(location, field)))
                }
                Value::Map(map) => map
                    .with_value_mut(field, |element| write_path(element, rest, value, location))
                    .unwrap_or_else(|| Err(invalid_map_field(location, field))),
                Value::Record(record) => record
                    .data
                    .with_value_mut(field, |element| write_path(element, rest, value, location))
                    .unwrap_or_else(|| Err(invalid_map_field(location, field))),
                other => Err(access_type_error(location, other, field)),
            }
        }
        PathSeg::Field(name) => {
            container.cow();
            let key = Value::string(name.as_bytes());
            if rest.is_empty() {
                return assign_field(container, name, value, location);
            }
            match container {
                Value::Map(map) => map
                    .with_value_mut(&key, |element| write_path(element, rest, value, location))
                    .unwrap_or_else(|| Err(invalid_map_field(location, &key))),
                Value::Record(record) => record
                    .data
                    .with_value_mut(&key, |element| write_path(element, rest, value, location))
                    .unwrap_or_else(|| Err(invalid_map_field(location, &key))),
                other => Err(access_type_error(location, other, &key)),
            }
        }
    }
}

fn assign_index(
    container: &mut Value,
    field: &Value,
    value: Value,
    location: &Location,
) -> Result<(), Error> {
    match container {
        Value::Vector(vector) => {
            let index = vector_index(field, vector.count())
                .ok_or_else(|| invalid_vector_index(location, field))?;
            vector.set(index, value);
            Ok(())
        }
        Value::Map(map) => {
            map.insert(field.copy(), value);
            Ok(())
        }
        Value::Record(record) => {
            record.data.insert(field.copy(), value);
            Ok(())
        }
        Value::Type(ty) => Err(Error::message(
            location.clone(),
            format!("attempted to modify metamap {}", Value::Type(ty.clone())),
        )),
        other => Err(access_type_error(location, other, field)),
    }
}

fn assign_field(
    container: &mut Value,
    name: &str,
    value: Value,
    location: &Location,
) -> Result<(), Error> {
    let key = Value::string(name.as_bytes());
    match container {
        Value::Map(map) => {
            map.insert(key, value);
            Ok(())
        }
        Value::Record(record) => {
            record.data.insert(key, value);
            Ok(())
        }
        Value::Type(ty) => Err(Error::message(
            location.clone(),
            format!("attempted to modify metamap {}", Value::Type(ty.clone())),
        )),
        other => Err(access_type_error(location, other, &key)),
    }
}

fn access_type_error(location: &Location, store: &Value, field: &Value) -> Error {
    Error::message(
        location.clone(),
        format!(
            "attempted access into type {} with type {}",
            quote(&store.typename()),
            quote(&field.typename())
        ),
    )
}

fn invalid_vector_index(location: &Location, field: &Value) -> Error {
    Error::message(
        location.clone(),
        format!("invalid vector access with index {field}"),
    )
}

fn invalid_map_field(location: &Location, field: &Value) -> Error {
    Error::message(
        location.clone(),
        format!("invalid map access with field {field}"),
    )
}

fn vector_index(field: &Value, count: usize) -> Option<usize> {
    let number = field.as_number()?;
    if number.fract() != 0.0 || number < 0.0 {
        return None;
    }
    let index = number as usize;
    (index < count).then_some(index)
}

/// Evaluate `store[field]`.
fn index_get(store: &Value, field: &Value, location: &Location) -> Result<Value, Error> {
    match store {
        Value::Vector(vector) => {
            let index = vector_index(field, vector.count())
                .ok_or_else(|| invalid_vector_index(location, field))?;
            vector
                .get(index)
                .ok_or_else(|| invalid_vector_index(location, field))
        }
        Value::Map(map) => map
            .lookup(field)
            .ok_or_else(|| invalid_map_field(location, field)),
        Value::Record(record) => record
            .data
            .lookup(field)
            .ok_or_else(|| invalid_map_field(location, field)),
        Value::Type(ty) => ty
            .methods
            .lookup(field)
            .ok_or_else(|| invalid_map_field(location, field)),
        _ => Err(Error::message(
            location.clone(),
            format!(
                "attempted to access field of type {} with type {}",
                quote(&store.typename()),
                quote(&field.typename())
            ),
        )),
    }
}

/// Evaluate a data field access for place reading (`a.b` on the way to
/// `a.b.c = ...`). References dereference implicitly.
fn field_get(store: &Value, name: &str, location: &Location) -> Result<Value, Error> {
    let key = Value::string(name.as_bytes());
    match store {
        Value::Map(map) => map
            .lookup(&key)
            .ok_or_else(|| invalid_map_field(location, &key)),
        Value::Record(record) => record
            .data
            .lookup(&key)
            .ok_or_else(|| invalid_map_field(location, &key)),
        Value::Type(ty) => ty
            .methods
            .lookup(&key)
            .ok_or_else(|| invalid_map_field(location, &key)),
        Value::Reference(reference) => {
            let inner = reference.get();
            field_get(&inner, name, location).map_err(|_| {
                Error::message(
                    location.clone(),
                    format!(
                        "invalid reference to {} access with field \"{}\"",
                        inner.base_typename(),
                        escape(name)
                    ),
                )
            })
        }
        other => Err(Error::message(
            location.clone(),
            format!(
                "invalid {} access with field \"{}\"",
                other.base_typename(),
                escape(name)
            ),
        )),
    }
}

fn eval_assignment(
    ctx: &Context,
    location: &Location,
    lhs: &Expr,
    rhs: &Expr,
    env: &EnvRef,
) -> Result<(), Error> {
    match &lhs.kind {
        ExprKind::Identifier(name) => {
            let slot = env.slot(name).ok_or_else(|| {
                Error::message(
                    location.clone(),
                    format!("identifier {} is not defined", quote(name)),
                )
            })?;
            let value = eval_expr(ctx, rhs, env)?;
            *slot.borrow_mut() = value.copy();
            Ok(())
        }
        ExprKind::Index { .. }
        | ExprKind::Dot { .. }
        | ExprKind::Scope { .. }
        | ExprKind::Deref(_) => {
            let Some(place) = resolve_place(ctx, lhs, env)? else {
                return Err(Error::message(
                    location.clone(),
                    "attempted assignment to non-lvalue",
                ));
            };
            let value = eval_expr(ctx, rhs, env)?;
            place_write(&place, value.copy(), location)
        }
        _ => Err(Error::message(
            location.clone(),
            "attempted assignment to non-lvalue",
        )),
    }
}
