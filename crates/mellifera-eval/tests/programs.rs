//! End-to-end program scenarios exercising the lexer, parser, and evaluator
//! together through the public crate surface.

use mellifera_eval::{eval_program, eval_source, Context, Environment, SourceError, Value};
use mellifera_syntax::SourceLocation;

fn eval(source: &str) -> Result<Value, SourceError> {
    let ctx = Context::new();
    eval_source(&ctx, source, None, None)
}

fn eval_ok(source: &str) -> Value {
    eval(source).expect("evaluation succeeds")
}

#[test]
fn trivial_program_evaluates_to_null() {
    assert_eq!(eval_ok("null;"), Value::Null);
}

#[test]
fn program_result_is_last_top_level_expression() {
    assert_eq!(eval_ok("1; \"two\"; [3];"), Value::vector(vec![Value::Number(3.0)]));
}

#[test]
fn parse_errors_carry_locations() {
    let ctx = Context::new();
    let error = eval_source(
        &ctx,
        "let x = ;",
        Some(SourceLocation::file("main.mf")),
        None,
    )
    .expect_err("expected parse error");
    let SourceError::Parse(error) = error else {
        panic!("expected parse error, got {error:?}");
    };
    assert_eq!(error.to_string(), "[main.mf:1] expected expression, found ;");
}

#[test]
fn runtime_errors_carry_locations() {
    let ctx = Context::new();
    let error = eval_source(
        &ctx,
        "let x = 1;\nx / 0;",
        Some(SourceLocation::file("main.mf")),
        None,
    )
    .expect_err("expected runtime error");
    let SourceError::Runtime(error) = error else {
        panic!("expected runtime error, got {error:?}");
    };
    assert_eq!(error.to_string(), "division by zero");
    assert_eq!(error.location.as_ref().map(|l| l.line), Some(2));
}

#[test]
fn vector_survives_copy_mutate_undo_cycle() {
    let source = "\
        let a = [[\"foo\", {\"bar\": 123}], \"baz\"];\n\
        let b = a;\n\
        b[1] = \"changed\";\n\
        b[1] = \"baz\";\n\
        [a == b, a];";
    let result = eval_ok(source);
    let expected = Value::vector(vec![
        Value::Boolean(true),
        Value::vector(vec![
            Value::vector(vec![
                Value::string("foo"),
                Value::map(vec![(Value::string("bar"), Value::Number(123.0))]),
            ]),
            Value::string("baz"),
        ]),
    ]);
    assert!(result.equal(&expected), "got {result}");
}

#[test]
fn map_copy_on_write_isolates_insert() {
    // Assignment copies and index assignment copy-on-writes, so mutating b
    // must leave a untouched.
    let source = "\
        let a = {123.456: \"abc\", \"foo\": \"def\", []: \"hij\"};\n\
        let b = a;\n\
        b[123.456] = null;\n\
        [a[123.456], b[123.456]];";
    assert_eq!(
        eval_ok(source),
        Value::vector(vec![Value::string("abc"), Value::Null])
    );
}

#[test]
fn map_insertion_order_is_preserved_through_eval() {
    let source = "let m = {\"z\": 1, \"a\": 2, \"m\": 3}; m;";
    assert_eq!(
        eval_ok(source).to_string(),
        "{\"z\": 1, \"a\": 2, \"m\": 3}"
    );
}

#[test]
fn reinsertion_keeps_map_position() {
    let source = "let m = {\"z\": 1, \"a\": 2}; m[\"z\"] = 9; m;";
    assert_eq!(eval_ok(source).to_string(), "{\"z\": 9, \"a\": 2}");
}

#[test]
fn closures_capture_their_environment() {
    let source = "\
        let make_adder = function(n) {\n\
            return function(x) { return x + n; };\n\
        };\n\
        let add2 = make_adder(2);\n\
        let add3 = make_adder(3);\n\
        [add2(10), add3(10)];";
    assert_eq!(
        eval_ok(source),
        Value::vector(vec![Value::Number(12.0), Value::Number(13.0)])
    );
}

#[test]
fn errors_propagate_through_nested_calls_with_trace() {
    let ctx = Context::new();
    let source = "\
        let level1 = function() { error \"deep failure\"; };\n\
        let level2 = function() { level1(); };\n\
        let level3 = function() { level2(); };\n\
        level3();";
    let error = eval_source(&ctx, source, Some(SourceLocation::file("main.mf")), None)
        .expect_err("expected runtime error");
    let SourceError::Runtime(error) = error else {
        panic!("expected runtime error, got {error:?}");
    };
    assert_eq!(error.to_string(), "deep failure");
    assert_eq!(error.trace.len(), 3);
    // Frames unwind innermost-first, each carrying its call site.
    let lines: Vec<_> = error
        .trace
        .iter()
        .map(|frame| frame.location.as_ref().map(|l| l.line))
        .collect();
    assert_eq!(lines, vec![Some(2), Some(3), Some(4)]);
}

#[test]
fn try_catch_recovers_and_binds_payload() {
    let source = "\
        let safe_div = function(a, b) {\n\
            try {\n\
                return a / b;\n\
            } catch e {\n\
                return e;\n\
            }\n\
        };\n\
        [safe_div(10, 2), safe_div(1, 0)];";
    assert_eq!(
        eval_ok(source),
        Value::vector(vec![
            Value::Number(5.0),
            Value::string("division by zero")
        ])
    );
}

#[test]
fn base_environment_extension_point() {
    // The host installs state into the base environment before evaluation.
    let ctx = Context::new();
    ctx.install("answer", Value::Number(42.0));
    let program = mellifera_syntax::parse("answer;", None).expect("parse");
    let env = Environment::with_outer(ctx.base_environment().clone());
    assert_eq!(
        eval_program(&ctx, &program, &env).expect("eval"),
        Value::Number(42.0)
    );
}

#[test]
fn host_builtins_receive_arguments() {
    fn sum(_: &Context, arguments: Vec<Value>) -> Result<Value, mellifera_eval::Error> {
        let mut total = 0.0;
        for argument in &arguments {
            total += argument.as_number().unwrap_or(0.0);
        }
        Ok(Value::Number(total))
    }
    let ctx = Context::new();
    ctx.install(
        "sum",
        Value::Builtin(mellifera_eval::Builtin { name: "sum", f: sum }),
    );
    assert_eq!(
        eval_source(&ctx, "sum(1, 2, 3);", None, None).expect("eval"),
        Value::Number(6.0)
    );
}

#[test]
fn builtin_errors_gain_trace_frames() {
    fn explode(_: &Context, _: Vec<Value>) -> Result<Value, mellifera_eval::Error> {
        Err(mellifera_eval::Error::message(None, "kaboom"))
    }
    let ctx = Context::new();
    ctx.install(
        "explode",
        Value::Builtin(mellifera_eval::Builtin {
            name: "explode",
            f: explode,
        }),
    );
    let error = eval_source(&ctx, "explode();", None, None).expect_err("expected error");
    let SourceError::Runtime(error) = error else {
        panic!("expected runtime error");
    };
    assert_eq!(error.trace.len(), 1);
    assert_eq!(error.trace[0].function.to_string(), "explode@builtin");
}

#[test]
fn method_tables_dispatch_on_typename() {
    fn double(
        _: &Context,
        arguments: Vec<Value>,
    ) -> Result<Value, mellifera_eval::Error> {
        let reference = arguments[0]
            .as_reference()
            .ok_or_else(|| mellifera_eval::Error::message(None, "expected reference"))?;
        let number = reference
            .get()
            .as_number()
            .ok_or_else(|| mellifera_eval::Error::message(None, "expected number"))?;
        Ok(Value::Number(number * 2.0))
    }
    let ctx = Context::new();
    ctx.install_method(
        "number",
        "double",
        Value::Builtin(mellifera_eval::Builtin {
            name: "number::double",
            f: double,
        }),
    );
    assert_eq!(
        eval_source(&ctx, "let n = 21; n.double();", None, None).expect("eval"),
        Value::Number(42.0)
    );
}

#[test]
fn shadowing_in_nested_scopes() {
    let source = "\
        let x = 1;\n\
        let f = function() {\n\
            let x = 2;\n\
            return x;\n\
        };\n\
        [f(), x];";
    assert_eq!(
        eval_ok(source),
        Value::vector(vec![Value::Number(2.0), Value::Number(1.0)])
    );
}

#[test]
fn evaluation_order_is_left_to_right() {
    let source = "\
        let order = \"\";\n\
        let tick = function(n) { order = $\"{order}{n}\"; return n; };\n\
        tick(1) + tick(2) * tick(3);\n\
        order;";
    assert_eq!(eval_ok(source), Value::string("123"));
}

#[test]
fn template_strings_interpolate_in_child_scope() {
    let source = "\
        let name = \"bee\";\n\
        $\"hello {name}, {1 + 1} times\";";
    assert_eq!(eval_ok(source), Value::string("hello bee, 2 times"));
}

#[test]
fn records_with_into_string_customize_templates() {
    let source = "\
        let color = type {\n\
            \"into_string\": function(self) { return \"#\" + self.hex; },\n\
        };\n\
        let c = new color {\"hex\": \"ff0000\"};\n\
        $\"paint it {c}\";";
    assert_eq!(eval_ok(source), Value::string("paint it #ff0000"));
}

#[test]
fn hex_and_decimal_numbers() {
    assert_eq!(eval_ok("0xff;"), Value::Number(255.0));
    assert_eq!(eval_ok("0x10 + 1.5;"), Value::Number(17.5));
}

#[test]
fn raw_strings_do_not_process_escapes() {
    assert_eq!(eval_ok("`a\\nb`;"), Value::string("a\\nb"));
    assert_eq!(eval_ok("\"a\\nb\";"), Value::string("a\nb"));
}
