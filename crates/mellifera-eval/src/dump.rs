//! Conversion of tokens and AST nodes into values for comb-encoded dumps.

use crate::value::Value;
use mellifera_syntax::ast::*;
use mellifera_syntax::token::{SourceLocation, Token};

fn location_into_value(location: &Option<SourceLocation>) -> Value {
    match location {
        None => Value::Null,
        Some(location) => Value::map(vec![
            (
                Value::string("file"),
                match &location.file {
                    Some(file) => Value::string(file.as_bytes()),
                    None => Value::Null,
                },
            ),
            (Value::string("line"), Value::Number(location.line.into())),
        ]),
    }
}

/// Convert a token into a `{kind, literal, location}` map.
pub fn token_into_value(token: &Token) -> Value {
    Value::map(vec![
        (Value::string("kind"), Value::string(token.kind.to_string())),
        (Value::string("literal"), Value::string(&token.literal)),
        (
            Value::string("location"),
            location_into_value(&token.location),
        ),
    ])
}

/// Convert a token stream into a vector of token maps.
pub fn tokens_into_value(tokens: &[Token]) -> Value {
    Value::vector(tokens.iter().map(token_into_value).collect())
}

fn node(kind: &str, location: &Option<SourceLocation>, fields: Vec<(&str, Value)>) -> Value {
    let mut pairs = vec![
        (Value::string("kind"), Value::string(kind)),
        (Value::string("location"), location_into_value(location)),
    ];
    for (name, value) in fields {
        pairs.push((Value::string(name), value));
    }
    Value::map(pairs)
}

/// Convert a program into a value tree for dumping.
pub fn program_into_value(program: &Program) -> Value {
    let statements = program.statements.iter().map(stmt_into_value).collect();
    node(
        "AstProgram",
        &program.location,
        vec![("statements", Value::vector(statements))],
    )
}

fn block_into_value(block: &Block) -> Value {
    let statements = block.statements.iter().map(stmt_into_value).collect();
    node(
        "AstBlock",
        &block.location,
        vec![("statements", Value::vector(statements))],
    )
}

fn identifier_into_value(identifier: &Identifier) -> Value {
    node(
        "AstIdentifier",
        &identifier.location,
        vec![("name", Value::string(&identifier.name))],
    )
}

fn stmt_into_value(stmt: &Stmt) -> Value {
    match &stmt.kind {
        StmtKind::Let {
            identifier,
            expression,
        } => node(
            "AstStatementLet",
            &stmt.location,
            vec![
                ("identifier", identifier_into_value(identifier)),
                ("expression", expr_into_value(expression)),
            ],
        ),
        StmtKind::Assignment { lhs, rhs } => node(
            "AstStatementAssignment",
            &stmt.location,
            vec![("lhs", expr_into_value(lhs)), ("rhs", expr_into_value(rhs))],
        ),
        StmtKind::If {
            conditionals,
            else_block,
        } => {
            let conditionals = conditionals
                .iter()
                .map(|conditional| {
                    node(
                        "AstConditional",
                        &conditional.location,
                        vec![
                            ("condition", expr_into_value(&conditional.condition)),
                            ("body", block_into_value(&conditional.body)),
                        ],
                    )
                })
                .collect();
            node(
                "AstStatementIfElifElse",
                &stmt.location,
                vec![
                    ("conditionals", Value::vector(conditionals)),
                    (
                        "else_block",
                        else_block.as_ref().map(block_into_value).unwrap_or(Value::Null),
                    ),
                ],
            )
        }
        StmtKind::For {
            key,
            value,
            collection,
            block,
        } => node(
            "AstStatementFor",
            &stmt.location,
            vec![
                ("identifier_k", identifier_into_value(key)),
                (
                    "identifier_v",
                    value
                        .as_ref()
                        .map(identifier_into_value)
                        .unwrap_or(Value::Null),
                ),
                ("collection", expr_into_value(collection)),
                ("block", block_into_value(block)),
            ],
        ),
        StmtKind::While { condition, block } => node(
            "AstStatementWhile",
            &stmt.location,
            vec![
                ("expression", expr_into_value(condition)),
                ("block", block_into_value(block)),
            ],
        ),
        StmtKind::Break => node("AstStatementBreak", &stmt.location, vec![]),
        StmtKind::Continue => node("AstStatementContinue", &stmt.location, vec![]),
        StmtKind::Try {
            try_block,
            catch_identifier,
            catch_block,
        } => node(
            "AstStatementTry",
            &stmt.location,
            vec![
                ("try_block", block_into_value(try_block)),
                (
                    "catch_identifier",
                    catch_identifier
                        .as_ref()
                        .map(identifier_into_value)
                        .unwrap_or(Value::Null),
                ),
                ("catch_block", block_into_value(catch_block)),
            ],
        ),
        StmtKind::Error { expression } => node(
            "AstStatementError",
            &stmt.location,
            vec![("expression", expr_into_value(expression))],
        ),
        StmtKind::Return { expression } => node(
            "AstStatementReturn",
            &stmt.location,
            vec![(
                "expression",
                expression
                    .as_ref()
                    .map(expr_into_value)
                    .unwrap_or(Value::Null),
            )],
        ),
        StmtKind::Expression { expression } => node(
            "AstStatementExpression",
            &stmt.location,
            vec![("expression", expr_into_value(expression))],
        ),
    }
}

fn binary_kind(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::And => "AstExpressionAnd",
        BinaryOp::Or => "AstExpressionOr",
        BinaryOp::Eq => "AstExpressionEq",
        BinaryOp::Ne => "AstExpressionNe",
        BinaryOp::Le => "AstExpressionLe",
        BinaryOp::Ge => "AstExpressionGe",
        BinaryOp::Lt => "AstExpressionLt",
        BinaryOp::Gt => "AstExpressionGt",
        BinaryOp::EqRe => "AstExpressionEqRe",
        BinaryOp::NeRe => "AstExpressionNeRe",
        BinaryOp::Add => "AstExpressionAdd",
        BinaryOp::Sub => "AstExpressionSub",
        BinaryOp::Mul => "AstExpressionMul",
        BinaryOp::Div => "AstExpressionDiv",
        BinaryOp::Rem => "AstExpressionRem",
    }
}

fn unary_kind(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Positive => "AstExpressionPositive",
        UnaryOp::Negative => "AstExpressionNegative",
        UnaryOp::Not => "AstExpressionNot",
    }
}

fn expr_into_value(expr: &Expr) -> Value {
    let location = &expr.location;
    match &expr.kind {
        ExprKind::Identifier(name) => node(
            "AstExpressionIdentifier",
            location,
            vec![("name", Value::string(name))],
        ),
        ExprKind::Template(parts) => {
            let parts = parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(bytes) => Value::string(bytes),
                    TemplatePart::Expression(expression) => expr_into_value(expression),
                })
                .collect();
            node(
                "AstExpressionTemplate",
                location,
                vec![("template", Value::vector(parts))],
            )
        }
        ExprKind::Null => node("AstExpressionNull", location, vec![]),
        ExprKind::Boolean(data) => node(
            "AstExpressionBoolean",
            location,
            vec![("data", Value::Boolean(*data))],
        ),
        ExprKind::Number(data) => node(
            "AstExpressionNumber",
            location,
            vec![("data", Value::Number(*data))],
        ),
        ExprKind::Str(data) => node(
            "AstExpressionString",
            location,
            vec![("data", Value::string(data))],
        ),
        ExprKind::Regexp(data) => node(
            "AstExpressionRegexp",
            location,
            vec![("data", Value::string(&data.text))],
        ),
        ExprKind::Vector(elements) => node(
            "AstExpressionVector",
            location,
            vec![(
                "elements",
                Value::vector(elements.iter().map(expr_into_value).collect()),
            )],
        ),
        ExprKind::Map(elements) => {
            let elements = elements
                .iter()
                .map(|(key, value)| {
                    Value::map(vec![
                        (Value::string("key"), expr_into_value(key)),
                        (Value::string("value"), expr_into_value(value)),
                    ])
                })
                .collect();
            node(
                "AstExpressionMap",
                location,
                vec![("elements", Value::vector(elements))],
            )
        }
        ExprKind::Set(elements) => node(
            "AstExpressionSet",
            location,
            vec![(
                "elements",
                Value::vector(elements.iter().map(expr_into_value).collect()),
            )],
        ),
        ExprKind::Function(literal) => {
            let parameters = literal
                .parameters
                .iter()
                .map(identifier_into_value)
                .collect();
            let name = literal
                .name
                .borrow()
                .as_ref()
                .map(Value::string)
                .unwrap_or(Value::Null);
            node(
                "AstExpressionFunction",
                location,
                vec![
                    ("parameters", Value::vector(parameters)),
                    ("body", block_into_value(&literal.body)),
                    ("name", name),
                ],
            )
        }
        ExprKind::Type { name, expression } => node(
            "AstExpressionType",
            location,
            vec![
                ("name", Value::string(name)),
                ("expression", expr_into_value(expression)),
            ],
        ),
        ExprKind::New { meta, expression } => node(
            "AstExpressionNew",
            location,
            vec![
                ("meta", expr_into_value(meta)),
                ("expression", expr_into_value(expression)),
            ],
        ),
        ExprKind::Grouped(expression) => node(
            "AstExpressionGrouped",
            location,
            vec![("expression", expr_into_value(expression))],
        ),
        ExprKind::Unary { op, operand } => node(
            unary_kind(*op),
            location,
            vec![("expression", expr_into_value(operand))],
        ),
        ExprKind::Binary { op, lhs, rhs } => node(
            binary_kind(*op),
            location,
            vec![("lhs", expr_into_value(lhs)), ("rhs", expr_into_value(rhs))],
        ),
        ExprKind::Call {
            function,
            arguments,
        } => node(
            "AstExpressionFunctionCall",
            location,
            vec![
                ("function", expr_into_value(function)),
                (
                    "arguments",
                    Value::vector(arguments.iter().map(expr_into_value).collect()),
                ),
            ],
        ),
        ExprKind::Index { store, field } => node(
            "AstExpressionAccessIndex",
            location,
            vec![
                ("store", expr_into_value(store)),
                ("field", expr_into_value(field)),
            ],
        ),
        ExprKind::Dot { store, field } => node(
            "AstExpressionAccessDot",
            location,
            vec![
                ("store", expr_into_value(store)),
                ("field", identifier_into_value(field)),
            ],
        ),
        ExprKind::Scope { store, field } => node(
            "AstExpressionAccessScope",
            location,
            vec![
                ("store", expr_into_value(store)),
                ("field", identifier_into_value(field)),
            ],
        ),
        ExprKind::Mkref(operand) => node(
            "AstExpressionMkref",
            location,
            vec![("lhs", expr_into_value(operand))],
        ),
        ExprKind::Deref(operand) => node(
            "AstExpressionDeref",
            location,
            vec![("lhs", expr_into_value(operand))],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comb::CombEncoder;
    use mellifera_syntax::Lexer;

    fn comb(value: &Value, indent: Option<&str>) -> String {
        let mut buffer = Vec::new();
        let mut encoder = CombEncoder::new(&mut buffer, indent);
        value.comb_encode(&mut encoder).expect("encodable dump");
        String::from_utf8(buffer).expect("comb output is UTF-8")
    }

    #[test]
    fn test_token_dump() {
        let tokens = Lexer::new("null;", Some(SourceLocation::file("<stdin>")))
            .tokenize()
            .expect("tokenize");
        let value = tokens_into_value(&tokens);
        let expected = "\
[
    {
        \"kind\": \"null\",
        \"literal\": \"null\",
        \"location\": {
            \"file\": \"<stdin>\",
            \"line\": 1
        }
    },
    {
        \"kind\": \";\",
        \"literal\": \";\",
        \"location\": {
            \"file\": \"<stdin>\",
            \"line\": 1
        }
    },
    {
        \"kind\": \"end-of-file\",
        \"literal\": \"\",
        \"location\": {
            \"file\": \"<stdin>\",
            \"line\": 1
        }
    }
]";
        assert_eq!(comb(&value, Some("    ")), expected);
    }

    #[test]
    fn test_token_dump_without_origin() {
        let tokens = Lexer::new("null;", None).tokenize().expect("tokenize");
        let value = tokens_into_value(&tokens);
        assert_eq!(
            comb(&value, None),
            "[{\"kind\": \"null\", \"literal\": \"null\", \"location\": null}, \
             {\"kind\": \";\", \"literal\": \";\", \"location\": null}, \
             {\"kind\": \"end-of-file\", \"literal\": \"\", \"location\": null}]"
        );
    }

    #[test]
    fn test_program_dump_is_encodable() {
        let program = mellifera_syntax::parse(
            "let f = function(a) { return a + 1; };\n\
             let v = [1, \"two\", r\"x+\"];\n\
             for k, x in {\"k\": $\"t {1}\"} { f(x.&); }\n\
             try { error new (type Map{}) Map{}; } catch e {}\n\
             while false { break; continue; }\n\
             if true {} elif false {} else {}\n\
             v[0] = -f(v::missing.*);",
            Some(SourceLocation::file("main.mf")),
        )
        .expect("parse");
        let value = program_into_value(&program);
        let text = comb(&value, Some("  "));
        assert!(text.starts_with("{\n  \"kind\": \"AstProgram\""));
        // Both layouts encode without hitting an unencodable value.
        comb(&value, None);
    }
}
