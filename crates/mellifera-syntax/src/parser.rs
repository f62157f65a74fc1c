//! Pratt parser for the Mellifera language.

use crate::ast::*;
use crate::error::{quote, ParseError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Operator binding strength, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    /// `or`
    Or,
    /// `and`
    And,
    /// `== != <= >= < > =~ !~`
    Compare,
    /// `+ -`
    AddSub,
    /// `* / %`
    MulDiv,
    /// `+x -x not x`
    Prefix,
    /// `foo(bar, 123)` `foo[42]` `.` `::` `.&` `.*`
    Postfix,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::Eq
        | TokenKind::Ne
        | TokenKind::Le
        | TokenKind::Ge
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::EqRe
        | TokenKind::NeRe => Precedence::Compare,
        TokenKind::Add | TokenKind::Sub => Precedence::AddSub,
        TokenKind::Mul | TokenKind::Div | TokenKind::Rem => Precedence::MulDiv,
        TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::Dot
        | TokenKind::Scope
        | TokenKind::Mkref
        | TokenKind::Deref => Precedence::Postfix,
        _ => Precedence::Lowest,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::Ne => BinaryOp::Ne,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::EqRe => BinaryOp::EqRe,
        TokenKind::NeRe => BinaryOp::NeRe,
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::Rem => BinaryOp::Rem,
        _ => return None,
    })
}

/// Set the display names of named functions nested in a map literal, so that
/// `let m = {"f": function() {...}};` produces a function displayed as
/// `m::f`.
fn update_named_functions(elements: &[(Expr, Expr)], prefix: &[u8]) {
    for (key, value) in elements {
        let ExprKind::Str(key_bytes) = &key.kind else {
            continue;
        };
        match &value.kind {
            ExprKind::Function(literal) => {
                let mut name = prefix.to_vec();
                name.extend_from_slice(key_bytes);
                *literal.name.borrow_mut() = Some(name);
            }
            ExprKind::Map(inner) => {
                let mut nested = prefix.to_vec();
                nested.extend_from_slice(key_bytes);
                nested.extend_from_slice(b"::");
                update_named_functions(inner, &nested);
            }
            _ => {}
        }
    }
}

/// Parser over a token stream with one token of lookahead.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser, pulling the first token.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    pub(crate) fn current(&self) -> &Token {
        &self.current
    }

    pub(crate) fn lexer_position(&self) -> usize {
        self.lexer.position
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.current.kind != kind {
            return Err(ParseError::new(
                self.current.location.clone(),
                format!(
                    "expected {}, found {}",
                    quote(&kind.to_string()),
                    quote(&self.current.to_string())
                ),
            ));
        }
        self.advance()
    }

    /// Parse a complete program, consuming tokens until end-of-file.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let location = self.current.location.clone();
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program {
            location,
            statements,
        })
    }

    fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Identifier {
            location: token.location,
            name: token.literal,
        })
    }

    /// Parse an expression at the lowest precedence level.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_precedence(Precedence::Lowest)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ParseError> {
        let mut expression = self.parse_prefix()?;
        while precedence < precedence_of(self.current.kind) {
            expression = self.parse_infix(expression)?;
        }
        Ok(expression)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::Identifier => {
                let token = self.expect(TokenKind::Identifier)?;
                Ok(Expr::new(token.location, ExprKind::Identifier(token.literal)))
            }
            TokenKind::Template => {
                let token = self.expect(TokenKind::Template)?;
                let parts = token.template.unwrap_or_default();
                Ok(Expr::new(token.location, ExprKind::Template(parts)))
            }
            TokenKind::Null => {
                let token = self.expect(TokenKind::Null)?;
                Ok(Expr::new(token.location, ExprKind::Null))
            }
            TokenKind::True => {
                let token = self.expect(TokenKind::True)?;
                Ok(Expr::new(token.location, ExprKind::Boolean(true)))
            }
            TokenKind::False => {
                let token = self.expect(TokenKind::False)?;
                Ok(Expr::new(token.location, ExprKind::Boolean(false)))
            }
            TokenKind::Number => {
                let token = self.expect(TokenKind::Number)?;
                let number = token.number.ok_or_else(|| {
                    ParseError::new(token.location.clone(), "missing number token value")
                })?;
                Ok(Expr::new(token.location, ExprKind::Number(number)))
            }
            TokenKind::Str => {
                let token = self.expect(TokenKind::Str)?;
                let string = token.string.ok_or_else(|| {
                    ParseError::new(token.location.clone(), "missing string token value")
                })?;
                Ok(Expr::new(token.location, ExprKind::Str(string)))
            }
            TokenKind::Regexp => {
                let token = self.expect(TokenKind::Regexp)?;
                let regexp = token.regexp.ok_or_else(|| {
                    ParseError::new(token.location.clone(), "missing regexp token value")
                })?;
                Ok(Expr::new(token.location, ExprKind::Regexp(regexp)))
            }
            TokenKind::LBracket => self.parse_vector(),
            TokenKind::Map | TokenKind::Set | TokenKind::LBrace => self.parse_map_or_set(),
            TokenKind::Function => self.parse_function(),
            TokenKind::Type => self.parse_type(),
            TokenKind::New => self.parse_new(),
            TokenKind::LParen => self.parse_grouped(),
            TokenKind::Add => self.parse_unary(TokenKind::Add, UnaryOp::Positive),
            TokenKind::Sub => self.parse_unary(TokenKind::Sub, UnaryOp::Negative),
            TokenKind::Not => self.parse_unary(TokenKind::Not, UnaryOp::Not),
            _ => Err(ParseError::new(
                self.current.location.clone(),
                format!("expected expression, found {}", self.current),
            )),
        }
    }

    fn parse_infix(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        if let Some(op) = binary_op(self.current.kind) {
            let kind = self.current.kind;
            let location = self.advance()?.location;
            let rhs = self.parse_precedence(precedence_of(kind))?;
            return Ok(Expr::new(
                location,
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            ));
        }
        match self.current.kind {
            TokenKind::LParen => self.parse_call(lhs),
            TokenKind::LBracket => {
                let location = self.expect(TokenKind::LBracket)?.location;
                let field = self.parse_expression()?;
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::new(
                    location,
                    ExprKind::Index {
                        store: Box::new(lhs),
                        field: Box::new(field),
                    },
                ))
            }
            TokenKind::Dot => {
                let location = self.expect(TokenKind::Dot)?.location;
                let field = self.parse_identifier()?;
                Ok(Expr::new(
                    location,
                    ExprKind::Dot {
                        store: Box::new(lhs),
                        field,
                    },
                ))
            }
            TokenKind::Scope => {
                let location = self.expect(TokenKind::Scope)?.location;
                let field = self.parse_identifier()?;
                Ok(Expr::new(
                    location,
                    ExprKind::Scope {
                        store: Box::new(lhs),
                        field,
                    },
                ))
            }
            TokenKind::Mkref => {
                let location = self.expect(TokenKind::Mkref)?.location;
                Ok(Expr::new(location, ExprKind::Mkref(Box::new(lhs))))
            }
            TokenKind::Deref => {
                let location = self.expect(TokenKind::Deref)?.location;
                Ok(Expr::new(location, ExprKind::Deref(Box::new(lhs))))
            }
            kind => unreachable!("no infix handler for {kind}"),
        }
    }

    fn parse_vector(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::LBracket)?.location;
        let mut elements = Vec::new();
        while !self.check(TokenKind::RBracket) {
            if !elements.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(location, ExprKind::Vector(elements)))
    }

    fn parse_map_or_set(&mut self) -> Result<Expr, ParseError> {
        #[derive(PartialEq)]
        enum MapOrSet {
            Unknown,
            Map,
            Set,
        }
        let mut map_or_set = MapOrSet::Unknown;
        if self.check(TokenKind::Map) {
            map_or_set = MapOrSet::Map;
            self.advance()?;
        } else if self.check(TokenKind::Set) {
            map_or_set = MapOrSet::Set;
            self.advance()?;
        }

        let mut map_elements: Vec<(Expr, Expr)> = Vec::new();
        let mut set_elements: Vec<Expr> = Vec::new();

        let location = self.expect(TokenKind::LBrace)?.location;
        while !self.check(TokenKind::RBrace) {
            if !map_elements.is_empty() || !set_elements.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::RBrace) {
                break;
            }

            // `.identifier` is sugar for a string key, and only makes sense
            // in a map.
            let expression = if self.check(TokenKind::Dot) {
                if map_or_set == MapOrSet::Unknown {
                    map_or_set = MapOrSet::Map;
                }
                if map_or_set == MapOrSet::Set {
                    return Err(ParseError::new(
                        self.current.location.clone(),
                        format!("expected expression, found {}", self.current),
                    ));
                }
                self.expect(TokenKind::Dot)?;
                let identifier = self.parse_identifier()?;
                Expr::new(
                    identifier.location.clone(),
                    ExprKind::Str(identifier.name.into_bytes()),
                )
            } else {
                self.parse_expression()?
            };

            if map_or_set == MapOrSet::Unknown {
                map_or_set = if self.check(TokenKind::Colon) || self.check(TokenKind::Assign) {
                    MapOrSet::Map
                } else {
                    MapOrSet::Set
                };
            }

            match map_or_set {
                MapOrSet::Map => {
                    if self.check(TokenKind::Colon) {
                        self.expect(TokenKind::Colon)?;
                    } else if self.check(TokenKind::Assign) {
                        self.expect(TokenKind::Assign)?;
                    } else {
                        return Err(ParseError::new(
                            self.current.location.clone(),
                            format!("expected : or =, found {}", self.current),
                        ));
                    }
                    map_elements.push((expression, self.parse_expression()?));
                }
                MapOrSet::Set => set_elements.push(expression),
                MapOrSet::Unknown => unreachable!("map-or-set must be decided"),
            }
        }
        self.expect(TokenKind::RBrace)?;

        match map_or_set {
            MapOrSet::Unknown => Err(ParseError::new(location, "ambiguous empty map or set")),
            MapOrSet::Map => {
                update_named_functions(&map_elements, b"");
                Ok(Expr::new(location, ExprKind::Map(map_elements)))
            }
            MapOrSet::Set => Ok(Expr::new(location, ExprKind::Set(set_elements))),
        }
    }

    fn parse_function(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Function)?.location;
        let mut parameters = Vec::new();
        self.expect(TokenKind::LParen)?;
        while !self.check(TokenKind::RParen) {
            if !parameters.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            parameters.push(self.parse_identifier()?);
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        for i in 0..parameters.len() {
            for j in i + 1..parameters.len() {
                if parameters[i].name == parameters[j].name {
                    return Err(ParseError::new(
                        parameters[j].location.clone(),
                        format!(
                            "duplicate function parameter {}",
                            quote(&parameters[i].name)
                        ),
                    ));
                }
            }
        }
        Ok(Expr::new(
            location.clone(),
            ExprKind::Function(Rc::new(FunctionLiteral {
                location,
                parameters,
                body,
                name: RefCell::new(None),
            })),
        ))
    }

    fn parse_grouped(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::LParen)?.location;
        let expression = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(location, ExprKind::Grouped(Box::new(expression))))
    }

    fn parse_type(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Type)?.location;
        let expression = self.parse_expression()?;
        // Placeholder display name; a `let` binding overrides it.
        let name = match &location {
            Some(location) => format!("type@[{location}]").into_bytes(),
            None => b"type".to_vec(),
        };
        Ok(Expr::new(
            location,
            ExprKind::Type {
                name,
                expression: Box::new(expression),
            },
        ))
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::New)?.location;
        let meta = self.parse_expression()?;
        let expression = self.parse_expression()?;
        Ok(Expr::new(
            location,
            ExprKind::New {
                meta: Box::new(meta),
                expression: Box::new(expression),
            },
        ))
    }

    fn parse_unary(&mut self, kind: TokenKind, op: UnaryOp) -> Result<Expr, ParseError> {
        let location = self.expect(kind)?.location;
        let operand = self.parse_precedence(Precedence::Prefix)?;
        Ok(Expr::new(
            location,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn parse_call(&mut self, function: Expr) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::LParen)?.location;
        let mut arguments = Vec::new();
        while !self.check(TokenKind::RParen) {
            if !arguments.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::RParen) {
                break;
            }
            arguments.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            location,
            ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
        ))
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let location = self.expect(TokenKind::LBrace)?.location;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Block {
            location,
            statements,
        })
    }

    /// Parse a single statement.
    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::Let => self.parse_statement_let(),
            TokenKind::If => self.parse_statement_if(),
            TokenKind::For => self.parse_statement_for(),
            TokenKind::While => self.parse_statement_while(),
            TokenKind::Break => self.parse_statement_break(),
            TokenKind::Continue => self.parse_statement_continue(),
            TokenKind::Try => self.parse_statement_try(),
            TokenKind::Error => self.parse_statement_error(),
            TokenKind::Return => self.parse_statement_return(),
            _ => self.parse_statement_expression_or_assignment(),
        }
    }

    fn parse_statement_let(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Let)?.location;
        let identifier = self.parse_identifier()?;
        self.expect(TokenKind::Assign)?;
        let mut expression = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;

        // Bound functions, types, and maps of functions pick up the binding
        // name for display purposes.
        match &mut expression.kind {
            ExprKind::Function(literal) => {
                *literal.name.borrow_mut() = Some(identifier.name.clone().into_bytes());
            }
            ExprKind::Type {
                name,
                expression: inner,
            } => {
                *name = identifier.name.clone().into_bytes();
                if let ExprKind::Map(elements) = &inner.kind {
                    let mut prefix = identifier.name.clone().into_bytes();
                    prefix.extend_from_slice(b"::");
                    update_named_functions(elements, &prefix);
                }
            }
            ExprKind::Map(elements) => {
                let mut prefix = identifier.name.clone().into_bytes();
                prefix.extend_from_slice(b"::");
                update_named_functions(elements, &prefix);
            }
            _ => {}
        }

        Ok(Stmt::new(
            location,
            StmtKind::Let {
                identifier,
                expression,
            },
        ))
    }

    fn parse_statement_if(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current.location.clone();
        let mut conditionals = Vec::new();
        loop {
            let expected = if conditionals.is_empty() {
                TokenKind::If
            } else {
                TokenKind::Elif
            };
            if !self.check(expected) {
                break;
            }
            let arm_location = self.advance()?.location;
            let condition = self.parse_expression()?;
            let body = self.parse_block()?;
            conditionals.push(Conditional {
                location: arm_location,
                condition,
                body,
            });
        }
        let else_block = if self.check(TokenKind::Else) {
            self.expect(TokenKind::Else)?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::new(
            location,
            StmtKind::If {
                conditionals,
                else_block,
            },
        ))
    }

    fn parse_statement_for(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::For)?.location;
        let key = self.parse_identifier()?;
        let value = if self.check(TokenKind::Comma) {
            self.expect(TokenKind::Comma)?;
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.expect(TokenKind::In)?;
        let collection = self.parse_expression()?;
        let block = self.parse_block()?;
        if let Some(value) = &value {
            if key.name == value.name {
                return Err(ParseError::new(
                    key.location.clone(),
                    format!("duplicate iterator name {}", quote(&key.name)),
                ));
            }
        }
        Ok(Stmt::new(
            location,
            StmtKind::For {
                key,
                value,
                collection,
                block,
            },
        ))
    }

    fn parse_statement_while(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::While)?.location;
        let condition = self.parse_expression()?;
        let block = self.parse_block()?;
        Ok(Stmt::new(location, StmtKind::While { condition, block }))
    }

    fn parse_statement_break(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Break)?.location;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(location, StmtKind::Break))
    }

    fn parse_statement_continue(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Continue)?.location;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(location, StmtKind::Continue))
    }

    fn parse_statement_try(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Try)?.location;
        let try_block = self.parse_block()?;
        self.expect(TokenKind::Catch)?;
        let catch_identifier = if self.check(TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let catch_block = self.parse_block()?;
        Ok(Stmt::new(
            location,
            StmtKind::Try {
                try_block,
                catch_identifier,
                catch_block,
            },
        ))
    }

    fn parse_statement_error(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Error)?.location;
        let expression = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(location, StmtKind::Error { expression }))
    }

    fn parse_statement_return(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Return)?.location;
        let expression = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(location, StmtKind::Return { expression }))
    }

    fn parse_statement_expression_or_assignment(&mut self) -> Result<Stmt, ParseError> {
        let expression = self.parse_expression()?;
        if !self.check(TokenKind::Assign) {
            self.expect(TokenKind::Semicolon)?;
            return Ok(Stmt::new(
                expression.location.clone(),
                StmtKind::Expression { expression },
            ));
        }
        let location = self.expect(TokenKind::Assign)?.location;
        let rhs = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(
            location,
            StmtKind::Assignment {
                lhs: expression,
                rhs,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::SourceLocation;

    fn parse(source: &str) -> Program {
        crate::parse(source, None).expect("parse")
    }

    fn parse_error(source: &str) -> ParseError {
        crate::parse(source, None).expect_err("expected a parse error")
    }

    fn parse_one_expression(source: &str) -> Expr {
        let program = parse(source);
        assert_eq!(program.statements.len(), 1);
        match program.statements.into_iter().next().unwrap().kind {
            StmtKind::Expression { expression } => expression,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_literals() {
        assert!(matches!(parse_one_expression("null;").kind, ExprKind::Null));
        assert!(matches!(
            parse_one_expression("true;").kind,
            ExprKind::Boolean(true)
        ));
        assert!(matches!(
            parse_one_expression("false;").kind,
            ExprKind::Boolean(false)
        ));
        assert!(
            matches!(parse_one_expression("123.456;").kind, ExprKind::Number(n) if n == 123.456)
        );
        assert!(matches!(
            parse_one_expression("\"foo\";").kind,
            ExprKind::Str(s) if s == b"foo"
        ));
        assert!(matches!(
            parse_one_expression("r\"^.*$\";").kind,
            ExprKind::Regexp(_)
        ));
    }

    #[test]
    fn test_missing_semicolon() {
        let error = parse_error("null");
        assert_eq!(error.message, "expected `;`, found `end-of-file`");
    }

    #[test]
    fn test_expected_expression() {
        let error = parse_error(";");
        assert_eq!(error.message, "expected expression, found ;");
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expression = parse_one_expression("1 + 2 * 3;");
        let ExprKind::Binary { op, rhs, .. } = expression.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_precedence_comparison_binds_tighter_than_and() {
        // a == 1 and b == 2 parses as (a == 1) and (b == 2)
        let expression = parse_one_expression("a == 1 and b == 2;");
        let ExprKind::Binary { op, lhs, rhs } = expression.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn test_unary_binds_tighter_than_mul() {
        // -a * b parses as (-a) * b
        let expression = parse_one_expression("-a * b;");
        assert!(matches!(
            expression.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_postfix_chain() {
        let expression = parse_one_expression("foo.bar[0](1, 2).&;");
        assert!(matches!(expression.kind, ExprKind::Mkref(_)));
    }

    #[test]
    fn test_vector_literal() {
        let expression = parse_one_expression("[1, 2, 3];");
        let ExprKind::Vector(elements) = expression.kind else {
            panic!("expected vector literal");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn test_map_set_disambiguation() {
        assert!(matches!(
            parse_one_expression("{1: \"a\"};").kind,
            ExprKind::Map(_)
        ));
        assert!(matches!(
            parse_one_expression("{1, 2};").kind,
            ExprKind::Set(_)
        ));
        assert!(matches!(
            parse_one_expression("Map{};").kind,
            ExprKind::Map(elements) if elements.is_empty()
        ));
        assert!(matches!(
            parse_one_expression("Set{};").kind,
            ExprKind::Set(elements) if elements.is_empty()
        ));
    }

    #[test]
    fn test_ambiguous_empty_braces() {
        let error = parse_error("{};");
        assert_eq!(error.message, "ambiguous empty map or set");
    }

    #[test]
    fn test_map_dot_key_sugar() {
        let expression = parse_one_expression("{.foo = 1, .bar: 2};");
        let ExprKind::Map(elements) = expression.kind else {
            panic!("expected map literal");
        };
        assert!(matches!(&elements[0].0.kind, ExprKind::Str(s) if s == b"foo"));
        assert!(matches!(&elements[1].0.kind, ExprKind::Str(s) if s == b"bar"));
    }

    #[test]
    fn test_function_literal() {
        let expression = parse_one_expression("function(a, b) { return a; };");
        let ExprKind::Function(literal) = expression.kind else {
            panic!("expected function literal");
        };
        assert_eq!(literal.parameters.len(), 2);
        assert_eq!(literal.body.statements.len(), 1);
        assert!(literal.name.borrow().is_none());
    }

    #[test]
    fn test_duplicate_function_parameter() {
        let error = parse_error("function(a, a) {};");
        assert_eq!(error.message, "duplicate function parameter `a`");
    }

    #[test]
    fn test_let_names_function() {
        let program = parse("let f = function() {};");
        let StmtKind::Let { expression, .. } = &program.statements[0].kind else {
            panic!("expected let statement");
        };
        let ExprKind::Function(literal) = &expression.kind else {
            panic!("expected function literal");
        };
        assert_eq!(literal.name.borrow().as_deref(), Some(b"f".as_ref()));
    }

    #[test]
    fn test_let_names_map_functions() {
        let program = parse("let m = {\"f\": function() {}, \"inner\": {\"g\": function() {}}};");
        let StmtKind::Let { expression, .. } = &program.statements[0].kind else {
            panic!("expected let statement");
        };
        let ExprKind::Map(elements) = &expression.kind else {
            panic!("expected map literal");
        };
        let ExprKind::Function(f) = &elements[0].1.kind else {
            panic!("expected function value");
        };
        assert_eq!(f.name.borrow().as_deref(), Some(b"m::f".as_ref()));
        let ExprKind::Map(inner) = &elements[1].1.kind else {
            panic!("expected nested map");
        };
        let ExprKind::Function(g) = &inner[0].1.kind else {
            panic!("expected nested function value");
        };
        assert_eq!(g.name.borrow().as_deref(), Some(b"m::inner::g".as_ref()));
    }

    #[test]
    fn test_statements() {
        let program = parse(
            "let x = 1;\n\
             x = 2;\n\
             if x == 2 { x = 3; } elif x == 3 { x = 4; } else { x = 5; }\n\
             for i in 10 { continue; }\n\
             for k, v in {1: 2} { break; }\n\
             while false {}\n\
             try { error \"boom\"; } catch e {}\n\
             return x;",
        );
        assert_eq!(program.statements.len(), 8);
        assert!(matches!(program.statements[0].kind, StmtKind::Let { .. }));
        assert!(matches!(
            program.statements[1].kind,
            StmtKind::Assignment { .. }
        ));
        assert!(matches!(program.statements[2].kind, StmtKind::If { .. }));
        assert!(matches!(program.statements[3].kind, StmtKind::For { .. }));
        assert!(matches!(program.statements[4].kind, StmtKind::For { .. }));
        assert!(matches!(program.statements[5].kind, StmtKind::While { .. }));
        assert!(matches!(program.statements[6].kind, StmtKind::Try { .. }));
        assert!(matches!(program.statements[7].kind, StmtKind::Return { .. }));
    }

    #[test]
    fn test_duplicate_iterator_name() {
        let error = parse_error("for x, x in {1: 2} {}");
        assert_eq!(error.message, "duplicate iterator name `x`");
    }

    #[test]
    fn test_index_assignment_target() {
        let program = parse("a[0] = 1;");
        let StmtKind::Assignment { lhs, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(lhs.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn test_new_expression() {
        let expression = parse_one_expression("new point {.x = 1, .y = 2};");
        assert!(matches!(expression.kind, ExprKind::New { .. }));
    }

    #[test]
    fn test_type_expression_placeholder_name() {
        let program = crate::parse(
            "type {};",
            Some(SourceLocation::file("main.mf")),
        );
        // `type {}` applied to an ambiguous empty literal is a parse error;
        // use an explicit Map{}.
        assert!(program.is_err());
        let program = crate::parse("type Map{};", Some(SourceLocation::file("main.mf"))).unwrap();
        let StmtKind::Expression { expression } = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Type { name, .. } = &expression.kind else {
            panic!("expected type expression");
        };
        assert_eq!(name, b"type@[main.mf:1]");
    }

    #[test]
    fn test_let_names_type() {
        let program = parse("let point = type Map{};");
        let StmtKind::Let { expression, .. } = &program.statements[0].kind else {
            panic!("expected let statement");
        };
        let ExprKind::Type { name, .. } = &expression.kind else {
            panic!("expected type expression");
        };
        assert_eq!(name, b"point");
    }

    #[test]
    fn test_locations_carried() {
        let program = crate::parse("null;\nnull;", Some(SourceLocation::file("main.mf"))).unwrap();
        let lines: Vec<_> = program
            .statements
            .iter()
            .map(|s| s.location.as_ref().map(|l| l.line))
            .collect();
        assert_eq!(lines, vec![Some(1), Some(2)]);
    }
}
