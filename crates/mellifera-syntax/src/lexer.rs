//! Lexer for the Mellifera language.
//!
//! Converts source text into a stream of tokens. Template strings are lexed
//! with the help of a nested parser for their interpolated expressions.

use crate::ast::TemplatePart;
use crate::error::{escape, quote, ParseError};
use crate::parser::Parser;
use crate::token::{RegexpLiteral, SourceLocation, Token, TokenKind};
use std::rc::Rc;

/// Lexer over Mellifera source code.
pub struct Lexer<'a> {
    /// Source text being lexed.
    source: &'a str,
    /// Current location, advanced on every consumed newline. `None` when the
    /// source has no origin; tokens then carry no location either.
    location: Option<SourceLocation>,
    /// Current byte position.
    pub(crate) position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'a str, location: Option<SourceLocation>) -> Self {
        Self {
            source,
            location,
            position: 0,
        }
    }

    /// Lex the entire source, returning all tokens including the final
    /// end-of-file token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn current_location(&self) -> Option<SourceLocation> {
        self.location.clone()
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    fn remaining(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn advance_char(&mut self) {
        let Some(c) = self.current_char() else {
            return;
        };
        if c == '\n' {
            if let Some(location) = &mut self.location {
                location.line += 1;
            }
        }
        self.position += c.len_utf8();
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        match self.current_char() {
            None => Err(ParseError::new(
                self.current_location(),
                format!("expected {}, found end-of-file", quote(&expected.to_string())),
            )),
            Some(c) if c != expected => Err(ParseError::new(
                self.current_location(),
                format!(
                    "expected {}, found {}",
                    quote(&expected.to_string()),
                    quote(&c.to_string())
                ),
            )),
            Some(_) => {
                self.advance_char();
                Ok(())
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance_char();
        }
    }

    fn skip_comment(&mut self) {
        if self.current_char() != Some('#') {
            return;
        }
        while !self.is_eof() && self.current_char() != Some('\n') {
            self.advance_char();
        }
        self.advance_char();
    }

    fn skip_whitespace_and_comments(&mut self) {
        while self
            .current_char()
            .is_some_and(|c| c.is_whitespace() || c == '#')
        {
            self.skip_whitespace();
            self.skip_comment();
        }
    }

    fn new_token(&self, kind: TokenKind, literal: impl Into<String>) -> Token {
        Token::new(kind, literal, self.current_location())
    }

    fn is_letter(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn lex_keyword_or_identifier(&mut self) -> Token {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance_char();
        }
        let text = &self.source[start..self.position];
        match TokenKind::keyword(text) {
            Some(keyword) => self.new_token(keyword, text),
            None => self.new_token(TokenKind::Identifier, text),
        }
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        let rest = self.remaining();

        // Hexadecimal: 0x followed by at least one hex digit.
        if rest.starts_with("0x") && rest[2..].starts_with(|c: char| c.is_ascii_hexdigit()) {
            self.position += 2;
            while self
                .current_char()
                .is_some_and(|c| c.is_ascii_hexdigit())
            {
                self.advance_char();
            }
            let text = &self.source[start..self.position];
            let parsed = i64::from_str_radix(&text[2..], 16).map_err(|_| {
                ParseError::new(
                    self.current_location(),
                    format!("invalid number {}", quote(text)),
                )
            })?;
            let mut token = self.new_token(TokenKind::Number, text);
            token.number = Some(parsed as f64);
            return Ok(token);
        }

        // Decimal: digits with an optional fractional part.
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
        }
        if self.current_char() == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance_char();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance_char();
            }
        }
        let text = &self.source[start..self.position];
        let parsed: f64 = text.parse().map_err(|_| {
            ParseError::new(
                self.current_location(),
                format!("invalid number {}", quote(text)),
            )
        })?;
        let mut token = self.new_token(TokenKind::Number, text);
        token.number = Some(parsed);
        Ok(token)
    }

    /// Decode one character of an escaped string literal into `out`.
    fn lex_string_char(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let Some(c) = self.current_char() else {
            return Err(ParseError::new(
                self.current_location(),
                "expected character, found end-of-file",
            ));
        };
        if c == '\n' {
            return Err(ParseError::new(
                self.current_location(),
                "expected character, found newline",
            ));
        }
        if c.is_control() {
            return Err(ParseError::new(
                self.current_location(),
                format!("expected printable character, found {:#x}", c as u32),
            ));
        }

        if c == '\\' {
            match self.peek_char() {
                Some('t') => {
                    self.advance_char();
                    self.advance_char();
                    out.push(b'\t');
                    return Ok(());
                }
                Some('n') => {
                    self.advance_char();
                    self.advance_char();
                    out.push(b'\n');
                    return Ok(());
                }
                Some('"') => {
                    self.advance_char();
                    self.advance_char();
                    out.push(b'"');
                    return Ok(());
                }
                Some('\\') => {
                    self.advance_char();
                    self.advance_char();
                    out.push(b'\\');
                    return Ok(());
                }
                Some('x') => {
                    self.advance_char();
                    self.advance_char();
                    let mut nybbles = String::new();
                    for _ in 0..2 {
                        if let Some(c) = self.current_char() {
                            nybbles.push(c);
                            self.advance_char();
                        }
                    }
                    let byte = match (nybbles.len() == 2)
                        .then(|| u8::from_str_radix(&nybbles, 16).ok())
                        .flatten()
                    {
                        Some(byte) => byte,
                        None => {
                            return Err(ParseError::new(
                                self.current_location(),
                                format!(
                                    "expected hexadecimal escape sequence, found {}",
                                    quote(&format!("\\x{nybbles}"))
                                ),
                            ));
                        }
                    };
                    out.push(byte);
                    return Ok(());
                }
                peek => {
                    let sequence = match peek {
                        Some(p) => format!("\\{p}"),
                        None => "\\".to_string(),
                    };
                    return Err(ParseError::new(
                        self.current_location(),
                        format!(
                            "expected escape sequence, found {}",
                            quote(&escape(&sequence))
                        ),
                    ));
                }
            }
        }

        let mut buffer = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
        self.advance_char();
        Ok(())
    }

    fn lex_string(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.expect_char('"')?;
        let mut string = Vec::new();
        while !self.is_eof() && self.current_char() != Some('"') {
            self.lex_string_char(&mut string)?;
        }
        self.expect_char('"')?;
        let literal = &self.source[start..self.position];
        let mut token = self.new_token(TokenKind::Str, literal);
        token.string = Some(string);
        Ok(token)
    }

    /// Decode one character of a raw string literal into `out`. No escape
    /// processing at all.
    fn lex_raw_string_char(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let Some(c) = self.current_char() else {
            return Err(ParseError::new(
                self.current_location(),
                "expected character, found end-of-file",
            ));
        };
        let mut buffer = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
        self.advance_char();
        Ok(())
    }

    fn lex_raw_string(&mut self) -> Result<Token, ParseError> {
        let location = self.current_location();
        let start = self.position;
        let mut string = Vec::new();
        if self.remaining().starts_with("```") {
            for _ in 0..3 {
                self.expect_char('`')?;
            }
            while !self.is_eof() && !self.remaining().starts_with("```") {
                self.lex_raw_string_char(&mut string)?;
            }
            for _ in 0..3 {
                self.expect_char('`')?;
            }
            if string.is_empty() {
                return Err(ParseError::new(
                    location,
                    "invalid empty multi-tick raw string",
                ));
            }
        } else {
            self.expect_char('`')?;
            while !self.is_eof() && self.current_char() != Some('`') {
                self.lex_raw_string_char(&mut string)?;
            }
            self.expect_char('`')?;
        }
        let literal = &self.source[start..self.position];
        let mut token = self.new_token(TokenKind::Str, literal);
        token.string = Some(string);
        Ok(token)
    }

    /// Lex one element of a template body: a `{{`/`}}` escape, an
    /// interpolated `{expression}`, or a plain character.
    fn lex_template_element(
        &mut self,
        location: &Option<SourceLocation>,
        parts: &mut Vec<TemplatePart>,
        text: &mut Vec<u8>,
        raw: bool,
    ) -> Result<(), ParseError> {
        if self.remaining().starts_with("{{") {
            text.push(b'{');
            self.position += 2;
            return Ok(());
        }
        if self.remaining().starts_with("}}") {
            text.push(b'}');
            self.position += 2;
            return Ok(());
        }
        if self.remaining().starts_with('{') {
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(text)));
            }
            self.position += 1;

            // Interpolated expressions are parsed by a nested parser over the
            // remaining source. Its tokens carry no location.
            let sub = Lexer::new(&self.source[self.position..], None);
            let mut parser = Parser::new(sub)
                .map_err(|e| ParseError::new(location.clone(), e.message))?;
            let expression = parser
                .parse_expression()
                .map_err(|e| ParseError::new(location.clone(), e.message))?;
            if parser.current().kind != TokenKind::RBrace {
                return Err(ParseError::new(
                    location.clone(),
                    format!(
                        "expected `}}` to close template expression, found {}",
                        quote(&parser.current().to_string())
                    ),
                ));
            }
            self.position += parser.lexer_position();
            parts.push(TemplatePart::Expression(expression));
            return Ok(());
        }
        if raw {
            self.lex_raw_string_char(text)
        } else {
            self.lex_string_char(text)
        }
    }

    fn lex_template(&mut self) -> Result<Token, ParseError> {
        let location = self.current_location();
        let start = self.position;
        self.expect_char('$')?;

        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut text: Vec<u8> = Vec::new();

        if self.remaining().starts_with("```") {
            for _ in 0..3 {
                self.expect_char('`')?;
            }
            while !self.is_eof() && !self.remaining().starts_with("```") {
                self.lex_template_element(&location, &mut parts, &mut text, true)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            for _ in 0..3 {
                self.expect_char('`')?;
            }
        } else if self.current_char() == Some('`') {
            self.expect_char('`')?;
            while !self.is_eof() && self.current_char() != Some('`') {
                self.lex_template_element(&location, &mut parts, &mut text, true)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            self.expect_char('`')?;
        } else if self.current_char() == Some('"') {
            self.expect_char('"')?;
            while !self.is_eof() && self.current_char() != Some('"') {
                self.lex_template_element(&location, &mut parts, &mut text, false)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            self.expect_char('"')?;
        } else {
            let found = self
                .current_char()
                .map(|c| c.to_string())
                .unwrap_or_default();
            return Err(ParseError::new(
                self.current_location(),
                format!(
                    "expected template of the form $\"...\", $`...` or $```...```, \
                     found `$` followed by {}",
                    quote(&found)
                ),
            ));
        }

        let literal = &self.source[start..self.position];
        let mut token = self.new_token(TokenKind::Template, literal);
        token.template = Some(parts);
        Ok(token)
    }

    fn lex_regexp(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.expect_char('r')?;
        let mut text = Vec::new();
        if self.current_char() == Some('"') {
            self.expect_char('"')?;
            while self.current_char() != Some('"') {
                self.lex_string_char(&mut text)?;
            }
            self.expect_char('"')?;
        } else {
            self.expect_char('`')?;
            while self.current_char() != Some('`') {
                self.lex_raw_string_char(&mut text)?;
            }
            self.expect_char('`')?;
        }

        let invalid = || {
            ParseError::new(
                self.current_location(),
                format!(
                    "invalid regular expression \"{}\"",
                    escape(&String::from_utf8_lossy(&text))
                ),
            )
        };
        let pattern_text = std::str::from_utf8(&text).map_err(|_| invalid())?;
        let pattern = regex::bytes::Regex::new(pattern_text).map_err(|_| invalid())?;

        let literal = &self.source[start..self.position];
        let mut token = self.new_token(TokenKind::Regexp, literal);
        token.string = Some(text.clone());
        token.regexp = Some(Rc::new(RegexpLiteral { pattern, text }));
        Ok(token)
    }

    fn operator(&mut self, kind: TokenKind, length: usize) -> Token {
        for _ in 0..length {
            self.advance_char();
        }
        self.new_token(kind, kind.to_string())
    }

    /// Get the next token, or a parse error for malformed input.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        if self.is_eof() {
            return Ok(self.new_token(TokenKind::Eof, ""));
        }

        // Unwrap is fine: not at EOF, so a current character exists.
        let c = self.current_char().unwrap_or('\0');

        // Literals, identifiers, and keywords.
        if c == '"' {
            return self.lex_string();
        }
        if c == '`' {
            return self.lex_raw_string();
        }
        if c == '$' {
            return self.lex_template();
        }
        if self.remaining().starts_with("r\"") || self.remaining().starts_with("r`") {
            return self.lex_regexp();
        }
        if Self::is_letter(c) {
            return Ok(self.lex_keyword_or_identifier());
        }
        if c.is_ascii_digit() {
            return self.lex_number();
        }

        // Operators and delimiters.
        let peek = self.peek_char();
        let token = match c {
            '+' => self.operator(TokenKind::Add, 1),
            '-' => self.operator(TokenKind::Sub, 1),
            '*' => self.operator(TokenKind::Mul, 1),
            '/' => self.operator(TokenKind::Div, 1),
            '%' => self.operator(TokenKind::Rem, 1),
            '=' if peek == Some('=') => self.operator(TokenKind::Eq, 2),
            '=' if peek == Some('~') => self.operator(TokenKind::EqRe, 2),
            '=' => self.operator(TokenKind::Assign, 1),
            '!' if peek == Some('=') => self.operator(TokenKind::Ne, 2),
            '!' if peek == Some('~') => self.operator(TokenKind::NeRe, 2),
            '<' if peek == Some('=') => self.operator(TokenKind::Le, 2),
            '<' => self.operator(TokenKind::Lt, 1),
            '>' if peek == Some('=') => self.operator(TokenKind::Ge, 2),
            '>' => self.operator(TokenKind::Gt, 1),
            '.' if peek == Some('&') => self.operator(TokenKind::Mkref, 2),
            '.' if peek == Some('*') => self.operator(TokenKind::Deref, 2),
            '.' => self.operator(TokenKind::Dot, 1),
            ':' if peek == Some(':') => self.operator(TokenKind::Scope, 2),
            ':' => self.operator(TokenKind::Colon, 1),
            ',' => self.operator(TokenKind::Comma, 1),
            ';' => self.operator(TokenKind::Semicolon, 1),
            '(' => self.operator(TokenKind::LParen, 1),
            ')' => self.operator(TokenKind::RParen, 1),
            '{' => self.operator(TokenKind::LBrace, 1),
            '}' => self.operator(TokenKind::RBrace, 1),
            '[' => self.operator(TokenKind::LBracket, 1),
            ']' => self.operator(TokenKind::RBracket, 1),
            _ => {
                let repr = if c.is_control() {
                    quote(&format!("{:#04x}", c as u32))
                } else {
                    quote(&c.to_string())
                };
                return Err(ParseError::new(
                    self.current_location(),
                    format!("unknown token {repr}"),
                ));
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, None)
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_error(source: &str) -> ParseError {
        let mut lexer = Lexer::new(source, None);
        loop {
            match lexer.next_token() {
                Ok(token) if token.is_eof() => panic!("expected a lex error"),
                Ok(_) => continue,
                Err(error) => return error,
            }
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("   \n\t  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(lex("# just a comment"), vec![TokenKind::Eof]);
        assert_eq!(
            lex("foo # comment\nbar"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("let function return null true false"),
            vec![
                TokenKind::Let,
                TokenKind::Function,
                TokenKind::Return,
                TokenKind::Null,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = Lexer::new("foo bar_baz _private x1", None).tokenize().unwrap();
        let literals: Vec<_> = tokens.iter().map(|t| t.literal.clone()).collect();
        assert_eq!(literals, vec!["foo", "bar_baz", "_private", "x1", ""]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Identifier));
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("0 42 123.456 0xff", None).tokenize().unwrap();
        let numbers: Vec<_> = tokens.iter().filter_map(|t| t.number).collect();
        assert_eq!(numbers, vec![0.0, 42.0, 123.456, 255.0]);
    }

    #[test]
    fn test_number_dot_is_not_fraction_without_digits() {
        assert_eq!(
            lex("1.foo"),
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#""foo\t\n\"\\bar" "\x41\x62""#, None)
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].string.as_deref(), Some(b"foo\t\n\"\\bar".as_ref()));
        assert_eq!(tokens[1].string.as_deref(), Some(b"Ab".as_ref()));
        assert_eq!(tokens[0].literal, r#""foo\t\n\"\\bar""#);
    }

    #[test]
    fn test_string_invalid_escape() {
        let error = lex_error(r#""\q""#);
        assert_eq!(error.message, "expected escape sequence, found `\\\\q`");
    }

    #[test]
    fn test_string_invalid_hex_escape() {
        let error = lex_error(r#""\xZZ""#);
        assert_eq!(
            error.message,
            "expected hexadecimal escape sequence, found `\\xZZ`"
        );
    }

    #[test]
    fn test_string_unterminated() {
        let error = lex_error("\"foo");
        assert_eq!(error.message, "expected `\"`, found end-of-file");
    }

    #[test]
    fn test_string_unterminated_mid_escape() {
        let error = lex_error("\"foo\\");
        assert_eq!(error.message, "expected escape sequence, found `\\\\`");
    }

    #[test]
    fn test_string_newline() {
        let error = lex_error("\"foo\nbar\"");
        assert_eq!(error.message, "expected character, found newline");
    }

    #[test]
    fn test_raw_string() {
        let tokens = Lexer::new("`foo\\nbar`", None).tokenize().unwrap();
        assert_eq!(tokens[0].string.as_deref(), Some(b"foo\\nbar".as_ref()));
    }

    #[test]
    fn test_raw_string_triple_tick() {
        let tokens = Lexer::new("```a `tick` b```", None).tokenize().unwrap();
        assert_eq!(tokens[0].string.as_deref(), Some(b"a `tick` b".as_ref()));
    }

    #[test]
    fn test_raw_string_empty_triple_tick() {
        let error = lex_error("``````");
        assert_eq!(error.message, "invalid empty multi-tick raw string");
    }

    #[test]
    fn test_template() {
        let tokens = Lexer::new(r#"$"a {1 + 2} b""#, None).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Template);
        let parts = tokens[0].template.as_ref().unwrap();
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], TemplatePart::Text(t) if t == b"a "));
        assert!(matches!(&parts[1], TemplatePart::Expression(_)));
        assert!(matches!(&parts[2], TemplatePart::Text(t) if t == b" b"));
    }

    #[test]
    fn test_template_brace_escapes() {
        let tokens = Lexer::new(r#"$"{{x}}""#, None).tokenize().unwrap();
        let parts = tokens[0].template.as_ref().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(matches!(&parts[0], TemplatePart::Text(t) if t == b"{x}"));
    }

    #[test]
    fn test_template_unclosed_expression() {
        let error = lex_error(r#"$"{1; }""#);
        assert_eq!(
            error.message,
            "expected `}` to close template expression, found `;`"
        );
    }

    #[test]
    fn test_template_bad_delimiter() {
        let error = lex_error("$foo");
        assert!(error.message.contains("found `$` followed by `f`"));
    }

    #[test]
    fn test_regexp() {
        let tokens = Lexer::new(r#"r"^\w+$" r`\d+`"#, None).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Regexp);
        assert_eq!(tokens[0].string.as_deref(), Some(br"^\w+$".as_ref()));
        assert_eq!(tokens[1].string.as_deref(), Some(br"\d+".as_ref()));
        let pattern = &tokens[0].regexp.as_ref().unwrap().pattern;
        assert!(pattern.is_match(b"hello"));
        assert!(!pattern.is_match(b"hello world"));
    }

    #[test]
    fn test_regexp_invalid() {
        let error = lex_error(r#"r"(unclosed""#);
        assert_eq!(error.message, "invalid regular expression \"(unclosed\"");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("+ - * / % == != <= >= < > =~ !~ .& .* . :: ="),
            vec![
                TokenKind::Add,
                TokenKind::Sub,
                TokenKind::Mul,
                TokenKind::Div,
                TokenKind::Rem,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::EqRe,
                TokenKind::NeRe,
                TokenKind::Mkref,
                TokenKind::Deref,
                TokenKind::Dot,
                TokenKind::Scope,
                TokenKind::Assign,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            lex(", : ; ( ) { } [ ]"),
            vec![
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Semicolon,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unknown_token() {
        let error = lex_error("@");
        assert_eq!(error.message, "unknown token `@`");
    }

    #[test]
    fn test_locations() {
        let tokens = Lexer::new("foo\nbar;", Some(SourceLocation::file("main.mf")))
            .tokenize()
            .unwrap();
        let lines: Vec<_> = tokens
            .iter()
            .map(|t| t.location.as_ref().map(|l| l.line))
            .collect();
        assert_eq!(lines, vec![Some(1), Some(2), Some(2), Some(2)]);
    }

    #[test]
    fn test_locations_absent_without_origin() {
        let tokens = Lexer::new("foo;", None).tokenize().unwrap();
        assert!(tokens.iter().all(|t| t.location.is_none()));
    }

    #[test]
    fn test_location_monotonicity() {
        let source = "let a = 1;\nlet b = `raw\nstring`;\nb;";
        let tokens = Lexer::new(source, Some(SourceLocation::file("main.mf")))
            .tokenize()
            .unwrap();
        let mut previous = 0;
        for token in &tokens {
            let line = token.location.as_ref().map(|l| l.line).unwrap_or(previous);
            assert!(line >= previous, "line went backwards at {:?}", token);
            previous = line;
        }
    }
}
