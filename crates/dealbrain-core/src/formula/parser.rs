//! Formula parser
//!
//! Recursive-descent parser producing the restricted AST. Statements,
//! assignments, attribute access, subscripts and calls to names outside
//! the whitelist have no grammar rules, so they fail here rather than
//! at evaluation time.

use super::ast::{BinaryOp, Expr};
use super::functions::Function;
use super::{FormulaError, FormulaResult};

/// Formula parser
pub struct FormulaParser {
    input: Vec<char>,
    pos: usize,
}

impl FormulaParser {
    /// Create a new parser
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Parse the input into an expression
    pub fn parse(input: &str) -> FormulaResult<Expr> {
        let mut parser = Self::new(input);
        let expr = parser.parse_comparison()?;
        parser.skip_whitespace();
        if parser.pos < parser.input.len() {
            return Err(FormulaError::Parse(format!(
                "unexpected character at position {}: '{}'",
                parser.pos, parser.input[parser.pos]
            )));
        }
        Ok(expr)
    }

    /// Parse comparison expression (lowest precedence)
    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_str("==") {
                BinaryOp::Eq
            } else if self.match_str("!=") {
                BinaryOp::Ne
            } else if self.match_str("<=") {
                BinaryOp::Le
            } else if self.match_str(">=") {
                BinaryOp::Ge
            } else if self.match_char('<') {
                BinaryOp::Lt
            } else if self.match_char('>') {
                BinaryOp::Gt
            } else {
                break;
            };

            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse additive expression (+, -)
    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_char('+') {
                BinaryOp::Add
            } else if self.match_char('-') {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplicative expression (*, /, //, %)
    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_str("//") {
                BinaryOp::FloorDiv
            } else if self.match_char('/') {
                BinaryOp::Div
            } else if self.match_char('%') {
                BinaryOp::Mod
            } else if self.peek() == Some('*') && self.peek_at(1) != Some('*') {
                self.advance();
                BinaryOp::Mul
            } else {
                break;
            };

            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary minus
    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        self.skip_whitespace();

        if self.match_char('-') {
            let operand = self.parse_unary()?;
            return Ok(Expr::neg(operand));
        }

        self.parse_power()
    }

    /// Parse power expression (**, right associative)
    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let base = self.parse_primary()?;

        self.skip_whitespace();
        if self.match_str("**") {
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }

        Ok(base)
    }

    /// Parse primary expression (literals, identifiers, calls, parens)
    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        self.skip_whitespace();

        // Parenthesized expression
        if self.match_char('(') {
            let expr = self.parse_comparison()?;
            self.skip_whitespace();
            if !self.match_char(')') {
                return Err(FormulaError::Parse("expected ')'".to_string()));
            }
            return Ok(expr);
        }

        // String literal
        if self.peek() == Some('"') || self.peek() == Some('\'') {
            return self.parse_string();
        }

        // Number literal
        if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return self.parse_number();
        }

        // Identifier or function call
        if self
            .peek()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        {
            return self.parse_identifier_or_call();
        }

        Err(FormulaError::Parse(format!(
            "unexpected character at position {}: {:?}",
            self.pos,
            self.peek()
        )))
    }

    /// Parse string literal
    fn parse_string(&mut self) -> FormulaResult<Expr> {
        let quote = self
            .advance()
            .ok_or_else(|| FormulaError::Parse("expected string".to_string()))?;
        let mut s = String::new();

        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                return Ok(Expr::Str(s));
            }
            if c == '\\' {
                self.advance();
                match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some('\'') => s.push('\''),
                    Some(c) => s.push(c),
                    None => return Err(FormulaError::Parse("unexpected end of string".to_string())),
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        Err(FormulaError::Parse("unterminated string".to_string()))
    }

    /// Parse number literal
    fn parse_number(&mut self) -> FormulaResult<Expr> {
        let mut s = String::new();
        let mut seen_dot = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else if c == '.' && !seen_dot {
                if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    seen_dot = true;
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        s.parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| FormulaError::Parse(format!("invalid number: {}", s)))
    }

    /// Parse identifier, resolving calls against the function whitelist
    fn parse_identifier_or_call(&mut self) -> FormulaResult<Expr> {
        let mut ident = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        self.skip_whitespace();
        if self.match_char('(') {
            let function = Function::from_name(&ident)
                .ok_or_else(|| FormulaError::UnknownFunction(ident.clone()))?;
            let args = self.parse_call_args()?;
            return Ok(Expr::Call { function, args });
        }

        Ok(Expr::Ident(ident))
    }

    /// Parse function call arguments
    fn parse_call_args(&mut self) -> FormulaResult<Vec<Expr>> {
        let mut args = Vec::new();

        self.skip_whitespace();
        if !self.check(')') {
            loop {
                let arg = self.parse_comparison()?;
                args.push(arg);
                self.skip_whitespace();
                if !self.match_char(',') {
                    break;
                }
            }
        }

        if !self.match_char(')') {
            return Err(FormulaError::Parse("expected ')'".to_string()));
        }

        Ok(args)
    }

    // ==================== Low-level helpers ====================

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn check(&self, expected: char) -> bool {
        self.peek() == Some(expected)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn match_str(&mut self, expected: &str) -> bool {
        let chars: Vec<char> = expected.chars().collect();
        if self.input.len() < self.pos + chars.len() {
            return false;
        }
        if self.input[self.pos..self.pos + chars.len()] == chars[..] {
            self.pos += chars.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.advance();
        }
    }
}
