//! Calculator tool — evaluates arithmetic the model writes out.
//!
//! Input is filtered down to digits and operator characters before it is
//! evaluated, so prose around the expression ("x = 3 * 7", "12 * 8 cm") is
//! tolerated. Evaluation goes through a small recursive-descent parser over
//! `+ - * / ( )` and decimal numbers; nothing else is ever executed.

use async_trait::async_trait;
use ponder_core::error::ToolError;
use ponder_core::tool::Tool;
use tracing::debug;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "Calculator"
    }

    fn description(&self) -> &str {
        "Useful for getting the result of a math expression. Input should be a valid \
         mathematical expression that could be executed by a simple calculator."
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let expr = prepare_expression(input).map_err(ToolError::Evaluation)?;
        if expr.is_empty() {
            return Err(ToolError::Evaluation(format!(
                "no arithmetic expression in '{input}'"
            )));
        }

        let value = evaluate(&expr).map_err(ToolError::Evaluation)?;
        let formatted = format_number(value);
        debug!(input = %input, expression = %expr, result = %formatted, "Calculated");
        Ok(formatted)
    }
}

/// Reduce free text to an expression the evaluator accepts.
///
/// Text after the first `=` is used (so `x=3*7` evaluates `3*7`); when
/// nothing follows the `=` (`12*8=`), the text before it is used instead.
/// Only digits, `+ - * / ( ) . ,` and `:` survive. `:` is read as division.
/// Commas are accepted only as thousands separators (`1,500`); any other
/// comma is rejected rather than guessed at.
pub fn prepare_expression(input: &str) -> Result<String, String> {
    let source = match input.split_once('=') {
        Some((before, after)) if after.trim().is_empty() => before,
        Some((_, after)) => after,
        None => input,
    };

    let filtered: String = source
        .chars()
        .filter_map(|c| match c {
            '0'..='9' | '+' | '-' | '*' | '/' | '(' | ')' | '.' | ',' => Some(c),
            ':' => Some('/'),
            _ => None,
        })
        .collect();

    let is_numeric = |c: char| c.is_ascii_digit() || c == '.' || c == ',';
    let mut expr = String::with_capacity(filtered.len());
    let mut rest = filtered.as_str();
    while let Some(start) = rest.find(is_numeric) {
        expr.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail.find(|c| !is_numeric(c)).unwrap_or(tail.len());
        expr.push_str(&ungroup(&tail[..end])?);
        rest = &tail[end..];
    }
    expr.push_str(rest);
    Ok(expr)
}

/// Drop thousands separators from a numeric literal. Groups after the
/// first must be exactly three digits and the fraction may not hold commas.
fn ungroup(literal: &str) -> Result<String, String> {
    if !literal.contains(',') {
        return Ok(literal.to_string());
    }

    let (whole, fraction) = match literal.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (literal, None),
    };
    let mut groups = whole.split(',');
    let lead_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
    let rest_ok = groups.all(|g| g.len() == 3);
    let fraction_ok = fraction.is_none_or(|f| !f.contains(','));

    if lead_ok && rest_ok && fraction_ok {
        Ok(literal.replace(',', ""))
    } else {
        Err(format!(
            "ambiguous comma in '{literal}'; write numbers without separators and use '.' for decimals"
        ))
    }
}

/// Render a result without a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Deepest nesting of parentheses and unary signs the evaluator accepts.
const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "unexpected token at position {}: {:?}",
            parser.pos, parser.tokens[parser.pos]
        ));
    }
    if !result.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    literal.push(d);
                    chars.next();
                }
                let num = literal
                    .parse()
                    .map_err(|_| format!("invalid number: {literal}"))?;
                tokens.push(Token::Number(num));
                continue;
            }
            c => return Err(format!("unexpected character: '{c}'")),
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, String>,
    ) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => return Ok(left),
            }
        }
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("division by zero".into());
                    }
                    left /= right;
                }
                _ => return Ok(left),
            }
        }
    }

    // unary = ('-' | '+') unary | primary
    fn parse_unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.nested(Self::parse_unary)?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_primary(),
        }
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                let val = self.nested(Self::parse_expr)?;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err("expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("unexpected token: {tok:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
