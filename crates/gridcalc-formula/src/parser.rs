//! Formula compiler
//!
//! A recursive descent parser over the token stream with spreadsheet
//! operator precedence, loosest first:
//!
//! | level | operators |
//! |---|---|
//! | comparison | `=` `<>` `<` `<=` `>` `>=` |
//! | concatenation | `&` |
//! | additive | `+` `-` |
//! | multiplicative | `*` `/` |
//! | prefix | `-` `+` |
//! | power | `^` |
//! | postfix | `%` |
//!
//! so `-2^2` is `-(2^2)`. Compilation never fails: a structural error
//! yields a [`CompiledFormula`] flagged as a bad expression.

use crate::ast::{BinaryOperator, Expr, FormulaReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::get_function_registry;
use crate::tokenizer::{tokenize, Token, TokenKind};
use gridcalc_core::{CellError, Locale, Range, SheetId, Zone};

/// The executable form of one formula text, shared by every cell holding
/// that exact text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    pub tokens: Vec<Token>,
    /// Every reference the formula reads, in source order
    pub references: Vec<FormulaReference>,
    pub(crate) root: Expr,
    pub is_bad_expression: bool,
    /// Why compilation failed
    pub message: Option<String>,
    volatile: bool,
}

/// Compile canonical formula text (`=` prefix, `.` decimals, `,` separators).
///
/// # Example
/// ```rust
/// use gridcalc_formula::compile;
///
/// let formula = compile("=SUM(A1:A10, Sheet2!B3)");
/// assert!(!formula.is_bad_expression);
/// assert_eq!(formula.references.len(), 2);
///
/// assert!(compile("=SUM(1, 2").is_bad_expression);
/// ```
pub fn compile(formula: &str) -> CompiledFormula {
    compile_tokens(tokenize(formula, &Locale::en_us()))
}

/// Compile an already tokenized formula.
pub fn compile_tokens(tokens: Vec<Token>) -> CompiledFormula {
    let mut parser = Parser::new(&tokens);
    let parsed = parser.parse_formula();
    let references = std::mem::take(&mut parser.references);
    match parsed {
        Ok(root) => CompiledFormula {
            volatile: contains_volatile_call(&root),
            root,
            references,
            tokens,
            is_bad_expression: false,
            message: None,
        },
        Err(err) => {
            let message = err.to_string();
            CompiledFormula {
                tokens,
                references: Vec::new(),
                root: Expr::Fail {
                    kind: CellError::BadExpression,
                    message: message.clone(),
                },
                is_bad_expression: true,
                message: Some(message),
                volatile: false,
            }
        }
    }
}

impl CompiledFormula {
    /// Whether the formula calls a function whose result changes on every
    /// evaluation (RAND).
    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    /// Bind the references to sheets. `current_sheet` is used for
    /// unqualified references; `lookup` resolves sheet names.
    ///
    /// References that cannot be bound are kept, marked invalid, so that
    /// the dependency list stays index-aligned with the expression tree.
    pub fn bind_dependencies(
        &self,
        current_sheet: SheetId,
        lookup: impl Fn(&str) -> Option<SheetId>,
    ) -> Vec<Range> {
        self.references
            .iter()
            .map(|reference| {
                let (sheet_id, invalid_sheet_name) = match &reference.sheet_name {
                    None => (current_sheet, None),
                    Some(name) => match lookup(name) {
                        Some(id) => (id, None),
                        None => (current_sheet, Some(name.clone())),
                    },
                };
                let (zone, invalid_xc) = match reference.zone {
                    Some(zone) => (zone, None),
                    None => (Zone::cell(0, 0), Some(reference.xc().to_string())),
                };
                Range {
                    sheet_id,
                    zone,
                    invalid_sheet_name,
                    invalid_xc,
                }
            })
            .collect()
    }
}

fn contains_volatile_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { function, args } => {
            function.volatile || args.iter().any(contains_volatile_call)
        }
        Expr::Unary { operand, .. } => contains_volatile_call(operand),
        Expr::Binary { left, right, .. } => {
            contains_volatile_call(left) || contains_volatile_call(right)
        }
        _ => false,
    }
}

struct Parser<'t> {
    tokens: Vec<&'t Token>,
    pos: usize,
    references: Vec<FormulaReference>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens: tokens.iter().filter(|t| t.kind != TokenKind::Space).collect(),
            pos: 0,
            references: Vec::new(),
        }
    }

    // === Token cursor ===

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    /// Consume an operator token if it is one of `symbols`.
    fn eat_operator(&mut self, symbols: &[&str]) -> Option<&'t str> {
        let token = self.peek()?;
        if token.kind == TokenKind::Operator && symbols.contains(&token.value.as_str()) {
            self.pos += 1;
            return Some(token.value.as_str());
        }
        None
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<()> {
        match self.next() {
            Some(t) if t.kind == kind => Ok(()),
            Some(t) => Err(FormulaError::Parse(format!(
                "Expected {what} but found '{}'",
                t.value
            ))),
            None => Err(FormulaError::Parse(format!("Expected {what}"))),
        }
    }

    // === Grammar ===

    fn parse_formula(&mut self) -> FormulaResult<Expr> {
        if self.eat_operator(&["="]).is_none() {
            return Err(FormulaError::Parse("Formula must start with '='".into()));
        }
        let expr = self.parse_comparison()?;
        if let Some(token) = self.peek() {
            return Err(FormulaError::Parse(format!(
                "Unexpected token '{}'",
                token.value
            )));
        }
        Ok(expr)
    }

    fn parse_binary_level(
        &mut self,
        symbols: &[&str],
        operand: fn(&mut Self) -> FormulaResult<Expr>,
    ) -> FormulaResult<Expr> {
        let mut left = operand(self)?;
        while let Some(symbol) = self.eat_operator(symbols) {
            let op = BinaryOperator::from_symbol(symbol)
                .ok_or_else(|| FormulaError::Parse(format!("Unknown operator '{symbol}'")))?;
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        self.parse_binary_level(&["=", "<>", "<", "<=", ">", ">="], Self::parse_concat)
    }

    fn parse_concat(&mut self) -> FormulaResult<Expr> {
        self.parse_binary_level(&["&"], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        self.parse_binary_level(&["*", "/"], Self::parse_prefix)
    }

    fn parse_prefix(&mut self) -> FormulaResult<Expr> {
        match self.eat_operator(&["-", "+"]) {
            Some("-") => Ok(Expr::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(self.parse_prefix()?),
            }),
            Some(_) => self.parse_prefix(),
            None => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_postfix()?;
        while self.eat_operator(&["^"]).is_some() {
            let right = self.parse_exponent()?;
            left = Expr::Binary {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// The right side of `^` may carry its own sign: `2^-1`.
    fn parse_exponent(&mut self) -> FormulaResult<Expr> {
        match self.eat_operator(&["-", "+"]) {
            Some("-") => Ok(Expr::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(self.parse_exponent()?),
            }),
            Some(_) => self.parse_exponent(),
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> FormulaResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat_operator(&["%"]).is_some() {
            expr = Expr::Unary {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let token = self
            .next()
            .ok_or_else(|| FormulaError::Parse("Unexpected end of formula".into()))?;
        match token.kind {
            TokenKind::Number => parse_number_token(&token.value),
            TokenKind::String => parse_string_token(&token.value),
            TokenKind::Reference => {
                self.references.push(FormulaReference::parse(&token.value));
                Ok(Expr::Reference(self.references.len() - 1))
            }
            TokenKind::Symbol if self.peek_is(TokenKind::LeftParen) => {
                self.parse_call(&token.value)
            }
            TokenKind::Symbol => match token.value.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Expr::Boolean(true)),
                "FALSE" => Ok(Expr::Boolean(false)),
                _ => Err(FormulaError::Parse(format!(
                    "Invalid name '{}'",
                    token.value
                ))),
            },
            TokenKind::LeftParen => {
                let expr = self.parse_comparison()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            _ => Err(FormulaError::Parse(format!(
                "Unexpected token '{}'",
                token.value
            ))),
        }
    }

    fn parse_call(&mut self, name: &str) -> FormulaResult<Expr> {
        let function = get_function_registry()
            .get(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_ascii_uppercase()))?;
        self.expect(TokenKind::LeftParen, "'('")?;

        let mut args = Vec::new();
        if self.peek_is(TokenKind::RightParen) {
            self.pos += 1;
        } else {
            loop {
                let slot_is_empty = matches!(
                    self.peek().map(|t| t.kind),
                    Some(TokenKind::ArgSeparator | TokenKind::RightParen)
                );
                args.push(if slot_is_empty {
                    Expr::Missing
                } else {
                    self.parse_comparison()?
                });
                match self.next() {
                    Some(t) if t.kind == TokenKind::ArgSeparator => continue,
                    Some(t) if t.kind == TokenKind::RightParen => break,
                    Some(t) => {
                        return Err(FormulaError::Parse(format!(
                            "Unexpected token '{}' in arguments of {}",
                            t.value, function.name
                        )))
                    }
                    None => {
                        return Err(FormulaError::Parse(format!(
                            "Missing closing parenthesis for {}",
                            function.name
                        )))
                    }
                }
            }
        }

        if let Err(err) = function.check_arity(args.len()) {
            return Ok(Expr::Fail {
                kind: err.kind(),
                message: err.to_string(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}

fn parse_number_token(text: &str) -> FormulaResult<Expr> {
    let (digits, percent) = match text.strip_suffix('%') {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| FormulaError::Parse(format!("Invalid number '{text}'")))?;
    Ok(Expr::Number(if percent { value / 100.0 } else { value }))
}

/// Unquote a string token, `""` standing for one quote.
fn parse_string_token(text: &str) -> FormulaResult<Expr> {
    let mut value = String::new();
    let mut chars = text.chars().skip(1).peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            value.push(c);
        } else if chars.peek() == Some(&'"') {
            chars.next();
            value.push('"');
        } else {
            return Ok(Expr::String(value));
        }
    }
    Err(FormulaError::Parse("Unterminated string".into()))
}
