//! Formula text → flat token stream
//!
//! The tokenizer never fails and never validates structure: every input
//! character lands in exactly one token, so concatenating the token values
//! reproduces the input. That property is what formula translation between
//! locales relies on.

use gridcalc_core::Locale;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    String,
    /// Function name or bare identifier
    Symbol,
    Operator,
    Reference,
    ArgSeparator,
    LeftParen,
    RightParen,
    Space,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}

/// Cell, range, full-column and full-row references, optionally
/// sheet-qualified (`Sheet2!`, `'My sheet'!`) and `$`-anchored.
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    let sheet = r"(?:'(?:[^']|'')+'!|[A-Za-z_][A-Za-z0-9_.]*!)?";
    let cell = r"\$?[A-Za-z]{1,3}\$?[0-9]+";
    let col = r"\$?[A-Za-z]{1,3}";
    let row = r"\$?[0-9]+";
    let pattern = format!(
        "^{sheet}(?:{cell}(?::(?:{cell}|{col}|{row}))?|{col}:(?:{cell}|{col})|{row}:{row})"
    );
    Regex::new(&pattern).expect("reference regex")
});

const OPERATORS: [&str; 14] = [
    "<=", ">=", "<>", "+", "-", "*", "/", "^", "&", "=", "<", ">", "%", ":",
];

/// Split formula text (including its leading `=`) into tokens, reading
/// numbers and argument separators the way `locale` writes them.
///
/// ```
/// use gridcalc_core::Locale;
/// use gridcalc_formula::tokenizer::{tokenize, TokenKind};
///
/// let tokens = tokenize("=SUM(A1;2,5)", &Locale::de_de());
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, [
///     TokenKind::Operator, TokenKind::Symbol, TokenKind::LeftParen, TokenKind::Reference,
///     TokenKind::ArgSeparator, TokenKind::Number, TokenKind::RightParen,
/// ]);
/// ```
pub fn tokenize(formula: &str, locale: &Locale) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = formula;
    while let Some(c) = rest.chars().next() {
        let (token, len) = next_token(rest, c, locale);
        tokens.push(token);
        rest = &rest[len..];
    }
    tokens
}

fn next_token(rest: &str, c: char, locale: &Locale) -> (Token, usize) {
    if c.is_whitespace() {
        let len = byte_len_while(rest, char::is_whitespace);
        return (Token::new(TokenKind::Space, &rest[..len]), len);
    }
    if c == '"' {
        let len = string_len(rest);
        return (Token::new(TokenKind::String, &rest[..len]), len);
    }
    if c == '(' {
        return (Token::new(TokenKind::LeftParen, "("), 1);
    }
    if c == ')' {
        return (Token::new(TokenKind::RightParen, ")"), 1);
    }
    if let Some(m) = REFERENCE_RE.find(rest) {
        let after = rest[m.end()..].chars().next();
        let continues = after.is_some_and(|a| a == '(' || a == '!' || is_identifier_char(a));
        if !continues {
            return (Token::new(TokenKind::Reference, m.as_str()), m.end());
        }
    }
    if let Some(len) = number_len(rest, locale) {
        return (Token::new(TokenKind::Number, &rest[..len]), len);
    }
    if c == locale.formula_arg_separator {
        return (Token::new(TokenKind::ArgSeparator, c.to_string()), c.len_utf8());
    }
    if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
        return (Token::new(TokenKind::Operator, *op), op.len());
    }
    if c.is_ascii_alphabetic() || c == '_' {
        let len = byte_len_while(rest, |ch| is_identifier_char(ch) || ch == '$');
        return (Token::new(TokenKind::Symbol, &rest[..len]), len);
    }
    (Token::new(TokenKind::Unknown, c.to_string()), c.len_utf8())
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn byte_len_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(s.len(), |(i, _)| i)
}

/// Length of a double-quoted string, `""` being an escaped quote. An
/// unterminated string runs to the end of the input.
fn string_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// `12`, `1,5` (decimal comma locales), `.5`, `3e-2`, `40%`
fn number_len(s: &str, locale: &Locale) -> Option<usize> {
    let decimal = locale.decimal_separator;
    let digits = |from: usize| byte_len_while(&s[from..], |c| c.is_ascii_digit());

    let mut len = digits(0);
    if s[len..].starts_with(decimal) && s[len + decimal.len_utf8()..].starts_with(|c: char| c.is_ascii_digit() || len > 0) {
        len += decimal.len_utf8();
        len += digits(len);
    }
    if len == 0 || !s[..len].bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if s[len..].starts_with(['e', 'E']) {
        let mut exp = len + 1;
        if s[exp..].starts_with(['+', '-']) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            len = exp + exp_digits;
        }
    }
    if s[len..].starts_with('%') {
        len += 1;
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds_and_values(formula: &str, locale: &Locale) -> Vec<(TokenKind, String)> {
        tokenize(formula, locale)
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn test_simple_formula() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_values("=1 + A1*2.5%", &Locale::en_us()),
            vec![
                (Operator, "=".into()),
                (Number, "1".into()),
                (Space, " ".into()),
                (Operator, "+".into()),
                (Space, " ".into()),
                (Reference, "A1".into()),
                (Operator, "*".into()),
                (Number, "2.5%".into()),
            ]
        );
    }

    #[test]
    fn test_references() {
        let en = Locale::en_us();
        for reference in ["A1", "$B$2", "A1:B3", "A:A", "$C:D", "3:5", "B2:B", "Sheet2!A1", "'My ''x'' sheet'!A1:C3"] {
            let tokens = tokenize(reference, &en);
            assert_eq!(tokens, vec![Token::new(TokenKind::Reference, reference)], "{reference}");
        }
    }

    #[test]
    fn test_function_names_are_not_references() {
        let tokens = tokenize("LOG10(A1)", &Locale::en_us());
        assert_eq!(tokens[0], Token::new(TokenKind::Symbol, "LOG10"));
        let tokens = tokenize("TRUE", &Locale::en_us());
        assert_eq!(tokens[0], Token::new(TokenKind::Symbol, "TRUE"));
        let tokens = tokenize("A1B", &Locale::en_us());
        assert_eq!(tokens, vec![Token::new(TokenKind::Symbol, "A1B")]);
    }

    #[test]
    fn test_strings_keep_whitespace() {
        let tokens = tokenize(r#"="a  ""b"" c"&"x"#, &Locale::en_us());
        assert_eq!(tokens[1], Token::new(TokenKind::String, r#""a  ""b"" c""#));
        assert_eq!(tokens[3], Token::new(TokenKind::String, r#""x"#));
    }

    #[test]
    fn test_locale_numbers_and_separators() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_values("=F(1,5;,5)", &Locale::de_de()),
            vec![
                (Operator, "=".into()),
                (Symbol, "F".into()),
                (LeftParen, "(".into()),
                (Number, "1,5".into()),
                (ArgSeparator, ";".into()),
                (Number, ",5".into()),
                (RightParen, ")".into()),
            ]
        );
        assert_eq!(
            kinds_and_values("=F(1,5)", &Locale::en_us())[3..6],
            [(Number, "1".into()), (ArgSeparator, ",".into()), (Number, "5".into())]
        );
    }

    #[test]
    fn test_exponent_and_unknown() {
        let tokens = tokenize("=1e3+2E-2+3e", &Locale::en_us());
        assert_eq!(tokens[1].value, "1e3");
        assert_eq!(tokens[3].value, "2E-2");
        assert_eq!(tokens[5].value, "3");
        assert_eq!(tokens[6].kind, TokenKind::Symbol);

        let tokens = tokenize("=#?", &Locale::en_us());
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
    }

    #[test]
    fn test_tokens_cover_input() {
        let formula = "=IF(A1>=2, \"yes\" , SUM(B:B) ) & 'S 1'!C3 ## é";
        let rebuilt: String = tokenize(formula, &Locale::en_us())
            .into_iter()
            .map(|t| t.value)
            .collect();
        assert_eq!(rebuilt, formula);
    }
}
