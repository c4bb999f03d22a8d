//! Evaluator for `#if` / `#elif` conditions.
//!
//! The expression language is tiny: `true`, `false`, preprocessor symbols,
//! `!`, `&&`, `||`, `==`, `!=`, and parentheses, evaluated left to right.
//! Any lexical or syntactic flaw aborts evaluation; the caller reports
//! `InvalidPPExpression` and treats the condition as false.

use crate::options::OptionStack;

/// Marker for a malformed conditional expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpError;

#[derive(Debug, Clone, PartialEq)]
enum PpToken {
    True,
    False,
    Ident(String),
    Not,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    LParen,
    RParen,
}

fn is_symbol_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_symbol_part(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Single-pass tokenizer. Every token must follow the previous one
/// directly (after optional whitespace) and the whole string must be
/// consumed; anything else is an error.
fn tokenize(text: &str) -> Result<Vec<PpToken>, PpError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(PpToken::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(PpToken::RParen);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PpToken::NotEq);
                    i += 2;
                } else {
                    tokens.push(PpToken::Not);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PpToken::EqEq);
                    i += 2;
                } else {
                    return Err(PpError);
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(PpToken::AndAnd);
                    i += 2;
                } else {
                    return Err(PpError);
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(PpToken::OrOr);
                    i += 2;
                } else {
                    return Err(PpError);
                }
            }
            c if is_symbol_start(c) || c == '\\' => {
                let mut name = String::new();
                while i < chars.len() {
                    let c = chars[i];
                    if is_symbol_part(c) {
                        name.push(c);
                        i += 1;
                    } else if c == '\\' {
                        // Unfold a \u / \U escape into the symbol text.
                        match chars.get(i + 1) {
                            Some('u') | Some('U') => {
                                i += 2;
                                let mut value = 0u32;
                                let mut digits = 0;
                                while digits < 4 {
                                    match chars.get(i).and_then(|c| c.to_digit(16)) {
                                        Some(d) => {
                                            value = value * 16 + d;
                                            digits += 1;
                                            i += 1;
                                        }
                                        None => break,
                                    }
                                }
                                if digits == 0 {
                                    return Err(PpError);
                                }
                                match char::from_u32(value) {
                                    Some(decoded) => name.push(decoded),
                                    None => return Err(PpError),
                                }
                            }
                            _ => return Err(PpError),
                        }
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(PpError);
                }
                tokens.push(match name.as_str() {
                    "true" => PpToken::True,
                    "false" => PpToken::False,
                    _ => PpToken::Ident(name),
                });
            }
            _ => return Err(PpError),
        }
    }
    Ok(tokens)
}

struct PpParser<'a> {
    tokens: Vec<PpToken>,
    pos: usize,
    options: &'a OptionStack,
}

impl<'a> PpParser<'a> {
    fn peek(&self) -> Option<&PpToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<PpToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &PpToken) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<bool, PpError> {
        let mut value = self.parse_and()?;
        while self.eat(&PpToken::OrOr) {
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, PpError> {
        let mut value = self.parse_equality()?;
        while self.eat(&PpToken::AndAnd) {
            let rhs = self.parse_equality()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_equality(&mut self) -> Result<bool, PpError> {
        let mut value = self.parse_unary()?;
        loop {
            if self.eat(&PpToken::EqEq) {
                let rhs = self.parse_unary()?;
                value = value == rhs;
            } else if self.eat(&PpToken::NotEq) {
                let rhs = self.parse_unary()?;
                value = value != rhs;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<bool, PpError> {
        let mut negations = 0;
        while self.eat(&PpToken::Not) {
            negations += 1;
        }
        let value = self.parse_primary()?;
        Ok(if negations % 2 == 1 { !value } else { value })
    }

    fn parse_primary(&mut self) -> Result<bool, PpError> {
        match self.bump() {
            Some(PpToken::True) => Ok(true),
            Some(PpToken::False) => Ok(false),
            Some(PpToken::Ident(name)) => Ok(self.options.is_defined(&name)),
            Some(PpToken::LParen) => {
                let value = self.parse_or()?;
                if self.eat(&PpToken::RParen) {
                    Ok(value)
                } else {
                    Err(PpError)
                }
            }
            _ => Err(PpError),
        }
    }
}

/// Evaluate a directive condition against the current preprocessor
/// symbols. The whole text must form exactly one expression.
pub fn evaluate(text: &str, options: &OptionStack) -> Result<bool, PpError> {
    let tokens = tokenize(text)?;
    let mut parser = PpParser {
        tokens,
        pos: 0,
        options,
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(PpError);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CompilerOptions, OptionStack};

    fn options_with(defines: &[&str]) -> OptionStack {
        let mut base = CompilerOptions::new();
        for d in defines {
            base.define(d);
        }
        OptionStack::new(base)
    }

    #[test]
    fn literals_evaluate() {
        let opts = options_with(&[]);
        assert_eq!(evaluate("true", &opts), Ok(true));
        assert_eq!(evaluate("false", &opts), Ok(false));
    }

    #[test]
    fn symbols_reflect_defines() {
        let opts = options_with(&["DEBUG"]);
        assert_eq!(evaluate("DEBUG", &opts), Ok(true));
        assert_eq!(evaluate("RELEASE", &opts), Ok(false));
    }

    #[test]
    fn connectives_and_parens() {
        let opts = options_with(&["YES"]);
        assert_eq!(evaluate("YES && NO", &opts), Ok(false));
        assert_eq!(evaluate("NO || YES", &opts), Ok(true));
        assert_eq!(evaluate("!(YES && NO)", &opts), Ok(true));
        assert_eq!(evaluate("!!YES", &opts), Ok(true));
    }

    #[test]
    fn equality_compares_truth_values() {
        let opts = options_with(&["A"]);
        assert_eq!(evaluate("A == true", &opts), Ok(true));
        assert_eq!(evaluate("A != B", &opts), Ok(true));
        assert_eq!(evaluate("A == B", &opts), Ok(false));
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        let opts = options_with(&[]);
        assert_eq!(evaluate("a a a", &opts), Err(PpError));
        assert_eq!(evaluate("true true", &opts), Err(PpError));
    }

    #[test]
    fn malformed_operators_are_an_error() {
        let opts = options_with(&[]);
        assert_eq!(evaluate("a & b", &opts), Err(PpError));
        assert_eq!(evaluate("a = b", &opts), Err(PpError));
        assert_eq!(evaluate("(a", &opts), Err(PpError));
        assert_eq!(evaluate("", &opts), Err(PpError));
    }

    #[test]
    fn unicode_escapes_unfold_in_symbols() {
        let opts = options_with(&["AB"]);
        assert_eq!(evaluate("\\u0041B", &opts), Ok(true));
        assert_eq!(evaluate("A\\u0042", &opts), Ok(true));
    }
}
