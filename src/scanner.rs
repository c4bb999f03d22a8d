//! Scanner with an embedded preprocessor.
//!
//! Tokens are read one at a time from the [`SourceReader`]. Directive lines
//! (`#if`, `#pragma`, `#line`, ...) are consumed here and never surface as
//! tokens; they mutate the option scope stack and the per-buffer session
//! state instead. Inactive conditional blocks are skipped line-by-line
//! while still tracking nested `#if` depth.

use std::collections::VecDeque;
use std::str::FromStr;

use rust_decimal::Decimal;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use crate::compiler::Compiler;
use crate::diagnostic::{char_literal, is_valid_warning, Diagnostic, DiagnosticKind};
use crate::intern::Symbol;
use crate::position::Position;
use crate::ppexpr;
use crate::source::{SourceLoader, SourceReader, SourceText, NUL};
use crate::token::{LineMap, Token, TokenKind, TokenValue};

/// Identifier start: Unicode letters, `_`, and letter-number characters
/// such as Roman numerals.
pub(crate) fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic() || c.general_category() == GeneralCategory::LetterNumber
}

/// Identifier continuation adds digits, combining marks, connector
/// punctuation, and format characters.
pub(crate) fn is_identifier_part(c: char) -> bool {
    if is_identifier_start(c) || c.is_ascii_digit() {
        return true;
    }
    matches!(
        c.general_category(),
        GeneralCategory::DecimalNumber
            | GeneralCategory::NonspacingMark
            | GeneralCategory::SpacingMark
            | GeneralCategory::ConnectorPunctuation
            | GeneralCategory::Format
    )
}

/// Parse accumulated integer digits; the flag reports overflow past
/// 64 bits.
fn parse_integer_text(text: &str) -> (u64, bool) {
    match text.parse::<u64>() {
        Ok(value) => (value, false),
        Err(_) => (0, true),
    }
}

/// State of one `#if`/`#elif`/`#else` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PpBranch {
    /// A branch at this level has evaluated true.
    True,
    /// No branch has evaluated true yet.
    False,
    /// The `#else` branch has been seen.
    Else,
}

pub struct Scanner<'c> {
    compiler: &'c mut Compiler,
    reader: SourceReader,
    pushback: VecDeque<Token>,
    started: bool,
    finished: bool,
    buffer_done: bool,
    source_sym: Option<Symbol>,
    token_start: Position,

    // Per-buffer session state, reset when a new source loads.
    pp_nesting: Vec<PpBranch>,
    region_depth: u32,
    first_on_line: bool,
    saw_non_pp: bool,
    line_map: LineMap,
    source_map: Option<Symbol>,
}

impl<'c> Scanner<'c> {
    pub fn new(compiler: &'c mut Compiler, sources: Vec<SourceText>) -> Self {
        Scanner::from_reader(compiler, SourceReader::new(sources))
    }

    pub fn with_loader(
        compiler: &'c mut Compiler,
        sources: Vec<SourceText>,
        loader: Box<dyn SourceLoader>,
    ) -> Self {
        Scanner::from_reader(compiler, SourceReader::with_loader(sources, loader))
    }

    fn from_reader(compiler: &'c mut Compiler, reader: SourceReader) -> Self {
        Scanner {
            compiler,
            reader,
            pushback: VecDeque::new(),
            started: false,
            finished: false,
            buffer_done: false,
            source_sym: None,
            token_start: Position::start(),
            pp_nesting: Vec::new(),
            region_depth: 0,
            first_on_line: true,
            saw_non_pp: false,
            line_map: LineMap::Default,
            source_map: None,
        }
    }

    pub fn compiler(&self) -> &Compiler {
        self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut Compiler {
        self.compiler
    }

    /// Re-queue a token. Pushed tokens re-emerge from
    /// [`next_token`](Self::next_token) in the order they were pushed,
    /// ahead of freshly scanned ones.
    pub fn push_back(&mut self, token: Token) {
        self.pushback.push_back(token);
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.pushback.pop_front() {
            return token;
        }
        self.read_token()
    }

    fn report(&mut self, position: Position, diag: Diagnostic) {
        let source = self.current_source();
        self.compiler.report(source, position, diag);
    }

    fn current_source(&mut self) -> Symbol {
        match self.source_sym {
            Some(sym) => sym,
            None => {
                let sym = self.compiler.intern("");
                self.source_sym = Some(sym);
                sym
            }
        }
    }

    fn make_token(&mut self, kind: TokenKind, value: TokenValue) -> Token {
        Token {
            kind,
            source: self.current_source(),
            start: self.token_start,
            end: self.reader.last_position(),
            value,
            line_map: self.line_map,
            source_map: self.source_map,
        }
    }

    fn make_marker(&mut self, kind: TokenKind, position: Position) -> Token {
        Token {
            kind,
            source: self.current_source(),
            start: position,
            end: position,
            value: TokenValue::None,
            line_map: self.line_map,
            source_map: self.source_map,
        }
    }

    /// Load the next buffer and reset per-buffer state. Reports any files
    /// the reader had to skip because they failed to load.
    fn begin_next_source(&mut self) -> bool {
        self.buffer_done = false;
        self.started = true;
        let loaded = self.reader.next_source();
        for (name, err) in self.reader.take_load_errors() {
            let sym = self.compiler.intern(&name);
            self.compiler.report(
                sym,
                Position::start(),
                Diagnostic::with_args(
                    DiagnosticKind::SourceFileCouldNotBeOpened,
                    vec![name, err.to_string()],
                ),
            );
        }
        if !loaded {
            return false;
        }
        let name = self.reader.current_name().to_string();
        self.source_sym = Some(self.compiler.intern(&name));
        self.compiler.push_options();
        self.pp_nesting.clear();
        self.region_depth = 0;
        self.first_on_line = true;
        self.saw_non_pp = false;
        self.line_map = LineMap::Default;
        self.source_map = None;
        self.reader.advance();
        true
    }

    fn read_token(&mut self) -> Token {
        loop {
            if self.finished {
                let pos = self.token_start;
                return self.make_marker(TokenKind::Eod, pos);
            }
            if !self.started || self.buffer_done {
                if !self.begin_next_source() {
                    self.finished = true;
                    let pos = self.token_start;
                    return self.make_marker(TokenKind::Eod, pos);
                }
            }

            // Whitespace, noting line starts for the preprocessor.
            loop {
                let c = self.reader.current();
                if c == '\n' {
                    self.first_on_line = true;
                    self.reader.advance();
                } else if c != NUL && c.is_whitespace() {
                    self.reader.advance();
                } else {
                    break;
                }
            }

            let c = self.reader.current();
            if c == NUL {
                return self.finish_buffer();
            }

            self.token_start = self.reader.position();

            if c == '#' {
                if self.first_on_line {
                    self.scan_directive();
                } else {
                    let pos = self.reader.position();
                    self.report(pos, Diagnostic::new(DiagnosticKind::PPNotFirstToken));
                    self.skip_to_eol();
                }
                continue;
            }

            let token = match c {
                '"' => Some(self.scan_string_literal()),
                '\'' => Some(self.scan_char_literal()),
                '@' => self.scan_verbatim(),
                '/' => self.scan_slash(),
                '0'..='9' => Some(self.scan_number(false)),
                '.' => Some(self.scan_period()),
                c if is_identifier_start(c) || c == '\\' => self.scan_identifier_token(false),
                _ => self.scan_punctuation(),
            };

            if let Some(token) = token {
                self.saw_non_pp = true;
                self.first_on_line = false;
                return token;
            }
            // Comments and skipped junk still count against line starts; a
            // later newline re-arms the directive check.
            self.first_on_line = false;
        }
    }

    /// End-of-buffer: complain about unclosed nesting, pop the option
    /// scope, and emit the per-buffer `EOF` marker.
    fn finish_buffer(&mut self) -> Token {
        let pos = self.reader.position();
        if !self.pp_nesting.is_empty() {
            self.report(pos, Diagnostic::new(DiagnosticKind::PPEndIfExpected));
            self.pp_nesting.clear();
        }
        if self.region_depth > 0 {
            self.report(pos, Diagnostic::new(DiagnosticKind::EndRegionExpected));
            self.region_depth = 0;
        }
        self.compiler.pop_options();
        self.buffer_done = true;
        self.token_start = pos;
        self.make_marker(TokenKind::Eof, pos)
    }

    // =========================================================================
    // Literals
    // =========================================================================

    fn scan_string_literal(&mut self) -> Token {
        let mut value = String::new();
        self.reader.advance();
        loop {
            match self.reader.current() {
                '"' => {
                    self.reader.advance();
                    break;
                }
                '\n' => {
                    let pos = self.reader.position();
                    self.report(pos, Diagnostic::new(DiagnosticKind::NewlineInConstant));
                    break;
                }
                NUL => {
                    let start = self.token_start;
                    self.report(start, Diagnostic::new(DiagnosticKind::UnterminatedStringLiteral));
                    break;
                }
                '\\' => {
                    if let Some(decoded) = self.scan_escape() {
                        value.push(decoded);
                    }
                }
                c => {
                    value.push(c);
                    self.reader.advance();
                }
            }
        }
        self.make_token(TokenKind::Literal, TokenValue::Str(value))
    }

    fn scan_char_literal(&mut self) -> Token {
        self.reader.advance();
        let value = match self.reader.current() {
            '\'' => {
                let start = self.token_start;
                self.report(start, Diagnostic::new(DiagnosticKind::EmptyCharacterLiteral));
                self.reader.advance();
                return self.make_token(TokenKind::Literal, TokenValue::Char('\0'));
            }
            '\n' => {
                let pos = self.reader.position();
                self.report(pos, Diagnostic::new(DiagnosticKind::NewlineInConstant));
                return self.make_token(TokenKind::Literal, TokenValue::Char('\0'));
            }
            NUL => {
                let pos = self.reader.position();
                self.report(pos, Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "'"));
                return self.make_token(TokenKind::Literal, TokenValue::Char('\0'));
            }
            '\\' => self.scan_escape().unwrap_or('\0'),
            c => {
                self.reader.advance();
                c
            }
        };
        match self.reader.current() {
            '\'' => {
                self.reader.advance();
            }
            '\n' | NUL => {
                let pos = self.reader.position();
                self.report(pos, Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "'"));
            }
            _ => {
                // Skip to the closing quote; escapes may hide a quote.
                loop {
                    match self.reader.current() {
                        '\'' | '\n' | NUL => break,
                        '\\' => {
                            self.reader.advance();
                            if !matches!(self.reader.current(), '\n' | NUL) {
                                self.reader.advance();
                            }
                        }
                        _ => {
                            self.reader.advance();
                        }
                    }
                }
                if self.reader.current() == '\'' {
                    self.reader.advance();
                    let start = self.token_start;
                    self.report(start, Diagnostic::new(DiagnosticKind::CharacterLiteralTooLong));
                } else {
                    let pos = self.reader.position();
                    self.report(pos, Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "'"));
                }
            }
        }
        self.make_token(TokenKind::Literal, TokenValue::Char(value))
    }

    /// Decode one backslash escape. On an unrecognized escape the escaped
    /// character itself is the substitute. Returns `None` when the escape
    /// runs into a newline or end-of-buffer, leaving the terminator for
    /// the caller.
    fn scan_escape(&mut self) -> Option<char> {
        let c = self.reader.advance();
        let pos = self.reader.position();
        let decoded = match c {
            '\'' => '\'',
            '"' => '"',
            '\\' => '\\',
            '0' => '\0',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0C',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0B',
            'x' | 'u' | 'U' => {
                self.reader.advance();
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 4 {
                    match self.reader.current().to_digit(16) {
                        Some(d) => {
                            value = value * 16 + d;
                            digits += 1;
                            self.reader.advance();
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    self.report(pos, Diagnostic::new(DiagnosticKind::UnrecognizedEscape));
                    return Some(c);
                }
                return Some(char::from_u32(value).unwrap_or('\u{FFFD}'));
            }
            '\n' | NUL => {
                self.report(pos, Diagnostic::new(DiagnosticKind::UnrecognizedEscape));
                return None;
            }
            other => {
                self.report(pos, Diagnostic::new(DiagnosticKind::UnrecognizedEscape));
                self.reader.advance();
                return Some(other);
            }
        };
        self.reader.advance();
        Some(decoded)
    }

    // =========================================================================
    // Verbatim forms
    // =========================================================================

    fn scan_verbatim(&mut self) -> Option<Token> {
        let c = self.reader.advance();
        match c {
            '"' => Some(self.scan_verbatim_string()),
            '\'' => Some(self.scan_verbatim_char()),
            c if is_identifier_start(c) || c == '\\' => self.scan_identifier_token(true),
            _ => {
                let start = self.token_start;
                self.report(start, Diagnostic::new(DiagnosticKind::MisplacedVerbatim));
                None
            }
        }
    }

    /// `@"..."`: the delimiter is escaped by doubling, nothing else is an
    /// escape, and newlines are allowed.
    fn scan_verbatim_string(&mut self) -> Token {
        self.reader.advance();
        let mut value = String::new();
        loop {
            match self.reader.current() {
                '"' => {
                    if self.reader.advance() == '"' {
                        value.push('"');
                        self.reader.advance();
                    } else {
                        break;
                    }
                }
                NUL => {
                    let start = self.token_start;
                    self.report(start, Diagnostic::new(DiagnosticKind::UnterminatedStringLiteral));
                    break;
                }
                c => {
                    value.push(c);
                    self.reader.advance();
                }
            }
        }
        self.make_token(TokenKind::Literal, TokenValue::Str(value))
    }

    fn scan_verbatim_char(&mut self) -> Token {
        self.reader.advance();
        let mut chars: Vec<char> = Vec::new();
        loop {
            match self.reader.current() {
                '\'' => {
                    if self.reader.advance() == '\'' {
                        chars.push('\'');
                        self.reader.advance();
                    } else {
                        break;
                    }
                }
                NUL => {
                    let start = self.token_start;
                    self.report(start, Diagnostic::new(DiagnosticKind::UnterminatedStringLiteral));
                    break;
                }
                c => {
                    chars.push(c);
                    self.reader.advance();
                }
            }
        }
        let start = self.token_start;
        let value = match chars.len() {
            0 => {
                self.report(start, Diagnostic::new(DiagnosticKind::EmptyCharacterLiteral));
                '\0'
            }
            1 => chars[0],
            _ => {
                self.report(start, Diagnostic::new(DiagnosticKind::CharacterLiteralTooLong));
                chars[0]
            }
        };
        self.make_token(TokenKind::Literal, TokenValue::Char(value))
    }

    // =========================================================================
    // Identifiers and keywords
    // =========================================================================

    fn scan_identifier_token(&mut self, verbatim: bool) -> Option<Token> {
        let mut name = String::new();
        let mut had_escape = false;
        loop {
            let c = self.reader.current();
            if is_identifier_part(c) {
                name.push(c);
                self.reader.advance();
            } else if c == '\\' {
                self.reader.advance();
                match self.reader.current() {
                    'u' | 'U' => {
                        had_escape = true;
                        self.reader.advance();
                        let pos = self.reader.position();
                        let mut value = 0u32;
                        let mut digits = 0;
                        while digits < 4 {
                            match self.reader.current().to_digit(16) {
                                Some(d) => {
                                    value = value * 16 + d;
                                    digits += 1;
                                    self.reader.advance();
                                }
                                None => break,
                            }
                        }
                        if digits == 0 {
                            self.report(pos, Diagnostic::new(DiagnosticKind::UnrecognizedEscape));
                        } else {
                            match char::from_u32(value) {
                                Some(decoded) => name.push(decoded),
                                None => {
                                    self.report(
                                        pos,
                                        Diagnostic::new(DiagnosticKind::UnrecognizedEscape),
                                    );
                                }
                            }
                        }
                    }
                    _ => {
                        if name.is_empty() {
                            let start = self.token_start;
                            self.report(
                                start,
                                Diagnostic::with_arg(
                                    DiagnosticKind::UnexpectedCharacter,
                                    char_literal('\\'),
                                ),
                            );
                            return None;
                        }
                        // A backslash not starting an escape ends the
                        // identifier.
                        break;
                    }
                }
            } else {
                break;
            }
        }
        if name.is_empty() {
            return None;
        }
        if !verbatim && !had_escape {
            match name.as_str() {
                "true" => return Some(self.make_token(TokenKind::Literal, TokenValue::Bool(true))),
                "false" => {
                    return Some(self.make_token(TokenKind::Literal, TokenValue::Bool(false)))
                }
                "null" => return Some(self.make_token(TokenKind::Literal, TokenValue::Null)),
                _ => {
                    if let Some(kind) = TokenKind::keyword(&name) {
                        return Some(self.make_token(kind, TokenValue::None));
                    }
                }
            }
        }
        Some(self.make_token(TokenKind::Identifier, TokenValue::Str(name)))
    }

    // =========================================================================
    // Numbers
    // =========================================================================

    fn scan_period(&mut self) -> Token {
        self.reader.advance();
        if self.reader.current().is_ascii_digit() {
            self.scan_number(true)
        } else {
            self.make_token(TokenKind::Period, TokenValue::None)
        }
    }

    fn scan_number(&mut self, starts_with_dot: bool) -> Token {
        let mut text = String::new();
        let mut is_integer = !starts_with_dot;
        let mut has_exponent = false;

        if starts_with_dot {
            text.push_str("0.");
            while self.reader.current().is_ascii_digit() {
                text.push(self.reader.current());
                self.reader.advance();
            }
        } else {
            if self.reader.current() == '0' {
                self.reader.advance();
                if matches!(self.reader.current(), 'x' | 'X') {
                    self.reader.advance();
                    return self.scan_hex_number();
                }
                text.push('0');
            }
            while self.reader.current().is_ascii_digit() {
                text.push(self.reader.current());
                self.reader.advance();
            }
            // A fraction only begins if a digit follows the period;
            // otherwise the period is member access.
            if self.reader.current() == '.' {
                self.reader.save_state();
                self.reader.advance();
                if self.reader.current().is_ascii_digit() {
                    self.reader.forget_state();
                    is_integer = false;
                    text.push('.');
                    while self.reader.current().is_ascii_digit() {
                        text.push(self.reader.current());
                        self.reader.advance();
                    }
                } else {
                    self.reader.restore_state();
                }
            }
        }

        if matches!(self.reader.current(), 'e' | 'E') {
            is_integer = false;
            has_exponent = true;
            text.push('e');
            self.reader.advance();
            if self.reader.current() == '-' {
                text.push('-');
                self.reader.advance();
            }
            if !self.reader.current().is_ascii_digit() {
                let start = self.token_start;
                self.report(start, Diagnostic::new(DiagnosticKind::InvalidNumber));
                return self.make_token(TokenKind::Literal, TokenValue::Int32(0));
            }
            while self.reader.current().is_ascii_digit() {
                text.push(self.reader.current());
                self.reader.advance();
            }
        }

        self.finish_number(text, is_integer, has_exponent)
    }

    /// Hex digits after `0x`. Overflow is detected when a set bit would be
    /// shifted past bit 63.
    fn scan_hex_number(&mut self) -> Token {
        let mut value = 0u64;
        let mut overflow = false;
        let mut any = false;
        while let Some(d) = self.reader.current().to_digit(16) {
            any = true;
            if value > u64::MAX >> 4 {
                overflow = true;
            } else {
                value = (value << 4) | d as u64;
            }
            self.reader.advance();
        }
        if !any {
            let start = self.token_start;
            self.report(start, Diagnostic::new(DiagnosticKind::InvalidNumber));
            return self.make_token(TokenKind::Literal, TokenValue::Int32(0));
        }
        // Integer suffixes apply to hex literals; real suffixes do not.
        match self.reader.current() {
            'u' | 'U' => {
                self.reader.advance();
                let long = self.take_long_suffix();
                self.typed_unsigned(value, overflow, long)
            }
            'l' | 'L' => {
                self.warn_lowercase_l();
                self.reader.advance();
                let unsigned = self.take_unsigned_suffix();
                if unsigned {
                    self.typed_unsigned(value, overflow, true)
                } else {
                    self.typed_long(value, overflow)
                }
            }
            // 'f' and 'd' read as hex digits above; only 'm' can follow.
            'm' | 'M' => {
                self.reader.advance();
                let start = self.token_start;
                self.report(start, Diagnostic::new(DiagnosticKind::InvalidNumber));
                self.make_token(TokenKind::Literal, TokenValue::Int32(0))
            }
            _ => {
                if overflow {
                    return self.integer_too_large();
                }
                // Unsuffixed hex picks from int, uint, ulong.
                let value_token = if value <= i32::MAX as u64 {
                    TokenValue::Int32(value as i32)
                } else if value <= u32::MAX as u64 {
                    TokenValue::UInt32(value as u32)
                } else {
                    TokenValue::UInt64(value)
                };
                self.make_token(TokenKind::Literal, value_token)
            }
        }
    }

    fn finish_number(&mut self, text: String, is_integer: bool, has_exponent: bool) -> Token {
        match self.reader.current() {
            'u' | 'U' if is_integer => {
                self.reader.advance();
                let long = self.take_long_suffix();
                let (value, overflow) = parse_integer_text(&text);
                self.typed_unsigned(value, overflow, long)
            }
            'l' | 'L' if is_integer => {
                self.warn_lowercase_l();
                self.reader.advance();
                let unsigned = self.take_unsigned_suffix();
                let (value, overflow) = parse_integer_text(&text);
                if unsigned {
                    self.typed_unsigned(value, overflow, true)
                } else {
                    self.typed_long(value, overflow)
                }
            }
            'u' | 'U' | 'l' | 'L' => {
                // Integer suffix on a real literal.
                self.reader.advance();
                let start = self.token_start;
                self.report(start, Diagnostic::new(DiagnosticKind::InvalidNumber));
                self.make_token(TokenKind::Literal, TokenValue::Int32(0))
            }
            'f' | 'F' => {
                self.reader.advance();
                let parsed: f64 = text.parse().unwrap_or(f64::INFINITY);
                if parsed.is_finite() && parsed.abs() <= f32::MAX as f64 {
                    self.make_token(TokenKind::Literal, TokenValue::Float32(parsed as f32))
                } else {
                    self.real_too_large("float", TokenValue::Float32(0.0))
                }
            }
            'd' | 'D' => {
                self.reader.advance();
                self.typed_double(&text)
            }
            'm' | 'M' => {
                self.reader.advance();
                let parsed = if has_exponent {
                    Decimal::from_scientific(&text)
                } else {
                    Decimal::from_str(&text)
                };
                match parsed {
                    Ok(value) => self.make_token(TokenKind::Literal, TokenValue::Decimal(value)),
                    Err(_) => self.real_too_large("decimal", TokenValue::Decimal(Decimal::ZERO)),
                }
            }
            _ if is_integer => {
                let (value, overflow) = parse_integer_text(&text);
                if overflow {
                    return self.integer_too_large();
                }
                // Smallest fitting type from int, uint, long, ulong.
                let value_token = if value <= i32::MAX as u64 {
                    TokenValue::Int32(value as i32)
                } else if value <= u32::MAX as u64 {
                    TokenValue::UInt32(value as u32)
                } else if value <= i64::MAX as u64 {
                    TokenValue::Int64(value as i64)
                } else {
                    TokenValue::UInt64(value)
                };
                self.make_token(TokenKind::Literal, value_token)
            }
            _ => self.typed_double(&text),
        }
    }

    fn typed_double(&mut self, text: &str) -> Token {
        let parsed: f64 = text.parse().unwrap_or(f64::INFINITY);
        if parsed.is_finite() {
            self.make_token(TokenKind::Literal, TokenValue::Float64(parsed))
        } else {
            self.real_too_large("double", TokenValue::Float64(0.0))
        }
    }

    fn typed_unsigned(&mut self, value: u64, overflow: bool, long: bool) -> Token {
        if overflow {
            return self.integer_too_large();
        }
        let value_token = if !long && value <= u32::MAX as u64 {
            TokenValue::UInt32(value as u32)
        } else {
            TokenValue::UInt64(value)
        };
        self.make_token(TokenKind::Literal, value_token)
    }

    fn typed_long(&mut self, value: u64, overflow: bool) -> Token {
        if overflow {
            return self.integer_too_large();
        }
        let value_token = if value <= i64::MAX as u64 {
            TokenValue::Int64(value as i64)
        } else {
            TokenValue::UInt64(value)
        };
        self.make_token(TokenKind::Literal, value_token)
    }

    fn integer_too_large(&mut self) -> Token {
        let start = self.token_start;
        self.report(start, Diagnostic::new(DiagnosticKind::IntegralConstantTooLarge));
        self.make_token(TokenKind::Literal, TokenValue::Int32(0))
    }

    fn real_too_large(&mut self, type_name: &str, substitute: TokenValue) -> Token {
        let start = self.token_start;
        self.report(
            start,
            Diagnostic::with_arg(DiagnosticKind::RealConstantTooLarge, type_name),
        );
        self.make_token(TokenKind::Literal, substitute)
    }

    fn take_long_suffix(&mut self) -> bool {
        match self.reader.current() {
            'l' => {
                self.warn_lowercase_l();
                self.reader.advance();
                true
            }
            'L' => {
                self.reader.advance();
                true
            }
            _ => false,
        }
    }

    fn take_unsigned_suffix(&mut self) -> bool {
        if matches!(self.reader.current(), 'u' | 'U') {
            self.reader.advance();
            true
        } else {
            false
        }
    }

    fn warn_lowercase_l(&mut self) {
        if self.reader.current() == 'l' {
            let pos = self.reader.position();
            self.report(pos, Diagnostic::new(DiagnosticKind::UseUppercaseL));
        }
    }

    // =========================================================================
    // Comments and punctuation
    // =========================================================================

    fn scan_slash(&mut self) -> Option<Token> {
        match self.reader.advance() {
            '/' => {
                if self.reader.advance() == '/' {
                    // `///` doc comment carries the rest of the line.
                    self.reader.advance();
                    let mut text = String::new();
                    while !matches!(self.reader.current(), '\n' | NUL) {
                        text.push(self.reader.current());
                        self.reader.advance();
                    }
                    Some(self.make_token(TokenKind::XmlCommentLine, TokenValue::Str(text)))
                } else {
                    while !matches!(self.reader.current(), '\n' | NUL) {
                        self.reader.advance();
                    }
                    None
                }
            }
            '*' => {
                self.reader.advance();
                loop {
                    match self.reader.current() {
                        NUL => {
                            let start = self.token_start;
                            self.report(start, Diagnostic::new(DiagnosticKind::UnterminatedComment));
                            break;
                        }
                        '*' => {
                            if self.reader.advance() == '/' {
                                self.reader.advance();
                                break;
                            }
                        }
                        _ => {
                            self.reader.advance();
                        }
                    }
                }
                None
            }
            '=' => {
                self.reader.advance();
                Some(self.make_token(TokenKind::OpAssign, TokenValue::Operator(TokenKind::Slash)))
            }
            _ => Some(self.make_token(TokenKind::Slash, TokenValue::None)),
        }
    }

    fn op_or_assign(&mut self, base: TokenKind) -> Token {
        if self.reader.advance() == '=' {
            self.reader.advance();
            self.make_token(TokenKind::OpAssign, TokenValue::Operator(base))
        } else {
            self.make_token(base, TokenValue::None)
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.reader.advance();
        self.make_token(kind, TokenValue::None)
    }

    fn scan_punctuation(&mut self) -> Option<Token> {
        use TokenKind::*;
        let c = self.reader.current();
        let token = match c {
            '~' => self.single(Tilde),
            '(' => self.single(LeftParen),
            ')' => self.single(RightParen),
            '{' => self.single(LeftBrace),
            '}' => self.single(RightBrace),
            '[' => self.single(LeftBracket),
            ']' => self.single(RightBracket),
            ';' => self.single(Semicolon),
            ',' => self.single(Comma),
            '%' => self.op_or_assign(Percent),
            '^' => self.op_or_assign(Caret),
            '*' => self.op_or_assign(Star),
            '!' => {
                if self.reader.advance() == '=' {
                    self.reader.advance();
                    self.make_token(NotEqual, TokenValue::None)
                } else {
                    self.make_token(Not, TokenValue::None)
                }
            }
            '&' => match self.reader.advance() {
                '&' => {
                    self.reader.advance();
                    self.make_token(LogicalAnd, TokenValue::None)
                }
                '=' => {
                    self.reader.advance();
                    self.make_token(OpAssign, TokenValue::Operator(BitAnd))
                }
                _ => self.make_token(BitAnd, TokenValue::None),
            },
            '|' => match self.reader.advance() {
                '|' => {
                    self.reader.advance();
                    self.make_token(LogicalOr, TokenValue::None)
                }
                '=' => {
                    self.reader.advance();
                    self.make_token(OpAssign, TokenValue::Operator(BitOr))
                }
                _ => self.make_token(BitOr, TokenValue::None),
            },
            ':' => {
                if self.reader.advance() == ':' {
                    self.reader.advance();
                    self.make_token(DoubleColon, TokenValue::None)
                } else {
                    self.make_token(Colon, TokenValue::None)
                }
            }
            '?' => {
                if self.reader.advance() == '?' {
                    self.reader.advance();
                    self.make_token(NullCoalesce, TokenValue::None)
                } else {
                    self.make_token(Question, TokenValue::None)
                }
            }
            '+' => match self.reader.advance() {
                '+' => {
                    self.reader.advance();
                    self.make_token(Increment, TokenValue::None)
                }
                '=' => {
                    self.reader.advance();
                    self.make_token(OpAssign, TokenValue::Operator(Plus))
                }
                _ => self.make_token(Plus, TokenValue::None),
            },
            '-' => match self.reader.advance() {
                '-' => {
                    self.reader.advance();
                    self.make_token(Decrement, TokenValue::None)
                }
                '=' => {
                    self.reader.advance();
                    self.make_token(OpAssign, TokenValue::Operator(Minus))
                }
                '>' => {
                    self.reader.advance();
                    self.make_token(Arrow, TokenValue::None)
                }
                _ => self.make_token(Minus, TokenValue::None),
            },
            '=' => {
                if self.reader.advance() == '=' {
                    self.reader.advance();
                    self.make_token(EqualEqual, TokenValue::None)
                } else {
                    self.make_token(OpAssign, TokenValue::Operator(Assign))
                }
            }
            '<' => match self.reader.advance() {
                '=' => {
                    self.reader.advance();
                    self.make_token(LessEqual, TokenValue::None)
                }
                '<' => {
                    if self.reader.advance() == '=' {
                        self.reader.advance();
                        self.make_token(OpAssign, TokenValue::Operator(ShiftLeft))
                    } else {
                        self.make_token(ShiftLeft, TokenValue::None)
                    }
                }
                _ => self.make_token(LessThan, TokenValue::None),
            },
            '>' => match self.reader.advance() {
                '=' => {
                    self.reader.advance();
                    self.make_token(GreaterEqual, TokenValue::None)
                }
                '>' => {
                    if self.reader.advance() == '=' {
                        self.reader.advance();
                        self.make_token(OpAssign, TokenValue::Operator(ShiftRight))
                    } else {
                        self.make_token(ShiftRight, TokenValue::None)
                    }
                }
                _ => self.make_token(GreaterThan, TokenValue::None),
            },
            other => {
                let pos = self.reader.position();
                self.report(
                    pos,
                    Diagnostic::with_arg(DiagnosticKind::UnexpectedCharacter, char_literal(other)),
                );
                self.reader.advance();
                return None;
            }
        };
        Some(token)
    }

    // =========================================================================
    // Preprocessor
    // =========================================================================

    fn scan_directive(&mut self) {
        let start = self.reader.position();
        self.reader.advance();
        self.reader.skip_whitespace(false);
        let word = self.read_directive_word();
        match word.as_str() {
            "define" => self.pp_define(true, start),
            "undef" => self.pp_define(false, start),
            "if" => self.pp_if(start),
            "elif" => self.pp_elif(start),
            "else" => self.pp_else(start),
            "endif" => self.pp_endif(start),
            "region" => {
                self.region_depth += 1;
                self.skip_to_eol();
            }
            "endregion" => {
                if self.region_depth == 0 {
                    self.report(start, Diagnostic::new(DiagnosticKind::UnexpectedPPDirective));
                } else {
                    self.region_depth -= 1;
                }
                self.skip_to_eol();
            }
            "pragma" => self.pp_pragma(start),
            "line" => self.pp_line(start),
            "warning" => {
                let text = self.read_rest_of_line(false);
                self.report(start, Diagnostic::with_arg(DiagnosticKind::UserWarning, text));
            }
            "error" => {
                let text = self.read_rest_of_line(false);
                self.report(start, Diagnostic::with_arg(DiagnosticKind::UserError, text));
            }
            _ => {
                self.report(start, Diagnostic::new(DiagnosticKind::PPDirectiveExpected));
                self.skip_to_eol();
            }
        }
    }

    fn pp_define(&mut self, define: bool, start: Position) {
        if self.saw_non_pp {
            self.report(start, Diagnostic::new(DiagnosticKind::PPTooLate));
            self.skip_to_eol();
            return;
        }
        self.reader.skip_whitespace(false);
        let name = self.read_pp_identifier();
        if name.is_empty() {
            let pos = self.reader.position();
            self.report(pos, Diagnostic::new(DiagnosticKind::ExpectedIdentifier));
            self.skip_to_eol();
            return;
        }
        if define {
            self.compiler.options_mut().define(&name);
        } else {
            self.compiler.options_mut().undefine(&name);
        }
        self.finish_pp_line();
    }

    fn pp_if(&mut self, start: Position) {
        let condition = self.read_rest_of_line(true);
        let value = self.evaluate_condition(&condition, start);
        if value {
            self.pp_nesting.push(PpBranch::True);
        } else {
            self.pp_nesting.push(PpBranch::False);
            self.skip_section(false);
        }
    }

    fn pp_elif(&mut self, start: Position) {
        match self.pp_nesting.last().copied() {
            None | Some(PpBranch::Else) => {
                self.report(start, Diagnostic::new(DiagnosticKind::UnexpectedPPDirective));
                self.skip_to_eol();
            }
            Some(PpBranch::True) => {
                // An earlier branch was taken; this one is inactive.
                self.skip_section(false);
            }
            Some(PpBranch::False) => {
                let condition = self.read_rest_of_line(true);
                let value = self.evaluate_condition(&condition, start);
                self.pp_nesting.pop();
                if value {
                    self.pp_nesting.push(PpBranch::True);
                } else {
                    self.pp_nesting.push(PpBranch::False);
                    self.skip_section(false);
                }
            }
        }
    }

    fn pp_else(&mut self, start: Position) {
        match self.pp_nesting.last().copied() {
            None | Some(PpBranch::Else) => {
                self.report(start, Diagnostic::new(DiagnosticKind::UnexpectedPPDirective));
                self.skip_to_eol();
            }
            Some(PpBranch::True) => {
                *self.pp_nesting.last_mut().expect("nesting checked") = PpBranch::Else;
                self.finish_pp_line();
                self.skip_section(true);
            }
            Some(PpBranch::False) => {
                *self.pp_nesting.last_mut().expect("nesting checked") = PpBranch::Else;
                self.finish_pp_line();
            }
        }
    }

    fn pp_endif(&mut self, start: Position) {
        if self.pp_nesting.pop().is_none() {
            self.report(start, Diagnostic::new(DiagnosticKind::UnexpectedPPDirective));
        }
        self.finish_pp_line();
    }

    fn evaluate_condition(&mut self, condition: &str, start: Position) -> bool {
        match ppexpr::evaluate(condition, self.compiler.options()) {
            Ok(value) => value,
            Err(_) => {
                self.report(start, Diagnostic::new(DiagnosticKind::InvalidPPExpression));
                false
            }
        }
    }

    fn pp_pragma(&mut self, start: Position) {
        self.reader.skip_whitespace(false);
        let word = self.read_pp_identifier();
        if word != "warning" {
            self.report(start, Diagnostic::new(DiagnosticKind::UnrecognizedPragma));
            self.skip_to_eol();
            return;
        }
        self.reader.skip_whitespace(false);
        let action = self.read_pp_identifier();
        let disable = match action.as_str() {
            "disable" => true,
            "restore" => false,
            _ => {
                self.report(start, Diagnostic::new(DiagnosticKind::InvalidWarningPragma));
                self.skip_to_eol();
                return;
            }
        };
        self.reader.skip_whitespace(false);
        if matches!(self.reader.current(), '\n' | NUL | '/') {
            if disable {
                self.compiler.options_mut().disable_all_warnings();
            } else {
                self.compiler.options_mut().restore_all_warnings();
            }
            self.finish_pp_line();
            return;
        }
        loop {
            self.reader.skip_whitespace(false);
            let num_pos = self.reader.position();
            let mut digits = String::new();
            while self.reader.current().is_ascii_digit() {
                digits.push(self.reader.current());
                self.reader.advance();
            }
            if digits.is_empty() {
                self.report(num_pos, Diagnostic::new(DiagnosticKind::InvalidWarningPragma));
                self.skip_to_eol();
                return;
            }
            match digits.parse::<u16>() {
                Ok(code) if is_valid_warning(code) => {
                    if disable {
                        self.compiler.options_mut().disable_warning(code);
                    } else {
                        self.compiler.options_mut().restore_warning(code);
                    }
                }
                _ => {
                    self.report(
                        num_pos,
                        Diagnostic::with_arg(DiagnosticKind::InvalidWarningCode, digits),
                    );
                }
            }
            self.reader.skip_whitespace(false);
            if self.reader.current() == ',' {
                self.reader.advance();
                continue;
            }
            break;
        }
        self.finish_pp_line();
    }

    fn pp_line(&mut self, start: Position) {
        self.reader.skip_whitespace(false);
        if self.reader.current().is_ascii_digit() {
            let mut digits = String::new();
            while self.reader.current().is_ascii_digit() {
                digits.push(self.reader.current());
                self.reader.advance();
            }
            let line: u32 = match digits.parse() {
                Ok(line) => line,
                Err(_) => {
                    self.report(start, Diagnostic::new(DiagnosticKind::InvalidLineDirective));
                    self.skip_to_eol();
                    return;
                }
            };
            self.line_map = LineMap::Remapped(line);
            self.reader.skip_whitespace(false);
            if self.reader.current() == '"' {
                self.reader.advance();
                let mut file = String::new();
                while !matches!(self.reader.current(), '"' | '\n' | NUL) {
                    file.push(self.reader.current());
                    self.reader.advance();
                }
                if self.reader.current() == '"' {
                    self.reader.advance();
                    self.source_map = Some(self.compiler.intern(&file));
                } else {
                    self.report(start, Diagnostic::new(DiagnosticKind::InvalidLineDirective));
                }
            }
            self.finish_pp_line();
        } else {
            let word = self.read_pp_identifier();
            match word.as_str() {
                "hidden" => {
                    self.line_map = LineMap::Hidden;
                    self.finish_pp_line();
                }
                "default" => {
                    self.line_map = LineMap::Default;
                    self.source_map = None;
                    self.finish_pp_line();
                }
                _ => {
                    self.report(start, Diagnostic::new(DiagnosticKind::InvalidLineDirective));
                    self.skip_to_eol();
                }
            }
        }
    }

    /// Skip an inactive conditional section line by line, tracking inner
    /// `#if` depth. Stops with the reader positioned back at the `#` of the
    /// terminating directive so the main loop processes it normally.
    fn skip_section(&mut self, skipping_else: bool) {
        let mut depth = 0u32;
        loop {
            while !matches!(self.reader.current(), '\n' | NUL) {
                self.reader.advance();
            }
            if self.reader.current() == NUL {
                let pos = self.reader.position();
                self.report(pos, Diagnostic::new(DiagnosticKind::PPEndIfExpected));
                self.pp_nesting.clear();
                return;
            }
            self.reader.advance();
            self.reader.skip_whitespace(false);
            if self.reader.current() != '#' {
                continue;
            }
            self.reader.save_state();
            let directive_pos = self.reader.position();
            self.reader.advance();
            self.reader.skip_whitespace(false);
            let word = self.read_directive_word();
            match word.as_str() {
                "if" => {
                    depth += 1;
                    self.reader.forget_state();
                }
                "endif" => {
                    if depth == 0 {
                        self.reader.restore_state();
                        self.first_on_line = true;
                        return;
                    }
                    depth -= 1;
                    self.reader.forget_state();
                }
                "else" | "elif" => {
                    if depth == 0 {
                        if skipping_else {
                            self.report(
                                directive_pos,
                                Diagnostic::new(DiagnosticKind::UnexpectedPPDirective),
                            );
                            self.reader.forget_state();
                        } else {
                            self.reader.restore_state();
                            self.first_on_line = true;
                            return;
                        }
                    } else {
                        self.reader.forget_state();
                    }
                }
                _ => self.reader.forget_state(),
            }
        }
    }

    fn read_directive_word(&mut self) -> String {
        let mut word = String::new();
        while self.reader.current().is_ascii_alphabetic() {
            word.push(self.reader.current());
            self.reader.advance();
        }
        word
    }

    fn read_pp_identifier(&mut self) -> String {
        let mut name = String::new();
        if is_identifier_start(self.reader.current()) {
            name.push(self.reader.current());
            self.reader.advance();
            while is_identifier_part(self.reader.current()) {
                name.push(self.reader.current());
                self.reader.advance();
            }
        }
        name
    }

    /// Text to the end of the line, optionally cut at a `//` comment.
    fn read_rest_of_line(&mut self, strip_comment: bool) -> String {
        let mut text = String::new();
        while !matches!(self.reader.current(), '\n' | NUL) {
            text.push(self.reader.current());
            self.reader.advance();
        }
        if strip_comment {
            if let Some(idx) = text.find("//") {
                text.truncate(idx);
            }
        }
        text.trim().to_string()
    }

    fn skip_to_eol(&mut self) {
        while !matches!(self.reader.current(), '\n' | NUL) {
            self.reader.advance();
        }
    }

    /// After a directive's operands, only whitespace or a line comment may
    /// remain.
    fn finish_pp_line(&mut self) {
        self.reader.skip_whitespace(false);
        match self.reader.current() {
            '\n' | NUL => {}
            '/' => {
                let pos = self.reader.position();
                if self.reader.advance() == '/' {
                    self.skip_to_eol();
                } else {
                    self.report(pos, Diagnostic::new(DiagnosticKind::PPEndExpected));
                    self.skip_to_eol();
                }
            }
            _ => {
                let pos = self.reader.position();
                self.report(pos, Diagnostic::new(DiagnosticKind::PPEndExpected));
                self.skip_to_eol();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;

    fn scan(text: &str) -> (Vec<Token>, Compiler) {
        scan_with_options(text, CompilerOptions::new())
    }

    fn scan_with_options(text: &str, options: CompilerOptions) -> (Vec<Token>, Compiler) {
        let mut compiler = Compiler::new(options);
        let mut scanner = Scanner::new(
            &mut compiler,
            vec![SourceText::with_text("test.cs", text)],
        );
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token();
            let kind = token.kind;
            tokens.push(token);
            if kind == TokenKind::Eod {
                break;
            }
        }
        drop(scanner);
        (tokens, compiler)
    }

    /// The scanned tokens without the trailing Eof/Eod markers.
    fn real_tokens(text: &str) -> (Vec<Token>, Compiler) {
        let (tokens, compiler) = scan(text);
        let real = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Eod))
            .collect();
        (real, compiler)
    }

    fn codes(compiler: &Compiler) -> Vec<u16> {
        compiler.messages().iter().map(|m| m.code).collect()
    }

    #[test]
    fn identifiers_and_keywords() {
        let (tokens, compiler) = real_tokens("class Widget while partial");
        assert_eq!(tokens[0].kind, TokenKind::Class);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].value, TokenValue::Str("Widget".into()));
        assert_eq!(tokens[2].kind, TokenKind::While);
        // `partial` is contextual, not a keyword.
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn true_false_null_are_literals() {
        let (tokens, _) = real_tokens("true false null");
        assert_eq!(tokens[0].value, TokenValue::Bool(true));
        assert_eq!(tokens[1].value, TokenValue::Bool(false));
        assert_eq!(tokens[2].value, TokenValue::Null);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Literal));
    }

    #[test]
    fn verbatim_identifier_skips_keyword_lookup() {
        let (tokens, _) = real_tokens("@class");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, TokenValue::Str("class".into()));
    }

    #[test]
    fn identifier_unicode_escape() {
        let (tokens, _) = real_tokens("\\u0041bc");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, TokenValue::Str("Abc".into()));
    }

    #[test]
    fn escaped_keyword_text_stays_identifier() {
        // `class` spells "class" but contains an escape.
        let (tokens, _) = real_tokens("cl\\u0061ss");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, TokenValue::Str("class".into()));
    }

    #[test]
    fn lowercase_long_suffix_warns_at_suffix_position() {
        let (tokens, compiler) = real_tokens("1l");
        assert_eq!(tokens[0].value, TokenValue::Int64(1));
        let msg = compiler.messages().iter().next().unwrap();
        assert_eq!(msg.code, 78);
        assert_eq!((msg.line, msg.column), (1, 2));
    }

    #[test]
    fn pragma_disables_lowercase_warning() {
        let (tokens, compiler) = real_tokens("#pragma warning disable 78\n1l");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, TokenValue::Int64(1));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn integer_literal_typing_ladder() {
        let (tokens, _) = real_tokens("1 2147483648 4294967296 9223372036854775808");
        assert_eq!(tokens[0].value, TokenValue::Int32(1));
        assert_eq!(tokens[1].value, TokenValue::UInt32(2147483648));
        assert_eq!(tokens[2].value, TokenValue::Int64(4294967296));
        assert_eq!(
            tokens[3].value,
            TokenValue::UInt64(9223372036854775808)
        );
    }

    #[test]
    fn hex_literal_typing_skips_long() {
        let (tokens, _) = real_tokens("0x1 0xffffffff 0xfffffffff");
        assert_eq!(tokens[0].value, TokenValue::Int32(1));
        assert_eq!(tokens[1].value, TokenValue::UInt32(0xffff_ffff));
        assert_eq!(tokens[2].value, TokenValue::UInt64(0xf_ffff_ffff));
    }

    #[test]
    fn hex_overflow_reports_at_token_start() {
        let (_, compiler) = real_tokens("0x123456789abcdef01");
        let msg = compiler.messages().iter().next().unwrap();
        assert_eq!(msg.code, 1021);
        assert_eq!((msg.line, msg.column), (1, 1));
    }

    #[test]
    fn suffixes_select_types() {
        let (tokens, _) = real_tokens("1u 1L 1uL 1Lu 3f 2.5d 6.5m");
        assert_eq!(tokens[0].value, TokenValue::UInt32(1));
        assert_eq!(tokens[1].value, TokenValue::Int64(1));
        assert_eq!(tokens[2].value, TokenValue::UInt64(1));
        assert_eq!(tokens[3].value, TokenValue::UInt64(1));
        assert_eq!(tokens[4].value, TokenValue::Float32(3.0));
        assert_eq!(tokens[5].value, TokenValue::Float64(2.5));
        assert_eq!(
            tokens[6].value,
            TokenValue::Decimal(Decimal::from_str("6.5").unwrap())
        );
    }

    #[test]
    fn reals_without_suffix_are_double() {
        let (tokens, _) = real_tokens("1.5 2e3 .25");
        assert_eq!(tokens[0].value, TokenValue::Float64(1.5));
        assert_eq!(tokens[1].value, TokenValue::Float64(2000.0));
        assert_eq!(tokens[2].value, TokenValue::Float64(0.25));
    }

    #[test]
    fn float_overflow_names_target_type() {
        let (_, compiler) = real_tokens("1e40f");
        let msg = compiler.messages().iter().next().unwrap();
        assert_eq!(msg.code, 594);
        assert!(msg.message.contains("float"));
    }

    #[test]
    fn integer_then_member_access_keeps_period() {
        let (tokens, _) = real_tokens("1.ToString");
        assert_eq!(tokens[0].value, TokenValue::Int32(1));
        assert_eq!(tokens[1].kind, TokenKind::Period);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn string_escapes_decode() {
        let (tokens, compiler) = real_tokens(r#""a\tbA""#);
        assert_eq!(tokens[0].value, TokenValue::Str("a\tbA".into()));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn unknown_escape_substitutes_and_reports() {
        let (tokens, compiler) = real_tokens(r#""\r\n\q\p""#);
        assert_eq!(tokens[0].value, TokenValue::Str("\r\nqp".into()));
        let messages: Vec<_> = compiler.messages().iter().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].code, 1009);
        assert_eq!((messages[0].line, messages[0].column), (1, 7));
        assert_eq!((messages[1].line, messages[1].column), (1, 9));
    }

    #[test]
    fn newline_in_string_reports() {
        let (_, compiler) = real_tokens("\"abc\ndef\"");
        assert!(codes(&compiler).contains(&1010));
    }

    #[test]
    fn verbatim_string_doubles_quotes_and_spans_lines() {
        let (tokens, compiler) = real_tokens("@\"a\"\"b\nc\"");
        assert_eq!(tokens[0].value, TokenValue::Str("a\"b\nc".into()));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn char_literals() {
        let (tokens, compiler) = real_tokens(r"'a' '\n' '\x41'");
        assert_eq!(tokens[0].value, TokenValue::Char('a'));
        assert_eq!(tokens[1].value, TokenValue::Char('\n'));
        assert_eq!(tokens[2].value, TokenValue::Char('A'));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn char_literal_errors() {
        let (_, compiler) = real_tokens("''");
        assert_eq!(codes(&compiler), vec![1011]);
        let (_, compiler) = real_tokens("'ab'");
        assert_eq!(codes(&compiler), vec![1012]);
        let (_, compiler) = real_tokens("'a");
        assert_eq!(codes(&compiler), vec![1003]);
    }

    #[test]
    fn comments_produce_no_tokens() {
        let (tokens, compiler) = real_tokens("// line\n/* block\nstill */ 1");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, TokenValue::Int32(1));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn unterminated_block_comment_reports() {
        let (_, compiler) = real_tokens("/* never closed");
        assert_eq!(codes(&compiler), vec![1035]);
    }

    #[test]
    fn xml_doc_comment_token_carries_text() {
        let (tokens, _) = real_tokens("/// <summary>hi</summary>\n1");
        assert_eq!(tokens[0].kind, TokenKind::XmlCommentLine);
        assert_eq!(
            tokens[0].value,
            TokenValue::Str(" <summary>hi</summary>".into())
        );
        assert_eq!(tokens[1].value, TokenValue::Int32(1));
    }

    #[test]
    fn compound_operators_scan_greedily() {
        let (tokens, _) = real_tokens("<< <<= <= < && &= & :: ?? -> ++ --");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::ShiftLeft,
                TokenKind::OpAssign,
                TokenKind::LessEqual,
                TokenKind::LessThan,
                TokenKind::LogicalAnd,
                TokenKind::OpAssign,
                TokenKind::BitAnd,
                TokenKind::DoubleColon,
                TokenKind::NullCoalesce,
                TokenKind::Arrow,
                TokenKind::Increment,
                TokenKind::Decrement,
            ]
        );
        assert_eq!(tokens[1].value, TokenValue::Operator(TokenKind::ShiftLeft));
        assert_eq!(tokens[5].value, TokenValue::Operator(TokenKind::BitAnd));
    }

    #[test]
    fn bare_equals_is_op_assign() {
        let (tokens, _) = real_tokens("= == +=");
        assert_eq!(tokens[0].kind, TokenKind::OpAssign);
        assert_eq!(tokens[0].value, TokenValue::Operator(TokenKind::Assign));
        assert_eq!(tokens[1].kind, TokenKind::EqualEqual);
        assert_eq!(tokens[2].value, TokenValue::Operator(TokenKind::Plus));
    }

    #[test]
    fn token_positions_are_inclusive() {
        let (tokens, _) = real_tokens("abc de");
        assert_eq!(tokens[0].start, Position::new(1, 1));
        assert_eq!(tokens[0].end, Position::new(1, 3));
        assert_eq!(tokens[1].start, Position::new(1, 5));
        assert_eq!(tokens[1].end, Position::new(1, 6));
    }

    #[test]
    fn eof_then_eod_for_blank_buffer() {
        let (tokens, _) = scan("   // nothing here\n");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Eof, TokenKind::Eod]);
    }

    #[test]
    fn push_back_tokens_reemerge_in_push_order() {
        let mut compiler = Compiler::default();
        let mut scanner = Scanner::new(
            &mut compiler,
            vec![SourceText::with_text("test.cs", "a b c")],
        );
        let a = scanner.next_token();
        let b = scanner.next_token();
        scanner.push_back(a.clone());
        scanner.push_back(b.clone());
        assert_eq!(scanner.next_token(), a);
        assert_eq!(scanner.next_token(), b);
        assert_eq!(
            scanner.next_token().value,
            TokenValue::Str("c".to_string())
        );
    }

    #[test]
    fn scanning_twice_is_deterministic() {
        let text = "class C { int x = 0x10; } // done";
        let (first, _) = scan(text);
        let (second, _) = scan(text);
        assert_eq!(first, second);
    }

    #[test]
    fn conditional_branches_select_tokens() {
        let text = "#define YES\n#if YES && NO\n1\n#elif NO || YES\n2\n#else\n3\n#endif";
        let (tokens, compiler) = real_tokens(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, TokenValue::Int32(2));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn nested_inactive_blocks_skip_whole() {
        let text = "#if false\n#if true\n1\n#endif\n2\n#endif\n3";
        let (tokens, compiler) = real_tokens(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, TokenValue::Int32(3));
        assert!(compiler.messages().is_empty());
    }

    #[test]
    fn invalid_pp_expression_reports_at_hash() {
        let (tokens, compiler) = real_tokens("#if a a a");
        assert!(tokens.is_empty());
        let messages: Vec<_> = compiler.messages().iter().collect();
        assert_eq!(messages[0].code, 1517);
        assert_eq!((messages[0].line, messages[0].column), (1, 1));
        // The unterminated #if is also reported.
        assert!(messages.iter().any(|m| m.code == 1027));
    }

    #[test]
    fn missing_endif_reports() {
        let (_, compiler) = real_tokens("#if true\n1");
        assert!(codes(&compiler).contains(&1027));
    }

    #[test]
    fn stray_else_reports() {
        let (_, compiler) = real_tokens("#else\n");
        assert_eq!(codes(&compiler), vec![1028]);
    }

    #[test]
    fn second_else_reports_while_skipping() {
        let text = "#if true\n1\n#else\n2\n#else\n3\n#endif";
        let (tokens, compiler) = real_tokens(text);
        assert_eq!(tokens.len(), 1);
        assert!(codes(&compiler).contains(&1028));
    }

    #[test]
    fn define_after_token_is_too_late() {
        let (_, compiler) = real_tokens("1\n#define X\n");
        assert_eq!(codes(&compiler), vec![1032]);
    }

    #[test]
    fn undef_masks_parent_define() {
        let mut base = CompilerOptions::new();
        base.define("DEBUG");
        let (tokens, _) =
            scan_with_options("#undef DEBUG\n#if DEBUG\n1\n#else\n2\n#endif", base);
        let real: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Literal)
            .collect();
        assert_eq!(real.len(), 1);
        assert_eq!(real[0].value, TokenValue::Int32(2));
    }

    #[test]
    fn regions_must_balance() {
        let (_, compiler) = real_tokens("#region one\n#endregion\n#endregion\n");
        assert_eq!(codes(&compiler), vec![1028]);
        let (_, compiler) = real_tokens("#region never closed\n1\n");
        assert!(codes(&compiler).contains(&1038));
    }

    #[test]
    fn user_warning_and_error_carry_text() {
        let (_, compiler) = real_tokens("#warning mind the gap\n#error broken\n");
        let messages: Vec<_> = compiler.messages().iter().collect();
        assert_eq!(messages[0].code, 1030);
        assert!(messages[0].message.contains("mind the gap"));
        assert_eq!(messages[1].code, 1029);
        assert!(messages[1].message.contains("broken"));
    }

    #[test]
    fn line_hidden_stamps_tokens() {
        let (tokens, _) = real_tokens("#line hidden\nvoid");
        assert_eq!(tokens[0].kind, TokenKind::Void);
        assert_eq!(tokens[0].line_map, LineMap::Hidden);
    }

    #[test]
    fn line_remap_with_file() {
        let (tokens, compiler) = real_tokens("#line 200 \"gen.cs\"\nint");
        assert_eq!(tokens[0].line_map, LineMap::Remapped(200));
        let file = tokens[0].source_map.expect("source override");
        assert_eq!(compiler.resolve(file), "gen.cs");
    }

    #[test]
    fn line_default_clears_overrides() {
        let (tokens, _) = real_tokens("#line 5 \"x.cs\"\n1\n#line default\n2");
        assert_eq!(tokens[0].line_map, LineMap::Remapped(5));
        assert_eq!(tokens[1].line_map, LineMap::Default);
        assert_eq!(tokens[1].source_map, None);
    }

    #[test]
    fn invalid_line_directive_reports() {
        let (_, compiler) = real_tokens("#line nonsense\n");
        assert_eq!(codes(&compiler), vec![1576]);
    }

    #[test]
    fn pragma_unknown_and_invalid_forms() {
        let (_, compiler) = real_tokens("#pragma checksum x\n");
        assert_eq!(codes(&compiler), vec![1633]);
        let (_, compiler) = real_tokens("#pragma warning enable 78\n");
        assert_eq!(codes(&compiler), vec![1634]);
        let (_, compiler) = real_tokens("#pragma warning disable 9123\n");
        assert_eq!(codes(&compiler), vec![1691]);
    }

    #[test]
    fn pragma_disable_all_then_restore_one() {
        let text = "#pragma warning disable\n1l\n#pragma warning restore 78\n2l";
        let (_, compiler) = real_tokens(text);
        let messages: Vec<_> = compiler.messages().iter().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].code, 78);
        assert_eq!(messages[0].line, 4);
    }

    #[test]
    fn directive_not_first_on_line_reports() {
        let (_, compiler) = real_tokens("1 #define X\n");
        assert_eq!(codes(&compiler), vec![1040]);
    }

    #[test]
    fn trailing_text_after_directive_reports() {
        let (_, compiler) = real_tokens("#endif\n");
        // Stray #endif reports 1028, not 1025.
        assert_eq!(codes(&compiler), vec![1028]);
        let (_, compiler) = real_tokens("#define X junk\n");
        assert_eq!(codes(&compiler), vec![1025]);
        let (_, compiler) = real_tokens("#define X // fine\n");
        assert!(codes(&compiler).is_empty());
    }

    #[test]
    fn unexpected_character_reports_with_rendering() {
        let (_, compiler) = real_tokens("$");
        let msg = compiler.messages().iter().next().unwrap();
        assert_eq!(msg.code, 1056);
        assert!(msg.message.contains('$'));
    }

    #[test]
    fn misplaced_verbatim_reports() {
        let (_, compiler) = real_tokens("@ 1");
        assert_eq!(codes(&compiler), vec![1646]);
    }

    #[test]
    fn tokens_note_current_source_name() {
        let mut compiler = Compiler::default();
        let mut scanner = Scanner::new(
            &mut compiler,
            vec![
                SourceText::with_text("one.cs", "1"),
                SourceText::with_text("two.cs", "2"),
            ],
        );
        let t1 = scanner.next_token();
        let eof1 = scanner.next_token();
        let t2 = scanner.next_token();
        assert_eq!(eof1.kind, TokenKind::Eof);
        let one = t1.source;
        let two = t2.source;
        drop(scanner);
        assert_eq!(compiler.resolve(one), "one.cs");
        assert_eq!(compiler.resolve(two), "two.cs");
    }

    #[test]
    fn option_scope_pops_per_buffer() {
        let mut compiler = Compiler::default();
        let mut scanner = Scanner::new(
            &mut compiler,
            vec![
                SourceText::with_text("one.cs", "#define ONLYHERE\n1"),
                SourceText::with_text("two.cs", "#if ONLYHERE\n2\n#endif\n3"),
            ],
        );
        let mut literals = Vec::new();
        loop {
            let t = scanner.next_token();
            if t.kind == TokenKind::Eod {
                break;
            }
            if t.kind == TokenKind::Literal {
                literals.push(t.value.clone());
            }
        }
        drop(scanner);
        // ONLYHERE died with its buffer; the second file sees 3 only.
        assert_eq!(
            literals,
            vec![TokenValue::Int32(1), TokenValue::Int32(3)]
        );
    }
}
