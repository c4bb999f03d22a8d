//! Diagnostic catalog and output sink.
//!
//! Every message the front-end can produce is enumerated here with its
//! numeric code, severity, and format template. Formatted messages render as
//! `<source>(<line>,<column>): <severity> CS<NNNN>: <text>`.

use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::ast::types::TypeRef;
use crate::intern::Interner;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(text)
    }
}

/// Catalog of every diagnostic the scanner, preprocessor, and parser emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UseUppercaseL,
    NoTypesInInterfaces,
    NoFieldsInInterfaces,
    NoConstructorInInterface,
    NoDestructorOutsideClass,
    RealConstantTooLarge,
    InvalidAttributeTarget,
    UnknownAttributeTarget,
    ExpectedIdentifier,
    ExpectedSemicolon,
    ExpectedCharacter,
    DuplicateModifier,
    InvalidEnumBase,
    UnrecognizedEscape,
    NewlineInConstant,
    EmptyCharacterLiteral,
    CharacterLiteralTooLong,
    InvalidNumber,
    NamedArgumentExpected,
    IntegralConstantTooLarge,
    PPDirectiveExpected,
    PPEndExpected,
    ExpectedRightParen,
    PPEndIfExpected,
    UnexpectedPPDirective,
    UserError,
    UserWarning,
    PPTooLate,
    UnterminatedComment,
    EndRegionExpected,
    UnterminatedStringLiteral,
    PPNotFirstToken,
    ExpectedIdentGotKeyword,
    UnexpectedCharacter,
    ExpectedRightBrace,
    ExpectedLeftBrace,
    InvalidPPExpression,
    ExpectedTypeDeclaration,
    InvalidExprTerm,
    InvalidTokenInTypeDecl,
    InvalidLineDirective,
    MisplacedXmlComment,
    UnrecognizedPragma,
    InvalidWarningPragma,
    MisplacedVerbatim,
    InvalidWarningCode,
    SourceFileCouldNotBeOpened,
}

/// Static facts about one catalog entry.
pub struct DiagnosticInfo {
    pub code: u16,
    pub severity: Severity,
    /// Warning level; warnings above the active level are suppressed.
    /// Zero for errors.
    pub level: u8,
    pub template: &'static str,
}

impl DiagnosticKind {
    pub const ALL: &'static [DiagnosticKind] = &[
        DiagnosticKind::UseUppercaseL,
        DiagnosticKind::NoTypesInInterfaces,
        DiagnosticKind::NoFieldsInInterfaces,
        DiagnosticKind::NoConstructorInInterface,
        DiagnosticKind::NoDestructorOutsideClass,
        DiagnosticKind::RealConstantTooLarge,
        DiagnosticKind::InvalidAttributeTarget,
        DiagnosticKind::UnknownAttributeTarget,
        DiagnosticKind::ExpectedIdentifier,
        DiagnosticKind::ExpectedSemicolon,
        DiagnosticKind::ExpectedCharacter,
        DiagnosticKind::DuplicateModifier,
        DiagnosticKind::InvalidEnumBase,
        DiagnosticKind::UnrecognizedEscape,
        DiagnosticKind::NewlineInConstant,
        DiagnosticKind::EmptyCharacterLiteral,
        DiagnosticKind::CharacterLiteralTooLong,
        DiagnosticKind::InvalidNumber,
        DiagnosticKind::NamedArgumentExpected,
        DiagnosticKind::IntegralConstantTooLarge,
        DiagnosticKind::PPDirectiveExpected,
        DiagnosticKind::PPEndExpected,
        DiagnosticKind::ExpectedRightParen,
        DiagnosticKind::PPEndIfExpected,
        DiagnosticKind::UnexpectedPPDirective,
        DiagnosticKind::UserError,
        DiagnosticKind::UserWarning,
        DiagnosticKind::PPTooLate,
        DiagnosticKind::UnterminatedComment,
        DiagnosticKind::EndRegionExpected,
        DiagnosticKind::UnterminatedStringLiteral,
        DiagnosticKind::PPNotFirstToken,
        DiagnosticKind::ExpectedIdentGotKeyword,
        DiagnosticKind::UnexpectedCharacter,
        DiagnosticKind::ExpectedRightBrace,
        DiagnosticKind::ExpectedLeftBrace,
        DiagnosticKind::InvalidPPExpression,
        DiagnosticKind::ExpectedTypeDeclaration,
        DiagnosticKind::InvalidExprTerm,
        DiagnosticKind::InvalidTokenInTypeDecl,
        DiagnosticKind::InvalidLineDirective,
        DiagnosticKind::MisplacedXmlComment,
        DiagnosticKind::UnrecognizedPragma,
        DiagnosticKind::InvalidWarningPragma,
        DiagnosticKind::MisplacedVerbatim,
        DiagnosticKind::InvalidWarningCode,
        DiagnosticKind::SourceFileCouldNotBeOpened,
    ];

    pub fn info(self) -> &'static DiagnosticInfo {
        use DiagnosticKind::*;
        use Severity::*;
        macro_rules! entry {
            ($code:expr, $sev:expr, $level:expr, $template:expr) => {
                &DiagnosticInfo {
                    code: $code,
                    severity: $sev,
                    level: $level,
                    template: $template,
                }
            };
        }
        match self {
            UseUppercaseL => entry!(
                78,
                Warning,
                4,
                "The 'l' suffix is easily confused with the digit '1'; use 'L' for clarity"
            ),
            NoTypesInInterfaces => entry!(524, Error, 0, "Interfaces cannot declare types"),
            NoFieldsInInterfaces => entry!(525, Error, 0, "Interfaces cannot contain fields"),
            NoConstructorInInterface => {
                entry!(526, Error, 0, "Interfaces cannot contain constructors")
            }
            NoDestructorOutsideClass => {
                entry!(575, Error, 0, "Only class types can contain destructors")
            }
            RealConstantTooLarge => entry!(
                594,
                Error,
                0,
                "Floating-point constant is outside the range of type '{0}'"
            ),
            InvalidAttributeTarget => entry!(
                657,
                Warning,
                1,
                "'{0}' is not a valid attribute location for this declaration; \
                 all attributes in this block will be ignored"
            ),
            UnknownAttributeTarget => entry!(
                658,
                Warning,
                1,
                "'{0}' is not a recognized attribute location; \
                 all attributes in this block will be ignored"
            ),
            ExpectedIdentifier => entry!(1001, Error, 0, "Identifier expected"),
            ExpectedSemicolon => entry!(1002, Error, 0, "; expected"),
            ExpectedCharacter => entry!(1003, Error, 0, "Syntax error, '{0}' expected"),
            DuplicateModifier => entry!(1004, Error, 0, "Duplicate '{0}' modifier"),
            InvalidEnumBase => entry!(
                1008,
                Error,
                0,
                "Type byte, sbyte, short, ushort, int, uint, long, or ulong expected"
            ),
            UnrecognizedEscape => entry!(1009, Error, 0, "Unrecognized escape sequence"),
            NewlineInConstant => entry!(1010, Error, 0, "Newline in constant"),
            EmptyCharacterLiteral => entry!(1011, Error, 0, "Empty character literal"),
            CharacterLiteralTooLong => {
                entry!(1012, Error, 0, "Too many characters in character literal")
            }
            InvalidNumber => entry!(1013, Error, 0, "Invalid number"),
            NamedArgumentExpected => entry!(1016, Error, 0, "Named attribute argument expected"),
            IntegralConstantTooLarge => entry!(1021, Error, 0, "Integral constant is too large"),
            PPDirectiveExpected => entry!(1024, Error, 0, "Preprocessor directive expected"),
            PPEndExpected => entry!(
                1025,
                Error,
                0,
                "Single-line comment or end-of-line expected"
            ),
            ExpectedRightParen => entry!(1026, Error, 0, ") expected"),
            PPEndIfExpected => entry!(1027, Error, 0, "#endif directive expected"),
            UnexpectedPPDirective => entry!(1028, Error, 0, "Unexpected preprocessor directive"),
            UserError => entry!(1029, Error, 0, "#error: '{0}'"),
            UserWarning => entry!(1030, Warning, 1, "#warning: '{0}'"),
            PPTooLate => entry!(
                1032,
                Error,
                0,
                "Cannot define or undefine preprocessor symbols after first token in file"
            ),
            UnterminatedComment => entry!(1035, Error, 0, "End-of-file found, '*/' expected"),
            EndRegionExpected => entry!(1038, Error, 0, "#endregion directive expected"),
            UnterminatedStringLiteral => entry!(1039, Error, 0, "Unterminated string literal"),
            PPNotFirstToken => entry!(
                1040,
                Error,
                0,
                "Preprocessor directives must appear as the first non-whitespace \
                 character on a line"
            ),
            ExpectedIdentGotKeyword => {
                entry!(1041, Error, 0, "Identifier expected; '{0}' is a keyword")
            }
            UnexpectedCharacter => entry!(1056, Error, 0, "Unexpected character '{0}'"),
            ExpectedRightBrace => entry!(1513, Error, 0, "}} expected"),
            ExpectedLeftBrace => entry!(1514, Error, 0, "{{ expected"),
            InvalidPPExpression => entry!(1517, Error, 0, "Invalid preprocessor expression"),
            ExpectedTypeDeclaration => entry!(
                1518,
                Error,
                0,
                "Expected class, delegate, enum, interface, or struct"
            ),
            InvalidExprTerm => entry!(1525, Error, 0, "Invalid expression term '{0}'"),
            InvalidTokenInTypeDecl => entry!(
                1519,
                Error,
                0,
                "Invalid token '{0}' in class, struct, or interface member declaration"
            ),
            InvalidLineDirective => entry!(
                1576,
                Error,
                0,
                "The line number specified for #line directive is missing or invalid"
            ),
            MisplacedXmlComment => entry!(
                1587,
                Warning,
                2,
                "XML comment is not placed on a valid language element"
            ),
            UnrecognizedPragma => entry!(1633, Warning, 1, "Unrecognized #pragma directive"),
            InvalidWarningPragma => entry!(1634, Warning, 1, "Expected disable or restore"),
            MisplacedVerbatim => entry!(
                1646,
                Error,
                0,
                "Keyword, identifier, or string expected after verbatim specifier: @"
            ),
            InvalidWarningCode => entry!(1691, Warning, 1, "'{0}' is not a valid warning number"),
            SourceFileCouldNotBeOpened => {
                entry!(1504, Error, 0, "Source file '{0}' could not be opened: {1}")
            }
        }
    }

    pub fn code(self) -> u16 {
        self.info().code
    }

    pub fn severity(self) -> Severity {
        self.info().severity
    }

    pub fn level(self) -> u8 {
        self.info().level
    }
}

/// One diagnostic occurrence: a catalog entry plus its format arguments.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind) -> Self {
        Diagnostic { kind, args: Vec::new() }
    }

    pub fn with_arg(kind: DiagnosticKind, arg: impl Into<String>) -> Self {
        Diagnostic { kind, args: vec![arg.into()] }
    }

    pub fn with_args(kind: DiagnosticKind, args: Vec<String>) -> Self {
        Diagnostic { kind, args }
    }

    /// Expand `{0}`, `{1}`, ... placeholders in the catalog template. The
    /// doubled braces in templates (`{{`, `}}`) render as literal braces.
    pub fn format_message(&self) -> String {
        let template = self.kind.info().template;
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut index = 0usize;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        index = index * 10 + d as usize;
                        chars.next();
                    }
                    let closing = chars.next();
                    debug_assert_eq!(closing, Some('}'), "unterminated placeholder");
                    match self.args.get(index) {
                        Some(arg) => out.push_str(arg),
                        None => out.push_str("<missing argument>"),
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

// Sorted warning codes, built once from the catalog. Construction also
// asserts code uniqueness across the whole table.
static WARNING_CODES: OnceLock<Vec<u16>> = OnceLock::new();

fn warning_codes() -> &'static [u16] {
    WARNING_CODES.get_or_init(|| {
        let mut all: Vec<u16> = DiagnosticKind::ALL.iter().map(|k| k.code()).collect();
        all.sort_unstable();
        for pair in all.windows(2) {
            assert!(pair[0] != pair[1], "duplicate diagnostic code {}", pair[0]);
        }
        let mut warnings: Vec<u16> = DiagnosticKind::ALL
            .iter()
            .filter(|k| k.severity() == Severity::Warning)
            .map(|k| k.code())
            .collect();
        warnings.sort_unstable();
        warnings
    })
}

/// True when `code` names a warning in the catalog; used to validate
/// `#pragma warning` code lists.
pub fn is_valid_warning(code: u16) -> bool {
    warning_codes().binary_search(&code).is_ok()
}

/// Render a character the way it should appear between single quotes in a
/// message: standard escapes for the usual suspects, `0xNN` for other
/// control or non-ASCII characters.
pub fn char_literal(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        '\0' => "\\0".to_string(),
        '\x07' => "\\a".to_string(),
        '\x08' => "\\b".to_string(),
        '\x0C' => "\\f".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\x0B' => "\\v".to_string(),
        c if (c as u32) < 32 || (c as u32) > 126 => format!("0x{:02X}", c as u32),
        c => c.to_string(),
    }
}

/// Language-level name of a type, as it appears in diagnostics
/// (`int[,]`, `byte*`, `char&`).
pub fn type_name(ty: &TypeRef<'_>, interner: &Interner) -> String {
    ty.display_name(interner)
}

/// A formatted, position-stamped diagnostic ready for output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputMessage {
    pub severity: Severity,
    pub code: u16,
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl OutputMessage {
    pub fn new(
        severity: Severity,
        code: u16,
        source: String,
        position: Position,
        message: String,
    ) -> Self {
        OutputMessage {
            severity,
            code,
            source,
            line: position.line,
            column: position.column,
            message,
        }
    }
}

impl fmt::Display for OutputMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): {} CS{:04}: {}",
            self.source, self.line, self.column, self.severity, self.code, self.message
        )
    }
}

/// Append-only sink preserving emission order.
#[derive(Debug, Default)]
pub struct OutputMessageCollection {
    messages: Vec<OutputMessage>,
    has_errors: bool,
}

impl OutputMessageCollection {
    pub fn new() -> Self {
        OutputMessageCollection::default()
    }

    pub fn add(&mut self, message: OutputMessage) {
        if message.severity == Severity::Error {
            self.has_errors = true;
        }
        self.messages.push(message);
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputMessage> {
        self.messages.iter()
    }

    /// Machine-readable form for tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.messages).expect("diagnostics serialize")
    }
}

impl<'a> IntoIterator for &'a OutputMessageCollection {
    type Item = &'a OutputMessage;
    type IntoIter = std::slice::Iter<'a, OutputMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
