//! Recursive-descent parser for the declaration grammar.
//!
//! The parser pulls tokens from the [`Scanner`] through a small lookahead
//! ring and builds arena-allocated AST nodes. Syntax errors go to the
//! diagnostic sink and parsing resynchronizes on a recovery token set;
//! the parser itself never fails.

mod attributes;
mod members;
mod types;


pub use attributes::{AttrContext, AttributeParsing};
pub use members::MemberParsing;
pub use types::TypeParsing;

use std::collections::VecDeque;

use crate::arena_ctx::AstContext;
use crate::ast::{Expr, Identifier, Namespace, SourceFile, TypeDeclaration, UsingNode};
use crate::compiler::Compiler;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::intern::Symbol;
use crate::position::{Position, Span};
use crate::scanner::Scanner;
use crate::source::{SourceLoader, SourceText};
use crate::token::{Token, TokenKind, TokenValue};

pub struct Parser<'a, 'c> {
    pub(super) scanner: Scanner<'c>,
    pub(super) ctx: AstContext<'a>,
    lookahead: VecDeque<Token>,
    /// End of the most recently consumed token; closes node spans.
    pub(super) last_end: Position,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(compiler: &'c mut Compiler, sources: Vec<SourceText>, ctx: AstContext<'a>) -> Self {
        Parser {
            scanner: Scanner::new(compiler, sources),
            ctx,
            lookahead: VecDeque::with_capacity(4),
            last_end: Position::start(),
        }
    }

    pub fn with_loader(
        compiler: &'c mut Compiler,
        sources: Vec<SourceText>,
        ctx: AstContext<'a>,
        loader: Box<dyn SourceLoader>,
    ) -> Self {
        Parser {
            scanner: Scanner::with_loader(compiler, sources, loader),
            ctx,
            lookahead: VecDeque::with_capacity(4),
            last_end: Position::start(),
        }
    }

    pub fn compiler(&self) -> &Compiler {
        self.scanner.compiler()
    }

    pub fn compiler_mut(&mut self) -> &mut Compiler {
        self.scanner.compiler_mut()
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    pub(super) fn peek(&mut self, n: usize) -> &Token {
        while self.lookahead.len() <= n {
            let token = self.scanner.next_token();
            self.lookahead.push_back(token);
        }
        &self.lookahead[n]
    }

    pub(super) fn kind(&mut self, n: usize) -> TokenKind {
        self.peek(n).kind
    }

    pub(super) fn bump(&mut self) -> Token {
        self.peek(0);
        let token = self.lookahead.pop_front().expect("lookahead filled");
        self.last_end = token.end;
        token
    }

    /// `=` arrives as `OpAssign` carrying the bare-assign operator.
    pub(super) fn is_assign(&mut self, n: usize) -> bool {
        let token = self.peek(n);
        token.kind == TokenKind::OpAssign
            && token.value == TokenValue::Operator(TokenKind::Assign)
    }

    pub(super) fn is_ident_text(&mut self, n: usize, text: &str) -> bool {
        let token = self.peek(n);
        token.kind == TokenKind::Identifier
            && matches!(&token.value, TokenValue::Str(s) if s == text)
    }

    pub(super) fn error_at(&mut self, token: &Token, diag: Diagnostic) {
        let source = token.source;
        let position = token.start;
        self.scanner.compiler_mut().report(source, position, diag);
    }

    pub(super) fn error_here(&mut self, diag: Diagnostic) {
        let token = self.peek(0).clone();
        self.error_at(&token, diag);
    }

    pub(super) fn intern(&mut self, text: &str) -> Symbol {
        self.scanner.compiler_mut().intern(text)
    }

    pub(super) fn token_text(&mut self, n: usize) -> String {
        let token = self.peek(n).clone();
        token.display_text(self.scanner.compiler().interner())
    }

    // =========================================================================
    // Common expectations
    // =========================================================================

    /// Consume an identifier, tolerating keywords after a diagnostic. On a
    /// total miss the current token is left in place and an empty
    /// identifier is synthesized.
    pub(super) fn expect_identifier(&mut self) -> Identifier {
        let token = self.peek(0).clone();
        match token.kind {
            TokenKind::Identifier => {
                self.bump();
                let text = match &token.value {
                    TokenValue::Str(s) => s.clone(),
                    _ => String::new(),
                };
                Identifier {
                    name: self.intern(&text),
                    scope: None,
                    span: token.span(),
                }
            }
            k if k.is_keyword() => {
                self.error_at(
                    &token,
                    Diagnostic::with_arg(DiagnosticKind::ExpectedIdentGotKeyword, k.text()),
                );
                self.bump();
                Identifier {
                    name: self.intern(k.text()),
                    scope: None,
                    span: token.span(),
                }
            }
            _ => {
                self.error_at(&token, Diagnostic::new(DiagnosticKind::ExpectedIdentifier));
                Identifier {
                    name: self.intern(""),
                    scope: None,
                    span: token.span(),
                }
            }
        }
    }

    pub(super) fn expect_semicolon(&mut self) {
        if self.kind(0) == TokenKind::Semicolon {
            self.bump();
        } else {
            self.error_here(Diagnostic::new(DiagnosticKind::ExpectedSemicolon));
        }
    }

    /// Consume `kind` or report the supplied diagnostic, leaving the
    /// unexpected token for the caller's recovery.
    pub(super) fn expect_kind(&mut self, kind: TokenKind, diag: DiagnosticKind) -> bool {
        if self.kind(0) == kind {
            self.bump();
            true
        } else {
            self.error_here(Diagnostic::new(diag));
            false
        }
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Skip tokens until one of `kinds` (or end of input) is current.
    pub(super) fn recover_to(&mut self, kinds: &[TokenKind]) {
        loop {
            let k = self.kind(0);
            if kinds.contains(&k) || matches!(k, TokenKind::Eof | TokenKind::Eod) {
                return;
            }
            self.bump();
        }
    }

    /// Find the next `{`, `}`, or `;`. A brace block is skipped whole, a
    /// semicolon is consumed, a closing brace is left for the caller.
    pub(super) fn recover_from_bad_declaration(&mut self) {
        self.recover_to(&[
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Semicolon,
        ]);
        match self.kind(0) {
            TokenKind::LeftBrace => self.skip_block(),
            TokenKind::Semicolon => {
                self.bump();
            }
            _ => {}
        }
    }

    /// Skip a balanced `{ ... }` block; current token must be `{`.
    pub(super) fn skip_block(&mut self) {
        self.skip_balanced(TokenKind::LeftBrace, TokenKind::RightBrace);
    }

    pub(super) fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        debug_assert_eq!(self.kind(0), open);
        self.bump();
        let mut depth = 1u32;
        loop {
            let k = self.kind(0);
            if k == open {
                depth += 1;
            } else if k == close {
                depth -= 1;
                if depth == 0 {
                    self.bump();
                    return;
                }
            } else if matches!(k, TokenKind::Eof | TokenKind::Eod) {
                let diag = if close == TokenKind::RightBrace {
                    DiagnosticKind::ExpectedRightBrace
                } else {
                    DiagnosticKind::ExpectedRightParen
                };
                self.error_here(Diagnostic::new(diag));
                return;
            }
            self.bump();
        }
    }

    /// Drop doc-comment tokens ahead of a declaration. A run that precedes
    /// a scope closer documents nothing and is flagged.
    pub(super) fn discard_doc_comments(&mut self) {
        let mut run = 0;
        while self.kind(run) == TokenKind::XmlCommentLine {
            run += 1;
        }
        if run == 0 {
            return;
        }
        let misplaced = matches!(
            self.kind(run),
            TokenKind::RightBrace | TokenKind::Eof | TokenKind::Eod
        );
        for _ in 0..run {
            let token = self.bump();
            if misplaced {
                self.error_at(&token, Diagnostic::new(DiagnosticKind::MisplacedXmlComment));
            }
        }
    }

    /// Drop doc comments that precede something they cannot document.
    pub(super) fn warn_misplaced_doc_comments(&mut self) {
        while self.kind(0) == TokenKind::XmlCommentLine {
            let token = self.peek(0).clone();
            self.error_at(&token, Diagnostic::new(DiagnosticKind::MisplacedXmlComment));
            self.bump();
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Parse every remaining buffer, one [`SourceFile`] each.
    pub fn parse_program(&mut self) -> Vec<&'a SourceFile<'a>> {
        let mut files = Vec::new();
        while let Some(file) = self.parse_one() {
            files.push(file);
        }
        files
    }

    /// Parse the next buffer. Returns `None` once all input is consumed.
    pub fn parse_one(&mut self) -> Option<&'a SourceFile<'a>> {
        if self.kind(0) == TokenKind::Eod {
            return None;
        }
        let root = self.parse_namespace_body(None, true);
        if self.kind(0) == TokenKind::Eof {
            self.bump();
        }
        let file = SourceFile {
            source: root.source,
            span: root.span,
            root: self.ctx.alloc_namespace(root),
        };
        Some(self.ctx.alloc_file(file))
    }

    // =========================================================================
    // Namespace scaffolding
    // =========================================================================

    pub(super) fn parse_namespace_body(
        &mut self,
        name: Option<Identifier>,
        is_root: bool,
    ) -> Namespace<'a> {
        let first = self.peek(0).clone();
        let start = first.start;
        let source = first.source;
        let mut extern_aliases: Vec<Symbol> = Vec::new();
        let mut usings: Vec<UsingNode<'a>> = Vec::new();
        let mut namespaces: Vec<Namespace<'a>> = Vec::new();
        let mut types: Vec<TypeDeclaration<'a>> = Vec::new();
        let mut globals: Vec<crate::ast::Attribute<'a>> = Vec::new();

        loop {
            self.discard_doc_comments();
            match self.kind(0) {
                TokenKind::Eof | TokenKind::Eod => break,
                TokenKind::RightBrace => {
                    if is_root {
                        // Stray closer at file level; drop it and move on.
                        let token = self.bump();
                        self.error_at(
                            &token,
                            Diagnostic::new(DiagnosticKind::ExpectedTypeDeclaration),
                        );
                        continue;
                    }
                    break;
                }
                TokenKind::Extern if self.is_ident_text(1, "alias") => {
                    self.bump();
                    self.bump();
                    let alias = self.expect_identifier();
                    extern_aliases.push(alias.name);
                    self.expect_semicolon();
                }
                TokenKind::Using => usings.push(self.parse_using()),
                TokenKind::Namespace => {
                    if let Some(ns) = self.parse_namespace_decl() {
                        namespaces.push(ns);
                    }
                }
                _ => {
                    let had_sections = self.kind(0) == TokenKind::LeftBracket;
                    let attrs = self.parse_attribute_sections(
                        attributes::AttrContext::NamespaceLevel,
                        Some(&mut globals),
                    );
                    if attrs.is_empty() && had_sections {
                        // Assembly-level or discarded sections attach to
                        // nothing; whatever follows re-dispatches.
                        continue;
                    }
                    if let Some(decl) = self.parse_type_declaration(attrs) {
                        types.push(decl);
                    }
                }
            }
        }

        Namespace {
            source,
            span: Span::new(start, self.last_end),
            name,
            extern_aliases: self.ctx.alloc_syms(extern_aliases),
            usings: self.ctx.alloc_usings(usings),
            namespaces: self.ctx.alloc_namespaces(namespaces),
            types: self.ctx.alloc_types(types),
            global_attributes: self.ctx.alloc_attributes(globals),
        }
    }

    fn parse_using(&mut self) -> UsingNode<'a> {
        let using_tok = self.bump();
        debug_assert_eq!(using_tok.kind, TokenKind::Using);
        if self.kind(0) == TokenKind::Identifier && self.is_assign(1) {
            let alias = self.expect_identifier();
            self.bump(); // '='
            let target = self.parse_type_name();
            self.expect_semicolon();
            UsingNode::Alias {
                source: using_tok.source,
                span: Span::new(using_tok.start, self.last_end),
                alias,
                target,
            }
        } else {
            let name = self.parse_dotted_name();
            self.expect_semicolon();
            UsingNode::Namespace {
                source: using_tok.source,
                span: Span::new(using_tok.start, self.last_end),
                name,
            }
        }
    }

    fn parse_namespace_decl(&mut self) -> Option<Namespace<'a>> {
        let ns_tok = self.bump();
        debug_assert_eq!(ns_tok.kind, TokenKind::Namespace);
        let name = self.parse_dotted_name();
        if !self.expect_kind(TokenKind::LeftBrace, DiagnosticKind::ExpectedLeftBrace) {
            self.recover_from_bad_declaration();
            return None;
        }
        let mut ns = self.parse_namespace_body(Some(name), false);
        self.expect_kind(TokenKind::RightBrace, DiagnosticKind::ExpectedRightBrace);
        if self.kind(0) == TokenKind::Semicolon {
            self.bump();
        }
        ns.span = Span::new(ns_tok.start, self.last_end);
        Some(ns)
    }

    /// `A.B.C` captured as one dotted identifier.
    pub(super) fn parse_dotted_name(&mut self) -> Identifier {
        let first = self.expect_identifier();
        let mut text = self
            .scanner
            .compiler()
            .interner()
            .resolve(first.name)
            .to_string();
        let mut span = first.span;
        while self.kind(0) == TokenKind::Period && self.kind(1) == TokenKind::Identifier {
            self.bump();
            let part = self.expect_identifier();
            text.push('.');
            text.push_str(self.scanner.compiler().interner().resolve(part.name));
            span = span.merge(part.span);
        }
        Identifier {
            name: self.intern(&text),
            scope: None,
            span,
        }
    }

    // =========================================================================
    // Constant expressions
    // =========================================================================

    /// Parse a constant expression. Only the subset attribute arguments
    /// need is supported: literals, (dotted) names, parentheses, and unary
    /// `- ! ~`. Anything else reports `InvalidExprTerm` and yields an
    /// error node.
    pub fn parse_expression(&mut self) -> &'a Expr<'a> {
        let expr = self.parse_constant_expression();
        self.ctx.alloc_expr(expr)
    }

    pub(super) fn parse_constant_expression(&mut self) -> Expr<'a> {
        let token = self.peek(0).clone();
        match token.kind {
            TokenKind::Minus | TokenKind::Not | TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_constant_expression();
                let end = operand.span().end;
                Expr::Unary {
                    op: token.kind,
                    operand: self.ctx.alloc_expr(operand),
                    span: Span::new(token.start, end),
                }
            }
            TokenKind::Literal => {
                self.bump();
                let span = token.span();
                Expr::Literal {
                    value: token.value,
                    span,
                }
            }
            TokenKind::Identifier => {
                let name = self.parse_dotted_name();
                Expr::Name { name }
            }
            TokenKind::LeftParen => {
                self.bump();
                let inner = self.parse_constant_expression();
                self.expect_kind(TokenKind::RightParen, DiagnosticKind::ExpectedRightParen);
                inner
            }
            _ => {
                let text = self.token_text(0);
                self.error_at(
                    &token,
                    Diagnostic::with_arg(DiagnosticKind::InvalidExprTerm, text),
                );
                self.bump();
                Expr::Error {
                    span: token.span(),
                }
            }
        }
    }
}
