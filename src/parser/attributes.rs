//! Attribute section parsing: `[target: Attr(args), Attr2]`.

use super::{Parser, TypeParsing};
use crate::ast::{AttrTarget, Attribute, Expr, Identifier};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::position::Span;
use crate::token::TokenKind;

/// Where a run of attribute sections is attached; decides which targets
/// are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrContext {
    /// Namespace scope: `assembly` sections are global, `type` sections
    /// attach to the following declaration.
    NamespaceLevel,
    /// Directly on a type declaration.
    TypeDecl,
    /// On a member.
    Member,
}

fn target_is_valid(context: AttrContext, target: AttrTarget) -> bool {
    match context {
        AttrContext::NamespaceLevel => {
            matches!(target, AttrTarget::Assembly | AttrTarget::Type | AttrTarget::TypeVar)
        }
        AttrContext::TypeDecl => matches!(target, AttrTarget::Type | AttrTarget::TypeVar),
        AttrContext::Member => matches!(
            target,
            AttrTarget::Event
                | AttrTarget::Field
                | AttrTarget::Method
                | AttrTarget::Param
                | AttrTarget::Property
                | AttrTarget::Return
        ),
    }
}

pub trait AttributeParsing<'a> {
    /// Parse zero or more `[...]` sections. Sections with an `assembly`
    /// target go into `globals` when a slot is supplied; sections whose
    /// target is unknown or invalid for the context are parsed and
    /// discarded after a warning.
    fn parse_attribute_sections(
        &mut self,
        context: AttrContext,
        globals: Option<&mut Vec<Attribute<'a>>>,
    ) -> Vec<Attribute<'a>>;

    fn parse_attribute(&mut self, target: Option<AttrTarget>) -> Attribute<'a>;
}

impl<'a, 'c> AttributeParsing<'a> for Parser<'a, 'c> {
    fn parse_attribute_sections(
        &mut self,
        context: AttrContext,
        mut globals: Option<&mut Vec<Attribute<'a>>>,
    ) -> Vec<Attribute<'a>> {
        let mut attached = Vec::new();
        while self.kind(0) == TokenKind::LeftBracket {
            self.bump();
            let mut target = None;
            let mut discard = false;

            // `word :` opens a target specifier. `event` and `return`
            // arrive as keywords, the rest as identifiers.
            let leads_target = self.kind(1) == TokenKind::Colon
                && (self.kind(0) == TokenKind::Identifier || self.kind(0).is_keyword());
            if leads_target {
                let word_tok = self.peek(0).clone();
                let word = self.token_text(0);
                self.bump();
                self.bump(); // ':'
                match AttrTarget::from_text(&word) {
                    Some(t) => {
                        if !target_is_valid(context, t) {
                            self.error_at(
                                &word_tok,
                                Diagnostic::with_arg(
                                    DiagnosticKind::InvalidAttributeTarget,
                                    word,
                                ),
                            );
                            discard = true;
                        } else {
                            target = Some(t);
                        }
                    }
                    None => {
                        self.error_at(
                            &word_tok,
                            Diagnostic::with_arg(DiagnosticKind::UnknownAttributeTarget, word),
                        );
                        discard = true;
                    }
                }
            }

            loop {
                let attr = self.parse_attribute(target);
                if !discard {
                    match (target, globals.as_mut()) {
                        (Some(AttrTarget::Assembly), Some(globals)) => globals.push(attr),
                        _ => attached.push(attr),
                    }
                }
                if self.kind(0) == TokenKind::Comma {
                    self.bump();
                    continue;
                }
                break;
            }

            if self.kind(0) == TokenKind::RightBracket {
                self.bump();
            } else {
                self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "]"));
                self.recover_to(&[
                    TokenKind::RightBracket,
                    TokenKind::Semicolon,
                    TokenKind::LeftBrace,
                    TokenKind::RightBrace,
                ]);
                if self.kind(0) == TokenKind::RightBracket {
                    self.bump();
                }
            }
        }
        attached
    }

    fn parse_attribute(&mut self, target: Option<AttrTarget>) -> Attribute<'a> {
        let first = self.peek(0).clone();
        let ty = self.parse_type_name();
        let mut positional: Vec<Expr<'a>> = Vec::new();
        let mut named_names: Vec<Identifier> = Vec::new();
        let mut named_values: Vec<Expr<'a>> = Vec::new();

        if self.kind(0) == TokenKind::LeftParen {
            self.bump();
            if self.kind(0) != TokenKind::RightParen {
                loop {
                    if self.kind(0) == TokenKind::Identifier && self.is_assign(1) {
                        let name = self.expect_identifier();
                        self.bump(); // '='
                        let value = self.parse_constant_expression();
                        named_names.push(name);
                        named_values.push(value);
                    } else {
                        if !named_names.is_empty() {
                            // Positional arguments cannot follow named ones.
                            self.error_here(Diagnostic::new(
                                DiagnosticKind::NamedArgumentExpected,
                            ));
                        }
                        let value = self.parse_constant_expression();
                        positional.push(value);
                    }
                    if self.kind(0) == TokenKind::Comma {
                        self.bump();
                        continue;
                    }
                    break;
                }
            }
            self.expect_kind(TokenKind::RightParen, DiagnosticKind::ExpectedRightParen);
        }

        Attribute {
            source: first.source,
            span: Span::new(first.start, self.last_end),
            target,
            ty,
            positional_args: self.ctx.alloc_exprs(positional),
            named_arg_names: self.ctx.alloc_idents(named_names),
            named_arg_values: self.ctx.alloc_exprs(named_values),
        }
    }
}
