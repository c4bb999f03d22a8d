//! Type declarations and their members.
//!
//! Member bodies, parameter lists, and initializers are syntax-checked and
//! skipped; the surviving AST records signatures only. Disambiguation
//! follows the declaration shape: `~IDENT` is a destructor, `IDENT (` a
//! constructor, otherwise a type is parsed and the following tokens decide
//! between field, property, indexer, and method.

use super::attributes::AttrContext;
use super::{AttributeParsing, Parser, TypeParsing};
use crate::ast::types::{PrimitiveType, TypeRef};
use crate::ast::{Attribute, Identifier, Member, MemberKind, TypeDeclaration, TypeKind};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::position::Span;
use crate::token::TokenKind;

#[derive(Default)]
struct MemberLists<'a> {
    events: Vec<Member<'a>>,
    fields: Vec<Member<'a>>,
    methods: Vec<Member<'a>>,
    properties: Vec<Member<'a>>,
    nested: Vec<TypeDeclaration<'a>>,
}

fn integral_enum_base(kind: TokenKind) -> Option<PrimitiveType> {
    let prim = match kind {
        TokenKind::Byte => PrimitiveType::Byte,
        TokenKind::Sbyte => PrimitiveType::Sbyte,
        TokenKind::Short => PrimitiveType::Short,
        TokenKind::Ushort => PrimitiveType::Ushort,
        TokenKind::Int => PrimitiveType::Int,
        TokenKind::Uint => PrimitiveType::Uint,
        TokenKind::Long => PrimitiveType::Long,
        TokenKind::Ulong => PrimitiveType::Ulong,
        _ => return None,
    };
    Some(prim)
}

pub trait MemberParsing<'a> {
    /// Modifiers + one type declaration. `None` after error recovery.
    fn parse_type_declaration(
        &mut self,
        attrs: Vec<Attribute<'a>>,
    ) -> Option<TypeDeclaration<'a>>;

    fn parse_type_declaration_with(
        &mut self,
        attrs: Vec<Attribute<'a>>,
        mods: Vec<TokenKind>,
    ) -> Option<TypeDeclaration<'a>>;

    /// `(ModifierKeyword | 'partial')*`; duplicates are reported.
    fn parse_modifiers(&mut self) -> Vec<TokenKind>;
}

impl<'a, 'c> MemberParsing<'a> for Parser<'a, 'c> {
    fn parse_type_declaration(
        &mut self,
        attrs: Vec<Attribute<'a>>,
    ) -> Option<TypeDeclaration<'a>> {
        let mods = self.parse_modifiers();
        self.parse_type_declaration_with(attrs, mods)
    }

    fn parse_type_declaration_with(
        &mut self,
        attrs: Vec<Attribute<'a>>,
        mods: Vec<TokenKind>,
    ) -> Option<TypeDeclaration<'a>> {
        match self.kind(0) {
            TokenKind::Class => Some(self.parse_class_like(TypeKind::Class, attrs, mods)),
            TokenKind::Struct => Some(self.parse_class_like(TypeKind::Struct, attrs, mods)),
            TokenKind::Interface => {
                Some(self.parse_class_like(TypeKind::Interface, attrs, mods))
            }
            TokenKind::Enum => Some(self.parse_enum(attrs, mods)),
            TokenKind::Delegate => Some(self.parse_delegate(attrs, mods)),
            _ => {
                self.error_here(Diagnostic::new(DiagnosticKind::ExpectedTypeDeclaration));
                self.recover_from_bad_declaration();
                None
            }
        }
    }

    fn parse_modifiers(&mut self) -> Vec<TokenKind> {
        let mut mods: Vec<TokenKind> = Vec::new();
        loop {
            let kind = self.kind(0);
            if kind.is_modifier() {
                let token = self.peek(0).clone();
                if mods.contains(&kind) {
                    self.error_at(
                        &token,
                        Diagnostic::with_arg(DiagnosticKind::DuplicateModifier, kind.text()),
                    );
                } else {
                    mods.push(kind);
                }
                self.bump();
            } else if self.is_ident_text(0, "partial")
                && (self.kind(1).is_declaration_keyword() || self.kind(1).is_modifier())
            {
                // Contextual; accepted and not recorded.
                self.bump();
            } else {
                return mods;
            }
        }
    }
}

impl<'a, 'c> Parser<'a, 'c> {
    fn parse_class_like(
        &mut self,
        kind: TypeKind,
        attrs: Vec<Attribute<'a>>,
        mods: Vec<TokenKind>,
    ) -> TypeDeclaration<'a> {
        let decl_tok = self.bump();
        let name = self.expect_identifier();
        if self.kind(0) == TokenKind::LessThan {
            self.skip_angle_brackets();
        }

        let mut bases: Vec<TypeRef<'a>> = Vec::new();
        if self.kind(0) == TokenKind::Colon {
            self.bump();
            loop {
                bases.push(*self.parse_type());
                if self.kind(0) == TokenKind::Comma {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.skip_where_clauses(&[TokenKind::LeftBrace]);

        let mut lists = MemberLists::default();
        if self.expect_kind(TokenKind::LeftBrace, DiagnosticKind::ExpectedLeftBrace) {
            loop {
                self.discard_doc_comments();
                match self.kind(0) {
                    TokenKind::RightBrace | TokenKind::Eof | TokenKind::Eod => break,
                    _ => self.parse_member(kind, &mut lists),
                }
            }
            self.expect_kind(TokenKind::RightBrace, DiagnosticKind::ExpectedRightBrace);
            if self.kind(0) == TokenKind::Semicolon {
                self.bump();
            }
        } else {
            self.recover_from_bad_declaration();
        }

        TypeDeclaration {
            source: decl_tok.source,
            span: Span::new(decl_tok.start, self.last_end),
            name,
            kind,
            modifiers: self.ctx.alloc_kinds(mods),
            attributes: self.ctx.alloc_attributes(attrs),
            bases: self.ctx.alloc_type_refs(bases),
            events: self.ctx.alloc_members(lists.events),
            fields: self.ctx.alloc_members(lists.fields),
            methods: self.ctx.alloc_members(lists.methods),
            properties: self.ctx.alloc_members(lists.properties),
            nested_types: self.ctx.alloc_types(lists.nested),
        }
    }

    fn parse_enum(
        &mut self,
        attrs: Vec<Attribute<'a>>,
        mods: Vec<TokenKind>,
    ) -> TypeDeclaration<'a> {
        let decl_tok = self.bump();
        debug_assert_eq!(decl_tok.kind, TokenKind::Enum);
        let name = self.expect_identifier();

        let mut bases: Vec<TypeRef<'a>> = Vec::new();
        if self.kind(0) == TokenKind::Colon {
            self.bump();
            if let Some(prim) = integral_enum_base(self.kind(0)) {
                self.bump();
                bases.push(TypeRef::Primitive(prim));
            } else {
                self.error_here(Diagnostic::new(DiagnosticKind::InvalidEnumBase));
                if self.at_type_start() {
                    self.parse_type();
                }
            }
        }

        let mut fields: Vec<Member<'a>> = Vec::new();
        if self.expect_kind(TokenKind::LeftBrace, DiagnosticKind::ExpectedLeftBrace) {
            loop {
                self.discard_doc_comments();
                match self.kind(0) {
                    TokenKind::RightBrace | TokenKind::Eof | TokenKind::Eod => break,
                    TokenKind::Identifier | TokenKind::LeftBracket => {
                        let member_start = self.peek(0).start;
                        let member_attrs =
                            self.parse_attribute_sections(AttrContext::Member, None);
                        let ename = self.expect_identifier();
                        if self.is_assign(0) {
                            self.bump();
                            let _ = self.parse_constant_expression();
                        }
                        fields.push(Member {
                            source: decl_tok.source,
                            span: Span::new(member_start, self.last_end),
                            kind: MemberKind::EnumMember,
                            name: ename,
                            declared_type: None,
                            modifiers: self.ctx.alloc_kinds(Vec::new()),
                            attributes: self.ctx.alloc_attributes(member_attrs),
                        });
                        if self.kind(0) == TokenKind::Comma {
                            self.bump();
                            continue;
                        }
                        break;
                    }
                    _ => {
                        self.error_here(Diagnostic::new(DiagnosticKind::ExpectedIdentifier));
                        self.recover_to(&[
                            TokenKind::Comma,
                            TokenKind::RightBrace,
                        ]);
                        if self.kind(0) == TokenKind::Comma {
                            self.bump();
                        }
                    }
                }
            }
            self.expect_kind(TokenKind::RightBrace, DiagnosticKind::ExpectedRightBrace);
            if self.kind(0) == TokenKind::Semicolon {
                self.bump();
            }
        } else {
            self.recover_from_bad_declaration();
        }

        TypeDeclaration {
            source: decl_tok.source,
            span: Span::new(decl_tok.start, self.last_end),
            name,
            kind: TypeKind::Enum,
            modifiers: self.ctx.alloc_kinds(mods),
            attributes: self.ctx.alloc_attributes(attrs),
            bases: self.ctx.alloc_type_refs(bases),
            events: self.ctx.alloc_members(Vec::new()),
            fields: self.ctx.alloc_members(fields),
            methods: self.ctx.alloc_members(Vec::new()),
            properties: self.ctx.alloc_members(Vec::new()),
            nested_types: self.ctx.alloc_types(Vec::new()),
        }
    }

    fn parse_delegate(
        &mut self,
        attrs: Vec<Attribute<'a>>,
        mods: Vec<TokenKind>,
    ) -> TypeDeclaration<'a> {
        let decl_tok = self.bump();
        debug_assert_eq!(decl_tok.kind, TokenKind::Delegate);
        let _return_type = self.parse_type();
        let name = self.expect_identifier();
        if self.kind(0) == TokenKind::LessThan {
            self.skip_angle_brackets();
        }
        if self.kind(0) == TokenKind::LeftParen {
            self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
        } else {
            self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "("));
        }
        self.skip_where_clauses(&[TokenKind::Semicolon]);
        self.expect_semicolon();

        TypeDeclaration {
            source: decl_tok.source,
            span: Span::new(decl_tok.start, self.last_end),
            name,
            kind: TypeKind::Delegate,
            modifiers: self.ctx.alloc_kinds(mods),
            attributes: self.ctx.alloc_attributes(attrs),
            bases: self.ctx.alloc_type_refs(Vec::new()),
            events: self.ctx.alloc_members(Vec::new()),
            fields: self.ctx.alloc_members(Vec::new()),
            methods: self.ctx.alloc_members(Vec::new()),
            properties: self.ctx.alloc_members(Vec::new()),
            nested_types: self.ctx.alloc_types(Vec::new()),
        }
    }

    fn parse_member(&mut self, owner: TypeKind, lists: &mut MemberLists<'a>) {
        let member_tok = self.peek(0).clone();
        let attrs = self.parse_attribute_sections(AttrContext::Member, None);
        let mods = self.parse_modifiers();
        let first = self.peek(0).clone();

        match first.kind {
            k if k.is_declaration_keyword() => {
                if owner == TypeKind::Interface {
                    self.error_at(&first, Diagnostic::new(DiagnosticKind::NoTypesInInterfaces));
                }
                if let Some(nested) = self.parse_type_declaration_with(attrs, mods) {
                    lists.nested.push(nested);
                }
            }
            TokenKind::Tilde => {
                self.bump();
                if owner != TypeKind::Class {
                    self.error_at(
                        &first,
                        Diagnostic::new(DiagnosticKind::NoDestructorOutsideClass),
                    );
                }
                let name = self.expect_identifier();
                if self.kind(0) == TokenKind::LeftParen {
                    self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
                } else {
                    self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "("));
                }
                self.skip_body_or_semicolon();
                lists.methods.push(self.make_member(
                    &member_tok,
                    MemberKind::Destructor,
                    name,
                    None,
                    mods,
                    attrs,
                ));
            }
            TokenKind::Identifier if self.kind(1) == TokenKind::LeftParen => {
                // Constructor: a bare name followed by its parameter list.
                if owner == TypeKind::Interface {
                    self.error_at(
                        &first,
                        Diagnostic::new(DiagnosticKind::NoConstructorInInterface),
                    );
                }
                let name = self.expect_identifier();
                self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
                if self.kind(0) == TokenKind::Colon {
                    // base/this initializer; recover to its argument list.
                    self.bump();
                    self.recover_to(&[
                        TokenKind::LeftParen,
                        TokenKind::LeftBrace,
                        TokenKind::Semicolon,
                    ]);
                    if self.kind(0) == TokenKind::LeftParen {
                        self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
                    }
                }
                self.skip_body_or_semicolon();
                lists.methods.push(self.make_member(
                    &member_tok,
                    MemberKind::Constructor,
                    name,
                    None,
                    mods,
                    attrs,
                ));
            }
            TokenKind::Event => {
                self.bump();
                let ty = self.parse_type();
                let name = self.expect_identifier();
                match self.kind(0) {
                    TokenKind::Semicolon => {
                        self.bump();
                    }
                    TokenKind::LeftBrace => self.skip_block(),
                    _ if self.is_assign(0) => self.skip_to_field_end(),
                    _ => self.expect_semicolon(),
                }
                lists.events.push(self.make_member(
                    &member_tok,
                    MemberKind::Event,
                    name,
                    Some(ty),
                    mods,
                    attrs,
                ));
            }
            TokenKind::XmlCommentLine => {
                self.warn_misplaced_doc_comments();
            }
            _ if self.at_type_start() => {
                let ty = self.parse_type();
                self.parse_typed_member(owner, lists, &member_tok, ty, mods, attrs);
            }
            TokenKind::This => {
                // An indexer with an implicit `object` flavor would still
                // need a type; `this` without one is malformed.
                let text = self.token_text(0);
                self.error_at(
                    &first,
                    Diagnostic::with_arg(DiagnosticKind::InvalidTokenInTypeDecl, text),
                );
                self.recover_from_bad_declaration();
            }
            _ => {
                let text = self.token_text(0);
                self.error_at(
                    &first,
                    Diagnostic::with_arg(DiagnosticKind::InvalidTokenInTypeDecl, text),
                );
                self.recover_from_bad_declaration();
            }
        }
    }

    /// A member that began with a type: field, property, indexer, or
    /// method.
    fn parse_typed_member(
        &mut self,
        owner: TypeKind,
        lists: &mut MemberLists<'a>,
        member_tok: &crate::token::Token,
        ty: &'a TypeRef<'a>,
        mods: Vec<TokenKind>,
        attrs: Vec<Attribute<'a>>,
    ) {
        if self.kind(0) == TokenKind::This {
            let name = self.parse_indexer_this();
            lists.properties.push(self.make_member(
                member_tok,
                MemberKind::Indexer,
                name,
                Some(ty),
                mods,
                attrs,
            ));
            return;
        }

        if self.kind(0) != TokenKind::Identifier {
            let token = self.peek(0).clone();
            let text = self.token_text(0);
            self.error_at(
                &token,
                Diagnostic::with_arg(DiagnosticKind::InvalidTokenInTypeDecl, text),
            );
            self.recover_from_bad_declaration();
            return;
        }

        // Field: IDENT followed by `;`, `=`, or `,`.
        let next = self.kind(1);
        if next == TokenKind::Semicolon || next == TokenKind::Comma || self.is_assign(1) {
            let name_tok = self.peek(0).clone();
            if owner == TypeKind::Interface {
                self.error_at(&name_tok, Diagnostic::new(DiagnosticKind::NoFieldsInInterfaces));
            }
            let name = self.expect_identifier();
            self.skip_to_field_end();
            lists.fields.push(self.make_member(
                member_tok,
                MemberKind::Field,
                name,
                Some(ty),
                mods,
                attrs,
            ));
            return;
        }

        let name = self.parse_member_name();
        match self.kind(0) {
            TokenKind::LeftBrace => {
                self.skip_block();
                lists.properties.push(self.make_member(
                    member_tok,
                    MemberKind::Property,
                    name,
                    Some(ty),
                    mods,
                    attrs,
                ));
            }
            TokenKind::LeftBracket => {
                self.skip_balanced(TokenKind::LeftBracket, TokenKind::RightBracket);
                if self.kind(0) == TokenKind::LeftBrace {
                    self.skip_block();
                } else {
                    self.error_here(Diagnostic::new(DiagnosticKind::ExpectedLeftBrace));
                }
                lists.properties.push(self.make_member(
                    member_tok,
                    MemberKind::Indexer,
                    name,
                    Some(ty),
                    mods,
                    attrs,
                ));
            }
            TokenKind::LeftParen => {
                self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
                self.skip_where_clauses(&[TokenKind::LeftBrace, TokenKind::Semicolon]);
                self.skip_body_or_semicolon();
                lists.methods.push(self.make_member(
                    member_tok,
                    MemberKind::Method,
                    name,
                    Some(ty),
                    mods,
                    attrs,
                ));
            }
            TokenKind::Period if self.kind(1) == TokenKind::This => {
                self.bump();
                let _this = self.parse_indexer_this();
                lists.properties.push(self.make_member(
                    member_tok,
                    MemberKind::Indexer,
                    name,
                    Some(ty),
                    mods,
                    attrs,
                ));
            }
            _ => {
                let text = self.token_text(0);
                self.error_here(Diagnostic::with_arg(
                    DiagnosticKind::InvalidTokenInTypeDecl,
                    text,
                ));
                self.recover_from_bad_declaration();
            }
        }
    }

    /// `this [ params ] { accessors }` after an indexer's type (and
    /// optional interface qualifier).
    fn parse_indexer_this(&mut self) -> Identifier {
        let this_tok = self.bump();
        debug_assert_eq!(this_tok.kind, TokenKind::This);
        let name = Identifier {
            name: self.intern("this"),
            scope: None,
            span: this_tok.span(),
        };
        if self.kind(0) == TokenKind::LeftBracket {
            self.skip_balanced(TokenKind::LeftBracket, TokenKind::RightBracket);
        } else {
            self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "["));
        }
        if self.kind(0) == TokenKind::LeftBrace {
            self.skip_block();
        } else {
            self.error_here(Diagnostic::new(DiagnosticKind::ExpectedLeftBrace));
        }
        name
    }

    /// Method/property names may be dotted (explicit interface
    /// implementations).
    fn parse_member_name(&mut self) -> Identifier {
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
        if self.kind(0) == TokenKind::LessThan {
            self.skip_angle_brackets();
        }
        Identifier {
            name: self.intern(&text),
            scope: None,
            span,
        }
    }

    fn make_member(
        &mut self,
        member_tok: &crate::token::Token,
        kind: MemberKind,
        name: Identifier,
        declared_type: Option<&'a TypeRef<'a>>,
        mods: Vec<TokenKind>,
        attrs: Vec<Attribute<'a>>,
    ) -> Member<'a> {
        Member {
            source: member_tok.source,
            span: Span::new(member_tok.start, self.last_end),
            kind,
            name,
            declared_type,
            modifiers: self.ctx.alloc_kinds(mods),
            attributes: self.ctx.alloc_attributes(attrs),
        }
    }

    /// `{ ... }` body or `;` (abstract/extern/interface flavor).
    fn skip_body_or_semicolon(&mut self) {
        match self.kind(0) {
            TokenKind::LeftBrace => self.skip_block(),
            TokenKind::Semicolon => {
                self.bump();
            }
            _ => {
                self.error_here(Diagnostic::new(DiagnosticKind::ExpectedLeftBrace));
                self.recover_from_bad_declaration();
            }
        }
    }

    /// Consume a field/event tail through its terminating semicolon,
    /// tolerating initializers (including braced array initializers) and
    /// additional declarators.
    fn skip_to_field_end(&mut self) {
        loop {
            match self.kind(0) {
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::LeftBrace => self.skip_block(),
                TokenKind::RightBrace | TokenKind::Eof | TokenKind::Eod => {
                    self.error_here(Diagnostic::new(DiagnosticKind::ExpectedSemicolon));
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Skip `where T : ...` clauses up to one of the stop kinds.
    fn skip_where_clauses(&mut self, stops: &[TokenKind]) {
        while self.is_ident_text(0, "where") {
            self.bump();
            loop {
                let k = self.kind(0);
                if stops.contains(&k)
                    || matches!(k, TokenKind::Eof | TokenKind::Eod)
                    || self.is_ident_text(0, "where")
                {
                    break;
                }
                self.bump();
            }
        }
    }
}
