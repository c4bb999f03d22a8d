//! Type reference parsing: `alias::Name.Nested<T>?*[,,]`.
//!
//! Generic argument lists are syntax-checked and discarded; resolution is
//! out of scope for the front-end.

use super::Parser;
use crate::ast::types::{PrimitiveType, TypeRef};
use crate::ast::Identifier;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::token::TokenKind;

fn primitive_for(kind: TokenKind) -> Option<PrimitiveType> {
    let prim = match kind {
        TokenKind::Bool => PrimitiveType::Bool,
        TokenKind::Byte => PrimitiveType::Byte,
        TokenKind::Char => PrimitiveType::Char,
        TokenKind::Decimal => PrimitiveType::Decimal,
        TokenKind::Double => PrimitiveType::Double,
        TokenKind::Float => PrimitiveType::Float,
        TokenKind::Int => PrimitiveType::Int,
        TokenKind::Long => PrimitiveType::Long,
        TokenKind::Object => PrimitiveType::Object,
        TokenKind::Sbyte => PrimitiveType::Sbyte,
        TokenKind::Short => PrimitiveType::Short,
        TokenKind::String => PrimitiveType::String,
        TokenKind::Uint => PrimitiveType::Uint,
        TokenKind::Ulong => PrimitiveType::Ulong,
        TokenKind::Ushort => PrimitiveType::Ushort,
        TokenKind::Void => PrimitiveType::Void,
        _ => return None,
    };
    Some(prim)
}

pub trait TypeParsing<'a> {
    /// `Type = TypeName '?'? '*'* ('[' ','* ']')?`
    fn parse_type(&mut self) -> &'a TypeRef<'a>;

    /// `TypeName = (IDENT '::')? IDENT TypeArgsOpt ('.' IDENT TypeArgsOpt)*`
    /// or a primitive type keyword.
    fn parse_type_name(&mut self) -> &'a TypeRef<'a>;

    /// Skip a balanced `< ... >` run, counting `>>` as two closers.
    fn skip_angle_brackets(&mut self);

    /// Whether the current token could begin a type.
    fn at_type_start(&mut self) -> bool;
}

impl<'a, 'c> TypeParsing<'a> for Parser<'a, 'c> {
    fn parse_type(&mut self) -> &'a TypeRef<'a> {
        let mut ty = self.parse_type_name();
        if self.kind(0) == TokenKind::Question {
            self.bump();
            ty = self.ctx.alloc_type_ref(TypeRef::nullable(ty));
        }
        while self.kind(0) == TokenKind::Star {
            self.bump();
            ty = self.ctx.alloc_type_ref(TypeRef::pointer(ty));
        }
        if self.kind(0) == TokenKind::LeftBracket {
            self.bump();
            let mut rank: u8 = 1;
            while self.kind(0) == TokenKind::Comma {
                self.bump();
                rank = rank.saturating_add(1);
            }
            if self.kind(0) == TokenKind::RightBracket {
                self.bump();
            } else {
                self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, "]"));
            }
            ty = self.ctx.alloc_type_ref(TypeRef::array(ty, rank));
        }
        ty
    }

    fn parse_type_name(&mut self) -> &'a TypeRef<'a> {
        if let Some(prim) = primitive_for(self.kind(0)) {
            self.bump();
            return self.ctx.alloc_type_ref(TypeRef::Primitive(prim));
        }

        let scope = if self.kind(0) == TokenKind::Identifier
            && self.kind(1) == TokenKind::DoubleColon
        {
            let alias = self.expect_identifier();
            self.bump(); // '::'
            Some(alias.name)
        } else {
            None
        };

        let first = self.expect_identifier();
        let first = Identifier {
            name: first.name,
            scope,
            span: first.span,
        };
        let mut ty = self.ctx.alloc_type_ref(TypeRef::Unresolved { name: first });
        if self.kind(0) == TokenKind::LessThan {
            self.skip_angle_brackets();
        }
        while self.kind(0) == TokenKind::Period && self.kind(1) == TokenKind::Identifier {
            self.bump();
            let name = self.expect_identifier();
            ty = self
                .ctx
                .alloc_type_ref(TypeRef::UnresolvedNested { outer: ty, name });
            if self.kind(0) == TokenKind::LessThan {
                self.skip_angle_brackets();
            }
        }
        ty
    }

    fn skip_angle_brackets(&mut self) {
        debug_assert_eq!(self.kind(0), TokenKind::LessThan);
        self.bump();
        let mut depth: i32 = 1;
        loop {
            match self.kind(0) {
                TokenKind::LessThan => {
                    self.bump();
                    depth += 1;
                }
                TokenKind::GreaterThan => {
                    self.bump();
                    depth -= 1;
                    if depth <= 0 {
                        return;
                    }
                }
                TokenKind::ShiftRight => {
                    self.bump();
                    depth -= 2;
                    if depth <= 0 {
                        return;
                    }
                }
                TokenKind::Semicolon
                | TokenKind::LeftBrace
                | TokenKind::RightBrace
                | TokenKind::Eof
                | TokenKind::Eod => {
                    self.error_here(Diagnostic::with_arg(DiagnosticKind::ExpectedCharacter, ">"));
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn at_type_start(&mut self) -> bool {
        let kind = self.kind(0);
        kind == TokenKind::Identifier || primitive_for(kind).is_some()
    }
}
