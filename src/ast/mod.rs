//! Abstract syntax tree for the declaration grammar.
//!
//! Nodes are arena-allocated (see [`crate::arena_ctx`]); parents hold
//! shared references and sealed slices, so sibling order is the slice
//! order and the tree is acyclic by construction. Every node records the
//! buffer it came from and its source span.

pub mod types;

use self::types::TypeRef;
use crate::intern::{Interner, Symbol};
use crate::position::Span;
use crate::token::{TokenKind, TokenValue};

/// A (possibly dotted, possibly alias-qualified) name. Compound names such
/// as `System.Collections` are interned whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub name: Symbol,
    /// `alias::Name` qualifier, when present.
    pub scope: Option<Symbol>,
    pub span: Span,
}

impl Identifier {
    pub fn display(&self, interner: &Interner) -> String {
        match self.scope {
            Some(scope) => format!(
                "{}::{}",
                interner.resolve(scope),
                interner.resolve(self.name)
            ),
            None => interner.resolve(self.name).to_string(),
        }
    }
}

/// One parsed compilation unit. The root namespace always has `name: None`.
#[derive(Debug)]
pub struct SourceFile<'a> {
    pub source: Symbol,
    pub span: Span,
    pub root: &'a Namespace<'a>,
}

#[derive(Debug)]
pub struct Namespace<'a> {
    pub source: Symbol,
    pub span: Span,
    /// `None` for the file-level root namespace.
    pub name: Option<Identifier>,
    pub extern_aliases: &'a [Symbol],
    pub usings: &'a [UsingNode<'a>],
    pub namespaces: &'a [Namespace<'a>],
    pub types: &'a [TypeDeclaration<'a>],
    /// `[assembly: ...]` sections.
    pub global_attributes: &'a [Attribute<'a>],
}

#[derive(Debug, Clone)]
pub enum UsingNode<'a> {
    /// `using Some.Namespace;`
    Namespace {
        source: Symbol,
        span: Span,
        name: Identifier,
    },
    /// `using Alias = Some.Type;`
    Alias {
        source: Symbol,
        span: Span,
        alias: Identifier,
        target: &'a TypeRef<'a>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

#[derive(Debug)]
pub struct TypeDeclaration<'a> {
    pub source: Symbol,
    pub span: Span,
    pub name: Identifier,
    pub kind: TypeKind,
    pub modifiers: &'a [TokenKind],
    pub attributes: &'a [Attribute<'a>],
    pub bases: &'a [TypeRef<'a>],
    pub events: &'a [Member<'a>],
    pub fields: &'a [Member<'a>],
    pub methods: &'a [Member<'a>],
    pub properties: &'a [Member<'a>],
    pub nested_types: &'a [TypeDeclaration<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
    Destructor,
    Property,
    Indexer,
    Event,
    /// An enumerator inside an `enum` body; kept in `fields`.
    EnumMember,
}

/// A member signature. Bodies, initializers, and parameter lists are
/// syntax-checked and skipped; only the shape survives.
#[derive(Debug, Clone)]
pub struct Member<'a> {
    pub source: Symbol,
    pub span: Span,
    pub kind: MemberKind,
    pub name: Identifier,
    /// Declared type: field/property/event type or method return type.
    /// Absent for constructors, destructors, and enum members.
    pub declared_type: Option<&'a TypeRef<'a>>,
    pub modifiers: &'a [TokenKind],
    pub attributes: &'a [Attribute<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrTarget {
    Assembly,
    Event,
    Field,
    Method,
    Param,
    Property,
    Return,
    Type,
    TypeVar,
}

impl AttrTarget {
    /// Recognize a target word. `event` and `return` arrive as keyword
    /// tokens; the rest are plain identifiers.
    pub fn from_text(text: &str) -> Option<AttrTarget> {
        let target = match text {
            "assembly" => AttrTarget::Assembly,
            "event" => AttrTarget::Event,
            "field" => AttrTarget::Field,
            "method" => AttrTarget::Method,
            "param" => AttrTarget::Param,
            "property" => AttrTarget::Property,
            "return" => AttrTarget::Return,
            "type" => AttrTarget::Type,
            "typevar" => AttrTarget::TypeVar,
            _ => return None,
        };
        Some(target)
    }

    pub fn text(self) -> &'static str {
        match self {
            AttrTarget::Assembly => "assembly",
            AttrTarget::Event => "event",
            AttrTarget::Field => "field",
            AttrTarget::Method => "method",
            AttrTarget::Param => "param",
            AttrTarget::Property => "property",
            AttrTarget::Return => "return",
            AttrTarget::Type => "type",
            AttrTarget::TypeVar => "typevar",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    pub source: Symbol,
    pub span: Span,
    pub target: Option<AttrTarget>,
    pub ty: &'a TypeRef<'a>,
    pub positional_args: &'a [Expr<'a>],
    pub named_arg_names: &'a [Identifier],
    pub named_arg_values: &'a [Expr<'a>],
}

/// Constant-expression subset backing attribute arguments.
#[derive(Debug, Clone)]
pub enum Expr<'a> {
    Literal { value: TokenValue, span: Span },
    Name { name: Identifier },
    Unary {
        op: TokenKind,
        operand: &'a Expr<'a>,
        span: Span,
    },
    /// Placeholder produced during error recovery.
    Error { span: Span },
}

impl<'a> Expr<'a> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. } => *span,
            Expr::Name { name } => name.span,
            Expr::Unary { span, .. } => *span,
            Expr::Error { span } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_display_includes_scope() {
        let mut interner = Interner::new();
        let alias = interner.intern("global");
        let name = interner.intern("System.IO");
        let plain = Identifier {
            name,
            scope: None,
            span: Span::default(),
        };
        let scoped = Identifier {
            name,
            scope: Some(alias),
            span: Span::default(),
        };
        assert_eq!(plain.display(&interner), "System.IO");
        assert_eq!(scoped.display(&interner), "global::System.IO");
    }

    #[test]
    fn attr_target_words_round_trip() {
        for word in [
            "assembly", "event", "field", "method", "param", "property", "return", "type",
            "typevar",
        ] {
            let target = AttrTarget::from_text(word).unwrap();
            assert_eq!(target.text(), word);
        }
        assert_eq!(AttrTarget::from_text("module"), None);
    }
}
