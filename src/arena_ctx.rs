//! Allocation context for AST construction.
//!
//! The parser threads one `AstContext` through every production. It is a
//! bundle of shared references to typed arenas, so it is `Copy` and cheap
//! to pass by value. All nodes for one compile share the arenas and die
//! together when the caller drops them.

use crate::arena::Arena;
use crate::ast::types::TypeRef;
use crate::ast::{
    Attribute, Expr, Identifier, Member, Namespace, SourceFile, TypeDeclaration, UsingNode,
};
use crate::intern::Symbol;
use crate::token::TokenKind;

#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    pub files: &'a Arena<SourceFile<'a>>,
    pub namespaces: &'a Arena<Namespace<'a>>,
    pub types: &'a Arena<TypeDeclaration<'a>>,
    pub members: &'a Arena<Member<'a>>,
    pub attributes: &'a Arena<Attribute<'a>>,
    pub usings: &'a Arena<UsingNode<'a>>,
    pub type_refs: &'a Arena<TypeRef<'a>>,
    pub exprs: &'a Arena<Expr<'a>>,
    pub idents: &'a Arena<Identifier>,
    pub syms: &'a Arena<Symbol>,
    pub kinds: &'a Arena<TokenKind>,
}

impl<'a> AstContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: &'a Arena<SourceFile<'a>>,
        namespaces: &'a Arena<Namespace<'a>>,
        types: &'a Arena<TypeDeclaration<'a>>,
        members: &'a Arena<Member<'a>>,
        attributes: &'a Arena<Attribute<'a>>,
        usings: &'a Arena<UsingNode<'a>>,
        type_refs: &'a Arena<TypeRef<'a>>,
        exprs: &'a Arena<Expr<'a>>,
        idents: &'a Arena<Identifier>,
        syms: &'a Arena<Symbol>,
        kinds: &'a Arena<TokenKind>,
    ) -> Self {
        AstContext {
            files,
            namespaces,
            types,
            members,
            attributes,
            usings,
            type_refs,
            exprs,
            idents,
            syms,
            kinds,
        }
    }

    pub fn alloc_file(&self, file: SourceFile<'a>) -> &'a SourceFile<'a> {
        self.files.alloc(file)
    }

    pub fn alloc_namespace(&self, ns: Namespace<'a>) -> &'a Namespace<'a> {
        self.namespaces.alloc(ns)
    }

    pub fn alloc_namespaces(&self, list: Vec<Namespace<'a>>) -> &'a [Namespace<'a>] {
        self.namespaces.alloc_slice(list)
    }

    pub fn alloc_types(&self, list: Vec<TypeDeclaration<'a>>) -> &'a [TypeDeclaration<'a>] {
        self.types.alloc_slice(list)
    }

    pub fn alloc_members(&self, list: Vec<Member<'a>>) -> &'a [Member<'a>] {
        self.members.alloc_slice(list)
    }

    pub fn alloc_attributes(&self, list: Vec<Attribute<'a>>) -> &'a [Attribute<'a>] {
        self.attributes.alloc_slice(list)
    }

    pub fn alloc_usings(&self, list: Vec<UsingNode<'a>>) -> &'a [UsingNode<'a>] {
        self.usings.alloc_slice(list)
    }

    pub fn alloc_type_ref(&self, ty: TypeRef<'a>) -> &'a TypeRef<'a> {
        self.type_refs.alloc(ty)
    }

    pub fn alloc_type_refs(&self, list: Vec<TypeRef<'a>>) -> &'a [TypeRef<'a>] {
        self.type_refs.alloc_slice(list)
    }

    pub fn alloc_expr(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.exprs.alloc(expr)
    }

    pub fn alloc_exprs(&self, list: Vec<Expr<'a>>) -> &'a [Expr<'a>] {
        self.exprs.alloc_slice(list)
    }

    pub fn alloc_idents(&self, list: Vec<Identifier>) -> &'a [Identifier] {
        self.idents.alloc_slice(list)
    }

    pub fn alloc_syms(&self, list: Vec<Symbol>) -> &'a [Symbol] {
        self.syms.alloc_slice(list)
    }

    pub fn alloc_kinds(&self, list: Vec<TokenKind>) -> &'a [TokenKind] {
        self.kinds.alloc_slice(list)
    }
}

/// Owner of the full arena set. Constructing one per compile and calling
/// [`context`](AstArenas::context) is the usual entry point; the arenas
/// must outlive every node reference handed out.
#[derive(Default)]
pub struct AstArenas<'a> {
    pub files: Arena<SourceFile<'a>>,
    pub namespaces: Arena<Namespace<'a>>,
    pub types: Arena<TypeDeclaration<'a>>,
    pub members: Arena<Member<'a>>,
    pub attributes: Arena<Attribute<'a>>,
    pub usings: Arena<UsingNode<'a>>,
    pub type_refs: Arena<TypeRef<'a>>,
    pub exprs: Arena<Expr<'a>>,
    pub idents: Arena<Identifier>,
    pub syms: Arena<Symbol>,
    pub kinds: Arena<TokenKind>,
}

impl<'a> AstArenas<'a> {
    pub fn new() -> Self {
        AstArenas::default()
    }

    pub fn context(&'a self) -> AstContext<'a> {
        AstContext::new(
            &self.files,
            &self.namespaces,
            &self.types,
            &self.members,
            &self.attributes,
            &self.usings,
            &self.type_refs,
            &self.exprs,
            &self.idents,
            &self.syms,
            &self.kinds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::PrimitiveType;

    #[test]
    fn context_allocates_into_arenas() {
        let arenas = AstArenas::new();
        let ctx = arenas.context();
        let int = ctx.alloc_type_ref(TypeRef::Primitive(PrimitiveType::Int));
        assert!(matches!(
            int,
            TypeRef::Primitive(PrimitiveType::Int)
        ));
        let kinds = ctx.alloc_kinds(vec![TokenKind::Public, TokenKind::Static]);
        assert_eq!(kinds, &[TokenKind::Public, TokenKind::Static]);
    }
}
