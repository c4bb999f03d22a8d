//! Type references as they appear in source, before any resolution.

use crate::ast::Identifier;
use crate::intern::Interner;

/// The built-in value and reference types the language names directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Byte,
    Char,
    Decimal,
    Double,
    Float,
    Int,
    Long,
    Object,
    Sbyte,
    Short,
    String,
    Uint,
    Ulong,
    Ushort,
    Void,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::Double => "double",
            PrimitiveType::Float => "float",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Object => "object",
            PrimitiveType::Sbyte => "sbyte",
            PrimitiveType::Short => "short",
            PrimitiveType::String => "string",
            PrimitiveType::Uint => "uint",
            PrimitiveType::Ulong => "ulong",
            PrimitiveType::Ushort => "ushort",
            PrimitiveType::Void => "void",
        }
    }
}

/// A syntactic type reference. Resolution happens downstream; the parser
/// only records shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef<'a> {
    /// A bare (possibly alias-qualified) name.
    Unresolved { name: Identifier },
    /// `Outer.Inner` — a member type of another unresolved type.
    UnresolvedNested {
        outer: &'a TypeRef<'a>,
        name: Identifier,
    },
    /// `T[]`, `T[,]`, ... — rank is the comma count plus one.
    Array { element: &'a TypeRef<'a>, rank: u8 },
    /// `T*`.
    Pointer { element: &'a TypeRef<'a> },
    /// `ref T` / `out T` at a parameter position.
    Reference { element: &'a TypeRef<'a> },
    /// `T?`.
    Nullable { element: &'a TypeRef<'a> },
    Primitive(PrimitiveType),
}

impl<'a> TypeRef<'a> {
    /// An array may not be formed over a by-reference type.
    pub fn array(element: &'a TypeRef<'a>, rank: u8) -> TypeRef<'a> {
        assert!(rank >= 1, "array rank must be at least 1");
        assert!(
            !matches!(element, TypeRef::Reference { .. }),
            "cannot form an array over a by-reference type"
        );
        TypeRef::Array { element, rank }
    }

    /// A pointer may not point at a by-reference type.
    pub fn pointer(element: &'a TypeRef<'a>) -> TypeRef<'a> {
        assert!(
            !matches!(element, TypeRef::Reference { .. }),
            "cannot form a pointer over a by-reference type"
        );
        TypeRef::Pointer { element }
    }

    /// Nullable may wrap neither a by-reference type nor another nullable.
    pub fn nullable(element: &'a TypeRef<'a>) -> TypeRef<'a> {
        assert!(
            !matches!(element, TypeRef::Reference { .. }),
            "cannot form a nullable over a by-reference type"
        );
        assert!(
            !matches!(element, TypeRef::Nullable { .. }),
            "cannot nest nullable types"
        );
        TypeRef::Nullable { element }
    }

    pub fn reference(element: &'a TypeRef<'a>) -> TypeRef<'a> {
        TypeRef::Reference { element }
    }

    /// Language-level rendition for diagnostics: `int[,]`, `byte*`,
    /// `char&`, `long?`.
    pub fn display_name(&self, interner: &Interner) -> String {
        match self {
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::Unresolved { name } => name.display(interner),
            TypeRef::UnresolvedNested { outer, name } => {
                format!("{}.{}", outer.display_name(interner), name.display(interner))
            }
            TypeRef::Array { element, rank } => {
                let commas: String = std::iter::repeat(',').take(*rank as usize - 1).collect();
                format!("{}[{}]", element.display_name(interner), commas)
            }
            TypeRef::Pointer { element } => format!("{}*", element.display_name(interner)),
            TypeRef::Reference { element } => format!("{}&", element.display_name(interner)),
            TypeRef::Nullable { element } => format!("{}?", element.display_name(interner)),
        }
    }
}
