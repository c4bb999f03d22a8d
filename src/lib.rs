//! Front-end for the SharpScript dialect of C#.
//!
//! Three tightly coupled subsystems make up the core:
//!
//! - a [`source::SourceReader`] that streams characters out of named
//!   buffers with line/column tracking and newline folding;
//! - a [`scanner::Scanner`] with an embedded preprocessor that turns text
//!   into [`token::Token`]s while evaluating `#if` conditions, tracking
//!   `#region` nesting, applying `#pragma warning` gates, and carrying
//!   `#line` remaps;
//! - a recursive-descent [`parser::Parser`] that builds the declaration
//!   AST with local error recovery.
//!
//! All three report through a shared [`compiler::Compiler`], which owns
//! the diagnostic sink, the option scope stack, and the string table.
//!
//! ```
//! use sharpscript::arena_ctx::AstArenas;
//! use sharpscript::compiler::{parse_source, Compiler};
//!
//! let mut compiler = Compiler::default();
//! let arenas = AstArenas::new();
//! let file = parse_source(
//!     &mut compiler,
//!     arenas.context(),
//!     "hello.cs",
//!     "class Hello { }",
//! )
//! .unwrap();
//! assert_eq!(file.root.types.len(), 1);
//! assert!(!compiler.has_errors());
//! ```

pub mod arena;
pub mod arena_ctx;
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compiler;
pub mod diagnostic;
pub mod intern;
pub mod options;
pub mod parser;
pub mod position;
pub mod ppexpr;
pub mod scanner;
pub mod source;
pub mod style;
pub mod token;

pub use compiler::{parse_source, parse_sources, parse_with_loader, Compiler};
pub use options::CompilerOptions;
pub use parser::Parser;
pub use scanner::Scanner;
