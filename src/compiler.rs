//! The compiler shell: diagnostic sink, option scopes, and string table.
//!
//! Scanner and parser instances borrow one `Compiler` and append
//! diagnostics to it; the caller reads the message collection afterwards.

use crate::arena_ctx::AstContext;
use crate::ast::SourceFile;
use crate::diagnostic::{Diagnostic, OutputMessage, OutputMessageCollection, Severity};
use crate::intern::{Interner, Symbol};
use crate::options::{CompilerOptions, OptionStack};
use crate::parser::Parser;
use crate::position::Position;
use crate::source::{SourceLoader, SourceText};

pub struct Compiler {
    messages: OutputMessageCollection,
    options: OptionStack,
    interner: Interner,
}

impl Compiler {
    pub fn new(base_options: CompilerOptions) -> Self {
        Compiler {
            messages: OutputMessageCollection::new(),
            options: OptionStack::new(base_options),
            interner: Interner::new(),
        }
    }

    pub fn messages(&self) -> &OutputMessageCollection {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.has_errors()
    }

    pub fn options(&self) -> &OptionStack {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptionStack {
        &mut self.options
    }

    /// Enter a nested option scope with inherited values.
    pub fn push_options(&mut self) {
        self.options.push();
    }

    pub fn pop_options(&mut self) {
        self.options.pop();
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        self.interner.intern(text)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Emit a diagnostic at a position, honoring the current warning gate.
    /// Warnings promote to errors under treat-warnings-as-errors.
    pub fn report(&mut self, source: Symbol, position: Position, diag: Diagnostic) {
        let kind = diag.kind;
        if !self.options.should_show(kind) {
            return;
        }
        let mut severity = kind.severity();
        if severity == Severity::Warning && self.options.warnings_as_errors() {
            severity = Severity::Error;
        }
        let message = diag.format_message();
        let source_name = self.interner.resolve(source).to_string();
        self.messages.add(OutputMessage::new(
            severity,
            kind.code(),
            source_name,
            position,
            message,
        ));
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(CompilerOptions::new())
    }
}

/// Parse a single in-memory buffer into a [`SourceFile`].
pub fn parse_source<'a>(
    compiler: &mut Compiler,
    ctx: AstContext<'a>,
    name: &str,
    text: &str,
) -> Option<&'a SourceFile<'a>> {
    let sources = vec![SourceText::with_text(name, text)];
    let mut parser = Parser::new(compiler, sources, ctx);
    parser.parse_one()
}

/// Parse a sequence of buffers into one `SourceFile` each.
pub fn parse_sources<'a>(
    compiler: &mut Compiler,
    ctx: AstContext<'a>,
    sources: Vec<SourceText>,
) -> Vec<&'a SourceFile<'a>> {
    let mut parser = Parser::new(compiler, sources, ctx);
    parser.parse_program()
}

/// Parse files by name using a custom loader.
pub fn parse_with_loader<'a>(
    compiler: &mut Compiler,
    ctx: AstContext<'a>,
    sources: Vec<SourceText>,
    loader: Box<dyn SourceLoader>,
) -> Vec<&'a SourceFile<'a>> {
    let mut parser = Parser::with_loader(compiler, sources, ctx, loader);
    parser.parse_program()
}
