//! Shared harness for the integration suites.
#![allow(dead_code)]

use sharpscript::compiler::Compiler;
use sharpscript::options::CompilerOptions;
use sharpscript::scanner::Scanner;
use sharpscript::source::SourceText;
use sharpscript::token::{Token, TokenKind};

/// Scan a single named buffer to exhaustion, returning every token
/// including the `Eof`/`Eod` markers.
pub fn scan_buffer(name: &str, text: &str) -> (Vec<Token>, Compiler) {
    scan_buffers(vec![SourceText::with_text(name, text)], CompilerOptions::new())
}

pub fn scan_buffers(sources: Vec<SourceText>, options: CompilerOptions) -> (Vec<Token>, Compiler) {
    let mut compiler = Compiler::new(options);
    let mut scanner = Scanner::new(&mut compiler, sources);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let kind = token.kind;
        tokens.push(token);
        if kind == TokenKind::Eod {
            break;
        }
    }
    drop(scanner);
    (tokens, compiler)
}

/// Tokens the parser would consume: everything except buffer markers.
pub fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Eod))
        .collect()
}

pub fn diagnostic_codes(compiler: &Compiler) -> Vec<u16> {
    compiler.messages().iter().map(|m| m.code).collect()
}
