//! Token-stream behavior through the public API.

mod common;

use common::{diagnostic_codes, scan_buffer, scan_buffers, significant};
use pretty_assertions::assert_eq;
use sharpscript::options::CompilerOptions;
use sharpscript::position::Position;
use sharpscript::source::SourceText;
use sharpscript::token::{TokenKind, TokenValue};

#[test]
fn token_spans_are_ordered_and_inclusive() {
    let (tokens, _) = scan_buffer("spans.cs", "class Foo {\n    int bar;\n}\n");
    for token in significant(&tokens) {
        assert!(
            token.start <= token.end,
            "token {:?} has inverted span",
            token.kind
        );
        assert!(token.start.line >= 1 && token.start.column >= 1);
    }
}

#[test]
fn every_token_names_its_buffer() {
    let sources = vec![
        SourceText::with_text("first.cs", "int a;"),
        SourceText::with_text("second.cs", "long b;"),
    ];
    let (tokens, compiler) = scan_buffers(sources, CompilerOptions::new());
    let mut seen_second = false;
    for token in significant(&tokens) {
        let name = compiler.resolve(token.source);
        if name == "second.cs" {
            seen_second = true;
        }
        assert!(name == "first.cs" || name == "second.cs");
    }
    assert!(seen_second);
}

#[test]
fn scanning_is_deterministic_across_runs() {
    let text = "#define A\n#if A\nclass C { double d = .5e-2; }\n#endif\n";
    let (first, _) = scan_buffer("same.cs", text);
    let (second, _) = scan_buffer("same.cs", text);
    assert_eq!(first, second);
}

#[test]
fn whitespace_only_buffers_produce_markers_only() {
    let sources = vec![
        SourceText::with_text("empty1.cs", "   \t\n// just a comment\n"),
        SourceText::with_text("empty2.cs", "/* block */"),
    ];
    let (tokens, compiler) = scan_buffers(sources, CompilerOptions::new());
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Eof, TokenKind::Eof, TokenKind::Eod]
    );
    assert!(compiler.messages().is_empty());
}

#[test]
fn line_ending_folding_is_uniform() {
    for text in ["a\r\nb\r\nc", "a\rb\rc", "a\nb\nc"] {
        let (tokens, _) = scan_buffer("eol.cs", text);
        let rows: Vec<u32> = significant(&tokens).iter().map(|t| t.start.line).collect();
        assert_eq!(rows, vec![1, 2, 3], "input {text:?}");
    }
}

#[test]
fn embedded_nul_is_treated_as_space() {
    let (tokens, compiler) = scan_buffer("nul.cs", "int\0x;");
    let kinds: Vec<TokenKind> = significant(&tokens).iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Semicolon]
    );
    assert!(compiler.messages().is_empty());
}

#[test]
fn smallest_integer_type_selection() {
    let (tokens, _) = scan_buffer(
        "ints.cs",
        "127 2147483647 2147483648 4294967295 4294967296 9223372036854775807 9223372036854775808 18446744073709551615",
    );
    let values: Vec<&TokenValue> = significant(&tokens).iter().map(|t| &t.value).collect();
    assert_eq!(values[0], &TokenValue::Int32(127));
    assert_eq!(values[1], &TokenValue::Int32(i32::MAX));
    assert_eq!(values[2], &TokenValue::UInt32(1 << 31));
    assert_eq!(values[3], &TokenValue::UInt32(u32::MAX));
    assert_eq!(values[4], &TokenValue::Int64(1 << 32));
    assert_eq!(values[5], &TokenValue::Int64(i64::MAX));
    assert_eq!(values[6], &TokenValue::UInt64(1 << 63));
    assert_eq!(values[7], &TokenValue::UInt64(u64::MAX));
}

#[test]
fn decimal_overflow_past_ulong_reports_1021() {
    let (_, compiler) = scan_buffer("big.cs", "18446744073709551616");
    assert_eq!(diagnostic_codes(&compiler), vec![1021]);
}

#[test]
fn lowercase_suffix_warning_position_matches_suffix() {
    let (tokens, compiler) = scan_buffer("l.cs", "1l");
    let real = significant(&tokens);
    assert_eq!(real.len(), 1);
    assert_eq!(real[0].value, TokenValue::Int64(1));
    let msg = compiler.messages().iter().next().expect("warning 78");
    assert_eq!(msg.code, 78);
    assert_eq!((msg.line, msg.column), (1, 2));
}

#[test]
fn verbatim_and_escape_interplay() {
    let (tokens, compiler) = scan_buffer(
        "strings.cs",
        "@\"C:\\temp\" \"C:\\\\temp\" @\"say \"\"hi\"\"\"",
    );
    let values: Vec<&TokenValue> = significant(&tokens).iter().map(|t| &t.value).collect();
    assert_eq!(values[0], &TokenValue::Str("C:\\temp".into()));
    assert_eq!(values[1], &TokenValue::Str("C:\\temp".into()));
    assert_eq!(values[2], &TokenValue::Str("say \"hi\"".into()));
    assert!(compiler.messages().is_empty());
}

#[test]
fn push_back_round_trip() {
    use sharpscript::compiler::Compiler;
    use sharpscript::scanner::Scanner;

    let mut compiler = Compiler::default();
    let mut scanner = Scanner::new(
        &mut compiler,
        vec![SourceText::with_text("pb.cs", "alpha beta")],
    );
    let token = scanner.next_token();
    scanner.push_back(token.clone());
    assert_eq!(scanner.next_token(), token);
}

#[test]
fn unexpected_character_renders_hex_for_control() {
    let (_, compiler) = scan_buffer("ctl.cs", "\u{1}");
    let msg = compiler.messages().iter().next().expect("1056");
    assert_eq!(msg.code, 1056);
    assert!(msg.message.contains("0x01"), "{}", msg.message);
}

#[test]
fn diagnostic_display_format_is_canonical() {
    let (_, compiler) = scan_buffer("fmt.cs", "1l");
    let rendered = compiler.messages().iter().next().unwrap().to_string();
    assert!(
        rendered.starts_with("fmt.cs(1,2): warning CS0078: "),
        "{rendered}"
    );
}

#[test]
fn eof_position_is_within_buffer() {
    let (tokens, _) = scan_buffer("eof.cs", "x");
    let eof = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Eof)
        .expect("eof marker");
    assert_eq!(eof.start, eof.end);
    assert!(eof.start >= Position::new(1, 1));
}
