//! Preprocessor behavior: conditionals, pragmas, regions, line maps.

mod common;

use common::{diagnostic_codes, scan_buffer, scan_buffers, significant};
use pretty_assertions::assert_eq;
use sharpscript::options::CompilerOptions;
use sharpscript::source::SourceText;
use sharpscript::token::{LineMap, TokenKind, TokenValue};

fn literal_values(text: &str) -> Vec<TokenValue> {
    let (tokens, _) = scan_buffer("pp.cs", text);
    tokens
        .into_iter()
        .filter(|t| t.kind == TokenKind::Literal)
        .map(|t| t.value)
        .collect()
}

#[test]
fn if_elif_else_chain_takes_one_branch() {
    let text = "#define YES\n#if YES && NO\n1\n#elif NO || YES\n2\n#else\n3\n#endif";
    assert_eq!(literal_values(text), vec![TokenValue::Int32(2)]);
}

#[test]
fn else_branch_taken_when_all_conditions_fail() {
    let text = "#if NO\n1\n#elif ALSO_NO\n2\n#else\n3\n#endif";
    assert_eq!(literal_values(text), vec![TokenValue::Int32(3)]);
}

#[test]
fn nested_conditionals_inside_inactive_block() {
    let text = "#if OUTER\n#if true\nnever\n#endif\n#else\n42\n#endif";
    assert_eq!(literal_values(text), vec![TokenValue::Int32(42)]);
}

#[test]
fn define_then_undef_within_buffer() {
    let text = "#define FLAG\n#undef FLAG\n#if FLAG\n1\n#else\n2\n#endif";
    assert_eq!(literal_values(text), vec![TokenValue::Int32(2)]);
}

#[test]
fn equality_operators_in_conditions() {
    let text = "#define A\n#if A == true\n1\n#endif\n#if A != B\n2\n#endif";
    assert_eq!(
        literal_values(text),
        vec![TokenValue::Int32(1), TokenValue::Int32(2)]
    );
}

#[test]
fn invalid_condition_reports_and_skips() {
    let (tokens, compiler) = scan_buffer("bad.cs", "#if a a a\nnever\n#endif\n");
    assert!(significant(&tokens).is_empty());
    let codes = diagnostic_codes(&compiler);
    assert_eq!(codes[0], 1517);
    let msg = compiler.messages().iter().next().unwrap();
    assert_eq!((msg.line, msg.column), (1, 1));
}

#[test]
fn unterminated_if_reports_1027_once() {
    let (_, compiler) = scan_buffer("open.cs", "#if true\n1\n");
    let codes = diagnostic_codes(&compiler);
    assert_eq!(codes.iter().filter(|&&c| c == 1027).count(), 1);
}

#[test]
fn base_defines_reach_every_buffer() {
    let mut options = CompilerOptions::new();
    options.define("GLOBAL");
    let sources = vec![
        SourceText::with_text("a.cs", "#if GLOBAL\n1\n#endif"),
        SourceText::with_text("b.cs", "#if GLOBAL\n2\n#endif"),
    ];
    let (tokens, _) = scan_buffers(sources, options);
    let values: Vec<&TokenValue> = significant(&tokens).iter().map(|t| &t.value).collect();
    assert_eq!(values, vec![&TokenValue::Int32(1), &TokenValue::Int32(2)]);
}

#[test]
fn file_local_defines_die_with_their_buffer() {
    let sources = vec![
        SourceText::with_text("a.cs", "#define LOCAL\n"),
        SourceText::with_text("b.cs", "#if LOCAL\n1\n#else\n2\n#endif"),
    ];
    let (tokens, _) = scan_buffers(sources, CompilerOptions::new());
    let values: Vec<&TokenValue> = significant(&tokens).iter().map(|t| &t.value).collect();
    assert_eq!(values, vec![&TokenValue::Int32(2)]);
}

#[test]
fn pragma_gate_applies_immediately() {
    let text = "1l\n#pragma warning disable 78\n2l\n#pragma warning restore 78\n3l";
    let (_, compiler) = scan_buffer("gate.cs", text);
    let lines: Vec<u32> = compiler.messages().iter().map(|m| m.line).collect();
    // Lines 1 and 5 warn; line 3 is gated.
    assert_eq!(lines, vec![1, 5]);
}

#[test]
fn pragma_scope_resets_between_buffers() {
    let sources = vec![
        SourceText::with_text("a.cs", "#pragma warning disable 78\n1l"),
        SourceText::with_text("b.cs", "2l"),
    ];
    let (_, compiler) = scan_buffers(sources, CompilerOptions::new());
    let names: Vec<&str> = compiler
        .messages()
        .iter()
        .map(|m| m.source.as_str())
        .collect();
    assert_eq!(names, vec!["b.cs"]);
}

#[test]
fn invalid_warning_number_reports_1691() {
    let (_, compiler) = scan_buffer("w.cs", "#pragma warning disable 1002\n");
    // 1002 is an error code, not a warning.
    assert_eq!(diagnostic_codes(&compiler), vec![1691]);
}

#[test]
fn regions_nest_and_must_close() {
    let clean = "#region outer\n#region inner\nint x;\n#endregion\n#endregion\n";
    let (_, compiler) = scan_buffer("r.cs", clean);
    assert!(compiler.messages().is_empty());

    let (_, compiler) = scan_buffer("r2.cs", "#region open\nint x;\n");
    assert_eq!(diagnostic_codes(&compiler), vec![1038]);
}

#[test]
fn line_hidden_marks_following_tokens() {
    let (tokens, _) = scan_buffer("h.cs", "#line hidden\nvoid");
    let real = significant(&tokens);
    assert_eq!(real[0].kind, TokenKind::Void);
    assert_eq!(real[0].line_map, LineMap::Hidden);
}

#[test]
fn line_remap_carries_file_override() {
    let (tokens, compiler) = scan_buffer("m.cs", "#line 77 \"machine.cs\"\nint x;");
    let real = significant(&tokens);
    for token in &real {
        assert_eq!(token.line_map, LineMap::Remapped(77));
        assert_eq!(
            compiler.resolve(token.source_map.expect("override")),
            "machine.cs"
        );
    }
}

#[test]
fn user_error_sets_has_errors() {
    let (_, compiler) = scan_buffer("ue.cs", "#error nothing works\n");
    assert!(compiler.has_errors());
    let msg = compiler.messages().iter().next().unwrap();
    assert_eq!(msg.code, 1029);
    assert!(msg.message.contains("nothing works"));
}

#[test]
fn user_warning_respects_warning_level() {
    let mut options = CompilerOptions::new();
    options.warning_level = 0;
    let (_, compiler) = scan_buffers(
        vec![SourceText::with_text("uw.cs", "#warning quiet\n")],
        options,
    );
    assert!(compiler.messages().is_empty());
}

#[test]
fn warnings_promote_with_warnaserror() {
    let mut options = CompilerOptions::new();
    options.warnings_as_errors = true;
    let (_, compiler) = scan_buffers(vec![SourceText::with_text("p.cs", "1l")], options);
    assert!(compiler.has_errors());
}

#[test]
fn too_late_define_after_real_token() {
    let (_, compiler) = scan_buffer("late.cs", "int x;\n#define D\n");
    assert_eq!(diagnostic_codes(&compiler), vec![1032]);
}

#[test]
fn skipped_blocks_tolerate_unlexable_content() {
    // The skipped branch contains an unterminated string and a bad escape;
    // neither may produce diagnostics.
    let text = "#if false\n\"never closed\n'\\q\n#endif\n1";
    let (tokens, compiler) = scan_buffer("skip.cs", text);
    let real = significant(&tokens);
    assert_eq!(real.len(), 1);
    assert_eq!(real[0].value, TokenValue::Int32(1));
    assert!(compiler.messages().is_empty());
}
