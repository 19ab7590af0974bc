use std::io::Write;

use botblocks::parser::{Parser, render};
use botblocks::{BlockKind, Param, Path, Program};

fn parse(source: &str) -> Program {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn parse_err(source: &str) -> String {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect_err("expected a parse error")
        .message
}

const NESTED: &str = r#"
[[blocks]]
kind = "turn_left"
angle = 90

[[blocks]]
kind = "repeat"
times = 3

[[blocks.children]]
kind = "wave"

[[blocks.children]]
kind = "pause"
seconds = 2
"#;

#[test]
fn parses_nested_program() {
    let program = parse(NESTED);
    assert_eq!(program.len(), 2);
    let turn = program.block_at(&Path::from([0])).unwrap();
    assert_eq!(turn.kind(), BlockKind::TurnLeft);
    assert_eq!(turn.param(Param::Angle), 90.0);

    let repeat = program.block_at(&Path::from([1])).unwrap();
    assert_eq!(repeat.param(Param::Times), 3.0);
    assert_eq!(repeat.children().len(), 2);
    assert_eq!(repeat.children()[1].param(Param::Seconds), 2.0);
}

#[test]
fn empty_source_is_empty_program() {
    assert!(parse("").is_empty());
}

#[test]
fn params_are_clamped_on_load() {
    let program = parse("[[blocks]]\nkind = \"turn_right\"\nangle = 400\n");
    assert_eq!(
        program.block_at(&Path::from([0])).unwrap().param(Param::Angle),
        360.0
    );
}

#[test]
fn rejects_unknown_kind_with_note() {
    let error = Parser::new("[[blocks]]\nkind = \"spin\"\n".to_string(), 7)
        .parse()
        .unwrap_err();
    assert!(error.message.contains("spin"), "got: {}", error.message);
    assert_eq!(error.file_id, 7);
    assert!(error.span.is_some());
    assert!(error.notes[0].contains("turn_left"));
}

#[test]
fn rejects_param_the_kind_does_not_declare() {
    let message = parse_err("[[blocks]]\nkind = \"wave\"\nangle = 30\n");
    assert!(message.contains("has no parameter 'angle'"), "got: {}", message);
}

#[test]
fn rejects_children_on_leaf() {
    let message = parse_err("[[blocks]]\nkind = \"pause\"\n[[blocks.children]]\nkind = \"wave\"\n");
    assert!(message.contains("not a container"), "got: {}", message);
}

#[test]
fn rejects_unknown_block_key() {
    let message = parse_err("[[blocks]]\nkind = \"wave\"\nspeeed = 0.2\n");
    assert!(message.contains("speeed"), "got: {}", message);
}

#[test]
fn ignores_unrelated_top_level_tables() {
    let program = parse("[scenario]\ndescription = \"x\"\n\n[[blocks]]\nkind = \"wave\"\n");
    assert_eq!(program.len(), 1);
}

#[test]
fn render_round_trips() {
    let program = parse(NESTED);
    let rendered = render(&program).expect("render failed");
    assert_eq!(parse(&rendered), program);
}

#[test]
fn parses_program_from_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("program.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", NESTED).unwrap();

    let source = std::fs::read_to_string(&path).unwrap();
    let program = parse(&source);
    assert_eq!(program.node_count(), 4);
}
