//! End-to-end parsing of the statement language

use std::rc::Rc;
use std::sync::Arc;

use sylva_pipeline::{AstParser, PipelineConfig};
use sylva_schema::{QualifiedName, SchemaRegistry};
use sylva_simple::SimpleParser;
use sylva_simple::ast::{
    CompilationUnit, DecLiteral, DisplayStatement, InputDeclaration, IntLiteral, SetStatement,
    Statement, StringLiteral, SumExpression, ValueReference,
};
use sylva_transform::TransformerConfig;
use sylva_tree::{
    ErrorNode, IssueKind, NodeRef, Position, Value, collect_by_type, debug_print,
    find_by_position, invalid_positions, walk,
};

fn parser() -> SimpleParser {
    SimpleParser::new(Arc::new(SchemaRegistry::new())).unwrap()
}

fn value(node: &NodeRef, property: &str) -> Value {
    node.property(property).unwrap().unwrap()
}

#[test]
fn test_two_statements_with_exact_spans() {
    let result = parser().parse("set foo = 123\ndisplay 456").unwrap();

    assert!(result.correct(), "unexpected issues: {:?}", result.issues);
    let root = result.root.unwrap();
    assert!(root.is_kind::<CompilationUnit>());

    let statements = root.children();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].position(),
        Some(Position::from_coords(1, 0, 1, 13))
    );
    assert_eq!(
        statements[1].position(),
        Some(Position::from_coords(2, 0, 2, 11))
    );
    assert_eq!(invalid_positions(&root).count(), 0);
}

#[test]
fn test_statement_contents() {
    let root = parser()
        .parse("set foo = 123\ndisplay 456")
        .unwrap()
        .root
        .unwrap();
    let statements = root.children();

    let set = &statements[0];
    assert!(set.is_kind::<SetStatement>());
    assert!(set.is_kind::<Statement>());
    assert_eq!(value(set, "variable"), Value::from("foo"));
    let assigned = set.child("value").unwrap().unwrap();
    assert!(assigned.is_kind::<IntLiteral>());
    assert_eq!(value(&assigned, "value"), Value::Integer(123));
    assert!(Rc::ptr_eq(&assigned.parent().unwrap(), set));

    let display = &statements[1];
    assert!(display.is_kind::<DisplayStatement>());
    let shown = display.child("value").unwrap().unwrap();
    assert_eq!(value(&shown, "value"), Value::Integer(456));
    assert_eq!(shown.source_text().as_deref(), Some("456"));
}

#[test]
fn test_sum_of_mixed_literals() {
    let root = parser()
        .parse("display 1 + 2.5 + \"x\"")
        .unwrap()
        .root
        .unwrap();
    let sum = root.children()[0].child("value").unwrap().unwrap();

    assert!(sum.is_kind::<SumExpression>());
    let left = sum.child("left").unwrap().unwrap();
    let right = sum.child("right").unwrap().unwrap();
    assert!(left.is_kind::<SumExpression>());
    assert!(right.is_kind::<StringLiteral>());
    assert_eq!(value(&right, "value"), Value::from("x"));

    let inner_right = left.child("right").unwrap().unwrap();
    assert!(inner_right.is_kind::<DecLiteral>());
    assert_eq!(value(&inner_right, "value"), Value::Decimal(2.5));
    assert_eq!(invalid_positions(&root).count(), 0);
}

#[test]
fn test_references_resolve_to_declarations() {
    let result = parser()
        .parse("input name is string\nset greeting = \"hi \" + name\ndisplay greeting")
        .unwrap();
    assert!(result.correct(), "unexpected issues: {:?}", result.issues);
    let root = result.root.unwrap();

    let references = collect_by_type::<ValueReference>(&root);
    assert_eq!(references.len(), 2);

    let declaration = &root.children()[0];
    assert!(declaration.is_kind::<InputDeclaration>());
    assert_eq!(value(declaration, "type"), Value::from("string"));
    let name_ref = references[0].reference("variable").unwrap().unwrap();
    assert!(Rc::ptr_eq(&name_ref.referred().unwrap(), declaration));

    let greeting_ref = references[1].reference("variable").unwrap().unwrap();
    assert!(Rc::ptr_eq(
        &greeting_ref.referred().unwrap(),
        &root.children()[1]
    ));
}

#[test]
fn test_unresolved_reference_is_a_semantic_error() {
    let result = parser().parse("display missing").unwrap();

    assert!(!result.correct());
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].kind, IssueKind::Semantic);
    assert_eq!(result.issues[0].message, "unresolved reference: missing");
    assert_eq!(
        result.issues[0].position,
        Some(Position::from_coords(1, 8, 1, 15))
    );
}

#[test]
fn test_malformed_statement_becomes_error_node() {
    let result = parser().parse("set = 5\ndisplay 1").unwrap();

    let messages: Vec<&str> = result.issues.iter().map(|i| i.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["mismatched input '=' expecting ID", "error node found"]
    );
    assert!(result.issues.iter().all(|i| i.kind == IssueKind::Syntactic));

    let root = result.root.unwrap();
    let statements = root.children();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].is_kind::<ErrorNode>());
    assert!(statements[0].error_message().unwrap().contains("without a variable"));
    assert_eq!(
        statements[0].position(),
        Some(Position::from_coords(1, 0, 1, 7))
    );
    assert!(statements[1].is_kind::<DisplayStatement>());
}

#[test]
fn test_constructor_failure_is_absorbed_without_issue() {
    let result = parser().parse("display 99999999999999999999").unwrap();

    assert!(result.issues.is_empty());
    assert!(result.correct());
    let shown = result.root.unwrap().children()[0]
        .child("value")
        .unwrap()
        .unwrap();
    assert!(shown.is_kind::<ErrorNode>());
    assert!(shown.error_message().unwrap().contains("out of range"));
}

#[test]
fn test_strict_transformer_fails_on_constructor_errors() {
    let strict = SimpleParser::with_config(
        Arc::new(SchemaRegistry::new()),
        TransformerConfig {
            allow_generic_node: false,
        },
    )
    .unwrap();
    assert!(strict.parse("display 99999999999999999999").is_err());
    assert!(strict.parse("display 1").unwrap().correct());
}

#[test]
fn test_extraneous_input_is_reported() {
    let result = parser().parse("456\nset x = 1").unwrap();

    assert_eq!(result.issues.len(), 2);
    assert!(result.issues[0].message.starts_with("extraneous input '456'"));
    assert_eq!(result.issues[1].message, "error node found");
    assert_eq!(result.root.unwrap().children().len(), 1);
}

#[test]
fn test_lexical_error_does_not_stop_parsing() {
    let result = parser().parse("set x = 1 $\ndisplay x").unwrap();

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].kind, IssueKind::Lexical);
    assert_eq!(result.root.unwrap().children().len(), 2);
}

#[test]
fn test_untracked_positions() {
    let config = PipelineConfig {
        track_positions: false,
        ..Default::default()
    };
    let result = parser().parse_with("set foo = 1", &config).unwrap();
    let root = result.root.unwrap();

    assert!(walk(&root).all(|n| n.position().is_none()));
    assert!(root.children()[0].parent().is_some());
}

#[test]
fn test_find_by_position_returns_outermost() {
    let root = parser().parse("set foo = 1 + 2").unwrap().root.unwrap();
    let found = find_by_position(&root, Position::from_coords(1, 10, 1, 15), true).unwrap();
    assert!(found.is_kind::<SumExpression>());
}

#[test]
fn test_lex_reports_default_channel_tokens() {
    let result = parser().lex("set x = 1", true).unwrap();
    let kinds: Vec<&str> = result.tokens.iter().map(|t| t.kind.name()).collect();
    assert_eq!(kinds, vec!["SET", "ID", "EQUAL", "INT_LIT", "EOF"]);
    assert!(result.correct());

    let all = parser().lex("set x = 1", false).unwrap();
    assert_eq!(all.tokens.len(), 8);
}

#[test]
fn test_debug_print_shows_structure() {
    let root = parser().parse("set foo = 123").unwrap().root.unwrap();
    let printed = debug_print(&root);

    assert!(printed.starts_with("simple.CompilationUnit [1:0-1:13]\n"));
    assert!(printed.contains("    simple.SetStatement [1:0-1:13]\n"));
    assert!(printed.contains("      variable = \"foo\"\n"));
    assert!(printed.contains("        simple.IntLiteral [1:10-1:13]\n"));
}

#[test]
fn test_registry_is_shared_across_parses() {
    let parser = parser();
    parser.parse("set a = 1").unwrap();
    parser.parse("display 2").unwrap();
    let registry = parser.registry();
    assert!(registry.contains(&QualifiedName::new("simple", "SetStatement")));
    assert!(registry.contains(&QualifiedName::new("simple", "DisplayStatement")));
}

#[test]
fn test_carriage_return_line_breaks() {
    for code in ["set a = 1\rdisplay 22", "set a = 1\r\ndisplay 22"] {
        let result = parser().parse(code).unwrap();
        assert!(result.correct(), "unexpected issues: {:?}", result.issues);

        let root = result.root.unwrap();
        assert!(walk(&root).all(|n| !n.is_kind::<ErrorNode>()), "{code:?}");
        let statements = root.children();
        assert_eq!(
            statements[1].position(),
            Some(Position::from_coords(2, 0, 2, 10))
        );
        let shown = statements[1].child("value").unwrap().unwrap();
        assert_eq!(value(&shown, "value"), Value::Integer(22));
        assert_eq!(shown.source_text().as_deref(), Some("22"));
        assert_eq!(invalid_positions(&root).count(), 0);
    }
}
