//! Pipeline behaviour over a minimal word-list language

use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::NamedTempFile;

use sylva_pipeline::{
    AstParser, Channel, Error, ErrorListener, ErrorMarker, FrontEndLexer, FrontEndParser,
    ParseChild, ParseNode, ParseTreeTransformer, PipelineConfig, RuleKind, Token, TokenKind,
    TokenStream,
};
use sylva_schema::{NodeKind, SchemaRegistry, TypeDefinition};
use sylva_tree::{
    GenericNode, Issue, IssueKind, NodeRef, Point, Position, Severity, SourceValue, downcast_rc,
    walk,
};

const WORD: TokenKind = TokenKind("WORD");
const NUM: TokenKind = TokenKind("NUM");
const SEMI: TokenKind = TokenKind("SEMI");
const WS: TokenKind = TokenKind("WS");

static LIST: RuleKind = RuleKind::new("list");
static ITEM: RuleKind = RuleKind::new("item");

struct WordList;
impl NodeKind for WordList {
    const PACKAGE: &'static str = "words";
    const NAME: &'static str = "WordList";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.children("words", "words.Word")
    }
}

struct Word;
impl NodeKind for Word {
    const PACKAGE: &'static str = "words";
    const NAME: &'static str = "Word";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.attribute("text", "string")
    }
}

struct WordsLexer {
    input: String,
    emit_eof: bool,
}

fn continues(kind: TokenKind, c: char) -> bool {
    match kind.name() {
        "WORD" => c.is_ascii_lowercase(),
        "NUM" => c.is_ascii_digit(),
        "WS" => c.is_whitespace(),
        _ => false,
    }
}

impl FrontEndLexer for WordsLexer {
    fn tokenize(&mut self, listener: &mut dyn ErrorListener) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut point = Point::START;
        let mut chars = self.input.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            let kind = if c.is_ascii_lowercase() {
                WORD
            } else if c.is_ascii_digit() {
                NUM
            } else if c.is_whitespace() {
                WS
            } else if c == ';' {
                SEMI
            } else {
                let text = c.to_string();
                listener.report(
                    Issue::lexical(format!("token recognition error at: '{c}'"))
                        .with_position(Some(Position::of_text(point, &text))),
                );
                point = point.advance(&text);
                continue;
            };

            let mut end = offset + c.len_utf8();
            while let Some(&(next_offset, next)) = chars.peek() {
                if !continues(kind, next) {
                    break;
                }
                end = next_offset + next.len_utf8();
                chars.next();
            }

            let text = &self.input[offset..end];
            let mut token = Token::new(kind, text, point, tokens.len());
            if kind == WS {
                token = token.on_channel(Channel::HIDDEN);
            }
            point = point.advance(text);
            tokens.push(token);
        }

        if self.emit_eof {
            tokens.push(Token::eof(point, tokens.len()));
        }
        tokens
    }
}

struct WordsFrontEnd {
    tokens: TokenStream,
    input: Rc<str>,
}

impl WordsFrontEnd {
    fn list(&mut self, listener: &mut dyn ErrorListener) -> Rc<ParseNode> {
        let start = self
            .tokens
            .current()
            .cloned()
            .unwrap_or_else(|| Token::eof(Point::START, 0));
        let mut children = Vec::new();
        let mut stop = None;

        while let Some(token) = self.tokens.current().cloned() {
            if token.is_eof() || token.is(SEMI) {
                break;
            }
            self.tokens.advance();
            if token.is(WORD) {
                children.push(ParseChild::Node(self.item_at(token.clone())));
            } else {
                listener.report(
                    Issue::syntactic(format!("unexpected {}", token.kind))
                        .with_position(Some(token.position())),
                );
                children.push(ParseChild::Error(ErrorMarker::new(token.clone(), "unexpected token")));
            }
            stop = Some(token);
        }

        ParseNode::new(&LIST, children, start, stop, Rc::clone(&self.input))
    }

    fn item_at(&self, token: Token) -> Rc<ParseNode> {
        ParseNode::new(
            &ITEM,
            vec![ParseChild::Token(token.clone())],
            token.clone(),
            Some(token),
            Rc::clone(&self.input),
        )
    }
}

impl FrontEndParser for WordsFrontEnd {
    fn rule_names(&self) -> &[&'static str] {
        &["list", "item"]
    }

    fn parse_rule(&mut self, rule: &str, listener: &mut dyn ErrorListener) -> Option<Rc<ParseNode>> {
        match rule {
            "list" => Some(self.list(listener)),
            "item" => {
                let token = self.tokens.current().filter(|t| t.is(WORD)).cloned()?;
                self.tokens.advance();
                Some(self.item_at(token))
            }
            _ => None,
        }
    }

    fn tokens(&self) -> &TokenStream {
        &self.tokens
    }
}

struct WordsParser {
    mapper: ParseTreeTransformer,
    max_input: usize,
    emit_eof: bool,
    summarize: bool,
}

impl WordsParser {
    fn new() -> Self {
        Self::build(true)
    }

    fn without_item_mapping() -> Self {
        Self::build(false)
    }

    fn build(map_items: bool) -> Self {
        let mut mapper = ParseTreeTransformer::new(Arc::new(SchemaRegistry::new()));
        mapper
            .transformer_mut()
            .register_kind_factory::<WordList>("list")
            .with_child("words", |source| {
                let node = downcast_rc::<ParseNode>(source)
                    .ok_or_else(|| anyhow::anyhow!("not a parse node"))?;
                Ok(SourceValue::many(node.nodes_of(&ITEM)))
            });
        if map_items {
            mapper
                .transformer_mut()
                .register_node_factory("item", |source, transformer| {
                    let node = downcast_rc::<ParseNode>(source)
                        .ok_or_else(|| anyhow::anyhow!("not a parse node"))?;
                    let word = transformer.create::<Word>()?;
                    word.set_property("text", node.text())?;
                    Ok(word)
                });
        }
        Self {
            mapper,
            max_input: 1024,
            emit_eof: true,
            summarize: false,
        }
    }
}

impl AstParser for WordsParser {
    type Lexer = WordsLexer;
    type Parser = WordsFrontEnd;

    fn create_lexer(&self, input: &str) -> sylva_pipeline::Result<WordsLexer> {
        if input.len() > self.max_input {
            return Err(Error::lexer(format!("input of {} bytes is too large", input.len())));
        }
        Ok(WordsLexer {
            input: input.to_string(),
            emit_eof: self.emit_eof,
        })
    }

    fn create_parser(&self, tokens: TokenStream) -> sylva_pipeline::Result<WordsFrontEnd> {
        Ok(WordsFrontEnd {
            input: Rc::clone(tokens.source()),
            tokens,
        })
    }

    fn map_to_ast(
        &self,
        root: &Rc<ParseNode>,
        _track_positions: bool,
        issues: &mut Vec<Issue>,
    ) -> sylva_pipeline::Result<Option<NodeRef>> {
        self.mapper.map(root, issues)
    }

    fn post_process_ast(&self, root: NodeRef, issues: &mut Vec<Issue>) -> NodeRef {
        if self.summarize {
            let words = root.children().len();
            issues.push(Issue::semantic(format!("{words} words")).with_severity(Severity::Info));
        }
        root
    }
}

fn texts(root: &NodeRef) -> Vec<String> {
    root.children()
        .iter()
        .filter_map(|w| w.property("text").ok().flatten())
        .filter_map(|v| v.as_string())
        .collect()
}

#[test]
fn test_clean_input_parses_correctly() {
    let result = WordsParser::new().parse("alpha beta").unwrap();

    assert!(result.correct(), "unexpected issues: {:?}", result.issues);
    let root = result.root.clone().unwrap();
    assert!(root.is_kind::<WordList>());
    assert_eq!(texts(&root), vec!["alpha", "beta"]);
    assert_eq!(root.position(), Some(Position::from_coords(1, 0, 1, 10)));

    let words = root.children();
    assert_eq!(words[0].position(), Some(Position::from_coords(1, 0, 1, 5)));
    assert_eq!(words[1].position(), Some(Position::from_coords(1, 6, 1, 10)));
    assert_eq!(words[1].source_text().as_deref(), Some("beta"));
    for word in &words {
        assert!(Rc::ptr_eq(&word.parent().unwrap(), &root));
    }

    assert_eq!(result.node_count(), 3);
    assert_eq!(result.token_count(), 4);
    assert!(result.lexing_time().is_some());
    assert_eq!(result.code, "alpha beta");
}

#[test]
fn test_lexing_time_is_optional() {
    let config = PipelineConfig {
        measure_lexing_time: false,
        ..Default::default()
    };
    let result = WordsParser::new().parse_with("alpha", &config).unwrap();
    assert!(result.lexing_time().is_none());
}

#[test]
fn test_error_markers_become_issues_and_are_skipped() {
    let result = WordsParser::new().parse("alpha 42 beta").unwrap();

    assert!(!result.correct());
    let messages: Vec<&str> = result.issues.iter().map(|i| i.message.as_str()).collect();
    assert_eq!(messages, vec!["unexpected NUM", "error node found"]);
    assert!(result.issues.iter().all(|i| i.kind == IssueKind::Syntactic));
    assert_eq!(
        result.issues[1].position,
        Some(Position::from_coords(1, 6, 1, 8))
    );

    assert_eq!(texts(&result.root.unwrap()), vec!["alpha", "beta"]);
}

#[test]
fn test_unconsumed_input_is_reported() {
    let result = WordsParser::new().parse("alpha ; beta").unwrap();

    let issue = result
        .issues
        .iter()
        .find(|i| i.message == "whole input not consumed")
        .unwrap();
    assert_eq!(issue.kind, IssueKind::Syntactic);
    assert_eq!(issue.severity, Severity::Error);
    // Reported at end of input
    assert_eq!(issue.position, Some(Position::from_coords(1, 12, 1, 12)));
    assert_eq!(texts(&result.root.unwrap()), vec!["alpha"]);
}

#[test]
fn test_lexical_errors_are_collected() {
    let result = WordsParser::new().parse("alpha ? beta").unwrap();

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].kind, IssueKind::Lexical);
    assert_eq!(
        result.issues[0].position,
        Some(Position::from_coords(1, 6, 1, 7))
    );
    let root = result.root.unwrap();
    assert_eq!(
        root.children()[1].position(),
        Some(Position::from_coords(1, 8, 1, 12))
    );
}

#[test]
fn test_positions_can_be_stripped() {
    let config = PipelineConfig {
        track_positions: false,
        ..Default::default()
    };
    let result = WordsParser::new().parse_with("alpha\nbeta", &config).unwrap();
    let root = result.root.unwrap();

    assert!(walk(&root).all(|n| n.position().is_none() && n.origin().is_none()));
    // Parents are still assigned
    assert!(root.children().iter().all(|w| w.parent().is_some()));
}

#[test]
fn test_unmapped_rules_give_info_issues_only() {
    let result = WordsParser::without_item_mapping().parse("alpha beta").unwrap();

    assert!(result.correct());
    assert_eq!(result.issues.len(), 2);
    assert!(result.issues.iter().all(|i| i.severity == Severity::Info));
    assert!(result.issues[0].message.contains("item"));

    let root = result.root.unwrap();
    assert!(root.children().iter().all(|n| n.is_kind::<GenericNode>()));
}

#[test]
fn test_post_processing_runs_after_parent_assignment() {
    let mut parser = WordsParser::new();
    parser.summarize = true;
    let result = parser.parse("one two three").unwrap();

    assert!(result.correct());
    assert_eq!(result.issues.last().unwrap().message, "3 words");
}

#[test]
fn test_first_stage_alone() {
    let first = WordsParser::new().parse_first_stage("alpha beta", true).unwrap();
    let root = first.root.clone().unwrap();

    assert_eq!(root.rule().name, "list");
    assert_eq!(first.parse_node_count(), 3);
    assert_eq!(first.token_count, 4);
    assert!(first.correct());
}

#[test]
fn test_lexer_construction_failure_is_fatal() {
    let mut parser = WordsParser::new();
    parser.max_input = 3;
    assert!(matches!(parser.parse("alpha"), Err(Error::Lexer(_))));
    assert!(matches!(parser.lex("alpha", true), Err(Error::Lexer(_))));
}

#[test]
fn test_lex_filters_hidden_channel() {
    let parser = WordsParser::new();

    let visible = parser.lex("alpha beta", true).unwrap();
    let kinds: Vec<&str> = visible.tokens.iter().map(|t| t.kind.name()).collect();
    assert_eq!(kinds, vec!["WORD", "WORD", "EOF"]);
    assert!(visible.correct());

    let all = parser.lex("alpha beta", false).unwrap();
    assert_eq!(all.tokens.len(), 4);
    assert_eq!(all.tokens[1].channel, Channel::HIDDEN);
}

#[test]
fn test_lex_warns_without_end_of_input() {
    let mut parser = WordsParser::new();
    parser.emit_eof = false;

    let result = parser.lex("alpha", true).unwrap();
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Warning);
    assert_eq!(
        result.issues[0].position,
        Some(Position::from_coords(1, 5, 1, 5))
    );
    // Warnings are above Info, so they block
    assert!(!result.correct());
}

#[test]
fn test_parse_file() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"alpha\nbeta\n")?;

    let result = WordsParser::new().parse_file(file.path(), &PipelineConfig::default())?;
    let root = result.root.unwrap();
    assert_eq!(
        root.children()[1].position(),
        Some(Position::from_coords(2, 0, 2, 4))
    );
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let result = WordsParser::new().parse_file(
        std::path::Path::new("/nonexistent/words.txt"),
        &PipelineConfig::default(),
    );
    match result {
        Err(Error::Io { path, .. }) => assert_eq!(path, "/nonexistent/words.txt"),
        other => panic!("Expected Io error, got {other:?}"),
    }
}
