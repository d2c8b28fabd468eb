//! Generic concrete parse tree and the token-to-position boundary

use crate::token::{Token, TokenKind};
use std::fmt;
use std::rc::Rc;
use sylva_tree::{HasPosition, Position, Source};

/// A grammar rule. Rules may specialize another rule, the way labelled
/// alternatives specialize their parent rule.
#[derive(Debug, PartialEq, Eq)]
pub struct RuleKind {
    pub name: &'static str,
    pub supertype: Option<&'static RuleKind>,
}

impl RuleKind {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            supertype: None,
        }
    }

    pub const fn extending(name: &'static str, supertype: &'static RuleKind) -> Self {
        Self {
            name,
            supertype: Some(supertype),
        }
    }

    /// Supertypes from the nearest to the most general
    pub fn supertypes(&self) -> impl Iterator<Item = &'static RuleKind> {
        std::iter::successors(self.supertype, |r| r.supertype)
    }

    /// True when this rule is `other` or specializes it
    pub fn is_a(&self, other: &RuleKind) -> bool {
        self == other || self.supertypes().any(|r| r == other)
    }
}

/// Where the parser gave up on some input and resynchronized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMarker {
    /// Offending token
    pub token: Token,
    pub message: String,
}

impl ErrorMarker {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }

    pub fn position(&self) -> Position {
        Position::of_token(&self.token)
    }
}

#[derive(Debug, Clone)]
pub enum ParseChild {
    Node(Rc<ParseNode>),
    Token(Token),
    Error(ErrorMarker),
}

/// A rule match: ordered children between a start and a stop token.
///
/// Nodes keep the whole input so their text can be sliced out. They are
/// [`Source`]s whose type chain is the rule name followed by the rules it
/// specializes.
pub struct ParseNode {
    rule: &'static RuleKind,
    children: Vec<ParseChild>,
    start: Token,
    /// `None` when the rule matched no tokens
    stop: Option<Token>,
    input: Rc<str>,
}

impl ParseNode {
    pub fn new(
        rule: &'static RuleKind,
        children: Vec<ParseChild>,
        start: Token,
        stop: Option<Token>,
        input: Rc<str>,
    ) -> Rc<Self> {
        Rc::new(Self {
            rule,
            children,
            start,
            stop,
            input,
        })
    }

    pub fn rule(&self) -> &'static RuleKind {
        self.rule
    }

    pub fn is_rule(&self, rule: &RuleKind) -> bool {
        self.rule.is_a(rule)
    }

    pub fn children(&self) -> &[ParseChild] {
        &self.children
    }

    pub fn start(&self) -> &Token {
        &self.start
    }

    pub fn stop(&self) -> Option<&Token> {
        self.stop.as_ref()
    }

    /// Child rule nodes matching `rule`, in order
    pub fn nodes_of(&self, rule: &RuleKind) -> Vec<Rc<ParseNode>> {
        self.child_nodes().filter(|n| n.is_rule(rule)).cloned().collect()
    }

    /// First child rule node matching `rule`
    pub fn node_of(&self, rule: &RuleKind) -> Option<Rc<ParseNode>> {
        self.child_nodes().find(|n| n.is_rule(rule)).cloned()
    }

    /// Child rule nodes
    pub fn child_nodes(&self) -> impl Iterator<Item = &Rc<ParseNode>> {
        self.children.iter().filter_map(|c| match c {
            ParseChild::Node(node) => Some(node),
            _ => None,
        })
    }

    /// First direct token child of `kind`
    pub fn token_of(&self, kind: TokenKind) -> Option<&Token> {
        self.children.iter().find_map(|c| match c {
            ParseChild::Token(token) if token.is(kind) => Some(token),
            _ => None,
        })
    }

    /// Error markers anywhere below this node, in document order
    pub fn error_markers(&self) -> Vec<ErrorMarker> {
        let mut markers = Vec::new();
        self.collect_error_markers(&mut markers);
        markers
    }

    fn collect_error_markers(&self, markers: &mut Vec<ErrorMarker>) {
        for child in &self.children {
            match child {
                ParseChild::Node(node) => node.collect_error_markers(markers),
                ParseChild::Error(marker) => markers.push(marker.clone()),
                ParseChild::Token(_) => {}
            }
        }
    }

    /// Nodes in this subtree, this one included
    pub fn node_count(&self) -> usize {
        1 + self.child_nodes().map(|n| n.node_count()).sum::<usize>()
    }

    /// Text the node spans
    pub fn text(&self) -> &str {
        Position::of_parse_tree(self)
            .text_of(&self.input)
            .unwrap_or_default()
    }
}

impl Source for ParseNode {
    fn type_name(&self) -> String {
        self.rule.name.to_string()
    }

    fn supertype_names(&self) -> Vec<String> {
        self.rule.supertypes().map(|r| r.name.to_string()).collect()
    }

    fn position(&self) -> Option<Position> {
        Some(Position::of_parse_tree(self))
    }

    fn source_text(&self) -> Option<String> {
        Some(self.text().to_string())
    }
}

impl HasPosition for ParseNode {
    fn position(&self) -> Option<Position> {
        Some(Position::of_parse_tree(self))
    }
}

impl fmt::Debug for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseNode")
            .field("rule", &self.rule.name)
            .field("position", &Position::of_parse_tree(self))
            .field("children", &self.children)
            .finish()
    }
}

/// Conversions from front-end tokens and parse nodes to positions
pub trait TokenPositions {
    /// Range covered by `token`
    fn of_token(token: &Token) -> Position;
    /// Empty range where `token` starts
    fn of_token_start(token: &Token) -> Position;
    /// Empty range where `token` ends
    fn of_token_end(token: &Token) -> Position;
    /// From the start of the first token to the end of the last one; empty
    /// at the start token when the rule matched nothing
    fn of_parse_tree(node: &ParseNode) -> Position;
}

impl TokenPositions for Position {
    fn of_token(token: &Token) -> Position {
        token.position()
    }

    fn of_token_start(token: &Token) -> Position {
        token.start.as_position()
    }

    fn of_token_end(token: &Token) -> Position {
        token.end().as_position()
    }

    fn of_parse_tree(node: &ParseNode) -> Position {
        match &node.stop {
            Some(stop) if stop.index >= node.start.index => {
                Position::new(node.start.start, stop.end())
            }
            _ => Position::of_token_start(&node.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_tree::Point;

    static EXPR: RuleKind = RuleKind::new("expression");
    static SUM: RuleKind = RuleKind::extending("sumExpression", &EXPR);
    static LITERAL: RuleKind = RuleKind::extending("literal", &EXPR);

    const INT: TokenKind = TokenKind("INT");
    const PLUS: TokenKind = TokenKind("PLUS");

    fn sum() -> Rc<ParseNode> {
        let input: Rc<str> = Rc::from("1 + 2");
        let one = Token::new(INT, "1", Point::new(1, 0), 0);
        let plus = Token::new(PLUS, "+", Point::new(1, 2), 2);
        let two = Token::new(INT, "2", Point::new(1, 4), 4);
        let left = ParseNode::new(
            &LITERAL,
            vec![ParseChild::Token(one.clone())],
            one.clone(),
            Some(one.clone()),
            Rc::clone(&input),
        );
        let right = ParseNode::new(
            &LITERAL,
            vec![
                ParseChild::Token(two.clone()),
                ParseChild::Error(ErrorMarker::new(two.clone(), "extraneous input")),
            ],
            two.clone(),
            Some(two.clone()),
            Rc::clone(&input),
        );
        ParseNode::new(
            &SUM,
            vec![
                ParseChild::Node(left),
                ParseChild::Token(plus),
                ParseChild::Node(right),
            ],
            one,
            Some(two),
            input,
        )
    }

    #[test]
    fn test_type_chain_follows_rule_specialization() {
        let node: Rc<dyn Source> = sum();
        assert_eq!(node.type_chain(), vec!["sumExpression", "expression"]);
        assert!(SUM.is_a(&EXPR));
        assert!(!EXPR.is_a(&SUM));
    }

    #[test]
    fn test_position_and_text() {
        let node = sum();
        assert_eq!(
            Position::of_parse_tree(&node),
            Position::from_coords(1, 0, 1, 5)
        );
        assert_eq!(node.text(), "1 + 2");
        assert_eq!(node.nodes_of(&LITERAL)[1].text(), "2");
        assert_eq!(node.token_of(PLUS).unwrap().text, "+");
    }

    #[test]
    fn test_empty_rule_positions_at_start_token() {
        let eof = Token::eof(Point::new(3, 1), 7);
        let node = ParseNode::new(&EXPR, Vec::new(), eof, None, Rc::from(""));
        assert_eq!(
            Position::of_parse_tree(&node),
            Position::from_coords(3, 1, 3, 1)
        );
        assert_eq!(node.text(), "");
    }

    #[test]
    fn test_token_boundary_positions() {
        let token = Token::new(INT, "42", Point::new(2, 3), 0);
        assert_eq!(Position::of_token_start(&token), Position::from_coords(2, 3, 2, 3));
        assert_eq!(Position::of_token_end(&token), Position::from_coords(2, 5, 2, 5));
        assert_eq!(Position::of_token(&token), Position::from_coords(2, 3, 2, 5));
    }

    #[test]
    fn test_error_markers_and_counts() {
        let node = sum();
        let markers = node.error_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position(), Position::from_coords(1, 4, 1, 5));
        assert_eq!(node.node_count(), 3);
    }
}
