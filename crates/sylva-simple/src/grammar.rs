//! Grammar rules and the recursive-descent front-end parser
//!
//! ```text
//! compilationUnit : statement* EOF ;
//! statement       : SET ID EQUAL expression      # setStatement
//!                 | DISPLAY expression           # displayStatement
//!                 | INPUT ID IS (INT|DEC|STRING) # inputDeclaration
//!                 ;
//! expression      : expression PLUS expression   # sumExpression
//!                 | INT_LIT                      # intLiteral
//!                 | DEC_LIT                      # decLiteral
//!                 | STRING_LIT                   # stringLiteral
//!                 | ID                           # valueReference
//!                 ;
//! ```
//!
//! On a mismatch the parser reports the offending token, marks it in the
//! tree and skips ahead to the next statement keyword.

use crate::lexer::{DEC, DEC_LIT, DISPLAY, EQUAL, ID, INPUT, INT, INT_LIT, IS, PLUS, SET, STRING, STRING_LIT};
use std::rc::Rc;
use sylva_pipeline::{
    ErrorListener, ErrorMarker, FrontEndParser, ParseChild, ParseNode, RuleKind, Token, TokenKind,
    TokenStream,
};
use sylva_tree::{Issue, Point};

pub static COMPILATION_UNIT: RuleKind = RuleKind::new("compilationUnit");
pub static STATEMENT: RuleKind = RuleKind::new("statement");
pub static SET_STATEMENT: RuleKind = RuleKind::extending("setStatement", &STATEMENT);
pub static DISPLAY_STATEMENT: RuleKind = RuleKind::extending("displayStatement", &STATEMENT);
pub static INPUT_DECLARATION: RuleKind = RuleKind::extending("inputDeclaration", &STATEMENT);
pub static EXPRESSION: RuleKind = RuleKind::new("expression");
pub static SUM_EXPRESSION: RuleKind = RuleKind::extending("sumExpression", &EXPRESSION);
pub static INT_LITERAL: RuleKind = RuleKind::extending("intLiteral", &EXPRESSION);
pub static DEC_LITERAL: RuleKind = RuleKind::extending("decLiteral", &EXPRESSION);
pub static STRING_LITERAL: RuleKind = RuleKind::extending("stringLiteral", &EXPRESSION);
pub static VALUE_REFERENCE: RuleKind = RuleKind::extending("valueReference", &EXPRESSION);

const RULE_NAMES: &[&str] = &["compilationUnit", "statement", "expression"];
const STATEMENT_STARTS: &[TokenKind] = &[SET, DISPLAY, INPUT];
const TYPE_KEYWORDS: &[TokenKind] = &[INT, DEC, STRING];

/// Children collected for one rule match
struct RuleBuilder {
    children: Vec<ParseChild>,
    start: Token,
    stop: Option<Token>,
}

impl RuleBuilder {
    fn new(start: Token) -> Self {
        Self {
            children: Vec::new(),
            start,
            stop: None,
        }
    }

    fn token(&mut self, token: Token) {
        self.extend_to(&token);
        self.children.push(ParseChild::Token(token));
    }

    fn node(&mut self, node: Rc<ParseNode>) {
        if let Some(stop) = node.stop() {
            self.extend_to(stop);
        }
        self.children.push(ParseChild::Node(node));
    }

    /// Error markers do not widen the rule: the offending token may belong
    /// to the next statement.
    fn error(&mut self, marker: ErrorMarker) {
        self.children.push(ParseChild::Error(marker));
    }

    fn extend_to(&mut self, token: &Token) {
        if self.stop.as_ref().is_none_or(|stop| token.index > stop.index) {
            self.stop = Some(token.clone());
        }
    }

    fn finish(self, rule: &'static RuleKind, input: &Rc<str>) -> Rc<ParseNode> {
        ParseNode::new(rule, self.children, self.start, self.stop, Rc::clone(input))
    }
}

pub struct SimpleFrontEnd {
    tokens: TokenStream,
}

impl SimpleFrontEnd {
    pub fn new(tokens: TokenStream) -> Self {
        Self { tokens }
    }

    fn current(&self) -> Token {
        self.tokens
            .current()
            .cloned()
            .unwrap_or_else(|| Token::eof(Point::START, 0))
    }

    fn at(&self, kinds: &[TokenKind]) -> bool {
        self.tokens
            .current()
            .is_some_and(|t| kinds.iter().any(|k| t.is(*k)))
    }

    fn consume(&mut self) -> Token {
        self.tokens.advance().unwrap_or_else(|| self.current())
    }

    fn input(&self) -> Rc<str> {
        Rc::clone(self.tokens.source())
    }

    pub fn compilation_unit(&mut self, listener: &mut dyn ErrorListener) -> Rc<ParseNode> {
        let mut rule = RuleBuilder::new(self.current());
        while !self.tokens.at_eof() {
            if self.at(STATEMENT_STARTS) {
                let statement = self.statement(listener);
                rule.node(statement);
            } else {
                let token = self.consume();
                let message = format!(
                    "extraneous input '{}' expecting {{set, display, input}}",
                    token.text
                );
                listener.report(Issue::syntactic(&message).with_position(Some(token.position())));
                rule.error(ErrorMarker::new(token, message));
            }
        }
        rule.token(self.current());
        rule.finish(&COMPILATION_UNIT, &self.input())
    }

    pub fn statement(&mut self, listener: &mut dyn ErrorListener) -> Rc<ParseNode> {
        let start = self.current();
        let mut rule = RuleBuilder::new(start.clone());
        let kind = if start.is(SET) {
            rule.token(self.consume());
            let _ = self.expect(&mut rule, ID, listener)
                && self.expect(&mut rule, EQUAL, listener)
                && self.expect_expression(&mut rule, listener);
            &SET_STATEMENT
        } else if start.is(DISPLAY) {
            rule.token(self.consume());
            self.expect_expression(&mut rule, listener);
            &DISPLAY_STATEMENT
        } else if start.is(INPUT) {
            rule.token(self.consume());
            let _ = self.expect(&mut rule, ID, listener)
                && self.expect(&mut rule, IS, listener)
                && self.expect_any(&mut rule, TYPE_KEYWORDS, "{int, dec, string}", listener);
            &INPUT_DECLARATION
        } else {
            self.mismatch(&mut rule, "{set, display, input}", listener);
            &STATEMENT
        };
        rule.finish(kind, &self.input())
    }

    /// An expression, or `None` without consuming anything
    pub fn expression(&mut self, listener: &mut dyn ErrorListener) -> Option<Rc<ParseNode>> {
        let mut left = self.primary()?;
        while self.at(&[PLUS]) {
            let mut rule = RuleBuilder::new(left.start().clone());
            rule.node(left);
            rule.token(self.consume());
            match self.primary() {
                Some(right) => rule.node(right),
                None => self.mismatch(&mut rule, "expression", listener),
            }
            left = rule.finish(&SUM_EXPRESSION, &self.input());
        }
        Some(left)
    }

    fn primary(&mut self) -> Option<Rc<ParseNode>> {
        let token = self.current();
        let kind = match token.kind {
            INT_LIT => &INT_LITERAL,
            DEC_LIT => &DEC_LITERAL,
            STRING_LIT => &STRING_LITERAL,
            ID => &VALUE_REFERENCE,
            _ => return None,
        };
        let mut rule = RuleBuilder::new(token);
        rule.token(self.consume());
        Some(rule.finish(kind, &self.input()))
    }

    fn expect(&mut self, rule: &mut RuleBuilder, kind: TokenKind, listener: &mut dyn ErrorListener) -> bool {
        self.expect_any(rule, &[kind], kind.name(), listener)
    }

    fn expect_any(
        &mut self,
        rule: &mut RuleBuilder,
        kinds: &[TokenKind],
        expected: &str,
        listener: &mut dyn ErrorListener,
    ) -> bool {
        if self.at(kinds) {
            rule.token(self.consume());
            true
        } else {
            self.mismatch(rule, expected, listener);
            false
        }
    }

    fn expect_expression(&mut self, rule: &mut RuleBuilder, listener: &mut dyn ErrorListener) -> bool {
        match self.expression(listener) {
            Some(expression) => {
                rule.node(expression);
                true
            }
            None => {
                self.mismatch(rule, "expression", listener);
                false
            }
        }
    }

    /// Report and mark the current token, then skip to the next statement
    fn mismatch(&mut self, rule: &mut RuleBuilder, expected: &str, listener: &mut dyn ErrorListener) {
        let token = self.current();
        let found = if token.is_eof() { "<EOF>" } else { token.text.as_str() };
        let message = format!("mismatched input '{found}' expecting {expected}");
        listener.report(Issue::syntactic(&message).with_position(Some(token.position())));
        rule.error(ErrorMarker::new(token, message));

        while !self.tokens.at_eof() && !self.at(STATEMENT_STARTS) {
            rule.token(self.consume());
        }
    }
}

impl FrontEndParser for SimpleFrontEnd {
    fn rule_names(&self) -> &[&'static str] {
        RULE_NAMES
    }

    fn parse_rule(&mut self, rule: &str, listener: &mut dyn ErrorListener) -> Option<Rc<ParseNode>> {
        match rule {
            "compilationUnit" => Some(self.compilation_unit(listener)),
            "statement" => Some(self.statement(listener)),
            "expression" => self.expression(listener),
            _ => None,
        }
    }

    fn tokens(&self) -> &TokenStream {
        &self.tokens
    }
}
