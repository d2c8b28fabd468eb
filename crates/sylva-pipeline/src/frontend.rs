//! Seams between the pipeline and a concrete front-end

use crate::parse_tree::ParseNode;
use crate::token::{Token, TokenStream};
use std::rc::Rc;
use sylva_tree::Issue;

/// Receives errors reported by a front-end lexer or parser
pub trait ErrorListener {
    fn report(&mut self, issue: Issue);
}

impl ErrorListener for Vec<Issue> {
    fn report(&mut self, issue: Issue) {
        self.push(issue);
    }
}

/// Splits input into tokens
pub trait FrontEndLexer {
    /// All tokens of the input, hidden channels included, normally ending
    /// with [`TokenKind::EOF`](crate::TokenKind::EOF). Unrecognized input is
    /// reported to `listener` as a lexical issue and skipped.
    fn tokenize(&mut self, listener: &mut dyn ErrorListener) -> Vec<Token>;
}

/// Builds a parse tree from tokens
pub trait FrontEndParser {
    /// Grammar rules this parser can start from, entry rule first
    fn rule_names(&self) -> &[&'static str];

    /// Parse starting at `rule`.
    ///
    /// Syntax errors are reported to `listener` and recovered from; the
    /// tree records them as [`ErrorMarker`](crate::ErrorMarker)s. `None`
    /// when the parser has no such rule.
    fn parse_rule(&mut self, rule: &str, listener: &mut dyn ErrorListener) -> Option<Rc<ParseNode>>;

    /// Tokens being parsed, cursor at the first token not consumed
    fn tokens(&self) -> &TokenStream;
}
