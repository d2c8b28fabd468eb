//! Regex-driven lexer
//!
//! Each token kind is an anchored pattern. At every offset the longest
//! match wins; ties go to the rule listed first, which is how keywords beat
//! identifiers.

use regex::Regex;
use std::rc::Rc;
use sylva_pipeline::{Channel, ErrorListener, FrontEndLexer, Token, TokenKind};
use sylva_tree::{Issue, Point, Position};
use tracing::trace;

pub const SET: TokenKind = TokenKind("SET");
pub const DISPLAY: TokenKind = TokenKind("DISPLAY");
pub const INPUT: TokenKind = TokenKind("INPUT");
pub const IS: TokenKind = TokenKind("IS");
pub const INT: TokenKind = TokenKind("INT");
pub const DEC: TokenKind = TokenKind("DEC");
pub const STRING: TokenKind = TokenKind("STRING");
pub const ID: TokenKind = TokenKind("ID");
pub const INT_LIT: TokenKind = TokenKind("INT_LIT");
pub const DEC_LIT: TokenKind = TokenKind("DEC_LIT");
pub const STRING_LIT: TokenKind = TokenKind("STRING_LIT");
pub const EQUAL: TokenKind = TokenKind("EQUAL");
pub const PLUS: TokenKind = TokenKind("PLUS");
pub const WS: TokenKind = TokenKind("WS");
pub const NEWLINE: TokenKind = TokenKind("NEWLINE");

const RULES: &[(TokenKind, &str, Channel)] = &[
    (SET, "set", Channel::DEFAULT),
    (DISPLAY, "display", Channel::DEFAULT),
    (INPUT, "input", Channel::DEFAULT),
    (IS, "is", Channel::DEFAULT),
    (INT, "int", Channel::DEFAULT),
    (DEC, "dec", Channel::DEFAULT),
    (STRING, "string", Channel::DEFAULT),
    (ID, "[A-Za-z][A-Za-z0-9_]*", Channel::DEFAULT),
    (DEC_LIT, r"[0-9]+\.[0-9]+", Channel::DEFAULT),
    (INT_LIT, "[0-9]+", Channel::DEFAULT),
    (STRING_LIT, r#""[^"\r\n]*""#, Channel::DEFAULT),
    (EQUAL, "=", Channel::DEFAULT),
    (PLUS, r"\+", Channel::DEFAULT),
    (WS, "[ \t]+", Channel::HIDDEN),
    (NEWLINE, r"\r\n|\r|\n", Channel::HIDDEN),
];

#[derive(Debug)]
struct LexRule {
    kind: TokenKind,
    pattern: Regex,
    channel: Channel,
}

/// Compiled token patterns, shared by every lexer a parser creates
#[derive(Debug)]
pub struct LexerRules {
    rules: Vec<LexRule>,
}

impl LexerRules {
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn compile() -> Result<Self, regex::Error> {
        let rules = RULES
            .iter()
            .map(|&(kind, pattern, channel)| {
                Ok(LexRule {
                    kind,
                    pattern: Regex::new(&format!("^(?:{pattern})"))?,
                    channel,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Longest rule match at the start of `rest`
    fn longest_match<'a>(&'a self, rest: &str) -> Option<(&'a LexRule, usize)> {
        let mut best: Option<(&LexRule, usize)> = None;
        for rule in &self.rules {
            if let Some(found) = rule.pattern.find(rest) {
                let len = found.end();
                if len > 0 && best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((rule, len));
                }
            }
        }
        best
    }
}

pub struct SimpleLexer {
    rules: Rc<LexerRules>,
    input: String,
}

impl SimpleLexer {
    pub fn new(rules: Rc<LexerRules>, input: impl Into<String>) -> Self {
        Self {
            rules,
            input: input.into(),
        }
    }
}

impl FrontEndLexer for SimpleLexer {
    fn tokenize(&mut self, listener: &mut dyn ErrorListener) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut point = Point::START;

        while offset < self.input.len() {
            let rest = &self.input[offset..];
            match self.rules.longest_match(rest) {
                Some((rule, len)) => {
                    let text = &rest[..len];
                    tokens.push(
                        Token::new(rule.kind, text, point, tokens.len()).on_channel(rule.channel),
                    );
                    point = point.advance(text);
                    offset += len;
                }
                None => {
                    let Some(c) = rest.chars().next() else {
                        break;
                    };
                    let text = c.to_string();
                    trace!(%point, character = %c, "Unrecognized character");
                    listener.report(
                        Issue::lexical(format!("token recognition error at: '{c}'"))
                            .with_position(Some(Position::of_text(point, &text))),
                    );
                    point = point.advance(&text);
                    offset += c.len_utf8();
                }
            }
        }

        tokens.push(Token::eof(point, tokens.len()));
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> (Vec<Token>, Vec<Issue>) {
        let mut issues = Vec::new();
        let rules = Rc::new(LexerRules::compile().unwrap());
        let tokens = SimpleLexer::new(rules, input).tokenize(&mut issues);
        (tokens, issues)
    }

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens
            .iter()
            .filter(|t| t.is_default_channel())
            .map(|t| t.kind.name())
            .collect()
    }

    #[test]
    fn test_keywords_win_ties_identifiers_win_longer_matches() {
        let (tokens, issues) = lex("set settings = display");
        assert!(issues.is_empty());
        assert_eq!(kinds(&tokens), vec!["SET", "ID", "EQUAL", "DISPLAY", "EOF"]);
    }

    #[test]
    fn test_literals() {
        let (tokens, _) = lex(r#"12 3.5 "hi there" x1+2"#);
        assert_eq!(
            kinds(&tokens),
            vec!["INT_LIT", "DEC_LIT", "STRING_LIT", "ID", "PLUS", "INT_LIT", "EOF"]
        );
        assert_eq!(tokens[4].text, "\"hi there\"");
    }

    #[test]
    fn test_points_cross_lines() {
        let (tokens, _) = lex("set a = 1\r\ndisplay a");
        let display = tokens.iter().find(|t| t.is(DISPLAY)).unwrap();
        assert_eq!(display.start, Point::new(2, 0));
        let eof = tokens.last().unwrap();
        assert!(eof.is_eof());
        assert_eq!(eof.start, Point::new(2, 9));
    }

    #[test]
    fn test_unknown_characters_are_skipped_and_reported() {
        let (tokens, issues) = lex("set $x");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, Some(Position::from_coords(1, 4, 1, 5)));
        let id = tokens.iter().find(|t| t.is(ID)).unwrap();
        assert_eq!(id.start, Point::new(1, 5));
    }

    #[test]
    fn test_whitespace_is_hidden() {
        let (tokens, _) = lex("a \n b");
        let hidden: Vec<_> = tokens.iter().filter(|t| !t.is_default_channel()).collect();
        assert_eq!(hidden.len(), 3);
        assert!(hidden.iter().all(|t| t.channel == Channel::HIDDEN));
    }
}
