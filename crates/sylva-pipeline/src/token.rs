//! Tokens produced by a front-end lexer

use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use sylva_tree::{Point, Position};

/// Token type, named by the front-end grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenKind(pub &'static str);

impl TokenKind {
    /// End of input
    pub const EOF: TokenKind = TokenKind("EOF");

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Token channel; parsers only see [`Channel::DEFAULT`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Channel(pub u32);

impl Channel {
    pub const DEFAULT: Channel = Channel(0);
    /// Whitespace, comments and other tokens kept for tooling only
    pub const HIDDEN: Channel = Channel(1);
}

impl Default for Channel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Point,
    /// Index in the full token sequence, hidden tokens included
    pub index: usize,
    pub channel: Channel,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: Point, index: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            index,
            channel: Channel::DEFAULT,
        }
    }

    /// End-of-input token at `start`
    pub fn eof(start: Point, index: usize) -> Self {
        Self::new(TokenKind::EOF, "", start, index)
    }

    #[must_use]
    pub fn on_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Point right after the token's text
    pub fn end(&self) -> Point {
        self.start.advance(&self.text)
    }

    pub fn position(&self) -> Position {
        Position::new(self.start, self.end())
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EOF
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_default_channel(&self) -> bool {
        self.channel == Channel::DEFAULT
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} at {}", self.kind, self.text, self.start)
    }
}

/// Fully materialized tokens of a source text plus a cursor over the
/// default channel
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    source: Rc<str>,
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn new(source: impl Into<Rc<str>>, tokens: Vec<Token>) -> Self {
        let mut stream = Self {
            source: source.into(),
            tokens,
            cursor: 0,
        };
        stream.skip_off_channel();
        stream
    }

    /// Text the tokens were lexed from
    pub fn source(&self) -> &Rc<str> {
        &self.source
    }

    /// Every token, hidden ones included
    pub fn all(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// Default-channel tokens
    pub fn default_channel(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_default_channel())
    }

    /// Current default-channel token, `None` once past the last one
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// Default-channel token `k` places after the current one
    pub fn lookahead(&self, k: usize) -> Option<&Token> {
        self.tokens[self.cursor.min(self.tokens.len())..]
            .iter()
            .filter(|t| t.is_default_channel())
            .nth(k)
    }

    /// True when the current token is end of input, or nothing is left
    pub fn at_eof(&self) -> bool {
        self.current().is_none_or(Token::is_eof)
    }

    /// Consume the current token. End of input is never consumed.
    pub fn advance(&mut self) -> Option<Token> {
        let token = self.current()?.clone();
        if !token.is_eof() {
            self.cursor += 1;
            self.skip_off_channel();
        }
        Some(token)
    }

    /// Index of the cursor in the full sequence
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn skip_off_channel(&mut self) {
        while self
            .tokens
            .get(self.cursor)
            .is_some_and(|t| !t.is_default_channel())
        {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD: TokenKind = TokenKind("WORD");
    const WS: TokenKind = TokenKind("WS");

    fn stream() -> TokenStream {
        TokenStream::new(" ab\ncd", vec![
            Token::new(WS, " ", Point::new(1, 0), 0).on_channel(Channel::HIDDEN),
            Token::new(WORD, "ab", Point::new(1, 1), 1),
            Token::new(WS, "\n", Point::new(1, 3), 2).on_channel(Channel::HIDDEN),
            Token::new(WORD, "cd", Point::new(2, 0), 3),
            Token::eof(Point::new(2, 2), 4),
        ])
    }

    #[test]
    fn test_token_end_follows_text() {
        let token = Token::new(WORD, "ab\ncde", Point::new(3, 4), 0);
        assert_eq!(token.end(), Point::new(4, 3));
        assert_eq!(token.position(), Position::from_coords(3, 4, 4, 3));
        assert!(Token::eof(Point::new(1, 0), 0).position().is_empty());
    }

    #[test]
    fn test_stream_skips_hidden_tokens() {
        let mut tokens = stream();
        assert_eq!(tokens.current().unwrap().text, "ab");
        assert_eq!(tokens.lookahead(1).unwrap().text, "cd");
        assert!(tokens.lookahead(2).unwrap().is_eof());

        assert_eq!(tokens.advance().unwrap().text, "ab");
        assert_eq!(tokens.current().unwrap().index, 3);
        tokens.advance();
        assert!(tokens.at_eof());

        // End of input stays current
        assert!(tokens.advance().unwrap().is_eof());
        assert!(tokens.at_eof());
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens.default_channel().count(), 3);
    }

    #[test]
    fn test_empty_stream_is_at_eof() {
        let mut tokens = TokenStream::new("", Vec::new());
        assert!(tokens.at_eof());
        assert!(tokens.advance().is_none());
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_token_serializes_kind_by_name() {
        let token = Token::new(WORD, "ab", Point::new(1, 1), 1);
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "WORD");
        assert_eq!(json["start"]["line"], 1);
    }
}
