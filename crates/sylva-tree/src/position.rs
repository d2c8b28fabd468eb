//! Line/column points and source ranges
#![allow(clippy::must_use_candidate)] // Small value accessors read fine without #[must_use].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A location in source text.
///
/// Lines start at 1, columns at 0. Points order lexicographically by
/// `(line, column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    /// First position of any text
    pub const START: Point = Point { line: 1, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Lines are 1-based
    pub fn is_valid(&self) -> bool {
        self.line >= 1
    }

    /// Point reached after reading `text` from here.
    ///
    /// `\n`, `\r\n` and a lone `\r` each end a line. Columns count chars.
    pub fn advance(&self, text: &str) -> Point {
        let mut line = self.line;
        let mut column = self.column;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    column = 0;
                }
                '\n' => {
                    line += 1;
                    column = 0;
                }
                _ => column += 1,
            }
        }

        Point { line, column }
    }

    /// Empty position at this point
    pub fn as_position(&self) -> Position {
        Position::new(*self, *self)
    }

    /// Byte offset of this point in `code`, if it falls inside it
    pub fn offset_in(&self, code: &str) -> Option<usize> {
        if !self.is_valid() {
            return None;
        }

        let bytes = code.as_bytes();
        let mut line = 1;
        let mut line_start = 0;
        let mut index = 0;
        while line < self.line && index < bytes.len() {
            match bytes[index] {
                b'\r' if bytes.get(index + 1) == Some(&b'\n') => {
                    index += 2;
                    line += 1;
                    line_start = index;
                }
                b'\r' | b'\n' => {
                    index += 1;
                    line += 1;
                    line_start = index;
                }
                _ => index += 1,
            }
        }
        if line != self.line {
            return None;
        }

        let rest = &code[line_start..];
        let line_text = rest.split(['\r', '\n']).next().unwrap_or_default();
        let column = self.column as usize;
        if column == line_text.chars().count() {
            return Some(line_start + line_text.len());
        }
        line_text
            .char_indices()
            .nth(column)
            .map(|(offset, _)| line_start + offset)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range of source text from `start` up to `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Shorthand for `Position::new(Point::new(..), Point::new(..))`
    pub fn from_coords(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self::new(
            Point::new(start_line, start_column),
            Point::new(end_line, end_column),
        )
    }

    /// Range covering `text` when it starts at `start`
    pub fn of_text(start: Point, text: &str) -> Self {
        Self::new(start, start.advance(text))
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Both points valid and `start <= end`
    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid() && self.start <= self.end
    }

    /// True when `other` lies entirely within this range.
    ///
    /// Entities without a position are never contained.
    pub fn contains<P: HasPosition + ?Sized>(&self, other: &P) -> bool {
        other
            .position()
            .is_some_and(|o| self.start <= o.start && o.end <= self.end)
    }

    /// True when the two ranges share at least one point. Symmetric.
    pub fn overlaps<P: HasPosition + ?Sized>(&self, other: &P) -> bool {
        let Some(other) = other.position() else {
            return false;
        };
        let within = |p: Point, range: &Position| range.start <= p && p <= range.end;

        within(self.start, &other)
            || within(self.end, &other)
            || within(other.start, self)
            || within(other.end, self)
    }

    /// Smallest range covering both
    pub fn union(&self, other: &Position) -> Position {
        Position::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Slice of `code` covered by this range
    pub fn text_of<'a>(&self, code: &'a str) -> Option<&'a str> {
        let start = self.start.offset_in(code)?;
        let end = self.end.offset_in(code)?;
        code.get(start..end)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Anything a position can be derived from
pub trait HasPosition {
    fn position(&self) -> Option<Position>;
}

impl HasPosition for Position {
    fn position(&self) -> Option<Position> {
        Some(*self)
    }
}

impl HasPosition for Point {
    fn position(&self) -> Option<Position> {
        Some(self.as_position())
    }
}

impl<T: HasPosition> HasPosition for Option<T> {
    fn position(&self) -> Option<Position> {
        self.as_ref().and_then(HasPosition::position)
    }
}

impl<T: HasPosition + ?Sized> HasPosition for Rc<T> {
    fn position(&self) -> Option<Position> {
        (**self).position()
    }
}

impl<T: HasPosition + ?Sized> HasPosition for &T {
    fn position(&self) -> Option<Position> {
        (**self).position()
    }
}
