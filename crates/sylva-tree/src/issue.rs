//! Diagnostics collected while lexing, parsing and transforming
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage an issue was raised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    Lexical,
    Syntactic,
    Semantic,
}

/// Severity level, ordered `Info < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Named argument attached to an issue, for message templating downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueArg {
    pub name: String,
    pub value: String,
}

/// A diagnostic. Issues are values: they are collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,

    pub message: String,

    pub severity: Severity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Machine-readable code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<IssueArg>,
}

impl Issue {
    /// Create an issue with `Error` severity
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Error,
            position: None,
            code: None,
            args: Vec::new(),
        }
    }

    pub fn lexical(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Lexical, message)
    }

    pub fn syntactic(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Syntactic, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Semantic, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(IssueArg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Above `Info`
    pub fn is_blocking(&self) -> bool {
        self.severity > Severity::Info
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {:?}", self.severity, self.kind)?;
        if let Some(position) = &self.position {
            write!(f, " at {position}")?;
        }
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        write!(f, ": {}", self.message)
    }
}
