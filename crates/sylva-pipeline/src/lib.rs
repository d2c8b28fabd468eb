#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

//! # sylva-pipeline
//!
//! Two-stage parsing: a front-end lexer and parser produce a concrete parse
//! tree, which is then mapped to a sylva AST, given parent links and
//! optionally post-processed. Every recoverable problem along the way is an
//! [`Issue`](sylva_tree::Issue) in the result; only failures to build the
//! front-end itself, I/O and fatal transformation errors are `Err`.
//!
//! Implement [`AstParser`] for a language and call
//! [`AstParser::parse`]:
//!
//! ```ignore
//! let result = MyLanguageParser::new(registry).parse("set x = 1")?;
//! if !result.correct() {
//!     for issue in &result.issues {
//!         eprintln!("{issue}");
//!     }
//! }
//! ```

pub mod config;
pub mod frontend;
pub mod hooks;
pub mod parse_tree;
pub mod parser;
pub mod result;
pub mod token;

pub use config::PipelineConfig;
pub use frontend::{ErrorListener, FrontEndLexer, FrontEndParser};
pub use hooks::{ParseTreeHooks, ParseTreeTransformer};
pub use parse_tree::{ErrorMarker, ParseChild, ParseNode, RuleKind, TokenPositions};
pub use parser::AstParser;
pub use result::{FirstStageResult, LexingResult, ParsingResult};
pub use token::{Channel, Token, TokenKind, TokenStream};

use thiserror::Error;

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot create lexer: {0}")]
    Lexer(String),

    #[error("Cannot create parser: {0}")]
    Parser(String),

    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transform(#[from] sylva_transform::Error),

    #[error(transparent)]
    Tree(#[from] sylva_tree::Error),
}

impl Error {
    pub fn lexer(message: impl Into<String>) -> Self {
        Self::Lexer(message.into())
    }

    pub fn parser(message: impl Into<String>) -> Self {
        Self::Parser(message.into())
    }

    /// I/O failure with the path being read
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_path_and_cause() {
        let error = Error::io(
            "/tmp/missing.sy",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let message = error.to_string();
        assert!(message.contains("/tmp/missing.sy"));
        assert!(message.contains("no such file"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn construction_errors_name_the_stage() {
        assert_eq!(
            Error::lexer("bad pattern").to_string(),
            "Cannot create lexer: bad pattern"
        );
        assert_eq!(
            Error::parser("no rules").to_string(),
            "Cannot create parser: no rules"
        );
    }
}
