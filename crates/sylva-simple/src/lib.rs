#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

//! # sylva-simple
//!
//! A small statement language on top of the sylva pipeline: a regex lexer,
//! a recursive-descent front-end with error recovery, an AST schema and the
//! factories mapping one to the other.
//!
//! ```text
//! input name is string
//! set greeting = "hello " + name
//! display greeting
//! ```
//!
//! Errors are the pipeline's: see [`sylva_pipeline::Error`].

pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod mapping;
pub mod parser;

pub use lexer::{LexerRules, SimpleLexer};
pub use grammar::SimpleFrontEnd;
pub use mapping::register_mappings;
pub use parser::SimpleParser;
