//! The two-stage parsing pipeline

use crate::config::PipelineConfig;
use crate::frontend::{ErrorListener, FrontEndLexer, FrontEndParser};
use crate::parse_tree::{ParseNode, TokenPositions};
use crate::result::{FirstStageResult, LexingResult, ParsingResult};
use crate::token::TokenStream;
use crate::{Error, Result};
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;
use sylva_tree::{Issue, NodeRef, Position, Severity, assign_parents, clear_positions};
use tracing::{debug, warn};

/// A language parser built from a front-end lexer/parser pair and a
/// mapping from parse trees to ASTs.
///
/// Implementors supply the four required methods; the pipeline itself
/// (`parse_first_stage`, `parse`, `lex`) comes for free.
pub trait AstParser {
    type Lexer: FrontEndLexer;
    type Parser: FrontEndParser;

    /// # Errors
    ///
    /// A lexer that cannot be built aborts the run.
    fn create_lexer(&self, input: &str) -> Result<Self::Lexer>;

    /// # Errors
    ///
    /// A parser that cannot be built aborts the run.
    fn create_parser(&self, tokens: TokenStream) -> Result<Self::Parser>;

    /// Run the grammar's entry rule. Defaults to the first rule the parser
    /// declares.
    fn invoke_entry_rule(
        &self,
        parser: &mut Self::Parser,
        listener: &mut dyn ErrorListener,
    ) -> Option<Rc<ParseNode>> {
        let entry = *parser.rule_names().first()?;
        parser.parse_rule(entry, listener)
    }

    /// Map a parse tree to an AST, reporting problems into `issues`
    ///
    /// # Errors
    ///
    /// Fatal transformation failures.
    fn map_to_ast(
        &self,
        root: &Rc<ParseNode>,
        track_positions: bool,
        issues: &mut Vec<Issue>,
    ) -> Result<Option<NodeRef>>;

    /// Runs on the AST after parents are assigned. Defaults to identity.
    fn post_process_ast(&self, root: NodeRef, issues: &mut Vec<Issue>) -> NodeRef {
        let _ = issues;
        root
    }

    /// Lex and parse `input` into a parse tree.
    ///
    /// Front-end errors, unconsumed input and error markers in the tree
    /// become issues.
    ///
    /// # Errors
    ///
    /// Fails only when the lexer or parser cannot be created.
    fn parse_first_stage(&self, input: &str, measure_lexing_time: bool) -> Result<FirstStageResult> {
        let started = Instant::now();
        let mut issues: Vec<Issue> = Vec::new();

        let mut lexer = self.create_lexer(input)?;
        let lexing_started = Instant::now();
        let tokens = lexer.tokenize(&mut issues);
        let lexing_time = measure_lexing_time.then(|| lexing_started.elapsed());
        let token_count = tokens.len();

        let mut parser = self.create_parser(TokenStream::new(input, tokens))?;
        let root = self.invoke_entry_rule(&mut parser, &mut issues);

        if !parser.tokens().at_eof() {
            let end_of_input = parser.tokens().last().map(Position::of_token_end);
            issues.push(Issue::syntactic("whole input not consumed").with_position(end_of_input));
        }

        if let Some(root) = &root {
            for marker in root.error_markers() {
                issues.push(Issue::syntactic("error node found").with_position(Some(marker.position())));
            }
        }

        let time = started.elapsed();
        debug!(
            tokens = token_count,
            issues = issues.len(),
            elapsed_us = time.as_micros() as u64,
            "First stage completed"
        );

        Ok(FirstStageResult {
            code: input.to_string(),
            root,
            issues,
            time,
            lexing_time,
            token_count,
        })
    }

    /// Parse with the default configuration
    ///
    /// # Errors
    ///
    /// See [`AstParser::parse_with`].
    fn parse(&self, input: &str) -> Result<ParsingResult> {
        self.parse_with(input, &PipelineConfig::default())
    }

    /// Full pipeline: first stage, AST mapping, parent assignment,
    /// post-processing, then position stripping unless positions are
    /// tracked.
    ///
    /// # Errors
    ///
    /// Front-end construction failures and fatal transformation errors.
    /// Malformed input never fails.
    fn parse_with(&self, input: &str, config: &PipelineConfig) -> Result<ParsingResult> {
        let started = Instant::now();
        let first_stage = self.parse_first_stage(input, config.measure_lexing_time)?;
        let mut issues = first_stage.issues.clone();

        let ast = match &first_stage.root {
            Some(tree) => self.map_to_ast(tree, config.track_positions, &mut issues)?,
            None => None,
        };

        let root = ast.map(|ast| {
            assign_parents(&ast);
            let ast = self.post_process_ast(ast, &mut issues);
            if !config.track_positions {
                clear_positions(&ast);
            }
            ast
        });

        let time = started.elapsed();
        debug!(
            issues = issues.len(),
            elapsed_us = time.as_micros() as u64,
            "Parse completed"
        );

        Ok(ParsingResult {
            code: input.to_string(),
            root,
            issues,
            first_stage: Some(first_stage),
            time,
        })
    }

    /// Parse a UTF-8 file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, plus what
    /// [`AstParser::parse_with`] fails on.
    fn parse_file(&self, path: &Path, config: &PipelineConfig) -> Result<ParsingResult> {
        let input =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        debug!(path = %path.display(), bytes = input.len(), "Parsing file");
        self.parse_with(&input, config)
    }

    /// Tokens of `input` with lexical diagnostics.
    ///
    /// A token sequence not ending in end of input gets a warning.
    ///
    /// # Errors
    ///
    /// Fails only when the lexer cannot be created.
    fn lex(&self, input: &str, only_default_channel: bool) -> Result<LexingResult> {
        let started = Instant::now();
        let mut issues: Vec<Issue> = Vec::new();
        let mut lexer = self.create_lexer(input)?;
        let mut tokens = lexer.tokenize(&mut issues);

        match tokens.last() {
            Some(last) if last.is_eof() => {}
            last => {
                warn!(last = ?last.map(|t| t.kind), "Lexer did not reach end of input");
                issues.push(
                    Issue::syntactic("lexer did not reach end of input")
                        .with_severity(Severity::Warning)
                        .with_position(last.map(Position::of_token_end)),
                );
            }
        }

        if only_default_channel {
            tokens.retain(|t| t.is_default_channel());
        }

        Ok(LexingResult {
            code: input.to_string(),
            tokens,
            issues,
            time: started.elapsed(),
        })
    }
}
