//! Results of pipeline runs

use crate::parse_tree::ParseNode;
use crate::token::Token;
use std::rc::Rc;
use std::time::Duration;
use sylva_tree::{Issue, NodeRef, walk};

/// Output of lexing alone
#[derive(Debug, Clone)]
pub struct LexingResult {
    pub code: String,
    pub tokens: Vec<Token>,
    pub issues: Vec<Issue>,
    pub time: Duration,
}

impl LexingResult {
    /// No issue above `Info`
    pub fn correct(&self) -> bool {
        !self.issues.iter().any(Issue::is_blocking)
    }
}

/// Output of lexing and front-end parsing
#[derive(Debug, Clone)]
pub struct FirstStageResult {
    pub code: String,
    pub root: Option<Rc<ParseNode>>,
    pub issues: Vec<Issue>,
    pub time: Duration,
    /// Set when lexing time was measured
    pub lexing_time: Option<Duration>,
    /// Tokens lexed, hidden ones included
    pub token_count: usize,
}

impl FirstStageResult {
    pub fn correct(&self) -> bool {
        !self.issues.iter().any(Issue::is_blocking)
    }

    /// Rule nodes in the parse tree
    pub fn parse_node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.node_count())
    }
}

/// Output of a full parse
#[derive(Debug, Clone)]
pub struct ParsingResult {
    pub code: String,
    pub root: Option<NodeRef>,
    /// First-stage issues followed by mapping and post-processing issues
    pub issues: Vec<Issue>,
    pub first_stage: Option<FirstStageResult>,
    pub time: Duration,
}

impl ParsingResult {
    /// No issue above `Info`
    pub fn correct(&self) -> bool {
        !self.issues.iter().any(Issue::is_blocking)
    }

    /// AST nodes reachable from the root
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |root| walk(root).count())
    }

    pub fn lexing_time(&self) -> Option<Duration> {
        self.first_stage.as_ref().and_then(|s| s.lexing_time)
    }

    pub fn token_count(&self) -> usize {
        self.first_stage.as_ref().map_or(0, |s| s.token_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_tree::Severity;

    fn result(issues: Vec<Issue>) -> ParsingResult {
        ParsingResult {
            code: String::new(),
            root: None,
            issues,
            first_stage: None,
            time: Duration::ZERO,
        }
    }

    #[test]
    fn test_info_issues_keep_result_correct() {
        assert!(result(Vec::new()).correct());
        assert!(result(vec![Issue::semantic("note").with_severity(Severity::Info)]).correct());
    }

    #[test]
    fn test_warnings_and_errors_make_result_incorrect() {
        assert!(!result(vec![Issue::syntactic("odd").with_severity(Severity::Warning)]).correct());
        assert!(!result(vec![Issue::lexical("bad")]).correct());
    }

    #[test]
    fn test_counts_without_root() {
        let result = result(Vec::new());
        assert_eq!(result.node_count(), 0);
        assert_eq!(result.token_count(), 0);
        assert!(result.lexing_time().is_none());
    }
}
