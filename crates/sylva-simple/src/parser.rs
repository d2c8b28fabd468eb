//! The language's [`AstParser`]

use crate::ast::{InputDeclaration, SetStatement, ValueReference};
use crate::grammar::SimpleFrontEnd;
use crate::lexer::{LexerRules, SimpleLexer};
use crate::mapping::register_mappings;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use sylva_pipeline::{AstParser, Error, ParseNode, ParseTreeTransformer, Result, TokenStream};
use sylva_schema::SchemaRegistry;
use sylva_transform::TransformerConfig;
use sylva_tree::{Issue, NodeRef, walk};
use tracing::{debug, warn};

/// Parser for the statement language.
///
/// Post-processing links every variable use to the first statement
/// declaring that variable; uses with no declaration are reported.
#[derive(Debug)]
pub struct SimpleParser {
    rules: Rc<LexerRules>,
    mapper: ParseTreeTransformer,
}

impl SimpleParser {
    /// # Errors
    ///
    /// Fails when the token patterns do not compile.
    pub fn new(registry: Arc<SchemaRegistry>) -> Result<Self> {
        Self::with_config(registry, TransformerConfig::default())
    }

    /// # Errors
    ///
    /// Fails when the token patterns do not compile.
    pub fn with_config(registry: Arc<SchemaRegistry>, config: TransformerConfig) -> Result<Self> {
        let rules = LexerRules::compile().map_err(|e| Error::lexer(e.to_string()))?;
        let mut mapper = ParseTreeTransformer::with_config(registry, config);
        register_mappings(mapper.transformer_mut());
        Ok(Self {
            rules: Rc::new(rules),
            mapper,
        })
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.mapper.transformer().registry()
    }

    fn resolve_references(&self, root: &NodeRef, issues: &mut Vec<Issue>) {
        let mut declarations: HashMap<String, NodeRef> = HashMap::new();
        for node in walk(root) {
            let name = if node.is_kind::<SetStatement>() {
                node.property("variable")
            } else if node.is_kind::<InputDeclaration>() {
                node.property("name")
            } else {
                continue;
            };
            if let Some(name) = name.ok().flatten().and_then(|v| v.as_string()) {
                declarations.entry(name).or_insert(node);
            }
        }

        for node in walk(root).filter(|n| n.is_kind::<ValueReference>()) {
            let Ok(Some(mut reference)) = node.reference("variable") else {
                continue;
            };
            match declarations.get(reference.name()) {
                Some(declaration) => {
                    reference.resolve(declaration);
                    if let Err(error) = node.set_reference("variable", reference) {
                        warn!(%error, "Cannot store resolved reference");
                    }
                }
                None => {
                    debug!(name = reference.name(), "Unresolved reference");
                    issues.push(
                        Issue::semantic(format!("unresolved reference: {}", reference.name()))
                            .with_position(node.position()),
                    );
                }
            }
        }
    }
}

impl AstParser for SimpleParser {
    type Lexer = SimpleLexer;
    type Parser = SimpleFrontEnd;

    fn create_lexer(&self, input: &str) -> Result<SimpleLexer> {
        Ok(SimpleLexer::new(Rc::clone(&self.rules), input))
    }

    fn create_parser(&self, tokens: TokenStream) -> Result<SimpleFrontEnd> {
        Ok(SimpleFrontEnd::new(tokens))
    }

    fn map_to_ast(
        &self,
        root: &Rc<ParseNode>,
        _track_positions: bool,
        issues: &mut Vec<Issue>,
    ) -> Result<Option<NodeRef>> {
        self.mapper.map(root, issues)
    }

    fn post_process_ast(&self, root: NodeRef, issues: &mut Vec<Issue>) -> NodeRef {
        self.resolve_references(&root, issues);
        root
    }
}
