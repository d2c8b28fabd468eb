//! Parse tree to AST factories

use crate::ast::{
    CompilationUnit, DecLiteral, DisplayStatement, InputDeclaration, IntLiteral, SetStatement,
    StringLiteral, SumExpression, ValueReference,
};
use crate::grammar::{EXPRESSION, STATEMENT};
use crate::lexer::{DEC, ID, INT, STRING};
use anyhow::{Context, anyhow, bail};
use std::rc::Rc;
use sylva_pipeline::{ParseNode, RuleKind};
use sylva_transform::Transformer;
use sylva_tree::{ReferenceByName, Source, SourceValue, downcast_rc};

fn parse_node(source: &Rc<dyn Source>) -> anyhow::Result<Rc<ParseNode>> {
    downcast_rc::<ParseNode>(source)
        .ok_or_else(|| anyhow!("expected a parse node, got {}", source.type_name()))
}

/// The `index`-th child matching `rule`
fn nth_of(source: &Rc<dyn Source>, rule: &RuleKind, index: usize) -> anyhow::Result<SourceValue> {
    Ok(parse_node(source)?
        .nodes_of(rule)
        .into_iter()
        .nth(index)
        .map_or(SourceValue::Absent, SourceValue::one))
}

fn first_expression(source: &Rc<dyn Source>) -> anyhow::Result<SourceValue> {
    nth_of(source, &EXPRESSION, 0)
}

/// Register the factories turning the grammar's parse trees into AST nodes
pub fn register_mappings(transformer: &mut Transformer) {
    transformer
        .register_kind_factory::<CompilationUnit>("compilationUnit")
        .with_child("statements", |source| {
            Ok(SourceValue::many(parse_node(source)?.nodes_of(&STATEMENT)))
        });

    // Statements that recovered before their keyword told them apart
    transformer.register_node_factory("statement", |source, _| {
        bail!("unrecognized statement '{}'", parse_node(source)?.text())
    });

    transformer
        .register_node_factory("setStatement", |source, transformer| {
            let tree = parse_node(source)?;
            let variable = tree.token_of(ID).context("set statement without a variable")?;
            let node = transformer.create::<SetStatement>()?;
            node.set_property("variable", variable.text.as_str())?;
            Ok(node)
        })
        .with_child("value", first_expression);

    transformer
        .register_kind_factory::<DisplayStatement>("displayStatement")
        .with_child("value", first_expression);

    transformer.register_node_factory("inputDeclaration", |source, transformer| {
        let tree = parse_node(source)?;
        let name = tree.token_of(ID).context("input declaration without a name")?;
        let declared_type = [INT, DEC, STRING]
            .into_iter()
            .find_map(|kind| tree.token_of(kind))
            .context("input declaration without a type")?;
        let node = transformer.create::<InputDeclaration>()?;
        node.set_property("name", name.text.as_str())?;
        node.set_property("type", declared_type.text.as_str())?;
        Ok(node)
    });

    transformer.register_node_factory("intLiteral", |source, transformer| {
        let text = source_text(source)?;
        let value: i64 = text
            .parse()
            .with_context(|| format!("integer literal {text} out of range"))?;
        let node = transformer.create::<IntLiteral>()?;
        node.set_property("value", value)?;
        Ok(node)
    });

    transformer.register_node_factory("decLiteral", |source, transformer| {
        let text = source_text(source)?;
        let value: f64 = text
            .parse()
            .with_context(|| format!("invalid decimal literal {text}"))?;
        let node = transformer.create::<DecLiteral>()?;
        node.set_property("value", value)?;
        Ok(node)
    });

    transformer.register_node_factory("stringLiteral", |source, transformer| {
        let text = source_text(source)?;
        let node = transformer.create::<StringLiteral>()?;
        node.set_property("value", text.trim_matches('"'))?;
        Ok(node)
    });

    transformer.register_node_factory("valueReference", |source, transformer| {
        let node = transformer.create::<ValueReference>()?;
        node.set_reference("variable", ReferenceByName::new(source_text(source)?))?;
        Ok(node)
    });

    transformer
        .register_kind_factory::<SumExpression>("sumExpression")
        .with_child("left", |source| nth_of(source, &EXPRESSION, 0))
        .with_child("right", |source| nth_of(source, &EXPRESSION, 1));
}

fn source_text(source: &Rc<dyn Source>) -> anyhow::Result<String> {
    Ok(parse_node(source)?.text().to_string())
}
