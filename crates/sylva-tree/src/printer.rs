//! Indented, schema-driven dump of a tree

use crate::node::{Node, PropertyValue};
use std::fmt::Write;

/// Render `node` and its subtree, one property per line.
///
/// ```text
/// simple.SetStatement [1:0-1:13]
///   variable = "foo"
///   value:
///     simple.IntLiteral [1:10-1:13]
///       value = 123
/// ```
pub fn debug_print(node: &Node) -> String {
    let mut out = String::new();
    print_node(node, 0, &mut out);
    out
}

fn print_node(node: &Node, depth: usize, out: &mut String) {
    indent(depth, out);
    out.push_str(&node.qualified_name().to_string());
    if let Some(position) = node.position() {
        let _ = write!(out, " [{position}]");
    }
    out.push('\n');

    for (property, value) in node.properties() {
        match value {
            PropertyValue::Absent => {}
            PropertyValue::Value(value) => {
                indent(depth + 1, out);
                let _ = writeln!(out, "{} = {value}", property.name);
            }
            PropertyValue::Reference(reference) => {
                indent(depth + 1, out);
                let _ = writeln!(out, "{} -> {}", property.name, reference.name());
            }
            PropertyValue::Child(child) => {
                indent(depth + 1, out);
                let _ = writeln!(out, "{}:", property.name);
                print_node(&child, depth + 2, out);
            }
            PropertyValue::Children(children) => {
                indent(depth + 1, out);
                let _ = writeln!(out, "{}: [{}]", property.name, children.len());
                for child in &children {
                    print_node(child, depth + 2, out);
                }
            }
        }
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
