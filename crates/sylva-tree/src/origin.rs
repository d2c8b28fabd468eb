//! Where a node came from

use crate::node::{Node, NodeRef};
use crate::position::{HasPosition, Position};
use crate::source::{Source, downcast_rc};
use std::fmt;
use std::rc::Rc;

/// Origin of a node: a source-tree node, another AST node, or an explicit
/// synthetic location. A node without origin holds `None` instead.
#[derive(Clone)]
pub enum Origin {
    /// Node of a source tree (e.g. a front-end parse tree)
    Source(Rc<dyn Source>),

    /// AST node this one was derived from, in chained transformations
    Node(NodeRef),

    /// Explicit location and text, not backed by any tree
    Synthetic {
        position: Option<Position>,
        text: Option<String>,
    },
}

impl Origin {
    /// Wrap a source, recognising AST nodes
    pub fn from_source(source: &Rc<dyn Source>) -> Self {
        match downcast_rc::<Node>(source) {
            Some(node) => Origin::Node(node),
            None => Origin::Source(Rc::clone(source)),
        }
    }

    pub fn synthetic(position: Option<Position>, text: Option<String>) -> Self {
        Origin::Synthetic { position, text }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Origin::Source(source) => source.position(),
            Origin::Node(node) => node.position(),
            Origin::Synthetic { position, .. } => *position,
        }
    }

    pub fn source_text(&self) -> Option<String> {
        match self {
            Origin::Source(source) => source.source_text(),
            Origin::Node(node) => node.source_text(),
            Origin::Synthetic { text, .. } => text.clone(),
        }
    }

    /// The wrapped tree node, if any
    pub fn as_source(&self) -> Option<Rc<dyn Source>> {
        match self {
            Origin::Source(source) => Some(Rc::clone(source)),
            Origin::Node(node) => Some(Rc::clone(node) as Rc<dyn Source>),
            Origin::Synthetic { .. } => None,
        }
    }

    /// True when this origin wraps exactly `node`
    pub fn is_node(&self, node: &NodeRef) -> bool {
        matches!(self, Origin::Node(n) if Rc::ptr_eq(n, node))
    }
}

impl HasPosition for Origin {
    fn position(&self) -> Option<Position> {
        Origin::position(self)
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Source(source) => f
                .debug_struct("Source")
                .field("type", &source.type_name())
                .field("position", &source.position())
                .finish(),
            Origin::Node(node) => f
                .debug_struct("Node")
                .field("type", &node.descriptor().qualified_name().to_string())
                .field("position", &node.position())
                .finish(),
            Origin::Synthetic { position, text } => f
                .debug_struct("Synthetic")
                .field("position", position)
                .field("text", text)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Point;

    #[derive(Debug)]
    struct Token {
        text: &'static str,
        start: Point,
    }

    impl Source for Token {
        fn type_name(&self) -> String {
            "Token".to_string()
        }

        fn position(&self) -> Option<Position> {
            Some(Position::of_text(self.start, self.text))
        }

        fn source_text(&self) -> Option<String> {
            Some(self.text.to_string())
        }
    }

    #[test]
    fn test_source_origin() {
        let token: Rc<dyn Source> = Rc::new(Token {
            text: "display",
            start: Point::new(2, 0),
        });
        let origin = Origin::from_source(&token);

        assert!(matches!(origin, Origin::Source(_)));
        assert_eq!(origin.position(), Some(Position::from_coords(2, 0, 2, 7)));
        assert_eq!(origin.source_text().as_deref(), Some("display"));
        assert!(origin.as_source().is_some());
    }

    #[test]
    fn test_synthetic_origin() {
        let origin = Origin::synthetic(None, Some("generated".to_string()));
        assert!(origin.position().is_none());
        assert_eq!(origin.source_text().as_deref(), Some("generated"));
        assert!(origin.as_source().is_none());
    }
}
