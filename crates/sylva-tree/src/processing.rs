//! Whole-tree passes: parent fix-up, position stripping and checks

use crate::node::NodeRef;
use crate::position::Position;
use crate::traversal::walk;
use std::fmt;
use tracing::trace;

/// Make every child's parent link point at the node holding it.
///
/// The root's own parent link is left as is. Idempotent.
pub fn assign_parents(root: &NodeRef) {
    let mut count = 0usize;
    for node in walk(root) {
        for child in node.children() {
            child.set_parent(Some(&node));
            count += 1;
        }
    }
    trace!(root = %root.qualified_name(), links = count, "Assigned parents");
}

/// Drop origins and position overrides from every node of the tree
pub fn clear_positions(root: &NodeRef) {
    for node in walk(root) {
        node.clear_position();
    }
}

/// Why a node's position is not acceptable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionProblem {
    /// No override and no origin-derived position
    Missing,
    /// Invalid points or `start > end`
    Malformed(Position),
    /// Not contained in the parent's position
    OutsideParent { position: Position, parent: Position },
}

impl fmt::Display for PositionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing position"),
            Self::Malformed(position) => write!(f, "malformed position {position}"),
            Self::OutsideParent { position, parent } => {
                write!(f, "position {position} escapes parent position {parent}")
            }
        }
    }
}

/// Nodes whose position is missing, malformed, or outside their parent's.
///
/// Parents without a position impose no constraint.
pub fn invalid_positions(root: &NodeRef) -> impl Iterator<Item = (NodeRef, PositionProblem)> + use<> {
    walk(root).filter_map(|node| check(&node).map(|problem| (node, problem)))
}

fn check(node: &NodeRef) -> Option<PositionProblem> {
    let Some(position) = node.position() else {
        return Some(PositionProblem::Missing);
    };
    if !position.is_valid() {
        return Some(PositionProblem::Malformed(position));
    }
    let parent = node.parent().and_then(|p| p.position())?;
    if parent.contains(&position) {
        None
    } else {
        Some(PositionProblem::OutsideParent { position, parent })
    }
}
