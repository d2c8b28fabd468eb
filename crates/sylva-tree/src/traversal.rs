//! Lazy traversals and searches over node trees.
//!
//! Every entry point returns a fresh iterator; iterators are not restartable
//! and can be dropped at any time. Children are always visited in declared
//! property order.

use crate::node::NodeRef;
use crate::position::Position;
use std::rc::Rc;
use sylva_schema::NodeKind;

/// Depth-first pre-order walk, see [`walk`]
#[derive(Debug)]
pub struct Walk {
    stack: Vec<NodeRef>,
}

impl Iterator for Walk {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}

/// Walk `node` and everything under it, depth-first, `node` first
pub fn walk(node: &NodeRef) -> Walk {
    Walk {
        stack: vec![Rc::clone(node)],
    }
}

/// Depth-first post-order walk, see [`walk_leaves_first`]
#[derive(Debug)]
pub struct LeavesFirst {
    stack: Vec<(NodeRef, bool)>,
}

impl Iterator for LeavesFirst {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        loop {
            let (node, expanded) = self.stack.pop()?;
            if expanded {
                return Some(node);
            }
            let children = node.children();
            self.stack.push((node, true));
            self.stack
                .extend(children.into_iter().rev().map(|child| (child, false)));
        }
    }
}

/// Walk children before their parent; `node` comes last
pub fn walk_leaves_first(node: &NodeRef) -> LeavesFirst {
    LeavesFirst {
        stack: vec![(Rc::clone(node), false)],
    }
}

/// Parent chain, see [`walk_ancestors`]
#[derive(Debug)]
pub struct Ancestors {
    next: Option<NodeRef>,
}

impl Iterator for Ancestors {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Parent, grandparent, and so on up to the root.
///
/// Follows parent links as they are; run [`crate::assign_parents`] first if
/// they may be stale.
pub fn walk_ancestors(node: &NodeRef) -> Ancestors {
    Ancestors {
        next: node.parent(),
    }
}

/// A walker's output without the node it started from
#[derive(Debug)]
pub struct Descendants<I> {
    root: NodeRef,
    inner: I,
}

impl<I: Iterator<Item = NodeRef>> Iterator for Descendants<I> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let root = &self.root;
        self.inner.find(|n| !Rc::ptr_eq(n, root))
    }
}

/// Everything `walker(node)` yields except `node` itself.
///
/// Pass [`walk`] for pre-order or [`walk_leaves_first`] for post-order.
pub fn walk_descendants<I, W>(node: &NodeRef, walker: W) -> Descendants<I>
where
    I: Iterator<Item = NodeRef>,
    W: FnOnce(&NodeRef) -> I,
{
    Descendants {
        root: Rc::clone(node),
        inner: walker(node),
    }
}

/// Direct children only
pub fn walk_children(node: &NodeRef) -> std::vec::IntoIter<NodeRef> {
    node.children().into_iter()
}

/// First ancestor matching `predicate`
pub fn find_ancestor(node: &NodeRef, mut predicate: impl FnMut(&NodeRef) -> bool) -> Option<NodeRef> {
    walk_ancestors(node).find(|n| predicate(n))
}

/// First ancestor whose type is `K` or extends it
pub fn find_ancestor_of_type<K: NodeKind>(node: &NodeRef) -> Option<NodeRef> {
    find_ancestor(node, |n| n.is_kind::<K>())
}

/// First node of `walker(root)` matching `predicate(node, index)`.
///
/// With [`walk`] the root itself is a candidate; use
/// `|n| walk_descendants(n, walk)` to exclude it.
pub fn find<I, W>(
    root: &NodeRef,
    mut predicate: impl FnMut(&NodeRef, usize) -> bool,
    walker: W,
) -> Option<NodeRef>
where
    I: Iterator<Item = NodeRef>,
    W: FnOnce(&NodeRef) -> I,
{
    walker(root)
        .enumerate()
        .find(|(index, node)| predicate(node, *index))
        .map(|(_, node)| node)
}

/// Pruned walk, see [`walk_within`]
#[derive(Debug)]
pub struct WalkWithin {
    stack: Vec<NodeRef>,
    position: Position,
}

impl Iterator for WalkWithin {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        while let Some(node) = self.stack.pop() {
            if !self.position.overlaps(&node) {
                continue;
            }
            self.stack.extend(node.children().into_iter().rev());
            if self.position.contains(&node) {
                return Some(node);
            }
        }
        None
    }
}

/// Nodes inside `position`, skipping subtrees that do not overlap it.
///
/// Only correct when every parent's position contains its children's
/// positions. Nodes without a position are pruned with their subtree.
pub fn walk_within(root: &NodeRef, position: Position) -> WalkWithin {
    WalkWithin {
        stack: vec![Rc::clone(root)],
        position,
    }
}

/// Nodes whose position lies inside `position`, in pre-order.
///
/// With `self_contained` the search prunes through [`walk_within`];
/// otherwise every node is visited.
pub fn search_by_position(
    root: &NodeRef,
    position: Position,
    self_contained: bool,
) -> Box<dyn Iterator<Item = NodeRef>> {
    if self_contained {
        Box::new(walk_within(root, position))
    } else {
        Box::new(walk(root).filter(move |n| position.contains(n)))
    }
}

/// First node inside `position`.
///
/// Pre-order means the outermost such node is returned. With
/// `self_contained`, deeper nodes are only reachable through ancestors that
/// overlap the query, so the result is the nearest enclosing match on the
/// path from the root.
pub fn find_by_position(root: &NodeRef, position: Position, self_contained: bool) -> Option<NodeRef> {
    search_by_position(root, position, self_contained).next()
}

/// Nodes whose type is `K` or extends it, in pre-order
pub fn search_by_type<K: NodeKind>(root: &NodeRef) -> impl Iterator<Item = NodeRef> + use<K> {
    walk(root).filter(|n| n.is_kind::<K>())
}

/// Collected form of [`search_by_type`]
pub fn collect_by_type<K: NodeKind>(root: &NodeRef) -> Vec<NodeRef> {
    search_by_type::<K>(root).collect()
}
