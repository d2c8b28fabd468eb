//! Source trees consumed by transformations

use crate::position::{HasPosition, Position};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Upcasting helpers so `Rc<dyn Source>` can be downcast to concrete types
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A node of any tree a transformer can read from: a front-end parse tree,
/// another AST, or a test fixture.
///
/// Factories are dispatched on [`Source::type_name`] first, then on each of
/// [`Source::supertype_names`] in order.
pub trait Source: AsAny + fmt::Debug {
    /// Most specific type name
    fn type_name(&self) -> String;

    /// Supertype names, nearest first
    fn supertype_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn position(&self) -> Option<Position> {
        None
    }

    fn source_text(&self) -> Option<String> {
        None
    }
}

impl dyn Source {
    /// Type name followed by all supertype names
    pub fn type_chain(&self) -> Vec<String> {
        let mut chain = vec![self.type_name()];
        chain.extend(self.supertype_names());
        chain
    }

    pub fn downcast_ref<T: Source>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Source>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Downcast a shared source to its concrete type
pub fn downcast_rc<T: Source>(source: &Rc<dyn Source>) -> Option<Rc<T>> {
    Rc::clone(source).into_any_rc().downcast::<T>().ok()
}

impl HasPosition for dyn Source {
    fn position(&self) -> Option<Position> {
        Source::position(self)
    }
}

/// Raw value read from a source: nothing, one source node, or a collection
#[derive(Debug, Clone, Default)]
pub enum SourceValue {
    #[default]
    Absent,
    One(Rc<dyn Source>),
    Many(Vec<Rc<dyn Source>>),
}

impl SourceValue {
    /// Wrap a concrete source node
    pub fn one<S: Source>(source: Rc<S>) -> Self {
        SourceValue::One(source)
    }

    /// Wrap concrete source nodes
    pub fn many<S: Source>(sources: impl IntoIterator<Item = Rc<S>>) -> Self {
        SourceValue::Many(
            sources
                .into_iter()
                .map(|s| s as Rc<dyn Source>)
                .collect(),
        )
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SourceValue::Absent)
    }
}

impl From<Rc<dyn Source>> for SourceValue {
    fn from(source: Rc<dyn Source>) -> Self {
        SourceValue::One(source)
    }
}

impl From<Option<Rc<dyn Source>>> for SourceValue {
    fn from(source: Option<Rc<dyn Source>>) -> Self {
        source.map_or(SourceValue::Absent, SourceValue::One)
    }
}

impl From<Vec<Rc<dyn Source>>> for SourceValue {
    fn from(sources: Vec<Rc<dyn Source>>) -> Self {
        SourceValue::Many(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Leaf;

    impl Source for Leaf {
        fn type_name(&self) -> String {
            "Leaf".to_string()
        }

        fn supertype_names(&self) -> Vec<String> {
            vec!["Expr".to_string(), "Any".to_string()]
        }
    }

    #[test]
    fn test_type_chain_most_specific_first() {
        let leaf: Rc<dyn Source> = Rc::new(Leaf);
        assert_eq!(leaf.type_chain(), vec!["Leaf", "Expr", "Any"]);
    }

    #[test]
    fn test_downcast() {
        let leaf: Rc<dyn Source> = Rc::new(Leaf);
        assert!(leaf.is::<Leaf>());
        assert!(leaf.downcast_ref::<Leaf>().is_some());
        assert!(downcast_rc::<Leaf>(&leaf).is_some());
    }

    #[test]
    fn test_source_value_conversions() {
        assert!(SourceValue::from(None::<Rc<dyn Source>>).is_absent());
        assert!(matches!(SourceValue::one(Rc::new(Leaf)), SourceValue::One(_)));
        match SourceValue::many(vec![Rc::new(Leaf), Rc::new(Leaf)]) {
            SourceValue::Many(items) => assert_eq!(items.len(), 2),
            other => panic!("Expected Many, got {other:?}"),
        }
    }
}
