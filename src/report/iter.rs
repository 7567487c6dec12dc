use alloc::{vec, vec::Vec};
use core::iter::FusedIterator;

use crate::report::node::ErrorNode;

/// An iterator over an error node and all its descendants in depth-first
/// order.
///
/// Each node is visited before its causes, and a cause's whole subtree is
/// visited before the next sibling.
#[must_use]
#[derive(Debug, Clone)]
pub struct NodeIter<'a> {
    stack: Vec<&'a ErrorNode>,
}

impl<'a> NodeIter<'a> {
    pub(crate) fn new(root: &'a ErrorNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a ErrorNode;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.stack.pop()?;
        self.stack.extend(cur.children().iter().rev());
        Some(cur)
    }
}

impl FusedIterator for NodeIter<'_> {}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use super::*;
    use crate::{
        exception::empty_data,
        report::{frame::StackFrame, node::CauseLink},
    };

    fn node(type_name: &str, cause: CauseLink) -> ErrorNode {
        ErrorNode::new(
            "m".into(),
            type_name.into(),
            vec![StackFrame::no_frames()],
            empty_data(),
            cause,
        )
    }

    #[test]
    fn test_depth_first_order() {
        let tree = node(
            "root",
            CauseLink::Multiple(vec![
                node(
                    "a",
                    CauseLink::Single(Box::new(node("a1", CauseLink::None))),
                ),
                node("b", CauseLink::None),
                node(
                    "c",
                    CauseLink::Multiple(vec![
                        node("c1", CauseLink::None),
                        node("c2", CauseLink::None),
                    ]),
                ),
            ]),
        );

        let order: Vec<&str> = tree.iter().map(ErrorNode::type_name).collect();
        assert_eq!(order, ["root", "a", "a1", "b", "c", "c1", "c2"]);
    }

    #[test]
    fn test_fused_after_exhaustion() {
        let tree = node("only", CauseLink::None);
        let mut iter = tree.iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }
}
