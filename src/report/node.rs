use alloc::{boxed::Box, string::String, vec::Vec};
use core::slice;

use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    exception::ReportData,
    report::{frame::StackFrame, iter::NodeIter},
};

/// One exception in an error-report tree.
///
/// Nodes are produced by [`ErrorTreeBuilder`](crate::ErrorTreeBuilder) and
/// are immutable afterwards. The data bag is shared with the exception the
/// node was built from.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    message: String,
    type_name: String,
    frames: Vec<StackFrame>,
    data: ReportData,
    cause: CauseLink,
}

/// The exception(s) wrapped by an [`ErrorNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum CauseLink {
    /// Nothing is wrapped.
    None,
    /// Exactly one wrapped exception.
    Single(Box<ErrorNode>),
    /// The parallel causes of a composite exception, in order.
    Multiple(Vec<ErrorNode>),
}

impl CauseLink {
    /// The wrapped nodes as a slice, whatever the shape.
    pub fn as_slice(&self) -> &[ErrorNode] {
        match self {
            CauseLink::None => &[],
            CauseLink::Single(node) => slice::from_ref(&**node),
            CauseLink::Multiple(nodes) => nodes,
        }
    }

    /// Whether this is [`CauseLink::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, CauseLink::None)
    }
}

impl ErrorNode {
    pub(crate) fn new(
        message: String,
        type_name: String,
        frames: Vec<StackFrame>,
        data: ReportData,
        cause: CauseLink,
    ) -> Self {
        Self {
            message,
            type_name,
            frames,
            data,
            cause,
        }
    }

    /// The exception's stack trace text, or a sentinel message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The formatted type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The call stack, top of the stack first. Never empty.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// The attached diagnostics.
    pub fn data(&self) -> &ReportData {
        &self.data
    }

    /// The wrapped exception(s).
    pub fn cause(&self) -> &CauseLink {
        &self.cause
    }

    /// The direct children of this node.
    pub fn children(&self) -> &[ErrorNode] {
        self.cause.as_slice()
    }

    /// Iterates over this node and all its descendants, depth first.
    ///
    /// ```
    /// use errortree::{ErrorRecord, build, descriptors::TypeDescriptor};
    ///
    /// let record = |name: &str| ErrorRecord::new(TypeDescriptor::new(name, name));
    /// let root = build(&record("A").with_causes([record("B").with_cause(record("C")), record("D")]));
    ///
    /// let names: Vec<&str> = root.iter().map(|node| node.type_name()).collect();
    /// assert_eq!(names, ["A", "B", "C", "D"]);
    /// ```
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter::new(self)
    }
}

/// Data bags compare by contents.
impl PartialEq for ErrorNode {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.type_name == other.type_name
            && self.frames == other.frames
            && *self.data == *other.data
            && self.cause == other.cause
    }
}

impl<'a> IntoIterator for &'a ErrorNode {
    type Item = &'a ErrorNode;
    type IntoIter = NodeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for ErrorNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.cause.is_none() { 4 } else { 5 };
        let mut state = serializer.serialize_struct("ErrorNode", len)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("typeName", &self.type_name)?;
        state.serialize_field("frames", &self.frames)?;
        state.serialize_field("data", &*self.data)?;
        match &self.cause {
            CauseLink::None => {}
            CauseLink::Single(node) => state.serialize_field("innerError", node)?,
            CauseLink::Multiple(nodes) => state.serialize_field("innerErrors", nodes)?,
        }
        state.end()
    }
}
