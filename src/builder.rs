//! Recursive construction of error-report trees.

use alloc::{boxed::Box, string::String, vec, vec::Vec};

use errortree_pe::{MemoryReader, UnreadableMemory};
use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::{
    exception::{CauseShape, ReportableError},
    formatting::format_type_name,
    frames::StackFrameExtractor,
    report::{CauseLink, ErrorNode, StackFrame},
};

/// The message of a node whose exception has no stack trace text.
///
/// This is the only message sentinel. An exception with stack text but no
/// captured frames keeps its text as the message and is recognised by its
/// [`StackFrame::no_frames`] frame instead.
pub const NO_STACK_TRACE_MESSAGE: &str = "StackTrace is null";

/// The message of the marker node that replaces a repeated exception.
pub const CYCLE_DETECTED_MESSAGE: &str = "Cycle detected";

/// Options controlling how a report tree is built.
///
/// # Examples
///
/// ```
/// use errortree::BuildOptions;
///
/// let options = BuildOptions {
///     fully_qualified_type_names: false,
///     ..BuildOptions::DEFAULT
/// };
/// assert!(options.detect_cycles);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildOptions {
    /// Replace an exception that already appears on the path from the root
    /// with a [`CYCLE_DETECTED_MESSAGE`] marker node.
    pub detect_cycles: bool,
    /// Decode the debug directory of native frames' modules.
    pub read_native_debug_info: bool,
    /// Use namespace-qualified type names for the nodes.
    pub fully_qualified_type_names: bool,
}

impl BuildOptions {
    /// Every option enabled.
    pub const DEFAULT: Self = Self {
        detect_cycles: true,
        read_native_debug_info: true,
        fully_qualified_type_names: true,
    };
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builds an [`ErrorNode`] tree from an exception and its causes.
///
/// # Examples
///
/// ```
/// use errortree::{CauseLink, ErrorRecord, ErrorTreeBuilder, descriptors::TypeDescriptor};
/// use errortree::UnreadableMemory;
///
/// let record = ErrorRecord::new(TypeDescriptor::new("App.Outer", "Outer"))
///     .with_stack_trace("   at App.Run()")
///     .with_cause(ErrorRecord::new(TypeDescriptor::new("App.Inner", "Inner")));
///
/// let root = ErrorTreeBuilder::new(UnreadableMemory).build(&record);
/// assert_eq!(root.message(), "   at App.Run()");
///
/// let CauseLink::Single(inner) = root.cause() else { unreachable!() };
/// assert_eq!(inner.type_name(), "App.Inner");
/// assert_eq!(inner.message(), errortree::NO_STACK_TRACE_MESSAGE);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorTreeBuilder<M> {
    extractor: StackFrameExtractor<M>,
    options: BuildOptions,
}

type VisitedSet = HashSet<(usize, &'static str), FxBuildHasher>;

impl<M: MemoryReader> ErrorTreeBuilder<M> {
    /// A builder using [`BuildOptions::DEFAULT`] and reading native images
    /// through `memory`.
    pub fn new(memory: M) -> Self {
        Self::with_options(memory, BuildOptions::DEFAULT)
    }

    /// A builder with explicit options.
    pub fn with_options(memory: M, options: BuildOptions) -> Self {
        Self {
            extractor: StackFrameExtractor::new(memory)
                .with_native_debug_info(options.read_native_debug_info),
            options,
        }
    }

    /// The options in use.
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// The frame extractor in use.
    pub fn extractor(&self) -> &StackFrameExtractor<M> {
        &self.extractor
    }

    /// Builds the report tree rooted at `exception`.
    pub fn build(&self, exception: &dyn ReportableError) -> ErrorNode {
        let mut visited = VisitedSet::default();
        self.build_node(exception, &mut visited, 0)
    }

    fn build_node(
        &self,
        exception: &dyn ReportableError,
        visited: &mut VisitedSet,
        depth: usize,
    ) -> ErrorNode {
        let type_name = format_type_name(
            exception.type_descriptor(),
            self.options.fully_qualified_type_names,
        );

        let identity = identity(exception);
        if self.options.detect_cycles && !visited.insert(identity) {
            tracing::warn!(
                type_name = %type_name,
                depth,
                "cycle detected in exception causes"
            );
            return ErrorNode::new(
                String::from(CYCLE_DETECTED_MESSAGE),
                type_name,
                vec![StackFrame::no_frames()],
                exception.data().clone(),
                CauseLink::None,
            );
        }

        tracing::trace!(type_name = %type_name, depth, "building error node");

        let message = match exception.stack_trace_text() {
            Some(text) if !text.trim().is_empty() => String::from(text),
            _ => String::from(NO_STACK_TRACE_MESSAGE),
        };
        let frames = self.extractor.extract(exception);
        let data = exception.data().clone();

        let cause = match exception.cause_shape() {
            CauseShape::None => CauseLink::None,
            CauseShape::Single(cause) => {
                CauseLink::Single(Box::new(self.build_node(cause, visited, depth + 1)))
            }
            CauseShape::Multiple(causes) => CauseLink::Multiple(
                causes
                    .into_iter()
                    .map(|cause| self.build_node(cause, visited, depth + 1))
                    .collect::<Vec<_>>(),
            ),
        };

        if self.options.detect_cycles {
            visited.remove(&identity);
        }

        ErrorNode::new(message, type_name, frames, data, cause)
    }
}

/// Exceptions are identified by address and concrete type, not by value.
///
/// A value never holds another value of its own type inline, so the pair
/// tells an exception apart from a cause stored in its first field.
fn identity(exception: &dyn ReportableError) -> (usize, &'static str) {
    let address = (exception as *const dyn ReportableError).cast::<()>() as usize;
    (address, exception.concrete_type_name())
}

/// Builds a report tree with [`BuildOptions::DEFAULT`] for an exception
/// that has no native frames to decode.
///
/// Native frames still appear in the tree, without debug info.
///
/// ```
/// use errortree::{ErrorRecord, build, descriptors::TypeDescriptor};
///
/// let root = build(&ErrorRecord::new(TypeDescriptor::of::<core::fmt::Error>()));
/// assert_eq!(root.type_name(), "core::fmt::Error");
/// assert!(root.frames()[0].is_sentinel());
/// ```
pub fn build(exception: &dyn ReportableError) -> ErrorNode {
    ErrorTreeBuilder::new(UnreadableMemory).build(exception)
}
