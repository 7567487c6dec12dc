use alloc::{boxed::Box, string::String, vec::Vec};

use crate::{
    descriptors::TypeDescriptor,
    exception::{CapturedFrame, CauseShape, ReportData, ReportableError, empty_data},
};

/// An owned exception description.
///
/// `ErrorRecord` lets a host describe an exception and its causes without
/// implementing [`ReportableError`] itself.
///
/// # Examples
///
/// ```
/// use errortree::{ErrorRecord, descriptors::TypeDescriptor, exception::ReportableError};
///
/// let inner = ErrorRecord::new(TypeDescriptor::new("System.IO.IOException", "IOException"));
/// let outer = ErrorRecord::new(TypeDescriptor::new("App.SaveException", "SaveException"))
///     .with_stack_trace("   at App.Save()")
///     .with_data("path", "settings.json")
///     .with_cause(inner);
///
/// assert_eq!(outer.stack_trace_text(), Some("   at App.Save()"));
/// assert_eq!(outer.data()["path"], "settings.json");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    type_descriptor: TypeDescriptor,
    stack_trace_text: Option<String>,
    frames: Option<Vec<CapturedFrame>>,
    causes: RecordCauses,
    data: ReportData,
}

#[derive(Debug, Clone)]
enum RecordCauses {
    None,
    Single(Box<ErrorRecord>),
    Multiple(Vec<ErrorRecord>),
}

impl ErrorRecord {
    /// An exception of the given type with no stack, causes or data.
    pub fn new(type_descriptor: TypeDescriptor) -> Self {
        Self {
            type_descriptor,
            stack_trace_text: None,
            frames: None,
            causes: RecordCauses::None,
            data: empty_data(),
        }
    }

    /// Sets the textual call stack.
    #[must_use]
    pub fn with_stack_trace(mut self, text: impl Into<String>) -> Self {
        self.stack_trace_text = Some(text.into());
        self
    }

    /// Sets the captured frames.
    #[must_use]
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = CapturedFrame>) -> Self {
        self.frames = Some(frames.into_iter().collect());
        self
    }

    /// Makes `cause` the single wrapped exception.
    #[must_use]
    pub fn with_cause(mut self, cause: ErrorRecord) -> Self {
        self.causes = RecordCauses::Single(Box::new(cause));
        self
    }

    /// Makes this a composite exception wrapping `causes`, in order.
    #[must_use]
    pub fn with_causes(mut self, causes: impl IntoIterator<Item = ErrorRecord>) -> Self {
        self.causes = RecordCauses::Multiple(causes.into_iter().collect());
        self
    }

    /// Adds one diagnostic entry.
    ///
    /// If the data bag is already shared, it is copied first so that other
    /// holders keep seeing the old contents.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        triomphe::Arc::make_mut(&mut self.data).insert(key.into(), value.into());
        self
    }

    /// Replaces the data bag with a shared one.
    #[must_use]
    pub fn with_shared_data(mut self, data: ReportData) -> Self {
        self.data = data;
        self
    }
}

impl ReportableError for ErrorRecord {
    fn type_descriptor(&self) -> &TypeDescriptor {
        &self.type_descriptor
    }

    fn stack_trace_text(&self) -> Option<&str> {
        self.stack_trace_text.as_deref()
    }

    fn captured_frames(&self) -> Option<&[CapturedFrame]> {
        self.frames.as_deref()
    }

    fn cause_shape(&self) -> CauseShape<'_> {
        match &self.causes {
            RecordCauses::None => CauseShape::None,
            RecordCauses::Single(cause) => CauseShape::Single(&**cause),
            RecordCauses::Multiple(causes) => CauseShape::Multiple(
                causes
                    .iter()
                    .map(|cause| cause as &dyn ReportableError)
                    .collect(),
            ),
        }
    }

    fn data(&self) -> &ReportData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(ErrorRecord: Send, Sync, Clone);

    fn record(name: &str) -> ErrorRecord {
        ErrorRecord::new(TypeDescriptor::new(name, name))
    }

    #[test]
    fn test_cause_shapes() {
        assert!(matches!(record("A").cause_shape(), CauseShape::None));

        let single = record("A").with_cause(record("B"));
        let CauseShape::Single(cause) = single.cause_shape() else {
            panic!("expected a single cause");
        };
        assert_eq!(cause.type_descriptor().name(), "B");

        let multiple = record("A").with_causes([record("B"), record("C")]);
        let CauseShape::Multiple(causes) = multiple.cause_shape() else {
            panic!("expected multiple causes");
        };
        let names: Vec<&str> = causes.iter().map(|c| c.type_descriptor().name()).collect();
        assert_eq!(names, ["B", "C"]);

        let empty = record("A").with_causes(Vec::new());
        assert!(matches!(empty.cause_shape(), CauseShape::Multiple(causes) if causes.is_empty()));
    }

    #[test]
    fn test_data_is_copied_on_write_when_shared() {
        let shared = empty_data();
        let first = record("A").with_shared_data(shared.clone());
        let second = first.clone().with_data("key", 1);

        assert!(first.data().is_empty());
        assert!(shared.is_empty());
        assert_eq!(second.data()["key"], 1);
        assert!(triomphe::Arc::ptr_eq(first.data(), &shared));
    }

    #[test]
    fn test_frames_and_stack_text() {
        let plain = record("A");
        assert_eq!(plain.stack_trace_text(), None);
        assert_eq!(plain.captured_frames(), None);

        let with_frames = record("A")
            .with_stack_trace("at Main()")
            .with_frames([CapturedFrame::native(0x10, 0)]);
        assert_eq!(with_frames.stack_trace_text(), Some("at Main()"));
        assert_eq!(with_frames.captured_frames().map(<[_]>::len), Some(1));
    }
}
