//! The interface an exception must expose to be reported.
//!
//! [`ReportableError`] is implemented by the host for whatever object it
//! reports. The builder only ever reads through this trait; it does not know
//! about any particular exception family. [`ErrorRecord`](crate::ErrorRecord)
//! is a ready-made owned implementation.

use alloc::{string::String, vec::Vec};

use indexmap::IndexMap;

use crate::descriptors::{MethodDescriptor, TypeDescriptor};

/// Key/value diagnostics attached to an exception.
pub type DataMap = IndexMap<String, serde_json::Value, rustc_hash::FxBuildHasher>;

/// The data bag as shared between an exception and its report.
///
/// Reports hold a clone of the [`triomphe::Arc`], never a deep copy.
pub type ReportData = triomphe::Arc<DataMap>;

/// Returns a fresh, empty [`ReportData`].
pub fn empty_data() -> ReportData {
    triomphe::Arc::new(DataMap::default())
}

/// How many exceptions an exception wraps.
pub enum CauseShape<'a> {
    /// Nothing is wrapped.
    None,
    /// Exactly one wrapped cause.
    Single(&'a dyn ReportableError),
    /// A composite of parallel causes, in order. May be empty.
    Multiple(Vec<&'a dyn ReportableError>),
}

impl core::fmt::Debug for CauseShape<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CauseShape::None => f.write_str("None"),
            CauseShape::Single(_) => f.write_str("Single(..)"),
            CauseShape::Multiple(causes) => write!(f, "Multiple([..; {}])", causes.len()),
        }
    }
}

/// An exception as seen by the report builder.
pub trait ReportableError {
    /// The exception's runtime type.
    fn type_descriptor(&self) -> &TypeDescriptor;

    /// The textual call stack, if the runtime produced one.
    fn stack_trace_text(&self) -> Option<&str>;

    /// The call stack frames captured for this exception, top of the stack
    /// (the throw site) first. `None` when no frames could be captured.
    fn captured_frames(&self) -> Option<&[CapturedFrame]>;

    /// The wrapped exception(s).
    fn cause_shape(&self) -> CauseShape<'_>;

    /// The attached diagnostics.
    fn data(&self) -> &ReportData;

    /// The name of the implementing type.
    ///
    /// A value and its first field can share an address, so cycle detection
    /// identifies an exception by its address together with this name. The
    /// provided implementation is the only meaningful one.
    fn concrete_type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// The address of a frame in natively compiled code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeLocation {
    /// The instruction pointer of the frame.
    pub instruction_address: u64,
    /// The load address of the module containing it.
    pub module_base_address: u64,
}

/// One call stack entry as captured by the host.
///
/// # Examples
///
/// ```
/// use errortree::{descriptors::MethodDescriptor, exception::CapturedFrame};
///
/// let managed = CapturedFrame::managed(MethodDescriptor::new("Main"))
///     .with_location("Program.cs", 12)
///     .with_instruction_offset(0x1F);
/// assert!(managed.native.is_none());
///
/// let native = CapturedFrame::native(0x7FF6_1000_1234, 0x7FF6_1000_0000);
/// assert!(native.method.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CapturedFrame {
    /// The executing method, if known.
    pub method: Option<MethodDescriptor>,
    /// The source file, if known.
    pub file_name: Option<String>,
    /// The source line; `Some(0)` is treated like `None`.
    pub line_number: Option<u32>,
    /// Offset of the current instruction within the method body.
    pub instruction_offset: u32,
    /// Set when the frame runs natively compiled code.
    pub native: Option<NativeLocation>,
}

impl CapturedFrame {
    /// A frame executing `method` in managed code.
    pub fn managed(method: MethodDescriptor) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    /// A frame in natively compiled code.
    pub fn native(instruction_address: u64, module_base_address: u64) -> Self {
        Self {
            native: Some(NativeLocation {
                instruction_address,
                module_base_address,
            }),
            ..Self::default()
        }
    }

    /// Sets the source file and line.
    #[must_use]
    pub fn with_location(mut self, file_name: impl Into<String>, line_number: u32) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }

    /// Sets the instruction offset.
    #[must_use]
    pub fn with_instruction_offset(mut self, instruction_offset: u32) -> Self {
        self.instruction_offset = instruction_offset;
        self
    }

    /// The source line, or the instruction offset when no line is known.
    pub fn line_or_offset(&self) -> u32 {
        self.line_number
            .filter(|&line| line != 0)
            .unwrap_or(self.instruction_offset)
    }
}
