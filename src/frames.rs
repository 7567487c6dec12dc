//! Conversion of captured call stacks into report frames.

use alloc::{string::String, vec, vec::Vec};

use errortree_pe::{MemoryReader, NativeDebugInfo, read_debug_info};

use crate::{
    exception::{CapturedFrame, NativeLocation, ReportableError},
    formatting::{format_method_signature, format_type_name},
    report::StackFrame,
};

/// The declaring type reported for a frame whose method is unknown.
pub const UNKNOWN_DECLARING_TYPE: &str = "(unknown)";

/// The signature reported for a frame whose method is unknown.
pub const UNKNOWN_METHOD_SIGNATURE: &str = "<UnknownMethod>";

/// Turns an exception's captured frames into [`StackFrame`]s.
///
/// Native frames have their module's debug directory decoded through the
/// memory reader `M`. A frame whose module cannot be read keeps its
/// addresses and simply goes without debug info.
///
/// # Examples
///
/// ```
/// use errortree::{
///     ErrorRecord, StackFrame,
///     descriptors::{MethodDescriptor, TypeDescriptor},
///     exception::CapturedFrame,
///     frames::StackFrameExtractor,
/// };
/// use errortree::UnreadableMemory;
///
/// let method = MethodDescriptor::new("Main")
///     .with_declaring_type(TypeDescriptor::new("App.Program", "Program"));
/// let record = ErrorRecord::new(TypeDescriptor::new("App.Failure", "Failure"))
///     .with_frames([CapturedFrame::managed(method).with_location("Program.cs", 7)]);
///
/// let frames = StackFrameExtractor::new(UnreadableMemory).extract(&record);
/// assert_eq!(
///     frames,
///     [StackFrame::Managed {
///         declaring_type_name: "App.Program".into(),
///         method_signature: "Main()".into(),
///         file_name: Some("Program.cs".into()),
///         line_number: 7,
///     }]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct StackFrameExtractor<M> {
    memory: M,
    read_native_debug_info: bool,
}

impl<M: MemoryReader> StackFrameExtractor<M> {
    /// An extractor reading native images through `memory`.
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            read_native_debug_info: true,
        }
    }

    /// Enables or disables decoding of native debug directories.
    #[must_use]
    pub fn with_native_debug_info(mut self, enabled: bool) -> Self {
        self.read_native_debug_info = enabled;
        self
    }

    /// The memory reader used for native frames.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Extracts the frames of `exception`, in captured order.
    ///
    /// Never returns an empty sequence: an exception without captured frames
    /// yields the single [`StackFrame::no_frames`] sentinel.
    pub fn extract(&self, exception: &dyn ReportableError) -> Vec<StackFrame> {
        match exception.captured_frames() {
            Some(frames) if !frames.is_empty() => {
                frames.iter().map(|frame| self.extract_frame(frame)).collect()
            }
            _ => vec![StackFrame::no_frames()],
        }
    }

    /// Converts one captured frame.
    pub fn extract_frame(&self, frame: &CapturedFrame) -> StackFrame {
        if let Some(location) = frame.native {
            return self.native_frame(location);
        }

        let (declaring_type_name, method_signature) = match &frame.method {
            Some(method) => (
                method.declaring_type.as_ref().map_or_else(
                    || String::from(UNKNOWN_DECLARING_TYPE),
                    |ty| format_type_name(ty, true),
                ),
                format_method_signature(method),
            ),
            None => (
                String::from(UNKNOWN_DECLARING_TYPE),
                String::from(UNKNOWN_METHOD_SIGNATURE),
            ),
        };

        StackFrame::Managed {
            declaring_type_name,
            method_signature,
            file_name: frame.file_name.clone(),
            line_number: frame.line_or_offset(),
        }
    }

    fn native_frame(&self, location: NativeLocation) -> StackFrame {
        let debug_info = if self.read_native_debug_info {
            self.native_debug_info(location.module_base_address)
        } else {
            None
        };

        StackFrame::Native {
            instruction_address: location.instruction_address,
            module_base_address: location.module_base_address,
            debug_info,
        }
    }

    fn native_debug_info(&self, module_base_address: u64) -> Option<NativeDebugInfo> {
        match read_debug_info(module_base_address, &self.memory) {
            Ok(Some(info)) => Some(info),
            Ok(None) => {
                tracing::debug!(
                    module_base_address,
                    "native module has no debug directory entry"
                );
                None
            }
            Err(error) => {
                tracing::debug!(
                    module_base_address,
                    %error,
                    "failed to read native module debug info"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use errortree_pe::{MemoryImage, UnreadableMemory};

    use super::*;
    use crate::{
        ErrorRecord,
        descriptors::{MethodDescriptor, ParameterDescriptor, TypeDescriptor},
    };

    fn record() -> ErrorRecord {
        ErrorRecord::new(TypeDescriptor::new("App.Failure", "Failure"))
    }

    #[test]
    fn test_missing_or_empty_frames_yield_sentinel() {
        let extractor = StackFrameExtractor::new(UnreadableMemory);
        assert_eq!(extractor.extract(&record()), [StackFrame::no_frames()]);
        assert_eq!(
            extractor.extract(&record().with_frames(Vec::new())),
            [StackFrame::no_frames()]
        );
    }

    #[test]
    fn test_line_falls_back_to_instruction_offset() {
        let extractor = StackFrameExtractor::new(UnreadableMemory);
        let method = MethodDescriptor::new("Run");

        let without_line =
            CapturedFrame::managed(method.clone()).with_instruction_offset(0x4C);
        let zero_line = CapturedFrame::managed(method)
            .with_location("App.cs", 0)
            .with_instruction_offset(0x10);

        let StackFrame::Managed { line_number, file_name, .. } =
            extractor.extract_frame(&without_line)
        else {
            panic!("expected a managed frame");
        };
        assert_eq!((line_number, file_name), (0x4C, None));

        let StackFrame::Managed { line_number, file_name, .. } =
            extractor.extract_frame(&zero_line)
        else {
            panic!("expected a managed frame");
        };
        assert_eq!((line_number, file_name.as_deref()), (0x10, Some("App.cs")));
    }

    #[test]
    fn test_method_signature_and_declaring_type() {
        let extractor = StackFrameExtractor::new(UnreadableMemory);
        let method = MethodDescriptor::new("Add")
            .with_declaring_type(
                TypeDescriptor::new("App.Cache`1", "Cache`1")
                    .with_generic_argument(TypeDescriptor::new("System.String", "String")),
            )
            .with_parameter(ParameterDescriptor::new(
                "key",
                TypeDescriptor::new("System.String", "String"),
            ));

        let frame =
            extractor.extract_frame(&CapturedFrame::managed(method).with_location("Cache.cs", 40));
        assert_eq!(
            frame,
            StackFrame::Managed {
                declaring_type_name: "App.Cache<String>".into(),
                method_signature: "Add(String key)".into(),
                file_name: Some("Cache.cs".into()),
                line_number: 40,
            }
        );
    }

    #[test]
    fn test_unknown_method_placeholders() {
        let extractor = StackFrameExtractor::new(UnreadableMemory);
        let frame = extractor.extract_frame(&CapturedFrame::default());
        assert_eq!(
            frame,
            StackFrame::Managed {
                declaring_type_name: UNKNOWN_DECLARING_TYPE.into(),
                method_signature: UNKNOWN_METHOD_SIGNATURE.into(),
                file_name: None,
                line_number: 0,
            }
        );

        let no_declaring_type =
            extractor.extract_frame(&CapturedFrame::managed(MethodDescriptor::new("Run")));
        let StackFrame::Managed {
            declaring_type_name,
            method_signature,
            ..
        } = no_declaring_type
        else {
            panic!("expected a managed frame");
        };
        assert_eq!(declaring_type_name, UNKNOWN_DECLARING_TYPE);
        assert_eq!(method_signature, "Run()");
    }

    #[test]
    fn test_unreadable_native_frame_keeps_addresses() {
        let extractor = StackFrameExtractor::new(UnreadableMemory);
        let frame = extractor.extract_frame(&CapturedFrame::native(0x1010, 0x1000));
        assert_eq!(
            frame,
            StackFrame::Native {
                instruction_address: 0x1010,
                module_base_address: 0x1000,
                debug_info: None,
            }
        );
    }

    #[test]
    fn test_native_frame_takes_precedence_over_method() {
        let bytes = [0u8; 0x100];
        let extractor = StackFrameExtractor::new(MemoryImage::new(0x1000, &bytes));
        let mut frame = CapturedFrame::native(0x1010, 0x1000);
        frame.method = Some(MethodDescriptor::new("Ignored"));

        assert!(extractor.extract_frame(&frame).is_native());
    }

    #[test]
    fn test_disabled_native_debug_info_skips_reads() {
        struct PanickingReader;
        impl MemoryReader for PanickingReader {
            fn read_exact(&self, _: u64, _: &mut [u8]) -> Result<(), errortree_pe::ReadError> {
                panic!("memory must not be read");
            }
        }

        let extractor = StackFrameExtractor::new(PanickingReader).with_native_debug_info(false);
        let frame = extractor.extract_frame(&CapturedFrame::native(0x20, 0x10));
        assert_eq!(frame.debug_info(), None);
    }
}
