use alloc::string::String;
use core::fmt;

use errortree_pe::NativeDebugInfo;
use serde::Serialize;

/// The file name of the sentinel frame reported when an exception has no
/// captured frames.
pub const NO_FRAMES_FILE_NAME: &str = "none";

/// One entry of a reported call stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StackFrame {
    /// A frame executing managed (interpreted or JIT-compiled) code.
    Managed {
        /// Full name of the type declaring the method.
        declaring_type_name: String,
        /// The formatted method signature.
        method_signature: String,
        /// The source file, if known.
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        /// The source line, or the instruction offset when no line is known.
        line_number: u32,
    },
    /// A frame executing natively compiled code.
    Native {
        /// The instruction pointer of the frame.
        instruction_address: u64,
        /// The load address of the module containing it.
        module_base_address: u64,
        /// The module's debug directory entry. Absent when the module has
        /// none or it could not be read.
        #[serde(skip_serializing_if = "Option::is_none")]
        debug_info: Option<NativeDebugInfo>,
    },
}

impl StackFrame {
    /// The frame standing in for an empty or unavailable call stack.
    pub fn no_frames() -> Self {
        StackFrame::Managed {
            declaring_type_name: String::new(),
            method_signature: String::new(),
            file_name: Some(String::from(NO_FRAMES_FILE_NAME)),
            line_number: 0,
        }
    }

    /// Whether this is the [`no_frames`](Self::no_frames) sentinel.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::no_frames()
    }

    /// Whether this is a [`Native`](Self::Native) frame.
    pub fn is_native(&self) -> bool {
        matches!(self, StackFrame::Native { .. })
    }

    /// The decoded debug directory entry of a native frame.
    pub fn debug_info(&self) -> Option<&NativeDebugInfo> {
        match self {
            StackFrame::Native { debug_info, .. } => debug_info.as_ref(),
            StackFrame::Managed { .. } => None,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            return f.write_str("(no frames)");
        }

        match self {
            StackFrame::Managed {
                declaring_type_name,
                method_signature,
                file_name,
                line_number,
            } => {
                write!(f, "at {declaring_type_name}.{method_signature}")?;
                match file_name {
                    Some(file_name) => write!(f, " in {file_name}:line {line_number}"),
                    None => write!(f, " +{line_number:#x}"),
                }
            }
            StackFrame::Native {
                instruction_address,
                module_base_address,
                debug_info,
            } => {
                write!(f, "at {instruction_address:#x} in module {module_base_address:#x}")?;
                if let Some(info) = debug_info {
                    write!(f, " ({})", info.debug_data_file_name)?;
                }
                Ok(())
            }
        }
    }
}
