//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use errortree::prelude::*;
//!
//! let record = ErrorRecord::new(TypeDescriptor::of::<core::fmt::Error>());
//! let report = ErrorTreeBuilder::new(UnreadableMemory).build(&record);
//! assert_eq!(report.type_name(), "core::fmt::Error");
//! ```
//!
//! # What's Included
//!
//! - **[`ErrorTreeBuilder`]** and **[`BuildOptions`]**: Building report trees
//! - **[`ErrorNode`]**, **[`CauseLink`]** and **[`StackFrame`]**: The report
//!   model
//! - **[`ReportableError`]**, **[`ErrorRecord`]** and **[`CapturedFrame`]**:
//!   Describing exceptions
//! - **[`TypeDescriptor`]** and **[`MethodDescriptor`]**: Type metadata
//! - **[`MemoryReader`]** and its stock implementations

pub use crate::{
    BuildOptions, CauseLink, ErrorNode, ErrorRecord, ErrorTreeBuilder, MemoryImage, MemoryReader,
    ReportableError, StackFrame, UnreadableMemory,
    descriptors::{MethodDescriptor, ParameterDescriptor, TypeDescriptor},
    exception::{CapturedFrame, CauseShape},
};
