#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![forbid(unsafe_code)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Turns exceptions and the exceptions they wrap into serializable
//! error-report trees.
//!
//! ## Overview
//!
//! A crash reporter needs more than an error message: it needs the type of
//! every exception involved, the call stacks they were thrown from, the
//! diagnostics attached to them and how they wrap one another. This crate
//! collects all of that into an [`ErrorNode`] tree that a transport can
//! serialize and ship to a collector.
//!
//! ## Quick Example
//!
//! ```
//! use errortree::{ErrorRecord, build, descriptors::TypeDescriptor};
//!
//! let failure = ErrorRecord::new(TypeDescriptor::new("App.SyncFailed", "SyncFailed"))
//!     .with_stack_trace("   at App.Sync.Run()")
//!     .with_data("account", 42)
//!     .with_causes([
//!         ErrorRecord::new(TypeDescriptor::new("System.TimeoutException", "TimeoutException")),
//!         ErrorRecord::new(TypeDescriptor::new("System.IO.IOException", "IOException")),
//!     ]);
//!
//! let report = build(&failure);
//! assert_eq!(report.children().len(), 2);
//!
//! let json = serde_json::to_value(&report).unwrap();
//! assert_eq!(json["typeName"], "App.SyncFailed");
//! assert_eq!(json["innerErrors"][1]["typeName"], "System.IO.IOException");
//! ```
//!
//! ## Core Concepts
//!
//! The host describes its exceptions through the [`ReportableError`] trait,
//! or builds [`ErrorRecord`]s when it has no type of its own. Each exception
//! exposes its type as a [`TypeDescriptor`](descriptors::TypeDescriptor),
//! optional stack trace text, optional captured frames, its
//! [`CauseShape`](exception::CauseShape) and a shared data bag.
//!
//! [`ErrorTreeBuilder`] walks that graph and produces one [`ErrorNode`] per
//! exception:
//! - The **message** is the stack trace text, or [`NO_STACK_TRACE_MESSAGE`].
//! - The **type name** has generic arguments expanded, like
//!   `System.Collections.Generic.List<Int32>`.
//! - The **frames** are never empty; an exception without a call stack gets
//!   the [`StackFrame::no_frames`] sentinel.
//! - The **cause** is a [`CauseLink`] telling a single wrapped exception apart
//!   from a composite of parallel ones.
//!
//! ## Native frames
//!
//! Frames running natively compiled code carry the address of their module.
//! The builder reads that module's debug directory entry straight out of
//! memory through a [`MemoryReader`], using
//! [`errortree_pe::read_debug_info`]. A frame whose module cannot be read
//! keeps its addresses and goes without debug info; the rest of the report
//! is unaffected.
//!
//! ## Cycles
//!
//! An exception that shows up again among its own causes is replaced by a
//! [`CYCLE_DETECTED_MESSAGE`] marker node. This can be turned off through
//! [`BuildOptions::detect_cycles`].

extern crate alloc;

mod builder;
pub mod descriptors;
pub mod exception;
pub mod formatting;
pub mod frames;
pub mod prelude;
mod record;
mod report;

pub use errortree_pe::{
    self, DebugInfoError, MemoryImage, MemoryReader, NativeDebugInfo, ReadError,
    UnreadableMemory,
};

pub use self::{
    builder::{
        BuildOptions, CYCLE_DETECTED_MESSAGE, ErrorTreeBuilder, NO_STACK_TRACE_MESSAGE, build,
    },
    exception::ReportableError,
    record::ErrorRecord,
    report::{CauseLink, ErrorNode, NO_FRAMES_FILE_NAME, NodeIter, StackFrame},
};
