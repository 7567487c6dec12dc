#![no_std]
#![forbid(
    missing_docs,
    unsafe_code,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
//! Debug directory decoding for natively compiled modules.
//!
//! # Overview
//!
//! When a stack frame belongs to ahead-of-time compiled code, the only link
//! back to its debugging metadata is the debug directory embedded in the
//! owning module's Portable Executable header. This crate walks that header
//! directly in the loaded image, using fixed byte offsets, and decodes the
//! first debug directory entry together with the start of the debug-data blob
//! it points at (signature, identifier, age and file name).
//!
//! No operating system symbol API is involved. All memory access goes through
//! a single capability, [`MemoryReader`], which must report an invalid range
//! as an error instead of faulting. Every offset computation in this crate is
//! done on integers and returned byte buffers, never on raw pointers.
//!
//! # Architecture
//!
//! - **[`memory`]**: the [`MemoryReader`] capability and two simple
//!   implementations, [`MemoryImage`] (a byte slice mapped at an address) and
//!   [`UnreadableMemory`].
//! - **[`layout`]**: the byte offsets of every field that is read.
//! - **[`debug_info`]**: [`read_image_header`] and [`read_debug_info`], and the
//!   decoded [`ImageHeader`] and [`NativeDebugInfo`] values.
//!
//! # Example
//!
//! ```
//! use errortree_pe::{MemoryImage, read_debug_info};
//!
//! // An image without a PE signature pointer: all zero bytes.
//! let bytes = [0u8; 0x200];
//! let image = MemoryImage::new(0x1000, &bytes);
//!
//! // The debug directory address reads as zero, so there is no debug info.
//! assert_eq!(read_debug_info(0x1000, &image), Ok(None));
//! ```

extern crate alloc;

pub mod debug_info;
pub mod layout;
pub mod memory;

pub use debug_info::{
    DataDirectory, DebugInfoError, ImageHeader, NativeDebugInfo, read_debug_info,
    read_image_header,
};
pub use memory::{MemoryImage, MemoryReader, ReadError, UnreadableMemory};
