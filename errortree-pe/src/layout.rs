//! Byte offsets of the image header fields read by this crate.
//!
//! The layout assumes a 32-bit (PE32) optional header. Offsets in the
//! `SIGNATURE_RELATIVE` group are relative to the position of the `PE\0\0`
//! signature, whose own offset from the image base is stored at
//! [`SIGNATURE_OFFSET_POINTER`].
//!
//! ```text
//! base + 0x3C                  -> u32 signature offset
//! signature + 0                -> "PE\0\0" (4 bytes)
//! signature + 4                -> COFF file header (20 bytes)
//! signature + 24               -> optional header
//!   + 4    size of code
//!   + 16   address of entry point
//!   + 20   base of code
//!   + 56   size of image
//!   + 144  debug data directory (virtual address, size)
//! ```

/// Offset from the image base of the `u32` holding the signature offset.
pub const SIGNATURE_OFFSET_POINTER: u64 = 0x3C;

/// Size of the `PE\0\0` signature.
pub const SIGNATURE_SIZE: u64 = 4;

/// Size of the COFF file header following the signature.
pub const COFF_HEADER_SIZE: u64 = 20;

/// Start of the optional header, relative to the signature.
pub const OPTIONAL_HEADER: u64 = SIGNATURE_SIZE + COFF_HEADER_SIZE;

/// `SizeOfCode`, relative to the signature.
pub const SIZE_OF_CODE: u64 = OPTIONAL_HEADER + 4;

/// `AddressOfEntryPoint`, relative to the signature.
pub const ADDRESS_OF_ENTRY_POINT: u64 = OPTIONAL_HEADER + 16;

/// `BaseOfCode`, relative to the signature.
pub const BASE_OF_CODE: u64 = OPTIONAL_HEADER + 20;

/// `SizeOfImage`, relative to the signature.
pub const SIZE_OF_IMAGE: u64 = OPTIONAL_HEADER + 56;

/// The debug entry of the data directory array, relative to the signature.
pub const DEBUG_DATA_DIRECTORY: u64 = OPTIONAL_HEADER + 144;

/// Offsets inside one `IMAGE_DEBUG_DIRECTORY` entry.
pub mod debug_directory {
    /// `TimeDateStamp` (u32).
    pub const TIME_DATE_STAMP: u64 = 4;
    /// `MajorVersion` (u16).
    pub const MAJOR_VERSION: u64 = 8;
    /// `MinorVersion` (u16).
    pub const MINOR_VERSION: u64 = 10;
    /// `Type` (u32).
    pub const TYPE: u64 = 12;
    /// `SizeOfData` (u32).
    pub const SIZE_OF_DATA: u64 = 16;
    /// `AddressOfRawData` (u32), relative to the image base.
    pub const ADDRESS_OF_RAW_DATA: u64 = 20;
    /// `PointerToRawData` (u32), a file offset.
    pub const POINTER_TO_RAW_DATA: u64 = 24;
}

/// Offsets inside the debug-data blob referenced by a debug directory entry.
pub mod debug_data {
    /// Format signature, e.g. `RSDS` for CodeView 7.0.
    pub const SIGNATURE: u64 = 0;
    /// 16-byte identifier.
    pub const IDENTIFIER: u64 = 4;
    /// Length of [`IDENTIFIER`].
    pub const IDENTIFIER_SIZE: usize = 16;
    /// Age counter (u32).
    pub const AGE: u64 = 20;
    /// Start of the file name; everything up to the declared data size.
    pub const FILE_NAME: u64 = 24;
    /// Largest file name length accepted, in bytes.
    pub const MAX_FILE_NAME_SIZE: u32 = 4096;
}
