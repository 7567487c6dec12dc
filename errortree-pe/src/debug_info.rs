//! Decoding of the image header and its first debug directory entry.
//!
//! See [`layout`](crate::layout) for the offsets involved. Every field is read
//! with exactly its declared width; values are passed through as found, so a
//! zero or implausible field is the caller's to interpret. The only value
//! that changes control flow is a zero debug directory address, which means
//! the image carries no debug information.

use alloc::{string::String, vec::Vec};

use crate::{
    layout::{self, debug_data, debug_directory},
    memory::{MemoryReader, ReadError},
};

/// Failure to decode the debug information of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DebugInfoError {
    /// One of the reads failed.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The declared debug-data size cannot hold the fixed blob header.
    #[error("debug data size {size} is smaller than the {minimum} byte header")]
    DataTooSmall {
        /// The declared `SizeOfData`.
        size: u32,
        /// The size of the fixed blob header.
        minimum: u32,
    },
    /// The declared debug-data size leaves more room for the file name than
    /// any real path needs.
    #[error("debug data file name of {length} bytes exceeds the {maximum} byte limit")]
    FileNameTooLong {
        /// The file name length implied by `SizeOfData`.
        length: u32,
        /// [`MAX_FILE_NAME_SIZE`](crate::layout::debug_data::MAX_FILE_NAME_SIZE).
        maximum: u32,
    },
}

/// A `(virtual address, size)` pair from the data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DataDirectory {
    /// Address relative to the image base.
    pub virtual_address: u32,
    /// Size in bytes.
    pub size: u32,
}

/// Header fields located on the way to the debug directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ImageHeader {
    /// Offset of the `PE\0\0` signature from the image base.
    pub signature_offset: u32,
    /// `SizeOfCode`.
    pub size_of_code: u32,
    /// `AddressOfEntryPoint`.
    pub address_of_entry_point: u32,
    /// `BaseOfCode`.
    pub base_of_code: u32,
    /// `SizeOfImage`.
    pub size_of_image: u32,
    /// The debug entry of the data directory array.
    pub debug_directory: DataDirectory,
}

/// The decoded first debug directory entry of an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NativeDebugInfo {
    /// The header fields that led to this entry.
    pub image: ImageHeader,
    /// `TimeDateStamp`.
    pub timestamp: u32,
    /// `MajorVersion`.
    pub major_version: u16,
    /// `MinorVersion`.
    pub minor_version: u16,
    /// `Type`. Not interpreted.
    pub debug_type: u32,
    /// `SizeOfData`: size of the debug-data blob.
    pub raw_data_size: u32,
    /// `AddressOfRawData`: blob address relative to the image base.
    pub raw_data_address: u32,
    /// `PointerToRawData`: blob offset in the file on disk.
    pub raw_data_file_offset: u32,
    /// The blob's format signature as stored (little-endian `RSDS` for
    /// CodeView 7.0 blobs).
    pub embedded_signature: [u8; 4],
    /// The blob's 16-byte identifier.
    pub debug_data_id: [u8; 16],
    /// The age counter following the identifier.
    pub age: u32,
    /// The file name stored after the blob header.
    pub debug_data_file_name: String,
}

impl NativeDebugInfo {
    /// The embedded signature as a little-endian integer.
    pub fn embedded_signature_value(&self) -> u32 {
        u32::from_le_bytes(self.embedded_signature)
    }
}

/// Reads fixed-width little-endian fields at offsets from one base address.
struct ImageCursor<'r, R: ?Sized> {
    base: u64,
    reader: &'r R,
}

impl<'r, R: MemoryReader + ?Sized> ImageCursor<'r, R> {
    fn new(base: u64, reader: &'r R) -> Self {
        Self { base, reader }
    }

    fn address(&self, offset: u64) -> Result<u64, ReadError> {
        self.base
            .checked_add(offset)
            .ok_or(ReadError::AddressOverflow {
                base: self.base,
                offset,
            })
    }

    fn offset(&self, first: u64, second: u64) -> Result<u64, ReadError> {
        first
            .checked_add(second)
            .ok_or(ReadError::AddressOverflow {
                base: self.base,
                offset: first,
            })
    }

    fn bytes<const N: usize>(&self, offset: u64) -> Result<[u8; N], ReadError> {
        let mut buffer = [0; N];
        self.reader.read_exact(self.address(offset)?, &mut buffer)?;
        Ok(buffer)
    }

    fn u16(&self, offset: u64) -> Result<u16, ReadError> {
        self.bytes(offset).map(u16::from_le_bytes)
    }

    fn u32(&self, offset: u64) -> Result<u32, ReadError> {
        self.bytes(offset).map(u32::from_le_bytes)
    }

    fn vec(&self, offset: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        self.reader.read(self.address(offset)?, length)
    }
}

/// Reads the header fields of the image loaded at `base`.
///
/// # Errors
///
/// Returns the first [`ReadError`] reported by `reader`, or
/// [`ReadError::AddressOverflow`] when an offset does not fit the address
/// space.
pub fn read_image_header<R>(base: u64, reader: &R) -> Result<ImageHeader, ReadError>
where
    R: MemoryReader + ?Sized,
{
    let cursor = ImageCursor::new(base, reader);
    let signature_offset = cursor.u32(layout::SIGNATURE_OFFSET_POINTER)?;
    let signature = u64::from(signature_offset);
    let at = |field| cursor.offset(signature, field);

    Ok(ImageHeader {
        signature_offset,
        size_of_code: cursor.u32(at(layout::SIZE_OF_CODE)?)?,
        address_of_entry_point: cursor.u32(at(layout::ADDRESS_OF_ENTRY_POINT)?)?,
        base_of_code: cursor.u32(at(layout::BASE_OF_CODE)?)?,
        size_of_image: cursor.u32(at(layout::SIZE_OF_IMAGE)?)?,
        debug_directory: DataDirectory {
            virtual_address: cursor.u32(at(layout::DEBUG_DATA_DIRECTORY)?)?,
            size: cursor.u32(at(layout::DEBUG_DATA_DIRECTORY + 4)?)?,
        },
    })
}

/// Reads the first debug directory entry of the image loaded at `base`.
///
/// Returns `Ok(None)` when the debug data directory address is zero.
///
/// # Errors
///
/// Returns [`DebugInfoError::Read`] when any read fails,
/// [`DebugInfoError::DataTooSmall`] when the declared blob size is smaller
/// than the blob header and [`DebugInfoError::FileNameTooLong`] when it is
/// implausibly large. Nothing is allocated for the file name before its
/// length is checked. No field values are made up on failure.
///
/// # Examples
///
/// ```
/// use errortree_pe::{DebugInfoError, MemoryImage, ReadError, read_debug_info};
///
/// // Too short to even hold the signature offset.
/// let image = MemoryImage::new(0x1000, &[0u8; 16]);
/// assert!(matches!(
///     read_debug_info(0x1000, &image),
///     Err(DebugInfoError::Read(ReadError::OutOfRange { .. }))
/// ));
/// ```
pub fn read_debug_info<R>(
    base: u64,
    reader: &R,
) -> Result<Option<NativeDebugInfo>, DebugInfoError>
where
    R: MemoryReader + ?Sized,
{
    let image = read_image_header(base, reader)?;
    if image.debug_directory.virtual_address == 0 {
        return Ok(None);
    }

    let cursor = ImageCursor::new(base, reader);
    let entry = u64::from(image.debug_directory.virtual_address);
    let field = |offset| cursor.offset(entry, offset);

    let timestamp = cursor.u32(field(debug_directory::TIME_DATE_STAMP)?)?;
    let major_version = cursor.u16(field(debug_directory::MAJOR_VERSION)?)?;
    let minor_version = cursor.u16(field(debug_directory::MINOR_VERSION)?)?;
    let debug_type = cursor.u32(field(debug_directory::TYPE)?)?;
    let raw_data_size = cursor.u32(field(debug_directory::SIZE_OF_DATA)?)?;
    let raw_data_address = cursor.u32(field(debug_directory::ADDRESS_OF_RAW_DATA)?)?;
    let raw_data_file_offset = cursor.u32(field(debug_directory::POINTER_TO_RAW_DATA)?)?;

    let minimum = debug_data::FILE_NAME as u32;
    let file_name_length = raw_data_size
        .checked_sub(minimum)
        .ok_or(DebugInfoError::DataTooSmall {
            size: raw_data_size,
            minimum,
        })?;
    if file_name_length > debug_data::MAX_FILE_NAME_SIZE {
        return Err(DebugInfoError::FileNameTooLong {
            length: file_name_length,
            maximum: debug_data::MAX_FILE_NAME_SIZE,
        });
    }

    let blob = u64::from(raw_data_address);
    let embedded_signature = cursor.bytes(cursor.offset(blob, debug_data::SIGNATURE)?)?;
    let debug_data_id = cursor.bytes(cursor.offset(blob, debug_data::IDENTIFIER)?)?;
    let age = cursor.u32(cursor.offset(blob, debug_data::AGE)?)?;
    let file_name = cursor.vec(
        cursor.offset(blob, debug_data::FILE_NAME)?,
        file_name_length as usize,
    )?;

    Ok(Some(NativeDebugInfo {
        image,
        timestamp,
        major_version,
        minor_version,
        debug_type,
        raw_data_size,
        raw_data_address,
        raw_data_file_offset,
        embedded_signature,
        debug_data_id,
        age,
        debug_data_file_name: decode_file_name(&file_name),
    }))
}

/// Lossy UTF-8 without the trailing NUL terminator(s).
fn decode_file_name(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
