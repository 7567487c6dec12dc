//! The memory-read capability.
//!
//! [`MemoryReader`] is the only way this crate touches memory. An
//! implementation must answer an invalid range with a [`ReadError`]; it must
//! never fault. Implementations are expected to be usable concurrently when
//! they are `Sync`, as nothing in this crate keeps state between reads.

use alloc::{boxed::Box, vec, vec::Vec};

/// Failure to read a range of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The requested range is not (entirely) readable.
    #[error("cannot read {length} byte(s) at address {address:#x}")]
    OutOfRange {
        /// First address of the requested range.
        address: u64,
        /// Number of bytes requested.
        length: usize,
    },
    /// Computing `base + offset` overflowed the address space.
    #[error("address {base:#x} + {offset:#x} overflows")]
    AddressOverflow {
        /// The base address.
        base: u64,
        /// The offset added to it.
        offset: u64,
    },
    /// The operating system rejected the read.
    #[error("reading {length} byte(s) at address {address:#x} failed with OS error {code}")]
    Os {
        /// First address of the requested range.
        address: u64,
        /// Number of bytes requested.
        length: usize,
        /// The raw OS error code.
        code: i32,
    },
    /// Memory reads are not available here.
    #[error("memory reads are not supported")]
    Unsupported,
}

/// A capability to read bytes at absolute addresses.
///
/// # Examples
///
/// ```
/// use errortree_pe::{MemoryImage, MemoryReader, ReadError};
///
/// let bytes = [1u8, 2, 3, 4];
/// let image = MemoryImage::new(0x4000, &bytes);
///
/// assert_eq!(image.read(0x4001, 2), Ok(vec![2, 3]));
/// assert_eq!(
///     image.read(0x4003, 2),
///     Err(ReadError::OutOfRange { address: 0x4003, length: 2 })
/// );
/// ```
pub trait MemoryReader {
    /// Fills `buffer` with the bytes starting at `address`.
    ///
    /// On error the contents of `buffer` are unspecified.
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), ReadError>;

    /// Reads `length` bytes starting at `address`.
    ///
    /// The provided implementation allocates `length` bytes before reading;
    /// readers that can check a range up front should override it.
    fn read(&self, address: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        let mut buffer = vec![0; length];
        self.read_exact(address, &mut buffer)?;
        Ok(buffer)
    }
}

impl<R: MemoryReader + ?Sized> MemoryReader for &R {
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        (**self).read_exact(address, buffer)
    }
}

impl<R: MemoryReader + ?Sized> MemoryReader for Box<R> {
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        (**self).read_exact(address, buffer)
    }
}

/// A byte slice treated as memory mapped at `base`.
///
/// Useful for images that were copied out of a process, loaded from disk, or
/// assembled by hand.
#[derive(Debug, Clone, Copy)]
pub struct MemoryImage<'a> {
    base: u64,
    bytes: &'a [u8],
}

impl<'a> MemoryImage<'a> {
    /// Maps `bytes` so that `bytes[0]` lives at address `base`.
    pub const fn new(base: u64, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    /// The address of the first byte.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// The mapped bytes.
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> MemoryImage<'a> {
    fn window(&self, address: u64, length: usize) -> Result<&'a [u8], ReadError> {
        let out_of_range = ReadError::OutOfRange { address, length };
        let start = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(out_of_range)?;
        start
            .checked_add(length)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(out_of_range)
    }
}

impl MemoryReader for MemoryImage<'_> {
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        buffer.copy_from_slice(self.window(address, buffer.len())?);
        Ok(())
    }

    fn read(&self, address: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        self.window(address, length).map(<[u8]>::to_vec)
    }
}

/// A reader for which every range is invalid.
///
/// Hosts that never produce native frames can use this in place of a real
/// reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreadableMemory;

impl MemoryReader for UnreadableMemory {
    fn read_exact(&self, _address: u64, _buffer: &mut [u8]) -> Result<(), ReadError> {
        Err(ReadError::Unsupported)
    }
}
