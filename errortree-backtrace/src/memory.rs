//! Reading the current process's own memory.

use errortree_pe::{MemoryReader, ReadError};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod linux;
        use linux as platform;
    } else {
        mod unsupported;
        use unsupported as platform;
    }
}

/// Reads the memory of the running process.
///
/// An unmapped or unreadable range is reported as a [`ReadError`]; reads
/// never fault. On Linux the read goes through `process_vm_readv`, falling
/// back to `/proc/self/mem` when the system call is not permitted. Other
/// platforms answer every read with [`ReadError::Unsupported`].
///
/// # Examples
///
/// ```
/// use errortree_backtrace::ProcessMemory;
/// use errortree_pe::MemoryReader;
///
/// // Address zero is never mapped.
/// assert!(ProcessMemory.read(0, 8).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProcessMemory;

impl MemoryReader for ProcessMemory {
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        if buffer.is_empty() {
            return Ok(());
        }
        platform::read(address, buffer)
    }
}
