use std::{fs::File, io, os::unix::fs::FileExt, sync::OnceLock};

use errortree_pe::ReadError;

pub(super) fn read(address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
    let length = buffer.len();
    let remote_base =
        usize::try_from(address).map_err(|_| ReadError::OutOfRange { address, length })?;

    let local = libc::iovec {
        iov_base: buffer.as_mut_ptr().cast(),
        iov_len: length,
    };
    let remote = libc::iovec {
        iov_base: remote_base as *mut libc::c_void,
        iov_len: length,
    };

    // SAFETY: `local` describes exactly `buffer`, which is valid for writes of
    // `length` bytes for the duration of the call. `remote` is only read, by
    // the kernel, which reports unmapped pages as EFAULT instead of faulting.
    #[allow(unsafe_code)]
    let copied = unsafe {
        libc::process_vm_readv(std::process::id() as libc::pid_t, &local, 1, &remote, 1, 0)
    };

    if copied < 0 {
        let error = io::Error::last_os_error();
        return match error.raw_os_error() {
            Some(libc::EPERM | libc::ENOSYS) => read_proc_self_mem(address, buffer),
            code => Err(ReadError::Os {
                address,
                length,
                code: code.unwrap_or(0),
            }),
        };
    }

    if copied as usize != length {
        return Err(ReadError::OutOfRange { address, length });
    }
    Ok(())
}

fn read_proc_self_mem(address: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
    static PROC_SELF_MEM: OnceLock<io::Result<File>> = OnceLock::new();

    let length = buffer.len();
    let os_error = |error: &io::Error| ReadError::Os {
        address,
        length,
        code: error.raw_os_error().unwrap_or(0),
    };

    tracing::debug!(address, length, "process_vm_readv denied, reading /proc/self/mem");

    let file = PROC_SELF_MEM
        .get_or_init(|| File::open("/proc/self/mem"))
        .as_ref()
        .map_err(os_error)?;
    file.read_exact_at(buffer, address).map_err(|error| os_error(&error))
}
