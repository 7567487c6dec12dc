use errortree_pe::ReadError;

pub(super) fn read(_address: u64, _buffer: &mut [u8]) -> Result<(), ReadError> {
    Err(ReadError::Unsupported)
}
