use bytes::{BufMut, BytesMut};

/// OSC fields are aligned to 4-byte boundaries.
pub(crate) const ALIGNMENT: usize = 4;

/// Length of `len` bytes once zero-padded to the next 4-byte boundary.
pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// Wire size of `value` as an OSC string (terminator and padding included).
pub(crate) fn osc_string_len(value: &str) -> usize {
    padded_len(value.len() + 1)
}

/// Write `value` as an OSC string: the bytes, a NUL, then zero padding.
///
/// Padding is relative to the field start. Every OSC field is a multiple of
/// 4 bytes, so this keeps the whole packet aligned.
pub(crate) fn put_osc_string(dst: &mut BytesMut, value: &str) {
    let total = osc_string_len(value);
    dst.reserve(total);
    dst.put_slice(value.as_bytes());
    dst.put_bytes(0, total - value.len());
}
