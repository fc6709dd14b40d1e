use bytes::Buf;

use crate::error::{Result, WireError};
use crate::writer::padded_len;

/// Cursor over a received datagram that reads aligned OSC fields.
pub(crate) struct PacketReader<'a> {
    buf: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Read a NUL-terminated string and skip its padding.
    ///
    /// Missing trailing padding at the very end of the packet is tolerated.
    pub(crate) fn read_string(&mut self, field: &str) -> Result<&'a str> {
        let raw = self.read_raw_string(field)?;
        std::str::from_utf8(raw)
            .map_err(|_| WireError::malformed(format!("{field} is not valid text")))
    }

    /// Like [`read_string`](Self::read_string), but invalid UTF-8 becomes U+FFFD.
    pub(crate) fn read_string_lossy(&mut self, field: &str) -> Result<String> {
        let raw = self.read_raw_string(field)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn read_raw_string(&mut self, field: &str) -> Result<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let nul = buf
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| WireError::malformed(format!("unterminated {field}")))?;
        let consumed = padded_len(nul + 1).min(buf.len());
        self.buf.advance(consumed);
        Ok(&buf[..nul])
    }

    pub(crate) fn read_i32(&mut self, field: &str) -> Result<i32> {
        self.ensure(4, field)?;
        Ok(self.buf.get_i32())
    }

    pub(crate) fn read_f32(&mut self, field: &str) -> Result<f32> {
        self.ensure(4, field)?;
        Ok(self.buf.get_f32())
    }

    fn ensure(&self, len: usize, field: &str) -> Result<()> {
        if self.buf.len() < len {
            return Err(WireError::malformed(format!(
                "{field} truncated ({} of {len} bytes)",
                self.buf.len()
            )));
        }
        Ok(())
    }
}
