use thiserror::Error;

/// Byte order for fixed-width wire reads. RFB is big-endian almost
/// everywhere; the exception is handled by the caller (see
/// `Client::read_security_result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("packet too small: wanted {wanted} bytes, {available} available")]
    ShortRead { wanted: usize, available: usize },
    #[error("string cut short: length prefix said {wanted} bytes, got {got}")]
    ShortString {
        wanted: usize,
        got: usize,
        partial: Vec<u8>,
    },
}

impl WireError {
    /// The string bytes that did make it onto the wire, lossily decoded.
    /// Empty for non-string errors.
    pub fn partial_string(&self) -> String {
        match self {
            WireError::ShortString { partial, .. } => String::from_utf8_lossy(partial).into_owned(),
            _ => String::new(),
        }
    }
}

/// Cursor over a single received message buffer. The security handshake
/// reads one packet into a scratch buffer and parses it prefix-by-prefix;
/// this is the prefix-by-prefix part.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::ShortRead {
                wanted: n,
                available: self.remaining(),
            });
        }

        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    #[allow(dead_code)]
    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16, WireError> {
        let b: [u8; 2] = self.take(2)?.try_into().unwrap();
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        })
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> Result<u32, WireError> {
        let b: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        })
    }

    /// Length-prefixed string: a u32 length in `order`, then that many raw
    /// bytes. No charset on the wire; decoded lossily for display. On a cut
    /// payload the partial bytes ride along in the error.
    pub fn read_u32_string(&mut self, order: ByteOrder) -> Result<String, WireError> {
        let len = self.read_u32(order)? as usize;

        if self.remaining() < len {
            let got = self.remaining();
            let partial = self.take(got)?.to_vec();
            return Err(WireError::ShortString {
                wanted: len,
                got,
                partial,
            });
        }

        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }
}
