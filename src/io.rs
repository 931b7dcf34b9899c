//! Bit-level I/O over the GIF sub-block layout.
//!
//! LZW codes are packed least-significant-bit first into bytes, and the
//! bytes are chained into length-prefixed sub-blocks of at most 255 bytes,
//! terminated by a zero-length sub-block. The writer and reader here are
//! exact inverses; both let the caller change the code length between codes,
//! and both sides must do so at the same logical position or the stream
//! desyncs.

use std::io::{ErrorKind, Read, Write};

use log::trace;

use crate::error::{Error, Result};

pub(crate) const MIN_CODE_LENGTH: u8 = 2;
pub(crate) const MAX_CODE_LENGTH: u8 = 12;

const MAX_BLOCK_SIZE: usize = 255;

fn check_code_length(code_length: u8) -> Result<()> {
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code_length) {
        return Err(Error::InvalidArgument(
            "code length must be between 2 and 12 bits",
        ));
    }
    Ok(())
}

/// Sinks that can be shortened in place.
///
/// Required only by the streaming append mode, which removes the one-byte
/// trailer before appending another frame.
pub trait Truncate {
    /// Shorten the sink to `len` bytes. Subsequent writes append at `len`.
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        use std::io::Seek;
        self.set_len(len)?;
        self.seek(std::io::SeekFrom::Start(len))?;
        Ok(())
    }
}

impl Truncate for std::io::Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().truncate(len as usize);
        self.set_position(self.position().min(len));
        Ok(())
    }
}

impl Truncate for std::io::Cursor<&mut Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().truncate(len as usize);
        self.set_position(self.position().min(len));
        Ok(())
    }
}

impl<T: Truncate + ?Sized> Truncate for &mut T {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        (**self).truncate(len)
    }
}

/// Packs variable-width codes into sub-blocks on a byte sink.
pub(crate) struct BitWriter<W: Write> {
    write: W,
    code_length: u8,
    pending_byte: u8,
    bits_used: u8,
    block: [u8; MAX_BLOCK_SIZE],
    block_len: usize,
}

impl<W: Write> BitWriter<W> {
    pub fn new(write: W, code_length: u8) -> Result<Self> {
        check_code_length(code_length)?;
        Ok(Self {
            write,
            code_length,
            pending_byte: 0,
            bits_used: 0,
            block: [0; MAX_BLOCK_SIZE],
            block_len: 0,
        })
    }

    pub fn code_length(&self) -> u8 {
        self.code_length
    }

    pub fn set_code_length(&mut self, code_length: u8) -> Result<()> {
        check_code_length(code_length)?;
        self.code_length = code_length;
        Ok(())
    }

    /// Write one code using the current code length.
    pub fn write_bits(&mut self, code: u16) -> Result<()> {
        let mut n = code;
        let mut bits_required = self.code_length;
        while bits_required > 0 {
            let bits_available = 8 - self.bits_used;
            self.pending_byte |= (n << self.bits_used) as u8;
            self.bits_used += bits_required.min(bits_available);
            n >>= bits_available;
            bits_required = bits_required.saturating_sub(bits_available);
            if self.bits_used == 8 {
                self.flush_bits()?;
            }
        }
        Ok(())
    }

    /// Emit any partially filled byte, zero padded in the high bits.
    pub fn flush_bits(&mut self) -> Result<()> {
        if self.bits_used > 0 {
            let byte = self.pending_byte;
            self.pending_byte = 0;
            self.bits_used = 0;
            self.store_byte(byte)?;
        }
        Ok(())
    }

    /// Emit any partially filled sub-block with its length prefix.
    ///
    /// The zero-length terminator sub-block is the caller's responsibility.
    pub fn flush_bytes(&mut self) -> Result<()> {
        if self.block_len > 0 {
            trace!("flushing {}-byte sub-block", self.block_len);
            self.write.write_all(&[self.block_len as u8])?;
            self.write.write_all(&self.block[..self.block_len])?;
            self.block_len = 0;
        }
        Ok(())
    }

    fn store_byte(&mut self, byte: u8) -> Result<()> {
        self.block[self.block_len] = byte;
        self.block_len += 1;
        if self.block_len == MAX_BLOCK_SIZE {
            self.flush_bytes()?;
        }
        Ok(())
    }
}

/// Unpacks variable-width codes from a chain of sub-blocks on a byte source.
pub(crate) struct BitReader<R: Read> {
    read: R,
    code_length: u8,
    pending_byte: u8,
    bits_left: u8,
    block: [u8; MAX_BLOCK_SIZE],
    block_size: usize,
    pos: usize,
    bytes_read: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(read: R, code_length: u8) -> Result<Self> {
        check_code_length(code_length)?;
        Ok(Self {
            read,
            code_length,
            pending_byte: 0,
            bits_left: 0,
            block: [0; MAX_BLOCK_SIZE],
            block_size: 0,
            pos: 0,
            bytes_read: 0,
        })
    }

    pub fn set_code_length(&mut self, code_length: u8) -> Result<()> {
        check_code_length(code_length)?;
        self.code_length = code_length;
        Ok(())
    }

    /// Total bytes consumed from the source, length prefixes included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read one code using the current code length.
    ///
    /// Fails with [`Error::TruncatedInput`] if the source ends mid-code or
    /// mid-block, or if the zero-length terminator arrives while bits are
    /// still required.
    pub fn read_code(&mut self) -> Result<u16> {
        let mut n: u16 = 0;
        let mut bits_taken = 0;
        while bits_taken < self.code_length {
            if self.bits_left == 0 {
                self.fill()?;
            }
            let bits_this_time = self.bits_left.min(self.code_length - bits_taken);
            let mask = (1u16 << bits_this_time) - 1;
            let pending = u16::from(self.pending_byte);
            n |= (pending & mask) << bits_taken;
            self.pending_byte = (pending >> bits_this_time) as u8;
            bits_taken += bits_this_time;
            self.bits_left -= bits_this_time;
        }
        Ok(n)
    }

    /// Drain and discard the remaining sub-blocks up to and including the
    /// zero-length terminator. GIF permits padding after the End code.
    pub fn clear(&mut self) -> Result<()> {
        loop {
            let size = usize::from(self.read_length_byte()?);
            if size == 0 {
                return Ok(());
            }
            self.read_block(size)?;
        }
    }

    /// Whether a whole code is already buffered, without pulling another
    /// byte from the source.
    #[cfg(test)]
    pub fn whole_code_left(&self) -> bool {
        self.bits_left >= self.code_length
    }

    fn fill(&mut self) -> Result<()> {
        if self.pos >= self.block_size {
            self.next_block()?;
        }
        self.pending_byte = self.block[self.pos];
        self.pos += 1;
        self.bits_left = 8;
        Ok(())
    }

    fn next_block(&mut self) -> Result<()> {
        let size = usize::from(self.read_length_byte()?);
        if size == 0 {
            // A code is still required but the chain has ended.
            return Err(Error::TruncatedInput);
        }
        self.read_block(size)?;
        self.block_size = size;
        self.pos = 0;
        Ok(())
    }

    fn read_length_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.read.read_exact(&mut buf) {
            Ok(()) => {
                self.bytes_read += 1;
                Ok(buf[0])
            }
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedInput),
            Err(error) => Err(error.into()),
        }
    }

    fn read_block(&mut self, size: usize) -> Result<()> {
        match self.read.read_exact(&mut self.block[..size]) {
            Ok(()) => {
                self.bytes_read += size as u64;
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedInput),
            Err(error) => Err(error.into()),
        }
    }
}
