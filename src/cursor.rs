//! Bounds-checked forward-only reader.
//!
//! Every read either succeeds and advances the cursor, or fails with
//! [`ErrorKind::OutOfBounds`] and leaves the cursor where it was.

use crate::error::{Error, ErrorKind, Result};

use nom::number::complete::{be_u16, be_u32, be_u64, be_u8};

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes consumed since construction.
    pub fn consumed(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek(&self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::new(ErrorKind::OutOfBounds)
                    .context(|| format!("wanted {} bytes, {} remain", count, self.remaining()))
            })?;
        Ok(&self.data[self.offset..end])
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(count)?;
        self.offset += count;
        Ok(bytes)
    }

    pub fn peek_all(&self) -> &'a [u8] {
        &self.data[self.offset.min(self.data.len())..]
    }

    pub fn take_all(&mut self) -> &'a [u8] {
        let bytes = self.peek_all();
        self.offset = self.data.len();
        bytes
    }

    /// Run a nom parser over the remaining bytes and advance past whatever it
    /// consumed.
    pub fn read<O, F>(&mut self, parser: F) -> Result<O>
    where
        F: FnOnce(&'a [u8]) -> nom::IResult<&'a [u8], O>,
    {
        let input = self.peek_all();
        let (rest, value) = parser(input)?;
        self.offset += input.len() - rest.len();
        Ok(value)
    }

    pub fn peek_u8(&self) -> Result<u8> {
        Ok(self.peek(1)?[0])
    }

    pub fn take_u8(&mut self) -> Result<u8> {
        self.read(be_u8)
    }

    pub fn take_u16(&mut self) -> Result<u16> {
        self.read(be_u16)
    }

    pub fn take_u32(&mut self) -> Result<u32> {
        self.read(be_u32)
    }

    pub fn take_u64(&mut self) -> Result<u64> {
        self.read(be_u64)
    }

    /// Hand exactly `count` bytes to `body` through a fresh cursor.
    ///
    /// `body` must consume all of them, otherwise this fails with
    /// [`ErrorKind::InvalidConversion`]. The outer cursor only advances on
    /// success.
    pub fn scoped_exact<T, F>(&mut self, count: usize, body: F) -> Result<T>
    where
        F: FnOnce(&mut ByteCursor<'a>) -> Result<T>,
    {
        let mut scoped = ByteCursor::new(self.peek(count)?);
        let value = body(&mut scoped)?;
        if scoped.consumed() != count {
            return Err(Error::new(ErrorKind::InvalidConversion).context(|| {
                format!("consumed {} of {} scoped bytes", scoped.consumed(), count)
            }));
        }
        self.offset += count;
        Ok(value)
    }

    /// Take one byte and map it, reporting `error` if the mapping refuses it.
    pub fn map_u8<T, F>(&mut self, error: ErrorKind, decode: F) -> Result<T>
    where
        F: FnOnce(u8) -> Option<T>,
    {
        let raw = self.peek_u8()?;
        let value = decode(raw)
            .ok_or_else(|| Error::new(error).context(|| format!("raw value {:#04x}", raw)))?;
        self.offset += 1;
        Ok(value)
    }

    /// Take a big-endian u16 and map it, reporting `error` if the mapping
    /// refuses it.
    pub fn map_u16<T, F>(&mut self, error: ErrorKind, decode: F) -> Result<T>
    where
        F: FnOnce(u16) -> Option<T>,
    {
        let raw = {
            let mut probe = self.clone();
            probe.take_u16()?
        };
        let value = decode(raw)
            .ok_or_else(|| Error::new(error).context(|| format!("raw value {:#06x}", raw)))?;
        self.offset += 2;
        Ok(value)
    }
}
