use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use crate::{Error, Result};

/// Bounds-checked big-endian reader over a borrowed payload.
///
/// Every read fails with an AMF decode error instead of panicking when the
/// payload is shorter than the value it claims to contain.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { cursor: Cursor::new(data) }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::amf_decode(format!(
                "Need {} bytes at offset {}, only {} left",
                n,
                self.position(),
                self.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<BigEndian>()?)
    }

    pub fn read_i16_be(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.cursor.read_i16::<BigEndian>()?)
    }

    pub fn read_u24_be(&mut self) -> Result<u32> {
        self.ensure(3)?;
        Ok(self.cursor.read_u24::<BigEndian>()?)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_f64_be(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.cursor.read_f64::<BigEndian>()?)
    }

    /// Borrow the next `len` bytes without copying
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn read_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_slice(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8: {}", e)))
    }
}

/// Big-endian write helpers for building wire payloads in a `Vec<u8>`.
///
/// Writing into a `Vec` cannot fail, so these return nothing.
pub trait BytesWriteExt {
    fn put_u8(&mut self, value: u8);
    fn put_u16_be(&mut self, value: u16);
    fn put_i16_be(&mut self, value: i16);
    fn put_u24_be(&mut self, value: u32);
    fn put_u32_be(&mut self, value: u32);
    fn put_u32_le(&mut self, value: u32);
    fn put_f64_be(&mut self, value: f64);
}

impl BytesWriteExt for Vec<u8> {
    fn put_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn put_u16_be(&mut self, value: u16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_i16_be(&mut self, value: i16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u24_be(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes()[1..]);
    }

    fn put_u32_be(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u32_le(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f64_be(&mut self, value: f64) {
        self.extend_from_slice(&value.to_be_bytes());
    }
}
