//! Little-endian primitives for the persistence formats.

use std::io::{self, Read};

/// Appends little-endian values to an in-memory buffer.
pub(crate) trait WriteLeExt {
    fn put_u8(&mut self, v: u8);

    fn put_bool(&mut self, v: bool) {
        self.put_u8(v as u8);
    }

    fn put_u16_le(&mut self, v: u16);

    fn put_u32_le(&mut self, v: u32);

    fn put_i32_le(&mut self, v: i32);

    fn put_words_le(&mut self, words: &[u16]) {
        for &w in words {
            self.put_u16_le(w);
        }
    }
}

impl WriteLeExt for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16_le(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32_le(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i32_le(&mut self, v: i32) {
        self.extend_from_slice(&v.to_le_bytes());
    }
}

pub(crate) trait ReadLeExt: Read {
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Any nonzero byte reads as true.
    fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u16_le(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32_le(&mut self) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_words_le(&mut self, out: &mut [u16]) -> io::Result<()> {
        for w in out.iter_mut() {
            *w = self.read_u16_le()?;
        }
        Ok(())
    }
}

impl<R: Read + ?Sized> ReadLeExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_little_endian() {
        let mut out = Vec::new();
        out.put_words_le(&[0x1234, 0xabcd]);
        assert_eq!(out, vec![0x34, 0x12, 0xcd, 0xab]);

        let mut words = [0u16; 2];
        (&out[..]).read_words_le(&mut words).unwrap();
        assert_eq!(words, [0x1234, 0xabcd]);
    }

    #[test]
    fn test_short_read_is_unexpected_eof() {
        let err = (&[0x01u8, 0x02, 0x03][..]).read_u32_le().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
