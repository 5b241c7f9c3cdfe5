use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use num_traits::ToPrimitive;
use std::io::{self, Read, Write};

use crate::io::{Error, Result};

/// Zero bytes needed to bring `len` up to a multiple of 4.
#[inline(always)]
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Smallest multiple of 4 that is `>= len`.
#[inline(always)]
pub fn aligned_len(len: usize) -> usize {
    len + padding(len)
}

/// Turns an early EOF into [`Error::Truncated`] naming the field being read.
pub(crate) fn truncated(what: &'static str) -> impl Fn(io::Error) -> Error {
    move |e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Truncated { what },
        _ => Error::Io(e),
    }
}

pub trait WriteUtils: Write {
    fn write_padding(&mut self, len: usize) -> Result<()> {
        self.write_all(&[0u8; 3][..padding(len)])?;
        Ok(())
    }

    /// Writes a length as i32. Fails if it does not fit.
    fn write_len(&mut self, len: usize, what: &'static str) -> Result<()> {
        let len_i32 = i32::try_from(len).map_err(|_| Error::LengthOverflow { what, length: len })?;
        self.write_i32::<LE>(len_i32)?;
        Ok(())
    }

    /// `[i32 length][UTF-8 bytes][padding to 4]`
    fn write_aligned_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len(), "string")?;
        self.write_all(s.as_bytes())?;
        self.write_padding(s.len())
    }

    /// `[u8 char size][i32 char count][chars]`, always with 16-bit chars.
    fn write_string_utf16(&mut self, s: &str) -> Result<()> {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u8(1)?;
        self.write_len(units.len(), "string")?;
        for unit in units {
            self.write_u16::<LE>(unit)?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteUtils for W {}

pub trait ReadUtils: Read {
    /// Reads an i32 length prefix, rejecting negative values.
    fn read_len(&mut self, what: &'static str) -> Result<usize> {
        let length = self.read_i32::<LE>().map_err(truncated(what))?;
        length.to_usize().ok_or(Error::NegativeLength {
            what,
            length: length.into(),
        })
    }

    fn read_bytes(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>> {
        // Read through `take` so a bogus length cannot allocate more than is there.
        let mut buf = Vec::new();
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(Error::Truncated { what });
        }
        Ok(buf)
    }

    fn skip_padding(&mut self, len: usize, what: &'static str) -> Result<()> {
        self.read_bytes(padding(len), what).map(|_| ())
    }

    /// Reverse of [`WriteUtils::write_aligned_string`].
    fn read_aligned_string(&mut self, what: &'static str) -> Result<String> {
        let len = self.read_len(what)?;
        let bytes = self.read_bytes(len, what)?;
        let s = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 { what })?;
        self.skip_padding(len, what)?;
        Ok(s)
    }

    /// Reads a string with either 8-bit or 16-bit chars.
    fn read_string_utf16(&mut self, what: &'static str) -> Result<String> {
        let char_size = self.read_u8().map_err(truncated(what))?;
        let count = self.read_len(what)?;
        match char_size {
            0 => {
                let bytes = self.read_bytes(count, what)?;
                Ok(bytes.into_iter().map(char::from).collect())
            }
            _ => {
                let bytes = self.read_bytes(count.checked_mul(2).ok_or(Error::Truncated { what })?, what)?;
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| Error::InvalidUtf16 { what })
            }
        }
    }
}

impl<R: Read + ?Sized> ReadUtils for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Cursor;

    #[test]
    fn test_padding_is_smallest_multiple_of_four() {
        let mut rng = rand::rng();

        for _ in 0..1000 {
            let len: usize = rng.random_range(0..100_000);
            let aligned = aligned_len(len);

            assert_eq!(aligned % 4, 0, "len {len} aligned to {aligned}");
            assert!(aligned >= len && aligned - len < 4, "len {len} aligned to {aligned}");
        }
    }

    #[test]
    fn aligned_string_round_trip() {
        for s in ["", "a", "ab", "abc", "abcd", "pegboard_1", "ünï"] {
            let mut buf = Vec::new();
            buf.write_aligned_string(s).unwrap();
            assert_eq!(buf.len() % 4, 0);
            assert!(buf[4 + s.len()..].iter().all(|&b| b == 0));

            let mut cursor = Cursor::new(&buf);
            assert_eq!(cursor.read_aligned_string("name").unwrap(), s);
            assert_eq!(cursor.position() as usize, buf.len());
        }
    }

    #[test]
    fn utf16_string_layout() {
        let mut buf = Vec::new();
        buf.write_string_utf16("r").unwrap();
        assert_eq!(buf, [0x01, 0x01, 0x00, 0x00, 0x00, 0x72, 0x00]);
        assert_eq!(Cursor::new(&buf).read_string_utf16("name").unwrap(), "r");
    }

    #[test]
    fn eight_bit_strings_are_read() {
        let buf = [0x00, 0x02, 0x00, 0x00, 0x00, b'o', b'k'];
        assert_eq!(Cursor::new(&buf[..]).read_string_utf16("name").unwrap(), "ok");
    }

    #[test]
    fn negative_length_is_rejected() {
        let buf = (-1i32).to_le_bytes();
        let err = Cursor::new(&buf[..]).read_len("name").unwrap_err();
        assert!(matches!(err, Error::NegativeLength { length: -1, .. }));
    }

    #[test]
    fn oversized_length_is_truncated_error() {
        let mut buf = 100i32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"short");
        let err = Cursor::new(&buf).read_aligned_string("name").unwrap_err();
        assert!(matches!(err, Error::Truncated { what: "name" }));
    }
}
