//! Big-endian cursor over a borrowed byte slice
//!
//! RuneTek5 formats mix fixed-width big-endian integers with a handful of
//! game-specific encodings: "smart" integers whose width depends on the first
//! byte, and NUL-terminated strings in Windows-1252. [`ByteReader`] reads
//! those without ever copying or mutating its input.

use crate::error::{FormatError, Result};

/// Windows-1252 code points for bytes `0x80..=0x9F`.
///
/// Unassigned positions decode as `?`, which is what the game client does.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '?', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '?', '\u{017D}', '?', '?',
    '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '?', '\u{017E}', '\u{0178}',
];

/// Decode a single Windows-1252 byte.
pub fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => char::from(byte),
    }
}

/// Encode a character as a Windows-1252 byte, `?` when unrepresentable.
pub fn cp1252_byte(ch: char) -> u8 {
    let code = ch as u32;
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return code as u8;
    }
    CP1252_HIGH
        .iter()
        .position(|&c| c == ch && c != '?')
        .map_or(b'?', |i| 0x80 + i as u8)
}

/// Read-only big-endian cursor.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset into the input.
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(FormatError::Truncated {
                position: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Peek at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(FormatError::Truncated {
                position: self.pos,
                needed: 1,
                available: 0,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Read a 3-byte big-endian unsigned integer.
    pub fn read_u24(&mut self) -> Result<u32> {
        let [a, b, c] = self.array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    /// Unsigned smart: one byte below 128, otherwise two bytes minus `0x8000`.
    pub fn read_unsigned_smart(&mut self) -> Result<u16> {
        if self.peek_u8()? < 128 {
            Ok(u16::from(self.read_u8()?))
        } else {
            Ok(self.read_u16()? - 0x8000)
        }
    }

    /// Big smart: two bytes when the high bit is clear, otherwise four bytes
    /// with the high bit masked off.
    pub fn read_big_smart(&mut self) -> Result<u32> {
        if self.peek_u8()? & 0x80 == 0 {
            Ok(u32::from(self.read_u16()?))
        } else {
            Ok(self.read_u32()? & 0x7FFF_FFFF)
        }
    }

    /// Read one Windows-1252 character.
    pub fn read_cp1252_char(&mut self) -> Result<char> {
        Ok(cp1252_char(self.read_u8()?))
    }

    /// Read a NUL-terminated Windows-1252 string.
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(FormatError::Truncated {
                position: self.pos,
                needed: rest.len() + 1,
                available: rest.len(),
            });
        };
        let text = rest[..end].iter().copied().map(cp1252_char).collect();
        self.pos += end + 1;
        Ok(text)
    }
}

/// Growable big-endian writer, the counterpart of [`ByteReader`].
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big smart; values above `0x7FFF` take four bytes.
    pub fn write_big_smart(&mut self, value: u32) {
        if value > 0x7FFF {
            self.write_u32(value | 0x8000_0000);
        } else {
            self.write_u16(value as u16);
        }
    }

    /// Write a NUL-terminated Windows-1252 string.
    pub fn write_string(&mut self, text: &str) {
        self.buf.extend(text.chars().map(cp1252_byte));
        self.buf.push(0);
    }
}
