//! Structured binary I/O for fixed-width little-endian fields.
//!
//! Every integer the index format stores is little-endian. Besides the
//! usual fixed-size types, fields can be written with a per-file width of
//! one to eight bytes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{NifError, Result};
use crate::storage::{StorageInput, StorageOutput};

/// Largest value representable in `width` bytes.
pub fn max_for_width(width: u8) -> u64 {
    match width {
        0 => 0,
        1..=7 => (1u64 << (8 * width as u32)) - 1,
        _ => u64::MAX,
    }
}

fn check_width(width: u8) -> Result<()> {
    if (1..=8).contains(&width) {
        Ok(())
    } else {
        Err(NifError::index(format!("unsupported field width {width}")))
    }
}

/// A structured file writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    position: u64,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new structured file writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            position: 0,
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.position += 1;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write `value` as a little-endian integer of exactly `width` bytes.
    pub fn write_uint(&mut self, value: u64, width: u8) -> Result<()> {
        check_width(width)?;
        if value > max_for_width(width) {
            return Err(NifError::index(format!(
                "value {value} does not fit in {width} bytes"
            )));
        }
        self.writer.write_uint::<LittleEndian>(value, width as usize)?;
        self.position += width as u64;
        Ok(())
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.position += value.len() as u64;
        Ok(())
    }

    /// Write `value` right-padded with `pad` to exactly `width` bytes.
    pub fn write_padded(&mut self, value: &[u8], width: usize, pad: u8) -> Result<()> {
        if value.len() > width {
            return Err(NifError::index(format!(
                "{} bytes do not fit in a {width}-byte field",
                value.len()
            )));
        }
        self.write_raw(value)?;
        for _ in value.len()..width {
            self.write_u8(pad)?;
        }
        Ok(())
    }

    /// Get current file position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flush and close the writer.
    pub fn close(mut self) -> Result<()> {
        self.writer.flush_and_sync()?;
        self.writer.close()?;
        Ok(())
    }
}

/// A structured file reader for binary data.
pub struct StructReader<R: StorageInput> {
    reader: R,
    position: u64,
    file_size: u64,
}

impl<R: StorageInput> StructReader<R> {
    /// Create a new structured file reader.
    pub fn new(reader: R) -> Result<Self> {
        let file_size = reader.size()?;
        Ok(StructReader {
            reader,
            position: 0,
            file_size,
        })
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.reader.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    /// Read a little-endian integer of exactly `width` bytes.
    pub fn read_uint(&mut self, width: u8) -> Result<u64> {
        check_width(width)?;
        let value = self.reader.read_uint::<LittleEndian>(width as usize)?;
        self.position += width as u64;
        Ok(value)
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        if self.position + length as u64 > self.file_size {
            return Err(NifError::index(format!(
                "truncated file: {length} bytes requested at offset {}",
                self.position
            )));
        }
        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes)?;
        self.position += length as u64;
        Ok(bytes)
    }

    /// Read everything up to the end of the file.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let remaining = self.remaining() as usize;
        self.read_raw(remaining)
    }

    /// Get current file position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get file size.
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.position)
    }
}

/// Decode a little-endian integer of `bytes.len()` bytes.
pub fn decode_uint(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn test_struct_writer_reader() {
        let storage = MemoryStorage::new();

        {
            let output = storage.create_output("test.bin").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_raw(b"NIF").unwrap();
            writer.write_u8(3).unwrap();
            writer.write_u32(0xDEADBEEF).unwrap();
            writer.write_uint(0x0A0B0C, 3).unwrap();
            writer.write_uint(7, 1).unwrap();
            writer.write_padded(b"ab", 4, 0).unwrap();
            assert_eq!(writer.position(), 3 + 1 + 4 + 3 + 1 + 4);
            writer.close().unwrap();
        }

        let input = storage.open_input("test.bin").unwrap();
        let mut reader = StructReader::new(input).unwrap();
        assert_eq!(reader.read_raw(3).unwrap(), b"NIF");
        assert_eq!(reader.read_u8().unwrap(), 3);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_uint(3).unwrap(), 0x0A0B0C);
        assert_eq!(reader.read_uint(1).unwrap(), 7);
        assert_eq!(reader.read_remaining().unwrap(), b"ab\0\0");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_uint_bytes_are_little_endian() {
        let storage = MemoryStorage::new();
        {
            let output = storage.create_output("le.bin").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_uint(0x010203, 3).unwrap();
            writer.close().unwrap();
        }
        assert_eq!(storage.read_all("le.bin").unwrap(), vec![0x03, 0x02, 0x01]);
        assert_eq!(decode_uint(&[0x03, 0x02, 0x01]), 0x010203);
    }

    #[test]
    fn test_overflowing_values_are_rejected() {
        let storage = MemoryStorage::new();
        let output = storage.create_output("bad.bin").unwrap();
        let mut writer = StructWriter::new(output);
        assert!(writer.write_uint(256, 1).is_err());
        assert!(writer.write_uint(1, 0).is_err());
        assert!(writer.write_padded(b"toolong", 3, 0).is_err());
        assert_eq!(writer.position(), 0);
    }

    #[test]
    fn test_truncated_read() {
        let storage = MemoryStorage::new();
        {
            let mut output = storage.create_output("short.bin").unwrap();
            output.write_all(b"NI").unwrap();
        }
        let input = storage.open_input("short.bin").unwrap();
        let mut reader = StructReader::new(input).unwrap();
        assert!(reader.read_raw(3).is_err());
    }

    #[test]
    fn test_max_for_width() {
        assert_eq!(max_for_width(1), 255);
        assert_eq!(max_for_width(3), 0xFF_FFFF);
        assert_eq!(max_for_width(8), u64::MAX);
    }
}
