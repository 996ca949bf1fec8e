//! Test-only memory reader over a synthetic module image.

use crate::Address;
use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// A bounds-checked reader over an in-memory byte buffer placed at a chosen
/// base address, standing in for a loaded module image.
pub struct MockMemoryReader {
    base: Address,
    bytes: Vec<u8>,
}

impl MockMemoryReader {
    pub fn new(base: Address, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn end(&self) -> Address {
        self.base + self.bytes.len() as u64
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: Address, len: usize) -> Result<Vec<u8>> {
        let start = address
            .checked_sub(self.base)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "below image base".to_string(),
            })? as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "past end of image".to_string(),
            })?;
        Ok(self.bytes[start..end].to_vec())
    }
}

/// Builder for mock images: lay out bytes at chosen offsets from the base.
pub struct MockMemoryBuilder {
    base: Address,
    bytes: Vec<u8>,
}

impl MockMemoryBuilder {
    pub fn new(base: Address) -> Self {
        Self {
            base,
            bytes: Vec::new(),
        }
    }

    /// Extend the image with zero padding up to `offset` bytes from the base.
    pub fn pad_to(mut self, offset: usize) -> Self {
        if self.bytes.len() < offset {
            self.bytes.resize(offset, 0);
        }
        self
    }

    /// Write `bytes` at `offset` from the base, growing the image if needed.
    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        if self.bytes.len() < offset + bytes.len() {
            self.bytes.resize(offset + bytes.len(), 0);
        }
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn write_u16(self, offset: usize, value: u16) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader::new(self.base, self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reader_bounds() {
        let reader = MockMemoryBuilder::new(0x1000)
            .write_bytes(0, &[1, 2, 3, 4])
            .build();

        assert_eq!(reader.read_bytes(0x1000, 4).unwrap(), [1, 2, 3, 4]);
        assert_eq!(reader.read_u16(0x1002).unwrap(), 0x0403);
        assert!(reader.read_bytes(0x0FFF, 1).is_err());
        assert!(reader.read_bytes(0x1001, 4).is_err());
    }

    #[test]
    fn test_builder_layout() {
        let reader = MockMemoryBuilder::new(0x4000)
            .pad_to(0x10)
            .write_u32(0x10, 0xAABBCCDD)
            .write_u64(0x20, 0x1122_3344_5566_7788)
            .build();

        assert_eq!(reader.read_u32(0x4010).unwrap(), 0xAABBCCDD);
        assert_eq!(reader.read_u64(0x4020).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(reader.read_u8(0x400F).unwrap(), 0);
    }
}
