//! Read access to the target address space.
//!
//! Every component that touches target memory goes through [`ReadMemory`]
//! instead of raw pointers, so scanning and resolution logic can run against
//! a synthetic image in tests.

use crate::Address;
use crate::error::{Error, Result};

/// Capability to read bytes from the target address space.
pub trait ReadMemory {
    /// Read `len` bytes starting at `address`.
    fn read_bytes(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: Address) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    fn read_u16(&self, address: Address) -> Result<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, address: Address) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: Address) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i32(&self, address: Address) -> Result<i32> {
        Ok(self.read_u32(address)? as i32)
    }

    fn read_i8(&self, address: Address) -> Result<i8> {
        Ok(self.read_u8(address)? as i8)
    }
}

/// Reads the current process's own address space.
///
/// The toolkit runs inside the process it instruments, so a read is a plain
/// copy from the live image. Addresses must lie inside a loaded module while
/// it stays loaded; the reader only rejects the null page, everything else is
/// the range supplier's contract (ranges normally come from the section
/// table).
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessReader;

impl InProcessReader {
    pub fn new() -> Self {
        Self
    }
}

impl ReadMemory for InProcessReader {
    fn read_bytes(&self, address: Address, len: usize) -> Result<Vec<u8>> {
        if address == 0 {
            return Err(Error::MemoryReadFailed {
                address,
                message: "null address".to_string(),
            });
        }
        if address.checked_add(len as u64).is_none() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("range of {len} bytes wraps the address space"),
            });
        }

        // SAFETY: the address range comes from the section table of a module
        // that is loaded in this process, per the trait contract above.
        let slice = unsafe { std::slice::from_raw_parts(address as *const u8, len) };
        Ok(slice.to_vec())
    }
}
