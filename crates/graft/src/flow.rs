//! Control-transfer resolution.
//!
//! A signature hit frequently lands on a `call` or `jmp` into an import
//! thunk or incremental-linking stub rather than on the function itself.
//! Following the displacement — and any further redirecting jumps at the
//! destination — yields the stable, callable address.

use tracing::warn;

use crate::Address;
use crate::memory::ReadMemory;

/// Redirection chains longer than this are treated as cycles.
const MAX_CHAIN_HOPS: usize = 32;

/// The three transfer encodings the toolkit recognizes. Everything else is
/// "not a transfer" — this is deliberately not a disassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// `E8 rel32`
    NearCall,
    /// `E9 rel32`
    NearJmp,
    /// `EB rel8`
    ShortJmp,
}

impl Transfer {
    pub fn classify(opcode: u8) -> Option<Self> {
        match opcode {
            0xE8 => Some(Self::NearCall),
            0xE9 => Some(Self::NearJmp),
            0xEB => Some(Self::ShortJmp),
            _ => None,
        }
    }

    /// Total instruction length, opcode plus displacement.
    pub fn instruction_len(self) -> u64 {
        match self {
            Self::NearCall | Self::NearJmp => 5,
            Self::ShortJmp => 2,
        }
    }
}

/// Absolute destination of the transfer instruction at `address`, following
/// chained redirections to the final non-redirecting target.
///
/// A null address, an unrecognized opcode, or an unreadable byte yields
/// `None` — never an error. Displacements are signed for every form,
/// including the short jump.
pub fn resolve_transfer<R: ReadMemory>(reader: &R, address: Address) -> Option<Address> {
    if address == 0 {
        return None;
    }

    let mut current = decode_destination(reader, address)?;

    for _ in 0..MAX_CHAIN_HOPS {
        match decode_destination(reader, current) {
            Some(next) => current = next,
            None => return Some(current),
        }
    }

    warn!(
        address = format_args!("{address:#x}"),
        "transfer chain exceeded {MAX_CHAIN_HOPS} hops, treating as cycle"
    );
    None
}

/// Single-hop decode: destination of the transfer at `address`, or `None`
/// when the byte there is not a recognized transfer opcode.
fn decode_destination<R: ReadMemory>(reader: &R, address: Address) -> Option<Address> {
    let opcode = reader.read_u8(address).ok()?;
    let transfer = Transfer::classify(opcode)?;

    let displacement = match transfer {
        Transfer::NearCall | Transfer::NearJmp => reader.read_i32(address + 1).ok()? as i64,
        Transfer::ShortJmp => reader.read_i8(address + 1).ok()? as i64,
    };

    Some(
        address
            .wrapping_add(transfer.instruction_len())
            .wrapping_add_signed(displacement),
    )
}

/// Load the 64-bit pointer stored at `address`.
pub fn read_pointer<R: ReadMemory>(reader: &R, address: Address) -> Option<Address> {
    if address == 0 {
        return None;
    }
    reader.read_u64(address).ok()
}

/// Destination of a RIP-relative operand: the 32-bit displacement sits at
/// `instruction + disp_offset` and is relative to the end of the
/// instruction (`instruction + instruction_len`).
pub fn resolve_rip_relative<R: ReadMemory>(
    reader: &R,
    instruction: Address,
    disp_offset: u64,
    instruction_len: u64,
) -> Option<Address> {
    if instruction == 0 {
        return None;
    }
    let displacement = reader.read_i32(instruction + disp_offset).ok()? as i64;
    Some(
        instruction
            .wrapping_add(instruction_len)
            .wrapping_add_signed(displacement),
    )
}
