//! In-memory PE header walk for an already-loaded module.
//!
//! Only the section table of the live image is parsed — on-disk file formats
//! are out of scope. The walk goes through [`ReadMemory`] so a synthetic
//! image can exercise it in tests.

use tracing::warn;

use crate::Address;
use crate::error::Result;
use crate::memory::ReadMemory;
use crate::module::{SectionKind, SectionRange, SectionTable};

const DOS_MAGIC: u16 = 0x5A4D; // "MZ"
const PE_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
const E_LFANEW_OFFSET: u64 = 0x3C;
const NUMBER_OF_SECTIONS_OFFSET: u64 = 6;
const SIZE_OF_OPTIONAL_HEADER_OFFSET: u64 = 20;
const FIRST_SECTION_HEADER_OFFSET: u64 = 24;
const SECTION_HEADER_SIZE: u64 = 40;
const SECTION_NAME_LEN: usize = 8;
const SECTION_VIRTUAL_SIZE_OFFSET: usize = 8;
const SECTION_VIRTUAL_ADDRESS_OFFSET: usize = 12;

/// Loader-imposed ceiling on the number of sections in one image.
const MAX_SECTIONS: u16 = 96;

/// A scanned module: base address plus the table of recognized sections.
///
/// Construction never fails. A module that cannot be resolved, or whose
/// headers are malformed, yields an empty table; callers probe per section
/// and treat an absent range as "do not scan".
#[derive(Debug, Clone, Default)]
pub struct ModuleImage {
    base: Address,
    sections: SectionTable,
}

impl ModuleImage {
    /// The unresolved module: null base, every section absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble an image from an already-built table (test seam).
    pub(crate) fn with_sections(base: Address, sections: SectionTable) -> Self {
        Self { base, sections }
    }

    /// Walk the section headers of the image loaded at `base`.
    pub fn from_base<R: ReadMemory>(reader: &R, base: Address) -> Self {
        match parse_section_table(reader, base) {
            Ok(sections) => Self { base, sections },
            Err(e) => {
                warn!(base = format_args!("{base:#x}"), "malformed module image: {e}");
                Self {
                    base,
                    sections: SectionTable::default(),
                }
            }
        }
    }

    /// Resolve `name` against the modules already loaded in this process and
    /// walk its section headers. `None` resolves the main executable.
    #[cfg(target_os = "windows")]
    pub fn from_loaded<R: ReadMemory>(reader: &R, name: Option<&str>) -> Self {
        match loaded_module_base(name) {
            Ok(base) => Self::from_base(reader, base),
            Err(e) => {
                warn!("module did not resolve: {e}");
                Self::empty()
            }
        }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn is_resolved(&self) -> bool {
        self.base != 0
    }

    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> SectionRange {
        self.sections.get(kind)
    }

    /// Translate a relative virtual address into an absolute one.
    pub fn rva(&self, offset: u64) -> Address {
        self.base + offset
    }
}

/// Parse the section headers at `base` into a table, keeping only recognized
/// section names. Duplicate names overwrite earlier entries — the image
/// format allows them and the last one wins, mirroring the loader.
fn parse_section_table<R: ReadMemory>(reader: &R, base: Address) -> Result<SectionTable> {
    use crate::error::Error;

    let mut table = SectionTable::default();

    let dos_magic = reader.read_u16(base)?;
    if dos_magic != DOS_MAGIC {
        return Err(Error::MemoryReadFailed {
            address: base,
            message: format!("bad DOS magic {dos_magic:#06x}"),
        });
    }

    let nt_offset = reader.read_u32(base + E_LFANEW_OFFSET)? as u64;
    let nt = base + nt_offset;
    let signature = reader.read_u32(nt)?;
    if signature != PE_SIGNATURE {
        return Err(Error::MemoryReadFailed {
            address: nt,
            message: format!("bad PE signature {signature:#010x}"),
        });
    }

    let section_count = reader.read_u16(nt + NUMBER_OF_SECTIONS_OFFSET)?;
    if section_count > MAX_SECTIONS {
        return Err(Error::MemoryReadFailed {
            address: nt + NUMBER_OF_SECTIONS_OFFSET,
            message: format!("implausible section count {section_count}"),
        });
    }

    let optional_size = reader.read_u16(nt + SIZE_OF_OPTIONAL_HEADER_OFFSET)? as u64;
    let mut header = nt + FIRST_SECTION_HEADER_OFFSET + optional_size;

    for _ in 0..section_count {
        let raw = reader.read_bytes(header, SECTION_HEADER_SIZE as usize)?;

        if let Some(kind) = SectionKind::classify(&raw[..SECTION_NAME_LEN]) {
            let virtual_size = read_u32_field(&raw, SECTION_VIRTUAL_SIZE_OFFSET) as u64;
            let virtual_address = read_u32_field(&raw, SECTION_VIRTUAL_ADDRESS_OFFSET) as u64;

            let start = base + virtual_address;
            table.set(kind, SectionRange::new(start, start + virtual_size));
        }

        header += SECTION_HEADER_SIZE;
    }

    Ok(table)
}

fn read_u32_field(header: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        header[offset],
        header[offset + 1],
        header[offset + 2],
        header[offset + 3],
    ])
}

/// Base address of a module already loaded in the current process.
///
/// `None` names the main executable. No loading or path resolution happens
/// here — a module that is not resident is an error.
#[cfg(target_os = "windows")]
pub fn loaded_module_base(name: Option<&str>) -> Result<Address> {
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::core::{HSTRING, PCWSTR};

    use crate::error::Error;

    // SAFETY: GetModuleHandleW only inspects the loader's module list.
    let handle = unsafe {
        match name {
            Some(name) => GetModuleHandleW(&HSTRING::from(name)),
            None => GetModuleHandleW(PCWSTR::null()),
        }
    };

    match handle {
        Ok(module) => Ok(module.0 as usize as Address),
        Err(_) => Err(Error::ModuleNotFound(
            name.unwrap_or("<main executable>").to_string(),
        )),
    }
}
