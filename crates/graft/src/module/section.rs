//! Section classification for loaded module images.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::Address;

/// The recognized PE section kinds, keyed by their canonical name prefix.
///
/// Section names outside this set are not scannable and get dropped during
/// table construction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumCount,
    EnumIter,
)]
#[repr(u8)]
pub enum SectionKind {
    /// Executable code.
    #[strum(serialize = ".text")]
    Text = 0,
    /// Read-only data (constants, string literals).
    #[strum(serialize = ".rdata")]
    Rdata = 1,
    /// Initialized read-write data.
    #[strum(serialize = ".data")]
    Data = 2,
    /// Uninitialized data, allocated at load time.
    #[strum(serialize = ".bss")]
    Bss = 3,
    /// Export directory.
    #[strum(serialize = ".edata")]
    Edata = 4,
    /// Import directory.
    #[strum(serialize = ".idata")]
    Idata = 5,
    /// Base relocations.
    #[strum(serialize = ".reloc")]
    Reloc = 6,
    /// Resources.
    #[strum(serialize = ".rsrc")]
    Rsrc = 7,
    /// Thread-local storage.
    #[strum(serialize = ".tls")]
    Tls = 8,
    /// Exception data (64-bit unwind info).
    #[strum(serialize = ".pdata")]
    Pdata = 9,
    /// Debug information.
    #[strum(serialize = ".debug")]
    Debug = 10,
}

impl SectionKind {
    /// Classify a raw section-header name (8 bytes, null padded) by prefix.
    ///
    /// Prefix matching mirrors the loader: `.textbss` classifies as `Text`.
    pub fn classify(raw_name: &[u8]) -> Option<Self> {
        use strum::IntoEnumIterator;

        SectionKind::iter().find(|kind| raw_name.starts_with(kind.prefix().as_bytes()))
    }

    /// The canonical section-name prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        self.into()
    }
}

/// Half-open byte range of one module section. A zero/zero range means the
/// section is absent from the scanned module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRange {
    pub start: Address,
    pub end: Address,
}

impl SectionRange {
    pub fn new(start: Address, end: Address) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == 0 || self.end <= self.start
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, address: Address) -> bool {
        !self.is_empty() && address >= self.start && address < self.end
    }
}

/// Fixed table of one range per recognized section kind, immutable once the
/// owning [`crate::ModuleImage`] has been built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    ranges: [SectionRange; <SectionKind as EnumCount>::COUNT],
}

impl SectionTable {
    pub fn get(&self, kind: SectionKind) -> SectionRange {
        self.ranges[kind as usize]
    }

    pub(crate) fn set(&mut self, kind: SectionKind, range: SectionRange) {
        self.ranges[kind as usize] = range;
    }

    /// True when no section was recognized (e.g. the module never resolved).
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(SectionRange::is_empty)
    }
}
