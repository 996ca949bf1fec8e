//! Byte-pattern scanning over module sections or explicit address ranges.

use memchr::{memchr_iter, memrchr_iter};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::Address;
use crate::error::Result;
use crate::flow;
use crate::memory::ReadMemory;
use crate::module::{ModuleImage, SectionKind};
use crate::pattern::Pattern;
use crate::signature::{SignatureSet, SignatureSpec};

/// Where a scan looks: a recognized section of the scanned module, or an
/// explicit pair of bounds. With `Bounds`, `start > end` requests a backward
/// scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRange {
    Section(SectionKind),
    Bounds { start: Address, end: Address },
}

/// Signature scanner for one scanned module.
///
/// All reads go through the injected [`ReadMemory`] capability; the scanner
/// itself holds no target-process resources and performs no writes.
pub struct Scanner<'a, R: ReadMemory> {
    reader: &'a R,
    image: ModuleImage,
}

impl<'a, R: ReadMemory> Scanner<'a, R> {
    pub fn new(reader: &'a R, image: ModuleImage) -> Self {
        Self { reader, image }
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    /// First match of `pattern` in `range`, in scan order.
    pub fn find(&self, pattern: &Pattern, range: ScanRange) -> Result<Option<Address>> {
        Ok(self.scan(pattern, range, true)?.into_iter().next())
    }

    /// First match, displaced by `offset` bytes.
    pub fn find_with_offset(
        &self,
        pattern: &Pattern,
        range: ScanRange,
        offset: i64,
    ) -> Result<Option<Address>> {
        Ok(self
            .find(pattern, range)?
            .map(|address| address.wrapping_add_signed(offset)))
    }

    /// Every match of `pattern` in `range`, in scan order: ascending for a
    /// forward scan, descending for a backward one.
    pub fn find_all(&self, pattern: &Pattern, range: ScanRange) -> Result<Vec<Address>> {
        self.scan(pattern, range, false)
    }

    /// Resolve one named signature: compile, scan its section, apply the
    /// post-match displacement, optionally chase the call/jmp chain.
    pub fn resolve(&self, spec: &SignatureSpec) -> Result<Option<Address>> {
        let pattern = Pattern::parse(&spec.pattern)?;

        let found = self.find_with_offset(&pattern, ScanRange::Section(spec.section), spec.offset)?;
        let Some(address) = found else {
            return Ok(None);
        };

        if spec.deref_call {
            return Ok(flow::resolve_transfer(self.reader, address));
        }

        Ok(Some(address))
    }

    /// Resolve a whole signature set into a name → address map.
    ///
    /// Signatures that do not match are logged and omitted; a partial map is
    /// a normal outcome and completeness is the caller's check.
    pub fn resolve_set(&self, set: &SignatureSet) -> Result<BTreeMap<String, Address>> {
        let mut resolved = BTreeMap::new();

        for spec in &set.signatures {
            match self.resolve(spec)? {
                Some(address) => {
                    debug!(name = %spec.name, address = format_args!("{address:#x}"), "signature resolved");
                    resolved.insert(spec.name.clone(), address);
                }
                None => {
                    warn!(name = %spec.name, "signature did not resolve");
                }
            }
        }

        Ok(resolved)
    }

    /// Concrete bounds for a range request: `(lo, hi, backward)`, or `None`
    /// when the range is absent or empty and must not be scanned.
    fn bounds(&self, range: ScanRange) -> Option<(Address, Address, bool)> {
        match range {
            ScanRange::Section(kind) => {
                let section = self.image.section(kind);
                if section.is_empty() {
                    debug!(section = %kind, "section absent, refusing to scan");
                    return None;
                }
                Some((section.start, section.end, false))
            }
            ScanRange::Bounds { start, end } => {
                if start == end {
                    return None;
                }
                let backward = start > end;
                let (lo, hi) = if backward { (end, start) } else { (start, end) };
                Some((lo, hi, backward))
            }
        }
    }

    fn scan(&self, pattern: &Pattern, range: ScanRange, first_only: bool) -> Result<Vec<Address>> {
        let Some((lo, hi, backward)) = self.bounds(range) else {
            return Ok(Vec::new());
        };

        let span = (hi - lo) as usize;
        if span < pattern.len() {
            return Ok(Vec::new());
        }

        let buffer = self.reader.read_bytes(lo, span)?;

        // Candidate positions are clamped so the full pattern stays inside
        // [lo, hi) in both directions.
        let last_candidate = span - pattern.len();
        let probe_window = &buffer[..=last_candidate];
        let first_byte = pattern.bytes()[0];

        let mut matches = Vec::new();
        if backward {
            for index in memrchr_iter(first_byte, probe_window) {
                if matches_at(&buffer, index, pattern) {
                    matches.push(lo + index as u64);
                    if first_only {
                        break;
                    }
                }
            }
        } else {
            for index in memchr_iter(first_byte, probe_window) {
                if matches_at(&buffer, index, pattern) {
                    matches.push(lo + index as u64);
                    if first_only {
                        break;
                    }
                }
            }
        }

        Ok(matches)
    }
}

/// Mask-aware comparison at a candidate position. Index 0 is the memchr
/// probe itself: compared literally whatever its mask says, so a leading
/// wildcard never degenerates the pattern into match-anything.
fn matches_at(buffer: &[u8], index: usize, pattern: &Pattern) -> bool {
    pattern
        .bytes()
        .iter()
        .enumerate()
        .skip(1)
        .all(|(i, &byte)| !pattern.is_exact(i) || buffer[index + i] == byte)
}
