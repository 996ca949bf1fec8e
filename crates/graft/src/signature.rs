//! Named signature sets and their on-disk JSON form.
//!
//! A signature file pairs human-authored combo patterns with the section to
//! scan and the post-match steps that turn a match into a stable address.
//! Resolution itself lives on [`crate::Scanner`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::Address;
use crate::error::Result;
use crate::module::SectionKind;

/// One named signature: what to scan for and how to post-process the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub name: String,
    /// Combo-pattern text, compiled at resolution time.
    pub pattern: String,
    pub section: SectionKind,
    /// Displacement added to the match address.
    #[serde(default)]
    pub offset: i64,
    /// Follow the call/jmp chain at the displaced address to its final
    /// destination.
    #[serde(default)]
    pub deref_call: bool,
}

/// A versioned collection of signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSet {
    pub version: String,
    pub signatures: Vec<SignatureSpec>,
}

impl SignatureSet {
    pub fn entry(&self, name: &str) -> Option<&SignatureSpec> {
        self.signatures
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<SignatureSet> {
    let content = fs::read_to_string(&path)?;
    let set = serde_json::from_str(&content)?;
    Ok(set)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, set: &SignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(set)?;
    fs::write(path, content)?;
    Ok(())
}

/// Persist a resolved name → address map.
pub fn save_addresses<P: AsRef<Path>>(path: P, addresses: &BTreeMap<String, Address>) -> Result<()> {
    let content = serde_json::to_string_pretty(addresses)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_addresses<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, Address>> {
    let content = fs::read_to_string(&path)?;
    let addresses = serde_json::from_str(&content)?;
    Ok(addresses)
}
