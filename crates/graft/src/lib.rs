//! # graft
//!
//! Runtime binary-patching toolkit: signature scanning over the sections of
//! a loaded module, control-transfer resolution, and detour lifecycle
//! management for live-process instrumentation.
//!
//! This crate provides:
//! - Module section enumeration from the in-memory PE section table
//! - Combo-pattern compilation (hex bytes + wildcards) and direction-aware
//!   byte scanning
//! - `call`/`jmp` chain resolution to stable, callable addresses
//! - A hook state machine over an injected detour primitive, with a typed
//!   call-through to the original function
//!
//! Scanning and resolution read target memory through the [`ReadMemory`]
//! capability; detours go through the [`DetourBackend`] capability. Both
//! have process-backed implementations and are injectable, so every state
//! machine in the crate is testable against synthetic images and a fake
//! primitive.

pub mod error;
pub mod flow;
pub mod hook;
pub mod memory;
pub mod module;
pub mod pattern;
pub mod scan;
pub mod signature;

/// Raw address in the target process's address space.
///
/// A transient observation, not an owned pointer: validity is contingent on
/// the module remaining loaded and unmoved.
pub type Address = u64;

pub use error::{Error, Result};
pub use flow::{Transfer, read_pointer, resolve_rip_relative, resolve_transfer};
pub use hook::{BackendError, BackendResult, DetourBackend, Hook};
pub use memory::{InProcessReader, ReadMemory};
pub use module::{ModuleImage, SectionKind, SectionRange, SectionTable};
pub use pattern::{DEFAULT_MAX_PATTERN_LEN, Pattern};
pub use scan::{ScanRange, Scanner};
pub use signature::{
    SignatureSet, SignatureSpec, load_addresses, load_signatures, save_addresses, save_signatures,
};

#[cfg(target_os = "windows")]
pub use hook::MinHookBackend;
#[cfg(target_os = "windows")]
pub use module::loaded_module_base;
