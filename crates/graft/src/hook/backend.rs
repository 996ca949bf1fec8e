//! The injected detour primitive.
//!
//! Trampoline installation is process-global machinery (one shared pool of
//! patched prologues per process). It enters the toolkit as a capability
//! trait instead of ambient global state so the lifecycle manager can be
//! driven by a fake in tests.

use thiserror::Error;

use crate::Address;

/// Failure status reported by the detour primitive, carrying the
/// primitive's own status name for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Detour-installation primitive: create/remove/enable/disable a trampoline
/// between two function addresses.
///
/// Implementations keep process-global bookkeeping; the toolkit adds no
/// locking on top. Creating, enabling, disabling, or removing hooks from
/// multiple threads concurrently requires external synchronization.
pub trait DetourBackend {
    /// Allocate a trampoline redirecting `target` to `replacement`, without
    /// activating it. Returns the trampoline address — the callable gateway
    /// to the unhooked prologue.
    fn create(&self, target: Address, replacement: Address) -> BackendResult<Address>;

    /// Release the trampoline for `target`.
    fn remove(&self, target: Address) -> BackendResult<()>;

    /// Activate the detour for `target`.
    fn enable(&self, target: Address) -> BackendResult<()>;

    /// Deactivate the detour for `target`, leaving the trampoline allocated.
    fn disable(&self, target: Address) -> BackendResult<()>;
}
