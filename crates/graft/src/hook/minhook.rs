//! MinHook-backed detour primitive.
//!
//! MinHook keeps one process-global hook table, so the backend is
//! initialized once per process lifetime and handed out as a `'static`
//! reference. There is no teardown: the primitive lives as long as the
//! process does.

use minhook_sys::{
    MH_CreateHook, MH_DisableHook, MH_EnableHook, MH_Initialize, MH_OK, MH_RemoveHook,
};
use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::ptr;
use tracing::{debug, error};

use crate::Address;
use crate::error::{Error, Result};
use crate::hook::backend::{BackendError, BackendResult, DetourBackend};

static INSTANCE: OnceCell<MinHookBackend> = OnceCell::new();

/// The process-wide MinHook detour backend.
pub struct MinHookBackend {
    _private: (),
}

impl MinHookBackend {
    /// Initialize MinHook exactly once and return the shared backend.
    /// Later calls return the same instance without touching the library.
    pub fn initialize() -> Result<&'static Self> {
        INSTANCE.get_or_try_init(|| {
            // SAFETY: guarded by the OnceCell, MH_Initialize runs at most
            // once in this process.
            let status = unsafe { MH_Initialize() };
            if status != MH_OK {
                error!(status = status_name(status), "MinHook initialization failed");
                return Err(Error::Detour {
                    hook: "<initialize>".to_string(),
                    status: status_name(status).to_string(),
                });
            }
            debug!("MinHook initialized");
            Ok(Self { _private: () })
        })
    }
}

impl DetourBackend for MinHookBackend {
    fn create(&self, target: Address, replacement: Address) -> BackendResult<Address> {
        let mut trampoline = ptr::null_mut::<c_void>();
        // SAFETY: target and replacement are function entry points supplied
        // by the caller; MinHook validates hookability and reports a status.
        let status = unsafe {
            MH_CreateHook(
                target as usize as *mut c_void,
                replacement as usize as *mut c_void,
                &mut trampoline,
            )
        };
        if status != MH_OK {
            return Err(BackendError::new(status_name(status)));
        }
        Ok(trampoline as usize as Address)
    }

    fn remove(&self, target: Address) -> BackendResult<()> {
        // SAFETY: MinHook rejects targets it does not track.
        let status = unsafe { MH_RemoveHook(target as usize as *mut c_void) };
        if status != MH_OK {
            return Err(BackendError::new(status_name(status)));
        }
        Ok(())
    }

    fn enable(&self, target: Address) -> BackendResult<()> {
        // SAFETY: as above.
        let status = unsafe { MH_EnableHook(target as usize as *mut c_void) };
        if status != MH_OK {
            return Err(BackendError::new(status_name(status)));
        }
        Ok(())
    }

    fn disable(&self, target: Address) -> BackendResult<()> {
        // SAFETY: as above.
        let status = unsafe { MH_DisableHook(target as usize as *mut c_void) };
        if status != MH_OK {
            return Err(BackendError::new(status_name(status)));
        }
        Ok(())
    }
}

/// Symbolic name for a MinHook status code.
fn status_name(status: i32) -> &'static str {
    match status {
        0 => "MH_OK",
        1 => "MH_ERROR_ALREADY_INITIALIZED",
        2 => "MH_ERROR_NOT_INITIALIZED",
        3 => "MH_ERROR_ALREADY_CREATED",
        4 => "MH_ERROR_NOT_CREATED",
        5 => "MH_ERROR_ENABLED",
        6 => "MH_ERROR_DISABLED",
        7 => "MH_ERROR_NOT_EXECUTABLE",
        8 => "MH_ERROR_UNSUPPORTED_FUNCTION",
        9 => "MH_ERROR_MEMORY_ALLOC",
        10 => "MH_ERROR_MEMORY_PROTECT",
        11 => "MH_ERROR_MODULE_NOT_FOUND",
        12 => "MH_ERROR_FUNCTION_NOT_FOUND",
        _ => "MH_UNKNOWN",
    }
}
