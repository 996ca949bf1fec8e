//! Hook lifecycle management.
//!
//! A [`Hook`] tracks one detour — target function, replacement, and the
//! trampoline that preserves the pre-hook behavior — through its states:
//! uninstalled (no trampoline), created (trampoline allocated, inactive),
//! and enabled (detour live). Every transition is idempotent and reports
//! the underlying primitive's status on failure.
//!
//! The manager adds no locking of its own: mutating one hook from several
//! threads concurrently requires external synchronization. The installed
//! replacement and the trampoline are plain function pointers, callable
//! re-entrantly from any thread.

mod backend;
#[cfg(target_os = "windows")]
mod minhook;
#[cfg(test)]
pub mod mock;

pub use backend::{BackendError, BackendResult, DetourBackend};
#[cfg(target_os = "windows")]
pub use minhook::MinHookBackend;
#[cfg(test)]
pub use mock::MockDetourBackend;

use tracing::{debug, error};

use crate::Address;
use crate::error::{Error, Result};

/// One named detour and its lifecycle state.
pub struct Hook<'a, B: DetourBackend> {
    backend: &'a B,
    name: String,
    target: Address,
    replacement: Address,
    trampoline: Option<Address>,
    enabled: bool,
}

impl<'a, B: DetourBackend> Hook<'a, B> {
    /// Describe a hook without touching the target: `target` is the function
    /// to redirect, `replacement` the function that takes over.
    pub fn new(backend: &'a B, name: impl Into<String>, target: Address, replacement: Address) -> Self {
        Self {
            backend,
            name: name.into(),
            target,
            replacement,
            trampoline: None,
            enabled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn replacement(&self) -> Address {
        self.replacement
    }

    /// The trampoline address, present once `create` has succeeded.
    pub fn trampoline(&self) -> Option<Address> {
        self.trampoline
    }

    pub fn is_created(&self) -> bool {
        self.trampoline.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Allocate the trampoline. Idempotent: a created hook succeeds without
    /// side effects. On primitive failure the hook stays uninstalled.
    pub fn create(&mut self) -> Result<()> {
        if self.trampoline.is_some() {
            return Ok(());
        }

        match self.backend.create(self.target, self.replacement) {
            Ok(trampoline) => {
                self.trampoline = Some(trampoline);
                debug!(hook = %self.name, "created hook");
                Ok(())
            }
            Err(e) => {
                error!(hook = %self.name, status = %e, "creating hook failed");
                Err(self.detour_error(e))
            }
        }
    }

    /// Release the trampoline. Idempotent: removing a hook that was never
    /// created succeeds trivially. A successful removal always leaves the
    /// record disabled, whatever state it was in.
    pub fn remove(&mut self) -> Result<()> {
        if self.trampoline.is_none() {
            return Ok(());
        }

        match self.backend.remove(self.target) {
            Ok(()) => {
                self.enabled = false;
                self.trampoline = None;
                debug!(hook = %self.name, "removed hook");
                Ok(())
            }
            Err(e) => {
                error!(hook = %self.name, status = %e, "removing hook failed");
                Err(self.detour_error(e))
            }
        }
    }

    /// Activate the detour. Idempotent no-op when already enabled; the flag
    /// is updated only on primitive success.
    pub fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }

        match self.backend.enable(self.target) {
            Ok(()) => {
                self.enabled = true;
                debug!(hook = %self.name, "enabled hook");
                Ok(())
            }
            Err(e) => {
                error!(hook = %self.name, status = %e, "enabling hook failed");
                Err(self.detour_error(e))
            }
        }
    }

    /// Deactivate the detour, keeping the trampoline allocated. Idempotent
    /// no-op when already disabled.
    pub fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.backend.disable(self.target) {
            Ok(()) => {
                self.enabled = false;
                debug!(hook = %self.name, "disabled hook");
                Ok(())
            }
            Err(e) => {
                error!(hook = %self.name, status = %e, "disabling hook failed");
                Err(self.detour_error(e))
            }
        }
    }

    /// Swap the replacement function, preserving the enabled state across
    /// the swap. Implemented as remove → create → re-enable; if a step
    /// fails the hook is left uninstalled and the caller retries explicitly
    /// — there is no rollback to the previous replacement.
    pub fn retarget(&mut self, replacement: Address) -> Result<()> {
        let was_enabled = self.enabled;
        let previous = self.replacement;

        self.remove()?;
        self.replacement = replacement;
        self.create()?;
        if was_enabled {
            self.enable()?;
        }

        debug!(
            hook = %self.name,
            from = format_args!("{previous:#x}"),
            to = format_args!("{replacement:#x}"),
            "retargeted hook"
        );
        Ok(())
    }

    /// The trampoline reinterpreted as the caller-supplied function-pointer
    /// type, for invoking the original behavior from inside the
    /// replacement. `None` until `create` succeeds.
    ///
    /// # Safety
    ///
    /// `F` must be the function-pointer type matching the target's true
    /// signature and ABI. The returned pointer is only valid while the hook
    /// stays created.
    pub unsafe fn original<F: Copy>(&self) -> Option<F> {
        self.trampoline.map(|trampoline| {
            assert_eq!(
                std::mem::size_of::<F>(),
                std::mem::size_of::<usize>(),
                "F must be a function pointer type"
            );
            let raw = trampoline as usize;
            // SAFETY: size equality checked above; validity of interpreting
            // the trampoline as F is the caller's contract.
            unsafe { std::mem::transmute_copy::<usize, F>(&raw) }
        })
    }

    fn detour_error(&self, e: BackendError) -> Error {
        Error::Detour {
            hook: self.name.clone(),
            status: e.0,
        }
    }
}

impl<B: DetourBackend> std::fmt::Debug for Hook<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("target", &format_args!("{:#x}", self.target))
            .field("replacement", &format_args!("{:#x}", self.replacement))
            .field("created", &self.is_created())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockDetourBackend, Op};
    use super::*;

    const TARGET: Address = 0x1_4000_1000;
    const REPLACEMENT: Address = 0x7FF6_0000;
    const REPLACEMENT_2: Address = 0x7FF7_0000;

    fn hook(backend: &MockDetourBackend) -> Hook<'_, MockDetourBackend> {
        Hook::new(backend, "TestHook", TARGET, REPLACEMENT)
    }

    #[test]
    fn test_create_is_idempotent() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.create().unwrap();

        assert_eq!(backend.calls(Op::Create), 1);
        assert!(hook.is_created());
        assert_eq!(hook.trampoline(), Some(MockDetourBackend::trampoline_for(TARGET)));
    }

    #[test]
    fn test_remove_on_never_created_hook() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.remove().unwrap();
        assert_eq!(backend.calls(Op::Remove), 0);
        assert!(!hook.is_enabled());
        assert!(!hook.is_created());
    }

    #[test]
    fn test_enable_twice_hits_primitive_once() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.enable().unwrap();
        hook.enable().unwrap();

        assert_eq!(backend.calls(Op::Enable), 1);
        assert!(hook.is_enabled());
        assert!(backend.is_enabled(TARGET));
    }

    #[test]
    fn test_disable_without_enable_is_noop() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.disable().unwrap();
        assert_eq!(backend.calls(Op::Disable), 0);
    }

    #[test]
    fn test_disable_then_remove_always_succeeds_after_create() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.enable().unwrap();
        hook.disable().unwrap();
        hook.remove().unwrap();

        assert!(!hook.is_created());
        assert!(!hook.is_enabled());
        assert_eq!(backend.replacement_of(TARGET), None);
    }

    #[test]
    fn test_remove_while_enabled_clears_enabled_flag() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.enable().unwrap();
        hook.remove().unwrap();

        assert!(!hook.is_enabled());
        assert!(!hook.is_created());
    }

    #[test]
    fn test_create_failure_leaves_hook_uninstalled() {
        let backend = MockDetourBackend::new();
        backend.fail_on(Op::Create, "NOT_EXECUTABLE");
        let mut hook = hook(&backend);

        let err = hook.create().unwrap_err();
        assert!(err.to_string().contains("NOT_EXECUTABLE"));
        assert!(err.to_string().contains("TestHook"));
        assert!(!hook.is_created());

        // Transient failure: an explicit retry succeeds.
        backend.clear_failures();
        hook.create().unwrap();
        assert!(hook.is_created());
    }

    #[test]
    fn test_enable_failure_keeps_flag_false() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        backend.fail_on(Op::Enable, "UNSUPPORTED_FUNCTION");
        assert!(hook.enable().is_err());
        assert!(!hook.is_enabled());
    }

    #[test]
    fn test_retarget_preserves_enabled_state() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.enable().unwrap();
        hook.retarget(REPLACEMENT_2).unwrap();

        assert!(hook.is_enabled());
        assert!(hook.is_created());
        assert_eq!(hook.replacement(), REPLACEMENT_2);
        assert_eq!(backend.replacement_of(TARGET), Some(REPLACEMENT_2));
        assert!(backend.is_enabled(TARGET));
        assert_eq!(backend.calls(Op::Create), 2);
        assert_eq!(backend.calls(Op::Remove), 1);
        assert_eq!(backend.calls(Op::Enable), 2);
    }

    #[test]
    fn test_retarget_on_disabled_hook_stays_disabled() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.retarget(REPLACEMENT_2).unwrap();

        assert!(!hook.is_enabled());
        assert_eq!(backend.calls(Op::Enable), 0);
        assert_eq!(backend.replacement_of(TARGET), Some(REPLACEMENT_2));
    }

    #[test]
    fn test_retarget_failure_leaves_hook_uninstalled() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        hook.create().unwrap();
        hook.enable().unwrap();

        backend.fail_on(Op::Create, "MEMORY_ALLOC");
        assert!(hook.retarget(REPLACEMENT_2).is_err());

        assert!(!hook.is_created());
        assert!(!hook.is_enabled());
        assert_eq!(hook.replacement(), REPLACEMENT_2);

        // Caller retries explicitly once the primitive recovers.
        backend.clear_failures();
        hook.create().unwrap();
        hook.enable().unwrap();
        assert!(hook.is_enabled());
    }

    #[test]
    fn test_original_is_typed_view_of_trampoline() {
        let backend = MockDetourBackend::new();
        let mut hook = hook(&backend);

        let before: Option<unsafe extern "C" fn()> = unsafe { hook.original() };
        assert!(before.is_none());

        hook.create().unwrap();
        let original: unsafe extern "C" fn() = unsafe { hook.original() }.unwrap();
        assert_eq!(
            original as usize,
            MockDetourBackend::trampoline_for(TARGET) as usize
        );
    }
}
