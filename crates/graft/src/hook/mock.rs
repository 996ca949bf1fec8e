//! Test-only detour backend: records primitive calls and injects failures.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::Address;
use crate::hook::backend::{BackendError, BackendResult, DetourBackend};

/// Operations the mock can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Remove,
    Enable,
    Disable,
}

#[derive(Debug, Default)]
struct Entry {
    replacement: Address,
    enabled: bool,
}

#[derive(Debug, Default)]
struct State {
    hooks: HashMap<Address, Entry>,
    calls: Vec<Op>,
    failing: HashMap<Op, String>,
}

/// Single-threaded fake of the detour primitive, mirroring its bookkeeping
/// rules: double-create and remove-of-unknown are errors, trampolines are
/// fabricated from the target address.
#[derive(Debug, Default)]
pub struct MockDetourBackend {
    state: RefCell<State>,
}

const TRAMPOLINE_DISPLACEMENT: Address = 0x0FF0_0000;

impl MockDetourBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with `status` until cleared.
    pub fn fail_on(&self, op: Op, status: &str) {
        self.state
            .borrow_mut()
            .failing
            .insert(op, status.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().failing.clear();
    }

    /// Number of primitive calls of `op` seen so far.
    pub fn calls(&self, op: Op) -> usize {
        self.state.borrow().calls.iter().filter(|&&c| c == op).count()
    }

    /// The replacement currently wired to `target`, if a hook exists.
    pub fn replacement_of(&self, target: Address) -> Option<Address> {
        self.state
            .borrow()
            .hooks
            .get(&target)
            .map(|entry| entry.replacement)
    }

    pub fn is_enabled(&self, target: Address) -> bool {
        self.state
            .borrow()
            .hooks
            .get(&target)
            .is_some_and(|entry| entry.enabled)
    }

    pub fn trampoline_for(target: Address) -> Address {
        target + TRAMPOLINE_DISPLACEMENT
    }

    fn check(&self, op: Op) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(op);
        match state.failing.get(&op) {
            Some(status) => Err(BackendError::new(status.clone())),
            None => Ok(()),
        }
    }
}

impl DetourBackend for MockDetourBackend {
    fn create(&self, target: Address, replacement: Address) -> BackendResult<Address> {
        self.check(Op::Create)?;
        let mut state = self.state.borrow_mut();
        if state.hooks.contains_key(&target) {
            return Err(BackendError::new("ALREADY_CREATED"));
        }
        state.hooks.insert(
            target,
            Entry {
                replacement,
                enabled: false,
            },
        );
        Ok(Self::trampoline_for(target))
    }

    fn remove(&self, target: Address) -> BackendResult<()> {
        self.check(Op::Remove)?;
        match self.state.borrow_mut().hooks.remove(&target) {
            Some(_) => Ok(()),
            None => Err(BackendError::new("NOT_CREATED")),
        }
    }

    fn enable(&self, target: Address) -> BackendResult<()> {
        self.check(Op::Enable)?;
        match self.state.borrow_mut().hooks.get_mut(&target) {
            Some(entry) => {
                entry.enabled = true;
                Ok(())
            }
            None => Err(BackendError::new("NOT_CREATED")),
        }
    }

    fn disable(&self, target: Address) -> BackendResult<()> {
        self.check(Op::Disable)?;
        match self.state.borrow_mut().hooks.get_mut(&target) {
            Some(entry) => {
                entry.enabled = false;
                Ok(())
            }
            None => Err(BackendError::new("NOT_CREATED")),
        }
    }
}
