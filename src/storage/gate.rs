//! Re-entrancy gate for whole-store operations
//!
//! Export and import take the gate for their whole run. While it is held, a
//! second export/import and any single-entity write through [`Storage`] are
//! refused with [`ContactbookError::Busy`], so a snapshot can never observe a
//! half-applied write.
//!
//! [`Storage`]: super::Storage

use std::sync::Mutex;

use crate::error::{ContactbookError, ContactbookResult};

/// Holds the name of the operation currently in flight, if any
#[derive(Debug, Default)]
pub struct OperationGate {
    active: Mutex<Option<&'static str>>,
}

impl OperationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate for `operation`, or fail if another operation holds it
    pub fn try_enter(&self, operation: &'static str) -> ContactbookResult<GateGuard<'_>> {
        let mut active = self
            .active
            .lock()
            .map_err(|e| ContactbookError::Storage(format!("Failed to acquire gate: {}", e)))?;

        if let Some(current) = *active {
            return Err(ContactbookError::Busy(current.to_string()));
        }

        *active = Some(operation);
        Ok(GateGuard { gate: self })
    }

    /// Name of the operation holding the gate
    pub fn current(&self) -> Option<&'static str> {
        self.active.lock().ok().and_then(|active| *active)
    }

    /// Fail with `Busy` if any operation holds the gate
    pub fn ensure_idle(&self) -> ContactbookResult<()> {
        match self.current() {
            Some(current) => Err(ContactbookError::Busy(current.to_string())),
            None => Ok(()),
        }
    }
}

/// Releases the gate when dropped, on success and error paths alike
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a OperationGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.gate.active.lock() {
            *active = None;
        }
    }
}
