//! Pluggable per-queue mutual-exclusion policies.
//!
//! Every captor guards its shared state with a lock policy chosen at
//! construction. The lock is held only for the duration of a queue
//! operation, never across a sink write.

use std::cell::RefCell;
use std::fmt::Debug;
use std::sync::{Mutex, TryLockError};

/// Marker returned when a polling lock cannot be acquired without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contended;

/// Mutual-exclusion strategy applied to a captor's shared state.
///
/// Three implementations cover the supported scheduling models:
/// [`NoLock`] for single-threaded use, [`MutexLock`] for blocking
/// exclusion, and [`PollingLock`] for non-blocking try-lock semantics
/// where a contended queue behaves as if it were empty.
pub trait LockPolicy: Debug + Default + Send + Sync + 'static {
    /// Cell type wrapping the guarded state.
    type Cell<T>;

    /// Wrap `value` in this policy's cell.
    fn new_cell<T>(value: T) -> Self::Cell<T>;

    /// Run `op` with exclusive access to the guarded state.
    ///
    /// Blocking policies always return `Ok`; [`PollingLock`] fails with
    /// [`Contended`] instead of waiting.
    fn with<T, R>(cell: &Self::Cell<T>, op: impl FnOnce(&mut T) -> R) -> Result<R, Contended>;
}

/// Single-threaded stand-in: the caller guarantees exclusion.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl LockPolicy for NoLock {
    type Cell<T> = RefCell<T>;

    fn new_cell<T>(value: T) -> RefCell<T> {
        RefCell::new(value)
    }

    fn with<T, R>(cell: &RefCell<T>, op: impl FnOnce(&mut T) -> R) -> Result<R, Contended> {
        Ok(op(&mut cell.borrow_mut()))
    }
}

/// Blocking mutual exclusion; every queue operation acquires the mutex.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutexLock;

impl LockPolicy for MutexLock {
    type Cell<T> = Mutex<T>;

    fn new_cell<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    fn with<T, R>(cell: &Mutex<T>, op: impl FnOnce(&mut T) -> R) -> Result<R, Contended> {
        let mut guard = match cell.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(op(&mut guard))
    }
}

/// Non-blocking try-lock; contended operations behave as if the queue
/// were empty and report [`Contended`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PollingLock;

impl LockPolicy for PollingLock {
    type Cell<T> = Mutex<T>;

    fn new_cell<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    fn with<T, R>(cell: &Mutex<T>, op: impl FnOnce(&mut T) -> R) -> Result<R, Contended> {
        match cell.try_lock() {
            Ok(mut guard) => Ok(op(&mut guard)),
            Err(TryLockError::Poisoned(poisoned)) => Ok(op(&mut poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => Err(Contended),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_lock_runs_inline() {
        let cell = NoLock::new_cell(1u32);
        let result = NoLock::with(&cell, |value| {
            *value += 1;
            *value
        });
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_polling_lock_reports_contention() {
        let cell = PollingLock::new_cell(0u32);

        // Hold the lock on this thread; the policy must not block.
        let _guard = cell.lock().unwrap();
        let result = PollingLock::with(&cell, |value| *value);
        assert_eq!(result, Err(Contended));
    }

    #[test]
    fn test_mutex_lock_blocks_until_available() {
        let cell = MutexLock::new_cell(5u32);
        assert_eq!(MutexLock::with(&cell, |value| *value), Ok(5));
    }
}
