//! Utility functions for timesync-core

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
