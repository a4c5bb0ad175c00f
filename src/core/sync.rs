//! Lock helpers
//!
//! A poisoned lock means a plugin callback panicked while the manager was
//! held. The caller decides what error that becomes.

use std::sync::LockResult;

/// Convert a poisoned lock result into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use modshell::core::sync::handle_mutex_poison;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (lock poisoned while a plugin call was in progress): {}",
            poison_err
        ))
    })
}
