//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{ResolutionError, ResolveResult};
use crate::key::ServiceKey;

pub(crate) const MAX_DEPTH: usize = 1024;

// Thread-local stack of keys whose factories are currently running
thread_local! {
    static RESOLUTION_TLS: RefCell<ResolutionTls> = RefCell::new(ResolutionTls::default());
}

#[derive(Default)]
struct ResolutionTls {
    stack: Vec<ServiceKey>,
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering pushes the key; dropping pops it, including during unwinding.
pub(crate) struct StackGuard {
    key: ServiceKey,
}

impl StackGuard {
    pub(crate) fn enter(key: &ServiceKey) -> ResolveResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            // Circular detection BEFORE pushing the new key
            if tls.stack.iter().any(|k| k == key) {
                let mut path: Vec<String> = tls.stack.iter().map(ToString::to_string).collect();
                path.push(key.to_string());
                return Err(ResolutionError::Circular(path));
            }

            if tls.stack.len() >= MAX_DEPTH {
                return Err(ResolutionError::DepthExceeded(tls.stack.len()));
            }

            tls.stack.push(key.clone());
            Ok(())
        })?;

        Ok(Self { key: key.clone() })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some(last) = tls.stack.pop() {
                debug_assert_eq!(last, self.key);
            }
        });
    }
}

/// Runs a factory call with circular dependency detection.
pub(crate) fn with_circular_guard<T, F>(key: &ServiceKey, f: F) -> ResolveResult<T>
where
    F: FnOnce() -> T,
{
    let _guard = StackGuard::enter(key)?;
    Ok(f())
}

/// Runs `f`, turning a [`ResolutionError`] panic payload back into an `Err`.
///
/// Factories are infallible, so nested failures raised by
/// `Container::resolve_required` travel as panics up to the nearest resolve
/// boundary. Any other payload resumes unwinding unchanged.
pub(crate) fn catch_resolution<T, F>(f: F) -> ResolveResult<T>
where
    F: FnOnce() -> ResolveResult<T>,
{
    use std::panic::AssertUnwindSafe;

    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => match payload.downcast::<ResolutionError>() {
            Ok(err) => Err(*err),
            Err(other) => std::panic::resume_unwind(other),
        },
    }
}

/// Current nesting of guarded factory calls on this thread.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_TLS.with(|tls| tls.borrow().stack.len())
}
