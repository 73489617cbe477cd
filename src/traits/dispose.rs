//! Disposal trait for deterministic teardown.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections). A registration opts in with `disposed_by_container()`; the
/// container then calls `dispose` when it is itself disposed. Instances without reuse go
/// first, then cached instances, each group newest first; see `Container::dispose`.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Dispose};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register(|_| Arc::new(Cache { flushed: AtomicBool::new(false) }))
///     .unwrap()
///     .disposed_by_container();
///
/// let cache = container.resolve::<Cache>().unwrap();
/// container.dispose();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
