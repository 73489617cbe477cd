//! Internal disposal bag for weakly tracked instances.

/// Teardown hook for a tracked instance.
///
/// Returns `false` when the instance was already dropped, so nothing ran.
pub(crate) type WeakDisposer = Box<dyn FnOnce() -> bool + Send>;

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<WeakDisposer>,
}

impl DisposeBag {
    /// Add a disposal hook.
    pub(crate) fn push(&mut self, f: WeakDisposer) {
        self.hooks.push(f);
    }

    /// Takes the newest hook.
    pub(crate) fn pop(&mut self) -> Option<WeakDisposer> {
        self.hooks.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
