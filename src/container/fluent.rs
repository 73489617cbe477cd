//! Fluent configuration of committed registrations.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::Container;
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::registration::{erase_initializer, DisposeHook, SharedEntry};
use crate::traits::Dispose;

/// Handle to a live registration of `S`.
///
/// Returned by the `register*` methods of [`Container`]. Changes apply to the
/// entry already in the registry, so they affect instances created afterwards.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Owner, ReuseScope};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Counter(AtomicUsize);
///
/// let container = Container::new();
/// container
///     .register(|_| Arc::new(Counter(AtomicUsize::new(0))))
///     .unwrap()
///     .reused_within(ReuseScope::Container)
///     .owned_by(Owner::External)
///     .initialized_by(|_, counter| {
///         counter.0.fetch_add(1, Ordering::SeqCst);
///     });
///
/// let counter = container.resolve::<Counter>().unwrap();
/// container.resolve::<Counter>().unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// ```
pub struct Registration<S: ?Sized> {
    key: ServiceKey,
    entry: SharedEntry,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl<S> Registration<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(key: ServiceKey, entry: SharedEntry) -> Self {
        Self {
            key,
            entry,
            _service: PhantomData,
        }
    }

    pub fn owned_by(self, owner: Owner) -> Self {
        self.entry.lock().set_owner(owner);
        self
    }

    pub fn reused_within(self, reuse: ReuseScope) -> Self {
        self.entry.lock().set_reuse(reuse);
        self
    }

    /// Runs `initializer` after each new instance is created and cached.
    ///
    /// The container passed in is the one the instance was created on. Last
    /// write wins.
    ///
    /// For reused registrations the instance is cached before the initializer
    /// runs. If the initializer fails (for example a `resolve_required` inside
    /// it cannot find a dependency), the resolve that created the instance
    /// returns the error, but the instance stays cached: later resolves return
    /// it as is and the initializer does not run again.
    pub fn initialized_by<F>(self, initializer: F) -> Self
    where
        F: Fn(&Container, &Arc<S>) + Send + Sync + 'static,
    {
        self.entry.lock().set_initializer(erase_initializer(initializer));
        self
    }

    /// Lets the container dispose the instances it owns.
    pub fn disposed_by_container(self) -> Self
    where
        S: Dispose,
    {
        self.entry.lock().set_dispose_hook(DisposeHook::of::<S>());
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// The shared entry as stored in the registry.
    pub fn entry(&self) -> &SharedEntry {
        &self.entry
    }

    pub fn owner(&self) -> Owner {
        self.entry.lock().owner()
    }

    pub fn reuse(&self) -> ReuseScope {
        self.entry.lock().reuse()
    }
}

impl<S: ?Sized> fmt::Debug for Registration<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("entry", &*self.entry.lock())
            .finish()
    }
}
