//! Deferred resolution.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::Container;
use crate::error::{ResolutionError, ResolveResult};
use crate::key::ServiceKey;
use crate::registration::invoker;

/// A resolver bound to one registration key.
///
/// Created by [`Container::lazy_resolve`] and friends, which fail right away
/// if nothing is registered. Each call resolves again through the container,
/// so the registration's reuse scope decides whether instances are shared.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, ReuseScope};
/// use std::sync::Arc;
///
/// struct Report;
///
/// let container = Container::new();
/// container.register(|_| Arc::new(Report)).unwrap().reused_within(ReuseScope::None);
///
/// let lazy = container.lazy_resolve::<Report>().unwrap();
/// let a = lazy.resolve().unwrap();
/// let b = lazy.resolve().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
///
/// struct Missing;
/// assert!(container.lazy_resolve::<Missing>().is_err());
/// ```
pub struct Lazy<S: ?Sized, A = ()> {
    container: Container,
    key: ServiceKey,
    _shape: PhantomData<fn(A) -> Arc<S>>,
}

impl<S, A> Lazy<S, A>
where
    S: ?Sized + Send + Sync + 'static,
    A: 'static,
{
    pub(crate) fn new(container: Container, key: ServiceKey) -> Self {
        Self {
            container,
            key,
            _shape: PhantomData,
        }
    }

    /// Resolves with the given factory arguments.
    pub fn resolve_with(&self, args: A) -> ResolveResult<Arc<S>> {
        self.container
            .resolve_keyed::<S>(&self.key, invoker::<S, A>(args), true)?
            .ok_or_else(|| {
                ResolutionError::missing(self.key.service_type_name(), self.key.service_name())
            })
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }
}

impl<S> Lazy<S, ()>
where
    S: ?Sized + Send + Sync + 'static,
{
    pub fn resolve(&self) -> ResolveResult<Arc<S>> {
        self.resolve_with(())
    }
}

impl<S: ?Sized, A> Clone for Lazy<S, A> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            key: self.key.clone(),
            _shape: PhantomData,
        }
    }
}

impl<S: ?Sized, A> fmt::Debug for Lazy<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("container", &self.container.id())
            .field("key", &self.key)
            .finish()
    }
}
