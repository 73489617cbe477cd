//! Hierarchical container and resolution engine.
//!
//! A [`Container`] holds a registry of [`ServiceEntry`] values and a list of
//! owned child containers. Resolution walks from the asking container up
//! through its ancestors, then applies the entry's [`ReuseScope`]:
//!
//! - `Hierarchy` caches once on the entry, creating the instance on the
//!   container that holds the registration
//! - `Container` copies the entry into the asking container on first use and
//!   caches there
//! - `None` creates a fresh instance every time
//!
//! Disposal releases what the container owns, then its children, newest first.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::builder::{ContainerBuilder, ContainerModule};
use crate::config::ContainerOptions;
use crate::descriptors::ServiceDescriptor;
use crate::error::{ResolutionError, ResolveResult};
use crate::internal::{catch_resolution, with_circular_guard, DisposeBag};
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::registration::{
    downcast_instance, invoker, AnyArc, DisposeHook, Invoker, Registry, ServiceEntry, SharedEntry,
};

mod fluent;
mod lazy;

pub use fluent::Registration;
pub use lazy::Lazy;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    fn next() -> Self {
        ContainerId(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        ContainerId(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

pub(crate) struct ContainerInner {
    id: ContainerId,
    registry: RwLock<Registry>,
    children: Mutex<Vec<Arc<ContainerInner>>>,
    disposables: Mutex<DisposeBag>,
    options: RwLock<ContainerOptions>,
    sequence: AtomicU64,
    disposed: AtomicBool,
}

impl ContainerInner {
    fn new(options: ContainerOptions) -> Self {
        let id = ContainerId::next();
        let mut registry = Registry::new();

        // Every container resolves itself; the entry never caches, so the
        // handle returned is always the one being asked
        let mut this = ServiceEntry::with_factory(|c: &Container, ()| Arc::new(c.clone()))
            .owned_by(Owner::External)
            .reused_within(ReuseScope::None);
        let self_key = ServiceKey::of::<Container, ()>(None);
        if this
            .commit(&self_key, id, Owner::External, ReuseScope::None)
            .is_ok()
        {
            registry.insert(self_key, Arc::new(Mutex::new(this)));
        }

        Self {
            id,
            registry: RwLock::new(registry),
            children: Mutex::new(Vec::new()),
            disposables: Mutex::new(DisposeBag::default()),
            options: RwLock::new(options),
            sequence: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    /// Disposes owned instances, then children.
    ///
    /// Everything released is drained, so a repeat call only sees what was
    /// resolved or created since.
    fn dispose_tree(&self) {
        self.disposed.store(true, Ordering::Release);
        debug!(container = %self.id, "disposing container");

        // Weakly tracked instances, newest first
        let mut released = 0usize;
        loop {
            let next = self.disposables.lock().pop();
            match next {
                Some(dispose) => {
                    if dispose() {
                        released += 1;
                    }
                }
                None => break,
            }
        }

        // Reused instances created for this container's own registrations
        let mut owned: Vec<(AnyArc, u64, DisposeHook)> = Vec::new();
        {
            let registry = self.registry.read();
            for (_, entry) in registry.iter() {
                let mut entry = entry.lock();
                if entry.reuse() == ReuseScope::None
                    || entry.owner() != Owner::Container
                    || entry.registration_container() != Some(self.id)
                {
                    continue;
                }
                let Some(hook) = entry.dispose_hook() else {
                    continue;
                };
                if let Some((instance, sequence)) = entry.take_instance() {
                    owned.push((instance, sequence, hook));
                }
            }
        }
        owned.sort_by(|a, b| b.1.cmp(&a.1));
        released += owned.len();
        for (instance, _, hook) in owned {
            hook.dispose(&instance);
        }

        // Children, newest first
        loop {
            let child = self.children.lock().pop();
            match child {
                Some(child) => {
                    child.dispose_tree();
                }
                None => break,
            }
        }

        debug!(container = %self.id, released, "container disposed");
    }

    /// Owned instances that `dispose` would still release.
    fn pending_disposals(&self) -> usize {
        let tracked = self.disposables.lock().len();
        let cached = self
            .registry
            .read()
            .iter()
            .filter(|(_, entry)| {
                let entry = entry.lock();
                entry.reuse() != ReuseScope::None
                    && entry.owner() == Owner::Container
                    && entry.registration_container() == Some(self.id)
                    && entry.is_disposed_by_container()
                    && entry.has_instance()
            })
            .count();
        tracked + cached
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let pending = self.pending_disposals();
        if pending > 0 {
            warn!(
                container = %self.id,
                pending,
                "container dropped with owned instances that were never disposed"
            );
        }
    }
}

/// Hierarchical inversion-of-control container.
///
/// A `Container` is a cheap handle: cloning it yields another handle to the
/// same container. Child containers are created with
/// [`create_child_container`](Container::create_child_container); each child
/// sees its parent's registrations and can override them locally.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, ReuseScope};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// struct Service {
///     greeter: Arc<dyn Greeter>,
/// }
///
/// let container = Container::new();
/// container.register::<dyn Greeter, _>(|_| Arc::new(English) as Arc<dyn Greeter>).unwrap();
/// container
///     .register(|c| Arc::new(Service { greeter: c.resolve_required::<dyn Greeter>() }))
///     .unwrap()
///     .reused_within(ReuseScope::Container);
///
/// let service = container.resolve::<Service>().unwrap();
/// assert_eq!(service.greeter.greet(), "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
    parent: Option<Arc<Container>>,
}

impl Container {
    /// Creates a root container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates a root container with the given default policies.
    pub fn with_options(options: ContainerOptions) -> Self {
        let inner = Arc::new(ContainerInner::new(options));
        debug!(container = %inner.id, "created container");
        Self { inner, parent: None }
    }

    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Handle to the parent container, if any.
    pub fn parent(&self) -> Option<&Container> {
        self.parent.as_deref()
    }

    pub fn options(&self) -> ContainerOptions {
        *self.inner.options.read()
    }

    /// Owner given to later registrations that leave it unset.
    pub fn set_default_owner(&self, owner: Owner) {
        self.inner.options.write().default_owner = owner;
    }

    /// Reuse scope given to later registrations left at [`ReuseScope::Default`].
    pub fn set_default_reuse(&self, reuse: ReuseScope) {
        self.inner.options.write().default_reuse = reuse;
    }

    // ----- Registration -----

    /// Commits an entry under `key`, replacing any previous registration.
    ///
    /// Unset policies are filled from this container's options. The
    /// container's own registration cannot be replaced.
    pub fn register_entry(&self, key: ServiceKey, mut entry: ServiceEntry) -> ResolveResult<SharedEntry> {
        if key.is_container_service() {
            return Err(ResolutionError::IllegalRegistration {
                service: key.service_type_name(),
                reason: "a container always resolves to itself".to_string(),
            });
        }
        let options = self.options();
        entry.commit(&key, self.id(), options.default_owner, options.default_reuse)?;
        trace!(
            container = %self.id(),
            service = %key,
            owner = %entry.owner(),
            reuse = %entry.reuse(),
            "registered service"
        );
        let shared = Arc::new(Mutex::new(entry));
        self.inner.registry.write().insert(key, shared.clone());
        Ok(shared)
    }

    fn register_typed<S, A>(&self, name: Option<&str>, entry: ServiceEntry) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        let key = ServiceKey::of::<S, A>(name);
        let shared = self.register_entry(key.clone(), entry)?;
        Ok(Registration::new(key, shared))
    }

    /// Registers a factory for `S`.
    pub fn register<S, F>(&self, factory: F) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Arc<S> + Send + Sync + 'static,
    {
        let entry = ServiceEntry::with_factory(move |c: &Container, ()| factory(c));
        self.register_typed::<S, ()>(None, entry)
    }

    /// Registers a named factory for `S`.
    pub fn register_named<S, F>(&self, name: &str, factory: F) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Arc<S> + Send + Sync + 'static,
    {
        let entry = ServiceEntry::with_factory(move |c: &Container, ()| factory(c));
        self.register_typed::<S, ()>(Some(name), entry)
    }

    /// Registers a factory taking an argument tuple `A`.
    ///
    /// ```rust
    /// use ferrous_ioc::Container;
    /// use std::sync::Arc;
    ///
    /// struct Endpoint { host: String, port: u16 }
    ///
    /// let container = Container::new();
    /// container
    ///     .register_with(|_, (host, port): (String, u16)| Arc::new(Endpoint { host, port }))
    ///     .unwrap();
    ///
    /// let endpoint = container
    ///     .resolve_with::<Endpoint, _>(("localhost".to_string(), 8080u16))
    ///     .unwrap();
    /// assert_eq!(endpoint.port, 8080);
    /// ```
    pub fn register_with<S, A, F>(&self, factory: F) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
        F: Fn(&Container, A) -> Arc<S> + Send + Sync + 'static,
    {
        self.register_typed::<S, A>(None, ServiceEntry::with_factory(factory))
    }

    /// Registers a named factory taking an argument tuple `A`.
    pub fn register_named_with<S, A, F>(&self, name: &str, factory: F) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
        F: Fn(&Container, A) -> Arc<S> + Send + Sync + 'static,
    {
        self.register_typed::<S, A>(Some(name), ServiceEntry::with_factory(factory))
    }

    /// Registers an existing instance, shared by the hierarchy and owned externally.
    pub fn register_instance<S>(&self, instance: Arc<S>) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register_typed::<S, ()>(None, ServiceEntry::with_instance(instance))
    }

    pub fn register_named_instance<S>(&self, name: &str, instance: Arc<S>) -> ResolveResult<Registration<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register_typed::<S, ()>(Some(name), ServiceEntry::with_instance(instance))
    }

    /// Runs a module's registrations against this container.
    pub fn install<M: ContainerModule>(&self, module: M) -> ResolveResult<()> {
        let mut builder = ContainerBuilder::with_options(self.options());
        builder.add_module(module)?;
        builder.apply(self)
    }

    // ----- Resolution -----

    /// Resolves `S`.
    ///
    /// Fails with [`ResolutionError::Missing`] when neither this container nor
    /// any ancestor has a registration.
    pub fn resolve<S>(&self) -> ResolveResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve_required_key::<S, ()>(None, ())
    }

    pub fn resolve_named<S>(&self, name: &str) -> ResolveResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve_required_key::<S, ()>(Some(name), ())
    }

    /// Resolves `S` from a factory registered with argument tuple `A`.
    pub fn resolve_with<S, A>(&self, args: A) -> ResolveResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.resolve_required_key::<S, A>(None, args)
    }

    pub fn resolve_named_with<S, A>(&self, name: &str, args: A) -> ResolveResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.resolve_required_key::<S, A>(Some(name), args)
    }

    /// Resolves `S`, or `Ok(None)` when it is not registered.
    ///
    /// Only a missing registration for `S` itself is downgraded; failures of
    /// nested resolutions inside the factory are still errors.
    pub fn try_resolve<S>(&self) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve_typed::<S, ()>(None, (), false)
    }

    pub fn try_resolve_named<S>(&self, name: &str) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve_typed::<S, ()>(Some(name), (), false)
    }

    pub fn try_resolve_with<S, A>(&self, args: A) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.resolve_typed::<S, A>(None, args, false)
    }

    pub fn try_resolve_named_with<S, A>(&self, name: &str, args: A) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.resolve_typed::<S, A>(Some(name), args, false)
    }

    /// Resolves `S` from inside a factory.
    ///
    /// # Panics
    ///
    /// Panics with the [`ResolutionError`] as payload when resolution fails.
    /// The enclosing `resolve` call turns that panic back into its `Err`, so
    /// factories can use this like `?`.
    pub fn resolve_required<S>(&self) -> Arc<S>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self.resolve::<S>() {
            Ok(instance) => instance,
            Err(err) => std::panic::panic_any(err),
        }
    }

    /// Named form of [`resolve_required`](Container::resolve_required).
    pub fn resolve_named_required<S>(&self, name: &str) -> Arc<S>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self.resolve_named::<S>(name) {
            Ok(instance) => instance,
            Err(err) => std::panic::panic_any(err),
        }
    }

    /// Deferred resolution of `S`.
    ///
    /// Fails now if `S` is not registered; each later call resolves again and
    /// so honours the registration's reuse scope.
    pub fn lazy_resolve<S>(&self) -> ResolveResult<Lazy<S, ()>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.lazy_key(ServiceKey::of::<S, ()>(None))
    }

    pub fn lazy_resolve_named<S>(&self, name: &str) -> ResolveResult<Lazy<S, ()>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.lazy_key(ServiceKey::of::<S, ()>(Some(name)))
    }

    pub fn lazy_resolve_with<S, A>(&self) -> ResolveResult<Lazy<S, A>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.lazy_key(ServiceKey::of::<S, A>(None))
    }

    fn lazy_key<S, A>(&self, key: ServiceKey) -> ResolveResult<Lazy<S, A>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        if self.lookup(&key).is_none() {
            return Err(ResolutionError::missing(key.service_type_name(), key.service_name()));
        }
        Ok(Lazy::new(self.clone(), key))
    }

    fn resolve_required_key<S, A>(&self, name: Option<&str>, args: A) -> ResolveResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.resolve_typed::<S, A>(name, args, true)?
            .ok_or_else(|| ResolutionError::missing(type_name::<S>(), name))
    }

    pub(crate) fn resolve_typed<S, A>(
        &self,
        name: Option<&str>,
        args: A,
        throw_if_missing: bool,
    ) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        let key = ServiceKey::of::<S, A>(name);
        self.resolve_keyed::<S>(&key, invoker::<S, A>(args), throw_if_missing)
    }

    pub(crate) fn resolve_keyed<S>(
        &self,
        key: &ServiceKey,
        invoker: Invoker,
        throw_if_missing: bool,
    ) -> ResolveResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self.resolve_key(key, invoker, throw_if_missing)? {
            Some(instance) => downcast_instance::<S>(&instance).map(Some),
            None => Ok(None),
        }
    }

    /// Erased resolution: lookup, reuse dispatch and creation.
    fn resolve_key(&self, key: &ServiceKey, invoker: Invoker, throw_if_missing: bool) -> ResolveResult<Option<AnyArc>> {
        catch_resolution(|| {
            trace!(container = %self.id(), service = %key, "resolving service");

            let Some((found, entry)) = self.lookup(key) else {
                return if throw_if_missing {
                    Err(ResolutionError::missing(key.service_type_name(), key.service_name()))
                } else {
                    Ok(None)
                };
            };

            let reuse = entry.lock().reuse();
            match reuse {
                ReuseScope::None => self.create(key, &entry, invoker).map(Some),
                ReuseScope::Container => {
                    let entry = if found.ptr_eq(self) {
                        entry
                    } else {
                        self.clone_entry_locally(key, &entry)
                    };
                    let cached = entry.lock().instance();
                    match cached {
                        Some(instance) => Ok(Some(instance)),
                        None => self.create(key, &entry, invoker).map(Some),
                    }
                }
                ReuseScope::Hierarchy => {
                    let cached = entry.lock().instance();
                    match cached {
                        Some(instance) => Ok(Some(instance)),
                        None => found.create(key, &entry, invoker).map(Some),
                    }
                }
                ReuseScope::Default => Err(ResolutionError::InvalidConfiguration {
                    service: key.service_type_name(),
                    reason: format!("unsupported reuse scope '{}'", reuse),
                }),
            }
        })
    }

    /// First container from this one upwards whose registry holds `key`.
    fn lookup(&self, key: &ServiceKey) -> Option<(&Container, SharedEntry)> {
        let mut current = Some(self);
        while let Some(container) = current {
            let entry = container.inner.registry.read().get(key);
            if let Some(entry) = entry {
                return Some((container, entry));
            }
            current = container.parent();
        }
        None
    }

    fn clone_entry_locally(&self, key: &ServiceKey, entry: &SharedEntry) -> SharedEntry {
        let copy = entry.lock().clone_for(self.id());
        debug!(container = %self.id(), service = %key, "copied registration into container");
        self.inner
            .registry
            .write()
            .get_or_insert(key, Arc::new(Mutex::new(copy)))
    }

    /// Runs the factory with `self` as the ambient container, then caches,
    /// tracks and initializes the instance as its entry requires.
    fn create(&self, key: &ServiceKey, entry: &SharedEntry, invoker: Invoker) -> ResolveResult<AnyArc> {
        let (factory, reuse, owner, hook) = {
            let entry = entry.lock();
            (entry.factory(), entry.reuse(), entry.owner(), entry.dispose_hook())
        };

        let created = with_circular_guard(key, || invoker(self, &factory))??;
        debug!(container = %self.id(), service = %key, reuse = %reuse, "created instance");

        let instance = if reuse == ReuseScope::None {
            if owner == Owner::Container {
                if let Some(dispose) = hook.and_then(|hook| hook.track(&created)) {
                    self.inner.disposables.lock().push(dispose);
                }
            }
            created
        } else {
            let sequence = self.inner.next_sequence();
            let (winner, stored) = entry.lock().store_instance(created, sequence);
            if !stored {
                return Ok(winner);
            }
            winner
        };

        let initializer = entry.lock().initializer();
        if let Some(initialize) = initializer {
            initialize(self, &instance);
        }
        Ok(instance)
    }

    // ----- Hierarchy -----

    /// Creates a child container owned by this one.
    ///
    /// The child starts with this container's options, sees its
    /// registrations, and is disposed with it.
    pub fn create_child_container(&self) -> Container {
        let inner = Arc::new(ContainerInner::new(self.options()));
        self.inner.children.lock().push(inner.clone());
        debug!(parent = %self.id(), container = %inner.id, "created child container");
        Container {
            inner,
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Disposes owned instances, then child containers.
    ///
    /// Order is newest first within each kind, not across kinds: instances
    /// without reuse (tracked weakly) go first, then cached instances of this
    /// container's own registrations, then children.
    ///
    /// The container stays usable. Calling `dispose` again releases only what
    /// was created or added after the previous call, so an immediate repeat
    /// does nothing.
    pub fn dispose(&self) {
        self.inner.dispose_tree();
        if let Some(parent) = &self.parent {
            parent
                .inner
                .children
                .lock()
                .retain(|child| !Arc::ptr_eq(child, &self.inner));
        }
    }

    /// Whether `dispose` has been called at least once. Diagnostic only.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Registrations held by this container itself, sorted by key.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let mut descriptors: Vec<ServiceDescriptor> = self
            .inner
            .registry
            .read()
            .iter()
            .filter(|(key, _)| !key.is_container_service())
            .map(|(key, entry)| ServiceDescriptor::from_entry(key, &entry.lock()))
            .collect();
        descriptors.sort_by_key(|d| d.key.to_string());
        descriptors
    }

    /// Number of child containers still owned by this one.
    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Whether `key` resolves from this container.
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.lookup(key).is_some()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("parent", &self.parent.as_ref().map(|p| p.id()))
            .field("registrations", &self.inner.registry.read().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
