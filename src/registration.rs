//! Service registration types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::{Container, ContainerId};
use crate::error::{ResolutionError, ResolveResult};
use crate::internal::WeakDisposer;
use crate::key::{FactoryShape, ServiceKey};
use crate::lifetime::{Owner, ReuseScope};
use crate::traits::Dispose;

// Type-erased Arc for storage; always wraps an `Arc<S>`
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Erased factory; holds a `TypedFactory<S, A>`.
pub(crate) type ErasedFactory = Arc<dyn Any + Send + Sync>;

/// Erased initializer, called with the ambient container and the new instance.
pub(crate) type ErasedInitializer = Arc<dyn Fn(&Container, &AnyArc) + Send + Sync>;

/// Erased call of a factory with arguments already captured.
pub(crate) type Invoker = Box<dyn FnOnce(&Container, &ErasedFactory) -> ResolveResult<AnyArc>>;

/// Registry entry shared between a registry and fluent registration handles.
pub type SharedEntry = Arc<Mutex<ServiceEntry>>;

struct TypedFactory<S: ?Sized, A> {
    f: Box<dyn Fn(&Container, A) -> Arc<S> + Send + Sync>,
}

/// Builds an invoker that calls a `TypedFactory<S, A>` with `args`.
pub(crate) fn invoker<S, A>(args: A) -> Invoker
where
    S: ?Sized + Send + Sync + 'static,
    A: 'static,
{
    Box::new(move |on: &Container, factory: &ErasedFactory| -> ResolveResult<AnyArc> {
        let typed = factory
            .downcast_ref::<TypedFactory<S, A>>()
            .ok_or(ResolutionError::TypeMismatch(std::any::type_name::<S>()))?;
        let instance: Arc<S> = (typed.f)(on, args);
        Ok(Arc::new(instance) as AnyArc)
    })
}

/// Recovers the typed instance from its erased form.
pub(crate) fn downcast_instance<S>(instance: &AnyArc) -> ResolveResult<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<S>>()
        .cloned()
        .ok_or(ResolutionError::TypeMismatch(std::any::type_name::<S>()))
}

pub(crate) fn erase_initializer<S, F>(initializer: F) -> ErasedInitializer
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(&Container, &Arc<S>) + Send + Sync + 'static,
{
    Arc::new(move |on: &Container, instance: &AnyArc| {
        if let Some(typed) = instance.downcast_ref::<Arc<S>>() {
            initializer(on, typed);
        }
    })
}

/// How a container tears down instances of one registration.
///
/// Monomorphized per service type when the registration opts in with
/// `disposed_by_container()`.
#[derive(Clone, Copy)]
pub(crate) struct DisposeHook {
    dispose: fn(&AnyArc),
    track: fn(&AnyArc) -> Option<WeakDisposer>,
}

impl DisposeHook {
    pub(crate) fn of<S: ?Sized + Dispose>() -> Self {
        Self {
            dispose: dispose_erased::<S>,
            track: track_erased::<S>,
        }
    }

    /// Disposes a cached instance now.
    pub(crate) fn dispose(&self, instance: &AnyArc) {
        (self.dispose)(instance)
    }

    /// Weakly tracks an instance; the disposer runs only if it is still alive.
    pub(crate) fn track(&self, instance: &AnyArc) -> Option<WeakDisposer> {
        (self.track)(instance)
    }
}

fn dispose_erased<S: ?Sized + Dispose>(instance: &AnyArc) {
    if let Some(typed) = instance.downcast_ref::<Arc<S>>() {
        typed.dispose();
    }
}

fn track_erased<S: ?Sized + Dispose>(instance: &AnyArc) -> Option<WeakDisposer> {
    let weak = Arc::downgrade(instance.downcast_ref::<Arc<S>>()?);
    Some(Box::new(move || match weak.upgrade() {
        Some(alive) => {
            alive.dispose();
            true
        }
        None => false,
    }))
}

/// A registration: factory plus reuse, ownership and initialization policy.
///
/// Entries are normally created through the typed helpers on
/// [`Container`](crate::Container) and [`ContainerBuilder`](crate::ContainerBuilder).
/// Building one by hand and committing it with
/// [`Container::register_entry`](crate::Container::register_entry) is the
/// low-level path.
///
/// Policies left unset (`owner`, and `reuse` at [`ReuseScope::Default`]) are
/// filled with the defaults of whoever commits the entry.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Owner, ReuseScope, ServiceEntry, ServiceKey};
/// use std::sync::Arc;
///
/// struct Clock(u64);
///
/// let container = Container::new();
/// let entry = ServiceEntry::with_factory(|_, ()| Arc::new(Clock(7)))
///     .owned_by(Owner::External)
///     .reused_within(ReuseScope::Container);
///
/// container
///     .register_entry(ServiceKey::of::<Clock, ()>(None), entry)
///     .unwrap();
///
/// assert_eq!(container.resolve::<Clock>().unwrap().0, 7);
/// ```
pub struct ServiceEntry {
    service_id: TypeId,
    service: &'static str,
    shape_id: TypeId,
    factory: ErasedFactory,
    initializer: Option<ErasedInitializer>,
    owner: Option<Owner>,
    reuse: ReuseScope,
    instance: Option<AnyArc>,
    sequence: u64,
    dispose_hook: Option<DisposeHook>,
    registration_container: Option<ContainerId>,
    mismatch: Option<&'static str>,
}

impl ServiceEntry {
    /// Entry for a factory producing `S` from argument tuple `A`.
    pub fn with_factory<S, A, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
        F: Fn(&Container, A) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            service_id: TypeId::of::<S>(),
            service: std::any::type_name::<S>(),
            shape_id: TypeId::of::<FactoryShape<S, A>>(),
            factory: Arc::new(TypedFactory { f: Box::new(factory) }),
            initializer: None,
            owner: None,
            reuse: ReuseScope::Default,
            instance: None,
            sequence: 0,
            dispose_hook: None,
            registration_container: None,
            mismatch: None,
        }
    }

    /// Entry holding an existing instance.
    ///
    /// Shared by the whole hierarchy and owned externally unless changed.
    pub fn with_instance<S>(instance: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let cached: AnyArc = Arc::new(instance.clone());
        let mut entry = Self::with_factory(move |_: &Container, ()| instance.clone());
        entry.owner = Some(Owner::External);
        entry.reuse = ReuseScope::Hierarchy;
        entry.instance = Some(cached);
        entry
    }

    /// Sets who disposes instances of this registration.
    pub fn owned_by(mut self, owner: Owner) -> Self {
        self.set_owner(owner);
        self
    }

    /// Sets the reuse scope.
    pub fn reused_within(mut self, reuse: ReuseScope) -> Self {
        self.set_reuse(reuse);
        self
    }

    /// Sets the initializer run after each new instance is created. Last write wins.
    pub fn initialized_by<S, F>(mut self, initializer: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Container, &Arc<S>) + Send + Sync + 'static,
    {
        if self.check_service::<S>() {
            self.initializer = Some(erase_initializer(initializer));
        }
        self
    }

    /// Lets the container call [`Dispose::dispose`] on instances it owns.
    pub fn disposed_by_container<S: ?Sized + Dispose>(mut self) -> Self {
        if self.check_service::<S>() {
            self.dispose_hook = Some(DisposeHook::of::<S>());
        }
        self
    }

    /// Copy of this registration for another container, with an empty instance slot.
    pub fn clone_for(&self, container: ContainerId) -> ServiceEntry {
        ServiceEntry {
            service_id: self.service_id,
            service: self.service,
            shape_id: self.shape_id,
            factory: self.factory.clone(),
            initializer: self.initializer.clone(),
            owner: self.owner,
            reuse: self.reuse,
            instance: None,
            sequence: 0,
            dispose_hook: self.dispose_hook,
            registration_container: Some(container),
            mismatch: self.mismatch,
        }
    }

    /// Ownership policy; unset policies read as [`Owner::Container`].
    pub fn owner(&self) -> Owner {
        self.owner.unwrap_or(Owner::Container)
    }

    pub fn reuse(&self) -> ReuseScope {
        self.reuse
    }

    /// Whether an instance is cached in this entry.
    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    /// Whether the container disposes instances it owns.
    pub fn is_disposed_by_container(&self) -> bool {
        self.dispose_hook.is_some()
    }

    /// Container whose registry holds this entry, once committed.
    pub fn registration_container(&self) -> Option<ContainerId> {
        self.registration_container
    }

    /// Type name of the service this entry produces.
    pub fn service_type_name(&self) -> &'static str {
        self.service
    }

    fn check_service<S: ?Sized + 'static>(&mut self) -> bool {
        if TypeId::of::<S>() == self.service_id {
            true
        } else {
            self.mismatch = Some(std::any::type_name::<S>());
            false
        }
    }

    /// Fills unset policies and binds the entry to its registry's container.
    pub(crate) fn commit(
        &mut self,
        key: &ServiceKey,
        container: ContainerId,
        default_owner: Owner,
        default_reuse: ReuseScope,
    ) -> ResolveResult<()> {
        if let Some(wrong) = self.mismatch {
            return Err(ResolutionError::TypeMismatch(wrong));
        }
        if self.service_id != key.service_id() || self.shape_id != key.shape_id() {
            return Err(ResolutionError::TypeMismatch(key.service_type_name()));
        }
        self.fill_defaults(default_owner, default_reuse);
        self.registration_container = Some(container);
        Ok(())
    }

    /// Sets the policies that are still unset.
    pub(crate) fn fill_defaults(&mut self, owner: Owner, reuse: ReuseScope) {
        if self.owner.is_none() {
            self.owner = Some(owner);
        }
        if self.reuse == ReuseScope::Default {
            self.reuse = reuse;
        }
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }

    pub(crate) fn set_reuse(&mut self, reuse: ReuseScope) {
        self.reuse = reuse;
    }

    pub(crate) fn set_initializer(&mut self, initializer: ErasedInitializer) {
        self.initializer = Some(initializer);
    }

    pub(crate) fn set_dispose_hook(&mut self, hook: DisposeHook) {
        self.dispose_hook = Some(hook);
    }

    pub(crate) fn factory(&self) -> ErasedFactory {
        self.factory.clone()
    }

    pub(crate) fn initializer(&self) -> Option<ErasedInitializer> {
        self.initializer.clone()
    }

    pub(crate) fn dispose_hook(&self) -> Option<DisposeHook> {
        self.dispose_hook
    }

    pub(crate) fn instance(&self) -> Option<AnyArc> {
        self.instance.clone()
    }

    /// Stores `instance` unless another one got there first; returns the winner.
    pub(crate) fn store_instance(&mut self, instance: AnyArc, sequence: u64) -> (AnyArc, bool) {
        match &self.instance {
            Some(existing) => (existing.clone(), false),
            None => {
                self.instance = Some(instance.clone());
                self.sequence = sequence;
                (instance, true)
            }
        }
    }

    /// Takes the cached instance out with its creation sequence.
    pub(crate) fn take_instance(&mut self) -> Option<(AnyArc, u64)> {
        self.instance.take().map(|instance| (instance, self.sequence))
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("service", &self.service)
            .field("owner", &self.owner)
            .field("reuse", &self.reuse)
            .field("has_instance", &self.instance.is_some())
            .field("has_initializer", &self.initializer.is_some())
            .field("disposed_by_container", &self.dispose_hook.is_some())
            .field("registration_container", &self.registration_container)
            .finish()
    }
}

#[cfg(feature = "ahash")]
type RegistryMap = HashMap<ServiceKey, SharedEntry, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
type RegistryMap = HashMap<ServiceKey, SharedEntry>;

/// Per-container registry holding committed entries.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RegistryMap,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; last write wins.
    pub(crate) fn insert(&mut self, key: ServiceKey, entry: SharedEntry) {
        self.entries.insert(key, entry);
    }

    /// Inserts unless the key is present; returns the entry now stored.
    pub(crate) fn get_or_insert(&mut self, key: &ServiceKey, entry: SharedEntry) -> SharedEntry {
        self.entries.entry(key.clone()).or_insert(entry).clone()
    }

    #[inline]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<SharedEntry> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&ServiceKey, &SharedEntry)> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(u32);

    impl Dispose for Probe {
        fn dispose(&self) {}
    }

    #[test]
    fn new_entries_defer_policies() {
        let entry = ServiceEntry::with_factory(|_, ()| Arc::new(Probe(1)));
        assert_eq!(entry.reuse(), ReuseScope::Default);
        assert_eq!(entry.owner(), Owner::Container);
        assert!(entry.owner.is_none());
        assert!(!entry.has_instance());
        assert!(entry.registration_container().is_none());
    }

    #[test]
    fn instance_entries_are_shared_and_external() {
        let entry = ServiceEntry::with_instance(Arc::new(Probe(2)));
        assert_eq!(entry.reuse(), ReuseScope::Hierarchy);
        assert_eq!(entry.owner(), Owner::External);
        assert!(entry.has_instance());
    }

    #[test]
    fn store_instance_keeps_the_first_writer() {
        let mut entry = ServiceEntry::with_factory(|_, ()| Arc::new(Probe(0)));
        let first: AnyArc = Arc::new(Arc::new(Probe(1)));
        let second: AnyArc = Arc::new(Arc::new(Probe(2)));

        let (winner, stored) = entry.store_instance(first.clone(), 1);
        assert!(stored);
        assert!(Arc::ptr_eq(&winner, &first));

        let (winner, stored) = entry.store_instance(second, 2);
        assert!(!stored);
        assert!(Arc::ptr_eq(&winner, &first));
        assert_eq!(entry.take_instance().map(|(_, seq)| seq), Some(1));
        assert!(!entry.has_instance());
    }

    #[test]
    fn clone_for_keeps_policy_but_not_instance() {
        let mut entry = ServiceEntry::with_instance(Arc::new(Probe(3)))
            .reused_within(ReuseScope::Container)
            .disposed_by_container::<Probe>();
        entry.registration_container = Some(ContainerId::from_raw(1));

        let copy = entry.clone_for(ContainerId::from_raw(9));
        assert_eq!(copy.reuse(), ReuseScope::Container);
        assert_eq!(copy.owner(), Owner::External);
        assert!(copy.is_disposed_by_container());
        assert!(!copy.has_instance());
        assert_eq!(copy.registration_container(), Some(ContainerId::from_raw(9)));
    }

    #[test]
    fn commit_rejects_mismatched_types() {
        let mut entry = ServiceEntry::with_factory(|_, ()| Arc::new(Probe(4)))
            .initialized_by(|_, _: &Arc<String>| {});
        let key = ServiceKey::of::<Probe, ()>(None);
        let result = entry.commit(&key, ContainerId::from_raw(1), Owner::Container, ReuseScope::Hierarchy);
        assert!(matches!(result, Err(ResolutionError::TypeMismatch(_))));

        let mut entry = ServiceEntry::with_factory(|_, ()| Arc::new(Probe(4)));
        let wrong_shape = ServiceKey::of::<Probe, (u8,)>(None);
        let result = entry.commit(&wrong_shape, ContainerId::from_raw(1), Owner::Container, ReuseScope::Hierarchy);
        assert!(matches!(result, Err(ResolutionError::TypeMismatch(_))));
    }

    #[test]
    fn commit_fills_unset_policies() {
        let mut entry = ServiceEntry::with_factory(|_, ()| Arc::new(Probe(5)));
        let key = ServiceKey::of::<Probe, ()>(None);
        entry
            .commit(&key, ContainerId::from_raw(3), Owner::External, ReuseScope::None)
            .unwrap();
        assert_eq!(entry.owner(), Owner::External);
        assert_eq!(entry.reuse(), ReuseScope::None);
        assert_eq!(entry.registration_container(), Some(ContainerId::from_raw(3)));
    }

    #[test]
    fn weak_tracking_skips_dropped_instances() {
        let hook = DisposeHook::of::<Probe>();
        let instance: AnyArc = Arc::new(Arc::new(Probe(6)));
        let alive = hook.track(&instance).unwrap();
        assert!(alive());

        let dropped = hook.track(&instance).unwrap();
        drop(instance);
        assert!(!dropped());
    }
}
