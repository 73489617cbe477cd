//! Container builder for staged registration.
//!
//! This module contains the ContainerBuilder type, which collects
//! registrations with builder-wide default policies and commits them into a
//! container in one go.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::container::Container;
use crate::error::ResolveResult;
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::registration::{erase_initializer, DisposeHook, ServiceEntry};
use crate::traits::Dispose;

pub mod module_system;
pub use module_system::*;

struct Staged {
    key: ServiceKey,
    entry: ServiceEntry,
}

/// Collects registrations and commits them into a container.
///
/// Registrations that leave their owner or reuse scope unset get the
/// builder's defaults: [`Owner::Container`] and [`ReuseScope::Hierarchy`]
/// unless changed.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ContainerBuilder, ReuseScope};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Repository { config: Arc<Config> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_| Arc::new(Config { url: "postgres://localhost".into() }));
/// builder
///     .register(|c| Arc::new(Repository { config: c.resolve_required::<Config>() }))
///     .reused_within(ReuseScope::Container);
///
/// let container = builder.build().unwrap();
/// let repo = container.resolve::<Repository>().unwrap();
/// assert_eq!(repo.config.url, "postgres://localhost");
/// ```
pub struct ContainerBuilder {
    options: ContainerOptions,
    staged: Vec<Staged>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Builder whose defaults come from `options`.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            options,
            staged: Vec::new(),
        }
    }

    /// Owner for staged registrations that do not set one.
    pub fn default_owner(&mut self, owner: Owner) -> &mut Self {
        self.options.default_owner = owner;
        self
    }

    /// Reuse scope for staged registrations that do not set one.
    pub fn default_reuse(&mut self, reuse: ReuseScope) -> &mut Self {
        self.options.default_reuse = reuse;
        self
    }

    pub fn options(&self) -> ContainerOptions {
        self.options
    }

    // ----- Registrations -----

    /// Stages a factory for `S`.
    pub fn register<S, F>(&mut self, factory: F) -> StagedRegistration<'_, S, ()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Arc<S> + Send + Sync + 'static,
    {
        self.stage(None, ServiceEntry::with_factory(move |c: &Container, ()| factory(c)))
    }

    pub fn register_named<S, F>(&mut self, name: &str, factory: F) -> StagedRegistration<'_, S, ()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Arc<S> + Send + Sync + 'static,
    {
        self.stage(Some(name), ServiceEntry::with_factory(move |c: &Container, ()| factory(c)))
    }

    /// Stages a factory taking an argument tuple `A`.
    pub fn register_with<S, A, F>(&mut self, factory: F) -> StagedRegistration<'_, S, A>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
        F: Fn(&Container, A) -> Arc<S> + Send + Sync + 'static,
    {
        self.stage(None, ServiceEntry::with_factory(factory))
    }

    pub fn register_named_with<S, A, F>(&mut self, name: &str, factory: F) -> StagedRegistration<'_, S, A>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
        F: Fn(&Container, A) -> Arc<S> + Send + Sync + 'static,
    {
        self.stage(Some(name), ServiceEntry::with_factory(factory))
    }

    fn stage<S, A>(&mut self, name: Option<&str>, entry: ServiceEntry) -> StagedRegistration<'_, S, A>
    where
        S: ?Sized + Send + Sync + 'static,
        A: 'static,
    {
        self.staged.push(Staged {
            key: ServiceKey::of::<S, A>(name),
            entry,
        });
        let index = self.staged.len() - 1;
        StagedRegistration {
            staged: &mut self.staged[index],
            _shape: PhantomData,
        }
    }

    /// Number of staged registrations.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Commits every staged registration into `container`, in staging order.
    ///
    /// The builder keeps its registrations, so it can be applied to several
    /// containers. Stops at the first rejected registration; the ones staged
    /// before it stay committed in `container`.
    pub fn apply(&self, container: &Container) -> ResolveResult<()> {
        for staged in &self.staged {
            let mut entry = staged.entry.clone_for(container.id());
            entry.fill_defaults(self.options.default_owner, self.options.default_reuse);
            container.register_entry(staged.key.clone(), entry)?;
        }
        tracing::debug!(
            container = %container.id(),
            registrations = self.staged.len(),
            "applied builder"
        );
        Ok(())
    }

    /// Creates a root container with the builder's options and applies the
    /// staged registrations to it.
    pub fn build(self) -> ResolveResult<Container> {
        let container = Container::with_options(self.options);
        self.apply(&container)?;
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent configuration of a staged registration.
pub struct StagedRegistration<'a, S: ?Sized, A> {
    staged: &'a mut Staged,
    _shape: PhantomData<fn(A) -> Arc<S>>,
}

impl<'a, S, A> StagedRegistration<'a, S, A>
where
    S: ?Sized + Send + Sync + 'static,
    A: 'static,
{
    /// Registers under `name` instead.
    pub fn named(self, name: &str) -> Self {
        self.staged.key = ServiceKey::of::<S, A>(Some(name));
        self
    }

    pub fn owned_by(self, owner: Owner) -> Self {
        self.staged.entry.set_owner(owner);
        self
    }

    pub fn reused_within(self, reuse: ReuseScope) -> Self {
        self.staged.entry.set_reuse(reuse);
        self
    }

    pub fn initialized_by<F>(self, initializer: F) -> Self
    where
        F: Fn(&Container, &Arc<S>) + Send + Sync + 'static,
    {
        self.staged.entry.set_initializer(erase_initializer(initializer));
        self
    }

    pub fn disposed_by_container(self) -> Self
    where
        S: Dispose,
    {
        self.staged.entry.set_dispose_hook(DisposeHook::of::<S>());
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.staged.key
    }
}
