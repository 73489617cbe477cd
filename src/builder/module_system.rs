//! Container modules for reusable registration bundles.

use crate::builder::ContainerBuilder;
use crate::error::ResolveResult;

/// A bundle of registrations that can be added to a builder or installed
/// into a container.
///
/// Closures taking `&mut ContainerBuilder` are modules too.
///
/// # Example
///
/// ```rust
/// use ferrous_ioc::{Container, ContainerBuilder, ContainerModule, ResolveResult, ReuseScope};
/// use std::sync::Arc;
///
/// struct UserConfig;
/// struct UserService { config: Arc<UserConfig> }
///
/// struct UserModule;
///
/// impl ContainerModule for UserModule {
///     fn register_services(self, builder: &mut ContainerBuilder) -> ResolveResult<()> {
///         builder.register(|_| Arc::new(UserConfig));
///         builder
///             .register(|c| Arc::new(UserService { config: c.resolve_required::<UserConfig>() }))
///             .reused_within(ReuseScope::Container);
///         Ok(())
///     }
/// }
///
/// # fn main() -> ResolveResult<()> {
/// let container = Container::new();
/// container.install(UserModule)?;
/// assert!(container.resolve::<UserService>().is_ok());
/// # Ok(())
/// # }
/// ```
pub trait ContainerModule {
    /// Stage this module's registrations on the builder.
    fn register_services(self, builder: &mut ContainerBuilder) -> ResolveResult<()>;
}

impl<F> ContainerModule for F
where
    F: FnOnce(&mut ContainerBuilder) -> ResolveResult<()>,
{
    fn register_services(self, builder: &mut ContainerBuilder) -> ResolveResult<()> {
        self(builder)
    }
}

impl ContainerBuilder {
    /// Stages a module's registrations on this builder.
    ///
    /// ```rust
    /// use ferrous_ioc::{ContainerBuilder, ResolveResult};
    /// use std::sync::Arc;
    ///
    /// struct Clock;
    ///
    /// # fn main() -> ResolveResult<()> {
    /// let mut builder = ContainerBuilder::new();
    /// builder.add_module(|b: &mut ContainerBuilder| -> ResolveResult<()> {
    ///     b.register(|_| Arc::new(Clock));
    ///     Ok(())
    /// })?;
    /// assert_eq!(builder.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_module<M: ContainerModule>(&mut self, module: M) -> ResolveResult<&mut Self> {
        module.register_services(self)?;
        Ok(self)
    }
}
