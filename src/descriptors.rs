//! Service descriptors for introspection and diagnostics.

use crate::container::ContainerId;
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::registration::ServiceEntry;

/// Service descriptor for introspection and diagnostics
///
/// A snapshot of one registration held by a container, as returned by
/// [`Container::descriptors`](crate::Container::descriptors).
///
/// # Use Cases
///
/// - **Debugging**: Inspect what services are registered and how they are reused
/// - **Validation**: Ensure all required services are registered
/// - **Health checks**: Verify container configuration at startup
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Owner, ReuseScope};
/// use std::sync::Arc;
///
/// struct Database;
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// let container = Container::new();
/// container.register(|_| Arc::new(Database)).unwrap();
/// container.register_named_instance("console", Arc::new(ConsoleLogger) as Arc<dyn Logger>).unwrap();
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let db = descriptors.iter().find(|d| d.type_name().contains("Database")).unwrap();
/// assert_eq!(db.reuse, ReuseScope::Hierarchy);
/// assert_eq!(db.owner, Owner::Container);
/// assert!(!db.is_named());
///
/// let logger = descriptors.iter().find(|d| d.is_named()).unwrap();
/// assert_eq!(logger.service_name(), Some("console"));
/// assert!(logger.has_instance);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The registration key
    pub key: ServiceKey,
    pub owner: Owner,
    pub reuse: ReuseScope,
    /// Whether an instance is cached on this container's entry
    pub has_instance: bool,
    pub has_initializer: bool,
    /// Whether the container disposes instances it owns
    pub disposed_by_container: bool,
    /// Container whose registry holds the entry
    pub registration_container: Option<ContainerId>,
}

impl ServiceDescriptor {
    pub(crate) fn from_entry(key: &ServiceKey, entry: &ServiceEntry) -> Self {
        Self {
            key: key.clone(),
            owner: entry.owner(),
            reuse: entry.reuse(),
            has_instance: entry.has_instance(),
            has_initializer: entry.has_initializer(),
            disposed_by_container: entry.is_disposed_by_container(),
            registration_container: entry.registration_container(),
        }
    }

    /// Get the service name for named services, or None for unnamed services
    pub fn service_name(&self) -> Option<&str> {
        self.key.service_name()
    }

    /// Get the type/trait name
    pub fn type_name(&self) -> &'static str {
        self.key.service_type_name()
    }

    /// Check if this is a named service
    pub fn is_named(&self) -> bool {
        self.service_name().is_some()
    }
}
