//! Service key types for the container registry.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::container::Container;

/// Key for service storage and lookup.
///
/// A key identifies one registration slot. It combines three things:
///
/// - **Service type**: the contract being requested (`S` in `resolve::<S>()`,
///   which may be a trait object such as `dyn Logger`)
/// - **Factory shape**: the erased factory signature `fn(&Container, A) -> Arc<S>`.
///   The same service can be registered once per argument tuple `A`, so
///   `resolve::<Bar>()` and `resolve_with::<Bar, (String,)>(..)` hit different slots.
/// - **Name**: optional, to keep several registrations of the same shape apart
///
/// Equality and hashing use the two `TypeId`s and the name. The type name
/// strings are carried for diagnostics only.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::ServiceKey;
///
/// struct Bar;
///
/// let plain = ServiceKey::of::<Bar, ()>(None);
/// let named = ServiceKey::of::<Bar, ()>(Some("bar"));
/// let with_arg = ServiceKey::of::<Bar, (String,)>(None);
///
/// assert_ne!(plain, named);
/// assert_ne!(plain, with_arg);
/// assert_eq!(named, ServiceKey::of::<Bar, ()>(Some("bar")));
/// assert_eq!(named.service_name(), Some("bar"));
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    service_id: TypeId,
    service_type: &'static str,
    shape_id: TypeId,
    shape_type: &'static str,
    name: Option<String>,
}

impl ServiceKey {
    /// Builds a key from raw type identities.
    ///
    /// Most callers want [`ServiceKey::of`]; this constructor exists for
    /// registration layers that already carry erased identities.
    pub fn new(
        service_id: TypeId,
        service_type: &'static str,
        shape_id: TypeId,
        shape_type: &'static str,
        name: Option<String>,
    ) -> Self {
        Self {
            service_id,
            service_type,
            shape_id,
            shape_type,
            name,
        }
    }

    /// Key for service `S` produced by a factory taking argument tuple `A`.
    #[inline]
    pub fn of<S, A>(name: Option<&str>) -> Self
    where
        S: ?Sized + 'static,
        A: 'static,
    {
        Self::new(
            TypeId::of::<S>(),
            std::any::type_name::<S>(),
            TypeId::of::<FactoryShape<S, A>>(),
            std::any::type_name::<FactoryShape<S, A>>(),
            name.map(str::to_owned),
        )
    }

    /// The service type name, for diagnostics.
    pub fn service_type_name(&self) -> &'static str {
        self.service_type
    }

    /// The factory signature name, for diagnostics.
    pub fn shape_type_name(&self) -> &'static str {
        self.shape_type
    }

    /// The registration name, or `None` for unnamed registrations.
    pub fn service_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `TypeId` of the requested service.
    pub fn service_id(&self) -> TypeId {
        self.service_id
    }

    pub(crate) fn shape_id(&self) -> TypeId {
        self.shape_id
    }

    /// Whether this is the reserved key a container resolves itself under:
    /// unnamed, no arguments.
    pub(crate) fn is_container_service(&self) -> bool {
        self.name.is_none()
            && self.service_id == TypeId::of::<Container>()
            && self.shape_id == TypeId::of::<FactoryShape<Container, ()>>()
    }
}

/// Erased factory signature used as the shape identity of a key.
pub(crate) type FactoryShape<S, A> = fn(&Container, A) -> Arc<S>;

impl PartialEq for ServiceKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Type names are display-only
        self.service_id == other.service_id
            && self.shape_id == other.shape_id
            && self.name == other.name
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service_id.hash(state);
        self.shape_id.hash(state);
        if let Some(name) = &self.name {
            name.hash(state);
        }
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKey")
            .field("service", &self.service_type)
            .field("shape", &self.shape_type)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (\"{}\")", self.service_type, name),
            None => f.write_str(self.service_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(key: &ServiceKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    trait Foo {}

    #[test]
    fn equal_keys_hash_equally() {
        let a = ServiceKey::of::<dyn Foo, ()>(Some("a"));
        let b = ServiceKey::of::<dyn Foo, ()>(Some("a"));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn name_and_shape_distinguish_keys() {
        let base = ServiceKey::of::<String, ()>(None);
        assert_ne!(base, ServiceKey::of::<String, ()>(Some("x")));
        assert_ne!(base, ServiceKey::of::<String, (u32,)>(None));
        assert_ne!(base, ServiceKey::of::<u32, ()>(None));
    }

    #[test]
    fn display_includes_name() {
        let key = ServiceKey::of::<u32, ()>(Some("port"));
        assert_eq!(key.to_string(), "u32 (\"port\")");
        assert_eq!(ServiceKey::of::<u32, ()>(None).to_string(), "u32");
    }

    #[test]
    fn container_service_keys_are_recognized() {
        assert!(ServiceKey::of::<Container, ()>(None).is_container_service());
        assert!(!ServiceKey::of::<Container, ()>(Some("root")).is_container_service());
        assert!(!ServiceKey::of::<Container, (u8,)>(None).is_container_service());
        assert!(!ServiceKey::of::<u32, ()>(None).is_container_service());
    }
}
