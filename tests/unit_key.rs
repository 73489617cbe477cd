/// Unit tests for ServiceKey methods

use ferrous_ioc::ServiceKey;
use std::any::TypeId;
use std::collections::HashSet;

trait Plugin: Send + Sync {}

#[test]
fn test_key_type_names() {
    let key = ServiceKey::of::<String, ()>(None);
    assert_eq!(key.service_type_name(), "alloc::string::String");
    assert!(key.shape_type_name().contains("String"));
    assert_eq!(key.service_id(), TypeId::of::<String>());
    assert_eq!(key.service_name(), None);
}

#[test]
fn test_key_trait_object_names() {
    let key = ServiceKey::of::<dyn Plugin, ()>(Some("http"));
    assert!(key.service_type_name().contains("Plugin"));
    assert_eq!(key.service_name(), Some("http"));
    assert_ne!(key.service_name(), Some(""));
}

#[test]
fn test_key_display() {
    assert_eq!(ServiceKey::of::<u32, ()>(None).to_string(), "u32");
    assert_eq!(
        ServiceKey::of::<u32, ()>(Some("database_port")).to_string(),
        "u32 (\"database_port\")"
    );
}

#[test]
fn test_key_equality_ignores_display_strings() {
    let shape = TypeId::of::<fn()>();
    let a = ServiceKey::new(TypeId::of::<u8>(), "u8", shape, "shape", None);
    let b = ServiceKey::new(TypeId::of::<u8>(), "renamed", shape, "other", None);
    assert_eq!(a, b);

    let named = ServiceKey::new(TypeId::of::<u8>(), "u8", shape, "shape", Some("n".into()));
    assert_ne!(a, named);
}

#[test]
fn test_keys_in_hash_set() {
    let mut set = HashSet::new();
    set.insert(ServiceKey::of::<u32, ()>(None));
    set.insert(ServiceKey::of::<u32, ()>(None));
    set.insert(ServiceKey::of::<u32, ()>(Some("a")));
    set.insert(ServiceKey::of::<u32, ()>(Some("b")));
    set.insert(ServiceKey::of::<u32, (String,)>(None));
    set.insert(ServiceKey::of::<u32, (String, u8)>(None));
    set.insert(ServiceKey::of::<dyn Plugin, ()>(None));
    assert_eq!(set.len(), 6);
}
