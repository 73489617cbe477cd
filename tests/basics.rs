use ferrous_ioc::{Container, Owner, ResolutionError, ReuseScope};
use std::sync::Arc;

trait Foo: Send + Sync {
    fn name(&self) -> &'static str;
}

struct FooImpl;
impl Foo for FooImpl {
    fn name(&self) -> &'static str {
        "foo"
    }
}

struct OtherFoo;
impl Foo for OtherFoo {
    fn name(&self) -> &'static str {
        "other"
    }
}

#[derive(Debug)]
struct Bar {
    arg: String,
}

#[test]
fn test_trait_registration_resolves_implementation() {
    let container = Container::new();
    container
        .register::<dyn Foo, _>(|_| Arc::new(FooImpl) as Arc<dyn Foo>)
        .unwrap();

    let foo = container.resolve::<dyn Foo>().unwrap();
    assert_eq!(foo.name(), "foo");
}

#[test]
fn test_factory_with_argument() {
    let container = Container::new();
    container
        .register_with(|_, (arg,): (String,)| Arc::new(Bar { arg }))
        .unwrap();

    let bar = container.resolve_with::<Bar, _>(("x".to_string(),)).unwrap();
    assert_eq!(bar.arg, "x");

    // The zero-argument shape is a different registration
    assert!(container.resolve::<Bar>().unwrap_err().is_missing());
}

#[test]
fn test_named_factories() {
    let container = Container::new();
    container
        .register_named::<dyn Foo, _>("a", |_| Arc::new(FooImpl) as Arc<dyn Foo>)
        .unwrap();
    container
        .register_named::<dyn Foo, _>("b", |_| Arc::new(OtherFoo) as Arc<dyn Foo>)
        .unwrap();

    let a = container.resolve_named::<dyn Foo>("a").unwrap();
    let b = container.resolve_named::<dyn Foo>("b").unwrap();
    assert_eq!(a.name(), "foo");
    assert_eq!(b.name(), "other");
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_named_factory_with_arguments() {
    let container = Container::new();
    container
        .register_named_with("upper", |_, (arg,): (String,)| {
            Arc::new(Bar { arg: arg.to_uppercase() })
        })
        .unwrap()
        .reused_within(ReuseScope::None);

    let bar = container
        .resolve_named_with::<Bar, _>("upper", ("abc".to_string(),))
        .unwrap();
    assert_eq!(bar.arg, "ABC");
    assert!(container
        .try_resolve_with::<Bar, (String,)>(("abc".to_string(),))
        .unwrap()
        .is_none());
}

#[test]
fn test_missing_service() {
    let container = Container::new();

    match container.resolve::<Bar>() {
        Err(ResolutionError::Missing { service, name }) => {
            assert!(service.contains("Bar"));
            assert_eq!(name, None);
        }
        other => panic!("expected Missing, got {:?}", other.map(|_| ())),
    }
    assert!(container.try_resolve::<Bar>().unwrap().is_none());

    let err = container.resolve_named::<Bar>("primary").unwrap_err();
    assert!(err.to_string().contains("primary"));
    assert!(container.try_resolve_named::<Bar>("primary").unwrap().is_none());
}

#[test]
fn test_second_registration_replaces_first() {
    let container = Container::new();
    container
        .register::<dyn Foo, _>(|_| Arc::new(FooImpl) as Arc<dyn Foo>)
        .unwrap();
    container
        .register::<dyn Foo, _>(|_| Arc::new(OtherFoo) as Arc<dyn Foo>)
        .unwrap();

    assert_eq!(container.resolve::<dyn Foo>().unwrap().name(), "other");
    assert_eq!(container.descriptors().len(), 1);
}

#[test]
fn test_registered_instance_is_returned_as_is() {
    let instance = Arc::new(Bar { arg: "given".into() });
    let container = Container::new();
    let registration = container.register_instance(instance.clone()).unwrap();
    assert_eq!(registration.owner(), Owner::External);
    assert_eq!(registration.reuse(), ReuseScope::Hierarchy);

    let child = container.create_child_container();
    assert!(Arc::ptr_eq(&container.resolve::<Bar>().unwrap(), &instance));
    assert!(Arc::ptr_eq(&child.resolve::<Bar>().unwrap(), &instance));

    container
        .register_named_instance("named", Arc::new(Bar { arg: "named".into() }))
        .unwrap();
    assert_eq!(container.resolve_named::<Bar>("named").unwrap().arg, "named");
}

#[test]
fn test_container_resolves_itself_at_every_level() {
    let root = Container::new();
    let child = root.create_child_container();
    let grandchild = child.create_child_container();

    for container in [&root, &child, &grandchild] {
        let resolved = container.resolve::<Container>().unwrap();
        assert!(resolved.ptr_eq(container));
    }
}

#[test]
fn test_container_self_key_cannot_be_registered() {
    let container = Container::new();
    let other = Container::new();

    let err = container
        .register_instance(Arc::new(other))
        .unwrap_err();
    assert!(matches!(err, ResolutionError::IllegalRegistration { .. }));

    let err = container
        .register(|c| Arc::new(c.clone()))
        .unwrap_err();
    assert!(matches!(err, ResolutionError::IllegalRegistration { .. }));
    assert!(container.resolve::<Container>().unwrap().ptr_eq(&container));
}

#[test]
fn test_named_container_registration_is_allowed() {
    let root = Container::new();
    let child = root.create_child_container();

    child
        .register_named("root", |c| Arc::new(c.parent().unwrap().clone()))
        .unwrap()
        .reused_within(ReuseScope::None);

    let resolved = child.resolve_named::<Container>("root").unwrap();
    assert!(resolved.ptr_eq(&root));
    assert!(child.resolve::<Container>().unwrap().ptr_eq(&child));
    assert_eq!(child.descriptors().len(), 1);
}

#[test]
fn test_factories_receive_the_resolving_container() {
    struct Scope {
        owner: Container,
    }

    let root = Container::new();
    root.register(|c| Arc::new(Scope { owner: c.clone() }))
        .unwrap()
        .reused_within(ReuseScope::Container);

    let child = root.create_child_container();
    assert!(root.resolve::<Scope>().unwrap().owner.ptr_eq(&root));
    assert!(child.resolve::<Scope>().unwrap().owner.ptr_eq(&child));
}

#[test]
fn test_container_defaults_apply_to_new_registrations() {
    struct Ticket;

    let container = Container::new();
    container.set_default_reuse(ReuseScope::None);
    container.set_default_owner(Owner::External);

    let registration = container.register(|_| Arc::new(Ticket)).unwrap();
    assert_eq!(registration.reuse(), ReuseScope::None);
    assert_eq!(registration.owner(), Owner::External);

    let a = container.resolve::<Ticket>().unwrap();
    let b = container.resolve::<Ticket>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    // Children start from the parent's defaults
    let child = container.create_child_container();
    assert_eq!(child.options().default_reuse, ReuseScope::None);
}

#[test]
fn test_default_scope_as_container_default_is_invalid() {
    #[derive(Debug)]
    struct Widget;

    let container = Container::new();
    container.set_default_reuse(ReuseScope::Default);
    container.register(|_| Arc::new(Widget)).unwrap();

    let err = container.resolve::<Widget>().unwrap_err();
    assert!(matches!(err, ResolutionError::InvalidConfiguration { .. }));
}
