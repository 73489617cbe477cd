/// Concurrent access integration tests
///
/// These tests verify that ferrous-ioc behaves correctly when containers are shared
/// across threads: reused instances stay unique, child containers stay isolated, and
/// registration can race with resolution.

use crossbeam_utils::thread;
use ferrous_ioc::{Container, Dispose, ReuseScope};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

// ===== Test Services =====

#[derive(Debug)]
struct CounterService {
    count: AtomicUsize,
}

impl CounterService {
    fn new() -> Self {
        Self { count: AtomicUsize::new(0) }
    }

    fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug)]
struct RequestContext {
    id: usize,
    disposed: AtomicBool,
}

impl Dispose for RequestContext {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

// ===== Tests =====

#[test]
fn test_hierarchy_instance_is_unique_under_contention() {
    let container = Container::new();
    container
        .register(|_| Arc::new(CounterService::new()))
        .unwrap()
        .reused_within(ReuseScope::Hierarchy);

    let thread_count = 16;
    let barrier = Barrier::new(thread_count);

    let instances: Vec<Arc<CounterService>> = thread::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    let counter = container.resolve::<CounterService>().unwrap();
                    counter.increment();
                    counter
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    for instance in &instances {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
    assert_eq!(instances[0].count.load(Ordering::SeqCst), thread_count);
}

#[test]
fn test_initializer_runs_once_under_contention() {
    let initialized = Arc::new(AtomicUsize::new(0));
    let seen = initialized.clone();

    let container = Container::new();
    container
        .register(|_| Arc::new(CounterService::new()))
        .unwrap()
        .initialized_by(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let thread_count = 12;
    let barrier = Barrier::new(thread_count);
    thread::scope(|s| {
        for _ in 0..thread_count {
            s.spawn(|_| {
                barrier.wait();
                container.resolve::<CounterService>().unwrap();
            });
        }
    })
    .unwrap();

    assert_eq!(initialized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_child_containers_per_thread_are_isolated() {
    let next_id = Arc::new(AtomicUsize::new(0));
    let ids = next_id.clone();

    let root = Container::new();
    root.register(move |_| {
        Arc::new(RequestContext {
            id: ids.fetch_add(1, Ordering::SeqCst),
            disposed: AtomicBool::new(false),
        })
    })
    .unwrap()
    .reused_within(ReuseScope::Container)
    .disposed_by_container();

    let thread_count = 8;
    let barrier = Barrier::new(thread_count);

    let contexts: Vec<Arc<RequestContext>> = thread::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    let request = root.create_child_container();
                    let first = request.resolve::<RequestContext>().unwrap();
                    for _ in 0..10 {
                        let again = request.resolve::<RequestContext>().unwrap();
                        assert!(Arc::ptr_eq(&first, &again));
                    }
                    request.dispose();
                    assert!(first.disposed.load(Ordering::SeqCst));
                    first
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut ids: Vec<usize> = contexts.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), thread_count);
    assert_eq!(root.child_count(), 0);
}

#[test]
fn test_concurrent_child_creation_and_root_disposal() {
    let root = Container::new();
    root.register(|_| Arc::new(CounterService::new())).unwrap();

    let thread_count = 8;
    let children: Vec<Container> = thread::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                s.spawn(|_| {
                    let child = root.create_child_container();
                    child.resolve::<CounterService>().unwrap().increment();
                    child
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(root.child_count(), thread_count);
    assert_eq!(
        root.resolve::<CounterService>().unwrap().count.load(Ordering::SeqCst),
        thread_count
    );

    root.dispose();
    assert!(children.iter().all(Container::is_disposed));
}

#[test]
fn test_registration_races_with_resolution() {
    let container = Container::new();
    container.register_named("seed", |_| Arc::new(0usize)).unwrap();

    let writers = 4;
    let readers = 4;
    let per_writer = 25;

    thread::scope(|s| {
        for w in 0..writers {
            let container = &container;
            s.spawn(move |_| {
                for i in 0..per_writer {
                    let value = w * per_writer + i;
                    container
                        .register_named(&format!("svc-{}", value), move |_| Arc::new(value))
                        .unwrap();
                }
            });
        }
        for _ in 0..readers {
            s.spawn(|_| {
                for _ in 0..100 {
                    assert_eq!(*container.resolve_named::<usize>("seed").unwrap(), 0);
                }
            });
        }
    })
    .unwrap();

    for value in 0..writers * per_writer {
        assert_eq!(
            *container.resolve_named::<usize>(&format!("svc-{}", value)).unwrap(),
            value
        );
    }
}
