//! # ferrous-ioc
//!
//! Hierarchical inversion-of-control container for Rust: factories registered
//! against typed keys, three reuse scopes, nested containers and deterministic
//! disposal of owned instances.
//!
//! ## Features
//!
//! - **Reuse scopes**: per hierarchy, per container, or none
//! - **Nested containers**: children see their ancestors' registrations and can override them
//! - **Ownership**: the container disposes what it owns, newest first, children last
//! - **Factory arguments**: registrations keyed by argument tuple as well as type and name
//! - **Circular dependency detection**: cycles fail with the full path instead of overflowing the stack
//! - **Thread-safe**: `Container` is `Send + Sync` and cheap to clone
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{Container, ReuseScope};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register(|_| Arc::new(Database { connection_string: "postgres://localhost".to_string() }))
//!     .unwrap();
//! container
//!     .register(|c| Arc::new(UserService { db: c.resolve_required::<Database>() }))
//!     .unwrap()
//!     .reused_within(ReuseScope::None);
//!
//! let user_service = container.resolve::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Reuse Scopes
//!
//! - **Hierarchy** (default): one instance for the registering container and its descendants
//! - **Container**: one instance per container that resolves the service
//! - **None**: a fresh instance on every resolution
//!
//! ## Child Containers
//!
//! ```rust
//! use ferrous_ioc::{Container, ReuseScope};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct RequestId(usize);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let root = Container::new();
//! let next = counter.clone();
//! root.register(move |_| Arc::new(RequestId(next.fetch_add(1, Ordering::SeqCst))))
//!     .unwrap()
//!     .reused_within(ReuseScope::Container);
//!
//! let request1 = root.create_child_container();
//! let request2 = root.create_child_container();
//!
//! let a = request1.resolve::<RequestId>().unwrap();
//! let b = request2.resolve::<RequestId>().unwrap();
//! assert_ne!(a.0, b.0);
//! assert!(Arc::ptr_eq(&a, &request1.resolve::<RequestId>().unwrap()));
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (`trace` per resolution, `debug` for
//! creation, copies and disposal, `warn` when a container with undisposed
//! owned instances is dropped). It never installs a subscriber.

// Module declarations
pub mod builder;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use builder::{ContainerBuilder, ContainerModule, StagedRegistration};
pub use config::ContainerOptions;
pub use container::{Container, ContainerId, Lazy, Registration};
pub use descriptors::ServiceDescriptor;
pub use error::{ResolutionError, ResolveResult};
pub use key::ServiceKey;
pub use lifetime::{Owner, ReuseScope};
pub use registration::{ServiceEntry, SharedEntry};
pub use traits::Dispose;
