//! Reuse and ownership policies.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Reuse scope controlling instance caching behavior.
///
/// # Scope Characteristics
///
/// - **Hierarchy**: one instance for the whole subtree rooted at the container
///   holding the registration, created there on first demand from anywhere below
/// - **Container**: one instance per container level; a child that resolves the
///   registration gets its own copy of the entry and its own instance
/// - **None**: a fresh instance on every resolution
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, ReuseScope};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Session;
/// struct Command;
///
/// let root = Container::new();
/// root.register(|_| Arc::new(Database)).unwrap()
///     .reused_within(ReuseScope::Hierarchy);
/// root.register(|_| Arc::new(Session)).unwrap()
///     .reused_within(ReuseScope::Container);
/// root.register(|_| Arc::new(Command)).unwrap()
///     .reused_within(ReuseScope::None);
///
/// let child = root.create_child_container();
///
/// // Hierarchy: the same instance everywhere below the registration
/// let db1 = root.resolve::<Database>().unwrap();
/// let db2 = child.resolve::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Container: same within a container, different across levels
/// let s1 = root.resolve::<Session>().unwrap();
/// let s2 = root.resolve::<Session>().unwrap();
/// let s3 = child.resolve::<Session>().unwrap();
/// assert!(Arc::ptr_eq(&s1, &s2));
/// assert!(!Arc::ptr_eq(&s1, &s3));
///
/// // None: always different
/// let c1 = root.resolve::<Command>().unwrap();
/// let c2 = root.resolve::<Command>().unwrap();
/// assert!(!Arc::ptr_eq(&c1, &c2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ReuseScope {
    /// Single instance for the registration container and all its descendants.
    Hierarchy,
    /// Single instance per container level.
    Container,
    /// New instance per resolution, never cached.
    None,
    /// Placeholder for "whatever the committing container or builder uses".
    ///
    /// Replaced when an entry is committed into a registry. An entry that still
    /// carries it at resolution time is a configuration error.
    Default,
}

/// Who is responsible for disposing an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Owner {
    /// The container disposes the instance when it is disposed.
    Container,
    /// The caller manages the instance; the container never disposes it.
    External,
}

impl fmt::Display for ReuseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReuseScope::Hierarchy => "hierarchy",
            ReuseScope::Container => "container",
            ReuseScope::None => "none",
            ReuseScope::Default => "default",
        })
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Owner::Container => "container",
            Owner::External => "external",
        })
    }
}

impl FromStr for ReuseScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchy" => Ok(ReuseScope::Hierarchy),
            "container" => Ok(ReuseScope::Container),
            "none" => Ok(ReuseScope::None),
            "default" => Ok(ReuseScope::Default),
            other => Err(format!("unknown reuse scope '{}'", other)),
        }
    }
}

impl FromStr for Owner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(Owner::Container),
            "external" => Ok(Owner::External),
            other => Err(format!("unknown owner '{}'", other)),
        }
    }
}
