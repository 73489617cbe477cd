//! Error types for the container.

use thiserror::Error;

/// Resolution and registration errors.
///
/// Represents the error conditions that can occur while registering or
/// resolving services in ferrous-ioc.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, ResolutionError};
///
/// struct Foo;
///
/// let container = Container::new();
/// match container.resolve_named::<Foo>("missing") {
///     Err(ResolutionError::Missing { name, .. }) => {
///         assert_eq!(name.as_deref(), Some("missing"));
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_ioc::ResolutionError;
///
/// let missing = ResolutionError::Missing { service: "Foo", name: Some("primary".into()) };
/// assert!(missing.to_string().contains("primary"));
///
/// let circular = ResolutionError::Circular(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: A -> B -> A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No registration for the requested key in the container or any ancestor
    #[error("Required dependency of type {service}{} could not be resolved", display_name(.name))]
    Missing {
        service: &'static str,
        name: Option<String>,
    },
    /// A live entry carries a policy the engine cannot act on
    #[error("Invalid configuration for {service}: {reason}")]
    InvalidConfiguration {
        service: &'static str,
        reason: String,
    },
    /// The registration is not allowed
    #[error("Illegal registration of {service}: {reason}")]
    IllegalRegistration {
        service: &'static str,
        reason: String,
    },
    /// A factory re-entered a key it is still creating (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum nesting of factory calls exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Erased factory or instance failed to downcast
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
}

fn display_name(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" named '{}'", name),
        None => String::new(),
    }
}

impl ResolutionError {
    pub(crate) fn missing(service: &'static str, name: Option<&str>) -> Self {
        ResolutionError::Missing {
            service,
            name: name.map(str::to_owned),
        }
    }

    /// Whether this is a [`ResolutionError::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, ResolutionError::Missing { .. })
    }
}

/// Result type for container operations
///
/// A convenience alias for `Result<T, ResolutionError>` used throughout
/// ferrous-ioc.
pub type ResolveResult<T> = Result<T, ResolutionError>;
