//! Container configuration.
//!
//! Default policies applied to registrations that leave them unset, loadable
//! from environment variables and, with the `config` feature, from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ResolutionError, ResolveResult};
use crate::lifetime::{Owner, ReuseScope};

/// Environment variable prefix read by [`ContainerOptions::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_IOC";

/// Default policies for a container.
///
/// A registration that does not choose an owner or a reuse scope gets these
/// when it is committed. Child containers start with their parent's options.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, ContainerOptions, Owner, ReuseScope};
/// use std::sync::Arc;
///
/// struct Ticket;
///
/// let options = ContainerOptions::default().with_default_reuse(ReuseScope::None);
/// let container = Container::with_options(options);
/// container.register(|_| Arc::new(Ticket)).unwrap();
///
/// let a = container.resolve::<Ticket>().unwrap();
/// let b = container.resolve::<Ticket>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert_eq!(container.options().default_owner, Owner::Container);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Owner for registrations that do not set one
    pub default_owner: Owner,
    /// Reuse scope for registrations left at [`ReuseScope::Default`]
    pub default_reuse: ReuseScope,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            default_owner: Owner::Container,
            default_reuse: ReuseScope::Hierarchy,
        }
    }
}

impl ContainerOptions {
    pub fn with_default_owner(mut self, owner: Owner) -> Self {
        self.default_owner = owner;
        self
    }

    pub fn with_default_reuse(mut self, reuse: ReuseScope) -> Self {
        self.default_reuse = reuse;
        self
    }

    /// Reads `FERROUS_IOC_DEFAULT_OWNER` and `FERROUS_IOC_DEFAULT_REUSE`.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> ResolveResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Like [`from_env`](Self::from_env) with a custom variable prefix.
    pub fn from_env_with_prefix(prefix: &str) -> ResolveResult<Self> {
        let prefix = prefix.to_uppercase();
        Self::from_lookup(|name| env::var(format!("{}_{}", prefix, name)).ok())
    }

    /// Builds options from a key lookup (`DEFAULT_OWNER`, `DEFAULT_REUSE`).
    pub fn from_lookup<F>(lookup: F) -> ResolveResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = lookup("DEFAULT_OWNER") {
            options.default_owner = value.parse().map_err(invalid)?;
        }
        if let Some(value) = lookup("DEFAULT_REUSE") {
            options.default_reuse = value.parse().map_err(invalid)?;
        }
        tracing::debug!(
            owner = %options.default_owner,
            reuse = %options.default_reuse,
            "loaded container options"
        );
        Ok(options)
    }

    /// Parses options from JSON; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> ResolveResult<Self> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }
}

fn invalid(reason: String) -> ResolutionError {
    ResolutionError::InvalidConfiguration {
        service: "ContainerOptions",
        reason,
    }
}
