//! Providers — deferred recipes for building a named dependency.
//!
//! A [`Provider`] is a constructor plus the fixed [`Arguments`] it is
//! called with. Nothing runs at registration time; the container calls
//! the constructor exactly once, on first resolution.
//!
//! # Examples
//! ```rust
//! use mustawda_container::prelude::*;
//!
//! struct Pool { size: u32, label: String }
//!
//! let container = Container::new();
//! container.register(
//!     "pool",
//!     Provider::new(|_, args| {
//!         Ok(Pool {
//!             size: *args.positional::<u32>(0)?,
//!             label: args.keyword::<String>("label")?.clone(),
//!         })
//!     })
//!     .arg(8u32)
//!     .kwarg("label", String::from("primary")),
//! )?;
//!
//! let pool = container.resolve_as::<Pool>("pool")?;
//! assert_eq!(pool.size, 8);
//! assert_eq!(pool.label, "primary");
//! # Ok::<(), MustawdaError>(())
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::error::{ArgumentRef, MustawdaError, Result};
use crate::key::Name;
use crate::registry::Instance;

/// Type alias for constructor functions.
///
/// A constructor receives the container (to resolve its own
/// dependencies) and its stored arguments.
pub type ConstructorFn =
    Arc<dyn Fn(&Container, &Arguments) -> Result<Instance> + Send + Sync>;

/// Fixed positional and keyword arguments of a [`Provider`].
#[derive(Clone, Default)]
pub struct Arguments {
    positional: Vec<Instance>,
    keyword: HashMap<Name, Instance>,
}

impl Arguments {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn push<V: Send + Sync + 'static>(&mut self, value: V) {
        self.positional.push(Arc::new(value));
    }

    /// Sets a keyword argument, replacing any previous value.
    pub fn insert<V: Send + Sync + 'static>(&mut self, name: impl Into<Name>, value: V) {
        self.keyword.insert(name.into(), Arc::new(value));
    }

    /// Returns the positional argument at `index` as a `V`.
    ///
    /// # Errors
    /// [`MustawdaError::MissingArgument`] if there is no such argument,
    /// [`MustawdaError::TypeMismatch`] if it holds another type.
    pub fn positional<V: 'static>(&self, index: usize) -> Result<&V> {
        let value = self
            .positional
            .get(index)
            .ok_or(MustawdaError::MissingArgument(ArgumentRef::Positional(index)))?;

        value.downcast_ref::<V>().ok_or_else(|| MustawdaError::TypeMismatch {
            name: Name::from(format!("#{index}")),
            expected: type_name::<V>(),
        })
    }

    /// Returns the keyword argument `name` as a `V`.
    ///
    /// # Errors
    /// Same as [`Arguments::positional`].
    pub fn keyword<V: 'static>(&self, name: &str) -> Result<&V> {
        let value = self
            .keyword
            .get(name)
            .ok_or_else(|| MustawdaError::MissingArgument(ArgumentRef::Keyword(Name::from(name))))?;

        value.downcast_ref::<V>().ok_or_else(|| MustawdaError::TypeMismatch {
            name: Name::from(name),
            expected: type_name::<V>(),
        })
    }

    /// Number of positional arguments.
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    /// Returns true if a keyword argument `name` is set.
    pub fn has_keyword(&self, name: &str) -> bool {
        self.keyword.contains_key(name)
    }

    /// Returns true if there are no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keyword.keys().map(Name::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Arguments")
            .field("positional", &self.positional.len())
            .field("keyword", &keys)
            .finish()
    }
}

/// A registered, not-yet-resolved recipe for one dependency.
#[derive(Clone)]
pub struct Provider {
    constructor: ConstructorFn,
    args: Arguments,
    type_name: &'static str,
}

impl Provider {
    /// Creates a provider from a constructor that reads its stored
    /// arguments.
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(move |container: &Container, args: &Arguments| {
                Ok(Arc::new(constructor(container, args)?) as Instance)
            }),
            args: Arguments::new(),
            type_name: type_name::<T>(),
        }
    }

    /// Creates a provider from a constructor that takes no arguments.
    pub fn from_fn<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Self::new(move |container, _| constructor(container))
    }

    /// Registers a plain value: the constructor just hands it out.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self {
            constructor: Arc::new(move |_: &Container, _: &Arguments| Ok(instance.clone())),
            args: Arguments::new(),
            type_name: type_name::<T>(),
        }
    }

    /// Adds a positional argument.
    pub fn arg<V: Send + Sync + 'static>(mut self, value: V) -> Self {
        self.args.push(value);
        self
    }

    /// Adds a keyword argument.
    pub fn kwarg<V: Send + Sync + 'static>(mut self, name: impl Into<Name>, value: V) -> Self {
        self.args.insert(name, value);
        self
    }

    /// Name of the type this provider produces.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The stored arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.args
    }

    /// Runs the constructor.
    pub(crate) fn construct(&self, container: &Container) -> Result<Instance> {
        (self.constructor)(container, &self.args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("type_name", &self.type_name)
            .field("args", &self.args)
            .finish()
    }
}

/// A module that registers related dependencies.
///
/// Implement this trait to group related services together and add
/// them with [`ContainerBuilder::module`](crate::container::ContainerBuilder::module):
///
/// ```rust,ignore
/// container_builder
///     .module(&StorageModule)
///     .module(&MailModule);
/// ```
pub trait Module: Send + Sync {
    /// Register dependencies into the registrar.
    fn register(&self, registrar: &mut dyn Registrar);

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Interface that modules use to register dependencies.
///
/// Decoupled from the builder so modules can be tested on their own.
pub trait Registrar {
    /// Register a provider under `name`.
    fn register_provider(&mut self, name: Name, provider: Provider);
}

/// A provider submitted at link time with [`inventory::submit!`].
///
/// ```rust,ignore
/// fn app_name() -> Provider {
///     Provider::value(String::from("demo"))
/// }
///
/// mustawda_container::inventory::submit! {
///     ProviderEntry { name: "app-name", provider: app_name }
/// }
/// ```
pub struct ProviderEntry {
    pub name: &'static str,
    pub provider: fn() -> Provider,
}

inventory::collect!(ProviderEntry);

/// Iterates every submitted [`ProviderEntry`].
pub fn collected() -> impl Iterator<Item = &'static ProviderEntry> {
    inventory::iter::<ProviderEntry>.into_iter()
}
