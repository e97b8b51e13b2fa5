//! # The Container — heart of Mustawda
//!
//! Maps names to lazily constructed singletons.
//!
//! # Architecture
//! ```text
//! register(name, Provider)          resolve(name)
//!          │                              │
//!          ▼                     cached? ─┴─ no ──> construct(name)
//!      Pending ──────────────────────────────────────────┐
//!                                                         ▼
//!                    Resolved <── constructor ok ── InProgress
//!                                                         │
//!                          constructor err / re-entry ────┘ stays InProgress
//! ```
//!
//! # Examples
//! ```rust
//! use mustawda_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let container = Container::new();
//! container.register_value("config", Config { url: "postgres://localhost".into() })?;
//! container.register(
//!     "database",
//!     Provider::from_fn(|c| {
//!         let config = c.resolve_as::<Config>("config")?;
//!         Ok(Database { url: config.url.clone() })
//!     }),
//! )?;
//!
//! let first = container.resolve_as::<Database>("database")?;
//! let second = container.resolve_as::<Database>("database")?;
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(first.url, "postgres://localhost");
//! # Ok::<(), MustawdaError>(())
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use mustawda_support::rendering::suggest_similar;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::ContainerConfig;
use crate::error::{CircularDependencyError, MustawdaError, NotFoundError, Result};
use crate::key::{AliasRule, Name};
use crate::provider::{self, Module, Provider, Registrar};
use crate::registry::{Instance, Registry, SlotState, Taken};

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] with initial registrations.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .allow_pending_override(false)
///     .value("config", Config::load())
///     .provider("database", Provider::from_fn(|c| { ... }))
///     .module(&MailModule)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    config: ContainerConfig,
    registrations: Vec<(Name, Provider)>,
    include_collected: bool,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            registrations: Vec::new(),
            include_collected: false,
        }
    }

    /// Replace all settings.
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow replacing providers that are registered but not resolved.
    pub fn allow_pending_override(mut self, allow: bool) -> Self {
        self.config.allow_pending_override = allow;
        self
    }

    /// Derive secondary spellings by replacing `from` with `to`.
    pub fn alias_rule(mut self, from: char, to: char) -> Self {
        self.config.alias_rule = Some(AliasRule { from, to });
        self
    }

    /// Register every name under its own spelling only.
    pub fn without_aliases(mut self) -> Self {
        self.config.alias_rule = None;
        self
    }

    /// Register a provider.
    pub fn provider(mut self, name: impl Into<Name>, provider: Provider) -> Self {
        self.registrations.push((name.into(), provider));
        self
    }

    /// Register a plain value.
    pub fn value<T: Send + Sync + 'static>(self, name: impl Into<Name>, value: T) -> Self {
        self.provider(name, Provider::value(value))
    }

    /// Add a [`Module`].
    pub fn module(mut self, module: &dyn Module) -> Self {
        debug!(module = module.name(), "Adding module");
        module.register(&mut self);
        self
    }

    /// Also register every [`ProviderEntry`](crate::provider::ProviderEntry)
    /// submitted with `inventory`. Explicit registrations are applied after.
    pub fn collected(mut self) -> Self {
        self.include_collected = true;
        self
    }

    /// Build the container, applying every registration in order.
    ///
    /// # Errors
    /// The first registration error, e.g. a duplicate name when pending
    /// overrides are disabled.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        let container = Container::with_config(self.config);

        if self.include_collected {
            container.register_collected()?;
        }

        info!(registered = self.registrations.len(), "Building container");
        for (name, provider) in self.registrations {
            container.register(name, provider)?;
        }

        info!("Container built successfully ✓");
        Ok(container)
    }
}

impl Registrar for ContainerBuilder {
    fn register_provider(&mut self, name: Name, provider: Provider) {
        self.registrations.push((name, provider));
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Lazy singleton container keyed by [`Name`].
///
/// Constructors receive `&Container` and may resolve further names.
/// The internal lock is never held while a constructor runs.
pub struct Container {
    registry: Mutex<Registry>,
    /// Names whose constructors are currently running, outermost first.
    stack: Mutex<Vec<Name>>,
    config: ContainerConfig,
}

impl Container {
    /// Create an empty container with default settings.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Create an empty container with the given settings.
    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            stack: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// The settings this container was created with.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    // ── Registration ──

    /// Register a provider under `name` and its normalized spelling.
    ///
    /// Nothing is constructed until the first resolve.
    ///
    /// # Errors
    /// - [`MustawdaError::DuplicateInstance`] if `name` is already resolved
    /// - [`MustawdaError::ResolutionInProgress`] if `name` is being constructed
    ///   or its constructor failed
    pub fn register(&self, name: impl Into<Name>, provider: Provider) -> Result<()> {
        let name = name.into();
        let alias = self
            .config
            .alias_rule
            .and_then(|rule| rule.normalize(name.as_str()))
            .map(Name::from);

        self.registry.lock().register(
            name,
            alias,
            provider,
            self.config.allow_pending_override,
        )
    }

    /// Register a plain value under `name`.
    pub fn register_value<T: Send + Sync + 'static>(
        &self,
        name: impl Into<Name>,
        value: T,
    ) -> Result<()> {
        self.register(name, Provider::value(value))
    }

    /// Register every provider submitted with `inventory`.
    ///
    /// Returns how many were registered.
    pub fn register_collected(&self) -> Result<usize> {
        let mut count = 0;
        for entry in provider::collected() {
            self.register(entry.name, (entry.provider)())?;
            count += 1;
        }
        debug!(count, "Registered collected providers");
        Ok(count)
    }

    // ── Resolution ──

    /// Returns the cached instance of `name`, without constructing.
    pub fn get(&self, name: &str) -> Option<Instance> {
        self.registry.lock().instance(name)
    }

    /// Returns the singleton for `name`, constructing it on first use.
    ///
    /// # Errors
    /// - [`MustawdaError::NotFound`] — never registered
    /// - [`MustawdaError::CircularDependency`] — `name` is already being
    ///   constructed up the current chain, or a previous attempt failed
    /// - whatever the constructor returned, unchanged
    pub fn resolve(&self, name: &str) -> Result<Instance> {
        if let Some(instance) = self.get(name) {
            trace!(name, "Resolved from cache");
            return Ok(instance);
        }
        self.construct(name)
    }

    /// Typed [`resolve`](Container::resolve).
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.resolve_as("database")?;
    /// ```
    pub fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.resolve(name)?)
    }

    /// Runs the provider of `name` and caches the result.
    ///
    /// Unlike [`resolve`](Container::resolve), this does not consult the
    /// cache: a name that is already resolved has no provider left and
    /// reports [`MustawdaError::NotFound`].
    ///
    /// The slot is marked in progress before the constructor runs and
    /// stays that way if the constructor fails.
    #[instrument(skip(self), level = "debug")]
    pub fn construct(&self, name: &str) -> Result<Instance> {
        let taken = self.registry.lock().take_for_construction(name);

        let (name, provider) = match taken {
            Taken::Provider(name, provider) => (name, provider),
            Taken::InProgress(name) => return Err(self.circular(name)),
            Taken::Missing => return Err(self.not_found(name)),
        };

        debug!(name = %name, type_name = provider.type_name(), "Constructing");
        self.stack.lock().push(name.clone());
        let result = provider.construct(self);
        self.leave(&name);

        let instance = result.inspect_err(|err| {
            warn!(name = %name, error = %err, "Constructor failed, name is now unresolvable");
        })?;

        self.registry.lock().store(name.clone(), instance.clone());
        debug!(name = %name, "Resolved");
        Ok(instance)
    }

    /// Typed [`construct`](Container::construct).
    pub fn construct_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.construct(name)?)
    }

    // ── Inspection ──

    /// State of `name`.
    pub fn state(&self, name: &str) -> SlotState {
        self.registry.lock().state(name)
    }

    /// Returns true if `name` was registered, whatever its state.
    pub fn contains(&self, name: &str) -> bool {
        self.state(name) != SlotState::Unregistered
    }

    /// All names that can be looked up, aliases included, sorted.
    pub fn names(&self) -> Vec<Name> {
        self.registry.lock().names()
    }

    /// Number of registered names, aliases excluded.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    /// Forget every registration, alias and cached instance.
    pub fn reset(&self) {
        self.registry.lock().clear();
        self.stack.lock().clear();
        debug!("Container reset");
    }

    // ── Internal ──

    fn leave(&self, name: &Name) {
        let mut stack = self.stack.lock();
        if let Some(pos) = stack.iter().rposition(|n| n == name) {
            stack.remove(pos);
        }
    }

    fn circular(&self, name: Name) -> MustawdaError {
        let stack = self.stack.lock();
        let mut chain: Vec<Name> = match stack.iter().position(|n| *n == name) {
            Some(start) => stack[start..].to_vec(),
            None => Vec::new(),
        };
        chain.push(name);

        warn!(cycle = ?chain, "Circular dependency detected!");
        MustawdaError::CircularDependency(CircularDependencyError { chain })
    }

    fn not_found(&self, name: &str) -> MustawdaError {
        let names = self.names();
        let available: Vec<&str> = names.iter().map(Name::as_str).collect();

        MustawdaError::NotFound(NotFoundError {
            requested: Name::from(name),
            suggestions: suggest_similar(name, &available, 3),
        })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(name: &str, instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| MustawdaError::TypeMismatch {
        name: Name::from(name),
        expected: type_name::<T>(),
    })
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::config::ContainerConfig;
    pub use crate::error::{MustawdaError, Result};
    pub use crate::inject::Inject;
    pub use crate::key::Name;
    pub use crate::params::{InjectArgs, Injected, Kwargs, Signature, inject_args};
    pub use crate::provider::{Arguments, Module, Provider, Registrar};
    pub use crate::registry::{Instance, SlotState};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct A;
    struct C;

    #[test]
    fn resolve_value() {
        let container = Container::new();
        container.register_value("answer", 42i32).unwrap();

        let value: Arc<i32> = container.resolve_as("answer").unwrap();
        assert_eq!(*value, 42);
    }

    #[test]
    fn singleton_identity() {
        let container = Container::new();
        container
            .register("db", Provider::from_fn(|_| Ok(String::from("postgres"))))
            .unwrap();

        let a = container.resolve("db").unwrap();
        let b = container.resolve("db").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn constructor_is_lazy_and_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));

        let container = Container::new();
        container
            .register("counted", {
                let counter = counter.clone();
                Provider::from_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7u32)
                })
            })
            .unwrap();

        // Registration alone runs nothing
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(container.state("counted"), SlotState::Pending);

        let _a = container.resolve("counted").unwrap();
        let _b = container.resolve("counted").unwrap();
        let _c = container.resolve("counted").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn constructor_reads_arguments() {
        struct B(i32);

        let container = Container::new();
        container
            .register(
                "b",
                Provider::new(|_, args| Ok(B(*args.positional::<i32>(0)?))).arg(2i32),
            )
            .unwrap();

        assert_eq!(container.resolve_as::<B>("b").unwrap().0, 2);
    }

    #[test]
    fn resolve_with_dependency() {
        let container = Container::new();
        container
            .register_value("url", String::from("postgres://localhost"))
            .unwrap();
        container
            .register(
                "bytes",
                Provider::from_fn(|c| {
                    let url = c.resolve_as::<String>("url")?;
                    Ok(url.as_bytes().to_vec())
                }),
            )
            .unwrap();

        let bytes = container.resolve_as::<Vec<u8>>("bytes").unwrap();
        assert_eq!(bytes.as_slice(), b"postgres://localhost");
        assert_eq!(container.state("url"), SlotState::Resolved);
    }

    #[test]
    fn circular_dependency_detected() {
        let container = Container::new();
        container
            .register(
                "a",
                Provider::from_fn(|c| {
                    c.resolve("c")?;
                    Ok(A)
                }),
            )
            .unwrap();
        container
            .register(
                "c",
                Provider::from_fn(|c| {
                    c.resolve("a")?;
                    Ok(C)
                }),
            )
            .unwrap();

        match container.resolve("a").unwrap_err() {
            MustawdaError::CircularDependency(err) => {
                let chain: Vec<&str> = err.chain.iter().map(Name::as_str).collect();
                assert_eq!(chain, vec!["a", "c", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }

        assert!(container.get("a").is_none());
        assert!(container.get("c").is_none());
        assert_eq!(container.state("a"), SlotState::InProgress);
        assert_eq!(container.state("c"), SlotState::InProgress);
    }

    #[test]
    fn self_dependency_detected() {
        let container = Container::new();
        container
            .register(
                "me",
                Provider::from_fn(|c| {
                    c.resolve("me")?;
                    Ok(A)
                }),
            )
            .unwrap();

        assert!(container.resolve("me").unwrap_err().is_circular());
    }

    #[test]
    fn alias_resolves_to_same_instance() {
        let container = Container::new();
        container
            .register("my-name", Provider::from_fn(|_| Ok(String::from("x"))))
            .unwrap();

        let underscored = container.resolve("my_name").unwrap();
        let dashed = container.resolve("my-name").unwrap();
        assert!(Arc::ptr_eq(&underscored, &dashed));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn alias_after_underscore_registration_shares_instance() {
        let container = Container::new();
        container.register_value("my_name", 1i32).unwrap();
        container.register_value("my-name", 2i32).unwrap();

        let dashed = container.resolve_as::<i32>("my-name").unwrap();
        let underscored = container.resolve_as::<i32>("my_name").unwrap();
        assert!(Arc::ptr_eq(&dashed, &underscored));
        assert_eq!(*dashed, 2);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn pending_provider_replaced_through_alias() {
        let container = Container::new();
        container.register_value("my-name", 1i32).unwrap();
        container.register_value("my_name", 2i32).unwrap();

        assert_eq!(container.state("my_name"), SlotState::Pending);
        let underscored = container.resolve_as::<i32>("my_name").unwrap();
        let dashed = container.resolve_as::<i32>("my-name").unwrap();
        assert!(Arc::ptr_eq(&dashed, &underscored));
        assert_eq!(*dashed, 2);
    }

    #[test]
    fn alias_over_resolved_underscore_name_rejected() {
        let container = Container::new();
        container.register_value("my_name", 1i32).unwrap();
        container.resolve("my_name").unwrap();

        assert!(matches!(
            container.register_value("my-name", 2i32),
            Err(MustawdaError::DuplicateInstance(_))
        ));
        assert!(!container.contains("my-name"));
    }

    #[test]
    fn aliases_can_be_disabled() {
        let container = Container::builder()
            .without_aliases()
            .value("my-name", 1u8)
            .build()
            .unwrap();

        assert!(container.resolve("my_name").unwrap_err().is_not_found());
        assert!(container.resolve("my-name").is_ok());
    }

    #[test]
    fn custom_alias_rule() {
        let container = Container::builder()
            .alias_rule('.', '_')
            .value("db.pool", 1u8)
            .build()
            .unwrap();

        assert!(container.resolve("db_pool").is_ok());
    }

    #[test]
    fn not_found_leaves_state_unchanged() {
        let container = Container::new();
        container.register_value("user-repo", 1u8).unwrap();
        let before = container.names();

        match container.resolve("user-rep").unwrap_err() {
            MustawdaError::NotFound(err) => {
                assert_eq!(err.requested.as_str(), "user-rep");
                assert!(err.suggestions.contains(&"user-repo".to_string()));
            }
            other => panic!("Expected NotFound, got: {other:?}"),
        }

        assert_eq!(container.names(), before);
        assert_eq!(container.state("user-rep"), SlotState::Unregistered);
        assert_eq!(container.state("user-repo"), SlotState::Pending);
    }

    #[test]
    fn constructor_error_propagates_then_poisons() {
        let calls = Arc::new(AtomicU32::new(0));

        let container = Container::new();
        container
            .register("d", {
                let calls = calls.clone();
                Provider::from_fn(move |_| -> Result<A> {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(MustawdaError::construction(std::io::Error::other("hello")))
                })
            })
            .unwrap();

        match container.resolve("d").unwrap_err() {
            MustawdaError::Construction(source) => {
                assert_eq!(source.to_string(), "hello");
                assert!(source.downcast_ref::<std::io::Error>().is_some());
            }
            other => panic!("Expected Construction, got: {other:?}"),
        }

        match container.resolve("d").unwrap_err() {
            MustawdaError::CircularDependency(err) => {
                assert_eq!(err.chain, vec![Name::from("d")]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_instance_rejected() {
        let container = Container::new();
        container.register_value("x", 1i32).unwrap();
        container.resolve("x").unwrap();

        match container.register_value("x", 2i32).unwrap_err() {
            MustawdaError::DuplicateInstance(err) => assert_eq!(err.name.as_str(), "x"),
            other => panic!("Expected DuplicateInstance, got: {other:?}"),
        }
        assert_eq!(*container.resolve_as::<i32>("x").unwrap(), 1);
    }

    #[test]
    fn duplicate_through_alias_rejected() {
        let container = Container::new();
        container.register_value("my-name", 1i32).unwrap();
        container.resolve("my-name").unwrap();

        assert!(matches!(
            container.register_value("my_name", 2i32),
            Err(MustawdaError::DuplicateInstance(_))
        ));
    }

    #[test]
    fn pending_provider_is_replaced() {
        let container = Container::new();
        container.register_value("x", 1i32).unwrap();
        container.register_value("x", 2i32).unwrap();

        assert_eq!(*container.resolve_as::<i32>("x").unwrap(), 2);
    }

    #[test]
    fn pending_override_can_be_disabled() {
        let result = Container::builder()
            .allow_pending_override(false)
            .value("x", 1i32)
            .value("x", 2i32)
            .build();

        assert!(matches!(result, Err(MustawdaError::DuplicateInstance(_))));
    }

    #[test]
    fn builder_applies_config() {
        let config = ContainerConfig {
            allow_pending_override: false,
            alias_rule: None,
        };
        let container = Container::builder().config(config.clone()).build().unwrap();

        assert_eq!(container.config(), &config);
        assert_eq!(Container::new().config(), &ContainerConfig::default());
    }

    #[test]
    fn construct_skips_cache() {
        let container = Container::new();
        container.register_value("x", 1i32).unwrap();
        container.construct("x").unwrap();

        assert!(container.construct("x").unwrap_err().is_not_found());
        assert!(container.resolve("x").is_ok());
    }

    #[test]
    fn construct_as_builds_typed_instance() {
        let container = Container::new();
        container.register_value("x", 3u16).unwrap();

        let x = container.construct_as::<u16>("x").unwrap();
        assert_eq!(*x, 3);
        assert!(Arc::ptr_eq(&x, &container.resolve_as::<u16>("x").unwrap()));
    }

    #[test]
    fn type_mismatch() {
        let container = Container::new();
        container.register_value("x", 1i32).unwrap();

        match container.resolve_as::<String>("x").unwrap_err() {
            MustawdaError::TypeMismatch { name, expected } => {
                assert_eq!(name.as_str(), "x");
                assert!(expected.contains("String"));
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
        // The instance is still cached
        assert_eq!(container.state("x"), SlotState::Resolved);
    }

    #[test]
    fn builder_with_module() {
        struct Storage;

        impl Module for Storage {
            fn register(&self, registrar: &mut dyn Registrar) {
                registrar.register_provider(Name::from("db-url"), Provider::value("sqlite::memory:"));
            }
        }

        let container = Container::builder().module(&Storage).build().unwrap();
        let url = container.resolve_as::<&str>("db_url").unwrap();
        assert_eq!(*url, "sqlite::memory:");
    }

    fn collected_greeting() -> Provider {
        Provider::value(String::from("salaam"))
    }

    inventory::submit! {
        crate::provider::ProviderEntry { name: "container-test-greeting", provider: collected_greeting }
    }

    #[test]
    fn builder_registers_collected() {
        let container = Container::builder().collected().build().unwrap();
        let greeting = container.resolve_as::<String>("container-test-greeting").unwrap();
        assert_eq!(greeting.as_str(), "salaam");
    }

    #[test]
    fn reset_forgets_everything() {
        let container = Container::new();
        container.register_value("x", 1i32).unwrap();
        container.resolve("x").unwrap();

        container.reset();
        assert!(container.is_empty());
        assert!(!container.contains("x"));
        container.register_value("x", 2i32).unwrap();
        assert_eq!(*container.resolve_as::<i32>("x").unwrap(), 2);
    }

    #[test]
    fn debug_display() {
        let container = Container::new();
        container.register_value("a", 1i32).unwrap();
        container.register_value("b", 2i32).unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("registered: 2"));
    }
}
