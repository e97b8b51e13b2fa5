//! The process-wide container and access functions.
//!
//! Applications that prefer ambient state can register and resolve
//! through these free functions. It starts empty, lives for the whole
//! process, and is never torn down; tests should call [`reset`]
//! between cases.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::container::Container;
use crate::error::Result;
use crate::key::Name;
use crate::provider::Provider;
use crate::registry::Instance;

// Created on first access.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(Container::new);

/// Returns the process-wide container.
///
/// ```
/// use mustawda_container::global;
///
/// global::register_value("doc-global", 1u8).unwrap();
/// assert!(global::global().contains("doc_global"));
/// ```
pub fn global() -> &'static Container {
    &GLOBAL_CONTAINER
}

/// [`Container::register`] on the global container.
pub fn register(name: impl Into<Name>, provider: Provider) -> Result<()> {
    global().register(name, provider)
}

/// [`Container::register_value`] on the global container.
pub fn register_value<T: Send + Sync + 'static>(name: impl Into<Name>, value: T) -> Result<()> {
    global().register_value(name, value)
}

/// [`Container::resolve`] on the global container.
pub fn resolve(name: &str) -> Result<Instance> {
    global().resolve(name)
}

/// [`Container::resolve_as`] on the global container.
pub fn resolve_as<T: Send + Sync + 'static>(name: &str) -> Result<Arc<T>> {
    global().resolve_as(name)
}

/// [`Container::reset`] on the global container.
pub fn reset() {
    global().reset();
}
