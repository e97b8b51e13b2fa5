//! Core container implementation for Mustawda DI.

pub mod config;
pub mod container;
pub mod error;
pub mod global;
pub mod inject;
pub mod key;
pub mod params;
pub mod provider;
pub mod registry;

pub use container::{Container, ContainerBuilder, prelude};
pub use error::{MustawdaError, Result};
pub use inject::Inject;
pub use inventory;
pub use key::Name;
pub use params::{Injected, Kwargs, Signature, inject_args};
pub use provider::{Provider, ProviderEntry};
