//! # Mustawda — lazy dependency injection for Rust
//!
//! A name-keyed container that builds each dependency on first use,
//! keeps it as a singleton, and refuses circular resolution instead of
//! looping. Dependencies reach application code through a direct
//! [`Container::resolve`], a lazy [`Inject`] binder, or an
//! [`inject_args`] parameter binder.

pub use mustawda_container::*;
pub use mustawda_support::*;
