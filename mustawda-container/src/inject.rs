//! Lazy attribute binder.
//!
//! An [`Inject<T>`] is declared once, usually as a `static` next to the
//! type that reads it. The first read resolves the name; every later
//! read of the same binder returns the memoized `Arc<T>` without
//! touching the container, whichever consuming instance performs it.
//!
//! # Examples
//! ```rust
//! use mustawda_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Mailer;
//! struct Signup;
//!
//! static SIGNUP_MAILER: Inject<Mailer> = Inject::new("mailer");
//!
//! impl Signup {
//!     fn mailer(&self, container: &Container) -> Result<Arc<Mailer>> {
//!         SIGNUP_MAILER.get(container)
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_value("mailer", Mailer)?;
//!
//! let first = Signup.mailer(&container)?;
//! let second = Signup.mailer(&container)?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok::<(), MustawdaError>(())
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::container::Container;
use crate::error::Result;

/// Compute-once handle to a named singleton.
///
/// The cache belongs to the binder, not to a container: once bound, the
/// same value is returned even when read through a different container.
pub struct Inject<T> {
    name: &'static str,
    cell: OnceCell<Arc<T>>,
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Declare a binder for `name`. Nothing is resolved yet.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    /// Returns the bound value, resolving it through `container` on the
    /// first read.
    ///
    /// The cell is not locked while the container resolves, so a
    /// constructor that reads this binder again reaches the container
    /// and gets [`MustawdaError::CircularDependency`](crate::error::MustawdaError::CircularDependency).
    ///
    /// # Errors
    /// Any resolution error, or a type mismatch. Nothing is cached on
    /// error.
    pub fn get(&self, container: &Container) -> Result<Arc<T>> {
        if let Some(value) = self.cell.get() {
            return Ok(value.clone());
        }

        let value = container.resolve_as::<T>(self.name)?;
        trace!(name = self.name, "Binder bound");

        // A concurrent first read may have won; keep its value.
        let bound = match self.cell.try_insert(value) {
            Ok(bound) => bound,
            Err((bound, _)) => bound,
        };
        Ok(bound.clone())
    }

    /// Like [`get`](Inject::get), through the process-wide container.
    pub fn get_global(&self) -> Result<Arc<T>> {
        self.get(crate::global::global())
    }

    /// Returns the bound value if a read already succeeded.
    pub fn bound(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Returns true once a read has succeeded.
    pub fn is_bound(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The name this binder resolves.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("name", &self.name)
            .field("type_name", &type_name::<T>())
            .field("bound", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MustawdaError;
    use crate::provider::Provider;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    #[test]
    fn first_read_resolves_then_memoizes() {
        static DB: Inject<Database> = Inject::new("db");

        let container = Container::new();
        container
            .register(
                "db",
                Provider::from_fn(|_| Ok(Database { url: "postgres://localhost".into() })),
            )
            .unwrap();

        assert!(!DB.is_bound());
        let first = DB.get(&container).unwrap();
        assert!(DB.is_bound());
        assert_eq!(first.url, "postgres://localhost");

        // Later reads bypass the container entirely
        container.reset();
        let second = DB.get(&container).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn shared_across_consuming_instances() {
        static COUNTER: Inject<AtomicU32> = Inject::new("counter");

        struct Consumer;

        impl Consumer {
            fn bump(&self, container: &Container) -> u32 {
                COUNTER.get(container).unwrap().fetch_add(1, Ordering::SeqCst)
            }
        }

        let container = Container::new();
        container.register_value("counter", AtomicU32::new(0)).unwrap();

        assert_eq!(Consumer.bump(&container), 0);
        assert_eq!(Consumer.bump(&container), 1);
    }

    #[test]
    fn independent_binders_converge() {
        static LEFT: Inject<String> = Inject::new("greeting");
        static RIGHT: Inject<String> = Inject::new("greeting");

        let container = Container::new();
        container.register_value("greeting", String::from("salaam")).unwrap();

        let left = LEFT.get(&container).unwrap();
        assert!(!RIGHT.is_bound());
        let right = RIGHT.get(&container).unwrap();
        assert!(Arc::ptr_eq(&left, &right));
    }

    #[test]
    fn error_is_not_cached() {
        static MISSING: Inject<String> = Inject::new("late");

        let container = Container::new();
        assert!(MISSING.get(&container).unwrap_err().is_not_found());
        assert!(!MISSING.is_bound());

        container.register_value("late", String::from("now")).unwrap();
        assert_eq!(MISSING.get(&container).unwrap().as_str(), "now");
    }

    #[test]
    fn reentrant_read_is_circular() {
        static SELF_REF: Inject<Database> = Inject::new("loop");

        let container = Container::new();
        container
            .register(
                "loop",
                Provider::from_fn(|c| {
                    SELF_REF.get(c)?;
                    Ok(Database { url: String::new() })
                }),
            )
            .unwrap();

        match SELF_REF.get(&container).unwrap_err() {
            MustawdaError::CircularDependency(err) => assert_eq!(err.chain.len(), 2),
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        assert!(!SELF_REF.is_bound());
    }

    #[test]
    fn debug_shows_state() {
        let binder: Inject<u8> = Inject::new("byte");
        let debug = format!("{binder:?}");
        assert!(debug.contains("byte"));
        assert!(debug.contains("bound: false"));
        assert_eq!(binder.name(), "byte");
        assert!(binder.bound().is_none());
    }
}
