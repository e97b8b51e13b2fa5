//! Lazy parameter binder.
//!
//! [`inject_args`] names the dependencies to inject; [`InjectArgs::wrap`]
//! checks the target [`Signature`] up front and returns an
//! [`Injected`] function. The first call resolves every name once;
//! every call then receives them as keyword arguments, replacing
//! whatever the caller passed under the same names.
//!
//! # Examples
//! ```rust
//! use mustawda_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greeter { greeting: String }
//!
//! let container = Container::new();
//! container.register_value("greeter", Greeter { greeting: "salaam".into() })?;
//!
//! let hello = inject_args(["greeter"]).wrap(
//!     Signature::new("hello").param("greeter"),
//!     |who: &str, kwargs: Kwargs| -> Result<String> {
//!         let greeter = kwargs.get::<Greeter>("greeter")?;
//!         Ok(format!("{}, {who}", greeter.greeting))
//!     },
//! )?;
//!
//! assert_eq!(hello.call(&container, "world", Kwargs::new())??, "salaam, world");
//! # Ok::<(), MustawdaError>(())
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::container::Container;
use crate::error::{ArgumentRef, ContractViolationError, MustawdaError, Result};
use crate::key::Name;
use crate::registry::Instance;

/// The parameters a wrapped function declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    function: String,
    params: Vec<Name>,
    var_keyword: bool,
}

impl Signature {
    /// Starts a signature for the function labelled `function`.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            params: Vec::new(),
            var_keyword: false,
        }
    }

    /// Declares one named parameter.
    pub fn param(mut self, name: impl Into<Name>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Declares several named parameters.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Name>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    /// Accept any keyword, declared or not.
    pub fn var_keyword(mut self) -> Self {
        self.var_keyword = true;
        self
    }

    /// Returns true if a keyword `name` can be passed.
    pub fn accepts(&self, name: &str) -> bool {
        self.var_keyword || self.params.iter().any(|p| p.as_str() == name)
    }

    /// Label of the function.
    pub fn function(&self) -> &str {
        &self.function
    }
}

/// Keyword arguments of an injected call.
#[derive(Clone, Default)]
pub struct Kwargs {
    values: HashMap<Name, Instance>,
}

impl Kwargs {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Kwargs::insert).
    pub fn with<V: Send + Sync + 'static>(mut self, name: impl Into<Name>, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name` to `value`.
    pub fn insert<V: Send + Sync + 'static>(&mut self, name: impl Into<Name>, value: V) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Sets `name` to an already shared instance.
    pub fn insert_instance(&mut self, name: impl Into<Name>, instance: Instance) {
        self.values.insert(name.into(), instance);
    }

    /// Returns `name` as a `V`.
    ///
    /// # Errors
    /// [`MustawdaError::MissingArgument`] or [`MustawdaError::TypeMismatch`].
    pub fn get<V: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<V>> {
        let instance = self
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| MustawdaError::MissingArgument(ArgumentRef::Keyword(Name::from(name))))?;

        instance.downcast::<V>().map_err(|_| MustawdaError::TypeMismatch {
            name: Name::from(name),
            expected: type_name::<V>(),
        })
    }

    /// Returns the raw instance stored under `name`.
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    /// Returns true if `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of keyword arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are none.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every entry of `other` in, overwriting on conflict.
    fn overlay(&mut self, other: &Kwargs) {
        for (name, instance) in &other.values {
            self.values.insert(name.clone(), instance.clone());
        }
    }
}

impl fmt::Debug for Kwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(Name::as_str).collect();
        names.sort_unstable();
        f.debug_tuple("Kwargs").field(&names).finish()
    }
}

/// Names to inject, not yet attached to a function.
#[derive(Debug, Clone)]
pub struct InjectArgs {
    names: Vec<Name>,
}

/// Starts a parameter binder for `names`.
pub fn inject_args<I, S>(names: I) -> InjectArgs
where
    I: IntoIterator<Item = S>,
    S: Into<Name>,
{
    InjectArgs {
        names: names.into_iter().map(Into::into).collect(),
    }
}

impl InjectArgs {
    /// Attaches the binder to `func`, whose parameters are described by
    /// `signature`.
    ///
    /// # Errors
    /// [`MustawdaError::ContractViolation`] if `signature` cannot accept
    /// one of the names. Checked here, before anything is resolved.
    pub fn wrap<F>(self, signature: Signature, func: F) -> Result<Injected<F>> {
        let missing: Vec<Name> = self
            .names
            .iter()
            .filter(|name| !signature.accepts(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(MustawdaError::ContractViolation(ContractViolationError {
                function: signature.function,
                missing,
            }));
        }

        Ok(Injected {
            names: self.names,
            signature,
            func,
            cache: OnceCell::new(),
        })
    }
}

/// A function whose keyword arguments are filled from the container.
pub struct Injected<F> {
    names: Vec<Name>,
    signature: Signature,
    func: F,
    cache: OnceCell<Kwargs>,
}

impl<F> Injected<F> {
    /// Calls the wrapped function.
    ///
    /// `args` is passed through untouched. `kwargs` is overlaid with the
    /// injected instances, so a caller-supplied value for an injected
    /// name is replaced.
    ///
    /// # Errors
    /// A resolution error on the first call (or on any call until one
    /// succeeds). The wrapped function's own result is returned as `R`.
    pub fn call<A, R>(&self, container: &Container, args: A, mut kwargs: Kwargs) -> Result<R>
    where
        F: Fn(A, Kwargs) -> R,
    {
        kwargs.overlay(self.injected(container)?);
        Ok((self.func)(args, kwargs))
    }

    /// Like [`call`](Injected::call), through the process-wide container.
    pub fn call_global<A, R>(&self, args: A, kwargs: Kwargs) -> Result<R>
    where
        F: Fn(A, Kwargs) -> R,
    {
        self.call(crate::global::global(), args, kwargs)
    }

    /// Returns true once the injected instances are cached.
    pub fn is_primed(&self) -> bool {
        self.cache.get().is_some()
    }

    /// The injected names.
    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// The wrapped function's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    fn injected(&self, container: &Container) -> Result<&Kwargs> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached);
        }

        let mut resolved = Kwargs::new();
        for name in &self.names {
            resolved.insert_instance(name.clone(), container.resolve(name.as_str())?);
        }
        debug!(
            function = self.signature.function(),
            count = resolved.len(),
            "Injected arguments resolved"
        );

        let cached = match self.cache.try_insert(resolved) {
            Ok(cached) => cached,
            Err((cached, _)) => cached,
        };
        Ok(cached)
    }
}

impl<F> fmt::Debug for Injected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("function", &self.signature.function)
            .field("names", &self.names)
            .field("primed", &self.is_primed())
            .finish()
    }
}
