//! Error types for Mustawda container operations.
//!
//! Every failure names the dependency involved and, where it helps,
//! ends with a `Hint:` line pointing at the usual fix.

use std::fmt;

use mustawda_support::rendering::{render_chain, shorten_type_name};

use crate::key::Name;

/// Boxed error returned by user constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Mustawda operations.
#[derive(Debug, thiserror::Error)]
pub enum MustawdaError {
    /// Requested name has neither a pending provider nor a cached instance.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// Registration attempted for a name that is already resolved.
    #[error("{}", .0)]
    DuplicateInstance(DuplicateInstanceError),

    /// Resolution re-entered a name that is still being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A constructor failed. Passed through exactly as the constructor
    /// produced it.
    #[error(transparent)]
    Construction(BoxError),

    /// A parameter binder was wrapped around a function that cannot
    /// accept the injected names.
    #[error("{}", .0)]
    ContractViolation(ContractViolationError),

    /// The resolved instance is not of the requested type.
    #[error("Type mismatch for {name}: expected {}", shorten_type_name(.expected))]
    TypeMismatch { name: Name, expected: &'static str },

    /// A constructor or injected function asked for an argument that
    /// was never supplied.
    #[error("Missing argument: {0}")]
    MissingArgument(ArgumentRef),

    /// Registration attempted while the name is being constructed (or
    /// after its constructor failed).
    #[error("Cannot register {name}: its resolution is in progress or has failed")]
    ResolutionInProgress { name: Name },
}

impl MustawdaError {
    /// Wraps any error raised inside a constructor.
    ///
    /// ```
    /// use mustawda_container::error::MustawdaError;
    ///
    /// let err = MustawdaError::construction("disk on fire");
    /// assert_eq!(err.to_string(), "disk on fire");
    /// ```
    pub fn construction(source: impl Into<BoxError>) -> Self {
        Self::Construction(source.into())
    }

    /// Returns `true` for [`MustawdaError::CircularDependency`].
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency(_))
    }

    /// Returns `true` for [`MustawdaError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Error when a name cannot be resolved.
#[derive(Debug)]
pub struct NotFoundError {
    /// The name that was requested
    pub requested: Name,
    /// Registered names that look alike
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency not found: {}", self.requested)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to call .register(\"{}\", ..)?",
            self.requested
        )
    }
}

/// Error when registering over an already resolved name.
#[derive(Debug)]
pub struct DuplicateInstanceError {
    pub name: Name,
}

impl fmt::Display for DuplicateInstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency already resolved: {}", self.name)?;
        write!(
            f,
            "\n  Hint: Register dependencies before the first resolve, or call .reset()"
        )
    }
}

/// Error when a circular dependency is detected.
///
/// Shows the resolution chain so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The chain of names that forms the cycle.
    /// Example: ["a", "c", "a"]. A single entry means the name was
    /// poisoned by an earlier failed construction.
    pub chain: Vec<Name>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  ")?;
        write!(f, "{}", render_chain(&self.chain))?;

        if self.chain.len() == 1 {
            write!(f, "\n  Note: an earlier construction of this name did not complete")
        } else {
            write!(
                f,
                "\n  Hint: Read the dependency lazily after construction, or restructure the cycle"
            )
        }
    }
}

/// Error when a parameter binder cannot inject into a function.
#[derive(Debug)]
pub struct ContractViolationError {
    /// Label of the wrapped function
    pub function: String,
    /// Names the function does not declare
    pub missing: Vec<Name>,
}

impl fmt::Display for ContractViolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self.missing.iter().map(Name::as_str).collect();
        write!(
            f,
            "Cannot inject into {}: no parameter named {}",
            self.function,
            missing.join(", ")
        )?;
        write!(
            f,
            "\n  Hint: Declare the parameters or accept extra keywords with .var_keyword()"
        )
    }
}

/// Identifies an argument by position or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentRef {
    Positional(usize),
    Keyword(Name),
}

impl fmt::Display for ArgumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentRef::Positional(index) => write!(f, "#{index}"),
            ArgumentRef::Keyword(name) => write!(f, "{name}"),
        }
    }
}

/// Convenient Result type for Mustawda operations.
pub type Result<T> = std::result::Result<T, MustawdaError>;
