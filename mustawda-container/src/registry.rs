//! Slot table — the per-name state of every registration.
//!
//! Each name moves through `Pending → InProgress → Resolved` and never
//! back. A secondary spelling lives in the alias table and always
//! points at the slot of its primary name.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{DuplicateInstanceError, MustawdaError};
use crate::key::Name;
use crate::provider::Provider;

/// A resolved dependency. Identity is [`Arc::ptr_eq`].
pub type Instance = Arc<dyn Any + Send + Sync>;

/// State of a registered name.
pub(crate) enum Slot {
    /// Registered, constructor not run yet.
    Pending(Provider),
    /// Constructor running somewhere up the current chain, or failed.
    InProgress,
    /// Constructed; handed out on every lookup.
    Resolved(Instance),
}

impl Slot {
    fn state(&self) -> SlotState {
        match self {
            Slot::Pending(_) => SlotState::Pending,
            Slot::InProgress => SlotState::InProgress,
            Slot::Resolved(_) => SlotState::Resolved,
        }
    }
}

/// Observable state of a name, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Never registered (or reset).
    Unregistered,
    /// Provider stored, not resolved yet.
    Pending,
    /// Being constructed, or poisoned by a failed constructor.
    InProgress,
    /// Singleton instance cached.
    Resolved,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Unregistered => write!(f, "Unregistered"),
            SlotState::Pending => write!(f, "Pending"),
            SlotState::InProgress => write!(f, "InProgress"),
            SlotState::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Outcome of taking a slot for construction.
pub(crate) enum Taken {
    /// The provider to run; the slot now holds `InProgress`.
    Provider(Name, Provider),
    /// The slot already held `InProgress`.
    InProgress(Name),
    /// No pending provider under this name.
    Missing,
}

/// Stores the slot and alias tables.
#[derive(Default)]
pub(crate) struct Registry {
    slots: HashMap<Name, Slot>,
    aliases: HashMap<Name, Name>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a name to the primary name of its slot.
    pub fn canonical(&self, name: &str) -> Name {
        if !self.slots.contains_key(name) {
            if let Some(target) = self.aliases.get(name) {
                trace!(from = name, to = %target, "Following alias");
                return target.clone();
            }
        }
        Name::from(name)
    }

    /// Stores `provider` under `name`, plus `alias` pointing at `name`.
    ///
    /// A pending provider that was registered directly under the alias
    /// spelling is replaced, so both spellings share one slot.
    ///
    /// # Errors
    /// - [`MustawdaError::DuplicateInstance`] if `name` or `alias` is resolved
    /// - [`MustawdaError::ResolutionInProgress`] if either is in progress
    /// - [`MustawdaError::DuplicateInstance`] when a pending provider
    ///   exists and `allow_override` is false
    pub fn register(
        &mut self,
        name: Name,
        alias: Option<Name>,
        provider: Provider,
        allow_override: bool,
    ) -> Result<(), MustawdaError> {
        let target = self.canonical(name.as_str());
        let alias = alias.filter(|alias| *alias != target);

        self.check_replaceable(&target, allow_override)?;
        if let Some(alias) = &alias {
            self.check_replaceable(alias, allow_override)?;
        }

        debug!(name = %target, type_name = provider.type_name(), "Registered dependency");
        self.slots.insert(target.clone(), Slot::Pending(provider));

        if let Some(alias) = alias {
            if self.slots.remove(&alias).is_some() {
                debug!(name = %alias, "Folded pending provider into alias");
            }
            debug!(from = %alias, to = %target, "Registered alias");
            self.aliases.insert(alias, target);
        }
        Ok(())
    }

    /// Checks that the slot stored directly under `name` may be
    /// overwritten by a new provider.
    fn check_replaceable(&self, name: &Name, allow_override: bool) -> Result<(), MustawdaError> {
        match self.slots.get(name) {
            Some(Slot::Resolved(_)) => Err(MustawdaError::DuplicateInstance(
                DuplicateInstanceError { name: name.clone() },
            )),
            Some(Slot::InProgress) => {
                Err(MustawdaError::ResolutionInProgress { name: name.clone() })
            }
            Some(Slot::Pending(_)) if !allow_override => Err(MustawdaError::DuplicateInstance(
                DuplicateInstanceError { name: name.clone() },
            )),
            Some(Slot::Pending(_)) => {
                debug!(name = %name, "Replacing pending provider");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Returns the cached instance of `name`, if resolved.
    pub fn instance(&self, name: &str) -> Option<Instance> {
        match self.slots.get(&self.canonical(name)) {
            Some(Slot::Resolved(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Swaps the slot of `name` for `InProgress` and returns what was there.
    ///
    /// A resolved slot is left untouched and reported as [`Taken::Missing`].
    pub fn take_for_construction(&mut self, name: &str) -> Taken {
        let target = self.canonical(name);

        let Some(slot) = self.slots.get_mut(&target) else {
            return Taken::Missing;
        };

        match std::mem::replace(slot, Slot::InProgress) {
            Slot::Pending(provider) => Taken::Provider(target, provider),
            Slot::InProgress => Taken::InProgress(target),
            resolved @ Slot::Resolved(_) => {
                *slot = resolved;
                Taken::Missing
            }
        }
    }

    /// Stores a freshly constructed instance.
    pub fn store(&mut self, name: Name, instance: Instance) {
        self.slots.insert(name, Slot::Resolved(instance));
    }

    /// State of `name` (following aliases).
    pub fn state(&self, name: &str) -> SlotState {
        self.slots
            .get(&self.canonical(name))
            .map_or(SlotState::Unregistered, Slot::state)
    }

    /// Every name that can be looked up: primary names and aliases.
    pub fn names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.slots.keys().cloned().collect();
        names.extend(self.aliases.keys().cloned());
        names.sort();
        names
    }

    /// Number of primary names.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every slot and alias.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.aliases.clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("slots", &self.slots.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}
