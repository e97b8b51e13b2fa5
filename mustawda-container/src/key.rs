//! Dependency names.
//!
//! [`Name`] identifies a registration within the container. Names are
//! plain strings; a registration may also be reachable through a
//! normalized spelling (see [`AliasRule`]).

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Identifies a dependency in the container.
///
/// Cheap to clone: the string is shared behind an [`Arc`].
///
/// # Examples
/// ```
/// use mustawda_container::key::Name;
///
/// let name = Name::from("db-pool");
/// assert_eq!(name.as_str(), "db-pool");
/// assert_eq!(name, Name::from(String::from("db-pool")));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&Name> for Name {
    fn from(value: &Name) -> Self {
        value.clone()
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the secondary spelling of a name is derived.
///
/// Every occurrence of `from` is replaced by `to`, so with the default
/// rule `"my-name"` is also reachable as `"my_name"`.
///
/// # Examples
/// ```
/// use mustawda_container::key::AliasRule;
///
/// let rule = AliasRule::default();
/// assert_eq!(rule.normalize("db-pool").as_deref(), Some("db_pool"));
/// assert_eq!(rule.normalize("db_pool"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AliasRule {
    pub from: char,
    pub to: char,
}

impl AliasRule {
    /// Returns the normalized spelling, or `None` when it equals `name`.
    pub fn normalize(&self, name: &str) -> Option<String> {
        if self.from == self.to || !name.contains(self.from) {
            return None;
        }
        Some(name.replace(self.from, &self.to.to_string()))
    }
}

impl Default for AliasRule {
    fn default() -> Self {
        Self { from: '-', to: '_' }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn names_compare_by_content() {
        assert_eq!(Name::from("a"), Name::from(String::from("a")));
        assert_ne!(Name::from("a"), Name::from("b"));
    }

    #[test]
    fn name_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Name::from("db"), 1);
        assert_eq!(map.get("db"), Some(&1));
        assert_eq!(map.get("cache"), None);
    }

    #[test]
    fn name_display_and_debug() {
        let name = Name::from("my-name");
        assert_eq!(format!("{name}"), "my-name");
        assert_eq!(format!("{name:?}"), "Name(\"my-name\")");
    }

    #[test]
    fn normalize_replaces_every_separator() {
        let rule = AliasRule::default();
        assert_eq!(rule.normalize("a-b-c").as_deref(), Some("a_b_c"));
    }

    #[test]
    fn custom_rule() {
        let rule = AliasRule { from: '.', to: '_' };
        assert_eq!(rule.normalize("db.pool").as_deref(), Some("db_pool"));
        assert_eq!(rule.normalize("db-pool"), None);
    }

    #[test]
    fn identity_rule_never_aliases() {
        let rule = AliasRule { from: '-', to: '-' };
        assert_eq!(rule.normalize("a-b"), None);
    }
}
