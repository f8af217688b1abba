//! Short ↔ qualified identifiers.
//!
//! Callers name resources relative to their account (`web-app`); the API
//! names them absolutely (`/Compute-acme/jane/web-app`). Everything sent is
//! qualified against the client's [`Scope`] and everything returned is
//! unqualified again. Each payload type lists its identifier fields once in
//! [`Qualify::visit_names`]; qualify and unqualify both walk that list, so
//! the two directions cannot drift apart.

use crate::error::{Error, Result};
use std::fmt;

/// Account prefix all of a session's identifiers live under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope(String);

impl Scope {
    /// Create a scope from a path prefix such as `/Compute-acme/jane`.
    ///
    /// A missing leading `/` is added and trailing slashes are dropped.
    pub fn new(prefix: impl AsRef<str>) -> Result<Self> {
        let trimmed = prefix.as_ref().trim().trim_end_matches('/');
        let trimmed = trimmed.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(Error::Config("scope must not be empty".to_string()));
        }
        Ok(Self(format!("/{}", trimmed)))
    }

    /// The compute scope for a user of an identity domain.
    pub fn for_user(identity_domain: &str, user: &str) -> Result<Self> {
        if identity_domain.trim().is_empty() || user.trim().is_empty() {
            return Err(Error::Config(
                "identity domain and user must not be empty".to_string(),
            ));
        }
        Self::new(format!("/Compute-{}/{}", identity_domain.trim(), user.trim()))
    }

    /// The prefix, with a leading and no trailing slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualify a short identifier.
    ///
    /// Empty and absolute (`/`-rooted) identifiers are returned unchanged,
    /// which makes this a fixed point on its own output.
    pub fn qualify(&self, name: &str) -> String {
        if name.is_empty() || name.starts_with('/') {
            return name.to_string();
        }
        format!("{}/{}", self.0, name)
    }

    /// Strip this scope from a qualified identifier.
    ///
    /// Identifiers outside the scope are returned unchanged.
    pub fn unqualify(&self, name: &str) -> String {
        name.strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map_or_else(|| name.to_string(), str::to_string)
    }

    /// Whether `name` lives under this scope.
    pub fn is_qualified(&self, name: &str) -> bool {
        name.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Qualify only the part after `prefix:`, e.g. `ipreservation:my-ip`.
    ///
    /// Values without the prefix are left alone; they name shared pools.
    pub fn qualify_prefixed(&self, value: &str, prefix: &str) -> String {
        match split_prefixed(value, prefix) {
            Some(name) => format!("{}:{}", prefix, self.qualify(name)),
            None => value.to_string(),
        }
    }

    /// Inverse of [`Scope::qualify_prefixed`].
    pub fn unqualify_prefixed(&self, value: &str, prefix: &str) -> String {
        match split_prefixed(value, prefix) {
            Some(name) => format!("{}:{}", prefix, self.unqualify(name)),
            None => value.to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn split_prefixed<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    value.strip_prefix(prefix)?.strip_prefix(':')
}

/// Direction of a name rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Short to qualified.
    Qualify,
    /// Qualified to short.
    Unqualify,
}

/// A name rewrite bound to a scope and direction.
pub struct Rewrite<'a> {
    scope: &'a Scope,
    direction: Direction,
}

impl<'a> Rewrite<'a> {
    /// Create a rewrite.
    pub fn new(scope: &'a Scope, direction: Direction) -> Self {
        Self { scope, direction }
    }

    /// Rewrite one identifier field in place.
    pub fn name(&self, name: &mut String) {
        *name = match self.direction {
            Direction::Qualify => self.scope.qualify(name),
            Direction::Unqualify => self.scope.unqualify(name),
        };
    }

    /// Rewrite an optional identifier field.
    pub fn opt(&self, name: &mut Option<String>) {
        if let Some(name) = name {
            self.name(name);
        }
    }

    /// Rewrite a list of identifiers.
    pub fn all(&self, names: &mut [String]) {
        for name in names {
            self.name(name);
        }
    }

    /// Rewrite the name part of `prefix:name` values.
    pub fn prefixed(&self, value: &mut String, prefix: &str) {
        *value = match self.direction {
            Direction::Qualify => self.scope.qualify_prefixed(value, prefix),
            Direction::Unqualify => self.scope.unqualify_prefixed(value, prefix),
        };
    }

    /// Recurse into a nested payload.
    pub fn nested(&self, value: &mut impl Qualify) {
        value.rewrite(self);
    }
}

/// A payload with identifier fields.
pub trait Qualify {
    /// Apply `rewrite` to every identifier field, recursing into nested payloads.
    fn rewrite(&mut self, rewrite: &Rewrite<'_>);

    /// Qualify every identifier field against `scope`.
    fn qualify(&mut self, scope: &Scope) {
        self.rewrite(&Rewrite::new(scope, Direction::Qualify));
    }

    /// Unqualify every identifier field against `scope`.
    fn unqualify(&mut self, scope: &Scope) {
        self.rewrite(&Rewrite::new(scope, Direction::Unqualify));
    }
}

impl<T: Qualify> Qualify for Vec<T> {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        for item in self {
            item.rewrite(rewrite);
        }
    }
}

impl<T: Qualify> Qualify for Option<T> {
    fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
        if let Some(item) = self {
            item.rewrite(rewrite);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new("/acct-1/user-1").unwrap()
    }

    #[test]
    fn test_scope_normalization() {
        assert_eq!(Scope::new("acct-1/user-1/").unwrap().as_str(), "/acct-1/user-1");
        assert_eq!(Scope::new(" /acct-1/user-1 ").unwrap().as_str(), "/acct-1/user-1");
        assert!(Scope::new("").is_err());
        assert!(Scope::new("/").is_err());
    }

    #[test]
    fn test_scope_for_user() {
        let scope = Scope::for_user("acme", "jane@example.com").unwrap();
        assert_eq!(scope.as_str(), "/Compute-acme/jane@example.com");
        assert!(Scope::for_user("", "jane").is_err());
        assert!(Scope::for_user("acme", " ").is_err());
    }

    #[test]
    fn test_qualify() {
        assert_eq!(scope().qualify("web-app"), "/acct-1/user-1/web-app");
        assert_eq!(scope().qualify("web-app/vm1"), "/acct-1/user-1/web-app/vm1");
    }

    #[test]
    fn test_round_trip() {
        let scope = scope();
        for name in ["web-app", "a", "web-app/vm1", "with.dots_and-dashes"] {
            assert_eq!(scope.unqualify(&scope.qualify(name)), name);
        }
    }

    #[test]
    fn test_qualify_is_idempotent() {
        let scope = scope();
        for name in ["web-app", "", "/oracle/public/OL_7.2", "/acct-1/user-1/x"] {
            let once = scope.qualify(name);
            assert_eq!(scope.qualify(&once), once);
        }
    }

    #[test]
    fn test_empty_and_absolute_untouched() {
        let scope = scope();
        assert_eq!(scope.qualify(""), "");
        assert_eq!(scope.qualify("/oracle/public/OL_7.2"), "/oracle/public/OL_7.2");
        assert_eq!(scope.unqualify("/oracle/public/OL_7.2"), "/oracle/public/OL_7.2");
    }

    #[test]
    fn test_unqualify_strips_exact_prefix_only() {
        let scope = scope();
        // Sibling account sharing a textual prefix
        assert_eq!(scope.unqualify("/acct-1/user-10/x"), "/acct-1/user-10/x");
        assert_eq!(scope.unqualify("/acct-1/user-1"), "/acct-1/user-1");
        assert_eq!(scope.unqualify("/acct-1/user-1/"), "/acct-1/user-1/");
        assert_eq!(scope.unqualify("web-app"), "web-app");
    }

    #[test]
    fn test_is_qualified() {
        let scope = scope();
        assert!(scope.is_qualified("/acct-1/user-1/web-app"));
        assert!(!scope.is_qualified("/acct-1/user-10/web-app"));
        assert!(!scope.is_qualified("web-app"));
    }

    #[test]
    fn test_prefixed() {
        let scope = scope();
        assert_eq!(
            scope.qualify_prefixed("ipreservation:my-ip", "ipreservation"),
            "ipreservation:/acct-1/user-1/my-ip"
        );
        assert_eq!(
            scope.qualify_prefixed("ippool:/oracle/public/ippool", "ipreservation"),
            "ippool:/oracle/public/ippool"
        );
        assert_eq!(
            scope.unqualify_prefixed("ipreservation:/acct-1/user-1/my-ip", "ipreservation"),
            "ipreservation:my-ip"
        );
    }

    struct Pair {
        name: String,
        keys: Vec<String>,
        image: Option<String>,
    }

    impl Qualify for Pair {
        fn rewrite(&mut self, rewrite: &Rewrite<'_>) {
            rewrite.name(&mut self.name);
            rewrite.all(&mut self.keys);
            rewrite.opt(&mut self.image);
        }
    }

    #[test]
    fn test_trait_round_trip() {
        let scope = scope();
        let mut pair = vec![Pair {
            name: "vm".to_string(),
            keys: vec!["k1".to_string(), "/acct-2/u/shared".to_string()],
            image: None,
        }];

        pair.qualify(&scope);
        assert_eq!(pair[0].name, "/acct-1/user-1/vm");
        assert_eq!(pair[0].keys[0], "/acct-1/user-1/k1");
        assert_eq!(pair[0].keys[1], "/acct-2/u/shared");
        assert!(pair[0].image.is_none());

        // Twice is the same as once
        pair.qualify(&scope);
        assert_eq!(pair[0].name, "/acct-1/user-1/vm");

        pair.unqualify(&scope);
        assert_eq!(pair[0].name, "vm");
        assert_eq!(pair[0].keys, vec!["k1", "/acct-2/u/shared"]);
    }
}
