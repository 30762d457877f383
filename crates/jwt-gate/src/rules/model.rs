//! Path-scoped protection rules.
//!
//! A `RuleTable` is built once at startup and shared read-only by every
//! request. The first rule whose path matches wins.

use crate::auth::jwks::KeySet;
use crate::rules::error::RuleLoadError;

/// How an access predicate treats its claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Satisfied when the claim equals the value.
    Allow,
    /// Satisfied when the claim differs from the value (or is missing).
    Deny,
}

/// A single claim predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub mode: AccessMode,
    pub claim: String,
    pub value: String,
}

impl AccessRule {
    pub fn allow(claim: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mode: AccessMode::Allow,
            claim: claim.into(),
            value: value.into(),
        }
    }

    pub fn deny(claim: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mode: AccessMode::Deny,
            claim: claim.into(),
            value: value.into(),
        }
    }
}

/// Protection for every request path under `path`.
#[derive(Debug, Clone)]
pub struct Rule {
    path: String,
    access_rules: Vec<AccessRule>,
    keys: KeySet,
}

impl Rule {
    /// # Errors
    ///
    /// Returns `RuleLoadError::EmptyPath` if `path` is empty.
    pub fn new(
        path: impl Into<String>,
        access_rules: Vec<AccessRule>,
        keys: KeySet,
    ) -> Result<Self, RuleLoadError> {
        let path = path.into();
        if path.is_empty() {
            return Err(RuleLoadError::EmptyPath);
        }

        Ok(Self {
            path,
            access_rules,
            keys,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Predicates in declaration order.
    pub fn access_rules(&self) -> &[AccessRule] {
        &self.access_rules
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Whether this rule covers `request_path`.
    pub fn matches(&self, request_path: &str) -> bool {
        path_matches(&self.path, request_path)
    }
}

/// Ordered rules, first match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The first rule, in declaration order, covering `request_path`.
    pub fn first_match(&self, request_path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(request_path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Case-sensitive prefix match on a segment boundary.
///
/// `/hello` covers `/hello` and `/hello/world` but not `/helloworld`.
/// A rule path ending in `/` covers everything below it, so `/` covers
/// every path.
pub fn path_matches(rule_path: &str, request_path: &str) -> bool {
    let Some(rest) = request_path.strip_prefix(rule_path) else {
        return false;
    };

    rest.is_empty() || rule_path.ends_with('/') || rest.starts_with('/')
}
