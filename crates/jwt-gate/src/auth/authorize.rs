//! Claim-based authorization.
//!
//! Predicates are combined with a logical OR regardless of their mode: one
//! satisfied predicate authorizes the request. A rule listing
//! `deny role guest` followed by `allow role admin` therefore admits every
//! role except `guest`, and also admits `admin`; it does not restrict the
//! path to admins.

use crate::auth::claims::Claims;
use crate::rules::model::{AccessMode, AccessRule};

/// Whether `claims` satisfy `access_rules`. An empty list always passes.
pub fn authorize(claims: &Claims, access_rules: &[AccessRule]) -> bool {
    access_rules.is_empty() || access_rules.iter().any(|rule| is_satisfied(claims, rule))
}

fn is_satisfied(claims: &Claims, rule: &AccessRule) -> bool {
    let equal = claims
        .get(&rule.claim)
        .is_some_and(|value| value.matches(&rule.value));

    match rule.mode {
        AccessMode::Allow => equal,
        AccessMode::Deny => !equal,
    }
}
