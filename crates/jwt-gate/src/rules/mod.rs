//! Rule model and configuration loading.
//!
//! # Components
//!
//! - `model` - `AccessRule`, `Rule`, `RuleTable` and path matching
//! - `loader` - directive-file parser
//! - `path` - request path canonicalization
//! - `error` - `RuleLoadError`

pub mod error;
pub mod loader;
pub mod model;
pub mod path;

pub use error::RuleLoadError;
pub use loader::{load_rules, parse_rules};
pub use model::{path_matches, AccessMode, AccessRule, Rule, RuleTable};
pub use path::{canonicalize_path, encode_path};
