//! Rule configuration errors.
//!
//! Every variant is fatal: the service refuses to start on any of them.

use crate::auth::jwks::KeySetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("Failed to read rules file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: `{directive}` expects {expected} argument(s), found {found}")]
    WrongArgumentCount {
        line: usize,
        directive: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: `{directive}` may appear only once per block")]
    DuplicateDirective { line: usize, directive: String },

    #[error("line {line}: `jwt` takes either a path or a block, not both")]
    PathWithBlock { line: usize },

    #[error("line {line}: each rule must have a path")]
    MissingPath { line: usize },

    #[error("line {line}: unbalanced braces")]
    UnbalancedBraces { line: usize },

    #[error("rule path must not be empty")]
    EmptyPath,

    #[error(transparent)]
    Keys(#[from] KeySetError),
}
