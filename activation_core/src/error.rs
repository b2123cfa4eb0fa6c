//! Error types for assembly, propagation and rule databases.

use activation_types::{display_symbols, ParseSymbolError, Symbol};

/// Errors raised by realizers and the components plugged into them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An expected source had no registered link when assembly finished.
    #[error(
        "construct {construct} in {} missing expected link(s): {}",
        display_path(.context),
        display_symbols(.missing)
    )]
    MissingLinks {
        construct: Symbol,
        context: Vec<Symbol>,
        missing: Vec<Symbol>,
    },

    /// A link points at a realizer that has since been dropped or replaced.
    #[error("construct {construct} holds a dangling link to {link}")]
    DanglingLink { construct: Symbol, link: Symbol },

    #[error("cannot collect {construct}: no build context is active")]
    NoBuildContext { construct: Symbol },

    #[error(transparent)]
    InvalidSymbol(#[from] ParseSymbolError),

    #[error("expected input {input} is not available")]
    MissingInput { input: Symbol },

    #[error("input {input} is not a {expected} output")]
    UnexpectedOutput {
        input: Symbol,
        expected: &'static str,
    },

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("received rule with {found} conditions; maximum allowed is {max}")]
    TooManyConditions { found: usize, max: usize },

    #[error("rule {0} already registered for a promised update")]
    PromiseConflict(Symbol),

    #[error("cannot delete non-existent rule {0}")]
    UnknownRule(Symbol),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn display_path(path: &[Symbol]) -> String {
    if path.is_empty() {
        return "<top level>".to_string();
    }
    path.iter()
        .map(Symbol::as_string)
        .collect::<Vec<_>>()
        .join("/")
}
