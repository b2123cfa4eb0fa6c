//! Symbols - identity tags for constructs.

mod ctype;

pub use ctype::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Errors raised when a textual construct identity cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSymbolError {
    #[error("unknown construct type '{0}'")]
    UnknownType(String),

    #[error("symbol '{0}' is not of the form 'type:name'")]
    Malformed(String),

    #[error("symbol '{0}' must carry exactly one construct type")]
    CompositeType(String),

    #[error("symbol name must not be empty")]
    EmptyName,
}

/// Identity of a construct: its type tag and its name.
///
/// Symbols are immutable and compare by value. They key realizer registries,
/// link tables and activation containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Symbol {
    ctype: ConstructType,
    name: String,
}

macro_rules! symbol_constructors {
    ($($fn_name:ident => $ctype:ident),* $(,)?) => {
        $(
            #[doc = concat!("Create a new `", stringify!($fn_name), "` symbol.")]
            pub fn $fn_name(name: impl Into<String>) -> Self {
                Self::new(ConstructType::$ctype, name)
            }
        )*
    };
}

impl Symbol {
    /// Create a symbol with an explicit construct type.
    pub fn new(ctype: ConstructType, name: impl Into<String>) -> Self {
        Self {
            ctype,
            name: name.into(),
        }
    }

    symbol_constructors! {
        feature => FEATURE,
        chunk => CHUNK,
        rule => RULE,
        features => FEATURES,
        chunks => CHUNKS,
        flow_in => FLOW_IN,
        flow_tb => FLOW_TB,
        flow_bt => FLOW_BT,
        flow_tt => FLOW_TT,
        flow_bb => FLOW_BB,
        terminus => TERMINUS,
        buffer => BUFFER,
        updater => UPDATER,
        subsystem => SUBSYSTEM,
        agent => AGENT,
    }

    /// The construct type tag.
    pub fn ctype(&self) -> ConstructType {
        self.ctype
    }

    /// The construct name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether this symbol's type falls within a type mask.
    pub fn is_a(&self, mask: ConstructType) -> bool {
        self.ctype.intersects(mask)
    }

    /// Convert the symbol to its `type:name` form.
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.ctype, self.name)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ctype, self.name)
    }
}

impl FromStr for Symbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ctype, name) = s
            .split_once(':')
            .ok_or_else(|| ParseSymbolError::Malformed(s.to_string()))?;

        let ctype: ConstructType = ctype.parse()?;
        if !ctype.is_single() {
            return Err(ParseSymbolError::CompositeType(s.to_string()));
        }
        if name.is_empty() {
            return Err(ParseSymbolError::EmptyName);
        }

        Ok(Self::new(ctype, name))
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.as_string()
    }
}

impl TryFrom<String> for Symbol {
    type Error = ParseSymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Render a list of symbols as `{a, b, c}` for diagnostics.
pub fn display_symbols<'a>(symbols: impl IntoIterator<Item = &'a Symbol>) -> String {
    let parts: Vec<String> = symbols.into_iter().map(Symbol::as_string).collect();
    format!("{{{}}}", parts.join(", "))
}
