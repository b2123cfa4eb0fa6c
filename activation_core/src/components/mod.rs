//! Capability interfaces consumed by realizers, and reference implementations.
//!
//! A realizer never computes anything itself. It delegates to:
//! - a [`Propagator`] (leaf constructs) or a [`Cycle`] (structures) that
//!   produces its output, and
//! - an optional [`ConstructUpdater`] / [`StructureUpdater`] that mutates
//!   persistent state once outputs are known.
//!
//! All of them declare the sources they pull from through [`Expects`]; that
//! declaration is what drives automatic link discovery.

mod basic;
mod flows;
mod rules;

pub use basic::*;
pub use flows::*;
pub use rules::*;

use std::collections::BTreeMap;
use std::rc::Rc;

use activation_types::{ConstructType, NumDict, Symbol};

use crate::error::{Error, Result};
use crate::realizers::{Aggregate, Links, Output};

/// Snapshot of pulled source outputs, keyed by source symbol.
pub type Inputs = BTreeMap<Symbol, Rc<Output>>;

/// Declaration surface shared by emitters and updaters.
pub trait Expects {
    /// Sources this capability pulls from.
    fn expected(&self) -> &[Symbol];

    /// True iff this capability wants data from `source`.
    fn expects(&self, source: &Symbol) -> bool {
        self.expected().contains(source)
    }

    /// True iff every expected source has a registered link.
    fn check_links(&self, links: &Links) -> bool {
        self.expected().iter().all(|source| links.contains_key(source))
    }

    /// Called when the capability is attached to the realizer for `client`.
    fn entrust(&mut self, _client: &Symbol) {}
}

/// Emitter for leaf constructs: computes a flat output from pulled inputs.
pub trait Propagator: Expects {
    /// Default output, or `data` wrapped as an output when given.
    fn emit(&self, data: Option<NumDict>) -> NumDict {
        data.unwrap_or_default()
    }

    /// Compute a new output from the current inputs.
    fn call(&mut self, inputs: &Inputs) -> Result<NumDict>;

    /// Bookkeeping hook run at the start of the update phase.
    fn update(&mut self, _inputs: &Inputs, _output: &NumDict) -> Result<()> {
        Ok(())
    }
}

/// Emitter for structures: orders member processing and shapes the aggregate.
pub trait Cycle: Expects {
    /// Member types in processing order. A type may appear more than once.
    fn sequence(&self) -> &[ConstructType];

    /// Member types whose outputs are exposed in the aggregate.
    fn output(&self) -> ConstructType;

    /// Default aggregate, or `data` as the aggregate when given.
    fn emit(&self, data: Option<Aggregate>) -> Aggregate {
        data.unwrap_or_default()
    }
}

/// Arguments handed to a leaf construct's updater.
pub struct ConstructUpdate<'a> {
    pub propagator: &'a dyn Propagator,
    /// Snapshot pulled for the propagator.
    pub inputs: &'a Inputs,
    /// Output computed in the propagation phase.
    pub output: &'a NumDict,
    /// Snapshot pulled for the updater.
    pub update_data: &'a Inputs,
}

/// Arguments handed to a structure's updater.
pub struct StructureUpdate<'a> {
    pub inputs: &'a Inputs,
    pub output: &'a Aggregate,
    pub update_data: &'a Inputs,
}

/// Updater for leaf constructs.
pub trait ConstructUpdater: Expects {
    fn update(&mut self, args: ConstructUpdate<'_>) -> Result<()>;
}

/// Updater for structures.
pub trait StructureUpdater: Expects {
    fn update(&mut self, args: StructureUpdate<'_>) -> Result<()>;
}

/// Extract a flat (leaf) input from a pulled snapshot.
pub fn flat_input<'a>(inputs: &'a Inputs, source: &Symbol) -> Result<&'a NumDict> {
    let output = inputs.get(source).ok_or_else(|| Error::MissingInput {
        input: source.clone(),
    })?;
    output.as_flat().ok_or_else(|| Error::UnexpectedOutput {
        input: source.clone(),
        expected: "flat",
    })
}

/// Extract a nested (structure) input from a pulled snapshot.
pub fn nested_input<'a>(inputs: &'a Inputs, source: &Symbol) -> Result<&'a Aggregate> {
    let output = inputs.get(source).ok_or_else(|| Error::MissingInput {
        input: source.clone(),
    })?;
    output.as_nested().ok_or_else(|| Error::UnexpectedOutput {
        input: source.clone(),
        expected: "nested",
    })
}
