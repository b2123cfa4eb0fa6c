//! Realizers - the live nodes and containers of a construct network.
//!
//! Propagation is pull-based: a realizer stores, for each source it expects,
//! a [`Pull`] bound to that source's output slot, and reads those slots when
//! it propagates. Realizers never hold each other directly. A `Pull` keeps a
//! weak handle on the slot, so the dataflow graph may contain cycles while
//! ownership stays a tree rooted at the top-level [`Structure`].
//!
//! A [`Structure`] wires links between its members automatically whenever a
//! member is added, and checks that every expectation is satisfied once
//! assembly is complete.

mod assets;
mod base;
mod builder;
mod construct;
mod structure;

pub use assets::*;
pub use builder::*;
pub use construct::*;
pub use structure::*;

use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use activation_types::{NumDict, Symbol};

use crate::error::Result;

/// Outputs of structure members, keyed by member symbol.
pub type Aggregate = BTreeMap<Symbol, Rc<Output>>;

/// Current output of a realizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Output {
    /// Output of a leaf construct.
    Flat(NumDict),
    /// Output of a structure: member outputs keyed by member symbol.
    Nested(Aggregate),
}

impl Output {
    pub fn as_flat(&self) -> Option<&NumDict> {
        match self {
            Output::Flat(d) => Some(d),
            Output::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Aggregate> {
        match self {
            Output::Nested(a) => Some(a),
            Output::Flat(_) => None,
        }
    }

    /// Walk nested aggregates along `path`. An empty path yields `self`.
    pub fn lookup(&self, path: &[Symbol]) -> Option<&Output> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.as_nested()?.get(head)?.lookup(rest),
        }
    }
}

/// Output slot of a realizer. Writers replace the inner `Rc` wholesale.
pub(crate) type OutputCell = RefCell<Rc<Output>>;

/// A link: read access to another realizer's current output.
#[derive(Debug, Clone)]
pub struct Pull {
    source: Symbol,
    cell: Weak<OutputCell>,
}

impl Pull {
    pub(crate) fn new(source: Symbol, cell: &Rc<OutputCell>) -> Self {
        Self {
            source,
            cell: Rc::downgrade(cell),
        }
    }

    /// Symbol of the realizer this link reads from.
    pub fn source(&self) -> &Symbol {
        &self.source
    }

    /// False once the source realizer has been dropped or replaced.
    pub fn is_live(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Current output of the source, if it still exists.
    pub fn pull(&self) -> Option<Rc<Output>> {
        self.cell.upgrade().map(|cell| cell.borrow().clone())
    }
}

/// Link table of a realizer, keyed by source symbol.
pub type Links = BTreeMap<Symbol, Pull>;

/// A node or container in a construct network.
#[derive(Debug)]
pub enum Realizer {
    Construct(Construct),
    Structure(Structure),
}

impl Realizer {
    /// Symbol of the client construct.
    pub fn construct(&self) -> &Symbol {
        match self {
            Realizer::Construct(c) => c.construct(),
            Realizer::Structure(s) => s.construct(),
        }
    }

    /// Current link table.
    pub fn inputs(&self) -> &Links {
        match self {
            Realizer::Construct(c) => c.inputs(),
            Realizer::Structure(s) => s.inputs(),
        }
    }

    /// Current output.
    pub fn view(&self) -> Rc<Output> {
        match self {
            Realizer::Construct(c) => c.view(),
            Realizer::Structure(s) => s.view(),
        }
    }

    /// A link reading this realizer's output.
    pub fn pull(&self) -> Pull {
        match self {
            Realizer::Construct(c) => c.pull(),
            Realizer::Structure(s) => s.pull(),
        }
    }

    /// Advance by one time step: propagate, then update.
    pub fn step(&mut self) -> Result<()> {
        self.propagate()?;
        self.update()
    }

    /// True iff the emitter or updater expects `source`.
    pub fn accepts(&self, source: &Symbol) -> bool {
        match self {
            Realizer::Construct(c) => c.accepts(source),
            Realizer::Structure(s) => s.accepts(source),
        }
    }

    /// Register `pull` if accepted; structures also forward it to members.
    pub fn offer(&mut self, pull: &Pull) {
        match self {
            Realizer::Construct(c) => c.offer(pull),
            Realizer::Structure(s) => s.offer(pull),
        }
    }

    /// Revert to default output; structures revert every descendant.
    pub fn clear_output(&mut self) {
        match self {
            Realizer::Construct(c) => c.clear_output(),
            Realizer::Structure(s) => s.clear_outputs(),
        }
    }

    /// Validate links of this realizer (and, for structures, its descendants).
    pub fn finalize_assembly(&mut self) -> Result<()> {
        self.finalize_in(&[])
    }

    pub fn as_construct(&self) -> Option<&Construct> {
        match self {
            Realizer::Construct(c) => Some(c),
            Realizer::Structure(_) => None,
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Realizer::Structure(s) => Some(s),
            Realizer::Construct(_) => None,
        }
    }

    pub fn as_construct_mut(&mut self) -> Option<&mut Construct> {
        match self {
            Realizer::Construct(c) => Some(c),
            Realizer::Structure(_) => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            Realizer::Structure(s) => Some(s),
            Realizer::Construct(_) => None,
        }
    }

    pub(crate) fn propagate(&mut self) -> Result<()> {
        match self {
            Realizer::Construct(c) => c.propagate(),
            Realizer::Structure(s) => s.propagate(),
        }
    }

    pub(crate) fn update(&mut self) -> Result<()> {
        match self {
            Realizer::Construct(c) => c.update(),
            Realizer::Structure(s) => s.update(),
        }
    }

    pub(crate) fn finalize_in(&mut self, context: &[Symbol]) -> Result<()> {
        match self {
            Realizer::Construct(c) => c.finalize_in(context),
            Realizer::Structure(s) => s.finalize_in(context),
        }
    }
}

impl From<Construct> for Realizer {
    fn from(construct: Construct) -> Self {
        Realizer::Construct(construct)
    }
}

impl From<Structure> for Realizer {
    fn from(structure: Structure) -> Self {
        Realizer::Structure(structure)
    }
}
