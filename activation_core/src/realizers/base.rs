//! State shared by every realizer kind.

use std::cell::RefCell;
use std::rc::Rc;

use activation_types::Symbol;

use super::{Links, Output, OutputCell, Pull};
use crate::components::{Expects, Inputs};
use crate::error::{Error, Result};

/// Identity, links, output slot and capabilities of a realizer.
pub(crate) struct Base<E: ?Sized, U: ?Sized> {
    pub(crate) construct: Symbol,
    pub(crate) inputs: Links,
    pub(crate) output: Rc<OutputCell>,
    pub(crate) input_cache: Inputs,
    pub(crate) update_cache: Inputs,
    pub(crate) emitter: Box<E>,
    pub(crate) updater: Option<Box<U>>,
}

impl<E: Expects + ?Sized, U: Expects + ?Sized> Base<E, U> {
    pub(crate) fn new(construct: Symbol, mut emitter: Box<E>, initial: Output, kind: &str) -> Self {
        tracing::debug!(
            target: "realizers",
            construct = %construct,
            kind = kind,
            "initializing"
        );
        emitter.entrust(&construct);

        Self {
            construct,
            inputs: Links::new(),
            output: Rc::new(RefCell::new(Rc::new(initial))),
            input_cache: Inputs::new(),
            update_cache: Inputs::new(),
            emitter,
            updater: None,
        }
    }

    pub(crate) fn set_emitter(&mut self, mut emitter: Box<E>) {
        emitter.entrust(&self.construct);
        self.emitter = emitter;
    }

    pub(crate) fn set_updater(&mut self, updater: Option<Box<U>>) {
        self.updater = updater.map(|mut updater| {
            updater.entrust(&self.construct);
            updater
        });
    }

    pub(crate) fn accepts(&self, source: &Symbol) -> bool {
        self.emitter.expects(source)
            || self
                .updater
                .as_ref()
                .is_some_and(|updater| updater.expects(source))
    }

    /// Store `pull` if accepted. Overwrites any earlier link for the same source.
    pub(crate) fn offer(&mut self, pull: &Pull) -> bool {
        if !self.accepts(pull.source()) {
            return false;
        }
        tracing::debug!(
            target: "realizers",
            source = %pull.source(),
            target_construct = %self.construct,
            "connecting"
        );
        self.inputs.insert(pull.source().clone(), pull.clone());
        true
    }

    pub(crate) fn view(&self) -> Rc<Output> {
        self.output.borrow().clone()
    }

    pub(crate) fn set_output(&self, output: Output) {
        *self.output.borrow_mut() = Rc::new(output);
    }

    pub(crate) fn pull(&self) -> Pull {
        Pull::new(self.construct.clone(), &self.output)
    }

    /// Snapshot the linked sources selected by `filter`.
    fn collect(&self, filter: impl Fn(&Symbol) -> bool) -> Result<Inputs> {
        self.inputs
            .iter()
            .filter(|(source, _)| filter(source))
            .map(|(source, pull)| {
                let data = pull.pull().ok_or_else(|| Error::DanglingLink {
                    construct: self.construct.clone(),
                    link: source.clone(),
                })?;
                Ok((source.clone(), data))
            })
            .collect()
    }

    pub(crate) fn pull_input_data(&mut self) -> Result<()> {
        self.input_cache = self.collect(|source| self.emitter.expects(source))?;
        Ok(())
    }

    /// Leaves the update cache untouched when there is no updater.
    pub(crate) fn pull_update_data(&mut self) -> Result<()> {
        if let Some(updater) = &self.updater {
            self.update_cache = self.collect(|source| updater.expects(source))?;
        }
        Ok(())
    }

    pub(crate) fn missing_links(&self) -> Vec<Symbol> {
        let updater_expected = self
            .updater
            .as_ref()
            .map(|updater| updater.expected())
            .unwrap_or_default();

        let mut missing: Vec<Symbol> = self
            .emitter
            .expected()
            .iter()
            .chain(updater_expected)
            .filter(|source| !self.inputs.contains_key(*source))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Fail with the enclosing path when an expectation has no link.
    pub(crate) fn check_links(&self, context: &[Symbol]) -> Result<()> {
        let complete = self.emitter.check_links(&self.inputs)
            && self
                .updater
                .as_ref()
                .map_or(true, |updater| updater.check_links(&self.inputs));
        if complete {
            return Ok(());
        }

        Err(Error::MissingLinks {
            construct: self.construct.clone(),
            context: context.to_vec(),
            missing: self.missing_links(),
        })
    }
}
