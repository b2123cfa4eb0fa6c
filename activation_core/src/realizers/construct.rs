//! Construct - the leaf realizer.

use std::rc::Rc;

use activation_types::{NumDict, Symbol};

use super::base::Base;
use super::{Links, Output, Pull};
use crate::components::{ConstructUpdate, ConstructUpdater, Propagator};
use crate::error::Result;

/// A basic construct: a node, a flow, a buffer, a terminus, ...
///
/// Output is computed by the attached [`Propagator`] from the outputs of the
/// linked sources it expects.
pub struct Construct {
    base: Base<dyn Propagator, dyn ConstructUpdater>,
}

impl Construct {
    pub fn new(construct: Symbol, propagator: impl Propagator + 'static) -> Self {
        let initial = Output::Flat(propagator.emit(None));
        let emitter: Box<dyn Propagator> = Box::new(propagator);
        Self {
            base: Base::new(construct, emitter, initial, "construct"),
        }
    }

    pub fn with_updater(mut self, updater: impl ConstructUpdater + 'static) -> Self {
        self.set_updater(Some(Box::new(updater)));
        self
    }

    /// Replace the propagator. The current output is kept until the next step.
    pub fn set_emitter(&mut self, propagator: impl Propagator + 'static) {
        self.base.set_emitter(Box::new(propagator));
    }

    pub fn set_updater(&mut self, updater: Option<Box<dyn ConstructUpdater>>) {
        self.base.set_updater(updater);
    }

    pub fn construct(&self) -> &Symbol {
        &self.base.construct
    }

    pub fn propagator(&self) -> &dyn Propagator {
        &*self.base.emitter
    }

    pub fn updater(&self) -> Option<&dyn ConstructUpdater> {
        self.base.updater.as_deref()
    }

    pub fn inputs(&self) -> &Links {
        &self.base.inputs
    }

    pub fn view(&self) -> Rc<Output> {
        self.base.view()
    }

    /// Current output as a flat activation pattern.
    pub fn output(&self) -> NumDict {
        match self.view().as_ref() {
            Output::Flat(d) => d.clone(),
            Output::Nested(_) => NumDict::new(),
        }
    }

    /// Revert to the propagator's default output.
    pub fn clear_output(&mut self) {
        self.base.set_output(Output::Flat(self.base.emitter.emit(None)));
    }

    pub fn pull(&self) -> Pull {
        self.base.pull()
    }

    pub fn accepts(&self, source: &Symbol) -> bool {
        self.base.accepts(source)
    }

    pub fn offer(&mut self, pull: &Pull) {
        self.base.offer(pull);
    }

    /// Advance by one time step: propagate, then update.
    pub fn step(&mut self) -> Result<()> {
        self.propagate()?;
        self.update()
    }

    pub fn finalize_assembly(&mut self) -> Result<()> {
        self.finalize_in(&[])
    }

    pub(crate) fn propagate(&mut self) -> Result<()> {
        self.base.pull_input_data()?;
        let output = self.base.emitter.call(&self.base.input_cache)?;
        self.base.set_output(Output::Flat(output));
        Ok(())
    }

    pub(crate) fn update(&mut self) -> Result<()> {
        let output = self.output();
        self.base.emitter.update(&self.base.input_cache, &output)?;
        self.base.pull_update_data()?;

        let base = &mut self.base;
        if let Some(updater) = base.updater.as_mut() {
            updater.update(ConstructUpdate {
                propagator: &*base.emitter,
                inputs: &base.input_cache,
                output: &output,
                update_data: &base.update_cache,
            })?;
        }
        Ok(())
    }

    pub(crate) fn finalize_in(&mut self, context: &[Symbol]) -> Result<()> {
        self.base.check_links(context)
    }
}

impl std::fmt::Debug for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Construct")
            .field("construct", &self.base.construct)
            .field("inputs", &self.base.inputs.keys().collect::<Vec<_>>())
            .field("output", &self.view())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Constant, Expects, Repeater};
    use crate::error::Error;
    use std::cell::RefCell;

    fn stimulus() -> NumDict {
        NumDict::from_pairs([(Symbol::chunk("a"), 1.0), (Symbol::chunk("b"), 0.5)], None)
    }

    /// Records every update call it receives.
    struct Recorder {
        expected: Vec<Symbol>,
        seen: Rc<RefCell<Vec<(usize, usize, NumDict)>>>,
    }

    impl Expects for Recorder {
        fn expected(&self) -> &[Symbol] {
            &self.expected
        }
    }

    impl ConstructUpdater for Recorder {
        fn update(&mut self, args: ConstructUpdate<'_>) -> Result<()> {
            self.seen.borrow_mut().push((
                args.inputs.len(),
                args.update_data.len(),
                args.output.clone(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_default_output_before_step() {
        let repeater = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("in")));
        assert_eq!(repeater.output(), NumDict::with_default(0.0));
    }

    #[test]
    fn test_step_pulls_linked_source() {
        let source = Construct::new(Symbol::buffer("stim"), Constant::new(stimulus()));
        let mut target = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("stim")));

        assert!(target.accepts(source.construct()));
        target.offer(&source.pull());
        target.finalize_assembly().unwrap();
        target.step().unwrap();

        assert_eq!(target.output(), stimulus());
    }

    #[test]
    fn test_offer_ignores_unexpected_source() {
        let other = Construct::new(Symbol::buffer("other"), Constant::new(stimulus()));
        let mut target = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("stim")));

        target.offer(&other.pull());
        assert!(target.inputs().is_empty());
    }

    #[test]
    fn test_missing_link_fails_finalize() {
        let mut target = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("stim")));

        match target.finalize_assembly() {
            Err(Error::MissingLinks { missing, context, .. }) => {
                assert_eq!(missing, vec![Symbol::buffer("stim")]);
                assert!(context.is_empty());
            }
            other => panic!("expected missing links, got {other:?}"),
        }
    }

    #[test]
    fn test_updater_expectations_are_checked() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut node = Construct::new(Symbol::chunks("pool"), Constant::new(stimulus())).with_updater(
            Recorder {
                expected: vec![Symbol::buffer("feedback")],
                seen: seen.clone(),
            },
        );
        assert!(node.accepts(&Symbol::buffer("feedback")));
        assert!(node.finalize_assembly().is_err());

        let feedback = Construct::new(Symbol::buffer("feedback"), Constant::new(NumDict::new()));
        node.offer(&feedback.pull());
        node.finalize_assembly().unwrap();
        node.step().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        // Constant pulls nothing; the updater pulls only its own source.
        assert_eq!(seen[0].0, 0);
        assert_eq!(seen[0].1, 1);
        assert_eq!(seen[0].2, stimulus());
    }

    #[test]
    fn test_dangling_link_after_source_dropped() {
        let source = Construct::new(Symbol::buffer("stim"), Constant::new(stimulus()));
        let mut target = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("stim")));
        target.offer(&source.pull());
        drop(source);

        assert!(matches!(
            target.step(),
            Err(Error::DanglingLink { link, .. }) if link == Symbol::buffer("stim")
        ));
    }

    #[test]
    fn test_clear_output_restores_default() {
        let source = Construct::new(Symbol::buffer("stim"), Constant::new(stimulus()));
        let mut target = Construct::new(Symbol::chunks("out"), Repeater::new(Symbol::buffer("stim")));
        target.offer(&source.pull());
        target.step().unwrap();
        assert_eq!(target.output(), stimulus());

        target.clear_output();
        assert_eq!(target.output(), NumDict::with_default(0.0));
    }

    #[test]
    fn test_set_emitter_swaps_behavior() {
        let mut node = Construct::new(Symbol::buffer("stim"), Constant::new(NumDict::new()));
        node.set_emitter(Constant::new(stimulus()));
        node.step().unwrap();
        assert_eq!(node.output(), stimulus());
        assert!(node.propagator().expected().is_empty());
        assert!(node.updater().is_none());
    }
}
