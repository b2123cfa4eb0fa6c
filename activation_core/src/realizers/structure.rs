//! Structure - the container realizer.

use indexmap::IndexMap;
use std::rc::Rc;

use activation_types::{ConstructType, Symbol};

use super::base::Base;
use super::{Aggregate, Assets, Links, Output, Pull, Realizer};
use crate::components::{Cycle, StructureUpdate, StructureUpdater};
use crate::error::Result;

/// Members bucketed by construct type, then keyed by symbol.
type Registry = IndexMap<ConstructType, IndexMap<Symbol, Realizer>>;

/// A composite construct such as an agent or a subsystem.
///
/// Members are wired to each other as they are added: every member is
/// offered every other member's output, and keeps the links it accepts.
/// Links offered to the structure from outside are stored on the structure
/// when its own capabilities want them, and forwarded to all current and
/// future members.
///
/// The output of a structure is the aggregate of the outputs of members
/// whose type falls in its cycle's output mask.
pub struct Structure {
    base: Base<dyn Cycle, dyn StructureUpdater>,
    members: Registry,
    external: Links,
    assets: Assets,
}

impl Structure {
    pub fn new(construct: Symbol, cycle: impl Cycle + 'static) -> Self {
        let initial = Output::Nested(cycle.emit(None));
        let emitter: Box<dyn Cycle> = Box::new(cycle);
        Self {
            base: Base::new(construct, emitter, initial, "structure"),
            members: Registry::new(),
            external: Links::new(),
            assets: Assets::new(),
        }
    }

    pub fn with_updater(mut self, updater: impl StructureUpdater + 'static) -> Self {
        self.set_updater(Some(Box::new(updater)));
        self
    }

    pub fn with_assets(mut self, assets: Assets) -> Self {
        self.assets = assets;
        self
    }

    pub fn set_emitter(&mut self, cycle: impl Cycle + 'static) {
        self.base.set_emitter(Box::new(cycle));
    }

    pub fn set_updater(&mut self, updater: Option<Box<dyn StructureUpdater>>) {
        self.base.set_updater(updater);
    }

    pub fn construct(&self) -> &Symbol {
        &self.base.construct
    }

    pub fn cycle(&self) -> &dyn Cycle {
        &*self.base.emitter
    }

    pub fn updater(&self) -> Option<&dyn StructureUpdater> {
        self.base.updater.as_deref()
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    pub fn inputs(&self) -> &Links {
        &self.base.inputs
    }

    pub fn view(&self) -> Rc<Output> {
        self.base.view()
    }

    /// Current output as an aggregate of member outputs.
    pub fn output(&self) -> Aggregate {
        self.view().as_nested().cloned().unwrap_or_default()
    }

    pub fn pull(&self) -> Pull {
        self.base.pull()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Realizer> {
        self.members.get(&symbol.ctype())?.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut Realizer> {
        self.members.get_mut(&symbol.ctype())?.get_mut(symbol)
    }

    /// Look up a descendant through nested structures. An empty path yields nothing.
    pub fn get_path(&self, path: &[Symbol]) -> Option<&Realizer> {
        let (head, rest) = path.split_first()?;
        let member = self.get(head)?;
        if rest.is_empty() {
            Some(member)
        } else {
            member.as_structure()?.get_path(rest)
        }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.get(symbol).is_some()
    }

    /// Member symbols, optionally limited to types intersecting `ctype`.
    pub fn keys(&self, ctype: Option<ConstructType>) -> impl Iterator<Item = &Symbol> + '_ {
        self.items(ctype).map(|(symbol, _)| symbol)
    }

    pub fn values(&self, ctype: Option<ConstructType>) -> impl Iterator<Item = &Realizer> + '_ {
        self.items(ctype).map(|(_, realizer)| realizer)
    }

    pub fn items(
        &self,
        ctype: Option<ConstructType>,
    ) -> impl Iterator<Item = (&Symbol, &Realizer)> + '_ {
        self.members
            .iter()
            .filter(move |(bucket, _)| ctype.map_or(true, |mask| bucket.intersects(mask)))
            .flat_map(|(_, members)| members.iter())
    }

    pub fn len(&self) -> usize {
        self.members.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take ownership of a realizer and wire its links.
    ///
    /// A member with the same symbol is replaced; links held elsewhere on the
    /// replaced member's output go dangling unless re-offered here.
    pub fn add(&mut self, realizer: impl Into<Realizer>) {
        let mut realizer = realizer.into();
        let symbol = realizer.construct().clone();
        tracing::debug!(
            target: "realizers",
            construct = %symbol,
            structure = %self.base.construct,
            "adding"
        );

        for pull in self.external.values() {
            if pull.source() != &symbol {
                realizer.offer(pull);
            }
        }
        self.update_links(&mut realizer);

        self.members
            .entry(symbol.ctype())
            .or_default()
            .insert(symbol, realizer);
    }

    /// [`Structure::add`] for each realizer, in order.
    pub fn add_all(&mut self, realizers: impl IntoIterator<Item = Realizer>) {
        for realizer in realizers {
            self.add(realizer);
        }
    }

    /// Link `target` and every other member, in both directions.
    fn update_links(&mut self, target: &mut Realizer) {
        let target_pull = target.pull();
        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if member.construct() == target.construct() {
                continue;
            }
            member.offer(&target_pull);
            target.offer(&member.pull());
        }
    }

    pub fn accepts(&self, source: &Symbol) -> bool {
        self.base.accepts(source)
    }

    /// Register `pull` on the structure if accepted, and forward it to every member.
    pub fn offer(&mut self, pull: &Pull) {
        self.base.offer(pull);
        self.external.insert(pull.source().clone(), pull.clone());
        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if member.construct() != pull.source() {
                member.offer(pull);
            }
        }
    }

    /// Advance by one time step: propagate, then update.
    pub fn step(&mut self) -> Result<()> {
        self.propagate()?;
        self.update()
    }

    /// Validate links across the whole tree rooted here.
    pub fn finalize_assembly(&mut self) -> Result<()> {
        tracing::debug!(
            target: "realizers",
            structure = %self.base.construct,
            members = self.len(),
            "finalizing assembly"
        );
        self.finalize_in(&[])?;
        tracing::debug!(
            target: "realizers",
            structure = %self.base.construct,
            "assembly complete"
        );
        Ok(())
    }

    /// Recompute the aggregate from current member outputs.
    pub fn reset_output(&mut self) {
        let mask = self.base.emitter.output();
        let data: Aggregate = self
            .members
            .iter()
            .filter(|(bucket, _)| bucket.intersects(mask))
            .flat_map(|(_, members)| members.iter())
            .map(|(symbol, member)| (symbol.clone(), member.view()))
            .collect();
        let aggregate = self.base.emitter.emit(Some(data));
        self.base.set_output(Output::Nested(aggregate));
    }

    /// Revert every descendant to its default output, then re-aggregate.
    pub fn clear_outputs(&mut self) {
        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            member.clear_output();
        }
        self.reset_output();
    }

    pub(crate) fn propagate(&mut self) -> Result<()> {
        self.base.pull_input_data()?;
        for &ctype in self.base.emitter.sequence() {
            for (_, members) in self
                .members
                .iter_mut()
                .filter(|(bucket, _)| bucket.intersects(ctype))
            {
                for member in members.values_mut() {
                    member.propagate()?;
                }
            }
        }
        self.reset_output();
        Ok(())
    }

    /// Child structures first, then child constructs, then the own updater.
    pub(crate) fn update(&mut self) -> Result<()> {
        self.base.pull_update_data()?;

        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if let Realizer::Structure(structure) = member {
                structure.update()?;
            }
        }
        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if let Realizer::Construct(construct) = member {
                construct.update()?;
            }
        }

        let output = self.output();
        let base = &mut self.base;
        if let Some(updater) = base.updater.as_mut() {
            updater.update(StructureUpdate {
                inputs: &base.input_cache,
                output: &output,
                update_data: &base.update_cache,
            })?;
        }
        Ok(())
    }

    pub(crate) fn finalize_in(&mut self, context: &[Symbol]) -> Result<()> {
        let mut path = context.to_vec();
        path.push(self.base.construct.clone());

        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if let Realizer::Structure(structure) = member {
                structure.finalize_in(&path)?;
            }
        }
        for member in self.members.values_mut().flat_map(IndexMap::values_mut) {
            if let Realizer::Construct(construct) = member {
                construct.finalize_in(&path)?;
            }
        }

        self.reset_output();
        self.base.check_links(context)
    }
}

impl std::fmt::Debug for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Structure")
            .field("construct", &self.base.construct)
            .field("inputs", &self.base.inputs.keys().collect::<Vec<_>>())
            .field("members", &self.keys(None).collect::<Vec<_>>())
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        BasicCycle, Constant, ConstructUpdate, ConstructUpdater, Expects, Repeater,
    };
    use crate::error::Error;
    use crate::realizers::Construct;
    use activation_types::NumDict;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Appends its label to a shared log whenever it runs.
    struct Recorder {
        label: &'static str,
        log: Log,
    }

    impl Expects for Recorder {
        fn expected(&self) -> &[Symbol] {
            &[]
        }
    }

    impl ConstructUpdater for Recorder {
        fn update(&mut self, _args: ConstructUpdate<'_>) -> Result<()> {
            self.log.borrow_mut().push(self.label.to_string());
            Ok(())
        }
    }

    impl StructureUpdater for Recorder {
        fn update(&mut self, _args: StructureUpdate<'_>) -> Result<()> {
            self.log.borrow_mut().push(self.label.to_string());
            Ok(())
        }
    }

    fn stimulus() -> NumDict {
        NumDict::from_pairs([(Symbol::chunk("x"), 1.0), (Symbol::chunk("y"), 0.25)], None)
    }

    fn constant(name: &str, value: NumDict) -> Construct {
        Construct::new(Symbol::buffer(name), Constant::new(value))
    }

    fn repeater(name: &str, source: &str) -> Construct {
        Construct::new(Symbol::chunks(name), Repeater::new(Symbol::buffer(source)))
    }

    fn flat(realizer: &Realizer) -> NumDict {
        realizer
            .view()
            .as_flat()
            .cloned()
            .expect("leaf output")
    }

    fn pool() -> Structure {
        Structure::new(
            Symbol::subsystem("pool"),
            BasicCycle::new(
                [ConstructType::BUFFER, ConstructType::CHUNKS],
                ConstructType::BUFFER | ConstructType::CHUNKS,
            ),
        )
    }

    #[test]
    fn test_constant_forwarded_by_repeater() {
        let mut root = pool();
        root.add(constant("a", stimulus()));
        root.add(repeater("b", "a"));
        root.finalize_assembly().unwrap();

        let b = Symbol::chunks("b");
        assert_eq!(flat(root.get(&b).unwrap()), NumDict::with_default(0.0));

        root.step().unwrap();
        assert_eq!(flat(root.get(&b).unwrap()), stimulus());
        assert_eq!(
            root.output().get(&b).and_then(|o| o.as_flat()),
            Some(&stimulus())
        );
    }

    #[test]
    fn test_links_complete_after_finalize() {
        let mut root = pool();
        root.add(repeater("b", "a"));
        root.add(repeater("c", "a"));
        root.add(constant("a", stimulus()));
        root.finalize_assembly().unwrap();

        for realizer in root.values(Some(ConstructType::CHUNKS)) {
            let construct = realizer.as_construct().unwrap();
            for source in construct.propagator().expected() {
                assert!(realizer.inputs().contains_key(source));
            }
        }
    }

    #[test]
    fn test_links_independent_of_insertion_order() {
        fn link_table(structure: &Structure) -> Vec<(Symbol, Vec<Symbol>)> {
            let mut table: Vec<(Symbol, Vec<Symbol>)> = structure
                .items(None)
                .map(|(s, r)| (s.clone(), r.inputs().keys().cloned().collect()))
                .collect();
            table.sort();
            table
        }

        let mut forward = pool();
        forward.add(constant("a", stimulus()));
        forward.add(repeater("b", "a"));

        let mut backward = pool();
        backward.add(repeater("b", "a"));
        backward.add(constant("a", stimulus()));

        assert_eq!(link_table(&forward), link_table(&backward));
        assert!(backward
            .get(&Symbol::chunks("b"))
            .unwrap()
            .inputs()
            .contains_key(&Symbol::buffer("a")));
    }

    #[test]
    fn test_missing_link_reports_context() {
        let mut nacs = Structure::new(Symbol::subsystem("nacs"), BasicCycle::subsystem());
        nacs.add(repeater("orphan", "nowhere"));
        let mut agent = Structure::new(Symbol::agent("agent"), BasicCycle::agent());
        agent.add(nacs);

        match agent.finalize_assembly() {
            Err(Error::MissingLinks {
                construct,
                context,
                missing,
            }) => {
                assert_eq!(construct, Symbol::chunks("orphan"));
                assert_eq!(context, vec![Symbol::agent("agent"), Symbol::subsystem("nacs")]);
                assert_eq!(missing, vec![Symbol::buffer("nowhere")]);
            }
            other => panic!("expected missing links, got {other:?}"),
        }
    }

    #[test]
    fn test_external_links_reach_later_members() {
        let mut agent = Structure::new(Symbol::agent("agent"), BasicCycle::agent());
        agent.add(constant("stim", stimulus()));
        agent.add(Structure::new(Symbol::subsystem("nacs"), BasicCycle::subsystem()));

        let nacs = agent
            .get_mut(&Symbol::subsystem("nacs"))
            .and_then(Realizer::as_structure_mut)
            .unwrap();
        nacs.add(repeater("echo", "stim"));
        agent.finalize_assembly().unwrap();
        agent.step().unwrap();

        let path = [Symbol::subsystem("nacs"), Symbol::chunks("echo")];
        assert_eq!(flat(agent.get_path(&path).unwrap()), stimulus());
        assert_eq!(
            agent.view().lookup(&path).and_then(Output::as_flat),
            Some(&stimulus())
        );
    }

    #[test]
    fn test_structure_forwards_sibling_links_to_members() {
        let mut nacs = Structure::new(Symbol::subsystem("nacs"), BasicCycle::subsystem());
        nacs.add(repeater("echo", "stim"));

        let mut agent = Structure::new(Symbol::agent("agent"), BasicCycle::agent());
        agent.add(nacs);
        agent.add(constant("stim", stimulus()));
        agent.finalize_assembly().unwrap();

        let nacs = agent
            .get(&Symbol::subsystem("nacs"))
            .and_then(Realizer::as_structure)
            .unwrap();
        // The subsystem itself does not want the buffer; its member does.
        assert!(nacs.inputs().is_empty());
        assert!(nacs
            .get(&Symbol::chunks("echo"))
            .unwrap()
            .inputs()
            .contains_key(&Symbol::buffer("stim")));
    }

    #[test]
    fn test_clear_outputs_restores_defaults() {
        let mut root = pool();
        root.add(constant("a", stimulus()));
        root.add(repeater("b", "a"));
        root.finalize_assembly().unwrap();
        root.step().unwrap();

        root.clear_outputs();
        root.reset_output();

        let a = root.get(&Symbol::buffer("a")).unwrap();
        let b = root.get(&Symbol::chunks("b")).unwrap();
        assert_eq!(flat(a), stimulus());
        assert_eq!(flat(b), NumDict::with_default(0.0));

        let mut expected = Aggregate::new();
        expected.insert(Symbol::buffer("a"), Rc::new(Output::Flat(stimulus())));
        expected.insert(
            Symbol::chunks("b"),
            Rc::new(Output::Flat(NumDict::with_default(0.0))),
        );
        assert_eq!(root.output(), expected);
    }

    #[test]
    fn test_step_is_idempotent() {
        let mut root = pool();
        root.add(constant("a", stimulus()));
        root.add(repeater("b", "a"));
        root.finalize_assembly().unwrap();

        root.step().unwrap();
        let first = root.output();
        root.step().unwrap();
        assert_eq!(root.output(), first);
    }

    #[test]
    fn test_child_structures_update_before_parent() {
        let log: Log = Rc::default();
        let recorder = |label| Recorder {
            label,
            log: log.clone(),
        };

        let mut child = Structure::new(Symbol::subsystem("child"), BasicCycle::subsystem())
            .with_updater(recorder("child"));
        child.add(
            Construct::new(Symbol::chunks("inner"), Constant::new(NumDict::new()))
                .with_updater(recorder("inner")),
        );

        let mut root = Structure::new(Symbol::agent("root"), BasicCycle::agent())
            .with_updater(recorder("root"));
        root.add(constant("sibling", NumDict::new()).with_updater(recorder("sibling")));
        root.add(child);
        root.finalize_assembly().unwrap();
        root.step().unwrap();

        assert_eq!(*log.borrow(), vec!["inner", "child", "sibling", "root"]);
    }

    #[test]
    fn test_replacement_last_write_wins() {
        let mut root = pool();
        root.add(constant("a", NumDict::new()));
        root.add(repeater("b", "a"));
        let stale = root.get(&Symbol::buffer("a")).unwrap().pull();

        root.add(constant("a", stimulus()));
        assert_eq!(root.len(), 2);
        assert!(!stale.is_live());

        root.finalize_assembly().unwrap();
        root.step().unwrap();
        assert_eq!(flat(root.get(&Symbol::chunks("b")).unwrap()), stimulus());
    }

    #[test]
    fn test_output_mask_filters_members() {
        let mut nacs = Structure::new(Symbol::subsystem("nacs"), BasicCycle::subsystem());
        nacs.add(Construct::new(Symbol::chunks("pool"), Constant::new(stimulus())));
        nacs.add(Construct::new(
            Symbol::flow_tt("assoc"),
            Repeater::new(Symbol::chunks("pool")),
        ));
        nacs.finalize_assembly().unwrap();

        let keys: Vec<_> = nacs.output().into_keys().collect();
        assert_eq!(keys, vec![Symbol::chunks("pool")]);
        assert_eq!(nacs.keys(Some(ConstructType::FLOW)).count(), 1);
        assert_eq!(nacs.keys(None).count(), 2);
        assert!(nacs.contains(&Symbol::flow_tt("assoc")));
        assert!(nacs.get_path(&[]).is_none());
    }
}
