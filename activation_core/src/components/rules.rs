//! Rules and rule databases.
//!
//! A rule links weighted condition chunks to a conclusion chunk. Rule
//! databases accept deferred additions and deletions ("promises") that are
//! applied together at the next step boundary, so a database can be edited
//! while a network is mid-cycle without changing what propagators see.

use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::Rc;

use activation_types::{NumDict, Symbol};

use super::{ConstructUpdate, ConstructUpdater, Expects, StructureUpdate, StructureUpdater};
use crate::config::RuleDbConfig;
use crate::error::{Error, Result};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// A rule form: conclusion plus condition weights.
#[derive(Debug, Clone)]
pub struct Rule {
    conc: Symbol,
    weights: NumDict,
}

impl Rule {
    /// Create a new rule.
    ///
    /// Conditions without an explicit weight get a weight of 1.0. If the
    /// weights then sum to more than 1.0, each weight `w` becomes
    /// `w / sum`.
    pub fn new(
        conc: Symbol,
        conds: impl IntoIterator<Item = Symbol>,
        weights: Option<NumDict>,
    ) -> Result<Self> {
        let conds: Vec<Symbol> = conds.into_iter().collect();
        let mut ws = weights.unwrap_or_default();

        if let Some(extra) = ws.keys().find(|key| !conds.contains(key)) {
            return Err(Error::InvalidRule(format!(
                "weight given for {extra}, which is not a condition"
            )));
        }
        if let Some((cond, w)) = ws.iter().find(|(_, w)| !(*w > 0.0)) {
            return Err(Error::InvalidRule(format!(
                "weight for {cond} must be strictly positive, got {w}"
            )));
        }

        ws.set_default(None);
        ws.extend(&conds, 1.0);

        let total = ws.sum();
        if total > 1.0 {
            ws /= total;
        }

        Ok(Self { conc, weights: ws })
    }

    /// Conclusion of the rule.
    pub fn conc(&self) -> &Symbol {
        &self.conc
    }

    /// Conditions and their weights.
    pub fn weights(&self) -> &NumDict {
        &self.weights
    }

    /// Number of conditions.
    pub fn condition_count(&self) -> usize {
        self.weights.len()
    }

    /// Rule strength: the weighted sum of condition strengths.
    pub fn strength(&self, strengths: &NumDict) -> f64 {
        self.weights
            .iter()
            .map(|(cond, weight)| weight * strengths.value(cond))
            .sum()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.conc == other.conc && self.weights.is_close(&other.weights, WEIGHT_TOLERANCE)
    }
}

/// Rule database shared between the propagators that read it and the
/// updater that applies its promises.
pub type SharedRules = Rc<RefCell<Rules>>;

/// A simple rule database with deferred updates.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    data: IndexMap<Symbol, Rule>,
    max_conds: Option<usize>,
    add_promises: IndexMap<Symbol, Rule>,
    del_promises: IndexSet<Symbol>,
}

impl Rules {
    /// Create a new empty database with no condition limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database that rejects rules with more than `max_conds` conditions.
    pub fn with_max_conds(max_conds: usize) -> Self {
        Self {
            max_conds: Some(max_conds),
            ..Self::default()
        }
    }

    /// Create a database from configuration.
    pub fn from_config(config: &RuleDbConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_conds: config.max_conds,
            ..Self::default()
        })
    }

    /// Wrap the database for sharing between components.
    pub fn shared(self) -> SharedRules {
        Rc::new(RefCell::new(self))
    }

    pub fn max_conds(&self) -> Option<usize> {
        self.max_conds
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, r: &Symbol) -> Option<&Rule> {
        self.data.get(r)
    }

    pub fn contains(&self, r: &Symbol) -> bool {
        self.data.contains_key(r)
    }

    /// Iterate over rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Rule)> {
        self.data.iter()
    }

    /// Insert or overwrite a rule immediately.
    pub fn insert(&mut self, r: Symbol, rule: Rule) -> Result<Option<Rule>> {
        self.validate(&rule)?;
        Ok(self.data.insert(r, rule))
    }

    /// Remove a rule immediately.
    pub fn remove(&mut self, r: &Symbol) -> Option<Rule> {
        self.data.shift_remove(r)
    }

    /// Build and insert a new rule; returns the rule symbol.
    pub fn define(
        &mut self,
        r: Symbol,
        conc: Symbol,
        conds: impl IntoIterator<Item = Symbol>,
        weights: Option<NumDict>,
    ) -> Result<Symbol> {
        let rule = Rule::new(conc, conds, weights)?;
        self.insert(r.clone(), rule)?;
        Ok(r)
    }

    /// Check whether any stored rule has the given form.
    pub fn contains_form(&self, form: &Rule) -> bool {
        self.data.values().any(|rule| rule == form)
    }

    /// Promise to add (or overwrite) rule `r` at the next step.
    ///
    /// The form is validated when the promise is applied, not here.
    pub fn request_add(&mut self, r: Symbol, form: Rule) -> Result<()> {
        if self.has_promise(&r) {
            return Err(Error::PromiseConflict(r));
        }
        self.add_promises.insert(r, form);
        Ok(())
    }

    /// Promise to delete the existing rule `r` at the next step.
    pub fn request_del(&mut self, r: Symbol) -> Result<()> {
        if self.has_promise(&r) {
            return Err(Error::PromiseConflict(r));
        }
        if !self.data.contains_key(&r) {
            return Err(Error::UnknownRule(r));
        }
        self.del_promises.insert(r);
        Ok(())
    }

    /// Pending additions.
    pub fn add_promises(&self) -> &IndexMap<Symbol, Rule> {
        &self.add_promises
    }

    /// Pending deletions.
    pub fn del_promises(&self) -> &IndexSet<Symbol> {
        &self.del_promises
    }

    /// Apply all promised updates.
    ///
    /// Every promised addition is validated first; if any fails, neither the
    /// rules nor the pending promises change.
    pub fn step(&mut self) -> Result<()> {
        for rule in self.add_promises.values() {
            self.validate(rule)?;
        }

        for r in std::mem::take(&mut self.del_promises) {
            self.data.shift_remove(&r);
        }
        for (r, rule) in std::mem::take(&mut self.add_promises) {
            self.data.insert(r, rule);
        }
        Ok(())
    }

    fn has_promise(&self, r: &Symbol) -> bool {
        self.add_promises.contains_key(r) || self.del_promises.contains(r)
    }

    fn validate(&self, rule: &Rule) -> Result<()> {
        match self.max_conds {
            Some(max) if rule.condition_count() > max => Err(Error::TooManyConditions {
                found: rule.condition_count(),
                max,
            }),
            _ => Ok(()),
        }
    }
}

/// Applies pending promises of a rule database during the update phase.
#[derive(Debug, Clone)]
pub struct RuleDbUpdater {
    rules: SharedRules,
}

impl RuleDbUpdater {
    pub fn new(rules: SharedRules) -> Self {
        Self { rules }
    }
}

impl Expects for RuleDbUpdater {
    fn expected(&self) -> &[Symbol] {
        &[]
    }
}

impl ConstructUpdater for RuleDbUpdater {
    fn update(&mut self, _args: ConstructUpdate<'_>) -> Result<()> {
        self.rules.borrow_mut().step()
    }
}

impl StructureUpdater for RuleDbUpdater {
    fn update(&mut self, _args: StructureUpdate<'_>) -> Result<()> {
        self.rules.borrow_mut().step()
    }
}
