//! Rule-driven flows between chunk pools.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use activation_types::{NumDict, Symbol};

use super::{flat_input, Expects, Inputs, Propagator, SharedRules};
use crate::config::SelectionConfig;
use crate::error::{Error, Result};

/// Propagates chunk strengths through associative rules.
///
/// A conclusion's strength is the weighted sum of its rule's condition
/// strengths; when several rules share a conclusion the maximum wins. Each
/// rule symbol also carries its own strength in the output.
#[derive(Debug, Clone)]
pub struct AssociativeRules {
    expected: Vec<Symbol>,
    rules: SharedRules,
}

impl AssociativeRules {
    pub fn new(source: Symbol, rules: SharedRules) -> Self {
        Self {
            expected: vec![source],
            rules,
        }
    }

    pub fn rules(&self) -> &SharedRules {
        &self.rules
    }
}

impl Expects for AssociativeRules {
    fn expected(&self) -> &[Symbol] {
        &self.expected
    }
}

impl Propagator for AssociativeRules {
    fn emit(&self, data: Option<NumDict>) -> NumDict {
        data.unwrap_or_else(|| NumDict::with_default(0.0))
    }

    fn call(&mut self, inputs: &Inputs) -> Result<NumDict> {
        let strengths = flat_input(inputs, &self.expected[0])?;

        let mut d = NumDict::with_default(0.0);
        for (r, form) in self.rules.borrow().iter() {
            let s_r = form.strength(strengths);
            let best = d.value(form.conc()).max(s_r);
            d.set(form.conc().clone(), best);
            d.set(r.clone(), s_r);
        }
        d.squeeze();

        Ok(d)
    }
}

/// Propagates strength from condition chunks to action chunks.
///
/// Action rules compete through Boltzmann selection over their strengths.
/// Only the selected rule's strength is propagated, to the rule itself and to
/// its conclusion.
#[derive(Debug, Clone)]
pub struct ActionRules {
    expected: Vec<Symbol>,
    rules: SharedRules,
    temperature: f64,
    rng: ChaCha8Rng,
}

impl ActionRules {
    /// Create an action-rule flow.
    ///
    /// The database must be limited to single-condition rules.
    pub fn new(source: Symbol, rules: SharedRules, selection: &SelectionConfig) -> Result<Self> {
        match rules.borrow().max_conds() {
            Some(max) if max <= 1 => {}
            _ => {
                return Err(Error::InvalidRule(
                    "action rule database must not accept multiple condition rules".to_string(),
                ))
            }
        }
        selection.validate()?;

        let rng = match selection.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            expected: vec![source],
            rules,
            temperature: selection.temperature,
            rng,
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn rules(&self) -> &SharedRules {
        &self.rules
    }
}

impl Expects for ActionRules {
    fn expected(&self) -> &[Symbol] {
        &self.expected
    }
}

impl Propagator for ActionRules {
    fn emit(&self, data: Option<NumDict>) -> NumDict {
        data.unwrap_or_else(|| NumDict::with_default(0.0))
    }

    fn call(&mut self, inputs: &Inputs) -> Result<NumDict> {
        let strengths = flat_input(inputs, &self.expected[0])?;
        let rules = self.rules.borrow();

        let mut d = NumDict::with_default(0.0);
        for (r, form) in rules.iter() {
            d.set(r.clone(), form.strength(strengths));
        }

        let selection = d.boltzmann(self.temperature).draw(&mut self.rng);
        let mut chosen = &d * &selection;
        chosen.squeeze();

        let conclusions = chosen.transform_keys(|r| {
            rules
                .get(r)
                .map(|form| form.conc().clone())
                .unwrap_or_else(|| r.clone())
        });

        Ok(chosen.max_with(&conclusions))
    }
}
