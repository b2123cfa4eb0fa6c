//! Basic propagators and cycles.

use activation_types::{ConstructType, NumDict, Symbol};

use super::{flat_input, Cycle, Expects, Inputs, Propagator};
use crate::error::Result;

/// Emits a fixed activation pattern, regardless of inputs.
///
/// The pattern is also the default output, so a constant source reads the
/// same before and after its first step.
#[derive(Debug, Clone)]
pub struct Constant {
    value: NumDict,
}

impl Constant {
    pub fn new(value: NumDict) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &NumDict {
        &self.value
    }

    /// Replace the pattern emitted from the next step on.
    pub fn set(&mut self, value: NumDict) {
        self.value = value;
    }
}

impl Expects for Constant {
    fn expected(&self) -> &[Symbol] {
        &[]
    }
}

impl Propagator for Constant {
    fn emit(&self, data: Option<NumDict>) -> NumDict {
        data.unwrap_or_else(|| self.value.clone())
    }

    fn call(&mut self, _inputs: &Inputs) -> Result<NumDict> {
        Ok(self.value.clone())
    }
}

/// Forwards the output of a single source unchanged.
#[derive(Debug, Clone)]
pub struct Repeater {
    expected: Vec<Symbol>,
}

impl Repeater {
    pub fn new(source: Symbol) -> Self {
        Self {
            expected: vec![source],
        }
    }

    pub fn source(&self) -> &Symbol {
        &self.expected[0]
    }
}

impl Expects for Repeater {
    fn expected(&self) -> &[Symbol] {
        &self.expected
    }
}

impl Propagator for Repeater {
    fn emit(&self, data: Option<NumDict>) -> NumDict {
        data.unwrap_or_else(|| NumDict::with_default(0.0))
    }

    fn call(&mut self, inputs: &Inputs) -> Result<NumDict> {
        flat_input(inputs, self.source()).cloned()
    }
}

/// Configurable member ordering and aggregation for a structure.
#[derive(Debug, Clone)]
pub struct BasicCycle {
    sequence: Vec<ConstructType>,
    output: ConstructType,
    expected: Vec<Symbol>,
}

impl BasicCycle {
    pub fn new(sequence: impl IntoIterator<Item = ConstructType>, output: ConstructType) -> Self {
        Self {
            sequence: sequence.into_iter().collect(),
            output,
            expected: Vec::new(),
        }
    }

    /// Agent-level ordering: updaters, then buffers, then subsystems.
    pub fn agent() -> Self {
        Self::new(
            [
                ConstructType::UPDATER,
                ConstructType::BUFFER,
                ConstructType::SUBSYSTEM,
            ],
            ConstructType::BUFFER | ConstructType::SUBSYSTEM,
        )
    }

    /// Subsystem-level ordering: node pools, flows, node pools again, terminals.
    pub fn subsystem() -> Self {
        Self::new(
            [
                ConstructType::NODES,
                ConstructType::FLOW_IN,
                ConstructType::FLOW_BT,
                ConstructType::FLOW_TB,
                ConstructType::FLOW_TT,
                ConstructType::FLOW_BB,
                ConstructType::NODES,
                ConstructType::TERMINUS,
            ],
            ConstructType::NODES | ConstructType::TERMINUS,
        )
    }

    /// Declare external sources the structure itself pulls from.
    pub fn with_expected(mut self, sources: impl IntoIterator<Item = Symbol>) -> Self {
        self.expected.extend(sources);
        self
    }
}

impl Expects for BasicCycle {
    fn expected(&self) -> &[Symbol] {
        &self.expected
    }
}

impl Cycle for BasicCycle {
    fn sequence(&self) -> &[ConstructType] {
        &self.sequence
    }

    fn output(&self) -> ConstructType {
        self.output
    }
}
