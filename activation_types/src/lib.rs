//! # Activation Types
//!
//! Identity and value types shared by every construct network: the
//! [`ConstructType`] bitmask, the [`Symbol`] identity tag, and the
//! [`NumDict`] numeric container that carries node activations.
//!
//! This crate holds data only. The realizer engine that wires these values
//! into a propagation graph lives in `activation_core`.

pub mod numdict;
pub mod symbols;

pub use numdict::*;
pub use symbols::*;
