//! # Activation Core
//!
//! The construct-realization engine. This crate turns a declarative tree of
//! named constructs into a live, steppable propagation network, using the
//! symbols and activation containers from `activation_types`.
//!
//! ## Core Components
//!
//! - **realizers**: `Construct` (leaf) and `Structure` (container) realizers,
//!   pull links between them, and the `Builder` for scoped construction
//! - **components**: Capability traits plugged into realizers, plus basic
//!   propagators and the rule-database flows
//! - **config**: Selection and rule database settings, loadable from TOML
//! - **error**: The crate error type
//!
//! ## Step Semantics
//!
//! - **Pull-Based**: A realizer reads the current outputs of the sources it
//!   expects; nothing is pushed
//! - **Two-Phase**: `step()` propagates the whole tree, then updates it
//! - **Bottom-Up Updates**: Child structures update before child constructs,
//!   and both before the parent's own updater

pub mod components;
pub mod config;
pub mod error;
pub mod realizers;

pub use activation_types::{ConstructType, NumDict, Symbol};
pub use components::*;
pub use config::*;
pub use error::{Error, Result};
pub use realizers::*;
