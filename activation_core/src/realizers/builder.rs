//! Scoped construction of realizer trees.
//!
//! A [`Builder`] keeps a stack of open build contexts. Realizers handed to
//! [`Builder::add`] are collected by the innermost context and attached to
//! its structure when that context closes; closing the outermost context
//! validates the links of the whole tree.
//!
//! ```ignore
//! let mut builder = Builder::new();
//! let agent = builder.build(Structure::new(agent_sym, BasicCycle::agent()), |b| {
//!     b.add(Construct::new(stim_sym, Constant::new(stimulus)))?;
//!     b.nest(Structure::new(nacs_sym, BasicCycle::subsystem()), |b| {
//!         b.add(Construct::new(pool_sym, Repeater::new(stim_sym)))
//!     })
//! })?;
//! ```

use serde::Serialize;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

use activation_types::Symbol;

use super::{Realizer, Structure};
use crate::error::{display_path, Error, Result};

/// Identifier of one outermost assembly. Correlates log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssemblyId(Uuid);

impl AssemblyId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One open build context.
#[derive(Debug)]
struct Frame {
    path: Vec<Symbol>,
    pending: Vec<Realizer>,
}

/// Explicit build-context stack.
#[derive(Debug, Default)]
pub struct Builder {
    frames: Vec<Frame>,
    assembly: Option<AssemblyId>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the innermost open context; empty at top level.
    pub fn context(&self) -> &[Symbol] {
        self.frames
            .last()
            .map(|frame| frame.path.as_slice())
            .unwrap_or_default()
    }

    /// Number of open contexts.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Identifier of the outermost assembly in progress, if any.
    pub fn assembly_id(&self) -> Option<AssemblyId> {
        self.assembly
    }

    /// Collect a realizer into the innermost open context.
    pub fn add(&mut self, realizer: impl Into<Realizer>) -> Result<()> {
        let realizer = realizer.into();
        let Some(frame) = self.frames.last_mut() else {
            return Err(Error::NoBuildContext {
                construct: realizer.construct().clone(),
            });
        };

        tracing::debug!(
            target: "realizers",
            construct = %realizer.construct(),
            context = %display_path(&frame.path),
            "collecting"
        );
        frame.pending.push(realizer);
        Ok(())
    }

    /// Open a context for `structure`.
    ///
    /// The returned guard closes the context when dropped. Use
    /// [`Scope::exit`] to close it normally and take the collected realizers.
    pub fn enter(&mut self, structure: &Symbol) -> Scope<'_> {
        if self.frames.is_empty() {
            self.assembly = Some(AssemblyId::new());
        }

        let mut path = self.context().to_vec();
        path.push(structure.clone());
        tracing::debug!(
            target: "realizers",
            context = %display_path(&path),
            assembly = ?self.assembly.map(|id| id.to_string()),
            "entering context"
        );
        self.frames.push(Frame {
            path,
            pending: Vec::new(),
        });

        Scope {
            builder: self,
            open: true,
        }
    }

    /// Populate `structure` with everything `body` collects.
    ///
    /// On success the collected realizers are added to `structure`, and if
    /// this was the outermost context, the whole tree is validated. If
    /// `body` fails nothing is attached; the context is closed either way.
    pub fn build<F>(&mut self, structure: Structure, body: F) -> Result<Structure>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        let mut structure = structure;
        let mut scope = self.enter(structure.construct());
        let assembly = scope.assembly_id();
        body(&mut *scope)?;
        let pending = scope.exit();

        structure.add_all(pending);
        if self.frames.is_empty() {
            tracing::debug!(
                target: "realizers",
                structure = %structure.construct(),
                assembly = ?assembly.map(|id| id.to_string()),
                "assembling"
            );
            structure.finalize_assembly()?;
        }
        Ok(structure)
    }

    /// [`Builder::build`] a nested structure and collect it into the current context.
    pub fn nest<F>(&mut self, structure: Structure, body: F) -> Result<()>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        if self.frames.is_empty() {
            return Err(Error::NoBuildContext {
                construct: structure.construct().clone(),
            });
        }
        let structure = self.build(structure, body)?;
        self.add(structure)
    }

    fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop();
        if self.frames.is_empty() {
            self.assembly = None;
        }
        frame
    }
}

/// Guard over an open build context.
pub struct Scope<'a> {
    builder: &'a mut Builder,
    open: bool,
}

impl Scope<'_> {
    /// Close the context and take the realizers it collected.
    pub fn exit(mut self) -> Vec<Realizer> {
        self.open = false;
        let frame = self.builder.pop();
        let pending = frame.map(|frame| frame.pending).unwrap_or_default();
        tracing::debug!(
            target: "realizers",
            context = %display_path(self.builder.context()),
            collected = pending.len(),
            "exiting context"
        );
        pending
    }
}

impl Deref for Scope<'_> {
    type Target = Builder;

    fn deref(&self) -> &Builder {
        self.builder
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Builder {
        self.builder
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Some(frame) = self.builder.pop() {
            tracing::warn!(
                target: "realizers",
                context = %display_path(&frame.path),
                discarded = frame.pending.len(),
                "abandoning context"
            );
        }
    }
}
