//! Shared data attached to a structure.

use indexmap::IndexMap;
use std::any::Any;
use std::rc::Rc;

/// Named, type-erased values shared among the members of a structure.
///
/// Typical content is a rule database that both a flow and an updater
/// observe.
#[derive(Default, Clone)]
pub struct Assets {
    items: IndexMap<String, Rc<dyn Any>>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a shared value under `name`, returning true if it replaced one.
    pub fn insert<T: Any>(&mut self, name: impl Into<String>, value: Rc<T>) -> bool {
        self.items.insert(name.into(), value).is_some()
    }

    /// Builder-style [`Assets::insert`].
    pub fn with<T: Any>(mut self, name: impl Into<String>, value: Rc<T>) -> Self {
        self.insert(name, value);
        self
    }

    /// Fetch the value stored under `name` if it has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.items.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.items.shift_remove(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for Assets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
