//! Minimal host object model.
//!
//! Instances expose an optional [`AttributeStore`]; types are described by a
//! [`ClassDef`] namespace that runs the [`SetName`] hook of every descriptor
//! it installs.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use thiserror::Error;

use crate::error::Result;

/// Type-erased attribute value.
pub type AttrValue = Rc<dyn Any>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("attribute store is read-only")]
    ReadOnly,
    #[error("{0}")]
    Rejected(String),
}

/// Mutable per-instance key/value storage.
pub trait AttributeStore {
    fn get_attribute(&self, name: &str) -> Option<AttrValue>;

    fn set_attribute(&self, name: &str, value: AttrValue) -> Result<(), StoreError>;
}

/// An object that may carry per-instance attribute storage.
pub trait HasAttributes: 'static {
    /// `None` for fixed-layout objects without dynamic storage.
    fn attribute_store(&self) -> Option<&dyn AttributeStore>;

    fn type_name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// The default [`AttributeStore`]: a hash map behind a `RefCell`.
#[derive(Default)]
pub struct InstanceDict {
    entries: RefCell<AHashMap<String, AttrValue>>,
    read_only: bool,
}

impl InstanceDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that can be read but rejects every write.
    pub fn read_only() -> Self {
        Self {
            entries: RefCell::default(),
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Removes an attribute, returning it. Removing a cached method's entry
    /// discards its cache; the next access starts a fresh one.
    pub fn remove(&self, name: &str) -> Option<AttrValue> {
        self.entries.borrow_mut().remove(name)
    }

    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        drop(entries);
    }
}

impl AttributeStore for InstanceDict {
    fn get_attribute(&self, name: &str) -> Option<AttrValue> {
        self.entries.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: AttrValue) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let previous = self.entries.borrow_mut().insert(name.to_owned(), value);
        drop(previous);
        Ok(())
    }
}

impl fmt::Debug for InstanceDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut names: Vec<_> = entries.keys().collect();
        names.sort();
        f.debug_struct("InstanceDict")
            .field("attributes", &names)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Hook run when a descriptor is installed on a type under `name`.
pub trait SetName {
    fn set_name(&self, owner: &str, name: &str) -> Result<()>;
}

/// Namespace of a type definition.
pub struct ClassDef {
    name: String,
    namespace: AHashMap<String, AttrValue>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: AHashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs `descriptor` under `attribute`, running its [`SetName`] hook.
    /// A failing hook aborts the definition.
    pub fn define<D>(mut self, attribute: &str, descriptor: Rc<D>) -> Result<Self>
    where
        D: SetName + 'static,
    {
        descriptor.set_name(&self.name, attribute)?;
        self.namespace.insert(attribute.to_owned(), descriptor);
        Ok(self)
    }

    /// Looks up a class attribute, returning it only if it has type `D`.
    pub fn attribute<D: 'static>(&self, name: &str) -> Option<Rc<D>> {
        let value = Rc::clone(self.namespace.get(name)?);
        value.downcast::<D>().ok()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.namespace.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.namespace.keys().map(String::as_str)
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.attribute_names().collect();
        names.sort_unstable();
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("attributes", &names)
            .finish()
    }
}
