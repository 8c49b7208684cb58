//! Per-instance cached methods.
//!
//! A [`CachedMethod`] is created once per operation and installed on one or
//! more types through [`ClassDef::define`](crate::object::ClassDef::define).
//! Resolving it against an instance returns that instance's own
//! [`InstanceCache`], created on first access and stored in the instance's
//! attribute store. The cache refers back to its instance only weakly, so the
//! pair never forms a reference cycle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use methodcache_lru::{BoundedMemoTable, CacheInfo, CallArgs};
use tracing::{debug, warn};

use crate::config::CacheOptions;
use crate::error::{Error, Result};
use crate::invoker::WeakSelfInvoker;
use crate::object::{AttrValue, HasAttributes, SetName, StoreError};

/// Descriptive metadata copied from an operation onto everything wrapping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    pub name: String,
    pub doc: Option<String>,
}

/// An operation taking the instance as its receiver.
///
/// Clones share identity: two operations are the same when one was cloned
/// from the other.
pub struct Operation<T: ?Sized, R> {
    func: Rc<dyn Fn(&Rc<T>, &CallArgs) -> anyhow::Result<R>>,
    metadata: Rc<MethodMetadata>,
}

impl<T: ?Sized, R> Operation<T, R> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Rc<T>, &CallArgs) -> anyhow::Result<R> + 'static,
    {
        Self {
            func: Rc::new(func),
            metadata: Rc::new(MethodMetadata {
                name: name.into(),
                doc: None,
            }),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.metadata = Rc::new(MethodMetadata {
            name: self.metadata.name.clone(),
            doc: Some(doc.into()),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.metadata.doc.as_deref()
    }

    pub fn metadata(&self) -> &Rc<MethodMetadata> {
        &self.metadata
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }

    /// Runs the operation with `instance` as receiver, bypassing any cache.
    pub fn call(&self, instance: &Rc<T>, args: &CallArgs) -> anyhow::Result<R> {
        (self.func)(instance, args)
    }
}

impl<T: ?Sized, R> Clone for Operation<T, R> {
    fn clone(&self) -> Self {
        Self {
            func: Rc::clone(&self.func),
            metadata: Rc::clone(&self.metadata),
        }
    }
}

impl<T: ?Sized, R> fmt::Debug for Operation<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.metadata.name)
            .field("doc", &self.metadata.doc)
            .finish_non_exhaustive()
    }
}

/// Write-once attribute name of a [`CachedMethod`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Attachment {
    #[default]
    Unset,
    Named(String),
    /// Attached under two different names; unusable under either.
    Conflicted { first: String, second: String },
}

/// The per-instance memoizer returned by [`CachedMethod::resolve`].
pub struct InstanceCache<T: ?Sized, R: Clone> {
    table: BoundedMemoTable<WeakSelfInvoker<T, R>>,
    metadata: Rc<MethodMetadata>,
}

impl<T: ?Sized, R: Clone> InstanceCache<T, R> {
    fn new(instance: &Rc<T>, operation: Operation<T, R>, options: CacheOptions) -> Self {
        let metadata = Rc::clone(operation.metadata());
        let invoker = WeakSelfInvoker::new(instance, operation);
        Self {
            table: BoundedMemoTable::new(invoker, options.capacity, options.typed),
            metadata,
        }
    }

    /// Returns the memoized result for `args`, running the operation on a
    /// miss. Failed calls are not cached.
    pub fn call(&self, args: impl Into<CallArgs>) -> Result<R> {
        self.table.call(&args.into())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.metadata.doc.as_deref()
    }

    pub fn operation(&self) -> &Operation<T, R> {
        self.table.source().operation()
    }

    /// Whether the instance this cache belongs to still exists.
    pub fn is_alive(&self) -> bool {
        self.table.source().is_alive()
    }

    pub fn contains(&self, args: impl Into<CallArgs>) -> bool {
        self.table.contains(&args.into())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.table.capacity()
    }

    pub fn is_typed(&self) -> bool {
        self.table.is_typed()
    }

    /// The options this cache was created with.
    pub fn cache_parameters(&self) -> CacheOptions {
        let (capacity, typed) = self.table.cache_parameters();
        CacheOptions { capacity, typed }
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.table.cache_info()
    }

    pub fn cache_clear(&self) {
        self.table.cache_clear();
    }
}

impl<T: ?Sized, R: Clone> fmt::Debug for InstanceCache<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("name", &self.metadata.name)
            .field("table", &self.table)
            .finish()
    }
}

/// Result of reading a cached method through [`CachedMethod::get`].
pub enum Access<'a, T: ?Sized, R: Clone> {
    /// Read on the type: the descriptor itself.
    Descriptor(&'a CachedMethod<T, R>),
    /// Read on an instance: its memoizer.
    Bound(Rc<InstanceCache<T, R>>),
}

impl<T: ?Sized, R: Clone> Access<'_, T, R> {
    pub fn name(&self) -> &str {
        match self {
            Access::Descriptor(method) => method.name(),
            Access::Bound(cache) => cache.name(),
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            Access::Descriptor(method) => method.doc(),
            Access::Bound(cache) => cache.doc(),
        }
    }

    pub fn into_bound(self) -> Option<Rc<InstanceCache<T, R>>> {
        match self {
            Access::Bound(cache) => Some(cache),
            Access::Descriptor(_) => None,
        }
    }
}

/// Caches calls to an operation separately for every instance.
///
/// Each instance gets its own bounded table, so the operation can be cached
/// even on types that are not hashable themselves.
///
/// Not thread-safe: two first accesses racing on one instance could each
/// create a cache. `Rc` keeps the type on a single thread.
pub struct CachedMethod<T: ?Sized, R> {
    operation: Operation<T, R>,
    options: CacheOptions,
    attachment: RefCell<Attachment>,
}

impl<T: ?Sized, R> CachedMethod<T, R> {
    pub fn new(operation: Operation<T, R>) -> Self {
        Self::with_options(operation, CacheOptions::default())
    }

    pub fn with_options(operation: Operation<T, R>, options: CacheOptions) -> Self {
        Self {
            operation,
            options,
            attachment: RefCell::new(Attachment::Unset),
        }
    }

    /// Re-supplies the wrapped operation. Supplying the same operation again
    /// is a no-op; a different one is rejected.
    pub fn bind(&self, operation: &Operation<T, R>) -> Result<()> {
        if self.operation.same_as(operation) {
            return Ok(());
        }
        Err(Error::OperationConflict {
            existing: self.operation.name().to_owned(),
            attempted: operation.name().to_owned(),
        })
    }

    /// Records the attribute name this method is installed under.
    ///
    /// Installing under the same name on several types is allowed. A second,
    /// different name fails and leaves the method unusable.
    pub fn attach_name(&self, owner: &str, name: &str) -> Result<()> {
        let mut attachment = self.attachment.borrow_mut();
        match &*attachment {
            Attachment::Unset => {
                debug!(method = %self.name(), owner, attribute = name, "cached method attached");
                *attachment = Attachment::Named(name.to_owned());
                Ok(())
            }
            Attachment::Named(current) if current == name => Ok(()),
            Attachment::Named(current) => {
                let first = current.clone();
                warn!(
                    method = %self.name(),
                    owner,
                    first = %first,
                    second = name,
                    "cached method installed under two names"
                );
                *attachment = Attachment::Conflicted {
                    first: first.clone(),
                    second: name.to_owned(),
                };
                Err(Error::NameConflict {
                    first,
                    second: name.to_owned(),
                })
            }
            Attachment::Conflicted { first, .. } => Err(Error::NameConflict {
                first: first.clone(),
                second: name.to_owned(),
            }),
        }
    }

    /// The attribute name, once attached.
    pub fn attribute_name(&self) -> Option<String> {
        match &*self.attachment.borrow() {
            Attachment::Named(name) => Some(name.clone()),
            Attachment::Unset | Attachment::Conflicted { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        self.operation.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.operation.doc()
    }

    pub fn operation(&self) -> &Operation<T, R> {
        &self.operation
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    fn checked_attribute(&self) -> Result<String> {
        match &*self.attachment.borrow() {
            Attachment::Named(name) => Ok(name.clone()),
            Attachment::Unset => Err(Error::UnboundAccess {
                method: self.name().to_owned(),
            }),
            Attachment::Conflicted { first, second } => Err(Error::NameConflict {
                first: first.clone(),
                second: second.clone(),
            }),
        }
    }
}

impl<T, R> CachedMethod<T, R>
where
    T: HasAttributes + ?Sized,
    R: Clone + 'static,
{
    /// Returns the memoizer of `instance`, creating and storing it on first
    /// access.
    pub fn resolve(&self, instance: &Rc<T>) -> Result<Rc<InstanceCache<T, R>>> {
        let attribute = self.checked_attribute()?;
        let Some(store) = instance.attribute_store() else {
            return Err(Error::NoAttributeStore {
                type_name: instance.type_name().to_owned(),
                attribute,
            });
        };

        if let Some(existing) = store.get_attribute(&attribute) {
            return existing
                .downcast::<InstanceCache<T, R>>()
                .map_err(|_| Error::AttributeShadowed {
                    type_name: instance.type_name().to_owned(),
                    attribute,
                });
        }

        let cache = Rc::new(InstanceCache::new(
            instance,
            self.operation.clone(),
            self.options,
        ));
        let value: AttrValue = cache.clone();
        if let Err(err) = store.set_attribute(&attribute, value) {
            let type_name = instance.type_name().to_owned();
            return Err(match err {
                StoreError::ReadOnly => Error::ImmutableAttributeStore {
                    type_name,
                    attribute,
                },
                StoreError::Rejected(reason) => Error::AttributeWrite {
                    type_name,
                    attribute,
                    reason,
                },
            });
        }

        debug!(
            method = %self.name(),
            attribute = %attribute,
            type_name = instance.type_name(),
            capacity = ?self.options.capacity,
            typed = self.options.typed,
            "created per-instance cache"
        );
        Ok(cache)
    }

    /// Reads the method through the type (`None`) or through an instance.
    ///
    /// Reading through the type never touches any cache.
    pub fn get(&self, instance: Option<&Rc<T>>) -> Result<Access<'_, T, R>> {
        match instance {
            None => Ok(Access::Descriptor(self)),
            Some(instance) => self.resolve(instance).map(Access::Bound),
        }
    }

    /// Shorthand for resolving `instance` and calling its memoizer.
    pub fn call(&self, instance: &Rc<T>, args: impl Into<CallArgs>) -> Result<R> {
        self.resolve(instance)?.call(args)
    }
}

impl<T: ?Sized, R> SetName for CachedMethod<T, R> {
    fn set_name(&self, owner: &str, name: &str) -> Result<()> {
        self.attach_name(owner, name)
    }
}

impl<T: ?Sized, R> fmt::Debug for CachedMethod<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMethod")
            .field("operation", &self.operation)
            .field("options", &self.options)
            .field("attachment", &*self.attachment.borrow())
            .finish()
    }
}

/// Builder for a [`CachedMethod`] with non-default [`CacheOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedMethodBuilder {
    options: CacheOptions,
}

impl CachedMethodBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.options.capacity = Some(capacity);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.options.capacity = None;
        self
    }

    pub fn typed(mut self, typed: bool) -> Self {
        self.options.typed = typed;
        self
    }

    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build<T: ?Sized, R>(self, operation: Operation<T, R>) -> CachedMethod<T, R> {
        CachedMethod::with_options(operation, self.options)
    }
}
