use std::fmt;
use std::rc::{Rc, Weak};

use methodcache_lru::{CallArgs, Compute};

use crate::error::{Error, Result};
use crate::method::Operation;

/// Calls an operation on an instance it only references weakly.
///
/// The instance is upgraded for the duration of one call and released again,
/// so a memo table holding the invoker never keeps its owner alive.
pub struct WeakSelfInvoker<T: ?Sized, R> {
    owner: Weak<T>,
    operation: Operation<T, R>,
}

impl<T: ?Sized, R> WeakSelfInvoker<T, R> {
    pub fn new(instance: &Rc<T>, operation: Operation<T, R>) -> Self {
        Self {
            owner: Rc::downgrade(instance),
            operation,
        }
    }

    pub fn operation(&self) -> &Operation<T, R> {
        &self.operation
    }

    pub fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    pub fn invoke(&self, args: &CallArgs) -> Result<R> {
        let owner = self.owner.upgrade().ok_or_else(|| Error::OwnerCollected {
            method: self.operation.name().to_owned(),
        })?;
        self.operation.call(&owner, args).map_err(Error::Operation)
    }
}

impl<T: ?Sized, R: Clone> Compute for WeakSelfInvoker<T, R> {
    type Output = R;
    type Error = Error;

    fn compute(&self, args: &CallArgs) -> Result<R> {
        self.invoke(args)
    }
}

impl<T: ?Sized, R> fmt::Debug for WeakSelfInvoker<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSelfInvoker")
            .field("operation", &self.operation.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}
