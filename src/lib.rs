//! Per-instance, weakly owned, bounded memoization of methods.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use methodcache::{
//!     AttributeStore, CachedMethod, CallArgs, ClassDef, HasAttributes, InstanceDict, Operation,
//! };
//!
//! struct Counter {
//!     dict: InstanceDict,
//!     called: Cell<u32>,
//! }
//!
//! impl HasAttributes for Counter {
//!     fn attribute_store(&self) -> Option<&dyn AttributeStore> {
//!         Some(&self.dict)
//!     }
//! }
//!
//! # fn main() -> methodcache::Result<()> {
//! let compute = Rc::new(CachedMethod::new(Operation::new(
//!     "compute",
//!     |this: &Rc<Counter>, args: &CallArgs| {
//!         this.called.set(this.called.get() + 1);
//!         Ok(args.int(0)?)
//!     },
//! )));
//! let _class = ClassDef::new("Counter").define("compute", Rc::clone(&compute))?;
//!
//! let counter = Rc::new(Counter { dict: InstanceDict::new(), called: Cell::new(0) });
//! assert_eq!(compute.call(&counter, [10])?, 10);
//! assert_eq!(compute.call(&counter, [10])?, 10);
//! assert_eq!(counter.called.get(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod invoker;
pub mod method;
pub mod object;

pub use config::CacheOptions;
pub use error::{Error, Result};
pub use invoker::WeakSelfInvoker;
pub use method::{
    Access, CachedMethod, CachedMethodBuilder, InstanceCache, MethodMetadata, Operation,
};
pub use object::{
    AttrValue, AttributeStore, ClassDef, HasAttributes, InstanceDict, SetName, StoreError,
};

pub use methodcache_lru::{ArgError, ArgType, ArgValue, CacheInfo, CallArgs};
