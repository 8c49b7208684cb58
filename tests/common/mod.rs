#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use methodcache::{AttributeStore, CallArgs, HasAttributes, InstanceDict, Operation};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An ordinary object with a mutable attribute store and a call counter.
#[derive(Debug, Default)]
pub struct CallCounter {
    pub dict: InstanceDict,
    pub called: Cell<u32>,
}

impl CallCounter {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl HasAttributes for CallCounter {
    fn attribute_store(&self) -> Option<&dyn AttributeStore> {
        Some(&self.dict)
    }
}

/// `compute(self, n) = n`, counting every real invocation.
pub fn identity() -> Operation<CallCounter, i64> {
    Operation::new("compute", |this: &Rc<CallCounter>, args: &CallArgs| {
        this.called.set(this.called.get() + 1);
        Ok(args.int(0)?)
    })
}
