use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::trace;

use crate::args::CallArgs;
use crate::eviction::LruStore;
use crate::info::CacheInfo;
use crate::key::CacheKey;

/// Source of values for a [`BoundedMemoTable`].
///
/// Closures taking `&CallArgs` and returning a `Result` implement this
/// directly.
pub trait Compute {
    type Output: Clone;
    type Error;

    fn compute(&self, args: &CallArgs) -> Result<Self::Output, Self::Error>;
}

impl<F, R, E> Compute for F
where
    F: Fn(&CallArgs) -> Result<R, E>,
    R: Clone,
{
    type Output = R;
    type Error = E;

    fn compute(&self, args: &CallArgs) -> Result<R, E> {
        self(args)
    }
}

/// Memoizes a [`Compute`] source keyed by call arguments.
///
/// The table is not thread-safe. No borrow of the table is held while the
/// source runs, so the source may call back into the same table.
pub struct BoundedMemoTable<C: Compute> {
    source: C,
    typed: bool,
    store: RefCell<LruStore<CacheKey, C::Output>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<C: Compute> BoundedMemoTable<C> {
    /// `capacity` of `None` never evicts; `Some(0)` disables caching.
    pub fn new(source: C, capacity: Option<usize>, typed: bool) -> Self {
        Self {
            source,
            typed,
            store: RefCell::new(LruStore::new(capacity)),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn unbounded(source: C) -> Self {
        Self::new(source, None, false)
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn capacity(&self) -> Option<usize> {
        self.store.borrow().capacity()
    }

    pub fn is_typed(&self) -> bool {
        self.typed
    }

    /// Returns the cached value for `args`, computing and storing it on a miss.
    ///
    /// Errors from the source are returned as-is and never cached.
    pub fn call(&self, args: &CallArgs) -> Result<C::Output, C::Error> {
        let key = CacheKey::new(args, self.typed);

        let cached = self.store.borrow_mut().get(&key).cloned();
        if let Some(value) = cached {
            self.hits.set(self.hits.get() + 1);
            trace!(arity = key.arity(), "memo table hit");
            return Ok(value);
        }

        self.misses.set(self.misses.get() + 1);
        trace!(arity = key.arity(), "memo table miss");
        let value = self.source.compute(args)?;

        let evicted = {
            let mut store = self.store.borrow_mut();
            // A reentrant call may already have stored this key.
            if store.contains(&key) {
                None
            } else {
                store.insert(key, value.clone())
            }
        };
        if evicted.is_some() {
            trace!(currsize = self.len(), "memo table evicted least recently used entry");
        }
        drop(evicted);

        Ok(value)
    }

    /// Checks whether `args` has a cached value, without counting a hit or
    /// changing the recency order.
    pub fn contains(&self, args: &CallArgs) -> bool {
        self.store
            .borrow()
            .contains(&CacheKey::new(args, self.typed))
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    /// `(capacity, typed)` as given at construction.
    pub fn cache_parameters(&self) -> (Option<usize>, bool) {
        (self.capacity(), self.typed)
    }

    pub fn cache_info(&self) -> CacheInfo {
        let store = self.store.borrow();
        CacheInfo {
            hits: self.hits.get(),
            misses: self.misses.get(),
            maxsize: store.capacity(),
            currsize: store.len(),
        }
    }

    /// Drops every cached value and resets the statistics.
    pub fn cache_clear(&self) {
        let fresh = LruStore::new(self.capacity());
        let entries = std::mem::replace(&mut *self.store.borrow_mut(), fresh);
        self.hits.set(0);
        self.misses.set(0);
        drop(entries);
    }
}

impl<C: Compute> fmt::Debug for BoundedMemoTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedMemoTable")
            .field("typed", &self.typed)
            .field("info", &self.cache_info())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counting_identity() -> (Rc<Cell<u32>>, impl Fn(&CallArgs) -> anyhow::Result<i64>) {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let source = move |args: &CallArgs| -> anyhow::Result<i64> {
            counter.set(counter.get() + 1);
            Ok(args.int(0)?)
        };
        (calls, source)
    }

    #[test]
    fn repeated_arguments_are_computed_once() -> anyhow::Result<()> {
        let (calls, source) = counting_identity();
        let table = BoundedMemoTable::unbounded(source);

        assert_eq!(table.call(&[10].into())?, 10);
        assert_eq!(table.call(&[10].into())?, 10);
        assert_eq!(calls.get(), 1);

        assert_eq!(table.call(&[20].into())?, 20);
        assert_eq!(calls.get(), 2);

        let info = table.cache_info();
        assert_eq!((info.hits, info.misses, info.currsize), (1, 2, 2));
        assert_eq!(info.maxsize, None);
        Ok(())
    }

    #[test]
    fn bounded_table_evicts_least_recently_used() -> anyhow::Result<()> {
        let (calls, source) = counting_identity();
        let table = BoundedMemoTable::new(source, Some(2), false);

        table.call(&[1].into())?;
        table.call(&[2].into())?;
        table.call(&[1].into())?;
        table.call(&[3].into())?;
        assert_eq!(calls.get(), 3);
        assert!(table.contains(&[1].into()));
        assert!(!table.contains(&[2].into()));

        table.call(&[2].into())?;
        assert_eq!(calls.get(), 4);
        assert_eq!(table.len(), 2);
        Ok(())
    }

    #[test]
    fn capacity_of_one_recomputes_alternating_arguments() -> anyhow::Result<()> {
        let (calls, source) = counting_identity();
        let table = BoundedMemoTable::new(source, Some(1), false);

        table.call(&[1].into())?;
        table.call(&[2].into())?;
        table.call(&[1].into())?;
        assert_eq!(calls.get(), 3);
        Ok(())
    }

    #[test]
    fn zero_capacity_disables_caching() -> anyhow::Result<()> {
        let (calls, source) = counting_identity();
        let table = BoundedMemoTable::new(source, Some(0), false);

        table.call(&[1].into())?;
        table.call(&[1].into())?;
        assert_eq!(calls.get(), 2);
        assert!(table.is_empty());
        assert_eq!(table.cache_info().misses, 2);
        Ok(())
    }

    #[test]
    fn typed_table_separates_int_and_float() -> anyhow::Result<()> {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let source = move |args: &CallArgs| -> anyhow::Result<f64> {
            counter.set(counter.get() + 1);
            Ok(args.float(0)?)
        };

        let typed = BoundedMemoTable::new(&source, None, true);
        typed.call(&[1].into())?;
        typed.call(&[1.0].into())?;
        assert_eq!(calls.get(), 2);

        let untyped = BoundedMemoTable::new(&source, None, false);
        untyped.call(&[1].into())?;
        untyped.call(&[1.0].into())?;
        assert_eq!(calls.get(), 3);
        Ok(())
    }

    #[test]
    fn failures_are_not_cached() {
        let calls = Cell::new(0);
        let source = |_: &CallArgs| -> Result<i64, String> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err("first attempt fails".into())
            } else {
                Ok(7)
            }
        };
        let table = BoundedMemoTable::unbounded(source);

        assert_eq!(table.call(&().into()), Err("first attempt fails".to_string()));
        assert!(table.is_empty());
        assert_eq!(table.call(&().into()), Ok(7));
        assert_eq!(table.call(&().into()), Ok(7));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn cache_clear_resets_entries_and_statistics() -> anyhow::Result<()> {
        let (calls, source) = counting_identity();
        let table = BoundedMemoTable::new(source, Some(4), false);
        table.call(&[5].into())?;
        table.call(&[5].into())?;

        table.cache_clear();
        assert_eq!(table.cache_info(), CacheInfo {
            hits: 0,
            misses: 0,
            maxsize: Some(4),
            currsize: 0,
        });

        table.call(&[5].into())?;
        assert_eq!(calls.get(), 2);
        assert_eq!(table.cache_parameters(), (Some(4), false));
        Ok(())
    }

    #[test]
    fn cache_parameters_report_construction_options() {
        let (_, source) = counting_identity();
        assert_eq!(
            BoundedMemoTable::new(source, None, true).cache_parameters(),
            (None, true)
        );
    }

    struct Revisiting {
        table: RefCell<Option<Rc<BoundedMemoTable<RevisitingSource>>>>,
        calls: Cell<i64>,
    }

    struct RevisitingSource(Rc<Revisiting>);

    impl Compute for RevisitingSource {
        type Output = i64;
        type Error = std::convert::Infallible;

        // The first computation calls back in with the same key, so the inner
        // call stores its value before the outer one finishes.
        fn compute(&self, args: &CallArgs) -> Result<i64, Self::Error> {
            let state = &self.0;
            state.calls.set(state.calls.get() + 1);
            let attempt = state.calls.get();
            if attempt == 1 {
                let table = state.table.borrow().clone().expect("table installed");
                table.call(args)?;
            }
            Ok(attempt)
        }
    }

    #[test]
    fn entry_stored_by_a_reentrant_call_is_kept() {
        let state = Rc::new(Revisiting {
            table: RefCell::new(None),
            calls: Cell::new(0),
        });
        let table = Rc::new(BoundedMemoTable::unbounded(RevisitingSource(Rc::clone(
            &state,
        ))));
        *state.table.borrow_mut() = Some(Rc::clone(&table));

        // The outer call returns what it computed.
        assert_eq!(table.call(&[7].into()), Ok(1));
        // The table still holds the inner call's value.
        assert_eq!(table.call(&[7].into()), Ok(2));
        assert_eq!(state.calls.get(), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cache_info().misses, 2);

        state.table.borrow_mut().take();
    }

    struct Fibonacci {
        table: RefCell<Option<Rc<BoundedMemoTable<FibSource>>>>,
        calls: Cell<u32>,
    }

    struct FibSource(Rc<Fibonacci>);

    impl Compute for FibSource {
        type Output = u64;
        type Error = std::convert::Infallible;

        fn compute(&self, args: &CallArgs) -> Result<u64, Self::Error> {
            let fib = &self.0;
            fib.calls.set(fib.calls.get() + 1);
            let n = args.get(0).and_then(|v| v.as_int()).unwrap_or(0);
            if n < 2 {
                return Ok(n as u64);
            }
            let table = fib.table.borrow().clone().expect("table installed");
            Ok(table.call(&[n - 1].into())? + table.call(&[n - 2].into())?)
        }
    }

    #[test]
    fn reentrant_calls_do_not_hold_the_table() {
        let fib = Rc::new(Fibonacci {
            table: RefCell::new(None),
            calls: Cell::new(0),
        });
        let table = Rc::new(BoundedMemoTable::unbounded(FibSource(Rc::clone(&fib))));
        *fib.table.borrow_mut() = Some(Rc::clone(&table));

        assert_eq!(table.call(&[40_i64].into()), Ok(102_334_155));
        assert_eq!(fib.calls.get(), 41);

        fib.table.borrow_mut().take();
    }
}
