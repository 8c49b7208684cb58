use ahash::AHashMap;
use std::hash::Hash;

type NodeIndex = usize;

const NULL_INDEX: NodeIndex = usize::MAX;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    /// Neighbour that was used more recently.
    prev: NodeIndex,
    /// Neighbour that was used less recently.
    next: NodeIndex,
}

/// Key/value store with least-recently-used eviction.
///
/// Entries live in an arena threaded by a doubly-linked recency list, so
/// lookup, promotion, insertion and eviction are all O(1) on average. Slots of
/// evicted entries are recycled through a free list.
#[derive(Debug, Clone)]
pub struct LruStore<K, V> {
    arena: Vec<Option<Node<K, V>>>,
    free_list: Vec<NodeIndex>,
    index: AHashMap<K, NodeIndex>,
    /// Most recently used.
    head: NodeIndex,
    /// Least recently used.
    tail: NodeIndex,
    capacity: Option<usize>,
}

impl<K, V> LruStore<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates a store holding at most `capacity` entries, or any number of
    /// entries when `capacity` is `None`.
    pub fn new(capacity: Option<usize>) -> Self {
        let reserve = capacity.unwrap_or_default().min(1024);
        Self {
            arena: Vec::with_capacity(reserve),
            free_list: Vec::new(),
            index: AHashMap::with_capacity(reserve),
            head: NULL_INDEX,
            tail: NULL_INDEX,
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Checks for `key` without touching the recency order.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.move_to_head(idx);
        self.node(idx).map(|node| &node.value)
    }

    /// Returns the value for `key` without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.node(idx).map(|node| &node.value)
    }

    /// Inserts `value` as the most recently used entry.
    ///
    /// An existing entry for `key` is overwritten in place. Otherwise, if the
    /// store is full, the least recently used entry is evicted first and
    /// returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(node) = self.arena[idx].as_mut() {
                node.value = value;
            }
            self.move_to_head(idx);
            return None;
        }

        if self.capacity == Some(0) {
            return Some((key, value));
        }

        let evicted = match self.capacity {
            Some(capacity) if self.index.len() >= capacity => self.pop_lru(),
            _ => None,
        };

        let idx = self.alloc_node(Node {
            key: key.clone(),
            value,
            prev: NULL_INDEX,
            next: NULL_INDEX,
        });
        self.index.insert(key, idx);
        self.push_head(idx);
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.detach(idx);
        self.free_node(idx).map(|node| node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NULL_INDEX {
            return None;
        }
        let idx = self.tail;
        self.detach(idx);
        let node = self.free_node(idx)?;
        self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.free_list.clear();
        self.index.clear();
        self.head = NULL_INDEX;
        self.tail = NULL_INDEX;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor)?;
            cursor = node.next;
            Some(&node.key)
        })
    }

    fn node(&self, idx: NodeIndex) -> Option<&Node<K, V>> {
        self.arena.get(idx).and_then(Option::as_ref)
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> NodeIndex {
        if let Some(idx) = self.free_list.pop() {
            self.arena[idx] = Some(node);
            idx
        } else {
            self.arena.push(Some(node));
            self.arena.len() - 1
        }
    }

    fn free_node(&mut self, idx: NodeIndex) -> Option<Node<K, V>> {
        let node = self.arena.get_mut(idx)?.take();
        if node.is_some() {
            self.free_list.push(idx);
        }
        node
    }

    fn set_prev(&mut self, idx: NodeIndex, prev: NodeIndex) {
        if let Some(node) = self.arena.get_mut(idx).and_then(Option::as_mut) {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, idx: NodeIndex, next: NodeIndex) {
        if let Some(node) = self.arena.get_mut(idx).and_then(Option::as_mut) {
            node.next = next;
        }
    }

    fn detach(&mut self, idx: NodeIndex) {
        let Some((prev, next)) = self.node(idx).map(|node| (node.prev, node.next)) else {
            return;
        };

        if prev == NULL_INDEX {
            self.head = next;
        } else {
            self.set_next(prev, next);
        }

        if next == NULL_INDEX {
            self.tail = prev;
        } else {
            self.set_prev(next, prev);
        }

        self.set_prev(idx, NULL_INDEX);
        self.set_next(idx, NULL_INDEX);
    }

    fn push_head(&mut self, idx: NodeIndex) {
        let old_head = self.head;
        self.set_prev(idx, NULL_INDEX);
        self.set_next(idx, old_head);
        if old_head != NULL_INDEX {
            self.set_prev(old_head, idx);
        }
        self.head = idx;
        if self.tail == NULL_INDEX {
            self.tail = idx;
        }
    }

    fn move_to_head(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_head(idx);
    }
}

impl<K, V> Default for LruStore<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::unbounded()
    }
}
