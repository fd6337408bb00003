use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node in the persistent trie. Nodes are immutable once built; edits
/// clone the affected path and share every other subtree through the
/// `Arc`s in `children`.
///
/// The value is type-erased so one trie can hold payloads of different
/// types; `Trie::get` recovers the concrete type with a downcast and
/// returns None on a mismatch.
#[derive(Clone, Default)]
struct TrieNode {
    children: BTreeMap<u8, Arc<TrieNode>>,
    value: Option<Arc<dyn Any + Send + Sync>>,
}

impl TrieNode {
    fn is_value_node(&self) -> bool {
        self.value.is_some()
    }
}

/// Persistent copy-on-write trie. `put` and `remove` return a new trie;
/// the receiver is left untouched and ancestors off the edited path are
/// shared between versions.
#[derive(Clone, Default)]
pub struct Trie {
    root: Option<Arc<TrieNode>>,
}

impl Trie {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Looks up `key` and returns the value only when the terminal node
    /// holds one of exactly type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &[u8]) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        for &byte in key {
            node = node.children.get(&byte)?;
        }
        node.value.as_ref()?.downcast_ref::<T>()
    }

    /// Returns a new trie with `key` bound to `value`. The value is
    /// moved, so non-cloneable payloads are supported.
    pub fn put<T: Send + Sync + 'static>(&self, key: &[u8], value: T) -> Trie {
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        let root = Self::put_walk(self.root.as_deref(), key, value);
        Trie { root: Some(root) }
    }

    fn put_walk(
        node: Option<&TrieNode>,
        key: &[u8],
        value: Arc<dyn Any + Send + Sync>,
    ) -> Arc<TrieNode> {
        // Clone the current node (or start a fresh one off the existing
        // path); only the child along the key is replaced.
        let mut cloned = node.cloned().unwrap_or_default();

        match key.split_first() {
            None => {
                cloned.value = Some(value);
            }
            Some((&byte, rest)) => {
                let child = cloned.children.get(&byte).map(Arc::as_ref);
                let new_child = Self::put_walk(child, rest, value);
                cloned.children.insert(byte, new_child);
            }
        }

        Arc::new(cloned)
    }

    /// Returns a new trie without a value at `key`. Nodes left with
    /// neither value nor children are pruned on the way back up; when
    /// the key is absent the original root is shared unchanged.
    pub fn remove(&self, key: &[u8]) -> Trie {
        let Some(root) = self.root.as_deref() else {
            return self.clone();
        };

        match Self::remove_walk(root, key) {
            RemoveOutcome::KeyAbsent => self.clone(),
            RemoveOutcome::Replaced(node) => Trie { root: Some(node) },
            RemoveOutcome::Pruned => Trie { root: None },
        }
    }

    fn remove_walk(node: &TrieNode, key: &[u8]) -> RemoveOutcome {
        match key.split_first() {
            None => {
                if !node.is_value_node() {
                    return RemoveOutcome::KeyAbsent;
                }
                if node.children.is_empty() {
                    return RemoveOutcome::Pruned;
                }
                let mut cloned = node.clone();
                cloned.value = None;
                RemoveOutcome::Replaced(Arc::new(cloned))
            }
            Some((&byte, rest)) => {
                let Some(child) = node.children.get(&byte) else {
                    return RemoveOutcome::KeyAbsent;
                };
                match Self::remove_walk(child, rest) {
                    RemoveOutcome::KeyAbsent => RemoveOutcome::KeyAbsent,
                    RemoveOutcome::Replaced(new_child) => {
                        let mut cloned = node.clone();
                        cloned.children.insert(byte, new_child);
                        RemoveOutcome::Replaced(Arc::new(cloned))
                    }
                    RemoveOutcome::Pruned => {
                        let mut cloned = node.clone();
                        cloned.children.remove(&byte);
                        if cloned.children.is_empty() && !cloned.is_value_node() {
                            RemoveOutcome::Pruned
                        } else {
                            RemoveOutcome::Replaced(Arc::new(cloned))
                        }
                    }
                }
            }
        }
    }

    /// True when the trie holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

enum RemoveOutcome {
    /// Key not present; the caller keeps sharing the original trie.
    KeyAbsent,
    /// Subtree rebuilt along the edited path.
    Replaced(Arc<TrieNode>),
    /// Subtree vanished entirely.
    Pruned,
}
