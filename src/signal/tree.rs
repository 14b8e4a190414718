use miette::Diagnostic;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::signal::path::{MalformedPathError, SignalPath};
use crate::signal::value::ScalarValue;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum TreeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Malformed(#[from] MalformedPathError),

    #[error("Signal `{path}` conflicts with `{existing}`: a node cannot be both a leaf and a branch")]
    #[diagnostic(
        code(vss::signal::path_conflict),
        help("Remove either the leaf entry or the entries nested below it from the signal store")
    )]
    PathConflict { path: String, existing: String },
}

/// Flat signal store keyed by dotted path.
///
/// Keys are kept in lexicographic order so building a tree from a store never
/// depends on the order entries were ingested in. Inserting an existing key
/// replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatStore {
    entries: BTreeMap<String, ScalarValue>,
}

impl FlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ScalarValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ScalarValue> {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> FromIterator<(K, V)> for FlatStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut store = FlatStore::new();
        for (k, v) in iter {
            store.insert(k, v);
        }
        store
    }
}

impl<'a> IntoIterator for &'a FlatStore {
    type Item = (&'a String, &'a ScalarValue);
    type IntoIter = btree_map::Iter<'a, String, ScalarValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalNode {
    Leaf(ScalarValue),
    Branch(SignalTree),
}

/// Nested signal tree mirroring the shape of the GraphQL object types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTree {
    children: BTreeMap<String, SignalNode>,
}

impl SignalTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a flat store, failing on the first malformed key or
    /// leaf/branch conflict.
    pub fn build(store: &FlatStore) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        for (key, value) in store {
            let path = SignalPath::parse(key)?;
            tree.insert(&path, value.clone())?;
        }
        Ok(tree)
    }

    /// Build a tree from a flat store, skipping malformed keys. A leaf whose
    /// path is also the prefix of another key is dropped so the signals below
    /// it stay reachable. One corrupt signal does not hide the rest.
    pub fn build_lenient(store: &FlatStore) -> Self {
        let mut skipped = 0usize;
        let mut entries = Vec::with_capacity(store.len());
        for (key, value) in store {
            match SignalPath::parse(key) {
                Ok(path) => entries.push((path, value)),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(key = %key, error = %e, "Skipping malformed signal key");
                }
            }
        }

        let interior: BTreeSet<String> = entries
            .iter()
            .flat_map(|(path, _)| {
                (1..path.len()).map(move |n| path.segments()[..n].join("."))
            })
            .collect();

        let mut tree = Self::new();
        for (path, value) in entries {
            let key = path.to_string();
            if interior.contains(&key) {
                skipped += 1;
                tracing::warn!(key = %key, "Skipping signal value shadowing a branch");
                continue;
            }
            if let Err(e) = tree.insert(&path, value.clone()) {
                skipped += 1;
                tracing::warn!(key = %key, error = %e, "Skipping signal entry");
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, total = store.len(), "Built signal tree with skipped entries");
        }
        tree
    }

    /// Place `value` at `path`, creating intermediate branches.
    ///
    /// A leaf may be replaced by another leaf, but never by a branch or the
    /// other way round. Nothing is modified when an error is returned.
    pub fn insert(&mut self, path: &SignalPath, value: ScalarValue) -> Result<(), TreeError> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(TreeError::Malformed(MalformedPathError {
                path: path.to_string(),
                reason: "path is empty",
            }));
        };

        let mut node = self;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node
                .children
                .entry(segment.clone())
                .or_insert_with(|| SignalNode::Branch(SignalTree::new()));
            node = match entry {
                SignalNode::Branch(subtree) => subtree,
                SignalNode::Leaf(_) => {
                    return Err(TreeError::PathConflict {
                        path: path.to_string(),
                        existing: path.segments()[..=depth].join("."),
                    })
                }
            };
        }

        if let Some(SignalNode::Branch(_)) = node.children.get(last) {
            return Err(TreeError::PathConflict {
                path: path.to_string(),
                existing: path.to_string(),
            });
        }
        node.children.insert(last.clone(), SignalNode::Leaf(value));
        Ok(())
    }

    /// Flatten back into dotted keys. Inverse of [`SignalTree::build`].
    pub fn flatten(&self) -> FlatStore {
        let mut store = FlatStore::new();
        let mut prefix = Vec::new();
        self.flatten_into(&mut prefix, &mut store);
        store
    }

    fn flatten_into<'a>(&'a self, prefix: &mut Vec<&'a str>, store: &mut FlatStore) {
        for (segment, node) in &self.children {
            prefix.push(segment);
            match node {
                SignalNode::Leaf(value) => store.insert(prefix.join("."), value.clone()),
                SignalNode::Branch(subtree) => subtree.flatten_into(prefix, store),
            }
            prefix.pop();
        }
    }

    pub fn node(&self, segment: &str) -> Option<&SignalNode> {
        self.children.get(segment)
    }

    /// Child branch named `segment`; `None` if absent or a leaf.
    pub fn branch(&self, segment: &str) -> Option<&SignalTree> {
        match self.children.get(segment) {
            Some(SignalNode::Branch(t)) => Some(t),
            _ => None,
        }
    }

    /// Leaf value named `segment`; `None` if absent or a branch.
    pub fn leaf(&self, segment: &str) -> Option<&ScalarValue> {
        match self.children.get(segment) {
            Some(SignalNode::Leaf(v)) => Some(v),
            _ => None,
        }
    }

    /// Detach the child branch named `segment`.
    pub fn take_branch(&mut self, segment: &str) -> Option<SignalTree> {
        match self.children.remove(segment) {
            Some(SignalNode::Branch(t)) => Some(t),
            Some(leaf) => {
                self.children.insert(segment.to_string(), leaf);
                None
            }
            None => None,
        }
    }

    pub fn get(&self, path: &SignalPath) -> Option<&SignalNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.children.get(first)?;
        for segment in rest {
            match node {
                SignalNode::Branch(t) => node = t.children.get(segment)?,
                SignalNode::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}
