use serde::Deserialize as _;
use serde_json::Value;

use crate::{
    record::{as_doc, as_seq, expect_type, tag, Document, Record},
    Error, Hierarchical, Result, TreeBuilderConfig,
};

/// A tree of domain objects reconstructed from flat, parent-referencing records.
///
/// Each node wraps one object and records its `depth` (0 for roots). When flat input yields more
/// than one root, the top of the tree is a synthetic container with no node and no depth whose
/// children are the roots.
///
/// Trees are read-only once built. To reflect changed records, build a new tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree<T> {
    node: Option<T>,
    depth: Option<usize>,
    children: Vec<NodeTree<T>>,
}

impl<T> NodeTree<T> {
    /// Discriminator of tree documents.
    pub const TYPE_NAME: &'static str = "NodeTree";

    /// A node at `depth` with the given children.
    pub fn new(node: T, depth: usize, children: Vec<NodeTree<T>>) -> Self {
        NodeTree {
            node: Some(node),
            depth: Some(depth),
            children,
        }
    }

    /// A synthetic container holding several roots.
    pub fn forest(roots: Vec<NodeTree<T>>) -> Self {
        NodeTree {
            node: None,
            depth: None,
            children: roots,
        }
    }

    /// A tree with no nodes at all.
    pub fn empty() -> Self {
        Self::forest(Vec::new())
    }

    /// Wrapped object, `None` for a synthetic container.
    pub fn node(&self) -> Option<&T> {
        self.node.as_ref()
    }

    /// Depth of this node, `None` for a synthetic container.
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    #[allow(missing_docs)]
    pub fn children(&self) -> &[NodeTree<T>] {
        &self.children
    }

    /// Return `true` if the tree holds no objects.
    pub fn is_empty(&self) -> bool {
        self.node.is_none() && self.children.iter().all(NodeTree::is_empty)
    }

    /// Wrapped objects in pre-order: a node, then each child's subtree left to right.
    pub fn flatten(&self) -> Vec<&T> {
        let mut nodes = Vec::new();
        self.walk(&mut |tree| nodes.extend(tree.node.as_ref()));
        nodes
    }

    /// Like [`flatten`](Self::flatten), keeping only nodes at `depth`.
    pub fn flatten_at_depth(&self, depth: usize) -> Vec<&T> {
        let mut nodes = Vec::new();
        self.walk(&mut |tree| {
            if tree.depth == Some(depth) {
                nodes.extend(tree.node.as_ref());
            }
        });
        nodes
    }

    /// Like [`flatten`](Self::flatten), keeping only nodes without children.
    pub fn leaves(&self) -> Vec<&T> {
        let mut nodes = Vec::new();
        self.walk(&mut |tree| {
            if tree.children.is_empty() {
                nodes.extend(tree.node.as_ref());
            }
        });
        nodes
    }

    /// Deepest `depth` anywhere in this (sub)tree, or `None` if the tree holds no nodes.
    pub fn get_max_depth(&self) -> Option<usize> {
        let mut max_depth = None;
        self.walk(&mut |tree| max_depth = max_depth.max(tree.depth));
        max_depth
    }

    fn walk<'a, F: FnMut(&'a NodeTree<T>)>(&'a self, visit: &mut F) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    fn find(&self, matches: &impl Fn(&T) -> bool) -> Option<&NodeTree<T>> {
        if self.node.as_ref().is_some_and(matches) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(matches))
    }

    fn path_to<'a>(&'a self, matches: &impl Fn(&T) -> bool, path: &mut Vec<&'a T>) -> bool {
        if self.node.as_ref().is_some_and(matches) {
            return true;
        }
        path.extend(self.node.as_ref());
        if self.children.iter().any(|child| child.path_to(matches, path)) {
            return true;
        }
        if self.node.is_some() {
            path.pop();
        }
        false
    }
}

impl<T: Hierarchical> NodeTree<T> {
    /// Assemble flat records into a tree, bounding depth by
    /// [`TreeBuilderConfig::DEFAULT_MAX_DEPTH`].
    ///
    /// See [`build_with_max_depth`](Self::build_with_max_depth).
    pub fn build(records: impl IntoIterator<Item = T>) -> Result<Self> {
        Self::build_with_max_depth(records, TreeBuilderConfig::DEFAULT_MAX_DEPTH)
    }

    /// Assemble flat records into a tree.
    ///
    /// A record without a parent, or whose parent id matches no record, becomes a root at depth
    /// 0. Siblings keep their input order. A single root is returned directly; otherwise the
    /// roots are wrapped in a [`forest`](Self::forest).
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateId`] if two records share an id.
    /// - [`Error::Cycle`] if some records are unreachable from every root.
    /// - [`Error::DepthLimitExceeded`] if a node would sit deeper than `max_depth`.
    pub fn build_with_max_depth(
        records: impl IntoIterator<Item = T>,
        max_depth: usize,
    ) -> Result<Self> {
        let records: Vec<T> = records.into_iter().collect();
        let (roots, child_lists) = link(&records)?;

        let mut slots: Vec<Option<T>> = records.into_iter().map(Some).collect();
        let mut trees = Vec::with_capacity(roots.len());
        for root in roots {
            trees.push(assemble(root, 0, max_depth, &mut slots, &child_lists)?);
        }

        let unplaced: Vec<String> = slots
            .iter()
            .flatten()
            .map(|record| record.id().unwrap_or_default().to_owned())
            .collect();
        if !unplaced.is_empty() {
            log::warn!(target: "adtargeting", unplaced = unplaced.len(); "parent references form a cycle");
            return Err(Error::Cycle(unplaced));
        }

        log::trace!(target: "adtargeting", nodes = slots.len(), roots = trees.len(); "built node tree");

        if trees.len() == 1 {
            Ok(trees.remove(0))
        } else {
            Ok(NodeTree::forest(trees))
        }
    }
}

/// Resolve parent references into root indices and per-record child indices.
fn link<T: Hierarchical>(records: &[T]) -> Result<(Vec<usize>, Vec<Vec<usize>>)> {
    let mut index = std::collections::HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if let Some(id) = record.id() {
            if index.insert(id, i).is_some() {
                log::warn!(target: "adtargeting", id; "duplicate record id");
                return Err(Error::DuplicateId(id.to_owned()));
            }
        }
    }

    let mut roots = Vec::new();
    let mut child_lists = vec![Vec::new(); records.len()];
    for (i, record) in records.iter().enumerate() {
        let Some(parent_id) = record.parent_id() else {
            roots.push(i);
            continue;
        };
        match index.get(parent_id) {
            Some(&parent) => child_lists[parent].push(i),
            None => {
                log::debug!(target: "adtargeting",
                    id = record.id().unwrap_or_default(),
                    parent_id;
                    "parent not found, treating record as a root");
                roots.push(i);
            }
        }
    }
    Ok((roots, child_lists))
}

fn assemble<T>(
    i: usize,
    depth: usize,
    max_depth: usize,
    slots: &mut [Option<T>],
    child_lists: &[Vec<usize>],
) -> Result<NodeTree<T>> {
    if depth > max_depth {
        return Err(Error::DepthLimitExceeded(max_depth));
    }
    // Every record has at most one parent, so each slot is taken exactly once.
    let node = slots[i].take().expect("record should be placed once");
    let children = child_lists[i]
        .iter()
        .map(|&child| assemble(child, depth + 1, max_depth, slots, child_lists))
        .collect::<Result<Vec<_>>>()?;
    Ok(NodeTree::new(node, depth, children))
}

impl<T: Record> NodeTree<T> {
    /// First node, in pre-order starting with this one, whose object has `field_name == value`.
    ///
    /// Returns `None` if nothing matches.
    pub fn get_subtree(&self, field_name: &str, value: impl Into<Value>) -> Option<&NodeTree<T>> {
        let value = value.into();
        self.find(&|node: &T| node.field(field_name).as_ref() == Some(&value))
    }

    /// Objects on the path from the top of this tree down to the first node matching
    /// `field_name == value`, excluding the match itself.
    ///
    /// Empty if nothing matches or the match is at the top.
    pub fn ancestors(&self, field_name: &str, value: impl Into<Value>) -> Vec<&T> {
        let value = value.into();
        let mut path = Vec::new();
        if self.path_to(&|node: &T| node.field(field_name).as_ref() == Some(&value), &mut path) {
            path
        } else {
            Vec::new()
        }
    }

    /// Copy of this tree that keeps only branches containing at least one node whose
    /// `field_name` is one of `values`. The top node is always kept.
    pub fn filter_by_field(&self, field_name: &str, values: &[Value]) -> NodeTree<T>
    where
        T: Clone,
    {
        let keep = |node: &T| {
            node.field(field_name)
                .is_some_and(|value| values.contains(&value))
        };
        self.filter_with(&keep)
    }

    fn filter_with(&self, keep: &impl Fn(&T) -> bool) -> NodeTree<T>
    where
        T: Clone,
    {
        NodeTree {
            node: self.node.clone(),
            depth: self.depth,
            children: self
                .children
                .iter()
                .filter(|child| child.find(keep).is_some())
                .map(|child| child.filter_with(keep))
                .collect(),
        }
    }
}

impl<T: Record> Record for NodeTree<T> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn to_doc(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(
            "node".to_owned(),
            self.node
                .as_ref()
                .map_or(Value::Null, |node| Value::Object(node.to_doc())),
        );
        doc.insert("depth".to_owned(), self.depth.map_or(Value::Null, Value::from));
        doc.insert(
            "children".to_owned(),
            Value::Array(
                self.children
                    .iter()
                    .map(|child| Value::Object(child.to_doc()))
                    .collect(),
            ),
        );
        tag(&mut doc, Self::TYPE_NAME);
        doc
    }

    fn from_doc(doc: &Document) -> Result<Self> {
        Self::decode(doc, None)
    }
}

impl<T: Record> NodeTree<T> {
    /// Rebuild a (sub)tree, checking each depth against `expected`. The top of a document may
    /// sit at any depth; everything below it follows from its parent.
    fn decode(doc: &Document, expected: Option<usize>) -> Result<Self> {
        expect_type(doc, Self::TYPE_NAME)?;

        let node = match doc.get("node") {
            None | Some(Value::Null) => None,
            Some(value) => Some(T::from_doc(as_doc(Self::TYPE_NAME, value)?)?),
        };
        let stored = match doc.get("depth") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                usize::deserialize(value).map_err(|err| Error::malformed(Self::TYPE_NAME, err))?,
            ),
        };

        let depth = match (&node, stored, expected) {
            (None, Some(found), _) => {
                return Err(Error::InvalidTree(format!(
                    "container without a node has depth {found}"
                )))
            }
            (None, None, Some(_)) => {
                return Err(Error::InvalidTree("nested entry has no node".to_owned()))
            }
            (None, None, None) => None,
            (Some(_), Some(found), Some(expected)) if found != expected => {
                return Err(Error::InvalidTree(format!(
                    "node at depth {found} where {expected} was expected"
                )))
            }
            (Some(_), found, expected) => Some(found.or(expected).unwrap_or(0)),
        };
        let child_depth = match depth {
            None => 0,
            Some(depth) => depth
                .checked_add(1)
                .ok_or_else(|| Error::InvalidTree(format!("depth {depth} has no room for children")))?,
        };

        let children = match doc.get("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => as_seq(Self::TYPE_NAME, value)?
                .iter()
                .map(|child| Self::decode(as_doc(Self::TYPE_NAME, child)?, Some(child_depth)))
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(NodeTree {
            node,
            depth,
            children,
        })
    }
}
