//! Taxonomy tree assembly.
//!
//! A taxonomy is stored as flat `taxonomy_classes` rows linked by
//! `parent_id`. [`build_tree`] assembles those rows into an arena-backed
//! tree in a single pass, whatever order the rows arrive in: a child may
//! appear before its parent. Children waiting for a parent that has not
//! been seen yet are parked under the missing parent id and adopted as soon
//! as the parent row shows up.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// One flat taxonomy class row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyRow {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    /// Display names keyed by language code (`"en"`, `"fr"`, ...).
    pub names: BTreeMap<String, String>,
    pub code: String,
}

/// A class stored in the tree arena. Child links are arena indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub names: BTreeMap<String, String>,
    pub code: String,
    children: Vec<usize>,
}

/// Failures while assembling a taxonomy tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("Taxonomy class {0} not found")]
    RootNotFound(DbId),

    #[error("Taxonomy class {class_id} references parent {parent_id}, which does not exist")]
    DanglingParent { class_id: DbId, parent_id: DbId },

    #[error("Taxonomy class {0} appears more than once")]
    DuplicateClass(DbId),

    #[error("Taxonomy classes {0:?} are not reachable from any root")]
    Cycle(Vec<DbId>),
}

impl From<TaxonomyError> for CoreError {
    fn from(err: TaxonomyError) -> Self {
        match err {
            TaxonomyError::RootNotFound(id) => CoreError::NotFound {
                entity: "TaxonomyClass",
                id,
            },
            other => CoreError::Integrity(other.to_string()),
        }
    }
}

/// Serializable nested view of a (sub)tree, children sorted by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub names: BTreeMap<String, String>,
    pub children: Vec<TaxonomyNode>,
}

/// A taxonomy tree rooted at a selected class.
///
/// The arena holds every row of the taxonomy; lookups are restricted to the
/// subtree under the selected root.
#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    nodes: Vec<TreeNode>,
    /// Arena index of every class inside the selected subtree.
    members: HashMap<DbId, usize>,
    /// Pre-order of the selected subtree.
    order: Vec<usize>,
    root: usize,
}

/// Assemble the tree of `rows` and select the subtree rooted at `root_id`.
///
/// Runs in O(n) regardless of row order. The whole row set is validated:
/// a parent id that never appears, a repeated class id, or rows that cannot
/// reach a root all fail the load, even outside the selected subtree.
pub fn build_tree(rows: Vec<TaxonomyRow>, root_id: DbId) -> Result<TaxonomyTree, TaxonomyError> {
    let mut nodes: Vec<TreeNode> = Vec::with_capacity(rows.len());
    let mut index: HashMap<DbId, usize> = HashMap::with_capacity(rows.len());
    let mut missing: HashMap<DbId, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();

    for row in rows {
        let idx = nodes.len();
        if index.insert(row.id, idx).is_some() {
            return Err(TaxonomyError::DuplicateClass(row.id));
        }

        let children = missing.remove(&row.id).unwrap_or_default();
        let parent_id = row.parent_id;
        nodes.push(TreeNode {
            id: row.id,
            parent_id,
            names: row.names,
            code: row.code,
            children,
        });

        match parent_id {
            None => roots.push(idx),
            Some(pid) => match index.get(&pid) {
                Some(&parent_idx) => nodes[parent_idx].children.push(idx),
                None => missing.entry(pid).or_default().push(idx),
            },
        }
    }

    if let Some((&parent_id, waiting)) = missing.iter().min_by_key(|(pid, _)| **pid) {
        let class_id = waiting
            .iter()
            .map(|&idx| nodes[idx].id)
            .min()
            .unwrap_or_default();
        return Err(TaxonomyError::DanglingParent {
            class_id,
            parent_id,
        });
    }

    let mut reached = vec![false; nodes.len()];
    for &root in &roots {
        for idx in pre_order_from(&nodes, root) {
            reached[idx] = true;
        }
    }
    if reached.iter().any(|r| !r) {
        let mut unreachable: Vec<DbId> = nodes
            .iter()
            .zip(&reached)
            .filter(|(_, r)| !**r)
            .map(|(n, _)| n.id)
            .collect();
        unreachable.sort_unstable();
        return Err(TaxonomyError::Cycle(unreachable));
    }

    let root = *index
        .get(&root_id)
        .ok_or(TaxonomyError::RootNotFound(root_id))?;
    let order = pre_order_from(&nodes, root);
    let members = order.iter().map(|&idx| (nodes[idx].id, idx)).collect();

    Ok(TaxonomyTree {
        nodes,
        members,
        order,
        root,
    })
}

fn pre_order_from(nodes: &[TreeNode], start: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack = vec![start];
    while let Some(idx) = stack.pop() {
        out.push(idx);
        stack.extend(nodes[idx].children.iter().rev().copied());
    }
    out
}

impl TaxonomyTree {
    /// The selected root class.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn root_id(&self) -> DbId {
        self.nodes[self.root].id
    }

    /// Number of classes in the selected subtree.
    pub fn class_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn node(&self, id: DbId) -> Option<&TreeNode> {
        self.members.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Direct children of `id`, in the order their rows were attached.
    pub fn children(&self, id: DbId) -> impl Iterator<Item = &TreeNode> + '_ {
        self.members
            .get(&id)
            .map(|&idx| self.nodes[idx].children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&child| &self.nodes[child])
    }

    /// Ids of `id` and every class below it, in pre-order.
    pub fn descendant_ids(&self, id: DbId) -> Option<Vec<DbId>> {
        let &start = self.members.get(&id)?;
        Some(
            pre_order_from(&self.nodes, start)
                .into_iter()
                .map(|idx| self.nodes[idx].id)
                .collect(),
        )
    }

    /// Every class of the selected subtree in pre-order (root first).
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.order.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Every class of the selected subtree with children before parents.
    pub fn post_order(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.post_order_indices()
            .into_iter()
            .map(move |idx| &self.nodes[idx])
    }

    fn post_order_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.order.len());
        let mut stack: Vec<(usize, bool)> = vec![(self.root, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                out.push(idx);
                continue;
            }
            stack.push((idx, true));
            for &child in self.nodes[idx].children.iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    /// Map of classification code to class id within the subtree.
    pub fn code_index(&self) -> HashMap<&str, DbId> {
        self.iter().map(|n| (n.code.as_str(), n.id)).collect()
    }

    /// Build the nested, serializable form of the subtree.
    pub fn to_nested(&self) -> TaxonomyNode {
        let mut stack: Vec<TaxonomyNode> = Vec::new();
        for idx in self.post_order_indices() {
            let node = &self.nodes[idx];
            let split = stack.len() - node.children.len();
            let mut children = stack.split_off(split);
            children.sort_by(|a, b| a.code.cmp(&b.code));
            stack.push(nested_node(node, children));
        }
        stack
            .pop()
            .unwrap_or_else(|| nested_node(self.root(), Vec::new()))
    }
}

/// Ids of the rows without a parent, sorted.
pub fn root_ids(rows: &[TaxonomyRow]) -> Vec<DbId> {
    let mut roots: Vec<DbId> = rows
        .iter()
        .filter(|r| r.parent_id.is_none())
        .map(|r| r.id)
        .collect();
    roots.sort_unstable();
    roots
}

/// Pick the root a request operates on.
///
/// An explicit `requested` id is used as-is (tree assembly reports it when
/// unknown). Without one, the taxonomy must have exactly one root.
pub fn select_root(rows: &[TaxonomyRow], requested: Option<DbId>) -> Result<DbId, CoreError> {
    if let Some(id) = requested {
        return Ok(id);
    }
    match root_ids(rows).as_slice() {
        [only] => Ok(*only),
        [] => Err(CoreError::Validation("Taxonomy has no classes".to_string())),
        many => Err(CoreError::Validation(format!(
            "Taxonomy has {} roots; specify root_id",
            many.len()
        ))),
    }
}

fn nested_node(node: &TreeNode, children: Vec<TaxonomyNode>) -> TaxonomyNode {
    TaxonomyNode {
        id: node.id,
        parent_id: node.parent_id,
        code: node.code.clone(),
        names: node.names.clone(),
        children,
    }
}
