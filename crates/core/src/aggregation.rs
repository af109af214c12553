//! Bottom-up annotation counts over a taxonomy tree.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::taxonomy::TaxonomyTree;
use crate::types::DbId;

/// Fold direct per-class counts up through `tree`.
///
/// The result holds every class of the subtree: its own direct count plus
/// the totals of all its children. Classes without annotations get zero.
/// Counts for ids outside the tree are ignored.
pub fn aggregate(tree: &TaxonomyTree, counts: &HashMap<DbId, i64>) -> BTreeMap<DbId, i64> {
    let mut totals: BTreeMap<DbId, i64> = BTreeMap::new();
    for node in tree.post_order() {
        let direct = counts.get(&node.id).copied().unwrap_or(0);
        let below: i64 = tree
            .children(node.id)
            .map(|child| totals.get(&child.id).copied().unwrap_or(0))
            .sum();
        totals.insert(node.id, direct + below);
    }
    totals
}

/// Per-class statistics row returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub names: BTreeMap<String, String>,
    /// Annotations labelled with exactly this class.
    pub direct: i64,
    /// Annotations labelled with this class or any class below it.
    pub total: i64,
}

/// Direct and aggregated counts for every class of `tree`, root first.
pub fn class_counts(tree: &TaxonomyTree, counts: &HashMap<DbId, i64>) -> Vec<ClassCount> {
    let totals = aggregate(tree, counts);
    tree.iter()
        .map(|node| ClassCount {
            class_id: node.id,
            parent_id: node.parent_id,
            code: node.code.clone(),
            names: node.names.clone(),
            direct: counts.get(&node.id).copied().unwrap_or(0),
            total: totals.get(&node.id).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{build_tree, TaxonomyRow};

    fn row(id: DbId, parent_id: Option<DbId>) -> TaxonomyRow {
        TaxonomyRow {
            id,
            parent_id,
            names: BTreeMap::from([("en".to_string(), format!("Class {id}"))]),
            code: format!("C{id}"),
        }
    }

    fn scenario_tree() -> TaxonomyTree {
        build_tree(
            vec![row(3, Some(2)), row(9, Some(1)), row(1, None), row(2, Some(1))],
            1,
        )
        .unwrap()
    }

    #[test]
    fn leaf_counts_roll_up_to_root() {
        let counts = HashMap::from([(3, 20), (9, 15)]);
        let totals = aggregate(&scenario_tree(), &counts);
        assert_eq!(totals, BTreeMap::from([(1, 35), (2, 20), (3, 20), (9, 15)]));
    }

    #[test]
    fn internal_direct_counts_are_included() {
        let counts = HashMap::from([(1, 1), (2, 4), (3, 20)]);
        let totals = aggregate(&scenario_tree(), &counts);
        assert_eq!(totals[&2], 24);
        assert_eq!(totals[&1], 25);
        assert_eq!(totals[&9], 0);
    }

    #[test]
    fn root_total_equals_sum_of_direct_counts() {
        let rows: Vec<TaxonomyRow> = (1..=40)
            .map(|id| row(id, if id == 1 { None } else { Some(id / 2) }))
            .collect();
        let tree = build_tree(rows, 1).unwrap();
        let counts: HashMap<DbId, i64> = (1..=40).map(|id| (id, id * 3 % 7)).collect();
        let totals = aggregate(&tree, &counts);
        assert_eq!(totals[&1], counts.values().sum::<i64>());
        assert_eq!(totals.len(), 40);
    }

    #[test]
    fn counts_outside_tree_are_ignored() {
        let counts = HashMap::from([(3, 2), (99, 1000)]);
        let totals = aggregate(&scenario_tree(), &counts);
        assert_eq!(totals[&1], 2);
        assert!(!totals.contains_key(&99));
    }

    #[test]
    fn empty_counts_give_zeroes() {
        let totals = aggregate(&scenario_tree(), &HashMap::new());
        assert_eq!(totals.len(), 4);
        assert!(totals.values().all(|&v| v == 0));
    }

    #[test]
    fn subtree_aggregation_only_covers_subtree() {
        let tree = build_tree(
            vec![row(1, None), row(2, Some(1)), row(3, Some(2)), row(9, Some(1))],
            2,
        )
        .unwrap();
        let totals = aggregate(&tree, &HashMap::from([(3, 20), (9, 15)]));
        assert_eq!(totals, BTreeMap::from([(2, 20), (3, 20)]));
    }

    #[test]
    fn class_counts_report_direct_and_total() {
        let counts = HashMap::from([(3, 20), (9, 15)]);
        let rows = class_counts(&scenario_tree(), &counts);
        assert_eq!(rows[0].class_id, 1);
        assert_eq!(rows[0].direct, 0);
        assert_eq!(rows[0].total, 35);
        let nine = rows.iter().find(|r| r.class_id == 9).unwrap();
        assert_eq!((nine.direct, nine.total), (15, 15));
    }
}
