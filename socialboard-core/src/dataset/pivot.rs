//! Tree transpose keyed by dimension identity
//!
//! A tree is flattened into cells, each cell being the `(dimension, value)`
//! path to one count. Pivoting sorts every path by the position of its
//! dimensions in the requested order and rebuilds the tree from the sorted
//! paths, so every count keeps its exact set of dimension values.

use super::tree::{Breakdown, Count, Measure, Node, Tree};
use crate::dimension::DimensionCollection;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// One count and the dimension values leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell<'a> {
    pub measure: Measure,
    pub path: Vec<(&'a str, &'a str)>,
    pub count: Count,
}

pub(crate) fn flatten(tree: &Tree) -> Vec<Cell<'_>> {
    let mut cells = Vec::new();
    let mut path = Vec::new();
    for (measure, node) in &tree.measures {
        flatten_node(*measure, node, &mut path, &mut cells);
    }
    cells
}

fn flatten_node<'a>(
    measure: Measure,
    node: &'a Node,
    path: &mut Vec<(&'a str, &'a str)>,
    cells: &mut Vec<Cell<'a>>,
) {
    if let Some(count) = node.count {
        cells.push(Cell {
            measure,
            path: path.clone(),
            count,
        });
    }
    for breakdown in &node.breakdowns {
        for (member, child) in &breakdown.members {
            path.push((breakdown.target.as_str(), member.as_str()));
            flatten_node(measure, child, path, cells);
            path.pop();
        }
    }
}

/// Check that every breakdown under `node` names a dimension of `dimensions`
/// and that breakdowns nest in the collection's order.
pub(crate) fn check_nesting(
    node: &Node,
    dimensions: &DimensionCollection,
    min_position: usize,
) -> Result<()> {
    for breakdown in &node.breakdowns {
        let position = dimensions.position(&breakdown.target).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "data is broken down by {} which is not one of [{}]",
                breakdown.target,
                dimensions.targets().join(", ")
            ))
        })?;
        if position < min_position {
            return Err(Error::InvalidArgument(format!(
                "dimension {} is nested out of order for [{}]",
                breakdown.target,
                dimensions.targets().join(", ")
            )));
        }
        for child in breakdown.members.values() {
            check_nesting(child, dimensions, position + 1)?;
        }
    }
    Ok(())
}

/// Rebuild `tree` nested in the order of `order`.
///
/// Dimensions of the tree that are missing from `order` are dropped together
/// with every count below them. A dropped dimension that still has branches
/// nested above a retained one cannot be removed without aggregating, so that
/// case fails.
pub(crate) fn reorder(tree: &Tree, order: &DimensionCollection) -> Result<Tree> {
    let positions: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(position, d)| (d.target(), position))
        .collect();

    let mut rebuilt = Tree::default();
    for measure in tree.measures.keys() {
        rebuilt.measures.entry(*measure).or_default();
    }

    for cell in flatten(tree) {
        let mut segments = Vec::with_capacity(cell.path.len());
        let mut dropped = None;
        for (target, value) in cell.path {
            match positions.get(target) {
                Some(&position) => {
                    if let Some(dropped) = dropped {
                        return Err(Error::IncompatibleDimensions(format!(
                            "cannot drop {} because it is nested above {}",
                            dropped, target
                        )));
                    }
                    segments.push((position, target, value));
                }
                None => {
                    dropped.get_or_insert(target);
                }
            }
        }
        if dropped.is_some() {
            continue;
        }

        segments.sort_by_key(|(position, _, _)| *position);
        let root = rebuilt.measures.entry(cell.measure).or_default();
        insert(root, &segments, cell.count, &positions);
    }

    Ok(rebuilt)
}

fn insert(
    node: &mut Node,
    segments: &[(usize, &str, &str)],
    count: Count,
    positions: &HashMap<&str, usize>,
) {
    let Some(((position, target, value), rest)) = segments.split_first() else {
        node.count = Some(count);
        return;
    };

    let index = match node.breakdowns.iter().position(|b| b.target == *target) {
        Some(index) => index,
        None => {
            // Sibling breakdowns stay sorted by nesting position
            let index = node
                .breakdowns
                .iter()
                .take_while(|b| {
                    positions
                        .get(b.target.as_str())
                        .is_some_and(|p| p < position)
                })
                .count();
            node.breakdowns.insert(index, Breakdown::new(*target));
            index
        }
    };

    let child = node.breakdowns[index]
        .members
        .entry((*value).to_string())
        .or_default();
    insert(child, rest, count, positions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use serde_json::json;

    fn dims(targets: &[&str]) -> DimensionCollection {
        DimensionCollection::from_dimensions(targets.iter().map(|t| Dimension::new(*t))).unwrap()
    }

    #[test]
    fn test_flatten_collects_every_count() {
        let tree = Tree::from_value(&json!({
            "measure:interactions": {
                "%VALUE%": 10, "%REDACTED%": false,
                "dimension:a": {
                    "x": {"%VALUE%": 4, "%REDACTED%": false},
                    "y": {"%VALUE%": 6, "%REDACTED%": true}
                }
            }
        }))
        .unwrap();

        let cells = flatten(&tree);
        assert_eq!(cells.len(), 3);
        assert!(cells[0].path.is_empty());
        assert_eq!(cells[2].path, vec![("a", "y")]);
        assert!(cells[2].count.redacted);
    }

    #[test]
    fn test_check_nesting_rejects_wrong_order() {
        let tree = Tree::from_value(&json!({
            "measure:interactions": {
                "dimension:b": {
                    "1": {"dimension:a": {"x": {"%VALUE%": 1, "%REDACTED%": false}}}
                }
            }
        }))
        .unwrap();
        let root = tree.measure(Measure::Interactions).unwrap();

        assert!(check_nesting(root, &dims(&["b", "a"]), 0).is_ok());
        assert!(check_nesting(root, &dims(&["a", "b"]), 0).is_err());
        assert!(check_nesting(root, &dims(&["b"]), 0).is_err());
    }

    #[test]
    fn test_reorder_single_dimension_is_identity() {
        let tree = Tree::from_value(&json!({
            "measure:unique_authors": {
                "%VALUE%": 3, "%REDACTED%": false,
                "dimension:a": {"x": {"%VALUE%": 3, "%REDACTED%": false}}
            }
        }))
        .unwrap();

        assert_eq!(reorder(&tree, &dims(&["a"])).unwrap(), tree);
    }

    #[test]
    fn test_reorder_empty_tree() {
        let tree = Tree::default();
        assert_eq!(reorder(&tree, &dims(&[])).unwrap(), tree);
    }
}
