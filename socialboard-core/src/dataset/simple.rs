//! Scalar views for chart generators

use super::tree::{Measure, Node, Tree};
use std::collections::BTreeMap;

/// Map every leaf under `measure` (or under all measures) to its bare value.
///
/// Keys are the dimension values along the path joined with `:`. Without a
/// measure filter the measure name is the first key segment. A measure with no
/// breakdown at all is keyed by its own name.
pub(crate) fn simplify(tree: &Tree, measure: Option<Measure>) -> BTreeMap<String, u64> {
    let mut simple = BTreeMap::new();
    let mut path = Vec::new();

    for (current, node) in &tree.measures {
        if measure.is_some_and(|m| m != *current) {
            continue;
        }
        if measure.is_none() {
            path.push(current.as_str());
        }
        collect_leaves(node, current.as_str(), &mut path, &mut simple);
        path.clear();
    }

    simple
}

fn collect_leaves<'a>(
    node: &'a Node,
    fallback_key: &str,
    path: &mut Vec<&'a str>,
    simple: &mut BTreeMap<String, u64>,
) {
    if node.is_leaf() {
        if let Some(count) = node.count {
            let key = if path.is_empty() {
                fallback_key.to_string()
            } else {
                path.join(":")
            };
            simple.insert(key, count.value);
        }
        return;
    }

    for breakdown in &node.breakdowns {
        for (member, child) in &breakdown.members {
            path.push(member.as_str());
            collect_leaves(child, fallback_key, path, simple);
            path.pop();
        }
    }
}
