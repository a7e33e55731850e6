//! Pure traversal helpers over loaded query hierarchies and output trees.

use crate::types::{QueryNode, TreeOutputNode};
use serde_json::Value;

/// Ids of every leaf in `tree`, depth-first, in child order.
///
/// # Examples
///
/// ```
/// use adoquery::v1::{QueryNode, QueryType, TreeOutputNode, query};
///
/// let q1 = QueryNode::query("q1", "A", QueryType::OneHop, "");
/// let q2 = QueryNode::query("q2", "B", QueryType::OneHop, "");
/// let sub = TreeOutputNode::folder(
///     &QueryNode::folder("f2", "Sub", vec![]),
///     Some("f1".into()),
///     vec![TreeOutputNode::leaf(&q2, Some("f2".into()))],
/// );
/// let root = TreeOutputNode::folder(
///     &QueryNode::folder("f1", "Root", vec![]),
///     None,
///     vec![TreeOutputNode::leaf(&q1, Some("f1".into())), sub],
/// );
///
/// assert_eq!(query::leaf_ids(&root), vec!["q1", "q2"]);
/// ```
pub fn leaf_ids(tree: &TreeOutputNode) -> Vec<&str> {
    let mut ids = Vec::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        match &node.children {
            Some(children) => stack.extend(children.iter().rev()),
            None => ids.push(node.id.as_str()),
        }
    }

    ids
}

/// Number of leaves in `tree`.
pub fn count_leaves(tree: &TreeOutputNode) -> usize {
    leaf_ids(tree).len()
}

/// Breadth-first lookup of a node by id among already-loaded nodes.
pub fn find_by_id<'a>(root: &'a QueryNode, id: &str) -> Option<&'a QueryNode> {
    let mut queue = std::collections::VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        if node.id.as_deref() == Some(id) {
            return Some(node);
        }
        queue.extend(node.children());
    }

    None
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Does `value` contain anything a document could be generated from?
///
/// Scans the whole JSON value recursively and answers `true` on the first
/// object that carries a truthy `isValidQuery`, `wiql` or `queryType`, or a
/// non-empty `roots` / `children` array.
pub fn has_query_tree(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(has_query_tree),
        Value::Object(map) => {
            let marks_query = ["isValidQuery", "wiql", "queryType"]
                .iter()
                .any(|key| map.get(*key).is_some_and(is_truthy));
            if marks_query {
                return true;
            }
            let has_nodes = ["roots", "children"].iter().any(|key| {
                map.get(*key)
                    .and_then(Value::as_array)
                    .is_some_and(|items| !items.is_empty())
            });
            has_nodes || map.values().any(has_query_tree)
        }
        _ => false,
    }
}
