//! Walking up from a starting folder until a fetch produces something usable.

use crate::error::Result;
use crate::repository::NodeRepository;
use adoquery::v1::QueryNode;
use adoquery::v1::query::has_query_tree;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tracing::debug;

/// What a fallback run produced and where.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome<T> {
    pub result: T,
    /// The folder `result` was built from.
    pub used_folder: QueryNode,
    /// False when no folder in the chain passed validation and `result` is
    /// the last candidate's.
    pub satisfied: bool,
}

/// Default validator: does the serialized result hold any query tree?
pub fn has_any_query_tree<T: Serialize>(result: &T) -> bool {
    serde_json::to_value(result).is_ok_and(|value| has_query_tree(&value))
}

/// Ancestors of the node with id `target`, from that node up to `root`.
///
/// Depth-first from `root`, loading children on the way. Nodes without an
/// id are walked too, keyed by their position in the walk. Returns `None`
/// when `target` is not reachable.
async fn path_to(
    repo: &NodeRepository,
    root: &QueryNode,
    target: &str,
) -> Result<Option<Vec<QueryNode>>> {
    // walk key -> (loaded node, parent walk key)
    let mut seen: HashMap<String, (QueryNode, Option<String>)> = HashMap::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), None::<String>)];
    let mut position = 0usize;

    while let Some((node, parent)) = stack.pop() {
        position += 1;
        let key = match node.id.as_deref() {
            Some(id) => format!("id:{id}"),
            None => format!("pos:{position}"),
        };
        if !visited.insert(key.clone()) {
            continue;
        }
        let found = node.id.as_deref() == Some(target);
        let node = repo.ensure_children(&node).await?;
        for child in node.children().iter().rev() {
            stack.push((child.clone(), Some(key.clone())));
        }
        seen.insert(key.clone(), (node, parent));

        if found {
            let mut path = Vec::new();
            let mut cursor = Some(key);
            while let Some(key) = cursor
                && let Some((node, parent)) = seen.remove(&key)
            {
                path.push(node);
                cursor = parent;
            }
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Has `node` already been placed in `chain`? By id when it has one,
/// otherwise by content.
fn in_chain(chain: &[QueryNode], node: &QueryNode) -> bool {
    match node.id.as_deref() {
        Some(id) => chain.iter().any(|n| n.id.as_deref() == Some(id)),
        None => chain.iter().any(|n| n.id.is_none() && n == node),
    }
}

/// Folders to try, in order: `starting`, each of its ancestors, `root`.
///
/// When `starting` has no id or cannot be found below `root` the chain is
/// just `[starting, root]`. Nodes appear once.
pub async fn build_fallback_chain(
    repo: &NodeRepository,
    root: &QueryNode,
    starting: &QueryNode,
) -> Result<Vec<QueryNode>> {
    let path = match starting.id.as_deref() {
        Some(id) => path_to(repo, root, id).await?,
        None => None,
    };
    // either way the candidates end with the root
    let candidates = path.unwrap_or_else(|| vec![starting.clone(), root.clone()]);

    let mut chain: Vec<QueryNode> = Vec::with_capacity(candidates.len());
    for node in candidates {
        if !in_chain(&chain, &node) {
            chain.push(node);
        }
    }
    Ok(chain)
}

/// Runs `fetch` on each folder of the fallback chain until `validate`
/// accepts a result.
///
/// Every candidate is loaded before `fetch` sees it. If nothing passes, the
/// last candidate's result is returned with `satisfied = false`. Errors
/// from loading or from `fetch` end the run.
pub async fn fetch_with_ancestor_fallback<T, F, Fut, V>(
    repo: &NodeRepository,
    root: &QueryNode,
    starting: &QueryNode,
    mut fetch: F,
    validate: V,
) -> Result<FallbackOutcome<T>>
where
    T: Default,
    F: FnMut(QueryNode) -> Fut,
    Fut: Future<Output = Result<T>>,
    V: Fn(&T) -> bool,
{
    let chain = build_fallback_chain(repo, root, starting).await?;
    let mut last = None;

    for candidate in chain {
        let candidate = repo.ensure_children(&candidate).await?;
        let result = fetch(candidate.clone()).await?;
        let satisfied = validate(&result);
        debug!(folder = %candidate.name, satisfied, "fallback candidate tried");

        let outcome = FallbackOutcome {
            result,
            used_folder: candidate,
            satisfied,
        };
        if satisfied {
            return Ok(outcome);
        }
        last = Some(outcome);
    }

    Ok(last.unwrap_or_else(|| FallbackOutcome {
        result: T::default(),
        used_folder: root.clone(),
        satisfied: false,
    }))
}
