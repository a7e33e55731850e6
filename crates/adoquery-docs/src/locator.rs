//! Folder lookup by name over a lazily loaded hierarchy.

use crate::error::Result;
use crate::repository::NodeRepository;
use adoquery::v1::QueryNode;
use std::collections::{HashSet, VecDeque};

/// Key used to remember visited nodes. Nodes without an id never collide.
fn visit_key(node: &QueryNode) -> String {
    match &node.id {
        Some(id) => id.clone(),
        None => format!("{}-{}", node.name, rand::random::<u64>()),
    }
}

async fn find_breadth_first<F>(
    repo: &NodeRepository,
    root: &QueryNode,
    matches: F,
) -> Result<Option<QueryNode>>
where
    F: Fn(&QueryNode) -> bool,
{
    let mut queue = VecDeque::from([root.clone()]);
    let mut visited = HashSet::new();

    while let Some(node) = queue.pop_front() {
        if !visited.insert(visit_key(&node)) {
            continue;
        }
        let node = repo.ensure_children(&node).await?;
        if node.is_folder && matches(&node) {
            return Ok(Some(node));
        }
        queue.extend(node.children().iter().cloned());
    }

    Ok(None)
}

/// First folder at or below `root`, breadth-first, whose name equals `name`
/// ignoring case.
pub async fn find_folder_by_exact_name(
    repo: &NodeRepository,
    root: &QueryNode,
    name: &str,
) -> Result<Option<QueryNode>> {
    find_breadth_first(repo, root, |node| node.name_matches(name)).await
}

/// Folder at or below `root` with the given id.
pub async fn find_folder_by_id(
    repo: &NodeRepository,
    root: &QueryNode,
    id: &str,
) -> Result<Option<QueryNode>> {
    find_breadth_first(repo, root, |node| node.id.as_deref() == Some(id)).await
}

/// Direct child folder of `parent` named `name`, ignoring case.
pub async fn find_child_by_exact_name(
    repo: &NodeRepository,
    parent: &QueryNode,
    name: &str,
) -> Result<Option<QueryNode>> {
    let parent = repo.ensure_children(parent).await?;
    Ok(parent
        .children()
        .iter()
        .find(|child| child.is_folder && child.name_matches(name))
        .cloned())
}

/// Best folder below `parent` for any of `candidates`.
///
/// Folders are visited breadth-first starting with `parent`'s direct
/// children. A folder whose name equals a candidate is returned as soon as
/// it is seen, however deep. Only when no folder matches exactly is the
/// first folder whose name contains a candidate returned.
pub async fn find_child_by_candidate_names<S: AsRef<str>>(
    repo: &NodeRepository,
    parent: &QueryNode,
    candidates: &[S],
) -> Result<Option<QueryNode>> {
    let candidates: Vec<String> = candidates
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }

    let parent = repo.ensure_children(parent).await?;
    let mut queue: VecDeque<QueryNode> = parent
        .children()
        .iter()
        .filter(|child| child.is_folder)
        .cloned()
        .collect();
    let mut visited = HashSet::new();
    let mut first_partial = None;

    while let Some(node) = queue.pop_front() {
        if !visited.insert(visit_key(&node)) {
            continue;
        }

        let name = node.name.to_lowercase();
        if candidates.iter().any(|c| *c == name) {
            return Ok(Some(node));
        }
        if first_partial.is_none() && candidates.iter().any(|c| name.contains(c.as_str())) {
            first_partial = Some(node.clone());
        }

        let node = repo.ensure_children(&node).await?;
        queue.extend(
            node.children()
                .iter()
                .filter(|child| child.is_folder)
                .cloned(),
        );
    }

    Ok(first_partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoquery::v1::QueryType;
    use adoquery_fetch::Endpoints;
    use adoquery_fetch::mock::MockFetcher;
    use serde_json::json;
    use std::sync::Arc;

    fn repo(fetcher: MockFetcher) -> NodeRepository {
        NodeRepository::new(Arc::new(fetcher), Endpoints::new("https://dev.azure.com/org"))
    }

    fn leaf(id: &str) -> QueryNode {
        QueryNode::query(id, id, QueryType::OneHop, "")
    }

    /// Root -> {Some Req Folder, Docs -> {Requirement - Test}}
    fn partial_before_exact() -> QueryNode {
        QueryNode::folder(
            "root",
            "Shared Queries",
            vec![
                QueryNode::folder("partial", "Some Req Folder", vec![leaf("q1")]),
                QueryNode::folder(
                    "docs",
                    "Docs",
                    vec![QueryNode::folder("exact", "Requirement - Test", vec![leaf("q2")])],
                ),
            ],
        )
    }

    #[tokio::test]
    async fn test_exact_name_bfs_finds_nested_folder() {
        let repo = repo(MockFetcher::new());
        let root = partial_before_exact();

        let found = find_folder_by_exact_name(&repo, &root, "REQUIREMENT - TEST")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id.as_deref(), Some("exact"));

        let missing = find_folder_by_exact_name(&repo, &root, "STD").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_exact_name_ignores_leaves() {
        let repo = repo(MockFetcher::new());
        let root = QueryNode::folder("root", "Root", vec![leaf("STD")]);
        assert!(
            find_folder_by_exact_name(&repo, &root, "std")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_exact_name_expands_lazily() {
        let url = "https://dev.azure.com/org/proj/_apis/wit/queries/std";
        let fetcher = MockFetcher::new().with_response(
            adoquery_fetch::expand_url(url),
            json!({
                "children": [{"id": "rt", "name": "Req - Test", "isFolder": true, "children": []}]
            }),
        );
        let repo = repo(fetcher);
        let root = QueryNode::folder(
            "root",
            "Shared Queries",
            vec![QueryNode::unloaded_folder("std", "STD", url)],
        );

        let found = find_folder_by_exact_name(&repo, &root, "req - test")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn test_child_by_exact_name_is_not_recursive() {
        let repo = repo(MockFetcher::new());
        let root = partial_before_exact();

        let direct = find_child_by_exact_name(&repo, &root, "docs").await.unwrap();
        assert_eq!(direct.unwrap().id.as_deref(), Some("docs"));

        let nested = find_child_by_exact_name(&repo, &root, "Requirement - Test")
            .await
            .unwrap();
        assert!(nested.is_none());
    }

    #[tokio::test]
    async fn test_exact_candidate_beats_earlier_partial() {
        let repo = repo(MockFetcher::new());
        let root = partial_before_exact();

        let found = find_child_by_candidate_names(&repo, &root, &["requirement - test", "req"])
            .await
            .unwrap();
        assert_eq!(found.unwrap().id.as_deref(), Some("exact"));
    }

    #[tokio::test]
    async fn test_first_partial_wins_without_exact() {
        let repo = repo(MockFetcher::new());
        let root = QueryNode::folder(
            "root",
            "Root",
            vec![
                QueryNode::folder(
                    "a",
                    "A",
                    vec![QueryNode::folder("deep", "Old Req Stuff", vec![])],
                ),
                QueryNode::folder("shallow", "Req Queries", vec![]),
            ],
        );

        let found = find_child_by_candidate_names(&repo, &root, &["req"])
            .await
            .unwrap();
        assert_eq!(found.unwrap().id.as_deref(), Some("shallow"));
    }

    #[tokio::test]
    async fn test_candidates_without_folders() {
        let repo = repo(MockFetcher::new());
        let root = QueryNode::folder("root", "Root", vec![leaf("requirement - test")]);

        let found = find_child_by_candidate_names(&repo, &root, &["requirement - test"])
            .await
            .unwrap();
        assert!(found.is_none());

        let none: [&str; 0] = [];
        assert!(
            find_child_by_candidate_names(&repo, &partial_before_exact(), &none)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_visited_once() {
        let repo = repo(MockFetcher::new());
        let dup = QueryNode::folder("dup", "Other", vec![]);
        let root = QueryNode::folder("root", "Root", vec![dup.clone(), dup]);

        let found = find_child_by_candidate_names(&repo, &root, &["missing"])
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_folder_by_id() {
        let repo = repo(MockFetcher::new());
        let root = partial_before_exact();
        let found = find_folder_by_id(&repo, &root, "docs").await.unwrap();
        assert_eq!(found.unwrap().name, "Docs");
    }
}
