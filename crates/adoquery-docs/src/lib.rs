#![doc = include_str!("../README.md")]

pub mod builder;
pub mod doctype;
pub mod error;
pub mod fallback;
pub mod locator;
pub mod orchestrator;
pub mod payload;
pub mod repository;

pub use builder::{LeafRule, QueryTreeBuilder};
pub use doctype::{BranchConfig, BranchId, DocType, Validator};
pub use error::{DocsError, Result};
pub use fallback::{
    FallbackOutcome, build_fallback_chain, fetch_with_ancestor_fallback, has_any_query_tree,
};
pub use locator::{
    find_child_by_candidate_names, find_child_by_exact_name, find_folder_by_exact_name,
    find_folder_by_id,
};
pub use orchestrator::{BranchOutcome, DocTypeOrchestrator};
pub use payload::{
    ResolutionInfo, SharedQueries, SrsQueries, StdQueries, StrQueries, SvdQueries,
    TestReporterQueries,
};
pub use repository::NodeRepository;

use adoquery::v1::QueryNode;
use adoquery_fetch::{ContentFetcher, Endpoints};
use std::sync::Arc;

/// Entry point for building document query trees from a project.
///
/// Every call works on its own [`NodeRepository`], so nothing loaded for one
/// document type is reused by the next.
///
/// # Example
///
/// ```rust,no_run
/// use adoquery_docs::{AdoQueries, DocType};
/// use adoquery_fetch::{Endpoints, HttpFetcher};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(std::env::var("ADO_PAT")?)?;
/// let endpoints = Endpoints::new("https://dev.azure.com/contoso").with_project("Flight");
/// let queries = AdoQueries::new(Arc::new(fetcher), endpoints);
///
/// let std_trees = queries.shared_queries(DocType::Std).await?;
/// println!("{}", serde_json::to_string_pretty(&std_trees)?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AdoQueries {
    fetcher: Arc<dyn ContentFetcher>,
    endpoints: Endpoints,
}

impl std::fmt::Debug for AdoQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdoQueries")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl AdoQueries {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetches the project's "Shared Queries" folder.
    pub async fn query_root(&self) -> Result<QueryNode> {
        let url = self.endpoints.shared_queries_url()?;
        let value = self.fetcher.fetch_json(&url).await?;
        serde_json::from_value(value).map_err(|source| DocsError::Decode { url, source })
    }

    /// Fetches the shared queries and builds `doc_type`'s trees from them.
    pub async fn shared_queries(&self, doc_type: DocType) -> Result<SharedQueries> {
        let root = self.query_root().await?;
        self.shared_queries_from(&root, doc_type).await
    }

    /// Builds `doc_type`'s trees from an already fetched hierarchy. Folders
    /// that were not loaded yet are fetched as needed.
    pub async fn shared_queries_from(
        &self,
        root: &QueryNode,
        doc_type: DocType,
    ) -> Result<SharedQueries> {
        let repo = NodeRepository::new(self.fetcher.clone(), self.endpoints.clone());
        DocTypeOrchestrator::new(&repo).run(root, doc_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoquery::v1::query::leaf_ids;
    use adoquery_fetch::mock::MockFetcher;
    use serde_json::json;

    const ROOT_URL: &str = "https://dev.azure.com/contoso/Flight/_apis/wit/queries/Shared%20Queries?$depth=2&$expand=all&api-version=7.1";

    fn shared_queries_payload() -> serde_json::Value {
        json!({
            "id": "root",
            "name": "Shared Queries",
            "isFolder": true,
            "hasChildren": true,
            "children": [
                {
                    "id": "svd",
                    "name": "SVD",
                    "isFolder": true,
                    "hasChildren": true,
                    "children": [
                        {"id": "overview", "name": "Overview", "queryType": "tree",
                         "wiql": "SELECT [System.Id] FROM WorkItemLinks WHERE [System.WorkItemType] = 'Epic'"},
                        {"id": "bugs", "name": "Known Bugs", "queryType": "flat",
                         "wiql": "SELECT [System.Id] FROM WorkItems WHERE [System.WorkItemType] = 'Bug'"}
                    ]
                }
            ]
        })
    }

    fn ado_queries(fetcher: MockFetcher) -> (Arc<MockFetcher>, AdoQueries) {
        let fetcher = Arc::new(fetcher);
        let endpoints = Endpoints::new("https://dev.azure.com/contoso").with_project("Flight");
        (fetcher.clone(), AdoQueries::new(fetcher, endpoints))
    }

    #[tokio::test]
    async fn test_shared_queries_end_to_end() {
        let (fetcher, queries) =
            ado_queries(MockFetcher::new().with_response(ROOT_URL, shared_queries_payload()));

        let payload = queries.shared_queries(DocType::Svd).await.unwrap();
        let SharedQueries::Svd(svd) = payload else {
            panic!("expected svd payload");
        };
        assert_eq!(
            leaf_ids(svd.system_overview_query_tree.as_ref().unwrap()),
            vec!["overview"]
        );
        assert_eq!(
            leaf_ids(svd.known_bugs_query_tree.as_ref().unwrap()),
            vec!["bugs"]
        );
        assert_eq!(svd.info.used_folders["systemOverview"], "SVD");
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_query_root_errors() {
        let (_fetcher, queries) =
            ado_queries(MockFetcher::new().with_response(ROOT_URL, json!({"name": 42})));
        let err = queries.query_root().await.unwrap_err();
        assert!(matches!(err, DocsError::Decode { .. }));

        let (_fetcher, queries) = ado_queries(MockFetcher::new());
        let err = queries.query_root().await.unwrap_err();
        assert!(matches!(err, DocsError::Fetch(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_each_call_gets_fresh_repository() {
        let url = "https://dev.azure.com/contoso/Flight/_apis/wit/queries/svd";
        let (fetcher, queries) = ado_queries(MockFetcher::new().with_response(
            adoquery_fetch::expand_url(url),
            json!({"children": []}),
        ));
        let root = QueryNode::folder(
            "root",
            "Shared Queries",
            vec![QueryNode::unloaded_folder("svd", "SVD", url)],
        );

        queries.shared_queries_from(&root, DocType::Svd).await.unwrap();
        queries.shared_queries_from(&root, DocType::Svd).await.unwrap();
        assert_eq!(fetcher.calls_to(&adoquery_fetch::expand_url(url)), 2);
    }
}
