//! Lazy loading of query-node children.

use crate::error::{DocsError, Result};
use adoquery::v1::QueryNode;
use adoquery_fetch::{ContentFetcher, Endpoints, expand_url};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Loads children and work-item details on demand.
///
/// Expansion never mutates the caller's node: [`ensure_children`] returns an
/// enriched copy and remembers it by node id, so a folder reachable from two
/// traversals is fetched once per repository. Create one repository per
/// top-level request; nothing is shared between repositories.
///
/// [`ensure_children`]: NodeRepository::ensure_children
pub struct NodeRepository {
    fetcher: Arc<dyn ContentFetcher>,
    endpoints: Endpoints,
    expanded: Mutex<HashMap<String, QueryNode>>,
}

impl std::fmt::Debug for NodeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRepository")
            .field("endpoints", &self.endpoints)
            .field("expanded", &self.expanded_count())
            .finish()
    }
}

impl NodeRepository {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, endpoints: Endpoints) -> Self {
        Self {
            fetcher,
            endpoints,
            expanded: Mutex::new(HashMap::new()),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Number of distinct nodes expanded through this repository.
    pub fn expanded_count(&self) -> usize {
        self.expanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn remembered(&self, id: &str) -> Option<QueryNode> {
        self.expanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remember(&self, id: &str, node: &QueryNode) {
        self.expanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), node.clone());
    }

    /// Returns `node` with its children loaded.
    ///
    /// Nodes without children, nodes whose children are already present and
    /// nodes without a `url` come back unchanged without any request. Other
    /// nodes are fetched from `{url}?$depth=2&$expand=all` and the response
    /// is overlaid field by field onto a copy of `node`.
    pub async fn ensure_children(&self, node: &QueryNode) -> Result<QueryNode> {
        if !node.needs_expansion() {
            return Ok(node.clone());
        }
        if let Some(id) = node.id.as_deref()
            && let Some(known) = self.remembered(id)
        {
            return Ok(known);
        }
        let Some(node_url) = node.url.as_deref() else {
            debug!(name = %node.name, "node has unloaded children but no url");
            return Ok(node.clone());
        };

        let url = expand_url(node_url);
        debug!(name = %node.name, %url, "expanding query node");
        let patch = self.fetcher.fetch_json(&url).await?;
        let enriched = node
            .overlaid(&patch)
            .map_err(|source| DocsError::Decode { url, source })?;

        if let Some(id) = node.id.as_deref() {
            self.remember(id, &enriched);
        }
        Ok(enriched)
    }

    /// Fetches the type of work item `id`, or `None` if the item is gone.
    pub async fn work_item_type(&self, id: &str) -> Result<Option<String>> {
        let url = self.endpoints.work_item_type_url(id)?;
        let item = match self.fetcher.fetch_json(&url).await {
            Ok(item) => item,
            Err(e) if e.is_not_found() => {
                warn!(%id, "work item referenced by query not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(item
            .get("fields")
            .and_then(|fields| fields.get("System.WorkItemType"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
