use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Query hierarchy (input)
// ============================================================================

/// Shape of a saved query leaf.
///
/// Azure DevOps reports these as `"flat"`, `"tree"` and `"oneHop"`. Anything
/// else deserializes to [`QueryType::Unknown`] so a new server-side shape
/// never breaks parsing of the whole hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    Flat,
    Tree,
    OneHop,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Flat => write!(f, "flat"),
            QueryType::Tree => write!(f, "tree"),
            QueryType::OneHop => write!(f, "oneHop"),
            QueryType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(QueryType::Flat),
            "tree" => Ok(QueryType::Tree),
            "onehop" | "one-hop" => Ok(QueryType::OneHop),
            _ => Err(format!("Invalid query type: {}", s)),
        }
    }
}

/// A result column declared by a saved query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default)]
    pub reference_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One saved query or query folder, as returned by `_apis/wit/queries`.
///
/// `children` is `None` until loaded. A folder (or query) reporting
/// `has_children = true` with no `children` has to be expanded through its
/// `url` before it can be walked; leaves deeper than the fetched depth may
/// also be missing `wiql` and `columns` until then.
///
/// Fields the library does not interpret are preserved in `extra` so that a
/// node survives a serialize/overlay round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub is_folder: bool,

    #[serde(default)]
    pub has_children: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<QueryNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiql: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl QueryNode {
    /// A folder with already-loaded children.
    pub fn folder(id: impl Into<String>, name: impl Into<String>, children: Vec<QueryNode>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            is_folder: true,
            has_children: !children.is_empty(),
            children: Some(children),
            ..Default::default()
        }
    }

    /// A folder whose children still have to be fetched from `url`.
    pub fn unloaded_folder(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            is_folder: true,
            has_children: true,
            children: None,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// A query leaf carrying its WIQL text.
    pub fn query(
        id: impl Into<String>,
        name: impl Into<String>,
        query_type: QueryType,
        wiql: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            query_type: Some(query_type),
            wiql: Some(wiql.into()),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Loaded children, or an empty slice when none are present yet.
    pub fn children(&self) -> &[QueryNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// True when the node advertises children that have not been loaded.
    pub fn needs_expansion(&self) -> bool {
        self.has_children && self.children.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_folder
    }

    /// Case-insensitive comparison against the node's name.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Identifier used when building output trees; falls back to the name
    /// for hand-built nodes without an id.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Returns a copy of this node with every top-level field of `patch`
    /// assigned over it (a shallow overlay).
    ///
    /// Fields present only on `self` are kept; fields present in `patch`
    /// replace the local value wholesale, including `children`.
    pub fn overlaid(&self, patch: &Value) -> serde_json::Result<QueryNode> {
        let mut base = serde_json::to_value(self)?;
        if let (Value::Object(base_map), Value::Object(patch_map)) = (&mut base, patch) {
            for (key, value) in patch_map {
                base_map.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base)
    }
}

// ============================================================================
// Document trees (output)
// ============================================================================

/// Node of a forward or reverse tree handed to document renderers.
///
/// Folders carry `children`; leaves carry `query_type`, `wiql` and
/// `is_valid_query = true`. A folder only exists when at least one of its
/// descendants is a matching leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOutputNode {
    pub id: String,

    #[serde(rename = "pId")]
    pub p_id: Option<String>,

    pub value: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiql: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_valid_query: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeOutputNode>>,
}

impl TreeOutputNode {
    /// Folder node mirroring `source`, wrapping already-built children.
    pub fn folder(source: &QueryNode, p_id: Option<String>, children: Vec<TreeOutputNode>) -> Self {
        Self {
            id: source.key().to_string(),
            p_id,
            value: source.name.clone(),
            title: source.name.clone(),
            query_type: None,
            wiql: None,
            is_valid_query: false,
            children: Some(children),
        }
    }

    /// Leaf node for a query that passed classification.
    pub fn leaf(source: &QueryNode, p_id: Option<String>) -> Self {
        Self {
            id: source.key().to_string(),
            p_id,
            value: source.name.clone(),
            title: source.name.clone(),
            query_type: source.query_type,
            wiql: source.wiql.clone(),
            is_valid_query: true,
            children: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[TreeOutputNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// The forward (`tree1`) and reverse (`tree2`) trees produced from one walk
/// of a query hierarchy. Either side is `None` when nothing matched it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreePair {
    pub tree1: Option<TreeOutputNode>,
    pub tree2: Option<TreeOutputNode>,
}

impl TreePair {
    pub fn is_empty(&self) -> bool {
        self.tree1.is_none() && self.tree2.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_node_deserializes_rest_payload() {
        let payload = json!({
            "id": "f1",
            "name": "Shared Queries",
            "path": "Shared Queries",
            "isFolder": true,
            "hasChildren": true,
            "isPublic": true,
            "_links": {"self": {"href": "https://x"}},
            "url": "https://dev.azure.com/org/proj/_apis/wit/queries/f1",
            "children": [
                {
                    "id": "q1",
                    "name": "Req to Test",
                    "queryType": "oneHop",
                    "wiql": "SELECT 1",
                    "columns": [{"referenceName": "System.Id", "name": "ID", "url": "https://c"}]
                }
            ]
        });

        let node: QueryNode = serde_json::from_value(payload).unwrap();
        assert_eq!(node.id.as_deref(), Some("f1"));
        assert!(node.is_folder);
        assert!(!node.needs_expansion());
        assert_eq!(node.children().len(), 1);
        let leaf = &node.children()[0];
        assert_eq!(leaf.query_type, Some(QueryType::OneHop));
        assert!(leaf.is_leaf());
        assert_eq!(leaf.columns[0].reference_name, "System.Id");
        assert!(node.extra.contains_key("isPublic"));
    }

    #[test]
    fn test_unknown_query_type() {
        let node: QueryNode =
            serde_json::from_value(json!({"id": "q", "name": "q", "queryType": "matrix"}))
                .unwrap();
        assert_eq!(node.query_type, Some(QueryType::Unknown));
    }

    #[test]
    fn test_needs_expansion() {
        let node = QueryNode::unloaded_folder("f", "Folder", "https://x/f");
        assert!(node.needs_expansion());
        assert!(node.children().is_empty());

        let loaded = QueryNode::folder("f", "Folder", vec![]);
        assert!(!loaded.needs_expansion());
    }

    #[test]
    fn test_overlaid_replaces_and_keeps_fields() {
        let node = QueryNode::unloaded_folder("f", "Folder", "https://x/f");
        let patch = json!({
            "children": [{"id": "c", "name": "Child", "isFolder": true}],
            "path": "Shared Queries/Folder"
        });

        let enriched = node.overlaid(&patch).unwrap();
        assert_eq!(enriched.children().len(), 1);
        assert_eq!(enriched.path.as_deref(), Some("Shared Queries/Folder"));
        assert_eq!(enriched.url.as_deref(), Some("https://x/f"));
        assert!(enriched.has_children);
        // the source node is untouched
        assert!(node.children.is_none());
    }

    #[test]
    fn test_name_matches_case_insensitive() {
        let node = QueryNode::folder("f", "Requirement - Test", vec![]);
        assert!(node.name_matches("requirement - test"));
        assert!(!node.name_matches("requirement"));
    }

    #[test]
    fn test_query_type_from_str() {
        assert_eq!("oneHop".parse::<QueryType>().unwrap(), QueryType::OneHop);
        assert_eq!("FLAT".parse::<QueryType>().unwrap(), QueryType::Flat);
        assert!("matrix".parse::<QueryType>().is_err());
        assert_eq!(QueryType::OneHop.to_string(), "oneHop");
    }

    #[test]
    fn test_tree_output_serialization() {
        let leaf_src = QueryNode::query("q1", "Req to Test", QueryType::OneHop, "SELECT 1");
        let folder_src = QueryNode::folder("f1", "STD", vec![leaf_src.clone()]);
        let leaf = TreeOutputNode::leaf(&leaf_src, Some("f1".into()));
        let folder = TreeOutputNode::folder(&folder_src, None, vec![leaf]);

        let value = serde_json::to_value(&folder).unwrap();
        assert_eq!(value["pId"], Value::Null);
        assert_eq!(value["title"], "STD");
        assert!(value.get("isValidQuery").is_none());
        assert_eq!(value["children"][0]["pId"], "f1");
        assert_eq!(value["children"][0]["isValidQuery"], true);
        assert_eq!(value["children"][0]["queryType"], "oneHop");
        assert!(value["children"][0].get("children").is_none());
    }

    #[test]
    fn test_tree_pair_is_empty() {
        assert!(TreePair::default().is_empty());
        let leaf = QueryNode::query("q", "q", QueryType::Flat, "");
        let pair = TreePair {
            tree1: None,
            tree2: Some(TreeOutputNode::leaf(&leaf, None)),
        };
        assert!(!pair.is_empty());
    }
}
