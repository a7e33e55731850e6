//! Forward and reverse document trees from a query hierarchy.

use crate::error::Result;
use crate::repository::NodeRepository;
use adoquery::v1::wiql::{
    self, Scope, matches_area_path_condition, matches_bug_condition,
    matches_flat_area_condition, matches_flat_work_item_type_condition,
    matches_source_target_condition,
};
use adoquery::v1::{QueryNode, QueryType, TreeOutputNode, TreePair};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a leaf query is sorted into the forward and reverse trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LeafRule {
    /// Link queries by source and target work-item type, optionally
    /// narrowed by area path. Forward is source → target, reverse swaps
    /// both the type lists and the area filters.
    SourceTarget {
        sources: Vec<String>,
        targets: Vec<String>,
        #[serde(default)]
        source_area: String,
        #[serde(default)]
        target_area: String,
        /// Also consider `tree` queries.
        #[serde(default)]
        include_tree: bool,
        /// Also consider `flat` queries. A flat query has no link sides, so
        /// it goes forward when its types are among `sources` and reverse
        /// when they are among `targets`, each side with its own area filter.
        #[serde(default)]
        include_flat: bool,
    },
    /// Flat queries listing one of `types`. Forward and reverse differ only
    /// by area filter.
    FlatType {
        types: Vec<String>,
        #[serde(default)]
        forward_area: String,
        #[serde(default)]
        reverse_area: String,
    },
    /// Any query; bug queries go to the reverse tree, the rest forward.
    BugSplit,
    /// Every query of the listed shapes goes to the forward tree.
    AnyLeaf { query_types: Vec<QueryType> },
}

impl LeafRule {
    /// Link-query rule without area filters, one-hop queries only.
    pub fn source_target<S: Into<String>>(
        sources: impl IntoIterator<Item = S>,
        targets: impl IntoIterator<Item = S>,
    ) -> Self {
        LeafRule::SourceTarget {
            sources: sources.into_iter().map(Into::into).collect(),
            targets: targets.into_iter().map(Into::into).collect(),
            source_area: String::new(),
            target_area: String::new(),
            include_tree: false,
            include_flat: false,
        }
    }

    /// Adds area filters to a [`LeafRule::SourceTarget`]; other rules are
    /// returned unchanged.
    pub fn with_areas(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        if let LeafRule::SourceTarget {
            source_area,
            target_area,
            ..
        } = &mut self
        {
            *source_area = source.into();
            *target_area = target.into();
        }
        self
    }

    /// Does this rule look at leaves of the given shape?
    pub fn accepts(&self, query_type: Option<QueryType>) -> bool {
        let Some(query_type) = query_type else {
            return false;
        };
        match self {
            LeafRule::SourceTarget {
                include_tree,
                include_flat,
                ..
            } => match query_type {
                QueryType::OneHop => true,
                QueryType::Tree => *include_tree,
                QueryType::Flat => *include_flat,
                QueryType::Unknown => false,
            },
            LeafRule::FlatType { .. } => query_type == QueryType::Flat,
            LeafRule::BugSplit => matches!(
                query_type,
                QueryType::Flat | QueryType::Tree | QueryType::OneHop
            ),
            LeafRule::AnyLeaf { query_types } => query_types.contains(&query_type),
        }
    }
}

/// Walks a hierarchy and keeps the leaves a [`LeafRule`] selects.
///
/// Output folders mirror input folders and exist only on the side where
/// something below them matched. Folders named in the exclusion list are
/// skipped along with everything under them.
#[derive(Debug, Clone, Copy)]
pub struct QueryTreeBuilder<'a> {
    repo: &'a NodeRepository,
    rule: &'a LeafRule,
    excluded: &'a [String],
}

impl<'a> QueryTreeBuilder<'a> {
    pub fn new(repo: &'a NodeRepository, rule: &'a LeafRule) -> Self {
        Self {
            repo,
            rule,
            excluded: &[],
        }
    }

    /// Folder names to skip, compared ignoring case.
    pub fn with_excluded(mut self, excluded: &'a [String]) -> Self {
        self.excluded = excluded;
        self
    }

    fn is_excluded(&self, folder: &QueryNode) -> bool {
        self.excluded.iter().any(|name| folder.name_matches(name))
    }

    /// Builds `(tree1, tree2)` for `root`.
    pub async fn build(&self, root: &QueryNode) -> Result<TreePair> {
        self.build_node(root.clone(), None).await
    }

    fn build_node(&self, node: QueryNode, p_id: Option<String>) -> BoxFuture<'a, Result<TreePair>> {
        let this = *self;
        async move {
            if !node.is_folder {
                return this.build_leaf(&node, p_id).await;
            }
            if this.is_excluded(&node) {
                debug!(folder = %node.name, "skipping excluded folder");
                return Ok(TreePair::default());
            }

            let node = this.repo.ensure_children(&node).await?;
            let id = node.key().to_string();
            let pairs = try_join_all(
                node.children()
                    .iter()
                    .map(|child| this.build_node(child.clone(), Some(id.clone()))),
            )
            .await?;

            let (forward, reverse): (Vec<_>, Vec<_>) =
                pairs.into_iter().map(|p| (p.tree1, p.tree2)).unzip();
            let forward: Vec<TreeOutputNode> = forward.into_iter().flatten().collect();
            let reverse: Vec<TreeOutputNode> = reverse.into_iter().flatten().collect();

            Ok(TreePair {
                tree1: (!forward.is_empty())
                    .then(|| TreeOutputNode::folder(&node, p_id.clone(), forward)),
                tree2: (!reverse.is_empty())
                    .then(|| TreeOutputNode::folder(&node, p_id.clone(), reverse)),
            })
        }
        .boxed()
    }

    async fn build_leaf(&self, leaf: &QueryNode, p_id: Option<String>) -> Result<TreePair> {
        if !self.rule.accepts(leaf.query_type) {
            return Ok(TreePair::default());
        }
        let (forward, reverse) = self.classify(leaf).await?;
        Ok(TreePair {
            tree1: forward.then(|| TreeOutputNode::leaf(leaf, p_id.clone())),
            tree2: reverse.then(|| TreeOutputNode::leaf(leaf, p_id.clone())),
        })
    }

    /// Forward and reverse membership of one eligible leaf.
    async fn classify(&self, leaf: &QueryNode) -> Result<(bool, bool)> {
        let wiql = leaf.wiql.as_deref().unwrap_or_default();

        Ok(match self.rule {
            LeafRule::SourceTarget {
                sources,
                targets,
                source_area,
                target_area,
                ..
            } if leaf.query_type == Some(QueryType::Flat) => {
                // a flat list belongs to the side whose types it holds
                let pinned = if sources.is_empty() && targets.is_empty() {
                    None
                } else {
                    self.pinned_types(wiql).await?
                };
                (
                    flat_type_allowed(wiql, pinned.as_deref(), sources)
                        && matches_flat_area_condition(wiql, source_area),
                    flat_type_allowed(wiql, pinned.as_deref(), targets)
                        && matches_flat_area_condition(wiql, target_area),
                )
            }
            LeafRule::SourceTarget {
                sources,
                targets,
                source_area,
                target_area,
                ..
            } => (
                matches_source_target_condition(wiql, sources, targets)
                    && matches_area_path_condition(wiql, source_area, target_area),
                matches_source_target_condition(wiql, targets, sources)
                    && matches_area_path_condition(wiql, target_area, source_area),
            ),
            LeafRule::FlatType {
                types,
                forward_area,
                reverse_area,
            } => {
                // resolved once for both sides
                let pinned = if types.is_empty() {
                    None
                } else {
                    self.pinned_types(wiql).await?
                };
                let type_ok = flat_type_allowed(wiql, pinned.as_deref(), types);
                (
                    type_ok && matches_flat_area_condition(wiql, forward_area),
                    type_ok && matches_flat_area_condition(wiql, reverse_area),
                )
            }
            LeafRule::BugSplit => {
                let bug = matches_bug_condition(wiql);
                (!bug, bug)
            }
            LeafRule::AnyLeaf { .. } => (true, false),
        })
    }

    /// Fetched types of the items a flat query pins by id, or `None` when
    /// the query names its types itself or pins nothing. Selected columns
    /// do not count as naming a type.
    async fn pinned_types(&self, wiql: &str) -> Result<Option<Vec<Option<String>>>> {
        if !wiql::extract_work_item_types(wiql, Scope::Flat).is_empty() {
            return Ok(None);
        }
        let ids = wiql::extract_flat_ids(wiql);
        if ids.is_empty() {
            return Ok(None);
        }

        let mut resolved = Vec::with_capacity(ids.len());
        for id in &ids {
            let item_type = self.repo.work_item_type(id).await?;
            debug!(%id, ?item_type, "resolved work item type for flat query");
            resolved.push(item_type);
        }
        Ok(Some(resolved))
    }
}

/// Type check for a flat query. Pinned items must all resolve to an allowed
/// type; otherwise the query's own type literals decide.
fn flat_type_allowed(wiql: &str, pinned: Option<&[Option<String>]>, types: &[String]) -> bool {
    match pinned {
        Some(resolved) if !types.is_empty() => resolved.iter().all(|item_type| {
            item_type
                .as_deref()
                .is_some_and(|t| types.iter().any(|a| a.eq_ignore_ascii_case(t)))
        }),
        _ => matches_flat_work_item_type_condition(wiql, types),
    }
}
