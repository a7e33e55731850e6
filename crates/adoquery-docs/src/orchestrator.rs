use crate::builder::QueryTreeBuilder;
use crate::doctype::{BranchConfig, BranchId, DocType};
use crate::error::Result;
use crate::fallback::fetch_with_ancestor_fallback;
use crate::locator::{find_child_by_candidate_names, find_folder_by_exact_name, find_folder_by_id};
use crate::payload::SharedQueries;
use crate::repository::NodeRepository;
use adoquery::v1::{QueryNode, TreePair};
use futures::future::try_join_all;
use tracing::{debug, info};

/// Trees one branch produced and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOutcome {
    pub id: BranchId,
    pub trees: TreePair,
    /// Name of the folder the trees were built from.
    pub used_folder: String,
    /// False when no folder passed the branch's validator.
    pub satisfied: bool,
}

/// Runs a document type's branches against a query hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct DocTypeOrchestrator<'a> {
    repo: &'a NodeRepository,
}

impl<'a> DocTypeOrchestrator<'a> {
    pub fn new(repo: &'a NodeRepository) -> Self {
        Self { repo }
    }

    /// Builds `doc_type`'s payload from the hierarchy under `root`.
    pub async fn run(&self, root: &QueryNode, doc_type: DocType) -> Result<SharedQueries> {
        let (doc_root, root_fallback_used) = self.resolve_doc_root(root, doc_type).await?;
        let outcomes = self.run_branches(&doc_root, &doc_type.branches()).await?;
        Ok(SharedQueries::assemble(doc_type, outcomes, root_fallback_used))
    }

    /// The document type's folder, or `root` itself (flagged) when there is
    /// none.
    pub async fn resolve_doc_root(
        &self,
        root: &QueryNode,
        doc_type: DocType,
    ) -> Result<(QueryNode, bool)> {
        match find_folder_by_exact_name(self.repo, root, doc_type.root_folder_name()).await? {
            Some(folder) => Ok((folder, false)),
            None => {
                info!(%doc_type, "no folder for document type, searching the whole hierarchy");
                Ok((self.repo.ensure_children(root).await?, true))
            }
        }
    }

    /// Runs every branch concurrently; outcomes keep the order of `branches`.
    pub async fn run_branches(
        &self,
        doc_root: &QueryNode,
        branches: &[BranchConfig],
    ) -> Result<Vec<BranchOutcome>> {
        try_join_all(branches.iter().map(|branch| self.run_branch(doc_root, branch))).await
    }

    pub async fn run_branch(&self, doc_root: &QueryNode, branch: &BranchConfig) -> Result<BranchOutcome> {
        let start = self.starting_folder(doc_root, branch).await?;
        debug!(branch = %branch.id, folder = %start.name, "branch starting folder");

        let builder =
            QueryTreeBuilder::new(self.repo, &branch.rule).with_excluded(&branch.exclude_folders);
        let outcome = fetch_with_ancestor_fallback(
            self.repo,
            doc_root,
            &start,
            |folder: QueryNode| async move { builder.build(&folder).await },
            |trees: &TreePair| branch.validator.accepts(trees),
        )
        .await?;

        if !outcome.satisfied {
            debug!(branch = %branch.id, "no folder produced a query tree");
        }
        Ok(BranchOutcome {
            id: branch.id,
            trees: outcome.result,
            used_folder: outcome.used_folder.name,
            satisfied: outcome.satisfied,
        })
    }

    async fn starting_folder(&self, doc_root: &QueryNode, branch: &BranchConfig) -> Result<QueryNode> {
        if let Some(folder) =
            find_child_by_candidate_names(self.repo, doc_root, &branch.candidate_names).await?
        {
            return Ok(folder);
        }
        if let Some(id) = branch.fallback_start_id.as_deref()
            && let Some(folder) = find_folder_by_id(self.repo, doc_root, id).await?
        {
            return Ok(folder);
        }
        Ok(doc_root.clone())
    }
}
