//! Per-document-type result shapes handed to renderers.

use crate::doctype::{BranchId, DocType};
use crate::orchestrator::BranchOutcome;
use adoquery::v1::{TreeOutputNode, TreePair};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How the trees of a payload were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInfo {
    /// The document type's own folder was missing and the whole hierarchy
    /// was searched instead.
    pub root_fallback_used: bool,
    /// Branch id → name of the folder its trees were built from.
    pub used_folders: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdQueries {
    pub req_test_tree: Option<TreeOutputNode>,
    pub test_req_tree: Option<TreeOutputNode>,
    pub linked_mom_tree: Option<TreeOutputNode>,
    #[serde(flatten)]
    pub info: ResolutionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrQueries {
    pub req_test_tree: Option<TreeOutputNode>,
    pub test_req_tree: Option<TreeOutputNode>,
    pub open_pcr_to_test_tree: Option<TreeOutputNode>,
    pub test_to_open_pcr_tree: Option<TreeOutputNode>,
    #[serde(flatten)]
    pub info: ResolutionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvdQueries {
    pub system_overview_query_tree: Option<TreeOutputNode>,
    pub known_bugs_query_tree: Option<TreeOutputNode>,
    #[serde(flatten)]
    pub info: ResolutionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsQueries {
    pub system_requirements_query_tree: Option<TreeOutputNode>,
    pub software_requirements_query_tree: Option<TreeOutputNode>,
    pub system_to_software_requirements_tree: Option<TreeOutputNode>,
    pub software_to_system_requirements_tree: Option<TreeOutputNode>,
    #[serde(flatten)]
    pub info: ResolutionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReporterQueries {
    pub test_reporter_query_tree: Option<TreeOutputNode>,
    #[serde(flatten)]
    pub info: ResolutionInfo,
}

/// Trees for one document type.
///
/// Serializes as the inner object, without a tag; a missing tree is `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SharedQueries {
    Std(StdQueries),
    Str(StrQueries),
    Svd(SvdQueries),
    Srs(SrsQueries),
    TestReporter(TestReporterQueries),
}

impl SharedQueries {
    pub fn doc_type(&self) -> DocType {
        match self {
            SharedQueries::Std(_) => DocType::Std,
            SharedQueries::Str(_) => DocType::Str,
            SharedQueries::Svd(_) => DocType::Svd,
            SharedQueries::Srs(_) => DocType::Srs,
            SharedQueries::TestReporter(_) => DocType::TestReporter,
        }
    }

    pub fn info(&self) -> &ResolutionInfo {
        match self {
            SharedQueries::Std(q) => &q.info,
            SharedQueries::Str(q) => &q.info,
            SharedQueries::Svd(q) => &q.info,
            SharedQueries::Srs(q) => &q.info,
            SharedQueries::TestReporter(q) => &q.info,
        }
    }

    /// Places each branch's trees into `doc_type`'s payload fields.
    pub fn assemble(
        doc_type: DocType,
        outcomes: Vec<BranchOutcome>,
        root_fallback_used: bool,
    ) -> Self {
        let mut info = ResolutionInfo {
            root_fallback_used,
            used_folders: BTreeMap::new(),
        };
        let mut trees: HashMap<BranchId, TreePair> = HashMap::new();
        for outcome in outcomes {
            info.used_folders
                .insert(outcome.id.to_string(), outcome.used_folder);
            trees.insert(outcome.id, outcome.trees);
        }
        let mut take = |id: BranchId| trees.remove(&id).unwrap_or_default();

        match doc_type {
            DocType::Std => {
                let req_test = take(BranchId::ReqTest);
                let mom = take(BranchId::Mom);
                SharedQueries::Std(StdQueries {
                    req_test_tree: req_test.tree1,
                    test_req_tree: req_test.tree2,
                    linked_mom_tree: mom.tree1,
                    info,
                })
            }
            DocType::Str => {
                let req_test = take(BranchId::ReqTest);
                let open_pcr = take(BranchId::OpenPcrTest);
                SharedQueries::Str(StrQueries {
                    req_test_tree: req_test.tree1,
                    test_req_tree: req_test.tree2,
                    open_pcr_to_test_tree: open_pcr.tree1,
                    test_to_open_pcr_tree: open_pcr.tree2,
                    info,
                })
            }
            DocType::Svd => {
                let overview = take(BranchId::SystemOverview);
                SharedQueries::Svd(SvdQueries {
                    system_overview_query_tree: overview.tree1,
                    known_bugs_query_tree: overview.tree2,
                    info,
                })
            }
            DocType::Srs => {
                let requirements = take(BranchId::Requirements);
                let sys_software = take(BranchId::SysSoftware);
                SharedQueries::Srs(SrsQueries {
                    system_requirements_query_tree: requirements.tree1,
                    software_requirements_query_tree: requirements.tree2,
                    system_to_software_requirements_tree: sys_software.tree1,
                    software_to_system_requirements_tree: sys_software.tree2,
                    info,
                })
            }
            DocType::TestReporter => SharedQueries::TestReporter(TestReporterQueries {
                test_reporter_query_tree: take(BranchId::TestReporter).tree1,
                info,
            }),
        }
    }
}
