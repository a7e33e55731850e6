//! Document types and the branches each one is built from.

use crate::builder::LeafRule;
use crate::error::DocsError;
use crate::fallback::has_any_query_tree;
use adoquery::v1::{QueryType, TreePair};
use serde::{Deserialize, Serialize};

/// Document types with a known shared-queries layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    /// Software test description
    Std,
    /// Software test report
    Str,
    /// Software version description
    Svd,
    /// Software requirements specification
    Srs,
    TestReporter,
}

impl DocType {
    pub const ALL: [DocType; 5] = [
        DocType::Std,
        DocType::Str,
        DocType::Svd,
        DocType::Srs,
        DocType::TestReporter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Std => "std",
            DocType::Str => "str",
            DocType::Svd => "svd",
            DocType::Srs => "srs",
            DocType::TestReporter => "test-reporter",
        }
    }

    /// Name of the folder holding this document type's queries.
    pub fn root_folder_name(&self) -> &'static str {
        self.as_str()
    }

    /// Branches built for this document type, in payload order.
    pub fn branches(&self) -> Vec<BranchConfig> {
        match self {
            DocType::Std => vec![
                req_test_branch(&MOM_NAMES),
                BranchConfig::new(
                    BranchId::Mom,
                    &MOM_NAMES,
                    LeafRule::source_target(["Test Case"], MOM_TARGETS),
                )
                .with_validator(Validator::ForwardTree)
                .with_excluded(&REQ_TEST_NAMES),
            ],
            DocType::Str => vec![
                req_test_branch(&OPEN_PCR_NAMES),
                BranchConfig::new(
                    BranchId::OpenPcrTest,
                    &OPEN_PCR_NAMES,
                    LeafRule::source_target(["Bug", "Change Request"], ["Test Case"]),
                )
                .with_excluded(&REQ_TEST_NAMES),
            ],
            DocType::Svd => vec![BranchConfig::new(
                BranchId::SystemOverview,
                &["system overview", "svd"],
                LeafRule::BugSplit,
            )],
            DocType::Srs => vec![
                BranchConfig::new(
                    BranchId::Requirements,
                    &REQUIREMENTS_NAMES,
                    LeafRule::FlatType {
                        types: to_strings(&REQUIREMENT_TYPES),
                        forward_area: "system".to_string(),
                        reverse_area: "software".to_string(),
                    },
                )
                .with_excluded(&SYS_SOFTWARE_NAMES),
                BranchConfig::new(
                    BranchId::SysSoftware,
                    &SYS_SOFTWARE_NAMES,
                    LeafRule::source_target(REQUIREMENT_TYPES, REQUIREMENT_TYPES)
                        .with_areas("system", "software"),
                )
                .with_excluded(&REQUIREMENTS_NAMES),
            ],
            DocType::TestReporter => vec![
                BranchConfig::new(
                    BranchId::TestReporter,
                    &["test reporter"],
                    LeafRule::AnyLeaf {
                        query_types: vec![QueryType::Flat, QueryType::Tree],
                    },
                )
                .with_validator(Validator::ForwardTree),
            ],
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = DocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "std" => Ok(DocType::Std),
            "str" => Ok(DocType::Str),
            "svd" => Ok(DocType::Svd),
            "srs" => Ok(DocType::Srs),
            "test-reporter" | "testreporter" | "test_reporter" => Ok(DocType::TestReporter),
            _ => Err(DocsError::UnknownDocType(s.to_string())),
        }
    }
}

const REQ_TEST_NAMES: [&str; 4] = [
    "requirement - test",
    "requirement to test",
    "req - test",
    "req to test",
];
const MOM_NAMES: [&str; 2] = ["linked mom", "mom"];
const MOM_TARGETS: [&str; 6] = [
    "Bug",
    "Task",
    "Change Request",
    "Code Review Request",
    "Risk",
    "Issue",
];
const OPEN_PCR_NAMES: [&str; 3] = ["open pcr to test", "open pcr", "pcr"];
const REQUIREMENTS_NAMES: [&str; 3] = ["system requirements", "requirements", "srs"];
const SYS_SOFTWARE_NAMES: [&str; 3] = ["system to software", "sys to sw", "system - software"];
const REQUIREMENT_TYPES: [&str; 3] = ["Epic", "Feature", "Requirement"];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn req_test_branch(excluded: &[&str]) -> BranchConfig {
    BranchConfig::new(
        BranchId::ReqTest,
        &REQ_TEST_NAMES,
        LeafRule::source_target(["Requirement"], ["Test Case"]),
    )
    .with_excluded(excluded)
}

/// Identifies a branch in payloads and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchId {
    ReqTest,
    Mom,
    OpenPcrTest,
    SystemOverview,
    Requirements,
    SysSoftware,
    TestReporter,
}

impl BranchId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchId::ReqTest => "reqTest",
            BranchId::Mom => "mom",
            BranchId::OpenPcrTest => "openPcrTest",
            BranchId::SystemOverview => "systemOverview",
            BranchId::Requirements => "requirements",
            BranchId::SysSoftware => "sysSoftware",
            BranchId::TestReporter => "testReporter",
        }
    }
}

impl std::fmt::Display for BranchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a folder's trees are good enough to stop falling back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Validator {
    /// Either tree holds a query.
    #[default]
    AnyQueryTree,
    /// The forward tree exists. For branches whose payload only uses
    /// `tree1`.
    ForwardTree,
}

impl Validator {
    pub fn accepts(&self, trees: &TreePair) -> bool {
        match self {
            Validator::AnyQueryTree => has_any_query_tree(trees),
            Validator::ForwardTree => trees.tree1.is_some(),
        }
    }
}

/// One branch of a document type, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchConfig {
    pub id: BranchId,
    /// Folder names to start from, matched exactly first, then partially.
    pub candidate_names: Vec<String>,
    pub rule: LeafRule,
    #[serde(default)]
    pub validator: Validator,
    /// Folders skipped while building, usually other branches' folders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_folders: Vec<String>,
    /// Folder id to start from when no candidate name matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_start_id: Option<String>,
}

impl BranchConfig {
    pub fn new<S: AsRef<str>>(id: BranchId, candidate_names: &[S], rule: LeafRule) -> Self {
        Self {
            id,
            candidate_names: candidate_names
                .iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
            rule,
            validator: Validator::default(),
            exclude_folders: Vec::new(),
            fallback_start_id: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_excluded<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.exclude_folders = names.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_fallback_start(mut self, folder_id: impl Into<String>) -> Self {
        self.fallback_start_id = Some(folder_id.into());
        self
    }
}
