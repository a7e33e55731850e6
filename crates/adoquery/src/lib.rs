#![doc = include_str!("../README.md")]

mod query;
mod types;
mod wiql;

pub mod v1 {
    //! Versioned public API for query hierarchies, output trees and WIQL
    //! classification.
    //!
    //! # Input
    //!
    //! - [`QueryNode`]: a saved query or folder as served by
    //!   `_apis/wit/queries`, possibly with children still unloaded
    //! - [`QueryType`]: `flat`, `tree` or `oneHop`
    //! - [`Column`]: a declared result column
    //!
    //! # Output
    //!
    //! - [`TreeOutputNode`]: folder or matching leaf in a document tree
    //! - [`TreePair`]: the forward (`tree1`) and reverse (`tree2`) trees of
    //!   one walk
    //!
    //! # Example: build a one-leaf tree
    //!
    //! ```
    //! use adoquery::v1::*;
    //!
    //! let leaf = QueryNode::query(
    //!     "q1",
    //!     "Requirements to tests",
    //!     QueryType::OneHop,
    //!     "SELECT [System.Id] FROM WorkItemLinks",
    //! );
    //! let folder = QueryNode::folder("f1", "STD", vec![leaf.clone()]);
    //!
    //! let tree = TreeOutputNode::folder(
    //!     &folder,
    //!     None,
    //!     vec![TreeOutputNode::leaf(&leaf, folder.id.clone())],
    //! );
    //!
    //! let json = serde_json::to_string(&tree).unwrap();
    //! assert!(json.contains("\"pId\":\"f1\""));
    //! assert_eq!(query::leaf_ids(&tree), vec!["q1"]);
    //! ```

    /// Traversal helpers over loaded hierarchies and output trees.
    pub mod query {
        pub use crate::query::{count_leaves, find_by_id, has_query_tree, leaf_ids};
    }

    /// WIQL text classification. See the module functions for the exact
    /// field shapes that are recognised.
    pub mod wiql {
        pub use crate::wiql::{
            FieldRef, Scope, WiqlField, area_leaf, extract_area_paths, extract_field_equality,
            extract_field_in_clause, extract_field_values, extract_flat_ids,
            extract_work_item_types, matches_area_path_condition, matches_bug_condition,
            matches_flat_area_condition, matches_flat_work_item_type_condition,
            matches_source_target_condition, matches_work_item_type_condition, references_field,
        };
    }

    pub use crate::types::{Column, QueryNode, QueryType, TreeOutputNode, TreePair};
}
