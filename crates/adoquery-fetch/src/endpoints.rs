use crate::error::{FetchError, Result};
use url::Url;

pub const DEFAULT_API_VERSION: &str = "7.1";

/// Builds the Azure DevOps REST URLs used by the query engine.
#[derive(Debug, Clone)]
pub struct Endpoints {
    org_url: String,
    project: Option<String>,
    api_version: String,
}

impl Endpoints {
    /// `org_url` is the collection root, e.g. `https://dev.azure.com/contoso`.
    pub fn new(org_url: impl Into<String>) -> Self {
        Self {
            org_url: org_url.into().trim_end_matches('/').to_string(),
            project: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn base_with_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.org_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.org_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.org_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// The project's "Shared Queries" folder, two levels deep with WIQL.
    pub fn shared_queries_url(&self) -> Result<String> {
        let project = self
            .project
            .as_deref()
            .ok_or_else(|| FetchError::InvalidUrl("no project configured".to_string()))?;
        let mut url =
            self.base_with_segments(&[project, "_apis", "wit", "queries", "Shared Queries"])?;
        url.set_query(Some(&format!(
            "$depth=2&$expand=all&api-version={}",
            self.api_version
        )));
        Ok(url.to_string())
    }

    /// Single work item, limited to its type field.
    pub fn work_item_type_url(&self, id: &str) -> Result<String> {
        let mut url = self.base_with_segments(&["_apis", "wit", "workitems", id])?;
        url.set_query(Some(&format!(
            "fields=System.WorkItemType&api-version={}",
            self.api_version
        )));
        Ok(url.to_string())
    }
}

/// URL that loads a query node's children and full WIQL.
pub fn expand_url(node_url: &str) -> String {
    let separator = if node_url.contains('?') { '&' } else { '?' };
    format!("{}{}$depth=2&$expand=all", node_url, separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_queries_url_encodes_project() {
        let endpoints = Endpoints::new("https://dev.azure.com/contoso/").with_project("My Project");
        assert_eq!(
            endpoints.shared_queries_url().unwrap(),
            "https://dev.azure.com/contoso/My%20Project/_apis/wit/queries/Shared%20Queries?$depth=2&$expand=all&api-version=7.1"
        );
    }

    #[test]
    fn test_shared_queries_requires_project() {
        let endpoints = Endpoints::new("https://dev.azure.com/contoso");
        assert!(matches!(
            endpoints.shared_queries_url(),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_work_item_type_url() {
        let endpoints = Endpoints::new("https://tfs.local/DefaultCollection").with_api_version("6.0");
        assert_eq!(
            endpoints.work_item_type_url("42").unwrap(),
            "https://tfs.local/DefaultCollection/_apis/wit/workitems/42?fields=System.WorkItemType&api-version=6.0"
        );
    }

    #[test]
    fn test_invalid_org_url() {
        let endpoints = Endpoints::new("not a url").with_project("p");
        assert!(endpoints.shared_queries_url().is_err());
    }

    #[test]
    fn test_expand_url() {
        assert_eq!(
            expand_url("https://x/_apis/wit/queries/abc"),
            "https://x/_apis/wit/queries/abc?$depth=2&$expand=all"
        );
        assert_eq!(
            expand_url("https://x/q/abc?api-version=7.1"),
            "https://x/q/abc?api-version=7.1&$depth=2&$expand=all"
        );
    }
}
