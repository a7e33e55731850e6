use adoquery::v1::QueryNode;
use adoquery_docs::{AdoQueries, DocType, SharedQueries};
use adoquery_fetch::endpoints::DEFAULT_API_VERSION;
use adoquery_fetch::{ContentFetcher, Endpoints, FetchError, HttpFetcher, HttpMethod};
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Organization URL used when working from a file without `--org-url`.
const OFFLINE_ORG_URL: &str = "https://offline.invalid";

#[derive(Args, Debug)]
pub struct DocsArgs {
    /// Document type: std, str, svd, srs or test-reporter
    #[arg(short, long)]
    doc_type: DocType,

    /// Read the shared-queries hierarchy from a JSON file instead of the server
    #[arg(long)]
    from_file: Option<PathBuf>,

    /// Organization URL, e.g. https://dev.azure.com/contoso
    #[arg(long, env = "ADO_ORG_URL")]
    org_url: Option<String>,

    /// Project name
    #[arg(long, env = "ADO_PROJECT")]
    project: Option<String>,

    /// Personal access token
    #[arg(long, env = "ADO_PAT", hide_env_values = true)]
    pat: Option<String>,

    /// REST API version
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

pub async fn run(args: DocsArgs, pretty: bool) -> Result<()> {
    let payload = match &args.from_file {
        Some(path) => run_offline(path, &args).await?,
        None => run_online(&args).await?,
    };
    crate::print_json(&payload, pretty)
}

async fn run_online(args: &DocsArgs) -> Result<SharedQueries> {
    let org_url = args
        .org_url
        .as_deref()
        .context("--org-url (or ADO_ORG_URL) is required without --from-file")?;
    let project = args
        .project
        .as_deref()
        .context("--project (or ADO_PROJECT) is required without --from-file")?;
    let pat = args
        .pat
        .as_deref()
        .context("--pat (or ADO_PAT) is required without --from-file")?;

    let fetcher = HttpFetcher::with_timeout(pat, Duration::from_secs(args.timeout_secs))
        .context("Failed to build HTTP client")?;
    let endpoints = Endpoints::new(org_url)
        .with_project(project)
        .with_api_version(&args.api_version);

    info!(%org_url, %project, doc_type = %args.doc_type, "fetching shared queries");
    AdoQueries::new(Arc::new(fetcher), endpoints)
        .shared_queries(args.doc_type)
        .await
        .with_context(|| format!("Failed to build {} query trees", args.doc_type))
}

async fn run_offline(path: &Path, args: &DocsArgs) -> Result<SharedQueries> {
    let root = read_hierarchy(path)?;
    let endpoints = Endpoints::new(args.org_url.as_deref().unwrap_or(OFFLINE_ORG_URL))
        .with_api_version(&args.api_version);

    AdoQueries::new(Arc::new(OfflineFetcher), endpoints)
        .shared_queries_from(&root, args.doc_type)
        .await
        .with_context(|| {
            format!(
                "Failed to build {} query trees from {:?}",
                args.doc_type, path
            )
        })
}

fn read_hierarchy(path: &Path) -> Result<QueryNode> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

/// Refuses every request; used when the whole hierarchy comes from a file.
#[derive(Debug, Clone, Copy)]
struct OfflineFetcher;

#[async_trait]
impl ContentFetcher for OfflineFetcher {
    async fn fetch_json(&self, url: &str) -> adoquery_fetch::Result<Value> {
        Err(FetchError::Offline(url.to_string()))
    }

    async fn send_json(
        &self,
        url: &str,
        _method: HttpMethod,
        _body: Option<&Value>,
        _headers: &[(String, String)],
    ) -> adoquery_fetch::Result<Value> {
        Err(FetchError::Offline(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(doc_type: DocType, from_file: Option<PathBuf>) -> DocsArgs {
        DocsArgs {
            doc_type,
            from_file,
            org_url: None,
            project: None,
            pat: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: 30,
        }
    }

    fn write_hierarchy(dir: &TempDir, value: &Value) -> PathBuf {
        let path = dir.path().join("shared-queries.json");
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_offline_std() {
        let dir = TempDir::new().unwrap();
        let path = write_hierarchy(
            &dir,
            &json!({
                "id": "root",
                "name": "Shared Queries",
                "isFolder": true,
                "hasChildren": true,
                "children": [{
                    "id": "std",
                    "name": "STD",
                    "isFolder": true,
                    "hasChildren": true,
                    "children": [{
                        "id": "q1",
                        "name": "Req to Test",
                        "queryType": "oneHop",
                        "wiql": "Source.[System.WorkItemType] = 'Requirement' AND Target.[System.WorkItemType] = 'Test Case'"
                    }]
                }]
            }),
        );

        let payload = run_offline(&path, &args(DocType::Std, Some(path.clone())))
            .await
            .unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["reqTestTree"]["children"][0]["id"], "q1");
        assert!(value["linkedMomTree"].is_null());
    }

    #[tokio::test]
    async fn test_offline_lazy_folder_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_hierarchy(
            &dir,
            &json!({
                "id": "root",
                "name": "Shared Queries",
                "isFolder": true,
                "hasChildren": true,
                "children": [{
                    "id": "std",
                    "name": "STD",
                    "isFolder": true,
                    "hasChildren": true,
                    "url": "https://dev.azure.com/org/proj/_apis/wit/queries/std"
                }]
            }),
        );

        let err = run_offline(&path, &args(DocType::Std, Some(path.clone())))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("offline"));
    }

    #[test]
    fn test_read_hierarchy_errors() {
        let dir = TempDir::new().unwrap();
        assert!(read_hierarchy(&dir.path().join("missing.json")).is_err());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_hierarchy(&path).is_err());
    }

    #[tokio::test]
    async fn test_online_requires_settings() {
        let err = run_online(&args(DocType::Svd, None)).await.unwrap_err();
        assert!(err.to_string().contains("--org-url"));
    }
}
