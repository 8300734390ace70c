pub mod diff;
pub mod types;

pub use types::{FileChange, FileStatus, PrContents, RepoRef, Visibility};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = "pr-reviewer";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid repository URL format: {0}")]
    InvalidUrl(String),

    #[error("Pull request not found")]
    NotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded or access denied")]
    Forbidden,

    #[error("Empty response from GitHub API")]
    EmptyResponse,

    #[error("No valid files found in PR")]
    NoValidFiles,

    #[error("GitHub token required for private repository access")]
    MissingToken,

    #[error("GitHub API returned status {0}")]
    UnexpectedStatus(u16),

    #[error("GitHub API request failed: {0}")]
    Transport(String),

    #[error("Failed to decode GitHub response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Status code and body of a completed GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP capability the fetcher needs. Production code uses
/// [`ReqwestHttpClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, FetchError>;
}

/// reqwest-backed [`HttpClient`] with a per-request timeout.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Parse owner and repository from a URL of the form
/// `https://github.com/{owner}/{repo}` (a trailing slash is allowed).
pub fn parse_repo_url(url: &str) -> Result<RepoRef, FetchError> {
    let segments: Vec<&str> = url.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        [_, _, _, owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

#[derive(Deserialize)]
struct RepoResponse {
    private: Option<bool>,
}

#[derive(Deserialize)]
struct PullResponse {
    title: Option<String>,
    body: Option<String>,
}

#[derive(Deserialize)]
struct FileResponse {
    filename: Option<String>,
    patch: Option<String>,
    #[serde(default)]
    status: FileStatus,
}

/// Fetches PR metadata and changed files from the GitHub REST API.
pub struct GitHubFetcher {
    http: Arc<dyn HttpClient>,
    api_base_url: String,
    default_token: Option<String>,
}

impl GitHubFetcher {
    pub fn new(http: Arc<dyn HttpClient>, api_base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            default_token: None,
        }
    }

    /// Token used when the caller does not supply one.
    pub fn with_default_token(mut self, token: Option<String>) -> Self {
        self.default_token = token;
        self
    }

    /// Probe the repository without credentials. Anything other than an
    /// explicit `"private": false` counts as private.
    #[instrument(skip_all, fields(owner = %repo.owner, repo = %repo.repo))]
    pub async fn check_visibility(&self, repo: &RepoRef) -> Visibility {
        let url = format!("{}/repos/{}/{}", self.api_base_url, repo.owner, repo.repo);
        let headers = [("User-Agent", USER_AGENT.to_string())];

        let response = match self.http.get(&url, &headers).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "visibility probe failed, assuming private");
                return Visibility::Private;
            }
        };
        if !response.is_success() {
            debug!(status = response.status, "visibility probe not successful");
            return Visibility::Private;
        }

        match serde_json::from_str::<RepoResponse>(&response.body) {
            Ok(RepoResponse {
                private: Some(false),
            }) => Visibility::Public,
            Ok(_) => Visibility::Private,
            Err(e) => {
                warn!(error = %e, "could not decode repository metadata, assuming private");
                Visibility::Private
            }
        }
    }

    /// Fetch title, description and changed files for a pull request.
    #[instrument(skip_all, fields(repo_url = %repo_url, pr = pr_number))]
    pub async fn fetch(
        &self,
        repo_url: &str,
        pr_number: u64,
        github_token: Option<&str>,
    ) -> Result<PrContents, FetchError> {
        let repo = parse_repo_url(repo_url)?;
        let visibility = self.check_visibility(&repo).await;
        debug!(?visibility, "resolved repository visibility");

        let mut headers = vec![
            ("Accept", GITHUB_ACCEPT.to_string()),
            ("User-Agent", USER_AGENT.to_string()),
        ];
        if visibility.is_private() {
            let token = github_token
                .map(str::to_string)
                .or_else(|| self.default_token.clone())
                .ok_or(FetchError::MissingToken)?;
            headers.push(("Authorization", format!("token {token}")));
        }

        let pr_url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base_url, repo.owner, repo.repo, pr_number
        );

        info!(url = %pr_url, "fetching PR from GitHub");
        let response = self.http.get(&pr_url, &headers).await?;
        check_status(&response, visibility)?;

        let metadata: serde_json::Value = serde_json::from_str(&response.body)?;
        let is_empty = match &metadata {
            serde_json::Value::Object(map) => map.is_empty(),
            _ => true,
        };
        if is_empty {
            return Err(FetchError::EmptyResponse);
        }
        let metadata: PullResponse = serde_json::from_value(metadata)?;

        let files_url = format!("{pr_url}/files?per_page=100");
        debug!(url = %files_url, "fetching PR files");
        let response = self.http.get(&files_url, &headers).await?;
        check_status(&response, visibility)?;
        let listed: Vec<FileResponse> = serde_json::from_str(&response.body)?;
        let listed_count = listed.len();

        let files: Vec<FileChange> = listed
            .into_iter()
            .filter_map(|file| {
                let name = file.filename.filter(|name| !name.is_empty())?;
                Some(FileChange {
                    name,
                    patch: file.patch.unwrap_or_default(),
                    status: file.status,
                })
            })
            .collect();
        if files.is_empty() {
            return Err(FetchError::NoValidFiles);
        }
        debug!(listed = listed_count, kept = files.len(), "received PR files");

        info!(
            files = files.len(),
            private = visibility.is_private(),
            "fetched PR contents"
        );
        Ok(PrContents {
            title: metadata.title.unwrap_or_else(|| "Untitled PR".to_string()),
            description: metadata.body.unwrap_or_default(),
            files,
        })
    }
}

fn check_status(response: &HttpResponse, visibility: Visibility) -> Result<(), FetchError> {
    match response.status {
        404 => Err(FetchError::NotFound),
        401 if visibility.is_private() => Err(FetchError::Unauthorized(
            "Invalid GitHub token or insufficient permissions".to_string(),
        )),
        401 => Err(FetchError::Unauthorized(
            "This repository requires authentication".to_string(),
        )),
        403 => Err(FetchError::Forbidden),
        _ if response.is_success() => Ok(()),
        status => Err(FetchError::UnexpectedStatus(status)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// In-memory [`HttpClient`] keyed by URL path (query string ignored).
    /// Unknown paths answer 404. Every request is recorded.
    #[derive(Default)]
    pub struct FakeHttp {
        routes: HashMap<String, (u16, String)>,
        unreachable: HashSet<String>,
        pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeHttp {
        pub fn route(mut self, path: &str, status: u16, body: serde_json::Value) -> Self {
            self.routes
                .insert(path.to_string(), (status, body.to_string()));
            self
        }

        /// Requests to `path` fail at the transport level.
        pub fn unreachable(mut self, path: &str) -> Self {
            self.unreachable.insert(path.to_string());
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn auth_header_for(&self, path_prefix: &str) -> Option<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|(url, _)| url.starts_with(path_prefix))
                .and_then(|(_, headers)| {
                    headers
                        .iter()
                        .find(|(name, _)| name == "Authorization")
                        .map(|(_, value)| value.clone())
                })
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttp {
        async fn get(
            &self,
            url: &str,
            headers: &[(&str, String)],
        ) -> Result<HttpResponse, FetchError> {
            let path = url.trim_start_matches(API).split('?').next().unwrap_or("");
            self.requests.lock().unwrap().push((
                path.to_string(),
                headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.clone()))
                    .collect(),
            ));
            if self.unreachable.contains(path) {
                return Err(FetchError::Transport(format!("connection refused: {url}")));
            }
            let (status, body) = self
                .routes
                .get(path)
                .cloned()
                .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));
            Ok(HttpResponse { status, body })
        }
    }

    pub const API: &str = "https://api.test";
    pub const REPO_URL: &str = "https://github.com/octo/widgets";

    pub fn public_repo_http() -> FakeHttp {
        FakeHttp::default()
            .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
            .route(
                "/repos/octo/widgets/pulls/7",
                200,
                serde_json::json!({"title": "Fix parser", "body": null}),
            )
            .route(
                "/repos/octo/widgets/pulls/7/files",
                200,
                serde_json::json!([
                    {"filename": "src/parser.rs", "patch": "@@ -1 +1 @@\n-a\n+b", "status": "modified"},
                    {"filename": "README.md", "status": "added"},
                    {"patch": "@@ -0,0 +1 @@\n+x", "status": "added"}
                ]),
            )
    }

    fn fetcher(http: Arc<FakeHttp>) -> GitHubFetcher {
        GitHubFetcher::new(http, API)
    }

    #[test]
    fn test_parse_valid_repo_url() {
        let repo = parse_repo_url("https://github.com/org/repo").unwrap();
        assert_eq!(repo.owner, "org");
        assert_eq!(repo.repo, "repo");

        let repo = parse_repo_url("https://github.com/org/repo/").unwrap();
        assert_eq!(repo.repo, "repo");
    }

    #[test]
    fn test_parse_invalid_repo_url() {
        assert!(parse_repo_url("https://github.com/org").is_err());
        assert!(parse_repo_url("not-a-url").is_err());
        assert!(parse_repo_url("https://github.com/org/repo/pull/42").is_err());
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_request() {
        let http = Arc::new(FakeHttp::default());
        let result = fetcher(http.clone()).fetch("https://github.com/org", 1, None).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_public_repo() {
        let http = Arc::new(public_repo_http());
        let contents = fetcher(http.clone()).fetch(REPO_URL, 7, None).await.unwrap();

        assert_eq!(contents.title, "Fix parser");
        assert_eq!(contents.description, "");
        assert_eq!(contents.files.len(), 2);
        assert_eq!(contents.files[0].name, "src/parser.rs");
        assert_eq!(contents.files[0].status, FileStatus::Modified);
        assert_eq!(contents.files[1].patch, "");
        assert_eq!(contents.files[1].status, FileStatus::Added);
        assert!(http.auth_header_for("/repos/octo/widgets/pulls/7").is_none());
    }

    #[tokio::test]
    async fn test_visibility_check_404_means_private() {
        let http = Arc::new(FakeHttp::default());
        let visibility = fetcher(http)
            .check_visibility(&RepoRef {
                owner: "octo".to_string(),
                repo: "secret".to_string(),
            })
            .await;
        assert_eq!(visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_visibility_check_transport_error_means_private() {
        let http = Arc::new(FakeHttp::default().unreachable("/repos/octo/widgets"));
        let visibility = fetcher(http.clone())
            .check_visibility(&RepoRef {
                owner: "octo".to_string(),
                repo: "widgets".to_string(),
            })
            .await;
        assert_eq!(visibility, Visibility::Private);
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test]
    async fn test_visibility_check_missing_field_means_private() {
        let http = Arc::new(
            FakeHttp::default().route("/repos/octo/widgets", 200, serde_json::json!({})),
        );
        let repo = parse_repo_url(REPO_URL).unwrap();
        assert_eq!(fetcher(http).check_visibility(&repo).await, Visibility::Private);
    }

    #[tokio::test]
    async fn test_private_repo_without_token() {
        let http = Arc::new(FakeHttp::default());
        let result = fetcher(http).fetch(REPO_URL, 7, None).await;
        assert!(matches!(result, Err(FetchError::MissingToken)));
    }

    #[tokio::test]
    async fn test_private_repo_sends_token() {
        let http = Arc::new(
            FakeHttp::default()
                .route(
                    "/repos/octo/widgets/pulls/7",
                    200,
                    serde_json::json!({"title": "t", "body": "b"}),
                )
                .route(
                    "/repos/octo/widgets/pulls/7/files",
                    200,
                    serde_json::json!([{"filename": "a.rs", "patch": "+x", "status": "modified"}]),
                ),
        );
        let contents = fetcher(http.clone())
            .with_default_token(Some("fallback".to_string()))
            .fetch(REPO_URL, 7, Some("ghp_abc"))
            .await
            .unwrap();
        assert_eq!(contents.description, "b");
        assert_eq!(
            http.auth_header_for("/repos/octo/widgets/pulls/7").as_deref(),
            Some("token ghp_abc")
        );
    }

    #[tokio::test]
    async fn test_private_repo_uses_default_token() {
        let http = Arc::new(FakeHttp::default().route(
            "/repos/octo/widgets/pulls/7",
            401,
            serde_json::json!({"message": "Bad credentials"}),
        ));
        let result = fetcher(http.clone())
            .with_default_token(Some("fallback".to_string()))
            .fetch(REPO_URL, 7, None)
            .await;
        assert_eq!(
            http.auth_header_for("/repos/octo/widgets/pulls/7").as_deref(),
            Some("token fallback")
        );
        match result {
            Err(FetchError::Unauthorized(msg)) => {
                assert_eq!(msg, "Invalid GitHub token or insufficient permissions")
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_public_repo_unauthorized_message() {
        let http = Arc::new(
            FakeHttp::default()
                .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                .route("/repos/octo/widgets/pulls/7", 401, serde_json::json!({})),
        );
        match fetcher(http).fetch(REPO_URL, 7, None).await {
            Err(FetchError::Unauthorized(msg)) => {
                assert_eq!(msg, "This repository requires authentication")
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (404, "NotFound"),
            (403, "Forbidden"),
            (500, "UnexpectedStatus"),
        ];
        for (status, expected) in cases {
            let http = Arc::new(
                FakeHttp::default()
                    .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                    .route("/repos/octo/widgets/pulls/7", status, serde_json::json!({})),
            );
            let err = fetcher(http).fetch(REPO_URL, 7, None).await.unwrap_err();
            let kind = match err {
                FetchError::NotFound => "NotFound",
                FetchError::Forbidden => "Forbidden",
                FetchError::UnexpectedStatus(_) => "UnexpectedStatus",
                _ => "other",
            };
            assert_eq!(kind, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_empty_metadata_response() {
        let http = Arc::new(
            FakeHttp::default()
                .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                .route("/repos/octo/widgets/pulls/7", 200, serde_json::json!({})),
        );
        let result = fetcher(http).fetch(REPO_URL, 7, None).await;
        assert!(matches!(result, Err(FetchError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_non_object_metadata_response() {
        for body in [serde_json::json!([]), serde_json::json!(null), serde_json::json!("")] {
            let http = Arc::new(
                FakeHttp::default()
                    .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                    .route("/repos/octo/widgets/pulls/7", 200, body.clone()),
            );
            let result = fetcher(http).fetch(REPO_URL, 7, None).await;
            assert!(matches!(result, Err(FetchError::EmptyResponse)), "body {body}");
        }
    }

    #[tokio::test]
    async fn test_no_valid_files() {
        let http = Arc::new(
            FakeHttp::default()
                .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                .route(
                    "/repos/octo/widgets/pulls/7",
                    200,
                    serde_json::json!({"title": "t"}),
                )
                .route(
                    "/repos/octo/widgets/pulls/7/files",
                    200,
                    serde_json::json!([{"patch": "+x"}, {"filename": ""}]),
                ),
        );
        let result = fetcher(http).fetch(REPO_URL, 7, None).await;
        assert!(matches!(result, Err(FetchError::NoValidFiles)));
    }

    #[tokio::test]
    async fn test_missing_title_defaults() {
        let http = Arc::new(
            FakeHttp::default()
                .route("/repos/octo/widgets", 200, serde_json::json!({"private": false}))
                .route(
                    "/repos/octo/widgets/pulls/7",
                    200,
                    serde_json::json!({"number": 7}),
                )
                .route(
                    "/repos/octo/widgets/pulls/7/files",
                    200,
                    serde_json::json!([{"filename": "x.txt"}]),
                ),
        );
        let contents = fetcher(http).fetch(REPO_URL, 7, None).await.unwrap();
        assert_eq!(contents.title, "Untitled PR");
        assert_eq!(contents.files[0].status, FileStatus::Unknown);
    }

    #[tokio::test]
    async fn test_reqwest_client_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"private": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/3"))
            .and(header("authorization", "token mock-token"))
            .and(header("accept", GITHUB_ACCEPT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"title": "Add cache", "body": "Adds LRU"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/3/files"))
            .and(header("authorization", "token mock-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"filename": "src/cache.rs", "patch": "@@ -0,0 +1 @@\n+pub struct Lru;", "status": "added"}
            ])))
            .mount(&server)
            .await;

        let http = Arc::new(ReqwestHttpClient::new(Duration::from_secs(5)).unwrap());
        let contents = GitHubFetcher::new(http, server.uri())
            .fetch(REPO_URL, 3, Some("mock-token"))
            .await
            .unwrap();

        assert_eq!(contents.title, "Add cache");
        assert_eq!(contents.description, "Adds LRU");
        assert_eq!(contents.files.len(), 1);
        assert_eq!(contents.files[0].name, "src/cache.rs");
    }

    #[tokio::test]
    async fn test_reqwest_client_transport_error() {
        let client = ReqwestHttpClient::new(Duration::from_secs(1)).unwrap();
        let result = client.get("http://127.0.0.1:1/unreachable", &[]).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
