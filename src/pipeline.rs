use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::chunk::chunk_pr_contents;
use crate::config::Config;
use crate::pr::{FetchError, GitHubFetcher, HttpClient, PrContents, ReqwestHttpClient};
use crate::report::{format_analysis_results, AnalysisResult, IssueParser, PatternIssueParser};
use crate::review::{AnalysisError, ChatModel, OpenAiClient, ReviewRequester};
use crate::tokens::{TiktokenLookup, TokenEstimator, TokenizerLookup};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to set up GitHub client: {0}")]
    GitHub(#[from] FetchError),

    #[error("Failed to set up LLM client: {0}")]
    Llm(#[from] AnalysisError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// Task-queue facing result: always well formed, whatever went wrong.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    /// `SUCCESS` or `FAILURE`, mirroring the queue's task states
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    fn completed(result: AnalysisResult) -> Self {
        Self {
            status: TaskStatus::Completed,
            state: "SUCCESS",
            result: Some(result),
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        error!(error = %message, "PR review failed");
        Self {
            status: TaskStatus::Failed,
            state: "FAILURE",
            result: None,
            error: Some(message),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Entry point tying fetch, chunking, review and formatting together.
/// Collaborators are injected so tests can swap in fakes.
pub struct ReviewPipeline {
    fetcher: GitHubFetcher,
    requester: ReviewRequester,
    estimator: TokenEstimator,
    parser: Box<dyn IssueParser>,
    max_chunk_tokens: usize,
}

impl ReviewPipeline {
    pub fn new(
        http: Arc<dyn HttpClient>,
        chat: Arc<dyn ChatModel>,
        tokenizers: &dyn TokenizerLookup,
        config: &Config,
    ) -> Self {
        Self {
            fetcher: GitHubFetcher::new(http, config.github.api_base_url.clone())
                .with_default_token(config.github.token.clone()),
            requester: ReviewRequester::new(chat, config.llm.model.clone()),
            estimator: TokenEstimator::new(tokenizers, &config.llm.model),
            parser: Box::new(PatternIssueParser),
            max_chunk_tokens: config.chunking.max_tokens,
        }
    }

    /// Production wiring: reqwest for GitHub, an OpenAI-compatible endpoint
    /// for review, tiktoken for token counts.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let http = ReqwestHttpClient::new(Duration::from_secs(config.github.timeout_secs))?;
        let chat = OpenAiClient::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        Ok(Self::new(Arc::new(http), Arc::new(chat), &TiktokenLookup, config))
    }

    /// Replace the issue extraction strategy.
    pub fn with_parser(mut self, parser: Box<dyn IssueParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Fetch, review and format one pull request.
    #[instrument(skip(self, github_token), fields(model = %self.estimator.model()))]
    pub async fn process_pr(
        &self,
        repo_url: &str,
        pr_number: u64,
        github_token: Option<&str>,
    ) -> TaskOutcome {
        info!("starting PR analysis");
        let contents = match self.fetcher.fetch(repo_url, pr_number, github_token).await {
            Ok(contents) => contents,
            Err(e) => return TaskOutcome::failed(format!("PR Content Error: {e}")),
        };
        info!(files = contents.files.len(), "fetched PR contents");
        self.process_contents(&contents).await
    }

    /// Review contents obtained elsewhere, e.g. from a local diff.
    pub async fn process_contents(&self, contents: &PrContents) -> TaskOutcome {
        if contents.files.is_empty() {
            return TaskOutcome::failed("No files found in PR".to_string());
        }

        let chunks = chunk_pr_contents(contents, &self.estimator, self.max_chunk_tokens);
        info!(chunks = chunks.len(), "reviewing chunks");

        let analysis = match self.requester.review(&chunks).await {
            Ok(analysis) => analysis,
            Err(e) => return TaskOutcome::failed(format!("Analysis Error: {e}")),
        };

        let result = format_analysis_results(&contents.files, &analysis, self.parser.as_ref());
        if let Some(e) = &result.error {
            return TaskOutcome::failed(format!("Analysis Error: {e}"));
        }

        info!(
            total_issues = result.summary.total_issues,
            critical_issues = result.summary.critical_issues,
            "PR analysis complete"
        );
        TaskOutcome::completed(result)
    }
}
