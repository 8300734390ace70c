use clap::Parser;
use pr_reviewer::config::Config;
use pr_reviewer::pipeline::ReviewPipeline;
use pr_reviewer::pr::{self, PrContents};
use pr_reviewer::report::{self, OutputFormat};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// PR Reviewer — fetches a GitHub Pull Request, reviews its diff with an LLM
/// and reports issues per changed file.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// Repository URL (e.g., https://github.com/org/repo)
    ///
    /// Not required when --diff is used.
    repo_url: Option<String>,

    /// Pull request number
    pr_number: Option<u64>,

    /// GitHub token for private repositories (defaults to GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Review a local unified diff instead of fetching from GitHub
    #[arg(long, conflicts_with_all = ["repo_url", "pr_number"])]
    diff: Option<PathBuf>,

    /// Title used for the review when reading a local diff
    #[arg(long, default_value = "Local changes", requires = "diff")]
    title: String,

    /// Write the report to this file (markdown unless --json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the task outcome as JSON instead of a human-readable report
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = Config::load()?;
    debug!(model = %config.llm.model, max_tokens = config.chunking.max_tokens, "loaded configuration");
    let pipeline = ReviewPipeline::from_config(&config)?;

    let (heading, outcome) = if let Some(path) = &cli.diff {
        let _span = info_span!("review_diff", path = %path.display()).entered();
        info!("reading local diff");
        let raw = std::fs::read_to_string(path)?;
        let contents = PrContents {
            title: cli.title.clone(),
            description: String::new(),
            files: pr::diff::parse_diff(&raw)?,
        };
        (cli.title.clone(), pipeline.process_contents(&contents).await)
    } else {
        let (repo_url, pr_number) = match (cli.repo_url.as_deref(), cli.pr_number) {
            (Some(url), Some(number)) => (url, number),
            _ => {
                return Err("REPO_URL and PR_NUMBER are required unless --diff is used. Usage: pr-reviewer <REPO_URL> <PR_NUMBER> or pr-reviewer --diff <FILE>".into())
            }
        };
        (
            format!("{repo_url} #{pr_number}"),
            pipeline.process_pr(repo_url, pr_number, cli.token.as_deref()).await,
        )
    };

    if cli.json {
        report::write_json(&outcome, cli.output.as_deref())?;
    }

    if !outcome.is_completed() {
        let message = outcome.error.unwrap_or_else(|| "review failed".to_string());
        return Err(message.into());
    }
    let Some(result) = outcome.result else {
        return Err("review completed without a result".into());
    };

    if !cli.json {
        let format = if cli.output.is_some() {
            OutputFormat::Markdown
        } else {
            OutputFormat::Terminal
        };
        report::output(&result, &heading, format, cli.output.as_deref())?;
    }
    info!(
        total_issues = result.summary.total_issues,
        critical_issues = result.summary.critical_issues,
        "done"
    );

    Ok(())
}
