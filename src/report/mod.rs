pub mod parser;
pub mod types;

pub use parser::{FormatError, IssueParser, PatternIssueParser};
pub use types::{AnalysisResult, FileReport, Issue, IssueType, Summary};

use colored::Colorize;
use regex::RegexBuilder;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::pr::FileChange;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the per-file result from the joined model output.
///
/// Formatting never fails: any error is logged and returned as an empty
/// result whose `error` field carries the message.
#[instrument(skip_all, fields(files = files.len(), chars = analysis.len()))]
pub fn format_analysis_results(
    files: &[FileChange],
    analysis: &str,
    parser: &dyn IssueParser,
) -> AnalysisResult {
    match try_format(files, analysis, parser) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "failed to format analysis results");
            AnalysisResult::failed(e.to_string())
        }
    }
}

fn try_format(
    files: &[FileChange],
    analysis: &str,
    parser: &dyn IssueParser,
) -> Result<AnalysisResult, FormatError> {
    let mut issues = parser.parse(analysis)?;

    if issues.is_empty() {
        issues = paragraph_issues(analysis);
        debug!(paragraphs = issues.len(), "no structured issues, using paragraphs");
    }

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let mentions = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&file.name)))
            .case_insensitive(true)
            .build()?;

        let attributed: Vec<Issue> = issues
            .iter()
            .filter(|issue| {
                issue.line > 0 && (files.len() == 1 || mentions.is_match(&issue.description))
            })
            .cloned()
            .collect();

        reports.push(FileReport {
            name: file.name.clone(),
            issues: if attributed.is_empty() {
                vec![no_issues_placeholder()]
            } else {
                attributed
            },
        });
    }

    let summary = Summary {
        total_files: files.len(),
        total_issues: issues.iter().filter(|i| i.kind.is_actionable()).count(),
        critical_issues: issues.iter().filter(|i| i.kind.is_critical()).count(),
    };
    debug!(
        total_issues = summary.total_issues,
        critical_issues = summary.critical_issues,
        "formatted analysis"
    );

    Ok(AnalysisResult {
        files: reports,
        summary,
        error: None,
    })
}

/// One unlocated `Analysis` issue per blank-line separated paragraph.
fn paragraph_issues(analysis: &str) -> Vec<Issue> {
    analysis
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| Issue {
            kind: IssueType::Analysis,
            line: 0,
            description: paragraph.to_string(),
            suggestion: parser::DEFAULT_SUGGESTION.to_string(),
        })
        .collect()
}

fn no_issues_placeholder() -> Issue {
    Issue {
        kind: IssueType::Info,
        line: 0,
        description: "No specific issues detected".to_string(),
        suggestion: "No action needed".to_string(),
    }
}

/// How a finished result should be written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Markdown,
}

/// Output the result to the terminal (default), or as a markdown file when a
/// path is given.
#[instrument(skip(result), fields(files = result.files.len()))]
pub fn output(
    result: &AnalysisResult,
    heading: &str,
    format: OutputFormat,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    match (format, output_path) {
        (_, Some(path)) => {
            debug!(path = %path.display(), "writing markdown report to file");
            write_markdown_report(result, heading, path)
        }
        (OutputFormat::Markdown, None) => {
            println!("{}", render_markdown(result, heading));
            Ok(())
        }
        (OutputFormat::Terminal, None) => {
            debug!("writing report to terminal");
            print_terminal_report(result, heading);
            Ok(())
        }
    }
}

/// Pretty JSON of `value` on stdout, or in the file at `output_path`.
pub fn write_json<T: Serialize>(value: &T, output_path: Option<&Path>) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(value)?;
    match output_path {
        Some(path) => {
            debug!(path = %path.display(), "writing JSON report to file");
            std::fs::write(path, json)?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Print the report with colors.
///
/// Review: "Add OAuth2 login flow"
/// Files: 2 | Issues: 3 | Critical: 1
///
/// ═══ src/auth.rs ═══
///   • [Error] line 42: Null pointer dereference
///     fix: Add a null check
fn print_terminal_report(result: &AnalysisResult, heading: &str) {
    println!();
    println!("Review: \"{}\"", heading);
    println!(
        "Files: {} | Issues: {} | Critical: {}",
        result.summary.total_files,
        result.summary.total_issues,
        colorize_count(result.summary.critical_issues)
    );
    println!();

    for file in &result.files {
        println!("═══ {} ═══", file.name);
        for issue in &file.issues {
            let location = if issue.line > 0 {
                format!(" line {}", issue.line)
            } else {
                String::new()
            };
            println!(
                "  • [{}]{}: {}",
                colorize_type(issue.kind),
                location,
                issue.description
            );
            if issue.kind.is_actionable() {
                println!("    fix: {}", issue.suggestion);
            }
        }
        println!();
    }
}

fn render_markdown(result: &AnalysisResult, heading: &str) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Review: \"{}\"\n\n", heading));
    md.push_str(&format!(
        "**Files:** {} | **Issues:** {} | **Critical:** {}\n\n",
        result.summary.total_files, result.summary.total_issues, result.summary.critical_issues
    ));

    for file in &result.files {
        md.push_str(&format!("## `{}`\n\n", file.name));
        for issue in &file.issues {
            let location = if issue.line > 0 {
                format!(" (line {})", issue.line)
            } else {
                String::new()
            };
            md.push_str(&format!(
                "- **[{}]**{} {}\n",
                issue.kind, location, issue.description
            ));
            if issue.kind.is_actionable() {
                md.push_str(&format!("  - Fix: {}\n", issue.suggestion));
            }
        }
        md.push('\n');
    }
    md
}

fn write_markdown_report(
    result: &AnalysisResult,
    heading: &str,
    path: &Path,
) -> Result<(), ReportError> {
    std::fs::write(path, render_markdown(result, heading))?;
    Ok(())
}

fn colorize_type(kind: IssueType) -> colored::ColoredString {
    let label = kind.to_string();
    match kind {
        IssueType::Critical | IssueType::Error => label.red().bold(),
        IssueType::Warning | IssueType::Issue => label.yellow().bold(),
        IssueType::Info | IssueType::Analysis => label.green(),
    }
}

fn colorize_count(critical: usize) -> colored::ColoredString {
    if critical > 0 {
        critical.to_string().red().bold()
    } else {
        critical.to_string().green()
    }
}
