use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::{Config, OutputFormat};
use crate::document::{render_combined, render_issue};
use crate::github::{GitHubClient, Issue, IssueThread, RepoRef};
use crate::images::ImageInliner;
use crate::pdf::Renderer;
use crate::progress::ProgressReporter;

/// Name of the per-run error log inside the output directory
pub const ERROR_LOG: &str = "error_log.txt";

/// Outcome of an export run
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An issue (or the combined document, when `issue_number` is `None`)
/// that could not be written
#[derive(Debug)]
pub struct ExportFailure {
    pub issue_number: Option<u32>,
    pub error: String,
}

/// Fetches issues, converts them to documents and writes them out
pub struct Exporter<'a> {
    github: GitHubClient,
    renderer: Option<Renderer>,
    inliner: Option<ImageInliner>,
    config: &'a Config,
    progress: ProgressReporter,
}

impl<'a> Exporter<'a> {
    /// Create an exporter. A renderer is required for PDF output.
    pub fn new(
        github: GitHubClient,
        renderer: Option<Renderer>,
        inliner: Option<ImageInliner>,
        config: &'a Config,
    ) -> Result<Self> {
        if config.output.format == OutputFormat::Pdf && renderer.is_none() {
            return Err(anyhow!("PDF output requires a renderer"));
        }

        Ok(Exporter {
            github,
            renderer,
            inliner,
            config,
            progress: ProgressReporter::new(),
        })
    }

    /// Replace the progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Export the issues of `repo`. With an empty `selected`, every issue
    /// matching the configured state is exported.
    pub fn run(&mut self, repo: &RepoRef, selected: &[u32]) -> Result<ExportSummary> {
        let issues = self.collect_issues(repo, selected)?;

        let output_dir = self.config.output_dir_for(repo);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

        let mut summary = ExportSummary {
            output_dir: output_dir.clone(),
            ..Default::default()
        };

        if issues.is_empty() {
            info!("No issues to export for {}", repo);
            return Ok(summary);
        }

        self.progress.start(issues.len());

        if self.config.output.combined {
            self.export_combined(repo, issues, &output_dir, &mut summary)?;
        } else {
            for issue in issues {
                self.export_single(repo, issue, &output_dir, &mut summary)?;
            }
        }

        self.progress.finish();
        Ok(summary)
    }

    fn collect_issues(&self, repo: &RepoRef, selected: &[u32]) -> Result<Vec<Issue>> {
        if selected.is_empty() {
            return self.github.fetch_issues(repo, self.config.github.state);
        }

        selected
            .iter()
            .map(|&number| self.github.fetch_issue(repo, number))
            .collect()
    }

    fn fetch_thread(&self, repo: &RepoRef, issue: Issue) -> Result<IssueThread> {
        let comments = if issue.comments == 0 {
            Vec::new()
        } else {
            self.github.fetch_comments(repo, issue.number)?
        };
        debug!("Issue #{} has {} comments", issue.number, comments.len());

        Ok(IssueThread { issue, comments })
    }

    fn export_single(
        &mut self,
        repo: &RepoRef,
        issue: Issue,
        output_dir: &Path,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let number = issue.number;
        self.progress.issue_started(number, &issue.title);

        let thread = self.fetch_thread(repo, issue)?;
        let html = self.finish_html(render_issue(&thread)?);

        let path = output_dir.join(format!(
            "issue_{}.{}",
            number,
            self.config.output.format.extension()
        ));

        match self.write_document(&html, &path) {
            Ok(()) => {
                self.progress
                    .println(format!("  -> Issue #{} -> {}", number, path.display()));
                summary.written.push(path);
            }
            Err(e) => self.record_failure(output_dir, Some(number), e, summary)?,
        }

        self.progress.issue_finished();
        Ok(())
    }

    fn export_combined(
        &mut self,
        repo: &RepoRef,
        mut issues: Vec<Issue>,
        output_dir: &Path,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        // Read in issue order
        issues.sort_by_key(|issue| issue.number);

        let mut threads = Vec::with_capacity(issues.len());
        for issue in issues {
            self.progress.issue_started(issue.number, &issue.title);
            threads.push(self.fetch_thread(repo, issue)?);
            self.progress.issue_finished();
        }

        let html = self.finish_html(render_combined(repo, &threads)?);
        let path = output_dir.join(format!(
            "{}-issues.{}",
            repo.slug(),
            self.config.output.format.extension()
        ));

        match self.write_document(&html, &path) {
            Ok(()) => {
                self.progress.println(format!(
                    "  -> {} issues -> {}",
                    threads.len(),
                    path.display()
                ));
                summary.written.push(path);
            }
            Err(e) => self.record_failure(output_dir, None, e, summary)?,
        }

        Ok(())
    }

    fn finish_html(&mut self, html: String) -> String {
        match self.inliner.as_mut() {
            Some(inliner) => inliner.inline(&html),
            None => html,
        }
    }

    fn write_document(&self, html: &str, path: &Path) -> Result<()> {
        match (self.config.output.format, &self.renderer) {
            (OutputFormat::Html, _) => {
                fs::write(path, html).with_context(|| format!("Failed to write {:?}", path))
            }
            (OutputFormat::Pdf, Some(renderer)) => renderer.render(html, path),
            (OutputFormat::Pdf, None) => Err(anyhow!("PDF output requires a renderer")),
        }
    }

    fn record_failure(
        &self,
        output_dir: &Path,
        issue_number: Option<u32>,
        err: anyhow::Error,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let subject = match issue_number {
            Some(number) => format!("Issue #{}", number),
            None => "Combined document".to_string(),
        };
        let message = format!(
            "{} - {} generation error: {:#}",
            subject,
            self.config.output.format.extension().to_uppercase(),
            err
        );

        error!("{}", message);
        append_error_log(output_dir, &message)?;

        summary.failures.push(ExportFailure {
            issue_number,
            error: format!("{:#}", err),
        });
        Ok(())
    }
}

/// Append a timestamped line to the error log in `output_dir`
pub fn append_error_log(output_dir: &Path, message: &str) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {:?}", output_dir))?;

    let log_path = output_dir.join(ERROR_LOG);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {:?}", log_path))?;

    let now = jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] {}", now, message)
        .with_context(|| format!("Failed to write to {:?}", log_path))?;

    Ok(())
}
