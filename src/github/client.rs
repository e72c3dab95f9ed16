use crate::github::models::*;
use crate::github::{RepoRef, StateFilter};
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gh-issues-pdf/", env!("CARGO_PKG_VERSION"));

/// GitHub client abstraction
pub enum GitHubClient {
    Real(RealGitHub),
    #[cfg(test)]
    Mock(MockGitHub),
}

impl GitHubClient {
    /// Create a new real GitHub client
    pub fn new(token: &str, api_url: &str, per_page: u32) -> Result<Self> {
        Ok(GitHubClient::Real(RealGitHub::new(token, api_url, per_page)?))
    }

    /// Create a mock client for testing
    #[cfg(test)]
    pub fn mock() -> Self {
        GitHubClient::Mock(MockGitHub::new())
    }

    /// Fetch all issues of a repository, skipping pull requests
    pub fn fetch_issues(&self, repo: &RepoRef, state: StateFilter) -> Result<Vec<Issue>> {
        let mut issues = match self {
            GitHubClient::Real(client) => client.fetch_issues(repo, state)?,
            #[cfg(test)]
            GitHubClient::Mock(client) => client.fetch_issues(repo, state)?,
        };

        let total = issues.len();
        issues.retain(|issue| !issue.is_pull_request());
        if issues.len() < total {
            debug!("Skipped {} pull requests", total - issues.len());
        }

        Ok(issues)
    }

    /// Fetch a single issue by number
    pub fn fetch_issue(&self, repo: &RepoRef, number: u32) -> Result<Issue> {
        let issue = match self {
            GitHubClient::Real(client) => client.fetch_issue(repo, number)?,
            #[cfg(test)]
            GitHubClient::Mock(client) => client.fetch_issue(repo, number)?,
        };

        if issue.is_pull_request() {
            return Err(anyhow!("#{} in {} is a pull request, not an issue", number, repo));
        }

        Ok(issue)
    }

    /// Fetch all comments on an issue, oldest first
    pub fn fetch_comments(&self, repo: &RepoRef, issue_number: u32) -> Result<Vec<Comment>> {
        match self {
            GitHubClient::Real(client) => client.fetch_comments(repo, issue_number),
            #[cfg(test)]
            GitHubClient::Mock(client) => client.fetch_comments(repo, issue_number),
        }
    }
}

/// Real GitHub client talking to the REST API
pub struct RealGitHub {
    client: HttpClient,
    api_url: String,
    per_page: u32,
}

impl RealGitHub {
    /// Create a new real GitHub client
    pub fn new(token: &str, api_url: &str, per_page: u32) -> Result<Self> {
        if per_page == 0 || per_page > crate::github::MAX_PER_PAGE {
            return Err(anyhow!(
                "per_page must be between 1 and {}, got {}",
                crate::github::MAX_PER_PAGE,
                per_page
            ));
        }

        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(Self::build_headers(token)?)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(RealGitHub {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            per_page,
        })
    }

    /// Build request headers
    fn build_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("Invalid GITHUB_TOKEN format")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        Ok(headers)
    }

    /// GET a single JSON document
    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        Self::handle_response(response)
    }

    /// GET every page of a list endpoint
    fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", self.per_page.to_string()));
            page_query.push(("page", page.to_string()));

            let batch: Vec<T> = self.get_json(path, &page_query)?;
            let batch_len = batch.len();
            items.extend(batch);

            // A short page is the last one
            if batch_len < self.per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Handle API response
    fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().context("Failed to read response body")?;

        if status.is_success() {
            serde_json::from_str(&body).context("Failed to parse GitHub API response")
        } else if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
            Err(anyhow!("GitHub API error ({}): {}", status, error.message))
        } else {
            Err(anyhow!("GitHub API error ({}): {}", status, body))
        }
    }

    /// Fetch issues (and pull requests) for a repository
    pub fn fetch_issues(&self, repo: &RepoRef, state: StateFilter) -> Result<Vec<Issue>> {
        info!("Fetching {} issues for {}", state.as_str(), repo);
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        self.get_paginated(&path, &[("state", state.as_str().to_string())])
            .with_context(|| format!("Failed to fetch issues for {}", repo))
    }

    /// Fetch a single issue
    pub fn fetch_issue(&self, repo: &RepoRef, number: u32) -> Result<Issue> {
        let path = format!("/repos/{}/{}/issues/{}", repo.owner, repo.name, number);
        self.get_json(&path, &[])
            .with_context(|| format!("Failed to fetch issue #{} from {}", number, repo))
    }

    /// Fetch comments for an issue
    pub fn fetch_comments(&self, repo: &RepoRef, issue_number: u32) -> Result<Vec<Comment>> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo.owner, repo.name, issue_number
        );
        self.get_paginated(&path, &[])
            .with_context(|| format!("Failed to fetch comments for issue #{}", issue_number))
    }
}

/// Mock GitHub client for testing
#[cfg(test)]
pub struct MockGitHub {
    pub issues: Vec<Issue>,
    pub comments: std::collections::HashMap<u32, Vec<Comment>>,
    pub comment_calls: std::cell::RefCell<Vec<u32>>,
}

#[cfg(test)]
impl MockGitHub {
    pub fn new() -> Self {
        MockGitHub {
            issues: vec![],
            comments: std::collections::HashMap::new(),
            comment_calls: std::cell::RefCell::new(vec![]),
        }
    }

    pub fn fetch_issues(&self, _repo: &RepoRef, state: StateFilter) -> Result<Vec<Issue>> {
        Ok(self
            .issues
            .iter()
            .filter(|issue| match state {
                StateFilter::All => true,
                StateFilter::Open => issue.state == IssueState::Open,
                StateFilter::Closed => issue.state == IssueState::Closed,
            })
            .cloned()
            .collect())
    }

    pub fn fetch_issue(&self, _repo: &RepoRef, number: u32) -> Result<Issue> {
        self.issues
            .iter()
            .find(|i| i.number == number)
            .cloned()
            .ok_or_else(|| anyhow!("GitHub API error (404 Not Found): Issue #{} not found", number))
    }

    pub fn fetch_comments(&self, _repo: &RepoRef, issue_number: u32) -> Result<Vec<Comment>> {
        self.comment_calls.borrow_mut().push(issue_number);
        Ok(self.comments.get(&issue_number).cloned().unwrap_or_default())
    }
}
