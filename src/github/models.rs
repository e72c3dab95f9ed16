use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// An issue as returned by the GitHub REST API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Issue {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    /// `None` for issues opened by deleted accounts
    pub user: Option<Author>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub assignees: Vec<Author>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    /// Number of comments on the issue
    #[serde(default)]
    pub comments: u32,
    pub html_url: String,
    /// Present only when the item is a pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,
}

impl Issue {
    /// Pull requests come back from the issues endpoint too
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Login of the issue author, or "unknown"
    pub fn author_login(&self) -> &str {
        self.user.as_ref().map_or("unknown", |u| u.login.as_str())
    }
}

/// Issue state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// Author information
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Author {
    pub login: String,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
}

/// Label on an issue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// Milestone an issue belongs to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Milestone {
    pub title: String,
}

/// Marker object GitHub attaches to pull requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequestRef {
    pub url: Option<String>,
}

/// A comment on an issue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub user: Option<Author>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comment {
    pub fn author_login(&self) -> &str {
        self.user.as_ref().map_or("unknown", |u| u.login.as_str())
    }
}

/// An issue together with its comments, oldest first
#[derive(Debug, Clone)]
pub struct IssueThread {
    pub issue: Issue,
    pub comments: Vec<Comment>,
}

/// Error body returned by the GitHub API
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}
