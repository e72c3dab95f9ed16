//! Test utilities for gh-issues-pdf
#![cfg(test)]

use crate::github::{Author, Comment, GitHubClient, Issue, IssueState, Label, MockGitHub, PullRequestRef};
use jiff::Timestamp;

/// Create a mock GitHub client with test data
pub fn create_test_github_client() -> GitHubClient {
    let mut mock = MockGitHub::new();

    mock.issues.push(create_test_issue(1, "Test Issue 1", false));
    mock.issues.push(create_test_issue(2, "Test PR 1", true));

    GitHubClient::Mock(mock)
}

fn fixed_timestamp() -> Timestamp {
    // 2024-01-11T00:00:00Z
    Timestamp::from_second(1704931200).unwrap()
}

/// Create a test issue
pub fn create_test_issue(number: u32, title: &str, is_pr: bool) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: Some(format!("Body of **{}**", title)),
        state: IssueState::Open,
        user: Some(Author {
            login: "testuser".to_string(),
            user_type: Some("User".to_string()),
        }),
        created_at: fixed_timestamp(),
        updated_at: fixed_timestamp(),
        locked: false,
        labels: vec![],
        assignees: vec![],
        milestone: None,
        comments: 0,
        html_url: format!(
            "https://github.com/test/repo/{}/{}",
            if is_pr { "pull" } else { "issues" },
            number
        ),
        pull_request: is_pr.then(|| PullRequestRef {
            url: Some(format!("https://api.github.com/repos/test/repo/pulls/{}", number)),
        }),
    }
}

/// Create a test issue with labels
pub fn create_test_issue_with_labels(number: u32, title: &str, labels: Vec<&str>) -> Issue {
    let mut issue = create_test_issue(number, title, false);
    issue.labels = labels
        .into_iter()
        .map(|name| Label {
            name: name.to_string(),
            color: Some("blue".to_string()),
            description: None,
        })
        .collect();
    issue
}

/// Create a test comment
pub fn create_test_comment(id: u64, body: &str) -> Comment {
    Comment {
        id,
        body: Some(body.to_string()),
        user: Some(Author {
            login: format!("commenter{}", id),
            user_type: Some("User".to_string()),
        }),
        created_at: fixed_timestamp(),
        updated_at: fixed_timestamp(),
    }
}
