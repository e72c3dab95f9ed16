//! HTML document assembly for issues.

use anyhow::Result;
use std::fmt::Write;

use crate::github::{IssueThread, RepoRef};
use crate::markdown::{escape_html, optional_markdown_to_html};

const STYLESHEET: &str = r#"
    body {
      font-family: Arial, sans-serif;
      margin: 20px;
      line-height: 1.4;
    }
    pre, code {
      background: #f5f5f5;
      padding: 5px;
      font-family: monospace;
      white-space: pre-wrap;
      word-wrap: break-word;
    }
    pre code {
      padding: 0;
    }
    h1, h2, h3 {
      margin-top: 1em;
    }
    img {
      max-width: 100%;
    }
    table {
      border-collapse: collapse;
    }
    th, td {
      border: 1px solid #ccc;
      padding: 4px 8px;
    }
    .metadata, .comments {
      margin: 1em 0;
    }
    .comment {
      border-top: 1px solid #ccc;
      padding-top: 1em;
      margin-top: 1em;
    }
    .comment:first-of-type {
      border-top: none;
      margin-top: 0;
      padding-top: 0;
    }
    .cover + .issue, .issue + .issue {
      page-break-before: always;
    }
"#;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render a standalone HTML document for one issue
pub fn render_issue(thread: &IssueThread) -> Result<String> {
    let issue = &thread.issue;
    let title = format!("Issue #{} - {}", issue.number, issue.title);

    let mut output = String::new();
    write_head(&mut output, &title)?;
    write_issue_section(&mut output, thread)?;
    write_tail(&mut output)?;

    Ok(output)
}

/// Render every issue of a repository into one document, one issue per page
pub fn render_combined(repo: &RepoRef, threads: &[IssueThread]) -> Result<String> {
    let title = format!("Issues for {}", repo);

    let mut output = String::new();
    write_head(&mut output, &title)?;

    writeln!(&mut output, "  <div class=\"cover\">")?;
    writeln!(&mut output, "    <h1>{}</h1>", escape_html(&title))?;
    writeln!(&mut output, "    <p>{} issues</p>", threads.len())?;
    writeln!(&mut output, "  </div>")?;

    for thread in threads {
        write_issue_section(&mut output, thread)?;
    }

    write_tail(&mut output)?;
    Ok(output)
}

fn write_head(output: &mut String, title: &str) -> Result<()> {
    writeln!(output, "<!DOCTYPE html>")?;
    writeln!(output, "<html lang=\"en\">")?;
    writeln!(output, "<head>")?;
    writeln!(output, "  <meta charset=\"UTF-8\">")?;
    writeln!(output, "  <title>{}</title>", escape_html(title))?;
    writeln!(output, "  <style>{}  </style>", STYLESHEET)?;
    writeln!(output, "</head>")?;
    writeln!(output, "<body>")?;
    Ok(())
}

fn write_tail(output: &mut String) -> Result<()> {
    writeln!(output, "</body>")?;
    writeln!(output, "</html>")?;
    Ok(())
}

fn write_issue_section(output: &mut String, thread: &IssueThread) -> Result<()> {
    let issue = &thread.issue;

    writeln!(output, "<div class=\"issue\">")?;
    writeln!(
        output,
        "  <h1>Issue #{}: {}</h1>",
        issue.number,
        escape_html(&issue.title)
    )?;

    writeln!(output, "  <div class=\"metadata\">")?;
    write_field(output, "State", &issue.state.as_str().to_uppercase())?;
    write_field(
        output,
        "Created at",
        &issue.created_at.strftime(TIMESTAMP_FORMAT).to_string(),
    )?;
    write_field(output, "Author", issue.author_login())?;
    write_field(output, "Locked", if issue.locked { "Yes" } else { "No" })?;
    write_field(
        output,
        "Milestone",
        issue.milestone.as_ref().map_or("None", |m| m.title.as_str()),
    )?;
    write_list_field(output, "Labels", issue.labels.iter().map(|l| l.name.as_str()))?;
    write_list_field(
        output,
        "Assignees",
        issue.assignees.iter().map(|a| a.login.as_str()),
    )?;
    writeln!(output, "  </div>")?;

    writeln!(output, "  <hr/>")?;
    writeln!(output, "  <div class=\"issue-body\">")?;
    writeln!(output, "{}", optional_markdown_to_html(issue.body.as_deref()))?;
    writeln!(output, "  </div>")?;

    writeln!(output, "  <hr/>")?;
    writeln!(output, "  <div class=\"comments\">")?;
    writeln!(output, "    <h2>Comments ({})</h2>", thread.comments.len())?;
    for comment in &thread.comments {
        writeln!(output, "    <div class=\"comment\">")?;
        writeln!(
            output,
            "      <p><strong>{}</strong> commented on {}</p>",
            escape_html(comment.author_login()),
            comment.created_at.strftime(TIMESTAMP_FORMAT)
        )?;
        writeln!(
            output,
            "      <div>{}</div>",
            optional_markdown_to_html(comment.body.as_deref())
        )?;
        writeln!(output, "    </div>")?;
    }
    writeln!(output, "  </div>")?;
    writeln!(output, "</div>")?;

    Ok(())
}

fn write_field(output: &mut String, name: &str, value: &str) -> Result<()> {
    writeln!(
        output,
        "    <p><strong>{}:</strong> {}</p>",
        name,
        escape_html(value)
    )?;
    Ok(())
}

fn write_list_field<'a>(
    output: &mut String,
    name: &str,
    values: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let joined = values.collect::<Vec<_>>().join(", ");
    let value = if joined.is_empty() { "None" } else { joined.as_str() };
    write_field(output, name, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Author, Milestone};
    use crate::test_utils::{create_test_comment, create_test_issue, create_test_issue_with_labels};

    #[test]
    fn test_issue_document_contains_title_and_markdown() {
        let mut issue = create_test_issue(42, "Crash on <startup>", false);
        issue.body = Some("Steps:\n\n1. run `app`\n2. **boom**".to_string());
        let thread = IssueThread {
            issue,
            comments: vec![
                create_test_comment(1, "Can reproduce with _nightly_"),
                create_test_comment(2, "Fixed in #43"),
            ],
        };

        let html = render_issue(&thread).unwrap();

        assert!(html.contains("<title>Issue #42 - Crash on &lt;startup&gt;</title>"));
        assert!(html.contains("<h1>Issue #42: Crash on &lt;startup&gt;</h1>"));
        assert!(html.contains("<code>app</code>"));
        assert!(html.contains("<strong>boom</strong>"));
        assert!(html.contains("<h2>Comments (2)</h2>"));
        assert!(html.contains("<strong>commenter1</strong> commented on 2024-01-11 00:00:00 UTC"));
        assert!(html.contains("<em>nightly</em>"));
        assert!(html.contains("Fixed in #43"));
    }

    #[test]
    fn test_issue_metadata() {
        let mut issue = create_test_issue_with_labels(7, "Labelled", vec!["bug", "p1"]);
        issue.locked = true;
        issue.milestone = Some(Milestone {
            title: "v1.0".to_string(),
        });
        issue.assignees = vec![Author {
            login: "alice".to_string(),
            user_type: None,
        }];
        let thread = IssueThread {
            issue,
            comments: vec![],
        };

        let html = render_issue(&thread).unwrap();

        assert!(html.contains("<p><strong>State:</strong> OPEN</p>"));
        assert!(html.contains("<p><strong>Created at:</strong> 2024-01-11 00:00:00 UTC</p>"));
        assert!(html.contains("<p><strong>Author:</strong> testuser</p>"));
        assert!(html.contains("<p><strong>Locked:</strong> Yes</p>"));
        assert!(html.contains("<p><strong>Milestone:</strong> v1.0</p>"));
        assert!(html.contains("<p><strong>Labels:</strong> bug, p1</p>"));
        assert!(html.contains("<p><strong>Assignees:</strong> alice</p>"));
        assert!(html.contains("<h2>Comments (0)</h2>"));
    }

    #[test]
    fn test_missing_metadata_shows_none() {
        let mut issue = create_test_issue(3, "Bare", false);
        issue.user = None;
        issue.body = None;
        let html = render_issue(&IssueThread {
            issue,
            comments: vec![],
        })
        .unwrap();

        assert!(html.contains("<p><strong>Author:</strong> unknown</p>"));
        assert!(html.contains("<p><strong>Milestone:</strong> None</p>"));
        assert!(html.contains("<p><strong>Labels:</strong> None</p>"));
        assert!(html.contains("<p><strong>Assignees:</strong> None</p>"));
    }

    #[test]
    fn test_combined_document() {
        let threads = vec![
            IssueThread {
                issue: create_test_issue(1, "First", false),
                comments: vec![],
            },
            IssueThread {
                issue: create_test_issue(2, "Second", false),
                comments: vec![create_test_comment(9, "reply")],
            },
        ];

        let html = render_combined(&RepoRef::new("owner", "repo"), &threads).unwrap();

        assert_eq!(html.matches("<!DOCTYPE html>").count(), 1);
        assert!(html.contains("<title>Issues for owner/repo</title>"));
        assert!(html.contains("<p>2 issues</p>"));
        assert!(html.contains("<h1>Issue #1: First</h1>"));
        assert!(html.contains("<h1>Issue #2: Second</h1>"));
        assert_eq!(html.matches("<div class=\"issue\">").count(), 2);
        assert!(html.find("Issue #1: First").unwrap() < html.find("Issue #2: Second").unwrap());
    }

    #[test]
    fn test_combined_document_breaks_before_first_issue() {
        let threads = vec![IssueThread {
            issue: create_test_issue(1, "Only", false),
            comments: vec![],
        }];

        let html = render_combined(&RepoRef::new("owner", "repo"), &threads).unwrap();

        // The first issue follows the cover directly and must start a new page
        let cover_end = html.find("  </div>\n<div class=\"issue\">");
        assert!(cover_end.is_some(), "{}", html);
        assert!(html.contains(".cover + .issue"));
    }
}
