use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

mod client;
mod models;

pub use client::*;
pub use models::*;

#[cfg(test)]
pub use client::MockGitHub;

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Maximum page size GitHub accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Get the access token from the environment
pub fn get_token() -> Result<String> {
    let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;
    if token.trim().is_empty() {
        return Err(anyhow!("GITHUB_TOKEN is empty"));
    }
    Ok(token)
}

/// A repository reference of the form `owner/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner-name`, used for output directory and file names
    pub fn slug(&self) -> String {
        format!("{}-{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_end_matches('/');
        let s = s
            .strip_prefix("https://github.com/")
            .unwrap_or(s);

        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(RepoRef::new(owner, name))
            }
            _ => Err(anyhow!(
                "Invalid repository '{}': expected the form owner/repo",
                s
            )),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Which issues to export, by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    #[default]
    All,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}
