use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::{Captures, Regex};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CONTENT_TYPE: &str = "image/png";

fn img_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"(https?://[^"]*)"|'(https?://[^']*)')"#)
            .expect("valid img src regex")
    })
}

/// Replaces remote `<img>` sources with base64 `data:` URLs so that the
/// renderer never needs network access, and private attachments show up.
pub struct ImageInliner {
    client: HttpClient,
    token: Option<String>,
    // url -> data url, or None when the download failed
    cache: HashMap<String, Option<String>>,
}

impl ImageInliner {
    /// Create an inliner. The token is only sent to GitHub hosts.
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("gh-issues-pdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client for images")?;

        Ok(ImageInliner {
            client,
            token,
            cache: HashMap::new(),
        })
    }

    /// Inline every remote image in `html`. Images that cannot be fetched
    /// keep their original `src`.
    pub fn inline(&mut self, html: &str) -> String {
        img_src_regex()
            .replace_all(html, |caps: &Captures| {
                let prefix = &caps[1];
                let raw_src = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());

                match self.data_url_for(raw_src) {
                    Some(data_url) => format!("{}\"{}\"", prefix, data_url),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn data_url_for(&mut self, raw_src: &str) -> Option<String> {
        let url = raw_src.replace("&amp;", "&");
        if let Some(cached) = self.cache.get(&url) {
            return cached.clone();
        }

        let result = match self.fetch_data_url(&url) {
            Ok(data_url) => {
                debug!("Inlined image {} ({} bytes encoded)", url, data_url.len());
                Some(data_url)
            }
            Err(e) => {
                warn!("Could not inline image {}: {:#}", url, e);
                None
            }
        };

        self.cache.insert(url, result.clone());
        result
    }

    fn fetch_data_url(&self, url: &str) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            if is_github_host(url) {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token.trim()));
            }
        }

        let response = request.send().context("Failed to download image")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("status={}", status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bytes = response.bytes().context("Failed to read image body")?;
        Ok(format!(
            "data:{};base64,{}",
            content_type,
            STANDARD.encode(&bytes)
        ))
    }
}

/// Whether a URL points at a host that should receive the GitHub token
pub fn is_github_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "https" {
        return false;
    }
    match parsed.host_str() {
        Some(host) => {
            host == "github.com"
                || host.ends_with(".github.com")
                || host.ends_with(".githubusercontent.com")
        }
        None => false,
    }
}
