use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::github::{RepoRef, StateFilter, DEFAULT_API_URL, MAX_PER_PAGE};

const CONFIG_HEADER: &str = "\
# gh-issues-pdf configuration
#
# Set the repository to export, for example:
#
# [github]
# owner = \"octocat\"
# repo = \"Hello-World\"
#
# The access token is read from the GITHUB_TOKEN environment variable.

";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// Account that owns the repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub state: StateFilter,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Write all issues into a single document
    #[serde(default)]
    pub combined: bool,
    #[serde(default = "default_inline_images")]
    pub inline_images: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RendererConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Passed to the renderer verbatim, before the input and output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    /// The HTML that would be handed to the renderer
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
        }
    }
}

impl Config {
    /// Load configuration from the default location or a specified path.
    ///
    /// An explicitly given path must exist. A missing file at the default
    /// location yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?;

        // Expand home directory in paths
        config.output.dir = expand_tilde(&config.output.dir)?;
        if let Some(path) = &config.renderer.path {
            config.renderer.path = Some(expand_tilde(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Write a commented default configuration to `path`, creating parent
    /// directories. Returns `false` without touching an existing file.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        let body = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        std::fs::write(path, format!("{}{}", CONFIG_HEADER, body))
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(true)
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("gh-issues-pdf").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.github.per_page == 0 || self.github.per_page > MAX_PER_PAGE {
            return Err(anyhow!(
                "github.per_page must be between 1 and {}",
                MAX_PER_PAGE
            ));
        }
        if self.renderer.dpi == 0 {
            return Err(anyhow!("renderer.dpi must be greater than zero"));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if let Some(repo) = &cli.repo {
            self.github.owner = Some(repo.owner.clone());
            self.github.repo = Some(repo.name.clone());
        }
        if let Some(state) = cli.state {
            self.github.state = state;
        }
        if let Some(dir) = &cli.output_dir {
            self.output.dir = expand_tilde(dir)?;
        }
        if let Some(format) = cli.format {
            self.output.format = format;
        }
        if cli.combined {
            self.output.combined = true;
        }
        if cli.no_inline_images {
            self.output.inline_images = false;
        }
        if let Some(path) = &cli.renderer {
            self.renderer.path = Some(expand_tilde(path)?);
        }
        if let Some(dpi) = cli.dpi {
            self.renderer.dpi = dpi;
        }
        self.validate()
    }

    /// The repository to export
    pub fn repo_ref(&self) -> Result<RepoRef> {
        match (&self.github.owner, &self.github.repo) {
            (Some(owner), Some(repo)) => Ok(RepoRef::new(owner, repo)),
            _ => Err(anyhow!(
                "No repository given. Pass OWNER/REPO or set github.owner and github.repo in the config file"
            )),
        }
    }

    /// Directory the files for `repo` are written to
    pub fn output_dir_for(&self, repo: &RepoRef) -> PathBuf {
        self.output.dir.join(repo.slug())
    }
}

/// Expand tilde in paths to home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(s) = path.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            let home = dirs::home_dir().context("Could not determine home directory")?;
            return Ok(home.join(rest));
        }
    }
    Ok(path.to_path_buf())
}

// Default value functions
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Exported_PDFs")
}

fn default_inline_images() -> bool {
    true
}

fn default_dpi() -> u32 {
    300
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            owner: None,
            repo: None,
            state: StateFilter::default(),
            api_url: default_api_url(),
            per_page: default_per_page(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            combined: false,
            inline_images: default_inline_images(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            path: None,
            dpi: default_dpi(),
            extra_args: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.github.state, StateFilter::All);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.output.dir, PathBuf::from("Exported_PDFs"));
        assert_eq!(config.output.format, OutputFormat::Pdf);
        assert!(!config.output.combined);
        assert!(config.output.inline_images);
        assert_eq!(config.renderer.dpi, 300);
        assert!(config.renderer.path.is_none());
        assert!(config.repo_ref().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let home = dirs::home_dir().unwrap();
        let path = PathBuf::from("~/test/path");
        let expanded = expand_tilde(&path).unwrap();

        assert_eq!(expanded, home.join("test/path"));

        let absolute_path = PathBuf::from("/absolute/path");
        let expanded = expand_tilde(&absolute_path).unwrap();
        assert_eq!(expanded, absolute_path);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[github]
owner = "octocat"
repo = "Hello-World"
state = "closed"

[renderer]
dpi = 150
extra_args = ["--page-size", "A4"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.repo_ref().unwrap(), RepoRef::new("octocat", "Hello-World"));
        assert_eq!(config.github.state, StateFilter::Closed);
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.renderer.dpi, 150);
        assert_eq!(config.renderer.extra_args, vec!["--page-size", "A4"]);
        assert!(config.output.inline_images);
        assert_eq!(
            config.output_dir_for(&config.repo_ref().unwrap()),
            PathBuf::from("Exported_PDFs/octocat-Hello-World")
        );
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_load_rejects_bad_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[github]\nper_page = 500\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("per_page"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.github.owner = Some("from-file".to_string());
        config.github.repo = Some("repo".to_string());

        let cli = Cli::parse_from([
            "gh-issues-pdf",
            "rust-lang/rust",
            "--state",
            "open",
            "--output-dir",
            "/tmp/out",
            "--format",
            "html",
            "--combined",
            "--no-inline-images",
            "--dpi",
            "96",
        ]);
        config.apply_cli(&cli).unwrap();

        assert_eq!(config.repo_ref().unwrap(), RepoRef::new("rust-lang", "rust"));
        assert_eq!(config.github.state, StateFilter::Open);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.output.format, OutputFormat::Html);
        assert!(config.output.combined);
        assert!(!config.output.inline_images);
        assert_eq!(config.renderer.dpi, 96);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[renderer]"));

        let config2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.renderer.dpi, config2.renderer.dpi);
        assert_eq!(config.output.dir, config2.output.dir);
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        assert!(Config::write_default(&path).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# gh-issues-pdf configuration"));

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.output.format, OutputFormat::Pdf);
        assert!(config.github.owner.is_none());

        std::fs::write(&path, "[renderer]\ndpi = 72\n").unwrap();
        assert!(!Config::write_default(&path).unwrap());
        assert_eq!(Config::load(Some(&path)).unwrap().renderer.dpi, 72);
    }
}
