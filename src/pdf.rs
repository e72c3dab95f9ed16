use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Name of the renderer binary
pub const RENDERER_BINARY: &str = "wkhtmltopdf";

/// HTML to PDF renderer abstraction
pub enum Renderer {
    Wkhtmltopdf(Wkhtmltopdf),
    #[cfg(test)]
    Mock(MockRenderer),
}

impl Renderer {
    /// Locate the real renderer binary
    pub fn new(configured_path: Option<&Path>, dpi: u32, extra_args: Vec<String>) -> Result<Self> {
        Ok(Renderer::Wkhtmltopdf(Wkhtmltopdf::new(
            configured_path,
            dpi,
            extra_args,
        )?))
    }

    /// Create a mock renderer for testing
    #[cfg(test)]
    pub fn mock() -> Self {
        Renderer::Mock(MockRenderer::new())
    }

    /// Render an HTML document to a PDF file
    pub fn render(&self, html: &str, output: &Path) -> Result<()> {
        match self {
            Renderer::Wkhtmltopdf(renderer) => renderer.render(html, output),
            #[cfg(test)]
            Renderer::Mock(renderer) => renderer.render(html, output),
        }
    }
}

/// Renderer backed by the `wkhtmltopdf` binary
pub struct Wkhtmltopdf {
    path: PathBuf,
    dpi: u32,
    extra_args: Vec<String>,
}

impl Wkhtmltopdf {
    /// Locate the binary and check that it runs
    pub fn new(configured_path: Option<&Path>, dpi: u32, extra_args: Vec<String>) -> Result<Self> {
        let path = match configured_path {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) if is_bare_name(path) => std::env::var_os("PATH")
                .and_then(|dirs| search_path(path.as_os_str(), &dirs))
                .ok_or_else(|| anyhow!("{:?} not found on PATH", path))?,
            Some(path) => {
                return Err(anyhow!(
                    "{} not found at configured path {:?}",
                    RENDERER_BINARY,
                    path
                ))
            }
            None => which_renderer()?,
        };

        let renderer = Wkhtmltopdf {
            path,
            dpi,
            extra_args,
        };

        let version = renderer.version()?;
        info!("Using {} version {} at {:?}", RENDERER_BINARY, version, renderer.path);

        Ok(renderer)
    }

    /// Query the renderer version
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.path)
            .arg("--version")
            .output()
            .with_context(|| format!("Failed to run {:?} --version", self.path))?;

        if !output.status.success() {
            return Err(anyhow!("{} --version failed", RENDERER_BINARY));
        }

        parse_version(&String::from_utf8_lossy(&output.stdout))
    }

    fn build_command(&self, output: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg("--quiet")
            .arg("--encoding")
            .arg("utf-8")
            .arg("--dpi")
            .arg(self.dpi.to_string())
            // Issue content is untrusted
            .arg("--disable-javascript")
            .args(&self.extra_args)
            // Read the document from stdin
            .arg("-")
            .arg(output);
        cmd
    }

    /// Render an HTML document to `output`
    pub fn render(&self, html: &str, output: &Path) -> Result<()> {
        debug!("Rendering {} bytes of HTML to {:?}", html.len(), output);

        let mut child = self
            .build_command(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", RENDERER_BINARY))?;

        // The renderer may exit before reading everything, so a failed write
        // is only reported once the exit status is known.
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(html.as_bytes()),
            None => Ok(()),
        };

        let result = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", RENDERER_BINARY))?;

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        if !result.status.success() {
            return Err(anyhow!(
                "{} failed with exit code {:?}: stderr={}",
                RENDERER_BINARY,
                result.status.code(),
                if stderr.is_empty() { "(empty)" } else { &stderr }
            ));
        }
        write_result.with_context(|| format!("Failed to write HTML to {}", RENDERER_BINARY))?;
        if !stderr.is_empty() {
            debug!("{} stderr: {}", RENDERER_BINARY, stderr);
        }

        if !output.exists() {
            return Err(anyhow!(
                "{} exited successfully but did not write {:?}",
                RENDERER_BINARY,
                output
            ));
        }

        Ok(())
    }
}

/// Parse version from `wkhtmltopdf --version` output
fn parse_version(output: &str) -> Result<String> {
    // Format: "wkhtmltopdf 0.12.6 (with patched qt)"
    output
        .lines()
        .find_map(|line| {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some(RENDERER_BINARY), Some(version)) => Some(version.to_string()),
                _ => None,
            }
        })
        .ok_or_else(|| anyhow!("Could not parse {} version from output", RENDERER_BINARY))
}

/// A configured renderer given as a command name rather than a path
fn is_bare_name(path: &Path) -> bool {
    path.parent().is_some_and(|parent| parent.as_os_str().is_empty())
}

/// Look `name` up in a `PATH`-style list of directories
fn search_path(name: &OsStr, dirs: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(dirs)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Find the renderer executable
fn which_renderer() -> Result<PathBuf> {
    let common_paths = [
        "/usr/local/bin/wkhtmltopdf",
        "/usr/bin/wkhtmltopdf",
        "/opt/homebrew/bin/wkhtmltopdf",
        "/home/linuxbrew/.linuxbrew/bin/wkhtmltopdf",
        "C:\\Program Files\\wkhtmltopdf\\bin\\wkhtmltopdf.exe",
    ];

    for path in &common_paths {
        let path = Path::new(path);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    if let Ok(output) = Command::new("which").arg(RENDERER_BINARY).output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
    }

    Err(anyhow!(
        "{} not found. Please install it from https://wkhtmltopdf.org/downloads.html",
        RENDERER_BINARY
    ))
}

/// Mock renderer for testing: writes the HTML where the PDF would go
#[cfg(test)]
pub struct MockRenderer {
    pub rendered: std::cell::RefCell<Vec<(PathBuf, String)>>,
    /// Rendering fails for documents containing any of these strings
    pub fail_on: Vec<String>,
}

#[cfg(test)]
impl MockRenderer {
    pub fn new() -> Self {
        MockRenderer {
            rendered: std::cell::RefCell::new(vec![]),
            fail_on: vec![],
        }
    }

    pub fn render(&self, html: &str, output: &Path) -> Result<()> {
        if let Some(marker) = self.fail_on.iter().find(|m| html.contains(m.as_str())) {
            return Err(anyhow!("mock render failure on {:?}", marker));
        }
        std::fs::write(output, html)?;
        self.rendered
            .borrow_mut()
            .push((output.to_path_buf(), html.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let output = "wkhtmltopdf 0.12.6 (with patched qt)\n";
        assert_eq!(parse_version(output).unwrap(), "0.12.6");
        assert!(parse_version("something else").is_err());
    }

    #[test]
    fn test_missing_configured_path() {
        let result = Wkhtmltopdf::new(Some(Path::new("/nonexistent/wkhtmltopdf")), 300, vec![]);
        let err = result.err().unwrap();
        assert!(err.to_string().contains("not found at configured path"));
    }

    #[test]
    fn test_command_arguments() {
        let renderer = Wkhtmltopdf {
            path: PathBuf::from("wkhtmltopdf"),
            dpi: 300,
            extra_args: vec!["--page-size".to_string(), "A4".to_string()],
        };
        let cmd = renderer.build_command(Path::new("out/issue_1.pdf"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--quiet",
                "--encoding",
                "utf-8",
                "--dpi",
                "300",
                "--disable-javascript",
                "--page-size",
                "A4",
                "-",
                "out/issue_1.pdf"
            ]
        );
    }

    #[cfg(unix)]
    fn fake_renderer(dir: &Path, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"--version\" ]; then echo 'wkhtmltopdf 0.12.6 (with patched qt)'; exit 0; fi\n\
             for last; do :; done\n\
             if [ {code} -ne 0 ]; then cat > /dev/null; echo 'render exploded' >&2; exit {code}; fi\n\
             cat > \"$last\"\n",
            code = exit_code
        );
        let path = dir.join("wkhtmltopdf");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_render_with_fake_binary() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_renderer(dir.path(), 0);

        let renderer = Renderer::new(Some(&binary), 300, vec![]).unwrap();
        let output = dir.path().join("issue_1.pdf");
        renderer.render("<h1>Hello</h1>", &output).unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<h1>Hello</h1>");
    }

    #[cfg(unix)]
    #[test]
    fn test_render_failure_includes_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_renderer(dir.path(), 2);

        let renderer = Wkhtmltopdf::new(Some(&binary), 300, vec![]).unwrap();
        assert_eq!(renderer.path, binary);

        let err = renderer
            .render("<p>x</p>", &dir.path().join("out.pdf"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit code Some(2)"));
        assert!(message.contains("render exploded"));
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_reports_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("wkhtmltopdf");
        std::fs::write(
            &binary,
            "#!/bin/sh\n\
             if [ \"$1\" = \"--version\" ]; then echo 'wkhtmltopdf 0.12.6'; exit 0; fi\n\
             echo 'Unknown long argument --bogus' >&2\n\
             exit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let renderer = Wkhtmltopdf::new(Some(&binary), 300, vec!["--bogus".to_string()]).unwrap();
        let html = "<p>padding</p>".repeat(300_000);
        let err = renderer
            .render(&html, &dir.path().join("out.pdf"))
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("exit code Some(1)"), "{}", message);
        assert!(message.contains("Unknown long argument --bogus"), "{}", message);
    }

    #[test]
    fn test_bare_name_detection() {
        assert!(is_bare_name(Path::new("wkhtmltopdf")));
        assert!(!is_bare_name(Path::new("./wkhtmltopdf")));
        assert!(!is_bare_name(Path::new("/usr/bin/wkhtmltopdf")));
    }

    #[test]
    fn test_search_path() {
        let empty = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        std::fs::write(bin.path().join("wkhtmltopdf"), "").unwrap();

        let dirs = std::env::join_paths([empty.path(), bin.path()]).unwrap();
        assert_eq!(
            search_path(OsStr::new("wkhtmltopdf"), &dirs),
            Some(bin.path().join("wkhtmltopdf"))
        );
        assert_eq!(search_path(OsStr::new("missing"), &dirs), None);
    }
}
