use std::fmt;

/// User-friendly error wrapper
#[derive(Debug)]
pub struct UserError {
    message: String,
    details: Option<String>,
    suggestion: Option<String>,
}

impl UserError {
    /// Create a new user error
    pub fn new(message: impl Into<String>) -> Self {
        UserError {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    /// Add details about the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a suggestion for how to fix the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Format the error for display
    pub fn display(&self) {
        eprintln!("\n❌ Error: {}", self.message);

        if let Some(ref details) = self.details {
            eprintln!("\n   {}", details);
        }

        if let Some(ref suggestion) = self.suggestion {
            eprintln!("\n💡 {}", suggestion);
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for UserError {}

/// Convert common errors to user-friendly messages
pub fn user_friendly_error(error: &anyhow::Error) -> UserError {
    // Include the whole context chain
    let error_str = format!("{:#}", error);

    if error_str.contains("GITHUB_TOKEN") {
        return UserError::new("GitHub token not configured")
            .with_details("Fetching issues requires a GitHub access token")
            .with_suggestion("Set the GITHUB_TOKEN environment variable or pass --token");
    }

    if error_str.contains("wkhtmltopdf not found") || error_str.contains("Failed to spawn wkhtmltopdf") {
        return UserError::new("wkhtmltopdf is not installed")
            .with_details("The 'wkhtmltopdf' command is required to produce PDF files")
            .with_suggestion(
                "Install it from https://wkhtmltopdf.org/downloads.html, pass --renderer, or use --format html",
            );
    }

    if error_str.contains("(401 ") {
        return UserError::new("GitHub rejected the access token")
            .with_details(error_str)
            .with_suggestion("Check that GITHUB_TOKEN is valid and has not expired");
    }

    if error_str.to_lowercase().contains("rate limit") {
        return UserError::new("GitHub API rate limit exceeded")
            .with_details("Too many requests have been made recently")
            .with_suggestion("Wait a few minutes and try again");
    }

    if error_str.contains("(403 ") {
        return UserError::new("Access to the repository was denied")
            .with_details(error_str)
            .with_suggestion("Make sure the token has read access to the repository's issues");
    }

    if error_str.contains("(404 ") {
        return UserError::new("Repository or issue not found")
            .with_details(error_str)
            .with_suggestion(
                "Check the OWNER/REPO spelling; private repositories also return 404 without a suitable token",
            );
    }

    if error_str.contains("No repository given") {
        return UserError::new("No repository specified")
            .with_suggestion("Run 'gh-issues-pdf OWNER/REPO' or run 'gh-issues-pdf init' and edit the config");
    }

    if error_str.contains("Failed to export") {
        return UserError::new("Some issues could not be exported")
            .with_details(error_str)
            .with_suggestion("The error log in the output directory lists each failure");
    }

    if error_str.contains("Failed to parse config") {
        return UserError::new("Invalid configuration file")
            .with_details(error_str)
            .with_suggestion("Check the TOML syntax of your config file");
    }

    if error_str.contains("Permission denied") {
        return UserError::new("Permission denied")
            .with_details("Cannot write to the specified location")
            .with_suggestion("Check that you have write permissions to the output directory");
    }

    if error_str.contains("Failed to send request") {
        return UserError::new("Network connection failed")
            .with_details("Could not connect to the GitHub API")
            .with_suggestion("Check your internet connection and try again");
    }

    UserError::new("An unexpected error occurred").with_details(error_str)
}
