//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug, Serialize)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Path does not exist
    pub fn path_not_found(path: &Path) -> Self {
        Self::new(format!("Path not found: {}", path.display()))
            .with_context("The specified path does not exist on the filesystem")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Verify you have read permissions for this path".to_string(),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// Path exists but is not a directory
    pub fn not_a_directory(path: &Path, role: &str) -> Self {
        Self::new(format!("Not a directory: {}", path.display()))
            .with_context(format!("The {role} tree must be a directory"))
            .with_suggestions([
                format!(
                    "TRY: Point --{role} at the directory holding the file: {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
                "TRY: Mount disk images first and compare the mount points".to_string(),
            ])
    }

    /// Explicit config file does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_context("--config must point to an existing TOML file")
            .with_suggestions([
                "TRY: Show the default config location: golden config".to_string(),
                "TRY: Omit --config to use built-in defaults".to_string(),
            ])
    }

    /// Config file exists but cannot be used
    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid config: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: Valid keys: workers, progress_interval_ms, digest_algorithm, follow_symlinks, include_hidden, label_store_path, [labels]".to_string(),
                "TRY: digest_algorithm is one of md5, sha256, blake3".to_string(),
            ])
    }

    /// Label store file cannot be opened
    pub fn label_store_unreadable(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot open label store: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                format!("TRY: Check file permissions: ls -la {}", path.display()),
                "TRY: Use a fresh store with --labels <FILE>".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure for `--json` callers
pub fn print_json_error(err: &anyhow::Error) {
    let body = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({ "error": helpful }),
        None => serde_json::json!({
            "error": {
                "message": err.to_string(),
                "causes": err.chain().skip(1).map(|c| c.to_string()).collect::<Vec<_>>(),
            }
        }),
    };
    match serde_json::to_string_pretty(&body) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{{\"error\":{{\"message\":{:?}}}}}", err.to_string()),
    }
}

/// Print a command failure for humans
pub fn print_error(err: &anyhow::Error) {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => eprint!("{}", helpful),
        None => eprintln!("ERROR: {:?}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While comparing trees")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While comparing trees"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_path_not_found() {
        let path = PathBuf::from("/nonexistent/path");
        let display = format!("{}", HelpfulError::path_not_found(&path));
        assert!(display.contains("/nonexistent/path"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_not_a_directory_names_flag() {
        let err = HelpfulError::not_a_directory(Path::new("/images/dirty.img"), "dirty");
        let display = format!("{}", err);
        assert!(display.contains("--dirty"));
        assert!(display.contains("/images"));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let json = serde_json::to_value(HelpfulError::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "boom" }));
    }

    #[test]
    fn test_anyhow_downcast() {
        let err: anyhow::Error = HelpfulError::config_not_found(Path::new("/x.toml")).into();
        assert!(err.downcast_ref::<HelpfulError>().is_some());
    }
}
