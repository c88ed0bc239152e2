//! Error types for the analyzer.
//!
//! Domain failures (missing input, unreachable endpoints, MCP trouble)
//! are typed here; the binary layer wraps them with `anyhow` context.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory '{}' does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("No Terraform files found in '{}'", .0.display())]
    NoTerraformFiles(PathBuf),

    #[error("Cannot connect to {provider} at {endpoint}. Is it running?")]
    ModelUnreachable { provider: String, endpoint: String },

    #[error("{provider} request timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("Terraform documentation service unavailable: {0}")]
    McpUnavailable(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        let err = Error::NoTerraformFiles(PathBuf::from("./s3"));
        assert_eq!(err.to_string(), "No Terraform files found in './s3'");

        let err = Error::ModelUnreachable {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
        };
        assert!(err.to_string().contains("http://localhost:11434"));

        let err = Error::McpUnavailable("docker not found".to_string());
        assert!(err.to_string().starts_with("Terraform documentation service unavailable"));
    }
}
