//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// tfadvisor - Terraform best practices analyzer
///
/// Reads the Terraform files of a module, identifies the AWS services it
/// uses, pulls best-practice documentation from the Terraform Registry
/// MCP server and asks an LLM for prioritized recommendations.
///
/// Examples:
///   tfadvisor ./s3
///   tfadvisor ./s3 --model qwen2.5-coder:14b --output-dir reports
///   tfadvisor ./s3 --format json
///   tfadvisor ./s3 --dry-run
///   tfadvisor --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Terraform module directory to analyze
    #[arg(value_name = "DIR", required_unless_present = "init_config")]
    pub directory: Option<PathBuf>,

    /// Ollama model used by the service analyzer and advisor
    ///
    /// Can also be set via TFADVISOR_MODEL or .tfadvisor.toml.
    #[arg(short, long, env = "TFADVISOR_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Anthropic model used by the resources fetcher
    #[arg(long, value_name = "MODEL")]
    pub anthropic_model: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Temperature for Ollama responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens generated per Ollama response
    #[arg(long, value_name = "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Model request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory the report is written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Do not write a report file
    #[arg(long)]
    pub no_save: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tfadvisor.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: read and list the Terraform files without contacting
    /// the MCP server or any model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tfadvisor.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text transcript (default)
    #[default]
    Text,
    /// JSON analysis result
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.directory.is_none() {
            return Err("A Terraform module directory is required".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(format!(
                    "Temperature must be between 0.0 and 1.0, got {}",
                    temperature
                ));
            }
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be positive".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
