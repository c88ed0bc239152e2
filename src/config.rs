//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tfadvisor.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".tfadvisor.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Anthropic settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Provider assignment per agent.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Terraform MCP server settings.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Ollama model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How long Ollama keeps the model loaded between calls.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            keep_alive: default_keep_alive(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    20000
}

fn default_keep_alive() -> String {
    "10m".to_string()
}

fn default_timeout() -> u64 {
    600
}

/// Anthropic Messages API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Model identifier.
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// API key. Usually supplied through ANTHROPIC_API_KEY instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL (without the `/messages` suffix).
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Maximum tokens in a response.
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: default_anthropic_model(),
            api_key: None,
            base_url: default_anthropic_base_url(),
            max_tokens: default_anthropic_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    8192
}

/// Model provider backing an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    Anthropic,
}

/// Which provider each agent runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_ollama_provider")]
    pub service_analyzer: Provider,

    #[serde(default = "default_anthropic_provider")]
    pub resources_fetcher: Provider,

    #[serde(default = "default_ollama_provider")]
    pub advisor: Provider,

    /// Upper bound on tool-use round trips per agent call.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            service_analyzer: Provider::Ollama,
            resources_fetcher: Provider::Anthropic,
            advisor: Provider::Ollama,
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_ollama_provider() -> Provider {
    Provider::Ollama
}

fn default_anthropic_provider() -> Provider {
    Provider::Anthropic
}

fn default_max_tool_rounds() -> usize {
    25
}

/// How to launch the Terraform MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Executable to spawn.
    #[serde(default = "default_mcp_command")]
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default = "default_mcp_args")]
    pub args: Vec<String>,

    /// Timeout for a single JSON-RPC request in seconds.
    #[serde(default = "default_mcp_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: default_mcp_command(),
            args: default_mcp_args(),
            request_timeout_seconds: default_mcp_timeout(),
        }
    }
}

fn default_mcp_command() -> String {
    "docker".to_string()
}

fn default_mcp_args() -> Vec<String> {
    vec![
        "run",
        "-i",
        "--rm",
        "-e",
        "TFE_ADDRESS=https://app.terraform.io",
        "-e",
        "TFE_TOKEN=''",
        "-e",
        "TRANSPORT_MODE=stdio",
        "hashicorp/terraform-mcp-server",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_mcp_timeout() -> u64 {
    300
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the report file is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Write a report file at all.
    #[serde(default = "default_true")]
    pub save: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            save: true,
            format: OutputFormat::Text,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or through their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.model.max_tokens = max_tokens;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
            self.anthropic.timeout_seconds = timeout;
        }

        if let Some(ref model) = args.anthropic_model {
            self.anthropic.model = model.clone();
        }
        if let Some(ref key) = args.anthropic_api_key {
            self.anthropic.api_key = Some(key.clone());
        }

        if let Some(ref dir) = args.output_dir {
            self.report.output_dir = dir.clone();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if args.no_save {
            self.report.save = false;
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.model.temperature) {
            anyhow::bail!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.model.temperature
            );
        }
        if self.model.max_tokens == 0 || self.anthropic.max_tokens == 0 {
            anyhow::bail!("max_tokens must be positive");
        }
        if self.model.timeout_seconds == 0 || self.anthropic.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be at least 1");
        }
        if self.mcp.request_timeout_seconds == 0 {
            anyhow::bail!("mcp.request_timeout_seconds must be at least 1");
        }
        if self.mcp.command.trim().is_empty() {
            anyhow::bail!("mcp.command must not be empty");
        }
        Ok(())
    }

    /// Whether any agent runs on the given provider.
    pub fn uses_provider(&self, provider: Provider) -> bool {
        self.agents.service_analyzer == provider
            || self.agents.resources_fetcher == provider
            || self.agents.advisor == provider
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2");
        assert_eq!(config.model.max_tokens, 20000);
        assert_eq!(config.model.keep_alive, "10m");
        assert_eq!(config.agents.resources_fetcher, Provider::Anthropic);
        assert_eq!(config.mcp.command, "docker");
        assert!(config
            .mcp
            .args
            .contains(&"hashicorp/terraform-mcp-server".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
name = "qwen2.5-coder:14b"
temperature = 0.2

[agents]
resources_fetcher = "ollama"

[mcp]
command = "terraform-mcp-server"
args = ["stdio"]

[report]
format = "json"
save = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.name, "qwen2.5-coder:14b");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.ollama_url, "http://localhost:11434");
        assert_eq!(config.agents.resources_fetcher, Provider::Ollama);
        assert_eq!(config.mcp.args, vec!["stdio"]);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert!(!config.report.save);
        assert!(!config.uses_provider(Provider::Anthropic));
    }

    #[test]
    fn test_merge_only_overrides_explicit_args() {
        let mut config: Config = toml::from_str("[model]\nname = \"from-file\"\n").unwrap();
        let args = Args {
            directory: Some(PathBuf::from("./s3")),
            model: None,
            ollama_url: None,
            anthropic_model: None,
            anthropic_api_key: None,
            temperature: Some(0.5),
            max_tokens: None,
            timeout: Some(30),
            output_dir: None,
            format: None,
            no_save: true,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        };

        config.merge_with_args(&args);

        assert_eq!(config.model.temperature, 0.5);
        assert_eq!(config.model.timeout_seconds, 30);
        assert_eq!(config.anthropic.timeout_seconds, 30);
        assert!(!config.report.save);
        assert_eq!(config.model.name, "from-file");
        assert_eq!(config.anthropic.api_key, None);
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.model.temperature = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.model.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.anthropic.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mcp.request_timeout_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mcp.request_timeout_seconds"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[anthropic]"));
        assert!(toml_str.contains("[mcp]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.name, "llama3.2");
    }
}
