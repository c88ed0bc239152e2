//! Data models for the Terraform analyzer.
//!
//! This module contains the core data structures passed between the
//! pipeline steps: the module being analyzed, the services found in it
//! and the final analysis result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single `.tf` file read from the module directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerraformFile {
    /// File name (no directory component).
    pub name: String,
    /// Raw file content.
    pub content: String,
    /// Number of newline-separated segments in the content.
    pub line_count: usize,
}

impl TerraformFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_count = content.split('\n').count();
        Self {
            name: name.into(),
            content,
            line_count,
        }
    }
}

/// A Terraform module: a directory and the `.tf` files read from it.
#[derive(Debug, Clone)]
pub struct TerraformModule {
    pub directory: PathBuf,
    pub files: Vec<TerraformFile>,
    /// `.tf` files that were found but could not be read.
    pub unreadable: Vec<String>,
}

impl TerraformModule {
    /// Total line count across all files.
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.line_count).sum()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    /// Every `.tf` file found in the directory, readable or not, sorted.
    pub fn discovered_names(&self) -> Vec<String> {
        let mut names = self.file_names();
        names.extend(self.unreadable.iter().cloned());
        names.sort();
        names
    }

    /// Module identifier used in report file names.
    pub fn name(&self) -> String {
        module_name(&self.directory)
    }

    /// Render every file as a fenced HCL block for the model prompts.
    pub fn formatted(&self) -> String {
        if self.files.is_empty() {
            return "No Terraform code found.".to_string();
        }

        self.files
            .iter()
            .map(|f| format!("## File: {}\n```hcl\n{}\n```\n", f.name, f.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Last path component of the module directory.
///
/// `.` and `..` have no file name of their own, so those are resolved
/// through the filesystem first.
pub fn module_name(directory: &Path) -> String {
    if let Some(name) = directory.file_name().and_then(|n| n.to_str()) {
        return name.to_string();
    }

    std::fs::canonicalize(directory)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "module".to_string())
}

/// AWS services reported by the service analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsServices {
    /// Model output exactly as returned.
    pub raw: String,
    /// Normalized service names parsed out of `raw`.
    pub names: Vec<String>,
}

impl AwsServices {
    pub fn from_response(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let names = parse_service_names(&raw);
        Self { raw, names }
    }
}

impl fmt::Display for AwsServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            write!(f, "{}", self.raw.trim())
        } else {
            write!(f, "[{}]", self.names.join(", "))
        }
    }
}

/// Extract service names from the first JSON string array in `text`.
///
/// Models tend to wrap the array in prose or code fences, so every `[`
/// is tried as a starting point until one parses.
pub fn parse_service_names(text: &str) -> Vec<String> {
    for (start, _) in text.match_indices('[') {
        let Some(len) = text[start..].find(']') else {
            break;
        };
        let candidate = &text[start..start + len + 1];

        if let Ok(items) = serde_json::from_str::<Vec<String>>(candidate) {
            let mut names: Vec<String> = Vec::new();
            for item in items {
                let name = item.trim().to_lowercase();
                let name = name.strip_prefix("aws_").unwrap_or(&name).to_string();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            return names;
        }
    }

    Vec::new()
}

/// Which model served each pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsUsed {
    pub service_analyzer: String,
    pub resources_fetcher: String,
    pub advisor: String,
}

/// The complete result of analyzing one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub module_directory: PathBuf,
    pub files_analyzed: Vec<String>,
    pub total_lines: usize,
    pub aws_services: AwsServices,
    pub mcp_tools: usize,
    pub best_practices_resources: String,
    pub recommendations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub analysis_date: DateTime<Utc>,
    pub duration_seconds: f64,
    pub models: ModelsUsed,
}
